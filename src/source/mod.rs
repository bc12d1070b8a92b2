//! Source files and input classification.
//!
//! The classifier walks the input directory and tags each eligible file as a
//! document, presentation or recording. Everything downstream works from the
//! resulting [`SourceFile`] list.

mod scanner;

pub use scanner::{scan_input_dir, ScanResult, SkippedFile};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Kind of source material, decided by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Document,
    Presentation,
    Audio,
}

impl SourceKind {
    /// Classify a path by its extension. Returns None for unsupported files.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "docx" | "pdf" => Some(SourceKind::Document),
            "pptx" => Some(SourceKind::Presentation),
            "mp3" => Some(SourceKind::Audio),
            _ => None,
        }
    }

    pub fn is_audio(&self) -> bool {
        matches!(self, SourceKind::Audio)
    }

    /// Human-readable label used in the corpus and the summary.
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::Document => "Document",
            SourceKind::Presentation => "Presentation",
            SourceKind::Audio => "Audio",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Document => write!(f, "document"),
            SourceKind::Presentation => write!(f, "presentation"),
            SourceKind::Audio => write!(f, "audio"),
        }
    }
}

/// Processing status of a source file within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Pending,
    Processed,
    Failed,
}

/// Which kinds of sources a run processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub documents: bool,
    pub audio: bool,
}

impl Capabilities {
    /// Process every kind of source.
    pub fn all() -> Self {
        Self {
            documents: true,
            audio: true,
        }
    }

    /// Build from the CLI skip flags.
    pub fn from_skip_flags(skip_documents: bool, skip_audio: bool) -> Self {
        Self {
            documents: !skip_documents,
            audio: !skip_audio,
        }
    }

    pub fn allows(&self, kind: SourceKind) -> bool {
        if kind.is_audio() {
            self.audio
        } else {
            self.documents
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.documents && !self.audio
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::all()
    }
}

/// One input file discovered by the classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    /// Position in discovery order. Stable for the whole run.
    pub id: usize,
    /// Absolute or input-relative path on disk.
    pub path: PathBuf,
    /// Name shown in the corpus and the summary.
    pub display_name: String,
    pub kind: SourceKind,
    pub status: FileStatus,
}

impl SourceFile {
    pub fn new(id: usize, path: PathBuf, display_name: String, kind: SourceKind) -> Self {
        Self {
            id,
            path,
            display_name,
            kind,
            status: FileStatus::Pending,
        }
    }

    /// MIME type sent to the extraction services.
    pub fn mime_type(&self) -> &'static str {
        mime_type(&self.path)
    }

    /// Whether the file is an Office file (as opposed to PDF or audio).
    pub fn is_office(&self) -> bool {
        matches!(
            extension(&self.path).as_deref(),
            Some("docx") | Some("pptx")
        )
    }

    pub fn mark_processed(&mut self) {
        self.status = FileStatus::Processed;
    }

    pub fn mark_failed(&mut self) {
        self.status = FileStatus::Failed;
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// MIME type for a supported file.
pub fn mime_type(path: &Path) -> &'static str {
    match extension(path).as_deref() {
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Some("pptx") => {
            "application/vnd.openxmlformats-officedocument.presentationml.presentation"
        }
        Some("pdf") => "application/pdf",
        Some("mp3") => "audio/mpeg",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_extensions() {
        assert_eq!(SourceKind::from_path(Path::new("a.docx")), Some(SourceKind::Document));
        assert_eq!(SourceKind::from_path(Path::new("a.PDF")), Some(SourceKind::Document));
        assert_eq!(
            SourceKind::from_path(Path::new("slides.pptx")),
            Some(SourceKind::Presentation)
        );
        assert_eq!(SourceKind::from_path(Path::new("talk.Mp3")), Some(SourceKind::Audio));
        assert_eq!(SourceKind::from_path(Path::new("notes.txt")), None);
        assert_eq!(SourceKind::from_path(Path::new("old.doc")), None);
        assert_eq!(SourceKind::from_path(Path::new("README")), None);
    }

    #[test]
    fn test_capabilities() {
        let caps = Capabilities::from_skip_flags(false, true);
        assert!(caps.allows(SourceKind::Document));
        assert!(caps.allows(SourceKind::Presentation));
        assert!(!caps.allows(SourceKind::Audio));
        assert!(Capabilities::from_skip_flags(true, true).is_empty());
    }

    #[test]
    fn test_mime_types() {
        assert_eq!(mime_type(Path::new("x.pdf")), "application/pdf");
        assert_eq!(mime_type(Path::new("x.mp3")), "audio/mpeg");
        assert!(mime_type(Path::new("x.pptx")).contains("presentationml"));
    }

    #[test]
    fn test_office_detection() {
        let docx = SourceFile::new(0, "a.docx".into(), "a.docx".into(), SourceKind::Document);
        let pdf = SourceFile::new(1, "a.pdf".into(), "a.pdf".into(), SourceKind::Document);
        assert!(docx.is_office());
        assert!(!pdf.is_office());
        assert_eq!(docx.status, FileStatus::Pending);
    }
}
