//! Input directory scanning.

use super::{Capabilities, SourceFile, SourceKind};
use crate::error::{KoseiError, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// A file that was eligible but filtered out by the run's capabilities.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedFile {
    pub display_name: String,
    pub kind: SourceKind,
}

/// Result of scanning an input directory.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    /// Files to process, in discovery order.
    pub files: Vec<SourceFile>,
    /// Eligible files removed by the capability filter.
    pub skipped: Vec<SkippedFile>,
}

impl ScanResult {
    pub fn count(&self, kind: SourceKind) -> usize {
        self.files.iter().filter(|f| f.kind == kind).count()
    }
}

/// Scan an input directory for source files.
///
/// Sub-directories are searched recursively. Files are returned in
/// lexicographic order of their path relative to `dir`, so the same directory
/// always yields the same sequence.
pub fn scan_input_dir(
    dir: &Path,
    capabilities: Capabilities,
    display_names: &BTreeMap<String, String>,
) -> Result<ScanResult> {
    if !dir.exists() {
        return Err(KoseiError::InvalidInputDirectory(format!(
            "{} does not exist",
            dir.display()
        )));
    }
    if !dir.is_dir() {
        return Err(KoseiError::InvalidInputDirectory(format!(
            "{} is not a directory",
            dir.display()
        )));
    }

    let mut eligible: Vec<(PathBuf, PathBuf, SourceKind)> = Vec::new();

    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry.map_err(|e| {
            KoseiError::InvalidInputDirectory(format!("failed to read {}: {}", dir.display(), e))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        match SourceKind::from_path(path) {
            Some(kind) => {
                let relative = path.strip_prefix(dir).unwrap_or(path).to_path_buf();
                eligible.push((path.to_path_buf(), relative, kind));
            }
            None => debug!("Ignoring unsupported file {}", path.display()),
        }
    }

    eligible.sort_by(|a, b| a.1.cmp(&b.1));

    let mut result = ScanResult::default();
    for (path, relative, kind) in eligible {
        let display_name = display_name_for(&relative, display_names);
        if capabilities.allows(kind) {
            let id = result.files.len();
            result.files.push(SourceFile::new(id, path, display_name, kind));
        } else {
            debug!("Skipping {} ({} processing disabled)", display_name, kind);
            result.skipped.push(SkippedFile { display_name, kind });
        }
    }

    info!(
        "Found {} document(s), {} presentation(s), {} recording(s); {} skipped",
        result.count(SourceKind::Document),
        result.count(SourceKind::Presentation),
        result.count(SourceKind::Audio),
        result.skipped.len()
    );

    Ok(result)
}

/// Display name for a file: the configured mapping for its file name, or its
/// input-relative path.
fn display_name_for(relative: &Path, display_names: &BTreeMap<String, String>) -> String {
    let file_name = relative
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    match display_names.get(file_name) {
        Some(mapped) => match relative.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => format!("{}/{}", parent.to_string_lossy().replace('\\', "/"), mapped),
            None => mapped.clone(),
        },
        None => relative.to_string_lossy().replace('\\', "/"),
    }
}
