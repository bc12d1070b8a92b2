//! Per-run processing summary.

use crate::corpus::ExtractedUnit;
use crate::error::KoseiError;
use crate::source::{SkippedFile, SourceFile, SourceKind};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    Processed,
    Failed,
    Skipped,
}

impl RecordStatus {
    pub fn label(&self) -> &'static str {
        match self {
            RecordStatus::Processed => "processed",
            RecordStatus::Failed => "failed",
            RecordStatus::Skipped => "skipped",
        }
    }
}

/// Outcome for one input file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub display_name: String,
    pub kind: SourceKind,
    pub status: RecordStatus,
    pub fragments: usize,
    pub duration_seconds: Option<f64>,
    pub elapsed: Option<Duration>,
    pub error: Option<String>,
}

impl FileRecord {
    pub fn processed(unit: &ExtractedUnit, elapsed: Duration) -> Self {
        Self {
            display_name: unit.source_name.clone(),
            kind: unit.kind,
            status: RecordStatus::Processed,
            fragments: unit.fragments.len(),
            duration_seconds: unit.duration_seconds,
            elapsed: Some(elapsed),
            error: None,
        }
    }

    pub fn failed(source: &SourceFile, error: &KoseiError, elapsed: Duration) -> Self {
        Self {
            display_name: source.display_name.clone(),
            kind: source.kind,
            status: RecordStatus::Failed,
            fragments: 0,
            duration_seconds: None,
            elapsed: Some(elapsed),
            error: Some(error.to_string()),
        }
    }

    pub fn skipped(file: &SkippedFile) -> Self {
        Self {
            display_name: file.display_name.clone(),
            kind: file.kind,
            status: RecordStatus::Skipped,
            fragments: 0,
            duration_seconds: None,
            elapsed: None,
            error: None,
        }
    }

    fn render_into(&self, include_timings: bool, out: &mut String) {
        out.push_str(&format!("- {}: {}", self.display_name, self.status.label()));

        let mut details = Vec::new();
        if self.status == RecordStatus::Processed {
            if self.kind.is_audio() {
                details.push(format!("{} utterances", self.fragments));
            } else {
                details.push(format!("{} fragments", self.fragments));
            }
            if let Some(duration) = self.duration_seconds {
                details.push(format!("{:.1}s audio", duration));
            }
        }
        if include_timings {
            if let Some(elapsed) = self.elapsed {
                details.push(format!("took {:.2}s", elapsed.as_secs_f64()));
            }
        }
        if !details.is_empty() {
            out.push_str(&format!(" ({})", details.join(", ")));
        }
        out.push('\n');

        if let Some(error) = &self.error {
            out.push_str(&format!("  Error: {}\n", error));
        }
    }
}

/// Everything the summary artifact reports about a run.
///
/// Records are appended by the orchestrator as files settle; rendering sorts
/// them, so the artifact does not depend on completion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessingSummary {
    records: Vec<FileRecord>,
    outline: Option<(String, usize)>,
    fatal: Option<String>,
}

impl ProcessingSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: FileRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    /// Note the written outline file and its section count.
    pub fn set_outline(&mut self, file_name: impl Into<String>, sections: usize) {
        self.outline = Some((file_name.into(), sections));
    }

    pub fn set_fatal(&mut self, error: &KoseiError) {
        self.fatal = Some(error.to_string());
    }

    pub fn fatal(&self) -> Option<&str> {
        self.fatal.as_deref()
    }

    pub fn count(&self, status: RecordStatus) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileRecord> {
        self.records
            .iter()
            .filter(|r| r.status == RecordStatus::Failed)
    }

    /// Render the summary artifact.
    ///
    /// Wall-clock timings are only included when asked for, so the default
    /// rendering is identical across runs with the same outcome.
    pub fn render(&self, include_timings: bool) -> String {
        let mut out = String::from("# Processing Summary\n\n");

        match &self.fatal {
            Some(error) => out.push_str(&format!("Result: failed\nError: {}\n", error)),
            None => out.push_str("Result: completed\n"),
        }
        match (&self.outline, &self.fatal) {
            (Some((file, sections)), _) => {
                out.push_str(&format!("Outline: {} ({} sections)\n", file, sections))
            }
            // Any outline file already in the output directory is from an earlier run.
            (None, Some(_)) => out.push_str("Outline: not written by this run\n"),
            (None, None) => {}
        }

        let mut sorted: Vec<&FileRecord> = self.records.iter().collect();
        sorted.sort_by(|a, b| a.display_name.cmp(&b.display_name));

        let groups = [
            ("Documents", false),
            ("Audio", true),
        ];
        for (title, audio) in groups {
            let records: Vec<&&FileRecord> = sorted
                .iter()
                .filter(|r| r.kind.is_audio() == audio)
                .collect();
            if records.is_empty() {
                continue;
            }

            out.push_str(&format!("\n## {}\n", title));
            for record in records {
                record.render_into(include_timings, &mut out);
            }
        }

        out.push_str(&format!(
            "\nTotals: {} processed, {} failed, {} skipped\n",
            self.count(RecordStatus::Processed),
            self.count(RecordStatus::Failed),
            self.count(RecordStatus::Skipped)
        ));
        out
    }
}
