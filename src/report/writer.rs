//! Writes the run artifacts to the output directory.

use super::ProcessingSummary;
use crate::config::OutputSettings;
use crate::error::{KoseiError, Result};
use crate::outline::Outline;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

/// Writer for the outline and summary artifacts.
///
/// Each artifact is written to a temporary file in the output directory and
/// renamed into place, so a reader never sees a partially written file.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
    outline_file: String,
    summary_file: String,
    include_timings: bool,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>, settings: &OutputSettings) -> Self {
        Self {
            output_dir: output_dir.into(),
            outline_file: settings.outline_file.clone(),
            summary_file: settings.summary_file.clone(),
            include_timings: settings.include_timings,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn outline_file_name(&self) -> &str {
        &self.outline_file
    }

    pub fn outline_path(&self) -> PathBuf {
        self.output_dir.join(&self.outline_file)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.output_dir.join(&self.summary_file)
    }

    pub fn write_outline(&self, outline: &Outline) -> Result<PathBuf> {
        let path = self.outline_path();
        write_atomic(&path, &outline.render())?;
        info!("Wrote outline to {}", path.display());
        Ok(path)
    }

    pub fn write_summary(&self, summary: &ProcessingSummary) -> Result<PathBuf> {
        let path = self.summary_path();
        write_atomic(&path, &summary.render(self.include_timings))?;
        info!("Wrote processing summary to {}", path.display());
        Ok(path)
    }
}

/// Write `contents` to `path` through a sibling temporary file.
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let failed = |cause: String| KoseiError::OutputWrite {
        path: path.display().to_string(),
        cause,
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| failed(e.to_string()))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| failed(e.to_string()))?;
    tmp.write_all(contents.as_bytes())
        .and_then(|_| tmp.flush())
        .map_err(|e| failed(e.to_string()))?;
    tmp.persist(path).map_err(|e| failed(e.error.to_string()))?;
    Ok(())
}
