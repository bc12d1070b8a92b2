//! Pre-flight checks before a run.
//!
//! Validates that credentials and the input directory are available before
//! any file is sent to a service.

use crate::config::Credentials;
use crate::error::{KoseiError, Result};
use crate::source::Capabilities;
use std::path::Path;

/// Run pre-flight checks for a pipeline run.
///
/// Returns the credentials the enabled stages need, or an error describing
/// what is missing.
pub fn check_run(capabilities: Capabilities, input_dir: &Path) -> Result<Credentials> {
    check_capabilities(capabilities)?;
    check_input_dir(input_dir)?;
    Credentials::from_env(capabilities)
}

fn check_capabilities(capabilities: Capabilities) -> Result<()> {
    if capabilities.is_empty() {
        return Err(KoseiError::Config(
            "--skip-audio and --skip-documents together leave nothing to process".to_string(),
        ));
    }
    Ok(())
}

fn check_input_dir(dir: &Path) -> Result<()> {
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
    Ok(())
}
