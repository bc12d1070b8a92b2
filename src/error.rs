//! Error types for Kosei.

use thiserror::Error;

/// Library-level error type for Kosei operations.
#[derive(Error, Debug)]
pub enum KoseiError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input directory: {0}")]
    InvalidInputDirectory(String),

    #[error("Extraction failed for {file}: {cause}")]
    Extraction { file: String, cause: String },

    #[error("Transcription of {file} did not finish within {seconds} seconds")]
    TranscriptionTimeout { file: String, seconds: u64 },

    #[error("No content could be extracted from the input files")]
    EmptyCorpus,

    #[error("Outline generation failed: {0}")]
    GenerationFailed(String),

    #[error("Could not find any outline section in the generated response")]
    UnparsableResponse { raw: String },

    #[error("Failed to write {path}: {cause}")]
    OutputWrite { path: String, cause: String },

    #[error("Run was cancelled")]
    Cancelled,

    #[error("{service} returned {}: {message}", status_label(.status))]
    Service {
        service: String,
        status: Option<u16>,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl KoseiError {
    /// Whether a failed external call is worth retrying.
    ///
    /// Network failures, HTTP 429 and HTTP 5xx are transient; everything else is not.
    pub fn is_transient(&self) -> bool {
        match self {
            KoseiError::Service { status, .. } => status.is_some_and(is_transient_status),
            KoseiError::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.is_request()
                    || e.status().is_some_and(|s| is_transient_status(s.as_u16()))
            }
            _ => false,
        }
    }
}

fn status_label(status: &Option<u16>) -> String {
    status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "an error".to_string())
}

fn is_transient_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

/// Result type alias for Kosei operations.
pub type Result<T> = std::result::Result<T, KoseiError>;
