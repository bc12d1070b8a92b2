//! Audio transcription.
//!
//! Recordings are sent to a speech-to-text service with speaker separation
//! and utterance segmentation enabled. The response is normalized into an
//! [`ExtractedUnit`] with one fragment per utterance.

mod deepgram;
mod models;

pub use deepgram::DeepgramTranscriber;
pub use models::{format_timestamp, ListenResponse, Utterance};

use crate::corpus::ExtractedUnit;
use crate::error::Result;
use crate::source::SourceFile;
use async_trait::async_trait;

/// Trait for transcription services.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe one recording.
    ///
    /// Fails with an extraction error when the service rejects the file, and
    /// with a timeout error when the per-file deadline passes.
    async fn transcribe(&self, file: &SourceFile) -> Result<ExtractedUnit>;
}
