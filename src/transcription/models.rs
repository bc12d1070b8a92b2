//! Transcription service response models.

use crate::corpus::{ExtractedUnit, Fragment};
use crate::source::SourceFile;
use serde::Deserialize;

/// Top-level response of a prerecorded transcription request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ListenResponse {
    pub metadata: ListenMetadata,
    pub results: ListenResults,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ListenMetadata {
    /// Recording length in seconds.
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ListenResults {
    pub channels: Vec<Channel>,
    pub utterances: Vec<Utterance>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Channel {
    pub alternatives: Vec<Alternative>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Alternative {
    pub transcript: String,
    pub confidence: Option<f64>,
}

/// A speaker turn, present when utterance segmentation is requested.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Utterance {
    pub start: f64,
    pub end: f64,
    pub transcript: String,
    pub speaker: Option<u32>,
}

impl ListenResponse {
    /// Full transcript of the first channel's best alternative.
    pub fn transcript(&self) -> &str {
        self.results
            .channels
            .first()
            .and_then(|c| c.alternatives.first())
            .map(|a| a.transcript.as_str())
            .unwrap_or("")
    }

    /// Convert into an extraction unit for `source`.
    ///
    /// Each utterance becomes one fragment. Without utterances the full
    /// transcript becomes a single fragment spanning the recording.
    pub fn into_unit(self, source: &SourceFile) -> ExtractedUnit {
        let duration = self
            .metadata
            .duration
            .or_else(|| self.results.utterances.last().map(|u| u.end));

        let fragments = if self.results.utterances.is_empty() {
            vec![Fragment::utterance(
                0.0,
                duration.unwrap_or(0.0),
                None,
                self.transcript().trim(),
            )]
        } else {
            self.results
                .utterances
                .into_iter()
                .map(|u| Fragment::utterance(u.start, u.end, u.speaker, u.transcript.trim()))
                .collect()
        };

        let unit = ExtractedUnit::new(source, fragments);
        match duration {
            Some(d) => unit.with_duration(d),
            None => unit,
        }
    }
}

/// Format seconds as MM:SS or HH:MM:SS.
pub fn format_timestamp(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u32;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}
