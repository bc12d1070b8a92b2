//! Normalized extraction output for one source file.

use crate::source::{SourceFile, SourceKind};
use serde::{Deserialize, Serialize};

/// Structural or temporal tag on a text fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FragmentTag {
    /// Plain body text.
    Text,
    /// A heading; level 1 is the document title.
    Heading { level: u8 },
    /// A table flattened to text, one row per line.
    Table,
    /// A key/value pair detected by the layout service.
    KeyValue { key: String },
    /// A spoken segment with its position in the recording.
    Utterance {
        start_seconds: f64,
        end_seconds: f64,
        speaker: Option<u32>,
    },
}

/// One piece of extracted text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub text: String,
    pub tag: FragmentTag,
}

impl Fragment {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tag: FragmentTag::Text,
        }
    }

    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tag: FragmentTag::Heading { level },
        }
    }

    pub fn table(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tag: FragmentTag::Table,
        }
    }

    pub fn key_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            text: value.into(),
            tag: FragmentTag::KeyValue { key: key.into() },
        }
    }

    pub fn utterance(
        start_seconds: f64,
        end_seconds: f64,
        speaker: Option<u32>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            tag: FragmentTag::Utterance {
                start_seconds,
                end_seconds,
                speaker,
            },
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Extraction output for exactly one [`SourceFile`].
///
/// Holds only a back-reference (the file's discovery id) plus the fields
/// needed to render it; the source file itself stays with the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedUnit {
    pub source_id: usize,
    pub source_name: String,
    pub kind: SourceKind,
    pub fragments: Vec<Fragment>,
    /// Recording length reported by the transcription service.
    pub duration_seconds: Option<f64>,
}

impl ExtractedUnit {
    pub fn new(source: &SourceFile, fragments: Vec<Fragment>) -> Self {
        Self {
            source_id: source.id,
            source_name: source.display_name.clone(),
            kind: source.kind,
            fragments: fragments.into_iter().filter(|f| !f.is_blank()).collect(),
            duration_seconds: None,
        }
    }

    pub fn with_duration(mut self, duration_seconds: f64) -> Self {
        self.duration_seconds = Some(duration_seconds);
        self
    }

    /// Whether the unit carries any text at all.
    pub fn has_content(&self) -> bool {
        !self.fragments.is_empty()
    }

    pub fn utterance_count(&self) -> usize {
        self.fragments
            .iter()
            .filter(|f| matches!(f.tag, FragmentTag::Utterance { .. }))
            .count()
    }
}
