//! Configuration module for Kosei.
//!
//! Handles loading application settings, prompt templates and API credentials.

mod credentials;
mod prompts;
mod settings;

pub use credentials::{mask, Credentials, DocumentCredentials};
pub use credentials::{
    ALL_VARS, DOCUMENT_ENDPOINT_VAR, DOCUMENT_KEY_VAR, GENERATION_KEY_VAR, TRANSCRIPTION_KEY_VAR,
};
pub use prompts::{Prompts, StructurePrompts};
pub use settings::{
    CorpusSettings, DocumentSettings, GeneralSettings, GenerationSettings, OutputSettings,
    PipelineSettings, PromptSettings, RetrySettings, Settings, TranscriptionSettings,
};
