//! Configuration settings for Kosei.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub document: DocumentSettings,
    pub transcription: TranscriptionSettings,
    pub generation: GenerationSettings,
    pub retry: RetrySettings,
    pub pipeline: PipelineSettings,
    pub corpus: CorpusSettings,
    pub output: OutputSettings,
    pub prompts: PromptSettings,
    /// On-disk file name -> display name used in the corpus and summary.
    pub display_names: BTreeMap<String, String>,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Default input directory.
    pub input_dir: String,
    /// Default output directory.
    pub output_dir: String,
    /// Log file path. Empty disables file logging.
    pub log_file: String,
    /// Level written to the log file when no `-v` is given.
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            input_dir: "input".to_string(),
            output_dir: "output".to_string(),
            log_file: "logs/kosei.log".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Layout-analysis service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentSettings {
    /// REST API version.
    pub api_version: String,
    /// Model used for Office files (.docx, .pptx).
    pub office_model: String,
    /// Model used for PDF files.
    pub pdf_model: String,
    /// Interval between polls of a running analysis.
    pub poll_interval_ms: u64,
    /// Overall deadline for one file's analysis.
    pub deadline_seconds: u64,
    /// Timeout for a single HTTP request.
    pub request_timeout_seconds: u64,
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            api_version: "2023-07-31".to_string(),
            office_model: "prebuilt-read".to_string(),
            pdf_model: "prebuilt-layout".to_string(),
            poll_interval_ms: 1000,
            deadline_seconds: 300,
            request_timeout_seconds: 120,
        }
    }
}

impl DocumentSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

/// Transcription service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Base URL of the transcription API.
    pub base_url: String,
    /// Transcription model.
    pub model: String,
    /// Spoken language of the recordings.
    pub language: String,
    /// Ask the service to separate speakers.
    pub diarize: bool,
    /// Overall deadline for one file, across all retries.
    pub deadline_seconds: u64,
    /// Timeout for a single HTTP request.
    pub request_timeout_seconds: u64,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.deepgram.com".to_string(),
            model: "general".to_string(),
            language: "ja".to_string(),
            diarize: true,
            deadline_seconds: 1800, // 30 minutes
            request_timeout_seconds: 900,
        }
    }
}

impl TranscriptionSettings {
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

/// Generative-text service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Base URL of the OpenAI-compatible endpoint.
    pub base_url: String,
    /// Model name. `KOSEI_MODEL` overrides it.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Language the outline is written in.
    pub language: String,
    /// Timeout for the generation request.
    pub request_timeout_seconds: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            model: "gemini-1.5-flash".to_string(),
            temperature: 0.7,
            language: "Japanese".to_string(),
            request_timeout_seconds: 300,
        }
    }
}

impl GenerationSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

/// Retry policy for external calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each retry.
    pub initial_delay_ms: u64,
    /// Upper bound for a single delay.
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 16_000,
        }
    }
}

/// Pipeline scheduling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Maximum concurrent extraction calls.
    pub max_concurrent: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self { max_concurrent: 4 }
    }
}

/// Corpus assembly and prompt rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusSettings {
    /// Reference template read when no path is given on the command line.
    pub reference_template: Option<String>,
    /// Maximum characters of text rendered per source.
    pub max_chars_per_source: usize,
    /// Maximum key/value pairs rendered per document.
    pub max_key_values: usize,
    /// Maximum utterances rendered per recording.
    pub max_utterances: usize,
    /// Utterances containing one of these words are listed as key points.
    pub highlight_keywords: Vec<String>,
    /// Minimum length (in characters) of a key point utterance.
    pub highlight_min_chars: usize,
    /// Maximum key points per recording.
    pub max_highlights: usize,
}

impl Default for CorpusSettings {
    fn default() -> Self {
        Self {
            reference_template: Some("input/output_reference/output1.txt".to_string()),
            max_chars_per_source: 3000,
            max_key_values: 10,
            max_utterances: 20,
            highlight_keywords: [
                "重要", "ポイント", "結論", "まとめ", "注意", "特に", "必ず", "結果", "効果", "目的",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            highlight_min_chars: 20,
            max_highlights: 10,
        }
    }
}

/// Report output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// File name of the generated outline.
    pub outline_file: String,
    /// File name of the processing summary.
    pub summary_file: String,
    /// Include per-file wall-clock timings in the summary.
    /// Off by default so repeated runs produce identical files.
    pub include_timings: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            outline_file: "generated_structure.txt".to_string(),
            summary_file: "processing_summary.txt".to_string(),
            include_timings: false,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else if path.is_some() {
            Err(crate::error::KoseiError::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )))
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::KoseiError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("kosei")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    pub fn input_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.input_dir)
    }

    pub fn output_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.output_dir)
    }

    /// Log file path, if file logging is enabled.
    pub fn log_file(&self) -> Option<PathBuf> {
        if self.general.log_file.trim().is_empty() {
            None
        } else {
            Some(Self::expand_path(&self.general.log_file))
        }
    }

    /// Default reference template path, if one is configured.
    pub fn reference_template(&self) -> Option<PathBuf> {
        self.corpus
            .reference_template
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(Self::expand_path)
    }

    /// Generation model, honoring the `KOSEI_MODEL` override.
    pub fn generation_model(&self) -> String {
        std::env::var("KOSEI_MODEL")
            .ok()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.generation.model.clone())
    }

    /// Display name for an on-disk file name.
    pub fn display_name(&self, file_name: &str) -> String {
        self.display_names
            .get(file_name)
            .cloned()
            .unwrap_or_else(|| file_name.to_string())
    }
}
