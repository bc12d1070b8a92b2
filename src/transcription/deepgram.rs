//! Deepgram prerecorded transcription.

use super::{ListenResponse, Transcriber};
use crate::config::TranscriptionSettings;
use crate::corpus::ExtractedUnit;
use crate::error::{KoseiError, Result};
use crate::http::{create_http_client, ensure_success};
use crate::retry::RetryPolicy;
use crate::source::SourceFile;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

const SERVICE: &str = "transcription";

/// Speech-to-text through the Deepgram `/v1/listen` endpoint.
pub struct DeepgramTranscriber {
    client: reqwest::Client,
    listen_url: Url,
    api_key: String,
    retry: RetryPolicy,
    deadline: Duration,
}

impl DeepgramTranscriber {
    pub fn new(settings: &TranscriptionSettings, api_key: &str, retry: RetryPolicy) -> Result<Self> {
        let listen_url = listen_url(settings)?;
        Ok(Self {
            client: create_http_client(settings.request_timeout())?,
            listen_url,
            api_key: api_key.to_string(),
            retry,
            deadline: settings.deadline(),
        })
    }

    /// Override the per-file deadline.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    async fn request(&self, file: &SourceFile, audio: Vec<u8>) -> Result<ListenResponse> {
        let response = self
            .client
            .post(self.listen_url.clone())
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Content-Type", file.mime_type())
            .body(audio)
            .send()
            .await?;

        let response = ensure_success(SERVICE, response).await?;
        Ok(response.json::<ListenResponse>().await?)
    }
}

#[async_trait]
impl Transcriber for DeepgramTranscriber {
    #[instrument(skip(self, file), fields(file = %file.display_name))]
    async fn transcribe(&self, file: &SourceFile) -> Result<ExtractedUnit> {
        let audio = tokio::fs::read(&file.path)
            .await
            .map_err(|e| KoseiError::Extraction {
                file: file.display_name.clone(),
                cause: e.to_string(),
            })?;
        debug!("Uploading {} bytes", audio.len());

        let attempts = self
            .retry
            .run("transcription", || self.request(file, audio.clone()));

        let response = match tokio::time::timeout(self.deadline, attempts).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                return Err(KoseiError::Extraction {
                    file: file.display_name.clone(),
                    cause: e.to_string(),
                })
            }
            Err(_) => {
                return Err(KoseiError::TranscriptionTimeout {
                    file: file.display_name.clone(),
                    seconds: self.deadline.as_secs(),
                })
            }
        };

        let unit = response.into_unit(file);
        info!(
            "Transcribed {} utterances ({:.0}s)",
            unit.utterance_count(),
            unit.duration_seconds.unwrap_or(0.0)
        );
        Ok(unit)
    }
}

fn listen_url(settings: &TranscriptionSettings) -> Result<Url> {
    let base = settings.base_url.trim_end_matches('/');
    let mut url = Url::parse(&format!("{}/v1/listen", base)).map_err(|e| {
        KoseiError::Config(format!(
            "Invalid transcription base URL '{}': {}",
            settings.base_url, e
        ))
    })?;

    url.query_pairs_mut()
        .append_pair("model", &settings.model)
        .append_pair("language", &settings.language)
        .append_pair("punctuate", "true")
        .append_pair("utterances", "true")
        .append_pair("diarize", if settings.diarize { "true" } else { "false" });

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listen_url() {
        let settings = TranscriptionSettings {
            base_url: "https://api.deepgram.com/".to_string(),
            ..TranscriptionSettings::default()
        };
        let url = listen_url(&settings).unwrap();
        assert_eq!(url.path(), "/v1/listen");
        let query = url.query().unwrap();
        assert!(query.contains("language=ja"));
        assert!(query.contains("diarize=true"));
        assert!(query.contains("utterances=true"));
    }

    #[test]
    fn test_invalid_base_url() {
        let settings = TranscriptionSettings {
            base_url: "not a url".to_string(),
            ..TranscriptionSettings::default()
        };
        assert!(matches!(listen_url(&settings), Err(KoseiError::Config(_))));
    }
}
