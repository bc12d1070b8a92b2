//! API credentials read from the environment.
//!
//! Credentials are resolved once at startup and handed to each client at
//! construction. A missing credential for an enabled stage is a configuration
//! error before any work starts.

use crate::error::{KoseiError, Result};
use crate::source::Capabilities;

pub const DOCUMENT_ENDPOINT_VAR: &str = "AZURE_DOCUMENT_INTELLIGENCE_ENDPOINT";
pub const DOCUMENT_KEY_VAR: &str = "AZURE_DOCUMENT_INTELLIGENCE_KEY";
pub const TRANSCRIPTION_KEY_VAR: &str = "DEEPGRAM_API_KEY";
pub const GENERATION_KEY_VAR: &str = "GEMINI_API_KEY";

/// All environment variables holding credentials.
pub const ALL_VARS: [&str; 4] = [
    DOCUMENT_ENDPOINT_VAR,
    DOCUMENT_KEY_VAR,
    TRANSCRIPTION_KEY_VAR,
    GENERATION_KEY_VAR,
];

/// Layout-analysis service endpoint and key.
#[derive(Clone)]
pub struct DocumentCredentials {
    pub endpoint: String,
    pub key: String,
}

/// Credentials for the services a run needs.
#[derive(Clone)]
pub struct Credentials {
    /// Present when document extraction is enabled.
    pub document: Option<DocumentCredentials>,
    /// Present when audio transcription is enabled.
    pub transcription_key: Option<String>,
    pub generation_key: String,
}

impl Credentials {
    /// Read credentials from the process environment.
    pub fn from_env(capabilities: Capabilities) -> Result<Self> {
        Self::from_lookup(capabilities, |name| std::env::var(name).ok())
    }

    /// Read credentials through an arbitrary lookup function.
    pub fn from_lookup<F>(capabilities: Capabilities, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        let mut require = |name: &'static str| -> Option<String> {
            match lookup(name).map(|v| v.trim().to_string()) {
                Some(value) if !value.is_empty() => Some(value),
                _ => {
                    missing.push(name);
                    None
                }
            }
        };

        let document = if capabilities.documents {
            let endpoint = require(DOCUMENT_ENDPOINT_VAR);
            let key = require(DOCUMENT_KEY_VAR);
            endpoint
                .zip(key)
                .map(|(endpoint, key)| DocumentCredentials { endpoint, key })
        } else {
            None
        };

        let transcription_key = if capabilities.audio {
            require(TRANSCRIPTION_KEY_VAR)
        } else {
            None
        };

        let generation_key = require(GENERATION_KEY_VAR);

        match generation_key {
            Some(generation_key) if missing.is_empty() => Ok(Self {
                document,
                transcription_key,
                generation_key,
            }),
            _ => Err(KoseiError::Config(format!(
                "missing credentials: {}. Set them in the environment or a .env file",
                missing.join(", ")
            ))),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field(
                "document_endpoint",
                &self.document.as_ref().map(|d| d.endpoint.as_str()),
            )
            .field("document_key", &self.document.as_ref().map(|d| mask(&d.key)))
            .field("transcription_key", &self.transcription_key.as_deref().map(mask))
            .field("generation_key", &mask(&self.generation_key))
            .finish()
    }
}

/// Mask a secret for display, keeping only its edges.
pub fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_all_present() {
        let vars = env(&[
            (DOCUMENT_ENDPOINT_VAR, "https://example.cognitiveservices.azure.com/"),
            (DOCUMENT_KEY_VAR, "doc-key"),
            (TRANSCRIPTION_KEY_VAR, "dg-key"),
            (GENERATION_KEY_VAR, "gen-key"),
        ]);
        let creds = Credentials::from_lookup(Capabilities::all(), |k| vars.get(k).cloned()).unwrap();
        assert_eq!(creds.document.unwrap().key, "doc-key");
        assert_eq!(creds.transcription_key.as_deref(), Some("dg-key"));
        assert_eq!(creds.generation_key, "gen-key");
    }

    #[test]
    fn test_missing_reports_every_variable() {
        let vars = env(&[(DOCUMENT_KEY_VAR, "doc-key"), (TRANSCRIPTION_KEY_VAR, "  ")]);
        let err = Credentials::from_lookup(Capabilities::all(), |k| vars.get(k).cloned())
            .unwrap_err()
            .to_string();
        assert!(err.contains(DOCUMENT_ENDPOINT_VAR));
        assert!(err.contains(TRANSCRIPTION_KEY_VAR));
        assert!(err.contains(GENERATION_KEY_VAR));
        assert!(!err.contains(DOCUMENT_KEY_VAR));
    }

    #[test]
    fn test_disabled_stage_needs_no_credentials() {
        let vars = env(&[(GENERATION_KEY_VAR, "gen-key")]);
        let caps = Capabilities {
            documents: false,
            audio: false,
        };
        let creds = Credentials::from_lookup(caps, |k| vars.get(k).cloned()).unwrap();
        assert!(creds.document.is_none());
        assert!(creds.transcription_key.is_none());
    }

    #[test]
    fn test_debug_masks_secrets() {
        let creds = Credentials {
            document: None,
            transcription_key: Some("abcdefghijklmnop".to_string()),
            generation_key: "short".to_string(),
        };
        let debug = format!("{:?}", creds);
        assert!(debug.contains("abcd...mnop"));
        assert!(!debug.contains("abcdefghijklmnop"));
        assert!(!debug.contains("short"));
    }
}
