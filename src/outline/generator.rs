//! Outline generation through a chat completion endpoint.

use super::{parse_outline, Outline};
use crate::config::{GenerationSettings, Prompts};
use crate::corpus::{Corpus, RenderLimits};
use crate::error::{KoseiError, Result};
use crate::http::create_generation_client;
use crate::retry::RetryPolicy;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

const SERVICE: &str = "generation";

/// Trait for generative text services.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Complete one prompt and return the raw response text.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;
}

/// Generator backed by an OpenAI-compatible chat completion endpoint.
pub struct OpenAiGenerator {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAiGenerator {
    pub fn new(settings: &GenerationSettings, model: &str, api_key: &str) -> Result<Self> {
        Ok(Self {
            client: create_generation_client(
                &settings.base_url,
                api_key,
                settings.request_timeout(),
            )?,
            model: model.to_string(),
            temperature: settings.temperature,
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system.to_string())
                .build()
                .map_err(|e| KoseiError::GenerationFailed(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt.to_string())
                .build()
                .map_err(|e| KoseiError::GenerationFailed(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .build()
            .map_err(|e| KoseiError::GenerationFailed(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(map_openai_error)?;

        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| KoseiError::GenerationFailed("Empty response from model".to_string()))
    }
}

/// Translate client errors so the retry policy can classify them.
fn map_openai_error(err: OpenAIError) -> KoseiError {
    match err {
        OpenAIError::Reqwest(e) => KoseiError::Http(e),
        OpenAIError::ApiError(api) => {
            // Server errors arrive with neither type nor code, only the body.
            let kind = format!("{:?} {:?} {}", api.r#type, api.code, api.message);
            KoseiError::Service {
                service: SERVICE.to_string(),
                status: status_hint(&kind),
                message: api.message,
            }
        }
        other => {
            let message = other.to_string();
            KoseiError::Service {
                service: SERVICE.to_string(),
                status: status_hint(&message),
                message,
            }
        }
    }
}

/// Guess an HTTP status from error text; the client does not expose it.
fn status_hint(text: &str) -> Option<u16> {
    let text = text.to_lowercase();
    if ["rate limit", "rate_limit", "resource_exhausted", "429"]
        .iter()
        .any(|k| text.contains(k))
    {
        Some(429)
    } else if ["server_error", "overloaded", "unavailable", "internal"]
        .iter()
        .any(|k| text.contains(k))
    {
        Some(503)
    } else {
        None
    }
}

/// Raw generated text together with its parsed outline.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedOutline {
    pub outline: Outline,
    pub raw: String,
}

/// Builds the generation prompt from a corpus, makes the single generation
/// call and parses the result.
pub struct StructureGenerator {
    generator: Arc<dyn TextGenerator>,
    prompts: Prompts,
    retry: RetryPolicy,
    limits: RenderLimits,
    language: String,
}

impl StructureGenerator {
    pub fn new(generator: Arc<dyn TextGenerator>, prompts: Prompts, retry: RetryPolicy) -> Self {
        Self {
            generator,
            prompts,
            retry,
            limits: RenderLimits::default(),
            language: GenerationSettings::default().language,
        }
    }

    pub fn with_limits(mut self, limits: RenderLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    fn variables(&self, corpus: &Corpus) -> HashMap<String, String> {
        let reference = corpus
            .reference_template()
            .unwrap_or(&self.prompts.structure.default_reference);

        let mut vars = HashMap::new();
        vars.insert("reference".to_string(), reference.to_string());
        vars.insert("corpus".to_string(), corpus.render(&self.limits));
        vars.insert("language".to_string(), self.language.clone());
        vars
    }

    pub fn system_prompt(&self, corpus: &Corpus) -> String {
        self.prompts
            .render_with_custom(&self.prompts.structure.system, &self.variables(corpus))
    }

    pub fn build_prompt(&self, corpus: &Corpus) -> String {
        self.prompts
            .render_with_custom(&self.prompts.structure.user, &self.variables(corpus))
    }

    /// Generate and parse an outline.
    ///
    /// Transient failures are retried; anything left over becomes
    /// [`KoseiError::GenerationFailed`]. A response without any section is
    /// [`KoseiError::UnparsableResponse`].
    #[instrument(skip_all, fields(units = corpus.len()))]
    pub async fn generate(&self, corpus: &Corpus) -> Result<GeneratedOutline> {
        let system = self.system_prompt(corpus);
        let prompt = self.build_prompt(corpus);
        info!("Requesting outline ({} prompt characters)", prompt.chars().count());

        let raw = self
            .retry
            .run("outline generation", || self.generator.complete(&system, &prompt))
            .await
            .map_err(|e| match e {
                KoseiError::GenerationFailed(_) => e,
                other => KoseiError::GenerationFailed(other.to_string()),
            })?;

        if raw.trim().is_empty() {
            return Err(KoseiError::GenerationFailed(
                "Empty response from model".to_string(),
            ));
        }
        debug!("Received {} characters", raw.chars().count());

        let outline = parse_outline(&raw)?;
        info!("Parsed {} outline sections", outline.len());
        Ok(GeneratedOutline { outline, raw })
    }
}
