//! Azure Document Intelligence layout analysis over REST.

use super::{AnalyzeOperation, AnalyzeResult, LayoutAnalyzer, OperationStatus};
use crate::config::{DocumentCredentials, DocumentSettings};
use crate::corpus::ExtractedUnit;
use crate::error::{KoseiError, Result};
use crate::http::{create_http_client, ensure_success};
use crate::retry::RetryPolicy;
use crate::source::SourceFile;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

const SERVICE: &str = "layout analysis";
const KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Layout analyzer backed by the Document Intelligence `analyze` operation.
///
/// A file is submitted once, then the returned operation is polled until it
/// succeeds or fails. Each HTTP call goes through the retry policy and the
/// whole exchange is bounded by a per-file deadline.
pub struct AzureLayoutAnalyzer {
    client: reqwest::Client,
    endpoint: Url,
    key: String,
    api_version: String,
    office_model: String,
    pdf_model: String,
    poll_interval: Duration,
    deadline: Duration,
    retry: RetryPolicy,
}

impl AzureLayoutAnalyzer {
    pub fn new(
        settings: &DocumentSettings,
        credentials: &DocumentCredentials,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let base = format!("{}/", credentials.endpoint.trim_end_matches('/'));
        let endpoint = Url::parse(&base).map_err(|e| {
            KoseiError::Config(format!(
                "Invalid document endpoint '{}': {}",
                credentials.endpoint, e
            ))
        })?;

        Ok(Self {
            client: create_http_client(settings.request_timeout())?,
            endpoint,
            key: credentials.key.clone(),
            api_version: settings.api_version.clone(),
            office_model: settings.office_model.clone(),
            pdf_model: settings.pdf_model.clone(),
            poll_interval: settings.poll_interval(),
            deadline: settings.deadline(),
            retry,
        })
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Office files go to the read model, PDFs to the layout model.
    fn model_for(&self, file: &SourceFile) -> &str {
        if file.is_office() {
            &self.office_model
        } else {
            &self.pdf_model
        }
    }

    fn analyze_url(&self, model: &str) -> Result<Url> {
        let mut url = self
            .endpoint
            .join(&format!("formrecognizer/documentModels/{}:analyze", model))
            .map_err(|e| KoseiError::Config(format!("Invalid analyze URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("api-version", &self.api_version);
        Ok(url)
    }

    async fn submit(&self, url: &Url, file: &SourceFile, document: Vec<u8>) -> Result<String> {
        let response = self
            .client
            .post(url.clone())
            .header(KEY_HEADER, &self.key)
            .header("Content-Type", file.mime_type())
            .body(document)
            .send()
            .await?;

        let response = ensure_success(SERVICE, response).await?;
        response
            .headers()
            .get("Operation-Location")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| KoseiError::Service {
                service: SERVICE.to_string(),
                status: Some(response.status().as_u16()),
                message: "response carried no Operation-Location header".to_string(),
            })
    }

    async fn poll(&self, location: &str) -> Result<AnalyzeOperation> {
        let response = self
            .client
            .get(location)
            .header(KEY_HEADER, &self.key)
            .send()
            .await?;

        let response = ensure_success(SERVICE, response).await?;
        Ok(response.json::<AnalyzeOperation>().await?)
    }

    async fn run(&self, file: &SourceFile) -> Result<AnalyzeResult> {
        let document = tokio::fs::read(&file.path).await?;
        let url = self.analyze_url(self.model_for(file))?;
        debug!("Submitting {} bytes to {}", document.len(), url.path());

        let location = self
            .retry
            .run("layout analysis submit", || {
                self.submit(&url, file, document.clone())
            })
            .await?;

        loop {
            let operation = self
                .retry
                .run("layout analysis poll", || self.poll(&location))
                .await?;

            match operation.status {
                OperationStatus::Succeeded => return Ok(operation.analyze_result.unwrap_or_default()),
                OperationStatus::Failed => {
                    return Err(KoseiError::Service {
                        service: SERVICE.to_string(),
                        status: None,
                        message: operation
                            .error
                            .map(|e| e.to_string())
                            .unwrap_or_else(|| "analysis failed".to_string()),
                    })
                }
                status => {
                    debug!("Analysis {:?}; polling again", status);
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }
}

#[async_trait]
impl LayoutAnalyzer for AzureLayoutAnalyzer {
    #[instrument(skip(self, file), fields(file = %file.display_name))]
    async fn analyze(&self, file: &SourceFile) -> Result<ExtractedUnit> {
        let result = match tokio::time::timeout(self.deadline, self.run(file)).await {
            Ok(result) => result,
            Err(_) => {
                return Err(KoseiError::Extraction {
                    file: file.display_name.clone(),
                    cause: format!(
                        "analysis did not finish within {} seconds",
                        self.deadline.as_secs()
                    ),
                })
            }
        };

        let result = result.map_err(|e| KoseiError::Extraction {
            file: file.display_name.clone(),
            cause: e.to_string(),
        })?;

        let unit = ExtractedUnit::new(file, result.into_fragments());
        info!("Extracted {} fragments", unit.fragments.len());
        Ok(unit)
    }
}
