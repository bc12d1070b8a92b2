//! HTTP client construction shared by the service adapters.

use crate::error::{KoseiError, Result};
use async_openai::{config::OpenAIConfig, Client};
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use std::time::Duration;

/// Create a plain HTTP client with a per-request timeout.
pub fn create_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| KoseiError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Create a client for an OpenAI-compatible chat completion endpoint.
///
/// The client's own backoff gives up immediately, so a rate-limited or
/// failing call surfaces at once and [`crate::retry::RetryPolicy`] alone
/// decides whether to try again.
pub fn create_generation_client(
    api_base: &str,
    api_key: &str,
    timeout: Duration,
) -> Result<Client<OpenAIConfig>> {
    let config = OpenAIConfig::new()
        .with_api_base(api_base.trim_end_matches('/'))
        .with_api_key(api_key);

    Ok(Client::with_config(config)
        .with_http_client(create_http_client(timeout)?)
        .with_backoff(no_backoff()))
}

fn no_backoff() -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build()
}

/// Turn a non-success response into a [`KoseiError::Service`] carrying the
/// status code and body.
pub async fn ensure_success(service: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.trim().chars().take(500).collect()
    };

    Err(KoseiError::Service {
        service: service.to_string(),
        status: Some(status.as_u16()),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_client_never_backs_off() {
        use backoff::backoff::Backoff;

        let mut backoff = no_backoff();
        std::thread::sleep(Duration::from_millis(1));
        assert_eq!(backoff.next_backoff(), None);
    }

    #[test]
    fn test_clients_build() {
        assert!(create_http_client(Duration::from_secs(5)).is_ok());
        assert!(create_generation_client("http://localhost:1/v1/", "key", Duration::from_secs(5)).is_ok());
    }
}
