use std::time::Duration;

use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;

use super::embeddings::{EmbeddingError, RetryPolicy};
use crate::config::{EmbeddingConfig, API_KEY_ENV};

/// Longest response body kept in error messages
const MAX_ERROR_BODY: usize = 512;

/// Blocking JSON client shared by the HTTP embedding providers.
///
/// Sends one POST per attempt with a bearer token. A 503 means the upstream
/// model is still loading and is retried with exponential backoff; any other
/// non-2xx status ends the call.
pub struct ProviderClient {
    provider: &'static str,
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: Option<String>,
    retry: RetryPolicy,
}

impl ProviderClient {
    pub fn new(provider: &'static str, config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            provider,
            client,
            endpoint: config.endpoint(),
            api_key: config.api_key().map(str::to_string),
            retry: RetryPolicy::from_config(config),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn post_json<B: Serialize + ?Sized>(&self, body: &B) -> Result<Value, EmbeddingError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            EmbeddingError::Configuration(format!(
                "{} API key not configured (set embedding.api_key in config.yaml or {API_KEY_ENV})",
                self.provider
            ))
        })?;

        let max_attempts = self.retry.max_attempts;

        for attempt in 1..=max_attempts {
            let resp = self
                .client
                .post(&self.endpoint)
                .bearer_auth(api_key)
                .json(body)
                .send()?;

            let status = resp.status();
            log::debug!(
                "{} [attempt {attempt}/{max_attempts}]: status={status}",
                self.provider
            );

            if status.is_success() {
                let text = resp.text()?;
                return serde_json::from_str(&text).map_err(|err| {
                    EmbeddingError::MalformedResponse(format!("{err}: {}", truncate(&text)))
                });
            }

            let body = resp.text().unwrap_or_default();

            if status == StatusCode::SERVICE_UNAVAILABLE && attempt < max_attempts {
                let delay = self.retry.backoff(attempt);
                log::warn!(
                    "{}: model loading, waiting {}ms before retry {}",
                    self.provider,
                    delay.as_millis(),
                    attempt + 1
                );
                std::thread::sleep(delay);
                continue;
            }

            let err = EmbeddingError::Provider {
                provider: self.provider,
                status: status.as_u16(),
                body: truncate(&body),
                attempts: attempt,
                max_attempts,
            };
            log::debug!("{err}");
            return Err(err);
        }

        Err(EmbeddingError::Configuration(
            "embedding.max_attempts must be greater than 0".to_string(),
        ))
    }
}

fn truncate(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let truncated: String = body.chars().take(MAX_ERROR_BODY).collect();
    format!("{truncated}...")
}
