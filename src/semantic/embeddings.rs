//! Embedding provider abstraction.
//!
//! A provider turns a piece of text into a fixed-length vector. The concrete
//! provider is picked from `embedding.provider` in the config at startup.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use super::huggingface::HuggingFaceProvider;
use super::openai::OpenAiProvider;
use crate::config::{EmbeddingConfig, ProviderKind};

/// Error type for embedding operations
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    /// No usable credential. Never retried.
    #[error("{0}")]
    Configuration(String),

    /// Upstream answered with a non-success status and no retry is left.
    #[error("{provider} request failed (attempt {attempts}/{max_attempts}): HTTP {status} - {body}")]
    Provider {
        provider: &'static str,
        status: u16,
        body: String,
        attempts: u32,
        max_attempts: u32,
    },

    #[error("embedding request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected embedding response format: {0}")]
    MalformedResponse(String),
}

pub trait EmbeddingProvider: Send + Sync {
    /// Embeds a single text. Every call goes to the provider; nothing is cached.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    fn name(&self) -> &'static str;
}

/// How a provider retries while the upstream model is loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, counting the first one
    pub max_attempts: u32,
    /// Delay before the first retry, doubled for each following retry
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(3000),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

/// Builds the provider selected in the config.
pub fn provider_from_config(
    config: &EmbeddingConfig,
) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
    log::info!(
        "using {:?} embeddings with model '{}'",
        config.provider,
        config.model()
    );

    Ok(match config.provider {
        ProviderKind::HuggingFace => Arc::new(HuggingFaceProvider::new(config)?),
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(config)?),
    })
}

/// Reads a non-empty JSON array of numbers.
pub(crate) fn numeric_array(value: &Value) -> Option<Vec<f32>> {
    let values = value.as_array()?;
    if values.is_empty() {
        return None;
    }

    values
        .iter()
        .map(|v| v.as_f64().map(|n| n as f32))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(3000));
        assert_eq!(policy.backoff(2), Duration::from_millis(6000));
        assert_eq!(policy.backoff(3), Duration::from_millis(12000));
    }

    #[test]
    fn test_policy_from_default_config() {
        let policy = RetryPolicy::from_config(&EmbeddingConfig::default());
        assert_eq!(policy, RetryPolicy::default());
    }

    #[test]
    fn test_numeric_array() {
        assert_eq!(numeric_array(&json!([0.5, -1, 2.0])), Some(vec![0.5, -1.0, 2.0]));
        assert_eq!(numeric_array(&json!([])), None);
        assert_eq!(numeric_array(&json!([0.5, "x"])), None);
        assert_eq!(numeric_array(&json!([[0.5, 0.1]])), None);
        assert_eq!(numeric_array(&json!({"error": "loading"})), None);
    }
}
