use serde_json::json;

use super::embeddings::{numeric_array, EmbeddingError, EmbeddingProvider};
use super::http::ProviderClient;
use crate::config::EmbeddingConfig;

/// OpenAI embeddings endpoint, the alternate provider.
pub struct OpenAiProvider {
    client: ProviderClient,
    model: String,
}

impl OpenAiProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        Ok(Self {
            client: ProviderClient::new("OpenAI", config)?,
            model: config.model(),
        })
    }
}

impl EmbeddingProvider for OpenAiProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let resp = self
            .client
            .post_json(&json!({ "model": self.model, "input": text }))?;

        resp.pointer("/data/0/embedding")
            .and_then(numeric_array)
            .ok_or_else(|| EmbeddingError::MalformedResponse("no embedding returned from provider".to_string()))
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
