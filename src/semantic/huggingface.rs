use serde_json::json;

use super::embeddings::{numeric_array, EmbeddingError, EmbeddingProvider};
use super::http::ProviderClient;
use crate::config::EmbeddingConfig;

/// Hugging Face Inference API (feature extraction).
///
/// The default model, BAAI/bge-small-en-v1.5, answers `{"inputs": text}` with
/// a flat array of 384 numbers. Cold models answer 503 until loaded.
pub struct HuggingFaceProvider {
    client: ProviderClient,
}

impl HuggingFaceProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        Ok(Self {
            client: ProviderClient::new("Hugging Face", config)?,
        })
    }
}

impl EmbeddingProvider for HuggingFaceProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let resp = self.client.post_json(&json!({ "inputs": text }))?;

        let embedding = numeric_array(&resp).ok_or_else(|| {
            EmbeddingError::MalformedResponse(format!("expected a flat array of numbers, got {resp}"))
        })?;

        log::debug!(
            "embedded {} chars into {} dimensions via {}",
            text.len(),
            embedding.len(),
            self.client.endpoint()
        );
        Ok(embedding)
    }

    fn name(&self) -> &'static str {
        "huggingface"
    }
}
