//! Embedding-based similarity over the book catalog.
//!
//! # Architecture
//!
//! - `embeddings`: provider trait, retry policy and provider selection
//! - `huggingface`, `openai`: the two HTTP providers
//! - `rank`: cosine similarity and brute-force ranking
//! - `preprocess`: text assembled from a book for embedding
//! - `service`: recompute, recommend-by-book and free-text search

pub mod embeddings;
mod http;
pub mod huggingface;
pub mod openai;
pub mod preprocess;
pub mod rank;
mod service;

pub use embeddings::{provider_from_config, EmbeddingError, EmbeddingProvider};
pub use rank::ScoredResult;
pub use service::{
    RecomputeReport, SemanticError, SemanticService, DEFAULT_RECOMMENDATION_LIMIT,
    DEFAULT_SEARCH_LIMIT,
};
