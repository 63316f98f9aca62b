use crate::{
    catalog::CatalogError,
    config::API_KEY_ENV,
    semantic::{EmbeddingError, SemanticError},
};

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    MissingEmbedding(String),

    #[error("{0}")]
    Configuration(String),

    #[error("{0}")]
    Provider(String),

    #[error("{0}")]
    MalformedResponse(String),

    #[error("io error: {0:?}")]
    IO(#[from] std::io::Error),

    #[error("unexpected error: {0:?}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::AlreadyExists(_) => "already_exists",
            AppError::Conflict(_) => "conflict",
            AppError::Validation(_) => "validation",
            AppError::MissingEmbedding(_) => "embedding_missing",
            AppError::Configuration(_) => "configuration",
            AppError::Provider(_) => "provider",
            AppError::MalformedResponse(_) => "malformed_response",
            AppError::IO(_) => "io",
            AppError::Other(_) => "internal",
        }
    }

    /// Remediation hint shown next to the message.
    pub fn hint(&self) -> Option<String> {
        match self {
            AppError::Configuration(_) => Some(format!(
                "set embedding.api_key in config.yaml or export {API_KEY_ENV}"
            )),
            AppError::Provider(_) => Some(
                "the embedding provider failed or is still loading the model, try again later"
                    .to_string(),
            ),
            AppError::MissingEmbedding(_) => {
                Some("run POST /api/ai/embeddings/recompute first".to_string())
            }
            _ => None,
        }
    }

    /// Failure on the client side of the request.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AppError::NotFound(_)
                | AppError::AlreadyExists(_)
                | AppError::Conflict(_)
                | AppError::Validation(_)
                | AppError::MissingEmbedding(_)
        )
    }

    fn from_embedding(err: EmbeddingError, message: String) -> Self {
        match err {
            EmbeddingError::Configuration(_) => AppError::Configuration(message),
            EmbeddingError::Provider { .. } | EmbeddingError::Transport(_) => {
                AppError::Provider(message)
            }
            EmbeddingError::MalformedResponse(_) => AppError::MalformedResponse(message),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        let message = err.to_string();
        match err {
            CatalogError::NotFound { .. } => AppError::NotFound(message),
            CatalogError::AlreadyExists(_) => AppError::AlreadyExists(message),
            CatalogError::Conflict(_) => AppError::Conflict(message),
            CatalogError::Validation(_) => AppError::Validation(message),
            CatalogError::Io(err) => AppError::IO(err),
            CatalogError::Csv(_) | CatalogError::Json(_) => AppError::Other(anyhow::anyhow!(message)),
            CatalogError::Other(err) => AppError::Other(err),
        }
    }
}

impl From<EmbeddingError> for AppError {
    fn from(err: EmbeddingError) -> Self {
        let message = err.to_string();
        AppError::from_embedding(err, message)
    }
}

impl From<SemanticError> for AppError {
    fn from(err: SemanticError) -> Self {
        let message = err.to_string();
        match err {
            SemanticError::Embedding(err) => AppError::from_embedding(err, message),
            SemanticError::RecomputeFailed { source, .. } => {
                AppError::from_embedding(source, message)
            }
            SemanticError::NotFound(_) => AppError::NotFound(message),
            SemanticError::MissingEmbedding(_) => AppError::MissingEmbedding(message),
            SemanticError::InvalidQuery(_) => AppError::Validation(message),
            SemanticError::Catalog(err) => err.into(),
        }
    }
}
