//! Embedding types and provider trait.

use async_trait::async_trait;
use std::time::Duration;

/// Error type for embedding operations.
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Empty embedding response")]
    EmptyResponse,

    #[error("Not configured")]
    NotConfigured,
}

impl EmbeddingError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Json(_) | Self::EmptyResponse | Self::NotConfigured => false,
        }
    }
}

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Provider name (e.g., "openai", "ollama")
    fn provider(&self) -> &str;

    /// Model name (e.g., "text-embedding-3-small")
    fn model(&self) -> &str;

    /// Embed one text chunk into a fixed-length vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(EmbeddingError::Http("reset".into()).is_retryable());
        assert!(EmbeddingError::Api {
            status: 503,
            message: "unavailable".into()
        }
        .is_retryable());
        assert!(!EmbeddingError::Api {
            status: 401,
            message: "bad key".into()
        }
        .is_retryable());
        assert!(!EmbeddingError::EmptyResponse.is_retryable());
    }
}
