//! Ollama embedding provider for local inference.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::types::{EmbeddingClient, EmbeddingError};

const DEFAULT_API_BASE: &str = "http://localhost:11434";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Client for Ollama's `/api/embeddings` endpoint. No API key required.
pub struct OllamaEmbeddings {
    client: reqwest::Client,
    model: String,
    api_base: String,
}

impl OllamaEmbeddings {
    /// Create a new client for the given model (e.g. "nomic-embed-text").
    pub fn new(model: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            model: model.into(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

#[derive(Debug, Serialize)]
struct OllamaEmbeddingsRequest {
    model: String,
    prompt: String,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbeddingsResponse {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingClient for OllamaEmbeddings {
    fn provider(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let request = OllamaEmbeddingsRequest {
            model: self.model.clone(),
            prompt: text.to_string(),
        };

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.api_base))
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EmbeddingError::Timeout(DEFAULT_TIMEOUT)
                } else {
                    EmbeddingError::Http(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let message = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api { status, message });
        }

        let parsed: OllamaEmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Json(e.to_string()))?;

        if parsed.embedding.is_empty() {
            return Err(EmbeddingError::EmptyResponse);
        }
        Ok(parsed.embedding)
    }
}
