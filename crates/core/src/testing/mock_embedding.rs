//! Mock embedding client for testing.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use crate::embeddings::{EmbeddingClient, EmbeddingError};

const MOCK_DIMENSIONS: usize = 8;

/// Mock implementation of the EmbeddingClient trait.
///
/// Vectors are derived deterministically from the input so identical text
/// always embeds identically.
#[derive(Debug, Clone, Default)]
pub struct MockEmbeddingClient {
    embedded: Arc<RwLock<Vec<String>>>,
    fail_all: Arc<RwLock<bool>>,
}

impl MockEmbeddingClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_all(&self, fail: bool) {
        *self.fail_all.write().unwrap() = fail;
    }

    /// Texts embedded so far, in order.
    pub fn embedded(&self) -> Vec<String> {
        self.embedded.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.embedded.read().unwrap().len()
    }
}

#[async_trait]
impl EmbeddingClient for MockEmbeddingClient {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-embedding"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if *self.fail_all.read().unwrap() {
            return Err(EmbeddingError::Api {
                status: 503,
                message: "mock embedding unavailable".to_string(),
            });
        }

        self.embedded.write().unwrap().push(text.to_string());

        let seed = text.bytes().fold(0u32, |acc, b| {
            acc.wrapping_mul(31).wrapping_add(b as u32)
        });
        let vector = (0..MOCK_DIMENSIONS)
            .map(|i| ((seed.wrapping_add(i as u32) % 1000) as f32) / 1000.0)
            .collect();
        Ok(vector)
    }
}
