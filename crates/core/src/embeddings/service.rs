//! Retrying embedding service.

use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

use crate::metrics;
use crate::retry::RetryPolicy;

use super::types::{EmbeddingClient, EmbeddingError};

/// Embedding client with bounded retry.
#[derive(Clone)]
pub struct EmbeddingService {
    client: Arc<dyn EmbeddingClient>,
    retry: RetryPolicy,
}

impl EmbeddingService {
    pub fn new(client: Arc<dyn EmbeddingClient>, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    pub fn model(&self) -> &str {
        self.client.model()
    }

    /// Embed one chunk, retrying transient failures.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut attempt: u32 = 1;
        loop {
            let started = Instant::now();
            match self.client.embed(text).await {
                Ok(vector) => {
                    metrics::EXTERNAL_SERVICE_DURATION
                        .with_label_values(&["embedding"])
                        .observe(started.elapsed().as_secs_f64());
                    metrics::EXTERNAL_SERVICE_REQUESTS
                        .with_label_values(&["embedding", "success"])
                        .inc();
                    return Ok(vector);
                }
                Err(err) => {
                    let status = match err {
                        EmbeddingError::Timeout(_) => "timeout",
                        _ => "error",
                    };
                    metrics::EXTERNAL_SERVICE_REQUESTS
                        .with_label_values(&["embedding", status])
                        .inc();

                    if err.is_retryable() {
                        if let Some(delay) = self.retry.delay_after(attempt) {
                            warn!(
                                provider = self.client.provider(),
                                attempt,
                                delay_ms = delay.as_millis() as u64,
                                error = %err,
                                "Embedding call failed, retrying"
                            );
                            tokio::time::sleep(delay).await;
                            attempt += 1;
                            continue;
                        }
                    }
                    return Err(err);
                }
            }
        }
    }
}
