//! Retrying completion service.
//!
//! Wraps whichever [`LlmClient`] is configured and applies the bounded
//! retry policy for content calls: transient transport/API failures retry
//! with exponential backoff, while malformed model output surfaces
//! immediately so the caller can discard the unit.

use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::metrics;
use crate::retry::RetryPolicy;

use super::types::{CompletionRequest, LlmClient, LlmError, LlmUsage};

/// Completion client with bounded retry.
#[derive(Clone)]
pub struct CompletionService {
    client: Arc<dyn LlmClient>,
    retry: RetryPolicy,
}

impl CompletionService {
    pub fn new(client: Arc<dyn LlmClient>, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    pub fn provider(&self) -> &str {
        self.client.provider()
    }

    pub fn model(&self) -> &str {
        self.client.model()
    }

    /// Run a completion, retrying transient failures.
    pub async fn generate(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let mut attempt: u32 = 1;
        loop {
            let started = Instant::now();
            match self.client.complete(request.clone()).await {
                Ok(response) => {
                    metrics::EXTERNAL_SERVICE_DURATION
                        .with_label_values(&["completion"])
                        .observe(started.elapsed().as_secs_f64());
                    metrics::EXTERNAL_SERVICE_REQUESTS
                        .with_label_values(&["completion", "success"])
                        .inc();
                    record_usage(self.client.provider(), &response.usage);
                    debug!(
                        provider = self.client.provider(),
                        model = response.model,
                        output_tokens = response.usage.output_tokens,
                        "Completion succeeded"
                    );
                    return Ok(response.text);
                }
                Err(err) => {
                    let status = match err {
                        LlmError::Timeout(_) => "timeout",
                        _ => "error",
                    };
                    metrics::EXTERNAL_SERVICE_REQUESTS
                        .with_label_values(&["completion", status])
                        .inc();

                    if err.is_retryable() {
                        if let Some(delay) = self.retry.delay_after(attempt) {
                            warn!(
                                provider = self.client.provider(),
                                attempt,
                                delay_ms = delay.as_millis() as u64,
                                error = %err,
                                "Completion failed, retrying"
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

    /// Run a completion and parse the response as JSON.
    ///
    /// Models often wrap JSON in markdown fences or preamble text; both are
    /// stripped before parsing. A response that still fails to parse is a
    /// data error, never retried.
    pub async fn generate_json<T: DeserializeOwned>(
        &self,
        request: CompletionRequest,
    ) -> Result<T, LlmError> {
        let text = self.generate(request).await?;
        let cleaned = extract_json(&text);
        serde_json::from_str(cleaned).map_err(|e| {
            let preview: String = cleaned.chars().take(200).collect();
            LlmError::Json(format!("{}: {}", e, preview))
        })
    }
}

fn record_usage(provider: &str, usage: &LlmUsage) {
    metrics::LLM_TOKENS
        .with_label_values(&[provider, "input"])
        .inc_by(usage.input_tokens as u64);
    metrics::LLM_TOKENS
        .with_label_values(&[provider, "output"])
        .inc_by(usage.output_tokens as u64);
}

/// Best-effort extraction of a JSON document from model output.
fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();

    // ```json ... ``` fences
    if let Some(rest) = trimmed.strip_prefix("```") {
        let body = match rest.split_once('\n') {
            Some((_lang, body)) => body,
            None => rest,
        };
        if let Some(end) = body.rfind("```") {
            return body[..end].trim();
        }
    }

    // Preamble before the document ("Here is the quiz: {...}")
    if !trimmed.starts_with('{') && !trimmed.starts_with('[') {
        if let (Some(open), Some(close)) = (trimmed.find('{'), trimmed.rfind('}')) {
            if open < close {
                return trimmed[open..=close].trim();
            }
        }
    }

    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_passthrough() {
        assert_eq!(extract_json(r#"{"a": 1}"#), r#"{"a": 1}"#);
    }

    #[test]
    fn test_extract_json_strips_fences() {
        let fenced = "```json\n{\"a\": 1}\n```";
        assert_eq!(extract_json(fenced), "{\"a\": 1}");
        let bare_fence = "```\n[1, 2]\n```";
        assert_eq!(extract_json(bare_fence), "[1, 2]");
    }

    #[test]
    fn test_extract_json_skips_preamble() {
        let chatty = "Sure! Here is the quiz you asked for:\n{\"quiz\": []}\nHope it helps.";
        assert_eq!(extract_json(chatty), "{\"quiz\": []}");
    }

    #[test]
    fn test_extract_json_leaves_unfixable_text() {
        assert_eq!(extract_json("no json here"), "no json here");
    }
}
