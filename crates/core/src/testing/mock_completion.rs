//! Mock completion client for testing.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use crate::llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError, LlmUsage};

/// Mock implementation of the LlmClient trait.
///
/// Responses are matched by prompt content: the first stubbed marker found
/// in the prompt wins, otherwise the default response is returned. This
/// keeps multi-call pipeline tests readable without scripting exact call
/// order.
#[derive(Debug, Clone)]
pub struct MockCompletionClient {
    rules: Arc<RwLock<Vec<(String, String)>>>,
    default_response: Arc<RwLock<String>>,
    requests: Arc<RwLock<Vec<CompletionRequest>>>,
    fail_remaining: Arc<RwLock<usize>>,
}

impl Default for MockCompletionClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCompletionClient {
    pub fn new() -> Self {
        Self {
            rules: Arc::new(RwLock::new(Vec::new())),
            default_response: Arc::new(RwLock::new("mock completion".to_string())),
            requests: Arc::new(RwLock::new(Vec::new())),
            fail_remaining: Arc::new(RwLock::new(0)),
        }
    }

    /// Return `response` for any prompt containing `marker`. Stubbing the
    /// same marker again replaces the response without changing its match
    /// priority.
    pub fn stub_contains(&self, marker: impl Into<String>, response: impl Into<String>) {
        let marker = marker.into();
        let response = response.into();
        let mut rules = self.rules.write().unwrap();
        match rules.iter_mut().find(|(m, _)| *m == marker) {
            Some(rule) => rule.1 = response,
            None => rules.push((marker, response)),
        }
    }

    /// Response used when no stubbed marker matches.
    pub fn set_default_response(&self, response: impl Into<String>) {
        *self.default_response.write().unwrap() = response.into();
    }

    /// Make the next `n` completions fail with a retryable error.
    pub fn fail_next(&self, n: usize) {
        *self.fail_remaining.write().unwrap() = n;
    }

    /// All recorded requests, in order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.read().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.read().unwrap().len()
    }
}

#[async_trait]
impl LlmClient for MockCompletionClient {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-completion"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.write().unwrap().push(request.clone());

        {
            let mut remaining = self.fail_remaining.write().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(LlmError::Api {
                    status: 503,
                    message: "mock service unavailable".to_string(),
                });
            }
        }

        let text = {
            let rules = self.rules.read().unwrap();
            rules
                .iter()
                .find(|(marker, _)| request.prompt.contains(marker.as_str()))
                .map(|(_, response)| response.clone())
                .unwrap_or_else(|| self.default_response.read().unwrap().clone())
        };

        Ok(CompletionResponse {
            text,
            usage: LlmUsage {
                input_tokens: (request.prompt.len() / 4) as u32,
                output_tokens: 64,
            },
            model: "mock-completion".to_string(),
        })
    }
}
