//! Ollama completion provider for local inference.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::types::{CompletionRequest, CompletionResponse, LlmClient, LlmError, LlmUsage};

const DEFAULT_API_BASE: &str = "http://localhost:11434";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Ollama API client.
///
/// Connects to a local Ollama server; no API key required. Local models are
/// slower than hosted ones, so the default request timeout is generous.
pub struct OllamaClient {
    client: reqwest::Client,
    model: String,
    api_base: String,
}

impl OllamaClient {
    /// Create a new Ollama client for the given model (e.g. "llama3").
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

    /// Set a custom API base URL.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    model: String,
    response: String,
    /// Number of tokens in the response
    #[serde(default)]
    eval_count: u32,
    /// Number of tokens in the prompt
    #[serde(default)]
    prompt_eval_count: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaErrorResponse {
    error: String,
}

#[async_trait]
impl LlmClient for OllamaClient {
    fn provider(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let api_request = OllamaRequest {
            model: self.model.clone(),
            prompt: request.prompt,
            system: request.system,
            stream: false,
            options: Some(OllamaOptions {
                // Ollama needs explicit 0 for deterministic output
                temperature: Some(request.temperature),
                num_predict: Some(request.max_tokens),
            }),
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.api_base))
            .header("content-type", "application/json")
            .json(&api_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(DEFAULT_TIMEOUT)
                } else {
                    LlmError::Http(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status != 200 {
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OllamaErrorResponse>(&error_text)
                .map(|e| e.error)
                .unwrap_or(error_text);
            return Err(LlmError::Api { status, message });
        }

        let api_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Json(e.to_string()))?;

        Ok(CompletionResponse {
            text: api_response.response,
            usage: LlmUsage {
                input_tokens: api_response.prompt_eval_count,
                output_tokens: api_response.eval_count,
            },
            model: api_response.model,
        })
    }
}
