//! Completion service clients.
//!
//! The pipeline talks to a language model for slide markdown, narration
//! transcripts, quizzes and flashcards. Providers implement [`LlmClient`];
//! stages receive an injected [`CompletionService`] that layers bounded
//! retry with exponential backoff on top of whichever provider is
//! configured.

mod anthropic;
mod ollama;
mod service;
mod types;

pub use anthropic::AnthropicClient;
pub use ollama::OllamaClient;
pub use service::CompletionService;
pub use types::{CompletionRequest, CompletionResponse, LlmClient, LlmError, LlmUsage};
