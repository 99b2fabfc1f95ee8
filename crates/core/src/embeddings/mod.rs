//! Embedding service clients.
//!
//! Vector embeddings power course search: one whole-course vector plus one
//! per content chunk (each subtopic, each section). Providers implement
//! [`EmbeddingClient`]; the stage uses an [`EmbeddingService`] that retries
//! transient failures with the same bounded policy as completions.

mod ollama;
mod openai;
mod service;
mod types;

pub use ollama::OllamaEmbeddings;
pub use openai::OpenAiEmbeddings;
pub use service::EmbeddingService;
pub use types::{EmbeddingClient, EmbeddingError};
