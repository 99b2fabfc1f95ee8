//! Speech synthesis types and provider trait.

use async_trait::async_trait;
use std::time::Duration;

/// Error type for speech synthesis operations.
#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Empty audio response")]
    EmptyAudio,

    #[error("Not configured")]
    NotConfigured,
}

/// Trait for speech-synthesis providers.
#[async_trait]
pub trait SpeechClient: Send + Sync {
    /// Provider name (e.g., "elevenlabs")
    fn provider(&self) -> &str;

    /// Voice identifier used for synthesis.
    fn voice(&self) -> &str;

    /// Synthesize one segment of narration into encoded audio bytes.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SpeechError>;
}
