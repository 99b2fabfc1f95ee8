//! Mock speech client for testing.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use crate::speech::{SpeechClient, SpeechError};

/// Mock implementation of the SpeechClient trait.
///
/// Synthesized audio is a recognizable byte tag around the input text.
/// Individual segments can be made to fail by substring so tests can
/// exercise the skip-and-continue behavior without failing everything.
#[derive(Debug, Clone, Default)]
pub struct MockSpeechClient {
    synthesized: Arc<RwLock<Vec<String>>>,
    fail_markers: Arc<RwLock<Vec<String>>>,
    fail_all: Arc<RwLock<bool>>,
}

impl MockSpeechClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail synthesis for any segment containing `marker`.
    pub fn fail_when_contains(&self, marker: impl Into<String>) {
        self.fail_markers.write().unwrap().push(marker.into());
    }

    /// Fail every synthesis call.
    pub fn set_fail_all(&self, fail: bool) {
        *self.fail_all.write().unwrap() = fail;
    }

    /// Texts synthesized so far, in order.
    pub fn synthesized(&self) -> Vec<String> {
        self.synthesized.read().unwrap().clone()
    }
}

#[async_trait]
impl SpeechClient for MockSpeechClient {
    fn provider(&self) -> &str {
        "mock"
    }

    fn voice(&self) -> &str {
        "mock-voice"
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SpeechError> {
        if *self.fail_all.read().unwrap() {
            return Err(SpeechError::Api {
                status: 503,
                message: "mock speech unavailable".to_string(),
            });
        }
        {
            let markers = self.fail_markers.read().unwrap();
            if markers.iter().any(|m| text.contains(m.as_str())) {
                return Err(SpeechError::Api {
                    status: 500,
                    message: format!("mock failure for segment: {}", text),
                });
            }
        }

        self.synthesized.write().unwrap().push(text.to_string());
        Ok(format!("mock-audio:{}", text).into_bytes())
    }
}
