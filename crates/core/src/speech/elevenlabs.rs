//! ElevenLabs speech-synthesis provider.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use super::types::{SpeechClient, SpeechError};

const DEFAULT_API_BASE: &str = "https://api.elevenlabs.io";
const DEFAULT_MODEL: &str = "eleven_monolingual_v1";

// Matches the per-segment budget the audio stage enforces.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// ElevenLabs API client.
pub struct ElevenLabsClient {
    client: reqwest::Client,
    api_key: String,
    voice_id: String,
    model_id: String,
    api_base: String,
}

impl ElevenLabsClient {
    pub fn new(api_key: impl Into<String>, voice_id: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_key: api_key.into(),
            voice_id: voice_id.into(),
            model_id: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }
}

#[derive(Debug, Serialize)]
struct SynthesisRequest {
    text: String,
    model_id: String,
    voice_settings: VoiceSettings,
}

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 0.8,
        }
    }
}

#[async_trait]
impl SpeechClient for ElevenLabsClient {
    fn provider(&self) -> &str {
        "elevenlabs"
    }

    fn voice(&self) -> &str {
        &self.voice_id
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SpeechError> {
        if self.api_key.is_empty() {
            return Err(SpeechError::NotConfigured);
        }

        let request = SynthesisRequest {
            text: text.to_string(),
            model_id: self.model_id.clone(),
            voice_settings: VoiceSettings::default(),
        };

        let response = self
            .client
            .post(format!(
                "{}/v1/text-to-speech/{}",
                self.api_base, self.voice_id
            ))
            .header("xi-api-key", &self.api_key)
            .header("accept", "audio/mpeg")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SpeechError::Timeout(DEFAULT_TIMEOUT)
                } else {
                    SpeechError::Http(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let message = response.text().await.unwrap_or_default();
            return Err(SpeechError::Api { status, message });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SpeechError::Http(e.to_string()))?;

        if bytes.is_empty() {
            return Err(SpeechError::EmptyAudio);
        }
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = ElevenLabsClient::new("key", "EXAVITQu4vr4xnSDxMaL");
        assert_eq!(client.provider(), "elevenlabs");
        assert_eq!(client.voice(), "EXAVITQu4vr4xnSDxMaL");
        assert_eq!(client.api_base, DEFAULT_API_BASE);
        assert_eq!(client.model_id, DEFAULT_MODEL);
    }

    #[test]
    fn test_builders() {
        let client = ElevenLabsClient::new("key", "voice")
            .with_api_base("http://localhost:8111")
            .with_model("eleven_turbo_v2");
        assert_eq!(client.api_base, "http://localhost:8111");
        assert_eq!(client.model_id, "eleven_turbo_v2");
    }

    #[test]
    fn test_request_serialization() {
        let request = SynthesisRequest {
            text: "Hello class.".to_string(),
            model_id: DEFAULT_MODEL.to_string(),
            voice_settings: VoiceSettings::default(),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"text\":\"Hello class.\""));
        assert!(json.contains("\"stability\":0.5"));
        assert!(json.contains("\"similarity_boost\":0.8"));
    }

    #[tokio::test]
    async fn test_missing_api_key_is_not_configured() {
        let client = ElevenLabsClient::new("", "voice");
        let err = client.synthesize("hi").await.unwrap_err();
        assert!(matches!(err, SpeechError::NotConfigured));
    }
}
