use super::types::{Config, EmbeddingsProvider, LlmProvider};
use super::ConfigError;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Speech API key is set (the section itself is enforced by serde)
/// - Provider-specific sections exist for providers that need keys
/// - Queue limits are usable
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.speech.api_key.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "speech.api_key must be set".to_string(),
        ));
    }

    if config.llm.provider == LlmProvider::Anthropic {
        let configured = config
            .llm
            .anthropic
            .as_ref()
            .is_some_and(|a| !a.api_key.trim().is_empty());
        if !configured {
            return Err(ConfigError::ValidationError(
                "llm.anthropic.api_key is required when llm.provider = \"anthropic\"".to_string(),
            ));
        }
    }

    if config.embeddings.provider == EmbeddingsProvider::OpenAi {
        let configured = config
            .embeddings
            .openai
            .as_ref()
            .is_some_and(|o| !o.api_key.trim().is_empty());
        if !configured {
            return Err(ConfigError::ValidationError(
                "embeddings.openai.api_key is required when embeddings.provider = \"openai\""
                    .to_string(),
            ));
        }
    }

    if config.queue.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "queue.max_attempts cannot be 0".to_string(),
        ));
    }
    if config.queue.worker_slots == 0 {
        return Err(ConfigError::ValidationError(
            "queue.worker_slots cannot be 0".to_string(),
        ));
    }

    if config.storage.bucket.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "storage.bucket cannot be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;

    fn valid_config() -> Config {
        load_config_from_str(
            r#"
[speech]
api_key = "sk-test"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = valid_config();
        config.server.port = 0;
        let result = validate_config(&config);
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_blank_speech_key_fails() {
        let mut config = valid_config();
        config.speech.api_key = "   ".to_string();
        let result = validate_config(&config);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_anthropic_without_key_fails() {
        let config = load_config_from_str(
            r#"
[speech]
api_key = "sk-test"

[llm]
provider = "anthropic"
"#,
        )
        .unwrap();
        let result = validate_config(&config);
        assert!(result.is_err());
        let message = result.unwrap_err().to_string();
        assert!(message.contains("llm.anthropic.api_key"));
    }

    #[test]
    fn test_validate_openai_embeddings_without_key_fails() {
        let config = load_config_from_str(
            r#"
[speech]
api_key = "sk-test"

[embeddings]
provider = "openai"
"#,
        )
        .unwrap();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_worker_slots_fails() {
        let mut config = valid_config();
        config.queue.worker_slots = 0;
        assert!(validate_config(&config).is_err());
    }
}
