use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::media::MediaConfig;
use crate::pipeline::PipelineConfig;
use crate::queue::QueueConfig;
use crate::renderer::RendererConfig;
use crate::retry::RetryPolicy;
use crate::storage::StorageConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Speech synthesis is the one section with no workable default: it
    /// carries the API key.
    pub speech: SpeechConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub renderer: RendererConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    "0.0.0.0".parse().unwrap()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("courseforge.db")
}

/// Workspace configuration: where generated artifacts land on disk.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkspaceConfig {
    #[serde(default = "default_workspace_root")]
    pub root: PathBuf,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: default_workspace_root(),
        }
    }
}

fn default_workspace_root() -> PathBuf {
    PathBuf::from("generated")
}

/// Completion model configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// Completion backend
    #[serde(default = "default_llm_provider")]
    pub provider: LlmProvider,
    /// Anthropic-specific configuration (required when provider = "anthropic")
    #[serde(default)]
    pub anthropic: Option<AnthropicConfig>,
    /// Ollama-specific configuration
    #[serde(default)]
    pub ollama: Option<OllamaLlmConfig>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            anthropic: None,
            ollama: None,
        }
    }
}

fn default_llm_provider() -> LlmProvider {
    LlmProvider::Ollama
}

/// Available completion backends
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    Anthropic,
    Ollama,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicConfig {
    pub api_key: String,
    #[serde(default = "default_anthropic_model")]
    pub model: String,
}

fn default_anthropic_model() -> String {
    "claude-3-5-sonnet-latest".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct OllamaLlmConfig {
    #[serde(default = "default_ollama_model")]
    pub model: String,
    /// Ollama server URL (e.g. "http://localhost:11434"); unset uses the
    /// client default.
    #[serde(default)]
    pub api_base: Option<String>,
}

impl Default for OllamaLlmConfig {
    fn default() -> Self {
        Self {
            model: default_ollama_model(),
            api_base: None,
        }
    }
}

fn default_ollama_model() -> String {
    "llama3.1".to_string()
}

/// Speech synthesis configuration (ElevenLabs)
#[derive(Debug, Clone, Deserialize)]
pub struct SpeechConfig {
    pub api_key: String,
    #[serde(default = "default_voice_id")]
    pub voice_id: String,
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub api_base: Option<String>,
}

fn default_voice_id() -> String {
    // "Rachel", the stock narration voice.
    "21m00Tcm4TlvDq8ikWAM".to_string()
}

/// Embedding model configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingsConfig {
    /// Embedding backend
    #[serde(default = "default_embeddings_provider")]
    pub provider: EmbeddingsProvider,
    /// OpenAI-specific configuration (required when provider = "openai")
    #[serde(default)]
    pub openai: Option<OpenAiEmbeddingsConfig>,
    /// Ollama-specific configuration
    #[serde(default)]
    pub ollama: Option<OllamaEmbeddingsConfig>,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            provider: default_embeddings_provider(),
            openai: None,
            ollama: None,
        }
    }
}

fn default_embeddings_provider() -> EmbeddingsProvider {
    EmbeddingsProvider::Ollama
}

/// Available embedding backends
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingsProvider {
    OpenAi,
    Ollama,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiEmbeddingsConfig {
    pub api_key: String,
    #[serde(default = "default_openai_embedding_model")]
    pub model: String,
}

fn default_openai_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct OllamaEmbeddingsConfig {
    #[serde(default = "default_ollama_embedding_model")]
    pub model: String,
    #[serde(default)]
    pub api_base: Option<String>,
}

impl Default for OllamaEmbeddingsConfig {
    fn default() -> Self {
        Self {
            model: default_ollama_embedding_model(),
            api_base: None,
        }
    }
}

fn default_ollama_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub workspace: WorkspaceConfig,
    pub llm: SanitizedLlmConfig,
    pub speech: SanitizedSpeechConfig,
    pub embeddings: SanitizedEmbeddingsConfig,
    pub storage: SanitizedStorageConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedLlmConfig {
    pub provider: String,
    pub model: String,
    pub api_key_configured: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedSpeechConfig {
    pub voice_id: String,
    pub api_key_configured: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedEmbeddingsConfig {
    pub provider: String,
    pub model: String,
    pub api_key_configured: bool,
}

/// Sanitized storage config (credentials hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedStorageConfig {
    pub bucket: String,
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    pub credentials_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let llm = match config.llm.provider {
            LlmProvider::Anthropic => SanitizedLlmConfig {
                provider: "anthropic".to_string(),
                model: config
                    .llm
                    .anthropic
                    .as_ref()
                    .map(|a| a.model.clone())
                    .unwrap_or_else(default_anthropic_model),
                api_key_configured: config
                    .llm
                    .anthropic
                    .as_ref()
                    .is_some_and(|a| !a.api_key.is_empty()),
            },
            LlmProvider::Ollama => SanitizedLlmConfig {
                provider: "ollama".to_string(),
                model: config
                    .llm
                    .ollama
                    .as_ref()
                    .map(|o| o.model.clone())
                    .unwrap_or_else(default_ollama_model),
                api_key_configured: true,
            },
        };
        let embeddings = match config.embeddings.provider {
            EmbeddingsProvider::OpenAi => SanitizedEmbeddingsConfig {
                provider: "openai".to_string(),
                model: config
                    .embeddings
                    .openai
                    .as_ref()
                    .map(|o| o.model.clone())
                    .unwrap_or_else(default_openai_embedding_model),
                api_key_configured: config
                    .embeddings
                    .openai
                    .as_ref()
                    .is_some_and(|o| !o.api_key.is_empty()),
            },
            EmbeddingsProvider::Ollama => SanitizedEmbeddingsConfig {
                provider: "ollama".to_string(),
                model: config
                    .embeddings
                    .ollama
                    .as_ref()
                    .map(|o| o.model.clone())
                    .unwrap_or_else(default_ollama_embedding_model),
                api_key_configured: true,
            },
        };
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            workspace: config.workspace.clone(),
            llm,
            speech: SanitizedSpeechConfig {
                voice_id: config.speech.voice_id.clone(),
                api_key_configured: !config.speech.api_key.is_empty(),
            },
            embeddings,
            storage: SanitizedStorageConfig {
                bucket: config.storage.bucket.clone(),
                region: config.storage.region.clone(),
                endpoint: config.storage.endpoint.clone(),
                credentials_configured: !config.storage.access_key_id.is_empty()
                    && !config.storage.secret_access_key.is_empty(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_config() -> Config {
        toml::from_str(
            r#"
[speech]
api_key = "sk-test"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_deserialize_minimal_config() {
        let config = minimal_config();
        assert_eq!(config.speech.api_key, "sk-test");
        assert_eq!(config.speech.voice_id, default_voice_id());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.database.path.to_str().unwrap(), "courseforge.db");
        assert_eq!(config.workspace.root.to_str().unwrap(), "generated");
        assert_eq!(config.llm.provider, LlmProvider::Ollama);
        assert_eq!(config.embeddings.provider, EmbeddingsProvider::Ollama);
    }

    #[test]
    fn test_deserialize_missing_speech_fails() {
        let result: Result<Config, _> = toml::from_str(
            r#"
[server]
port = 8080
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_custom_sections() {
        let toml = r#"
[speech]
api_key = "sk-test"
voice_id = "custom-voice"

[server]
host = "127.0.0.1"
port = 9000

[database]
path = "/data/courses.sqlite"

[workspace]
root = "/data/artifacts"

[queue]
max_attempts = 5
worker_slots = 4
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
        assert_eq!(config.database.path.to_str().unwrap(), "/data/courses.sqlite");
        assert_eq!(config.workspace.root.to_str().unwrap(), "/data/artifacts");
        assert_eq!(config.speech.voice_id, "custom-voice");
        assert_eq!(config.queue.max_attempts, 5);
        assert_eq!(config.queue.worker_slots, 4);
    }

    #[test]
    fn test_deserialize_anthropic_provider() {
        let toml = r#"
[speech]
api_key = "sk-test"

[llm]
provider = "anthropic"

[llm.anthropic]
api_key = "sk-ant-key"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.llm.provider, LlmProvider::Anthropic);

        let anthropic = config.llm.anthropic.as_ref().unwrap();
        assert_eq!(anthropic.api_key, "sk-ant-key");
        assert_eq!(anthropic.model, default_anthropic_model()); // default
    }

    #[test]
    fn test_deserialize_openai_embeddings() {
        let toml = r#"
[speech]
api_key = "sk-test"

[embeddings]
provider = "openai"

[embeddings.openai]
api_key = "sk-openai"
model = "text-embedding-3-large"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.embeddings.provider, EmbeddingsProvider::OpenAi);

        let openai = config.embeddings.openai.as_ref().unwrap();
        assert_eq!(openai.api_key, "sk-openai");
        assert_eq!(openai.model, "text-embedding-3-large");
    }

    #[test]
    fn test_sanitized_config_redacts_secrets() {
        let config = minimal_config();
        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.speech.api_key_configured);
        assert_eq!(sanitized.llm.provider, "ollama");
        assert_eq!(sanitized.llm.model, "llama3.1");
        assert_eq!(sanitized.embeddings.provider, "ollama");
        assert!(!sanitized.storage.credentials_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("sk-test"));
    }

    #[test]
    fn test_sanitized_config_anthropic_key_presence() {
        let toml = r#"
[speech]
api_key = "sk-test"

[llm]
provider = "anthropic"

[llm.anthropic]
api_key = ""
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let sanitized = SanitizedConfig::from(&config);
        assert_eq!(sanitized.llm.provider, "anthropic");
        assert!(!sanitized.llm.api_key_configured); // empty key counts as absent
    }
}
