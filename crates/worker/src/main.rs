use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use courseforge_core::config::{EmbeddingsProvider, LlmProvider};
use courseforge_core::embeddings::{
    EmbeddingClient, EmbeddingService, OllamaEmbeddings, OpenAiEmbeddings,
};
use courseforge_core::llm::{AnthropicClient, CompletionService, LlmClient, OllamaClient};
use courseforge_core::media::FfmpegEngine;
use courseforge_core::pipeline::{CoursePipeline, StageContext, WorkspaceLayout};
use courseforge_core::progress::{ProgressStore, RealtimeChannel, SqliteProgressStore};
use courseforge_core::queue::{JobQueue, SqliteJobQueue};
use courseforge_core::renderer::MarpRenderer;
use courseforge_core::speech::{ElevenLabsClient, SpeechClient};
use courseforge_core::storage::S3ObjectStore;
use courseforge_core::store::{CourseStore, SqliteCourseStore};
use courseforge_core::{load_config, validate_config, SanitizedConfig};

use courseforge_worker::api::{create_router, WsBroadcaster};
use courseforge_worker::runner::JobRunner;
use courseforge_worker::state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("COURSEFORGE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    // Log the sanitized view; the raw config carries API keys.
    let config_json = serde_json::to_string(&SanitizedConfig::from(&config)).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!("Configuration loaded (hash {})", &config_hash[..16]);
    debug!("Sanitized configuration: {}", config_json);
    info!("Database path: {:?}", config.database.path);
    info!("Workspace root: {:?}", config.workspace.root);

    // Create SQLite stores, all sharing one database file
    let course_store = Arc::new(
        SqliteCourseStore::new(&config.database.path).context("Failed to create course store")?,
    );
    info!("Course store initialized");

    let progress_store = Arc::new(
        SqliteProgressStore::new(&config.database.path)
            .context("Failed to create progress store")?,
    );
    info!("Progress store initialized");

    let queue = Arc::new(
        SqliteJobQueue::new(&config.database.path, config.queue.clone())
            .context("Failed to create job queue")?,
    );
    info!("Job queue initialized");

    // Create the completion client for the configured provider
    let completion_client: Arc<dyn LlmClient> = match config.llm.provider {
        LlmProvider::Anthropic => {
            let anthropic = config
                .llm
                .anthropic
                .clone()
                .context("[llm.anthropic] must be configured when llm.provider = \"anthropic\"")?;
            info!("Initializing Anthropic completion client ({})", anthropic.model);
            Arc::new(AnthropicClient::new(anthropic.api_key, anthropic.model))
        }
        LlmProvider::Ollama => {
            let ollama = config.llm.ollama.clone().unwrap_or_default();
            info!("Initializing Ollama completion client ({})", ollama.model);
            let mut client = OllamaClient::new(ollama.model);
            if let Some(api_base) = ollama.api_base {
                client = client.with_api_base(api_base);
            }
            Arc::new(client)
        }
    };

    // Create the speech client
    let speech = config.speech.clone();
    info!("Initializing ElevenLabs speech client (voice {})", speech.voice_id);
    let mut speech_client = ElevenLabsClient::new(speech.api_key, speech.voice_id);
    if let Some(model_id) = speech.model_id {
        speech_client = speech_client.with_model(model_id);
    }
    if let Some(api_base) = speech.api_base {
        speech_client = speech_client.with_api_base(api_base);
    }
    let speech_client: Arc<dyn SpeechClient> = Arc::new(speech_client);

    // Create the embedding client for the configured provider
    let embedding_client: Arc<dyn EmbeddingClient> = match config.embeddings.provider {
        EmbeddingsProvider::OpenAi => {
            let openai = config
                .embeddings
                .openai
                .clone()
                .context("[embeddings.openai] must be configured when embeddings.provider = \"openai\"")?;
            info!("Initializing OpenAI embedding client ({})", openai.model);
            Arc::new(OpenAiEmbeddings::new(openai.api_key, openai.model))
        }
        EmbeddingsProvider::Ollama => {
            let ollama = config.embeddings.ollama.clone().unwrap_or_default();
            info!("Initializing Ollama embedding client ({})", ollama.model);
            let mut client = OllamaEmbeddings::new(ollama.model);
            if let Some(api_base) = ollama.api_base {
                client = client.with_api_base(api_base);
            }
            Arc::new(client)
        }
    };

    // Create the object store for published videos
    info!("Initializing object storage (bucket {})", config.storage.bucket);
    let objects = Arc::new(
        S3ObjectStore::new(config.storage.clone()).context("Failed to create object store")?,
    );

    // Create WebSocket broadcaster; it doubles as the pipeline's
    // real-time channel
    let ws_broadcaster = WsBroadcaster::default();
    let channel: Arc<dyn RealtimeChannel> = Arc::new(ws_broadcaster.clone());

    // Assemble the pipeline
    let ctx = StageContext {
        config: config.pipeline.clone(),
        store: Arc::clone(&course_store) as Arc<dyn CourseStore>,
        completions: CompletionService::new(completion_client, config.retry.clone()),
        speech: speech_client,
        embeddings: EmbeddingService::new(embedding_client, config.retry.clone()),
        renderer: Arc::new(MarpRenderer::new(config.renderer.clone())),
        media: Arc::new(FfmpegEngine::new(config.media.clone())),
        objects,
        workspace: WorkspaceLayout::new(config.workspace.root.clone()),
    };

    let pipeline = Arc::new(CoursePipeline::new(
        ctx,
        Arc::clone(&progress_store) as Arc<dyn ProgressStore>,
        channel,
        config.queue.max_attempts,
    ));
    info!("Pipeline assembled");

    // Start the job runner
    let job_runner = JobRunner::new(
        Arc::clone(&queue) as Arc<dyn JobQueue>,
        pipeline,
        config.queue.clone(),
    );
    job_runner.start().await;

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        Arc::clone(&progress_store) as Arc<dyn ProgressStore>,
        Arc::clone(&queue) as Arc<dyn JobQueue>,
        ws_broadcaster,
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Stop the runner after the server so in-flight requests drain first
    info!("Server shutting down...");
    job_runner.stop().await;

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
