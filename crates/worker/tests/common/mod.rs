//! Common test utilities.
//!
//! Provides a test fixture that wires the worker router and job runner
//! to in-memory stores and mock external services, enabling end-to-end
//! testing without sockets, subprocesses or network access.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use courseforge_core::embeddings::{EmbeddingClient, EmbeddingService};
use courseforge_core::llm::{CompletionService, LlmClient};
use courseforge_core::media::MediaEngine;
use courseforge_core::pipeline::{CoursePipeline, PipelineConfig, StageContext, WorkspaceLayout};
use courseforge_core::progress::{ProgressStore, RealtimeChannel, SqliteProgressStore};
use courseforge_core::queue::{JobQueue, QueueConfig, SqliteJobQueue};
use courseforge_core::renderer::SlideRenderer;
use courseforge_core::retry::RetryPolicy;
use courseforge_core::speech::SpeechClient;
use courseforge_core::storage::ObjectStore;
use courseforge_core::store::{CourseStore, SqliteCourseStore};
use courseforge_core::testing::{
    MockCompletionClient, MockEmbeddingClient, MockMediaEngine, MockObjectStore, MockSlideRenderer,
    MockSpeechClient,
};
use courseforge_core::{load_config_from_str, Config};

use courseforge_worker::api::{create_router, WsBroadcaster};
use courseforge_worker::runner::JobRunner;
use courseforge_worker::state::AppState;

/// Re-export fixtures for test convenience
pub use courseforge_core::testing::fixtures;

/// Test fixture for driving the worker in-process.
///
/// The router serves the real HTTP surface, the runner leases from a
/// real (in-memory) queue, and every external service behind the
/// pipeline is a controllable mock.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_progress_lookup() {
///     let fixture = TestFixture::new();
///
///     let response = fixture.get("/api/v1/progress/prog-1").await;
///
///     assert_eq!(response.status, 404);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Course store shared by pipeline and assertions
    pub store: Arc<SqliteCourseStore>,
    /// Progress store backing the progress endpoint
    pub progress: Arc<SqliteProgressStore>,
    /// Job queue the runner leases from
    pub queue: Arc<SqliteJobQueue>,
    /// Job runner; not started until a test calls `runner.start()`
    pub runner: JobRunner,
    /// Mock completion client - reconfigure generation responses
    pub llm: Arc<MockCompletionClient>,
    /// WebSocket broadcaster doubling as the pipeline's realtime channel
    pub broadcaster: WsBroadcaster,
    /// Temporary directory holding the pipeline workspace
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

fn test_config() -> Config {
    load_config_from_str(
        r#"
[speech]
api_key = "sk-test"
"#,
    )
    .expect("Failed to build test config")
}

/// Queue tuned for tests: fast polling, retry without backoff delay.
fn test_queue_config() -> QueueConfig {
    QueueConfig {
        max_attempts: 3,
        initial_backoff_secs: 0,
        poll_interval_ms: 25,
        ..QueueConfig::default()
    }
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let store = Arc::new(SqliteCourseStore::in_memory().expect("Failed to create store"));
        let progress =
            Arc::new(SqliteProgressStore::in_memory().expect("Failed to create progress store"));
        let queue = Arc::new(
            SqliteJobQueue::in_memory(test_queue_config()).expect("Failed to create queue"),
        );

        let llm = Arc::new(MockCompletionClient::new());
        llm.stub_contains("timestamped transcript", fixtures::transcript());
        llm.stub_contains("existing narration", fixtures::deck_markdown());
        llm.stub_contains("slide deck", fixtures::deck_markdown());
        llm.stub_contains("multiple-choice quiz", fixtures::quiz_json());
        llm.stub_contains("flashcard", fixtures::flashcard_json());

        let broadcaster = WsBroadcaster::default();
        let channel: Arc<dyn RealtimeChannel> = Arc::new(broadcaster.clone());

        let ctx = StageContext {
            config: PipelineConfig::without_delays(),
            store: Arc::clone(&store) as Arc<dyn CourseStore>,
            completions: CompletionService::new(
                Arc::clone(&llm) as Arc<dyn LlmClient>,
                RetryPolicy::none(),
            ),
            speech: Arc::new(MockSpeechClient::new()) as Arc<dyn SpeechClient>,
            embeddings: EmbeddingService::new(
                Arc::new(MockEmbeddingClient::new()) as Arc<dyn EmbeddingClient>,
                RetryPolicy::none(),
            ),
            renderer: Arc::new(MockSlideRenderer::new()) as Arc<dyn SlideRenderer>,
            media: Arc::new(MockMediaEngine::new()) as Arc<dyn MediaEngine>,
            objects: Arc::new(MockObjectStore::new()) as Arc<dyn ObjectStore>,
            workspace: WorkspaceLayout::new(temp_dir.path()),
        };

        let queue_config = test_queue_config();
        let pipeline = Arc::new(CoursePipeline::new(
            ctx,
            Arc::clone(&progress) as Arc<dyn ProgressStore>,
            channel,
            queue_config.max_attempts,
        ));

        let runner = JobRunner::new(
            Arc::clone(&queue) as Arc<dyn JobQueue>,
            pipeline,
            queue_config,
        );

        let state = Arc::new(AppState::new(
            test_config(),
            Arc::clone(&progress) as Arc<dyn ProgressStore>,
            Arc::clone(&queue) as Arc<dyn JobQueue>,
            broadcaster.clone(),
        ));

        let router = create_router(state);

        Self {
            router,
            store,
            progress,
            queue,
            runner,
            llm,
            broadcaster,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a GET request and return the raw body as text. Used for
    /// endpoints that do not speak JSON, like /metrics.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        (status, String::from_utf8_lossy(&body_bytes).to_string())
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}

/// Helper to assert a JSON path equals expected value.
#[macro_export]
macro_rules! assert_json_path {
    ($json:expr, $path:expr, $expected:expr) => {
        let actual = &$json[$path];
        assert_eq!(
            actual, &$expected,
            "Path '{}' expected {:?}, got {:?}",
            $path, $expected, actual
        );
    };
}
