pub mod config;
pub mod embeddings;
pub mod llm;
pub mod media;
pub mod metrics;
pub mod pipeline;
pub mod progress;
pub mod queue;
pub mod renderer;
pub mod retry;
pub mod roadmap;
pub mod speech;
pub mod storage;
pub mod store;
pub mod testing;
pub mod transcript;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use pipeline::{
    CoursePackage, CoursePipeline, PipelineConfig, PipelineError, StageContext, WorkspaceLayout,
};
pub use progress::{ProgressEmitter, ProgressTracker, RealtimeChannel, SqliteProgressStore};
pub use queue::{GenerationJob, JobQueue, QueueConfig, SqliteJobQueue};
pub use retry::RetryPolicy;
pub use store::{CourseStore, SqliteCourseStore};
