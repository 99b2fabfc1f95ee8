use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

pub const EVENT_PROGRESS: &str = "generation_progress";
pub const EVENT_COMPLETED: &str = "generation_completed";
pub const EVENT_FAILED: &str = "generation_failed";

#[derive(Error, Debug)]
pub enum RealtimeError {
    #[error("publish failed: {0}")]
    Publish(String),
}

/// Fan-out channel for progress events. Implementations deliver to
/// whoever is subscribed to the topic; delivery is best-effort.
#[async_trait]
pub trait RealtimeChannel: Send + Sync {
    async fn publish(&self, topic: &str, event: &str, payload: &Value)
        -> Result<(), RealtimeError>;
}

/// Publishes progress events without ever failing the caller: a dead
/// channel costs observability, not the job.
#[derive(Clone)]
pub struct ProgressEmitter {
    channel: Arc<dyn RealtimeChannel>,
}

impl ProgressEmitter {
    pub fn new(channel: Arc<dyn RealtimeChannel>) -> Self {
        Self { channel }
    }

    /// Emit on the course topic when the course id is known, otherwise on
    /// the session topic the job was submitted under.
    pub async fn emit(
        &self,
        course_id: Option<&str>,
        session_id: &str,
        event: &str,
        payload: &Value,
    ) {
        let topic = course_id.unwrap_or(session_id);
        if let Err(e) = self.channel.publish(topic, event, payload).await {
            warn!(topic, event, error = %e, "Failed to publish progress event");
        }
    }
}
