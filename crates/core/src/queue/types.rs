use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One course-generation request as it arrives on the queue.
///
/// `roadmap_data` carries the inline roadmap; when it is absent the
/// pipeline loads the persisted roadmap behind `roadmap_id` instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationJob {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roadmap_id: Option<String>,

    pub progress_id: String,

    #[serde(default)]
    pub roadmap_data: Option<serde_json::Value>,

    pub session_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tutor_id: Option<String>,

    /// Finished attempts so far; the queue fills this in on lease, it is
    /// not part of the inbound payload.
    #[serde(default)]
    pub attempts_made: u32,
}

/// A job handed to a worker, tied to the queue row that tracks it.
#[derive(Debug, Clone)]
pub struct LeasedJob {
    pub id: String,
    pub job: GenerationJob,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("database error: {0}")]
    Database(String),

    #[error("invalid job payload: {0}")]
    Payload(String),

    #[error("job not found: {0}")]
    NotFound(String),
}
