use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ProgressStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorLogEntry {
    pub timestamp: DateTime<Utc>,
    pub step: String,
    pub message: String,
}

impl ErrorLogEntry {
    pub fn new(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            step: step.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationProgress {
    pub progress_id: String,
    pub course_id: Option<String>,
    pub session_id: String,
    pub status: ProgressStatus,
    pub current_step: String,
    pub progress_percentage: f64,
    pub current_section_index: Option<u32>,
    pub current_subtopic_index: Option<u32>,
    pub error_log: Vec<ErrorLogEntry>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Merge-style progress patch: `None` fields keep their stored value,
/// `append_error` extends the error log rather than replacing it.
#[derive(Debug, Clone, Default)]
pub struct ProgressUpdate {
    pub course_id: Option<String>,
    pub status: Option<ProgressStatus>,
    pub current_step: Option<String>,
    pub progress_percentage: Option<f64>,
    pub current_section_index: Option<u32>,
    pub current_subtopic_index: Option<u32>,
    pub append_error: Option<ErrorLogEntry>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            ProgressStatus::Pending,
            ProgressStatus::Processing,
            ProgressStatus::Completed,
            ProgressStatus::Failed,
        ] {
            assert_eq!(ProgressStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!ProgressStatus::Pending.is_terminal());
        assert!(!ProgressStatus::Processing.is_terminal());
        assert!(ProgressStatus::Completed.is_terminal());
        assert!(ProgressStatus::Failed.is_terminal());
    }

    #[test]
    fn test_progress_serializes_camel_case() {
        let progress = GenerationProgress {
            progress_id: "p1".to_string(),
            course_id: None,
            session_id: "s1".to_string(),
            status: ProgressStatus::Processing,
            current_step: "Generating content".to_string(),
            progress_percentage: 12.5,
            current_section_index: Some(0),
            current_subtopic_index: None,
            error_log: vec![],
            completed_at: None,
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&progress).unwrap();
        assert_eq!(json["progressId"], "p1");
        assert_eq!(json["progressPercentage"], 12.5);
        assert_eq!(json["currentSectionIndex"], 0);
    }
}
