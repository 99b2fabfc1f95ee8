//! Pipeline error types.

use thiserror::Error;

use crate::roadmap::RoadmapError;
use crate::store::StoreError;

/// How the orchestrator reacts to a stage error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Record the error against the unit and keep going.
    Recoverable,
    /// Abort the job and hand the failure back to the queue.
    Fatal,
}

/// Error from one unit of stage work.
///
/// Stages decide severity by construction: external-service, subprocess
/// and data errors are recoverable per unit, anything systemic (storage,
/// workspace filesystem) is fatal.
#[derive(Debug, Error)]
pub enum StageError {
    /// A completion/speech/embedding call failed after its retries.
    #[error("{service} service failed: {reason}")]
    ExternalService { service: String, reason: String },

    /// A rendering or encoding tool failed after degradation ran out.
    #[error("{tool} failed: {reason}")]
    Subprocess { tool: String, reason: String },

    /// Malformed input or unparseable model output for one unit.
    #[error("bad data: {reason}")]
    Data { reason: String },

    /// Anything that must abort the whole job.
    #[error("{reason}")]
    Fatal { reason: String },
}

impl StageError {
    pub fn external(service: impl Into<String>, reason: impl ToString) -> Self {
        Self::ExternalService {
            service: service.into(),
            reason: reason.to_string(),
        }
    }

    pub fn subprocess(tool: impl Into<String>, reason: impl ToString) -> Self {
        Self::Subprocess {
            tool: tool.into(),
            reason: reason.to_string(),
        }
    }

    pub fn data(reason: impl ToString) -> Self {
        Self::Data {
            reason: reason.to_string(),
        }
    }

    pub fn fatal(reason: impl ToString) -> Self {
        Self::Fatal {
            reason: reason.to_string(),
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::Fatal { .. } => Severity::Fatal,
            _ => Severity::Recoverable,
        }
    }
}

impl From<StoreError> for StageError {
    fn from(error: StoreError) -> Self {
        Self::fatal(format!("persistence failed: {}", error))
    }
}

impl From<std::io::Error> for StageError {
    fn from(error: std::io::Error) -> Self {
        Self::fatal(format!("workspace io failed: {}", error))
    }
}

/// Error terminating a whole pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The job arrived at or past the attempt ceiling.
    #[error("attempt ceiling reached after {attempts} attempts")]
    AttemptsExhausted { attempts: u32 },

    #[error(transparent)]
    Roadmap(#[from] RoadmapError),

    /// The job carried neither inline roadmap data nor a resolvable id.
    #[error("no roadmap available: {reason}")]
    MissingRoadmap { reason: String },

    #[error(transparent)]
    Stage(#[from] StageError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PipelineError {
    pub fn missing_roadmap(reason: impl Into<String>) -> Self {
        Self::MissingRoadmap {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_by_variant() {
        assert_eq!(
            StageError::external("completion", "503").severity(),
            Severity::Recoverable
        );
        assert_eq!(
            StageError::subprocess("ffmpeg", "exit 1").severity(),
            Severity::Recoverable
        );
        assert_eq!(
            StageError::data("not json").severity(),
            Severity::Recoverable
        );
        assert_eq!(
            StageError::fatal("disk gone").severity(),
            Severity::Fatal
        );
    }

    #[test]
    fn test_store_errors_are_fatal() {
        let err: StageError = StoreError::Database("locked".to_string()).into();
        assert_eq!(err.severity(), Severity::Fatal);
        assert!(err.to_string().contains("locked"));
    }

    #[test]
    fn test_display() {
        let err = StageError::external("speech", "timed out");
        assert_eq!(err.to_string(), "speech service failed: timed out");

        let err = PipelineError::AttemptsExhausted { attempts: 3 };
        assert!(err.to_string().contains("3 attempts"));
    }
}
