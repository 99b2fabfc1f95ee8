//! Media engine errors.

use thiserror::Error;

/// Errors from external media tool invocations.
#[derive(Debug, Error)]
pub enum MediaError {
    /// The tool binary could not be found.
    #[error("Media tool not found at '{path}'")]
    ToolNotFound { path: String },

    /// The tool ran past its wall-clock budget and was killed.
    #[error("Media tool timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The tool exited unsuccessfully.
    #[error("{tool} failed: {reason}")]
    CommandFailed {
        tool: String,
        reason: String,
        stderr: Option<String>,
    },

    /// ffprobe output could not be interpreted.
    #[error("Probe failed: {reason}")]
    Probe { reason: String },

    /// Nothing to process (e.g. an empty clip list).
    #[error("No input: {reason}")]
    NoInput { reason: String },

    /// Filesystem error while preparing inputs or outputs.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    pub fn command_failed(
        tool: impl Into<String>,
        reason: impl Into<String>,
        stderr: Option<String>,
    ) -> Self {
        Self::CommandFailed {
            tool: tool.into(),
            reason: reason.into(),
            stderr,
        }
    }

    pub fn probe(reason: impl Into<String>) -> Self {
        Self::Probe {
            reason: reason.into(),
        }
    }

    pub fn no_input(reason: impl Into<String>) -> Self {
        Self::NoInput {
            reason: reason.into(),
        }
    }
}
