use thiserror::Error;

#[derive(Error, Debug)]
pub enum RendererError {
    #[error("renderer not found at '{path}'")]
    ToolNotFound { path: String },

    #[error("rendering timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("renderer failed: {reason}")]
    Failed {
        reason: String,
        stderr: Option<String>,
    },

    #[error("renderer exited successfully but produced no images")]
    NoOutput,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RendererError {
    pub fn failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
            stderr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RendererError::Timeout { timeout_secs: 150 };
        assert_eq!(err.to_string(), "rendering timed out after 150s");

        let err = RendererError::failed("exited with code Some(1)", None);
        assert!(err.to_string().contains("exited with code"));
    }
}
