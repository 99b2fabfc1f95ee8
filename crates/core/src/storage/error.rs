use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("upload failed: {reason}")]
    Upload { reason: String },

    #[error("upload timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("object storage is not configured")]
    NotConfigured,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn upload(reason: impl Into<String>) -> Self {
        Self::Upload {
            reason: reason.into(),
        }
    }
}
