//! Mock object store for testing.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use crate::storage::{ObjectStore, StorageError};

/// A recorded upload for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub key: String,
    pub content_type: String,
    pub public: bool,
    pub size: usize,
}

/// Mock implementation of the ObjectStore trait.
#[derive(Debug, Clone, Default)]
pub struct MockObjectStore {
    uploads: Arc<RwLock<Vec<RecordedUpload>>>,
    fail_all: Arc<RwLock<bool>>,
}

impl MockObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_all(&self, fail: bool) {
        *self.fail_all.write().unwrap() = fail;
    }

    /// All recorded uploads, in order.
    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.read().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        public: bool,
    ) -> Result<String, StorageError> {
        if *self.fail_all.read().unwrap() {
            return Err(StorageError::upload("mock storage unavailable"));
        }

        self.uploads.write().unwrap().push(RecordedUpload {
            key: key.to_string(),
            content_type: content_type.to_string(),
            public,
            size: bytes.len(),
        });
        Ok(format!("https://cdn.test/{}", key))
    }
}
