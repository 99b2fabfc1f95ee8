use async_trait::async_trait;

use super::error::StorageError;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload an object and return the URL it is reachable at. With
    /// `public` set the object is marked world-readable.
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        public: bool,
    ) -> Result<String, StorageError>;
}
