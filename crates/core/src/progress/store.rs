use crate::store::StoreError;

use super::types::{GenerationProgress, ProgressUpdate};

pub trait ProgressStore: Send + Sync {
    /// Create the progress row if it does not exist yet; returns the row
    /// either way.
    fn create(
        &self,
        progress_id: &str,
        course_id: Option<&str>,
        session_id: &str,
    ) -> Result<GenerationProgress, StoreError>;

    fn get(&self, progress_id: &str) -> Result<Option<GenerationProgress>, StoreError>;

    /// Merge an update into the row. Updating an unknown progress id is a
    /// no-op, not an error.
    fn update(&self, progress_id: &str, update: &ProgressUpdate) -> Result<(), StoreError>;
}
