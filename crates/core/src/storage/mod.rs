//! Object storage for published artifacts.
//!
//! Compiled videos are uploaded under deterministic keys and served by
//! URL; the rest of the pipeline only ever sees the [`ObjectStore`]
//! trait. The S3 implementation also speaks to MinIO via a custom
//! endpoint with path-style addressing.

mod config;
mod error;
mod s3;
mod store;

pub use config::StorageConfig;
pub use error::StorageError;
pub use s3::S3ObjectStore;
pub use store::ObjectStore;
