//! Durable job queue for course generation.
//!
//! Jobs survive worker restarts: a leased job whose worker dies is put
//! back on the queue after its lease expires, counting the lost lease as
//! a failed attempt. Retries use exponential backoff and stop at the
//! attempt ceiling.

mod config;
mod queue;
mod sqlite;
mod types;

pub use config::QueueConfig;
pub use queue::JobQueue;
pub use sqlite::SqliteJobQueue;
pub use types::{GenerationJob, JobStatus, LeasedJob, QueueError};
