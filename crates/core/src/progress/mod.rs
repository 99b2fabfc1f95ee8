//! Job progress: persistence, budget arithmetic and real-time emission.
//!
//! Every unit of pipeline work reports through the [`ProgressTracker`],
//! which persists a merge-style update and mirrors it onto the real-time
//! channel. Subscribers key on the course id when one exists, otherwise
//! on the session id that submitted the job.

mod budget;
mod emitter;
mod sqlite;
mod store;
mod tracker;
mod types;

pub use budget::StageBudget;
pub use emitter::{
    ProgressEmitter, RealtimeChannel, RealtimeError, EVENT_COMPLETED, EVENT_FAILED,
    EVENT_PROGRESS,
};
pub use sqlite::SqliteProgressStore;
pub use store::ProgressStore;
pub use tracker::ProgressTracker;
pub use types::{ErrorLogEntry, GenerationProgress, ProgressStatus, ProgressUpdate};
