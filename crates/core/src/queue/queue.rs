use super::types::{GenerationJob, JobStatus, LeasedJob, QueueError};

/// Queue contract: at most one active lease per job, bounded attempts,
/// backoff applied by the queue itself when an attempt fails.
pub trait JobQueue: Send + Sync {
    /// Add a job; returns its queue id.
    fn enqueue(&self, job: &GenerationJob) -> Result<String, QueueError>;

    /// Lease the oldest runnable job, marking it running. `None` when
    /// nothing is due.
    fn lease_next(&self) -> Result<Option<LeasedJob>, QueueError>;

    fn complete(&self, job_id: &str) -> Result<(), QueueError>;

    /// Record a failed attempt. The job is re-queued with backoff, or
    /// parked as failed once the attempt ceiling is reached.
    fn fail(&self, job_id: &str, error: &str) -> Result<(), QueueError>;

    /// Requeue running jobs whose lease has expired, counting the lost
    /// lease as a failed attempt. Returns how many were recovered.
    fn recover_stale(&self) -> Result<usize, QueueError>;

    /// Jobs currently waiting to run.
    fn depth(&self) -> Result<i64, QueueError>;

    fn status(&self, job_id: &str) -> Result<Option<JobStatus>, QueueError>;
}
