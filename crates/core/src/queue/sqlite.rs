//! SQLite-backed job queue implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

use super::config::QueueConfig;
use super::queue::JobQueue;
use super::types::{GenerationJob, JobStatus, LeasedJob, QueueError};

pub struct SqliteJobQueue {
    conn: Mutex<Connection>,
    config: QueueConfig,
}

impl SqliteJobQueue {
    pub fn new(path: &Path, config: QueueConfig) -> Result<Self, QueueError> {
        let conn = Connection::open(path).map_err(|e| QueueError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            config,
        })
    }

    pub fn in_memory(config: QueueConfig) -> Result<Self, QueueError> {
        let conn =
            Connection::open_in_memory().map_err(|e| QueueError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            config,
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), QueueError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS generation_jobs (
                id TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                attempts INTEGER NOT NULL DEFAULT 0,
                last_error TEXT,
                next_attempt_at TEXT,
                leased_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_jobs_runnable ON generation_jobs(status, next_attempt_at);
            "#,
        )
        .map_err(|e| QueueError::Database(e.to_string()))?;
        Ok(())
    }

    /// Shared transition for a failed attempt: either schedule a retry
    /// with backoff or park the job for good.
    fn record_failure(
        &self,
        conn: &Connection,
        job_id: &str,
        attempts: u32,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<(), QueueError> {
        let attempts = attempts + 1;
        if attempts >= self.config.max_attempts {
            conn.execute(
                "UPDATE generation_jobs SET status = 'failed', attempts = ?, last_error = ?, leased_at = NULL, updated_at = ? WHERE id = ?",
                params![attempts, error, now.to_rfc3339(), job_id],
            )
            .map_err(|e| QueueError::Database(e.to_string()))?;
            warn!(job_id, attempts, "Job exhausted its attempts, parked as failed");
        } else {
            let next_attempt_at =
                now + Duration::seconds(self.config.backoff_secs(attempts) as i64);
            conn.execute(
                "UPDATE generation_jobs SET status = 'pending', attempts = ?, last_error = ?, next_attempt_at = ?, leased_at = NULL, updated_at = ? WHERE id = ?",
                params![
                    attempts,
                    error,
                    next_attempt_at.to_rfc3339(),
                    now.to_rfc3339(),
                    job_id,
                ],
            )
            .map_err(|e| QueueError::Database(e.to_string()))?;
        }
        Ok(())
    }

    fn attempts_of(&self, conn: &Connection, job_id: &str) -> Result<u32, QueueError> {
        let attempts: Option<u32> = conn
            .query_row(
                "SELECT attempts FROM generation_jobs WHERE id = ?",
                params![job_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| QueueError::Database(e.to_string()))?;
        attempts.ok_or_else(|| QueueError::NotFound(job_id.to_string()))
    }
}

impl JobQueue for SqliteJobQueue {
    fn enqueue(&self, job: &GenerationJob) -> Result<String, QueueError> {
        let conn = self.conn.lock().unwrap();

        let id = uuid::Uuid::new_v4().to_string();
        let payload =
            serde_json::to_string(job).map_err(|e| QueueError::Payload(e.to_string()))?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO generation_jobs (id, payload, status, created_at, updated_at) VALUES (?, ?, 'pending', ?, ?)",
            params![id, payload, now, now],
        )
        .map_err(|e| QueueError::Database(e.to_string()))?;

        Ok(id)
    }

    fn lease_next(&self) -> Result<Option<LeasedJob>, QueueError> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();

        let candidate: Option<(String, String, u32)> = conn
            .query_row(
                "SELECT id, payload, attempts FROM generation_jobs WHERE status = 'pending' AND (next_attempt_at IS NULL OR next_attempt_at <= ?) ORDER BY created_at ASC LIMIT 1",
                params![now.to_rfc3339()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(|e| QueueError::Database(e.to_string()))?;

        let (id, payload, attempts) = match candidate {
            Some(row) => row,
            None => return Ok(None),
        };

        conn.execute(
            "UPDATE generation_jobs SET status = 'running', leased_at = ?, updated_at = ? WHERE id = ?",
            params![now.to_rfc3339(), now.to_rfc3339(), id],
        )
        .map_err(|e| QueueError::Database(e.to_string()))?;

        let mut job: GenerationJob =
            serde_json::from_str(&payload).map_err(|e| QueueError::Payload(e.to_string()))?;
        job.attempts_made = attempts;

        Ok(Some(LeasedJob { id, job }))
    }

    fn complete(&self, job_id: &str) -> Result<(), QueueError> {
        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute(
                "UPDATE generation_jobs SET status = 'completed', leased_at = NULL, updated_at = ? WHERE id = ?",
                params![Utc::now().to_rfc3339(), job_id],
            )
            .map_err(|e| QueueError::Database(e.to_string()))?;
        if changed == 0 {
            return Err(QueueError::NotFound(job_id.to_string()));
        }
        Ok(())
    }

    fn fail(&self, job_id: &str, error: &str) -> Result<(), QueueError> {
        let conn = self.conn.lock().unwrap();
        let attempts = self.attempts_of(&conn, job_id)?;
        self.record_failure(&conn, job_id, attempts, error, Utc::now())
    }

    fn recover_stale(&self) -> Result<usize, QueueError> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let cutoff = now - Duration::seconds(self.config.lease_timeout_secs as i64);

        let mut stmt = conn
            .prepare(
                "SELECT id, attempts FROM generation_jobs WHERE status = 'running' AND leased_at <= ?",
            )
            .map_err(|e| QueueError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![cutoff.to_rfc3339()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?))
            })
            .map_err(|e| QueueError::Database(e.to_string()))?;

        let mut stale = Vec::new();
        for row in rows {
            stale.push(row.map_err(|e| QueueError::Database(e.to_string()))?);
        }
        drop(stmt);

        for (id, attempts) in &stale {
            warn!(job_id = %id, "Recovering job with expired lease");
            self.record_failure(&conn, id, *attempts, "lease expired", now)?;
        }
        Ok(stale.len())
    }

    fn depth(&self) -> Result<i64, QueueError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT COUNT(*) FROM generation_jobs WHERE status = 'pending'",
            [],
            |row| row.get(0),
        )
        .map_err(|e| QueueError::Database(e.to_string()))
    }

    fn status(&self, job_id: &str) -> Result<Option<JobStatus>, QueueError> {
        let conn = self.conn.lock().unwrap();
        let status: Option<String> = conn
            .query_row(
                "SELECT status FROM generation_jobs WHERE id = ?",
                params![job_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| QueueError::Database(e.to_string()))?;
        Ok(status.as_deref().and_then(JobStatus::parse))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_job(progress_id: &str) -> GenerationJob {
        GenerationJob {
            course_id: None,
            roadmap_id: None,
            progress_id: progress_id.to_string(),
            roadmap_data: Some(serde_json::json!({"Intro": ["What is X"]})),
            session_id: "sess-1".to_string(),
            tutor_id: None,
            attempts_made: 0,
        }
    }

    fn no_backoff_queue() -> SqliteJobQueue {
        SqliteJobQueue::in_memory(QueueConfig {
            initial_backoff_secs: 0,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_enqueue_and_lease() {
        let queue = no_backoff_queue();
        let id = queue.enqueue(&test_job("p1")).unwrap();

        let leased = queue.lease_next().unwrap().unwrap();
        assert_eq!(leased.id, id);
        assert_eq!(leased.job.progress_id, "p1");
        assert_eq!(leased.job.attempts_made, 0);
        assert!(leased.job.roadmap_data.is_some());
        assert_eq!(queue.status(&id).unwrap(), Some(JobStatus::Running));
    }

    #[test]
    fn test_leased_job_is_not_leased_twice() {
        let queue = no_backoff_queue();
        queue.enqueue(&test_job("p1")).unwrap();

        assert!(queue.lease_next().unwrap().is_some());
        assert!(queue.lease_next().unwrap().is_none());
    }

    #[test]
    fn test_jobs_leased_oldest_first() {
        let queue = no_backoff_queue();
        queue.enqueue(&test_job("first")).unwrap();
        queue.enqueue(&test_job("second")).unwrap();

        let leased = queue.lease_next().unwrap().unwrap();
        assert_eq!(leased.job.progress_id, "first");
    }

    #[test]
    fn test_complete() {
        let queue = no_backoff_queue();
        let id = queue.enqueue(&test_job("p1")).unwrap();
        queue.lease_next().unwrap().unwrap();
        queue.complete(&id).unwrap();

        assert_eq!(queue.status(&id).unwrap(), Some(JobStatus::Completed));
        assert!(queue.lease_next().unwrap().is_none());
    }

    #[test]
    fn test_fail_requeues_with_incremented_attempts() {
        let queue = no_backoff_queue();
        let id = queue.enqueue(&test_job("p1")).unwrap();
        queue.lease_next().unwrap().unwrap();
        queue.fail(&id, "llm unavailable").unwrap();

        assert_eq!(queue.status(&id).unwrap(), Some(JobStatus::Pending));
        let leased = queue.lease_next().unwrap().unwrap();
        assert_eq!(leased.job.attempts_made, 1);
    }

    #[test]
    fn test_fail_respects_backoff() {
        let queue = SqliteJobQueue::in_memory(QueueConfig::default()).unwrap();
        let id = queue.enqueue(&test_job("p1")).unwrap();
        queue.lease_next().unwrap().unwrap();
        queue.fail(&id, "boom").unwrap();

        // Re-queued a minute out, so nothing is due right now.
        assert_eq!(queue.status(&id).unwrap(), Some(JobStatus::Pending));
        assert!(queue.lease_next().unwrap().is_none());
    }

    #[test]
    fn test_attempt_ceiling_parks_job() {
        let queue = no_backoff_queue();
        let id = queue.enqueue(&test_job("p1")).unwrap();

        for _ in 0..3 {
            queue.lease_next().unwrap().unwrap();
            queue.fail(&id, "boom").unwrap();
        }

        assert_eq!(queue.status(&id).unwrap(), Some(JobStatus::Failed));
        assert!(queue.lease_next().unwrap().is_none());
    }

    #[test]
    fn test_recover_stale_counts_as_attempt() {
        let queue = SqliteJobQueue::in_memory(QueueConfig {
            lease_timeout_secs: 0,
            initial_backoff_secs: 0,
            ..Default::default()
        })
        .unwrap();
        let id = queue.enqueue(&test_job("p1")).unwrap();
        queue.lease_next().unwrap().unwrap();

        let recovered = queue.recover_stale().unwrap();
        assert_eq!(recovered, 1);
        assert_eq!(queue.status(&id).unwrap(), Some(JobStatus::Pending));

        let leased = queue.lease_next().unwrap().unwrap();
        assert_eq!(leased.job.attempts_made, 1);
    }

    #[test]
    fn test_recover_ignores_fresh_leases() {
        let queue = no_backoff_queue();
        queue.enqueue(&test_job("p1")).unwrap();
        queue.lease_next().unwrap().unwrap();

        assert_eq!(queue.recover_stale().unwrap(), 0);
    }

    #[test]
    fn test_depth() {
        let queue = no_backoff_queue();
        assert_eq!(queue.depth().unwrap(), 0);
        queue.enqueue(&test_job("p1")).unwrap();
        queue.enqueue(&test_job("p2")).unwrap();
        assert_eq!(queue.depth().unwrap(), 2);

        queue.lease_next().unwrap().unwrap();
        assert_eq!(queue.depth().unwrap(), 1);
    }

    #[test]
    fn test_unknown_job_operations() {
        let queue = no_backoff_queue();
        assert!(matches!(
            queue.complete("missing"),
            Err(QueueError::NotFound(_))
        ));
        assert!(matches!(
            queue.fail("missing", "x"),
            Err(QueueError::NotFound(_))
        ));
        assert_eq!(queue.status("missing").unwrap(), None);
    }
}
