use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct QueueConfig {
    /// Attempts (initial run + retries) before a job is parked as failed.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// How long a leased job may run before the lease is considered lost.
    #[serde(default = "default_lease_timeout_secs")]
    pub lease_timeout_secs: u64,

    #[serde(default = "default_initial_backoff_secs")]
    pub initial_backoff_secs: u64,

    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,

    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// How often the worker polls for work.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Jobs processed concurrently by one worker process.
    #[serde(default = "default_worker_slots")]
    pub worker_slots: usize,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_lease_timeout_secs() -> u64 {
    7_200
}

fn default_initial_backoff_secs() -> u64 {
    60
}

fn default_max_backoff_secs() -> u64 {
    3_600
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_worker_slots() -> usize {
    2
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            lease_timeout_secs: default_lease_timeout_secs(),
            initial_backoff_secs: default_initial_backoff_secs(),
            max_backoff_secs: default_max_backoff_secs(),
            backoff_multiplier: default_backoff_multiplier(),
            poll_interval_ms: default_poll_interval_ms(),
            worker_slots: default_worker_slots(),
        }
    }
}

impl QueueConfig {
    /// Seconds to wait before re-running a job that has failed
    /// `attempts` times.
    pub fn backoff_secs(&self, attempts: u32) -> u64 {
        if attempts == 0 {
            return 0;
        }
        let factor = self.backoff_multiplier.powi(attempts.saturating_sub(1) as i32);
        let backoff = (self.initial_backoff_secs as f64 * factor) as u64;
        backoff.min(self.max_backoff_secs)
    }
}
