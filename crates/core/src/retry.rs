//! Bounded retry with exponential backoff for external service calls.
//!
//! Completion and embedding calls retry up to a fixed attempt ceiling;
//! speech synthesis does not retry (failed segments are skipped), so the
//! speech client never uses this policy.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry policy for retryable external service calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum attempts (first call included).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Upper bound on any single delay, in milliseconds.
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Exponential backoff multiplier.
    #[serde(default = "default_multiplier")]
    pub backoff_multiplier: f64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> u64 {
    1_000
}

fn default_max_delay() -> u64 {
    30_000
}

fn default_multiplier() -> f64 {
    2.0
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            backoff_multiplier: default_multiplier(),
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Backoff delay before retrying after `attempt` (1-based) has failed.
    ///
    /// Returns `None` when the attempt ceiling is reached and the error
    /// should be surfaced to the caller.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        let exp = self
            .backoff_multiplier
            .powi(attempt.saturating_sub(1) as i32);
        let millis = (self.initial_delay_ms as f64 * exp) as u64;
        Some(Duration::from_millis(millis.min(self.max_delay_ms)))
    }
}
