//! Mock real-time channel for testing.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, RwLock};

use crate::progress::{RealtimeChannel, RealtimeError};

/// A recorded publish for test assertions.
#[derive(Debug, Clone)]
pub struct PublishedEvent {
    pub topic: String,
    pub event: String,
    pub payload: Value,
}

/// Mock implementation of the RealtimeChannel trait.
///
/// Records every publish and can be told to fail the next N publishes to
/// exercise the fire-and-forget behavior.
#[derive(Debug, Clone, Default)]
pub struct MockRealtimeChannel {
    published: Arc<RwLock<Vec<PublishedEvent>>>,
    fail_remaining: Arc<RwLock<usize>>,
}

impl MockRealtimeChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded publishes, in order.
    pub fn published(&self) -> Vec<PublishedEvent> {
        self.published.read().unwrap().clone()
    }

    /// Events recorded for a given event name.
    pub fn published_events(&self, event: &str) -> Vec<PublishedEvent> {
        self.published
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.event == event)
            .cloned()
            .collect()
    }

    /// Make the next `n` publishes fail.
    pub fn fail_next_publishes(&self, n: usize) {
        *self.fail_remaining.write().unwrap() = n;
    }
}

#[async_trait]
impl RealtimeChannel for MockRealtimeChannel {
    async fn publish(
        &self,
        topic: &str,
        event: &str,
        payload: &Value,
    ) -> Result<(), RealtimeError> {
        {
            let mut remaining = self.fail_remaining.write().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(RealtimeError::Publish("mock channel down".to_string()));
            }
        }
        self.published.write().unwrap().push(PublishedEvent {
            topic: topic.to_string(),
            event: event.to_string(),
            payload: payload.clone(),
        });
        Ok(())
    }
}
