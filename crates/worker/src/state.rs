use std::sync::Arc;
use std::time::Instant;

use courseforge_core::progress::ProgressStore;
use courseforge_core::queue::JobQueue;
use courseforge_core::{Config, SanitizedConfig};

use crate::api::WsBroadcaster;

/// Shared application state
pub struct AppState {
    config: Config,
    started_at: Instant,
    progress: Arc<dyn ProgressStore>,
    queue: Arc<dyn JobQueue>,
    ws_broadcaster: WsBroadcaster,
}

impl AppState {
    pub fn new(
        config: Config,
        progress: Arc<dyn ProgressStore>,
        queue: Arc<dyn JobQueue>,
        ws_broadcaster: WsBroadcaster,
    ) -> Self {
        Self {
            config,
            started_at: Instant::now(),
            progress,
            queue,
            ws_broadcaster,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn progress(&self) -> &dyn ProgressStore {
        self.progress.as_ref()
    }

    pub fn queue(&self) -> &dyn JobQueue {
        self.queue.as_ref()
    }

    pub fn ws_broadcaster(&self) -> &WsBroadcaster {
        &self.ws_broadcaster
    }
}
