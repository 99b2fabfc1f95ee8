//! Worker process: HTTP surface, job intake loop and metrics registry
//! around the core generation pipeline.

pub mod api;
pub mod metrics;
pub mod runner;
pub mod state;
