//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Pipeline jobs (outcomes, per-stage durations, per-unit results)
//! - External services (completion, speech, embeddings, object storage)
//! - Subprocess tools (renderer, encoder)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Pipeline Job Metrics
// =============================================================================

/// Generation jobs total by outcome.
pub static JOBS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("courseforge_jobs_total", "Total generation jobs processed"),
        &["outcome"], // "completed", "failed", "rejected"
    )
    .unwrap()
});

/// Per-stage duration in seconds.
pub static STAGE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "courseforge_stage_duration_seconds",
            "Duration of pipeline stages",
        )
        .buckets(vec![
            0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0,
        ]),
        &["stage"],
    )
    .unwrap()
});

/// Units processed per stage by result.
pub static STAGE_UNITS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "courseforge_stage_units_total",
            "Units processed per pipeline stage",
        ),
        &["stage", "result"], // result: "completed", "skipped", "degraded", "failed"
    )
    .unwrap()
});

/// Videos compiled total.
pub static VIDEOS_COMPILED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "courseforge_videos_compiled_total",
        "Total subtopic videos compiled",
    )
    .unwrap()
});

/// Embedding calls avoided because the content hash was already stored.
pub static EMBEDDINGS_REUSED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "courseforge_embeddings_reused_total",
        "Embedding requests skipped due to content-hash reuse",
    )
    .unwrap()
});

// =============================================================================
// External Service Metrics
// =============================================================================

/// External service request duration.
pub static EXTERNAL_SERVICE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "courseforge_external_service_duration_seconds",
            "Duration of external service calls",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 120.0]),
        &["service"],
    )
    .unwrap()
});

/// External service requests total.
pub static EXTERNAL_SERVICE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "courseforge_external_service_requests_total",
            "Total external service requests",
        ),
        &["service", "status"], // status: "success", "error", "timeout"
    )
    .unwrap()
});

/// LLM tokens used.
pub static LLM_TOKENS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("courseforge_llm_tokens_total", "Total LLM tokens used"),
        &["provider", "direction"], // direction: "input", "output"
    )
    .unwrap()
});

// =============================================================================
// Subprocess Metrics
// =============================================================================

/// Subprocess invocations total by tool and result.
pub static SUBPROCESS_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "courseforge_subprocess_runs_total",
            "Total subprocess invocations",
        ),
        &["tool", "result"], // tool: "ffmpeg", "ffprobe", "marp"; result: "success", "failed"
    )
    .unwrap()
});

/// Subprocess timeouts total by tool.
pub static SUBPROCESS_TIMEOUTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "courseforge_subprocess_timeouts_total",
            "Subprocess invocations killed on timeout",
        ),
        &["tool"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Jobs
        Box::new(JOBS_TOTAL.clone()),
        Box::new(STAGE_DURATION.clone()),
        Box::new(STAGE_UNITS.clone()),
        Box::new(VIDEOS_COMPILED.clone()),
        Box::new(EMBEDDINGS_REUSED.clone()),
        // External services
        Box::new(EXTERNAL_SERVICE_DURATION.clone()),
        Box::new(EXTERNAL_SERVICE_REQUESTS.clone()),
        Box::new(LLM_TOKENS.clone()),
        // Subprocesses
        Box::new(SUBPROCESS_RUNS.clone()),
        Box::new(SUBPROCESS_TIMEOUTS.clone()),
    ]
}
