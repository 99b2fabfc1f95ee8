//! Prometheus metrics for the worker process.
//!
//! Worker-side metrics cover the HTTP surface, WebSocket connections and
//! the job runner loop. Core pipeline metrics (job outcomes, stage
//! durations, external-service calls) are registered into the same
//! registry so `/metrics` exposes everything in one scrape.

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "courseforge_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("courseforge_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "courseforge_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// WebSocket Metrics
// =============================================================================

/// Active WebSocket connections.
pub static WS_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "courseforge_ws_connections_active",
        "Number of active WebSocket connections",
    )
    .unwrap()
});

/// Total WebSocket connections (cumulative).
pub static WS_CONNECTIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "courseforge_ws_connections_total",
        "Total WebSocket connections since startup",
    )
    .unwrap()
});

/// WebSocket messages sent by event name.
pub static WS_MESSAGES_SENT: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "courseforge_ws_messages_sent_total",
            "WebSocket messages sent",
        ),
        &["event"],
    )
    .unwrap()
});

/// WebSocket lag events (when client falls behind).
pub static WS_LAG_EVENTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "courseforge_ws_lag_events_total",
        "WebSocket lag events (client fell behind)",
    )
    .unwrap()
});

// =============================================================================
// Job Runner Metrics
// =============================================================================

/// Jobs waiting in the queue (collected dynamically).
pub static QUEUE_DEPTH: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "courseforge_queue_depth",
        "Number of generation jobs waiting to run",
    )
    .unwrap()
});

/// Jobs currently being processed by this worker.
pub static JOBS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "courseforge_jobs_in_flight",
        "Number of generation jobs currently being processed",
    )
    .unwrap()
});

/// Jobs returned to the queue after an expired lease.
pub static STALE_JOBS_RECOVERED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "courseforge_stale_jobs_recovered_total",
        "Jobs re-queued because their lease expired",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // WebSocket
    registry
        .register(Box::new(WS_CONNECTIONS_ACTIVE.clone()))
        .unwrap();
    registry
        .register(Box::new(WS_CONNECTIONS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(WS_MESSAGES_SENT.clone()))
        .unwrap();
    registry.register(Box::new(WS_LAG_EVENTS.clone())).unwrap();

    // Job runner
    registry.register(Box::new(QUEUE_DEPTH.clone())).unwrap();
    registry
        .register(Box::new(JOBS_IN_FLIGHT.clone()))
        .unwrap();
    registry
        .register(Box::new(STALE_JOBS_RECOVERED.clone()))
        .unwrap();

    // Core metrics (pipeline stages, external services, subprocesses)
    for metric in courseforge_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Refresh gauges that mirror external state before encoding.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    if let Ok(depth) = state.queue().depth() {
        QUEUE_DEPTH.set(depth);
    }
}

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    let uuid_regex = regex_lite::Regex::new(
        r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
    )
    .unwrap();
    let numeric_regex = regex_lite::Regex::new(r"/\d+(/|$)").unwrap();

    let result = uuid_regex.replace_all(path, "{id}");
    let result = numeric_regex.replace_all(&result, "/{id}$1");
    result.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_uuid() {
        let path = "/api/v1/progress/550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(normalize_path(path), "/api/v1/progress/{id}");
    }

    #[test]
    fn test_normalize_path_numeric() {
        let path = "/api/v1/progress/12345";
        assert_eq!(normalize_path(path), "/api/v1/progress/{id}");
    }

    #[test]
    fn test_normalize_path_no_ids() {
        let path = "/api/v1/health";
        assert_eq!(normalize_path(path), "/api/v1/health");
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("courseforge_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_worker_and_core_metrics() {
        // Prometheus only outputs metrics that have been touched.
        HTTP_REQUEST_DURATION
            .with_label_values(&["GET", "/test", "200"])
            .observe(0.1);
        WS_CONNECTIONS_ACTIVE.set(0);
        QUEUE_DEPTH.set(0);
        JOBS_IN_FLIGHT.set(0);
        courseforge_core::metrics::JOBS_TOTAL
            .with_label_values(&["completed"])
            .inc();

        let output = encode_metrics();

        assert!(output.contains("courseforge_http_request_duration_seconds"));
        assert!(output.contains("courseforge_ws_connections_active"));
        assert!(output.contains("courseforge_queue_depth"));
        assert!(output.contains("courseforge_jobs_in_flight"));
        assert!(output.contains("courseforge_jobs_total"));
    }
}
