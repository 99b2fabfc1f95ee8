//! HTTP surface tests.
//!
//! Drives the worker router in-process and verifies the read-only
//! endpoints: health, progress lookup, Prometheus metrics and the
//! route table itself.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use courseforge_core::progress::ProgressStore;

use common::TestFixture;

#[tokio::test]
async fn test_health_reports_version_and_uptime() {
    let fixture = TestFixture::new();

    let response = fixture.get("/health").await;

    assert_status!(response, StatusCode::OK);
    assert_json_path!(response.body, "status", json!("ok"));
    assert_json_path!(response.body, "version", json!(env!("CARGO_PKG_VERSION")));
    assert!(response.body["uptime_secs"].is_u64());
}

#[tokio::test]
async fn test_progress_endpoint_returns_persisted_row() {
    let fixture = TestFixture::new();
    fixture
        .progress
        .create("prog-42", Some("course-7"), "sess-1")
        .expect("Failed to create progress row");

    let response = fixture.get("/api/v1/progress/prog-42").await;

    assert_status!(response, StatusCode::OK);
    assert_json_path!(response.body, "progressId", json!("prog-42"));
    assert_json_path!(response.body, "courseId", json!("course-7"));
    assert_json_path!(response.body, "sessionId", json!("sess-1"));
    assert_json_path!(response.body, "status", json!("pending"));
    assert_json_path!(response.body, "progressPercentage", json!(0.0));
    assert_eq!(response.body["errorLog"], json!([]));
}

#[tokio::test]
async fn test_unknown_progress_returns_not_found() {
    let fixture = TestFixture::new();

    let response = fixture.get("/api/v1/progress/no-such-progress").await;

    assert_status!(response, StatusCode::NOT_FOUND);
    assert_json_path!(
        response.body,
        "error",
        json!("Progress not found: no-such-progress")
    );
}

#[tokio::test]
async fn test_metrics_endpoint_serves_prometheus_text() {
    let fixture = TestFixture::new();

    let (status, body) = fixture.get_text("/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("# HELP"));
    assert!(body.contains("# TYPE"));
    // Gauge values are shared process-wide, so only assert presence.
    assert!(body.contains("courseforge_queue_depth"));
    assert!(body.contains("courseforge_jobs_in_flight"));
}

#[tokio::test]
async fn test_ws_route_rejects_plain_http() {
    let fixture = TestFixture::new();

    // Without the upgrade handshake headers the route must refuse the
    // request rather than fall through to a 404.
    let response = fixture.get("/api/v1/ws").await;

    assert_status!(response, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_job_submission_routes_absent() {
    let fixture = TestFixture::new();

    // Producers enqueue through the shared queue; this process exposes
    // no write endpoints.
    let response = fixture
        .post("/api/v1/jobs", json!({"progressId": "p", "sessionId": "s"}))
        .await;
    assert_status!(response, StatusCode::NOT_FOUND);

    // Progress lives under the /api/v1 prefix only.
    let response = fixture.get("/progress/prog-1").await;
    assert_status!(response, StatusCode::NOT_FOUND);
}
