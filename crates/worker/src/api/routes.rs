use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{handlers, progress, ws};
use crate::state::AppState;

/// Build the worker's HTTP surface.
///
/// Job submission is deliberately absent: producers enqueue through the
/// shared queue, this process only reports on what it is doing.
pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/progress/{id}", get(progress::get_progress))
        .route("/ws", get(ws::ws_handler));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn(super::middleware::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
