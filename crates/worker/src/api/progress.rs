//! Progress polling endpoint.
//!
//! Clients that cannot hold a WebSocket open poll the persisted progress
//! row instead; both views are written by the same tracker.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use courseforge_core::progress::GenerationProgress;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ProgressErrorResponse {
    pub error: String,
}

/// Fetch the persisted progress row for one generation job.
pub async fn get_progress(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<GenerationProgress>, impl IntoResponse> {
    match state.progress().get(&id) {
        Ok(Some(progress)) => Ok(Json(progress)),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(ProgressErrorResponse {
                error: format!("Progress not found: {}", id),
            }),
        )),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ProgressErrorResponse {
                error: e.to_string(),
            }),
        )),
    }
}
