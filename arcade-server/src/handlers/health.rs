//! Liveness endpoints

use axum::{extract::State, http::Uri, Json};
use tracing::debug;

use arcade_web::WebError;

use crate::{context::AppState, models::HealthResponse};

pub async fn root() -> &'static str {
    "Arcade backend is running"
}

/// Health check with the state of every worker
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    debug!("Health check requested");

    Json(HealthResponse::healthy(
        state.supervisor.running_workers(),
        state.supervisor.snapshots(),
    ))
}

pub async fn not_found(uri: Uri) -> WebError {
    WebError::not_found(format!("no route for {}", uri.path()))
}
