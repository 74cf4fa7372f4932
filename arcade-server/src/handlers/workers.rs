//! Worker control endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;

use arcade_supervisor::{LogsReport, StopAllReport};

use crate::{
    context::AppState,
    errors::RestResult,
    models::{StartResponse, StatusResponse, StopResponse},
};

/// Liveness of every worker
pub async fn list_workers(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        workers: state.supervisor.status(),
    })
}

pub async fn start_worker(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> RestResult<Json<StartResponse>> {
    info!("Start requested for worker '{}'", name);
    let report = state.supervisor.start(&name).await?;
    Ok(Json(report.into()))
}

pub async fn stop_worker(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> RestResult<Json<StopResponse>> {
    info!("Stop requested for worker '{}'", name);
    let report = state.supervisor.stop(&name).await?;
    Ok(Json(report.into()))
}

/// Stop every running worker; per-worker failures are listed, not raised
pub async fn stop_all_workers(State(state): State<AppState>) -> Json<StopAllReport> {
    info!("Stop requested for all workers");
    Json(state.supervisor.stop_all().await)
}

pub async fn worker_logs(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> RestResult<Json<LogsReport>> {
    Ok(Json(state.supervisor.logs(&name)?))
}
