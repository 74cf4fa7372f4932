//! Conversion of supervisor failures into HTTP error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use arcade_supervisor::SupervisorError;
use arcade_web::WebError;

/// REST API error type
#[derive(Error, Debug)]
pub enum RestError {
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
}

/// Result type for REST operations
pub type RestResult<T> = Result<T, RestError>;

impl RestError {
    /// Convert into the shared web error, keeping the supervisor's error code
    pub fn into_web_error(self) -> WebError {
        match self {
            RestError::Supervisor(err) => supervisor_error(err),
        }
    }
}

fn supervisor_error(err: SupervisorError) -> WebError {
    let status = match &err {
        SupervisorError::UnknownWorker { .. } | SupervisorError::ScriptNotFound { .. } => {
            StatusCode::NOT_FOUND
        }
        SupervisorError::DependencyUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        SupervisorError::ProcessExitedImmediately { .. }
        | SupervisorError::StopTimeout { .. }
        | SupervisorError::InvalidRegistry(_)
        | SupervisorError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let details = match &err {
        SupervisorError::ScriptNotFound { path, .. } => Some(json!({ "path": path.display().to_string() })),
        SupervisorError::DependencyUnavailable { packages, .. } => Some(json!({ "packages": packages })),
        SupervisorError::ProcessExitedImmediately {
            exit_code,
            stdout_tail,
            stderr_tail,
            missing,
            ..
        } => Some(json!({
            "exit_code": exit_code,
            "stdout_tail": stdout_tail,
            "stderr_tail": stderr_tail,
            "missing": missing,
        })),
        SupervisorError::StopTimeout { timeout, .. } => {
            Some(json!({ "timeout_seconds": timeout.as_secs_f64() }))
        }
        _ => None,
    };

    let web = WebError::coded(status, err.code(), err.to_string());
    match details {
        Some(details) => web.with_details(details),
        None => web,
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        self.into_web_error().into_response()
    }
}
