//! Web-specific error types and conversions
//!
//! Every error renders as `{"error": {"code", "message", "details"?}}` with
//! the matching HTTP status.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

/// Web-specific error type for HTTP API operations
#[derive(Debug, Error)]
pub enum WebError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// An error that carries its own code, status and structured details
    #[error("{message}")]
    Coded {
        status: StatusCode,
        code: String,
        message: String,
        details: Option<Value>,
    },
}

impl WebError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebError::NotFound { .. } => StatusCode::NOT_FOUND,
            WebError::Coded { status, .. } => *status,
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &str {
        match self {
            WebError::NotFound { .. } => "NOT_FOUND",
            WebError::Coded { code, .. } => code,
        }
    }

    pub fn details(&self) -> Option<&Value> {
        match self {
            WebError::Coded { details, .. } => details.as_ref(),
            _ => None,
        }
    }

    /// JSON body for this error
    pub fn body(&self) -> Value {
        let mut error = json!({
            "code": self.error_code(),
            "message": self.to_string(),
        });
        if let Some(details) = self.details() {
            error["details"] = details.clone();
        }
        json!({ "error": error })
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {} ({})", self, self.error_code());
        } else {
            tracing::debug!("Request rejected: {} ({})", self, self.error_code());
        }
        (status, Json(self.body())).into_response()
    }
}

// Common error constructors
impl WebError {
    pub fn not_found(message: impl Into<String>) -> Self {
        WebError::NotFound {
            message: message.into(),
        }
    }

    pub fn coded(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        WebError::Coded {
            status,
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Attach structured details; a no-op for errors without a code of their own
    pub fn with_details(mut self, value: Value) -> Self {
        if let WebError::Coded { details, .. } = &mut self {
            *details = Some(value);
        }
        self
    }
}
