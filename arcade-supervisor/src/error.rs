//! Error types for the worker supervisor

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Supervisor result type
pub type SupervisorResult<T> = Result<T, SupervisorError>;

/// Supervisor errors
///
/// Every variant is recovered at the supervisor boundary; callers tell them
/// apart through [`SupervisorError::code`].
#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Unknown worker: {worker}")]
    UnknownWorker { worker: String },

    #[error("Program for worker '{worker}' not found: {}", path.display())]
    ScriptNotFound { worker: String, path: PathBuf },

    #[error("Dependencies for worker '{worker}' unavailable: {}", packages.join(", "))]
    DependencyUnavailable { worker: String, packages: Vec<String> },

    #[error("Worker '{worker}' exited during startup ({})", describe_exit(*exit_code))]
    ProcessExitedImmediately {
        worker: String,
        exit_code: Option<i32>,
        stdout_tail: Vec<String>,
        stderr_tail: Vec<String>,
        /// Required capabilities that were missing when the worker was launched
        missing: Vec<String>,
    },

    #[error("Worker '{worker}' did not exit within {timeout:?} after a forced kill")]
    StopTimeout { worker: String, timeout: Duration },

    #[error("Invalid worker registry: {0}")]
    InvalidRegistry(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl SupervisorError {
    /// Wrap an OS-level failure with what was being attempted
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Stable error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            SupervisorError::UnknownWorker { .. } => "UNKNOWN_WORKER",
            SupervisorError::ScriptNotFound { .. } => "SCRIPT_NOT_FOUND",
            SupervisorError::DependencyUnavailable { .. } => "DEPENDENCY_UNAVAILABLE",
            SupervisorError::ProcessExitedImmediately { .. } => "PROCESS_EXITED_IMMEDIATELY",
            SupervisorError::StopTimeout { .. } => "STOP_TIMEOUT",
            SupervisorError::InvalidRegistry(_) | SupervisorError::Io { .. } => "SUPERVISOR_ERROR",
        }
    }

    /// Name of the worker the error concerns, if any
    pub fn worker(&self) -> Option<&str> {
        match self {
            SupervisorError::UnknownWorker { worker }
            | SupervisorError::ScriptNotFound { worker, .. }
            | SupervisorError::DependencyUnavailable { worker, .. }
            | SupervisorError::ProcessExitedImmediately { worker, .. }
            | SupervisorError::StopTimeout { worker, .. } => Some(worker),
            SupervisorError::InvalidRegistry(_) | SupervisorError::Io { .. } => None,
        }
    }
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}
