//! Outcome types returned by supervisor operations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::handle::{WorkerHandle, WorkerState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartStatus {
    Started,
    AlreadyRunning,
}

/// Result of a successful start
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartReport {
    pub name: String,
    pub pid: u32,
    pub program: PathBuf,
    pub used_fallback: bool,
    pub started_at: DateTime<Utc>,
    pub status: StartStatus,
}

impl StartReport {
    pub(crate) fn from_handle(handle: &WorkerHandle, status: StartStatus) -> Self {
        Self {
            name: handle.name().to_string(),
            pid: handle.pid(),
            program: handle.program().to_path_buf(),
            used_fallback: handle.used_fallback(),
            started_at: handle.started_at(),
            status,
        }
    }

    pub fn already_running(&self) -> bool {
        self.status == StartStatus::AlreadyRunning
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopStatus {
    /// Exited after the cooperative request
    Stopped,
    /// Needed the forced kill
    ForceKilled,
    /// Had already exited before the stop request
    AlreadyExited,
    /// No handle existed
    NotRunning,
}

/// Result of a successful stop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopReport {
    pub name: String,
    pub status: StopStatus,
    pub exit_code: Option<i32>,
}

impl StopReport {
    pub(crate) fn new(name: impl Into<String>, status: StopStatus, exit_code: Option<i32>) -> Self {
        Self {
            name: name.into(),
            status,
            exit_code,
        }
    }

    pub(crate) fn not_running(name: impl Into<String>) -> Self {
        Self::new(name, StopStatus::NotRunning, None)
    }

    /// Whether a live process was terminated by this stop
    pub fn terminated(&self) -> bool {
        matches!(self.status, StopStatus::Stopped | StopStatus::ForceKilled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopFailure {
    pub name: String,
    pub code: String,
    pub error: String,
}

/// Result of stopping every worker
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StopAllReport {
    pub stopped: Vec<String>,
    pub failed: Vec<StopFailure>,
}

/// Recent output of one worker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsReport {
    pub name: String,
    pub stdout_tail: Vec<String>,
    pub stderr_tail: Vec<String>,
    pub alive: bool,
}

/// Point-in-time view of one worker name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSnapshot {
    pub name: String,
    pub state: WorkerState,
    pub alive: bool,
    pub pid: Option<u32>,
    pub program: Option<PathBuf>,
    pub used_fallback: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub uptime_seconds: Option<i64>,
}

impl WorkerSnapshot {
    pub(crate) fn absent(name: impl Into<String>, state: WorkerState) -> Self {
        Self {
            name: name.into(),
            state,
            alive: false,
            pid: None,
            program: None,
            used_fallback: false,
            started_at: None,
            uptime_seconds: None,
        }
    }

    pub(crate) fn from_handle(handle: &WorkerHandle, state: WorkerState, alive: bool) -> Self {
        Self {
            name: handle.name().to_string(),
            state,
            alive,
            pid: Some(handle.pid()),
            program: Some(handle.program().to_path_buf()),
            used_fallback: handle.used_fallback(),
            started_at: Some(handle.started_at()),
            uptime_seconds: alive.then(|| handle.uptime_seconds()),
        }
    }
}
