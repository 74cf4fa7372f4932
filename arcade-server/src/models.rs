//! Response bodies for the control API

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use arcade_supervisor::{StartReport, StopReport, StopStatus, WorkerSnapshot};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartResponse {
    pub name: String,
    pub pid: u32,
    pub status: String,
    pub already_running: bool,
    pub used_fallback: bool,
    pub message: String,
}

impl From<StartReport> for StartResponse {
    fn from(report: StartReport) -> Self {
        let already_running = report.already_running();
        let message = if already_running {
            format!("{} is already running", report.name)
        } else if report.used_fallback {
            format!("{} started with its fallback program", report.name)
        } else {
            format!("{} started", report.name)
        };

        Self {
            pid: report.pid,
            status: "running".to_string(),
            already_running,
            used_fallback: report.used_fallback,
            message,
            name: report.name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopResponse {
    pub name: String,
    pub status: String,
    pub exit_code: Option<i32>,
    pub message: String,
}

impl From<StopReport> for StopResponse {
    fn from(report: StopReport) -> Self {
        let (status, message) = match report.status {
            StopStatus::Stopped => ("stopped", format!("{} stopped", report.name)),
            StopStatus::ForceKilled => ("killed", format!("{} did not exit in time and was killed", report.name)),
            StopStatus::AlreadyExited => ("exited", format!("{} had already exited", report.name)),
            StopStatus::NotRunning => ("not_running", format!("{} is not running", report.name)),
        };

        Self {
            status: status.to_string(),
            exit_code: report.exit_code,
            message,
            name: report.name,
        }
    }
}

/// Liveness of every defined worker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub workers: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub running_processes: Vec<String>,
    pub workers: Vec<WorkerSnapshot>,
}

impl HealthResponse {
    pub fn healthy(running_processes: Vec<String>, workers: Vec<WorkerSnapshot>) -> Self {
        Self {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            running_processes,
            workers,
        }
    }
}
