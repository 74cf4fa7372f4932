//! Running worker handles

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, ExitStatus};
use std::sync::Arc;
use tracing::warn;

use crate::logs::LogPaths;

/// Lifecycle state of a logical worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Absent,
    Starting,
    Running,
    Stopping,
}

/// The supervisor's record of a worker that passed its health check
///
/// Cloning is cheap and shares the underlying child process, so callers can
/// copy a handle out of the registry and poll it without holding any
/// registry lock.
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    name: String,
    program: PathBuf,
    used_fallback: bool,
    pid: u32,
    started_at: DateTime<Utc>,
    logs: LogPaths,
    // std rather than tokio: status reads poll from sync code via try_wait, and exit waits poll on a timer
    child: Arc<Mutex<Child>>,
}

impl WorkerHandle {
    pub(crate) fn new(
        name: impl Into<String>,
        program: PathBuf,
        used_fallback: bool,
        child: Child,
        logs: LogPaths,
    ) -> Self {
        Self {
            name: name.into(),
            program,
            used_fallback,
            pid: child.id(),
            started_at: Utc::now(),
            logs,
            child: Arc::new(Mutex::new(child)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn used_fallback(&self) -> bool {
        self.used_fallback
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn logs(&self) -> &LogPaths {
        &self.logs
    }

    pub fn uptime_seconds(&self) -> i64 {
        Utc::now().signed_duration_since(self.started_at).num_seconds()
    }

    /// Non-blocking exit check; `Some` once the process has exited
    pub fn poll(&self) -> io::Result<Option<ExitStatus>> {
        self.child.lock().try_wait()
    }

    /// Liveness poll
    pub fn is_alive(&self) -> bool {
        match self.poll() {
            Ok(status) => status.is_none(),
            Err(e) => {
                warn!("Liveness poll for worker '{}' (pid {}) failed: {}", self.name, self.pid, e);
                false
            }
        }
    }

    /// Whether two handles refer to the same spawned process
    pub fn same_process(&self, other: &WorkerHandle) -> bool {
        Arc::ptr_eq(&self.child, &other.child)
    }

    pub(crate) fn with_child<R>(&self, f: impl FnOnce(&mut Child) -> R) -> R {
        f(&mut self.child.lock())
    }
}
