//! Arcade worker supervisor
//!
//! Launches, monitors and tears down the activity worker processes. Each
//! logical worker name maps to one program; the supervisor guarantees at
//! most one live process per name, tells a crash on startup apart from a
//! healthy worker, captures worker output into per-worker log files and
//! stops workers with a cooperative signal that escalates to a forced kill.

pub mod controller;
pub mod error;
pub mod handle;
pub mod logs;
pub mod probe;
pub mod provision;
pub mod registry;
pub mod report;
pub mod supervisor;

// Re-export main types
pub use arcade_config::{PackageRequirement, SupervisorConfig, TailLimits, WorkerDefinition};
pub use controller::{platform_controller, ProcessController, TerminationRequest};
pub use error::{SupervisorError, SupervisorResult};
pub use handle::{WorkerHandle, WorkerState};
pub use logs::{LogCapture, LogFiles, LogPaths};
pub use probe::{DependencyProber, InterpreterProber, StaticProber};
pub use provision::{NoopProvisioner, PipProvisioner, Provisioner};
pub use registry::{Resolution, WorkerRegistry};
pub use report::{LogsReport, StartReport, StartStatus, StopAllReport, StopFailure, StopReport, StopStatus, WorkerSnapshot};
pub use supervisor::Supervisor;
