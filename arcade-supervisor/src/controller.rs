//! Platform-specific process control
//!
//! The supervisor never branches on the platform itself; spawn-time setup,
//! cooperative termination and forced kills all go through a
//! [`ProcessController`] selected at build time by [`platform_controller`].

use std::io;
use std::process::{Child, Command};
use std::sync::Arc;

/// How a termination request was delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationRequest {
    /// A signal the worker may handle before exiting
    Cooperative,
    /// The cooperative signal could not be delivered; the worker was terminated outright
    Forced,
}

/// Per-platform spawn configuration and termination strategy
pub trait ProcessController: Send + Sync {
    /// Adjust a worker command before it is spawned
    fn configure(&self, cmd: &mut Command);

    /// Ask the worker to exit
    fn request_termination(&self, child: &mut Child) -> io::Result<TerminationRequest>;

    /// Kill the worker unconditionally
    fn force_kill(&self, child: &mut Child) -> io::Result<()>;
}

/// The controller for the platform this binary was built for
pub fn platform_controller() -> Arc<dyn ProcessController> {
    #[cfg(unix)]
    let controller: Arc<dyn ProcessController> = Arc::new(unix::UnixController);

    #[cfg(windows)]
    let controller: Arc<dyn ProcessController> = Arc::new(windows::WindowsController);

    controller
}

/// `kill` that treats an already-reaped or already-exited child as success
fn kill_child(child: &mut Child) -> io::Result<()> {
    match child.kill() {
        Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
        other => other,
    }
}

#[cfg(unix)]
pub mod unix {
    use super::*;
    use nix::sys::signal::{kill, killpg, Signal};
    use nix::unistd::Pid;
    use std::os::unix::process::CommandExt;
    use tracing::debug;

    /// Runs each worker in its own process group and signals the whole group
    #[derive(Debug, Clone, Copy, Default)]
    pub struct UnixController;

    impl UnixController {
        fn signal(&self, child: &Child, signal: Signal) -> nix::Result<()> {
            let pid = Pid::from_raw(child.id() as i32);
            killpg(pid, signal).or_else(|e| {
                debug!("killpg({}, {:?}) failed: {}, signalling pid only", pid, signal, e);
                kill(pid, signal)
            })
        }
    }

    impl ProcessController for UnixController {
        fn configure(&self, cmd: &mut Command) {
            // Interpreter helpers spawned by the worker share its group
            cmd.process_group(0);
        }

        fn request_termination(&self, child: &mut Child) -> io::Result<TerminationRequest> {
            match self.signal(child, Signal::SIGTERM) {
                Ok(()) => Ok(TerminationRequest::Cooperative),
                Err(e) => {
                    debug!("SIGTERM to {} failed: {}, killing", child.id(), e);
                    kill_child(child)?;
                    Ok(TerminationRequest::Forced)
                }
            }
        }

        fn force_kill(&self, child: &mut Child) -> io::Result<()> {
            if let Err(e) = self.signal(child, Signal::SIGKILL) {
                debug!("SIGKILL to group {} failed: {}", child.id(), e);
            }
            kill_child(child)
        }
    }
}

#[cfg(windows)]
pub mod windows {
    use super::*;
    use std::os::windows::process::CommandExt;

    const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

    /// Windows has no cooperative signal for windowed workers; termination is unconditional
    #[derive(Debug, Clone, Copy, Default)]
    pub struct WindowsController;

    impl ProcessController for WindowsController {
        fn configure(&self, cmd: &mut Command) {
            // The default Media Foundation backend is slow to open webcams
            cmd.env("OPENCV_VIDEOIO_PRIORITY_MSMF", "0");
            cmd.creation_flags(CREATE_NEW_PROCESS_GROUP);
        }

        fn request_termination(&self, child: &mut Child) -> io::Result<TerminationRequest> {
            kill_child(child)?;
            Ok(TerminationRequest::Forced)
        }

        fn force_kill(&self, child: &mut Child) -> io::Result<()> {
            kill_child(child)
        }
    }
}
