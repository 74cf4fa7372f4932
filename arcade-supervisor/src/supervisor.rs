//! The process supervisor
//!
//! Start and stop for one name are serialized by that name's slot lock, which
//! stays held across the health-check grace and settle sleeps. Status and log
//! inspection never take the operation lock; they copy the handle out and
//! poll it.

use futures::future::join_all;
use std::collections::BTreeMap;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use arcade_config::{ArcadeConfig, PackageRequirement, SupervisorConfig, WorkerDefinition};

use crate::controller::{platform_controller, ProcessController};
use crate::error::{SupervisorError, SupervisorResult};
use crate::handle::{WorkerHandle, WorkerState};
use crate::logs::{LogCapture, LogFiles};
use crate::probe::{DependencyProber, InterpreterProber};
use crate::provision::{NoopProvisioner, PipProvisioner, Provisioner};
use crate::registry::{Resolution, Slot, WorkerRegistry};
use crate::report::{
    LogsReport, StartReport, StartStatus, StopAllReport, StopFailure, StopReport, StopStatus,
    WorkerSnapshot,
};

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Owns the worker registry and every running worker process
pub struct Supervisor {
    registry: WorkerRegistry,
    config: SupervisorConfig,
    logs: LogCapture,
    prober: Arc<dyn DependencyProber>,
    provisioner: Arc<dyn Provisioner>,
    provisioning: bool,
    controller: Arc<dyn ProcessController>,
}

impl Supervisor {
    /// Create a supervisor with the default prober, provisioner and
    /// platform controller
    pub fn new(registry: WorkerRegistry, config: SupervisorConfig) -> Self {
        let prober: Arc<dyn DependencyProber> = Arc::new(InterpreterProber::new(
            config.interpreter.clone(),
            config.probe_timeout,
        ));
        let provisioner: Arc<dyn Provisioner> = if config.provisioning.enabled {
            Arc::new(PipProvisioner::new(
                config.interpreter.clone(),
                config.provisioning.timeout,
            ))
        } else {
            Arc::new(NoopProvisioner)
        };

        Self {
            logs: LogCapture::new(config.log_dir.clone()),
            registry,
            prober,
            provisioner,
            provisioning: config.provisioning.enabled,
            controller: platform_controller(),
            config,
        }
    }

    pub fn from_config(config: &ArcadeConfig) -> SupervisorResult<Self> {
        let registry = WorkerRegistry::from_config(&config.workers)?;
        Ok(Self::new(registry, config.supervisor.clone()))
    }

    pub fn with_prober(mut self, prober: Arc<dyn DependencyProber>) -> Self {
        self.prober = prober;
        self
    }

    /// Install a provisioner; this enables provisioning regardless of
    /// `provisioning.enabled`
    pub fn with_provisioner(mut self, provisioner: Arc<dyn Provisioner>) -> Self {
        self.provisioner = provisioner;
        self.provisioning = true;
        self
    }

    pub fn with_controller(mut self, controller: Arc<dyn ProcessController>) -> Self {
        self.controller = controller;
        self
    }

    pub fn registry(&self) -> &WorkerRegistry {
        &self.registry
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    pub fn log_capture(&self) -> &LogCapture {
        &self.logs
    }

    /// Start `name`, or report the already running process
    pub async fn start(&self, name: &str) -> SupervisorResult<StartReport> {
        let definition = self.registry.definition(name)?;
        let slot = self.registry.slot(name)?;
        let _op = slot.op.lock().await;
        slot.set_state(WorkerState::Starting);

        let resolution = match self.resolve_program(name).await {
            Ok(resolution) => resolution,
            Err(e) => {
                slot.restore_state();
                return Err(e);
            }
        };

        let existing = slot.handle();
        if let Some(handle) = &existing {
            if handle.program() == resolution.program && handle.is_alive() {
                debug!("Worker '{}' already running with pid {}", name, handle.pid());
                slot.restore_state();
                return Ok(StartReport::from_handle(handle, StartStatus::AlreadyRunning));
            }
        }

        match self.launch(definition, &slot, existing, resolution).await {
            Ok(handle) => {
                let report = StartReport::from_handle(&handle, StartStatus::Started);
                slot.publish(handle);
                Ok(report)
            }
            Err(e) => {
                slot.clear();
                Err(e)
            }
        }
    }

    async fn resolve_program(&self, name: &str) -> SupervisorResult<Resolution> {
        let mut resolution = self.registry.resolve(name, self.prober.as_ref()).await?;
        resolution.program = std::path::absolute(&resolution.program).map_err(|e| {
            SupervisorError::io(
                format!("Failed to resolve path {}", resolution.program.display()),
                e,
            )
        })?;
        Ok(resolution)
    }

    async fn launch(
        &self,
        definition: &WorkerDefinition,
        slot: &Slot,
        existing: Option<WorkerHandle>,
        resolution: Resolution,
    ) -> SupervisorResult<WorkerHandle> {
        let name = definition.name.as_str();

        if let Some(stale) = existing {
            info!(
                "Replacing worker '{}' (pid {}) before restart",
                name,
                stale.pid()
            );
            slot.clear();
            slot.set_state(WorkerState::Starting);
            if let Err(e) = self.terminate(&stale).await {
                warn!("Failed to clean up previous process of worker '{}': {}", name, e);
            }
            tokio::time::sleep(self.config.restart_settle).await;
        }

        let program = resolution.program;
        if !program.is_file() {
            return Err(SupervisorError::ScriptNotFound {
                worker: name.to_string(),
                path: program,
            });
        }

        if self.provisioning {
            self.provision(definition).await?;
        }

        let files = self.logs.open(name)?;
        let child = {
            let mut command = self.build_command(definition, &program, files);
            command
                .spawn()
                .map_err(|e| SupervisorError::io(format!("Failed to spawn worker '{}'", name), e))?
        };
        let handle = WorkerHandle::new(
            name,
            program,
            resolution.used_fallback,
            child,
            self.logs.paths(name),
        );
        info!(
            "Spawned worker '{}' (pid {}) running {}",
            name,
            handle.pid(),
            handle.program().display()
        );

        tokio::time::sleep(self.config.health_check_grace).await;

        match handle.poll() {
            Ok(None) => {
                info!("Worker '{}' is running with pid {}", name, handle.pid());
                Ok(handle)
            }
            Ok(Some(status)) => {
                let (stdout_tail, stderr_tail) = self.logs.tail_both(name, self.config.failure_tail);
                error!(
                    "Worker '{}' (pid {}) exited during startup with {}",
                    name,
                    handle.pid(),
                    status
                );
                Err(SupervisorError::ProcessExitedImmediately {
                    worker: name.to_string(),
                    exit_code: status.code(),
                    stdout_tail,
                    stderr_tail,
                    missing: resolution.missing,
                })
            }
            Err(e) => {
                if let Err(kill_err) = handle.with_child(|child| self.controller.force_kill(child)) {
                    warn!("Failed to kill worker '{}' after poll error: {}", name, kill_err);
                }
                Err(SupervisorError::io(
                    format!("Failed to poll worker '{}'", name),
                    e,
                ))
            }
        }
    }

    async fn provision(&self, definition: &WorkerDefinition) -> SupervisorResult<()> {
        let mut absent: Vec<PackageRequirement> = Vec::new();
        for package in &definition.packages {
            if !self.prober.probe(&package.module).await {
                absent.push(package.clone());
            }
        }
        if absent.is_empty() {
            return Ok(());
        }
        info!(
            "Provisioning {} package(s) for worker '{}'",
            absent.len(),
            definition.name
        );
        self.provisioner.provision(&definition.name, &absent).await
    }

    fn build_command(&self, definition: &WorkerDefinition, program: &Path, files: LogFiles) -> Command {
        let interpreter = definition.interpreter.clone().or_else(|| {
            is_python_program(program).then(|| self.config.interpreter.clone())
        });

        let mut command = match interpreter {
            Some(interpreter) => {
                let mut command = Command::new(interpreter);
                command.arg(program);
                command
            }
            None => Command::new(program),
        };

        command.args(&definition.args);
        if let Some(dir) = program.parent() {
            command.current_dir(dir);
        }
        command
            .env("PYTHONIOENCODING", "utf-8")
            .env("PYTHONUTF8", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::from(files.stdout))
            .stderr(Stdio::from(files.stderr));
        self.controller.configure(&mut command);
        command.envs(&definition.env);
        command
    }

    /// Stop `name` if it is running
    ///
    /// Queues behind a start of the same name that is still in flight.
    pub async fn stop(&self, name: &str) -> SupervisorResult<StopReport> {
        let slot = self.registry.slot(name)?;
        let _op = slot.op.lock().await;
        let Some(handle) = slot.handle() else {
            return Ok(StopReport::not_running(name));
        };

        slot.set_state(WorkerState::Stopping);
        let result = self.terminate(&handle).await;
        slot.clear();

        let report = result?;
        if report.terminated() {
            tokio::time::sleep(self.config.settle_interval).await;
        }
        Ok(report)
    }

    async fn terminate(&self, handle: &WorkerHandle) -> SupervisorResult<StopReport> {
        let name = handle.name();
        let pid = handle.pid();

        if let Some(status) = self.exit_status(handle)? {
            info!("Worker '{}' (pid {}) had already exited with {}", name, pid, status);
            return Ok(StopReport::new(name, StopStatus::AlreadyExited, status.code()));
        }

        info!("Stopping worker '{}' (pid {})", name, pid);
        handle
            .with_child(|child| self.controller.request_termination(child))
            .map_err(|e| SupervisorError::io(format!("Failed to signal worker '{}'", name), e))?;

        if let Some(status) = self.wait_for_exit(handle, self.config.stop_timeout).await {
            info!("Worker '{}' (pid {}) stopped with {}", name, pid, status);
            return Ok(StopReport::new(name, StopStatus::Stopped, status.code()));
        }

        warn!(
            "Worker '{}' (pid {}) did not exit within {:?}, forcing kill",
            name, pid, self.config.stop_timeout
        );
        handle
            .with_child(|child| self.controller.force_kill(child))
            .map_err(|e| SupervisorError::io(format!("Failed to kill worker '{}'", name), e))?;

        match self.wait_for_exit(handle, self.config.kill_wait).await {
            Some(status) => {
                info!("Worker '{}' (pid {}) killed", name, pid);
                Ok(StopReport::new(name, StopStatus::ForceKilled, status.code()))
            }
            None => {
                error!("Worker '{}' (pid {}) survived a forced kill", name, pid);
                Err(SupervisorError::StopTimeout {
                    worker: name.to_string(),
                    timeout: self.config.kill_wait,
                })
            }
        }
    }

    fn exit_status(&self, handle: &WorkerHandle) -> SupervisorResult<Option<ExitStatus>> {
        handle.poll().map_err(|e| {
            SupervisorError::io(format!("Failed to poll worker '{}'", handle.name()), e)
        })
    }

    async fn wait_for_exit(&self, handle: &WorkerHandle, timeout: Duration) -> Option<ExitStatus> {
        let deadline = Instant::now() + timeout;
        loop {
            match handle.poll() {
                Ok(Some(status)) => return Some(status),
                Ok(None) => {}
                Err(e) => debug!("Polling worker '{}' failed: {}", handle.name(), e),
            }
            if Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(EXIT_POLL_INTERVAL).await;
        }
    }

    /// Stop every worker that has a handle or an operation in flight,
    /// concurrently
    pub async fn stop_all(&self) -> StopAllReport {
        let names: Vec<&str> = self
            .registry
            .names()
            .filter(|name| {
                self.registry.handle(name).is_some()
                    || self.registry.state(name) != WorkerState::Absent
            })
            .collect();

        let results = join_all(names.iter().map(|name| self.stop(name))).await;

        let mut report = StopAllReport::default();
        for (name, result) in names.into_iter().zip(results) {
            match result {
                Ok(stop) if stop.status == StopStatus::NotRunning => {}
                Ok(_) => report.stopped.push(name.to_string()),
                Err(e) => {
                    error!("Failed to stop worker '{}': {}", name, e);
                    report.failed.push(StopFailure {
                        name: name.to_string(),
                        code: e.code().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }
        report
    }

    /// Liveness of every defined worker
    pub fn status(&self) -> BTreeMap<String, bool> {
        self.registry
            .names()
            .map(|name| {
                let alive = self.observe(name).map(|(_, alive)| alive).unwrap_or(false);
                (name.to_string(), alive)
            })
            .collect()
    }

    pub fn snapshots(&self) -> Vec<WorkerSnapshot> {
        self.registry
            .names()
            .map(|name| {
                let state = self.registry.state(name);
                match self.observe(name) {
                    Some((handle, true)) => WorkerSnapshot::from_handle(&handle, state, true),
                    Some((handle, false)) => {
                        WorkerSnapshot::from_handle(&handle, WorkerState::Absent, false)
                    }
                    None => WorkerSnapshot::absent(name, state),
                }
            })
            .collect()
    }

    /// Names of workers whose processes are alive
    pub fn running_workers(&self) -> Vec<String> {
        self.status()
            .into_iter()
            .filter_map(|(name, alive)| alive.then_some(name))
            .collect()
    }

    /// Recent output of `name`
    pub fn logs(&self, name: &str) -> SupervisorResult<LogsReport> {
        self.registry.definition(name)?;
        let (stdout_tail, stderr_tail) = self.logs.tail_both(name, self.config.diagnostic_tail);
        let alive = self.observe(name).map(|(_, alive)| alive).unwrap_or(false);
        Ok(LogsReport {
            name: name.to_string(),
            stdout_tail,
            stderr_tail,
            alive,
        })
    }

    /// Copy out and poll the handle for `name`
    ///
    /// A handle found dead is removed when no start or stop is in flight for
    /// that name.
    fn observe(&self, name: &str) -> Option<(WorkerHandle, bool)> {
        let slot = self.registry.slot(name).ok()?;
        let handle = slot.handle()?;
        let alive = handle.is_alive();
        if !alive {
            if let Ok(_op) = slot.op.try_lock() {
                if slot.clear_if_same(&handle) {
                    info!("Worker '{}' (pid {}) exited, removing handle", name, handle.pid());
                }
            }
        }
        Some((handle, alive))
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn is_python_program(program: &Path) -> bool {
    program
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("py"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::StaticProber;

    fn supervisor(dir: &Path) -> Supervisor {
        let registry = WorkerRegistry::new(
            vec![
                WorkerDefinition::new("color", "color_identifier.py"),
                WorkerDefinition::new("gesture", "gesture_recognition.py")
                    .with_fallback("gesture_recognition_fallback.py")
                    .requires("mediapipe"),
            ],
            dir.join("face"),
        )
        .unwrap();
        let config = SupervisorConfig {
            log_dir: dir.join("logs"),
            ..SupervisorConfig::default()
        };
        Supervisor::new(registry, config).with_prober(Arc::new(StaticProber::none()))
    }

    #[test]
    fn test_python_detection() {
        assert!(is_python_program(Path::new("face/shape.py")));
        assert!(is_python_program(Path::new("face/SHAPE.PY")));
        assert!(!is_python_program(Path::new("face/shape.sh")));
        assert!(!is_python_program(Path::new("face/shape")));
    }

    #[tokio::test]
    async fn test_start_unknown_worker() {
        let dir = tempfile::tempdir().unwrap();
        let supervisor = supervisor(dir.path());
        let err = supervisor.start("tetris").await.unwrap_err();
        assert_eq!(err.code(), "UNKNOWN_WORKER");
    }

    #[tokio::test]
    async fn test_start_missing_program() {
        let dir = tempfile::tempdir().unwrap();
        let supervisor = supervisor(dir.path());
        let err = supervisor.start("color").await.unwrap_err();
        match err {
            SupervisorError::ScriptNotFound { worker, path } => {
                assert_eq!(worker, "color");
                assert!(path.ends_with("face/color_identifier.py"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(supervisor.registry().state("color"), WorkerState::Absent);
    }

    #[tokio::test]
    async fn test_missing_fallback_reports_fallback_path() {
        let dir = tempfile::tempdir().unwrap();
        let supervisor = supervisor(dir.path());
        let err = supervisor.start("gesture").await.unwrap_err();
        match err {
            SupervisorError::ScriptNotFound { path, .. } => {
                assert!(path.ends_with("gesture_recognition_fallback.py"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stop_and_status_when_idle() {
        let dir = tempfile::tempdir().unwrap();
        let supervisor = supervisor(dir.path());

        let report = supervisor.stop("color").await.unwrap();
        assert_eq!(report.status, StopStatus::NotRunning);
        assert!(matches!(
            supervisor.stop("tetris").await,
            Err(SupervisorError::UnknownWorker { .. })
        ));

        let status = supervisor.status();
        assert_eq!(status.len(), 2);
        assert!(status.values().all(|alive| !alive));
        assert!(supervisor.running_workers().is_empty());
        assert!(supervisor.stop_all().await.stopped.is_empty());
    }

    #[tokio::test]
    async fn test_logs_for_idle_worker() {
        let dir = tempfile::tempdir().unwrap();
        let supervisor = supervisor(dir.path());
        let report = supervisor.logs("color").unwrap();
        assert!(report.stdout_tail.is_empty());
        assert!(report.stderr_tail.is_empty());
        assert!(!report.alive);
        assert!(supervisor.logs("tetris").is_err());
    }

    #[cfg(unix)]
    struct InertController;

    #[cfg(unix)]
    impl ProcessController for InertController {
        fn configure(&self, _cmd: &mut Command) {}

        fn request_termination(
            &self,
            _child: &mut std::process::Child,
        ) -> std::io::Result<crate::controller::TerminationRequest> {
            Ok(crate::controller::TerminationRequest::Cooperative)
        }

        fn force_kill(&self, _child: &mut std::process::Child) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stop_timeout_reports_kill_wait() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("stuck.sh"),
            "#!/bin/sh\nwhile true; do sleep 0.1; done\n",
        )
        .unwrap();
        let registry = WorkerRegistry::new(
            vec![WorkerDefinition::new("stuck", "stuck.sh").with_interpreter("sh")],
            dir.path(),
        )
        .unwrap();
        let config = SupervisorConfig {
            log_dir: dir.path().join("logs"),
            health_check_grace: Duration::from_millis(200),
            stop_timeout: Duration::from_millis(200),
            kill_wait: Duration::from_millis(300),
            settle_interval: Duration::ZERO,
            ..SupervisorConfig::default()
        };
        let supervisor = Supervisor::new(registry, config)
            .with_prober(Arc::new(StaticProber::none()))
            .with_controller(Arc::new(InertController));

        supervisor.start("stuck").await.unwrap();
        let handle = supervisor.registry().handle("stuck").unwrap();

        match supervisor.stop("stuck").await.unwrap_err() {
            SupervisorError::StopTimeout { worker, timeout } => {
                assert_eq!(worker, "stuck");
                assert_eq!(timeout, Duration::from_millis(300));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(supervisor.registry().handle("stuck").is_none());
        assert_eq!(supervisor.registry().state("stuck"), WorkerState::Absent);

        handle.with_child(|child| {
            child.kill().unwrap();
            child.wait().unwrap();
        });
    }

    #[test]
    fn test_with_provisioner_enables_provisioning() {
        let dir = tempfile::tempdir().unwrap();
        let supervisor = supervisor(dir.path());
        assert!(!supervisor.provisioning);
        let supervisor = supervisor.with_provisioner(Arc::new(NoopProvisioner));
        assert!(supervisor.provisioning);
    }

    #[test]
    fn test_snapshots_cover_every_worker() {
        let dir = tempfile::tempdir().unwrap();
        let supervisor = supervisor(dir.path());
        let snapshots = supervisor.snapshots();
        let names: Vec<&str> = snapshots.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["color", "gesture"]);
        assert!(snapshots.iter().all(|s| s.state == WorkerState::Absent && !s.alive));
    }
}
