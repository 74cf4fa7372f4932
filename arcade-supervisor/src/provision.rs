//! Best-effort provisioning of missing worker packages

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{info, warn};

use arcade_config::PackageRequirement;

use crate::error::{SupervisorError, SupervisorResult};

/// Installs packages a worker needs before it is spawned
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Install `packages` for `worker`; fails with `DependencyUnavailable`
    async fn provision(&self, worker: &str, packages: &[PackageRequirement]) -> SupervisorResult<()>;
}

/// Leaves provisioning to deployment
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProvisioner;

#[async_trait]
impl Provisioner for NoopProvisioner {
    async fn provision(&self, _worker: &str, _packages: &[PackageRequirement]) -> SupervisorResult<()> {
        Ok(())
    }
}

/// Installs distributions with `<interpreter> -m pip install`
#[derive(Debug, Clone)]
pub struct PipProvisioner {
    interpreter: String,
    timeout: Duration,
}

impl PipProvisioner {
    pub fn new(interpreter: impl Into<String>, timeout: Duration) -> Self {
        Self {
            interpreter: interpreter.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Provisioner for PipProvisioner {
    async fn provision(&self, worker: &str, packages: &[PackageRequirement]) -> SupervisorResult<()> {
        if packages.is_empty() {
            return Ok(());
        }

        let distributions: Vec<String> = packages.iter().map(|p| p.distribution.clone()).collect();
        let unavailable = || SupervisorError::DependencyUnavailable {
            worker: worker.to_string(),
            packages: distributions.clone(),
        };

        info!("Installing {} for worker '{}'", distributions.join(", "), worker);

        let mut cmd = Command::new(&self.interpreter);
        cmd.args(["-m", "pip", "install", "--disable-pip-version-check"])
            .args(&distributions)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!("Could not run {} -m pip for worker '{}': {}", self.interpreter, worker, e);
                return Err(unavailable());
            }
            Err(_) => {
                warn!("Provisioning for worker '{}' timed out after {:?}", worker, self.timeout);
                return Err(unavailable());
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(
                "pip install for worker '{}' failed with {}: {}",
                worker,
                output.status,
                stderr.lines().last().unwrap_or_default()
            );
            return Err(unavailable());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packages() -> Vec<PackageRequirement> {
        vec![PackageRequirement {
            module: "cv2".to_string(),
            distribution: "opencv-python".to_string(),
        }]
    }

    #[tokio::test]
    async fn test_noop_provisioner() {
        assert!(NoopProvisioner.provision("color", &packages()).await.is_ok());
    }

    #[tokio::test]
    async fn test_pip_provisioner_failure_names_packages() {
        let provisioner = PipProvisioner::new("/nonexistent/python", Duration::from_secs(5));
        let err = provisioner.provision("color", &packages()).await.unwrap_err();
        match err {
            SupervisorError::DependencyUnavailable { worker, packages } => {
                assert_eq!(worker, "color");
                assert_eq!(packages, vec!["opencv-python".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_pip_provisioner_nothing_to_do() {
        let provisioner = PipProvisioner::new("/nonexistent/python", Duration::from_secs(5));
        assert!(provisioner.provision("color", &[]).await.is_ok());
    }
}
