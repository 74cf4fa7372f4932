//! Process supervisor configuration

use crate::error::ConfigResult;
use crate::validation::{validate_nonzero_duration, validate_positive, validate_required_string, Validatable};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Timing, log capture and provisioning settings for the process supervisor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Directory holding the per-worker `{name}.out.log` / `{name}.err.log` files
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Interpreter used for `.py` worker programs and dependency probes
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// Wait after spawn before a worker is considered healthy
    #[serde(with = "crate::domains::utils::serde_duration", default = "default_health_check_grace")]
    pub health_check_grace: Duration,

    /// How long a cooperative stop may take before escalating to a forced kill
    #[serde(with = "crate::domains::utils::serde_duration", default = "default_stop_timeout")]
    pub stop_timeout: Duration,

    /// How long to wait for a forced kill to be confirmed
    #[serde(with = "crate::domains::utils::serde_duration", default = "default_kill_wait")]
    pub kill_wait: Duration,

    /// Pause after a stop so the camera device is released before the next start
    #[serde(with = "crate::domains::utils::serde_duration", default = "default_settle_interval")]
    pub settle_interval: Duration,

    /// Pause between cleaning up a stale worker and launching its replacement
    #[serde(with = "crate::domains::utils::serde_duration", default = "default_settle_interval")]
    pub restart_settle: Duration,

    /// Upper bound for a single dependency probe
    #[serde(with = "crate::domains::utils::serde_duration", default = "default_probe_timeout")]
    pub probe_timeout: Duration,

    /// Tail read back when a worker dies during the health-check grace period
    #[serde(default = "default_failure_tail")]
    pub failure_tail: TailLimits,

    /// Tail returned by the logs query
    #[serde(default = "default_diagnostic_tail")]
    pub diagnostic_tail: TailLimits,

    /// Runtime dependency provisioning
    #[serde(default)]
    pub provisioning: ProvisioningConfig,
}

/// Bounds for reading the end of a log file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TailLimits {
    /// Maximum number of bytes read from the end of the file
    pub max_bytes: u64,
    /// Maximum number of lines returned
    pub max_lines: usize,
}

/// Runtime provisioning of missing worker packages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisioningConfig {
    /// Install missing packages before spawning a worker
    #[serde(default = "crate::domains::utils::default_false")]
    pub enabled: bool,

    /// Upper bound for a single provisioning run
    #[serde(with = "crate::domains::utils::serde_duration", default = "default_provisioning_timeout")]
    pub timeout: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            interpreter: default_interpreter(),
            health_check_grace: default_health_check_grace(),
            stop_timeout: default_stop_timeout(),
            kill_wait: default_kill_wait(),
            settle_interval: default_settle_interval(),
            restart_settle: default_settle_interval(),
            probe_timeout: default_probe_timeout(),
            failure_tail: default_failure_tail(),
            diagnostic_tail: default_diagnostic_tail(),
            provisioning: ProvisioningConfig::default(),
        }
    }
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout: default_provisioning_timeout(),
        }
    }
}

impl TailLimits {
    pub const fn new(max_bytes: u64, max_lines: usize) -> Self {
        Self { max_bytes, max_lines }
    }
}

impl Validatable for SupervisorConfig {
    fn validate(&self) -> ConfigResult<()> {
        let domain = self.domain_name();

        validate_required_string(&self.interpreter, "interpreter", domain)?;
        if self.log_dir.as_os_str().is_empty() {
            return Err(self.validation_error("log_dir cannot be empty"));
        }

        validate_nonzero_duration(self.health_check_grace, "health_check_grace", domain)?;
        validate_nonzero_duration(self.stop_timeout, "stop_timeout", domain)?;
        validate_nonzero_duration(self.kill_wait, "kill_wait", domain)?;
        validate_nonzero_duration(self.probe_timeout, "probe_timeout", domain)?;

        for (field, tail) in [("failure_tail", &self.failure_tail), ("diagnostic_tail", &self.diagnostic_tail)] {
            validate_positive(tail.max_bytes, &format!("{}.max_bytes", field), domain)?;
            validate_positive(tail.max_lines, &format!("{}.max_lines", field), domain)?;
        }

        if self.provisioning.enabled {
            validate_nonzero_duration(self.provisioning.timeout, "provisioning.timeout", domain)?;
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "supervisor"
    }
}

// Default value functions
fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_interpreter() -> String {
    if cfg!(windows) {
        "python".to_string()
    } else {
        "python3".to_string()
    }
}

fn default_health_check_grace() -> Duration {
    Duration::from_secs(2)
}

fn default_stop_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_kill_wait() -> Duration {
    Duration::from_secs(2)
}

fn default_settle_interval() -> Duration {
    Duration::from_secs(2)
}

fn default_probe_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_provisioning_timeout() -> Duration {
    Duration::from_secs(300) // 5 minutes
}

fn default_failure_tail() -> TailLimits {
    TailLimits::new(2000, 20)
}

fn default_diagnostic_tail() -> TailLimits {
    TailLimits::new(4000, 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supervisor_config_defaults() {
        let config = SupervisorConfig::default();
        assert_eq!(config.health_check_grace, Duration::from_secs(2));
        assert_eq!(config.stop_timeout, Duration::from_secs(5));
        assert_eq!(config.settle_interval, Duration::from_secs(2));
        assert_eq!(config.failure_tail, TailLimits::new(2000, 20));
        assert_eq!(config.diagnostic_tail, TailLimits::new(4000, 60));
        assert!(!config.provisioning.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_supervisor_config_validation() {
        let mut config = SupervisorConfig::default();
        config.stop_timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = SupervisorConfig::default();
        config.interpreter = String::new();
        assert!(config.validate().is_err());

        let mut config = SupervisorConfig::default();
        config.diagnostic_tail.max_lines = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sub_second_timings_are_valid() {
        let config = SupervisorConfig {
            health_check_grace: Duration::from_millis(200),
            settle_interval: Duration::ZERO,
            restart_settle: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
