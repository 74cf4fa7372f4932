//! Dependency probing
//!
//! Decides whether an optional capability (an importable module such as
//! `mediapipe`) is usable, so the registry can choose between a worker's
//! primary and fallback programs.

use async_trait::async_trait;
use std::collections::HashSet;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Checks whether a named capability is currently available
#[async_trait]
pub trait DependencyProber: Send + Sync {
    /// Probe a single capability; no retries, no side effects beyond the probe
    async fn probe(&self, capability: &str) -> bool;

    /// Capabilities from `capabilities` that are not available
    async fn missing(&self, capabilities: &[String]) -> Vec<String> {
        let mut missing = Vec::new();
        for capability in capabilities {
            if !self.probe(capability).await {
                missing.push(capability.clone());
            }
        }
        missing
    }
}

/// Probes by importing the module in the worker interpreter
#[derive(Debug, Clone)]
pub struct InterpreterProber {
    interpreter: String,
    timeout: Duration,
}

impl InterpreterProber {
    pub fn new(interpreter: impl Into<String>, timeout: Duration) -> Self {
        Self {
            interpreter: interpreter.into(),
            timeout,
        }
    }
}

/// Module names are dotted identifiers; anything else never reaches the interpreter
pub(crate) fn is_module_name(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

#[async_trait]
impl DependencyProber for InterpreterProber {
    async fn probe(&self, capability: &str) -> bool {
        if !is_module_name(capability) {
            debug!("Rejecting malformed capability name '{}'", capability);
            return false;
        }

        let mut cmd = Command::new(&self.interpreter);
        cmd.arg("-c")
            .arg(format!("import {}", capability))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        match tokio::time::timeout(self.timeout, cmd.status()).await {
            Ok(Ok(status)) => {
                debug!("Probe for '{}' finished with {}", capability, status);
                status.success()
            }
            Ok(Err(e)) => {
                debug!("Probe for '{}' could not run {}: {}", capability, self.interpreter, e);
                false
            }
            Err(_) => {
                debug!("Probe for '{}' timed out after {:?}", capability, self.timeout);
                false
            }
        }
    }
}

/// A fixed set of available capabilities
#[derive(Debug, Clone, Default)]
pub struct StaticProber {
    available: HashSet<String>,
}

impl StaticProber {
    pub fn new<I, S>(available: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            available: available.into_iter().map(Into::into).collect(),
        }
    }

    /// A prober that reports every capability as missing
    pub fn none() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DependencyProber for StaticProber {
    async fn probe(&self, capability: &str) -> bool {
        self.available.contains(capability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_name_validation() {
        assert!(is_module_name("mediapipe"));
        assert!(is_module_name("cv2"));
        assert!(is_module_name("google.protobuf"));
        assert!(is_module_name("_private"));
        assert!(!is_module_name(""));
        assert!(!is_module_name("2fast"));
        assert!(!is_module_name("os; rm -rf /"));
        assert!(!is_module_name("a..b"));
    }

    #[tokio::test]
    async fn test_static_prober() {
        let prober = StaticProber::new(["cv2", "numpy"]);
        assert!(prober.probe("cv2").await);
        assert!(!prober.probe("mediapipe").await);

        let missing = prober
            .missing(&["cv2".to_string(), "mediapipe".to_string()])
            .await;
        assert_eq!(missing, vec!["mediapipe".to_string()]);
    }

    #[tokio::test]
    async fn test_interpreter_prober_missing_interpreter() {
        let prober = InterpreterProber::new("/nonexistent/interpreter", Duration::from_secs(1));
        assert!(!prober.probe("sys").await);
    }

    #[tokio::test]
    async fn test_interpreter_prober_rejects_malformed_names() {
        // Would succeed with any interpreter if the name were passed through
        let prober = InterpreterProber::new("true", Duration::from_secs(1));
        assert!(!prober.probe("x; y").await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_interpreter_prober_uses_exit_status() {
        let prober = InterpreterProber::new("false", Duration::from_secs(5));
        assert!(!prober.probe("mediapipe").await);

        let prober = InterpreterProber::new("true", Duration::from_secs(5));
        assert!(prober.probe("mediapipe").await);
    }
}
