//! Configuration loading and environment variable handling

use crate::domains::ArcadeConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "ARCADE".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML or JSON file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<ArcadeConfig> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let mut config: ArcadeConfig = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };

        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<ArcadeConfig> {
        let mut config = ArcadeConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<ArcadeConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut ArcadeConfig) -> ConfigResult<()> {
        self.apply_supervisor_overrides(&mut config.supervisor)?;
        self.apply_workers_overrides(&mut config.workers);
        self.apply_logging_overrides(&mut config.logging)?;
        self.apply_server_overrides(&mut config.server)?;
        Ok(())
    }

    /// Apply supervisor config overrides
    fn apply_supervisor_overrides(
        &self,
        config: &mut crate::domains::supervisor::SupervisorConfig,
    ) -> ConfigResult<()> {
        if let Ok(dir) = self.get_env_var("LOG_DIR") {
            config.log_dir = PathBuf::from(dir);
        }

        if let Ok(interpreter) = self.get_env_var("INTERPRETER") {
            config.interpreter = interpreter;
        }

        if let Some(grace) = self.parse_seconds("HEALTH_CHECK_GRACE_SECONDS")? {
            config.health_check_grace = grace;
        }

        if let Some(timeout) = self.parse_seconds("STOP_TIMEOUT_SECONDS")? {
            config.stop_timeout = timeout;
        }

        if let Ok(enabled) = self.get_env_var("PROVISIONING_ENABLED") {
            config.provisioning.enabled = enabled.parse().map_err(|e| {
                ConfigError::EnvError(format!("Invalid PROVISIONING_ENABLED: {}", e))
            })?;
        }

        Ok(())
    }

    /// Apply workers config overrides
    fn apply_workers_overrides(&self, config: &mut crate::domains::workers::WorkersConfig) {
        if let Ok(dir) = self.get_env_var("WORKERS_DIR") {
            config.base_dir = PathBuf::from(dir);
        }
    }

    /// Apply logging config overrides
    fn apply_logging_overrides(
        &self,
        config: &mut crate::domains::logging::LoggingConfig,
    ) -> ConfigResult<()> {
        if let Ok(log_level) = self.get_env_var("LOG_LEVEL") {
            config.level = crate::domains::logging::LogLevel::from_str(&log_level)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {}", log_level)))?;
        }

        if let Ok(format) = self.get_env_var("LOG_FORMAT") {
            config.format = crate::domains::logging::LogFormat::from_str(&format)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_FORMAT: {}", format)))?;
        }

        Ok(())
    }

    /// Apply server config overrides
    fn apply_server_overrides(
        &self,
        config: &mut crate::domains::server::ServerConfig,
    ) -> ConfigResult<()> {
        if let Ok(bind) = self.get_env_var("SERVER_BIND_ADDRESS") {
            config.bind_address = bind;
        }

        if let Ok(port) = self.get_env_var("SERVER_PORT") {
            config.port = port
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid SERVER_PORT: {}", e)))?;
        }

        Ok(())
    }

    /// Parse a whole-seconds environment variable
    fn parse_seconds(&self, name: &str) -> ConfigResult<Option<Duration>> {
        match self.get_env_var(name) {
            Ok(value) => {
                let seconds: u64 = value
                    .parse()
                    .map_err(|e| ConfigError::EnvError(format!("Invalid {}: {}", name, e)))?;
                Ok(Some(Duration::from_secs(seconds)))
            }
            Err(_) => Ok(None),
        }
    }

    /// Get environment variable with prefix
    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
