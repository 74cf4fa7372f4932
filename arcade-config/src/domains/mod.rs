//! Domain-specific configuration modules

pub mod logging;
pub mod server;
pub mod supervisor;
pub mod utils;
pub mod workers;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Main Arcade configuration combining all domains
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ArcadeConfig {
    /// Process supervisor configuration
    #[serde(default)]
    pub supervisor: supervisor::SupervisorConfig,

    /// Worker definitions
    #[serde(default)]
    pub workers: workers::WorkersConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: logging::LoggingConfig,

    /// HTTP control surface configuration
    #[serde(default)]
    pub server: server::ServerConfig,
}

impl ArcadeConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.supervisor.validate()?;
        self.workers.validate()?;
        self.logging.validate()?;
        self.server.validate()?;
        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let config = ArcadeConfig::default();
        serde_yaml::to_string(&config)
            .unwrap_or_else(|_| "# Failed to generate sample config".to_string())
    }
}
