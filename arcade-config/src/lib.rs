//! Domain-driven configuration management for Arcade
//!
//! Configuration is split by functional domain (supervisor, workers,
//! logging, server), each with its own defaults and validation, and can be
//! loaded from YAML/JSON files with `ARCADE_*` environment overrides.

pub mod error;
pub mod loader;
pub mod validation;

// Domain-specific configuration modules
pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use validation::Validatable;

// Re-export domain configurations
pub use domains::{
    logging::{FileSinkConfig, LogFormat, LogLevel, LoggingConfig},
    server::ServerConfig,
    supervisor::{ProvisioningConfig, SupervisorConfig, TailLimits},
    workers::{PackageRequirement, WorkerDefinition, WorkersConfig},
    ArcadeConfig,
};

// Re-export utilities
pub use domains::utils::serde_duration;
