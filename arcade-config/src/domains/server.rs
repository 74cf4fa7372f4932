//! HTTP control surface configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, validate_required_string, Validatable};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Enable CORS middleware
    #[serde(default = "crate::domains::utils::default_true")]
    pub enable_cors: bool,

    /// Origins allowed by CORS, `*` allows any origin
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable request ID tracking
    #[serde(default = "crate::domains::utils::default_true")]
    pub enable_request_id: bool,

    /// Enable request tracing
    #[serde(default = "crate::domains::utils::default_true")]
    pub enable_tracing: bool,

    /// Stop every running worker when the server shuts down
    #[serde(default = "crate::domains::utils::default_true")]
    pub stop_workers_on_shutdown: bool,
}

impl ServerConfig {
    /// Parsed socket address to bind to
    pub fn socket_addr(&self) -> ConfigResult<SocketAddr> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .map_err(|e| self.validation_error(format!("invalid bind address: {}", e)))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            enable_cors: true,
            cors_origins: default_cors_origins(),
            enable_request_id: true,
            enable_tracing: true,
            stop_workers_on_shutdown: true,
        }
    }
}

impl Validatable for ServerConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.bind_address, "bind_address", self.domain_name())?;
        validate_positive(self.port, "port", self.domain_name())?;
        self.socket_addr()?;

        if self.enable_cors && self.cors_origins.is_empty() {
            return Err(self.validation_error("cors_origins cannot be empty when CORS is enabled"));
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "server"
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5003
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}
