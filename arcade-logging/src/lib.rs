//! Logging setup for Arcade
//!
//! Builds a `tracing` subscriber from [`arcade_config::LoggingConfig`]:
//! console output in the configured format plus an optional daily-rolled
//! log file.

pub mod init;

pub use init::{build_env_filter, init_logging_from_config, init_simple_tracing, LoggingGuard};
