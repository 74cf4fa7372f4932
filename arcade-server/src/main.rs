//! Arcade Server Binary

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;

use arcade_config::{ArcadeConfig, ConfigLoader, LogLevel};
use arcade_logging::init_logging_from_config;
use arcade_server::Server;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path (YAML, or JSON by extension)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Server bind address
    #[arg(short, long)]
    bind: Option<String>,

    /// Server port
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory for worker log files
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Directory containing the worker programs
    #[arg(long, value_name = "DIR")]
    workers_dir: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,

    /// Print a sample configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.print_config {
        println!("{}", ArcadeConfig::generate_sample());
        return Ok(());
    }

    let mut config = ConfigLoader::new().load(cli.config.as_deref())?;
    apply_cli_overrides(&mut config, &cli)?;
    config.validate_all()?;

    let _guard = init_logging_from_config(&config.logging)?;

    let server = Server::new(config)?;
    server.start().await
}

/// Apply CLI argument overrides to configuration
fn apply_cli_overrides(config: &mut ArcadeConfig, cli: &Cli) -> Result<()> {
    if let Some(bind) = &cli.bind {
        config.server.bind_address = bind.clone();
    }

    if let Some(port) = cli.port {
        config.server.port = port;
    }

    if let Some(dir) = &cli.log_dir {
        config.supervisor.log_dir = dir.clone();
    }

    if let Some(dir) = &cli.workers_dir {
        config.workers.base_dir = dir.clone();
    }

    if let Some(level) = &cli.log_level {
        config.logging.level = LogLevel::from_str(level).map_err(anyhow::Error::msg)?;
    }

    Ok(())
}
