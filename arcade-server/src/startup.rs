//! Server startup and shutdown logic

use anyhow::{Context, Result};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use arcade_config::ArcadeConfig;
use arcade_supervisor::Supervisor;

use crate::{app::create_app, context::AppState};

/// Server application struct
pub struct Server {
    config: ArcadeConfig,
    supervisor: Arc<Supervisor>,
}

impl Server {
    /// Create a new server instance with a supervisor built from `config`
    pub fn new(config: ArcadeConfig) -> Result<Self> {
        let supervisor = Supervisor::from_config(&config).context("Failed to build worker registry")?;
        Ok(Self::with_supervisor(config, Arc::new(supervisor)))
    }

    pub fn with_supervisor(config: ArcadeConfig, supervisor: Arc<Supervisor>) -> Self {
        Self { config, supervisor }
    }

    pub fn supervisor(&self) -> &Arc<Supervisor> {
        &self.supervisor
    }

    pub fn build_app(&self) -> Router {
        create_app(AppState::new(self.supervisor.clone()), &self.config.server)
    }

    /// Serve until a shutdown signal arrives, then stop the workers
    pub async fn start(self) -> Result<()> {
        let app = self.build_app();
        let addr = self.config.server.socket_addr()?;

        tracing::info!("Starting Arcade server on {}", addr);
        self.log_config_summary(addr);

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        if self.config.server.stop_workers_on_shutdown {
            let report = self.supervisor.stop_all().await;
            tracing::info!(
                "Stopped {} worker(s) on shutdown, {} failed",
                report.stopped.len(),
                report.failed.len()
            );
        }

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    fn log_config_summary(&self, addr: SocketAddr) {
        let supervisor = &self.config.supervisor;
        tracing::info!("=== Arcade Server Configuration ===");
        tracing::info!("Bind Address: {}", addr);
        tracing::info!("Workers: {}", self.supervisor.registry().names().collect::<Vec<_>>().join(", "));
        tracing::info!("Workers Directory: {}", self.config.workers.base_dir.display());
        tracing::info!("Log Directory: {}", supervisor.log_dir.display());
        tracing::info!("Interpreter: {}", supervisor.interpreter);
        tracing::info!("Provisioning: {}", if supervisor.provisioning.enabled { "Enabled" } else { "Disabled" });
        tracing::info!("CORS: {}", if self.config.server.enable_cors { "Enabled" } else { "Disabled" });
        tracing::info!("Request ID: {}", if self.config.server.enable_request_id { "Enabled" } else { "Disabled" });
        tracing::info!("Tracing: {}", if self.config.server.enable_tracing { "Enabled" } else { "Disabled" });
        tracing::info!("===================================");
    }
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
