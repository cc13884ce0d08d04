//! Serve command handler.

use crate::server::{router, AppState};
use anyhow::Context;
use clap::Args;
use govbrief_core::config::AppConfig;
use govbrief_engine::Orchestrator;
use tokio::net::TcpListener;

/// Serve the streaming chat API
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// Address to bind (default: server.host)
    #[arg(long, env = "GOVBRIEF_HOST")]
    pub host: Option<String>,

    /// Port to listen on (default: server.port)
    #[arg(long, env = "GOVBRIEF_PORT")]
    pub port: Option<u16>,
}

impl ServeCommand {
    /// Execute the serve command until the process is interrupted.
    pub async fn execute(&self, mut config: AppConfig) -> anyhow::Result<()> {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        config.validate()?;

        let orchestrator = Orchestrator::from_config(&config).await?;
        let state = AppState::new(orchestrator, config.server.clone());
        let app = router(state);

        let bind_addr = format!("{}:{}", config.server.host, config.server.port);
        let listener = TcpListener::bind(&bind_addr)
            .await
            .with_context(|| format!("Failed to bind to {}", bind_addr))?;
        let local_addr = listener.local_addr().context("Failed to read bound address")?;
        tracing::info!("Listening on http://{}", local_addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("Shutting down");
            })
            .await
            .context("Server error")?;
        Ok(())
    }
}
