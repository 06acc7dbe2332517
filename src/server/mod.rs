// file: src/server/mod.rs
// description: http server state, startup and graceful shutdown
// reference: https://docs.rs/axum

pub mod handlers;
pub mod response;
mod routes;

pub use routes::router;

use crate::config::Config;
use crate::error::Result;
use crate::workflow::SyncOrchestrator;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub orchestrator: Arc<SyncOrchestrator>,
}

impl AppState {
    pub fn new(config: Config, orchestrator: SyncOrchestrator) -> Self {
        Self {
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
        }
    }
}

/// Binds `server.host:server.port` and serves until ctrl-c.
pub async fn serve(state: AppState) -> Result<()> {
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let listener = TcpListener::bind(&addr).await?;

    info!("Listening on http://{}", listener.local_addr()?);
    info!(
        "Storing working copies under {}",
        state.orchestrator.storage_root().display()
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
