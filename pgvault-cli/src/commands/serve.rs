//! HTTP API command.

use anyhow::{Context, Result};
use pgvault_api::{ApiServer, AppState};
use pgvault_core::config::PgVaultConfig;
use std::sync::Arc;
use tracing::{info, warn};

use super::settings;

/// Runs the API until interrupted.
///
/// # Errors
///
/// Returns error if the configuration is invalid or the server fails to start.
pub async fn run(config: &PgVaultConfig) -> Result<()> {
    settings::validate(config)?;
    let state = AppState::from_config(config)
        .await
        .context("Failed to initialize services")?;

    info!(
        host = %config.server.host,
        port = config.server.port,
        storage = config.storage.path.as_deref().unwrap_or("in-memory"),
        "Starting PgVault API"
    );

    ApiServer::new(config.server.clone(), Arc::new(state))
        .run_with_shutdown(shutdown_signal())
        .await
        .context("API server failed")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
