//! Application setup and initialization

pub mod routes;
pub mod server;

use anyhow::{Context, Result};
use std::sync::Arc;

use capture_core::{Config, ParticipantBridge};

use crate::state::AppState;

/// Validate `config`, install tracing and build the router.
pub async fn initialize_app(
    config: Config,
    bridge: Arc<dyn ParticipantBridge>,
) -> Result<(Arc<AppState>, axum::Router)> {
    // Fail fast on misconfiguration
    config.validate().context("Configuration validation failed")?;

    capture_infra::init_telemetry(&config.log_format)
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment,
        production = config.is_production(),
        upload_url = %config.public_upload_url,
        "Configuration loaded and validated successfully"
    );

    build_app(config, bridge).await
}

/// Build state and router without touching global tracing state.
pub async fn build_app(
    config: Config,
    bridge: Arc<dyn ParticipantBridge>,
) -> Result<(Arc<AppState>, axum::Router)> {
    let state = Arc::new(AppState::new(config.clone(), bridge).await?);
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
