//! Server startup and graceful shutdown

use anyhow::Result;
use axum::Router;
use capture_core::Config;
use tokio::task::JoinHandle;

/// Serve `app` until a shutdown signal, then stop the `background` tasks
/// (token sweeper, bridge drain).
pub async fn start_server(
    config: &Config,
    app: Router,
    background: Vec<JoinHandle<()>>,
) -> Result<()> {
    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(
        addr = %addr,
        max_upload_mb = config.max_upload_size_bytes / 1024 / 1024,
        forward_timeout_seconds = config.forward_timeout_seconds,
        upload_token_ttl_seconds = config.upload_token_ttl_seconds,
        max_pending_uploads = config.max_pending_uploads,
        "Capture relay listening"
    );

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    for task in &background {
        task.abort();
    }
    tracing::debug!(tasks = background.len(), "Background tasks stopped");

    capture_infra::shutdown_telemetry().await;
    served?;
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
///
/// # Panics
/// Panics if a signal handler cannot be installed.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let signal = tokio::select! {
        _ = ctrl_c => "ctrl_c",
        _ = terminate => "terminate",
    };

    tracing::info!(signal, "Shutting down, in-flight uploads will finish");
}
