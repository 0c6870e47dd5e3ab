//! Process entry point: load config, build the platform, start the worker pool, serve HTTP.

use std::path::Path;
use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::net::TcpListener;

use crate::application::KbCore;
use crate::config;

use super::router::build_router;
use super::state::AppState;

/// Loads configuration, wires the platform, and serves the HTTP surface until ctrl-c.
pub async fn run_server(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = config::load(config_path)?;

    let metrics_handle = if config.metrics.enabled {
        Some(PrometheusBuilder::new().install_recorder()?)
    } else {
        None
    };

    let core = Arc::new(KbCore::new(config.clone())?);

    let workers = core.spawn_workers();
    tokio::spawn(async move { workers.run().await });

    let state = AppState { core, metrics_handle };
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "kbcore server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::warn!("failed to install ctrl-c handler, shutdown signal will never fire");
        std::future::pending::<()>().await;
    }
}

/// Convenience used by tests that want a fully-wired router without binding a socket.
pub fn test_router(core: Arc<KbCore>) -> axum::Router {
    build_router(AppState { core, metrics_handle: None })
}
