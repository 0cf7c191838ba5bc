// [apps/monitor/src/lib.rs]
//! Divergence Monitor: independently samples every catalog recipe and
//! exposes JS/Wasserstein/KS/correlation divergence against it, per
//! spec.md §4.9.

pub mod catalog;
pub mod config;
pub mod decode;
pub mod divergence_tick;
pub mod http;
pub mod sampling;
pub mod state;

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio_util::sync::CancellationToken;
use tracing::info;

use loadgen_control_client::ControlPlaneClient;

use crate::config::MonitorConfig;
use crate::state::MonitorState;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

pub async fn run(config: MonitorConfig) -> anyhow::Result<()> {
    let metrics_handle = loadgen_telemetry::install_prometheus_recorder();
    let control_client = ControlPlaneClient::new(
        config.control_plane_url.clone(),
        config.control_plane_credential.clone(),
    );
    let port = config.port;
    let state = Arc::new(MonitorState::new(config, control_client, metrics_handle));

    let shutdown = CancellationToken::new();
    let catalog = tokio::spawn(catalog::run(state.clone(), shutdown.child_token()));
    let divergence = tokio::spawn(divergence_tick::run(state.clone(), shutdown.child_token()));

    let app = http::router(state.clone());
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    let server_shutdown = shutdown.child_token();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
            .await
    });

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received, draining for up to {:?}", SHUTDOWN_GRACE);
    shutdown.cancel();

    let _ = tokio::time::timeout(SHUTDOWN_GRACE, async {
        let _ = catalog.await;
        let _ = divergence.await;
        let _ = server.await;
    })
    .await;

    let remaining: Vec<_> = state.families.write().drain().map(|(_, tracker)| tracker).collect();
    for tracker in remaining {
        tracker.stop().await;
    }

    info!("monitor shutdown complete");
    Ok(())
}
