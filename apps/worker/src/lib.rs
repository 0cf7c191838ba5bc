// [apps/worker/src/lib.rs]
//! Worker Core: the per-process orchestrator described in spec.md §4.8.
//! Polls its assignment, runs one emission task per assigned family, tees
//! samples into a divergence window per family, and delivers batches
//! through a reconnecting per-endpoint pipeline.

pub mod assignment_poller;
pub mod config;
pub mod divergence_tick;
pub mod family_task;
pub mod http;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use loadgen_control_client::ControlPlaneClient;

use crate::config::WorkerConfig;
use crate::state::WorkerState;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Wires the assignment poller, divergence tick, and HTTP surface together
/// and runs until `Ctrl-C` or the process is otherwise signaled to stop.
pub async fn run(config: WorkerConfig) -> anyhow::Result<()> {
    let metrics_handle = loadgen_telemetry::install_prometheus_recorder();
    let control_client = ControlPlaneClient::new(
        config.control_plane_url.clone(),
        config.control_plane_credential.clone(),
    );
    let port = config.port;
    let state = Arc::new(WorkerState::new(config, control_client, metrics_handle));

    let shutdown = CancellationToken::new();

    let poller = tokio::spawn(assignment_poller::run(state.clone(), shutdown.child_token()));
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
    state.mark_shutting_down();
    shutdown.cancel();

    let _ = tokio::time::timeout(SHUTDOWN_GRACE, async {
        let _ = poller.await;
        let _ = divergence.await;
        let _ = server.await;
    })
    .await;

    let remaining: Vec<_> = state.families.write().drain().map(|(_, handle)| handle).collect();
    for handle in remaining {
        handle.stop().await;
    }

    info!("worker shutdown complete");
    Ok(())
}
