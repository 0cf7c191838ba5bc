// [apps/worker/src/assignment_poller.rs]
//! Assignment poller and reconfiguration, per spec.md §4.8 steps 2-3: poll
//! the control plane on a timer, and on a materially different assignment,
//! reconcile the set of running Family Synthesizers and endpoint pipelines.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use loadgen_divergence::SlidingWindow;
use loadgen_emit::{BatchBuffer, ConnectionManager, Emitter, RateGovernor};
use loadgen_models::Assignment;
use loadgen_synth::FamilySynthesizer;

use crate::family_task;
use crate::state::{EndpointPipeline, FamilyHandle, WorkerState};

pub async fn run(state: Arc<WorkerState>, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(Duration::from_millis(state.config.poll_interval_ms));
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = ticker.tick() => {}
        }
        poll_once(&state, &shutdown).await;
    }
}

async fn poll_once(state: &Arc<WorkerState>, shutdown: &CancellationToken) {
    let fetched = match state.control_client.get_assignment(&state.config.worker_id).await {
        Ok(assignment) => assignment,
        Err(err) => {
            metrics::counter!("http_errors_total", "endpoint" => "control-plane-assignment").increment(1);
            warn!(error = %err, "assignment fetch failed, retaining prior assignment");
            return;
        }
    };
    if !fetched.auth_credential.is_empty() {
        state.control_client.set_credential(fetched.auth_credential.clone());
    }

    let changed = {
        let current = state.assignment.read();
        match current.as_ref() {
            Some(existing) => existing.differs_materially(&fetched),
            None => true,
        }
    };
    if !changed {
        *state.assignment.write() = Some(fetched);
        return;
    }

    info!(worker_id = %fetched.worker_id, families = fetched.families.len(), "assignment changed, reconfiguring");
    if let Err(err) = reconfigure(state, fetched, shutdown).await {
        error!(error = %err, "reconfiguration failed");
    }
}

async fn reconfigure(
    state: &Arc<WorkerState>,
    assignment: Assignment,
    shutdown: &CancellationToken,
) -> anyhow::Result<()> {
    ensure_endpoints(state, &assignment.endpoints, shutdown).await?;

    let previous_families: Vec<String> = state.families.read().keys().cloned().collect();
    let desired: std::collections::HashSet<&String> = assignment.families.iter().collect();

    for family_id in previous_families {
        if !desired.contains(&family_id) {
            if let Some(handle) = state.families.write().remove(&family_id) {
                handle.stop().await;
                info!(family_id = %family_id, "family unassigned, synthesizer stopped");
            }
        }
    }

    let assignment = Arc::new(assignment);
    for family_id in &assignment.families {
        if state.families.read().contains_key(family_id) {
            continue;
        }
        match load_family(state, family_id, assignment.clone(), shutdown).await {
            Ok(handle) => {
                state.families.write().insert(family_id.clone(), handle);
            }
            Err(err) => {
                metrics::counter!("recipe_load_errors_total", "family_id" => family_id.clone()).increment(1);
                warn!(family_id = %family_id, error = %err, "recipe load failed, family skipped this assignment");
            }
        }
    }

    *state.assignment.write() = Some((*assignment).clone());
    Ok(())
}

async fn load_family(
    state: &Arc<WorkerState>,
    family_id: &str,
    assignment: Arc<Assignment>,
    shutdown: &CancellationToken,
) -> anyhow::Result<FamilyHandle> {
    let recipe = {
        let cached = state.recipes.read().get(family_id).cloned();
        match cached {
            Some(recipe) => recipe,
            None => {
                let fetched = state.control_client.get_recipe(family_id).await?;
                let recipe = Arc::new(fetched);
                state.recipes.write().insert(family_id.to_string(), recipe.clone());
                recipe
            }
        }
    };

    let synthesizer = FamilySynthesizer::new((*recipe).clone())?;
    let synthesizer = Arc::new(parking_lot::Mutex::new(synthesizer));
    let rate_governor = Arc::new(RateGovernor::new(
        0.0,
        0.0,
        state.config.rate_acceleration,
        1.0,
    ));
    let divergence = Arc::new(parking_lot::Mutex::new(SlidingWindow::new(
        family_id.to_string(),
        state.config.sliding_window_seconds,
        state.config.sliding_window_max_samples,
    )));

    let task_shutdown = shutdown.child_token();
    let task = tokio::spawn(family_task::run(
        family_id.to_string(),
        synthesizer,
        rate_governor.clone(),
        divergence.clone(),
        assignment,
        state.config.base_rate,
        state.clone(),
        task_shutdown.clone(),
    ));

    Ok(FamilyHandle {
        rate_governor,
        divergence,
        shutdown: task_shutdown,
        task,
    })
}

/// Builds the endpoint pipelines once per distinct endpoint set. Existing
/// pipelines are left running when the endpoint list is unchanged.
async fn ensure_endpoints(
    state: &Arc<WorkerState>,
    endpoints: &[String],
    shutdown: &CancellationToken,
) -> anyhow::Result<()> {
    let current: Vec<String> = state.endpoints.read().iter().map(|e| e.endpoint.clone()).collect();
    if current == endpoints {
        return Ok(());
    }

    let mut fresh = Vec::with_capacity(endpoints.len());
    for endpoint in endpoints {
        let connection_manager = ConnectionManager::connect_with_backoff(
            endpoint.clone(),
            Duration::from_millis(state.config.reconnect_initial_ms),
            Duration::from_millis(state.config.reconnect_max_ms),
        )
        .await;
        let buffer = Arc::new(BatchBuffer::new(state.config.batch_size, state.config.batch_bytes));
        let emitter = Emitter::new(
            buffer.clone(),
            connection_manager.clone(),
            Duration::from_millis(state.config.flush_interval_ms),
            state.config.max_delivery_attempts,
        );

        let reconciler_shutdown = shutdown.child_token();
        tokio::spawn(connection_manager.clone().run_reconciler(reconciler_shutdown));

        let emitter_shutdown = shutdown.child_token();
        tokio::spawn(emitter.clone().run(emitter_shutdown));

        fresh.push(Arc::new(EndpointPipeline {
            endpoint: endpoint.clone(),
            buffer,
            emitter,
            connection_manager,
        }));
    }

    *state.endpoints.write() = fresh;
    Ok(())
}
