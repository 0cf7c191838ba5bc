// [apps/monitor/src/catalog.rs]
//! Recipe catalog poller: discovers which families exist and spawns one
//! comparison sampler per family, retiring trackers for families the
//! catalog no longer lists.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use loadgen_models::Recipe;

use crate::state::{spawn_tracker, MonitorState};

pub async fn run(state: Arc<MonitorState>, shutdown: CancellationToken) {
    poll_once(&state, &shutdown).await;
    let mut ticker = tokio::time::interval(Duration::from_millis(state.config.poll_interval_ms));
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = ticker.tick() => {}
        }
        poll_once(&state, &shutdown).await;
    }
}

async fn poll_once(state: &Arc<MonitorState>, shutdown: &CancellationToken) {
    let family_ids = match discover_family_ids(state).await {
        Ok(ids) => ids,
        Err(err) => {
            warn!(error = %err, "recipe catalog discovery failed, retaining prior trackers");
            return;
        }
    };
    let desired: HashSet<&String> = family_ids.iter().collect();

    let stale: Vec<String> = state
        .families
        .read()
        .keys()
        .filter(|id| !desired.contains(id))
        .cloned()
        .collect();
    for family_id in stale {
        if let Some(tracker) = state.families.write().remove(&family_id) {
            tracker.stop().await;
            info!(family_id = %family_id, "family dropped from catalog, sampler stopped");
        }
    }

    for family_id in family_ids {
        if state.families.read().contains_key(&family_id) {
            continue;
        }
        match fetch_recipe(state, &family_id).await {
            Ok(recipe) => match spawn_tracker(
                family_id.clone(),
                recipe,
                state.config.base_rate,
                state.config.sliding_window_seconds,
                state.config.sliding_window_max_samples,
                shutdown.child_token(),
            ) {
                Ok(tracker) => {
                    state.families.write().insert(family_id.clone(), tracker);
                    info!(family_id = %family_id, "comparison sampler started");
                }
                Err(err) => warn!(family_id = %family_id, error = %err, "failed to build comparison synthesizer"),
            },
            Err(err) => warn!(family_id = %family_id, error = %err, "recipe fetch failed"),
        }
    }
}

async fn discover_family_ids(state: &Arc<MonitorState>) -> anyhow::Result<Vec<String>> {
    if !state.config.reference_path.is_empty() {
        return list_reference_dir(&state.config.reference_path);
    }
    let summaries = state.control_client.list_recipes().await?;
    Ok(summaries.into_iter().map(|s| s.family_id).collect())
}

fn list_reference_dir(dir: &str) -> anyhow::Result<Vec<String>> {
    let mut ids = Vec::new();
    for entry in fs::read_dir(Path::new(dir))? {
        let entry = entry?;
        if let Some(stem) = entry.path().file_stem().and_then(|s| s.to_str()) {
            if entry.path().extension().and_then(|e| e.to_str()) == Some("json") {
                ids.push(stem.to_string());
            }
        }
    }
    Ok(ids)
}

async fn fetch_recipe(state: &Arc<MonitorState>, family_id: &str) -> anyhow::Result<Arc<Recipe>> {
    if !state.config.reference_path.is_empty() {
        let path = Path::new(&state.config.reference_path).join(format!("{family_id}.json"));
        let body = fs::read(path)?;
        return Ok(Arc::new(serde_json::from_slice(&body)?));
    }
    Ok(Arc::new(state.control_client.get_recipe(family_id).await?))
}
