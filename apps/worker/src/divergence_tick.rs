// [apps/worker/src/divergence_tick.rs]
//! Periodic divergence compute, per spec.md §4.9: once per
//! `divergence_tick_seconds`, every assigned family's sliding window is
//! compared against its cached reference recipe and the result is stashed
//! for `/status` and `/metrics` to surface.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, instrument, warn};

use loadgen_models::HealthStatus;

use crate::family_task::unix_now;
use crate::state::WorkerState;

pub async fn run(state: Arc<WorkerState>, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(Duration::from_secs(state.config.divergence_tick_seconds));
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = ticker.tick() => {}
        }
        tick(&state).await;
    }
}

#[instrument(skip(state))]
async fn tick(state: &Arc<WorkerState>) {
    let now = unix_now();
    let family_ids: Vec<String> = state.families.read().keys().cloned().collect();
    let mut active = ActiveAlertCounts::default();
    for family_id in family_ids {
        let Some(recipe) = state.recipes.read().get(&family_id).cloned() else {
            continue;
        };
        let window = {
            let families = state.families.read();
            match families.get(&family_id) {
                Some(handle) => handle.divergence.clone(),
                None => continue,
            }
        };

        let computed = {
            let mut window = window.lock();
            window.compute(&recipe, &state.thresholds, now)
        };

        match computed {
            Ok(Some(score)) => {
                record_gauges(&score, &recipe.metric_name);
                raise_critical_alert_if_due(&family_id, &score, &state.thresholds);
                active.tally(&score, &state.thresholds);
                state.divergence_scores.write().insert(family_id.clone(), score);
            }
            Ok(None) => {}
            Err(err) => {
                warn!(family_id = %family_id, error = %err, "divergence compute skipped");
            }
        }
    }
    active.record();
}

/// Per-tick tally feeding the `alerts_active{severity,type}` gauge spec.md
/// §6's "Monitor HTTP" table requires: a count of currently-affected
/// families per severity, aggregated across the whole assignment rather
/// than attributed to one family (the gauge carries no `family_id` label).
#[derive(Default)]
struct ActiveAlertCounts {
    amber: u64,
    red: u64,
    critical: u64,
}

impl ActiveAlertCounts {
    fn tally(&mut self, score: &loadgen_models::DivergenceScore, thresholds: &loadgen_models::Thresholds) {
        match score.status {
            HealthStatus::Amber => self.amber += 1,
            HealthStatus::Red => self.red += 1,
            HealthStatus::Green => {}
        }
        if score.consecutive_red >= thresholds.red_minutes {
            self.critical += 1;
        }
    }

    fn record(&self) {
        metrics::gauge!("alerts_active", "severity" => "amber", "type" => "divergence")
            .set(self.amber as f64);
        metrics::gauge!("alerts_active", "severity" => "red", "type" => "divergence")
            .set(self.red as f64);
        metrics::gauge!("alerts_active", "severity" => "critical", "type" => "divergence")
            .set(self.critical as f64);
    }
}

/// Per spec.md §4.9: a critical alert fires the minute `consecutive_red`
/// first reaches `red_minutes`, not on every red minute thereafter.
fn raise_critical_alert_if_due(
    family_id: &str,
    score: &loadgen_models::DivergenceScore,
    thresholds: &loadgen_models::Thresholds,
) {
    if score.consecutive_red == thresholds.red_minutes {
        error!(
            family_id = %family_id,
            consecutive_red = score.consecutive_red,
            "family has diverged for {} consecutive minutes, raising critical alert",
            thresholds.red_minutes
        );
        metrics::counter!("divergence_critical_alerts_total", "family_id" => family_id.to_string()).increment(1);
    }
}

fn record_gauges(score: &loadgen_models::DivergenceScore, metric_name: &str) {
    for (label, value) in &score.js_categorical {
        metrics::gauge!("divergence_jensen_shannon", "family_id" => score.family_id.clone(), "distribution_type" => label.clone()).set(*value);
    }
    metrics::gauge!("divergence_wasserstein", "family_id" => score.family_id.clone()).set(score.wasserstein_value);
    metrics::gauge!("divergence_kolmogorov_smirnov", "family_id" => score.family_id.clone()).set(score.ks_size);
    if let Some(correlation) = score.temporal_correlation {
        metrics::gauge!("divergence_temporal_correlation", "family_id" => score.family_id.clone()).set(correlation);
    }
    metrics::gauge!("family_status", "family_id" => score.family_id.clone(), "metric_name" => metric_name.to_string())
        .set(score.status.as_gauge_value());
}
