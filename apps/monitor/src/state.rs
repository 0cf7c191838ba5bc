// [apps/monitor/src/state.rs]
//! Shared monitor state: the recipe catalog it tracks, one comparison
//! synthesizer and sliding window per family, and the last-computed scores.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusHandle;
use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use loadgen_control_client::ControlPlaneClient;
use loadgen_divergence::SlidingWindow;
use loadgen_models::{DivergenceScore, Recipe, Thresholds};
use loadgen_synth::FamilySynthesizer;

use crate::config::MonitorConfig;

pub struct FamilyTracker {
    pub recipe: Arc<Recipe>,
    pub divergence: Arc<Mutex<SlidingWindow>>,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl FamilyTracker {
    pub async fn stop(self) {
        self.shutdown.cancel();
        let _ = self.task.await;
    }
}

pub struct MonitorState {
    pub config: MonitorConfig,
    pub control_client: ControlPlaneClient,
    pub metrics_handle: PrometheusHandle,
    pub started_at: Instant,
    pub thresholds: Thresholds,

    pub families: RwLock<HashMap<String, FamilyTracker>>,
    pub divergence_scores: RwLock<HashMap<String, DivergenceScore>>,
}

impl MonitorState {
    pub fn new(config: MonitorConfig, control_client: ControlPlaneClient, metrics_handle: PrometheusHandle) -> Self {
        let thresholds = config.thresholds();
        Self {
            config,
            control_client,
            metrics_handle,
            started_at: Instant::now(),
            thresholds,
            families: RwLock::new(HashMap::new()),
            divergence_scores: RwLock::new(HashMap::new()),
        }
    }

    pub fn tracked_family_ids(&self) -> Vec<String> {
        self.families.read().keys().cloned().collect()
    }
}

pub fn spawn_tracker(
    family_id: String,
    recipe: Arc<Recipe>,
    base_rate: f64,
    sliding_window_seconds: i64,
    sliding_window_max_samples: usize,
    shutdown: CancellationToken,
) -> anyhow::Result<FamilyTracker> {
    let synthesizer = FamilySynthesizer::new((*recipe).clone())?;
    let synthesizer = Arc::new(Mutex::new(synthesizer));
    let divergence = Arc::new(Mutex::new(SlidingWindow::new(
        family_id.clone(),
        sliding_window_seconds,
        sliding_window_max_samples,
    )));

    let task = tokio::spawn(crate::sampling::run(
        family_id,
        synthesizer,
        base_rate,
        divergence.clone(),
        shutdown.clone(),
    ));

    Ok(FamilyTracker {
        recipe,
        divergence,
        shutdown,
        task,
    })
}
