// [apps/worker/src/state.rs]
//! Shared worker state: the current assignment, the loaded recipes and
//! synthesizers, the per-endpoint delivery pipelines, and the divergence
//! sliding windows. Exclusively owned by the Worker Core per spec.md §3's
//! ownership note; never shared with another worker process.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics_exporter_prometheus::PrometheusHandle;
use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use loadgen_control_client::ControlPlaneClient;
use loadgen_divergence::SlidingWindow;
use loadgen_emit::{BatchBuffer, ConnectionManager, Emitter, RateGovernor};
use loadgen_models::{Assignment, DivergenceScore, Recipe};

use crate::config::WorkerConfig;

/// One downstream TCP endpoint's delivery pipeline: a shared Batch Buffer
/// drained by an Emitter through a reconnecting Connection Manager.
pub struct EndpointPipeline {
    pub endpoint: String,
    pub buffer: Arc<BatchBuffer>,
    pub emitter: Arc<Emitter>,
    pub connection_manager: Arc<ConnectionManager>,
}

/// Everything the Worker Core owns for one currently-assigned family.
pub struct FamilyHandle {
    pub rate_governor: Arc<RateGovernor>,
    pub divergence: Arc<Mutex<SlidingWindow>>,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl FamilyHandle {
    pub async fn stop(self) {
        self.shutdown.cancel();
        let _ = self.task.await;
    }
}

pub struct WorkerState {
    pub config: WorkerConfig,
    pub control_client: ControlPlaneClient,
    pub metrics_handle: PrometheusHandle,
    pub started_at: Instant,

    pub assignment: RwLock<Option<Assignment>>,
    pub recipes: RwLock<HashMap<String, Arc<Recipe>>>,
    pub families: RwLock<HashMap<String, FamilyHandle>>,
    pub endpoints: RwLock<Vec<Arc<EndpointPipeline>>>,
    pub divergence_scores: RwLock<HashMap<String, DivergenceScore>>,
    pub thresholds: loadgen_models::Thresholds,

    reconnecting_since: RwLock<HashMap<String, Instant>>,
    shutting_down: AtomicBool,
}

impl WorkerState {
    pub fn new(
        config: WorkerConfig,
        control_client: ControlPlaneClient,
        metrics_handle: PrometheusHandle,
    ) -> Self {
        Self {
            config,
            control_client,
            metrics_handle,
            started_at: Instant::now(),
            assignment: RwLock::new(None),
            recipes: RwLock::new(HashMap::new()),
            families: RwLock::new(HashMap::new()),
            endpoints: RwLock::new(Vec::new()),
            divergence_scores: RwLock::new(HashMap::new()),
            thresholds: loadgen_models::Thresholds::default(),
            reconnecting_since: RwLock::new(HashMap::new()),
            shutting_down: AtomicBool::new(false),
        }
    }

    pub fn mark_shutting_down(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
    }

    pub fn has_assignment(&self) -> bool {
        self.assignment.read().is_some()
    }

    pub fn synthesizer_count(&self) -> usize {
        self.families.read().len()
    }

    pub fn total_buffer_len(&self) -> usize {
        self.endpoints.read().iter().map(|e| e.buffer.len()).sum()
    }

    /// Readiness per spec.md §4.8: an assignment is present, at least one
    /// synthesizer is loaded, and no endpoint has sat in `Reconnecting`
    /// longer than the configured deadline.
    pub fn is_ready(&self) -> bool {
        if self.shutting_down.load(Ordering::SeqCst) {
            return false;
        }
        if !self.has_assignment() || self.synthesizer_count() == 0 {
            return false;
        }
        let deadline = Duration::from_secs(self.config.ready_reconnect_deadline_seconds);
        for pipeline in self.endpoints.read().iter() {
            if pipeline.connection_manager.state() == loadgen_emit::ConnectionState::Reconnecting {
                let mut since = self.reconnecting_since.write();
                let started = *since
                    .entry(pipeline.endpoint.clone())
                    .or_insert_with(Instant::now);
                if started.elapsed() > deadline {
                    return false;
                }
            } else {
                self.reconnecting_since.write().remove(&pipeline.endpoint);
            }
        }
        true
    }
}
