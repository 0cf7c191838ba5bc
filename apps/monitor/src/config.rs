// [apps/monitor/src/config.rs]
//! CLI configuration surface for the monitor binary, per spec.md §6's
//! "Configuration surface (monitor)": `reference_path` plus the threshold
//! quartet. The monitor also needs its own route to the control plane
//! (§6's three control-plane GETs) since it independently samples recipes
//! rather than receiving tee'd samples over an unspecified wire protocol.

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "loadgen-monitor", about = "Divergence monitor for metric-ingest recipes")]
pub struct MonitorConfig {
    /// Base URL of the control plane.
    #[arg(long, env = "CONTROL_PLANE_URL")]
    pub control_plane_url: String,

    /// Bearer credential sent with every control-plane request.
    #[arg(long, env = "CONTROL_PLANE_CREDENTIAL", default_value = "")]
    pub control_plane_credential: String,

    /// Optional local directory of reference recipe JSON files, named
    /// `<family_id>.json`. When empty, recipes are fetched from the control
    /// plane instead, same as the worker does.
    #[arg(long, env = "REFERENCE_PATH", default_value = "")]
    pub reference_path: String,

    /// Port for the status/families/metrics/compute HTTP listener.
    #[arg(long, env = "PORT", default_value_t = 8090)]
    pub port: u16,

    /// Recipe catalog poll cadence, milliseconds.
    #[arg(long, env = "POLL_INTERVAL_MS", default_value_t = 30_000)]
    pub poll_interval_ms: u64,

    /// Divergence compute tick cadence, seconds.
    #[arg(long, env = "DIVERGENCE_TICK_SECONDS", default_value_t = 60)]
    pub divergence_tick_seconds: u64,

    /// Per-family sliding window duration: a Sample older than this (by its
    /// own timestamp, relative to the tick's `now`) is evicted.
    #[arg(long, env = "SLIDING_WINDOW_SECONDS", default_value_t = 300)]
    pub sliding_window_seconds: i64,

    /// Absolute element cap per family's sliding window, regardless of age.
    #[arg(long, env = "SLIDING_WINDOW_MAX_SAMPLES", default_value_t = 50_000)]
    pub sliding_window_max_samples: usize,

    /// Base records/second used by the monitor's own comparison
    /// synthesizer; independent of any worker's assignment.
    #[arg(long, env = "BASE_RATE", default_value_t = 10.0)]
    pub base_rate: f64,

    #[arg(long, env = "JS_THRESHOLD", default_value_t = 0.05)]
    pub js_threshold: f64,

    #[arg(long, env = "WASSERSTEIN_THRESHOLD", default_value_t = 0.1)]
    pub wasserstein_threshold: f64,

    #[arg(long, env = "KS_THRESHOLD", default_value_t = 0.05)]
    pub ks_threshold: f64,

    #[arg(long, env = "RED_MINUTES", default_value_t = 15)]
    pub red_minutes: u32,
}

impl MonitorConfig {
    pub fn thresholds(&self) -> loadgen_models::Thresholds {
        loadgen_models::Thresholds {
            js_threshold: self.js_threshold,
            wasserstein_threshold: self.wasserstein_threshold,
            ks_threshold: self.ks_threshold,
            red_minutes: self.red_minutes,
        }
    }
}
