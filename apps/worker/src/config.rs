// [apps/worker/src/config.rs]
//! CLI configuration surface for the worker binary, per spec.md §6's
//! "Configuration surface (worker)" table. A missing required flag makes
//! `clap` exit non-zero with a usage message at startup, satisfying
//! `FatalConfigError` without a bespoke error path.

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "loadgen-worker", about = "Metric-ingest synthesis worker")]
pub struct WorkerConfig {
    /// Identity reported to the control plane.
    #[arg(long, env = "WORKER_ID")]
    pub worker_id: String,

    /// Base URL of the control plane.
    #[arg(long, env = "CONTROL_PLANE_URL")]
    pub control_plane_url: String,

    /// Bearer credential sent with every control-plane request. The control
    /// plane may also supply a per-assignment credential, which takes
    /// precedence once an assignment is loaded.
    #[arg(long, env = "CONTROL_PLANE_CREDENTIAL", default_value = "")]
    pub control_plane_credential: String,

    /// Port for the health/ready/status/metrics HTTP listener.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Assignment poll cadence, milliseconds.
    #[arg(long, env = "POLL_INTERVAL_MS", default_value_t = 5_000)]
    pub poll_interval_ms: u64,

    /// Batch Buffer line capacity.
    #[arg(long, env = "BATCH_SIZE", default_value_t = 500)]
    pub batch_size: usize,

    /// Batch Buffer byte capacity.
    #[arg(long, env = "BATCH_BYTES", default_value_t = 262_144)]
    pub batch_bytes: usize,

    /// Periodic buffer flush cadence, milliseconds.
    #[arg(long, env = "FLUSH_INTERVAL_MS", default_value_t = 1_000)]
    pub flush_interval_ms: u64,

    /// Writer buffer allocated per connection, bytes.
    #[arg(long, env = "CONNECTION_BUFFER_BYTES", default_value_t = 8192)]
    pub connection_buffer_bytes: usize,

    /// Reconnect backoff lower bound, milliseconds.
    #[arg(long, env = "RECONNECT_INITIAL_MS", default_value_t = 1_000)]
    pub reconnect_initial_ms: u64,

    /// Reconnect backoff upper bound, milliseconds.
    #[arg(long, env = "RECONNECT_MAX_MS", default_value_t = 60_000)]
    pub reconnect_max_ms: u64,

    /// Maximum delivery attempts before a batch is dropped.
    #[arg(long, env = "MAX_DELIVERY_ATTEMPTS", default_value_t = 5)]
    pub max_delivery_attempts: u32,

    /// Base records/second per family before intensity/multiplier scaling.
    #[arg(long, env = "BASE_RATE", default_value_t = 10.0)]
    pub base_rate: f64,

    /// Rate Governor acceleration toward target rate, records/sec².
    #[arg(long, env = "RATE_ACCELERATION", default_value_t = 5.0)]
    pub rate_acceleration: f64,

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

    /// How long the connection pool may stay in `Reconnecting` before
    /// readiness is withdrawn.
    #[arg(long, env = "READY_RECONNECT_DEADLINE_SECONDS", default_value_t = 30)]
    pub ready_reconnect_deadline_seconds: u64,
}
