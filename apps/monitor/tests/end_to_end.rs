// [apps/monitor/tests/end_to_end.rs]
//! End-to-end scenario 6 from spec.md §8 ("Divergence red"), driven through
//! the monitor binary's own pipeline rather than `loadgen-divergence` in
//! isolation: feed 1,000 samples whose `env` tag is 100% `prod` into a
//! tracked family's sliding window, then run the same `divergence_tick`
//! the monitor's periodic task calls, and confirm the reported JS
//! divergence matches the worked example and the family goes red on its
//! first tick.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio_util::sync::CancellationToken;

use loadgen_control_client::ControlPlaneClient;
use loadgen_models::recipe::{Burstiness, IntervalPatternKind, Schema, SchemaKind, MINUTES_PER_DAY};
use loadgen_models::{HealthStatus, Recipe, Sample};
use loadgen_monitor::config::MonitorConfig;
use loadgen_monitor::divergence_tick;
use loadgen_monitor::state::{spawn_tracker, MonitorState};

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

/// Schema carries no tag keys so the tracker's own background comparison
/// synthesizer (driven by `base_rate = 0.0` below, but defensive anyway)
/// never contributes an `env` tag of its own; `tag_distributions["env"]`
/// is read directly by `SlidingWindow::compute` regardless of schema.
fn divergence_red_recipe() -> Recipe {
    let mut tag_distributions = HashMap::new();
    tag_distributions.insert(
        "env".to_string(),
        vec![
            ("prod".to_string(), 0.7),
            ("staging".to_string(), 0.2),
            ("dev".to_string(), 0.1),
        ],
    );
    Recipe {
        family_id: "cpu.util".into(),
        metric_name: "cpu.util".into(),
        schema: Schema {
            kind: SchemaKind::Metric,
            tag_keys: HashMap::new(),
        },
        value_distribution: vec![10.0, 20.0, 42.0, 80.0, 95.0],
        source_distribution: vec![("host-01".into(), 1.0)],
        tag_distributions,
        intensity_curve: vec![1.0; MINUTES_PER_DAY],
        burstiness: Burstiness {
            mean: 1.0,
            stddev: 0.1,
        },
        size_quantiles: vec![10.0, 20.0, 30.0],
        interval_pattern: IntervalPatternKind::Uniform,
        string_patterns: HashMap::new(),
        version: 1,
    }
}

#[tokio::test]
async fn divergence_red_scenario_reaches_monitor_tick() {
    let config = MonitorConfig::parse_from([
        "loadgen-monitor",
        "--control-plane-url",
        "http://127.0.0.1:0",
    ]);
    let control_client = ControlPlaneClient::new("http://127.0.0.1:0".to_string(), String::new());
    let handle = PrometheusBuilder::new().build_recorder().handle();
    let state = Arc::new(MonitorState::new(config, control_client, handle));

    let recipe = Arc::new(divergence_red_recipe());
    let shutdown = CancellationToken::new();
    // base_rate = 0.0: the tracker's background comparison synthesizer never
    // emits on its own, so the window holds exactly the samples pushed below.
    let tracker = spawn_tracker(
        "cpu.util".to_string(),
        recipe,
        0.0,
        300,
        50_000,
        shutdown.child_token(),
    )
    .expect("recipe is well-formed");

    let ts = now();
    {
        let mut window = tracker.divergence.lock();
        for _ in 0..1000 {
            let mut tags = HashMap::new();
            tags.insert("env".to_string(), "prod".to_string());
            window.push(
                Sample {
                    family_id: "cpu.util".into(),
                    timestamp: ts,
                    value: 42.0,
                    source: "host-01".into(),
                    tags,
                    line_size: 32,
                },
                ts,
            );
        }
    }

    state.families.write().insert("cpu.util".to_string(), tracker);

    divergence_tick::tick_now(&state).await;

    {
        let scores = state.divergence_scores.read();
        let score = scores.get("cpu.util").expect("first tick must produce a score");
        let js = score.js_categorical["tag_env"];
        assert!((js - 0.34).abs() < 0.02, "expected ~0.34, got {js}");
        assert_eq!(score.status, HealthStatus::Red);
        assert_eq!(score.consecutive_red, 1);
    }

    let tracker = state.families.write().remove("cpu.util").unwrap();
    tracker.stop().await;
}
