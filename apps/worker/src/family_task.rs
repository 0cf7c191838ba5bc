// [apps/worker/src/family_task.rs]
//! The per-family emission task, run at ~10 Hz per spec.md §4.8 step 4:
//! compute the target rate, derive an expected line count for the elapsed
//! interval, synthesize that many lines, tee each as a Sample into the
//! family's divergence window, and hand the encoded line to its endpoint's
//! Batch Buffer. Reads `state.endpoints` directly on every tick rather than
//! a snapshot taken at spawn time, so an endpoint-pipeline rebuild (rare,
//! since endpoint changes alone don't trigger reconfiguration per spec.md
//! §4.8) is still visible to already-running family tasks.

use std::collections::HashMap as Map;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use rand::Rng;
use tokio_util::sync::CancellationToken;

use loadgen_divergence::SlidingWindow;
use loadgen_emit::RateGovernor;
use loadgen_models::{Assignment, Sample};
use loadgen_protocol::{decode, Record};
use loadgen_synth::FamilySynthesizer;

use crate::state::WorkerState;

const TICK_HZ: u64 = 10;

pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

fn endpoint_index(family_id: &str, endpoint_count: usize) -> usize {
    if endpoint_count == 0 {
        return 0;
    }
    let mut hasher = DefaultHasher::new();
    family_id.hash(&mut hasher);
    (hasher.finish() as usize) % endpoint_count
}

/// Decodes a just-synthesized line back into a [`Sample`], the same way a
/// downstream consumer would. Lines mangled by error injection that fail to
/// decode are simply not tee'd — the divergence monitor only ever sees
/// well-formed traffic, matching a real collector's behavior.
fn sample_from_line(family_id: &str, now: i64, line: &str) -> Option<Sample> {
    let record = decode(line).ok()?;
    let (timestamp, value, source, tags) = match record {
        Record::Metric(r) | Record::Delta(r) => (r.timestamp.unwrap_or(now), r.value, r.source, r.tags),
        Record::Histogram(r) => {
            let mean = r.centroids.first().map(|(_, mean)| *mean).unwrap_or(0.0);
            (r.timestamp, mean, r.source, r.tags)
        }
        Record::Span(r) => (now, r.duration_ms as f64, r.source, r.tags),
    };
    let mut tag_map = Map::new();
    for (key, value) in tags {
        tag_map.insert(key, value);
    }
    Some(Sample {
        family_id: family_id.to_string(),
        timestamp,
        value,
        source,
        tags: tag_map,
        line_size: line.len(),
    })
}

#[allow(clippy::too_many_arguments)]
pub async fn run(
    family_id: String,
    synthesizer: Arc<Mutex<FamilySynthesizer>>,
    rate_governor: Arc<RateGovernor>,
    divergence: Arc<Mutex<SlidingWindow>>,
    assignment: Arc<Assignment>,
    base_rate: f64,
    state: Arc<WorkerState>,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(Duration::from_millis(1000 / TICK_HZ));
    let mut rng = rand::thread_rng();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = ticker.tick() => {}
        }

        let now = unix_now();
        let target = {
            let synth = synthesizer.lock();
            synth.target_rate(now, base_rate, assignment.multiplier, assignment.burst_factor, &mut rng)
        };
        rate_governor.set_target(target);
        let current = rate_governor.current_rate();

        let expected = current / TICK_HZ as f64;
        let whole = expected.floor() as u64;
        let frac = (expected - whole as f64).clamp(0.0, 1.0);
        let count = whole + if rng.gen_bool(frac) { 1 } else { 0 };

        let pipelines = state.endpoints.read().clone();
        if pipelines.is_empty() {
            continue;
        }
        let pipeline = &pipelines[endpoint_index(&family_id, pipelines.len())];

        let offsets = {
            let synth = synthesizer.lock();
            synth.record_offsets(now, count as usize, &mut rng)
        };

        let mut bytes_this_tick = 0u64;
        for offset in offsets {
            let record_now = now + offset;
            let line = {
                let mut synth = synthesizer.lock();
                synth.next_record(
                    record_now,
                    assignment.multiplier,
                    assignment.schema_drift,
                    assignment.error_injection,
                    &mut rng,
                )
            };
            bytes_this_tick += line.len() as u64 + 1;

            if let Some(sample) = sample_from_line(&family_id, record_now, &line) {
                divergence.lock().push(sample, now);
            }

            if pipeline.buffer.add(line.clone()).is_err() {
                pipeline.emitter.flush_once().await;
                let _ = pipeline.buffer.add(line);
            }
        }

        if count > 0 {
            metrics::counter!("lines_emitted_total", "family_id" => family_id.clone()).increment(count);
            metrics::counter!("bytes_emitted_total", "family_id" => family_id.clone()).increment(bytes_this_tick);
        }
    }
}
