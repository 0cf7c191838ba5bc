// [apps/monitor/src/sampling.rs]
//! Per-family comparison sampling: synthesizes from the same recipe the
//! worker would use and tees the result into the family's divergence
//! window, without any downstream delivery. Mirrors the worker's
//! tee-by-decode technique in `family_task.rs` so the monitor only ever
//! reasons about well-formed traffic, matching a real collector.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;
use tokio_util::sync::CancellationToken;

use loadgen_divergence::SlidingWindow;
use loadgen_synth::FamilySynthesizer;

use crate::decode::sample_from_line;

const TICK_HZ: u64 = 10;

pub async fn run(
    family_id: String,
    synthesizer: Arc<Mutex<FamilySynthesizer>>,
    base_rate: f64,
    divergence: Arc<Mutex<SlidingWindow>>,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(Duration::from_millis(1000 / TICK_HZ));
    let mut rng = rand::thread_rng();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = ticker.tick() => {}
        }

        let now = crate::unix_now();
        let rate = {
            let synth = synthesizer.lock();
            synth.target_rate(now, base_rate, 1.0, 1.0, &mut rng)
        };

        let expected = rate / TICK_HZ as f64;
        let whole = expected.floor() as u64;
        let frac = (expected - whole as f64).clamp(0.0, 1.0);
        let count = whole + if rng.gen_bool(frac) { 1 } else { 0 };

        let offsets = {
            let synth = synthesizer.lock();
            synth.record_offsets(now, count as usize, &mut rng)
        };
        for offset in offsets {
            let record_now = now + offset;
            let line = {
                let mut synth = synthesizer.lock();
                synth.next_record(record_now, 1.0, 0.0, 0.0, &mut rng)
            };
            if let Some(sample) = sample_from_line(&family_id, record_now, &line) {
                divergence.lock().push(sample, now);
            }
        }
    }
}
