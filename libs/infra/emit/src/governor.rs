// [libs/infra/emit/src/governor.rs]
//! Rate Governor: a token-bucket limiter whose rate accelerates linearly
//! toward a target, with evenly spaced permit issuance.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

struct State {
    current_rate: f64,
    target: f64,
    last_adjust: Instant,
    next_permit_at: Instant,
}

/// Parameters: `starting`/`target` rates in records/sec, `acceleration` in
/// records/sec², `refresh_seconds` the adjustment cadence. `acquire()`
/// blocks the caller until a token is available; a consumer may read
/// `current_rate()` to size its own batches.
pub struct RateGovernor {
    acceleration: f64,
    refresh_seconds: f64,
    state: Mutex<State>,
}

impl RateGovernor {
    pub fn new(starting: f64, target: f64, acceleration: f64, refresh_seconds: f64) -> Self {
        let now = Instant::now();
        Self {
            acceleration: acceleration.abs(),
            refresh_seconds: refresh_seconds.max(0.001),
            state: Mutex::new(State {
                current_rate: starting.max(0.0),
                target: target.max(0.0),
                last_adjust: now,
                next_permit_at: now,
            }),
        }
    }

    /// Retargets without resetting `current_rate`; the next `maybe_adjust`
    /// resumes acceleration from wherever `current_rate` currently sits.
    pub fn set_target(&self, target: f64) {
        let mut state = self.state.lock();
        state.target = target.max(0.0);
    }

    pub fn current_rate(&self) -> f64 {
        self.maybe_adjust();
        self.state.lock().current_rate
    }

    /// Every `refresh_seconds`, nudges `current_rate` by
    /// `±(elapsed·acceleration)` toward `target`, clamped so it never
    /// overshoots and never goes negative. Once `target` is reached, no
    /// further adjustment occurs until `target` changes.
    fn maybe_adjust(&self) {
        let now = Instant::now();
        let mut state = self.state.lock();
        let elapsed = now.saturating_duration_since(state.last_adjust).as_secs_f64();
        if elapsed < self.refresh_seconds {
            return;
        }
        state.last_adjust = now;
        if (state.current_rate - state.target).abs() < f64::EPSILON {
            return;
        }
        let step = elapsed * self.acceleration;
        if state.current_rate < state.target {
            state.current_rate = (state.current_rate + step).min(state.target);
        } else {
            state.current_rate = (state.current_rate - step).max(state.target).max(0.0);
        }
    }

    /// Blocks until the next evenly spaced permit is due. A `current_rate`
    /// of zero blocks for one second and re-checks, rather than hanging
    /// forever, so a governor that ramps up from zero still makes
    /// progress once adjusted.
    pub async fn acquire(&self) {
        self.maybe_adjust();
        loop {
            let wait = {
                let mut state = self.state.lock();
                if state.current_rate <= 0.0 {
                    None
                } else {
                    let interval = Duration::from_secs_f64(1.0 / state.current_rate);
                    let now = Instant::now();
                    let permit_at = state.next_permit_at.max(now);
                    state.next_permit_at = permit_at + interval;
                    Some(permit_at.saturating_duration_since(now))
                }
            };
            match wait {
                Some(duration) => {
                    if !duration.is_zero() {
                        tokio::time::sleep(duration).await;
                    }
                    self.maybe_adjust();
                    return;
                }
                None => {
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    self.maybe_adjust();
                }
            }
        }
    }
}
