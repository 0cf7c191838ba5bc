// [libs/core/samplers/src/interval.rs]
//! Time-interval sampler: the next inter-arrival gap, given an intensity
//! curve position and a burstiness pattern.

use rand::Rng;
use rand_distr::{Distribution, Exp};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalPattern {
    Uniform,
    Poisson,
    Bursty,
}

/// Next inter-arrival gap in seconds. `intensity_at_minute` is the recipe's
/// `intensity_curve[minute_of_day(now)]`; `base = 1/intensity` per spec.md
/// §4.2. A zero intensity yields an infinite gap (no emission that minute).
pub fn next_interval_seconds<R: Rng + ?Sized>(
    pattern: IntervalPattern,
    intensity_at_minute: f64,
    burstiness: f64,
    rng: &mut R,
) -> f64 {
    if intensity_at_minute <= 0.0 {
        return f64::INFINITY;
    }
    let base = 1.0 / intensity_at_minute;
    let exp1 = Exp::new(1.0).expect("Exp(1) is always valid");

    match pattern {
        IntervalPattern::Uniform => {
            let u: f64 = rng.gen_range(0.0..1.0);
            base * (0.5 + u)
        }
        IntervalPattern::Poisson => exp1.sample(rng) * base,
        IntervalPattern::Bursty => {
            if rng.gen_bool(0.1) {
                let u: f64 = rng.gen_range(0.0..1.0);
                base / (1.0 + burstiness * u)
            } else {
                2.0 * base * exp1.sample(rng)
            }
        }
    }
}
