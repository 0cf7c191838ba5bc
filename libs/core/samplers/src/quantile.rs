// [libs/core/samplers/src/quantile.rs]
//! Quantile-interpolated numeric sampler.

use rand::Rng;
use rand_distr::{Distribution, Normal};

pub struct QuantileSampler {
    quantiles: Vec<f64>,
}

impl QuantileSampler {
    pub fn new(quantiles: Vec<f64>) -> Self {
        Self { quantiles }
    }

    /// Draws `p ∈ [0,1]` uniformly and linearly interpolates between
    /// `q[floor(p·n)]` and the next point. With fewer than three quantiles,
    /// falls back to `N(50, 10)` per spec.md §4.2.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.quantiles.len() < 3 {
            let normal = Normal::new(50.0, 10.0).expect("N(50,10) is always valid");
            return normal.sample(rng);
        }
        let n = self.quantiles.len() - 1;
        let p: f64 = rng.gen_range(0.0..1.0);
        let scaled = p * n as f64;
        let lower_index = scaled.floor() as usize;
        let lower_index = lower_index.min(n - 1);
        let upper_index = (lower_index + 1).min(n);
        let fraction = scaled - lower_index as f64;
        let lower = self.quantiles[lower_index];
        let upper = self.quantiles[upper_index];
        lower + (upper - lower) * fraction
    }
}
