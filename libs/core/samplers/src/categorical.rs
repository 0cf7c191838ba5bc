// [libs/core/samplers/src/categorical.rs]
//! Weighted categorical sampler: pre-computed cumulative weights, binary
//! search against a uniform draw.

use rand::Rng;

pub struct WeightedCategorical {
    labels: Vec<String>,
    cumulative_weights: Vec<f64>,
    total_weight: f64,
}

impl WeightedCategorical {
    pub fn new(entries: &[(String, f64)]) -> Self {
        let mut cumulative_weights = Vec::with_capacity(entries.len());
        let mut running = 0.0;
        for (_, weight) in entries {
            running += weight.max(0.0);
            cumulative_weights.push(running);
        }
        Self {
            labels: entries.iter().map(|(label, _)| label.clone()).collect(),
            cumulative_weights,
            total_weight: running,
        }
    }

    /// Empty input returns the empty string. Zero total weight falls back to
    /// a uniform element choice (spec.md §4.2).
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        if self.labels.is_empty() {
            return String::new();
        }
        if self.total_weight <= 0.0 {
            let index = rng.gen_range(0..self.labels.len());
            return self.labels[index].clone();
        }
        let draw = rng.gen_range(0.0..self.total_weight);
        let index = match self
            .cumulative_weights
            .binary_search_by(|probe| probe.partial_cmp(&draw).unwrap())
        {
            Ok(i) => i,
            Err(i) => i,
        };
        let index = index.min(self.labels.len() - 1);
        self.labels[index].clone()
    }
}
