// [libs/domain/divergence/src/sliding_window.rs]
//! Per-family sliding window: holds `Sample`s bounded by age
//! (`window_duration`) and an absolute element cap, and turns a snapshot of
//! its contents into a `DivergenceScore` against a `Recipe`'s reference
//! distributions. Unlike a tumbling accumulator, samples are not cleared
//! on compute — they simply age out, so a slow-moving family's score is
//! still informed by samples collected several ticks ago.

use std::collections::{HashMap, VecDeque};

use loadgen_models::{DivergenceScore, HealthStatus, Recipe, Sample, Thresholds};
use tracing::instrument;

use crate::correlation::pearson;
use crate::errors::DivergenceComputeError;
use crate::js::js_divergence;
use crate::quantile::{ks_like, matched_quantiles, wasserstein_like};

const MINIMUM_SAMPLES: usize = 10;
/// How many past minute-buckets feed the temporal correlation; long enough
/// for a meaningful Pearson sample without growing unbounded.
const CORRELATION_WINDOW_MINUTES: usize = 60;

pub struct SlidingWindow {
    family_id: String,
    window_duration_seconds: i64,
    max_samples: usize,
    current: VecDeque<Sample>,
    minute_counts: VecDeque<(i64, f64)>,
    consecutive_red: u32,
}

impl SlidingWindow {
    pub fn new(family_id: impl Into<String>, window_duration_seconds: i64, max_samples: usize) -> Self {
        Self {
            family_id: family_id.into(),
            window_duration_seconds: window_duration_seconds.max(1),
            max_samples: max_samples.max(1),
            current: VecDeque::new(),
            minute_counts: VecDeque::new(),
            consecutive_red: 0,
        }
    }

    /// Evicts samples older than `window_duration_seconds` relative to
    /// `now`, then appends `sample`, then evicts from the front down to
    /// `max_samples` if still over cap. Per spec.md invariant (e), both
    /// bounds hold after every push.
    pub fn push(&mut self, sample: Sample, now: i64) {
        self.evict_expired(now);
        self.current.push_back(sample);
        while self.current.len() > self.max_samples {
            self.current.pop_front();
        }
    }

    fn evict_expired(&mut self, now: i64) {
        while let Some(front) = self.current.front() {
            if now - front.timestamp > self.window_duration_seconds {
                self.current.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn pending(&self) -> usize {
        self.current.len()
    }

    /// Computes a fresh score from a snapshot of the currently held
    /// samples (after pruning expired ones), without clearing the window —
    /// samples remain available to later ticks until they age out or are
    /// evicted by the cap. Returns `Ok(None)` (not an error) when fewer
    /// than 10 samples are held, since that's the expected steady state for
    /// a low-rate family between ticks.
    #[instrument(skip(self, recipe, thresholds), fields(family_id = %self.family_id))]
    pub fn compute(
        &mut self,
        recipe: &Recipe,
        thresholds: &Thresholds,
        now: i64,
    ) -> Result<Option<DivergenceScore>, DivergenceComputeError> {
        self.evict_expired(now);
        if self.current.len() < MINIMUM_SAMPLES {
            return Ok(None);
        }
        if recipe.value_distribution.is_empty() {
            return Err(DivergenceComputeError::EmptyValueDistribution {
                family_id: self.family_id.clone(),
            });
        }
        if recipe.size_quantiles.is_empty() {
            return Err(DivergenceComputeError::EmptySizeQuantiles {
                family_id: self.family_id.clone(),
            });
        }

        // Snapshot copy: statistics run over a cloned vector so producers
        // pushing new samples never block on this computation (spec.md §5).
        let snapshot: Vec<Sample> = self.current.iter().cloned().collect();

        let mut js_categorical = HashMap::new();
        let mut js_sum = 0.0;
        for tag_key in recipe.tag_distributions.keys() {
            let reference = &recipe.tag_distributions[tag_key];
            let mut observed: HashMap<String, u64> = HashMap::new();
            for sample in &snapshot {
                if let Some(value) = sample.tags.get(tag_key) {
                    *observed.entry(value.clone()).or_insert(0) += 1;
                }
            }
            let divergence = js_divergence(reference, &observed);
            js_categorical.insert(format!("tag_{tag_key}"), divergence);
            js_sum += divergence;
        }
        let js_mean = if js_categorical.is_empty() {
            0.0
        } else {
            js_sum / js_categorical.len() as f64
        };

        let mut values: Vec<f64> = snapshot.iter().map(|s| s.value).collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let (ref_values, cur_values) = matched_quantiles(&recipe.value_distribution, &values);
        let wasserstein_value = wasserstein_like(&ref_values, &cur_values);

        let mut sizes: Vec<f64> = snapshot.iter().map(|s| s.line_size as f64).collect();
        sizes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let (ref_sizes, cur_sizes) = matched_quantiles(&recipe.size_quantiles, &sizes);
        let ks_size = ks_like(&ref_sizes, &cur_sizes);

        let minute = now.div_euclid(60);
        self.minute_counts.push_back((minute, snapshot.len() as f64));
        while self.minute_counts.len() > CORRELATION_WINDOW_MINUTES {
            self.minute_counts.pop_front();
        }
        let observed_counts: Vec<f64> = self.minute_counts.iter().map(|(_, c)| *c).collect();
        let expected_intensity: Vec<f64> = self
            .minute_counts
            .iter()
            .map(|(minute, _)| recipe.intensity_at(minute * 60))
            .collect();
        let temporal_correlation = pearson(&observed_counts, &expected_intensity);

        let status = thresholds.classify(js_mean, wasserstein_value, ks_size);
        self.consecutive_red = if status == HealthStatus::Red {
            self.consecutive_red + 1
        } else {
            0
        };

        Ok(Some(DivergenceScore {
            family_id: self.family_id.clone(),
            js_categorical,
            wasserstein_value,
            ks_size,
            temporal_correlation,
            last_computed: now,
            status,
            consecutive_red: self.consecutive_red,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loadgen_models::recipe::{Burstiness, Schema, SchemaKind, MINUTES_PER_DAY};
    use std::collections::HashMap as Map;

    fn recipe() -> Recipe {
        Recipe {
            family_id: "cpu.util".into(),
            metric_name: "cpu.util".into(),
            schema: Schema {
                kind: SchemaKind::Metric,
                tag_keys: Map::new(),
            },
            value_distribution: vec![10.0, 20.0, 30.0, 40.0, 50.0],
            source_distribution: vec![("host-01".into(), 1.0)],
            tag_distributions: {
                let mut m = Map::new();
                m.insert(
                    "env".to_string(),
                    vec![("prod".to_string(), 8.0), ("staging".to_string(), 2.0)],
                );
                m
            },
            intensity_curve: vec![1.0; MINUTES_PER_DAY],
            burstiness: Burstiness { mean: 1.0, stddev: 0.1 },
            size_quantiles: vec![10.0, 20.0, 30.0],
            interval_pattern: Default::default(),
            string_patterns: Map::new(),
            version: 1,
        }
    }

    fn sample(value: f64, env: &str) -> Sample {
        let mut tags = Map::new();
        tags.insert("env".to_string(), env.to_string());
        Sample {
            family_id: "cpu.util".into(),
            timestamp: 1_700_000_000,
            value,
            source: "host-01".into(),
            tags,
            line_size: 20,
        }
    }

    #[test]
    fn below_minimum_samples_returns_none() {
        let mut window = SlidingWindow::new("cpu.util", 300, 10_000);
        for _ in 0..5 {
            window.push(sample(25.0, "prod"), 1_700_000_000);
        }
        let result = window.compute(&recipe(), &Thresholds::default(), 1_700_000_000).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn matched_distribution_yields_green_status() {
        let mut window = SlidingWindow::new("cpu.util", 300, 10_000);
        for i in 0..20 {
            let env = if i % 5 == 0 { "staging" } else { "prod" };
            window.push(sample(10.0 + (i as f64), env), 1_700_000_000);
        }
        let score = window
            .compute(&recipe(), &Thresholds::default(), 1_700_000_000)
            .unwrap()
            .unwrap();
        assert_eq!(score.status, HealthStatus::Green);
        assert_eq!(score.consecutive_red, 0);
    }

    #[test]
    fn skewed_tag_distribution_raises_js_divergence() {
        let mut window = SlidingWindow::new("cpu.util", 300, 10_000);
        for _ in 0..20 {
            window.push(sample(25.0, "staging"), 1_700_000_000);
        }
        let score = window
            .compute(&recipe(), &Thresholds::default(), 1_700_000_000)
            .unwrap()
            .unwrap();
        assert!(score.js_categorical["tag_env"] > 0.0);
    }

    #[test]
    fn samples_survive_compute_until_they_age_out() {
        let mut window = SlidingWindow::new("cpu.util", 300, 10_000);
        for _ in 0..20 {
            window.push(sample(25.0, "prod"), 1_700_000_000);
        }
        window.compute(&recipe(), &Thresholds::default(), 1_700_000_000).unwrap();
        assert_eq!(window.pending(), 20);
        // 301s later the whole batch has aged past the 300s window.
        window.compute(&recipe(), &Thresholds::default(), 1_700_000_301).unwrap();
        assert_eq!(window.pending(), 0);
    }

    #[test]
    fn cap_evicts_oldest_samples_first() {
        let mut window = SlidingWindow::new("cpu.util", 300, 5);
        for i in 0..8 {
            window.push(sample(i as f64, "prod"), 1_700_000_000);
        }
        assert_eq!(window.pending(), 5);
    }

    #[test]
    fn empty_value_distribution_is_rejected() {
        let mut window = SlidingWindow::new("cpu.util", 300, 10_000);
        for _ in 0..20 {
            window.push(sample(25.0, "prod"), 1_700_000_000);
        }
        let mut bad_recipe = recipe();
        bad_recipe.value_distribution.clear();
        let err = window.compute(&bad_recipe, &Thresholds::default(), 1_700_000_000).unwrap_err();
        assert!(matches!(err, DivergenceComputeError::EmptyValueDistribution { .. }));
    }
}
