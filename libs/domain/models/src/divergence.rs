// [libs/domain/models/src/divergence.rs]
//! DivergenceScore: the recomputed-on-a-timer health verdict for one family.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Green,
    Amber,
    Red,
}

impl HealthStatus {
    /// Numeric encoding used by the `family_status{family_id,metric_name}`
    /// gauge in spec.md §6 (0/1/2).
    pub fn as_gauge_value(self) -> f64 {
        match self {
            HealthStatus::Green => 0.0,
            HealthStatus::Amber => 1.0,
            HealthStatus::Red => 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DivergenceScore {
    pub family_id: String,
    /// Per-tag JS divergence, keyed by tag name (`"tag_<key>"` per spec.md
    /// §8's example label `distribution_type="tag_env"`), plus the mean.
    pub js_categorical: std::collections::HashMap<String, f64>,
    pub wasserstein_value: f64,
    pub ks_size: f64,
    /// Pearson correlation between windowed per-minute counts and the
    /// recipe's intensity curve; `None` until enough minutes are observed.
    pub temporal_correlation: Option<f64>,
    pub last_computed: i64,
    pub status: HealthStatus,
    pub consecutive_red: u32,
}

impl DivergenceScore {
    pub fn fresh(family_id: impl Into<String>) -> Self {
        Self {
            family_id: family_id.into(),
            js_categorical: std::collections::HashMap::new(),
            wasserstein_value: 0.0,
            ks_size: 0.0,
            temporal_correlation: None,
            last_computed: 0,
            status: HealthStatus::Green,
            consecutive_red: 0,
        }
    }
}

/// Threshold configuration for the monitor, per spec.md §6 "Configuration
/// surface (monitor)".
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Thresholds {
    pub js_threshold: f64,
    pub wasserstein_threshold: f64,
    pub ks_threshold: f64,
    pub red_minutes: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            js_threshold: 0.05,
            wasserstein_threshold: 0.1,
            ks_threshold: 0.05,
            red_minutes: 15,
        }
    }
}

impl Thresholds {
    /// Status classification per spec.md §4.9: red if any metric exceeds its
    /// threshold; amber if any exceeds half its threshold; else green.
    pub fn classify(&self, js_mean: f64, wasserstein: f64, ks: f64) -> HealthStatus {
        let red = js_mean > self.js_threshold
            || wasserstein > self.wasserstein_threshold
            || ks > self.ks_threshold;
        if red {
            return HealthStatus::Red;
        }
        let amber = js_mean > self.js_threshold / 2.0
            || wasserstein > self.wasserstein_threshold / 2.0
            || ks > self.ks_threshold / 2.0;
        if amber {
            HealthStatus::Amber
        } else {
            HealthStatus::Green
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn green_when_all_under_half_threshold() {
        let t = Thresholds::default();
        assert_eq!(t.classify(0.01, 0.01, 0.01), HealthStatus::Green);
    }

    #[test]
    fn amber_when_over_half_but_under_threshold() {
        let t = Thresholds::default();
        assert_eq!(t.classify(0.03, 0.0, 0.0), HealthStatus::Amber);
    }

    #[test]
    fn red_when_over_threshold() {
        let t = Thresholds::default();
        assert_eq!(t.classify(0.34, 0.0, 0.0), HealthStatus::Red);
    }
}
