// [libs/domain/models/src/recipe.rs]
//! Recipe: the compact statistical profile a Family Synthesizer replays.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of minutes in a day; the fixed length of [`Recipe::intensity_curve`].
pub const MINUTES_PER_DAY: usize = 1440;

/// The wire shape of one record family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaKind {
    Metric,
    Delta,
    Histogram,
    Span,
}

/// Selects the inter-arrival gap shape a Family Synthesizer draws from its
/// time-interval sampler (spec.md §4.2's fourth sampler). Mirrored by
/// `loadgen_samplers::IntervalPattern`; kept as its own serde-friendly enum
/// here so the data-model crate doesn't need a `rand` dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IntervalPatternKind {
    #[default]
    Uniform,
    Poisson,
    Bursty,
}

/// Declared behavior for one tag key within a family's schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagSchema {
    /// Probability in `[0, 1]` that an emitted record carries this tag.
    pub presence: f64,
    /// Declared value type; informational only (samplers decide actual values).
    #[serde(rename = "type")]
    pub value_type: String,
}

/// A weighted categorical distribution: label -> weight.
pub type WeightedCategorical = Vec<(String, f64)>;

/// Sorted quantile points `q[0..n]`, equally spaced over `[0, 1]` of the CDF.
pub type QuantileCurve = Vec<f64>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    pub kind: SchemaKind,
    pub tag_keys: HashMap<String, TagSchema>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Burstiness {
    pub mean: f64,
    pub stddev: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub family_id: String,
    pub metric_name: String,
    pub schema: Schema,
    /// Quantiles p01/p05/p50/p95/p99, ascending.
    pub value_distribution: QuantileCurve,
    pub source_distribution: WeightedCategorical,
    pub tag_distributions: HashMap<String, WeightedCategorical>,
    /// One multiplier per minute of day; length must equal [`MINUTES_PER_DAY`].
    pub intensity_curve: Vec<f64>,
    pub burstiness: Burstiness,
    pub size_quantiles: QuantileCurve,
    #[serde(default)]
    pub interval_pattern: IntervalPatternKind,
    #[serde(default)]
    pub string_patterns: HashMap<String, Vec<(String, f64)>>,
    /// Monotonically increasing; bumped by the catalog on in-place replacement.
    #[serde(default)]
    pub version: u64,
}

#[derive(Debug, Error)]
pub enum RecipeLoadError {
    #[error("malformed recipe body: {0}")]
    Malformed(String),
    #[error("recipe {family_id} has {actual} intensity_curve entries, expected {expected}")]
    BadIntensityCurveLength {
        family_id: String,
        actual: usize,
        expected: usize,
    },
    #[error("recipe {family_id} declares tag {tag} with presence > 0 but no distribution entry")]
    MissingTagDistribution { family_id: String, tag: String },
    #[error("recipe fetch for family {family_id} failed: {reason}")]
    FetchFailed { family_id: String, reason: String },
}

impl Recipe {
    /// Enforces invariants (a) and (b) from the data model: tag coverage and
    /// intensity curve shape. Transient sampling paths never fail; only
    /// construction does.
    pub fn validate(&self) -> Result<(), RecipeLoadError> {
        if self.intensity_curve.len() != MINUTES_PER_DAY {
            return Err(RecipeLoadError::BadIntensityCurveLength {
                family_id: self.family_id.clone(),
                actual: self.intensity_curve.len(),
                expected: MINUTES_PER_DAY,
            });
        }
        if self.intensity_curve.iter().any(|v| *v < 0.0 || !v.is_finite()) {
            return Err(RecipeLoadError::Malformed(format!(
                "recipe {} has a negative or non-finite intensity_curve entry",
                self.family_id
            )));
        }
        for (tag, schema) in &self.schema.tag_keys {
            if schema.presence > 0.0
                && !self.tag_distributions.contains_key(tag)
                && !self.string_patterns.contains_key(tag)
            {
                return Err(RecipeLoadError::MissingTagDistribution {
                    family_id: self.family_id.clone(),
                    tag: tag.clone(),
                });
            }
        }
        Ok(())
    }

    /// The minute-of-day intensity multiplier for a given Unix timestamp.
    pub fn intensity_at(&self, unix_seconds: i64) -> f64 {
        let minute = minute_of_day(unix_seconds);
        self.intensity_curve[minute]
    }
}

/// Minute-of-day (`0..1440`) for a Unix timestamp, UTC.
pub fn minute_of_day(unix_seconds: i64) -> usize {
    let seconds_into_day = unix_seconds.rem_euclid(86_400);
    (seconds_into_day / 60) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_recipe() -> Recipe {
        Recipe {
            family_id: "cpu.util".into(),
            metric_name: "cpu.util".into(),
            schema: Schema {
                kind: SchemaKind::Metric,
                tag_keys: HashMap::new(),
            },
            value_distribution: vec![10.0, 20.0, 42.0, 80.0, 95.0],
            source_distribution: vec![("host-01".into(), 1.0)],
            tag_distributions: HashMap::new(),
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

    #[test]
    fn valid_recipe_passes() {
        assert!(sample_recipe().validate().is_ok());
    }

    #[test]
    fn wrong_curve_length_rejected() {
        let mut recipe = sample_recipe();
        recipe.intensity_curve.pop();
        assert!(matches!(
            recipe.validate(),
            Err(RecipeLoadError::BadIntensityCurveLength { .. })
        ));
    }

    #[test]
    fn tag_with_presence_needs_distribution() {
        let mut recipe = sample_recipe();
        recipe.schema.tag_keys.insert(
            "region".into(),
            TagSchema {
                presence: 0.5,
                value_type: "string".into(),
            },
        );
        assert!(matches!(
            recipe.validate(),
            Err(RecipeLoadError::MissingTagDistribution { .. })
        ));
    }

    #[test]
    fn interval_pattern_defaults_to_uniform_when_absent() {
        let mut json = serde_json::to_value(sample_recipe()).unwrap();
        json.as_object_mut().unwrap().remove("interval_pattern");
        let recipe: Recipe = serde_json::from_value(json).unwrap();
        assert_eq!(recipe.interval_pattern, IntervalPatternKind::Uniform);
    }

    #[test]
    fn minute_of_day_wraps() {
        assert_eq!(minute_of_day(0), 0);
        assert_eq!(minute_of_day(86_399), 1439);
        assert_eq!(minute_of_day(86_400), 0);
        assert_eq!(minute_of_day(90), 1);
    }
}
