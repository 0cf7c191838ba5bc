// [libs/domain/models/src/lib.rs]
//! Shared data model for the metric-ingest synthesis and replay workspace:
//! Recipe, Assignment, Sample, and DivergenceScore, plus the health-status
//! threshold logic shared by the worker and the monitor.

pub mod assignment;
pub mod divergence;
pub mod recipe;
pub mod sample;

pub use assignment::Assignment;
pub use divergence::{DivergenceScore, HealthStatus, Thresholds};
pub use recipe::{
    minute_of_day, Burstiness, IntervalPatternKind, QuantileCurve, Recipe, RecipeLoadError, Schema,
    SchemaKind, TagSchema, WeightedCategorical, MINUTES_PER_DAY,
};
pub use sample::Sample;
