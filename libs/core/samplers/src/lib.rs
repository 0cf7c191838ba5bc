// [libs/core/samplers/src/lib.rs]
//! Pure samplers: weighted categorical, quantile-interpolated numeric,
//! restricted-regex string pattern, and time-interval. Every sampler is a
//! deterministic function of an injected seeded `rand::Rng`; none perform
//! I/O.

pub mod categorical;
pub mod interval;
pub mod pattern;
pub mod quantile;

pub use categorical::WeightedCategorical;
pub use interval::{next_interval_seconds, IntervalPattern};
pub use pattern::{expand_pattern, StringPatternSampler};
pub use quantile::QuantileSampler;
