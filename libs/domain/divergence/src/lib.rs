// [libs/domain/divergence/src/lib.rs]
//! Statistical comparison between a recipe's reference distributions and a
//! family's live emission: categorical JS divergence per tag, a
//! Wasserstein-like distance over value quantiles, a KS-like statistic over
//! size quantiles, and Pearson correlation against the recipe's intensity
//! curve over time.

mod correlation;
mod errors;
mod js;
mod quantile;
mod sliding_window;

pub use errors::DivergenceComputeError;
pub use sliding_window::SlidingWindow;
