// [libs/domain/divergence/src/errors.rs]
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DivergenceComputeError {
    #[error("recipe for family {family_id} has no value_distribution quantiles")]
    EmptyValueDistribution { family_id: String },
    #[error("recipe for family {family_id} has no size_quantiles")]
    EmptySizeQuantiles { family_id: String },
}
