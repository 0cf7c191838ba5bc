// [libs/domain/synth/src/lib.rs]
//! Recipe-driven record synthesis: the Family Synthesizer, its per-minute
//! delta accumulator, and the schema-drift/error-injection policies it
//! applies before handing a line to the Protocol Encoder.

mod delta;
mod drift;
mod error_inject;
mod synthesizer;

pub use synthesizer::FamilySynthesizer;
