// [libs/domain/models/src/sample.rs]
//! Sample: one synthesized observation, transient — produced by a
//! synthesizer and consumed by the emitter and the divergence monitor.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    pub family_id: String,
    pub timestamp: i64,
    pub value: f64,
    pub source: String,
    pub tags: HashMap<String, String>,
    pub line_size: usize,
}
