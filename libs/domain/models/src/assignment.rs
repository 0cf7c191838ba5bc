// [libs/domain/models/src/assignment.rs]
//! Assignment: the control-plane-issued directive telling a worker which
//! families to emit, at what rate, against which endpoints.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Assignment {
    pub worker_id: String,
    pub families: Vec<String>,
    pub multiplier: f64,
    pub burst_factor: f64,
    #[serde(default)]
    pub schema_drift: f64,
    #[serde(default)]
    pub error_injection: f64,
    pub endpoints: Vec<String>,
    pub auth_credential: String,
}

impl Assignment {
    /// The subset of fields whose change should trigger reconfiguration,
    /// per spec.md §4.8 ("On change (by value equality of {families,
    /// multiplier, burst_factor})").
    pub fn reconfigure_key(&self) -> (&[String], u64, u64) {
        (&self.families, self.multiplier.to_bits(), self.burst_factor.to_bits())
    }

    pub fn differs_materially(&self, other: &Assignment) -> bool {
        self.reconfigure_key() != other.reconfigure_key()
    }
}
