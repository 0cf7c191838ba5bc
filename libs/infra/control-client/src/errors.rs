// [libs/infra/control-client/src/errors.rs]
//! Error types for control-plane communication.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssignmentFetchError {
    #[error("request to control plane failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("control plane returned no assignment for worker {worker_id}")]
    NotFound { worker_id: String },
    #[error("control plane returned unexpected status {status} for worker {worker_id}")]
    UnexpectedStatus { worker_id: String, status: u16 },
    #[error("failed to decode assignment body: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum RecipeFetchError {
    #[error("request to control plane failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("control plane has no recipe for family {family_id}")]
    NotFound { family_id: String },
    #[error("control plane returned unexpected status {status} for family {family_id}")]
    UnexpectedStatus { family_id: String, status: u16 },
    #[error("failed to decompress zstd recipe body for family {family_id}: {source}")]
    Decompress {
        family_id: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode recipe body for family {family_id}: {source}")]
    Decode {
        family_id: String,
        #[source]
        source: serde_json::Error,
    },
}
