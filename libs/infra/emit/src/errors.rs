// [libs/infra/emit/src/errors.rs]
//! Error types owned by the emission pipeline.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectionBuildError {
    #[error("failed to connect to {endpoint}: {source}")]
    Io {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("write to {endpoint} failed: {source}")]
    Io {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },
    #[error("batch dropped after {attempts} failed attempts against {endpoint}")]
    BatchDropped { endpoint: String, attempts: u32 },
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("batch buffer is full: {lines} lines / {bytes} bytes")]
pub struct BufferFull {
    pub lines: usize,
    pub bytes: usize,
}
