// [libs/infra/emit/src/lib.rs]
//! Downstream delivery pipeline: Rate Governor, Batch Buffer, Connection
//! Manager, and Emitter.

mod batch;
mod connection;
mod emitter;
mod errors;
mod governor;

pub use batch::BatchBuffer;
pub use connection::{Connection, ConnectionManager, ConnectionState};
pub use emitter::Emitter;
pub use errors::{BufferFull, ConnectionBuildError, WriteError};
pub use governor::RateGovernor;
