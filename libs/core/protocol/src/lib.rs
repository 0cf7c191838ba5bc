// [libs/core/protocol/src/lib.rs]
//! Text-protocol line encoder/decoder. Pure formatting and parsing; no I/O,
//! no knowledge of recipes, families, or connections.

mod escape;
mod record;
mod value;

pub use escape::{escape_token, unescape_token};
pub use record::{
    decode, encode, DecodeError, HistogramGranularity, HistogramRecord, Record, ScalarRecord,
    SpanRecord, DELTA_GLYPH,
};
pub use value::format_value;
