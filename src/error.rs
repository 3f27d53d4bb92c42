//! The codec's error taxonomy (SPEC_FULL.md §7).

use thiserror::Error;

/// Everything that can go wrong encoding or decoding a streaming message.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The input ended mid-frame: mid-varint, mid-length, or mid-payload.
    #[error("input truncated mid-frame")]
    Truncated,

    /// A varint exceeded its declared width, or a length-delimited payload
    /// exceeded the configured overflow ceiling.
    #[error("value overflowed its declared width or length ceiling")]
    Overflow,

    /// An unsupported wire type was seen, or a field's cardinality (singular
    /// vs. repeated) did not match the wire frame that targeted it.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(&'static str),

    /// A submessage failed to decode under the standard (non-streaming)
    /// protobuf codec.
    #[error("submessage marshal failed: {0}")]
    Marshal(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The underlying byte source or sink returned an I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// An operation was attempted on an already-closed message.
    #[error("message is closed")]
    Closed,
}
