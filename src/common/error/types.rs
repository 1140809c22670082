//! Unified error type for the container decoding engine.
//!
//! Only *hard* structural failures are reported through this type. Soft
//! defects (records closed at the wrong offset, truncated string pools,
//! unknown attribute ids, ...) are counted by
//! [`Diagnostics`](crate::common::Diagnostics) and never abort decoding.
use thiserror::Error;

/// Main error type for starzone operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error while loading a stream
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Not enough bytes left for an operation that must not be truncated
    #[error("Unexpected end of stream at offset {offset}: needed {needed} bytes")]
    UnexpectedEof { offset: u64, needed: u64 },

    /// The stream has no compound storage attached
    #[error("Stream is not structured")]
    NotStructured,

    /// Named or numbered sub-stream does not exist
    #[error("Sub-stream not found: {0}")]
    StreamNotFound(String),

    /// Record header cannot be decoded
    #[error("Invalid record at offset {offset}: {reason}")]
    InvalidRecord { offset: u64, reason: String },

    /// Record end lies outside the stream or its enclosing record
    #[error("Record at offset {offset} ends at {end}, beyond limit {limit}")]
    RecordOutOfBounds { offset: u64, end: u64, limit: u64 },

    /// Close requested for a record which is not open
    #[error("No open record matches the close request")]
    NoOpenRecord,

    /// Unexpected magic number
    #[error("Bad magic 0x{found:X} at offset {offset}")]
    BadMagic { offset: u64, found: u32 },

    /// Record size directory is inconsistent
    #[error("Invalid record size table: {0}")]
    InvalidSizeTable(String),

    /// Attribute pool is structurally corrupt
    #[error("Corrupted attribute pool: {0}")]
    CorruptedPool(String),
}

/// Result type for starzone operations.
pub type Result<T> = std::result::Result<T, Error>;
