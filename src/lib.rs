//! Starzone - decoding engine for legacy StarOffice binary containers
//!
//! StarOffice-era documents (.sdw, .sdc, .sdd, .sda, .sgl) are compound
//! storages whose streams share one binary vocabulary: integers in a
//! selectable byte order, nested length-prefixed records, flag zones,
//! SFX records with content tables, a string pool and a versioned
//! attribute pool. This crate reads that vocabulary; the document-level
//! parsers built on top of it decide what the records mean.
//!
//! # Layers
//!
//! - [`stream`]: [`ByteStream`], a cursor over one stream with integer,
//!   compressed integer and legacy floating-point reads, plus sub-stream
//!   access when the stream is backed by a [`CompoundStorage`]
//! - [`zone`]: [`RecordZone`], the record framing state of one decoding
//!   session (open frames, record size directory, string pool, diagnostics)
//! - [`pool`]: [`AttributePool`], the versioned attribute dictionary in both
//!   on-disk generations
//!
//! Malformed structure is tolerated wherever a reader can resynchronize:
//! such defects go to the zone's [`Diagnostics`] and the `tracing` log
//! instead of failing the read.
//!
//! # Example - Reading records from a sub-stream
//!
//! ```
//! use starzone::{ByteStream, MemoryStorage, RecordZone, ZoneOptions};
//!
//! # fn main() -> starzone::Result<()> {
//! let storage = MemoryStorage::new()
//!     .with_stream("StarWriterDocument", vec![0x44, 8, 0, 0, 0x2A, 0, 0, 0]);
//! let root = ByteStream::structured(Vec::<u8>::new(), storage);
//! let stream = root.sub_stream_by_name("StarWriterDocument")?;
//!
//! let mut zone = RecordZone::with_options(
//!     stream,
//!     ZoneOptions::new().with_name("SWDoc").with_version(0x0201),
//! );
//! let record = zone.open_record()?;
//! assert_eq!(record.tag(), b'D');
//! let value = zone.stream_mut().read_u32();
//! zone.close_record(record, "Document")?;
//!
//! assert_eq!(value, 42);
//! assert!(zone.finish());
//! # Ok(())
//! # }
//! ```

/// Error types, diagnostics and charset support
pub mod common;

/// Format constants
pub mod consts;

/// Versioned attribute pools
pub mod pool;

/// Byte-level stream access
pub mod stream;

/// Record framing
pub mod zone;

#[cfg(test)]
mod testing;

// Re-export commonly used types for convenience
pub use common::{DiagnosticKind, Diagnostics, Error, Result};
pub use pool::{AttributeCatalog, AttributePool, Item, PoolGeneration, Surrogate, VersionMapEntry};
pub use stream::{ByteStream, CompoundStorage, LegacyFloat, MemoryStorage};
pub use zone::{RecordHandle, RecordKind, RecordZone, ScopedRecord, SfxContent, SfxRecord, ZoneOptions};
