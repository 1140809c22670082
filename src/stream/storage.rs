//! Compound storage collaborator.
//!
//! A container file is usually an OLE-like storage holding several named
//! streams (`StarWriterDocument`, `SfxStyleSheets`, ...). Walking the
//! storage directory is not this crate's job: callers plug their walker in
//! through [`CompoundStorage`] and the [`ByteStream`](super::ByteStream)
//! hands out sub-streams on demand.

use bytes::Bytes;

/// Access to the named sub-streams of a compound file.
pub trait CompoundStorage {
    /// Whether the underlying file actually is a compound file.
    fn is_structured(&self) -> bool {
        true
    }

    /// Number of sub-streams.
    fn sub_stream_count(&self) -> usize;

    /// Name of the sub-stream with the given index.
    fn sub_stream_name(&self, id: usize) -> Option<String>;

    /// Content of a sub-stream looked up by name.
    fn sub_stream_by_name(&self, name: &str) -> Option<Bytes>;

    /// Content of a sub-stream looked up by index.
    fn sub_stream_by_id(&self, id: usize) -> Option<Bytes> {
        self.sub_stream_name(id)
            .and_then(|name| self.sub_stream_by_name(&name))
    }
}

/// In-memory storage, mostly useful for already extracted streams.
///
/// Sub-stream indices follow insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    streams: Vec<(String, Bytes)>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sub-stream, replacing any stream with the same name.
    pub fn insert(&mut self, name: impl Into<String>, data: impl Into<Bytes>) {
        let name = name.into();
        let data = data.into();
        match self.streams.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = data,
            None => self.streams.push((name, data)),
        }
    }

    /// Builder flavour of [`insert`](Self::insert).
    pub fn with_stream(mut self, name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        self.insert(name, data);
        self
    }
}

impl CompoundStorage for MemoryStorage {
    fn sub_stream_count(&self) -> usize {
        self.streams.len()
    }

    fn sub_stream_name(&self, id: usize) -> Option<String> {
        self.streams.get(id).map(|(name, _)| name.clone())
    }

    fn sub_stream_by_name(&self, name: &str) -> Option<Bytes> {
        self.streams
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, data)| data.clone())
    }

    fn sub_stream_by_id(&self, id: usize) -> Option<Bytes> {
        self.streams.get(id).map(|(_, data)| data.clone())
    }
}
