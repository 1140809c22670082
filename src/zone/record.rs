//! Record frames and their handles.

use super::RecordZone;
use crate::common::Result;
use std::ops::{Deref, DerefMut};

/// Framing protocol a frame was opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// Tagged record with a 24-bit length
    Star,
    /// Byte range announced by the low nibble of a flag byte
    FlagZone,
    /// SFX mini record, the base of every SFX record
    Sfx,
    /// Version-compatibility header
    VersionCompat,
    /// Length-prefixed record of the spreadsheet streams
    Sc,
}

/// An open byte range of the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordFrame {
    pub kind: RecordKind,
    /// Tag (star records), flag byte (flag zones) or pre-tag (SFX)
    pub tag: u8,
    /// Offset of the header
    pub start: u64,
    /// Offset one past the last byte, `None` when the size is unknown
    pub end: Option<u64>,
}

/// Proof that a frame was opened; hand it back to close the frame.
#[must_use = "an open record must be closed with `close_record`"]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHandle {
    pub(crate) depth: usize,
    pub(crate) kind: RecordKind,
    pub(crate) tag: u8,
    pub(crate) start: u64,
}

impl RecordHandle {
    #[inline]
    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    #[inline]
    pub fn tag(&self) -> u8 {
        self.tag
    }

    /// Offset of the record header.
    #[inline]
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Number of frames that were open before this one.
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub(crate) fn matches(&self, frame: &RecordFrame) -> bool {
        frame.kind == self.kind && frame.tag == self.tag && frame.start == self.start
    }
}

/// A frame closed automatically when the guard goes out of scope.
///
/// The guard dereferences to the zone, so the record body is read through
/// it. Whatever path leaves the scope, the cursor ends on the frame's end.
///
/// ```
/// use starzone::stream::ByteStream;
/// use starzone::zone::RecordZone;
///
/// let mut zone = RecordZone::new(ByteStream::new(vec![b'T', 8, 0, 0, 1, 2, 3, 4]));
/// {
///     let mut record = zone.scoped_record("Test").unwrap();
///     assert_eq!(record.stream_mut().read_u8(), 1);
/// }
/// assert_eq!(zone.stream().tell(), 8);
/// assert_eq!(zone.record_level(), 0);
/// ```
pub struct ScopedRecord<'a> {
    zone: &'a mut RecordZone,
    handle: RecordHandle,
    name: &'static str,
    closed: bool,
}

impl<'a> ScopedRecord<'a> {
    pub(crate) fn new(zone: &'a mut RecordZone, handle: RecordHandle, name: &'static str) -> Self {
        Self {
            zone,
            handle,
            name,
            closed: false,
        }
    }

    #[inline]
    pub fn handle(&self) -> RecordHandle {
        self.handle
    }

    /// Close the frame now and report a mismatched close.
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        self.zone.close_record(self.handle, self.name)
    }
}

impl Deref for ScopedRecord<'_> {
    type Target = RecordZone;

    fn deref(&self) -> &RecordZone {
        self.zone
    }
}

impl DerefMut for ScopedRecord<'_> {
    fn deref_mut(&mut self) -> &mut RecordZone {
        self.zone
    }
}

impl Drop for ScopedRecord<'_> {
    fn drop(&mut self) {
        if !self.closed {
            // failures are already counted by the zone diagnostics
            let _ = self.zone.close_record(self.handle, self.name);
        }
    }
}
