//! Nested record framing over a [`ByteStream`].
//!
//! A zone is one decoding session of a stream: it keeps the stack of open
//! frames (star records, flag zones, SFX records and the smaller framing
//! variants), the record size directory, the string pool and the
//! diagnostics sink.
//!
//! Frames are opened and closed in strict nesting order. Closing a frame
//! always leaves the cursor on the frame's declared end, however many bytes
//! the caller read in between, and an inner frame may never end after its
//! enclosing frame.
//!
//! # Examples
//!
//! ```
//! use starzone::stream::ByteStream;
//! use starzone::zone::RecordZone;
//!
//! # fn main() -> starzone::Result<()> {
//! // record 'A' holding a flag zone, a u16 and record 'B' with a compressed int
//! let data = vec![
//!     0x41, 20, 0, 0, 0x01, 0xAA, 0x34, 0x12, //
//!     0x42, 6, 0, 0, 0x05, 0x00, 0, 0, 0, 0, 0, 0,
//! ];
//! let mut zone = RecordZone::new(ByteStream::new(data));
//!
//! let outer = zone.open_record()?;
//! let flag = zone.open_flag_zone();
//! zone.close_flag_zone("Flags");
//! let value = zone.stream_mut().read_u16();
//! let inner = zone.open_record()?;
//! let compressed = zone.stream_mut().read_compressed_unsigned();
//! zone.close_record(inner, "B")?;
//! zone.close_record(outer, "A")?;
//!
//! assert_eq!((flag, value, compressed), (0x01, 0x1234, Some(5)));
//! assert_eq!(zone.stream().tell(), 20);
//! # Ok(())
//! # }
//! ```

pub mod options;
pub mod record;
pub mod sfx;
pub mod sizes;
pub mod strings;

pub use options::ZoneOptions;
pub use record::{RecordFrame, RecordHandle, RecordKind, ScopedRecord};
pub use sfx::{SfxContent, SfxRecord};
pub use sizes::SizeTable;

use crate::common::{DiagnosticKind, Diagnostics, Error, Result};
use crate::consts::{LONG_RECORDS_VERSION, RECORD_HEADER_SIZE, RECORD_SIZE_SENTINEL};
use crate::stream::ByteStream;
use encoding_rs::Encoding;
use smallvec::SmallVec;
use std::io::SeekFrom;
use tracing::trace;
use zerocopy::{FromBytes, LE, U32};

/// Record framing state of one stream.
#[derive(Debug)]
pub struct RecordZone {
    stream: ByteStream,
    options: ZoneOptions,
    frames: SmallVec<[RecordFrame; 8]>,
    size_table: SizeTable,
    string_pool: Vec<String>,
    diagnostics: Diagnostics,
}

impl RecordZone {
    /// Create a zone with default options.
    pub fn new(stream: ByteStream) -> Self {
        Self::with_options(stream, ZoneOptions::default())
    }

    /// Create a zone.
    ///
    /// The stream is switched to little-endian unless the options ask for
    /// another order, or for none with
    /// [`with_stream_byte_order`](ZoneOptions::with_stream_byte_order), in
    /// which case a sub-stream keeps the order inherited from its parent.
    pub fn with_options(mut stream: ByteStream, options: ZoneOptions) -> Self {
        if let Some(inverted) = options.read_inverted {
            stream.set_read_inverted(inverted);
        }
        let diagnostics = Diagnostics::new().with_verbose(options.verbose);
        Self {
            stream,
            options,
            frames: SmallVec::new(),
            size_table: SizeTable::default(),
            string_pool: Vec::new(),
            diagnostics,
        }
    }

    // Accessors

    #[inline]
    pub fn stream(&self) -> &ByteStream {
        &self.stream
    }

    #[inline]
    pub fn stream_mut(&mut self) -> &mut ByteStream {
        &mut self.stream
    }

    /// Give the stream back, dropping the zone state.
    pub fn into_stream(self) -> ByteStream {
        self.stream
    }

    #[inline]
    pub fn options(&self) -> &ZoneOptions {
        &self.options
    }

    /// Name used in diagnostics.
    #[inline]
    pub fn name(&self) -> &str {
        &self.options.name
    }

    /// Declared container version.
    #[inline]
    pub fn version(&self) -> u16 {
        self.options.version
    }

    /// Change the container version, usually once the document header is read.
    #[inline]
    pub fn set_version(&mut self, version: u16) {
        self.options.version = version;
    }

    /// Encoding of strings without a charset of their own.
    #[inline]
    pub fn encoding(&self) -> &'static Encoding {
        self.options.encoding
    }

    #[inline]
    pub fn set_encoding(&mut self, encoding: &'static Encoding) {
        self.options.encoding = encoding;
    }

    #[inline]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    #[inline]
    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    /// Replace the diagnostics sink, for instance to share counts between
    /// the zones of one document.
    pub fn set_diagnostics(&mut self, diagnostics: Diagnostics) {
        self.diagnostics = diagnostics;
    }

    /// Take the diagnostics collected so far, leaving an empty sink.
    pub fn take_diagnostics(&mut self) -> Diagnostics {
        let fresh = Diagnostics::new().with_verbose(self.options.verbose);
        std::mem::replace(&mut self.diagnostics, fresh)
    }

    pub(crate) fn report(&mut self, kind: DiagnosticKind, offset: u64, detail: impl std::fmt::Display) {
        self.diagnostics.report(kind, &self.options.name, offset, detail);
    }

    pub(crate) fn note(&mut self, kind: DiagnosticKind, offset: u64, detail: impl std::fmt::Display) {
        self.diagnostics.note(kind, &self.options.name, offset, detail);
    }

    // Frame stack

    /// Number of open frames.
    #[inline]
    pub fn record_level(&self) -> usize {
        self.frames.len()
    }

    /// Open frames, innermost last.
    #[inline]
    pub fn frames(&self) -> &[RecordFrame] {
        &self.frames
    }

    /// End of the innermost frame with a known end.
    pub fn record_end(&self) -> Option<u64> {
        self.frames.iter().rev().find_map(|frame| frame.end)
    }

    /// End of the readable range: the innermost known frame end, else the
    /// stream size.
    pub fn limit(&self) -> u64 {
        self.record_end().unwrap_or_else(|| self.stream.size())
    }

    /// Push a frame after checking it against the stream and its parent.
    ///
    /// On failure the cursor goes back to `start`.
    pub(crate) fn push_frame(
        &mut self,
        kind: RecordKind,
        tag: u8,
        start: u64,
        end: Option<u64>,
    ) -> Result<RecordHandle> {
        if let Some(end) = end {
            let limit = self.limit();
            if end > limit {
                self.stream.seek(SeekFrom::Start(start));
                return Err(Error::RecordOutOfBounds {
                    offset: start,
                    end,
                    limit,
                });
            }
        }
        let handle = RecordHandle {
            depth: self.frames.len(),
            kind,
            tag,
            start,
        };
        self.frames.push(RecordFrame {
            kind,
            tag,
            start,
            end,
        });
        trace!(zone = %self.options.name, ?kind, tag, start, ?end, "open frame");
        Ok(handle)
    }

    /// Drop frames down to `depth` without reseeking or reporting.
    pub(crate) fn truncate_frames(&mut self, depth: usize) {
        self.frames.truncate(depth);
    }

    /// Read a record header and push its frame.
    ///
    /// The 4-byte header is little-endian whatever the stream byte order:
    /// the low byte is the tag and the high 24 bits the record length,
    /// header included. The length `0xFFFFFF` in containers of version
    /// 0x0209 or later defers to the record size directory; a record
    /// missing from the directory is opened without a known end.
    ///
    /// Fails, with the cursor back on the header, for a zero tag, a length
    /// shorter than the header or a record ending outside the stream or
    /// outside its enclosing frame.
    pub fn open_record(&mut self) -> Result<RecordHandle> {
        let start = self.stream.tell();
        let header = self.stream.read_block(RECORD_HEADER_SIZE)?;
        let word = U32::<LE>::read_from_bytes(&header).map_or(0, |v| v.get());
        let tag = (word & 0xFF) as u8;
        let length = word >> 8;

        if tag == 0 {
            self.stream.seek(SeekFrom::Start(start));
            return Err(Error::InvalidRecord {
                offset: start,
                reason: "zero record tag".to_string(),
            });
        }

        let end = if length == RECORD_SIZE_SENTINEL && self.options.version >= LONG_RECORDS_VERSION {
            let end = self.size_table.end_of(start);
            if end.is_none() {
                self.report(
                    DiagnosticKind::UnknownRecordSize,
                    start,
                    format_args!("record '{}' is not in the size directory", tag as char),
                );
            }
            end
        } else {
            Some(start + length as u64)
        };

        if let Some(end) = end
            && end < start + RECORD_HEADER_SIZE
        {
            self.stream.seek(SeekFrom::Start(start));
            return Err(Error::InvalidRecord {
                offset: start,
                reason: format!("record '{}' is shorter than its header", tag as char),
            });
        }

        self.push_frame(RecordKind::Star, tag, start, end)
    }

    /// Open a record only if its tag is `tag`; nothing is consumed otherwise.
    pub fn open_record_with_tag(&mut self, tag: u8) -> Result<RecordHandle> {
        let start = self.stream.tell();
        match self.stream.peek() {
            Some(found) if found == tag => self.open_record(),
            found => Err(Error::InvalidRecord {
                offset: start,
                reason: format!(
                    "expected record '{}', found 0x{:02X}",
                    tag as char,
                    found.unwrap_or(0)
                ),
            }),
        }
    }

    /// Open a record wrapped in a guard which closes it on drop.
    pub fn scoped_record(&mut self, name: &'static str) -> Result<ScopedRecord<'_>> {
        let handle = self.open_record()?;
        Ok(ScopedRecord::new(self, handle, name))
    }

    /// Close the frame behind `handle`, whatever its kind, and seek to its end.
    ///
    /// Frames opened after it and still open are closed first and reported.
    /// A cursor short of or past the end is reported; differences within the
    /// configured tolerance only at `debug` level. Frames with an unknown
    /// end leave the cursor where it is.
    pub fn close_record(&mut self, handle: RecordHandle, name: &str) -> Result<()> {
        let found = self
            .frames
            .get(handle.depth)
            .is_some_and(|frame| handle.matches(frame));
        if !found {
            self.report(
                DiagnosticKind::UnbalancedClose,
                self.stream.tell(),
                format_args!("{name}: record '{}' is not open", handle.tag as char),
            );
            return Err(Error::NoOpenRecord);
        }
        self.close_frames_to(handle.depth, name);
        Ok(())
    }

    /// Pop every frame from the top down to `depth` inclusive.
    fn close_frames_to(&mut self, depth: usize, name: &str) {
        while self.frames.len() > depth + 1 {
            if let Some(inner) = self.frames.pop() {
                self.report(
                    DiagnosticKind::UnclosedRecord,
                    inner.start,
                    format_args!("{name}: inner {:?} frame still open", inner.kind),
                );
            }
        }
        if let Some(frame) = self.frames.pop() {
            self.resync(frame, name);
        }
    }

    fn resync(&mut self, frame: RecordFrame, name: &str) {
        let Some(end) = frame.end else {
            trace!(zone = %self.options.name, name, start = frame.start, "close unbounded frame");
            return;
        };
        let pos = self.stream.tell();
        if pos != end {
            let flag_zone = frame.kind == RecordKind::FlagZone;
            let (kind, delta) = match (pos < end, flag_zone) {
                (true, false) => (DiagnosticKind::UnparsedRecordData, end - pos),
                (true, true) => (DiagnosticKind::FlagZoneUnderread, end - pos),
                (false, false) => (DiagnosticKind::RecordOverread, pos - end),
                (false, true) => (DiagnosticKind::FlagZoneOverread, pos - end),
            };
            let detail = format!(
                "{name}: frame at {} ends at {end}, cursor at {pos}",
                frame.start
            );
            if delta <= self.options.resync_tolerance {
                self.diagnostics.note(kind, &self.options.name, pos, detail);
            } else {
                self.diagnostics.report(kind, &self.options.name, pos, detail);
            }
        }
        self.stream.seek(SeekFrom::Start(end));
    }

    // Flag zones

    /// Read a flag byte and open a zone of its low-nibble byte count.
    ///
    /// The high nibble is left to the caller. A zone running past its
    /// enclosing frame is clamped to it.
    pub fn open_flag_zone(&mut self) -> u8 {
        let (_, flag) = self.open_flag_zone_handle();
        flag
    }

    /// Like [`open_flag_zone`](Self::open_flag_zone), also returning the
    /// handle for [`close_record`](Self::close_record) or a guard.
    pub fn open_flag_zone_handle(&mut self) -> (RecordHandle, u8) {
        let start = self.stream.tell();
        let flag = self.stream.read_u8();
        let mut end = self.stream.tell() + (flag & 0x0F) as u64;
        let limit = self.limit();
        if end > limit {
            self.report(
                DiagnosticKind::FlagZoneOverflow,
                start,
                format_args!("flag zone ends at {end}, beyond {limit}"),
            );
            end = limit;
        }
        let handle = RecordHandle {
            depth: self.frames.len(),
            kind: RecordKind::FlagZone,
            tag: flag,
            start,
        };
        self.frames.push(RecordFrame {
            kind: RecordKind::FlagZone,
            tag: flag,
            start,
            end: Some(end),
        });
        (handle, flag)
    }

    /// Open a flag zone wrapped in a guard which closes it on drop.
    pub fn scoped_flag_zone(&mut self, name: &'static str) -> (ScopedRecord<'_>, u8) {
        let (handle, flag) = self.open_flag_zone_handle();
        (ScopedRecord::new(self, handle, name), flag)
    }

    /// Close the innermost flag zone and seek to its end.
    pub fn close_flag_zone(&mut self, name: &str) {
        let depth = self
            .frames
            .iter()
            .rposition(|frame| frame.kind == RecordKind::FlagZone);
        match depth {
            Some(depth) => self.close_frames_to(depth, name),
            None => self.report(
                DiagnosticKind::NoOpenFlagZone,
                self.stream.tell(),
                format_args!("{name}: no flag zone is open"),
            ),
        }
    }

    // Other framings

    /// Open a version-compatibility header: u16 version then u32 length of
    /// the data after the 6-byte header.
    pub fn open_version_compat(&mut self) -> Result<(RecordHandle, u16)> {
        let start = self.stream.tell();
        if self.stream.remaining() < 6 {
            return Err(Error::UnexpectedEof {
                offset: start,
                needed: 6,
            });
        }
        let version = self.stream.read_u16();
        let length = self.stream.read_u32() as u64;
        let handle = self.push_frame(RecordKind::VersionCompat, 0, start, Some(start + 6 + length))?;
        Ok((handle, version))
    }

    /// Open a spreadsheet record: u32 length of the data after the header.
    pub fn open_sc_record(&mut self) -> Result<RecordHandle> {
        let start = self.stream.tell();
        if self.stream.remaining() < 4 {
            return Err(Error::UnexpectedEof {
                offset: start,
                needed: 4,
            });
        }
        let length = self.stream.read_u32() as u64;
        self.push_frame(RecordKind::Sc, 0, start, Some(start + 4 + length))
    }

    /// End the session. Frames still open are reported and dropped.
    ///
    /// Returns `true` when the stack was balanced.
    pub fn finish(&mut self) -> bool {
        if self.frames.is_empty() {
            return true;
        }
        let open = self.frames.len();
        let offset = self.frames[0].start;
        self.report(
            DiagnosticKind::UnbalancedRecords,
            offset,
            format_args!("{open} frames still open"),
        );
        self.frames.clear();
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;

    fn zone_for(data: Vec<u8>) -> RecordZone {
        RecordZone::new(ByteStream::new(data))
    }

    #[test]
    fn test_nested_records() {
        let data = Fixture::new()
            .record(
                b'A',
                Fixture::new()
                    .u8(0x01) // flag byte, one trailing byte
                    .u8(0xAA)
                    .u16(0x1234)
                    .record(b'B', Fixture::new().u8(0x05).u8(0x00))
                    .bytes(&[0; 6]),
            )
            .build();
        assert_eq!(data.len(), 20);

        let mut zone = zone_for(data);
        let outer = zone.open_record().unwrap();
        assert_eq!(zone.record_level(), 1);
        assert_eq!(zone.stream().tell(), 4);
        assert_eq!(zone.record_end(), Some(20));

        assert_eq!(zone.open_flag_zone(), 0x01);
        zone.close_flag_zone("Flags");
        assert_eq!(zone.stream().tell(), 6);
        assert_eq!(zone.stream_mut().read_u16(), 0x1234);

        let inner = zone.open_record().unwrap();
        assert_eq!(inner.tag(), b'B');
        assert_eq!(zone.record_end(), Some(14));
        assert_eq!(zone.stream_mut().read_compressed_unsigned(), Some(5));
        zone.close_record(inner, "B").unwrap();
        assert_eq!(zone.stream().tell(), 14);

        zone.close_record(outer, "A").unwrap();
        assert_eq!(zone.stream().tell(), 20);
        assert_eq!(zone.record_level(), 0);
        assert!(zone.finish());
        // the unread byte of 'B' and the padding of 'A'
        assert_eq!(zone.diagnostics().count(DiagnosticKind::UnparsedRecordData), 2);
    }

    #[test]
    fn test_close_resyncs_to_end() {
        let data = Fixture::new()
            .record(b'X', Fixture::new().bytes(&[0; 12]))
            .u8(0x7E)
            .build();

        // nothing read
        let mut zone = zone_for(data.clone());
        let handle = zone.open_record().unwrap();
        zone.close_record(handle, "X").unwrap();
        assert_eq!(zone.stream().tell(), 16);

        // read too much
        let mut zone = zone_for(data);
        let handle = zone.open_record().unwrap();
        zone.stream_mut().seek(SeekFrom::Start(17));
        zone.close_record(handle, "X").unwrap();
        assert_eq!(zone.stream().tell(), 16);
        assert_eq!(zone.stream_mut().read_u8(), 0x7E);
        assert_eq!(zone.diagnostics().count(DiagnosticKind::RecordOverread), 1);
    }

    #[test]
    fn test_child_beyond_parent_fails() {
        // 'A' declares 8 bytes but its child declares 12
        let data = vec![b'A', 8, 0, 0, b'B', 12, 0, 0, 0, 0, 0, 0];
        let mut zone = zone_for(data);
        let outer = zone.open_record().unwrap();
        let err = zone.open_record().unwrap_err();
        assert!(matches!(
            err,
            Error::RecordOutOfBounds {
                offset: 4,
                end: 16,
                limit: 8
            }
        ));
        assert_eq!(zone.stream().tell(), 4);
        assert_eq!(zone.record_level(), 1);
        zone.close_record(outer, "A").unwrap();
    }

    #[test]
    fn test_invalid_headers() {
        let mut zone = zone_for(vec![0, 8, 0, 0, 0, 0, 0, 0]);
        assert!(matches!(zone.open_record(), Err(Error::InvalidRecord { offset: 0, .. })));
        assert_eq!(zone.stream().tell(), 0);

        let mut zone = zone_for(vec![b'A', 2, 0, 0]);
        assert!(matches!(zone.open_record(), Err(Error::InvalidRecord { .. })));

        let mut zone = zone_for(vec![b'A', 200, 0, 0]);
        assert!(matches!(zone.open_record(), Err(Error::RecordOutOfBounds { .. })));
        assert_eq!(zone.stream().tell(), 0);

        let mut zone = zone_for(vec![b'A', 4]);
        assert!(matches!(zone.open_record(), Err(Error::UnexpectedEof { .. })));
    }

    #[test]
    fn test_open_record_with_tag() {
        let mut zone = zone_for(vec![b'!', 4, 0, 0]);
        assert!(zone.open_record_with_tag(b'%').is_err());
        assert_eq!(zone.stream().tell(), 0);
        let handle = zone.open_record_with_tag(b'!').unwrap();
        zone.close_record(handle, "Pool").unwrap();
    }

    #[test]
    fn test_forgotten_inner_close() {
        let data = Fixture::new()
            .record(b'A', Fixture::new().record(b'B', Fixture::new().u32(0)))
            .build();
        let mut zone = zone_for(data);
        let outer = zone.open_record().unwrap();
        let inner = zone.open_record().unwrap();
        zone.close_record(outer, "A").unwrap();
        assert_eq!(zone.record_level(), 0);
        assert_eq!(zone.stream().tell(), 12);
        assert_eq!(zone.diagnostics().count(DiagnosticKind::UnclosedRecord), 1);

        // the inner handle is now stale
        assert!(matches!(zone.close_record(inner, "B"), Err(Error::NoOpenRecord)));
        assert_eq!(zone.diagnostics().count(DiagnosticKind::UnbalancedClose), 1);
    }

    #[test]
    fn test_deferred_size() {
        let data = vec![b'A', 0xFF, 0xFF, 0xFF, 1, 2, 3, 4, 5, 6];
        let options = ZoneOptions::new().with_version(LONG_RECORDS_VERSION);

        let mut zone = RecordZone::with_options(ByteStream::new(data.clone()), options.clone());
        zone.size_table.insert(0, 8);
        let handle = zone.open_record().unwrap();
        assert_eq!(zone.record_end(), Some(8));
        zone.close_record(handle, "A").unwrap();
        assert_eq!(zone.stream().tell(), 8);

        // missing from the directory: unbounded, no reseek on close
        let mut zone = RecordZone::with_options(ByteStream::new(data), options);
        let handle = zone.open_record().unwrap();
        assert_eq!(zone.record_end(), None);
        assert_eq!(zone.stream_mut().read_u8(), 1);
        zone.close_record(handle, "A").unwrap();
        assert_eq!(zone.stream().tell(), 5);
        assert_eq!(zone.diagnostics().count(DiagnosticKind::UnknownRecordSize), 1);
    }

    #[test]
    fn test_sentinel_without_deferred_sizes() {
        let mut zone = zone_for(vec![b'A', 0xFF, 0xFF, 0xFF, 0, 0]);
        assert!(matches!(zone.open_record(), Err(Error::RecordOutOfBounds { .. })));
    }

    #[test]
    fn test_flag_zone_resync() {
        let mut zone = zone_for(vec![0x13, 1, 2, 3, 9]);
        let flag = zone.open_flag_zone();
        assert_eq!(flag >> 4, 1);
        assert_eq!(zone.record_end(), Some(4));
        zone.close_flag_zone("Flags");
        assert_eq!(zone.stream().tell(), 4);
        assert_eq!(zone.diagnostics().count(DiagnosticKind::FlagZoneUnderread), 1);

        zone.close_flag_zone("Flags");
        assert_eq!(zone.diagnostics().count(DiagnosticKind::NoOpenFlagZone), 1);
    }

    #[test]
    fn test_flag_zone_overflow_is_clamped() {
        // record of 6 bytes holding a flag zone announcing 15 bytes
        let data = vec![b'A', 6, 0, 0, 0x0F, 0, 0, 0, 0, 0];
        let mut zone = zone_for(data);
        let handle = zone.open_record().unwrap();
        zone.open_flag_zone();
        assert_eq!(zone.record_end(), Some(6));
        zone.close_flag_zone("Flags");
        zone.close_record(handle, "A").unwrap();
        assert_eq!(zone.stream().tell(), 6);
        assert_eq!(zone.diagnostics().count(DiagnosticKind::FlagZoneOverflow), 1);
    }

    #[test]
    fn test_scoped_guards() {
        let data = Fixture::new()
            .record(b'A', Fixture::new().u8(0x02).u16(7).u32(0))
            .build();
        let mut zone = zone_for(data);

        fn body(zone: &mut RecordZone) -> Result<u16> {
            let mut record = zone.scoped_record("A")?;
            let (mut flags, _) = record.scoped_flag_zone("Flags");
            let value = flags.stream_mut().read_u16();
            if value == 7 {
                // early exit with both frames open
                return Err(Error::NoOpenRecord);
            }
            Ok(value)
        }

        assert!(body(&mut zone).is_err());
        assert_eq!(zone.record_level(), 0);
        assert_eq!(zone.stream().tell(), 11);
    }

    #[test]
    fn test_version_compat_and_sc() {
        let data = vec![
            0x01, 0x00, 0x02, 0x00, 0x00, 0x00, 0xAA, 0xBB, // compat header, 2 bytes
            0x03, 0x00, 0x00, 0x00, 1, 2, 3, // sc record, 3 bytes
        ];
        let mut zone = zone_for(data);
        let (handle, version) = zone.open_version_compat().unwrap();
        assert_eq!(version, 1);
        zone.close_record(handle, "Compat").unwrap();
        assert_eq!(zone.stream().tell(), 8);

        let handle = zone.open_sc_record().unwrap();
        assert_eq!(zone.record_end(), Some(15));
        zone.close_record(handle, "Sc").unwrap();
        assert!(zone.stream().is_end());
    }

    #[test]
    fn test_finish_reports_open_frames() {
        let mut zone = zone_for(vec![b'A', 4, 0, 0]);
        let _handle = zone.open_record().unwrap();
        assert!(!zone.finish());
        assert_eq!(zone.record_level(), 0);
        let diagnostics = zone.take_diagnostics();
        assert_eq!(diagnostics.count(DiagnosticKind::UnbalancedRecords), 1);
        assert!(zone.diagnostics().is_clean());
    }

    #[test]
    fn test_small_mismatch_is_counted() {
        let options = ZoneOptions::new().with_resync_tolerance(0);
        let mut zone = RecordZone::with_options(ByteStream::new(vec![b'A', 6, 0, 0, 0, 0]), options);
        let handle = zone.open_record().unwrap();
        zone.close_record(handle, "A").unwrap();
        assert_eq!(zone.diagnostics().count(DiagnosticKind::UnparsedRecordData), 1);
    }

    #[test]
    fn test_stream_byte_order_is_kept() {
        let data = vec![0x12, 0x34];

        let mut zone = zone_for(data.clone());
        assert_eq!(zone.stream_mut().read_u16(), 0x3412);

        let options = ZoneOptions::new().with_stream_byte_order();
        let mut zone = RecordZone::with_options(ByteStream::new(data), options);
        assert!(!zone.stream().read_inverted());
        assert_eq!(zone.stream_mut().read_u16(), 0x1234);
    }

    #[test]
    fn test_inherited_byte_order_survives_wrapping() {
        let storage = crate::stream::MemoryStorage::new().with_stream("Doc", vec![0x00, 0x2A]);
        let root = ByteStream::structured(Vec::<u8>::new(), storage);
        let stream = root.sub_stream_by_name("Doc").unwrap();

        let options = ZoneOptions::new().with_stream_byte_order();
        let mut zone = RecordZone::with_options(stream, options);
        assert_eq!(zone.stream_mut().read_u16(), 0x2A);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(256))]

            /// Closing a record lands on its end whatever the body reader consumed.
            #[test]
            fn prop_close_lands_on_record_end(
                tag in 1u8..=255,
                len in 0usize..64,
                consumed in 0usize..72,
            ) {
                let data = Fixture::new()
                    .record(tag, Fixture::new().bytes(&vec![0; len]))
                    .u8(0x5A)
                    .build();
                let mut zone = zone_for(data);

                let handle = zone.open_record().unwrap();
                prop_assert_eq!(handle.tag(), tag);
                prop_assert_eq!(zone.record_level(), 1);
                prop_assert_eq!(zone.stream().tell(), 4);

                zone.stream_mut().seek(SeekFrom::Start(4 + consumed as u64));
                zone.close_record(handle, "Body").unwrap();
                prop_assert_eq!(zone.record_level(), 0);
                prop_assert_eq!(zone.stream().tell(), 4 + len as u64);
                prop_assert_eq!(zone.stream_mut().read_u8(), 0x5A);
            }
        }
    }
}
