//! Record size directory.
//!
//! Containers from version 0x0209 on are written forward-only: a record
//! whose size is not known when its header is written gets the length
//! `0xFFFFFF`, and the real extents are collected in a `'%'` record the
//! document header points at.

use super::RecordZone;
use crate::common::{Error, Result};
use crate::consts::RECORD_SIZES_TAG;
use std::collections::HashMap;
use std::io::SeekFrom;
use tracing::debug;

/// Map from record start offsets to record end offsets.
#[derive(Debug, Clone, Default)]
pub struct SizeTable {
    ends: HashMap<u64, u64>,
}

impl SizeTable {
    /// Record that the record starting at `start` is `length` bytes long.
    pub fn insert(&mut self, start: u64, length: u64) {
        self.ends.insert(start, start + length);
    }

    /// End offset of the record starting at `start`.
    #[inline]
    pub fn end_of(&self, start: u64) -> Option<u64> {
        self.ends.get(&start).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ends.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ends.is_empty()
    }
}

impl RecordZone {
    /// The record size directory read so far.
    #[inline]
    pub fn size_table(&self) -> &SizeTable {
        &self.size_table
    }

    /// Read the record size directory stored at `offset`.
    ///
    /// Layout: a `'%'` record holding a flag zone with the u32 entry count,
    /// then `count` pairs of u32 start offset and u32 length. The cursor is
    /// restored whatever the outcome; a count that does not fit in the
    /// record is an error.
    pub fn read_record_sizes(&mut self, offset: u64) -> Result<()> {
        let saved = self.stream.tell();
        let depth = self.record_level();
        let result = self.read_record_sizes_at(offset);
        if result.is_err() {
            self.truncate_frames(depth);
        }
        self.stream.seek(SeekFrom::Start(saved));
        result
    }

    fn read_record_sizes_at(&mut self, offset: u64) -> Result<()> {
        if !self.stream.check_position(offset) {
            return Err(Error::InvalidSizeTable(format!(
                "directory offset {offset} is outside the stream"
            )));
        }
        self.stream.seek(SeekFrom::Start(offset));
        let record = self.open_record_with_tag(RECORD_SIZES_TAG)?;

        let (flags, _) = self.open_flag_zone_handle();
        let count = self.stream.read_u32() as u64;
        self.close_record(flags, "RecordSizes")?;

        let available = self.limit().saturating_sub(self.stream.tell());
        if count.saturating_mul(8) > available {
            return Err(Error::InvalidSizeTable(format!(
                "{count} entries do not fit in {available} bytes"
            )));
        }
        for _ in 0..count {
            let start = self.stream.read_u32() as u64;
            let length = self.stream.read_u32() as u64;
            self.size_table.insert(start, length);
        }
        debug!(zone = %self.options.name, entries = count, "record size directory");
        self.close_record(record, "RecordSizes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::DiagnosticKind;
    use crate::consts::LONG_RECORDS_VERSION;
    use crate::stream::ByteStream;
    use crate::testing::Fixture;
    use crate::zone::ZoneOptions;

    #[test]
    fn test_read_record_sizes() {
        // a deferred-size record at 0, the directory at 10
        let data = Fixture::new()
            .bytes(&[b'D', 0xFF, 0xFF, 0xFF])
            .bytes(&[1, 2, 3, 4, 5, 6])
            .record(
                b'%',
                Fixture::new()
                    .u8(0x04) // flag zone holding the count
                    .u32(1)
                    .u32(0) // start
                    .u32(10), // length
            )
            .build();
        let options = ZoneOptions::new().with_version(LONG_RECORDS_VERSION);
        let mut zone = RecordZone::with_options(ByteStream::new(data), options);

        zone.read_record_sizes(10).unwrap();
        assert_eq!(zone.stream().tell(), 0);
        assert_eq!(zone.size_table().end_of(0), Some(10));
        assert_eq!(zone.record_level(), 0);

        let handle = zone.open_record().unwrap();
        assert_eq!(zone.record_end(), Some(10));
        zone.close_record(handle, "D").unwrap();
        assert_eq!(zone.stream().tell(), 10);
        assert_eq!(zone.diagnostics().count(DiagnosticKind::UnknownRecordSize), 0);
    }

    #[test]
    fn test_record_sizes_count_overflow() {
        let data = Fixture::new()
            .u16(0xABCD)
            .record(b'%', Fixture::new().u8(0x04).u32(5).u32(0).u32(10))
            .build();
        let mut zone = RecordZone::new(ByteStream::new(data));
        zone.stream_mut().seek(SeekFrom::Start(1));

        assert!(matches!(zone.read_record_sizes(2), Err(Error::InvalidSizeTable(_))));
        assert_eq!(zone.stream().tell(), 1);
        assert_eq!(zone.record_level(), 0);
        assert!(zone.size_table().is_empty());
    }

    #[test]
    fn test_record_sizes_wrong_tag() {
        let mut zone = RecordZone::new(ByteStream::new(vec![b'!', 4, 0, 0]));
        assert!(zone.read_record_sizes(0).is_err());
        assert!(zone.read_record_sizes(100).is_err());
        assert_eq!(zone.stream().tell(), 0);
    }
}
