//! Endianness-aware cursor over a stream of a compound file.
//!
//! [`ByteStream`] is the primitive reader everything else is built on. It
//! owns its bytes (a cheap [`Bytes`] handle), a cursor and a byte-order flag
//! which may be toggled at any time: one container can mix Macintosh
//! (big-endian) and PC (little-endian) records.
//!
//! Primitive integer reads never fail. Reading past the end consumes what is
//! left and yields 0, so a truncated field degrades into a default value
//! instead of aborting a whole document. Operations whose result would be
//! meaningless when short ([`read_block`](ByteStream::read_block), opening a
//! sub-stream) return a [`Result`].
//!
//! # Examples
//!
//! ```
//! use starzone::stream::ByteStream;
//!
//! let mut stream = ByteStream::new(vec![0x12, 0x34, 0x12, 0x34]);
//! assert_eq!(stream.read_u16(), 0x1234);
//! stream.set_read_inverted(true);
//! assert_eq!(stream.read_u16(), 0x3412);
//! assert!(stream.is_end());
//! ```

pub mod float;
pub mod storage;

pub use float::LegacyFloat;
pub use storage::{CompoundStorage, MemoryStorage};

use crate::common::{Error, Result};
use bytes::Bytes;
use std::fmt;
use std::io::{Read, SeekFrom};
use std::path::Path;
use zerocopy::{BE, FromBytes, LE, U16, U32};

/// Seekable byte reader with a switchable byte order.
pub struct ByteStream {
    data: Bytes,
    pos: u64,
    /// `false`: big-endian assembly, `true`: little-endian
    inverted: bool,
    storage: Option<Box<dyn CompoundStorage>>,
}

impl fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteStream")
            .field("size", &self.data.len())
            .field("pos", &self.pos)
            .field("inverted", &self.inverted)
            .field("structured", &self.storage.is_some())
            .finish()
    }
}

impl ByteStream {
    /// Create a stream over in-memory bytes. The byte order is big-endian.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
            inverted: false,
            storage: None,
        }
    }

    /// Create a stream holding everything a reader produces.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Ok(Self::new(data))
    }

    /// Load a whole file into a stream.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path)?;
        Ok(Self::new(data))
    }

    /// Create the root stream of a compound file.
    ///
    /// `data` is the raw file content; sub-streams are fetched from
    /// `storage` when asked for.
    pub fn structured(data: impl Into<Bytes>, storage: impl CompoundStorage + 'static) -> Self {
        Self {
            storage: Some(Box::new(storage)),
            ..Self::new(data)
        }
    }

    /// Builder flavour of [`set_read_inverted`](Self::set_read_inverted).
    #[inline]
    pub fn with_read_inverted(mut self, inverted: bool) -> Self {
        self.inverted = inverted;
        self
    }

    // Position

    /// Total size in bytes.
    #[inline]
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Current position.
    #[inline]
    pub fn tell(&self) -> u64 {
        self.pos
    }

    /// Move the cursor. The target is clamped into `[0, size]`; out of range
    /// requests are not an error. Returns the new position.
    pub fn seek(&mut self, target: SeekFrom) -> u64 {
        let size = self.size() as i128;
        let wanted = match target {
            SeekFrom::Start(offset) => offset as i128,
            SeekFrom::Current(delta) => self.pos as i128 + delta as i128,
            SeekFrom::End(delta) => size + delta as i128,
        };
        self.pos = wanted.clamp(0, size) as u64;
        self.pos
    }

    /// Whether the cursor reached the end.
    #[inline]
    pub fn is_end(&self) -> bool {
        self.pos >= self.size()
    }

    /// Bytes left after the cursor.
    #[inline]
    pub fn remaining(&self) -> u64 {
        self.size().saturating_sub(self.pos)
    }

    /// Whether `pos` is a valid position in this stream (the end included).
    #[inline]
    pub fn check_position(&self, pos: u64) -> bool {
        pos <= self.size()
    }

    /// Whether multi-byte values are assembled little-endian.
    #[inline]
    pub fn read_inverted(&self) -> bool {
        self.inverted
    }

    /// Switch the byte order used by the following reads.
    #[inline]
    pub fn set_read_inverted(&mut self, inverted: bool) {
        self.inverted = inverted;
    }

    /// Next byte, without moving the cursor.
    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.data.get(self.pos as usize).copied()
    }

    /// All bytes of the stream.
    #[inline]
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Take `n` bytes as a slice and advance, or run to the end and return
    /// `None` when fewer are left.
    fn take(&mut self, n: usize) -> Option<&[u8]> {
        let start = self.pos as usize;
        let end = start.checked_add(n)?;
        if end > self.data.len() {
            self.pos = self.size();
            return None;
        }
        self.pos = end as u64;
        Some(&self.data[start..end])
    }

    // Integers

    /// Read an `n`-byte unsigned integer, `n` in `0..=4`.
    ///
    /// Bytes are assembled big-endian, or little-endian when the stream is
    /// inverted. Past the end, the remaining bytes are consumed and 0 is
    /// returned. Widths above 4 read nothing.
    pub fn read_unsigned(&mut self, n: usize) -> u32 {
        if n == 0 || n > 4 {
            return 0;
        }
        let inverted = self.inverted;
        let Some(bytes) = self.take(n) else {
            return 0;
        };
        match (n, inverted) {
            (1, _) => bytes[0] as u32,
            (2, false) => U16::<BE>::read_from_bytes(bytes).map_or(0, |v| v.get() as u32),
            (2, true) => U16::<LE>::read_from_bytes(bytes).map_or(0, |v| v.get() as u32),
            (4, false) => U32::<BE>::read_from_bytes(bytes).map_or(0, |v| v.get()),
            (4, true) => U32::<LE>::read_from_bytes(bytes).map_or(0, |v| v.get()),
            (_, false) => bytes.iter().fold(0, |acc, &b| (acc << 8) | b as u32),
            (_, true) => bytes.iter().rev().fold(0, |acc, &b| (acc << 8) | b as u32),
        }
    }

    /// Read an `n`-byte integer and sign-extend it from its width.
    pub fn read_signed(&mut self, n: usize) -> i32 {
        let value = self.read_unsigned(n);
        if n == 0 || n > 4 {
            return 0;
        }
        let shift = 32 - 8 * n as u32;
        ((value << shift) as i32) >> shift
    }

    #[inline]
    pub fn read_u8(&mut self) -> u8 {
        self.read_unsigned(1) as u8
    }

    #[inline]
    pub fn read_u16(&mut self) -> u16 {
        self.read_unsigned(2) as u16
    }

    #[inline]
    pub fn read_u32(&mut self) -> u32 {
        self.read_unsigned(4)
    }

    #[inline]
    pub fn read_i8(&mut self) -> i8 {
        self.read_signed(1) as i8
    }

    #[inline]
    pub fn read_i16(&mut self) -> i16 {
        self.read_signed(2) as i16
    }

    #[inline]
    pub fn read_i32(&mut self) -> i32 {
        self.read_signed(4)
    }

    /// Read a variable-length unsigned integer.
    ///
    /// The number of leading one bits of the first byte gives the number of
    /// continuation bytes (0 to 3); the remaining bits of the first byte are
    /// the most significant part of the value and the continuation bytes
    /// follow big-endian. Four leading ones announce a plain 4-byte read in
    /// the current byte order. Returns `None`, without moving the cursor,
    /// when the prefix is invalid or the value is truncated.
    pub fn read_compressed_unsigned(&mut self) -> Option<u32> {
        let first = self.peek()?;
        match first.leading_ones() {
            0 => {
                self.pos += 1;
                Some(first as u32)
            }
            extra @ 1..=3 => {
                if self.remaining() < 1 + extra as u64 {
                    return None;
                }
                self.pos += 1;
                let mut value = (first & (0x7F >> extra)) as u32;
                for _ in 0..extra {
                    value = (value << 8) | self.read_unsigned(1);
                }
                Some(value)
            }
            4 => {
                if self.remaining() < 5 {
                    return None;
                }
                self.pos += 1;
                Some(self.read_unsigned(4))
            }
            _ => None,
        }
    }

    /// Read a variable-length integer and reinterpret it as two's complement.
    #[inline]
    pub fn read_compressed_signed(&mut self) -> Option<i32> {
        self.read_compressed_unsigned().map(|v| v as i32)
    }

    /// Read exactly `n` raw bytes.
    ///
    /// Fails, leaving the cursor untouched, when fewer bytes are left.
    pub fn read_block(&mut self, n: u64) -> Result<Bytes> {
        if self.remaining() < n {
            return Err(Error::UnexpectedEof {
                offset: self.pos,
                needed: n,
            });
        }
        let start = self.pos as usize;
        let end = start + n as usize;
        self.pos = end as u64;
        Ok(self.data.slice(start..end))
    }

    // Compound storage

    fn storage(&self) -> Result<&dyn CompoundStorage> {
        self.storage
            .as_deref()
            .filter(|storage| storage.is_structured())
            .ok_or(Error::NotStructured)
    }

    /// Whether sub-streams can be opened from this stream.
    pub fn is_structured(&self) -> bool {
        self.storage().is_ok()
    }

    /// Number of sub-streams, 0 when the stream is not structured.
    pub fn sub_stream_count(&self) -> usize {
        self.storage().map_or(0, |storage| storage.sub_stream_count())
    }

    /// Name of a sub-stream.
    pub fn sub_stream_name(&self, id: usize) -> Option<String> {
        self.storage().ok()?.sub_stream_name(id)
    }

    /// Open a sub-stream by name.
    ///
    /// The new stream starts at offset 0 and copies this stream's byte order;
    /// both are independent afterwards.
    pub fn sub_stream_by_name(&self, name: &str) -> Result<ByteStream> {
        let data = self
            .storage()?
            .sub_stream_by_name(name)
            .ok_or_else(|| Error::StreamNotFound(name.to_string()))?;
        Ok(ByteStream::new(data).with_read_inverted(self.inverted))
    }

    /// Open a sub-stream by index.
    pub fn sub_stream_by_id(&self, id: usize) -> Result<ByteStream> {
        let data = self
            .storage()?
            .sub_stream_by_id(id)
            .ok_or_else(|| Error::StreamNotFound(format!("#{id}")))?;
        Ok(ByteStream::new(data).with_read_inverted(self.inverted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seek_clamps() {
        let mut stream = ByteStream::new(vec![0u8; 10]);
        assert_eq!(stream.seek(SeekFrom::Start(4)), 4);
        assert_eq!(stream.seek(SeekFrom::Current(-10)), 0);
        assert_eq!(stream.seek(SeekFrom::Start(100)), 10);
        assert!(stream.is_end());
        assert_eq!(stream.seek(SeekFrom::End(-3)), 7);
        assert_eq!(stream.remaining(), 3);
        assert!(stream.check_position(10));
        assert!(!stream.check_position(11));
    }

    #[test]
    fn test_read_unsigned_byte_order() {
        let data = vec![0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];
        let mut stream = ByteStream::new(data.clone());
        assert_eq!(stream.read_unsigned(3), 0x010203);
        assert_eq!(stream.read_unsigned(4), 0x04050607);

        let mut stream = ByteStream::new(data).with_read_inverted(true);
        assert_eq!(stream.read_unsigned(3), 0x030201);
        assert_eq!(stream.read_unsigned(4), 0x07060504);
    }

    #[test]
    fn test_toggle_mid_stream() {
        let mut stream = ByteStream::new(vec![0x00, 0x01, 0x01, 0x00]);
        assert_eq!(stream.read_u16(), 1);
        stream.set_read_inverted(true);
        assert_eq!(stream.read_u16(), 1);
    }

    #[test]
    fn test_read_signed() {
        let mut stream = ByteStream::new(vec![0xFF, 0xFF, 0xFE, 0x80, 0x00, 0x00, 0x00]);
        assert_eq!(stream.read_i8(), -1);
        assert_eq!(stream.read_i16(), -2);
        assert_eq!(stream.read_i32(), i32::MIN);
        assert_eq!(stream.read_signed(0), 0);
    }

    #[test]
    fn test_read_past_end() {
        let mut stream = ByteStream::new(vec![0x12, 0x34, 0x56]);
        stream.seek(SeekFrom::Start(1));
        assert_eq!(stream.read_u32(), 0);
        assert!(stream.is_end());
        assert_eq!(stream.read_u8(), 0);
        assert_eq!(stream.tell(), 3);
    }

    #[test]
    fn test_compressed_unsigned() {
        let mut stream = ByteStream::new(vec![
            0x05, // 7-bit form
            0x81, 0x01, // 14-bit form
            0xC0, 0x01, 0x02, // 21-bit form
            0xE1, 0x02, 0x03, 0x04, // 28-bit form
            0xF0, 0x12, 0x34, 0x56, 0x78, // plain 32-bit read
        ]);
        assert_eq!(stream.read_compressed_unsigned(), Some(5));
        assert_eq!(stream.read_compressed_unsigned(), Some(0x101));
        assert_eq!(stream.read_compressed_unsigned(), Some(0x000102));
        assert_eq!(stream.read_compressed_unsigned(), Some(0x1020304));
        assert_eq!(stream.read_compressed_unsigned(), Some(0x12345678));
        assert!(stream.is_end());
        assert_eq!(stream.read_compressed_unsigned(), None);
    }

    #[test]
    fn test_compressed_plain_read_follows_byte_order() {
        let mut stream =
            ByteStream::new(vec![0xF0, 0x78, 0x56, 0x34, 0x12]).with_read_inverted(true);
        assert_eq!(stream.read_compressed_unsigned(), Some(0x12345678));
    }

    #[test]
    fn test_compressed_not_decodable() {
        let mut stream = ByteStream::new(vec![0xF8, 0, 0, 0, 0]);
        assert_eq!(stream.read_compressed_unsigned(), None);
        assert_eq!(stream.tell(), 0);

        let mut stream = ByteStream::new(vec![0xC0, 0x01]);
        assert_eq!(stream.read_compressed_unsigned(), None);
        assert_eq!(stream.tell(), 0);
    }

    #[test]
    fn test_compressed_signed() {
        let mut stream = ByteStream::new(vec![0xF0, 0xFF, 0xFF, 0xFF, 0xFE, 0x7F]);
        assert_eq!(stream.read_compressed_signed(), Some(-2));
        assert_eq!(stream.read_compressed_signed(), Some(0x7F));
    }

    #[test]
    fn test_read_block() {
        let mut stream = ByteStream::new(vec![1u8, 2, 3, 4]);
        stream.seek(SeekFrom::Start(1));
        assert!(stream.read_block(2).is_ok_and(|b| b.as_ref() == [2, 3]));
        assert!(matches!(
            stream.read_block(2),
            Err(Error::UnexpectedEof { offset: 3, needed: 2 })
        ));
        assert_eq!(stream.tell(), 3);
    }

    #[test]
    fn test_sub_streams() {
        let storage = MemoryStorage::new()
            .with_stream("StarWriterDocument", vec![0x01, 0x02])
            .with_stream("SfxStyleSheets", vec![0x03]);
        let mut root = ByteStream::structured(Vec::<u8>::new(), storage).with_read_inverted(true);

        assert!(root.is_structured());
        assert_eq!(root.sub_stream_count(), 2);
        assert_eq!(root.sub_stream_name(1).as_deref(), Some("SfxStyleSheets"));

        let mut doc = root.sub_stream_by_name("StarWriterDocument").unwrap();
        assert_eq!(doc.tell(), 0);
        assert!(doc.read_inverted());
        assert_eq!(doc.read_u16(), 0x0201);

        // the child keeps its own byte order
        root.set_read_inverted(false);
        doc.set_read_inverted(false);
        assert!(!root.sub_stream_by_id(1).unwrap().read_inverted());

        assert!(matches!(
            root.sub_stream_by_name("missing"),
            Err(Error::StreamNotFound(_))
        ));
        assert!(matches!(root.sub_stream_by_id(7), Err(Error::StreamNotFound(_))));
    }

    #[test]
    fn test_plain_stream_is_not_structured() {
        let stream = ByteStream::new(vec![0u8; 4]);
        assert!(!stream.is_structured());
        assert_eq!(stream.sub_stream_count(), 0);
        assert!(matches!(
            stream.sub_stream_by_name("any"),
            Err(Error::NotStructured)
        ));
    }

    #[test]
    fn test_from_reader() {
        let stream = ByteStream::from_reader(&[1u8, 2, 3][..]).unwrap();
        assert_eq!(stream.size(), 3);
        assert!(matches!(
            ByteStream::open("/nonexistent/starzone/file.sdw"),
            Err(Error::Io(_))
        ));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(256))]

            /// Non-inverted reads are big-endian, inverted reads little-endian.
            #[test]
            fn prop_read_unsigned_byte_order(
                bytes in prop::collection::vec(any::<u8>(), 4),
                n in prop_oneof![Just(1usize), Just(2usize), Just(4usize)],
            ) {
                let bytes = &bytes[..n];
                let mut be = [0u8; 4];
                be[4 - n..].copy_from_slice(bytes);
                let mut le = [0u8; 4];
                le[..n].copy_from_slice(bytes);

                let mut stream = ByteStream::new(bytes.to_vec());
                prop_assert_eq!(stream.read_unsigned(n), u32::from_be_bytes(be));

                let mut stream = ByteStream::new(bytes.to_vec()).with_read_inverted(true);
                prop_assert_eq!(stream.read_unsigned(n), u32::from_le_bytes(le));
                prop_assert!(stream.is_end());
            }

            /// Seeking never leaves the stream bounds.
            #[test]
            fn prop_seek_stays_in_bounds(len in 0usize..64, offset in any::<i64>()) {
                let mut stream = ByteStream::new(vec![0u8; len]);
                let pos = stream.seek(SeekFrom::Current(offset));
                prop_assert!(pos <= len as u64);
                prop_assert_eq!(pos, stream.tell());
            }
        }
    }
}
