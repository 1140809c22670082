//! Byte strings and the string pool.
//!
//! Style, font and attribute names are stored once in a `'!'` record and
//! referred to by index afterwards.

use super::RecordZone;
use crate::common::encoding::{charset_to_encoding, decode_bytes};
use crate::common::{DiagnosticKind, Error, Result};
use crate::consts::{NO_POOL_NAME, POOL_ENCODING_VERSION, STRING_POOL_TAG};
use encoding_rs::Encoding;
use tracing::debug;

impl RecordZone {
    /// Read a `u16 length + bytes` string in the zone encoding.
    pub fn read_string(&mut self) -> Result<String> {
        self.read_string_with(self.options.encoding)
    }

    /// Read a `u16 length + bytes` string in the given encoding.
    ///
    /// Fails, without consuming the string, when it runs past the current
    /// frame.
    pub fn read_string_with(&mut self, encoding: &'static Encoding) -> Result<String> {
        let start = self.stream.tell();
        if self.limit().saturating_sub(start) < 2 {
            return Err(Error::UnexpectedEof {
                offset: start,
                needed: 2,
            });
        }
        let length = self.stream.read_u16() as u64;
        if self.limit().saturating_sub(start + 2) < length {
            self.stream.seek(std::io::SeekFrom::Start(start));
            return Err(Error::UnexpectedEof {
                offset: start + 2,
                needed: length,
            });
        }
        let bytes = self.stream.read_block(length)?;
        Ok(decode_bytes(&bytes, encoding))
    }

    /// Read the string pool record.
    ///
    /// From container version 0x0201 the count is preceded by a charset id,
    /// which then also becomes the zone encoding. A truncated pool keeps the
    /// strings read so far. A later pool replaces an earlier one.
    pub fn read_strings_pool(&mut self) -> Result<()> {
        let record = self.open_record_with_tag(STRING_POOL_TAG)?;
        if !self.string_pool.is_empty() {
            self.report(
                DiagnosticKind::StringPoolReread,
                record.start(),
                format_args!("string pool of {} entries replaced", self.string_pool.len()),
            );
            self.string_pool.clear();
        }

        let mut encoding = self.options.encoding;
        if self.options.version >= POOL_ENCODING_VERSION {
            let charset = self.stream.read_u8();
            match charset_to_encoding(charset) {
                Some(found) => {
                    encoding = found;
                    self.options.encoding = found;
                }
                None if charset == 0 => {}
                None => self.note(
                    DiagnosticKind::UnknownCharset,
                    self.stream.tell() - 1,
                    format_args!("charset {charset}, keeping {}", encoding.name()),
                ),
            }
        }

        let count = self.stream.read_u16();
        for i in 0..count {
            match self.read_string_with(encoding) {
                Ok(name) => self.string_pool.push(name),
                Err(_) => {
                    self.report(
                        DiagnosticKind::TruncatedStringPool,
                        self.stream.tell(),
                        format_args!("string pool stops at entry {i} of {count}"),
                    );
                    break;
                }
            }
        }
        debug!(zone = %self.options.name, strings = self.string_pool.len(), "string pool");
        self.close_record(record, "StringsPool")
    }

    /// Strings of the pool, in index order.
    #[inline]
    pub fn string_pool(&self) -> &[String] {
        &self.string_pool
    }

    /// Look a name up in the string pool.
    ///
    /// The reserved index 0xFFF0 is the empty name. Any other index outside
    /// the pool is reported and yields `None`.
    pub fn pool_name(&mut self, id: i32) -> Option<String> {
        if id == NO_POOL_NAME {
            return Some(String::new());
        }
        let found = usize::try_from(id)
            .ok()
            .and_then(|index| self.string_pool.get(index))
            .cloned();
        if found.is_none() {
            self.report(
                DiagnosticKind::BadPoolName,
                self.stream.tell(),
                format_args!("no pool name {id} in {} entries", self.string_pool.len()),
            );
        }
        found
    }
}
