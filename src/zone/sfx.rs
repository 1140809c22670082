//! SFX record family.
//!
//! Every SFX record starts with a 4-byte mini header (pre-tag byte and a
//! 24-bit length excluding the header). Extended records use the pre-tag
//! 0x00 and continue with a record type, a version and a 16-bit tag; multi
//! records then give a content count and either the size of each content
//! or the offset of a content table.
//!
//! ```text
//! mini header     | u32: pre-tag | length << 8
//! extended header | u8 type | u8 version | u16 tag
//! multi header    | u16 count | u32 content size or table offset
//! body            | contents ...
//! content table   | count x u32: version | offset << 8
//! ```
//!
//! Content offsets count from the start of the body. Unlike star records,
//! any inconsistency here is a hard error: these records carry the
//! attribute pools, whose contents cannot be guessed.

use super::{RecordHandle, RecordKind, RecordZone};
use crate::common::{Error, Result};
use crate::consts::{
    SFX_MINI_HEADER_SIZE, SFX_PRETAG_EXT, SFX_REC_FIXSIZE, SFX_REC_MIXTAGS,
    SFX_REC_MIXTAGS_RELOC, SFX_REC_SINGLE, SFX_REC_VARSIZE, SFX_REC_VARSIZE_RELOC,
};
use std::io::SeekFrom;
use tracing::trace;
use zerocopy::{FromBytes, LE, U32};

/// One content of an SFX record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SfxContent {
    /// First byte of the content data (after the tag for mixed-tag records)
    pub start: u64,
    /// One past the last byte
    pub end: u64,
    pub version: u8,
    /// Content tag for mixed-tag records, the record tag otherwise
    pub tag: u16,
}

/// An open extended SFX record.
#[derive(Debug, Clone)]
pub struct SfxRecord {
    pub handle: RecordHandle,
    pub record_type: u8,
    pub version: u8,
    pub tag: u16,
    pub contents: Vec<SfxContent>,
}

impl SfxRecord {
    /// Whether the record holds several contents.
    #[inline]
    pub fn is_multi(&self) -> bool {
        self.record_type != SFX_REC_SINGLE
    }
}

impl RecordZone {
    /// Open an SFX mini record; returns the handle and the pre-tag.
    pub fn open_sfx_mini_record(&mut self) -> Result<(RecordHandle, u8)> {
        let start = self.stream.tell();
        let header = self.stream.read_block(SFX_MINI_HEADER_SIZE)?;
        let word = U32::<LE>::read_from_bytes(&header).map_or(0, |v| v.get());
        let pretag = (word & 0xFF) as u8;
        let end = start + SFX_MINI_HEADER_SIZE + (word >> 8) as u64;
        let handle = self.push_frame(RecordKind::Sfx, pretag, start, Some(end))?;
        Ok((handle, pretag))
    }

    /// Open an extended SFX record which must carry `expected_tag`.
    ///
    /// The content list is fully resolved; the cursor is left on the data
    /// of the first content.
    pub fn open_sfx_record(&mut self, expected_tag: u16) -> Result<SfxRecord> {
        let start = self.stream.tell();
        let (handle, pretag) = self.open_sfx_mini_record()?;
        match self.read_sfx_header(handle, pretag, expected_tag) {
            Ok(record) => Ok(record),
            Err(err) => {
                self.truncate_frames(handle.depth);
                self.stream.seek(SeekFrom::Start(start));
                Err(err)
            }
        }
    }

    fn read_sfx_header(&mut self, handle: RecordHandle, pretag: u8, expected_tag: u16) -> Result<SfxRecord> {
        let start = handle.start;
        let invalid = |reason: String| Error::InvalidRecord {
            offset: start,
            reason,
        };
        if pretag != SFX_PRETAG_EXT {
            return Err(invalid(format!("SFX pre-tag 0x{pretag:02X} is not extended")));
        }
        let end = self.limit();
        if end < self.stream.tell() + 4 {
            return Err(invalid("SFX record too short for its header".to_string()));
        }
        let record_type = self.stream.read_u8();
        let version = self.stream.read_u8();
        let tag = self.stream.read_u16();
        if tag != expected_tag {
            return Err(invalid(format!(
                "SFX tag 0x{tag:04X}, expected 0x{expected_tag:04X}"
            )));
        }

        let contents = match record_type {
            SFX_REC_SINGLE => vec![SfxContent {
                start: self.stream.tell(),
                end,
                version,
                tag,
            }],
            SFX_REC_FIXSIZE
            | SFX_REC_VARSIZE_RELOC
            | SFX_REC_VARSIZE
            | SFX_REC_MIXTAGS_RELOC
            | SFX_REC_MIXTAGS => self.read_sfx_contents(start, end, record_type, tag)?,
            other => return Err(invalid(format!("unknown SFX record type {other}"))),
        };
        let first = contents
            .first()
            .map_or(self.stream.tell(), |content| content.start);
        self.stream.seek(SeekFrom::Start(first));
        trace!(zone = %self.options.name, tag, record_type, contents = contents.len(), "open SFX record");

        Ok(SfxRecord {
            handle,
            record_type,
            version,
            tag,
            contents,
        })
    }

    fn read_sfx_contents(&mut self, start: u64, end: u64, record_type: u8, tag: u16) -> Result<Vec<SfxContent>> {
        let invalid = |reason: String| Error::InvalidRecord {
            offset: start,
            reason,
        };
        if end < self.stream.tell() + 6 {
            return Err(invalid("SFX multi record too short for its header".to_string()));
        }
        let count = self.stream.read_u16() as u64;
        let field = self.stream.read_u32() as u64;
        let body = self.stream.tell();

        if record_type == SFX_REC_FIXSIZE {
            if body + count * field > end {
                return Err(invalid(format!("{count} contents of {field} bytes overflow the record")));
            }
            return Ok((0..count)
                .map(|i| SfxContent {
                    start: body + i * field,
                    end: body + (i + 1) * field,
                    version: 0,
                    tag,
                })
                .collect());
        }

        let table = match record_type {
            SFX_REC_VARSIZE_RELOC | SFX_REC_MIXTAGS_RELOC => body + field,
            _ => field,
        };
        if table < body || table + 4 * count > end {
            return Err(invalid(format!("content table at {table} lies outside the record")));
        }
        self.stream.seek(SeekFrom::Start(table));
        let entries: Vec<(u8, u64)> = (0..count)
            .map(|_| {
                let entry = self.stream.read_u32();
                ((entry & 0xFF) as u8, body + (entry >> 8) as u64)
            })
            .collect();

        let mixed = matches!(record_type, SFX_REC_MIXTAGS | SFX_REC_MIXTAGS_RELOC);
        let mut contents = Vec::with_capacity(entries.len());
        for (i, &(version, content_start)) in entries.iter().enumerate() {
            let content_end = match entries.get(i + 1) {
                Some(&(_, next)) => next,
                None if table >= content_start => table,
                None => end,
            };
            if content_end < content_start || content_end > end {
                return Err(invalid(format!("content {i} at {content_start} overlaps its neighbours")));
            }
            let mut content = SfxContent {
                start: content_start,
                end: content_end,
                version,
                tag,
            };
            if mixed {
                if content_end < content_start + 2 {
                    return Err(invalid(format!("content {i} has no room for its tag")));
                }
                self.stream.seek(SeekFrom::Start(content_start));
                content.tag = self.stream.read_u16();
                content.start += 2;
            }
            contents.push(content);
        }
        self.stream.seek(SeekFrom::Start(body));
        Ok(contents)
    }

    /// Seek to the data of content `index`.
    pub fn seek_sfx_content(&mut self, record: &SfxRecord, index: usize) -> Option<SfxContent> {
        let content = record.contents.get(index).copied()?;
        self.stream.seek(SeekFrom::Start(content.start));
        Some(content)
    }

    /// Close an SFX record and seek to its end.
    pub fn close_sfx_record(&mut self, record: SfxRecord, name: &str) -> Result<()> {
        self.close_record(record.handle, name)
    }
}
