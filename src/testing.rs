//! Byte layout builder for unit tests.
//!
//! Multi-byte values are written little-endian, the byte order zones use by
//! default.

use crate::consts::{
    SFX_PRETAG_EXT, SFX_REC_FIXSIZE, SFX_REC_MIXTAGS, SFX_REC_MIXTAGS_RELOC,
    SFX_REC_VARSIZE, SFX_REC_VARSIZE_RELOC,
};

#[derive(Debug, Clone, Default)]
pub(crate) struct Fixture {
    data: Vec<u8>,
}

/// One content of a multi SFX record.
#[derive(Debug, Clone)]
pub(crate) struct FixtureContent {
    version: u8,
    tag: Option<u16>,
    body: Fixture,
}

impl FixtureContent {
    pub(crate) fn new(version: u8, body: Fixture) -> Self {
        Self {
            version,
            tag: None,
            body,
        }
    }

    /// Content of a mixed-tag record.
    pub(crate) fn tagged(tag: u16, version: u8, body: Fixture) -> Self {
        Self {
            version,
            tag: Some(tag),
            body,
        }
    }
}

impl Fixture {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.data.len()
    }

    pub(crate) fn build(self) -> Vec<u8> {
        self.data
    }

    pub(crate) fn u8(mut self, value: u8) -> Self {
        self.data.push(value);
        self
    }

    pub(crate) fn u16(mut self, value: u16) -> Self {
        self.data.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub(crate) fn u32(mut self, value: u32) -> Self {
        self.data.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub(crate) fn bytes(mut self, bytes: &[u8]) -> Self {
        self.data.extend_from_slice(bytes);
        self
    }

    /// `u16 length + bytes` string.
    pub(crate) fn string(self, bytes: &[u8]) -> Self {
        self.u16(bytes.len() as u16).bytes(bytes)
    }

    /// Star record; the length includes the header.
    pub(crate) fn record(self, tag: u8, body: Fixture) -> Self {
        let length = (body.len() + 4) as u32;
        self.u32(tag as u32 | (length << 8)).bytes(&body.data)
    }

    /// SFX mini record; the length excludes the header.
    pub(crate) fn sfx_mini(self, pretag: u8, body: Fixture) -> Self {
        let length = body.len() as u32;
        self.u32(pretag as u32 | (length << 8)).bytes(&body.data)
    }

    /// Extended single-content SFX record.
    pub(crate) fn sfx_single(self, tag: u16, version: u8, body: Fixture) -> Self {
        let ext = Fixture::new().u8(0x01).u8(version).u16(tag).bytes(&body.data);
        self.sfx_mini(SFX_PRETAG_EXT, ext)
    }

    /// Extended multi SFX record.
    ///
    /// Absolute table offsets assume the record is written at the current
    /// position of the final buffer, so only use those types at top level.
    pub(crate) fn sfx_multi(
        self,
        record_type: u8,
        version: u8,
        tag: u16,
        contents: Vec<FixtureContent>,
    ) -> Self {
        let count = contents.len() as u16;
        let mixed = matches!(record_type, SFX_REC_MIXTAGS | SFX_REC_MIXTAGS_RELOC);

        let mut body = Fixture::new();
        let mut table = Fixture::new();
        let mut content_size = 0u32;
        for content in contents {
            table = table.u32(content.version as u32 | ((body.len() as u32) << 8));
            if mixed {
                body = body.u16(content.tag.unwrap_or(0));
            }
            content_size = content.body.len() as u32;
            body = body.bytes(&content.body.data);
        }

        // mini header, extended header, multi header
        let body_start = self.len() as u32 + 4 + 4 + 6;
        let field = match record_type {
            SFX_REC_FIXSIZE => content_size,
            SFX_REC_VARSIZE_RELOC | SFX_REC_MIXTAGS_RELOC => body.len() as u32,
            SFX_REC_VARSIZE | SFX_REC_MIXTAGS => body_start + body.len() as u32,
            _ => 0,
        };

        let mut ext = Fixture::new()
            .u8(record_type)
            .u8(version)
            .u16(tag)
            .u16(count)
            .u32(field)
            .bytes(&body.data);
        if record_type != SFX_REC_FIXSIZE {
            ext = ext.bytes(&table.data);
        }
        self.sfx_mini(SFX_PRETAG_EXT, ext)
    }
}
