//! On-disk constants of the container family.

// Star record framing
/// Size of a star record header (tag byte + 24-bit length).
pub const RECORD_HEADER_SIZE: u64 = 4;
/// Length value meaning "look my size up in the record size directory".
pub const RECORD_SIZE_SENTINEL: u32 = 0x00FF_FFFF;
/// First container version that writes deferred record sizes.
pub const LONG_RECORDS_VERSION: u16 = 0x0209;
/// First container version whose string pool carries an encoding byte.
pub const POOL_ENCODING_VERSION: u16 = 0x0201;
/// Pool index meaning "no name".
pub const NO_POOL_NAME: i32 = 0xFFF0;
/// Tag of the string pool record.
pub const STRING_POOL_TAG: u8 = b'!';
/// Tag of the record size directory.
pub const RECORD_SIZES_TAG: u8 = b'%';

// SFX records
/// Pre-tag announcing an extended SFX record.
pub const SFX_PRETAG_EXT: u8 = 0x00;
/// Size of the SFX mini header.
pub const SFX_MINI_HEADER_SIZE: u64 = 4;
/// Single-content record.
pub const SFX_REC_SINGLE: u8 = 0x01;
/// Multi record whose contents all have the same size.
pub const SFX_REC_FIXSIZE: u8 = 0x02;
/// Multi record with a relative content table.
pub const SFX_REC_VARSIZE_RELOC: u8 = 0x03;
/// Multi record with an absolute content table.
pub const SFX_REC_VARSIZE: u8 = 0x04;
/// Mixed-tag multi record with a relative content table.
pub const SFX_REC_MIXTAGS_RELOC: u8 = 0x07;
/// Mixed-tag multi record with an absolute content table.
pub const SFX_REC_MIXTAGS: u8 = 0x08;

// Attribute pools
/// Legacy generation pool tag.
pub const POOL_TAG_LEGACY: u16 = 0x1111;
/// Current generation pool tag.
pub const POOL_TAG_CURRENT: u16 = 0xBBBB;
/// Start of the legacy attribute section.
pub const POOL_TAG_ITEMS: u16 = 0x2222;
/// Start of the legacy defaults section.
pub const POOL_TAG_DEFAULTS: u16 = 0x4444;
/// Legacy pool trailer.
pub const POOL_TAG_TRAILER: u32 = 0xEEEE_EEEE;

/// Pre-tag of the mini record enclosing a current generation pool.
pub const POOL_REC: u8 = 0xFF;
pub const POOL_REC_HEADER: u16 = 0x0010;
pub const POOL_REC_VERSIONMAP: u16 = 0x0020;
pub const POOL_REC_WHICHIDS: u16 = 0x0030;
pub const POOL_REC_ITEMS: u16 = 0x0040;
pub const POOL_REC_DEFAULTS: u16 = 0x0050;

// Surrogates
/// The item follows in place.
pub const SURROGATE_DIRECT: u16 = 0xFFFF;
/// The item is the pool default.
pub const SURROGATE_DEFAULT: u16 = 0xFFFE;
/// No item.
pub const SURROGATE_NULL: u16 = 0xFFF0;

/// Legacy pools store version maps from format 1.3 on.
pub const LEGACY_VERSION_MAP_MINOR: u8 = 3;
