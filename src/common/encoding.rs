//! Legacy charset handling.
//!
//! Strings stored in the containers are raw bytes in a charset identified by a
//! one-byte legacy charset id (written in front of string pools and by the
//! document header). This module maps those ids onto `encoding_rs` encodings
//! and decodes byte strings to UTF-8.

use encoding_rs::Encoding;

/// Encoding used when no charset id is declared.
pub static DEFAULT_ENCODING: &Encoding = &encoding_rs::WINDOWS_1252_INIT;

/// Map a legacy charset identifier to an `encoding_rs` encoding.
///
/// Identifiers without an `encoding_rs` counterpart (symbol fonts, most DOS
/// code pages, the rarer Apple scripts) return `None`; callers fall back to
/// the zone's default encoding.
///
/// # Examples
/// ```
/// use starzone::common::encoding::charset_to_encoding;
///
/// assert_eq!(charset_to_encoding(1).unwrap().name(), "windows-1252");
/// assert_eq!(charset_to_encoding(76).unwrap().name(), "UTF-8");
/// assert!(charset_to_encoding(10).is_none());
/// ```
#[inline]
pub fn charset_to_encoding(id: u8) -> Option<&'static Encoding> {
    match id {
        // Western
        1 => Some(encoding_rs::WINDOWS_1252),  // ANSI
        2 => Some(encoding_rs::MACINTOSH),     // Mac Roman
        11 => Some(encoding_rs::WINDOWS_1252), // ASCII
        12 => Some(encoding_rs::WINDOWS_1252), // ISO-8859-1 approximation

        // ISO 8859 series
        13 => Some(encoding_rs::ISO_8859_2),
        14 => Some(encoding_rs::ISO_8859_3),
        15 => Some(encoding_rs::ISO_8859_4),
        16 => Some(encoding_rs::ISO_8859_5),
        17 => Some(encoding_rs::ISO_8859_6),
        18 => Some(encoding_rs::ISO_8859_7),
        19 => Some(encoding_rs::ISO_8859_8),
        20 => Some(encoding_rs::WINDOWS_1254), // ISO-8859-9 approximation
        21 => Some(encoding_rs::ISO_8859_14),
        22 => Some(encoding_rs::ISO_8859_15),
        77 => Some(encoding_rs::ISO_8859_10),
        78 => Some(encoding_rs::ISO_8859_13),

        // DOS and Windows code pages
        30 => Some(encoding_rs::IBM866),
        32 => Some(encoding_rs::WINDOWS_874),
        33 => Some(encoding_rs::WINDOWS_1250),
        34 => Some(encoding_rs::WINDOWS_1251),
        35 => Some(encoding_rs::WINDOWS_1253),
        36 => Some(encoding_rs::WINDOWS_1254),
        37 => Some(encoding_rs::WINDOWS_1255),
        38 => Some(encoding_rs::WINDOWS_1256),
        39 => Some(encoding_rs::WINDOWS_1257),
        40 => Some(encoding_rs::WINDOWS_1258),

        // Apple scripts
        44 | 55 => Some(encoding_rs::X_MAC_CYRILLIC),

        // East Asian
        60 | 64 => Some(encoding_rs::SHIFT_JIS),
        61 | 65 | 67 | 70 => Some(encoding_rs::GBK),
        62 | 79 => Some(encoding_rs::EUC_KR),
        63 | 68 => Some(encoding_rs::BIG5),
        69 => Some(encoding_rs::EUC_JP),
        72 => Some(encoding_rs::ISO_2022_JP),

        // KOI8 and Unicode
        74 => Some(encoding_rs::KOI8_R),
        88 => Some(encoding_rs::KOI8_U),
        76 => Some(encoding_rs::UTF_8),

        _ => None,
    }
}

/// Decode a length-delimited byte string.
///
/// Embedded NUL bytes are kept: strings in these containers are length
/// prefixed, never terminated.
#[inline]
pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> String {
    if bytes.is_empty() {
        return String::new();
    }
    encoding
        .decode_without_bom_handling(bytes)
        .0
        .into_owned()
}
