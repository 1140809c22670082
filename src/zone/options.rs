//! Configuration of a [`RecordZone`](super::RecordZone).

use crate::common::encoding::DEFAULT_ENCODING;
use encoding_rs::Encoding;

/// Options controlling how a record zone decodes and reports.
///
/// # Examples
///
/// ```rust
/// use starzone::zone::ZoneOptions;
///
/// // Create with defaults
/// let options = ZoneOptions::default();
/// assert_eq!(options.resync_tolerance, 4);
///
/// // Or customize
/// let options = ZoneOptions::new()
///     .with_name("StarCalcDocument")
///     .with_version(0x0209)
///     .with_verbose(true);
///
/// // Wrap a stream without touching its byte order
/// let options = ZoneOptions::new().with_stream_byte_order();
/// assert_eq!(options.read_inverted, None);
/// ```
#[derive(Debug, Clone)]
pub struct ZoneOptions {
    /// Name used in diagnostics, usually the sub-stream name
    pub name: String,
    /// Declared container version, decides deferred record sizes and the
    /// string pool layout
    pub version: u16,
    /// Encoding of strings that do not declare their charset
    pub encoding: &'static Encoding,
    /// End-of-record mismatches up to this many bytes are only logged at
    /// `debug` level
    pub resync_tolerance: u64,
    /// Log every diagnostic at `warn` level
    pub verbose: bool,
    /// Byte order forced on the stream, little-endian by default; `None`
    /// keeps the order the stream already has
    pub read_inverted: Option<bool>,
}

impl Default for ZoneOptions {
    fn default() -> Self {
        Self {
            name: String::from("zone"),
            version: 0,
            encoding: DEFAULT_ENCODING,
            resync_tolerance: 4,
            verbose: false,
            read_inverted: Some(true),
        }
    }
}

impl ZoneOptions {
    /// Create a new `ZoneOptions` with default values.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the name used in diagnostics.
    #[inline]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the declared container version.
    #[inline]
    pub fn with_version(mut self, version: u16) -> Self {
        self.version = version;
        self
    }

    /// Set the default string encoding.
    #[inline]
    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Set the number of bytes an end-of-record mismatch may have before it
    /// is reported at `warn` level.
    #[inline]
    pub fn with_resync_tolerance(mut self, bytes: u64) -> Self {
        self.resync_tolerance = bytes;
        self
    }

    #[inline]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Force the byte order of the stream.
    #[inline]
    pub fn with_read_inverted(mut self, inverted: bool) -> Self {
        self.read_inverted = Some(inverted);
        self
    }

    /// Keep the byte order the stream was configured with, e.g. one
    /// inherited from its parent storage.
    #[inline]
    pub fn with_stream_byte_order(mut self) -> Self {
        self.read_inverted = None;
        self
    }
}
