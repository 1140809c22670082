//! Versioned attribute pools.
//!
//! A pool is the dictionary of formatting attributes shared by a document:
//! every attribute value is stored once with its which-id, and the document
//! body refers to it by surrogate. Which-ids moved between format revisions,
//! so a pool also carries version maps translating the ids of the writer
//! into the numbering of the reader.
//!
//! Two on-disk generations exist (see [`legacy`] and [`current`]). Unlike
//! the record layer, any structural mismatch here fails the whole read: an
//! attribute dictionary misread by a few bytes would silently corrupt every
//! item after it.
//!
//! # Examples
//!
//! ```
//! use starzone::pool::{AttributePool, VersionMapEntry};
//!
//! // reader at version 2; version 2 inserted an attribute after id 11
//! let pool = AttributePool::new(2)
//!     .with_range(10, 20)
//!     .add_version_map(VersionMapEntry::new(2, 10, vec![10, 11, 13, 14]));
//!
//! // loading and current versions are equal before a read
//! assert_eq!(pool.which(12), 12);
//! assert_eq!(pool.which(30), 0);
//! ```

pub mod current;
pub mod item;
pub mod legacy;
pub mod version;

pub use item::{AttributeCatalog, Item, Surrogate};
pub use version::VersionMapEntry;

use crate::common::{DiagnosticKind, Error, Result};
use crate::consts::{
    POOL_TAG_CURRENT, POOL_TAG_LEGACY, SURROGATE_DEFAULT, SURROGATE_DIRECT, SURROGATE_NULL,
};
use crate::zone::RecordZone;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::io::SeekFrom;
use tracing::{debug, warn};

/// On-disk layout family of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolGeneration {
    /// Magic-delimited sections with a payload size table
    Legacy,
    /// Nested SFX records
    Current,
}

/// Attribute dictionary of a document.
#[derive(Debug)]
pub struct AttributePool {
    name: String,
    generation: Option<PoolGeneration>,
    major: u8,
    minor: u8,
    /// Version of the reader's attribute numbering
    current_version: u16,
    /// Version of the numbering used in the file
    loading_version: u16,
    /// Known which-id range
    range: Option<(u16, u16)>,
    /// Version maps sorted by version
    versions: Vec<VersionMapEntry>,
    items: BTreeMap<u16, BTreeMap<u16, Item>>,
    defaults: BTreeMap<u16, Item>,
}

impl AttributePool {
    /// Create an empty pool for a reader whose numbering has `current_version`.
    pub fn new(current_version: u16) -> Self {
        Self {
            name: String::new(),
            generation: None,
            major: 0,
            minor: 0,
            current_version,
            loading_version: current_version,
            range: None,
            versions: Vec::new(),
            items: BTreeMap::new(),
            defaults: BTreeMap::new(),
        }
    }

    /// Declare the which-id range of the reader.
    pub fn with_range(mut self, start: u16, end: u16) -> Self {
        self.widen_range(start.min(end), start.max(end));
        self
    }

    /// Declare a version map of the reader.
    pub fn add_version_map(mut self, entry: VersionMapEntry) -> Self {
        self.insert_version_map(entry);
        self
    }

    fn widen_range(&mut self, low: u16, high: u16) {
        self.range = Some(match self.range {
            Some((start, end)) => (start.min(low), end.max(high)),
            None => (low, high),
        });
    }

    /// Insert a map at its version position; `false` if the version is known.
    ///
    /// `versions` stays sorted whatever order maps are declared in.
    fn insert_version_map(&mut self, entry: VersionMapEntry) -> bool {
        if self.versions.iter().any(|known| known.version == entry.version) {
            return false;
        }
        let mut low = entry.start;
        let mut high = entry.end();
        if let (Some(&min), Some(&max)) = (entry.ids.iter().min(), entry.ids.iter().max()) {
            low = low.min(min);
            high = high.max(max);
        }
        self.widen_range(low, high);
        let at = self
            .versions
            .partition_point(|known| known.version < entry.version);
        self.versions.insert(at, entry);
        true
    }

    /// Add a map read from the stream, checking the declaration order.
    fn push_stream_version(&mut self, zone: &mut RecordZone, entry: VersionMapEntry, last: &mut Option<u16>) {
        let offset = zone.stream().tell();
        if let Some(previous) = *last
            && entry.version < previous
        {
            zone.report(
                DiagnosticKind::VersionMapOrder,
                offset,
                format_args!("version map {} declared after {previous}", entry.version),
            );
        }
        *last = Some(entry.version);
        let version = entry.version;
        if !self.insert_version_map(entry) {
            zone.note(
                DiagnosticKind::DuplicateVersionMap,
                offset,
                format_args!("version map {version} already known"),
            );
        }
    }

    // Reading

    /// Read a pool at the cursor.
    ///
    /// On failure the cursor is back on the pool start and the frames opened
    /// by the read are dropped. The pool holds no items, and its header,
    /// loading version and version maps are the ones it had before the read.
    pub fn read(&mut self, zone: &mut RecordZone) -> Result<()> {
        let start = zone.stream().tell();
        let depth = zone.record_level();
        let versions = self.versions.clone();
        let range = self.range;
        let header = (
            std::mem::take(&mut self.name),
            self.major,
            self.minor,
            self.loading_version,
        );
        self.items.clear();
        self.defaults.clear();

        let result = match zone.stream_mut().read_u16() {
            POOL_TAG_LEGACY => self.read_legacy(zone),
            POOL_TAG_CURRENT => self.read_current(zone),
            found => Err(Error::BadMagic {
                offset: start,
                found: found as u32,
            }),
        };

        match &result {
            Ok(()) => debug!(
                zone = zone.name(),
                pool = %self.name,
                generation = ?self.generation,
                loading_version = self.loading_version,
                items = self.item_count(),
                defaults = self.defaults.len(),
                "attribute pool"
            ),
            Err(err) => {
                warn!(zone = zone.name(), offset = start, %err, "attribute pool unreadable");
                zone.truncate_frames(depth);
                zone.stream_mut().seek(SeekFrom::Start(start));
                self.generation = None;
                self.versions = versions;
                self.range = range;
                (self.name, self.major, self.minor, self.loading_version) = header;
                self.items.clear();
                self.defaults.clear();
            }
        }
        result
    }

    /// Translate a file which-id, reporting ids the reader does not know.
    fn translate(&self, zone: &mut RecordZone, file_which: u16) -> Option<u16> {
        match self.which(file_which) {
            0 => {
                zone.report(
                    DiagnosticKind::UnknownWhich,
                    zone.stream().tell(),
                    format_args!("which-id {file_which} of version {} skipped", self.loading_version),
                );
                None
            }
            which => Some(which),
        }
    }

    fn store_item(
        &mut self,
        zone: &mut RecordZone,
        file_which: u16,
        version: u16,
        index: u16,
        ref_count: u16,
        payload: Bytes,
    ) {
        let Some(which) = self.translate(zone, file_which) else {
            return;
        };
        self.items.entry(which).or_default().insert(
            index,
            Item {
                which,
                file_which,
                version,
                index,
                ref_count,
                payload,
                attribute: None,
            },
        );
    }

    fn store_default(&mut self, zone: &mut RecordZone, file_which: u16, version: u16, payload: Bytes) {
        let Some(which) = self.translate(zone, file_which) else {
            return;
        };
        self.defaults.insert(
            which,
            Item {
                which,
                file_which,
                version,
                index: 0,
                ref_count: 0,
                payload,
                attribute: None,
            },
        );
    }

    // Which-id translation

    /// Translate a which-id of the file into the reader's numbering.
    ///
    /// Ids outside the known range, and ids a version step does not map,
    /// give 0. A newer file is walked down through the maps newer than the
    /// reader, newest first; an older file is walked up through the maps
    /// newer than the file, oldest first.
    pub fn which(&self, file_which: u16) -> u16 {
        let Some((low, high)) = self.range else {
            return 0;
        };
        if file_which < low || file_which > high {
            return 0;
        }
        let mut which = file_which;
        if self.loading_version > self.current_version {
            for entry in self.versions.iter().rev() {
                if entry.version <= self.current_version {
                    break;
                }
                match entry.downgrade(which) {
                    Some(previous) => which = previous,
                    None => return 0,
                }
            }
        } else if self.loading_version < self.current_version {
            for entry in &self.versions {
                if entry.version <= self.loading_version {
                    continue;
                }
                match entry.upgrade(which) {
                    Some(next) => which = next,
                    None => return 0,
                }
            }
        }
        which
    }

    // Items

    /// Read a surrogate and resolve it against the items of `which`.
    pub fn load_surrogate(&self, zone: &mut RecordZone, which: u16) -> Surrogate<'_> {
        let offset = zone.stream().tell();
        match zone.stream_mut().read_u16() {
            SURROGATE_DIRECT => Surrogate::Direct,
            SURROGATE_NULL => Surrogate::Null,
            SURROGATE_DEFAULT => Surrogate::Default(self.defaults.get(&which)),
            index => match self.item(which, index) {
                Some(item) => Surrogate::Item(item),
                None => {
                    zone.report(
                        DiagnosticKind::UnresolvedSurrogate,
                        offset,
                        format_args!("no item {index} for which-id {which}"),
                    );
                    Surrogate::Unresolved(index)
                }
            },
        }
    }

    /// Decode every undecoded item and default; returns how many were decoded.
    pub fn decode_items(&mut self, catalog: &dyn AttributeCatalog) -> usize {
        let mut decoded = 0;
        let items = self
            .items
            .values_mut()
            .flat_map(|items| items.values_mut())
            .chain(self.defaults.values_mut());
        for item in items.filter(|item| item.attribute.is_none()) {
            item.attribute = catalog.decode(item.which, item.version, &item.payload);
            if item.attribute.is_some() {
                decoded += 1;
            }
        }
        decoded
    }

    /// Item `index` of `which`.
    pub fn item(&self, which: u16, index: u16) -> Option<&Item> {
        self.items.get(&which)?.get(&index)
    }

    /// Items of `which`, by index.
    pub fn items(&self, which: u16) -> impl Iterator<Item = &Item> {
        self.items.get(&which).into_iter().flat_map(|items| items.values())
    }

    /// All items, by which-id then index.
    pub fn all_items(&self) -> impl Iterator<Item = &Item> {
        self.items.values().flat_map(|items| items.values())
    }

    /// Number of stored items, defaults excluded.
    pub fn item_count(&self) -> usize {
        self.items.values().map(BTreeMap::len).sum()
    }

    /// Pool default of `which`.
    pub fn default_item(&self, which: u16) -> Option<&Item> {
        self.defaults.get(&which)
    }

    pub fn defaults(&self) -> impl Iterator<Item = &Item> {
        self.defaults.values()
    }

    // Header data

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Generation of the last successful read.
    #[inline]
    pub fn generation(&self) -> Option<PoolGeneration> {
        self.generation
    }

    /// `(major, minor)` format version of the pool.
    #[inline]
    pub fn format_version(&self) -> (u8, u8) {
        (self.major, self.minor)
    }

    #[inline]
    pub fn current_version(&self) -> u16 {
        self.current_version
    }

    #[inline]
    pub fn loading_version(&self) -> u16 {
        self.loading_version
    }

    #[inline]
    pub fn range(&self) -> Option<(u16, u16)> {
        self.range
    }

    #[inline]
    pub fn version_maps(&self) -> &[VersionMapEntry] {
        &self.versions
    }
}
