//! Attribute id version maps.
//!
//! Each format revision that inserted new attributes shifted the ids after
//! the insertion point. A version map records, for one revision, a range
//! of ids `[start, start + ids.len())` in the previous numbering and the id
//! each of them got in the revision.

use crate::stream::ByteStream;

/// Id mapping introduced by one pool version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMapEntry {
    /// Pool version introducing the map
    pub version: u16,
    /// First id of the range in the previous numbering
    pub start: u16,
    /// New id of every id of the range
    pub ids: Vec<u16>,
}

impl VersionMapEntry {
    pub fn new(version: u16, start: u16, ids: Vec<u16>) -> Self {
        Self {
            version,
            start,
            ids,
        }
    }

    /// Read `u16 version, u16 start, u16 end` and `end - start + 1` ids.
    ///
    /// Returns `None` when the id list runs past `limit`.
    pub fn read(stream: &mut ByteStream, limit: u64) -> Option<Self> {
        if limit < stream.tell() + 6 {
            return None;
        }
        let version = stream.read_u16();
        let start = stream.read_u16();
        let end = stream.read_u16();
        if end < start {
            return None;
        }
        let count = (end - start) as u64 + 1;
        if limit < stream.tell() + 2 * count {
            return None;
        }
        let ids = (0..count).map(|_| stream.read_u16()).collect();
        Some(Self::new(version, start, ids))
    }

    /// Last id of the range in the previous numbering.
    #[inline]
    pub fn end(&self) -> u16 {
        self.start
            .saturating_add(self.ids.len().saturating_sub(1) as u16)
    }

    /// Whether the previous-numbering `id` is in the range.
    #[inline]
    pub fn contains(&self, id: u16) -> bool {
        id >= self.start && ((id - self.start) as usize) < self.ids.len()
    }

    /// New id of the previous-numbering `id`.
    #[inline]
    pub fn upgrade(&self, id: u16) -> Option<u16> {
        id.checked_sub(self.start)
            .and_then(|offset| self.ids.get(offset as usize))
            .copied()
    }

    /// Previous-numbering id of the new `id`.
    #[inline]
    pub fn downgrade(&self, id: u16) -> Option<u16> {
        self.ids
            .iter()
            .position(|&old| old == id)
            .and_then(|index| self.start.checked_add(index as u16))
    }
}
