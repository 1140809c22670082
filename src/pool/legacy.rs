//! Legacy generation pool layout.
//!
//! ```text
//! u16 0x1111 | u8 major | u8 minor | u16 loading version | string name
//! u32 size of the attribute section
//! attribute section
//!   u16 0x2222
//!   items:    u16 which (0 ends) | u16 version | u16 count
//!             count x (u16 reference count | payload)
//!   u16 0x4444
//!   defaults: u16 which (0 ends) | u16 version | payload
//! size table
//!   u32 byte length
//!   [minor >= 3] u16 count | count x version map
//!   u32 payload sizes, items first, in section order
//! u32 0xEEEEEEEE
//! ```
//!
//! Payloads carry no length of their own, so the size table behind the
//! section is read first.

use super::{AttributePool, PoolGeneration, VersionMapEntry};
use crate::common::{Error, Result};
use crate::consts::{
    LEGACY_VERSION_MAP_MINOR, POOL_TAG_DEFAULTS, POOL_TAG_ITEMS, POOL_TAG_TRAILER,
};
use crate::zone::RecordZone;
use std::io::SeekFrom;

/// Payload sizes consumed in section order.
struct PayloadSizes {
    sizes: std::vec::IntoIter<u64>,
    /// End of the attribute section
    limit: u64,
}

impl PayloadSizes {
    /// Size of the next payload starting at `pos`.
    fn next_size(&mut self, pos: u64) -> Result<u64> {
        let size = self
            .sizes
            .next()
            .ok_or_else(|| Error::CorruptedPool("size table exhausted".to_string()))?;
        if pos + size > self.limit {
            return Err(Error::CorruptedPool(format!(
                "payload of {size} bytes at {pos} overruns the attribute section"
            )));
        }
        Ok(size)
    }
}

fn expect_tag(zone: &mut RecordZone, tag: u16) -> Result<()> {
    let offset = zone.stream().tell();
    match zone.stream_mut().read_u16() {
        found if found == tag => Ok(()),
        found => Err(Error::BadMagic {
            offset,
            found: found as u32,
        }),
    }
}

/// Read the next non-zero which-id, `None` at the list terminator.
fn next_which(zone: &mut RecordZone, limit: u64, list: &str) -> Result<Option<u16>> {
    if zone.stream().tell() + 2 > limit {
        return Err(Error::CorruptedPool(format!("unterminated {list} list")));
    }
    Ok(match zone.stream_mut().read_u16() {
        0 => None,
        which => Some(which),
    })
}

impl AttributePool {
    pub(super) fn read_legacy(&mut self, zone: &mut RecordZone) -> Result<()> {
        self.generation = Some(PoolGeneration::Legacy);
        self.major = zone.stream_mut().read_u8();
        self.minor = zone.stream_mut().read_u8();
        self.loading_version = zone.stream_mut().read_u16();
        self.name = zone
            .read_string()
            .map_err(|err| Error::CorruptedPool(format!("pool name: {err}")))?;

        let limit = zone.limit();
        let section_size = zone.stream_mut().read_u32() as u64;
        let section = zone.stream().tell();
        let table = section + section_size;
        if table + 4 > limit {
            return Err(Error::CorruptedPool(format!(
                "attribute section of {section_size} bytes overruns the stream"
            )));
        }

        zone.stream_mut().seek(SeekFrom::Start(table));
        let table_length = zone.stream_mut().read_u32() as u64;
        let table_end = zone.stream().tell() + table_length;
        if table_end + 4 > limit {
            return Err(Error::CorruptedPool(format!(
                "size table of {table_length} bytes overruns the stream"
            )));
        }

        if self.minor >= LEGACY_VERSION_MAP_MINOR {
            if zone.stream().tell() + 2 > table_end {
                return Err(Error::CorruptedPool("missing version map count".to_string()));
            }
            let count = zone.stream_mut().read_u16();
            let mut last = None;
            for i in 0..count {
                let entry = VersionMapEntry::read(zone.stream_mut(), table_end).ok_or_else(|| {
                    Error::CorruptedPool(format!("version map {i} overruns the size table"))
                })?;
                self.push_stream_version(zone, entry, &mut last);
            }
        }

        let count = (table_end - zone.stream().tell()) / 4;
        let sizes: Vec<u64> = (0..count)
            .map(|_| zone.stream_mut().read_u32() as u64)
            .collect();
        zone.stream_mut().seek(SeekFrom::Start(table_end));
        let trailer_offset = table_end;
        let trailer = zone.stream_mut().read_u32();
        if trailer != POOL_TAG_TRAILER {
            return Err(Error::BadMagic {
                offset: trailer_offset,
                found: trailer,
            });
        }
        let after = zone.stream().tell();

        let mut sizes = PayloadSizes {
            sizes: sizes.into_iter(),
            limit: table,
        };
        zone.stream_mut().seek(SeekFrom::Start(section));
        expect_tag(zone, POOL_TAG_ITEMS)?;
        while let Some(file_which) = next_which(zone, table, "item")? {
            if zone.stream().tell() + 4 > table {
                return Err(Error::CorruptedPool(format!(
                    "item header of which-id {file_which} overruns the attribute section"
                )));
            }
            let version = zone.stream_mut().read_u16();
            let count = zone.stream_mut().read_u16();
            for index in 0..count {
                let ref_count = zone.stream_mut().read_u16();
                let size = sizes.next_size(zone.stream().tell())?;
                let payload = zone.stream_mut().read_block(size)?;
                self.store_item(zone, file_which, version, index, ref_count, payload);
            }
        }

        expect_tag(zone, POOL_TAG_DEFAULTS)?;
        while let Some(file_which) = next_which(zone, table, "default")? {
            let version = zone.stream_mut().read_u16();
            let size = sizes.next_size(zone.stream().tell())?;
            let payload = zone.stream_mut().read_block(size)?;
            self.store_default(zone, file_which, version, payload);
        }

        zone.stream_mut().seek(SeekFrom::Start(after));
        Ok(())
    }
}
