//! Current generation pool layout.
//!
//! ```text
//! u16 0xBBBB | u8 major | u8 minor
//! mini record, pre-tag 0xFF
//!   single 0x0010     u16 loading version, string name
//!   var-size 0x0020   one version map per content
//!   mixed-tag 0x0030  one content per which-id (tag = which, version = item version)
//!                       u16 item count
//!                       mixed-tag 0x0040, one content per item (tag = index)
//!                         u16 reference count, payload
//!   mixed-tag 0x0050  one content per default (tag = which), payload
//! ```

use super::{AttributePool, PoolGeneration, VersionMapEntry};
use crate::common::{DiagnosticKind, Error, Result};
use crate::consts::{
    POOL_REC, POOL_REC_DEFAULTS, POOL_REC_HEADER, POOL_REC_ITEMS, POOL_REC_VERSIONMAP,
    POOL_REC_WHICHIDS,
};
use crate::zone::RecordZone;
use std::io::SeekFrom;

impl AttributePool {
    pub(super) fn read_current(&mut self, zone: &mut RecordZone) -> Result<()> {
        self.generation = Some(PoolGeneration::Current);
        self.major = zone.stream_mut().read_u8();
        self.minor = zone.stream_mut().read_u8();

        let (pool, pretag) = zone.open_sfx_mini_record()?;
        if pretag != POOL_REC {
            return Err(Error::CorruptedPool(format!(
                "pool record pre-tag 0x{pretag:02X}"
            )));
        }

        let header = zone.open_sfx_record(POOL_REC_HEADER)?;
        self.loading_version = zone.stream_mut().read_u16();
        self.name = zone
            .read_string()
            .map_err(|err| Error::CorruptedPool(format!("pool name: {err}")))?;
        zone.close_sfx_record(header, "PoolHeader")?;

        let maps = zone.open_sfx_record(POOL_REC_VERSIONMAP)?;
        let mut last = None;
        for content in &maps.contents {
            zone.stream_mut().seek(SeekFrom::Start(content.start));
            let entry = VersionMapEntry::read(zone.stream_mut(), content.end).ok_or_else(|| {
                Error::CorruptedPool(format!("version map at {} is truncated", content.start))
            })?;
            self.push_stream_version(zone, entry, &mut last);
        }
        zone.close_sfx_record(maps, "PoolVersionMap")?;

        let whiches = zone.open_sfx_record(POOL_REC_WHICHIDS)?;
        for content in &whiches.contents {
            zone.stream_mut().seek(SeekFrom::Start(content.start));
            let count = zone.stream_mut().read_u16();
            let items = zone.open_sfx_record(POOL_REC_ITEMS)?;
            if items.contents.len() != count as usize {
                zone.report(
                    DiagnosticKind::ItemCountMismatch,
                    content.start,
                    format_args!(
                        "which-id {}: {count} items declared, {} stored",
                        content.tag,
                        items.contents.len()
                    ),
                );
            }
            for item in &items.contents {
                if item.end < item.start + 2 {
                    return Err(Error::CorruptedPool(format!(
                        "item {} of which-id {} has no reference count",
                        item.tag, content.tag
                    )));
                }
                zone.stream_mut().seek(SeekFrom::Start(item.start));
                let ref_count = zone.stream_mut().read_u16();
                let payload = zone.stream_mut().read_block(item.end - item.start - 2)?;
                self.store_item(
                    zone,
                    content.tag,
                    content.version as u16,
                    item.tag,
                    ref_count,
                    payload,
                );
            }
            zone.close_sfx_record(items, "PoolItems")?;
        }
        zone.close_sfx_record(whiches, "PoolWhichIds")?;

        let defaults = zone.open_sfx_record(POOL_REC_DEFAULTS)?;
        for content in &defaults.contents {
            zone.stream_mut().seek(SeekFrom::Start(content.start));
            let payload = zone.stream_mut().read_block(content.end - content.start)?;
            self.store_default(zone, content.tag, content.version as u16, payload);
        }
        zone.close_sfx_record(defaults, "PoolDefaults")?;

        zone.close_record(pool, "Pool")
    }
}
