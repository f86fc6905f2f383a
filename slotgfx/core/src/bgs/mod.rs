//! # Regular backgrounds
//!
//! Up to four live backgrounds, one per hardware background. Like sprites,
//! a background record holds one usage of its tile range and palette and is
//! shared through [`RegularBgPtr`].
//!
//! Hardware backgrounds are handed out at commit in priority order, so the
//! background a record lands on may change when another one is created or
//! released. Its map is rewritten whenever that happens.

mod item;
mod ptr;

pub use item::{BgMap, RegularBgItem};
pub use ptr::RegularBgPtr;

use log::debug;
#[cfg(feature = "status-log")]
use log::trace;
use slotgfx_fixed::FixedPoint;

use crate::config::MAX_BGS;
use crate::error::ResourceError;
use crate::managers::Managers;
use crate::pool::{HandlePool, PoolUsage};
use crate::shared::Resource;

#[derive(Debug)]
pub(crate) struct BgRecord {
    pub tiles: u16,
    pub palette: u16,
    pub map: &'static BgMap,
    pub position: FixedPoint,
    pub priority: u8,
    pub z_order: i16,
    pub visible: bool,
    pub mosaic: bool,
    pub ignore_camera: bool,
    pub sequence: u32,
    pub usages: u16,
    pub dirty: bool,
    /// Map cells need to be written again, even if the hardware slot didn't change.
    pub map_dirty: bool,
    pub hw_slot: Option<u8>,
}

pub struct BgPool {
    items: HandlePool<BgRecord, MAX_BGS>,
    next_sequence: u32,
}

impl BgPool {
    pub fn new() -> Self {
        Self {
            items: HandlePool::new(),
            next_sequence: 0,
        }
    }

    pub fn is_full(&self) -> bool {
        self.items.is_full()
    }

    /// Takes over the tile and palette usages passed in.
    pub(crate) fn insert(
        &mut self,
        tiles: u16,
        palette: u16,
        map: &'static BgMap,
        position: FixedPoint,
    ) -> Result<u16, ResourceError> {
        let record = BgRecord {
            tiles,
            palette,
            map,
            position,
            priority: 3,
            z_order: 0,
            visible: true,
            mosaic: false,
            ignore_camera: false,
            sequence: self.next_sequence,
            usages: 1,
            dirty: true,
            map_dirty: true,
            hw_slot: None,
        };
        let id = self.items.allocate(record).map_err(|_| ResourceError::BgsExhausted)?;
        self.next_sequence = self.next_sequence.wrapping_add(1);

        debug!("bg {} created: tiles {}, palette {}", id, tiles, palette);
        #[cfg(feature = "status-log")]
        self.log_status();

        Ok(id)
    }

    pub(crate) fn get(&self, id: u16) -> &BgRecord {
        self.items.get(id)
    }

    /// Mutable record access. Marks the background for the next commit.
    pub(crate) fn get_mut(&mut self, id: u16) -> &mut BgRecord {
        let record = self.items.get_mut(id);
        record.dirty = true;
        record
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (u16, &BgRecord)> {
        self.items.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (u16, &mut BgRecord)> {
        self.items.iter_mut()
    }

    pub(crate) fn mark_all_dirty(&mut self) {
        for (_, record) in self.items.iter_mut() {
            record.dirty = true;
        }
    }

    pub fn usage(&self) -> PoolUsage {
        self.items.usage()
    }

    #[cfg(feature = "status-log")]
    fn log_status(&self) {
        trace!("bgs: {} / {} used", self.items.len(), MAX_BGS);
        for (id, record) in self.items.iter() {
            trace!(
                "  bg {}: at {:?}, priority {}, z {}, usages {}, slot {:?}",
                id, record.position, record.priority, record.z_order, record.usages, record.hw_slot
            );
        }
    }
}

impl Default for BgPool {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub enum Bgs {}

impl Resource for Bgs {
    const NAME: &'static str = "regular bg";

    fn increase_usages(managers: &mut Managers, id: u16) {
        managers.bgs.items.get_mut(id).usages += 1;
    }

    fn decrease_usages(managers: &mut Managers, id: u16) {
        let record = managers.bgs.items.get_mut(id);
        assert!(record.usages > 0, "bg {} without usages", id);

        record.usages -= 1;
        if record.usages > 0 {
            return;
        }

        let record = managers.bgs.items.release(id);
        managers.bg_tiles.decrease_usages(record.tiles);
        managers.bg_palettes.decrease_usages(record.palette);

        debug!("bg {} freed", id);
        #[cfg(feature = "status-log")]
        managers.bgs.log_status();
    }
}
