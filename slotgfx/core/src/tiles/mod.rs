//! # Tile banks
//!
//! A [`TileBank`] hands out contiguous ranges of 32 byte tile units. Ranges
//! backed by asset data are deduplicated on the identity of that data (its
//! address, length and bit depth), so every sprite built from the same frame
//! shares one range. Ranges without data come from [`TileBank::allocate`] and
//! are never shared implicitly.
//!
//! The bank is a sorted list of segments, each either free or owned by one
//! record. Allocation picks the tightest free segment that fits (best fit),
//! splitting off the leftovers. Releasing a record marks its segment free and
//! merges it with free neighbours right away, so two free segments are never
//! adjacent and `available_tiles_count` is exact at all times.
//!
//! Background tiles are reached through 10 bit map cell indices counted from
//! the character block a range starts in, so a [`Placement::Charblocks`] bank
//! only places a range where all of it stays within that window. A range that
//! would overflow the window from the first aligned start moves up to the next
//! character block instead.
//!
//! Nothing touches hardware tile memory here until [`TileBank::upload`], which
//! the commit pass calls once per frame.

mod item;
mod ptr;

pub use item::{valid_sprite_tiles_count, valid_tiles_count, RegularBgTilesItem, SpriteTilesItem};
pub use ptr::{BgTiles, RegularBgTilesPtr, SpriteTiles, SpriteTilesPtr, TileBankKind, TilesPtr};

use heapless::{FnvIndexMap, Vec};
use log::debug;
#[cfg(feature = "status-log")]
use log::trace;

use crate::bpp::BppMode;
use crate::config::{CHARBLOCK_UNITS, MAP_CELL_TILES, MAX_TILES_ITEMS, MAX_TILES_SEGMENTS, TILES_INDEX_CAPACITY};
use crate::error::ResourceError;
use crate::hw::Tile;
use crate::pool::HandlePool;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
struct TilesKey {
    address: usize,
    count: u16,
    bpp: BppMode,
}

impl TilesKey {
    fn new(data: &'static [Tile], bpp: BppMode) -> Self {
        Self {
            address: data.as_ptr() as usize,
            count: data.len() as u16,
            bpp,
        }
    }
}

#[derive(Debug)]
struct TileRecord {
    data: Option<&'static [Tile]>,
    bpp: BppMode,
    start: u16,
    count: u16,
    usages: u16,
    upload: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Segment {
    start: u16,
    count: u16,
    item: Option<u16>,
}

/// Where a bank may start a range.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Placement {
    /// Anywhere, ranges are addressed by their start unit.
    Linear,
    /// Within reach of map cells of the character block the range starts in.
    Charblocks,
}

/// Usage snapshot of a tile bank.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TilesUsage {
    pub units: u16,
    pub used_units: u16,
    pub items: u16,
    pub items_capacity: u16,
}

impl TilesUsage {
    pub fn used_count(&self) -> u16 {
        self.used_units
    }

    pub fn available_count(&self) -> u16 {
        self.units - self.used_units
    }

    pub fn used_items_count(&self) -> u16 {
        self.items
    }

    pub fn available_items_count(&self) -> u16 {
        self.items_capacity - self.items
    }
}

pub struct TileBank {
    name: &'static str,
    units: u16,
    placement: Placement,
    items: HandlePool<TileRecord, MAX_TILES_ITEMS>,
    segments: Vec<Segment, MAX_TILES_SEGMENTS>,
    index: FnvIndexMap<TilesKey, u16, TILES_INDEX_CAPACITY>,
    free_units: u16,
    upload_pending: bool,
}

impl TileBank {
    pub fn new(name: &'static str, units: u16, placement: Placement) -> Self {
        assert!(units > 0, "empty {} bank", name);

        let mut segments = Vec::new();
        let _ = segments.push(Segment { start: 0, count: units, item: None });

        Self {
            name,
            units,
            placement,
            items: HandlePool::new(),
            segments,
            index: FnvIndexMap::new(),
            free_units: units,
            upload_pending: false,
        }
    }

    /// Existing range for this data, with one more usage.
    pub fn find(&mut self, data: &'static [Tile], bpp: BppMode) -> Option<u16> {
        let id = *self.index.get(&TilesKey::new(data, bpp))?;
        self.increase_usages(id);
        Some(id)
    }

    pub fn create(&mut self, data: &'static [Tile], bpp: BppMode) -> Result<u16, ResourceError> {
        if let Some(id) = self.find(data, bpp) {
            return Ok(id);
        }

        self.create_new(data, bpp)
    }

    /// A fresh range even when an equal one is live. The dedup index keeps
    /// pointing at the older range in that case.
    pub fn create_new(&mut self, data: &'static [Tile], bpp: BppMode) -> Result<u16, ResourceError> {
        let count = data.len() as u16;
        let id = self.insert(Some(data), count, bpp)?;

        let key = TilesKey::new(data, bpp);
        if !self.index.contains_key(&key) && self.index.insert(key, id).is_err() {
            panic!("{} tiles index full", self.name);
        }

        Ok(id)
    }

    /// A range with no source data, for tiles written through [`TileBank::vram`].
    pub fn allocate(&mut self, count: u16, bpp: BppMode) -> Result<u16, ResourceError> {
        self.insert(None, count, bpp)
    }

    pub fn increase_usages(&mut self, id: u16) {
        let record = self.items.get_mut(id);
        record.usages += 1;
    }

    pub fn decrease_usages(&mut self, id: u16) {
        let record = self.items.get_mut(id);
        assert!(record.usages > 0, "{} tiles {} without usages", self.name, id);

        record.usages -= 1;
        if record.usages == 0 {
            self.free(id);
        }
    }

    pub fn start_tile(&self, id: u16) -> u16 {
        self.items.get(id).start
    }

    pub fn tiles_count(&self, id: u16) -> u16 {
        self.items.get(id).count
    }

    pub fn bpp(&self, id: u16) -> BppMode {
        self.items.get(id).bpp
    }

    pub fn usages(&self, id: u16) -> u16 {
        self.items.get(id).usages
    }

    pub fn tiles_ref(&self, id: u16) -> Option<&'static [Tile]> {
        self.items.get(id).data
    }

    /// Points a range at other data of the same shape, e.g. the next frame of
    /// an animation. The new data is uploaded on the next commit.
    pub fn set_tiles_ref(&mut self, id: u16, data: &'static [Tile]) {
        let record = self.items.get(id);
        let old = record.data.map(|old| TilesKey::new(old, record.bpp));
        let new = TilesKey::new(data, record.bpp);
        assert!(
            new.count == record.count,
            "{} tiles count mismatch: {} != {}", self.name, new.count, record.count
        );

        if old == Some(new) {
            return;
        }

        if let Some(old) = old {
            if self.index.get(&old) == Some(&id) {
                self.index.remove(&old);
            }
        }

        if !self.index.contains_key(&new) && self.index.insert(new, id).is_err() {
            panic!("{} tiles index full", self.name);
        }

        let record = self.items.get_mut(id);
        record.data = Some(data);
        record.upload = true;
        self.upload_pending = true;
    }

    /// Uploads the current data again on the next commit.
    pub fn reload_tiles_ref(&mut self, id: u16) {
        let record = self.items.get_mut(id);
        assert!(record.data.is_some(), "{} tiles {} have no data to reload", self.name, id);

        record.upload = true;
        self.upload_pending = true;
    }

    /// The hardware tiles of a range without source data.
    pub fn vram<'a>(&self, id: u16, hw_tiles: &'a mut [Tile]) -> Option<&'a mut [Tile]> {
        let record = self.items.get(id);
        if record.data.is_some() {
            return None;
        }

        let start = record.start as usize;
        Some(&mut hw_tiles[start..start + record.count as usize])
    }

    pub fn usage(&self) -> TilesUsage {
        TilesUsage {
            units: self.units,
            used_units: self.units - self.free_units,
            items: self.items.len() as u16,
            items_capacity: self.items.capacity() as u16,
        }
    }

    pub fn used_tiles_count(&self) -> u16 {
        self.units - self.free_units
    }

    pub fn available_tiles_count(&self) -> u16 {
        self.free_units
    }

    /// Copies pending tile data into hardware tile memory. Returns the amount
    /// of tile units written.
    pub fn upload(&mut self, hw_tiles: &mut [Tile]) -> u16 {
        if !self.upload_pending {
            return 0;
        }

        let mut uploaded = 0;
        for (_, record) in self.items.iter_mut() {
            if !record.upload {
                continue;
            }

            if let Some(data) = record.data {
                let start = record.start as usize;
                hw_tiles[start..start + data.len()].copy_from_slice(data);
                uploaded += record.count;
            }
            record.upload = false;
        }

        self.upload_pending = false;
        uploaded
    }

    fn insert(&mut self, data: Option<&'static [Tile]>, count: u16, bpp: BppMode) -> Result<u16, ResourceError> {
        assert!(count > 0, "empty {} tiles", self.name);
        assert!(
            !bpp.is_8bpp() || count % 2 == 0,
            "odd {} tiles count for 8bpp: {}", self.name, count
        );

        if self.items.is_full() {
            return Err(ResourceError::TileItemsExhausted);
        }

        let (segment, start) = self.best_fit(count, bpp).ok_or(ResourceError::OutOfTileMemory {
            requested: count,
            available: self.free_units,
        })?;

        let record = TileRecord {
            data,
            bpp,
            start: 0,
            count,
            usages: 1,
            upload: data.is_some(),
        };
        let id = self.items.allocate(record).map_err(|_| ResourceError::TileItemsExhausted)?;

        self.split(segment, start, count, id);
        self.items.get_mut(id).start = start;
        self.free_units -= count;
        self.upload_pending |= data.is_some();

        debug!("{} tiles {} created: start {}, count {}, {:?}", self.name, id, start, count, bpp);
        #[cfg(feature = "status-log")]
        self.log_status();

        Ok(id)
    }

    fn free(&mut self, id: u16) {
        let record = self.items.release(id);

        if let Some(data) = record.data {
            let key = TilesKey::new(data, record.bpp);
            if self.index.get(&key) == Some(&id) {
                self.index.remove(&key);
            }
        }

        let position = match self.segments.binary_search_by_key(&record.start, |segment| segment.start) {
            Ok(position) => position,
            Err(_) => panic!("{} tiles {} segment not found", self.name, id),
        };
        self.segments[position].item = None;
        self.free_units += record.count;

        let mut position = position;
        if position + 1 < self.segments.len() && self.segments[position + 1].item.is_none() {
            self.segments[position].count += self.segments[position + 1].count;
            self.remove_segment(position + 1);
        }
        if position > 0 && self.segments[position - 1].item.is_none() {
            self.segments[position - 1].count += self.segments[position].count;
            self.remove_segment(position);
            position -= 1;
        }

        debug!(
            "{} tiles {} freed: start {}, count {}, merged into free segment of {}",
            self.name, id, record.start, record.count, self.segments[position].count
        );
        #[cfg(feature = "status-log")]
        self.log_status();
    }

    // tightest free segment that fits `count` units, with the start to use in it
    fn best_fit(&self, count: u16, bpp: BppMode) -> Option<(usize, u16)> {
        let mut best: Option<(usize, u16, u16)> = None;

        for (position, segment) in self.segments.iter().enumerate() {
            if segment.item.is_some() {
                continue;
            }

            let Some(start) = self.placement_start(segment, count, bpp) else {
                continue;
            };

            let padding = start - segment.start;
            let waste = segment.count - padding - count;
            if best.map_or(true, |(_, _, best_waste)| waste < best_waste) {
                best = Some((position, start, waste));
            }
        }

        best.map(|(position, start, _)| (position, start))
    }

    // first start in a free segment where `count` units fit, if any
    fn placement_start(&self, segment: &Segment, count: u16, bpp: BppMode) -> Option<u16> {
        let end = segment.start as u32 + segment.count as u32;
        let mut start = align_up(segment.start, bpp.units_per_tile()) as u32;

        if self.placement == Placement::Charblocks {
            let window = MAP_CELL_TILES as u32 * bpp.units_per_tile() as u32;
            if count as u32 > window {
                return None;
            }

            let charblock = CHARBLOCK_UNITS as u32;
            if start % charblock + count as u32 > window {
                start = (start / charblock + 1) * charblock;
            }
        }

        if start + count as u32 > end {
            return None;
        }
        Some(start as u16)
    }

    // carves `count` units at `start` for `id` out of a free segment
    fn split(&mut self, position: usize, start: u16, count: u16, id: u16) {
        let free = self.segments[position];
        let padding = start - free.start;
        let tail = free.count - padding - count;

        self.segments[position] = Segment { start, count, item: Some(id) };

        if tail > 0 {
            self.insert_segment(position + 1, Segment { start: start + count, count: tail, item: None });
        }
        if padding > 0 {
            self.insert_segment(position, Segment { start: free.start, count: padding, item: None });
        }
    }

    fn insert_segment(&mut self, position: usize, segment: Segment) {
        if self.segments.push(segment).is_err() {
            panic!("{} tiles segments overflow", self.name);
        }
        self.segments[position..].rotate_right(1);
    }

    fn remove_segment(&mut self, position: usize) {
        self.segments[position..].rotate_left(1);
        self.segments.pop();
    }

    #[cfg(feature = "status-log")]
    fn log_status(&self) {
        trace!("{} tiles: {} / {} units used, {} items", self.name, self.units - self.free_units, self.units, self.items.len());
        for segment in self.segments.iter() {
            match segment.item {
                Some(id) => {
                    let record = self.items.get(id);
                    trace!("  [{}, {}) item {} usages {}", segment.start, segment.start + segment.count, id, record.usages);
                }
                None => trace!("  [{}, {}) free", segment.start, segment.start + segment.count),
            }
        }
    }
}

#[inline(always)]
fn align_up(value: u16, alignment: u16) -> u16 {
    (value + alignment - 1) / alignment * alignment
}
