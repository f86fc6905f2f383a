//! # Sprites
//!
//! A sprite is a record in a fixed pool that holds one usage of a tile range,
//! one of a palette and optionally one of an affine matrix, plus the display
//! attributes the commit pass turns into an OAM entry. Records are shared
//! through [`SpritePtr`] like any other resource; when the last handle goes
//! the record is released and so is everything it held.
//!
//! OAM slots are not owned by sprites. Every commit sorts the visible sprites
//! and hands out entries in that order, so a sprite's entry may move from
//! frame to frame.

mod builder;
mod item;
mod ptr;

pub use builder::SpriteBuilder;
pub use item::{ShapeSize, SpriteItem};
pub use ptr::SpritePtr;

use log::debug;
#[cfg(feature = "status-log")]
use log::trace;
use slotgfx_fixed::FixedPoint;

use crate::config::MAX_SPRITES;
use crate::error::ResourceError;
use crate::managers::Managers;
use crate::pool::{HandlePool, PoolUsage};
use crate::shared::Resource;

#[derive(Debug)]
pub(crate) struct SpriteRecord {
    pub shape_size: ShapeSize,
    pub tiles: u16,
    pub palette: u16,
    pub affine_mat: Option<u16>,
    pub position: FixedPoint,
    pub bg_priority: u8,
    pub z_order: i16,
    pub horizontal_flip: bool,
    pub vertical_flip: bool,
    pub mosaic: bool,
    pub double_size: bool,
    pub visible: bool,
    pub ignore_camera: bool,
    pub remove_affine_mat_when_not_needed: bool,
    pub sequence: u32,
    pub usages: u16,
    pub dirty: bool,
    pub oam_index: Option<u8>,
}

/// Display attributes of a sprite that don't involve other resources.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct SpriteAttributes {
    pub position: FixedPoint,
    pub bg_priority: u8,
    pub z_order: i16,
    pub horizontal_flip: bool,
    pub vertical_flip: bool,
    pub mosaic: bool,
    pub double_size: bool,
    pub visible: bool,
    pub ignore_camera: bool,
    pub remove_affine_mat_when_not_needed: bool,
}

impl SpriteAttributes {
    pub const DEFAULT: SpriteAttributes = SpriteAttributes {
        position: FixedPoint::ZERO,
        bg_priority: 3,
        z_order: 0,
        horizontal_flip: false,
        vertical_flip: false,
        mosaic: false,
        double_size: false,
        visible: true,
        ignore_camera: false,
        remove_affine_mat_when_not_needed: false,
    };
}

pub struct SpritePool {
    items: HandlePool<SpriteRecord, MAX_SPRITES>,
    next_sequence: u32,
    /// OAM entries written by the last commit.
    pub(crate) oam_count: u8,
}

impl SpritePool {
    pub fn new() -> Self {
        Self {
            items: HandlePool::new(),
            next_sequence: 0,
            oam_count: 0,
        }
    }

    pub fn is_full(&self) -> bool {
        self.items.is_full()
    }

    /// Takes over the tile, palette and affine usages passed in.
    pub(crate) fn insert(
        &mut self,
        shape_size: ShapeSize,
        tiles: u16,
        palette: u16,
        affine_mat: Option<u16>,
        attributes: SpriteAttributes,
    ) -> Result<u16, ResourceError> {
        let record = SpriteRecord {
            shape_size,
            tiles,
            palette,
            affine_mat,
            position: attributes.position,
            bg_priority: attributes.bg_priority,
            z_order: attributes.z_order,
            horizontal_flip: attributes.horizontal_flip,
            vertical_flip: attributes.vertical_flip,
            mosaic: attributes.mosaic,
            double_size: attributes.double_size,
            visible: attributes.visible,
            ignore_camera: attributes.ignore_camera,
            remove_affine_mat_when_not_needed: attributes.remove_affine_mat_when_not_needed,
            sequence: self.next_sequence,
            usages: 1,
            dirty: true,
            oam_index: None,
        };
        let id = self.items.allocate(record).map_err(|_| ResourceError::SpritesExhausted)?;
        self.next_sequence = self.next_sequence.wrapping_add(1);

        debug!("sprite {} created: {:?}, tiles {}, palette {}", id, shape_size, tiles, palette);
        #[cfg(feature = "status-log")]
        self.log_status();

        Ok(id)
    }

    pub(crate) fn get(&self, id: u16) -> &SpriteRecord {
        self.items.get(id)
    }

    /// Mutable record access. Marks the sprite for the next commit.
    pub(crate) fn get_mut(&mut self, id: u16) -> &mut SpriteRecord {
        let record = self.items.get_mut(id);
        record.dirty = true;
        record
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (u16, &SpriteRecord)> {
        self.items.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (u16, &mut SpriteRecord)> {
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
        trace!("sprites: {} / {} used", self.items.len(), MAX_SPRITES);
        for (id, record) in self.items.iter() {
            trace!(
                "  sprite {}: {:?} at {:?}, priority {}, z {}, usages {}, oam {:?}",
                id, record.shape_size, record.position, record.bg_priority, record.z_order, record.usages, record.oam_index
            );
        }
    }
}

impl Default for SpritePool {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub enum Sprites {}

impl Resource for Sprites {
    const NAME: &'static str = "sprite";

    fn increase_usages(managers: &mut Managers, id: u16) {
        managers.sprites.items.get_mut(id).usages += 1;
    }

    fn decrease_usages(managers: &mut Managers, id: u16) {
        let record = managers.sprites.items.get_mut(id);
        assert!(record.usages > 0, "sprite {} without usages", id);

        record.usages -= 1;
        if record.usages > 0 {
            return;
        }

        let record = managers.sprites.items.release(id);
        managers.sprite_tiles.decrease_usages(record.tiles);
        managers.sprite_palettes.decrease_usages(record.palette);
        if let Some(affine_mat) = record.affine_mat {
            managers.affine_mats.decrease_usages(affine_mat);
        }

        debug!("sprite {} freed", id);
        #[cfg(feature = "status-log")]
        managers.sprites.log_status();
    }
}
