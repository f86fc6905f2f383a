#![cfg_attr(not(any(test, feature = "std")), no_std)]

//! Hardware resource management for tile based handheld video.
//!
//! A [`Graphics`] context owns every pool: tile banks, palette banks, affine
//! matrices, sprites and regular backgrounds. Game code holds counted handles
//! into those pools ([`SpriteTilesPtr`], [`SpritePtr`], ...) and mutates them
//! freely during a frame. [`Graphics::update`] then commits the accumulated
//! state to the simulated [`Hardware`] in one pass.

extern crate alloc;

use alloc::rc::Rc;
use core::cell::RefCell;

pub mod affine;
pub mod bgs;
pub mod bpp;
pub mod commit;
pub mod config;
pub mod error;
pub mod hw;
pub mod managers;
pub mod palettes;
pub mod pool;
pub mod shared;
pub mod sprites;
pub mod tiles;

pub use affine::{AffineMatAttributes, SpriteAffineMatPtr};
pub use bgs::{BgMap, RegularBgItem, RegularBgPtr};
pub use bpp::BppMode;
pub use commit::CommitStats;
pub use error::ResourceError;
pub use hw::{Color, Hardware, MapCell, Tile};
pub use palettes::{BgPalettePtr, PaletteItem, SpritePalettePtr};
pub use pool::PoolUsage;
pub use slotgfx_fixed::{Fixed, FixedPoint};
pub use sprites::{ShapeSize, SpriteBuilder, SpriteItem, SpritePtr};
pub use tiles::{RegularBgTilesItem, RegularBgTilesPtr, SpriteTilesItem, SpriteTilesPtr, TilesUsage};

use managers::Managers;

/// One graphics context. Handles keep it alive, so it can be dropped before
/// them without invalidating anything.
pub struct Graphics {
    managers: Rc<RefCell<Managers>>,
}

impl Graphics {
    pub fn new() -> Self {
        Self { managers: Rc::new(RefCell::new(Managers::new())) }
    }

    pub(crate) fn managers(&self) -> &Rc<RefCell<Managers>> {
        &self.managers
    }

    /// Commits pending changes to hardware. Call once per frame.
    pub fn update(&self) -> CommitStats {
        commit::commit(&mut self.managers.borrow_mut())
    }

    pub fn camera(&self) -> FixedPoint {
        self.managers.borrow().camera
    }

    pub fn set_camera(&self, camera: FixedPoint) {
        let mut managers = self.managers.borrow_mut();
        if managers.camera != camera {
            managers.camera = camera;
            managers.sprites.mark_all_dirty();
            managers.bgs.mark_all_dirty();
        }
    }

    pub fn sprites_mosaic(&self) -> Fixed {
        self.managers.borrow().sprites_mosaic
    }

    /// Stretch in [0, 1).
    pub fn set_sprites_mosaic(&self, stretch: Fixed) {
        assert!(stretch >= Fixed::ZERO && stretch < Fixed::ONE, "invalid mosaic stretch: {}", stretch);
        self.managers.borrow_mut().sprites_mosaic = stretch;
    }

    pub fn bgs_mosaic(&self) -> Fixed {
        self.managers.borrow().bgs_mosaic
    }

    /// Stretch in [0, 1).
    pub fn set_bgs_mosaic(&self, stretch: Fixed) {
        assert!(stretch >= Fixed::ZERO && stretch < Fixed::ONE, "invalid mosaic stretch: {}", stretch);
        self.managers.borrow_mut().bgs_mosaic = stretch;
    }

    /// Read access to the hardware state, as of the last commit. Dropping a
    /// resource handle inside `f` panics.
    pub fn hardware<R>(&self, f: impl FnOnce(&Hardware) -> R) -> R {
        f(&self.managers.borrow().hw)
    }

    pub fn sprite_tiles_usage(&self) -> TilesUsage {
        self.managers.borrow().sprite_tiles.usage()
    }

    pub fn bg_tiles_usage(&self) -> TilesUsage {
        self.managers.borrow().bg_tiles.usage()
    }

    pub fn sprite_palettes_usage(&self) -> PoolUsage {
        self.managers.borrow().sprite_palettes.usage()
    }

    pub fn bg_palettes_usage(&self) -> PoolUsage {
        self.managers.borrow().bg_palettes.usage()
    }

    pub fn affine_mats_usage(&self) -> PoolUsage {
        self.managers.borrow().affine_mats.usage()
    }

    pub fn sprites_usage(&self) -> PoolUsage {
        self.managers.borrow().sprites.usage()
    }

    pub fn bgs_usage(&self) -> PoolUsage {
        self.managers.borrow().bgs.usage()
    }
}

impl Default for Graphics {
    fn default() -> Self {
        Self::new()
    }
}
