use alloc::boxed::Box;
use slotgfx_fixed::{Fixed, FixedPoint};

use crate::affine::AffineMatPool;
use crate::bgs::BgPool;
use crate::config::{BG_TILES_UNITS, SPRITE_TILES_UNITS};
use crate::hw::Hardware;
use crate::palettes::PaletteBank;
use crate::sprites::SpritePool;
use crate::tiles::{Placement, TileBank};

/// Every pool of one graphics context, plus the hardware they commit to.
pub struct Managers {
    pub sprite_tiles: TileBank,
    pub bg_tiles: TileBank,
    pub sprite_palettes: PaletteBank,
    pub bg_palettes: PaletteBank,
    pub affine_mats: AffineMatPool,
    pub sprites: SpritePool,
    pub bgs: BgPool,
    pub camera: FixedPoint,
    pub sprites_mosaic: Fixed,
    pub bgs_mosaic: Fixed,
    pub hw: Box<Hardware>,
}

impl Managers {
    pub fn new() -> Self {
        Self {
            sprite_tiles: TileBank::new("sprite", SPRITE_TILES_UNITS, Placement::Linear),
            bg_tiles: TileBank::new("bg", BG_TILES_UNITS, Placement::Charblocks),
            sprite_palettes: PaletteBank::new("sprite"),
            bg_palettes: PaletteBank::new("bg"),
            affine_mats: AffineMatPool::new(),
            sprites: SpritePool::new(),
            bgs: BgPool::new(),
            camera: FixedPoint::ZERO,
            sprites_mosaic: Fixed::ZERO,
            bgs_mosaic: Fixed::ZERO,
            hw: Hardware::new(),
        }
    }
}

impl Default for Managers {
    fn default() -> Self {
        Self::new()
    }
}
