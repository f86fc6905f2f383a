//! # Simulated video hardware
//!
//! Everything the commit pass writes lands in a [`Hardware`] value: object
//! attribute memory, both tile banks, background screen blocks, both palette
//! memories and the handful of display registers the managers touch.
//!
//! Register layouts follow the usual handheld conventions:
//!
//! | Register    | Bits                                                       |
//! |-------------|------------------------------------------------------------|
//! | OBJ attr 0  | y 0-7, affine 8, double size / hidden 9, mosaic 12, 8bpp 13, shape 14-15 |
//! | OBJ attr 1  | x 0-8, affine index 9-13 (or hflip 12, vflip 13), size 14-15 |
//! | OBJ attr 2  | tile 0-9, priority 10-11, palette bank 12-15               |
//! | BG control  | priority 0-1, char block 2-3, mosaic 6, 8bpp 7, screen block 8-12 |
//! | map cell    | tile 0-9, hflip 10, vflip 11, palette bank 12-15           |

use alloc::boxed::Box;
use bit_field::BitField;
use bitfield::bitfield;
use bytemuck::{Pod, Zeroable};
use slotgfx_fixed::Fixed;

use crate::config::{MAX_BGS, OAM_ENTRIES};

/// One 32 byte unit of tile memory: a whole 4bpp 8x8 tile or half of an 8bpp one.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct Tile(pub [u32; 8]);

impl Tile {
    pub const fn filled(word: u32) -> Self {
        Tile([word; 8])
    }
}

/// A BGR555 color.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct Color(pub u16);

impl Color {
    pub const BLACK: Color = Color(0);
    pub const WHITE: Color = Color::from_rgb(31, 31, 31);

    /// Builds a color from 5 bit channels.
    pub const fn from_rgb(red: u16, green: u16, blue: u16) -> Self {
        Color((red & 0x1F) | ((green & 0x1F) << 5) | ((blue & 0x1F) << 10))
    }

    #[inline(always)]
    pub fn red(self) -> u16 {
        self.0.get_bits(0..5)
    }

    #[inline(always)]
    pub fn green(self) -> u16 {
        self.0.get_bits(5..10)
    }

    #[inline(always)]
    pub fn blue(self) -> u16 {
        self.0.get_bits(10..15)
    }

    pub fn inverted(self) -> Self {
        Color::from_rgb(31 - self.red(), 31 - self.green(), 31 - self.blue())
    }

    /// Moves every channel toward the color's luma by `intensity` in [0, 1].
    pub fn grayscale(self, intensity: Fixed) -> Self {
        let luma = (self.red() * 77 + self.green() * 150 + self.blue() * 29) >> 8;
        let gray = Color::from_rgb(luma, luma, luma);
        self.blend(gray, intensity)
    }

    /// Moves every channel toward `target` by `intensity` in [0, 1].
    pub fn blend(self, target: Color, intensity: Fixed) -> Self {
        let raw = intensity.raw();
        let mix = |from: u16, to: u16| -> u16 {
            let delta = to as i32 - from as i32;
            (from as i32 + ((delta * raw) >> slotgfx_fixed::PRECISION)) as u16
        };

        Color::from_rgb(
            mix(self.red(), target.red()),
            mix(self.green(), target.green()),
            mix(self.blue(), target.blue()),
        )
    }
}

/// One background map entry.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct MapCell(pub u16);

impl MapCell {
    pub const fn new(tile_index: u16) -> Self {
        MapCell(tile_index & 0x3FF)
    }

    pub const fn flipped(self, horizontal: bool, vertical: bool) -> Self {
        MapCell(self.0 | ((horizontal as u16) << 10) | ((vertical as u16) << 11))
    }

    /// Palette bank, only meaningful for 4bpp backgrounds.
    pub const fn with_palette_bank(self, bank: u16) -> Self {
        MapCell((self.0 & 0x0FFF) | ((bank & 0xF) << 12))
    }

    #[inline(always)]
    pub fn tile_index(self) -> u16 {
        self.0.get_bits(0..10)
    }

    #[inline(always)]
    pub fn palette_bank(self) -> u16 {
        self.0.get_bits(12..16)
    }

    /// The cell as the hardware sees it once tiles start at `tile_base` and
    /// 4bpp colors at `palette_bank`.
    pub fn rebased(self, tile_base: u16, palette_bank: Option<u16>) -> u16 {
        let mut raw = self.0;
        raw.set_bits(0..10, (self.tile_index() + tile_base) & 0x3FF);
        if let Some(bank) = palette_bank {
            raw.set_bits(12..16, (self.palette_bank() + bank) & 0xF);
        }
        raw
    }
}

bitfield! {
    #[derive(Copy, Clone, Default, PartialEq, Eq)]
    pub struct ObjAttr0(u16);
    impl Debug;
    u16;
    pub y, set_y: 7, 0;
    pub affine, set_affine: 8;
    /// Double size for affine objects, hidden for regular ones.
    pub double_size_or_hidden, set_double_size_or_hidden: 9;
    pub mosaic, set_mosaic: 12;
    pub bpp8, set_bpp8: 13;
    pub shape, set_shape: 15, 14;
}

bitfield! {
    #[derive(Copy, Clone, Default, PartialEq, Eq)]
    pub struct ObjAttr1(u16);
    impl Debug;
    u16;
    pub x, set_x: 8, 0;
    pub affine_index, set_affine_index: 13, 9;
    pub hflip, set_hflip: 12;
    pub vflip, set_vflip: 13;
    pub size, set_size: 15, 14;
}

bitfield! {
    #[derive(Copy, Clone, Default, PartialEq, Eq)]
    pub struct ObjAttr2(u16);
    impl Debug;
    u16;
    pub tile, set_tile: 9, 0;
    pub priority, set_priority: 11, 10;
    pub palette_bank, set_palette_bank: 15, 12;
}

impl ObjAttr0 {
    pub fn hidden() -> Self {
        let mut attr = ObjAttr0(0);
        attr.set_double_size_or_hidden(true);
        attr
    }
}

/// One object attribute memory entry. The fourth halfword of entries
/// `4n..4n+4` holds affine matrix `n`.
#[repr(C)]
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct ObjAttributes {
    pub attr0: u16,
    pub attr1: u16,
    pub attr2: u16,
    pub affine_param: i16,
}

impl ObjAttributes {
    pub fn is_hidden(&self) -> bool {
        let attr0 = ObjAttr0(self.attr0);
        !attr0.affine() && attr0.double_size_or_hidden()
    }
}

bitflags::bitflags! {
    /// Display control register.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct DisplayControl: u16 {
        /// Object tiles are laid out linearly rather than as a 32x32 grid.
        const OBJ_1D_MAPPING = 1 << 6;
        const BG0            = 1 << 8;
        const BG1            = 1 << 9;
        const BG2            = 1 << 10;
        const BG3            = 1 << 11;
        const OBJ            = 1 << 12;
    }
}

impl DisplayControl {
    pub fn bg(slot: usize) -> Self {
        DisplayControl::from_bits_truncate(1 << (8 + slot))
    }
}

/// Packs a background control register.
pub fn bg_control(priority: u8, char_block: u16, mosaic: bool, bpp8: bool, screen_block: u16) -> u16 {
    let mut value = 0u16;
    value.set_bits(0..2, priority as u16);
    value.set_bits(2..4, char_block);
    value.set_bit(6, mosaic);
    value.set_bit(7, bpp8);
    value.set_bits(8..13, screen_block);
    value
}

/// Packs the mosaic register from background and object stretches in [0, 1).
pub fn mosaic_register(bgs_stretch: Fixed, sprites_stretch: Fixed) -> u16 {
    let size = |stretch: Fixed| (stretch * 16).integer().clamp(0, 15) as u16;
    let mut value = 0u16;
    value.set_bits(0..4, size(bgs_stretch));
    value.set_bits(4..8, size(bgs_stretch));
    value.set_bits(8..12, size(sprites_stretch));
    value.set_bits(12..16, size(sprites_stretch));
    value
}

pub const OBJ_TILES: usize = 1024;
pub const BG_TILES: usize = 2048;
pub const MAP_CELLS: usize = 32 * 32;
pub const PALETTE_COLORS: usize = 256;

/// Background scroll registers.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
pub struct BgOffset {
    pub hofs: u16,
    pub vofs: u16,
}

/// The hardware-visible state.
pub struct Hardware {
    pub oam: [ObjAttributes; OAM_ENTRIES],
    pub obj_tiles: [Tile; OBJ_TILES],
    pub bg_tiles: [Tile; BG_TILES],
    pub bg_maps: [[u16; MAP_CELLS]; MAX_BGS],
    pub obj_palettes: [Color; PALETTE_COLORS],
    pub bg_palettes: [Color; PALETTE_COLORS],
    pub display_control: u16,
    pub bg_control: [u16; MAX_BGS],
    pub bg_offsets: [BgOffset; MAX_BGS],
    pub mosaic: u16,
}

impl Hardware {
    // heap allocated, the tile banks alone are 96KiB
    pub fn new() -> Box<Self> {
        let mut oam = [ObjAttributes::default(); OAM_ENTRIES];
        for entry in oam.iter_mut() {
            entry.attr0 = ObjAttr0::hidden().0;
        }

        Box::new(Self {
            oam,
            obj_tiles: [Tile::default(); OBJ_TILES],
            bg_tiles: [Tile::default(); BG_TILES],
            bg_maps: [[0; MAP_CELLS]; MAX_BGS],
            obj_palettes: [Color::BLACK; PALETTE_COLORS],
            bg_palettes: [Color::BLACK; PALETTE_COLORS],
            display_control: 0,
            bg_control: [0; MAX_BGS],
            bg_offsets: [BgOffset::default(); MAX_BGS],
            mosaic: 0,
        })
    }

    pub fn display_control(&self) -> DisplayControl {
        DisplayControl::from_bits_truncate(self.display_control)
    }

    pub fn oam_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.oam)
    }

    /// Affine matrix `index` as (pa, pb, pc, pd).
    pub fn affine_mat(&self, index: usize) -> [i16; 4] {
        let base = index * 4;
        [
            self.oam[base].affine_param,
            self.oam[base + 1].affine_param,
            self.oam[base + 2].affine_param,
            self.oam[base + 3].affine_param,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_channels() {
        let color = Color::from_rgb(1, 2, 3);
        assert_eq!((color.red(), color.green(), color.blue()), (1, 2, 3));
        assert_eq!(color.inverted(), Color::from_rgb(30, 29, 28));
    }

    #[test]
    fn full_fade_reaches_target() {
        let color = Color::from_rgb(31, 0, 10);
        assert_eq!(color.blend(Color::BLACK, Fixed::ONE), Color::BLACK);
        assert_eq!(color.blend(Color::BLACK, Fixed::ZERO), color);
    }

    #[test]
    fn grayscale_of_white_is_white() {
        assert_eq!(Color::WHITE.grayscale(Fixed::ONE), Color::WHITE);
        assert_eq!(Color::from_rgb(31, 0, 0).grayscale(Fixed::ONE), Color::from_rgb(9, 9, 9));
    }

    #[test]
    fn attribute_packing() {
        let mut attr0 = ObjAttr0(0);
        attr0.set_y(0x1F0 & 0xFF);
        attr0.set_shape(2);
        attr0.set_bpp8(true);
        assert_eq!(attr0.0, 0xF0 | (1 << 13) | (2 << 14));

        let mut attr2 = ObjAttr2(0);
        attr2.set_tile(513);
        attr2.set_priority(3);
        attr2.set_palette_bank(15);
        assert_eq!(attr2.0, 513 | (3 << 10) | (15 << 12));
    }

    #[test]
    fn map_cell_rebase() {
        let cell = MapCell::new(5).flipped(true, false).with_palette_bank(1);
        let raw = cell.rebased(100, Some(14));
        assert_eq!(raw & 0x3FF, 105);
        assert_eq!(raw >> 12, 15);
        assert_ne!(raw & (1 << 10), 0);
    }

    #[test]
    fn bg_control_packing() {
        assert_eq!(bg_control(2, 1, true, true, 3), 2 | (1 << 2) | (1 << 6) | (1 << 7) | (3 << 8));
    }

    #[test]
    fn mosaic_register_clamps() {
        assert_eq!(mosaic_register(Fixed::ZERO, Fixed::ONE), 0xFF00);
        assert_eq!(mosaic_register(Fixed::from_ratio(1, 8), Fixed::ZERO), 0x0022);
    }

    #[test]
    fn new_hardware_hides_every_object() {
        let hw = Hardware::new();
        assert!(hw.oam.iter().all(|entry| entry.is_hidden()));
        assert_eq!(hw.oam_bytes().len(), OAM_ENTRIES * 8);
    }
}
