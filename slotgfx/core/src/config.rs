//! Compile time capacities.
//!
//! Every pool is a fixed capacity arena, so these are consts rather than
//! runtime settings. Dedup index capacities must be powers of two.

/// Tile units (32 bytes each) in the sprite tile bank.
pub const SPRITE_TILES_UNITS: u16 = 1024;

/// Tile units (32 bytes each) in the background tile bank.
pub const BG_TILES_UNITS: u16 = 2048;

/// Tile units covered by one background character block.
pub const CHARBLOCK_UNITS: u16 = 512;

/// Tiles a background map cell can index, counted from its character block.
pub const MAP_CELL_TILES: u16 = 1024;

/// Live tile ranges per bank.
pub const MAX_TILES_ITEMS: usize = 128;

/// Worst case segment count of a bank: every used range plus the free gaps
/// between them, which are never adjacent to each other.
pub const MAX_TILES_SEGMENTS: usize = MAX_TILES_ITEMS * 2 + 1;

pub const TILES_INDEX_CAPACITY: usize = 256;

/// Palette banks of 16 colors, per palette memory (sprites and backgrounds).
pub const PALETTE_BANKS: usize = 16;

pub const COLORS_PER_BANK: usize = 16;

pub const PALETTES_INDEX_CAPACITY: usize = 16;

/// Hardware affine matrices.
pub const MAX_AFFINE_MATS: usize = 32;

/// Hardware object attribute entries.
pub const OAM_ENTRIES: usize = 128;

/// Live sprite instances. Visible sprites beyond [`OAM_ENTRIES`] are not drawn.
pub const MAX_SPRITES: usize = 128;

/// Hardware backgrounds, which is also the live regular background limit.
pub const MAX_BGS: usize = 4;

pub const DISPLAY_WIDTH: i32 = 240;
pub const DISPLAY_HEIGHT: i32 = 160;
