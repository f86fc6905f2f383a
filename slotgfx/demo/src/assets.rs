//! Build time asset data. A real game gets these from an asset converter;
//! here they are generated procedurally so the demo has no input files.

use slotgfx_core::hw::MAP_CELLS;
use slotgfx_core::{
    BgMap, BppMode, Color, MapCell, PaletteItem, RegularBgItem, RegularBgTilesItem, ShapeSize, SpriteItem,
    SpriteTilesItem, Tile,
};

/// Every pixel of a 4bpp tile set to color `index`.
const fn solid(index: u32) -> Tile {
    let nibble = index & 0xF;
    Tile::filled(nibble * 0x1111_1111)
}

const fn lerp_channel(from: Color, to: Color, shift: u16, step: u16) -> u16 {
    let a = (from.0 >> shift) & 0x1F;
    let b = (to.0 >> shift) & 0x1F;
    (a * (15 - step) + b * step) / 15
}

const fn ramp(from: Color, to: Color) -> [Color; 16] {
    let mut colors = [Color::BLACK; 16];
    let mut index = 0;
    while index < 16 {
        let step = index as u16;
        colors[index] = Color::from_rgb(
            lerp_channel(from, to, 0, step),
            lerp_channel(from, to, 5, step),
            lerp_channel(from, to, 10, step),
        );
        index += 1;
    }
    colors
}

static DIGITS_TILES: [Tile; 10] = {
    let mut tiles = [Tile::filled(0); 10];
    let mut digit = 0;
    while digit < 10 {
        tiles[digit] = solid(digit as u32 + 1);
        digit += 1;
    }
    tiles
};

static DIGITS_COLORS: [Color; 16] = ramp(Color::from_rgb(31, 31, 0), Color::WHITE);

/// Ten 8x8 graphics, one per decimal digit.
pub static DIGITS: SpriteItem = SpriteItem::new(
    ShapeSize::Square8x8,
    SpriteTilesItem::new(&DIGITS_TILES, BppMode::Bpp4, 10),
    PaletteItem::new(&DIGITS_COLORS, BppMode::Bpp4),
);

static SHIP_TILES: [Tile; 8] = {
    let mut tiles = [Tile::filled(0); 8];
    let mut index = 0;
    while index < 8 {
        tiles[index] = solid(if index < 4 { 3 } else { 7 });
        index += 1;
    }
    tiles
};

static SHIP_COLORS: [Color; 16] = ramp(Color::from_rgb(4, 4, 12), Color::from_rgb(31, 8, 4));

/// Enemy ship, 16x16 with two thruster frames.
pub static SHIP: SpriteItem = SpriteItem::new(
    ShapeSize::Square16x16,
    SpriteTilesItem::new(&SHIP_TILES, BppMode::Bpp4, 2),
    PaletteItem::new(&SHIP_COLORS, BppMode::Bpp4),
);

static STARS_TILES: [Tile; 32] = {
    let mut tiles = [Tile::filled(0); 32];
    let mut index = 0;
    while index < 32 {
        tiles[index] = solid(index as u32 % 16);
        index += 1;
    }
    tiles
};

static STARS_COLORS: [Color; 16] = ramp(Color::BLACK, Color::from_rgb(20, 24, 31));

static STARS_MAP: BgMap = {
    let mut map = [MapCell::new(0); MAP_CELLS];
    let mut index = 0;
    while index < MAP_CELLS {
        let (x, y) = (index % 32, index / 32);
        let tile = (x * 7 + y * 13) % 32;
        map[index] = MapCell::new(tile as u16).flipped(x % 3 == 0, y % 5 == 0);
        index += 1;
    }
    map
};

/// Star field, scrolled vertically.
pub static STARS: RegularBgItem = RegularBgItem::new(
    RegularBgTilesItem::new(&STARS_TILES, BppMode::Bpp4),
    PaletteItem::new(&STARS_COLORS, BppMode::Bpp4),
    &STARS_MAP,
);
