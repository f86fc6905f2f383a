use crate::hw::{MapCell, MAP_CELLS};
use crate::palettes::PaletteItem;
use crate::tiles::RegularBgTilesItem;

/// A 32x32 cell map.
pub type BgMap = [MapCell; MAP_CELLS];

/// Tiles, palette and map of a regular background.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RegularBgItem {
    tiles: RegularBgTilesItem,
    palette: PaletteItem,
    map: &'static BgMap,
}

impl RegularBgItem {
    pub const fn new(tiles: RegularBgTilesItem, palette: PaletteItem, map: &'static BgMap) -> Self {
        assert!(tiles.bpp() as u8 == palette.bpp() as u8, "background tiles and palette bpp mismatch");

        Self { tiles, palette, map }
    }

    pub const fn tiles_item(&self) -> &RegularBgTilesItem {
        &self.tiles
    }

    pub const fn palette_item(&self) -> &PaletteItem {
        &self.palette
    }

    pub const fn map_ref(&self) -> &'static BgMap {
        self.map
    }
}
