use crate::bpp::BppMode;
use crate::palettes::PaletteItem;
use crate::tiles::SpriteTilesItem;

/// Object shape and size, as the hardware encodes them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ShapeSize {
    Square8x8,
    Square16x16,
    Square32x32,
    Square64x64,
    Wide16x8,
    Wide32x8,
    Wide32x16,
    Wide64x32,
    Tall8x16,
    Tall8x32,
    Tall16x32,
    Tall32x64,
}

impl ShapeSize {
    /// Shape bits of OBJ attribute 0: square, wide or tall.
    pub const fn shape(self) -> u16 {
        match self {
            ShapeSize::Square8x8 | ShapeSize::Square16x16 | ShapeSize::Square32x32 | ShapeSize::Square64x64 => 0,
            ShapeSize::Wide16x8 | ShapeSize::Wide32x8 | ShapeSize::Wide32x16 | ShapeSize::Wide64x32 => 1,
            ShapeSize::Tall8x16 | ShapeSize::Tall8x32 | ShapeSize::Tall16x32 | ShapeSize::Tall32x64 => 2,
        }
    }

    /// Size bits of OBJ attribute 1.
    pub const fn size(self) -> u16 {
        match self {
            ShapeSize::Square8x8 | ShapeSize::Wide16x8 | ShapeSize::Tall8x16 => 0,
            ShapeSize::Square16x16 | ShapeSize::Wide32x8 | ShapeSize::Tall8x32 => 1,
            ShapeSize::Square32x32 | ShapeSize::Wide32x16 | ShapeSize::Tall16x32 => 2,
            ShapeSize::Square64x64 | ShapeSize::Wide64x32 | ShapeSize::Tall32x64 => 3,
        }
    }

    pub const fn width(self) -> i32 {
        match self {
            ShapeSize::Square8x8 | ShapeSize::Tall8x16 | ShapeSize::Tall8x32 => 8,
            ShapeSize::Square16x16 | ShapeSize::Wide16x8 | ShapeSize::Tall16x32 => 16,
            ShapeSize::Square32x32 | ShapeSize::Wide32x8 | ShapeSize::Wide32x16 | ShapeSize::Tall32x64 => 32,
            ShapeSize::Square64x64 | ShapeSize::Wide64x32 => 64,
        }
    }

    pub const fn height(self) -> i32 {
        match self {
            ShapeSize::Square8x8 | ShapeSize::Wide16x8 | ShapeSize::Wide32x8 => 8,
            ShapeSize::Square16x16 | ShapeSize::Wide32x16 | ShapeSize::Tall8x16 => 16,
            ShapeSize::Square32x32 | ShapeSize::Wide64x32 | ShapeSize::Tall8x32 | ShapeSize::Tall16x32 => 32,
            ShapeSize::Square64x64 | ShapeSize::Tall32x64 => 64,
        }
    }

    /// Tile units one graphic of this size takes.
    pub const fn tiles_count(self, bpp: BppMode) -> u16 {
        ((self.width() * self.height()) / 64) as u16 * bpp.units_per_tile()
    }
}

/// Everything needed to show a sprite: its size, its tiles and its palette.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SpriteItem {
    shape_size: ShapeSize,
    tiles: SpriteTilesItem,
    palette: PaletteItem,
}

impl SpriteItem {
    pub const fn new(shape_size: ShapeSize, tiles: SpriteTilesItem, palette: PaletteItem) -> Self {
        assert!(
            tiles.graphic_tiles_count() == shape_size.tiles_count(tiles.bpp()),
            "sprite tiles don't match the shape size"
        );
        assert!(tiles.bpp() as u8 == palette.bpp() as u8, "sprite tiles and palette bpp mismatch");

        Self { shape_size, tiles, palette }
    }

    pub const fn shape_size(&self) -> ShapeSize {
        self.shape_size
    }

    pub const fn tiles_item(&self) -> &SpriteTilesItem {
        &self.tiles
    }

    pub const fn palette_item(&self) -> &PaletteItem {
        &self.palette
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_size_geometry() {
        assert_eq!((ShapeSize::Wide32x16.width(), ShapeSize::Wide32x16.height()), (32, 16));
        assert_eq!((ShapeSize::Tall8x32.shape(), ShapeSize::Tall8x32.size()), (2, 1));
        assert_eq!(ShapeSize::Square16x16.tiles_count(BppMode::Bpp4), 4);
        assert_eq!(ShapeSize::Square64x64.tiles_count(BppMode::Bpp8), 128);
    }
}
