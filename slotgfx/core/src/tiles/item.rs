use crate::bpp::BppMode;
use crate::hw::Tile;

/// Whether a background tile set of `count` units fits its bank.
pub const fn valid_tiles_count(count: usize, bpp: BppMode) -> bool {
    match bpp {
        BppMode::Bpp4 => count > 0 && count <= 1024,
        BppMode::Bpp8 => count > 0 && count <= 2048 && count % 2 == 0,
    }
}

/// Whether one sprite graphic of `count` units is a valid object size.
pub const fn valid_sprite_tiles_count(count: usize, bpp: BppMode) -> bool {
    match bpp {
        BppMode::Bpp4 => count > 0 && count <= 64 && count.is_power_of_two(),
        BppMode::Bpp8 => count >= 2 && count <= 128 && count.is_power_of_two(),
    }
}

/// Tiles of one or more same sized sprite graphics, stored back to back.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SpriteTilesItem {
    tiles: &'static [Tile],
    bpp: BppMode,
    graphics_count: u16,
}

impl SpriteTilesItem {
    pub const fn new(tiles: &'static [Tile], bpp: BppMode, graphics_count: u16) -> Self {
        assert!(graphics_count > 0, "sprite tiles without graphics");
        assert!(tiles.len() % graphics_count as usize == 0, "sprite tiles not evenly split into graphics");
        assert!(
            valid_sprite_tiles_count(tiles.len() / graphics_count as usize, bpp),
            "invalid sprite tiles count"
        );

        Self { tiles, bpp, graphics_count }
    }

    pub const fn tiles_ref(&self) -> &'static [Tile] {
        self.tiles
    }

    pub const fn bpp(&self) -> BppMode {
        self.bpp
    }

    pub const fn graphics_count(&self) -> u16 {
        self.graphics_count
    }

    /// Tile units of a single graphic.
    pub const fn graphic_tiles_count(&self) -> u16 {
        (self.tiles.len() / self.graphics_count as usize) as u16
    }

    pub fn graphic_tiles_ref(&self, graphics_index: u16) -> &'static [Tile] {
        assert!(
            graphics_index < self.graphics_count,
            "invalid graphics index: {} (count {})", graphics_index, self.graphics_count
        );

        let count = self.graphic_tiles_count() as usize;
        let start = graphics_index as usize * count;
        &self.tiles[start..start + count]
    }
}

/// Tiles of a regular background.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RegularBgTilesItem {
    tiles: &'static [Tile],
    bpp: BppMode,
}

impl RegularBgTilesItem {
    pub const fn new(tiles: &'static [Tile], bpp: BppMode) -> Self {
        assert!(valid_tiles_count(tiles.len(), bpp), "invalid background tiles count");

        Self { tiles, bpp }
    }

    pub const fn tiles_ref(&self) -> &'static [Tile] {
        self.tiles
    }

    pub const fn bpp(&self) -> BppMode {
        self.bpp
    }

    pub const fn tiles_count(&self) -> u16 {
        self.tiles.len() as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiles_count_boundaries() {
        assert!(!valid_tiles_count(0, BppMode::Bpp4));
        assert!(!valid_tiles_count(0, BppMode::Bpp8));
        assert!(valid_tiles_count(2048, BppMode::Bpp8));
        assert!(!valid_tiles_count(2049, BppMode::Bpp8));
        assert!(!valid_tiles_count(1, BppMode::Bpp8));
        assert!(valid_tiles_count(1, BppMode::Bpp4));
        assert!(valid_tiles_count(1024, BppMode::Bpp4));
        assert!(!valid_tiles_count(1025, BppMode::Bpp4));
    }

    #[test]
    fn sprite_tiles_count_is_an_object_size() {
        assert!(valid_sprite_tiles_count(1, BppMode::Bpp4));
        assert!(valid_sprite_tiles_count(64, BppMode::Bpp4));
        assert!(!valid_sprite_tiles_count(3, BppMode::Bpp4));
        assert!(!valid_sprite_tiles_count(128, BppMode::Bpp4));
        assert!(!valid_sprite_tiles_count(1, BppMode::Bpp8));
        assert!(valid_sprite_tiles_count(128, BppMode::Bpp8));
    }

    static FRAMES: [Tile; 12] = [Tile([0; 8]); 12];

    #[test]
    fn graphics_are_contiguous_slices() {
        let item = SpriteTilesItem::new(&FRAMES, BppMode::Bpp4, 3);
        assert_eq!(item.graphic_tiles_count(), 4);

        let second = item.graphic_tiles_ref(1);
        assert_eq!(second.as_ptr(), FRAMES[4..].as_ptr());
        assert_eq!(second.len(), 4);
    }

    #[test]
    #[should_panic(expected = "invalid graphics index")]
    fn graphics_index_is_checked() {
        SpriteTilesItem::new(&FRAMES, BppMode::Bpp4, 3).graphic_tiles_ref(3);
    }

    #[test]
    #[should_panic(expected = "invalid sprite tiles count")]
    fn odd_sized_graphics_are_rejected() {
        SpriteTilesItem::new(&FRAMES, BppMode::Bpp4, 4);
    }
}
