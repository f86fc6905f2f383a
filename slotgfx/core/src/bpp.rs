/// Bits per pixel of tiles and palettes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BppMode {
    /// 16 colors per pixel, one 32 byte unit per 8x8 tile.
    Bpp4,
    /// 256 colors per pixel, two 32 byte units per 8x8 tile.
    Bpp8,
}

impl BppMode {
    /// Tile units taken by one 8x8 tile.
    #[inline(always)]
    pub const fn units_per_tile(self) -> u16 {
        match self {
            BppMode::Bpp4 => 1,
            BppMode::Bpp8 => 2,
        }
    }

    #[inline(always)]
    pub const fn is_8bpp(self) -> bool {
        matches!(self, BppMode::Bpp8)
    }
}
