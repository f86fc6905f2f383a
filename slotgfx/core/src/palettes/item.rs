use crate::bpp::BppMode;
use crate::hw::Color;

/// 4bpp palettes are exactly one bank; 8bpp palettes are whole banks, up to
/// the full 256 colors.
pub const fn valid_colors_count(count: usize, bpp: BppMode) -> bool {
    match bpp {
        BppMode::Bpp4 => count == 16,
        BppMode::Bpp8 => count >= 16 && count <= 256 && count % 16 == 0,
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PaletteItem {
    colors: &'static [Color],
    bpp: BppMode,
}

impl PaletteItem {
    pub const fn new(colors: &'static [Color], bpp: BppMode) -> Self {
        assert!(valid_colors_count(colors.len(), bpp), "invalid palette colors count");

        Self { colors, bpp }
    }

    pub const fn colors_ref(&self) -> &'static [Color] {
        self.colors
    }

    pub const fn bpp(&self) -> BppMode {
        self.bpp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors_count_rules() {
        assert!(valid_colors_count(16, BppMode::Bpp4));
        assert!(!valid_colors_count(32, BppMode::Bpp4));
        assert!(valid_colors_count(32, BppMode::Bpp8));
        assert!(valid_colors_count(256, BppMode::Bpp8));
        assert!(!valid_colors_count(20, BppMode::Bpp8));
        assert!(!valid_colors_count(0, BppMode::Bpp8));
    }
}
