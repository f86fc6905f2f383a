use slotgfx_core::{FixedPoint, Graphics, SpriteBuilder, SpritePtr};

use crate::assets;

const DIGITS: usize = 5;

/// Score digits in the top right corner. They share one tiles allocation per
/// shown digit value, so a score of 11111 costs one 8x8 graphic.
pub struct Scoreboard {
    digits: Vec<SpritePtr>,
    shown: u32,
}

impl Scoreboard {
    pub fn new(gfx: &Graphics) -> Self {
        let digits = (0..DIGITS)
            .map(|n| {
                SpriteBuilder::new(&assets::DIGITS)
                    .position(FixedPoint::from_ints(80 + n as i32 * 8, -72))
                    .ignore_camera(true)
                    .bg_priority(0)
                    .build(gfx)
            })
            .collect();

        Self { digits, shown: 0 }
    }

    pub fn set_score(&mut self, score: u32) {
        if score == self.shown {
            return;
        }

        let mut value = score;
        for digit in self.digits.iter_mut().rev() {
            digit.set_tiles_item(assets::DIGITS.tiles_item(), (value % 10) as u16);
            value /= 10;
        }
        self.shown = score;
    }
}
