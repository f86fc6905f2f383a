use slotgfx_core::{Fixed, FixedPoint, Graphics, RegularBgPtr};

use crate::assets;

/// Scrolling star field with a short mosaic pulse after every hit.
pub struct Starfield {
    bg: RegularBgPtr,
    pulse: u8,
}

impl Starfield {
    pub fn new(gfx: &Graphics) -> Self {
        let mut bg = RegularBgPtr::create(gfx, FixedPoint::ZERO, &assets::STARS);
        bg.set_priority(3);
        bg.set_mosaic_enabled(true);
        Self { bg, pulse: 0 }
    }

    pub fn pulse(&mut self) {
        self.pulse = 12;
    }

    pub fn update(&mut self, gfx: &Graphics) {
        let y = self.bg.y() + Fixed::HALF;
        self.bg.set_y(Fixed::from_raw(y.raw() % Fixed::from_int(256).raw()));

        let stretch = Fixed::from_ratio(self.pulse as i32, 16);
        if gfx.bgs_mosaic() != stretch {
            gfx.set_bgs_mosaic(stretch);
        }
        self.pulse = self.pulse.saturating_sub(1);
    }
}
