use alloc::rc::Rc;
use core::cell::RefCell;
use core::fmt::{Debug, Formatter};
use slotgfx_fixed::Fixed;

use crate::bpp::BppMode;
use crate::error::{fatal, optional, ResourceError};
use crate::hw::Color;
use crate::managers::Managers;
use crate::palettes::item::PaletteItem;
use crate::palettes::PaletteBank;
use crate::shared::{Resource, Shared};
use crate::Graphics;

/// Selects one of the two palette memories.
pub trait PaletteBankKind: Resource {
    fn bank(managers: &Managers) -> &PaletteBank;

    fn bank_mut(managers: &mut Managers) -> &mut PaletteBank;
}

#[derive(Debug)]
pub enum SpritePalettes {}

#[derive(Debug)]
pub enum BgPalettes {}

impl Resource for SpritePalettes {
    const NAME: &'static str = "sprite palette";

    fn increase_usages(managers: &mut Managers, id: u16) {
        managers.sprite_palettes.increase_usages(id);
    }

    fn decrease_usages(managers: &mut Managers, id: u16) {
        managers.sprite_palettes.decrease_usages(id);
    }
}

impl PaletteBankKind for SpritePalettes {
    fn bank(managers: &Managers) -> &PaletteBank {
        &managers.sprite_palettes
    }

    fn bank_mut(managers: &mut Managers) -> &mut PaletteBank {
        &mut managers.sprite_palettes
    }
}

impl Resource for BgPalettes {
    const NAME: &'static str = "bg palette";

    fn increase_usages(managers: &mut Managers, id: u16) {
        managers.bg_palettes.increase_usages(id);
    }

    fn decrease_usages(managers: &mut Managers, id: u16) {
        managers.bg_palettes.decrease_usages(id);
    }
}

impl PaletteBankKind for BgPalettes {
    fn bank(managers: &Managers) -> &PaletteBank {
        &managers.bg_palettes
    }

    fn bank_mut(managers: &mut Managers) -> &mut PaletteBank {
        &mut managers.bg_palettes
    }
}

/// A shared palette bank (or bank run, for 8bpp palettes).
pub struct PalettePtr<P: PaletteBankKind> {
    shared: Shared<P>,
}

pub type SpritePalettePtr = PalettePtr<SpritePalettes>;
pub type BgPalettePtr = PalettePtr<BgPalettes>;

impl<P: PaletteBankKind> PalettePtr<P> {
    pub(crate) fn adopt(managers: Rc<RefCell<Managers>>, id: u16) -> Self {
        Self { shared: Shared::adopt(managers, id) }
    }

    pub(crate) fn into_id(self) -> u16 {
        self.shared.into_id()
    }

    pub(crate) fn shared(&self) -> &Shared<P> {
        &self.shared
    }

    pub fn find(gfx: &Graphics, item: &PaletteItem) -> Option<Self> {
        let id = P::bank_mut(&mut gfx.managers().borrow_mut()).find(item.colors_ref(), item.bpp())?;
        Some(Self::adopt(gfx.managers().clone(), id))
    }

    pub fn create(gfx: &Graphics, item: &PaletteItem) -> Self {
        Self::create_optional_impl(gfx, item, false).unwrap_or_else(|error| fatal(P::NAME, error))
    }

    pub fn create_optional(gfx: &Graphics, item: &PaletteItem) -> Option<Self> {
        optional(P::NAME, Self::create_optional_impl(gfx, item, false))
    }

    pub fn create_new(gfx: &Graphics, item: &PaletteItem) -> Self {
        Self::create_optional_impl(gfx, item, true).unwrap_or_else(|error| fatal(P::NAME, error))
    }

    pub fn create_new_optional(gfx: &Graphics, item: &PaletteItem) -> Option<Self> {
        optional(P::NAME, Self::create_optional_impl(gfx, item, true))
    }

    fn create_optional_impl(gfx: &Graphics, item: &PaletteItem, new: bool) -> Result<Self, ResourceError> {
        let id = {
            let mut managers = gfx.managers().borrow_mut();
            let bank = P::bank_mut(&mut managers);
            if new {
                bank.create_new(item.colors_ref(), item.bpp())?
            } else {
                bank.create(item.colors_ref(), item.bpp())?
            }
        };

        Ok(Self::adopt(gfx.managers().clone(), id))
    }

    pub fn id(&self) -> u16 {
        self.shared.id()
    }

    /// First palette bank taken.
    pub fn bank(&self) -> u8 {
        self.shared.with(|managers, id| P::bank(managers).bank(id))
    }

    pub fn bpp(&self) -> BppMode {
        self.shared.with(|managers, id| P::bank(managers).bpp(id))
    }

    pub fn colors_count(&self) -> u16 {
        self.shared.with(|managers, id| P::bank(managers).colors_count(id))
    }

    pub fn usages(&self) -> u16 {
        self.shared.with(|managers, id| P::bank(managers).usages(id))
    }

    pub fn colors_ref(&self) -> &'static [Color] {
        self.shared.with(|managers, id| P::bank(managers).colors_ref(id))
    }

    pub fn set_colors(&mut self, item: &PaletteItem) {
        self.shared.with(|managers, id| {
            let bank = P::bank_mut(managers);
            assert!(bank.bpp(id) == item.bpp(), "{} bpp mismatch", P::NAME);
            bank.set_colors(id, item.colors_ref());
        });
    }

    pub fn inverted(&self) -> bool {
        self.shared.with(|managers, id| P::bank(managers).inverted(id))
    }

    pub fn set_inverted(&mut self, inverted: bool) {
        self.shared.with(|managers, id| P::bank_mut(managers).set_inverted(id, inverted));
    }

    pub fn grayscale_intensity(&self) -> Fixed {
        self.shared.with(|managers, id| P::bank(managers).grayscale_intensity(id))
    }

    /// Intensity in [0, 1].
    pub fn set_grayscale_intensity(&mut self, intensity: Fixed) {
        self.shared.with(|managers, id| P::bank_mut(managers).set_grayscale_intensity(id, intensity));
    }

    pub fn fade_color(&self) -> Color {
        self.shared.with(|managers, id| P::bank(managers).fade_color(id))
    }

    pub fn fade_intensity(&self) -> Fixed {
        self.shared.with(|managers, id| P::bank(managers).fade_intensity(id))
    }

    /// Intensity in [0, 1].
    pub fn set_fade(&mut self, color: Color, intensity: Fixed) {
        self.shared.with(|managers, id| P::bank_mut(managers).set_fade(id, color, intensity));
    }
}

impl<P: PaletteBankKind> Clone for PalettePtr<P> {
    fn clone(&self) -> Self {
        Self { shared: self.shared.clone() }
    }
}

impl<P: PaletteBankKind> PartialEq for PalettePtr<P> {
    fn eq(&self, other: &Self) -> bool {
        self.shared == other.shared
    }
}

impl<P: PaletteBankKind> Eq for PalettePtr<P> {}

impl<P: PaletteBankKind> Debug for PalettePtr<P> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        self.shared.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static BLUES: [Color; 16] = [Color::from_rgb(0, 0, 20); 16];
    static GRAYS: [Color; 16] = [Color::from_rgb(10, 10, 10); 16];
    static BLUE_ITEM: PaletteItem = PaletteItem::new(&BLUES, BppMode::Bpp4);
    static GRAY_ITEM: PaletteItem = PaletteItem::new(&GRAYS, BppMode::Bpp4);

    #[test]
    fn create_and_create_new() {
        let gfx = Graphics::new();
        let a = SpritePalettePtr::create(&gfx, &BLUE_ITEM);
        let b = SpritePalettePtr::create(&gfx, &BLUE_ITEM);
        let c = SpritePalettePtr::create_new(&gfx, &BLUE_ITEM);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.usages(), 2);
        assert_eq!(gfx.sprite_palettes_usage().used_count(), 2);
        assert_eq!(gfx.bg_palettes_usage().used_count(), 0);
    }

    #[test]
    fn effects_reach_hardware_on_commit() {
        let gfx = Graphics::new();
        let mut palette = BgPalettePtr::create(&gfx, &GRAY_ITEM);
        let start = palette.bank() as usize * 16;

        gfx.update();
        gfx.hardware(|hw| assert_eq!(hw.bg_palettes[start], GRAYS[0]));

        palette.set_fade(Color::BLACK, Fixed::ONE);
        gfx.hardware(|hw| assert_eq!(hw.bg_palettes[start], GRAYS[0]));
        gfx.update();
        gfx.hardware(|hw| assert_eq!(hw.bg_palettes[start], Color::BLACK));
    }

    #[test]
    fn released_bank_is_reused() {
        let gfx = Graphics::new();
        let blue = SpritePalettePtr::create(&gfx, &BLUE_ITEM);
        let bank = blue.bank();
        drop(blue);

        let gray = SpritePalettePtr::create(&gfx, &GRAY_ITEM);
        assert_eq!(gray.bank(), bank);
    }
}
