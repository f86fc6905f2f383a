//! # Palette banks
//!
//! Palette memory is 16 banks of 16 colors. A 4bpp palette takes one bank,
//! counted down from the top; an 8bpp palette takes banks `0..n` because 8bpp
//! pixels always index from color 0. Banks are uniform, so unlike tiles there
//! is nothing to compact.
//!
//! Inversion, grayscale and fades are per palette and are applied to the
//! colors on their way to hardware during the commit pass. The source colors
//! are never modified.

mod item;
mod ptr;

pub use item::{valid_colors_count, PaletteItem};
pub use ptr::{BgPalettePtr, BgPalettes, PaletteBankKind, PalettePtr, SpritePalettePtr, SpritePalettes};

use heapless::FnvIndexMap;
use log::debug;
#[cfg(feature = "status-log")]
use log::trace;
use slotgfx_fixed::Fixed;

use crate::bpp::BppMode;
use crate::config::{COLORS_PER_BANK, PALETTES_INDEX_CAPACITY, PALETTE_BANKS};
use crate::error::ResourceError;
use crate::hw::Color;
use crate::pool::{HandlePool, PoolUsage};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
struct PaletteKey {
    address: usize,
    count: u16,
    bpp: BppMode,
}

impl PaletteKey {
    fn new(colors: &'static [Color], bpp: BppMode) -> Self {
        Self {
            address: colors.as_ptr() as usize,
            count: colors.len() as u16,
            bpp,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Effects {
    inverted: bool,
    grayscale_intensity: Fixed,
    fade_color: Color,
    fade_intensity: Fixed,
}

impl Effects {
    const NONE: Effects = Effects {
        inverted: false,
        grayscale_intensity: Fixed::ZERO,
        fade_color: Color::BLACK,
        fade_intensity: Fixed::ZERO,
    };

    fn apply(&self, color: Color) -> Color {
        let mut color = color;
        if self.grayscale_intensity != Fixed::ZERO {
            color = color.grayscale(self.grayscale_intensity);
        }
        if self.inverted {
            color = color.inverted();
        }
        if self.fade_intensity != Fixed::ZERO {
            color = color.blend(self.fade_color, self.fade_intensity);
        }
        color
    }
}

#[derive(Debug)]
struct PaletteRecord {
    colors: &'static [Color],
    bpp: BppMode,
    bank: u8,
    usages: u16,
    effects: Effects,
    upload: bool,
}

impl PaletteRecord {
    fn banks_count(&self) -> usize {
        self.colors.len() / COLORS_PER_BANK
    }
}

pub struct PaletteBank {
    name: &'static str,
    banks: [Option<u16>; PALETTE_BANKS],
    items: HandlePool<PaletteRecord, PALETTE_BANKS>,
    index: FnvIndexMap<PaletteKey, u16, PALETTES_INDEX_CAPACITY>,
    upload_pending: bool,
}

impl PaletteBank {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            banks: [None; PALETTE_BANKS],
            items: HandlePool::new(),
            index: FnvIndexMap::new(),
            upload_pending: false,
        }
    }

    pub fn find(&mut self, colors: &'static [Color], bpp: BppMode) -> Option<u16> {
        let id = *self.index.get(&PaletteKey::new(colors, bpp))?;
        self.increase_usages(id);
        Some(id)
    }

    pub fn create(&mut self, colors: &'static [Color], bpp: BppMode) -> Result<u16, ResourceError> {
        if let Some(id) = self.find(colors, bpp) {
            return Ok(id);
        }

        self.create_new(colors, bpp)
    }

    pub fn create_new(&mut self, colors: &'static [Color], bpp: BppMode) -> Result<u16, ResourceError> {
        assert!(
            valid_colors_count(colors.len(), bpp),
            "invalid {} colors count: {} ({:?})", self.name, colors.len(), bpp
        );

        let banks_count = colors.len() / COLORS_PER_BANK;
        let bank = self.free_bank(bpp, banks_count).ok_or(ResourceError::PaletteBanksExhausted)?;

        let record = PaletteRecord {
            colors,
            bpp,
            bank: bank as u8,
            usages: 1,
            effects: Effects::NONE,
            upload: true,
        };
        let id = self.items.allocate(record).map_err(|_| ResourceError::PaletteBanksExhausted)?;

        for slot in &mut self.banks[bank..bank + banks_count] {
            *slot = Some(id);
        }

        let key = PaletteKey::new(colors, bpp);
        if !self.index.contains_key(&key) && self.index.insert(key, id).is_err() {
            panic!("{} palettes index full", self.name);
        }
        self.upload_pending = true;

        debug!("{} palette {} created: bank {}, {} colors, {:?}", self.name, id, bank, colors.len(), bpp);
        #[cfg(feature = "status-log")]
        self.log_status();

        Ok(id)
    }

    pub fn increase_usages(&mut self, id: u16) {
        self.items.get_mut(id).usages += 1;
    }

    pub fn decrease_usages(&mut self, id: u16) {
        let record = self.items.get_mut(id);
        assert!(record.usages > 0, "{} palette {} without usages", self.name, id);

        record.usages -= 1;
        if record.usages == 0 {
            self.free(id);
        }
    }

    pub fn bank(&self, id: u16) -> u8 {
        self.items.get(id).bank
    }

    pub fn bpp(&self, id: u16) -> BppMode {
        self.items.get(id).bpp
    }

    pub fn colors_count(&self, id: u16) -> u16 {
        self.items.get(id).colors.len() as u16
    }

    pub fn usages(&self, id: u16) -> u16 {
        self.items.get(id).usages
    }

    pub fn colors_ref(&self, id: u16) -> &'static [Color] {
        self.items.get(id).colors
    }

    /// Replaces the colors of a palette with others taking the same banks.
    pub fn set_colors(&mut self, id: u16, colors: &'static [Color]) {
        let record = self.items.get(id);
        assert!(
            colors.len() == record.colors.len(),
            "{} palette colors count mismatch: {} != {}", self.name, colors.len(), record.colors.len()
        );

        let old = PaletteKey::new(record.colors, record.bpp);
        let new = PaletteKey::new(colors, record.bpp);
        if old == new {
            return;
        }

        if self.index.get(&old) == Some(&id) {
            self.index.remove(&old);
        }
        if !self.index.contains_key(&new) && self.index.insert(new, id).is_err() {
            panic!("{} palettes index full", self.name);
        }

        let record = self.items.get_mut(id);
        record.colors = colors;
        record.upload = true;
        self.upload_pending = true;
    }

    pub fn inverted(&self, id: u16) -> bool {
        self.items.get(id).effects.inverted
    }

    pub fn set_inverted(&mut self, id: u16, inverted: bool) {
        self.update_effects(id, |effects| effects.inverted = inverted);
    }

    pub fn grayscale_intensity(&self, id: u16) -> Fixed {
        self.items.get(id).effects.grayscale_intensity
    }

    pub fn set_grayscale_intensity(&mut self, id: u16, intensity: Fixed) {
        check_intensity(intensity);
        self.update_effects(id, |effects| effects.grayscale_intensity = intensity);
    }

    pub fn fade_color(&self, id: u16) -> Color {
        self.items.get(id).effects.fade_color
    }

    pub fn fade_intensity(&self, id: u16) -> Fixed {
        self.items.get(id).effects.fade_intensity
    }

    pub fn set_fade(&mut self, id: u16, color: Color, intensity: Fixed) {
        check_intensity(intensity);
        self.update_effects(id, |effects| {
            effects.fade_color = color;
            effects.fade_intensity = intensity;
        });
    }

    pub fn usage(&self) -> PoolUsage {
        PoolUsage {
            used: self.banks.iter().filter(|bank| bank.is_some()).count() as u16,
            capacity: PALETTE_BANKS as u16,
        }
    }

    /// Writes pending palettes to hardware palette memory. Returns the amount
    /// of colors written.
    pub fn upload(&mut self, hw_colors: &mut [Color]) -> u16 {
        if !self.upload_pending {
            return 0;
        }

        let mut uploaded = 0;
        for (_, record) in self.items.iter_mut() {
            if !record.upload {
                continue;
            }

            let start = record.bank as usize * COLORS_PER_BANK;
            let target = &mut hw_colors[start..start + record.colors.len()];
            for (hw_color, color) in target.iter_mut().zip(record.colors) {
                *hw_color = record.effects.apply(*color);
            }

            uploaded += record.colors.len() as u16;
            record.upload = false;
        }

        self.upload_pending = false;
        uploaded
    }

    fn update_effects(&mut self, id: u16, update: impl FnOnce(&mut Effects)) {
        let record = self.items.get_mut(id);
        let before = record.effects;
        update(&mut record.effects);

        if record.effects != before {
            record.upload = true;
            self.upload_pending = true;
        }
    }

    fn free_bank(&self, bpp: BppMode, banks_count: usize) -> Option<usize> {
        match bpp {
            BppMode::Bpp4 => (0..PALETTE_BANKS).rev().find(|bank| self.banks[*bank].is_none()),
            BppMode::Bpp8 => self.banks[..banks_count].iter().all(Option::is_none).then_some(0),
        }
    }

    fn free(&mut self, id: u16) {
        let record = self.items.release(id);

        let key = PaletteKey::new(record.colors, record.bpp);
        if self.index.get(&key) == Some(&id) {
            self.index.remove(&key);
        }

        let bank = record.bank as usize;
        for slot in &mut self.banks[bank..bank + record.banks_count()] {
            *slot = None;
        }

        debug!("{} palette {} freed: bank {}", self.name, id, bank);
        #[cfg(feature = "status-log")]
        self.log_status();
    }

    #[cfg(feature = "status-log")]
    fn log_status(&self) {
        trace!("{} palettes: {} / {} banks used", self.name, self.usage().used, PALETTE_BANKS);
        for (id, record) in self.items.iter() {
            trace!("  palette {}: bank {}, {} colors, usages {}", id, record.bank, record.colors.len(), record.usages);
        }
    }
}

fn check_intensity(intensity: Fixed) {
    assert!(
        intensity >= Fixed::ZERO && intensity <= Fixed::ONE,
        "invalid palette effect intensity: {}", intensity
    );
}
