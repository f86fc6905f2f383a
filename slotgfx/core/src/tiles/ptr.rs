use alloc::rc::Rc;
use core::cell::RefCell;
use core::fmt::{Debug, Formatter};

use crate::bpp::BppMode;
use crate::error::{fatal, optional, ResourceError};
use crate::hw::Tile;
use crate::managers::Managers;
use crate::shared::{Resource, Shared};
use crate::tiles::item::{valid_sprite_tiles_count, valid_tiles_count};
use crate::tiles::TileBank;
use crate::Graphics;

/// Selects one of the two tile banks.
pub trait TileBankKind: Resource {
    fn bank(managers: &Managers) -> &TileBank;

    fn bank_mut(managers: &mut Managers) -> &mut TileBank;

    /// The bank and the hardware tile memory it manages.
    fn split(managers: &mut Managers) -> (&mut TileBank, &mut [Tile]);

    fn valid_count(count: usize, bpp: BppMode) -> bool;
}

/// Object tile memory.
#[derive(Debug)]
pub enum SpriteTiles {}

/// Background tile memory.
#[derive(Debug)]
pub enum BgTiles {}

impl Resource for SpriteTiles {
    const NAME: &'static str = "sprite tiles";

    fn increase_usages(managers: &mut Managers, id: u16) {
        managers.sprite_tiles.increase_usages(id);
    }

    fn decrease_usages(managers: &mut Managers, id: u16) {
        managers.sprite_tiles.decrease_usages(id);
    }
}

impl TileBankKind for SpriteTiles {
    fn bank(managers: &Managers) -> &TileBank {
        &managers.sprite_tiles
    }

    fn bank_mut(managers: &mut Managers) -> &mut TileBank {
        &mut managers.sprite_tiles
    }

    fn split(managers: &mut Managers) -> (&mut TileBank, &mut [Tile]) {
        (&mut managers.sprite_tiles, &mut managers.hw.obj_tiles)
    }

    fn valid_count(count: usize, bpp: BppMode) -> bool {
        valid_sprite_tiles_count(count, bpp)
    }
}

impl Resource for BgTiles {
    const NAME: &'static str = "bg tiles";

    fn increase_usages(managers: &mut Managers, id: u16) {
        managers.bg_tiles.increase_usages(id);
    }

    fn decrease_usages(managers: &mut Managers, id: u16) {
        managers.bg_tiles.decrease_usages(id);
    }
}

impl TileBankKind for BgTiles {
    fn bank(managers: &Managers) -> &TileBank {
        &managers.bg_tiles
    }

    fn bank_mut(managers: &mut Managers) -> &mut TileBank {
        &mut managers.bg_tiles
    }

    fn split(managers: &mut Managers) -> (&mut TileBank, &mut [Tile]) {
        (&mut managers.bg_tiles, &mut managers.hw.bg_tiles)
    }

    fn valid_count(count: usize, bpp: BppMode) -> bool {
        valid_tiles_count(count, bpp)
    }
}

/// A shared range of tile memory.
pub struct TilesPtr<B: TileBankKind> {
    shared: Shared<B>,
}

pub type SpriteTilesPtr = TilesPtr<SpriteTiles>;
pub type RegularBgTilesPtr = TilesPtr<BgTiles>;

impl<B: TileBankKind> TilesPtr<B> {
    pub(crate) fn adopt(managers: Rc<RefCell<Managers>>, id: u16) -> Self {
        Self { shared: Shared::adopt(managers, id) }
    }

    pub(crate) fn into_id(self) -> u16 {
        self.shared.into_id()
    }

    pub(crate) fn shared(&self) -> &Shared<B> {
        &self.shared
    }

    fn check_count(count: usize, bpp: BppMode) {
        assert!(B::valid_count(count, bpp), "invalid {} count: {} ({:?})", B::NAME, count, bpp);
    }

    fn try_create(gfx: &Graphics, create: impl FnOnce(&mut TileBank) -> Result<u16, ResourceError>) -> Result<Self, ResourceError> {
        let id = create(B::bank_mut(&mut gfx.managers().borrow_mut()))?;
        Ok(Self::adopt(gfx.managers().clone(), id))
    }

    /// The live range created from `tiles`, if any.
    pub fn find(gfx: &Graphics, tiles: &'static [Tile], bpp: BppMode) -> Option<Self> {
        let id = B::bank_mut(&mut gfx.managers().borrow_mut()).find(tiles, bpp)?;
        Some(Self::adopt(gfx.managers().clone(), id))
    }

    /// Reuses the live range created from `tiles`, or loads them into a new one.
    pub fn create(gfx: &Graphics, tiles: &'static [Tile], bpp: BppMode) -> Self {
        Self::create_optional_impl(gfx, tiles, bpp).unwrap_or_else(|error| fatal(B::NAME, error))
    }

    pub fn create_optional(gfx: &Graphics, tiles: &'static [Tile], bpp: BppMode) -> Option<Self> {
        optional(B::NAME, Self::create_optional_impl(gfx, tiles, bpp))
    }

    fn create_optional_impl(gfx: &Graphics, tiles: &'static [Tile], bpp: BppMode) -> Result<Self, ResourceError> {
        Self::check_count(tiles.len(), bpp);
        Self::try_create(gfx, |bank| bank.create(tiles, bpp))
    }

    /// Loads `tiles` into a new range even if another range already holds them.
    pub fn create_new(gfx: &Graphics, tiles: &'static [Tile], bpp: BppMode) -> Self {
        Self::create_new_optional_impl(gfx, tiles, bpp).unwrap_or_else(|error| fatal(B::NAME, error))
    }

    pub fn create_new_optional(gfx: &Graphics, tiles: &'static [Tile], bpp: BppMode) -> Option<Self> {
        optional(B::NAME, Self::create_new_optional_impl(gfx, tiles, bpp))
    }

    fn create_new_optional_impl(gfx: &Graphics, tiles: &'static [Tile], bpp: BppMode) -> Result<Self, ResourceError> {
        Self::check_count(tiles.len(), bpp);
        Self::try_create(gfx, |bank| bank.create_new(tiles, bpp))
    }

    /// Reserves `count` units without source data. Write them with
    /// [`TilesPtr::with_vram`].
    pub fn allocate(gfx: &Graphics, count: u16, bpp: BppMode) -> Self {
        Self::allocate_optional_impl(gfx, count, bpp).unwrap_or_else(|error| fatal(B::NAME, error))
    }

    pub fn allocate_optional(gfx: &Graphics, count: u16, bpp: BppMode) -> Option<Self> {
        optional(B::NAME, Self::allocate_optional_impl(gfx, count, bpp))
    }

    fn allocate_optional_impl(gfx: &Graphics, count: u16, bpp: BppMode) -> Result<Self, ResourceError> {
        Self::check_count(count as usize, bpp);
        Self::try_create(gfx, |bank| bank.allocate(count, bpp))
    }

    pub fn id(&self) -> u16 {
        self.shared.id()
    }

    /// First tile unit of the range.
    pub fn start_tile(&self) -> u16 {
        self.shared.with(|managers, id| B::bank(managers).start_tile(id))
    }

    pub fn tiles_count(&self) -> u16 {
        self.shared.with(|managers, id| B::bank(managers).tiles_count(id))
    }

    pub fn bpp(&self) -> BppMode {
        self.shared.with(|managers, id| B::bank(managers).bpp(id))
    }

    pub fn usages(&self) -> u16 {
        self.shared.with(|managers, id| B::bank(managers).usages(id))
    }

    /// Source data, `None` for allocated ranges.
    pub fn tiles_ref(&self) -> Option<&'static [Tile]> {
        self.shared.with(|managers, id| B::bank(managers).tiles_ref(id))
    }

    /// Replaces the source data with another tile set of the same size.
    pub fn set_tiles_ref(&mut self, tiles: &'static [Tile]) {
        self.shared.with(|managers, id| B::bank_mut(managers).set_tiles_ref(id, tiles));
    }

    pub fn reload_tiles_ref(&mut self) {
        self.shared.with(|managers, id| B::bank_mut(managers).reload_tiles_ref(id));
    }

    /// Runs `f` over the hardware tiles of an allocated range. Returns `None`
    /// for ranges backed by source data. Dropping a resource
    /// handle inside `f` panics.
    pub fn with_vram<R>(&mut self, f: impl FnOnce(&mut [Tile]) -> R) -> Option<R> {
        self.shared.with(|managers, id| {
            let (bank, hw_tiles) = B::split(managers);
            bank.vram(id, hw_tiles).map(f)
        })
    }
}

impl<B: TileBankKind> Clone for TilesPtr<B> {
    fn clone(&self) -> Self {
        Self { shared: self.shared.clone() }
    }
}

impl<B: TileBankKind> PartialEq for TilesPtr<B> {
    fn eq(&self, other: &Self) -> bool {
        self.shared == other.shared
    }
}

impl<B: TileBankKind> Eq for TilesPtr<B> {}

impl<B: TileBankKind> Debug for TilesPtr<B> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        self.shared.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static FRAME_A: [Tile; 4] = [Tile([0xA; 8]); 4];
    static FRAME_B: [Tile; 4] = [Tile([0xB; 8]); 4];

    #[test]
    fn copies_share_one_range() {
        let gfx = Graphics::new();
        let a = SpriteTilesPtr::create(&gfx, &FRAME_A, BppMode::Bpp4);
        let b = a.clone();
        let c = SpriteTilesPtr::create(&gfx, &FRAME_A, BppMode::Bpp4);

        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a.usages(), 3);

        drop(b);
        drop(c);
        assert_eq!(a.usages(), 1);
        assert_eq!(gfx.sprite_tiles_usage().used_count(), 4);

        drop(a);
        assert_eq!(gfx.sprite_tiles_usage().used_count(), 0);
    }

    #[test]
    fn banks_are_independent() {
        let gfx = Graphics::new();
        let sprite = SpriteTilesPtr::create(&gfx, &FRAME_A, BppMode::Bpp4);
        let bg = RegularBgTilesPtr::create(&gfx, &FRAME_A, BppMode::Bpp4);

        assert_eq!(sprite.start_tile(), 0);
        assert_eq!(bg.start_tile(), 0);
        assert_eq!(gfx.bg_tiles_usage().used_count(), 4);
        assert!(SpriteTilesPtr::find(&gfx, &FRAME_B, BppMode::Bpp4).is_none());
    }

    #[test]
    fn animation_frames_swap_in_place() {
        let gfx = Graphics::new();
        let mut tiles = SpriteTilesPtr::create(&gfx, &FRAME_A, BppMode::Bpp4);
        let start = tiles.start_tile();

        tiles.set_tiles_ref(&FRAME_B);
        assert_eq!(tiles.start_tile(), start);
        assert_eq!(tiles.tiles_ref().map(|data| data.as_ptr()), Some(FRAME_B.as_ptr()));

        gfx.update();
        gfx.hardware(|hw| assert_eq!(hw.obj_tiles[start as usize], FRAME_B[0]));
    }

    #[test]
    fn allocated_tiles_are_written_directly() {
        let gfx = Graphics::new();
        let mut tiles = RegularBgTilesPtr::allocate(&gfx, 2, BppMode::Bpp8);
        let start = tiles.start_tile() as usize;

        let written = tiles.with_vram(|vram| {
            vram[0] = Tile::filled(7);
            vram.len()
        });
        assert_eq!(written, Some(2));
        gfx.hardware(|hw| assert_eq!(hw.bg_tiles[start], Tile::filled(7)));
    }

    #[test]
    #[should_panic(expected = "invalid sprite tiles count")]
    fn sprite_tiles_must_be_an_object_size() {
        static THREE: [Tile; 3] = [Tile([0; 8]); 3];
        let gfx = Graphics::new();
        SpriteTilesPtr::create(&gfx, &THREE, BppMode::Bpp4);
    }
}
