use alloc::rc::Rc;
use core::cell::RefCell;
use core::fmt::{Debug, Formatter};
use slotgfx_fixed::{Fixed, FixedPoint};

use crate::bgs::item::{BgMap, RegularBgItem};
use crate::bgs::{BgRecord, Bgs};
use crate::error::{fatal, optional, ResourceError};
use crate::managers::Managers;
use crate::palettes::{BgPalettePtr, BgPalettes, PaletteItem};
use crate::shared::{Resource, Shared};
use crate::tiles::{BgTiles, RegularBgTilesItem, RegularBgTilesPtr};
use crate::Graphics;

/// A shared regular background.
pub struct RegularBgPtr {
    shared: Shared<Bgs>,
}

impl RegularBgPtr {
    pub(crate) fn adopt(managers: Rc<RefCell<Managers>>, id: u16) -> Self {
        Self { shared: Shared::adopt(managers, id) }
    }

    pub fn create(gfx: &Graphics, position: FixedPoint, item: &RegularBgItem) -> Self {
        Self::create_impl(gfx, position, item).unwrap_or_else(|error| fatal(Bgs::NAME, error))
    }

    pub fn create_optional(gfx: &Graphics, position: FixedPoint, item: &RegularBgItem) -> Option<Self> {
        optional(Bgs::NAME, Self::create_impl(gfx, position, item))
    }

    fn create_impl(gfx: &Graphics, position: FixedPoint, item: &RegularBgItem) -> Result<Self, ResourceError> {
        let id = {
            let mut managers = gfx.managers().borrow_mut();
            let managers = &mut *managers;

            if managers.bgs.is_full() {
                return Err(ResourceError::BgsExhausted);
            }

            let (tiles, palette) = create_tiles_and_palette(managers, item.tiles_item(), item.palette_item())?;
            managers.bgs.insert(tiles, palette, item.map_ref(), position)?
        };

        Ok(Self::adopt(gfx.managers().clone(), id))
    }

    pub fn id(&self) -> u16 {
        self.shared.id()
    }

    fn read<R>(&self, f: impl FnOnce(&BgRecord) -> R) -> R {
        self.shared.with(|managers, id| f(managers.bgs.get(id)))
    }

    fn update(&mut self, f: impl FnOnce(&mut BgRecord)) {
        self.shared.with(|managers, id| f(managers.bgs.get_mut(id)));
    }

    pub fn usages(&self) -> u16 {
        self.read(|record| record.usages)
    }

    /// Width and height in pixels.
    pub fn dimensions(&self) -> (i32, i32) {
        (256, 256)
    }

    pub fn tiles(&self) -> RegularBgTilesPtr {
        let id = self.shared.with(|managers, id| {
            let tiles = managers.bgs.get(id).tiles;
            managers.bg_tiles.increase_usages(tiles);
            tiles
        });
        RegularBgTilesPtr::adopt(self.shared.managers().clone(), id)
    }

    pub fn set_tiles(&mut self, tiles: RegularBgTilesPtr) {
        assert!(tiles.shared().same_context(self.shared.managers()), "bg tiles from another context");
        self.shared.with(|managers, id| {
            let palette = managers.bgs.get(id).palette;
            assert!(
                managers.bg_tiles.bpp(tiles.id()) == managers.bg_palettes.bpp(palette),
                "background tiles and palette bpp mismatch"
            );
        });

        let tiles = tiles.into_id();
        self.shared.with(|managers, id| {
            let record = managers.bgs.get_mut(id);
            record.map_dirty = true;
            let old = core::mem::replace(&mut record.tiles, tiles);
            managers.bg_tiles.decrease_usages(old);
        });
    }

    pub fn set_tiles_item(&mut self, item: &RegularBgTilesItem) {
        let result = self.shared.with(|managers, id| -> Result<(), ResourceError> {
            let palette = managers.bgs.get(id).palette;
            assert!(
                item.bpp() == managers.bg_palettes.bpp(palette),
                "background tiles and palette bpp mismatch"
            );

            let tiles = managers.bg_tiles.create(item.tiles_ref(), item.bpp())?;
            let record = managers.bgs.get_mut(id);
            record.map_dirty = true;
            let old = core::mem::replace(&mut record.tiles, tiles);
            managers.bg_tiles.decrease_usages(old);
            Ok(())
        });
        result.unwrap_or_else(|error| fatal(BgTiles::NAME, error));
    }

    pub fn palette(&self) -> BgPalettePtr {
        let id = self.shared.with(|managers, id| {
            let palette = managers.bgs.get(id).palette;
            managers.bg_palettes.increase_usages(palette);
            palette
        });
        BgPalettePtr::adopt(self.shared.managers().clone(), id)
    }

    pub fn set_palette(&mut self, palette: BgPalettePtr) {
        assert!(palette.shared().same_context(self.shared.managers()), "bg palette from another context");
        self.shared.with(|managers, id| {
            let tiles = managers.bgs.get(id).tiles;
            assert!(
                managers.bg_tiles.bpp(tiles) == managers.bg_palettes.bpp(palette.id()),
                "background tiles and palette bpp mismatch"
            );
        });

        let palette = palette.into_id();
        self.shared.with(|managers, id| {
            let record = managers.bgs.get_mut(id);
            record.map_dirty = true;
            let old = core::mem::replace(&mut record.palette, palette);
            managers.bg_palettes.decrease_usages(old);
        });
    }

    pub fn set_palette_item(&mut self, item: &PaletteItem) {
        let result = self.shared.with(|managers, id| -> Result<(), ResourceError> {
            let tiles = managers.bgs.get(id).tiles;
            assert!(
                managers.bg_tiles.bpp(tiles) == item.bpp(),
                "background tiles and palette bpp mismatch"
            );

            let palette = managers.bg_palettes.create(item.colors_ref(), item.bpp())?;
            let record = managers.bgs.get_mut(id);
            record.map_dirty = true;
            let old = core::mem::replace(&mut record.palette, palette);
            managers.bg_palettes.decrease_usages(old);
            Ok(())
        });
        result.unwrap_or_else(|error| fatal(BgPalettes::NAME, error));
    }

    pub fn map_ref(&self) -> &'static BgMap {
        self.read(|record| record.map)
    }

    pub fn set_map(&mut self, map: &'static BgMap) {
        self.update(|record| {
            record.map = map;
            record.map_dirty = true;
        });
    }

    /// Switches tiles, palette and map at once. Nothing changes when the new
    /// tiles or palette can't be created.
    pub fn set_item(&mut self, item: &RegularBgItem) {
        let result = self.shared.with(|managers, id| -> Result<(), ResourceError> {
            let (tiles, palette) = create_tiles_and_palette(managers, item.tiles_item(), item.palette_item())?;

            let record = managers.bgs.get_mut(id);
            record.map = item.map_ref();
            record.map_dirty = true;
            let old_tiles = core::mem::replace(&mut record.tiles, tiles);
            let old_palette = core::mem::replace(&mut record.palette, palette);
            managers.bg_tiles.decrease_usages(old_tiles);
            managers.bg_palettes.decrease_usages(old_palette);
            Ok(())
        });
        result.unwrap_or_else(|error| fatal(Bgs::NAME, error));
    }

    pub fn position(&self) -> FixedPoint {
        self.read(|record| record.position)
    }

    pub fn set_position(&mut self, position: FixedPoint) {
        self.update(|record| record.position = position);
    }

    pub fn x(&self) -> Fixed {
        self.position().x
    }

    pub fn set_x(&mut self, x: Fixed) {
        self.update(|record| record.position.x = x);
    }

    pub fn y(&self) -> Fixed {
        self.position().y
    }

    pub fn set_y(&mut self, y: Fixed) {
        self.update(|record| record.position.y = y);
    }

    pub fn priority(&self) -> u8 {
        self.read(|record| record.priority)
    }

    /// In [0, 3]. Lower is drawn on top.
    pub fn set_priority(&mut self, priority: u8) {
        assert!(priority <= 3, "invalid bg priority: {}", priority);
        self.update(|record| record.priority = priority);
    }

    pub fn z_order(&self) -> i16 {
        self.read(|record| record.z_order)
    }

    pub fn set_z_order(&mut self, z_order: i16) {
        self.update(|record| record.z_order = z_order);
    }

    pub fn visible(&self) -> bool {
        self.read(|record| record.visible)
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.update(|record| record.visible = visible);
    }

    pub fn mosaic_enabled(&self) -> bool {
        self.read(|record| record.mosaic)
    }

    pub fn set_mosaic_enabled(&mut self, enabled: bool) {
        self.update(|record| record.mosaic = enabled);
    }

    pub fn ignore_camera(&self) -> bool {
        self.read(|record| record.ignore_camera)
    }

    pub fn set_ignore_camera(&mut self, ignore: bool) {
        self.update(|record| record.ignore_camera = ignore);
    }

    /// Hardware background used by the last commit.
    pub fn hw_index(&self) -> Option<u8> {
        self.read(|record| record.hw_slot)
    }
}

// Creates both or neither.
fn create_tiles_and_palette(
    managers: &mut Managers,
    tiles_item: &RegularBgTilesItem,
    palette_item: &PaletteItem,
) -> Result<(u16, u16), ResourceError> {
    let tiles = managers.bg_tiles.create(tiles_item.tiles_ref(), tiles_item.bpp())?;
    match managers.bg_palettes.create(palette_item.colors_ref(), palette_item.bpp()) {
        Ok(palette) => Ok((tiles, palette)),
        Err(error) => {
            managers.bg_tiles.decrease_usages(tiles);
            Err(error)
        }
    }
}

impl Clone for RegularBgPtr {
    fn clone(&self) -> Self {
        Self { shared: self.shared.clone() }
    }
}

impl PartialEq for RegularBgPtr {
    fn eq(&self, other: &Self) -> bool {
        self.shared == other.shared
    }
}

impl Eq for RegularBgPtr {}

impl Debug for RegularBgPtr {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        self.shared.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bpp::BppMode;
    use crate::hw::{Color, MapCell, Tile, MAP_CELLS};

    static SKY_TILES: [Tile; 4] = [Tile([0x1111_1111; 8]); 4];
    static SKY_COLORS: [Color; 16] = [Color::from_rgb(12, 20, 31); 16];
    static SKY_MAP: BgMap = [MapCell::new(1); MAP_CELLS];
    static SKY: RegularBgItem = RegularBgItem::new(
        RegularBgTilesItem::new(&SKY_TILES, BppMode::Bpp4),
        PaletteItem::new(&SKY_COLORS, BppMode::Bpp4),
        &SKY_MAP,
    );

    static SEA_TILES: [Tile; 8] = [Tile([0x2222_2222; 8]); 8];
    static SEA_COLORS: [Color; 16] = [Color::from_rgb(0, 8, 24); 16];
    static SEA_MAP: BgMap = [MapCell::new(3); MAP_CELLS];
    static SEA: RegularBgItem = RegularBgItem::new(
        RegularBgTilesItem::new(&SEA_TILES, BppMode::Bpp4),
        PaletteItem::new(&SEA_COLORS, BppMode::Bpp4),
        &SEA_MAP,
    );

    #[test]
    fn backgrounds_share_tiles_and_palettes() {
        let gfx = Graphics::new();
        let a = RegularBgPtr::create(&gfx, FixedPoint::ZERO, &SKY);
        let b = RegularBgPtr::create(&gfx, FixedPoint::ZERO, &SKY);

        assert_ne!(a, b);
        assert_eq!(a.tiles(), b.tiles());
        assert_eq!(gfx.bg_tiles_usage().used_count(), 4);
        assert_eq!(gfx.bgs_usage().used_count(), 2);

        drop((a, b));
        assert_eq!(gfx.bg_tiles_usage().used_count(), 0);
        assert_eq!(gfx.bg_palettes_usage().used_count(), 0);
    }

    #[test]
    fn only_four_backgrounds() {
        let gfx = Graphics::new();
        let bgs: alloc::vec::Vec<RegularBgPtr> =
            (0..4).map(|_| RegularBgPtr::create(&gfx, FixedPoint::ZERO, &SKY)).collect();

        assert!(RegularBgPtr::create_optional(&gfx, FixedPoint::ZERO, &SEA).is_none());
        assert_eq!(gfx.bg_tiles_usage().used_count(), 4);
        assert_eq!(gfx.bg_palettes_usage().used_count(), 1);

        drop(bgs);
        assert!(RegularBgPtr::create_optional(&gfx, FixedPoint::ZERO, &SEA).is_some());
    }

    #[test]
    #[should_panic(expected = "regular bg creation failed")]
    fn fifth_background_is_fatal() {
        let gfx = Graphics::new();
        let _bgs: alloc::vec::Vec<RegularBgPtr> =
            (0..4).map(|_| RegularBgPtr::create(&gfx, FixedPoint::ZERO, &SKY)).collect();
        RegularBgPtr::create(&gfx, FixedPoint::ZERO, &SKY);
    }

    #[test]
    fn item_switch_releases_old_resources() {
        let gfx = Graphics::new();
        let mut bg = RegularBgPtr::create(&gfx, FixedPoint::ZERO, &SKY);

        bg.set_item(&SEA);
        assert_eq!(gfx.bg_tiles_usage().used_count(), 8);
        assert_eq!(gfx.bg_palettes_usage().used_count(), 1);
        assert_eq!(bg.map_ref().as_ptr(), SEA_MAP.as_ptr());
    }

    #[test]
    fn map_cells_are_rebased_on_commit() {
        let gfx = Graphics::new();
        let _sky = RegularBgPtr::create(&gfx, FixedPoint::ZERO, &SKY);
        let mut sea = RegularBgPtr::create(&gfx, FixedPoint::ZERO, &SEA);
        sea.set_priority(0);

        gfx.update();
        let slot = sea.hw_index().unwrap() as usize;
        let start = sea.tiles().start_tile();
        let bank = sea.palette().bank() as u16;

        gfx.hardware(|hw| {
            let cell = MapCell(hw.bg_maps[slot][0]);
            assert_eq!(cell.tile_index(), 3 + start % 512);
            assert_eq!(cell.palette_bank(), bank);
        });
    }
}
