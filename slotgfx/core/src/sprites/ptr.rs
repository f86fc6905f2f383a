use alloc::rc::Rc;
use core::cell::RefCell;
use core::fmt::{Debug, Formatter};
use slotgfx_fixed::{Fixed, FixedPoint};

use crate::affine::{AffineMatAttributes, SpriteAffineMatPtr, SpriteAffineMats};
use crate::error::{fatal, ResourceError};
use crate::managers::Managers;
use crate::palettes::{PaletteItem, SpritePalettePtr, SpritePalettes};
use crate::shared::{Resource, Shared};
use crate::sprites::builder::SpriteBuilder;
use crate::sprites::item::{ShapeSize, SpriteItem};
use crate::sprites::{SpriteRecord, Sprites};
use crate::tiles::{SpriteTiles, SpriteTilesItem, SpriteTilesPtr};
use crate::Graphics;

/// A shared sprite.
///
/// Clones refer to the same sprite: moving one moves them all. The sprite
/// and every resource it holds are released with the last handle.
pub struct SpritePtr {
    shared: Shared<Sprites>,
}

impl SpritePtr {
    pub(crate) fn adopt(managers: Rc<RefCell<Managers>>, id: u16) -> Self {
        Self { shared: Shared::adopt(managers, id) }
    }

    pub fn create(gfx: &Graphics, position: FixedPoint, item: &SpriteItem) -> Self {
        SpriteBuilder::new(item).position(position).build(gfx)
    }

    pub fn create_optional(gfx: &Graphics, position: FixedPoint, item: &SpriteItem) -> Option<Self> {
        SpriteBuilder::new(item).position(position).build_optional(gfx)
    }

    pub fn id(&self) -> u16 {
        self.shared.id()
    }

    fn read<R>(&self, f: impl FnOnce(&SpriteRecord) -> R) -> R {
        self.shared.with(|managers, id| f(managers.sprites.get(id)))
    }

    fn update(&mut self, f: impl FnOnce(&mut SpriteRecord)) {
        self.shared.with(|managers, id| f(managers.sprites.get_mut(id)));
    }

    pub fn usages(&self) -> u16 {
        self.read(|record| record.usages)
    }

    pub fn shape_size(&self) -> ShapeSize {
        self.read(|record| record.shape_size)
    }

    /// Width and height in pixels.
    pub fn dimensions(&self) -> (i32, i32) {
        let shape_size = self.shape_size();
        (shape_size.width(), shape_size.height())
    }

    pub fn tiles(&self) -> SpriteTilesPtr {
        let id = self.shared.with(|managers, id| {
            let tiles = managers.sprites.get(id).tiles;
            managers.sprite_tiles.increase_usages(tiles);
            tiles
        });
        SpriteTilesPtr::adopt(self.shared.managers().clone(), id)
    }

    /// Replaces the tiles. They must fit the current shape and palette.
    pub fn set_tiles(&mut self, tiles: SpriteTilesPtr) {
        assert!(tiles.shared().same_context(self.shared.managers()), "sprite tiles from another context");
        self.shared.with(|managers, id| {
            let record = managers.sprites.get(id);
            let bpp = managers.sprite_tiles.bpp(tiles.id());
            assert!(
                managers.sprite_tiles.tiles_count(tiles.id()) == record.shape_size.tiles_count(bpp),
                "sprite tiles don't match the shape size"
            );
            assert!(managers.sprite_palettes.bpp(record.palette) == bpp, "sprite tiles and palette bpp mismatch");
        });

        let tiles = tiles.into_id();
        self.shared.with(|managers, id| {
            let old = core::mem::replace(&mut managers.sprites.get_mut(id).tiles, tiles);
            managers.sprite_tiles.decrease_usages(old);
        });
    }

    pub fn set_tiles_item(&mut self, item: &SpriteTilesItem, graphics_index: u16) {
        let result = self.shared.with(|managers, id| -> Result<(), ResourceError> {
            let record = managers.sprites.get(id);
            assert!(
                item.graphic_tiles_count() == record.shape_size.tiles_count(item.bpp()),
                "sprite tiles don't match the shape size"
            );
            assert!(managers.sprite_palettes.bpp(record.palette) == item.bpp(), "sprite tiles and palette bpp mismatch");

            let tiles = managers.sprite_tiles.create(item.graphic_tiles_ref(graphics_index), item.bpp())?;
            let old = core::mem::replace(&mut managers.sprites.get_mut(id).tiles, tiles);
            managers.sprite_tiles.decrease_usages(old);
            Ok(())
        });
        result.unwrap_or_else(|error| fatal(SpriteTiles::NAME, error));
    }

    pub fn palette(&self) -> SpritePalettePtr {
        let id = self.shared.with(|managers, id| {
            let palette = managers.sprites.get(id).palette;
            managers.sprite_palettes.increase_usages(palette);
            palette
        });
        SpritePalettePtr::adopt(self.shared.managers().clone(), id)
    }

    pub fn set_palette(&mut self, palette: SpritePalettePtr) {
        assert!(palette.shared().same_context(self.shared.managers()), "sprite palette from another context");
        self.shared.with(|managers, id| {
            let record = managers.sprites.get(id);
            assert!(
                managers.sprite_palettes.bpp(palette.id()) == managers.sprite_tiles.bpp(record.tiles),
                "sprite tiles and palette bpp mismatch"
            );
        });

        let palette = palette.into_id();
        self.shared.with(|managers, id| {
            let old = core::mem::replace(&mut managers.sprites.get_mut(id).palette, palette);
            managers.sprite_palettes.decrease_usages(old);
        });
    }

    pub fn set_palette_item(&mut self, item: &PaletteItem) {
        let result = self.shared.with(|managers, id| -> Result<(), ResourceError> {
            let record = managers.sprites.get(id);
            assert!(
                managers.sprite_tiles.bpp(record.tiles) == item.bpp(),
                "sprite tiles and palette bpp mismatch"
            );

            let palette = managers.sprite_palettes.create(item.colors_ref(), item.bpp())?;
            let old = core::mem::replace(&mut managers.sprites.get_mut(id).palette, palette);
            managers.sprite_palettes.decrease_usages(old);
            Ok(())
        });
        result.unwrap_or_else(|error| fatal(SpritePalettes::NAME, error));
    }

    /// Switches to another item, shape included. Either both the tiles and the
    /// palette change or, when one of them can't be created, nothing does.
    pub fn set_tiles_and_palette(&mut self, item: &SpriteItem, graphics_index: u16) {
        let result = self.shared.with(|managers, id| -> Result<(), ResourceError> {
            let tiles_item = item.tiles_item();
            let palette_item = item.palette_item();

            let tiles = managers
                .sprite_tiles
                .create(tiles_item.graphic_tiles_ref(graphics_index), tiles_item.bpp())?;
            let palette = match managers.sprite_palettes.create(palette_item.colors_ref(), palette_item.bpp()) {
                Ok(palette) => palette,
                Err(error) => {
                    managers.sprite_tiles.decrease_usages(tiles);
                    return Err(error);
                }
            };

            let record = managers.sprites.get_mut(id);
            record.shape_size = item.shape_size();
            let old_tiles = core::mem::replace(&mut record.tiles, tiles);
            let old_palette = core::mem::replace(&mut record.palette, palette);
            managers.sprite_tiles.decrease_usages(old_tiles);
            managers.sprite_palettes.decrease_usages(old_palette);
            Ok(())
        });
        result.unwrap_or_else(|error| fatal(Sprites::NAME, error));
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

    pub fn bg_priority(&self) -> u8 {
        self.read(|record| record.bg_priority)
    }

    /// Priority relative to backgrounds, in [0, 3]. Lower is drawn on top.
    pub fn set_bg_priority(&mut self, priority: u8) {
        assert!(priority <= 3, "invalid bg priority: {}", priority);
        self.update(|record| record.bg_priority = priority);
    }

    pub fn z_order(&self) -> i16 {
        self.read(|record| record.z_order)
    }

    /// Order among sprites of the same bg priority. Lower is drawn on top.
    pub fn set_z_order(&mut self, z_order: i16) {
        self.update(|record| record.z_order = z_order);
    }

    pub fn horizontal_flip(&self) -> bool {
        self.read(|record| record.horizontal_flip)
    }

    pub fn set_horizontal_flip(&mut self, flip: bool) {
        self.shared.with(|managers, id| {
            let record = managers.sprites.get_mut(id);
            record.horizontal_flip = flip;
            if let Some(affine_mat) = record.affine_mat {
                managers.affine_mats.update_attributes(affine_mat, |attributes| attributes.set_horizontal_flip(flip));
            }
        });
    }

    pub fn vertical_flip(&self) -> bool {
        self.read(|record| record.vertical_flip)
    }

    pub fn set_vertical_flip(&mut self, flip: bool) {
        self.shared.with(|managers, id| {
            let record = managers.sprites.get_mut(id);
            record.vertical_flip = flip;
            if let Some(affine_mat) = record.affine_mat {
                managers.affine_mats.update_attributes(affine_mat, |attributes| attributes.set_vertical_flip(flip));
            }
        });
    }

    pub fn mosaic_enabled(&self) -> bool {
        self.read(|record| record.mosaic)
    }

    pub fn set_mosaic_enabled(&mut self, enabled: bool) {
        self.update(|record| record.mosaic = enabled);
    }

    pub fn double_size(&self) -> bool {
        self.read(|record| record.double_size)
    }

    /// Doubles the drawing area of an affine sprite so rotated or scaled
    /// pixels aren't clipped. Has no effect without an affine matrix.
    pub fn set_double_size(&mut self, double_size: bool) {
        self.update(|record| record.double_size = double_size);
    }

    pub fn visible(&self) -> bool {
        self.read(|record| record.visible)
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.update(|record| record.visible = visible);
    }

    pub fn ignore_camera(&self) -> bool {
        self.read(|record| record.ignore_camera)
    }

    pub fn set_ignore_camera(&mut self, ignore: bool) {
        self.update(|record| record.ignore_camera = ignore);
    }

    fn affine_attributes(&self) -> Option<AffineMatAttributes> {
        self.shared.with(|managers, id| {
            managers.sprites.get(id).affine_mat.map(|affine_mat| managers.affine_mats.attributes(affine_mat))
        })
    }

    pub fn rotation_angle(&self) -> Fixed {
        self.affine_attributes().map_or(Fixed::ZERO, |attributes| attributes.rotation_angle())
    }

    pub fn set_rotation_angle(&mut self, angle: Fixed) {
        self.update_affine(|attributes| attributes.set_rotation_angle(angle));
    }

    pub fn scale_x(&self) -> Fixed {
        self.affine_attributes().map_or(Fixed::ONE, |attributes| attributes.scale_x())
    }

    pub fn set_scale_x(&mut self, scale: Fixed) {
        self.update_affine(|attributes| attributes.set_scale_x(scale));
    }

    pub fn scale_y(&self) -> Fixed {
        self.affine_attributes().map_or(Fixed::ONE, |attributes| attributes.scale_y())
    }

    pub fn set_scale_y(&mut self, scale: Fixed) {
        self.update_affine(|attributes| attributes.set_scale_y(scale));
    }

    pub fn set_scale(&mut self, scale: Fixed) {
        self.update_affine(|attributes| attributes.set_scale(scale));
    }

    // Creates the matrix on first use, seeded with the current flips. Nothing
    // is created while the result wouldn't rotate or scale.
    fn update_affine(&mut self, update: impl FnOnce(&mut AffineMatAttributes)) {
        let result = self.shared.with(|managers, id| -> Result<(), ResourceError> {
            let record = managers.sprites.get(id);

            match record.affine_mat {
                Some(affine_mat) => {
                    let remove = record.remove_affine_mat_when_not_needed;
                    let attributes = managers.affine_mats.update_attributes(affine_mat, update);
                    if remove && attributes.flipped_identity() {
                        managers.sprites.get_mut(id).affine_mat = None;
                        managers.affine_mats.decrease_usages(affine_mat);
                    }
                }
                None => {
                    let mut attributes = AffineMatAttributes::IDENTITY;
                    attributes.set_horizontal_flip(record.horizontal_flip);
                    attributes.set_vertical_flip(record.vertical_flip);
                    update(&mut attributes);

                    if !attributes.flipped_identity() {
                        let affine_mat = managers.affine_mats.create(attributes)?;
                        managers.sprites.get_mut(id).affine_mat = Some(affine_mat);
                    }
                }
            }
            Ok(())
        });
        result.unwrap_or_else(|error| fatal(SpriteAffineMats::NAME, error));
    }

    pub fn affine_mat(&self) -> Option<SpriteAffineMatPtr> {
        let id = self.shared.with(|managers, id| {
            let affine_mat = managers.sprites.get(id).affine_mat?;
            managers.affine_mats.increase_usages(affine_mat);
            Some(affine_mat)
        })?;
        Some(SpriteAffineMatPtr::adopt(self.shared.managers().clone(), id))
    }

    pub fn set_affine_mat(&mut self, affine_mat: SpriteAffineMatPtr) {
        assert!(affine_mat.shared().same_context(self.shared.managers()), "affine mat from another context");

        let affine_mat = affine_mat.into_id();
        self.shared.with(|managers, id| {
            if let Some(old) = managers.sprites.get_mut(id).affine_mat.replace(affine_mat) {
                managers.affine_mats.decrease_usages(old);
            }
        });
    }

    pub fn remove_affine_mat(&mut self) {
        self.shared.with(|managers, id| {
            if let Some(old) = managers.sprites.get_mut(id).affine_mat.take() {
                managers.affine_mats.decrease_usages(old);
            }
        });
    }

    pub fn remove_affine_mat_when_not_needed(&self) -> bool {
        self.read(|record| record.remove_affine_mat_when_not_needed)
    }

    /// When set, the matrix is released as soon as rotation and scale are
    /// back to identity.
    pub fn set_remove_affine_mat_when_not_needed(&mut self, remove: bool) {
        self.shared.with(|managers, id| {
            let record = managers.sprites.get_mut(id);
            record.remove_affine_mat_when_not_needed = remove;

            if let (true, Some(affine_mat)) = (remove, record.affine_mat) {
                if managers.affine_mats.attributes(affine_mat).flipped_identity() {
                    record.affine_mat = None;
                    managers.affine_mats.decrease_usages(affine_mat);
                }
            }
        });
    }

    /// OAM entry written by the last commit, if the sprite was on screen.
    pub fn hw_index(&self) -> Option<u8> {
        self.read(|record| record.oam_index)
    }
}

impl Clone for SpritePtr {
    fn clone(&self) -> Self {
        Self { shared: self.shared.clone() }
    }
}

impl PartialEq for SpritePtr {
    fn eq(&self, other: &Self) -> bool {
        self.shared == other.shared
    }
}

impl Eq for SpritePtr {}

impl Debug for SpritePtr {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        self.shared.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bpp::BppMode;
    use crate::hw::{Color, Tile};

    static HERO_TILES: [Tile; 8] = [Tile([0x1111_1111; 8]); 8];
    static HERO_COLORS: [Color; 16] = [Color::WHITE; 16];
    static HERO: SpriteItem = SpriteItem::new(
        ShapeSize::Square16x16,
        SpriteTilesItem::new(&HERO_TILES, BppMode::Bpp4, 2),
        PaletteItem::new(&HERO_COLORS, BppMode::Bpp4),
    );

    static SHOT_TILES: [Tile; 1] = [Tile([0x2222_2222; 8]); 1];
    static SHOT_COLORS: [Color; 16] = [Color::from_rgb(31, 0, 0); 16];
    static SHOT: SpriteItem = SpriteItem::new(
        ShapeSize::Square8x8,
        SpriteTilesItem::new(&SHOT_TILES, BppMode::Bpp4, 1),
        PaletteItem::new(&SHOT_COLORS, BppMode::Bpp4),
    );

    static RAINBOW: [[Color; 16]; 16] = {
        let mut palettes = [[Color::BLACK; 16]; 16];
        let mut index = 0;
        while index < 16 {
            palettes[index][0] = Color::from_rgb(index as u16, 0, 0);
            index += 1;
        }
        palettes
    };

    #[test]
    fn clones_share_the_sprite_and_its_resources() {
        let gfx = Graphics::new();
        let a = SpritePtr::create(&gfx, FixedPoint::ZERO, &HERO);
        let b = SpritePtr::create(&gfx, FixedPoint::ZERO, &HERO);
        let c = a.clone();

        assert_ne!(a, b);
        assert_eq!(a, c);
        assert_eq!(a.usages(), 2);
        let tiles = a.tiles();
        assert_eq!(tiles, b.tiles());
        assert_eq!(tiles.usages(), 3);
        drop(tiles);
        assert_eq!(gfx.sprites_usage().used_count(), 2);

        drop((a, b, c));
        assert_eq!(gfx.sprites_usage().used_count(), 0);
        assert_eq!(gfx.sprite_tiles_usage().used_count(), 0);
        assert_eq!(gfx.sprite_palettes_usage().used_count(), 0);
    }

    #[test]
    fn setters_replace_resources() {
        let gfx = Graphics::new();
        let mut sprite = SpritePtr::create(&gfx, FixedPoint::ZERO, &HERO);
        let first = sprite.tiles();

        sprite.set_tiles_item(HERO.tiles_item(), 1);
        assert_ne!(sprite.tiles(), first);
        drop(first);
        assert_eq!(gfx.sprite_tiles_usage().used_count(), 4);

        let palette = SpritePalettePtr::create(&gfx, SHOT.palette_item());
        sprite.set_palette(palette.clone());
        assert_eq!(sprite.palette(), palette);
        assert_eq!(palette.usages(), 2);
        assert_eq!(gfx.sprite_palettes_usage().used_count(), 1);
    }

    #[test]
    #[should_panic(expected = "sprite tiles don't match the shape size")]
    fn tiles_of_another_size_are_rejected() {
        let gfx = Graphics::new();
        let mut sprite = SpritePtr::create(&gfx, FixedPoint::ZERO, &HERO);
        sprite.set_tiles_item(SHOT.tiles_item(), 0);
    }

    #[test]
    fn item_switch_changes_the_shape() {
        let gfx = Graphics::new();
        let mut sprite = SpritePtr::create(&gfx, FixedPoint::ZERO, &HERO);

        sprite.set_tiles_and_palette(&SHOT, 0);
        assert_eq!(sprite.dimensions(), (8, 8));
        assert_eq!(gfx.sprite_tiles_usage().used_count(), 1);
        assert_eq!(sprite.palette().colors_ref().as_ptr(), SHOT_COLORS.as_ptr());
    }

    #[test]
    fn failed_item_switch_leaves_the_sprite_alone() {
        let gfx = Graphics::new();
        let mut sprite = SpritePtr::create(&gfx, FixedPoint::ZERO, &HERO);

        let rainbow: &'static [[Color; 16]; 16] = &RAINBOW;
        let _fillers: heapless::Vec<SpritePalettePtr, 16> = rainbow[..15]
            .iter()
            .map(|colors| SpritePalettePtr::create(&gfx, &PaletteItem::new(colors, BppMode::Bpp4)))
            .collect();
        assert_eq!(gfx.sprite_palettes_usage().available_count(), 0);

        let tiles_before = gfx.sprite_tiles_usage();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| sprite.set_tiles_and_palette(&SHOT, 0)));
        assert!(result.is_err());
        assert_eq!(gfx.sprite_tiles_usage(), tiles_before);
        assert_eq!(sprite.dimensions(), (16, 16));
        assert_eq!(sprite.palette().colors_ref().as_ptr(), HERO_COLORS.as_ptr());
    }

    #[test]
    fn affine_mat_is_created_lazily() {
        let gfx = Graphics::new();
        let mut sprite = SpritePtr::create(&gfx, FixedPoint::ZERO, &HERO);
        sprite.set_horizontal_flip(true);

        sprite.set_rotation_angle(Fixed::ZERO);
        assert!(sprite.affine_mat().is_none());

        sprite.set_rotation_angle(Fixed::from_int(45));
        let affine_mat = sprite.affine_mat().unwrap();
        assert!(affine_mat.horizontal_flip());
        assert_eq!(sprite.rotation_angle(), Fixed::from_int(45));

        sprite.set_vertical_flip(true);
        assert!(affine_mat.vertical_flip());
        drop(affine_mat);

        sprite.set_rotation_angle(Fixed::ZERO);
        assert!(sprite.affine_mat().is_some());
        assert_eq!(gfx.affine_mats_usage().used_count(), 1);
    }

    #[test]
    fn unneeded_affine_mat_is_released_on_request() {
        let gfx = Graphics::new();
        let mut sprite = SpritePtr::create(&gfx, FixedPoint::ZERO, &HERO);
        sprite.set_remove_affine_mat_when_not_needed(true);

        sprite.set_scale(Fixed::from_int(2));
        assert_eq!(gfx.affine_mats_usage().used_count(), 1);

        sprite.set_scale(Fixed::ONE);
        assert!(sprite.affine_mat().is_none());
        assert_eq!(gfx.affine_mats_usage().used_count(), 0);
        assert_eq!(sprite.scale_x(), Fixed::ONE);
    }

    #[test]
    fn shared_affine_mat_outlives_one_sprite() {
        let gfx = Graphics::new();
        let affine_mat = SpriteAffineMatPtr::create(&gfx);
        let mut a = SpritePtr::create(&gfx, FixedPoint::ZERO, &HERO);
        let mut b = SpritePtr::create(&gfx, FixedPoint::ZERO, &SHOT);

        a.set_affine_mat(affine_mat.clone());
        b.set_affine_mat(affine_mat.clone());
        assert_eq!(affine_mat.usages(), 3);

        a.remove_affine_mat();
        drop(b);
        assert_eq!(affine_mat.usages(), 1);
    }

    #[test]
    fn builder_presets_attributes() {
        let gfx = Graphics::new();
        let sprite = SpriteBuilder::new(&HERO)
            .graphics_index(1)
            .position(FixedPoint::from_ints(10, -20))
            .bg_priority(1)
            .z_order(-3)
            .visible(false)
            .build(&gfx);

        assert_eq!(sprite.position(), FixedPoint::from_ints(10, -20));
        assert_eq!(sprite.bg_priority(), 1);
        assert_eq!(sprite.z_order(), -3);
        assert!(!sprite.visible());
        assert_eq!(sprite.tiles().tiles_ref().map(|data| data.as_ptr()), Some(HERO_TILES[4..].as_ptr()));
    }

    #[test]
    fn builder_from_ptrs_takes_its_own_usages() {
        let gfx = Graphics::new();
        let tiles = SpriteTilesPtr::create(&gfx, &SHOT_TILES, BppMode::Bpp4);
        let palette = SpritePalettePtr::create(&gfx, SHOT.palette_item());

        let sprite = SpriteBuilder::from_ptrs(ShapeSize::Square8x8, tiles.clone(), palette).build(&gfx);
        assert_eq!(tiles.usages(), 2);

        drop(sprite);
        assert_eq!(tiles.usages(), 1);
        assert_eq!(gfx.sprite_palettes_usage().used_count(), 0);
    }

    #[test]
    fn exhaustion_leaves_no_trace() {
        let gfx = Graphics::new();
        let sprites: alloc::vec::Vec<SpritePtr> =
            (0..crate::config::MAX_SPRITES).map(|_| SpritePtr::create(&gfx, FixedPoint::ZERO, &SHOT)).collect();
        let tiles_before = gfx.sprite_tiles_usage();

        assert!(SpritePtr::create_optional(&gfx, FixedPoint::ZERO, &HERO).is_none());
        assert_eq!(gfx.sprite_tiles_usage(), tiles_before);
        assert_eq!(sprites[0].tiles().usages(), crate::config::MAX_SPRITES as u16 + 1);
    }
}
