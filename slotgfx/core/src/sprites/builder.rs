use slotgfx_fixed::{Fixed, FixedPoint};

use crate::affine::SpriteAffineMatPtr;
use crate::error::{fatal, optional, ResourceError};
use crate::palettes::SpritePalettePtr;
use crate::sprites::item::{ShapeSize, SpriteItem};
use crate::sprites::ptr::SpritePtr;
use crate::sprites::{SpriteAttributes, Sprites};
use crate::shared::Resource;
use crate::tiles::SpriteTilesPtr;
use crate::Graphics;

enum Source {
    Item { item: SpriteItem, graphics_index: u16 },
    Ptrs { tiles: SpriteTilesPtr, palette: SpritePalettePtr },
}

/// Sprite with every attribute set up front.
///
/// ```ignore
/// let sprite = SpriteBuilder::new(&HERO)
///     .graphics_index(2)
///     .position(FixedPoint::from_ints(-40, 12))
///     .z_order(-1)
///     .build(&gfx);
/// ```
pub struct SpriteBuilder {
    shape_size: ShapeSize,
    source: Source,
    affine_mat: Option<SpriteAffineMatPtr>,
    attributes: SpriteAttributes,
}

impl SpriteBuilder {
    pub fn new(item: &SpriteItem) -> Self {
        Self {
            shape_size: item.shape_size(),
            source: Source::Item { item: *item, graphics_index: 0 },
            affine_mat: None,
            attributes: SpriteAttributes::DEFAULT,
        }
    }

    /// From tiles and a palette already in memory.
    pub fn from_ptrs(shape_size: ShapeSize, tiles: SpriteTilesPtr, palette: SpritePalettePtr) -> Self {
        Self {
            shape_size,
            source: Source::Ptrs { tiles, palette },
            affine_mat: None,
            attributes: SpriteAttributes::DEFAULT,
        }
    }

    pub fn graphics_index(mut self, index: u16) -> Self {
        match &mut self.source {
            Source::Item { item, graphics_index } => {
                assert!(index < item.tiles_item().graphics_count(), "invalid graphics index: {}", index);
                *graphics_index = index;
            }
            Source::Ptrs { .. } => panic!("graphics index of a sprite built from tiles"),
        }
        self
    }

    pub fn position(mut self, position: FixedPoint) -> Self {
        self.attributes.position = position;
        self
    }

    pub fn x(mut self, x: Fixed) -> Self {
        self.attributes.position.x = x;
        self
    }

    pub fn y(mut self, y: Fixed) -> Self {
        self.attributes.position.y = y;
        self
    }

    pub fn bg_priority(mut self, priority: u8) -> Self {
        assert!(priority <= 3, "invalid bg priority: {}", priority);
        self.attributes.bg_priority = priority;
        self
    }

    pub fn z_order(mut self, z_order: i16) -> Self {
        self.attributes.z_order = z_order;
        self
    }

    pub fn horizontal_flip(mut self, flip: bool) -> Self {
        self.attributes.horizontal_flip = flip;
        self
    }

    pub fn vertical_flip(mut self, flip: bool) -> Self {
        self.attributes.vertical_flip = flip;
        self
    }

    pub fn mosaic_enabled(mut self, enabled: bool) -> Self {
        self.attributes.mosaic = enabled;
        self
    }

    pub fn double_size(mut self, double_size: bool) -> Self {
        self.attributes.double_size = double_size;
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.attributes.visible = visible;
        self
    }

    pub fn ignore_camera(mut self, ignore: bool) -> Self {
        self.attributes.ignore_camera = ignore;
        self
    }

    pub fn affine_mat(mut self, affine_mat: SpriteAffineMatPtr) -> Self {
        self.affine_mat = Some(affine_mat);
        self
    }

    pub fn remove_affine_mat_when_not_needed(mut self, remove: bool) -> Self {
        self.attributes.remove_affine_mat_when_not_needed = remove;
        self
    }

    pub fn build(self, gfx: &Graphics) -> SpritePtr {
        self.build_impl(gfx).unwrap_or_else(|error| fatal(Sprites::NAME, error))
    }

    pub fn build_optional(self, gfx: &Graphics) -> Option<SpritePtr> {
        optional(Sprites::NAME, self.build_impl(gfx))
    }

    // The builder's own handles are dropped after the managers are released,
    // handing back the usages taken for the new sprite.
    fn build_impl(self, gfx: &Graphics) -> Result<SpritePtr, ResourceError> {
        let SpriteBuilder { shape_size, source, affine_mat, attributes } = self;

        if let Some(affine_mat) = &affine_mat {
            assert!(affine_mat.shared().same_context(gfx.managers()), "affine mat from another context");
        }

        let id = {
            let mut managers = gfx.managers().borrow_mut();
            let managers = &mut *managers;

            if managers.sprites.is_full() {
                return Err(ResourceError::SpritesExhausted);
            }

            let (tiles, palette) = match &source {
                Source::Item { item, graphics_index } => {
                    let tiles_item = item.tiles_item();
                    let palette_item = item.palette_item();
                    let tiles = managers
                        .sprite_tiles
                        .create(tiles_item.graphic_tiles_ref(*graphics_index), tiles_item.bpp())?;

                    match managers.sprite_palettes.create(palette_item.colors_ref(), palette_item.bpp()) {
                        Ok(palette) => (tiles, palette),
                        Err(error) => {
                            managers.sprite_tiles.decrease_usages(tiles);
                            return Err(error);
                        }
                    }
                }
                Source::Ptrs { tiles, palette } => {
                    assert!(tiles.shared().same_context(gfx.managers()), "sprite tiles from another context");
                    assert!(palette.shared().same_context(gfx.managers()), "sprite palette from another context");

                    let bpp = managers.sprite_tiles.bpp(tiles.id());
                    assert!(
                        managers.sprite_tiles.tiles_count(tiles.id()) == shape_size.tiles_count(bpp),
                        "sprite tiles don't match the shape size"
                    );
                    assert!(managers.sprite_palettes.bpp(palette.id()) == bpp, "sprite tiles and palette bpp mismatch");

                    managers.sprite_tiles.increase_usages(tiles.id());
                    managers.sprite_palettes.increase_usages(palette.id());
                    (tiles.id(), palette.id())
                }
            };

            let affine_mat = affine_mat.as_ref().map(|affine_mat| {
                managers.affine_mats.increase_usages(affine_mat.id());
                affine_mat.id()
            });

            managers.sprites.insert(shape_size, tiles, palette, affine_mat, attributes)?
        };

        Ok(SpritePtr::adopt(gfx.managers().clone(), id))
    }
}
