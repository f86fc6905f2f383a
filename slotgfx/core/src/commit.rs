//! # Frame commit
//!
//! [`commit`] is the only place where pool state reaches [`Hardware`]. It runs
//! once per frame, after the game logic, in a fixed order:
//!
//! 1. pending tile data for both banks
//! 2. pending palettes, with their effects applied
//! 3. changed affine matrices
//! 4. object attributes of every visible sprite, in draw order
//! 5. control, scroll and map of every visible background, in draw order
//! 6. display control and mosaic registers
//!
//! Nothing is allocated and nothing can fail. Entries whose content didn't
//! change are skipped, so committing twice in a row writes the same state.
//!
//! [`Hardware`]: crate::hw::Hardware

use heapless::Vec;
use log::trace;
use slotgfx_fixed::FixedPoint;

use crate::config::{CHARBLOCK_UNITS, DISPLAY_HEIGHT, DISPLAY_WIDTH, MAX_BGS, MAX_SPRITES, OAM_ENTRIES};
use crate::hw::{bg_control, mosaic_register, BgOffset, DisplayControl, ObjAttr0, ObjAttr1, ObjAttr2, ObjAttributes};
use crate::managers::Managers;
use crate::sprites::SpriteRecord;
use crate::palettes::PaletteBank;
use crate::tiles::TileBank;

/// What a commit wrote.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
pub struct CommitStats {
    /// Tile units copied, both banks.
    pub tiles_uploaded: u16,
    /// Colors copied, both palette memories.
    pub colors_uploaded: u16,
    pub affine_mats_written: u8,
    /// OAM entries rewritten. Unchanged entries are not counted.
    pub sprites_written: u8,
    /// Sprites on screen after the commit.
    pub sprites_drawn: u8,
    pub bgs_drawn: u8,
    pub maps_written: u8,
}

// Sort key: bg priority, then z order, then creation order.
type DrawKey = (u8, i16, u32, u16);

pub fn commit(managers: &mut Managers) -> CommitStats {
    let mut stats = CommitStats::default();

    stats.tiles_uploaded = managers.sprite_tiles.upload(&mut managers.hw.obj_tiles);
    stats.tiles_uploaded += managers.bg_tiles.upload(&mut managers.hw.bg_tiles);

    stats.colors_uploaded = managers.sprite_palettes.upload(&mut managers.hw.obj_palettes);
    stats.colors_uploaded += managers.bg_palettes.upload(&mut managers.hw.bg_palettes);

    stats.affine_mats_written = managers.affine_mats.commit(&mut managers.hw.oam);

    commit_sprites(managers, &mut stats);
    commit_bgs(managers, &mut stats);
    commit_registers(managers, stats.bgs_drawn);

    trace!("commit: {:?}", stats);
    stats
}

/// Screen space top-left corner and drawn size, or `None` when the sprite
/// doesn't touch the display.
fn sprite_screen_rect(record: &SpriteRecord, camera: FixedPoint) -> Option<(i32, i32)> {
    let mut position = record.position;
    if !record.ignore_camera {
        position = position - camera;
    }

    let mut width = record.shape_size.width();
    let mut height = record.shape_size.height();
    if record.affine_mat.is_some() && record.double_size {
        width *= 2;
        height *= 2;
    }

    let x = position.x.round_integer() + DISPLAY_WIDTH / 2 - width / 2;
    let y = position.y.round_integer() + DISPLAY_HEIGHT / 2 - height / 2;

    if x >= DISPLAY_WIDTH || y >= DISPLAY_HEIGHT || x + width <= 0 || y + height <= 0 {
        return None;
    }

    Some((x, y))
}

fn sprite_entry(
    record: &SpriteRecord,
    (x, y): (i32, i32),
    tiles: &TileBank,
    palettes: &PaletteBank,
    affine_param: i16,
) -> ObjAttributes {
    let bpp = tiles.bpp(record.tiles);

    let mut attr0 = ObjAttr0(0);
    attr0.set_y((y & 0xFF) as u16);
    attr0.set_mosaic(record.mosaic);
    attr0.set_bpp8(bpp.is_8bpp());
    attr0.set_shape(record.shape_size.shape());

    let mut attr1 = ObjAttr1(0);
    attr1.set_x((x & 0x1FF) as u16);
    attr1.set_size(record.shape_size.size());

    match record.affine_mat {
        Some(affine_mat) => {
            attr0.set_affine(true);
            attr0.set_double_size_or_hidden(record.double_size);
            attr1.set_affine_index(affine_mat);
        }
        None => {
            attr1.set_hflip(record.horizontal_flip);
            attr1.set_vflip(record.vertical_flip);
        }
    }

    let mut attr2 = ObjAttr2(0);
    attr2.set_tile(tiles.start_tile(record.tiles));
    attr2.set_priority(record.bg_priority as u16);
    if !bpp.is_8bpp() {
        attr2.set_palette_bank(palettes.bank(record.palette) as u16);
    }

    ObjAttributes {
        attr0: attr0.0,
        attr1: attr1.0,
        attr2: attr2.0,
        affine_param,
    }
}

fn commit_sprites(managers: &mut Managers, stats: &mut CommitStats) {
    let Managers { sprites, sprite_tiles, sprite_palettes, camera, hw, .. } = managers;

    let mut order: Vec<DrawKey, MAX_SPRITES> = Vec::new();
    for (id, record) in sprites.iter() {
        if record.visible && sprite_screen_rect(record, *camera).is_some() {
            // never full, one key per live sprite
            let _ = order.push((record.bg_priority, record.z_order, record.sequence, id));
        }
    }
    order.sort_unstable();

    let mut drawn = 0u8;
    for (index, &(_, _, _, id)) in order.iter().take(OAM_ENTRIES).enumerate() {
        let record = sprites.get(id);
        let index = index as u8;

        if record.dirty || record.oam_index != Some(index) {
            if let Some(rect) = sprite_screen_rect(record, *camera) {
                let entry = &mut hw.oam[index as usize];
                *entry = sprite_entry(record, rect, sprite_tiles, sprite_palettes, entry.affine_param);
                stats.sprites_written += 1;
            }
        }
        drawn += 1;
    }

    for (id, record) in sprites.iter_mut() {
        record.oam_index = order
            .iter()
            .take(OAM_ENTRIES)
            .position(|&(_, _, _, drawn_id)| drawn_id == id)
            .map(|index| index as u8);
        record.dirty = false;
    }

    // entries left over from a busier frame
    if drawn < sprites.oam_count {
        for entry in &mut hw.oam[drawn as usize..sprites.oam_count as usize] {
            entry.attr0 = ObjAttr0::hidden().0;
            entry.attr1 = 0;
            entry.attr2 = 0;
        }
    }

    sprites.oam_count = drawn;
    stats.sprites_drawn = drawn;
}

fn commit_bgs(managers: &mut Managers, stats: &mut CommitStats) {
    let Managers { bgs, bg_tiles, bg_palettes, camera, hw, .. } = managers;

    let mut order: Vec<DrawKey, MAX_BGS> = Vec::new();
    for (id, record) in bgs.iter() {
        if record.visible {
            let _ = order.push((record.priority, record.z_order, record.sequence, id));
        }
    }
    order.sort_unstable();

    for (id, record) in bgs.iter_mut() {
        let Some(slot) = order.iter().position(|&(_, _, _, drawn_id)| drawn_id == id) else {
            record.hw_slot = None;
            record.dirty = false;
            continue;
        };

        let moved = record.hw_slot != Some(slot as u8);
        if moved || record.map_dirty {
            let bpp = bg_tiles.bpp(record.tiles);
            let start = bg_tiles.start_tile(record.tiles);
            let tile_base = (start % CHARBLOCK_UNITS) / bpp.units_per_tile();
            let palette_bank = (!bpp.is_8bpp()).then(|| bg_palettes.bank(record.palette) as u16);

            for (hw_cell, cell) in hw.bg_maps[slot].iter_mut().zip(record.map.iter()) {
                *hw_cell = cell.rebased(tile_base, palette_bank);
            }
            record.map_dirty = false;
            stats.maps_written += 1;
        }

        if moved || record.dirty {
            let bpp = bg_tiles.bpp(record.tiles);
            let char_block = bg_tiles.start_tile(record.tiles) / CHARBLOCK_UNITS;
            hw.bg_control[slot] = bg_control(record.priority, char_block, record.mosaic, bpp.is_8bpp(), slot as u16);

            let mut position = record.position;
            if !record.ignore_camera {
                position = position - *camera;
            }

            // position (0, 0) puts the center of the 256x256 map on the center of the display
            let hofs = (256 - DISPLAY_WIDTH) / 2 - position.x.round_integer();
            let vofs = (256 - DISPLAY_HEIGHT) / 2 - position.y.round_integer();
            hw.bg_offsets[slot] = BgOffset {
                hofs: (hofs & 0x1FF) as u16,
                vofs: (vofs & 0x1FF) as u16,
            };
        }

        record.hw_slot = Some(slot as u8);
        record.dirty = false;
    }

    stats.bgs_drawn = order.len() as u8;
}

fn commit_registers(managers: &mut Managers, bgs_drawn: u8) {
    let mut display_control = DisplayControl::OBJ | DisplayControl::OBJ_1D_MAPPING;
    for slot in 0..bgs_drawn as usize {
        display_control |= DisplayControl::bg(slot);
    }

    managers.hw.display_control = display_control.bits();
    managers.hw.mosaic = mosaic_register(managers.bgs_mosaic, managers.sprites_mosaic);
}
