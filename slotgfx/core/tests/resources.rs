use slotgfx_core::palettes::valid_colors_count;
use slotgfx_core::tiles::valid_tiles_count;
use slotgfx_core::{
    BgPalettePtr, BppMode, Color, Graphics, PaletteItem, RegularBgTilesPtr, SpritePalettePtr, SpriteTilesPtr, Tile,
};

static FRAME: [Tile; 4] = [Tile([0x0101_0101; 8]); 4];
static SHEET: [Tile; 1024] = [Tile([0x0202_0202; 8]); 1024];
static SPARE: [Tile; 2] = [Tile([0x0303_0303; 8]); 2];

static PALETTES: [[Color; 16]; 17] = [[Color::WHITE; 16]; 17];

fn sheet_frame(index: usize) -> &'static [Tile] {
    let sheet: &'static [Tile] = &SHEET;
    &sheet[index * 64..(index + 1) * 64]
}

fn palette_item(index: usize) -> PaletteItem {
    let palettes: &'static [[Color; 16]; 17] = &PALETTES;
    PaletteItem::new(&palettes[index], BppMode::Bpp4)
}

fn fill_sprite_tiles(gfx: &Graphics) -> Vec<SpriteTilesPtr> {
    let tiles: Vec<SpriteTilesPtr> = (0..16).map(|index| SpriteTilesPtr::create(gfx, sheet_frame(index), BppMode::Bpp4)).collect();
    assert_eq!(gfx.sprite_tiles_usage().available_count(), 0);
    tiles
}

#[test]
fn usages_follow_live_handles() {
    let gfx = Graphics::new();
    let a = SpriteTilesPtr::create(&gfx, &FRAME, BppMode::Bpp4);
    let b = a.clone();
    let c = b.clone();
    assert_eq!(a.usages(), 3);

    drop(b);
    assert_eq!(a.usages(), 2);

    let moved = c;
    assert_eq!(moved.usages(), 2);

    drop(a);
    drop(moved);
    assert_eq!(gfx.sprite_tiles_usage().used_count(), 0);
    assert_eq!(gfx.sprite_tiles_usage().used_items_count(), 0);
}

#[test]
fn equal_descriptors_share_one_allocation() {
    let gfx = Graphics::new();
    let a = RegularBgTilesPtr::create(&gfx, &FRAME, BppMode::Bpp4);
    let b = RegularBgTilesPtr::create(&gfx, &FRAME, BppMode::Bpp4);

    assert_eq!(a, b);
    assert_eq!(a.start_tile(), b.start_tile());
    assert_eq!(a.usages(), 2);
    assert_eq!(RegularBgTilesPtr::find(&gfx, &FRAME, BppMode::Bpp4), Some(a.clone()));
}

#[test]
fn create_new_never_shares() {
    let gfx = Graphics::new();
    let a = RegularBgTilesPtr::create_new(&gfx, &FRAME, BppMode::Bpp4);
    let b = RegularBgTilesPtr::create_new(&gfx, &FRAME, BppMode::Bpp4);

    assert_ne!(a, b);
    assert_ne!(a.start_tile(), b.start_tile());
    assert_eq!(a.usages(), 1);
    assert_eq!(b.usages(), 1);
    assert_eq!(gfx.bg_tiles_usage().used_count(), 8);

    let c = RegularBgTilesPtr::create(&gfx, &FRAME, BppMode::Bpp4);
    assert!(c == a || c == b);
}

#[test]
fn same_data_in_other_bit_depth_is_another_descriptor() {
    let gfx = Graphics::new();
    let a = RegularBgTilesPtr::create(&gfx, &FRAME, BppMode::Bpp4);
    let b = RegularBgTilesPtr::create(&gfx, &FRAME, BppMode::Bpp8);

    assert_ne!(a, b);
    assert_eq!(b.bpp(), BppMode::Bpp8);
}

#[test]
fn tiles_count_validity_boundaries() {
    assert!(!valid_tiles_count(0, BppMode::Bpp4));
    assert!(!valid_tiles_count(0, BppMode::Bpp8));
    assert!(valid_tiles_count(2048, BppMode::Bpp8));
    assert!(!valid_tiles_count(2049, BppMode::Bpp8));
    assert!(!valid_tiles_count(1, BppMode::Bpp8));
    assert!(valid_tiles_count(1, BppMode::Bpp4));
    assert!(valid_tiles_count(1024, BppMode::Bpp4));
    assert!(!valid_tiles_count(1025, BppMode::Bpp4));
}

#[test]
fn colors_count_validity() {
    assert!(valid_colors_count(16, BppMode::Bpp4));
    assert!(!valid_colors_count(32, BppMode::Bpp4));
    assert!(valid_colors_count(256, BppMode::Bpp8));
    assert!(!valid_colors_count(24, BppMode::Bpp8));
}

#[test]
#[should_panic(expected = "invalid bg tiles count")]
fn odd_8bpp_descriptor_is_fatal() {
    let gfx = Graphics::new();
    let odd: &'static [Tile] = &FRAME[..3];
    RegularBgTilesPtr::create(&gfx, odd, BppMode::Bpp8);
}

#[test]
fn exhausted_tile_bank_optional_leaves_no_trace() {
    let gfx = Graphics::new();
    let _tiles = fill_sprite_tiles(&gfx);
    let before = gfx.sprite_tiles_usage();

    assert!(SpriteTilesPtr::create_optional(&gfx, &SPARE, BppMode::Bpp4).is_none());
    assert!(SpriteTilesPtr::allocate_optional(&gfx, 2, BppMode::Bpp4).is_none());
    assert_eq!(gfx.sprite_tiles_usage(), before);

    // still deduplicated while full
    let again = SpriteTilesPtr::create(&gfx, sheet_frame(3), BppMode::Bpp4);
    assert_eq!(again.usages(), 2);
}

#[test]
#[should_panic(expected = "sprite tiles creation failed")]
fn exhausted_tile_bank_is_fatal() {
    let gfx = Graphics::new();
    let _tiles = fill_sprite_tiles(&gfx);
    SpriteTilesPtr::create(&gfx, &SPARE, BppMode::Bpp4);
}

#[test]
fn exhausted_palette_banks() {
    let gfx = Graphics::new();
    let palettes: Vec<BgPalettePtr> = (0..16).map(|index| BgPalettePtr::create(&gfx, &palette_item(index))).collect();
    assert_eq!(gfx.bg_palettes_usage().available_count(), 0);

    assert!(BgPalettePtr::create_optional(&gfx, &palette_item(16)).is_none());
    assert!(SpritePalettePtr::create_optional(&gfx, &palette_item(16)).is_some());
    assert_eq!(gfx.bg_palettes_usage().used_count(), 16);

    drop(palettes);
    assert_eq!(gfx.bg_palettes_usage().used_count(), 0);
}

#[test]
#[should_panic(expected = "bg palette creation failed")]
fn exhausted_palette_banks_is_fatal() {
    let gfx = Graphics::new();
    let _palettes: Vec<BgPalettePtr> = (0..16).map(|index| BgPalettePtr::create(&gfx, &palette_item(index))).collect();
    BgPalettePtr::create(&gfx, &palette_item(16));
}

#[test]
fn freed_ranges_coalesce() {
    let gfx = Graphics::new();
    let mut tiles = fill_sprite_tiles(&gfx);

    // free two neighbouring 64 unit ranges, then ask for 128 contiguous units
    let second = tiles.remove(2);
    let first = tiles.remove(1);
    let start = first.start_tile();
    drop((first, second));

    let big = SpriteTilesPtr::allocate(&gfx, 128, BppMode::Bpp8);
    assert_eq!(big.start_tile(), start);
}

#[test]
fn end_to_end_scenario() {
    let gfx = Graphics::new();
    let initial = gfx.sprite_tiles_usage().available_count();

    let a = SpriteTilesPtr::create(&gfx, &FRAME, BppMode::Bpp4);
    assert_eq!(gfx.sprite_tiles_usage().available_count(), initial - 4);

    let b = SpriteTilesPtr::create(&gfx, &FRAME, BppMode::Bpp4);
    assert_eq!(a, b);
    assert_eq!(b.usages(), 2);
    assert_eq!(gfx.sprite_tiles_usage().available_count(), initial - 4);

    drop(a);
    assert_eq!(b.usages(), 1);
    assert_eq!(gfx.sprite_tiles_usage().available_count(), initial - 4);

    drop(b);
    assert_eq!(gfx.sprite_tiles_usage().available_count(), initial);
}

#[test]
fn contexts_are_isolated() {
    let one = Graphics::new();
    let two = Graphics::new();
    let a = SpriteTilesPtr::create(&one, &FRAME, BppMode::Bpp4);
    let b = SpriteTilesPtr::create(&two, &FRAME, BppMode::Bpp4);

    assert_ne!(a, b);
    assert_eq!(a.usages(), 1);
    assert_eq!(two.sprite_tiles_usage().used_count(), 4);

    drop(one);
    assert_eq!(a.usages(), 1);
}

#[test]
#[should_panic(expected = "sprite tiles 0 dropped while the managers were busy")]
fn dropping_a_handle_while_reading_hardware_is_fatal() {
    let gfx = Graphics::new();
    let tiles = SpriteTilesPtr::create(&gfx, &FRAME, BppMode::Bpp4);
    gfx.hardware(move |_hw| drop(tiles));
}

#[test]
#[should_panic(expected = "dropped while the managers were busy")]
fn dropping_a_handle_while_writing_vram_is_fatal() {
    let gfx = Graphics::new();
    let shared = SpriteTilesPtr::create(&gfx, &FRAME, BppMode::Bpp4);
    let mut dynamic = RegularBgTilesPtr::allocate(&gfx, 2, BppMode::Bpp4);
    dynamic.with_vram(move |_vram| drop(shared));
}

#[test]
fn handles_moved_through_hardware_reads_are_released_later() {
    let gfx = Graphics::new();
    let tiles = SpriteTilesPtr::create(&gfx, &FRAME, BppMode::Bpp4);
    let tiles = gfx.hardware(move |_hw| tiles);
    assert_eq!(gfx.sprite_tiles_usage().used_count(), 4);
    drop(tiles);

    assert_eq!(gfx.sprite_tiles_usage().used_count(), 0);
}
