mod assets;
mod background;
mod scoreboard;
mod ships;

use anyhow::{bail, Result};
use clap::Parser;
use slotgfx_core::config::MAX_SPRITES;
use slotgfx_core::{FixedPoint, Graphics};
use tracing::{info, Level};
use tracing_subscriber::util::SubscriberInitExt;

use crate::background::Starfield;
use crate::scoreboard::Scoreboard;
use crate::ships::Wave;

#[derive(Parser)]
#[command(name = "slotgfx-demo")]
#[command(version, about = "Runs a headless shooter scene against simulated video hardware", long_about = None)]
struct Cli {
    /// Frames to simulate
    #[arg(short, long, default_value_t = 600)]
    frames: u32,

    /// Ships kept on screen at once
    #[arg(short, long, default_value_t = 24)]
    ships: usize,

    /// Maximum log level (error, warn, info, debug, trace)
    #[arg(long, default_value_t = Level::INFO)]
    log_level: Level,
}

fn setup_logging(level: Level) {
    // also forwards `log` records from the managers
    tracing_subscriber::fmt()
        .with_max_level(level)
        .compact()
        .finish()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.log_level);

    // the scoreboard takes a few sprites of its own
    if cli.ships + 5 > MAX_SPRITES {
        bail!("{} ships do not fit in {} sprites", cli.ships, MAX_SPRITES);
    }

    let gfx = Graphics::new();
    let mut starfield = Starfield::new(&gfx);
    let mut scoreboard = Scoreboard::new(&gfx);
    let mut wave = Wave::new(cli.ships);
    let mut score = 0u32;

    info!(frames = cli.frames, ships = cli.ships, "starting");

    for tick in 0..cli.frames {
        let escaped = wave.update(&gfx, tick);
        if escaped > 0 {
            score += escaped;
            starfield.pulse();
        }
        scoreboard.set_score(score);
        starfield.update(&gfx);

        // slow camera sway
        let sway = (tick % 64) as i32;
        let sway = if sway < 32 { sway - 16 } else { 48 - sway };
        gfx.set_camera(FixedPoint::from_ints(sway / 4, 0));

        let stats = gfx.update();
        if tick % 60 == 0 {
            info!(
                tick,
                ships = wave.len(),
                drawn = stats.sprites_drawn,
                written = stats.sprites_written,
                tiles = stats.tiles_uploaded,
                mats = stats.affine_mats_written,
                "frame"
            );
        }
    }

    let sprite_tiles = gfx.sprite_tiles_usage();
    info!(
        score,
        spawned = wave.spawned(),
        short_frames = wave.lost(),
        sprites = gfx.sprites_usage().used_count(),
        affine_mats = gfx.affine_mats_usage().used_count(),
        sprite_palettes = gfx.sprite_palettes_usage().used_count(),
        sprite_tiles = sprite_tiles.used_count(),
        sprite_tiles_items = sprite_tiles.used_items_count(),
        bg_tiles = gfx.bg_tiles_usage().used_count(),
        "done"
    );

    Ok(())
}
