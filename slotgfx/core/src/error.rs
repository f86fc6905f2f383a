use core::fmt::{Display, Formatter};
use log::{error, warn};

/// A pool or bank ran out of room.
///
/// Only the `*_optional` entry points let this reach the caller (as `None`);
/// the plain entry points treat it as fatal.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ResourceError {
    /// No free tile range large enough, even after coalescing.
    OutOfTileMemory { requested: u16, available: u16 },
    /// The tile range table is full.
    TileItemsExhausted,
    /// No free palette bank (or bank run, for 8bpp palettes).
    PaletteBanksExhausted,
    AffineMatsExhausted,
    SpritesExhausted,
    BgsExhausted,
}

impl Display for ResourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            ResourceError::OutOfTileMemory { requested, available } => {
                write!(f, "out of tile memory: requested {} tiles, {} available", requested, available)
            }
            ResourceError::TileItemsExhausted => write!(f, "no more tile items allowed"),
            ResourceError::PaletteBanksExhausted => write!(f, "no free palette banks"),
            ResourceError::AffineMatsExhausted => write!(f, "no free affine matrices"),
            ResourceError::SpritesExhausted => write!(f, "no free sprite slots"),
            ResourceError::BgsExhausted => write!(f, "no free backgrounds"),
        }
    }
}

/// Exhaustion on a non-optional entry point.
pub(crate) fn fatal(what: &str, error: ResourceError) -> ! {
    error!("{} creation failed: {}", what, error);
    panic!("{} creation failed: {}", what, error)
}

pub(crate) fn optional<T>(what: &str, result: Result<T, ResourceError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            warn!("{} creation failed: {}", what, error);
            None
        }
    }
}
