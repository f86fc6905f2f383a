use slotgfx_core::{Fixed, FixedPoint, Graphics, SpritePtr};
use tracing::{debug, warn};

use crate::assets;

pub struct Ship {
    pub sprite: SpritePtr,
    pub vx: Fixed,
    pub vy: Fixed,
    pub spin: Fixed,
    pub frame: u16,
}

impl Ship {
    /// Moves and spins the ship. Returns false once it has left the playfield.
    pub fn do_ship_things(&mut self, tick: u32) -> bool {
        let position = self.sprite.position();
        let next = FixedPoint::new(position.x + self.vx, position.y + self.vy);
        self.sprite.set_position(next);

        if self.spin != Fixed::ZERO {
            let angle = (self.sprite.rotation_angle() + self.spin).raw().rem_euclid(Fixed::from_int(360).raw());
            self.sprite.set_rotation_angle(Fixed::from_raw(angle));
        }

        // thruster flicker
        if tick % 8 == 0 {
            self.frame ^= 1;
            self.sprite.set_tiles_item(assets::SHIP.tiles_item(), self.frame);
        }

        next.y.integer() < 100 && next.x.integer().abs() < 140
    }
}

pub struct Wave {
    ships: Vec<Ship>,
    target: usize,
    spawned: u32,
    lost: u32,
}

impl Wave {
    pub fn new(target: usize) -> Self {
        Self { ships: Vec::with_capacity(target), target, spawned: 0, lost: 0 }
    }

    pub fn len(&self) -> usize {
        self.ships.len()
    }

    pub fn lost(&self) -> u32 {
        self.lost
    }

    pub fn spawned(&self) -> u32 {
        self.spawned
    }

    /// Advances every ship and respawns the ones that flew away. Returns how
    /// many ships left the playfield this frame.
    pub fn update(&mut self, gfx: &Graphics, tick: u32) -> u32 {
        let before = self.ships.len();
        self.ships.retain_mut(|ship| ship.do_ship_things(tick));
        let escaped = (before - self.ships.len()) as u32;

        while self.ships.len() < self.target {
            match self.spawn(gfx) {
                Some(ship) => self.ships.push(ship),
                None => {
                    self.lost += 1;
                    warn!(ships = self.ships.len(), "sprite pools full, wave stays short this frame");
                    break;
                }
            }
        }

        escaped
    }

    fn spawn(&mut self, gfx: &Graphics) -> Option<Ship> {
        let seed = self.spawned;
        let column = (seed * 37 % 200) as i32 - 100;
        let position = FixedPoint::from_ints(column, -96);
        let mut sprite = SpritePtr::create_optional(gfx, position, &assets::SHIP)?;

        sprite.set_horizontal_flip(seed % 2 == 1);
        sprite.set_z_order((seed % 4) as i16);
        sprite.set_remove_affine_mat_when_not_needed(true);

        // every third ship spins, which pulls in an affine matrix on demand
        let spin = if seed % 3 == 0 { Fixed::from_int(3) } else { Fixed::ZERO };
        if spin != Fixed::ZERO {
            sprite.set_double_size(true);
        }

        self.spawned += 1;
        debug!(id = sprite.id(), column, "ship spawned");
        Some(Ship {
            sprite,
            vx: Fixed::from_ratio((seed % 5) as i32 - 2, 4),
            vy: Fixed::from_ratio(3 + (seed % 4) as i32, 4),
            spin,
            frame: 0,
        })
    }
}
