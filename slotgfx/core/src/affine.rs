//! # Affine matrices
//!
//! 32 hardware matrices, shared by sprites that rotate or scale. Unlike tiles
//! and palettes they are never deduplicated: two sprites only share a matrix
//! when one was explicitly handed the other's [`SpriteAffineMatPtr`].
//!
//! Matrix `n` is written into the `affine_param` halfwords of OAM entries
//! `4n..4n+4` during the commit pass, and only when its attributes changed.

use alloc::rc::Rc;
use core::cell::RefCell;
use core::fmt::{Debug, Formatter};
use log::debug;
use slotgfx_fixed::{degrees_cos, degrees_sin, Fixed};

use crate::config::MAX_AFFINE_MATS;
use crate::error::{fatal, optional, ResourceError};
use crate::hw::ObjAttributes;
use crate::managers::Managers;
use crate::pool::{HandlePool, PoolUsage};
use crate::shared::{Resource, Shared};
use crate::Graphics;

/// Rotation, scale and flips of an affine matrix.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AffineMatAttributes {
    rotation_angle: Fixed,
    scale_x: Fixed,
    scale_y: Fixed,
    horizontal_flip: bool,
    vertical_flip: bool,
}

impl Default for AffineMatAttributes {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl AffineMatAttributes {
    pub const IDENTITY: AffineMatAttributes = AffineMatAttributes {
        rotation_angle: Fixed::ZERO,
        scale_x: Fixed::ONE,
        scale_y: Fixed::ONE,
        horizontal_flip: false,
        vertical_flip: false,
    };

    pub fn rotation_angle(&self) -> Fixed {
        self.rotation_angle
    }

    /// Angle in degrees, in [0, 360).
    pub fn set_rotation_angle(&mut self, angle: Fixed) {
        assert!(
            angle >= Fixed::ZERO && angle < Fixed::from_int(360),
            "invalid rotation angle: {}", angle
        );
        self.rotation_angle = angle;
    }

    pub fn scale_x(&self) -> Fixed {
        self.scale_x
    }

    pub fn set_scale_x(&mut self, scale: Fixed) {
        assert!(scale > Fixed::ZERO, "invalid scale x: {}", scale);
        self.scale_x = scale;
    }

    pub fn scale_y(&self) -> Fixed {
        self.scale_y
    }

    pub fn set_scale_y(&mut self, scale: Fixed) {
        assert!(scale > Fixed::ZERO, "invalid scale y: {}", scale);
        self.scale_y = scale;
    }

    pub fn set_scale(&mut self, scale: Fixed) {
        self.set_scale_x(scale);
        self.set_scale_y(scale);
    }

    pub fn horizontal_flip(&self) -> bool {
        self.horizontal_flip
    }

    pub fn set_horizontal_flip(&mut self, flip: bool) {
        self.horizontal_flip = flip;
    }

    pub fn vertical_flip(&self) -> bool {
        self.vertical_flip
    }

    pub fn set_vertical_flip(&mut self, flip: bool) {
        self.vertical_flip = flip;
    }

    /// No rotation and no scale. Flips alone don't need a matrix, regular
    /// objects have their own flip bits.
    pub fn flipped_identity(&self) -> bool {
        self.rotation_angle == Fixed::ZERO && self.scale_x == Fixed::ONE && self.scale_y == Fixed::ONE
    }

    pub fn is_identity(&self) -> bool {
        self.flipped_identity() && !self.horizontal_flip && !self.vertical_flip
    }

    /// Hardware matrix `[pa, pb, pc, pd]` in 8.8 fixed point. It maps screen
    /// space back into texture space, so it is the inverse transform.
    pub fn matrix(&self) -> [i16; 4] {
        let sin = degrees_sin(self.rotation_angle);
        let cos = degrees_cos(self.rotation_angle);

        let mut pa = cos / self.scale_x;
        let mut pb = sin / self.scale_x;
        let mut pc = -sin / self.scale_y;
        let mut pd = cos / self.scale_y;

        if self.horizontal_flip {
            pa = -pa;
            pb = -pb;
        }
        if self.vertical_flip {
            pc = -pc;
            pd = -pd;
        }

        [pa, pb, pc, pd].map(|value| value.to_precision(8).clamp(i16::MIN as i32, i16::MAX as i32) as i16)
    }
}

#[derive(Debug)]
struct AffineRecord {
    attributes: AffineMatAttributes,
    usages: u16,
    dirty: bool,
}

pub struct AffineMatPool {
    items: HandlePool<AffineRecord, MAX_AFFINE_MATS>,
}

impl AffineMatPool {
    pub fn new() -> Self {
        Self { items: HandlePool::new() }
    }

    pub fn create(&mut self, attributes: AffineMatAttributes) -> Result<u16, ResourceError> {
        let record = AffineRecord {
            attributes,
            usages: 1,
            dirty: true,
        };
        let id = self.items.allocate(record).map_err(|_| ResourceError::AffineMatsExhausted)?;

        debug!("affine mat {} created: {:?}", id, attributes);
        Ok(id)
    }

    pub fn increase_usages(&mut self, id: u16) {
        self.items.get_mut(id).usages += 1;
    }

    pub fn decrease_usages(&mut self, id: u16) {
        let record = self.items.get_mut(id);
        assert!(record.usages > 0, "affine mat {} without usages", id);

        record.usages -= 1;
        if record.usages == 0 {
            self.items.release(id);
            debug!("affine mat {} freed", id);
        }
    }

    pub fn usages(&self, id: u16) -> u16 {
        self.items.get(id).usages
    }

    pub fn attributes(&self, id: u16) -> AffineMatAttributes {
        self.items.get(id).attributes
    }

    pub fn set_attributes(&mut self, id: u16, attributes: AffineMatAttributes) {
        let record = self.items.get_mut(id);
        if record.attributes != attributes {
            record.attributes = attributes;
            record.dirty = true;
        }
    }

    pub fn update_attributes(&mut self, id: u16, update: impl FnOnce(&mut AffineMatAttributes)) -> AffineMatAttributes {
        let mut attributes = self.attributes(id);
        update(&mut attributes);
        self.set_attributes(id, attributes);
        attributes
    }

    pub fn usage(&self) -> PoolUsage {
        self.items.usage()
    }

    /// Writes changed matrices into OAM. Returns how many were written.
    pub fn commit(&mut self, oam: &mut [ObjAttributes]) -> u8 {
        let mut written = 0;

        for (id, record) in self.items.iter_mut() {
            if !record.dirty {
                continue;
            }

            let base = id as usize * 4;
            for (entry, param) in oam[base..base + 4].iter_mut().zip(record.attributes.matrix()) {
                entry.affine_param = param;
            }

            record.dirty = false;
            written += 1;
        }

        written
    }
}

impl Default for AffineMatPool {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub enum SpriteAffineMats {}

impl Resource for SpriteAffineMats {
    const NAME: &'static str = "affine mat";

    fn increase_usages(managers: &mut Managers, id: u16) {
        managers.affine_mats.increase_usages(id);
    }

    fn decrease_usages(managers: &mut Managers, id: u16) {
        managers.affine_mats.decrease_usages(id);
    }
}

/// A shared sprite affine matrix.
pub struct SpriteAffineMatPtr {
    shared: Shared<SpriteAffineMats>,
}

impl SpriteAffineMatPtr {
    pub(crate) fn adopt(managers: Rc<RefCell<Managers>>, id: u16) -> Self {
        Self { shared: Shared::adopt(managers, id) }
    }

    pub(crate) fn into_id(self) -> u16 {
        self.shared.into_id()
    }

    pub(crate) fn shared(&self) -> &Shared<SpriteAffineMats> {
        &self.shared
    }

    /// A new identity matrix.
    pub fn create(gfx: &Graphics) -> Self {
        Self::create_with_attributes(gfx, AffineMatAttributes::IDENTITY)
    }

    pub fn create_optional(gfx: &Graphics) -> Option<Self> {
        Self::create_with_attributes_optional(gfx, AffineMatAttributes::IDENTITY)
    }

    pub fn create_with_attributes(gfx: &Graphics, attributes: AffineMatAttributes) -> Self {
        Self::create_impl(gfx, attributes).unwrap_or_else(|error| fatal(SpriteAffineMats::NAME, error))
    }

    pub fn create_with_attributes_optional(gfx: &Graphics, attributes: AffineMatAttributes) -> Option<Self> {
        optional(SpriteAffineMats::NAME, Self::create_impl(gfx, attributes))
    }

    fn create_impl(gfx: &Graphics, attributes: AffineMatAttributes) -> Result<Self, ResourceError> {
        let id = gfx.managers().borrow_mut().affine_mats.create(attributes)?;
        Ok(Self::adopt(gfx.managers().clone(), id))
    }

    /// Hardware matrix index.
    pub fn id(&self) -> u16 {
        self.shared.id()
    }

    pub fn usages(&self) -> u16 {
        self.shared.with(|managers, id| managers.affine_mats.usages(id))
    }

    pub fn attributes(&self) -> AffineMatAttributes {
        self.shared.with(|managers, id| managers.affine_mats.attributes(id))
    }

    pub fn set_attributes(&mut self, attributes: AffineMatAttributes) {
        self.shared.with(|managers, id| managers.affine_mats.set_attributes(id, attributes));
    }

    fn update(&mut self, update: impl FnOnce(&mut AffineMatAttributes)) {
        self.shared.with(|managers, id| {
            managers.affine_mats.update_attributes(id, update);
        });
    }

    pub fn rotation_angle(&self) -> Fixed {
        self.attributes().rotation_angle()
    }

    pub fn set_rotation_angle(&mut self, angle: Fixed) {
        self.update(|attributes| attributes.set_rotation_angle(angle));
    }

    pub fn scale_x(&self) -> Fixed {
        self.attributes().scale_x()
    }

    pub fn set_scale_x(&mut self, scale: Fixed) {
        self.update(|attributes| attributes.set_scale_x(scale));
    }

    pub fn scale_y(&self) -> Fixed {
        self.attributes().scale_y()
    }

    pub fn set_scale_y(&mut self, scale: Fixed) {
        self.update(|attributes| attributes.set_scale_y(scale));
    }

    pub fn set_scale(&mut self, scale: Fixed) {
        self.update(|attributes| attributes.set_scale(scale));
    }

    pub fn horizontal_flip(&self) -> bool {
        self.attributes().horizontal_flip()
    }

    pub fn set_horizontal_flip(&mut self, flip: bool) {
        self.update(|attributes| attributes.set_horizontal_flip(flip));
    }

    pub fn vertical_flip(&self) -> bool {
        self.attributes().vertical_flip()
    }

    pub fn set_vertical_flip(&mut self, flip: bool) {
        self.update(|attributes| attributes.set_vertical_flip(flip));
    }

    pub fn flipped_identity(&self) -> bool {
        self.attributes().flipped_identity()
    }

    pub fn is_identity(&self) -> bool {
        self.attributes().is_identity()
    }
}

impl Clone for SpriteAffineMatPtr {
    fn clone(&self) -> Self {
        Self { shared: self.shared.clone() }
    }
}

impl PartialEq for SpriteAffineMatPtr {
    fn eq(&self, other: &Self) -> bool {
        self.shared == other.shared
    }
}

impl Eq for SpriteAffineMatPtr {}

impl Debug for SpriteAffineMatPtr {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        self.shared.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_matrix() {
        assert_eq!(AffineMatAttributes::IDENTITY.matrix(), [256, 0, 0, 256]);
    }

    #[test]
    fn flips_negate_rows() {
        let mut attributes = AffineMatAttributes::IDENTITY;
        attributes.set_horizontal_flip(true);
        assert_eq!(attributes.matrix(), [-256, 0, 0, 256]);
        assert!(attributes.flipped_identity());
        assert!(!attributes.is_identity());

        attributes.set_vertical_flip(true);
        assert_eq!(attributes.matrix(), [-256, 0, 0, -256]);
    }

    #[test]
    fn rotation_and_scale() {
        let mut attributes = AffineMatAttributes::IDENTITY;
        attributes.set_rotation_angle(Fixed::from_int(90));
        assert_eq!(attributes.matrix(), [0, 256, -256, 0]);

        attributes.set_rotation_angle(Fixed::ZERO);
        attributes.set_scale(Fixed::from_int(2));
        assert_eq!(attributes.matrix(), [128, 0, 0, 128]);
        assert!(!attributes.flipped_identity());
    }

    #[test]
    #[should_panic(expected = "invalid rotation angle")]
    fn full_turn_is_out_of_range() {
        AffineMatAttributes::IDENTITY.set_rotation_angle(Fixed::from_int(360));
    }

    #[test]
    fn pool_writes_only_changed_matrices() {
        let mut pool = AffineMatPool::new();
        let mut oam = [ObjAttributes::default(); 128];
        let id = pool.create(AffineMatAttributes::IDENTITY).unwrap();

        assert_eq!(pool.commit(&mut oam), 1);
        assert_eq!(oam[id as usize * 4].affine_param, 256);
        assert_eq!(pool.commit(&mut oam), 0);

        pool.update_attributes(id, |attributes| attributes.set_scale_x(Fixed::HALF));
        assert_eq!(pool.commit(&mut oam), 1);
        assert_eq!(oam[id as usize * 4].affine_param, 512);
    }

    #[test]
    fn exhaustion() {
        let gfx = Graphics::new();
        let mats: heapless::Vec<SpriteAffineMatPtr, MAX_AFFINE_MATS> =
            (0..MAX_AFFINE_MATS).map(|_| SpriteAffineMatPtr::create(&gfx)).collect();

        assert!(SpriteAffineMatPtr::create_optional(&gfx).is_none());
        assert_eq!(gfx.affine_mats_usage().available_count(), 0);

        drop(mats);
        assert_eq!(gfx.affine_mats_usage().available_count(), MAX_AFFINE_MATS as u16);
    }
}
