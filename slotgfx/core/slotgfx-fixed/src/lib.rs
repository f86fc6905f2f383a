//! # Fixed point values
//!
//! Signed 20.12 fixed point numbers and 2D points built on them, plus the
//! integer sine/cosine the affine matrix code needs. Everything here is a plain
//! `Copy` value: no allocation, no floating point math beyond the `from_f32`
//! convenience constructor.

#![no_std]

use core::fmt::{Debug, Display, Formatter};
use core::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// Fractional bits of a [`Fixed`].
pub const PRECISION: u32 = 12;

const ONE: i32 = 1 << PRECISION;

/// A signed fixed point number with [`PRECISION`] fractional bits.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fixed(i32);

impl Fixed {
    pub const ZERO: Fixed = Fixed(0);
    pub const ONE: Fixed = Fixed(ONE);
    pub const HALF: Fixed = Fixed(ONE / 2);

    #[inline(always)]
    pub const fn from_raw(raw: i32) -> Self {
        Fixed(raw)
    }

    #[inline(always)]
    pub const fn from_int(value: i32) -> Self {
        Fixed(value << PRECISION)
    }

    /// `numerator / denominator`, truncated toward zero.
    pub const fn from_ratio(numerator: i32, denominator: i32) -> Self {
        Fixed((((numerator as i64) << PRECISION) / denominator as i64) as i32)
    }

    pub fn from_f32(value: f32) -> Self {
        let scaled = value * ONE as f32;
        let rounded = if scaled >= 0.0 { scaled + 0.5 } else { scaled - 0.5 };
        Fixed(rounded as i32)
    }

    #[inline(always)]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Integer part, rounded toward negative infinity.
    #[inline(always)]
    pub const fn integer(self) -> i32 {
        self.0 >> PRECISION
    }

    /// Nearest integer, halves rounded up.
    #[inline(always)]
    pub const fn round_integer(self) -> i32 {
        (self.0 + ONE / 2) >> PRECISION
    }

    #[inline(always)]
    pub const fn fraction(self) -> i32 {
        self.0 & (ONE - 1)
    }

    pub const fn abs(self) -> Self {
        Fixed(self.0.abs())
    }

    /// Raw value re-expressed with `bits` fractional bits (e.g. 8 for the 8.8
    /// values affine hardware registers expect).
    pub const fn to_precision(self, bits: u32) -> i32 {
        if bits <= PRECISION {
            self.0 >> (PRECISION - bits)
        } else {
            self.0 << (bits - PRECISION)
        }
    }

    pub fn to_f32(self) -> f32 {
        self.0 as f32 / ONE as f32
    }

    pub const fn min(self, other: Fixed) -> Fixed {
        if self.0 < other.0 { self } else { other }
    }

    pub const fn max(self, other: Fixed) -> Fixed {
        if self.0 > other.0 { self } else { other }
    }

    pub const fn clamp(self, low: Fixed, high: Fixed) -> Fixed {
        self.max(low).min(high)
    }
}

impl From<i32> for Fixed {
    fn from(value: i32) -> Self {
        Fixed::from_int(value)
    }
}

impl Add for Fixed {
    type Output = Fixed;

    #[inline(always)]
    fn add(self, rhs: Fixed) -> Fixed {
        Fixed(self.0 + rhs.0)
    }
}

impl AddAssign for Fixed {
    #[inline(always)]
    fn add_assign(&mut self, rhs: Fixed) {
        self.0 += rhs.0;
    }
}

impl Sub for Fixed {
    type Output = Fixed;

    #[inline(always)]
    fn sub(self, rhs: Fixed) -> Fixed {
        Fixed(self.0 - rhs.0)
    }
}

impl SubAssign for Fixed {
    #[inline(always)]
    fn sub_assign(&mut self, rhs: Fixed) {
        self.0 -= rhs.0;
    }
}

impl Neg for Fixed {
    type Output = Fixed;

    #[inline(always)]
    fn neg(self) -> Fixed {
        Fixed(-self.0)
    }
}

impl Mul for Fixed {
    type Output = Fixed;

    #[inline(always)]
    fn mul(self, rhs: Fixed) -> Fixed {
        Fixed(((self.0 as i64 * rhs.0 as i64) >> PRECISION) as i32)
    }
}

impl Mul<i32> for Fixed {
    type Output = Fixed;

    #[inline(always)]
    fn mul(self, rhs: i32) -> Fixed {
        Fixed(self.0 * rhs)
    }
}

impl Div for Fixed {
    type Output = Fixed;

    fn div(self, rhs: Fixed) -> Fixed {
        assert!(rhs.0 != 0, "division of {} by zero", self);
        Fixed((((self.0 as i64) << PRECISION) / rhs.0 as i64) as i32)
    }
}

impl Div<i32> for Fixed {
    type Output = Fixed;

    fn div(self, rhs: i32) -> Fixed {
        assert!(rhs != 0, "division of {} by zero", self);
        Fixed(self.0 / rhs)
    }
}

impl Debug for Fixed {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "Fixed({})", self.to_f32())
    }
}

impl Display for Fixed {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.to_f32())
    }
}

/// A 2D point (or offset) in fixed point coordinates.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq, Hash)]
pub struct FixedPoint {
    pub x: Fixed,
    pub y: Fixed,
}

impl FixedPoint {
    pub const ZERO: FixedPoint = FixedPoint { x: Fixed::ZERO, y: Fixed::ZERO };

    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    pub const fn from_ints(x: i32, y: i32) -> Self {
        Self { x: Fixed::from_int(x), y: Fixed::from_int(y) }
    }
}

impl Add for FixedPoint {
    type Output = FixedPoint;

    fn add(self, rhs: FixedPoint) -> FixedPoint {
        FixedPoint::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for FixedPoint {
    fn add_assign(&mut self, rhs: FixedPoint) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for FixedPoint {
    type Output = FixedPoint;

    fn sub(self, rhs: FixedPoint) -> FixedPoint {
        FixedPoint::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for FixedPoint {
    type Output = FixedPoint;

    fn neg(self) -> FixedPoint {
        FixedPoint::new(-self.x, -self.y)
    }
}

const DEGREES_180: i64 = 180 << PRECISION;
const DEGREES_360: i32 = 360 << PRECISION;

/// Sine of an angle given in degrees.
///
/// Bhaskara I's rational approximation: exact at multiples of 30 degrees,
/// off by less than 0.002 anywhere else.
pub fn degrees_sin(angle: Fixed) -> Fixed {
    let mut x = angle.0.rem_euclid(DEGREES_360) as i64;
    let negative = x >= DEGREES_180;
    if negative {
        x -= DEGREES_180;
    }

    let p = (x * (DEGREES_180 - x)) >> PRECISION;
    let numerator = 4 * p;
    let denominator = (40500i64 << PRECISION) - p;
    let result = ((numerator << PRECISION) / denominator) as i32;

    Fixed(if negative { -result } else { result })
}

/// Cosine of an angle given in degrees.
pub fn degrees_cos(angle: Fixed) -> Fixed {
    degrees_sin(angle + Fixed::from_int(90))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_and_fraction_parts() {
        let value = Fixed::from_ratio(7, 2);
        assert_eq!(value.integer(), 3);
        assert_eq!(value.fraction(), ONE / 2);
        assert_eq!(value.round_integer(), 4);
        assert_eq!(Fixed::from_ratio(-1, 2).integer(), -1);
    }

    #[test]
    fn arithmetic() {
        let a = Fixed::from_f32(1.5);
        let b = Fixed::from_int(2);
        assert_eq!(a * b, Fixed::from_int(3));
        assert_eq!(b / Fixed::from_int(4), Fixed::HALF);
        assert_eq!(a + a, Fixed::from_int(3));
        assert_eq!(-(a - b), Fixed::HALF);
        assert_eq!(Fixed::from_int(5) / 2, Fixed::from_ratio(5, 2));
    }

    #[test]
    fn to_precision_for_affine_registers() {
        assert_eq!(Fixed::ONE.to_precision(8), 256);
        assert_eq!(Fixed::from_ratio(-1, 2).to_precision(8), -128);
    }

    #[test]
    fn sine_is_exact_on_known_angles() {
        assert_eq!(degrees_sin(Fixed::ZERO), Fixed::ZERO);
        assert_eq!(degrees_sin(Fixed::from_int(30)), Fixed::HALF);
        assert_eq!(degrees_sin(Fixed::from_int(90)), Fixed::ONE);
        assert_eq!(degrees_sin(Fixed::from_int(270)), -Fixed::ONE);
        assert_eq!(degrees_cos(Fixed::ZERO), Fixed::ONE);
        assert_eq!(degrees_cos(Fixed::from_int(180)), -Fixed::ONE);
    }

    #[test]
    fn sine_wraps_negative_angles() {
        assert_eq!(degrees_sin(Fixed::from_int(-90)), -Fixed::ONE);
        assert_eq!(degrees_sin(Fixed::from_int(450)), Fixed::ONE);
    }

    #[test]
    fn sine_error_is_small() {
        let expected = Fixed::from_f32(0.70710677);
        let error = (degrees_sin(Fixed::from_int(45)) - expected).abs();
        assert!(error < Fixed::from_ratio(1, 500), "error too big: {}", error);
    }

    #[test]
    fn point_math() {
        let a = FixedPoint::from_ints(3, 4);
        let b = FixedPoint::from_ints(1, 1);
        assert_eq!(a - b, FixedPoint::from_ints(2, 3));
        assert_eq!(a + b, FixedPoint::from_ints(4, 5));
        assert_eq!(-b, FixedPoint::from_ints(-1, -1));
    }
}
