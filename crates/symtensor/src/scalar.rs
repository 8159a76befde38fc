//! Scalar trait for tensor element types.

use faer_traits::ComplexField;
use std::fmt::Debug;
use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};

pub use faer::{c32, c64};

/// Trait for scalar types supported by symtensor.
///
/// This trait wraps faer's `ComplexField` with the arithmetic the block
/// kernels need, plus a few conversions through `c64` and `f64`.
pub trait Scalar:
    ComplexField
    + Copy
    + Debug
    + Default
    + PartialEq
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
{
    /// Returns the additive identity (zero).
    fn zero() -> Self {
        Self::default()
    }

    /// Returns the multiplicative identity (one).
    fn one() -> Self;

    /// Embed a real number.
    fn from_real(value: f64) -> Self;

    /// Real part.
    fn real_part(self) -> f64;

    /// Absolute value.
    fn modulus(self) -> f64;

    /// Complex conjugate (identity for real types).
    fn conjugate(self) -> Self;

    /// Widen to a complex number.
    fn to_complex(self) -> c64;

    /// Narrow from a complex number; real types keep the real part.
    fn from_complex(value: c64) -> Self;
}

impl Scalar for f64 {
    fn one() -> Self {
        1.0
    }

    fn from_real(value: f64) -> Self {
        value
    }

    fn real_part(self) -> f64 {
        self
    }

    fn modulus(self) -> f64 {
        self.abs()
    }

    fn conjugate(self) -> Self {
        self
    }

    fn to_complex(self) -> c64 {
        c64::new(self, 0.0)
    }

    fn from_complex(value: c64) -> Self {
        value.re
    }
}

impl Scalar for c64 {
    fn one() -> Self {
        c64::new(1.0, 0.0)
    }

    fn from_real(value: f64) -> Self {
        c64::new(value, 0.0)
    }

    fn real_part(self) -> f64 {
        self.re
    }

    fn modulus(self) -> f64 {
        self.re.hypot(self.im)
    }

    fn conjugate(self) -> Self {
        c64::new(self.re, -self.im)
    }

    fn to_complex(self) -> c64 {
        self
    }

    fn from_complex(value: c64) -> Self {
        value
    }
}

impl Scalar for f32 {
    fn one() -> Self {
        1.0
    }

    fn from_real(value: f64) -> Self {
        value as f32
    }

    fn real_part(self) -> f64 {
        f64::from(self)
    }

    fn modulus(self) -> f64 {
        f64::from(self.abs())
    }

    fn conjugate(self) -> Self {
        self
    }

    fn to_complex(self) -> c64 {
        c64::new(f64::from(self), 0.0)
    }

    fn from_complex(value: c64) -> Self {
        value.re as f32
    }
}

impl Scalar for c32 {
    fn one() -> Self {
        c32::new(1.0, 0.0)
    }

    fn from_real(value: f64) -> Self {
        c32::new(value as f32, 0.0)
    }

    fn real_part(self) -> f64 {
        f64::from(self.re)
    }

    fn modulus(self) -> f64 {
        f64::from(self.re).hypot(f64::from(self.im))
    }

    fn conjugate(self) -> Self {
        c32::new(self.re, -self.im)
    }

    fn to_complex(self) -> c64 {
        c64::new(f64::from(self.re), f64::from(self.im))
    }

    fn from_complex(value: c64) -> Self {
        c32::new(value.re as f32, value.im as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faer_traits::ComplexField;

    #[test]
    fn test_f64_is_real() {
        assert!(<f64 as ComplexField>::IS_REAL);
    }

    #[test]
    fn test_c64_is_not_real() {
        assert!(!<c64 as ComplexField>::IS_REAL);
    }

    #[test]
    fn test_zero_one() {
        assert_eq!(f64::zero(), 0.0);
        assert_eq!(f64::one(), 1.0);
        assert_eq!(c64::zero(), c64::new(0.0, 0.0));
        assert_eq!(c64::one(), c64::new(1.0, 0.0));
    }

    #[test]
    fn test_conjugate_and_modulus() {
        let z = c64::new(3.0, -4.0);
        assert_eq!(Scalar::conjugate(z), c64::new(3.0, 4.0));
        assert_eq!(z.modulus(), 5.0);
        assert_eq!((-2.0f64).modulus(), 2.0);
    }

    #[test]
    fn test_complex_round_trip_drops_imaginary_for_real() {
        let z = c64::new(1.5, 2.0);
        assert_eq!(f64::from_complex(z), 1.5);
        assert_eq!(c64::from_complex(2.5f64.to_complex()), c64::new(2.5, 0.0));
    }

    #[test]
    fn test_single_precision_widens() {
        let z = c32::new(3.0, -4.0);
        assert_eq!(z.modulus(), 5.0);
        assert_eq!(z.to_complex(), c64::new(3.0, -4.0));
        assert_eq!(c32::from_complex(c64::new(0.5, 0.25)), c32::new(0.5, 0.25));
        assert_eq!(f32::from_real(2.0), 2.0f32);
        assert_eq!((-1.5f32).modulus(), 1.5);
    }
}
