//! Abelian symmetry groups labelling edge segments.
//!
//! A symmetry value is a conserved quantum number. Blocks of a tensor are
//! stored only when the charges of their segments add up to the identity.
//! Fermionic groups additionally carry a parity bit that enters the sign
//! rules of edge operations.

use std::fmt::Debug;
use std::hash::Hash;
use std::ops::{Add, Neg, Sub};

/// An abelian group element attached to a segment of an edge.
///
/// The identity element is `Default::default()`. The total order is only
/// used to keep segments and block keys in a canonical order.
pub trait Symmetry:
    Copy
    + Debug
    + Default
    + Eq
    + Ord
    + Hash
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Neg<Output = Self>
{
    /// Whether parity participates in sign rules.
    const IS_FERMI: bool;

    /// Whether the group has a single element (no conserved quantity).
    const IS_TRIVIAL: bool;

    /// Fermionic parity of this value; always `false` for bosonic groups.
    fn parity(&self) -> bool;

    /// Whether this value is the group identity.
    fn is_identity(&self) -> bool {
        *self == Self::default()
    }

    /// Contribution of a segment value to the conservation law on an edge
    /// with the given arrow.
    ///
    /// Incoming fermionic edges (`arrow == true`) contribute the negated
    /// value. Bosonic groups ignore the arrow.
    #[inline]
    fn charge(self, arrow: bool) -> Self {
        if Self::IS_FERMI && arrow { -self } else { self }
    }

    /// Segment value whose charge on an edge with `arrow` equals `charge`.
    #[inline]
    fn from_charge(charge: Self, arrow: bool) -> Self {
        // charge() is an involution for a fixed arrow
        charge.charge(arrow)
    }
}

/// Trivial group: every edge has a single segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NoSymmetry;

/// Bosonic Z2 parity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Z2(pub bool);

/// Bosonic U(1) charge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct U1(pub i32);

/// Fermionic Z2: the value is the parity itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FermiZ2(pub bool);

/// Fermionic U(1): particle number, parity is the number mod 2.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FermiU1(pub i32);

macro_rules! z2_group {
    ($ty:ident) => {
        impl Add for $ty {
            type Output = Self;
            fn add(self, rhs: Self) -> Self {
                $ty(self.0 ^ rhs.0)
            }
        }

        impl Sub for $ty {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self {
                $ty(self.0 ^ rhs.0)
            }
        }

        impl Neg for $ty {
            type Output = Self;
            fn neg(self) -> Self {
                self
            }
        }
    };
}

macro_rules! u1_group {
    ($ty:ident) => {
        impl Add for $ty {
            type Output = Self;
            fn add(self, rhs: Self) -> Self {
                $ty(self.0 + rhs.0)
            }
        }

        impl Sub for $ty {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self {
                $ty(self.0 - rhs.0)
            }
        }

        impl Neg for $ty {
            type Output = Self;
            fn neg(self) -> Self {
                $ty(-self.0)
            }
        }
    };
}

z2_group!(Z2);
z2_group!(FermiZ2);
u1_group!(U1);
u1_group!(FermiU1);

impl Add for NoSymmetry {
    type Output = Self;
    fn add(self, _: Self) -> Self {
        NoSymmetry
    }
}

impl Sub for NoSymmetry {
    type Output = Self;
    fn sub(self, _: Self) -> Self {
        NoSymmetry
    }
}

impl Neg for NoSymmetry {
    type Output = Self;
    fn neg(self) -> Self {
        NoSymmetry
    }
}

impl Symmetry for NoSymmetry {
    const IS_FERMI: bool = false;
    const IS_TRIVIAL: bool = true;

    fn parity(&self) -> bool {
        false
    }
}

impl Symmetry for Z2 {
    const IS_FERMI: bool = false;
    const IS_TRIVIAL: bool = false;

    fn parity(&self) -> bool {
        false
    }
}

impl Symmetry for U1 {
    const IS_FERMI: bool = false;
    const IS_TRIVIAL: bool = false;

    fn parity(&self) -> bool {
        false
    }
}

impl Symmetry for FermiZ2 {
    const IS_FERMI: bool = true;
    const IS_TRIVIAL: bool = false;

    fn parity(&self) -> bool {
        self.0
    }
}

impl Symmetry for FermiU1 {
    const IS_FERMI: bool = true;
    const IS_TRIVIAL: bool = false;

    fn parity(&self) -> bool {
        self.0.rem_euclid(2) == 1
    }
}

/// Parity of `sum_{a<b} p_a p_b`, the sign picked up when a group of
/// fermionic axes is fused into one (or split back).
pub(crate) fn pair_parity(parities: impl IntoIterator<Item = bool>) -> bool {
    let odd = parities.into_iter().filter(|&p| p).count();
    // C(odd, 2) mod 2
    (odd * odd.saturating_sub(1) / 2) % 2 == 1
}
