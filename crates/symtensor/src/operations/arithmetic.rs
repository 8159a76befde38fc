//! Elementwise arithmetic between tensors and with scalars.
//!
//! Two tensors combine over the union of their blocks: a block present on
//! only one side meets zeros on the other. The right operand is transposed
//! to the left operand's axis order first, and a rank-0 operand broadcasts.

use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use crate::arena::ScratchArena;
use crate::edge::Edge;
use crate::error::TensorError;
use crate::name::EdgeName;
use crate::scalar::{Scalar, c32, c64};
use crate::storage::Core;
use crate::symmetry::Symmetry;
use crate::tensor::Tensor;

/// Union of two edges of the same axis.
fn union_edge<S: Symmetry>(name: &impl std::fmt::Debug, a: &Edge<S>, b: &Edge<S>) -> Result<Edge<S>, TensorError> {
    if a.arrow() != b.arrow() {
        return Err(TensorError::EdgeMismatch {
            name: format!("{name:?}"),
        });
    }
    let mut segments = Vec::with_capacity(a.segments().len() + b.segments().len());
    let (mut i, mut j) = (0, 0);
    let (sa, sb) = (a.segments(), b.segments());
    while i < sa.len() || j < sb.len() {
        match (sa.get(i), sb.get(j)) {
            (Some(&x), Some(&y)) if x.0 == y.0 => {
                if x.1 != y.1 {
                    return Err(TensorError::DimensionMismatch {
                        name: format!("{name:?}"),
                        expected: x.1,
                        actual: y.1,
                    });
                }
                segments.push(x);
                i += 1;
                j += 1;
            }
            (Some(&x), Some(&y)) if x.0 < y.0 => {
                segments.push(x);
                i += 1;
            }
            (Some(&x), None) => {
                segments.push(x);
                i += 1;
            }
            (_, Some(&y)) => {
                segments.push(y);
                j += 1;
            }
            (None, None) => break,
        }
    }
    Ok(Edge::from_sorted(segments, a.arrow()))
}

impl<T: Scalar, S: Symmetry, N: EdgeName> Tensor<T, S, N> {
    /// Combine with `other` element by element.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the name sets differ, `DimensionMismatch`
    /// if a shared segment differs in size and `EdgeMismatch` if fermi arrows
    /// disagree.
    pub fn zip_with(&self, other: &Self, mut f: impl FnMut(T, T) -> T) -> Result<Self, TensorError> {
        if other.rank() == 0 {
            let y = other.to_scalar()?;
            return Ok(self.map(|x| f(x, y)));
        }
        if self.rank() == 0 {
            let x = self.to_scalar()?;
            return Ok(other.map(|y| f(x, y)));
        }
        if self.rank() != other.rank() || self.names().iter().any(|n| !other.contains(n)) {
            return Err(TensorError::InvalidArgument {
                message: format!(
                    "elementwise operands have different edges: {:?} and {:?}",
                    self.names(),
                    other.names()
                ),
            });
        }
        let other = if other.names() == self.names() {
            other.clone()
        } else {
            other.transpose(self.names().to_vec())?
        };

        let edges = self
            .names()
            .iter()
            .zip(self.edges().iter().zip(other.edges()))
            .map(|(name, (a, b))| union_edge(name, a, b))
            .collect::<Result<Vec<_>, _>>()?;
        let arena = ScratchArena::for_rank(edges.len());
        let (edges, blocks, mut data) = Core::<T, S>::new(edges, &arena).into_parts();
        let (left, right) = (self.core(), other.core());
        for entry in blocks.iter() {
            let key = entry.key.symmetries();
            let a = left.block(key);
            let b = right.block(key);
            for (k, d) in data[entry.offset..entry.offset + entry.len].iter_mut().enumerate() {
                let x = a.map_or_else(T::zero, |a| a[k]);
                let y = b.map_or_else(T::zero, |b| b[k]);
                *d = f(x, y);
            }
        }
        Ok(self.with_core(Core::from_parts(edges, blocks, data)))
    }

    /// Elementwise sum.
    ///
    /// # Example
    ///
    /// ```
    /// use symtensor::{Edge, Tensor};
    ///
    /// let mut a: Tensor<f64> = Tensor::new(["i", "j"], [Edge::trivial(2), Edge::trivial(2)]).unwrap();
    /// a.range(0.0, 1.0);
    /// let b = a.transpose(["j", "i"]).unwrap();
    /// // b is matched to a by name, so this doubles a
    /// let c = a.try_add(&b).unwrap();
    /// assert_eq!(c.storage(), &[0.0, 2.0, 4.0, 6.0]);
    /// ```
    pub fn try_add(&self, other: &Self) -> Result<Self, TensorError> {
        self.zip_with(other, |x, y| x + y)
    }

    /// Elementwise difference.
    pub fn try_sub(&self, other: &Self) -> Result<Self, TensorError> {
        self.zip_with(other, |x, y| x - y)
    }

    /// Elementwise product.
    pub fn try_mul(&self, other: &Self) -> Result<Self, TensorError> {
        self.zip_with(other, |x, y| x * y)
    }

    /// Elementwise quotient; blocks present on one side only divide by zero.
    pub fn try_div(&self, other: &Self) -> Result<Self, TensorError> {
        self.zip_with(other, |x, y| x / y)
    }

    /// In-place elementwise sum.
    pub fn try_add_assign(&mut self, other: &Self) -> Result<&mut Self, TensorError> {
        *self = self.try_add(other)?;
        Ok(self)
    }

    pub fn try_sub_assign(&mut self, other: &Self) -> Result<&mut Self, TensorError> {
        *self = self.try_sub(other)?;
        Ok(self)
    }

    pub fn try_mul_assign(&mut self, other: &Self) -> Result<&mut Self, TensorError> {
        *self = self.try_mul(other)?;
        Ok(self)
    }

    pub fn try_div_assign(&mut self, other: &Self) -> Result<&mut Self, TensorError> {
        *self = self.try_div(other)?;
        Ok(self)
    }
}

macro_rules! scalar_op {
    ($Op:ident, $op:ident, $OpAssign:ident, $op_assign:ident, $f:expr) => {
        impl<T: Scalar, S: Symmetry, N: EdgeName> $Op<T> for &Tensor<T, S, N> {
            type Output = Tensor<T, S, N>;

            fn $op(self, rhs: T) -> Tensor<T, S, N> {
                let f: fn(T, T) -> T = $f;
                self.map(|x| f(x, rhs))
            }
        }

        impl<T: Scalar, S: Symmetry, N: EdgeName> $Op<T> for Tensor<T, S, N> {
            type Output = Tensor<T, S, N>;

            fn $op(mut self, rhs: T) -> Tensor<T, S, N> {
                self.$op_assign(rhs);
                self
            }
        }

        impl<T: Scalar, S: Symmetry, N: EdgeName> $OpAssign<T> for Tensor<T, S, N> {
            fn $op_assign(&mut self, rhs: T) {
                let f: fn(T, T) -> T = $f;
                self.transform(|x| f(x, rhs));
            }
        }
    };
}

scalar_op!(Add, add, AddAssign, add_assign, |x, y| x + y);
scalar_op!(Sub, sub, SubAssign, sub_assign, |x, y| x - y);
scalar_op!(Mul, mul, MulAssign, mul_assign, |x, y| x * y);
scalar_op!(Div, div, DivAssign, div_assign, |x, y| x / y);

macro_rules! scalar_lhs_op {
    ($T:ty) => {
        impl<S: Symmetry, N: EdgeName> Add<&Tensor<$T, S, N>> for $T {
            type Output = Tensor<$T, S, N>;

            fn add(self, rhs: &Tensor<$T, S, N>) -> Tensor<$T, S, N> {
                rhs.map(|y| self + y)
            }
        }

        impl<S: Symmetry, N: EdgeName> Sub<&Tensor<$T, S, N>> for $T {
            type Output = Tensor<$T, S, N>;

            fn sub(self, rhs: &Tensor<$T, S, N>) -> Tensor<$T, S, N> {
                rhs.map(|y| self - y)
            }
        }

        impl<S: Symmetry, N: EdgeName> Mul<&Tensor<$T, S, N>> for $T {
            type Output = Tensor<$T, S, N>;

            fn mul(self, rhs: &Tensor<$T, S, N>) -> Tensor<$T, S, N> {
                rhs.map(|y| self * y)
            }
        }

        impl<S: Symmetry, N: EdgeName> Div<&Tensor<$T, S, N>> for $T {
            type Output = Tensor<$T, S, N>;

            fn div(self, rhs: &Tensor<$T, S, N>) -> Tensor<$T, S, N> {
                rhs.map(|y| self / y)
            }
        }
    };
}

scalar_lhs_op!(f32);
scalar_lhs_op!(f64);
scalar_lhs_op!(c32);
scalar_lhs_op!(c64);

impl<T: Scalar, S: Symmetry, N: EdgeName> Neg for &Tensor<T, S, N> {
    type Output = Tensor<T, S, N>;

    fn neg(self) -> Tensor<T, S, N> {
        self.map(|x| -x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symmetry::{FermiZ2, U1};

    fn u1_edge(segments: &[(i32, usize)]) -> Edge<U1> {
        Edge::new(segments.iter().map(|&(s, d)| (U1(s), d))).unwrap()
    }

    #[test]
    fn test_add_over_block_union() {
        let mut a: Tensor<f64, U1> =
            Tensor::new(["i", "j"], [u1_edge(&[(0, 1)]), u1_edge(&[(0, 1)])]).unwrap();
        a.set(|| 2.0);
        let mut b: Tensor<f64, U1> =
            Tensor::new(["i", "j"], [u1_edge(&[(0, 1), (1, 2)]), u1_edge(&[(-1, 2), (0, 1)])]).unwrap();
        b.set(|| 1.0);
        let c = a.try_add(&b).unwrap();
        assert_eq!(c.edges(), b.edges());
        assert_eq!(c.storage(), &[3.0, 1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_transposed_operand() {
        let mut a: Tensor<f64> =
            Tensor::new(["i", "j"], [Edge::trivial(2), Edge::trivial(3)]).unwrap();
        a.range(1.0, 1.0);
        let b = a.transpose(["j", "i"]).unwrap();
        let d = a.try_sub(&b).unwrap();
        assert!(d.storage().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_rank_zero_broadcast() {
        let mut a: Tensor<f64> = Tensor::new(["i"], [Edge::trivial(3)]).unwrap();
        a.range(1.0, 1.0);
        let two = Tensor::scalar(2.0);
        assert_eq!(a.try_mul(&two).unwrap().storage(), &[2.0, 4.0, 6.0]);
        assert_eq!(two.try_div(&a).unwrap().storage()[1], 1.0);
    }

    #[test]
    fn test_mismatches() {
        let a: Tensor<f64, U1> = Tensor::new(["i"], [u1_edge(&[(0, 1)])]).unwrap();
        let b: Tensor<f64, U1> = Tensor::new(["i"], [u1_edge(&[(0, 2)])]).unwrap();
        assert!(matches!(a.try_add(&b), Err(TensorError::DimensionMismatch { .. })));
        let c: Tensor<f64, U1> = Tensor::new(["k"], [u1_edge(&[(0, 1)])]).unwrap();
        assert!(matches!(a.try_add(&c), Err(TensorError::InvalidArgument { .. })));

        let e = Edge::new([(FermiZ2(false), 1)]).unwrap();
        let f: Tensor<f64, FermiZ2> = Tensor::new(["i"], [e.clone()]).unwrap();
        let g: Tensor<f64, FermiZ2> = Tensor::new(["i"], [e.with_arrow(true)]).unwrap();
        assert!(matches!(f.try_add(&g), Err(TensorError::EdgeMismatch { .. })));
    }

    #[test]
    fn test_scalar_operators() {
        let mut a: Tensor<f64> = Tensor::new(["i"], [Edge::trivial(2)]).unwrap();
        a.range(1.0, 1.0);
        assert_eq!((&a + 1.0).storage(), &[2.0, 3.0]);
        assert_eq!((&a * 3.0).storage(), &[3.0, 6.0]);
        assert_eq!((6.0 / &a).storage(), &[6.0, 3.0]);
        assert_eq!((1.0 - &a).storage(), &[0.0, -1.0]);
        assert_eq!((-&a).storage(), &[-1.0, -2.0]);
        let shared = a.clone();
        a -= 1.0;
        assert_eq!(a.storage(), &[0.0, 1.0]);
        assert_eq!(shared.storage(), &[1.0, 2.0]);
        a /= 2.0;
        assert_eq!(a.storage(), &[0.0, 0.5]);
    }

    #[test]
    fn test_single_precision_scalar_on_left() {
        let mut a: Tensor<f32> = Tensor::new(["i"], [Edge::trivial(2)]).unwrap();
        a.range(1.0, 1.0);
        assert_eq!((2.0f32 * &a).storage(), &[2.0, 4.0]);
        let z: Tensor<c32> = a.to::<c32>();
        let shifted = c32::new(0.0, 1.0) + &z;
        assert_eq!(shifted.storage(), &[c32::new(1.0, 1.0), c32::new(2.0, 1.0)]);
    }

    #[test]
    fn test_in_place_tensor_ops() {
        let mut a: Tensor<f64> = Tensor::new(["i"], [Edge::trivial(2)]).unwrap();
        a.set(|| 2.0);
        let b = a.clone();
        a.try_mul_assign(&b).unwrap().try_add_assign(&b).unwrap();
        assert_eq!(a.storage(), &[6.0, 6.0]);
    }
}
