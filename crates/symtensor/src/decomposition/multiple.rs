//! Absorbing singular values into a neighbouring tensor.

use std::collections::BTreeMap;

use crate::error::TensorError;
use crate::name::EdgeName;
use crate::scalar::Scalar;
use crate::symmetry::Symmetry;
use crate::tensor::Tensor;

/// The side of a singular value tensor that faces the scaled axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SvdFactor {
    /// The axis was `common_u` of an SVD.
    U,
    /// The axis was `common_v` of an SVD.
    V,
}

impl<T: Scalar, S: Symmetry, N: EdgeName> Tensor<T, S, N> {
    /// Scale the axis `name` by the diagonal of the singular value tensor `s`.
    ///
    /// Equivalent to contracting with `s` and renaming the new axis back to
    /// `name`, without a block product. With `division` the axis is divided
    /// by the diagonal instead.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `s` is not rank 2, `SymmetryNotFound` if
    /// a segment of the axis has no diagonal block in `s` and
    /// `DimensionMismatch` if a diagonal has the wrong length.
    pub fn multiple(
        &self,
        s: &Self,
        name: impl Into<N>,
        side: SvdFactor,
        division: bool,
    ) -> Result<Self, TensorError> {
        let name = name.into();
        let axis = self.axis(&name)?;
        if s.rank() != 2 {
            return Err(TensorError::InvalidArgument {
                message: format!("singular values must be rank 2, got rank {}", s.rank()),
            });
        }
        let facing = match side {
            SvdFactor::U => 0,
            SvdFactor::V => 1,
        };
        let columns = s.core().edge(1);
        let diagonals: BTreeMap<S, Vec<T>> = s
            .core()
            .iter_blocks()
            .filter_map(|(entry, data)| {
                let key = entry.key.symmetries();
                let width = columns.dimension_of(key[1])?;
                let length = data.len() / width;
                Some((key[facing], (0..length.min(width)).map(|i| data[i * width + i]).collect()))
            })
            .collect();

        let edge = self.core().edge(axis);
        for &(value, dim) in edge.segments() {
            let partner = edge.partner_value(value);
            match diagonals.get(&partner) {
                None => {
                    return Err(TensorError::SymmetryNotFound {
                        name: format!("{name:?}"),
                        symmetry: format!("{partner:?}"),
                    });
                }
                Some(d) if d.len() != dim => {
                    return Err(TensorError::DimensionMismatch {
                        name: format!("{name:?}"),
                        expected: dim,
                        actual: d.len(),
                    });
                }
                Some(_) => {}
            }
        }

        let plan: Vec<(usize, usize, S, usize, usize)> = self
            .core()
            .blocks()
            .iter()
            .filter_map(|entry| {
                let key = entry.key.symmetries();
                let shape = self.core().block_shape(key)?;
                let inner: usize = shape[axis + 1..].iter().product();
                Some((entry.offset, entry.len, key[axis], shape[axis], inner))
            })
            .collect();
        let mut result = self.clone();
        let data = result.storage_mut();
        for (offset, len, value, dim, inner) in plan {
            let Some(factors) = diagonals.get(&edge.partner_value(value)) else {
                continue;
            };
            for (idx, x) in data[offset..offset + len].iter_mut().enumerate() {
                let d = factors[(idx / inner) % dim];
                *x = if division { *x / d } else { *x * d };
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decomposition::SvdCut;
    use crate::edge::Edge;
    use crate::symmetry::{FermiU1, U1};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn u1_tensor() -> Tensor<f64, U1> {
        let mut rng = StdRng::seed_from_u64(29);
        let edge = Edge::new([(U1(0), 2), (U1(1), 2)]).unwrap();
        let mut t = Tensor::new(["a", "b", "c"], [edge.clone(), edge.conjugated(), edge.clone()]).unwrap();
        t.randn(&mut rng);
        t
    }

    #[test]
    fn test_multiple_matches_contraction_on_u() {
        let r = u1_tensor().svd(["a"], "u", "v", "su", "sv", SvdCut::NoCut).unwrap();
        let scaled = r.u.multiple(&r.s, "u", SvdFactor::U, false).unwrap();
        let contracted = r.u.contract(&r.s, [("u", "su")]).unwrap().edge_rename([("sv", "u")]).unwrap();
        assert!(scaled.try_sub(&contracted).unwrap().norm(2.0) < 1e-12);
    }

    #[test]
    fn test_multiple_matches_contraction_on_v() {
        let r = u1_tensor().svd(["a"], "u", "v", "su", "sv", SvdCut::NoCut).unwrap();
        let scaled = r.v.multiple(&r.s, "v", SvdFactor::V, false).unwrap();
        let contracted = r.s.contract(&r.v, [("sv", "v")]).unwrap().edge_rename([("su", "v")]).unwrap();
        assert!(scaled.try_sub(&contracted).unwrap().norm(2.0) < 1e-12);
    }

    #[test]
    fn test_division_undoes_multiplication() {
        let edge = Edge::new([(FermiU1(0), 2), (FermiU1(1), 1)]).unwrap();
        let mut rng = StdRng::seed_from_u64(31);
        let mut t: Tensor<f64, FermiU1> =
            Tensor::new(["a", "b"], [edge.clone(), edge.clone().with_arrow(true)]).unwrap();
        t.randn(&mut rng);
        let r = t.svd(["a"], "u", "v", "su", "sv", SvdCut::NoCut).unwrap();
        let scaled = r.u.multiple(&r.s, "u", SvdFactor::U, false).unwrap();
        let back = scaled.multiple(&r.s, "u", SvdFactor::U, true).unwrap();
        assert!(back.try_sub(&r.u).unwrap().norm(2.0) < 1e-10);
    }

    #[test]
    fn test_multiple_rejects_wrong_axis() {
        let t = u1_tensor();
        let r = t.svd(["a"], "u", "v", "su", "sv", SvdCut::NoCut).unwrap();
        assert!(matches!(
            t.multiple(&r.s, "c", SvdFactor::U, false),
            Err(TensorError::DimensionMismatch { .. } | TensorError::SymmetryNotFound { .. })
        ));
        assert!(matches!(
            r.u.multiple(&t, "u", SvdFactor::U, false),
            Err(TensorError::InvalidArgument { .. })
        ));
    }
}
