//! Singular value decomposition of block-sparse tensors.
//!
//! The tensor is brought into matrix form, each symmetry block is factored
//! by faer's thin SVD and the factors are split back into tensors joined by
//! a new bond axis.

use std::collections::{BTreeMap, BTreeSet};

use crate::backend::{ThinSvd, thin_svd};
use crate::decomposition::util::{MatrixForm, assemble_core, bond_edge};
use crate::error::TensorError;
use crate::name::{EdgeName, InternalName};
use crate::scalar::Scalar;
use crate::symmetry::Symmetry;
use crate::tensor::Tensor;

/// How many singular values to keep.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SvdCut {
    /// Keep everything.
    #[default]
    NoCut,
    /// Keep the `n` largest values across all blocks.
    Remain(usize),
    /// Drop values below `r` times the largest one.
    Relative(f64),
}

/// Factors of [`Tensor::svd`].
#[derive(Debug, Clone)]
pub struct SvdResult<T: Scalar, S: Symmetry, N: EdgeName> {
    /// Free `U` axes followed by the `U` bond.
    pub u: Tensor<T, S, N>,
    /// Diagonal singular values, axes `(singular_u, singular_v)`.
    pub s: Tensor<T, S, N>,
    /// The `V` bond followed by the remaining axes.
    pub v: Tensor<T, S, N>,
}

struct BlockSvd<T> {
    m: usize,
    n: usize,
    factors: ThinSvd<T>,
    kept: usize,
}

/// Number of values kept in each spectrum. Spectra are sorted descending.
fn kept_counts(spectra: &[&[f64]], cut: SvdCut) -> Vec<usize> {
    match cut {
        SvdCut::NoCut => spectra.iter().map(|s| s.len()).collect(),
        SvdCut::Relative(ratio) => {
            let largest = spectra
                .iter()
                .flat_map(|s| s.iter().copied())
                .fold(0.0, f64::max);
            let threshold = ratio * largest;
            spectra
                .iter()
                .map(|s| s.iter().take_while(|&&v| v >= threshold).count())
                .collect()
        }
        SvdCut::Remain(remain) => {
            let mut all: Vec<(f64, usize)> = spectra
                .iter()
                .enumerate()
                .flat_map(|(b, s)| s.iter().map(move |&v| (v, b)))
                .collect();
            all.sort_by(|x, y| y.0.total_cmp(&x.0));
            let mut kept = vec![0; spectra.len()];
            for &(_, b) in all.iter().take(remain) {
                kept[b] += 1;
            }
            kept
        }
    }
}

impl<T: Scalar, S: Symmetry, N: EdgeName> Tensor<T, S, N> {
    /// Singular value decomposition.
    ///
    /// The axes in `free_u` go to `U` together with a new axis `common_u`;
    /// the other axes go to `V` together with `common_v`. `S` is diagonal
    /// with axes `(singular_u, singular_v)`, so contracting `U` with `S`
    /// over `(common_u, singular_u)` and the result with `V` over
    /// `(singular_v, common_v)` reproduces the tensor up to truncation and
    /// axis order.
    ///
    /// # Errors
    ///
    /// Returns `SvdError` if a block fails to converge and `DuplicateName`
    /// if a new axis name collides with a free axis.
    ///
    /// # Example
    ///
    /// ```
    /// use symtensor::{Edge, SvdCut, Tensor};
    ///
    /// let mut t: Tensor<f64> = Tensor::new(["i", "j"], [Edge::trivial(3), Edge::trivial(2)]).unwrap();
    /// t.range(1.0, 1.0);
    /// let svd = t.svd(["i"], "u", "v", "su", "sv", SvdCut::Remain(1)).unwrap();
    /// assert_eq!(svd.u.names(), &["i".to_string(), "u".to_string()]);
    /// assert_eq!(svd.s.edges()[0].dimension(), 1);
    /// assert_eq!(svd.v.names(), &["v".to_string(), "j".to_string()]);
    /// ```
    pub fn svd(
        &self,
        free_u: impl IntoIterator<Item = impl Into<N>>,
        common_u: impl Into<N>,
        common_v: impl Into<N>,
        singular_u: impl Into<N>,
        singular_v: impl Into<N>,
        cut: SvdCut,
    ) -> Result<SvdResult<T, S, N>, TensorError> {
        let row_set: BTreeSet<N> = free_u.into_iter().map(Into::into).collect();
        let form = MatrixForm::new(self, &row_set, InternalName::Svd1, InternalName::Svd2)?;

        let mut blocks: BTreeMap<S, BlockSvd<T>> = BTreeMap::new();
        for (row, _, m, n, data) in form.blocks() {
            let factors = thin_svd(data, m, n)?;
            let kept = factors.s.len();
            blocks.insert(row, BlockSvd { m, n, factors, kept });
        }
        let spectra: Vec<&[f64]> = blocks.values().map(|b| b.factors.s.as_slice()).collect();
        let counts = kept_counts(&spectra, cut);
        for (block, kept) in blocks.values_mut().zip(counts) {
            block.kept = kept;
        }
        tracing::debug!(
            blocks = blocks.len(),
            kept = blocks.values().map(|b| b.kept).sum::<usize>(),
            total = blocks.values().map(|b| b.factors.s.len()).sum::<usize>(),
            ?cut,
            "svd"
        );

        let bond = bond_edge(blocks.iter().map(|(&row, b)| (row, b.kept)));
        let u = assemble_core(vec![form.row_edge().clone(), bond.clone()], |key, out: &mut [T]| {
            let Some(b) = blocks.get(&key[0]) else { return };
            let rank = b.factors.s.len();
            for i in 0..b.m {
                out[i * b.kept..(i + 1) * b.kept].copy_from_slice(&b.factors.u[i * rank..i * rank + b.kept]);
            }
        });
        // the conjugated bond carries the row value itself
        let s = assemble_core(vec![bond.conjugated(), bond.clone()], |key, out: &mut [T]| {
            let Some(b) = blocks.get(&key[0]) else { return };
            for (i, &value) in b.factors.s[..b.kept].iter().enumerate() {
                out[i * b.kept + i] = T::from_real(value);
            }
        });
        let v = assemble_core(vec![bond.conjugated(), form.column_edge().clone()], |key, out: &mut [T]| {
            let Some(b) = blocks.get(&key[0]) else { return };
            out.copy_from_slice(&b.factors.vh[..b.kept * b.n]);
        });

        Ok(SvdResult {
            u: form.row_factor(u, common_u.into())?,
            s: Tensor::from_core(vec![singular_u.into(), singular_v.into()], s)?,
            v: form.column_factor(v, common_v.into())?,
        })
    }

    /// Singular values of [`Tensor::svd`] output `s`, keyed by the symmetry
    /// on its first axis.
    pub fn singular_values(&self) -> BTreeMap<S, Vec<f64>> {
        self.core()
            .iter_blocks()
            .map(|(entry, data)| {
                let k = (data.len() as f64).sqrt().round() as usize;
                let values = (0..k).map(|i| data[i * k + i].real_part()).collect();
                (entry.key.symmetries()[0], values)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::Edge;
    use crate::scalar::c64;
    use crate::symmetry::{FermiU1, NoSymmetry, U1};
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn reconstruct<T: Scalar, S: Symmetry>(r: &SvdResult<T, S, String>, names: &[&str]) -> Tensor<T, S> {
        r.u.contract(&r.s, [("u", "su")])
            .unwrap()
            .contract(&r.v, [("sv", "v")])
            .unwrap()
            .transpose(names.iter().copied())
            .unwrap()
    }

    #[test]
    fn test_kept_counts() {
        let a = [3.0, 1.0, 0.1];
        let b = [2.0, 0.5];
        assert_eq!(kept_counts(&[&a, &b], SvdCut::NoCut), vec![3, 2]);
        assert_eq!(kept_counts(&[&a, &b], SvdCut::Remain(3)), vec![2, 1]);
        assert_eq!(kept_counts(&[&a, &b], SvdCut::Relative(0.3)), vec![2, 1]);
        assert_eq!(kept_counts(&[&a, &b], SvdCut::Remain(0)), vec![0, 0]);
    }

    #[test]
    fn test_dense_svd_reconstructs() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut t: Tensor<f64, NoSymmetry> =
            Tensor::new(["a", "b", "c"], [Edge::trivial(2), Edge::trivial(3), Edge::trivial(4)]).unwrap();
        t.randn(&mut rng);
        let r = t.svd(["a", "c"], "u", "v", "su", "sv", SvdCut::NoCut).unwrap();
        assert_eq!(r.u.names(), &["a".to_string(), "c".to_string(), "u".to_string()]);
        assert_eq!(r.s.edges()[0].dimension(), 3);
        let back = reconstruct(&r, &["a", "b", "c"]);
        assert!(back.try_sub(&t).unwrap().norm(2.0) < 1e-10);
    }

    #[test]
    fn test_u1_svd_reconstructs() {
        let mut rng = StdRng::seed_from_u64(11);
        let edge = Edge::new([(U1(-1), 1), (U1(0), 2), (U1(1), 2)]).unwrap();
        let mut t: Tensor<c64, U1> = Tensor::new(
            ["a", "b", "c"],
            [edge.clone(), edge.conjugated(), edge.clone()],
        )
        .unwrap();
        t.randn(&mut rng);
        let r = t.svd(["b"], "u", "v", "su", "sv", SvdCut::NoCut).unwrap();
        let back = reconstruct(&r, &["a", "b", "c"]);
        assert!(back.try_sub(&t).unwrap().norm(2.0) < 1e-10);
    }

    #[test]
    fn test_fermi_svd_reconstructs() {
        let mut rng = StdRng::seed_from_u64(5);
        let edge = Edge::new([(FermiU1(0), 2), (FermiU1(1), 2)]).unwrap();
        let mut t: Tensor<f64, FermiU1> = Tensor::new(
            ["a", "b", "c", "d"],
            [
                edge.clone(),
                edge.clone().with_arrow(true),
                edge.clone().with_arrow(true),
                edge.clone(),
            ],
        )
        .unwrap();
        t.randn(&mut rng);
        let r = t.svd(["c", "a"], "u", "v", "su", "sv", SvdCut::NoCut).unwrap();
        assert!(r.u.edge(&"u".to_string()).unwrap().arrow());
        assert!(!r.v.edge(&"v".to_string()).unwrap().arrow());
        assert!(r.u.edge(&"c".to_string()).unwrap().arrow());
        let back = reconstruct(&r, &["a", "b", "c", "d"]);
        assert!(back.try_sub(&t).unwrap().norm(2.0) < 1e-10);
    }

    #[test]
    fn test_truncation_keeps_largest() {
        let mut rng = StdRng::seed_from_u64(3);
        let edge = Edge::new([(U1(0), 3), (U1(1), 3)]).unwrap();
        let mut t: Tensor<f64, U1> =
            Tensor::new(["a", "b"], [edge.clone(), edge.conjugated()]).unwrap();
        t.randn(&mut rng);
        let full = t.svd(["a"], "u", "v", "su", "sv", SvdCut::NoCut).unwrap();
        let mut all: Vec<f64> = full.s.singular_values().into_values().flatten().collect();
        all.sort_by(|x, y| y.total_cmp(x));

        let cut = t.svd(["a"], "u", "v", "su", "sv", SvdCut::Remain(2)).unwrap();
        let mut kept: Vec<f64> = cut.s.singular_values().into_values().flatten().collect();
        kept.sort_by(|x, y| y.total_cmp(x));
        assert_eq!(kept.len(), 2);
        assert_relative_eq!(kept[0], all[0], epsilon = 1e-12);
        assert_relative_eq!(kept[1], all[1], epsilon = 1e-12);
        assert_eq!(cut.u.edge(&"u".to_string()).unwrap().dimension(), 2);

        // the discarded weight is the truncation error
        let back = reconstruct(&cut, &["a", "b"]);
        let error = back.try_sub(&t).unwrap().norm(2.0);
        let expected = all[2..].iter().map(|s| s * s).sum::<f64>().sqrt();
        assert_relative_eq!(error, expected, epsilon = 1e-10);
    }

    #[test]
    fn test_singular_values_descend() {
        let mut rng = StdRng::seed_from_u64(13);
        let mut t: Tensor<f64> = Tensor::new(["a", "b"], [Edge::trivial(4), Edge::trivial(5)]).unwrap();
        t.randn(&mut rng);
        let r = t.svd(["a"], "u", "v", "su", "sv", SvdCut::Relative(0.0)).unwrap();
        let values = r.s.singular_values().into_values().next().unwrap();
        assert_eq!(values.len(), 4);
        assert!(values.windows(2).all(|w| w[0] >= w[1]));
        assert_relative_eq!(values.iter().map(|s| s * s).sum::<f64>(), t.norm_sqr(), epsilon = 1e-10);
    }
}
