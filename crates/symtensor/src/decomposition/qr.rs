//! QR decomposition of block-sparse tensors.

use std::collections::{BTreeMap, BTreeSet};

use crate::backend::thin_qr;
use crate::decomposition::util::{MatrixForm, assemble_core, bond_edge};
use crate::error::TensorError;
use crate::name::{EdgeName, InternalName};
use crate::scalar::Scalar;
use crate::symmetry::Symmetry;
use crate::tensor::Tensor;

/// Which factor the free axes passed to [`Tensor::qr`] belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QrFactor {
    Q,
    R,
}

/// Factors of [`Tensor::qr`].
#[derive(Debug, Clone)]
pub struct QrResult<T: Scalar, S: Symmetry, N: EdgeName> {
    /// Orthonormal factor: its free axes followed by `common_q`.
    pub q: Tensor<T, S, N>,
    /// Upper triangular factor: `common_r` followed by its free axes.
    pub r: Tensor<T, S, N>,
}

struct BlockQr<T> {
    m: usize,
    rank: usize,
    q: Vec<T>,
    r: Vec<T>,
}

impl<T: Scalar, S: Symmetry, N: EdgeName> Tensor<T, S, N> {
    /// QR decomposition.
    ///
    /// `free_names` are the axes of the factor named by `side`; all other
    /// axes go to the other factor. Contracting `q` with `r` over
    /// `(common_q, common_r)` reproduces the tensor.
    ///
    /// # Example
    ///
    /// ```
    /// use symtensor::{Edge, QrFactor, Tensor};
    ///
    /// let mut t: Tensor<f64> = Tensor::new(["i", "j"], [Edge::trivial(4), Edge::trivial(2)]).unwrap();
    /// t.range(1.0, 1.0);
    /// let qr = t.qr(QrFactor::R, ["j"], "q", "r").unwrap();
    /// assert_eq!(qr.q.names(), &["i".to_string(), "q".to_string()]);
    /// assert_eq!(qr.r.names(), &["r".to_string(), "j".to_string()]);
    /// assert_eq!(qr.r.edges()[0].dimension(), 2);
    /// ```
    pub fn qr(
        &self,
        side: QrFactor,
        free_names: impl IntoIterator<Item = impl Into<N>>,
        common_q: impl Into<N>,
        common_r: impl Into<N>,
    ) -> Result<QrResult<T, S, N>, TensorError> {
        let free: BTreeSet<N> = free_names.into_iter().map(Into::into).collect();
        let row_set: BTreeSet<N> = match side {
            QrFactor::Q => free,
            QrFactor::R => {
                for name in &free {
                    if !self.contains(name) {
                        tracing::warn!(name = ?name, "decomposition of missing edge ignored");
                    }
                }
                self.names()
                    .iter()
                    .filter(|n| !free.contains(*n))
                    .cloned()
                    .collect()
            }
        };
        let form = MatrixForm::new(self, &row_set, InternalName::Qr1, InternalName::Qr2)?;

        let mut blocks: BTreeMap<S, BlockQr<T>> = BTreeMap::new();
        for (row, _, m, n, data) in form.blocks() {
            let (q, r) = thin_qr(data, m, n);
            blocks.insert(row, BlockQr { m, rank: m.min(n), q, r });
        }
        tracing::debug!(blocks = blocks.len(), "qr");

        let bond = bond_edge(blocks.iter().map(|(&row, b)| (row, b.rank)));
        let q = assemble_core(vec![form.row_edge().clone(), bond.clone()], |key, out: &mut [T]| {
            if let Some(b) = blocks.get(&key[0]) {
                out.copy_from_slice(&b.q[..b.m * b.rank]);
            }
        });
        let r = assemble_core(vec![bond.conjugated(), form.column_edge().clone()], |key, out: &mut [T]| {
            if let Some(b) = blocks.get(&key[0]) {
                out.copy_from_slice(&b.r);
            }
        });

        Ok(QrResult {
            q: form.row_factor(q, common_q.into())?,
            r: form.column_factor(r, common_r.into())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::Edge;
    use crate::symmetry::{FermiZ2, U1};
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_dense_q_is_orthonormal() {
        let mut rng = StdRng::seed_from_u64(17);
        let mut t: Tensor<f64> =
            Tensor::new(["a", "b", "c"], [Edge::trivial(3), Edge::trivial(2), Edge::trivial(2)]).unwrap();
        t.randn(&mut rng);
        let qr = t.qr(QrFactor::Q, ["a", "b"], "q", "r").unwrap();
        assert_eq!(qr.q.edge(&"q".to_string()).unwrap().dimension(), 2);

        let other = qr.q.edge_rename([("q", "p")]).unwrap();
        let gram = qr.q.conjugate().contract(&other, [("a", "a"), ("b", "b")]).unwrap();
        for i in 0..2 {
            for j in 0..2 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(
                    gram.get_by_index([("q", i), ("p", j)]).unwrap(),
                    expected,
                    epsilon = 1e-12
                );
            }
        }

        let back = qr.q.contract(&qr.r, [("q", "r")]).unwrap().transpose(["a", "b", "c"]).unwrap();
        assert!(back.try_sub(&t).unwrap().norm(2.0) < 1e-10);
    }

    #[test]
    fn test_u1_qr_reconstructs() {
        let mut rng = StdRng::seed_from_u64(19);
        let edge = Edge::new([(U1(0), 2), (U1(1), 3)]).unwrap();
        let mut t: Tensor<f64, U1> = Tensor::new(
            ["a", "b", "c"],
            [edge.clone(), edge.conjugated(), edge.conjugated()],
        )
        .unwrap();
        t.randn(&mut rng);
        let qr = t.qr(QrFactor::R, ["c"], "q", "r").unwrap();
        assert_eq!(qr.q.names(), &["a".to_string(), "b".to_string(), "q".to_string()]);
        let back = qr.q.contract(&qr.r, [("q", "r")]).unwrap().transpose(["a", "b", "c"]).unwrap();
        assert!(back.try_sub(&t).unwrap().norm(2.0) < 1e-10);
    }

    #[test]
    fn test_fermi_qr_reconstructs() {
        let mut rng = StdRng::seed_from_u64(23);
        let edge = Edge::new([(FermiZ2(false), 2), (FermiZ2(true), 2)]).unwrap();
        let mut t: Tensor<f64, FermiZ2> = Tensor::new(
            ["a", "b", "c"],
            [edge.clone().with_arrow(true), edge.clone(), edge.clone().with_arrow(true)],
        )
        .unwrap();
        t.randn(&mut rng);
        let qr = t.qr(QrFactor::Q, ["c", "a"], "q", "r").unwrap();
        assert!(qr.q.edge(&"a".to_string()).unwrap().arrow());
        let back = qr.q.contract(&qr.r, [("q", "r")]).unwrap().transpose(["a", "b", "c"]).unwrap();
        assert!(back.try_sub(&t).unwrap().norm(2.0) < 1e-10);
    }
}
