//! Tensor contraction.
//!
//! Axes are paired by name: each `(name_1, name_2)` pair sums axis `name_1`
//! of the first tensor against axis `name_2` of the second.
//!
//! # Implementations
//!
//! - `blocksparse`: block-by-block GEMM for any symmetry
//! - `fuse`: one batched GEMM for tensors without symmetry; shared unpaired
//!   names become batch axes
//! - `trace`: contraction of a tensor with itself
//!
//! # Example
//!
//! ```
//! use symtensor::{Edge, Tensor};
//!
//! // Matrix multiplication: C[i,k] = A[i,j] * B[j,k]
//! let mut a: Tensor<f64> = Tensor::new(["i", "j"], [Edge::trivial(2), Edge::trivial(3)]).unwrap();
//! let mut b: Tensor<f64> = Tensor::new(["j", "k"], [Edge::trivial(3), Edge::trivial(4)]).unwrap();
//! a.set(|| 1.0);
//! b.set(|| 1.0);
//!
//! let c = a.contract(&b, [("j", "j")]).unwrap();
//! assert_eq!(c.names(), &["i".to_string(), "k".to_string()]);
//! assert!(c.storage().iter().all(|&x| x == 3.0));
//! ```

pub(crate) mod blocksparse;
mod fuse;
mod properties;
mod trace;

pub use properties::ContractionProperties;

use crate::error::TensorError;
use crate::name::EdgeName;
use crate::scalar::Scalar;
use crate::symmetry::Symmetry;
use crate::tensor::Tensor;

/// Contract `tensor_1` with `tensor_2` over the given name pairs.
///
/// Pairs naming an absent axis are dropped with a warning.
///
/// # Errors
///
/// Returns `DuplicateName` if a name appears in two pairs, `SameArrowPair`
/// for a fermionic pair pointing the same way, `DimensionMismatch` if paired
/// segments differ in size and `EdgeMismatch` for batch axes that differ.
pub fn contract<T: Scalar, S: Symmetry, N: EdgeName>(
    tensor_1: &Tensor<T, S, N>,
    tensor_2: &Tensor<T, S, N>,
    pairs: impl IntoIterator<Item = (impl Into<N>, impl Into<N>)>,
) -> Result<Tensor<T, S, N>, TensorError> {
    let pairs = properties::filter_pairs(
        tensor_1.names(),
        tensor_2.names(),
        pairs.into_iter().map(|(a, b)| (a.into(), b.into())),
    )?;
    if S::IS_TRIVIAL {
        fuse::contract_fuse(tensor_1, tensor_2, &pairs)
    } else {
        blocksparse::contract_blocksparse(tensor_1, tensor_2, &pairs)
    }
}

impl<T: Scalar, S: Symmetry, N: EdgeName> Tensor<T, S, N> {
    /// Contract with `other`; see [`contract`].
    pub fn contract(
        &self,
        other: &Self,
        pairs: impl IntoIterator<Item = (impl Into<N>, impl Into<N>)>,
    ) -> Result<Self, TensorError> {
        contract(self, other, pairs)
    }

    /// Contract every axis with the axis of the same name on `other`.
    pub fn contract_all_edge_with(&self, other: &Self) -> Result<Self, TensorError> {
        let pairs: Vec<(N, N)> = self.names().iter().map(|n| (n.clone(), n.clone())).collect();
        contract(self, other, pairs)
    }

    /// Contract with the conjugate over every axis: the squared norm as a
    /// rank-0 tensor.
    ///
    /// # Example
    ///
    /// ```
    /// use symtensor::{Edge, Tensor, U1};
    ///
    /// let edge = Edge::new([(U1(0), 1), (U1(1), 2)]).unwrap();
    /// let mut t: Tensor<f64, U1> = Tensor::new(["i", "j"], [edge.clone(), edge.conjugated()]).unwrap();
    /// t.range(1.0, 1.0);
    /// let n = t.contract_all_edge().unwrap().to_scalar().unwrap();
    /// assert_eq!(n, 1.0 + 4.0 + 9.0 + 16.0 + 25.0);
    /// ```
    pub fn contract_all_edge(&self) -> Result<Self, TensorError> {
        self.contract_all_edge_with(&self.conjugate())
    }
}
