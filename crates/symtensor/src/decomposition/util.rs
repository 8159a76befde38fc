//! Matrix form of a tensor for block-wise decompositions.
//!
//! Axes are split into a row group and a column group. Incoming fermionic
//! axes are reversed without sign, each group is merged into one axis and
//! the result is a block-diagonal matrix with one block per row segment.
//! The factors of each block are split back into tensors by
//! [`MatrixForm::row_factor`] and [`MatrixForm::column_factor`].

use std::collections::BTreeSet;

use crate::arena::ScratchArena;
use crate::edge::Edge;
use crate::error::TensorError;
use crate::name::{EdgeName, InternalName};
use crate::operations::EdgeOperator;
use crate::scalar::Scalar;
use crate::storage::Core;
use crate::symmetry::Symmetry;
use crate::tensor::Tensor;

/// A tensor merged into `(rows, columns)`.
pub(crate) struct MatrixForm<T: Scalar, S: Symmetry, N: EdgeName> {
    /// Rank-2 tensor named `(row, column)`; both arrows point out.
    pub matrix: Tensor<T, S, N>,
    row: N,
    column: N,
    row_parts: Vec<(N, Edge<S>)>,
    column_parts: Vec<(N, Edge<S>)>,
    reversed: Vec<N>,
}

impl<T: Scalar, S: Symmetry, N: EdgeName> MatrixForm<T, S, N> {
    /// Merge the axes in `row_set` into rows and the rest into columns.
    ///
    /// Names in `row_set` that the tensor lacks are ignored.
    pub fn new(
        tensor: &Tensor<T, S, N>,
        row_set: &BTreeSet<N>,
        row: InternalName,
        column: InternalName,
    ) -> Result<Self, TensorError> {
        let (row, column) = (N::internal(row), N::internal(column));
        let mut row_parts = Vec::new();
        let mut column_parts = Vec::new();
        let mut reversed = Vec::new();
        for (name, edge) in tensor.names().iter().zip(tensor.edges()) {
            let edge = if S::IS_FERMI && edge.arrow() {
                reversed.push(name.clone());
                edge.reversed()
            } else {
                edge.clone()
            };
            if row_set.contains(name) {
                row_parts.push((name.clone(), edge));
            } else {
                column_parts.push((name.clone(), edge));
            }
        }
        for name in row_set {
            if !tensor.contains(name) {
                tracing::warn!(name = ?name, "decomposition of missing edge ignored");
            }
        }
        let matrix = tensor.edge_operator(
            &EdgeOperator::new()
                .reverse(reversed.clone())
                .merge(row.clone(), row_parts.iter().map(|(n, _)| n.clone()))
                .merge(column.clone(), column_parts.iter().map(|(n, _)| n.clone()))
                .transpose([row.clone(), column.clone()])
                .apply_parity(false),
        )?;
        Ok(Self {
            matrix,
            row,
            column,
            row_parts,
            column_parts,
            reversed,
        })
    }

    pub fn row_edge(&self) -> &Edge<S> {
        &self.matrix.edges()[0]
    }

    pub fn column_edge(&self) -> &Edge<S> {
        &self.matrix.edges()[1]
    }

    /// Free row axes, in tensor order.
    pub fn row_names(&self) -> impl Iterator<Item = &N> {
        self.row_parts.iter().map(|(n, _)| n)
    }

    /// Free column axes, in tensor order.
    pub fn column_names(&self) -> impl Iterator<Item = &N> {
        self.column_parts.iter().map(|(n, _)| n)
    }

    /// Row segment value of every stored block, with the block's row and
    /// column dimensions.
    pub fn blocks(&self) -> impl Iterator<Item = (S, S, usize, usize, &[T])> {
        let (rows, columns) = (self.row_edge(), self.column_edge());
        self.matrix.core().iter_blocks().filter_map(move |(entry, data)| {
            let key = entry.key.symmetries();
            let m = rows.dimension_of(key[0])?;
            let n = columns.dimension_of(key[1])?;
            Some((key[0], key[1], m, n, data))
        })
    }

    /// Split a `(row, common)` core back into `row axes ++ [common]`.
    pub fn row_factor(&self, core: Core<T, S>, common: N) -> Result<Tensor<T, S, N>, TensorError> {
        let names: Vec<N> = self.row_names().cloned().chain([common.clone()]).collect();
        Tensor::from_core(vec![self.row.clone(), common], core)?.edge_operator(
            &EdgeOperator::new()
                .split(self.row.clone(), self.row_parts.clone())
                .reverse(self.reversed.iter().filter(|n| self.row_parts.iter().any(|(p, _)| p == *n)).cloned())
                .transpose(names)
                .apply_parity(false),
        )
    }

    /// Split a `(common, column)` core back into `[common] ++ column axes`.
    pub fn column_factor(&self, core: Core<T, S>, common: N) -> Result<Tensor<T, S, N>, TensorError> {
        let names: Vec<N> = [common.clone()].into_iter().chain(self.column_names().cloned()).collect();
        Tensor::from_core(vec![common, self.column.clone()], core)?.edge_operator(
            &EdgeOperator::new()
                .split(self.column.clone(), self.column_parts.clone())
                .reverse(
                    self.reversed
                        .iter()
                        .filter(|n| self.column_parts.iter().any(|(p, _)| p == *n))
                        .cloned(),
                )
                .transpose(names)
                .apply_parity(false),
        )
    }
}

/// The edge joining the row factor of a block-diagonal matrix to the rest.
///
/// The row factor keeps it last with the arrow pointing in, so contracting
/// the factors back together needs no sign. `dims` gives the kept dimension
/// for each row segment value; zero dimensions are dropped.
pub(crate) fn bond_edge<S: Symmetry>(dims: impl IntoIterator<Item = (S, usize)>) -> Edge<S> {
    let mut segments: Vec<(S, usize)> = dims
        .into_iter()
        .filter(|&(_, d)| d > 0)
        .map(|(row, d)| (S::from_charge(-row, true), d))
        .collect();
    segments.sort_by(|a, b| a.0.cmp(&b.0));
    Edge::from_sorted(segments, true)
}

/// Allocate a core on `edges` and fill every block from its key.
pub(crate) fn assemble_core<T: Scalar, S: Symmetry>(
    edges: Vec<Edge<S>>,
    mut fill: impl FnMut(&[S], &mut [T]),
) -> Core<T, S> {
    let arena = ScratchArena::for_rank(edges.len());
    let (edges, blocks, mut data) = Core::<T, S>::new(edges, &arena).into_parts();
    for entry in blocks.iter() {
        fill(entry.key.symmetries(), &mut data[entry.offset..entry.offset + entry.len]);
    }
    Core::from_parts(edges, blocks, data)
}
