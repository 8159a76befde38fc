//! Partial trace over pairs of axes of one tensor.

use std::collections::{BTreeMap, BTreeSet};

use crate::arena::ScratchArena;
use crate::contract::blocksparse::{check_arrows, unmatched_segments};
use crate::edge::Edge;
use crate::error::TensorError;
use crate::name::{EdgeName, InternalName};
use crate::operations::edge_operator::EdgeOperator;
use crate::scalar::Scalar;
use crate::storage::Core;
use crate::symmetry::Symmetry;
use crate::tensor::Tensor;

/// Drop pairs naming absent axes; reject any name used twice.
fn filter_trace_pairs<T: Scalar, S: Symmetry, N: EdgeName>(
    tensor: &Tensor<T, S, N>,
    pairs: impl IntoIterator<Item = (N, N)>,
) -> Result<BTreeMap<N, N>, TensorError> {
    let mut partner = BTreeMap::new();
    for (first, second) in pairs {
        if !tensor.contains(&first) || !tensor.contains(&second) {
            tracing::warn!(first = ?first, second = ?second, "trace pair with missing edge ignored");
            continue;
        }
        if first == second || partner.contains_key(&first) {
            return Err(TensorError::duplicate_name(&first));
        }
        if partner.contains_key(&second) {
            return Err(TensorError::duplicate_name(&second));
        }
        partner.insert(first.clone(), second.clone());
        partner.insert(second, first);
    }
    Ok(partner)
}

impl<T: Scalar, S: Symmetry, N: EdgeName> Tensor<T, S, N> {
    /// Sum over the diagonal of each pair of axes.
    ///
    /// The result keeps the remaining axes in their current order.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateName` if an axis appears in two pairs,
    /// `SameArrowPair` for a fermionic pair pointing the same way and
    /// `DimensionMismatch` if paired segments differ in size.
    ///
    /// # Example
    ///
    /// ```
    /// use symtensor::{Edge, Tensor};
    ///
    /// let mut t: Tensor<f64> = Tensor::new(["i", "j"], [Edge::trivial(3), Edge::trivial(3)]).unwrap();
    /// t.range(0.0, 1.0);
    /// let tr = t.trace([("i", "j")]).unwrap();
    /// assert_eq!(tr.to_scalar().unwrap(), 0.0 + 4.0 + 8.0);
    /// ```
    pub fn trace(&self, pairs: impl IntoIterator<Item = (impl Into<N>, impl Into<N>)>) -> Result<Self, TensorError> {
        let partner = filter_trace_pairs(self, pairs.into_iter().map(|(a, b)| (a.into(), b.into())))?;

        // right to left, the first member seen of each pair decides the order
        let mut trace_1 = Vec::new();
        let mut trace_2 = Vec::new();
        let mut seen: BTreeSet<&N> = BTreeSet::new();
        for (name, edge) in self.names().iter().zip(self.edges()).rev() {
            let Some(other) = partner.get(name) else {
                continue;
            };
            if !seen.insert(name) {
                continue;
            }
            seen.insert(other);
            if S::IS_FERMI && edge.arrow() {
                trace_1.push(name.clone());
                trace_2.push(other.clone());
            } else {
                trace_1.push(other.clone());
                trace_2.push(name.clone());
            }
        }

        let mut op = EdgeOperator::new();
        for (name_1, name_2) in trace_1.iter().zip(&trace_2) {
            let (edge_1, edge_2) = (self.edge(name_1)?, self.edge(name_2)?);
            check_arrows(name_1, edge_1, name_2, edge_2)?;
            op = op
                .discard(name_1.clone(), unmatched_segments(name_1, edge_1, edge_2)?)
                .discard(name_2.clone(), unmatched_segments(name_2, edge_2, edge_1)?);
        }

        let mut free = Vec::new();
        let mut reversed = Vec::new();
        let mut split_plan: Vec<(N, Edge<S>)> = Vec::new();
        for (name, edge) in self.names().iter().zip(self.edges()) {
            if partner.contains_key(name) {
                continue;
            }
            free.push(name.clone());
            if S::IS_FERMI && edge.arrow() {
                reversed.push(name.clone());
                split_plan.push((name.clone(), edge.reversed()));
            } else {
                split_plan.push((name.clone(), edge.clone()));
            }
        }

        let t1 = N::internal(InternalName::Trace1);
        let t2 = N::internal(InternalName::Trace2);
        let t3 = N::internal(InternalName::Trace3);
        let mut op = op
            .reverse(reversed.clone())
            .merge(t1.clone(), trace_1)
            .merge(t2.clone(), trace_2)
            .merge(t3.clone(), free.clone())
            .transpose([t1, t2.clone(), t3.clone()])
            .apply_parity(false);
        if !S::IS_FERMI {
            // bosonic partners carry negated values
            op = op.partner_order(t2);
        }
        let merged = self.edge_operator(&op)?;

        let arena = ScratchArena::for_rank(merged.rank());
        let edge_1 = &merged.edges()[0];
        let free_edge = merged.edges()[2].clone();
        let (edges, blocks, mut data) = Core::<T, S>::new(vec![free_edge], &arena).into_parts();
        let identity = S::default();
        if let Some(target) = blocks.get(&[identity]) {
            let line = target.len;
            let destination = &mut data[target.offset..target.offset + line];
            for &(s1, dim) in edge_1.segments() {
                let s2 = edge_1.partner_value(s1);
                let Some(source) = merged.core().block(&[s1, s2, identity]) else {
                    continue;
                };
                for i in 0..dim {
                    let start = i * (dim + 1) * line;
                    for (d, s) in destination.iter_mut().zip(&source[start..start + line]) {
                        *d = *d + *s;
                    }
                }
            }
        }
        tracing::trace!(pairs = partner.len() / 2, scratch = arena.bytes_allocated(), "trace");

        let traced = Tensor::from_core(vec![t3.clone()], Core::from_parts(edges, blocks, data))?;
        traced.edge_operator(
            &EdgeOperator::new()
                .split(t3, split_plan)
                .reverse(reversed)
                .transpose(free)
                .apply_parity(false),
        )
    }
}
