//! Single-purpose edge operations built on [`EdgeOperator`].

use std::sync::Arc;

use crate::edge::Edge;
use crate::error::TensorError;
use crate::name::EdgeName;
use crate::operations::edge_operator::EdgeOperator;
use crate::scalar::Scalar;
use crate::symmetry::Symmetry;
use crate::tensor::Tensor;

impl<T: Scalar, S: Symmetry, N: EdgeName> Tensor<T, S, N> {
    /// Rename axes without touching data; the result shares this core.
    ///
    /// Names not present are ignored.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateName` if two axes end up with the same name.
    pub fn edge_rename(
        &self,
        map: impl IntoIterator<Item = (impl Into<N>, impl Into<N>)>,
    ) -> Result<Self, TensorError> {
        let map: std::collections::BTreeMap<N, N> =
            map.into_iter().map(|(a, b)| (a.into(), b.into())).collect();
        let names = self
            .names()
            .iter()
            .map(|n| map.get(n).cloned().unwrap_or_else(|| n.clone()))
            .collect();
        Tensor::from_shared(names, Arc::clone(self.shared_core()))
    }

    /// Reorder axes.
    ///
    /// # Examples
    ///
    /// ```
    /// use symtensor::{Edge, Tensor};
    ///
    /// let mut t: Tensor<f64> = Tensor::new(["i", "j"], [Edge::trivial(2), Edge::trivial(3)]).unwrap();
    /// t.range(0.0, 1.0);
    /// let r = t.transpose(["j", "i"]).unwrap();
    /// assert_eq!(r.storage(), &[0.0, 3.0, 1.0, 4.0, 2.0, 5.0]);
    /// ```
    pub fn transpose(&self, names: impl IntoIterator<Item = impl Into<N>>) -> Result<Self, TensorError> {
        self.edge_operator(&EdgeOperator::new().transpose(names))
    }

    /// Flip the fermi arrow of the named axes.
    ///
    /// The reversal sign of odd segments is written into the values when
    /// `apply_parity` is set, except for axes listed in `exclude`.
    pub fn reverse_edge(
        &self,
        names: impl IntoIterator<Item = impl Into<N>>,
        apply_parity: bool,
        exclude: impl IntoIterator<Item = impl Into<N>>,
    ) -> Result<Self, TensorError> {
        self.edge_operator(
            &EdgeOperator::new()
                .reverse(names)
                .apply_parity(apply_parity)
                .exclude_reverse(exclude),
        )
    }

    /// Merge groups of axes, each into one axis.
    ///
    /// Members of a group that point the other way from its first member are
    /// reversed first; `exclude_reverse` lists those whose reversal sign
    /// handling differs from `apply_parity`. A merged axis takes the
    /// position of the last member listed in its group.
    pub fn merge_edge<G, M>(
        &self,
        groups: impl IntoIterator<Item = (impl Into<N>, G)>,
        apply_parity: bool,
        exclude_merge: impl IntoIterator<Item = impl Into<N>>,
        exclude_reverse: impl IntoIterator<Item = impl Into<N>>,
    ) -> Result<Self, TensorError>
    where
        G: IntoIterator<Item = M>,
        M: Into<N>,
    {
        let mut op = EdgeOperator::new();
        for (name, members) in groups {
            op = op.merge(name, members);
        }
        self.edge_operator(
            &op.apply_parity(apply_parity)
                .exclude_merge(exclude_merge)
                .exclude_align(exclude_reverse),
        )
    }

    /// Split axes into several; each split axis is replaced in place by its
    /// parts.
    pub fn split_edge<P, M>(
        &self,
        splits: impl IntoIterator<Item = (impl Into<N>, P)>,
        apply_parity: bool,
        exclude_split: impl IntoIterator<Item = impl Into<N>>,
    ) -> Result<Self, TensorError>
    where
        P: IntoIterator<Item = (M, Edge<S>)>,
        M: Into<N>,
    {
        let mut op = EdgeOperator::new();
        for (name, parts) in splits {
            op = op.split(name, parts);
        }
        self.edge_operator(&op.apply_parity(apply_parity).exclude_split(exclude_split))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symmetry::{FermiU1, U1};

    const NONE: [&str; 0] = [];

    #[test]
    fn test_rename_round_trip_keeps_core() {
        let t: Tensor<f64> = Tensor::new(["i", "j"], [Edge::trivial(2), Edge::trivial(3)]).unwrap();
        let r = t.edge_rename([("i", "k")]).unwrap();
        let back = r.edge_rename([("k", "i")]).unwrap();
        assert_eq!(back.names(), t.names());
        assert!(back.shares_core_with(&t));
        assert!(t.edge_rename([("i", "j")]).is_err());
    }

    #[test]
    fn test_merge_edge_order() {
        let edge = Edge::new([(U1(0), 1), (U1(1), 1)]).unwrap();
        let t: Tensor<f64, U1> = Tensor::new(
            ["a", "b", "c", "d"],
            [edge.clone(), edge.conjugated(), edge.clone(), edge.conjugated()],
        )
        .unwrap();
        let m = t.merge_edge([("ac", ["a", "c"])], false, NONE, NONE).unwrap();
        assert_eq!(
            m.names(),
            &["b".to_string(), "ac".to_string(), "d".to_string()]
        );
        // the last listed member decides the position, not the axis order
        let m = t.merge_edge([("ac", ["c", "a"])], false, NONE, NONE).unwrap();
        assert_eq!(
            m.names(),
            &["ac".to_string(), "b".to_string(), "d".to_string()]
        );
    }

    #[test]
    fn test_split_edge_in_place() {
        let edge = Edge::new([(U1(0), 2), (U1(1), 1)]).unwrap();
        let mut t: Tensor<f64, U1> = Tensor::new(["a", "b"], [edge.clone(), edge.conjugated()]).unwrap();
        t.range(0.0, 1.0);
        let m = t.merge_edge([("ab", ["a", "b"])], false, NONE, NONE).unwrap();
        let s = m
            .split_edge(
                [("ab", [("a", edge.clone()), ("b", edge.conjugated())])],
                false,
                NONE,
            )
            .unwrap();
        assert_eq!(s.names(), t.names());
        assert_eq!(s.storage(), t.storage());
    }

    #[test]
    fn test_fermi_merge_aligns_arrows() {
        let edge = Edge::new([(FermiU1(0), 1), (FermiU1(1), 1)]).unwrap();
        let t: Tensor<f64, FermiU1> = Tensor::new(
            ["a", "b", "c"],
            [
                edge.clone(),
                edge.clone().with_arrow(true),
                edge.clone().with_arrow(true),
            ],
        )
        .unwrap();
        let m = t.merge_edge([("ab", ["a", "b"])], false, NONE, NONE).unwrap();
        let merged = m.edge(&"ab".to_string()).unwrap();
        assert!(!merged.arrow());
        // b is reversed to outgoing before fusing; -1 has no partner on c
        assert_eq!(merged.segments(), &[(FermiU1(0), 2), (FermiU1(1), 1)]);
    }
}
