//! Conjugation and identity tensors.

use smallvec::SmallVec;

use crate::arena::ScratchArena;
use crate::contract::blocksparse::check_arrows;
use crate::edge::Edge;
use crate::error::TensorError;
use crate::name::EdgeName;
use crate::operations::edge_operator::ParityLedger;
use crate::scalar::Scalar;
use crate::storage::Core;
use crate::strides::compute_strides;
use crate::symmetry::Symmetry;
use crate::tensor::Tensor;

impl<T: Scalar, S: Symmetry, N: EdgeName> Tensor<T, S, N> {
    /// Complex-conjugate the values and conjugate every edge.
    ///
    /// For fermionic symmetries each block also takes the sign of reversing
    /// its axis order plus the parity of its outgoing axes, so contracting a
    /// tensor with its conjugate over every axis gives the squared norm.
    pub fn conjugate(&self) -> Self {
        let source = self.core();
        let arrows: SmallVec<[bool; 8]> = source.edges().iter().map(Edge::arrow).collect();
        let arena = ScratchArena::for_rank(arrows.len());
        let skeleton: Core<T, S> = Core::new(source.edges().iter().map(Edge::conjugated).collect(), &arena);
        let (edges, blocks, mut data) = skeleton.into_parts();

        let mut key: SmallVec<[S; 8]> = SmallVec::new();
        for (entry, values) in source.iter_blocks() {
            let symmetries = entry.key.symmetries();
            key.clear();
            if S::IS_FERMI {
                key.extend_from_slice(symmetries);
            } else {
                key.extend(symmetries.iter().map(|&s| -s));
            }
            let Some(target) = blocks.get(&key) else {
                continue;
            };
            let mut ledger = ParityLedger::default();
            if S::IS_FERMI {
                ledger.fusion(symmetries.iter().map(Symmetry::parity));
                for (s, &arrow) in symmetries.iter().zip(&arrows) {
                    if !arrow {
                        ledger.reversal(s.parity());
                    }
                }
            }
            let negate = ledger.is_odd();
            for (d, &v) in data[target.offset..target.offset + target.len].iter_mut().zip(values) {
                *d = if negate { -v.conjugate() } else { v.conjugate() };
            }
        }
        self.with_core(Core::from_parts(edges, blocks, data))
    }

    /// Overwrite the values with the identity map between paired axes.
    ///
    /// Every axis must belong to exactly one pair and each pair's edges must
    /// be conjugate to each other. For fermionic symmetries the values carry
    /// the sign of moving every outgoing axis in front of every incoming one,
    /// pairs kept in the given order.
    ///
    /// # Errors
    ///
    /// Returns `NameNotFound` for an unknown name, `DuplicateName` when an
    /// axis is paired twice, `InvalidArgument` if an axis is left unpaired,
    /// `SameArrowPair` for fermionic pairs pointing the same way and
    /// `DimensionMismatch` when paired segments differ in size.
    ///
    /// # Example
    ///
    /// ```
    /// use symtensor::{Edge, Tensor};
    ///
    /// let mut t: Tensor<f64> = Tensor::new(["i", "j"], [Edge::trivial(2), Edge::trivial(2)]).unwrap();
    /// t.identity([("i", "j")]).unwrap();
    /// assert_eq!(t.storage(), &[1.0, 0.0, 0.0, 1.0]);
    /// ```
    pub fn identity(
        &mut self,
        pairs: impl IntoIterator<Item = (impl Into<N>, impl Into<N>)>,
    ) -> Result<&mut Self, TensorError> {
        let rank = self.rank();
        let mut partner: SmallVec<[Option<usize>; 8]> = SmallVec::from_elem(None, rank);
        let mut outgoing = Vec::with_capacity(rank / 2);
        let mut incoming = Vec::with_capacity(rank / 2);
        for (first, second) in pairs {
            let (first, second) = (first.into(), second.into());
            let (a, b) = (self.axis(&first)?, self.axis(&second)?);
            if a == b || partner[a].is_some() {
                return Err(TensorError::duplicate_name(&first));
            }
            if partner[b].is_some() {
                return Err(TensorError::duplicate_name(&second));
            }
            let (edge_a, edge_b) = (self.core().edge(a), self.core().edge(b));
            check_arrows(&first, edge_a, &second, edge_b)?;
            for &(s, dim) in edge_a.segments() {
                if let Some(other) = edge_b.dimension_of(edge_a.partner_value(s)) {
                    if other != dim {
                        return Err(TensorError::DimensionMismatch {
                            name: format!("{first:?}"),
                            expected: dim,
                            actual: other,
                        });
                    }
                }
            }
            partner[a] = Some(b);
            partner[b] = Some(a);
            if edge_a.arrow() {
                incoming.push(a);
                outgoing.push(b);
            } else {
                outgoing.push(a);
                incoming.push(b);
            }
        }
        if let Some(axis) = partner.iter().position(Option::is_none) {
            return Err(TensorError::InvalidArgument {
                message: format!("edge {:?} has no identity partner", self.names()[axis]),
            });
        }

        // canonical position of each axis
        let mut order: SmallVec<[usize; 8]> = SmallVec::from_elem(0, rank);
        for (position, &axis) in outgoing.iter().chain(&incoming).enumerate() {
            order[axis] = position;
        }
        let by_position: SmallVec<[usize; 8]> = {
            let mut inverse: SmallVec<[usize; 8]> = SmallVec::from_elem(0, rank);
            for (axis, &position) in order.iter().enumerate() {
                inverse[position] = axis;
            }
            inverse
        };

        let mut writes: Vec<(usize, T)> = Vec::new();
        let core = self.core();
        for entry in core.blocks().iter() {
            let key = entry.key.symmetries();
            let diagonal = (0..rank).all(|axis| {
                partner[axis].is_some_and(|other| key[other] == core.edge(axis).partner_value(key[axis]))
            });
            if !diagonal {
                continue;
            }
            let mut ledger = ParityLedger::default();
            if S::IS_FERMI {
                ledger.transposition(&order, |position| key[by_position[position]].parity());
            }
            let value = if ledger.is_odd() { -T::one() } else { T::one() };
            let Some(shape) = core.block_shape(key) else {
                continue;
            };
            let strides = compute_strides(&shape);
            // one (length, step) per pair; stepping moves both axes at once
            let diagonal: SmallVec<[(usize, usize); 4]> = (0..rank)
                .filter_map(|a| {
                    let b = partner[a]?;
                    (a < b).then(|| (shape[a].min(shape[b]), strides[a] + strides[b]))
                })
                .collect();
            if diagonal.iter().any(|&(len, _)| len == 0) {
                continue;
            }
            let mut counter: SmallVec<[usize; 4]> = SmallVec::from_elem(0, diagonal.len());
            let mut offset = entry.offset;
            'walk: loop {
                writes.push((offset, value));
                for (count, &(len, step)) in counter.iter_mut().zip(&diagonal).rev() {
                    *count += 1;
                    offset += step;
                    if *count < len {
                        continue 'walk;
                    }
                    offset -= len * step;
                    *count = 0;
                }
                break;
            }
        }
        let data = self.storage_mut();
        data.fill(T::zero());
        for (offset, value) in writes {
            data[offset] = value;
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symmetry::{FermiU1, U1};
    use crate::scalar::c64;
    use approx::assert_relative_eq;

    #[test]
    fn test_conjugate_complex_values() {
        let mut t: Tensor<c64> = Tensor::new(["i"], [Edge::trivial(2)]).unwrap();
        t.storage_mut().copy_from_slice(&[c64::new(1.0, 2.0), c64::new(3.0, -4.0)]);
        let c = t.conjugate();
        assert_eq!(c.storage(), &[c64::new(1.0, -2.0), c64::new(3.0, 4.0)]);
    }

    #[test]
    fn test_conjugate_negates_bosonic_edges() {
        let edge = Edge::new([(U1(0), 1), (U1(1), 2)]).unwrap();
        let mut t: Tensor<f64, U1> = Tensor::new(["i", "j"], [edge.clone(), edge.conjugated()]).unwrap();
        t.range(1.0, 1.0);
        let c = t.conjugate();
        assert_eq!(c.edge(&"i".to_string()).unwrap().segments(), &[(U1(-1), 2), (U1(0), 1)]);
        assert_relative_eq!(
            c.get([("i", (U1(-1), 1)), ("j", (U1(1), 0))]).unwrap(),
            t.get([("i", (U1(1), 1)), ("j", (U1(-1), 0))]).unwrap()
        );
    }

    #[test]
    fn test_conjugate_fermi_flips_arrows() {
        let edge = Edge::new([(FermiU1(0), 1), (FermiU1(1), 1)]).unwrap();
        let t: Tensor<f64, FermiU1> =
            Tensor::new(["i", "j"], [edge.clone(), edge.with_arrow(true)]).unwrap();
        let c = t.conjugate();
        assert!(c.edge(&"i".to_string()).unwrap().arrow());
        assert!(!c.edge(&"j".to_string()).unwrap().arrow());
        assert_eq!(c.storage().len(), t.storage().len());
    }

    #[test]
    fn test_identity_acts_as_identity_u1() {
        let edge = Edge::new([(U1(-1), 1), (U1(0), 2), (U1(1), 1)]).unwrap();
        let mut t: Tensor<f64, U1> = Tensor::new(["x", "c"], [edge.clone(), edge.conjugated()]).unwrap();
        t.range(1.0, 1.0);
        let mut id: Tensor<f64, U1> = Tensor::new(["a", "b"], [edge.clone(), edge.conjugated()]).unwrap();
        id.identity([("a", "b")]).unwrap();
        let r = t.contract(&id, [("c", "a")]).unwrap();
        let back = r.edge_rename([("b", "c")]).unwrap();
        assert_eq!(back.storage(), t.storage());
    }

    #[test]
    fn test_identity_acts_as_identity_fermi() {
        let edge = Edge::new([(FermiU1(0), 1), (FermiU1(1), 2)]).unwrap();
        let mut t: Tensor<f64, FermiU1> =
            Tensor::new(["x", "c"], [edge.clone(), edge.clone().with_arrow(true)]).unwrap();
        t.range(1.0, 1.0);
        let mut id: Tensor<f64, FermiU1> =
            Tensor::new(["a", "b"], [edge.clone(), edge.clone().with_arrow(true)]).unwrap();
        id.identity([("a", "b")]).unwrap();
        let r = t.contract(&id, [("c", "a")]).unwrap();
        let back = r.edge_rename([("b", "c")]).unwrap();
        for (x, y) in back.storage().iter().zip(t.storage()) {
            assert_relative_eq!(*x, *y);
        }
    }

    #[test]
    fn test_fermi_identity_independent_of_axis_order() {
        let edge = Edge::new([(FermiU1(0), 1), (FermiU1(1), 2)]).unwrap();
        let mut straight: Tensor<f64, FermiU1> =
            Tensor::new(["a", "b"], [edge.clone(), edge.clone().with_arrow(true)]).unwrap();
        straight.identity([("a", "b")]).unwrap();
        let mut swapped: Tensor<f64, FermiU1> =
            Tensor::new(["b", "a"], [edge.clone().with_arrow(true), edge.clone()]).unwrap();
        swapped.identity([("b", "a")]).unwrap();
        // the odd block picks up a sign in the swapped layout
        assert_eq!(swapped.get([("a", (FermiU1(1), 0)), ("b", (FermiU1(1), 0))]).unwrap(), -1.0);
        let swapped = swapped.transpose(["a", "b"]).unwrap();
        assert_eq!(swapped.storage(), straight.storage());
    }

    #[test]
    fn test_identity_with_interleaved_pairs() {
        let mut t: Tensor<f64> = Tensor::new(
            ["i", "k", "j", "l"],
            [Edge::trivial(2), Edge::trivial(3), Edge::trivial(2), Edge::trivial(3)],
        )
        .unwrap();
        t.set(|| 7.0);
        t.identity([("i", "j"), ("k", "l")]).unwrap();
        for i in 0..2 {
            for k in 0..3 {
                for j in 0..2 {
                    for l in 0..3 {
                        let expected = if i == j && k == l { 1.0 } else { 0.0 };
                        let index = [("i", i), ("k", k), ("j", j), ("l", l)];
                        assert_eq!(t.get_by_index(index).unwrap(), expected);
                    }
                }
            }
        }
        assert_eq!(t.storage().iter().filter(|&&x| x == 1.0).count(), 6);
    }

    #[test]
    fn test_identity_requires_every_axis() {
        let mut t: Tensor<f64> =
            Tensor::new(["i", "j", "k"], [Edge::trivial(2), Edge::trivial(2), Edge::trivial(2)]).unwrap();
        assert!(matches!(
            t.identity([("i", "j")]),
            Err(TensorError::InvalidArgument { .. })
        ));
    }
}
