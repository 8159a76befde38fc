//! Block-sparse tensor contraction.
//!
//! The algorithm:
//!
//! 1. Drop segments of contracted edges that have no partner, after checking
//!    that paired segments agree on dimension
//! 2. Merge each operand into a matrix of free and common axes
//! 3. Multiply matching block pairs with one GEMM each
//! 4. Split the free axes back out of the product
//!
//! For fermionic symmetries, free edges pointing in are reversed before the
//! merge and reversed back at the end; common edges are reversed so that the
//! first operand's point in and the second's point out.

use std::collections::{BTreeMap, BTreeSet};

use crate::arena::ScratchArena;
use crate::backend::{GemmShape, gemm_row_major};
use crate::contract::properties::ContractionProperties;
use crate::edge::Edge;
use crate::error::TensorError;
use crate::name::{EdgeName, InternalName};
use crate::operations::edge_operator::EdgeOperator;
use crate::scalar::Scalar;
use crate::storage::Core;
use crate::symmetry::Symmetry;
use crate::tensor::Tensor;

/// Segments of `edge` with no partner on `other`.
///
/// # Errors
///
/// Returns `DimensionMismatch` if a segment and its partner disagree.
pub(crate) fn unmatched_segments<S: Symmetry>(
    name: &impl std::fmt::Debug,
    edge: &Edge<S>,
    other: &Edge<S>,
) -> Result<BTreeSet<S>, TensorError> {
    let mut dropped = BTreeSet::new();
    for &(symmetry, dim) in edge.segments() {
        match other.dimension_of(edge.partner_value(symmetry)) {
            Some(partner) if partner != dim => {
                return Err(TensorError::DimensionMismatch {
                    name: format!("{name:?}"),
                    expected: dim,
                    actual: partner,
                });
            }
            Some(_) => {}
            None => {
                dropped.insert(symmetry);
            }
        }
    }
    Ok(dropped)
}

/// Reject a fermionic pair whose arrows agree.
pub(crate) fn check_arrows<S: Symmetry>(
    first: &impl std::fmt::Debug,
    edge_1: &Edge<S>,
    second: &impl std::fmt::Debug,
    edge_2: &Edge<S>,
) -> Result<(), TensorError> {
    if S::IS_FERMI && edge_1.arrow() == edge_2.arrow() {
        return Err(TensorError::SameArrowPair {
            first: format!("{first:?}"),
            second: format!("{second:?}"),
        });
    }
    Ok(())
}

/// Contract `tensor_1` and `tensor_2` over already filtered `pairs`.
///
/// The result carries the free axes of `tensor_1` followed by those of
/// `tensor_2`, each in their original order.
pub(crate) fn contract_blocksparse<T: Scalar, S: Symmetry, N: EdgeName>(
    tensor_1: &Tensor<T, S, N>,
    tensor_2: &Tensor<T, S, N>,
    pairs: &[(N, N)],
) -> Result<Tensor<T, S, N>, TensorError> {
    let props = ContractionProperties::compute(tensor_1.names(), tensor_2.names(), pairs, false);
    let ContractionProperties {
        free_1,
        free_2,
        common_1,
        common_2,
        put_common_1_right,
        put_common_2_right,
        ..
    } = &props;
    let (put_common_1_right, put_common_2_right) = (*put_common_1_right, *put_common_2_right);

    let mut discard_1: BTreeMap<N, BTreeSet<S>> = BTreeMap::new();
    let mut discard_2: BTreeMap<N, BTreeSet<S>> = BTreeMap::new();
    for (name_1, name_2) in pairs {
        let edge_1 = tensor_1.edge(name_1)?;
        let edge_2 = tensor_2.edge(name_2)?;
        check_arrows(name_1, edge_1, name_2, edge_2)?;
        discard_1.insert(name_1.clone(), unmatched_segments(name_1, edge_1, edge_2)?);
        discard_2.insert(name_2.clone(), unmatched_segments(name_2, edge_2, edge_1)?);
    }

    let mut reversed_1 = Vec::new();
    let mut reversed_2 = Vec::new();
    let mut result_reversed = Vec::new();
    if S::IS_FERMI {
        for name in common_1 {
            if !tensor_1.edge(name)?.arrow() {
                reversed_1.push(name.clone());
            }
        }
        for name in common_2 {
            if tensor_2.edge(name)?.arrow() {
                reversed_2.push(name.clone());
            }
        }
        for name in free_1 {
            if tensor_1.edge(name)?.arrow() {
                reversed_1.push(name.clone());
                result_reversed.push(name.clone());
            }
        }
        for name in free_2 {
            if tensor_2.edge(name)?.arrow() {
                reversed_2.push(name.clone());
                result_reversed.push(name.clone());
            }
        }
    }
    let split_plan = |tensor: &Tensor<T, S, N>, names: &[N]| -> Result<Vec<(N, Edge<S>)>, TensorError> {
        names
            .iter()
            .map(|name| {
                let edge = tensor.edge(name)?;
                let edge = if result_reversed.contains(name) { edge.reversed() } else { edge.clone() };
                Ok((name.clone(), edge))
            })
            .collect()
    };
    let split_1 = split_plan(tensor_1, free_1)?;
    let split_2 = split_plan(tensor_2, free_2)?;

    let c1 = N::internal(InternalName::Contract1);
    let c2 = N::internal(InternalName::Contract2);

    // signs of the first operand's common reversals and merge are kept
    let mut op_1 = EdgeOperator::new()
        .reverse(reversed_1)
        .merge(c1.clone(), free_1.clone())
        .merge(c2.clone(), common_1.clone())
        .transpose(if put_common_1_right {
            [c1.clone(), c2.clone()]
        } else {
            [c2.clone(), c1.clone()]
        })
        .apply_parity(false)
        .exclude_reverse(common_1.clone())
        .exclude_merge([c2.clone()]);
    for (name, dropped) in discard_1 {
        op_1 = op_1.discard(name, dropped);
    }
    let mut op_2 = EdgeOperator::new()
        .reverse(reversed_2)
        .merge(c2.clone(), free_2.clone())
        .merge(c1.clone(), common_2.clone())
        .transpose(if put_common_2_right {
            [c2.clone(), c1.clone()]
        } else {
            [c1.clone(), c2.clone()]
        })
        .apply_parity(false);
    if !S::IS_FERMI {
        op_2 = op_2.partner_order(c1.clone());
    }
    for (name, dropped) in discard_2 {
        op_2 = op_2.discard(name, dropped);
    }
    let merged_1 = tensor_1.edge_operator(&op_1)?;
    let merged_2 = tensor_2.edge_operator(&op_2)?;

    let (free_axis_1, common_axis_1) = if put_common_1_right { (0, 1) } else { (1, 0) };
    let (free_axis_2, common_axis_2) = if put_common_2_right { (0, 1) } else { (1, 0) };
    let edge_a = &merged_1.edges()[free_axis_1];
    let edge_b = &merged_2.edges()[free_axis_2];
    let common_edge_1 = &merged_1.edges()[common_axis_1];
    let common_edge_2 = &merged_2.edges()[common_axis_2];

    let arena = ScratchArena::for_rank(2);
    let product: Core<T, S> = Core::new(vec![edge_a.clone(), edge_b.clone()], &arena);
    let (edges, blocks, mut data) = product.into_parts();
    let mut multiplied = 0usize;
    for entry in blocks.iter() {
        let key = entry.key.symmetries();
        let (a, b) = (key[0], key[1]);
        let k1 = common_edge_1.value_for_charge(-edge_a.charge(a));
        let k2 = common_edge_2.value_for_charge(-edge_b.charge(b));
        let key_1 = if put_common_1_right { [a, k1] } else { [k1, a] };
        let key_2 = if put_common_2_right { [b, k2] } else { [k2, b] };
        let (Some(block_1), Some(block_2)) = (merged_1.core().block(&key_1), merged_2.core().block(&key_2)) else {
            continue;
        };
        let (Some(m), Some(n), Some(k)) = (
            edge_a.dimension_of(a),
            edge_b.dimension_of(b),
            common_edge_1.dimension_of(k1),
        ) else {
            continue;
        };
        if k == 0 {
            continue;
        }
        let negate = S::IS_FERMI && (put_common_2_right ^ !put_common_1_right) && a.parity();
        let alpha = if negate { -T::one() } else { T::one() };
        gemm_row_major(
            &mut data[entry.offset..entry.offset + entry.len],
            block_1,
            block_2,
            GemmShape {
                m,
                n,
                k,
                trans_a: !put_common_1_right,
                trans_b: put_common_2_right,
            },
            alpha,
            false,
        );
        multiplied += 1;
    }
    tracing::debug!(
        blocks = blocks.nnzblocks(),
        multiplied,
        put_common_1_right,
        put_common_2_right,
        "block-sparse contraction"
    );

    let product = Tensor::from_core(vec![c1.clone(), c2.clone()], Core::from_parts(edges, blocks, data))?;
    let result_names: Vec<N> = free_1.iter().chain(free_2).cloned().collect();
    product.edge_operator(
        &EdgeOperator::new()
            .split(c1, split_1)
            .split(c2, split_2)
            .reverse(result_reversed)
            .transpose(result_names)
            .apply_parity(false),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symmetry::{FermiZ2, NoSymmetry, U1};
    use approx::assert_relative_eq;

    fn pairs(list: &[(&str, &str)]) -> Vec<(String, String)> {
        list.iter().map(|(a, b)| (a.to_string(), b.to_string())).collect()
    }

    #[test]
    fn test_matrix_product() {
        let mut a: Tensor<f64> = Tensor::new(["i", "j"], [Edge::trivial(2), Edge::trivial(3)]).unwrap();
        let mut b: Tensor<f64> = Tensor::new(["j", "k"], [Edge::trivial(3), Edge::trivial(2)]).unwrap();
        a.range(1.0, 1.0);
        b.range(1.0, 1.0);
        let c = contract_blocksparse(&a, &b, &pairs(&[("j", "j")])).unwrap();
        assert_eq!(c.names(), &["i".to_string(), "k".to_string()]);
        // [[1,2,3],[4,5,6]] x [[1,2],[3,4],[5,6]]
        assert_eq!(c.storage(), &[22.0, 28.0, 49.0, 64.0]);
    }

    #[test]
    fn test_u1_matches_dense_sum() {
        let edge = Edge::new([(U1(-1), 1), (U1(0), 2), (U1(1), 1)]).unwrap();
        let mut a: Tensor<f64, U1> =
            Tensor::new(["i", "j"], [edge.clone(), edge.conjugated()]).unwrap();
        let mut b: Tensor<f64, U1> =
            Tensor::new(["j", "k"], [edge.clone(), edge.conjugated()]).unwrap();
        a.range(1.0, 1.0);
        b.range(0.5, 0.25);
        let c = contract_blocksparse(&a, &b, &pairs(&[("j", "j")])).unwrap();
        let points = |e: &Edge<U1>| -> Vec<(U1, usize)> {
            (0..e.dimension()).map(|i| e.point_from_index(i).unwrap()).collect()
        };
        // a's segment s on j meets b's segment -s
        for x in points(&a.edges()[0]) {
            for z in points(&b.edges()[1]) {
                let expected: f64 = points(&a.edges()[1])
                    .into_iter()
                    .map(|(s, l)| {
                        a.get([("i", x), ("j", (s, l))]).unwrap()
                            * b.get([("j", (-s, l)), ("k", z)]).unwrap()
                    })
                    .sum();
                assert_relative_eq!(c.get([("i", x), ("k", z)]).unwrap(), expected);
            }
        }
    }

    #[test]
    fn test_unpaired_segments_are_dropped() {
        let wide = Edge::new([(U1(0), 1), (U1(1), 1), (U1(2), 1)]).unwrap();
        let narrow = Edge::new([(U1(0), 1), (U1(1), 1)]).unwrap();
        let mut a: Tensor<f64, U1> = Tensor::new(["i", "j"], [wide.clone(), wide.conjugated()]).unwrap();
        let mut b: Tensor<f64, U1> =
            Tensor::new(["j", "k"], [narrow.clone(), narrow.conjugated()]).unwrap();
        a.set(|| 1.0);
        b.set(|| 2.0);
        let c = contract_blocksparse(&a, &b, &pairs(&[("j", "j")])).unwrap();
        assert_eq!(c.edge(&"i".to_string()).unwrap().segments(), &[(U1(0), 1), (U1(1), 1)]);
        assert_relative_eq!(c.get([("i", (U1(1), 0)), ("k", (U1(-1), 0))]).unwrap(), 2.0);
    }

    #[test]
    fn test_dimension_mismatch() {
        let a: Tensor<f64, U1> = Tensor::new(
            ["i", "j"],
            [Edge::new([(U1(0), 2)]).unwrap(), Edge::new([(U1(0), 2)]).unwrap()],
        )
        .unwrap();
        let b: Tensor<f64, U1> = Tensor::new(
            ["j", "k"],
            [Edge::new([(U1(0), 3)]).unwrap(), Edge::new([(U1(0), 1)]).unwrap()],
        )
        .unwrap();
        let err = contract_blocksparse(&a, &b, &pairs(&[("j", "j")]));
        assert!(matches!(err, Err(TensorError::DimensionMismatch { .. })));
    }

    fn fermi_edge() -> Edge<FermiZ2> {
        Edge::new([(FermiZ2(false), 1), (FermiZ2(true), 1)]).unwrap()
    }

    #[test]
    fn test_fermi_same_arrow_rejected() {
        let a: Tensor<f64, FermiZ2> =
            Tensor::new(["i", "j"], [fermi_edge(), fermi_edge().with_arrow(true)]).unwrap();
        let b: Tensor<f64, FermiZ2> =
            Tensor::new(["j", "k"], [fermi_edge().with_arrow(true), fermi_edge()]).unwrap();
        let err = contract_blocksparse(&a, &b, &pairs(&[("j", "j")]));
        assert!(matches!(err, Err(TensorError::SameArrowPair { .. })));
    }

    #[test]
    fn test_fermi_leading_common_axis_sign() {
        // a[j, i] with j incoming, b[j, k]
        let mut a: Tensor<f64, FermiZ2> =
            Tensor::new(["j", "i"], [fermi_edge().with_arrow(true), fermi_edge()]).unwrap();
        let mut b: Tensor<f64, FermiZ2> =
            Tensor::new(["j", "k"], [fermi_edge(), fermi_edge().with_arrow(true)]).unwrap();
        let even = FermiZ2(false);
        let odd = FermiZ2(true);
        a.set_element([("j", (even, 0)), ("i", (even, 0))], 2.0).unwrap();
        a.set_element([("j", (odd, 0)), ("i", (odd, 0))], 3.0).unwrap();
        b.set_element([("j", (even, 0)), ("k", (even, 0))], 5.0).unwrap();
        b.set_element([("j", (odd, 0)), ("k", (odd, 0))], 7.0).unwrap();

        let c = contract_blocksparse(&a, &b, &pairs(&[("j", "j")])).unwrap();
        assert_eq!(c.names(), &["i".to_string(), "k".to_string()]);
        assert!(!c.edge(&"i".to_string()).unwrap().arrow());
        assert!(c.edge(&"k".to_string()).unwrap().arrow());
        assert_relative_eq!(c.get([("i", (even, 0)), ("k", (even, 0))]).unwrap(), 10.0);
        assert_relative_eq!(c.get([("i", (odd, 0)), ("k", (odd, 0))]).unwrap(), -21.0);
    }

    #[test]
    fn test_fermi_trailing_common_axis_no_sign() {
        let mut a: Tensor<f64, FermiZ2> =
            Tensor::new(["i", "j"], [fermi_edge(), fermi_edge().with_arrow(true)]).unwrap();
        let mut b: Tensor<f64, FermiZ2> =
            Tensor::new(["j", "k"], [fermi_edge(), fermi_edge().with_arrow(true)]).unwrap();
        let odd = FermiZ2(true);
        a.set_element([("i", (odd, 0)), ("j", (odd, 0))], 3.0).unwrap();
        b.set_element([("j", (odd, 0)), ("k", (odd, 0))], 7.0).unwrap();
        let c = contract_blocksparse(&a, &b, &pairs(&[("j", "j")])).unwrap();
        assert_relative_eq!(c.get([("i", (odd, 0)), ("k", (odd, 0))]).unwrap(), 21.0);
    }

    #[test]
    fn test_outer_product_without_pairs() {
        let mut a: Tensor<f64, NoSymmetry> = Tensor::new(["i"], [Edge::trivial(2)]).unwrap();
        let mut b: Tensor<f64, NoSymmetry> = Tensor::new(["k"], [Edge::trivial(2)]).unwrap();
        a.range(1.0, 1.0);
        b.range(3.0, 1.0);
        let c = contract_blocksparse(&a, &b, &[]).unwrap();
        assert_eq!(c.storage(), &[3.0, 4.0, 6.0, 8.0]);
    }
}
