//! Contraction without symmetry, with batched axes.
//!
//! Axes that appear on both operands under the same name and are not paired
//! are kept rather than summed: the result holds one matrix product per
//! batch index. Each operand becomes a single `(batch, free, common)` block,
//! so the whole contraction is a loop of GEMMs over the batch axis.

use crate::backend::{GemmShape, gemm_row_major};
use crate::contract::properties::ContractionProperties;
use crate::error::TensorError;
use crate::name::{EdgeName, InternalName};
use crate::operations::edge_operator::EdgeOperator;
use crate::scalar::Scalar;
use crate::symmetry::Symmetry;
use crate::tensor::Tensor;

/// Contract over `pairs`, batching shared unpaired names.
///
/// The result carries the batch axes (sorted), then the free axes of
/// `tensor_1`, then those of `tensor_2`.
pub(crate) fn contract_fuse<T: Scalar, S: Symmetry, N: EdgeName>(
    tensor_1: &Tensor<T, S, N>,
    tensor_2: &Tensor<T, S, N>,
    pairs: &[(N, N)],
) -> Result<Tensor<T, S, N>, TensorError> {
    debug_assert!(S::IS_TRIVIAL);
    let props = ContractionProperties::compute(tensor_1.names(), tensor_2.names(), pairs, true);

    for (name_1, name_2) in pairs {
        let (edge_1, edge_2) = (tensor_1.edge(name_1)?, tensor_2.edge(name_2)?);
        if edge_1.dimension() != edge_2.dimension() {
            return Err(TensorError::DimensionMismatch {
                name: format!("{name_1:?}"),
                expected: edge_1.dimension(),
                actual: edge_2.dimension(),
            });
        }
    }
    let mut result_names = Vec::with_capacity(props.batch.len() + props.free_1.len() + props.free_2.len());
    let mut result_edges = Vec::with_capacity(result_names.capacity());
    for name in &props.batch {
        let edge = tensor_1.edge(name)?;
        if edge != tensor_2.edge(name)? {
            return Err(TensorError::EdgeMismatch {
                name: format!("{name:?}"),
            });
        }
        result_names.push(name.clone());
        result_edges.push(edge.clone());
    }
    for name in &props.free_1 {
        result_names.push(name.clone());
        result_edges.push(tensor_1.edge(name)?.clone());
    }
    for name in &props.free_2 {
        result_names.push(name.clone());
        result_edges.push(tensor_2.edge(name)?.clone());
    }

    let c0 = N::internal(InternalName::Contract0);
    let c1 = N::internal(InternalName::Contract1);
    let c2 = N::internal(InternalName::Contract2);
    let merged_1 = tensor_1.edge_operator(
        &EdgeOperator::new()
            .merge(c0.clone(), props.batch.clone())
            .merge(c1.clone(), props.free_1.clone())
            .merge(c2.clone(), props.common_1.clone())
            .transpose(if props.put_common_1_right {
                [c0.clone(), c1.clone(), c2.clone()]
            } else {
                [c0.clone(), c2.clone(), c1.clone()]
            }),
    )?;
    let merged_2 = tensor_2.edge_operator(
        &EdgeOperator::new()
            .merge(c0.clone(), props.batch.clone())
            .merge(c2.clone(), props.free_2.clone())
            .merge(c1.clone(), props.common_2.clone())
            .transpose(if props.put_common_2_right {
                [c0, c2, c1]
            } else {
                [c0, c1, c2]
            }),
    )?;

    let mut result = Tensor::new(result_names, result_edges)?;
    let dims_1: Vec<usize> = merged_1.edges().iter().map(|e| e.dimension()).collect();
    let dims_2: Vec<usize> = merged_2.edges().iter().map(|e| e.dimension()).collect();
    let batch = dims_1[0];
    let m = dims_1[if props.put_common_1_right { 1 } else { 2 }];
    let k = dims_1[if props.put_common_1_right { 2 } else { 1 }];
    let n = dims_2[if props.put_common_2_right { 1 } else { 2 }];
    tracing::debug!(batch, m, n, k, "fused contraction");
    if batch == 0 || m == 0 || n == 0 || k == 0 {
        return Ok(result);
    }

    let data_1 = merged_1.storage();
    let data_2 = merged_2.storage();
    let data = result.storage_mut();
    let shape = GemmShape {
        m,
        n,
        k,
        trans_a: !props.put_common_1_right,
        trans_b: props.put_common_2_right,
    };
    for l in 0..batch {
        gemm_row_major(
            &mut data[l * m * n..(l + 1) * m * n],
            &data_1[l * m * k..(l + 1) * m * k],
            &data_2[l * k * n..(l + 1) * k * n],
            shape,
            T::one(),
            false,
        );
    }
    Ok(result)
}
