//! Matrix exponential of block-sparse tensors.
//!
//! Paired axes are merged into the rows and columns of a block-diagonal
//! matrix and every block is exponentiated by scaling and squaring around
//! a diagonal Padé approximant.

use std::collections::BTreeMap;

use crate::backend::{GemmShape, gemm_row_major, solve_row_major};
use crate::edge::Edge;
use crate::error::TensorError;
use crate::name::{EdgeName, InternalName};
use crate::operations::EdgeOperator;
use crate::scalar::Scalar;
use crate::symmetry::Symmetry;
use crate::tensor::Tensor;

fn identity_matrix<T: Scalar>(n: usize) -> Vec<T> {
    let mut m = vec![T::zero(); n * n];
    for i in 0..n {
        m[i * n + i] = T::one();
    }
    m
}

fn square<T: Scalar>(a: &[T], n: usize) -> Vec<T> {
    let mut c = vec![T::zero(); n * n];
    multiply(&mut c, a, a, n);
    c
}

fn multiply<T: Scalar>(c: &mut [T], a: &[T], b: &[T], n: usize) {
    let shape = GemmShape {
        m: n,
        n,
        k: n,
        trans_a: false,
        trans_b: false,
    };
    gemm_row_major(c, a, b, shape, T::one(), false);
}

/// `exp(A)` for a square row-major `A` of order `n` with a `[q/q]` Padé
/// approximant.
///
/// # Errors
///
/// Returns `LinearSolveError` if the denominator is singular.
pub(crate) fn matrix_exponential<T: Scalar>(a: &[T], n: usize, q: usize) -> Result<Vec<T>, TensorError> {
    let largest = a.iter().map(|x| x.modulus()).fold(0.0, f64::max);
    let squarings = if largest > 0.0 {
        (1 + largest.log2().floor() as i32).max(0)
    } else {
        0
    };
    let scale = T::from_real(0.5_f64.powi(squarings));
    let a: Vec<T> = a.iter().map(|&x| x * scale).collect();

    let mut numerator = identity_matrix::<T>(n);
    let mut denominator = identity_matrix::<T>(n);
    let mut power = identity_matrix::<T>(n);
    let mut next = vec![T::zero(); n * n];
    let mut c = 1.0;
    for k in 1..=q {
        c = c * (q - k + 1) as f64 / ((2 * q - k + 1) * k) as f64;
        multiply(&mut next, &a, &power, n);
        std::mem::swap(&mut power, &mut next);
        let (cn, cd) = (T::from_real(c), T::from_real(if k % 2 == 0 { c } else { -c }));
        for ((num, den), &x) in numerator.iter_mut().zip(denominator.iter_mut()).zip(&power) {
            *num = *num + cn * x;
            *den = *den + cd * x;
        }
    }

    let mut result = solve_row_major(&denominator, &numerator, n)?;
    for _ in 0..squarings {
        result = square(&result, n);
    }
    Ok(result)
}

impl<T: Scalar, S: Symmetry, N: EdgeName> Tensor<T, S, N> {
    /// Matrix exponential over paired axes.
    ///
    /// Every axis must appear in exactly one pair. The first members of the
    /// pairs form the rows and the second members the columns of a matrix
    /// that is exponentiated block by block; `step` is the order of the
    /// Padé approximant.
    ///
    /// # Errors
    ///
    /// Returns `NameNotFound` or `DuplicateName` for bad pairs,
    /// `InvalidArgument` if an axis is left unpaired, `NotSquareMatrix` if a
    /// block is not square and `LinearSolveError` if the approximant cannot
    /// be solved.
    ///
    /// # Example
    ///
    /// ```
    /// use symtensor::{Edge, Tensor};
    ///
    /// let mut t: Tensor<f64> = Tensor::new(["i", "j"], [Edge::trivial(2), Edge::trivial(2)]).unwrap();
    /// t.storage_mut().copy_from_slice(&[1.0, 0.0, 0.0, 2.0]);
    /// let e = t.exponential([("i", "j")], 8).unwrap();
    /// assert!((e.storage()[0] - 1.0_f64.exp()).abs() < 1e-10);
    /// assert!((e.storage()[3] - 2.0_f64.exp()).abs() < 1e-10);
    /// ```
    pub fn exponential(
        &self,
        pairs: impl IntoIterator<Item = (impl Into<N>, impl Into<N>)>,
        step: usize,
    ) -> Result<Self, TensorError> {
        let rank = self.rank();
        let mut partner: BTreeMap<usize, (usize, bool)> = BTreeMap::new();
        for (a, b) in pairs {
            let (a, b) = (a.into(), b.into());
            let (ia, ib) = (self.axis(&a)?, self.axis(&b)?);
            if ia == ib {
                return Err(TensorError::duplicate_name(&a));
            }
            if partner.insert(ia, (ib, true)).is_some() {
                return Err(TensorError::duplicate_name(&a));
            }
            if partner.insert(ib, (ia, false)).is_some() {
                return Err(TensorError::duplicate_name(&b));
            }
        }
        if partner.len() != rank {
            return Err(TensorError::InvalidArgument {
                message: format!("exponential needs every edge paired, {} of {rank} are", partner.len()),
            });
        }

        // right to left; each pair is placed when its rightmost member is met
        let mut rows = Vec::new();
        let mut columns = Vec::new();
        let mut placed = vec![false; rank];
        for axis in (0..rank).rev() {
            if placed[axis] {
                continue;
            }
            let (other, first) = partner[&axis];
            placed[axis] = true;
            placed[other] = true;
            let (a, b) = if first { (axis, other) } else { (other, axis) };
            rows.push(a);
            columns.push(b);
        }
        rows.reverse();
        columns.reverse();

        let names = self.names();
        let mut reversed = Vec::new();
        let mut plan: Vec<(N, Edge<S>)> = Vec::with_capacity(rank);
        for (name, edge) in names.iter().zip(self.edges()) {
            if S::IS_FERMI && edge.arrow() {
                reversed.push(name.clone());
                plan.push((name.clone(), edge.reversed()));
            } else {
                plan.push((name.clone(), edge.clone()));
            }
        }
        let group = |axes: &[usize]| -> Vec<N> { axes.iter().map(|&i| names[i].clone()).collect() };
        let parts = |axes: &[usize]| -> Vec<(N, Edge<S>)> { axes.iter().map(|&i| plan[i].clone()).collect() };

        let exp_1 = N::internal(InternalName::Exp1);
        let exp_2 = N::internal(InternalName::Exp2);
        let row_last = rank == 0 || rows.last() == Some(&(rank - 1));
        let (merged_names, result_names) = if row_last {
            (
                [exp_2.clone(), exp_1.clone()],
                group(&columns).into_iter().chain(group(&rows)).collect::<Vec<_>>(),
            )
        } else {
            (
                [exp_1.clone(), exp_2.clone()],
                group(&rows).into_iter().chain(group(&columns)).collect::<Vec<_>>(),
            )
        };

        let merged = self.edge_operator(
            &EdgeOperator::new()
                .reverse(reversed.clone())
                .merge(exp_1.clone(), group(&rows))
                .merge(exp_2.clone(), group(&columns))
                .transpose(merged_names)
                .apply_parity(false)
                .partner_order(exp_2.clone()),
        )?;

        let mut blocks = Vec::new();
        for (entry, data) in merged.core().iter_blocks() {
            let Some(shape) = merged.core().block_shape(entry.key.symmetries()) else {
                continue;
            };
            if shape[0] != shape[1] {
                return Err(TensorError::NotSquareMatrix {
                    rows: shape[0],
                    cols: shape[1],
                });
            }
            blocks.push((entry.offset, matrix_exponential(data, shape[0], step)?));
        }
        tracing::debug!(blocks = blocks.len(), step, "exponential");

        let mut result = merged;
        let storage = result.storage_mut();
        for (offset, values) in blocks {
            storage[offset..offset + values.len()].copy_from_slice(&values);
        }
        result.edge_operator(
            &EdgeOperator::new()
                .split(exp_1, parts(&rows))
                .split(exp_2, parts(&columns))
                .reverse(reversed)
                .transpose(result_names)
                .apply_parity(false),
        )
    }
}
