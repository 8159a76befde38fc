//! Contraction layout: which axes are free, common or batched, and on which
//! side each operand keeps its common axes.
//!
//! # Design
//!
//! Both operands are merged into matrices before the multiply:
//! - operand 1 becomes `(free_1, common_1)` or `(common_1, free_1)`
//! - operand 2 becomes `(common_2, free_2)` or `(free_2, common_2)`
//!
//! The side is chosen so that an operand whose common axes already sit at
//! its end needs no reordering, which keeps the merge a cheap copy.

use std::collections::BTreeMap;

use crate::error::TensorError;
use crate::name::EdgeName;

/// Layout of a two-tensor contraction.
#[derive(Debug, Clone)]
pub struct ContractionProperties<N> {
    /// Free axes of operand 1, in its order.
    pub free_1: Vec<N>,
    /// Free axes of operand 2, in its order.
    pub free_2: Vec<N>,
    /// Common axes of operand 1; `common_2[i]` pairs with `common_1[i]`.
    pub common_1: Vec<N>,
    pub common_2: Vec<N>,
    /// Axes present on both operands and in no pair (trivial symmetry only).
    pub batch: Vec<N>,
    /// Operand 1 is laid out as `(free, common)`.
    pub put_common_1_right: bool,
    /// Operand 2 is laid out as `(free, common)`.
    pub put_common_2_right: bool,
}

/// Drop pairs naming absent axes and reject repeated names.
pub(crate) fn filter_pairs<N: EdgeName>(
    names_1: &[N],
    names_2: &[N],
    pairs: impl IntoIterator<Item = (N, N)>,
) -> Result<Vec<(N, N)>, TensorError> {
    let mut kept: Vec<(N, N)> = Vec::new();
    for (n1, n2) in pairs {
        if !names_1.contains(&n1) || !names_2.contains(&n2) {
            tracing::warn!(first = ?n1, second = ?n2, "contraction pair with missing edge ignored");
            continue;
        }
        if kept.iter().any(|(k1, _)| *k1 == n1) {
            return Err(TensorError::duplicate_name(&n1));
        }
        if kept.iter().any(|(_, k2)| *k2 == n2) {
            return Err(TensorError::duplicate_name(&n2));
        }
        kept.push((n1, n2));
    }
    Ok(kept)
}

impl<N: EdgeName> ContractionProperties<N> {
    /// Compute the layout from both name lists and the (filtered) pairs.
    ///
    /// With `fuse`, names shared by both operands but absent from every pair
    /// become batch axes instead of free axes, listed in sorted order.
    ///
    /// # Example
    ///
    /// ```
    /// use symtensor::contract::ContractionProperties;
    ///
    /// let a = ["i".to_string(), "j".to_string()];
    /// let b = ["k".to_string(), "l".to_string()];
    /// let props = ContractionProperties::compute(&a, &b, &[("j".into(), "k".into())], false);
    /// assert_eq!(props.free_1, ["i".to_string()]);
    /// assert_eq!(props.common_2, ["k".to_string()]);
    /// assert!(props.put_common_1_right);
    /// assert!(!props.put_common_2_right);
    /// ```
    pub fn compute(names_1: &[N], names_2: &[N], pairs: &[(N, N)], fuse: bool) -> Self {
        let first: BTreeMap<&N, &N> = pairs.iter().map(|(a, b)| (a, b)).collect();
        let second: BTreeMap<&N, &N> = pairs.iter().map(|(a, b)| (b, a)).collect();

        let batch: Vec<N> = if fuse {
            let mut batch: Vec<N> = names_1
                .iter()
                .filter(|n| !first.contains_key(n) && names_2.contains(n) && !second.contains_key(n))
                .cloned()
                .collect();
            batch.sort();
            batch
        } else {
            Vec::new()
        };
        let free_1: Vec<N> = names_1
            .iter()
            .filter(|n| !first.contains_key(n) && !batch.contains(n))
            .cloned()
            .collect();
        let free_2: Vec<N> = names_2
            .iter()
            .filter(|n| !second.contains_key(n) && !batch.contains(n))
            .cloned()
            .collect();

        let follow_1 = || -> (Vec<N>, Vec<N>) {
            names_1
                .iter()
                .filter_map(|n| first.get(n).map(|m| (n.clone(), (*m).clone())))
                .unzip()
        };
        let follow_2 = || -> (Vec<N>, Vec<N>) {
            names_2
                .iter()
                .filter_map(|n| second.get(n).map(|m| ((*m).clone(), n.clone())))
                .unzip()
        };
        let ends_with = |common: &[N], names: &[N]| common.is_empty() || common.last() == names.last();

        let (common_1, common_2, put_common_1_right, put_common_2_right);
        if free_1.is_empty() {
            (common_1, common_2) = follow_2();
            put_common_1_right = true;
            put_common_2_right = ends_with(&common_2, names_2);
        } else if free_2.is_empty() {
            (common_1, common_2) = follow_1();
            put_common_2_right = true;
            put_common_1_right = ends_with(&common_1, names_1);
        } else if free_1.last() != names_1.last() {
            (common_1, common_2) = follow_1();
            put_common_1_right = true;
            put_common_2_right = ends_with(&common_2, names_2);
        } else if free_2.last() != names_2.last() {
            (common_1, common_2) = follow_2();
            put_common_2_right = true;
            put_common_1_right = ends_with(&common_1, names_1);
        } else {
            // both operands end with free axes: move the commons of both
            (common_1, common_2) = follow_2();
            put_common_1_right = false;
            put_common_2_right = false;
        }

        Self {
            free_1,
            free_2,
            common_1,
            common_2,
            batch,
            put_common_1_right,
            put_common_2_right,
        }
    }
}
