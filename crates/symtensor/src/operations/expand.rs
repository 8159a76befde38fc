//! Fixing axes at a point and inserting single-valued axes.
//!
//! Both operations contract the tensor with a helper holding a single one.

use smallvec::SmallVec;

use crate::edge::Edge;
use crate::error::TensorError;
use crate::name::EdgeName;
use crate::scalar::Scalar;
use crate::strides::{cartesian_to_linear, compute_strides};
use crate::symmetry::Symmetry;
use crate::tensor::Tensor;

/// One axis inserted by [`Tensor::expand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpandAxis<S: Symmetry> {
    /// Symmetry of the single segment.
    pub symmetry: S,
    /// Index held inside the segment.
    pub index: usize,
    /// Dimension of the segment.
    pub dimension: usize,
    /// Fermi arrow of the new edge.
    pub arrow: bool,
}

impl<S: Symmetry> ExpandAxis<S> {
    /// An axis of `dimension` fixed at `index`, carrying the identity symmetry.
    pub fn new(index: usize, dimension: usize) -> Self {
        Self {
            symmetry: S::default(),
            index,
            dimension,
            arrow: false,
        }
    }

    pub fn with_symmetry(mut self, symmetry: S) -> Self {
        self.symmetry = symmetry;
        self
    }

    pub fn with_arrow(mut self, arrow: bool) -> Self {
        self.arrow = arrow;
        self
    }
}

/// Tensor with single-segment edges whose only non-zero element is a one at
/// `indices`.
fn point_tensor<T: Scalar, S: Symmetry, N: EdgeName>(
    names: Vec<N>,
    edges: Vec<Edge<S>>,
    indices: &[usize],
) -> Result<Tensor<T, S, N>, TensorError> {
    let dims: SmallVec<[usize; 8]> = edges.iter().map(Edge::dimension).collect();
    for (&index, &dim) in indices.iter().zip(&dims) {
        if index >= dim {
            return Err(TensorError::IndexOutOfBounds { index, dim_size: dim });
        }
    }
    let offset = cartesian_to_linear(indices, &compute_strides(&dims));
    let mut helper = Tensor::new(names, edges)?;
    let data = helper.storage_mut();
    if data.len() <= offset {
        return Err(TensorError::IncompatibleSymmetry {
            message: "fixed symmetries do not conserve".into(),
        });
    }
    data[offset] = T::one();
    Ok(helper)
}

impl<T: Scalar, S: Symmetry, N: EdgeName> Tensor<T, S, N> {
    /// Fix the configured axes at `(symmetry, index)` and drop them.
    ///
    /// When the fixed charges do not cancel, their total is carried by a new
    /// dimension-1 axis `new_name` with the given arrow.
    ///
    /// # Errors
    ///
    /// Returns `SymmetryNotFound` or `IndexOutOfBounds` for a point outside
    /// the edge and `IncompatibleSymmetry` if the total is not the identity
    /// and no new name was given.
    ///
    /// # Example
    ///
    /// ```
    /// use symtensor::{Edge, Tensor, U1};
    ///
    /// let edge = Edge::new([(U1(0), 2), (U1(1), 1)]).unwrap();
    /// let mut t: Tensor<f64, U1> = Tensor::new(["i", "j"], [edge.clone(), edge.conjugated()]).unwrap();
    /// t.range(1.0, 1.0);
    /// let row = t.shrink([("i", (U1(0), 1))], None, false).unwrap();
    /// assert_eq!(row.names(), &["j".to_string()]);
    /// assert_eq!(row.storage(), &[3.0, 4.0]);
    /// ```
    pub fn shrink(
        &self,
        config: impl IntoIterator<Item = (impl Into<N>, (S, usize))>,
        new_name: Option<N>,
        arrow: bool,
    ) -> Result<Self, TensorError> {
        let mut points: SmallVec<[Option<(S, usize)>; 8]> = SmallVec::from_elem(None, self.rank());
        for (name, point) in config {
            let name = name.into();
            let axis = self.axis(&name)?;
            if points[axis].replace(point).is_some() {
                return Err(TensorError::duplicate_name(&name));
            }
        }

        let mut names = Vec::new();
        let mut edges = Vec::new();
        let mut indices = Vec::new();
        let mut total = S::default();
        for (axis, point) in points.iter().enumerate() {
            let Some((symmetry, index)) = *point else {
                continue;
            };
            let name = &self.names()[axis];
            let edge = self.core().edge(axis);
            let dimension = edge
                .dimension_of(symmetry)
                .ok_or_else(|| TensorError::SymmetryNotFound {
                    name: format!("{name:?}"),
                    symmetry: format!("{symmetry:?}"),
                })?;
            total = total + edge.charge(symmetry);
            names.push(name.clone());
            edges.push(Edge::from_sorted(
                vec![(edge.partner_value(symmetry), dimension)],
                !edge.arrow(),
            ));
            indices.push(index);
        }
        let pairs: Vec<(N, N)> = names.iter().map(|n| (n.clone(), n.clone())).collect();
        match new_name {
            Some(new_name) => {
                names.push(new_name);
                edges.push(Edge::from_sorted(vec![(S::from_charge(total, arrow), 1)], arrow));
                indices.push(0);
            }
            None if !total.is_identity() => {
                return Err(TensorError::IncompatibleSymmetry {
                    message: format!("shrinking leaves charge {total:?} but no new edge name was given"),
                });
            }
            None => {}
        }
        let helper = point_tensor(names, edges, &indices)?;
        self.contract(&helper, pairs)
    }

    /// Insert new single-segment axes fixed at the configured indices.
    ///
    /// The new charges are taken from `old_name`, a dimension-1 axis that is
    /// removed; without it they must cancel.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the old axis is not a single dimension-1
    /// segment, `IncompatibleSymmetry` if the charges do not match and
    /// `IndexOutOfBounds` for an index outside its new axis.
    ///
    /// # Example
    ///
    /// ```
    /// use symtensor::{Edge, ExpandAxis, Tensor};
    ///
    /// let mut t: Tensor<f64> = Tensor::new(["i"], [Edge::trivial(2)]).unwrap();
    /// t.range(1.0, 1.0);
    /// let e = t.expand([("k", ExpandAxis::new(1, 3))], None).unwrap();
    /// assert_eq!(e.names(), &["i".to_string(), "k".to_string()]);
    /// assert_eq!(e.storage(), &[0.0, 1.0, 0.0, 0.0, 2.0, 0.0]);
    /// ```
    pub fn expand(
        &self,
        config: impl IntoIterator<Item = (impl Into<N>, ExpandAxis<S>)>,
        old_name: Option<N>,
    ) -> Result<Self, TensorError> {
        let mut names = Vec::new();
        let mut edges = Vec::new();
        let mut indices = Vec::new();
        let mut total = S::default();
        for (name, axis) in config {
            let edge = Edge::from_sorted(vec![(axis.symmetry, axis.dimension)], axis.arrow);
            total = total + edge.charge(axis.symmetry);
            names.push(name.into());
            edges.push(edge);
            indices.push(axis.index);
        }
        let mut pairs = Vec::new();
        match old_name {
            Some(old_name) => {
                let old = self.edge(&old_name)?;
                let &[(symmetry, 1)] = old.segments() else {
                    return Err(TensorError::InvalidArgument {
                        message: format!("edge {old_name:?} is not a single segment of dimension 1"),
                    });
                };
                if old.charge(symmetry) != total {
                    return Err(TensorError::IncompatibleSymmetry {
                        message: format!(
                            "new edges carry {total:?} but edge {old_name:?} carries {:?}",
                            old.charge(symmetry)
                        ),
                    });
                }
                edges.push(Edge::from_sorted(vec![(old.partner_value(symmetry), 1)], !old.arrow()));
                names.push(old_name.clone());
                indices.push(0);
                pairs.push((old_name.clone(), old_name));
            }
            None if !total.is_identity() => {
                return Err(TensorError::IncompatibleSymmetry {
                    message: format!("new edges carry {total:?} without an edge to absorb it"),
                });
            }
            None => {}
        }
        let helper = point_tensor(names, edges, &indices)?;
        self.contract(&helper, pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symmetry::{FermiU1, U1};
    use approx::assert_relative_eq;

    fn u1_matrix() -> Tensor<f64, U1> {
        let edge = Edge::new([(U1(0), 2), (U1(1), 2)]).unwrap();
        let mut t = Tensor::new(["i", "j"], [edge.clone(), edge.conjugated()]).unwrap();
        t.range(1.0, 1.0);
        t
    }

    #[test]
    fn test_shrink_with_new_edge() {
        let t = u1_matrix();
        let row = t.shrink([("i", (U1(1), 0))], Some("c".to_string()), false).unwrap();
        assert_eq!(row.names(), &["j".to_string(), "c".to_string()]);
        assert_eq!(row.edge(&"c".to_string()).unwrap().segments(), &[(U1(1), 1)]);
        assert_eq!(row.storage(), &[5.0, 6.0]);
    }

    #[test]
    fn test_shrink_requires_new_name_for_charge() {
        let t = u1_matrix();
        assert!(matches!(
            t.shrink([("i", (U1(1), 0))], None, false),
            Err(TensorError::IncompatibleSymmetry { .. })
        ));
        assert!(matches!(
            t.shrink([("i", (U1(2), 0))], None, false),
            Err(TensorError::SymmetryNotFound { .. })
        ));
        assert!(matches!(
            t.shrink([("i", (U1(0), 5))], None, false),
            Err(TensorError::IndexOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_expand_undoes_shrink() {
        let t = u1_matrix();
        let row = t.shrink([("i", (U1(1), 1))], Some("c".to_string()), false).unwrap();
        let back = row
            .expand(
                [("i", ExpandAxis::new(1, 2).with_symmetry(U1(1)))],
                Some("c".to_string()),
            )
            .unwrap()
            .transpose(["i", "j"])
            .unwrap();
        assert_eq!(back.get([("i", (U1(1), 1)), ("j", (U1(-1), 0))]).unwrap(), 7.0);
        assert_eq!(back.get([("i", (U1(1), 1)), ("j", (U1(-1), 1))]).unwrap(), 8.0);
        assert_eq!(back.get([("i", (U1(1), 0)), ("j", (U1(-1), 1))]).unwrap(), 0.0);
        assert_relative_eq!(back.norm(1.0), 15.0);
    }

    #[test]
    fn test_expand_rejects_wide_old_edge() {
        let t = u1_matrix();
        assert!(matches!(
            t.expand([("k", ExpandAxis::new(0, 1))], Some("i".to_string())),
            Err(TensorError::InvalidArgument { .. })
        ));
        assert!(matches!(
            t.expand([("k", ExpandAxis::new(0, 1).with_symmetry(U1(1)))], None),
            Err(TensorError::IncompatibleSymmetry { .. })
        ));
    }

    #[test]
    fn test_fermi_shrink_keeps_norm() {
        let edge = Edge::new([(FermiU1(0), 1), (FermiU1(1), 2)]).unwrap();
        let mut t: Tensor<f64, FermiU1> =
            Tensor::new(["i", "j"], [edge.clone(), edge.with_arrow(true)]).unwrap();
        t.range(1.0, 1.0);
        let row = t.shrink([("j", (FermiU1(1), 1))], Some("c".to_string()), true).unwrap();
        assert!(row.edge(&"c".to_string()).unwrap().arrow());
        assert_relative_eq!(row.norm(2.0), (3.0_f64.powi(2) + 5.0_f64.powi(2)).sqrt());
    }
}
