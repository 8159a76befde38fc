//! Edges: the segment structure of one tensor axis.

use crate::error::TensorError;
use crate::symmetry::{NoSymmetry, Symmetry};

/// One axis of a tensor, partitioned into segments labelled by symmetry.
///
/// Segments are kept sorted by symmetry value, never repeat a value and
/// never have dimension zero. The arrow only matters for fermionic
/// symmetries; it is normalized to `false` otherwise.
///
/// # Example
///
/// ```
/// use symtensor::{Edge, U1};
///
/// let edge = Edge::new([(U1(1), 3), (U1(0), 2)]).unwrap();
/// assert_eq!(edge.dimension(), 5);
/// assert_eq!(edge.segments()[0], (U1(0), 2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge<S: Symmetry> {
    segments: Vec<(S, usize)>,
    arrow: bool,
}

impl<S: Symmetry> Edge<S> {
    /// Build an edge from `(symmetry, dimension)` pairs.
    ///
    /// Segments are sorted; zero-dimension segments are dropped.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateSegment` if a symmetry value appears twice.
    pub fn new(segments: impl IntoIterator<Item = (S, usize)>) -> Result<Self, TensorError> {
        let mut segments: Vec<(S, usize)> = segments.into_iter().filter(|&(_, d)| d > 0).collect();
        segments.sort_by(|a, b| a.0.cmp(&b.0));
        if let Some(w) = segments.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(TensorError::DuplicateSegment {
                symmetry: format!("{:?}", w[0].0),
            });
        }
        Ok(Self {
            segments,
            arrow: false,
        })
    }

    /// An edge with a single identity segment of dimension `dim`.
    pub fn trivial(dim: usize) -> Self {
        let segments = if dim > 0 {
            vec![(S::default(), dim)]
        } else {
            Vec::new()
        };
        Self {
            segments,
            arrow: false,
        }
    }

    /// Set the fermi arrow (ignored for bosonic symmetries).
    #[must_use]
    pub fn with_arrow(mut self, arrow: bool) -> Self {
        self.arrow = arrow && S::IS_FERMI;
        self
    }

    pub(crate) fn from_sorted(segments: Vec<(S, usize)>, arrow: bool) -> Self {
        debug_assert!(segments.windows(2).all(|w| w[0].0 < w[1].0));
        Self {
            segments,
            arrow: arrow && S::IS_FERMI,
        }
    }

    /// Segments in canonical order.
    #[inline]
    pub fn segments(&self) -> &[(S, usize)] {
        &self.segments
    }

    /// The fermi arrow.
    #[inline]
    pub fn arrow(&self) -> bool {
        self.arrow
    }

    /// Total dimension of the axis.
    pub fn dimension(&self) -> usize {
        self.segments.iter().map(|&(_, d)| d).sum()
    }

    /// Position of a symmetry value in the segment list.
    #[inline]
    pub fn position_of(&self, symmetry: S) -> Option<usize> {
        self.segments
            .binary_search_by(|(s, _)| s.cmp(&symmetry))
            .ok()
    }

    /// Dimension of the segment labelled `symmetry`, if present.
    #[inline]
    pub fn dimension_of(&self, symmetry: S) -> Option<usize> {
        self.position_of(symmetry).map(|p| self.segments[p].1)
    }

    /// Signed contribution of `symmetry` to the conservation law.
    #[inline]
    pub fn charge(&self, symmetry: S) -> S {
        symmetry.charge(self.arrow)
    }

    /// Segment value carrying the given charge on this edge.
    #[inline]
    pub fn value_for_charge(&self, charge: S) -> S {
        S::from_charge(charge, self.arrow)
    }

    /// Value on a contracted partner edge that cancels `symmetry` of this edge.
    ///
    /// The partner is assumed to be this edge's conjugate (opposite arrow for
    /// fermionic symmetries).
    #[inline]
    pub fn partner_value(&self, symmetry: S) -> S {
        S::from_charge(-self.charge(symmetry), !self.arrow)
    }

    /// The edge that contracts with this one: every charge negated.
    ///
    /// Fermionic edges flip the arrow and keep their values; bosonic edges
    /// negate their values.
    #[must_use]
    pub fn conjugated(&self) -> Self {
        if S::IS_FERMI {
            Self {
                segments: self.segments.clone(),
                arrow: !self.arrow,
            }
        } else {
            self.negated_values(false)
        }
    }

    /// Flip the fermi arrow keeping every charge.
    ///
    /// Bosonic edges are returned unchanged.
    #[must_use]
    pub fn reversed(&self) -> Self {
        if S::IS_FERMI {
            self.negated_values(!self.arrow)
        } else {
            self.clone()
        }
    }

    fn negated_values(&self, arrow: bool) -> Self {
        let mut segments: Vec<(S, usize)> = self.segments.iter().map(|&(s, d)| (-s, d)).collect();
        segments.sort_by(|a, b| a.0.cmp(&b.0));
        Self { segments, arrow }
    }

    pub(crate) fn retain_segments(&mut self, mut keep: impl FnMut(usize, S) -> bool) {
        let mut index = 0;
        self.segments.retain(|&(s, _)| {
            let k = keep(index, s);
            index += 1;
            k
        });
    }

    /// Convert a total index along the axis into `(symmetry, local index)`.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` if `index >= dimension()`.
    pub fn point_from_index(&self, index: usize) -> Result<(S, usize), TensorError> {
        let mut rest = index;
        for &(symmetry, dim) in &self.segments {
            if rest < dim {
                return Ok((symmetry, rest));
            }
            rest -= dim;
        }
        Err(TensorError::IndexOutOfBounds {
            index,
            dim_size: self.dimension(),
        })
    }

    /// Convert `(symmetry, local index)` into a total index along the axis.
    ///
    /// # Errors
    ///
    /// Returns `SymmetryNotFound` or `IndexOutOfBounds` for invalid points.
    pub fn index_from_point(&self, point: (S, usize)) -> Result<usize, TensorError> {
        let (symmetry, local) = point;
        let mut offset = 0;
        for &(s, dim) in &self.segments {
            if s == symmetry {
                if local >= dim {
                    return Err(TensorError::IndexOutOfBounds {
                        index: local,
                        dim_size: dim,
                    });
                }
                return Ok(offset + local);
            }
            offset += dim;
        }
        Err(TensorError::SymmetryNotFound {
            name: String::from("<edge>"),
            symmetry: format!("{symmetry:?}"),
        })
    }
}

impl From<usize> for Edge<NoSymmetry> {
    fn from(dim: usize) -> Self {
        Edge::trivial(dim)
    }
}
