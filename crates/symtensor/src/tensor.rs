//! Named block-sparse tensor with a copy-on-write core.
//!
//! ```text
//! Tensor<T, S, N>
//! ├── names: Vec<N>              axis order
//! ├── name_to_index: N -> axis
//! └── core: Arc<Core<T, S>>      edges + blocks, shared between clones
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::arena::ScratchArena;
use crate::edge::Edge;
use crate::error::TensorError;
use crate::name::EdgeName;
use crate::scalar::Scalar;
use crate::storage::Core;
use crate::strides::{cartesian_to_linear, compute_strides};
use crate::symmetry::{NoSymmetry, Symmetry};

/// A tensor whose axes are named and partitioned into symmetry segments.
///
/// Cloning is cheap: the clone shares the core. The first mutating access
/// on a shared core copies it, so other handles never observe the write.
#[derive(Debug, Clone)]
pub struct Tensor<T: Scalar, S: Symmetry = NoSymmetry, N: EdgeName = String> {
    names: Vec<N>,
    name_to_index: BTreeMap<N, usize>,
    core: Arc<Core<T, S>>,
}

/// Index a name list, rejecting duplicates.
pub(crate) fn index_names<N: EdgeName>(names: &[N]) -> Result<BTreeMap<N, usize>, TensorError> {
    let mut map = BTreeMap::new();
    for (i, name) in names.iter().enumerate() {
        if map.insert(name.clone(), i).is_some() {
            return Err(TensorError::duplicate_name(name));
        }
    }
    Ok(map)
}

impl<T: Scalar, S: Symmetry, N: EdgeName> Tensor<T, S, N> {
    /// Create a zero-filled tensor from axis names and edges.
    ///
    /// # Errors
    ///
    /// Returns `NameCountMismatch` if the two lists differ in length and
    /// `DuplicateName` if a name repeats.
    ///
    /// # Examples
    ///
    /// ```
    /// use symtensor::{Edge, Tensor, U1};
    ///
    /// let edge = Edge::new([(U1(0), 2), (U1(1), 3)]).unwrap();
    /// let t: Tensor<f64, U1> =
    ///     Tensor::new(["i", "j"], [edge.clone(), edge.conjugated()]).unwrap();
    /// assert_eq!(t.rank(), 2);
    /// assert_eq!(t.storage().len(), 4 + 9);
    /// ```
    pub fn new(
        names: impl IntoIterator<Item = impl Into<N>>,
        edges: impl IntoIterator<Item = Edge<S>>,
    ) -> Result<Self, TensorError> {
        let names: Vec<N> = names.into_iter().map(Into::into).collect();
        let edges: Vec<Edge<S>> = edges.into_iter().collect();
        if names.len() != edges.len() {
            return Err(TensorError::NameCountMismatch {
                names: names.len(),
                edges: edges.len(),
            });
        }
        let name_to_index = index_names(&names)?;
        let arena = ScratchArena::for_rank(edges.len());
        let core = Core::new(edges, &arena);
        Ok(Self {
            names,
            name_to_index,
            core: Arc::new(core),
        })
    }

    /// Wrap a freshly built core.
    pub(crate) fn from_core(names: Vec<N>, core: Core<T, S>) -> Result<Self, TensorError> {
        Self::from_shared(names, Arc::new(core))
    }

    pub(crate) fn from_shared(names: Vec<N>, core: Arc<Core<T, S>>) -> Result<Self, TensorError> {
        if names.len() != core.rank() {
            return Err(TensorError::NameCountMismatch {
                names: names.len(),
                edges: core.rank(),
            });
        }
        let name_to_index = index_names(&names)?;
        Ok(Self {
            names,
            name_to_index,
            core,
        })
    }

    /// A rank-0 tensor holding `value`.
    pub fn scalar(value: T) -> Self {
        let mut core = Core::new(Vec::new(), &ScratchArena::new());
        core.data_mut()[0] = value;
        Self {
            names: Vec::new(),
            name_to_index: BTreeMap::new(),
            core: Arc::new(core),
        }
    }

    /// A tensor with one element: every edge is a single segment of
    /// dimension 1.
    ///
    /// # Errors
    ///
    /// Returns `IncompatibleSymmetry` if the symmetries do not conserve and
    /// `NameCountMismatch` if the lists differ in length.
    pub fn one(
        value: T,
        names: impl IntoIterator<Item = impl Into<N>>,
        symmetries: &[S],
        arrows: &[bool],
    ) -> Result<Self, TensorError> {
        if arrows.len() != symmetries.len() {
            return Err(TensorError::InvalidArgument {
                message: format!("{} symmetries but {} arrows", symmetries.len(), arrows.len()),
            });
        }
        let edges = symmetries
            .iter()
            .zip(arrows)
            .map(|(&s, &arrow)| Edge::from_sorted(vec![(s, 1)], arrow));
        let mut tensor = Self::new(names, edges)?;
        let data = tensor.storage_mut();
        if data.len() != 1 {
            return Err(TensorError::IncompatibleSymmetry {
                message: format!("symmetries {symmetries:?} do not sum to the identity"),
            });
        }
        data[0] = value;
        Ok(tensor)
    }

    /// Same names over a new core of the same rank.
    pub(crate) fn with_core(&self, core: Core<T, S>) -> Self {
        debug_assert_eq!(core.rank(), self.rank());
        Self {
            names: self.names.clone(),
            name_to_index: self.name_to_index.clone(),
            core: Arc::new(core),
        }
    }

    /// A zero-filled tensor with the same names and edges.
    pub fn same_shape(&self) -> Self {
        Self {
            names: self.names.clone(),
            name_to_index: self.name_to_index.clone(),
            core: Arc::new(self.core.map_data(|_| T::zero())),
        }
    }

    /// Axis names in order.
    #[inline]
    pub fn names(&self) -> &[N] {
        &self.names
    }

    /// Number of axes.
    #[inline]
    pub fn rank(&self) -> usize {
        self.names.len()
    }

    /// Axis position of `name`.
    #[inline]
    pub fn index_of(&self, name: &N) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    pub(crate) fn axis(&self, name: &N) -> Result<usize, TensorError> {
        self.index_of(name)
            .ok_or_else(|| TensorError::name_not_found(name))
    }

    /// Whether the tensor has an axis called `name`.
    #[inline]
    pub fn contains(&self, name: &N) -> bool {
        self.name_to_index.contains_key(name)
    }

    /// Edges in axis order.
    #[inline]
    pub fn edges(&self) -> &[Edge<S>] {
        self.core.edges()
    }

    /// The edge of axis `name`.
    pub fn edge(&self, name: &N) -> Result<&Edge<S>, TensorError> {
        Ok(self.core.edge(self.axis(name)?))
    }

    /// Shared core.
    #[inline]
    pub fn core(&self) -> &Core<T, S> {
        &self.core
    }

    pub(crate) fn shared_core(&self) -> &Arc<Core<T, S>> {
        &self.core
    }

    /// Whether two handles point at the same core.
    pub fn shares_core_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }

    /// The bulk buffer holding every block.
    #[inline]
    pub fn storage(&self) -> &[T] {
        self.core.data()
    }

    /// Mutable bulk buffer, copying a shared core first.
    pub fn storage_mut(&mut self) -> &mut [T] {
        self.core_mut().data_mut()
    }

    pub(crate) fn core_mut(&mut self) -> &mut Core<T, S> {
        let shared = Arc::strong_count(&self.core);
        if shared > 1 {
            tracing::debug!(
                rank = self.rank(),
                elements = self.core.data().len(),
                shared,
                "copying shared core before write"
            );
        }
        Arc::make_mut(&mut self.core)
    }

    /// Fill every element with zero.
    pub fn zero(&mut self) -> &mut Self {
        self.storage_mut().fill(T::zero());
        self
    }

    /// Fill elements in storage order from a generator.
    pub fn set(&mut self, mut generator: impl FnMut() -> T) -> &mut Self {
        for x in self.storage_mut() {
            *x = generator();
        }
        self
    }

    /// Fill elements in storage order with `first, first + step, ...`.
    pub fn range(&mut self, first: T, step: T) -> &mut Self {
        let mut current = first;
        self.set(|| {
            let value = current;
            current += step;
            value
        })
    }

    /// Apply `f` to every element in place.
    pub fn transform(&mut self, mut f: impl FnMut(T) -> T) -> &mut Self {
        for x in self.storage_mut() {
            *x = f(*x);
        }
        self
    }

    /// New tensor of the same shape with `f` applied to every element.
    pub fn map<U: Scalar>(&self, mut f: impl FnMut(T) -> U) -> Tensor<U, S, N> {
        Tensor {
            names: self.names.clone(),
            name_to_index: self.name_to_index.clone(),
            core: Arc::new(self.core.map_data(|&x| f(x))),
        }
    }

    /// Convert the element type; complex to real keeps the real part.
    pub fn to<U: Scalar>(&self) -> Tensor<U, S, N> {
        self.map(|x| U::from_complex(x.to_complex()))
    }

    /// The value of a rank-0 tensor.
    ///
    /// # Errors
    ///
    /// Returns `WrongNumberOfIndices` for tensors of nonzero rank.
    pub fn to_scalar(&self) -> Result<T, TensorError> {
        if self.rank() != 0 {
            return Err(TensorError::WrongNumberOfIndices {
                expected: 0,
                actual: self.rank(),
            });
        }
        Ok(self.storage().first().copied().unwrap_or_else(T::zero))
    }

    /// Arrange a name-keyed map into axis order.
    pub(crate) fn by_axis<V>(
        &self,
        items: impl IntoIterator<Item = (impl Into<N>, V)>,
    ) -> Result<SmallVec<[V; 8]>, TensorError> {
        let mut slots: SmallVec<[Option<V>; 8]> = (0..self.rank()).map(|_| None).collect();
        let mut count = 0;
        for (name, value) in items {
            let name = name.into();
            let axis = self.axis(&name)?;
            if slots[axis].replace(value).is_some() {
                return Err(TensorError::duplicate_name(&name));
            }
            count += 1;
        }
        if count != self.rank() {
            return Err(TensorError::WrongNumberOfIndices {
                expected: self.rank(),
                actual: count,
            });
        }
        Ok(slots.into_iter().flatten().collect())
    }

    /// Storage offset of a point given per axis as `(symmetry, local index)`.
    ///
    /// `Ok(None)` means the point lies in a block that does not conserve.
    fn offset_of_point(&self, point: &[(S, usize)]) -> Result<Option<usize>, TensorError> {
        let mut shape: SmallVec<[usize; 8]> = SmallVec::new();
        for (axis, &(symmetry, local)) in point.iter().enumerate() {
            let edge = self.core.edge(axis);
            let dim = edge
                .dimension_of(symmetry)
                .ok_or_else(|| TensorError::SymmetryNotFound {
                    name: format!("{:?}", self.names[axis]),
                    symmetry: format!("{symmetry:?}"),
                })?;
            if local >= dim {
                return Err(TensorError::IndexOutOfBounds {
                    index: local,
                    dim_size: dim,
                });
            }
            shape.push(dim);
        }
        let key: SmallVec<[S; 8]> = point.iter().map(|&(s, _)| s).collect();
        let Some(entry) = self.core.blocks().get(&key) else {
            return Ok(None);
        };
        let locals: SmallVec<[usize; 8]> = point.iter().map(|&(_, i)| i).collect();
        Ok(Some(
            entry.offset + cartesian_to_linear(&locals, &compute_strides(&shape)),
        ))
    }

    /// Element at a point given as name → `(symmetry, local index)`.
    ///
    /// Points inside a block that does not conserve read as zero.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown names, missing segments or indices out
    /// of range.
    pub fn get(
        &self,
        point: impl IntoIterator<Item = (impl Into<N>, (S, usize))>,
    ) -> Result<T, TensorError> {
        let point = self.by_axis(point)?;
        Ok(self
            .offset_of_point(&point)?
            .map_or_else(T::zero, |offset| self.storage()[offset]))
    }

    /// Element at a point given as name → total index along the axis.
    pub fn get_by_index(
        &self,
        indices: impl IntoIterator<Item = (impl Into<N>, usize)>,
    ) -> Result<T, TensorError> {
        let indices = self.by_axis(indices)?;
        let point = indices
            .iter()
            .zip(self.edges())
            .map(|(&index, edge)| edge.point_from_index(index))
            .collect::<Result<SmallVec<[(S, usize); 8]>, _>>()?;
        Ok(self
            .offset_of_point(&point)?
            .map_or_else(T::zero, |offset| self.storage()[offset]))
    }

    /// Overwrite one element.
    ///
    /// # Errors
    ///
    /// Returns `IncompatibleSymmetry` if the point is not inside a stored
    /// block.
    pub fn set_element(
        &mut self,
        point: impl IntoIterator<Item = (impl Into<N>, (S, usize))>,
        value: T,
    ) -> Result<(), TensorError> {
        let point = self.by_axis(point)?;
        let offset = self
            .offset_of_point(&point)?
            .ok_or_else(|| TensorError::IncompatibleSymmetry {
                message: format!("point {point:?} is not in a conserved block"),
            })?;
        self.storage_mut()[offset] = value;
        Ok(())
    }

    fn block_key(
        &self,
        symmetries: impl IntoIterator<Item = (impl Into<N>, S)>,
    ) -> Result<SmallVec<[S; 8]>, TensorError> {
        let key = self.by_axis(symmetries)?;
        if !self.core.blocks().contains(&key) {
            return Err(TensorError::IncompatibleSymmetry {
                message: format!("no block {key:?}"),
            });
        }
        Ok(key)
    }

    /// Row-major data of the block selected by name → symmetry.
    pub fn block(
        &self,
        symmetries: impl IntoIterator<Item = (impl Into<N>, S)>,
    ) -> Result<&[T], TensorError> {
        let key = self.block_key(symmetries)?;
        self.core
            .block(&key)
            .ok_or_else(|| TensorError::IncompatibleSymmetry {
                message: format!("no block {key:?}"),
            })
    }

    /// Mutable data of the block selected by name → symmetry.
    pub fn block_mut(
        &mut self,
        symmetries: impl IntoIterator<Item = (impl Into<N>, S)>,
    ) -> Result<&mut [T], TensorError> {
        let key = self.block_key(symmetries)?;
        self.core_mut()
            .block_mut(&key)
            .ok_or_else(|| TensorError::IncompatibleSymmetry {
                message: format!("no block {key:?}"),
            })
    }
}
