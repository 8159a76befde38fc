//! The general edge transformation: rename, split, reverse, transpose and
//! merge in one pass over the blocks.
//!
//! Stages run in a fixed order:
//!
//! ```text
//! rename -> discard -> split -> reverse -> transpose -> align arrows -> merge
//! ```
//!
//! Every destination block is assembled from fine blocks, the blocks over
//! the axes as they stand just before merging. Each fine block is one strided
//! move from the source with an optional sign.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use smallvec::SmallVec;

use crate::arena::ScratchArena;
use crate::backend::{GenericBackend, PermutationBackend, StridedMove};
use crate::edge::Edge;
use crate::error::TensorError;
use crate::name::EdgeName;
use crate::operations::fusion::FusionTable;
use crate::scalar::Scalar;
use crate::storage::Core;
use crate::storage::blocksparse::enumerate::for_each_conserved;
use crate::strides::compute_strides;
use crate::symmetry::{Symmetry, pair_parity};
use crate::tensor::{Tensor, index_names};

/// Fermionic sign accumulated for one block.
///
/// Each stage reports what it did to the block's axes and the ledger folds
/// it into a single parity.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ParityLedger {
    odd: bool,
}

impl ParityLedger {
    /// Reordering axes: every swapped pair of odd axes flips the sign.
    ///
    /// `order[p]` is the old position of the axis now at position `p`.
    pub fn transposition(&mut self, order: &[usize], parity: impl Fn(usize) -> bool) {
        for (p, &a) in order.iter().enumerate() {
            if !parity(a) {
                continue;
            }
            for &b in &order[p + 1..] {
                if b < a && parity(b) {
                    self.odd ^= true;
                }
            }
        }
    }

    /// Reversing an axis of the given parity.
    pub fn reversal(&mut self, parity: bool) {
        self.odd ^= parity;
    }

    /// Fusing (or splitting) a group of axes.
    pub fn fusion(&mut self, parities: impl IntoIterator<Item = bool>) {
        self.odd ^= pair_parity(parities);
    }

    pub fn is_odd(&self) -> bool {
        self.odd
    }
}

/// Builder for [`Tensor::edge_operator`].
///
/// Names in every stage refer to the names produced by the stages before it:
/// split keys use renamed names, reverse and merge use post-split names, and
/// the transpose order uses post-merge names.
///
/// # Example
///
/// ```
/// use symtensor::{Edge, EdgeOperator, Tensor};
///
/// let mut t: Tensor<f64> =
///     Tensor::new(["a", "b", "c"], [Edge::trivial(2), Edge::trivial(3), Edge::trivial(4)])
///         .unwrap();
/// t.range(0.0, 1.0);
///
/// let op = EdgeOperator::new()
///     .rename([("a", "x")])
///     .merge("bc", ["b", "c"])
///     .transpose(["bc", "x"]);
/// let m = t.edge_operator(&op).unwrap();
/// assert_eq!(m.names(), &["bc".to_string(), "x".to_string()]);
/// assert_eq!(m.edges()[0].dimension(), 12);
/// ```
#[derive(Debug, Clone)]
pub struct EdgeOperator<S: Symmetry, N: EdgeName = String> {
    rename: BTreeMap<N, N>,
    split: BTreeMap<N, Vec<(N, Edge<S>)>>,
    reverse: BTreeSet<N>,
    merge: BTreeMap<N, Vec<N>>,
    transpose: Option<Vec<N>>,
    apply_parity: bool,
    exclude_split: BTreeSet<N>,
    exclude_reverse: BTreeSet<N>,
    exclude_align: BTreeSet<N>,
    exclude_merge: BTreeSet<N>,
    discard: BTreeMap<N, BTreeSet<S>>,
    partner_order: BTreeSet<N>,
}

impl<S: Symmetry, N: EdgeName> Default for EdgeOperator<S, N> {
    fn default() -> Self {
        Self {
            rename: BTreeMap::new(),
            split: BTreeMap::new(),
            reverse: BTreeSet::new(),
            merge: BTreeMap::new(),
            transpose: None,
            apply_parity: false,
            exclude_split: BTreeSet::new(),
            exclude_reverse: BTreeSet::new(),
            exclude_align: BTreeSet::new(),
            exclude_merge: BTreeSet::new(),
            discard: BTreeMap::new(),
            partner_order: BTreeSet::new(),
        }
    }
}

fn collect_names<N: EdgeName>(names: impl IntoIterator<Item = impl Into<N>>) -> Vec<N> {
    names.into_iter().map(Into::into).collect()
}

impl<S: Symmetry, N: EdgeName> EdgeOperator<S, N> {
    /// An operator that does nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rename axes; applied before every other stage.
    #[must_use]
    pub fn rename(mut self, pairs: impl IntoIterator<Item = (impl Into<N>, impl Into<N>)>) -> Self {
        self.rename
            .extend(pairs.into_iter().map(|(a, b)| (a.into(), b.into())));
        self
    }

    /// Split axis `name` into the given axes.
    ///
    /// Only the segments of each new edge are used; the new axes inherit the
    /// arrow of the axis they come from.
    #[must_use]
    pub fn split(
        mut self,
        name: impl Into<N>,
        parts: impl IntoIterator<Item = (impl Into<N>, Edge<S>)>,
    ) -> Self {
        self.split.insert(
            name.into(),
            parts.into_iter().map(|(n, e)| (n.into(), e)).collect(),
        );
        self
    }

    /// Flip the fermi arrow of these axes.
    #[must_use]
    pub fn reverse(mut self, names: impl IntoIterator<Item = impl Into<N>>) -> Self {
        self.reverse.extend(collect_names(names));
        self
    }

    /// Merge `parts` (in this order) into one axis called `name`.
    #[must_use]
    pub fn merge(mut self, name: impl Into<N>, parts: impl IntoIterator<Item = impl Into<N>>) -> Self {
        self.merge.insert(name.into(), collect_names(parts));
        self
    }

    /// Final axis order.
    #[must_use]
    pub fn transpose(mut self, names: impl IntoIterator<Item = impl Into<N>>) -> Self {
        self.transpose = Some(collect_names(names));
        self
    }

    /// Whether split, reverse and merge signs are written into the values.
    #[must_use]
    pub fn apply_parity(mut self, apply: bool) -> Self {
        self.apply_parity = apply;
        self
    }

    /// Split axes whose sign handling is the opposite of `apply_parity`.
    #[must_use]
    pub fn exclude_split(mut self, names: impl IntoIterator<Item = impl Into<N>>) -> Self {
        self.exclude_split.extend(collect_names(names));
        self
    }

    /// Reversed axes whose sign handling is the opposite of `apply_parity`.
    #[must_use]
    pub fn exclude_reverse(mut self, names: impl IntoIterator<Item = impl Into<N>>) -> Self {
        self.exclude_reverse.extend(collect_names(names));
        self
    }

    /// Axes reversed to align arrows before a merge whose sign handling is
    /// the opposite of `apply_parity`.
    #[must_use]
    pub fn exclude_align(mut self, names: impl IntoIterator<Item = impl Into<N>>) -> Self {
        self.exclude_align.extend(collect_names(names));
        self
    }

    /// Merged axes whose sign handling is the opposite of `apply_parity`.
    #[must_use]
    pub fn exclude_merge(mut self, names: impl IntoIterator<Item = impl Into<N>>) -> Self {
        self.exclude_merge.extend(collect_names(names));
        self
    }

    /// Drop segments of `name` before anything else happens to it.
    #[must_use]
    pub(crate) fn discard(mut self, name: N, symmetries: BTreeSet<S>) -> Self {
        if !symmetries.is_empty() {
            self.discard.insert(name, symmetries);
        }
        self
    }

    /// Lay out the merged axis `name` walking sub-edge segments backwards.
    ///
    /// A group whose values are the negation of another group's then lines
    /// up sub-block by sub-block with it.
    #[must_use]
    pub(crate) fn partner_order(mut self, name: N) -> Self {
        self.partner_order.insert(name);
        self
    }

    fn is_rename_only(&self, names: &[N]) -> bool {
        self.split.is_empty()
            && self.merge.is_empty()
            && self.discard.is_empty()
            && (!S::IS_FERMI || self.reverse.is_empty())
            && self.transpose.as_ref().is_none_or(|order| order == names)
    }

    /// Run the operator on `tensor`.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateName` when a stage produces a repeated name,
    /// `NameNotFound` or `InvalidArgument` for a transpose order that does
    /// not match the axes, and `DimensionMismatch` or `IncompatibleSymmetry`
    /// for a split that cannot reproduce the axis it replaces.
    pub fn apply<T: Scalar>(&self, tensor: &Tensor<T, S, N>) -> Result<Tensor<T, S, N>, TensorError> {
        let arena = ScratchArena::for_rank(tensor.rank());

        let names: Vec<N> = tensor
            .names()
            .iter()
            .map(|n| self.rename.get(n).cloned().unwrap_or_else(|| n.clone()))
            .collect();
        let name_to_index = index_names(&names)?;

        if self.is_rename_only(&names) {
            return Tensor::from_shared(names, Arc::clone(tensor.shared_core()));
        }

        let plan = Plan::build(self, &names, &name_to_index, tensor.edges())?;
        let core = plan.execute(tensor.core(), &arena);
        tracing::trace!(
            rank = plan.target.len(),
            blocks = core.blocks().nnzblocks(),
            scratch = arena.bytes_allocated(),
            "edge operator applied"
        );
        Tensor::from_core(plan.target, core)
    }
}

/// One axis just before merging.
#[derive(Debug)]
struct FineAxis<S: Symmetry, N> {
    name: N,
    edge: Edge<S>,
    source: usize,
    /// Odd number of reversals: the fine value is the negated source value.
    flipped: bool,
    /// Reversal signs that reach the values.
    signed_reversals: bool,
}

#[derive(Debug)]
struct MergeGroup<S: Symmetry> {
    /// Fine axis indices in merge order.
    members: Vec<usize>,
    table: FusionTable<S>,
    signed: bool,
}

#[derive(Debug)]
struct Plan<S: Symmetry, N> {
    source_edges: Vec<Edge<S>>,
    split_tables: Vec<(FusionTable<S>, bool)>,
    /// Fine axes of each split source axis, in split order.
    split_members: Vec<Vec<usize>>,
    source_fine: Vec<Option<usize>>,
    fine: Vec<FineAxis<S, N>>,
    /// Fine axes in pre-merge order.
    order: Vec<usize>,
    /// Target axis of each pre-merge position.
    destination: Vec<usize>,
    /// Fine axes that keep their own target axis.
    plain: Vec<bool>,
    groups: Vec<MergeGroup<S>>,
    /// Target axis of each merge group.
    group_target: Vec<usize>,
    target: Vec<N>,
    target_edges: Vec<Edge<S>>,
}

impl<S: Symmetry, N: EdgeName> Plan<S, N> {
    fn build(
        op: &EdgeOperator<S, N>,
        names: &[N],
        name_to_index: &BTreeMap<N, usize>,
        edges: &[Edge<S>],
    ) -> Result<Self, TensorError> {
        let mut source_edges = edges.to_vec();
        for (name, dropped) in &op.discard {
            if let Some(&axis) = name_to_index.get(name) {
                source_edges[axis].retain_segments(|_, s| !dropped.contains(&s));
            }
        }

        for name in op.split.keys() {
            if !name_to_index.contains_key(name) {
                tracing::warn!(name = ?name, "split of missing edge ignored");
            }
        }

        // split
        let mut fine: Vec<FineAxis<S, N>> = Vec::with_capacity(names.len());
        let mut split_tables = Vec::new();
        let mut split_members = Vec::new();
        let mut source_fine = Vec::with_capacity(names.len());
        for (axis, name) in names.iter().enumerate() {
            let edge = &source_edges[axis];
            let Some(parts) = op.split.get(name) else {
                source_fine.push(Some(fine.len()));
                fine.push(FineAxis {
                    name: name.clone(),
                    edge: edge.clone(),
                    source: axis,
                    flipped: false,
                    signed_reversals: false,
                });
                continue;
            };
            let sub_edges: Vec<Edge<S>> = parts
                .iter()
                .map(|(_, e)| Edge::from_sorted(e.segments().to_vec(), edge.arrow()))
                .collect();
            let table = FusionTable::new(&sub_edges, false);
            for &(symmetry, dim) in edge.segments() {
                match table.dimension_of(symmetry) {
                    Some(d) if d == dim => {}
                    Some(d) => {
                        return Err(TensorError::DimensionMismatch {
                            name: format!("{name:?}"),
                            expected: dim,
                            actual: d,
                        });
                    }
                    None => {
                        return Err(TensorError::IncompatibleSymmetry {
                            message: format!(
                                "split of {name:?} cannot produce segment {symmetry:?}"
                            ),
                        });
                    }
                }
            }
            let signed = S::IS_FERMI && (op.apply_parity ^ op.exclude_split.contains(name));
            split_tables.push((table, signed));
            let mut members = Vec::with_capacity(parts.len());
            for ((sub_name, _), sub_edge) in parts.iter().zip(sub_edges) {
                members.push(fine.len());
                fine.push(FineAxis {
                    name: sub_name.clone(),
                    edge: sub_edge,
                    source: axis,
                    flipped: false,
                    signed_reversals: false,
                });
            }
            split_members.push(members);
            source_fine.push(None);
        }
        let fine_names: Vec<N> = fine.iter().map(|f| f.name.clone()).collect();
        let fine_index = index_names(&fine_names)?;

        // reverse
        for name in &op.reverse {
            let Some(&f) = fine_index.get(name) else {
                tracing::warn!(name = ?name, "reverse of missing edge ignored");
                continue;
            };
            if S::IS_FERMI {
                let axis = &mut fine[f];
                axis.edge = axis.edge.reversed();
                axis.flipped ^= true;
                axis.signed_reversals ^= op.apply_parity ^ op.exclude_reverse.contains(name);
            }
        }

        // merge groups, filtered to existing axes
        let mut grouped: BTreeMap<usize, usize> = BTreeMap::new();
        let mut group_names: Vec<N> = Vec::new();
        let mut group_members: Vec<Vec<usize>> = Vec::new();
        let mut dropped_groups: BTreeSet<N> = BTreeSet::new();
        for (merged, parts) in &op.merge {
            let mut members = Vec::with_capacity(parts.len());
            for part in parts {
                let Some(&f) = fine_index.get(part) else {
                    tracing::warn!(name = ?part, merged = ?merged, "merge of missing edge ignored");
                    continue;
                };
                if grouped.insert(f, group_names.len()).is_some() {
                    return Err(TensorError::duplicate_name(part));
                }
                members.push(f);
            }
            if members.is_empty() && !parts.is_empty() {
                dropped_groups.insert(merged.clone());
                continue;
            }
            group_names.push(merged.clone());
            group_members.push(members);
        }
        let group_index: BTreeMap<N, usize> = group_names
            .iter()
            .enumerate()
            .map(|(g, n)| (n.clone(), g))
            .collect();

        // target order
        let target: Vec<N> = match &op.transpose {
            Some(order) => order
                .iter()
                .filter(|n| !dropped_groups.contains(*n))
                .cloned()
                .collect(),
            None => default_order(&fine_names, &grouped, &group_names, &group_members),
        };
        let target_index = index_names(&target)?;
        let expected = fine.len() - grouped.len() + group_names.len();
        for (f, name) in fine_names.iter().enumerate() {
            if !grouped.contains_key(&f) && !target_index.contains_key(name) {
                return Err(TensorError::InvalidArgument {
                    message: format!("transpose order is missing edge {name:?}"),
                });
            }
        }
        for name in &group_names {
            if !target_index.contains_key(name) {
                return Err(TensorError::InvalidArgument {
                    message: format!("transpose order is missing merged edge {name:?}"),
                });
            }
        }
        if target.len() != expected {
            let unknown = target
                .iter()
                .find(|n| {
                    !group_index.contains_key(*n)
                        && fine_index.get(*n).is_none_or(|f| grouped.contains_key(f))
                })
                .cloned();
            return Err(match unknown {
                Some(name) => TensorError::name_not_found(&name),
                None => TensorError::InvalidArgument {
                    message: format!("transpose order has {} edges, expected {expected}", target.len()),
                },
            });
        }

        // pre-merge order and destinations
        let mut order = Vec::with_capacity(fine.len());
        let mut destination = Vec::with_capacity(fine.len());
        let mut group_target = vec![0; group_names.len()];
        for (d, name) in target.iter().enumerate() {
            if let Some(&g) = group_index.get(name) {
                group_target[g] = d;
                for &f in &group_members[g] {
                    order.push(f);
                    destination.push(d);
                }
            } else {
                let f = fine_index[name];
                if grouped.contains_key(&f) {
                    return Err(TensorError::name_not_found(name));
                }
                order.push(f);
                destination.push(d);
            }
        }
        let plain = (0..fine.len()).map(|f| !grouped.contains_key(&f)).collect();

        // align arrows inside each group, then fuse
        let mut groups = Vec::with_capacity(group_names.len());
        for (g, members) in group_members.into_iter().enumerate() {
            if let Some(&first) = members.first() {
                let arrow = fine[first].edge.arrow();
                for &f in &members[1..] {
                    if fine[f].edge.arrow() != arrow {
                        let axis = &mut fine[f];
                        axis.edge = axis.edge.reversed();
                        axis.flipped ^= true;
                        axis.signed_reversals ^=
                            op.apply_parity ^ op.exclude_align.contains(&axis.name);
                    }
                }
            }
            let edges: Vec<Edge<S>> = members.iter().map(|&f| fine[f].edge.clone()).collect();
            let reversed_order = op.partner_order.contains(&group_names[g]);
            let table = FusionTable::new(&edges, reversed_order);
            let signed = S::IS_FERMI && (op.apply_parity ^ op.exclude_merge.contains(&group_names[g]));
            groups.push(MergeGroup {
                members,
                table,
                signed,
            });
        }

        let target_edges = target
            .iter()
            .map(|name| match group_index.get(name) {
                Some(&g) => {
                    let group = &groups[g];
                    let arrow = group
                        .members
                        .first()
                        .is_some_and(|&f| fine[f].edge.arrow());
                    Edge::from_sorted(group.table.merged_segments().to_vec(), arrow)
                }
                None => fine[fine_index[name]].edge.clone(),
            })
            .collect();

        Ok(Self {
            source_edges,
            split_tables,
            split_members,
            source_fine,
            fine,
            order,
            destination,
            plain,
            groups,
            group_target,
            target,
            target_edges,
        })
    }

    fn execute<T: Scalar>(&self, source: &Core<T, S>, arena: &ScratchArena) -> Core<T, S> {
        let skeleton: Core<T, S> = Core::new(self.target_edges.clone(), arena);
        let (edges, blocks, mut data) = skeleton.into_parts();

        let fine_rank = self.fine.len();
        let source_rank = self.source_edges.len();
        let target_rank = self.target.len();
        let pre_edges: Vec<Edge<S>> = self.order.iter().map(|&f| self.fine[f].edge.clone()).collect();

        let values = arena.alloc_filled(fine_rank, S::default());
        let dims = arena.alloc_filled(fine_rank, 0usize);
        let src_strides = arena.alloc_filled(fine_rank, 0usize);
        let dst_strides = arena.alloc_filled(fine_rank, 0usize);
        let source_key = arena.alloc_filled(source_rank, S::default());
        let source_shape = arena.alloc_filled(source_rank, 0usize);
        let source_inner = arena.alloc_filled(fine_rank, 1usize);
        let source_shift = arena.alloc_filled(source_rank, 0usize);
        let target_key = arena.alloc_filled(target_rank, S::default());
        let target_shape = arena.alloc_filled(target_rank, 0usize);
        let target_inner = arena.alloc_filled(fine_rank, 1usize);
        let target_shift = arena.alloc_filled(target_rank, 0usize);
        let mut subs: SmallVec<[S; 8]> = SmallVec::new();
        let source_data = source.data();
        let mut moved = 0usize;

        for_each_conserved(&pre_edges, arena, |positions| {
            for (p, &f) in self.order.iter().enumerate() {
                let (symmetry, dim) = pre_edges[p].segments()[positions[p]];
                values[f] = symmetry;
                dims[f] = dim;
            }

            // source block
            let mut split_index = 0;
            for axis in 0..source_rank {
                match self.source_fine[axis] {
                    Some(f) => {
                        let axis_fine = &self.fine[f];
                        source_key[axis] = if axis_fine.flipped { -values[f] } else { values[f] };
                        source_shift[axis] = 0;
                        source_inner[f] = 1;
                    }
                    None => {
                        let members = &self.split_members[split_index];
                        split_index += 1;
                        subs.clear();
                        subs.extend(members.iter().map(|&f| {
                            if self.fine[f].flipped { -values[f] } else { values[f] }
                        }));
                        let (table, _) = &self.split_tables[split_index - 1];
                        let Some(entry) = table.find(&subs) else {
                            return;
                        };
                        source_key[axis] = entry.merged;
                        source_shift[axis] = entry.offset;
                        for (&f, &stride) in members.iter().zip(&entry.inner_strides()) {
                            source_inner[f] = stride;
                        }
                    }
                }
                let Some(dim) = self.source_edges[axis].dimension_of(source_key[axis]) else {
                    return;
                };
                source_shape[axis] = dim;
            }
            let Some(source_entry) = source.blocks().get(source_key) else {
                return;
            };

            // destination block
            for (p, &f) in self.order.iter().enumerate() {
                if self.plain[f] {
                    let d = self.destination[p];
                    target_key[d] = values[f];
                    target_shape[d] = dims[f];
                    target_shift[d] = 0;
                    target_inner[f] = 1;
                }
            }
            for (group, &d) in self.groups.iter().zip(&self.group_target) {
                subs.clear();
                subs.extend(group.members.iter().map(|&f| values[f]));
                let Some(entry) = group.table.find(&subs) else {
                    return;
                };
                target_key[d] = entry.merged;
                target_shift[d] = entry.offset;
                let Some(dim) = group.table.dimension_of(entry.merged) else {
                    return;
                };
                target_shape[d] = dim;
                for (&f, &stride) in group.members.iter().zip(&entry.inner_strides()) {
                    target_inner[f] = stride;
                }
            }
            let Some(target_entry) = blocks.get(target_key) else {
                return;
            };

            // strides of every fine axis in pre-merge order
            let outer_src = compute_strides(source_shape);
            let outer_dst = compute_strides(target_shape);
            let mut src_offset = source_entry.offset;
            for axis in 0..source_rank {
                src_offset += source_shift[axis] * outer_src[axis];
            }
            let mut dst_offset = target_entry.offset;
            for d in 0..target_rank {
                dst_offset += target_shift[d] * outer_dst[d];
            }
            for (p, &f) in self.order.iter().enumerate() {
                src_strides[p] = outer_src[self.fine[f].source] * source_inner[f];
                dst_strides[p] = outer_dst[self.destination[p]] * target_inner[f];
            }
            let move_dims: SmallVec<[usize; 8]> = self.order.iter().map(|&f| dims[f]).collect();

            let mut ledger = ParityLedger::default();
            if S::IS_FERMI {
                ledger.transposition(&self.order, |f| values[f].parity());
                for (f, axis_fine) in self.fine.iter().enumerate() {
                    if axis_fine.signed_reversals {
                        ledger.reversal(values[f].parity());
                    }
                }
                for (members, (_, signed)) in self.split_members.iter().zip(&self.split_tables) {
                    if *signed {
                        ledger.fusion(members.iter().map(|&f| values[f].parity()));
                    }
                }
                for group in &self.groups {
                    if group.signed {
                        ledger.fusion(group.members.iter().map(|&f| values[f].parity()));
                    }
                }
            }

            let plan = StridedMove {
                dims: &move_dims,
                src_strides: &src_strides[..self.order.len()],
                dst_strides: &dst_strides[..self.order.len()],
                src_offset,
                dst_offset,
            };
            GenericBackend::move_block(&mut data, source_data, &plan, ledger.is_odd());
            moved += 1;
        });

        tracing::trace!(moved, "fine blocks moved");
        Core::from_parts(edges, blocks, data)
    }
}

/// Target order when none is given: a merge group takes the place of the
/// last member in its list; groups without members go first.
fn default_order<N: EdgeName>(
    fine_names: &[N],
    grouped: &BTreeMap<usize, usize>,
    group_names: &[N],
    group_members: &[Vec<usize>],
) -> Vec<N> {
    let mut order = Vec::with_capacity(fine_names.len());
    for (f, name) in fine_names.iter().enumerate().rev() {
        match grouped.get(&f) {
            Some(&g) => {
                if group_members[g].last() == Some(&f) {
                    order.push(group_names[g].clone());
                }
            }
            None => order.push(name.clone()),
        }
    }
    for (name, members) in group_names.iter().zip(group_members) {
        if members.is_empty() {
            order.push(name.clone());
        }
    }
    order.reverse();
    order
}

impl<T: Scalar, S: Symmetry, N: EdgeName> Tensor<T, S, N> {
    /// Apply an [`EdgeOperator`].
    pub fn edge_operator(&self, op: &EdgeOperator<S, N>) -> Result<Self, TensorError> {
        op.apply(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symmetry::{FermiZ2, NoSymmetry, U1};

    fn u1_tensor() -> Tensor<f64, U1> {
        let a = Edge::new([(U1(0), 1), (U1(1), 2)]).unwrap();
        let b = Edge::new([(U1(0), 1), (U1(1), 1)]).unwrap();
        let c = Edge::new([(U1(-2), 1), (U1(-1), 2), (U1(0), 1)]).unwrap();
        let mut t = Tensor::new(["a", "b", "c"], [a, b, c]).unwrap();
        t.range(1.0, 1.0);
        t
    }

    #[test]
    fn test_ledger_transposition() {
        let mut ledger = ParityLedger::default();
        // axes 0 and 2 odd, swapped past each other
        ledger.transposition(&[2, 1, 0], |a| a != 1);
        assert!(ledger.is_odd());
        let mut ledger = ParityLedger::default();
        ledger.transposition(&[1, 0, 2], |a| a != 1);
        assert!(!ledger.is_odd());
    }

    #[test]
    fn test_transpose_no_symmetry() {
        let mut t: Tensor<f64> = Tensor::new(["i", "j"], [Edge::trivial(2), Edge::trivial(3)]).unwrap();
        t.range(0.0, 1.0);
        let r = t.edge_operator(&EdgeOperator::new().transpose(["j", "i"])).unwrap();
        assert_eq!(r.storage(), &[0.0, 3.0, 1.0, 4.0, 2.0, 5.0]);
        assert_eq!(r.edges()[0].dimension(), 3);
    }

    #[test]
    fn test_merge_then_split_restores() {
        let t = u1_tensor();
        let merged = t
            .edge_operator(&EdgeOperator::new().merge("ab", ["a", "b"]))
            .unwrap();
        assert_eq!(merged.names(), &["ab".to_string(), "c".to_string()]);
        assert_eq!(
            merged.edges()[0].segments(),
            &[(U1(0), 1), (U1(1), 3), (U1(2), 2)]
        );
        let split = merged
            .edge_operator(&EdgeOperator::new().split(
                "ab",
                [("a", t.edges()[0].clone()), ("b", t.edges()[1].clone())],
            ))
            .unwrap();
        assert_eq!(split.names(), t.names());
        assert_eq!(split.edges(), t.edges());
        assert_eq!(split.storage(), t.storage());
    }

    #[test]
    fn test_rename_only_shares_core() {
        let t = u1_tensor();
        let r = t
            .edge_operator(&EdgeOperator::new().rename([("a", "x")]))
            .unwrap();
        assert!(r.shares_core_with(&t));
        assert_eq!(r.names()[0], "x");
    }

    #[test]
    fn test_missing_merge_members_drop_group() {
        let t = u1_tensor();
        let r = t
            .edge_operator(&EdgeOperator::new().merge("zz", ["p", "q"]).transpose(["c", "b", "a"]))
            .unwrap();
        assert_eq!(r.names(), &["c".to_string(), "b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_empty_merge_group_is_unit_axis() {
        let t = u1_tensor();
        let parts: [&str; 0] = [];
        let r = t.edge_operator(&EdgeOperator::new().merge("u", parts)).unwrap();
        assert_eq!(r.names()[0], "u");
        assert_eq!(r.edges()[0].segments(), &[(U1(0), 1)]);
        assert_eq!(r.storage(), t.storage());
    }

    #[test]
    fn test_split_dimension_mismatch() {
        let t = u1_tensor();
        let bad = Edge::new([(U1(0), 1), (U1(1), 1)]).unwrap();
        let result = t.edge_operator(&EdgeOperator::new().split("a", [("a1", bad)]));
        assert!(matches!(result, Err(TensorError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_bad_transpose_order() {
        let t = u1_tensor();
        let result = t.edge_operator(&EdgeOperator::new().transpose(["a", "b"]));
        assert!(result.is_err());
        let result = t.edge_operator(&EdgeOperator::new().transpose(["a", "b", "c", "d"]));
        assert!(matches!(result, Err(TensorError::NameNotFound { .. })));
    }

    #[test]
    fn test_fermi_transpose_sign() {
        let edge = Edge::new([(FermiZ2(false), 1), (FermiZ2(true), 1)]).unwrap();
        let mut t: Tensor<f64, FermiZ2> = Tensor::new(["i", "j"], [edge.clone(), edge]).unwrap();
        t.range(1.0, 1.0);
        let r = t.edge_operator(&EdgeOperator::new().transpose(["j", "i"])).unwrap();
        assert_eq!(r.storage(), &[1.0, -2.0]);
    }

    #[test]
    fn test_fermi_reverse_sign_follows_apply_parity() {
        let edge = Edge::new([(FermiZ2(false), 1), (FermiZ2(true), 1)]).unwrap();
        let mut t: Tensor<f64, FermiZ2> = Tensor::new(["i", "j"], [edge.clone(), edge]).unwrap();
        t.range(1.0, 1.0);
        let quiet = t.edge_operator(&EdgeOperator::new().reverse(["i"])).unwrap();
        assert!(quiet.edges()[0].arrow());
        assert_eq!(quiet.storage(), &[1.0, 2.0]);
        let signed = t
            .edge_operator(&EdgeOperator::new().reverse(["i"]).apply_parity(true))
            .unwrap();
        assert_eq!(signed.storage(), &[1.0, -2.0]);
        let excluded = t
            .edge_operator(
                &EdgeOperator::new()
                    .reverse(["i"])
                    .apply_parity(true)
                    .exclude_reverse(["i"]),
            )
            .unwrap();
        assert_eq!(excluded.storage(), &[1.0, 2.0]);
    }

    #[test]
    fn test_no_symmetry_merge_is_reshape() {
        let mut t: Tensor<f64, NoSymmetry> =
            Tensor::new(["i", "j", "k"], [Edge::trivial(2), Edge::trivial(2), Edge::trivial(2)]).unwrap();
        t.range(0.0, 1.0);
        let r = t
            .edge_operator(&EdgeOperator::new().merge("ik", ["i", "k"]).transpose(["ik", "j"]))
            .unwrap();
        // element (i, j, k) lands at ((i, k), j)
        assert_eq!(r.storage(), &[0.0, 2.0, 1.0, 3.0, 4.0, 6.0, 5.0, 7.0]);
    }
}
