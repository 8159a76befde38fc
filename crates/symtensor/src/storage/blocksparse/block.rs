//! Block keys: one symmetry value per axis.

use smallvec::SmallVec;

use crate::symmetry::Symmetry;

/// Identifies one block of a tensor by the segment symmetry on each axis.
///
/// Uses `SmallVec<[S; 8]>` so that keys of tensors up to rank 8 stay on the
/// stack.
///
/// # Example
/// ```
/// use symtensor::U1;
/// use symtensor::storage::blocksparse::BlockKey;
///
/// let key = BlockKey::new(&[U1(1), U1(-1)]);
/// assert_eq!(key.rank(), 2);
/// assert_eq!(key[1], U1(-1));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockKey<S: Symmetry> {
    symmetries: SmallVec<[S; 8]>,
}

impl<S: Symmetry> BlockKey<S> {
    /// Create a key from a slice of symmetries.
    pub fn new(symmetries: &[S]) -> Self {
        Self {
            symmetries: symmetries.iter().copied().collect(),
        }
    }

    /// Create a key by collecting symmetries from an iterator.
    pub fn collect_from<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            symmetries: iter.into_iter().collect(),
        }
    }

    /// Number of axes.
    #[inline]
    pub fn rank(&self) -> usize {
        self.symmetries.len()
    }

    /// The symmetries as a slice.
    #[inline]
    pub fn symmetries(&self) -> &[S] {
        &self.symmetries
    }

    /// Key with reordered axes: entry `i` of the result is entry `perm[i]`.
    pub fn permute(&self, perm: &[usize]) -> Self {
        debug_assert_eq!(perm.len(), self.rank());
        Self {
            symmetries: perm.iter().map(|&i| self.symmetries[i]).collect(),
        }
    }

    /// Total fermionic parity of the key.
    pub fn parity(&self) -> bool {
        self.symmetries.iter().fold(false, |p, s| p ^ s.parity())
    }
}

impl<S: Symmetry> std::ops::Index<usize> for BlockKey<S> {
    type Output = S;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.symmetries[index]
    }
}

impl<S: Symmetry> std::fmt::Display for BlockKey<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Block(")?;
        for (i, s) in self.symmetries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:?}", s)?;
        }
        write!(f, ")")
    }
}
