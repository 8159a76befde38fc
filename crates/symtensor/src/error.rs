//! Error types for symtensor.

use thiserror::Error;

/// Errors that can occur in tensor operations.
///
/// Names and symmetry values are carried as their `Debug` rendering so the
/// error type stays independent of the tensor's generic parameters.
#[derive(Debug, Error)]
pub enum TensorError {
    /// An axis name appears more than once.
    #[error("duplicate edge name {name}")]
    DuplicateName { name: String },

    /// Number of names differs from the number of edges.
    #[error("name count mismatch: {names} names for {edges} edges")]
    NameCountMismatch { names: usize, edges: usize },

    /// A required axis name is not present on the tensor.
    #[error("edge name {name} not found")]
    NameNotFound { name: String },

    /// An edge lists the same symmetry value twice.
    #[error("duplicate segment {symmetry} in edge")]
    DuplicateSegment { symmetry: String },

    /// Two fermionic axes paired for contraction or trace point the same way.
    #[error("edges {first} and {second} have the same fermi arrow")]
    SameArrowPair { first: String, second: String },

    /// Paired segments (or a reshaped segment) disagree on dimension.
    #[error("dimension mismatch on {name}: expected {expected}, got {actual}")]
    DimensionMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// Requested segments cannot be reconciled with an existing edge.
    #[error("incompatible symmetry: {message}")]
    IncompatibleSymmetry { message: String },

    /// Index out of bounds.
    #[error("index out of bounds: index {index} is out of range for dimension {dim_size}")]
    IndexOutOfBounds { index: usize, dim_size: usize },

    /// A symmetry value is not a segment of the edge.
    #[error("symmetry {symmetry} not present on edge {name}")]
    SymmetryNotFound { name: String, symmetry: String },

    /// Wrong number of coordinates provided.
    #[error("wrong number of indices: expected {expected}, got {actual}")]
    WrongNumberOfIndices { expected: usize, actual: usize },

    /// Matrix must be square.
    #[error("matrix must be square: got {rows}x{cols}")]
    NotSquareMatrix { rows: usize, cols: usize },

    /// Two edges that must be identical differ.
    #[error("edge {name} differs between operands")]
    EdgeMismatch { name: String },

    /// Malformed argument that fits no other category.
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// SVD computation error.
    #[error("SVD error: {message}")]
    SvdError { message: String },

    /// Linear solve failed (singular or non-finite system).
    #[error("linear solve error: {message}")]
    LinearSolveError { message: String },
}

/// Coarse classification of [`TensorError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid input; the operation was aborted.
    Structural,
    /// A dense numeric primitive failed; retrying with other input may help.
    External,
}

impl TensorError {
    /// Which side of the error taxonomy this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TensorError::SvdError { .. } | TensorError::LinearSolveError { .. } => {
                ErrorKind::External
            }
            _ => ErrorKind::Structural,
        }
    }

    pub(crate) fn name_not_found(name: &impl std::fmt::Debug) -> Self {
        TensorError::NameNotFound {
            name: format!("{name:?}"),
        }
    }

    pub(crate) fn duplicate_name(name: &impl std::fmt::Debug) -> Self {
        TensorError::DuplicateName {
            name: format!("{name:?}"),
        }
    }
}
