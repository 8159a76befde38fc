//! Storage types for tensor data.
//!
//! ```text
//! Core<T, S>
//! ├── edges   - one Edge per axis
//! ├── blocks  - BlockOffsets, sorted by BlockKey
//! └── data    - every block back to back, row-major inside a block
//! ```

pub mod blocksparse;

pub use blocksparse::{BlockKey, Core};
