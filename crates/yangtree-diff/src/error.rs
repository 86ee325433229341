//! Error types for the diff crate.

use std::fmt;

/// Which operand of a diff an error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    A,
    B,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::A => f.write_str("A"),
            Side::B => f.write_str("B"),
        }
    }
}

/// Errors that can occur when diffing trees.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// A tree is bound to a different schema context than the differ.
    #[error("tree {side} belongs to a different schema context")]
    ContextMismatch { side: Side },

    /// A tree has never been populated.
    #[error("tree {side} does not have any data, unable to diff")]
    EmptyTree { side: Side },
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
