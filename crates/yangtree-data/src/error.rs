//! Error types for data trees.

use std::io;

use yangtree_schema::SchemaError;
use yangtree_types::TypeError;

use crate::codec::Format;

/// Errors that can occur while building, querying or serializing a tree.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// A path/value combination does not resolve against the schema, or a
    /// path does not resolve to exactly one target where one is required.
    #[error("invalid path {path} (value {value}): {reason}")]
    Path {
        path: String,
        value: String,
        reason: String,
    },

    /// A merge payload failed to parse, apply or validate. The tree is left
    /// as it was before the merge.
    #[error("merge failed: {0}")]
    Merge(String),

    /// Whole-tree validation failed.
    #[error("{0}")]
    Validation(String),

    /// The operation is not allowed in the tree's current state.
    #[error("{0}")]
    State(String),

    /// A payload is not well-formed in the given format.
    #[error("{format} codec error: {reason}")]
    Codec { format: Format, reason: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl DataError {
    pub(crate) fn path(path: impl Into<String>, value: Option<&str>, reason: impl Into<String>) -> Self {
        DataError::Path {
            path: path.into(),
            value: match value {
                Some(v) => format!("{v:?}"),
                None => "none".to_string(),
            },
            reason: reason.into(),
        }
    }

    pub(crate) fn codec(format: Format, reason: impl ToString) -> Self {
        DataError::Codec {
            format,
            reason: reason.to_string(),
        }
    }
}

/// Convenience alias for data tree results.
pub type DataResult<T> = Result<T, DataError>;
