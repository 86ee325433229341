use thiserror::Error;

/// Errors produced by value and path handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    /// A wire string does not satisfy the declared leaf type.
    #[error("invalid {ty} value {value:?}: {reason}")]
    InvalidValue {
        ty: String,
        value: String,
        reason: String,
    },

    /// A path expression could not be parsed.
    #[error("invalid path expression {path:?} at offset {offset}: {reason}")]
    InvalidPath {
        path: String,
        offset: usize,
        reason: String,
    },

    /// The node kind carries no decodable value.
    #[error("cannot decode a value for {0} nodes")]
    UnsupportedKind(String),
}

/// Convenience alias used throughout the types crate.
pub type Result<T> = std::result::Result<T, TypeError>;
