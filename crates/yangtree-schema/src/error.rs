use std::io;
use std::path::PathBuf;

use yangtree_types::TypeError;

/// Errors produced by the schema context.
///
/// Variants built by the context carry a message that already includes
/// every diagnostic drained from the context queue.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// No compiled module with this name exists on the search path.
    #[error("{message}")]
    ModuleNotFound { name: String, message: String },

    /// A compiled module failed to parse or is internally inconsistent.
    #[error("{message}")]
    InvalidModule { name: String, message: String },

    /// A schema path expression matched no schema node.
    #[error("{message}")]
    PathNotFound { path: String, message: String },

    /// A search directory does not exist or is not a directory.
    #[error("cannot set search dir {0:?}")]
    InvalidSearchDir(PathBuf),

    /// Malformed path expression.
    #[error(transparent)]
    Type(#[from] TypeError),

    /// I/O error while reading a module file.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Convenience alias used throughout the schema crate.
pub type Result<T> = std::result::Result<T, SchemaError>;
