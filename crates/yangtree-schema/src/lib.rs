//! Schema context for yangtree.
//!
//! A [`SchemaContext`] owns the set of compiled modules that data trees are
//! validated against. Modules come either from compiled module files
//! (`<name>.yang.json`) found on the search path or directly from a
//! [`ModuleDef`] built in code. Once loaded, every [`SchemaNode`] is
//! immutable and shared through `Arc`, so one context can back any number
//! of data trees.
//!
//! # Key Types
//!
//! - [`SchemaContext`] -- Module registry, schema path lookup, diagnostics queue
//! - [`Module`] / [`SchemaNode`] -- Compiled schema tree
//! - [`ModuleDef`] / [`NodeDef`] -- Serializable module description
//! - [`ContextConfig`] -- Search path and logging configuration
//! - [`DiagnosticSink`] -- Injected receiver for diagnostic records

pub mod config;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod module;

pub use config::{resolve_search_dirs, split_search_path, ContextConfig};
pub use context::{Modules, SchemaContext};
pub use diagnostics::{Diagnostic, DiagnosticSink, Level, MemorySink, TracingSink};
pub use error::{Result, SchemaError};
pub use module::{Module, ModuleDef, NodeDef, SchemaNode};
