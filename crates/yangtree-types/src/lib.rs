//! Foundation types for yangtree.
//!
//! This crate provides the value, type and addressing vocabulary shared by
//! the schema, data and diff crates. Every other yangtree crate depends on
//! `yangtree-types`.
//!
//! # Key Types
//!
//! - [`Value`] -- Native leaf value (integer, boolean, decimal, string, empty marker)
//! - [`LeafType`] -- Declared type of a leaf, drives validation and decoding
//! - [`NodeKind`] -- Container / list / leaf / leaf-list classification
//! - [`PathExpr`] -- Parsed path expression (`/mod:a/b[k='v']/*`)
//! - [`encode`] / [`decode`] -- Conversion between native values and wire strings

pub mod error;
pub mod kind;
pub mod path;
pub mod value;

pub use error::{Result, TypeError};
pub use kind::{LeafType, NodeKind};
pub use path::{is_quotable, quote_literal, PathExpr, Predicate, Step, StepName};
pub use value::{decode, encode, Value};
