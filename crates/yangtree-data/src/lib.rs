//! Schema-validated instance-data trees for yangtree.
//!
//! A [`DataTree`] holds configuration or state data for the modules of one
//! [`SchemaContext`](yangtree_schema::SchemaContext). Nodes are addressed by
//! path expressions (`/module:a/b[key='v']/*`), created incrementally with
//! [`DataTree::set`], loaded and dumped as XML or JSON, and merged from
//! partial documents.
//!
//! # Key Types
//!
//! - [`DataTree`] -- Arena-backed tree with set/get/delete/merge/load/dump
//! - [`DataNode`] -- Borrowed view of one node with its decoded value
//! - [`Format`] -- XML or JSON payload selector
//! - [`MergeOptions`] -- Strict and trusted flags for merges

pub mod arena;
pub mod codec;
pub mod error;
pub mod merge;
pub mod node;
pub mod tree;
pub mod validate;

pub use arena::NodeId;
pub use codec::Format;
pub use error::{DataError, DataResult};
pub use merge::{MergeOp, MergeOptions};
pub use node::DataNode;
pub use tree::DataTree;
