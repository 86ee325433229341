//! Structural diff between yangtree data trees.
//!
//! Compares two [`DataTree`](yangtree_data::DataTree)s of the same schema
//! context leaf by leaf. List entries and leaf-list members are matched by
//! identity (key tuple or value), never by position, so reordering alone
//! produces no changes.
//!
//! # Key Types
//!
//! - [`Differ`] -- Compares trees bound to one schema context
//! - [`DataDiff`] -- Change set, iterated up to its terminator
//! - [`DiffRecord`] / [`ChangeKind`] -- One created/modified/removed leaf

pub mod change;
pub mod differ;
pub mod error;

pub use change::{ChangeKind, DataDiff, DiffRecord};
pub use differ::Differ;
pub use error::{DiffError, DiffResult, Side};
