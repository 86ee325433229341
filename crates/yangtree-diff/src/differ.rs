//! Leaf-level comparison of two data trees.
//!
//! Every leaf and leaf-list member is identified by its resolved path. List
//! entries contribute their key predicates to that path and leaf-list members
//! their value predicate, so two trees with the same entries and members
//! in a different order produce identical path sets. Containers and list
//! entries are never reported on their own.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use yangtree_data::{DataNode, DataTree};
use yangtree_schema::SchemaContext;

use crate::change::{DataDiff, DiffRecord};
use crate::error::{DiffError, DiffResult, Side};

/// Compares data trees bound to one schema context.
#[derive(Clone, Debug)]
pub struct Differ {
    ctx: Arc<SchemaContext>,
}

/// A leaf position: resolved path and node.
type Position<'t> = (String, DataNode<'t>);

impl Differ {
    pub fn new(ctx: Arc<SchemaContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &Arc<SchemaContext> {
        &self.ctx
    }

    /// Diff tree `a` (old) against tree `b` (new).
    ///
    /// Both trees must belong to this differ's context and be populated.
    pub fn diff(&self, a: &DataTree, b: &DataTree) -> DiffResult<DataDiff> {
        self.check(a, Side::A)?;
        self.check(b, Side::B)?;

        let old = positions(a);
        let new = positions(b);
        let old_index: HashMap<&str, usize> = index(&old);
        let new_index: HashMap<&str, usize> = index(&new);

        let mut modified = Vec::new();
        let mut removed = Vec::new();
        for (path, node) in &old {
            match new_index.get(path.as_str()) {
                Some(&i) => {
                    let other = &new[i].1;
                    if node.wire_value() != other.wire_value() {
                        modified.push(DiffRecord::modified(
                            path.clone(),
                            node.value().clone(),
                            other.value().clone(),
                        ));
                    }
                }
                None => removed.push(DiffRecord::removed(path.clone(), node.value().clone())),
            }
        }
        let created: Vec<DiffRecord> = new
            .iter()
            .filter(|(path, _)| !old_index.contains_key(path.as_str()))
            .map(|(path, node)| DiffRecord::created(path.clone(), node.value().clone()))
            .collect();

        debug!(
            modified = modified.len(),
            removed = removed.len(),
            created = created.len(),
            "diffed trees"
        );
        Ok(DataDiff::from_records(
            modified.into_iter().chain(removed).chain(created),
        ))
    }

    fn check(&self, tree: &DataTree, side: Side) -> DiffResult<()> {
        if !Arc::ptr_eq(tree.context(), &self.ctx) {
            return Err(DiffError::ContextMismatch { side });
        }
        if tree.is_empty() {
            return Err(DiffError::EmptyTree { side });
        }
        Ok(())
    }
}

/// Leaf and leaf-list positions in document order.
fn positions(tree: &DataTree) -> Vec<Position<'_>> {
    tree.walk()
        .into_iter()
        .filter(|n| n.kind().map_or(false, |k| k.is_terminal()))
        .map(|n| (n.path(), n))
        .collect()
}

fn index<'a>(positions: &'a [Position<'_>]) -> HashMap<&'a str, usize> {
    positions
        .iter()
        .enumerate()
        .map(|(i, (path, _))| (path.as_str(), i))
        .collect()
}
