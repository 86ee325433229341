//! Merging partial documents into a tree.
//!
//! The payload is parsed into a separate tree under the same schema context
//! and then merged into the target: nodes in the payload overwrite or extend
//! the target, nodes absent from it are left alone. Per-element `operation`
//! metadata refines this:
//!
//! - `remove`: the matching target node is deleted.
//! - `replace`: the matching target node (every entry, for a list) is
//!   deleted before the payload copy is merged in.
//! - `merge`: the default.
//!
//! A failed merge leaves the target exactly as it was.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;
use yangtree_types::NodeKind;

use crate::arena::{Node, NodeId};
use crate::codec::{self, Format};
use crate::error::{DataError, DataResult};
use crate::tree::DataTree;

/// Options for [`DataTree::merge`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeOptions {
    /// Reject payload elements unknown to the schema instead of skipping them.
    pub strict: bool,
    /// Skip validation of the merged result.
    pub trusted: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            strict: true,
            trusted: false,
        }
    }
}

impl MergeOptions {
    pub fn trusted() -> Self {
        Self {
            trusted: true,
            ..Self::default()
        }
    }

    pub fn lax() -> Self {
        Self {
            strict: false,
            ..Self::default()
        }
    }
}

/// Per-element merge operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MergeOp {
    #[default]
    Merge,
    Replace,
    Remove,
}

impl FromStr for MergeOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "merge" => Ok(MergeOp::Merge),
            "replace" => Ok(MergeOp::Replace),
            "remove" | "delete" => Ok(MergeOp::Remove),
            other => Err(format!("unsupported operation \"{other}\"")),
        }
    }
}

impl fmt::Display for MergeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeOp::Merge => f.write_str("merge"),
            MergeOp::Replace => f.write_str("replace"),
            MergeOp::Remove => f.write_str("remove"),
        }
    }
}

impl DataTree {
    /// Merge a partial document into this tree.
    ///
    /// Works on EMPTY and populated trees alike. Unless `options.trusted`,
    /// the merged tree is validated and the merge fails if it is invalid.
    /// On any failure the tree is rolled back.
    pub fn merge(&mut self, payload: &str, format: Format, options: MergeOptions) -> DataResult<()> {
        let elements =
            codec::parse(self.context(), payload, format).map_err(|e| DataError::Merge(e.to_string()))?;

        let mut incoming = DataTree::new(self.context().clone());
        let incoming_root = incoming.ensure_root();
        let mut ops = HashMap::new();
        incoming
            .ingest(incoming_root, &elements, options.strict, &mut ops)
            .map_err(|e| DataError::Merge(e.to_string()))?;

        let snapshot = (self.arena.clone(), self.root);
        let target = self.ensure_root();
        let result = self
            .merge_children(target, &incoming, incoming_root, &ops)
            .and_then(|()| if options.trusted { Ok(()) } else { self.validate() });
        if let Err(e) = result {
            (self.arena, self.root) = snapshot;
            return Err(DataError::Merge(e.to_string()));
        }

        debug!(
            %format,
            incoming = incoming.len(),
            operations = ops.len(),
            nodes = self.len(),
            "merged payload"
        );
        Ok(())
    }

    fn merge_children(
        &mut self,
        target: NodeId,
        src: &DataTree,
        src_parent: NodeId,
        ops: &HashMap<NodeId, MergeOp>,
    ) -> DataResult<()> {
        let children = &src.arena[src_parent].children;

        // Deletions first, so a replaced list is emptied before any of the
        // payload's entries are merged back in.
        for &child in children {
            let op = ops.get(&child).copied().unwrap_or_default();
            if op == MergeOp::Merge {
                continue;
            }
            let Some(schema) = src.arena[child].schema.as_deref() else {
                continue;
            };
            let doomed: Vec<NodeId> = if op == MergeOp::Replace && schema.kind() == NodeKind::List {
                self.arena[target]
                    .children
                    .iter()
                    .copied()
                    .filter(|&c| self.arena[c].is_instance_of(schema))
                    .collect()
            } else {
                self.find_same(target, src, child).into_iter().collect()
            };
            for id in doomed {
                if self.is_key_leaf(id) {
                    return Err(DataError::path(
                        self.node_path(id),
                        None,
                        format!("cannot {op} a list key"),
                    ));
                }
                debug!(path = %self.node_path(id), %op, "removing");
                self.arena.remove(id);
            }
        }

        for &child in children {
            if ops.get(&child) == Some(&MergeOp::Remove) {
                continue;
            }
            let node = &src.arena[child];
            let Some(schema) = node.schema.clone() else {
                continue;
            };
            let id = match schema.kind() {
                NodeKind::Anydata => continue,
                NodeKind::Container => match self.find_child(target, &schema) {
                    Some(id) => id,
                    None => self.arena.append(target, Node::new(schema.clone(), None)),
                },
                NodeKind::List => {
                    let keys = src.entry_keys(child);
                    match self.find_list_entry(target, &schema, &keys) {
                        Some(id) => id,
                        None => self.create_list_entry(target, &schema, &keys),
                    }
                }
                NodeKind::Leaf => match self.find_child(target, &schema) {
                    Some(id) => {
                        self.arena[id].value = node.value.clone();
                        id
                    }
                    None => self.arena.append(target, Node::new(schema.clone(), node.value.clone())),
                },
                NodeKind::LeafList => {
                    let value = node.value.clone().unwrap_or_default();
                    match self.find_member(target, &schema, &value) {
                        Some(id) => id,
                        None => self.arena.append(target, Node::new(schema.clone(), Some(value))),
                    }
                }
            };
            if schema.kind().is_inner() {
                self.merge_children(id, src, child, ops)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{context, p};
    use yangtree_types::Value;

    const NS: &str = "http://brewerslabng.mellon-collie.net/yang/minimal-integrationtest";

    fn loaded(payload: &str) -> DataTree {
        let mut t = DataTree::new(context());
        t.loads(payload, Format::Json).unwrap();
        t
    }

    fn values(t: &DataTree, path: &str) -> Vec<Value> {
        t.get(path).unwrap().into_iter().map(|n| n.into_value()).collect()
    }

    #[test]
    fn merge_is_not_destructive() {
        let mut t = loaded(r#"{"minimal-integrationtest:types":{"str1":"one"}}"#);
        t.merge(
            r#"{"minimal-integrationtest:types":{"str2":"two"}}"#,
            Format::Json,
            MergeOptions::default(),
        )
        .unwrap();
        assert_eq!(values(&t, &p("types/str1")), vec![Value::from("one")]);
        assert_eq!(values(&t, &p("types/str2")), vec![Value::from("two")]);
    }

    #[test]
    fn merge_overwrites_and_extends() {
        let mut t = loaded(r#"{"minimal-integrationtest:types":{"str1":"one","simplecollection":["a"]}}"#);
        let patch = format!(
            r#"<types xmlns="{NS}"><str1>uno</str1><simplecollection>a</simplecollection><simplecollection>b</simplecollection></types>"#
        );
        t.merge(&patch, Format::Xml, MergeOptions::default()).unwrap();
        assert_eq!(values(&t, &p("types/str1")), vec![Value::from("uno")]);
        assert_eq!(
            values(&t, &p("types/simplecollection")),
            vec![Value::from("a"), Value::from("b")]
        );
    }

    #[test]
    fn merge_into_empty_tree() {
        let mut t = DataTree::new(context());
        t.merge(
            r#"{"minimal-integrationtest:simpleleaf":"hello"}"#,
            Format::Json,
            MergeOptions::default(),
        )
        .unwrap();
        assert!(!t.is_empty());
        assert_eq!(values(&t, &p("simpleleaf")), vec![Value::from("hello")]);
    }

    #[test]
    fn strict_merge_rejects_unknown_and_rolls_back() {
        let mut t = loaded(r#"{"minimal-integrationtest:types":{"str1":"one"}}"#);
        let before = t.dumps(Format::Json).unwrap();

        let err = t
            .merge(
                r#"{"minimal-integrationtest:types":{"str2":"two","bogus":"x"}}"#,
                Format::Json,
                MergeOptions::default(),
            )
            .unwrap_err();
        assert!(matches!(err, DataError::Merge(_)));
        assert!(err.to_string().contains("unknown element"), "{err}");
        assert_eq!(t.dumps(Format::Json).unwrap(), before);
        assert_eq!(t.context().pending_diagnostics(), 0);
    }

    #[test]
    fn lax_merge_skips_unknown() {
        let mut t = loaded(r#"{"minimal-integrationtest:types":{"str1":"one"}}"#);
        t.merge(
            r#"{"minimal-integrationtest:types":{"str2":"two","bogus":"x"}}"#,
            Format::Json,
            MergeOptions::lax(),
        )
        .unwrap();
        assert_eq!(t.count(&p("types/*")).unwrap(), 2);
    }

    #[test]
    fn remove_operation() {
        let mut t = loaded(r#"{"minimal-integrationtest:types":{"str1":"one","str2":"two"}}"#);
        let patch = format!(
            r#"<types xmlns="{NS}" xmlns:nc="urn:ietf:params:xml:ns:netconf:base:1.0"><str1 nc:operation="remove"/></types>"#
        );
        t.merge(&patch, Format::Xml, MergeOptions::default()).unwrap();
        assert_eq!(t.count(&p("types/str1")).unwrap(), 0);
        assert_eq!(values(&t, &p("types/str2")), vec![Value::from("two")]);
    }

    #[test]
    fn replace_operation_on_list() {
        let mut t = loaded(r#"{"minimal-integrationtest:types":{"collection":[{"x":"a"},{"x":"b","y":"old"}]}}"#);
        t.merge(
            r#"{"minimal-integrationtest:types":{"collection":[{"@":{"ietf-netconf:operation":"replace"},"x":"c"}]}}"#,
            Format::Json,
            MergeOptions::default(),
        )
        .unwrap();
        assert_eq!(t.paths(&p("types/collection")).unwrap(), vec![p("types/collection[x='c']")]);
    }

    #[test]
    fn replace_operation_on_container() {
        let mut t = DataTree::new(context());
        t.set(&p("nesting/bronze/silver/gold/platinum/deep"), "d").unwrap();
        t.set(&p("nesting/bronze/silver/gold/platinum/deep2"), "d2").unwrap();
        t.merge(
            r#"{"minimal-integrationtest:nesting":{"bronze":{"silver":{"gold":{
                "platinum":{"deep":"new"},
                "@platinum":{"nc:operation":"replace"}
            }}}}}"#,
            Format::Json,
            MergeOptions::default(),
        )
        .unwrap();
        assert_eq!(values(&t, &p("nesting/bronze/silver/gold/platinum/deep")), vec![Value::from("new")]);
        assert_eq!(t.count(&p("nesting/bronze/silver/gold/platinum/deep2")).unwrap(), 0);
    }

    #[test]
    fn invalid_result_rolls_back_unless_trusted() {
        let mut t = loaded(r#"{"minimal-integrationtest:types":{"str1":"one"}}"#);
        let before = t.dumps(Format::Json).unwrap();
        let patch = r#"{"minimal-integrationtest:validator":{"mandatories":{}}}"#;

        let err = t.merge(patch, Format::Json, MergeOptions::default()).unwrap_err().to_string();
        assert!(err.contains("missing-element"), "{err}");
        assert!(err.contains("too-few-elements"), "{err}");
        assert_eq!(t.dumps(Format::Json).unwrap(), before);

        t.merge(patch, Format::Json, MergeOptions::trusted()).unwrap();
        assert_eq!(t.count(&p("validator/mandatories")).unwrap(), 1);
        assert!(t.validate().is_err());
    }

    #[test]
    fn removing_a_key_fails() {
        let mut t = loaded(r#"{"minimal-integrationtest:types":{"collection":[{"x":"a","y":"1"}]}}"#);
        let before = t.dumps(Format::Json).unwrap();
        let patch = r#"{"minimal-integrationtest:types":{"collection":[{"x":"a","@x":{"nc:operation":"remove"}}]}}"#;
        assert!(t.merge(patch, Format::Json, MergeOptions::default()).is_err());
        assert_eq!(t.dumps(Format::Json).unwrap(), before);
    }

    #[test]
    fn malformed_payloads() {
        let mut t = DataTree::new(context());
        assert!(matches!(
            t.merge("{", Format::Json, MergeOptions::default()),
            Err(DataError::Merge(_))
        ));
        let bad_op = r#"{"minimal-integrationtest:simpleleaf":"x","@simpleleaf":{"nc:operation":"explode"}}"#;
        let err = t.merge(bad_op, Format::Json, MergeOptions::default()).unwrap_err();
        assert!(err.to_string().contains("unsupported operation"), "{err}");
        assert!(t.is_empty());
    }

    #[test]
    fn merge_op_parsing() {
        assert_eq!("remove".parse::<MergeOp>().unwrap(), MergeOp::Remove);
        assert_eq!("delete".parse::<MergeOp>().unwrap(), MergeOp::Remove);
        assert_eq!("replace".parse::<MergeOp>().unwrap(), MergeOp::Replace);
        assert_eq!(MergeOp::default(), MergeOp::Merge);
        assert!("create".parse::<MergeOp>().is_err());
        let opts = MergeOptions::default();
        assert!(opts.strict && !opts.trusted);
    }
}
