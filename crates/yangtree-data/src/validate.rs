//! Whole-tree validation.

use std::collections::HashSet;
use std::sync::Arc;

use yangtree_schema::{Level, SchemaNode};
use yangtree_types::NodeKind;

use crate::arena::NodeId;
use crate::error::{DataError, DataResult};
use crate::tree::DataTree;

pub const TAG_MISSING_ELEMENT: &str = "missing-element";
pub const TAG_TOO_FEW_ELEMENTS: &str = "too-few-elements";
pub const TAG_INVALID_VALUE: &str = "invalid-value";
pub const TAG_NOT_UNIQUE: &str = "data-not-unique";

struct Problem {
    path: String,
    message: String,
    tag: &'static str,
}

impl DataTree {
    /// Check the tree against its schema.
    ///
    /// Covers leaf types, list key presence and uniqueness, leaf-list
    /// uniqueness, mandatory leaves and list `min-elements`. Mandatory
    /// descendants are required through absent non-presence containers.
    /// Every failure is recorded on the schema context and reported in one
    /// [`DataError::Validation`]. An EMPTY tree is valid.
    pub fn validate(&self) -> DataResult<()> {
        let Some(root) = self.root else {
            return Ok(());
        };
        let mut problems = Vec::new();
        self.check_node(root, &mut problems);
        if problems.is_empty() {
            return Ok(());
        }

        let ctx = self.context();
        for p in &problems {
            ctx.record(Level::Error, &p.message, Some(&p.path), Some(p.tag));
        }
        Err(DataError::Validation(ctx.error_message("validation failed")))
    }

    fn check_node(&self, id: NodeId, problems: &mut Vec<Problem>) {
        let node = &self.arena[id];
        let path = self.node_path(id);

        let required: Vec<Arc<SchemaNode>> = match &node.schema {
            Some(schema) => schema.children().to_vec(),
            // Top level: the modules that have data in this tree.
            None => {
                let mut modules: Vec<&str> = Vec::new();
                for &c in &node.children {
                    if let Some(s) = &self.arena[c].schema {
                        if !modules.contains(&s.module()) {
                            modules.push(s.module());
                        }
                    }
                }
                modules
                    .iter()
                    .filter_map(|m| self.context().implemented_module(m))
                    .flat_map(|m| m.nodes().to_vec())
                    .collect()
            }
        };
        self.check_required(id, &path, &required, problems);

        let mut seen: HashSet<(*const SchemaNode, Vec<String>)> = HashSet::new();
        for &child in &node.children {
            let child_node = &self.arena[child];
            let Some(schema) = &child_node.schema else {
                continue;
            };
            let identity = match schema.kind() {
                NodeKind::Leaf | NodeKind::LeafList => {
                    if let Some(ty) = schema.leaf_type() {
                        if let Err(e) = ty.canonicalize(child_node.value.as_deref()) {
                            problems.push(Problem {
                                path: self.node_path(child),
                                message: e.to_string(),
                                tag: TAG_INVALID_VALUE,
                            });
                        }
                    }
                    (schema.kind() == NodeKind::LeafList)
                        .then(|| vec![child_node.value.clone().unwrap_or_default()])
                }
                NodeKind::List => {
                    for key in schema.keys() {
                        if self.key_value(child, key).is_none() {
                            problems.push(Problem {
                                path: format!("{}/{key}", self.node_path(child)),
                                message: format!("list entry is missing key \"{key}\""),
                                tag: TAG_MISSING_ELEMENT,
                            });
                        }
                    }
                    Some(self.entry_keys(child))
                }
                _ => None,
            };
            if let Some(identity) = identity {
                if !seen.insert((Arc::as_ptr(schema), identity)) {
                    problems.push(Problem {
                        path: self.node_path(child),
                        message: format!("duplicate instance of {} \"{}\"", schema.kind(), schema.name()),
                        tag: TAG_NOT_UNIQUE,
                    });
                }
            }
            if schema.kind().is_inner() {
                self.check_node(child, problems);
            }
        }
    }

    /// Mandatory leaves and `min-elements` of the schema children of an
    /// existing node (or of an absent non-presence container below it).
    fn check_required(&self, id: NodeId, path: &str, schema_children: &[Arc<SchemaNode>], problems: &mut Vec<Problem>) {
        for schema in schema_children {
            let count = self.arena[id]
                .children
                .iter()
                .filter(|&&c| self.arena[c].is_instance_of(schema))
                .count();
            let child_path = child_path(path, schema);
            match schema.kind() {
                NodeKind::Leaf if schema.is_mandatory() && count == 0 => problems.push(Problem {
                    path: child_path,
                    message: "missing required element".to_string(),
                    tag: TAG_MISSING_ELEMENT,
                }),
                NodeKind::List | NodeKind::LeafList if (count as u64) < u64::from(schema.min_elements()) => {
                    problems.push(Problem {
                        path: child_path,
                        message: format!("too few elements: {count} < {}", schema.min_elements()),
                        tag: TAG_TOO_FEW_ELEMENTS,
                    })
                }
                NodeKind::Container if !schema.is_presence() && count == 0 => {
                    self.check_absent(&child_path, schema, problems);
                }
                _ => {}
            }
        }
    }

    /// Requirements that an absent non-presence container passes on from
    /// its own descendants.
    fn check_absent(&self, path: &str, schema: &SchemaNode, problems: &mut Vec<Problem>) {
        for child in schema.children() {
            let child_path = child_path(path, child);
            match child.kind() {
                NodeKind::Leaf if child.is_mandatory() => problems.push(Problem {
                    path: child_path,
                    message: "missing required element".to_string(),
                    tag: TAG_MISSING_ELEMENT,
                }),
                NodeKind::List | NodeKind::LeafList if child.min_elements() > 0 => problems.push(Problem {
                    path: child_path,
                    message: format!("too few elements: 0 < {}", child.min_elements()),
                    tag: TAG_TOO_FEW_ELEMENTS,
                }),
                NodeKind::Container if !child.is_presence() => self.check_absent(&child_path, child, problems),
                _ => {}
            }
        }
    }
}

fn child_path(parent: &str, schema: &SchemaNode) -> String {
    if parent == "/" {
        format!("/{}", schema.fullname())
    } else {
        format!("{parent}/{}", schema.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Node;
    use crate::testutil::{context, p};
    use yangtree_schema::{ContextConfig, ModuleDef, NodeDef, SchemaContext};
    use yangtree_types::LeafType;

    fn first(t: &DataTree, path: &str) -> NodeId {
        t.get(path).unwrap()[0].id()
    }

    #[test]
    fn empty_and_complete_trees_are_valid() {
        let mut t = DataTree::new(context());
        t.validate().unwrap();

        t.set(&p("types/str1"), "x").unwrap();
        t.set(&p("validator/mandatories/this-is-mandatory"), "here").unwrap();
        t.set(&p("validator/required-entries[id='1']"), ()).unwrap();
        t.validate().unwrap();
    }

    #[test]
    fn missing_mandatory_and_too_few_elements() {
        let mut t = DataTree::new(context());
        t.set(&p("validator/mandatories"), ()).unwrap();

        let err = t.validate().unwrap_err();
        assert!(matches!(err, DataError::Validation(_)));
        let msg = err.to_string();
        assert!(
            msg.contains("/minimal-integrationtest:validator/mandatories/this-is-mandatory"),
            "{msg}"
        );
        assert!(msg.contains(TAG_MISSING_ELEMENT), "{msg}");
        assert!(msg.contains("/minimal-integrationtest:validator/required-entries"), "{msg}");
        assert!(msg.contains(TAG_TOO_FEW_ELEMENTS), "{msg}");
        assert_eq!(t.context().pending_diagnostics(), 0);
    }

    #[test]
    fn absent_presence_container_requires_nothing() {
        let mut t = DataTree::new(context());
        t.set(&p("simpleleaf"), "x").unwrap();
        t.validate().unwrap();
    }

    #[test]
    fn requirements_pass_through_absent_containers() {
        let mut ctx = SchemaContext::new(ContextConfig::isolated(""));
        ctx.add_module(ModuleDef::new(
            "v",
            vec![
                NodeDef::leaf("other", LeafType::String),
                NodeDef::container(
                    "outer",
                    vec![NodeDef::container(
                        "inner",
                        vec![NodeDef::leaf("must", LeafType::String).mandatory()],
                    )],
                ),
            ],
        ))
        .unwrap();
        let mut t = DataTree::new(Arc::new(ctx));
        t.set("/v:other", "x").unwrap();

        let msg = t.validate().unwrap_err().to_string();
        assert!(msg.contains("/v:outer/inner/must"), "{msg}");

        t.set("/v:outer/inner/must", "y").unwrap();
        t.validate().unwrap();
    }

    #[test]
    fn invalid_stored_value() {
        let mut t = DataTree::new(context());
        t.set(&p("types/int_8"), 5).unwrap();
        let id = first(&t, &p("types/int_8"));
        t.arena[id].value = Some("999".to_string());

        let msg = t.validate().unwrap_err().to_string();
        assert!(msg.contains(TAG_INVALID_VALUE), "{msg}");
    }

    #[test]
    fn duplicates_are_reported() {
        let mut t = DataTree::new(context());
        t.set(&p("types/collection[x='a']/y"), "1").unwrap();
        t.set(&p("types/simplecollection[.='m']"), ()).unwrap();
        let types = first(&t, &p("types"));
        let entry = first(&t, &p("types/collection"));
        let member = first(&t, &p("types/simplecollection"));

        let list = t.arena[entry].schema.clone().unwrap();
        t.create_list_entry(types, &list, &["a".to_string()]);
        let leaf_list = t.arena[member].schema.clone().unwrap();
        t.arena.append(types, Node::new(leaf_list, Some("m".to_string())));

        let msg = t.validate().unwrap_err().to_string();
        assert_eq!(msg.matches(TAG_NOT_UNIQUE).count(), 2, "{msg}");
    }
}
