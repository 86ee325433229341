//! JSON encoding of instance data (RFC 7951).
//!
//! Top-level members and members whose module differs from their parent's
//! are written as `module:name`. 64-bit integers and decimal64 values are
//! strings, the empty type is `[null]`. Operation metadata is read from RFC
//! 7952 annotations: `"@name": {"<prefix>:operation": "..."}` next to a
//! member, or `"@": {...}` inside an object.

use std::sync::Arc;

use serde_json::{Map, Value as Json};
use yangtree_schema::SchemaNode;
use yangtree_types::{LeafType, NodeKind};

use super::{Element, Format};
use crate::arena::NodeId;
use crate::error::{DataError, DataResult};
use crate::tree::DataTree;

pub(crate) fn parse(payload: &str) -> DataResult<Vec<Element>> {
    let doc: Json = serde_json::from_str(payload).map_err(|e| DataError::codec(Format::Json, e))?;
    match doc {
        Json::Object(map) => members(&map, None),
        _ => Err(DataError::codec(Format::Json, "top-level value must be an object")),
    }
}

fn members(map: &Map<String, Json>, module: Option<&str>) -> DataResult<Vec<Element>> {
    let mut out = Vec::new();
    for (key, value) in map {
        if key.starts_with('@') {
            continue;
        }
        let (module, name) = match key.split_once(':') {
            Some((m, n)) => (Some(m.to_string()), n),
            None => (module.map(str::to_string), key.as_str()),
        };
        let operation = map.get(&format!("@{key}")).and_then(operation_of);

        match value {
            // `[null]` is the encoding of an empty leaf.
            Json::Array(items) if matches!(items.as_slice(), [Json::Null]) => {
                out.push(element(module, name, &Json::Null, operation)?);
            }
            Json::Array(items) => {
                for item in items {
                    out.push(element(module.clone(), name, item, operation.clone())?);
                }
            }
            other => out.push(element(module, name, other, operation)?),
        }
    }
    Ok(out)
}

fn element(module: Option<String>, name: &str, value: &Json, operation: Option<String>) -> DataResult<Element> {
    let mut el = Element {
        module,
        name: name.to_string(),
        operation,
        ..Element::default()
    };
    match value {
        Json::Object(map) => {
            el.children = members(map, el.module.as_deref())?;
            if let Some(op) = map.get("@").and_then(operation_of) {
                el.operation = Some(op);
            }
        }
        Json::String(s) => el.value = Some(s.clone()),
        Json::Number(n) => el.value = Some(n.to_string()),
        Json::Bool(b) => el.value = Some(b.to_string()),
        Json::Null => {}
        Json::Array(_) => {
            return Err(DataError::codec(
                Format::Json,
                format!("nested array in member \"{name}\""),
            ))
        }
    }
    Ok(el)
}

fn operation_of(annotation: &Json) -> Option<String> {
    annotation
        .as_object()?
        .iter()
        .find(|(k, _)| k.rsplit(':').next() == Some("operation"))
        .and_then(|(_, v)| v.as_str())
        .map(str::to_string)
}

// ---------------------------------------------------------------
// Writing
// ---------------------------------------------------------------

pub(crate) fn write(tree: &DataTree, root: NodeId) -> DataResult<String> {
    let doc = Json::Object(object(tree, root));
    serde_json::to_string(&doc).map_err(|e| DataError::codec(Format::Json, e))
}

/// Members of one container, list entry or the document root.
fn object(tree: &DataTree, id: NodeId) -> Map<String, Json> {
    let node = &tree.arena[id];
    let parent_module = node.schema.as_ref().map(|s| s.module());

    // Instances of one schema node form one member, placed where the first
    // instance appears.
    let mut groups: Vec<(Arc<SchemaNode>, Vec<NodeId>)> = Vec::new();
    for &child in &node.children {
        let Some(schema) = tree.arena[child].schema.clone() else {
            continue;
        };
        match groups.iter_mut().find(|(s, _)| Arc::ptr_eq(s, &schema)) {
            Some((_, ids)) => ids.push(child),
            None => groups.push((schema, vec![child])),
        }
    }

    let mut map = Map::new();
    for (schema, ids) in groups {
        let key = if parent_module == Some(schema.module()) {
            schema.name().to_string()
        } else {
            schema.fullname()
        };
        let value = match schema.kind() {
            NodeKind::Container => Json::Object(object(tree, ids[0])),
            NodeKind::List => Json::Array(ids.iter().map(|&i| Json::Object(object(tree, i))).collect()),
            NodeKind::Leaf => scalar(schema.leaf_type(), tree.arena[ids[ids.len() - 1]].value.as_deref()),
            NodeKind::LeafList => Json::Array(
                ids.iter()
                    .map(|&i| scalar(schema.leaf_type(), tree.arena[i].value.as_deref()))
                    .collect(),
            ),
            NodeKind::Anydata => continue,
        };
        map.insert(key, value);
    }
    map
}

fn scalar(ty: Option<&LeafType>, wire: Option<&str>) -> Json {
    let wire = wire.unwrap_or("");
    match ty {
        Some(LeafType::Empty) => Json::Array(vec![Json::Null]),
        Some(LeafType::Boolean) => Json::Bool(wire == "true"),
        Some(t) if t.json_quoted() => Json::String(wire.to_string()),
        Some(t) if t.is_signed() => wire
            .parse::<i64>()
            .map_or_else(|_| Json::String(wire.to_string()), Json::from),
        Some(t) if t.is_unsigned() => wire
            .parse::<u64>()
            .map_or_else(|_| Json::String(wire.to_string()), Json::from),
        _ => Json::String(wire.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn members_inherit_module() {
        let els = parse(r#"{"m:types": {"str1": "a", "collection": [{"x": "k1"}, {"x": "k2"}]}}"#).unwrap();
        assert_eq!(els.len(), 1);
        let types = &els[0];
        assert_eq!(types.module.as_deref(), Some("m"));
        assert_eq!(types.children.len(), 3);
        assert_eq!(types.children[0].module.as_deref(), Some("m"));
        assert_eq!(types.children[0].value.as_deref(), Some("a"));
        assert_eq!(types.children[2].children[0].value.as_deref(), Some("k2"));
    }

    #[test]
    fn scalars_and_empty_marker() {
        let els = parse(r#"{"m:t": {"n": 5, "b": true, "e": [null], "d": "1.5", "ll": [1, 2]}}"#).unwrap();
        let values: Vec<_> = els[0].children.iter().map(|e| e.value.as_deref()).collect();
        assert_eq!(values, vec![Some("5"), Some("true"), None, Some("1.5"), Some("1"), Some("2")]);
    }

    #[test]
    fn operation_annotations() {
        let els = parse(
            r#"{"m:t": {
                "str1": "x",
                "@str1": {"ietf-netconf:operation": "remove"},
                "l": [{"@": {"nc:operation": "replace"}, "k": "a"}]
            }}"#,
        )
        .unwrap();
        let children = &els[0].children;
        assert_eq!(children[0].operation.as_deref(), Some("remove"));
        assert_eq!(children[1].operation.as_deref(), Some("replace"));
        assert_eq!(children[1].children.len(), 1);
    }

    #[test]
    fn rejects_non_objects() {
        assert!(matches!(parse("[1]"), Err(DataError::Codec { .. })));
        assert!(matches!(parse("{"), Err(DataError::Codec { .. })));
        assert!(parse(r#"{"m:a": [[1]]}"#).is_err());
    }

    #[test]
    fn scalar_encoding() {
        assert_eq!(scalar(Some(&LeafType::Int64), Some("5")), Json::String("5".into()));
        assert_eq!(scalar(Some(&LeafType::Int8), Some("-5")), Json::from(-5));
        assert_eq!(scalar(Some(&LeafType::Uint32), Some("7")), Json::from(7u64));
        assert_eq!(scalar(Some(&LeafType::Empty), Some("")), serde_json::json!([null]));
        assert_eq!(scalar(Some(&LeafType::Boolean), Some("false")), Json::Bool(false));
    }
}
