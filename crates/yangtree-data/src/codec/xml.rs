//! XML encoding of instance data.
//!
//! Element namespaces select the module; an element without one inherits
//! its parent's. The writer puts `xmlns` on top-level elements and wherever
//! the module changes. An `operation` attribute in any namespace is read as
//! merge metadata.

use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::{NsReader, Writer};
use yangtree_schema::SchemaContext;
use yangtree_types::NodeKind;

use super::{Element, Format};
use crate::arena::NodeId;
use crate::error::{DataError, DataResult};
use crate::tree::DataTree;

fn xml_error(e: impl ToString) -> DataError {
    DataError::codec(Format::Xml, e)
}

pub(crate) fn parse(ctx: &SchemaContext, payload: &str) -> DataResult<Vec<Element>> {
    let mut reader = NsReader::from_str(payload);

    let mut open: Vec<Element> = Vec::new();
    let mut top: Vec<Element> = Vec::new();
    loop {
        let (ns, event) = reader.read_resolved_event().map_err(xml_error)?;
        match event {
            Event::Start(e) => open.push(start(ctx, &ns, &e)?),
            Event::Empty(e) => {
                let el = start(ctx, &ns, &e)?;
                close(&mut open, &mut top, el);
            }
            Event::End(_) => {
                let el = open.pop().ok_or_else(|| xml_error("unbalanced end tag"))?;
                close(&mut open, &mut top, el);
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(xml_error)?;
                push_text(&mut open, &text)?;
            }
            Event::CData(c) => {
                let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                push_text(&mut open, &text)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }
    if let Some(el) = open.last() {
        return Err(xml_error(format!("element <{}> is not closed", el.name)));
    }
    Ok(top)
}

fn start(ctx: &SchemaContext, ns: &ResolveResult<'_>, e: &BytesStart<'_>) -> DataResult<Element> {
    let name = std::str::from_utf8(e.local_name().as_ref())
        .map_err(xml_error)?
        .to_string();
    let module = match ns {
        ResolveResult::Bound(Namespace(uri)) => {
            let uri = std::str::from_utf8(uri).map_err(xml_error)?;
            Some(
                ctx.module_by_namespace(uri)
                    .map_or_else(|| uri.to_string(), |m| m.name().to_string()),
            )
        }
        _ => None,
    };

    let mut operation = None;
    for attr in e.attributes() {
        let attr = attr.map_err(xml_error)?;
        if attr.key.local_name().as_ref() == b"operation" {
            operation = Some(attr.unescape_value().map_err(xml_error)?.into_owned());
        }
    }

    Ok(Element {
        module,
        name,
        operation,
        ..Element::default()
    })
}

/// Whitespace between child elements is layout, not content. Leaf text
/// is kept exactly as written.
fn close(open: &mut [Element], top: &mut Vec<Element>, mut el: Element) {
    if !el.children.is_empty() && el.value.as_deref().map_or(false, |v| v.trim().is_empty()) {
        el.value = None;
    }
    match open.last_mut() {
        Some(parent) => parent.children.push(el),
        None => top.push(el),
    }
}

fn push_text(open: &mut [Element], text: &str) -> DataResult<()> {
    match open.last_mut() {
        Some(el) => {
            el.value.get_or_insert_with(String::new).push_str(text);
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(xml_error("text outside of any element")),
    }
}

// ---------------------------------------------------------------
// Writing
// ---------------------------------------------------------------

pub(crate) fn write(tree: &DataTree, root: NodeId) -> DataResult<String> {
    let mut writer = Writer::new(Vec::new());
    for &child in &tree.arena[root].children {
        element(&mut writer, tree, child, None)?;
    }
    String::from_utf8(writer.into_inner()).map_err(xml_error)
}

fn element(writer: &mut Writer<Vec<u8>>, tree: &DataTree, id: NodeId, parent_module: Option<&str>) -> DataResult<()> {
    let node = &tree.arena[id];
    let Some(schema) = &node.schema else {
        return Ok(());
    };
    if schema.kind() == NodeKind::Anydata {
        return Ok(());
    }

    let mut start = BytesStart::new(schema.name());
    if parent_module != Some(schema.module()) {
        if let Some(module) = tree.context().implemented_module(schema.module()) {
            start.push_attribute(("xmlns", module.namespace()));
        }
    }

    let text = node.value.as_deref().filter(|v| !v.is_empty());
    if node.children.is_empty() && text.is_none() {
        return writer.write_event(Event::Empty(start)).map_err(xml_error);
    }
    writer.write_event(Event::Start(start.borrow())).map_err(xml_error)?;
    if let Some(text) = text {
        writer.write_event(Event::Text(BytesText::new(text))).map_err(xml_error)?;
    }
    for &child in &node.children {
        element(writer, tree, child, Some(schema.module()))?;
    }
    writer.write_event(Event::End(start.to_end())).map_err(xml_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use yangtree_schema::{ContextConfig, ModuleDef, NodeDef};
    use yangtree_types::LeafType;

    fn ctx() -> SchemaContext {
        let mut ctx = SchemaContext::new(ContextConfig::isolated(""));
        let mut def = ModuleDef::new("m", vec![NodeDef::container("c", vec![NodeDef::leaf("l", LeafType::String)])]);
        def.namespace = Some("urn:test:m".into());
        ctx.add_module(def).unwrap();
        ctx
    }

    #[test]
    fn namespaces_resolve_to_modules() {
        let ctx = ctx();
        let els = parse(&ctx, r#"<c xmlns="urn:test:m"><l>a &amp; b</l></c>"#).unwrap();
        assert_eq!(els.len(), 1);
        assert_eq!(els[0].module.as_deref(), Some("m"));
        assert_eq!(els[0].children[0].module.as_deref(), Some("m"));
        assert_eq!(els[0].children[0].value.as_deref(), Some("a & b"));
    }

    #[test]
    fn prefixed_elements_and_operation_attribute() {
        let ctx = ctx();
        let els = parse(
            &ctx,
            r#"<x:c xmlns:x="urn:test:m" xmlns:nc="urn:ietf:params:xml:ns:netconf:base:1.0">
                 <x:l nc:operation="remove"/>
               </x:c>"#,
        )
        .unwrap();
        let l = &els[0].children[0];
        assert_eq!(l.module.as_deref(), Some("m"));
        assert_eq!(l.operation.as_deref(), Some("remove"));
        assert!(l.value.is_none());
    }

    #[test]
    fn unknown_namespace_kept_verbatim() {
        let ctx = ctx();
        let els = parse(&ctx, r#"<c xmlns="urn:other"/><d/>"#).unwrap();
        assert_eq!(els[0].module.as_deref(), Some("urn:other"));
        assert!(els[1].module.is_none());
    }

    #[test]
    fn leaf_whitespace_kept_layout_dropped() {
        let ctx = ctx();
        let els = parse(
            &ctx,
            "<c xmlns=\"urn:test:m\">\n  <l>  padded value </l>\n  <l>   </l>\n  <l/>\n</c>\n",
        )
        .unwrap();
        let c = &els[0];
        assert!(c.value.is_none());
        let values: Vec<Option<&str>> = c.children.iter().map(|l| l.value.as_deref()).collect();
        assert_eq!(values, vec![Some("  padded value "), Some("   "), None]);
    }

    #[test]
    fn malformed_documents_rejected() {
        let ctx = ctx();
        assert!(parse(&ctx, "<c xmlns=\"urn:test:m\"><l>").is_err());
        assert!(parse(&ctx, "<c></d>").is_err());
        assert!(parse(&ctx, "stray text").is_err());
    }
}
