//! Serialization boundary.
//!
//! Payloads are parsed into a schema-free [`Element`] tree first; the data
//! tree then binds elements to schema nodes. Writing goes the other way,
//! directly from the tree.

pub(crate) mod json;
pub(crate) mod xml;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use yangtree_schema::SchemaContext;

use crate::arena::NodeId;
use crate::error::DataResult;
use crate::tree::DataTree;

/// Payload format, given explicitly on every load, dump and merge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Xml,
    Json,
}

impl Format {
    /// Guess a format from a file extension (`.xml` or `.json`).
    pub fn from_extension(path: impl AsRef<Path>) -> Option<Format> {
        match path.as_ref().extension()?.to_str()? {
            "xml" => Some(Format::Xml),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Xml => f.write_str("xml"),
            Format::Json => f.write_str("json"),
        }
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xml" => Ok(Format::Xml),
            "json" => Ok(Format::Json),
            other => Err(format!("unknown format {other:?}, expected xml or json")),
        }
    }
}

/// A parsed payload element before schema binding.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Element {
    /// Module name, or the raw namespace when no loaded module declares it.
    /// `None` inherits the parent's module.
    pub module: Option<String>,
    pub name: String,
    /// Text content; `None` when the element has no text at all.
    pub value: Option<String>,
    pub children: Vec<Element>,
    /// Value of an `operation` annotation, if present.
    pub operation: Option<String>,
}

pub(crate) fn parse(ctx: &SchemaContext, payload: &str, format: Format) -> DataResult<Vec<Element>> {
    match format {
        Format::Xml => xml::parse(ctx, payload),
        Format::Json => json::parse(payload),
    }
}

pub(crate) fn write(tree: &DataTree, root: NodeId, format: Format) -> DataResult<String> {
    match format {
        Format::Xml => xml::write(tree, root),
        Format::Json => json::write(tree, root),
    }
}
