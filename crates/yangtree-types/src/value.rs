//! Native leaf values and the value codec.
//!
//! Data trees store every leaf as its canonical wire string. [`encode`] turns
//! a caller's [`Value`] into that string form and [`decode`] turns a stored
//! string back into a typed [`Value`] according to the declared leaf type.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TypeError};
use crate::kind::{LeafType, NodeKind};

/// A native value held by (or written to) a leaf.
///
/// Signed and unsigned integers are separate variants so the full `uint64`
/// range survives, but they compare equal when they denote the same number:
/// `Value::Int(5) == Value::Uint(5)`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Decimal(f64),
    String(String),
    /// No value: the empty type, or "create the node" for inner nodes.
    Empty,
}

impl Value {
    /// The string form of the value, `None` for [`Value::Empty`].
    pub fn as_wire(&self) -> Option<String> {
        encode(self)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Uint(n) => i64::try_from(*n).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Uint(n) => Some(*n),
            Value::Int(n) => u64::try_from(*n).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Uint(a), Value::Uint(b)) => a == b,
            (Value::Int(a), Value::Uint(b)) | (Value::Uint(b), Value::Int(a)) => {
                u64::try_from(*a).map_or(false, |a| a == *b)
            }
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Empty, Value::Empty) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Uint(n) => write!(f, "{n}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::String(s) => f.write_str(s),
            Value::Empty => Ok(()),
        }
    }
}

macro_rules! value_from {
    ($variant:ident as $target:ty: $($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::$variant(v as $target)
            }
        })*
    };
}

value_from!(Int as i64: i8, i16, i32, i64);
value_from!(Uint as u64: u8, u16, u32, u64);
value_from!(Decimal as f64: f32, f64);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Empty
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Empty, Into::into)
    }
}

/// Encode a native value as a wire string.
///
/// Booleans become `"true"`/`"false"`; [`Value::Empty`] becomes `None`, a
/// marker distinct from the empty string; everything else uses its string
/// form.
pub fn encode(value: &Value) -> Option<String> {
    match value {
        Value::Bool(true) => Some("true".into()),
        Value::Bool(false) => Some("false".into()),
        Value::Empty => None,
        other => Some(other.to_string()),
    }
}

/// Decode a stored wire string into a native value.
///
/// `leaf_type` is consulted for leaves and leaf-lists only. Containers and
/// lists decode to the presence marker `Bool(true)`; the empty type always
/// decodes to `Bool(true)` whatever the payload. Any other node kind is an
/// error.
pub fn decode(kind: NodeKind, leaf_type: Option<&LeafType>, wire: &str) -> Result<Value> {
    match kind {
        NodeKind::Container | NodeKind::List => Ok(Value::Bool(true)),
        NodeKind::Leaf | NodeKind::LeafList => {
            let Some(ty) = leaf_type else {
                return Ok(Value::String(wire.to_string()));
            };
            let bad = |reason: &str| TypeError::InvalidValue {
                ty: ty.name().to_string(),
                value: wire.to_string(),
                reason: reason.to_string(),
            };
            match ty {
                t if t.is_signed() => wire
                    .trim()
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|_| bad("not an integer")),
                t if t.is_unsigned() => wire
                    .trim()
                    .parse::<u64>()
                    .map(Value::Uint)
                    .map_err(|_| bad("not an unsigned integer")),
                LeafType::Boolean => Ok(Value::Bool(wire == "true")),
                LeafType::Decimal64 { .. } => wire
                    .trim()
                    .parse::<f64>()
                    .map(Value::Decimal)
                    .map_err(|_| bad("not a decimal number")),
                LeafType::Empty => Ok(Value::Bool(true)),
                _ => Ok(Value::String(wire.to_string())),
            }
        }
        other => Err(TypeError::UnsupportedKind(other.to_string())),
    }
}
