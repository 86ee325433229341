//! Schema node kinds and declared leaf types.
//!
//! [`LeafType::canonicalize`] is the single place where a wire string is
//! checked against its declared type. The canonical form it returns is what
//! data trees store, so two leaves compare equal exactly when their
//! canonical strings do.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TypeError};

/// Classification of a schema element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Container,
    List,
    Leaf,
    LeafList,
    /// Opaque data; present in compiled modules but never materialized.
    Anydata,
}

impl NodeKind {
    /// Leaves and leaf-lists hold a scalar and never have children.
    pub fn is_terminal(self) -> bool {
        matches!(self, NodeKind::Leaf | NodeKind::LeafList)
    }

    /// Containers and lists group children and carry no value.
    pub fn is_inner(self) -> bool {
        matches!(self, NodeKind::Container | NodeKind::List)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Container => "container",
            NodeKind::List => "list",
            NodeKind::Leaf => "leaf",
            NodeKind::LeafList => "leaf-list",
            NodeKind::Anydata => "anydata",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared type of a leaf or leaf-list.
///
/// Serialized externally tagged in kebab-case, so a compiled module writes
/// `"uint8"`, `{"enumeration": ["up", "down"]}` or
/// `{"decimal64": {"fraction-digits": 3}}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LeafType {
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Boolean,
    Decimal64 {
        #[serde(rename = "fraction-digits")]
        fraction_digits: u8,
    },
    Empty,
    String,
    Enumeration(Vec<String>),
}

impl LeafType {
    /// The YANG name of the type.
    pub fn name(&self) -> &'static str {
        match self {
            LeafType::Int8 => "int8",
            LeafType::Int16 => "int16",
            LeafType::Int32 => "int32",
            LeafType::Int64 => "int64",
            LeafType::Uint8 => "uint8",
            LeafType::Uint16 => "uint16",
            LeafType::Uint32 => "uint32",
            LeafType::Uint64 => "uint64",
            LeafType::Boolean => "boolean",
            LeafType::Decimal64 { .. } => "decimal64",
            LeafType::Empty => "empty",
            LeafType::String => "string",
            LeafType::Enumeration(_) => "enumeration",
        }
    }

    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            LeafType::Int8 | LeafType::Int16 | LeafType::Int32 | LeafType::Int64
        )
    }

    pub fn is_unsigned(&self) -> bool {
        matches!(
            self,
            LeafType::Uint8 | LeafType::Uint16 | LeafType::Uint32 | LeafType::Uint64
        )
    }

    pub fn is_integer(&self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    /// Types whose JSON encoding is a quoted string rather than a number
    /// (64-bit integers and decimal64, RFC 7951 section 6.1).
    pub fn json_quoted(&self) -> bool {
        matches!(
            self,
            LeafType::Int64 | LeafType::Uint64 | LeafType::Decimal64 { .. }
        )
    }

    /// Validate `raw` against this type and return its canonical form.
    ///
    /// A missing value (`None`) is accepted only by `empty` and `string`,
    /// where it means the empty string.
    pub fn canonicalize(&self, raw: Option<&str>) -> Result<String> {
        let Some(raw) = raw else {
            return match self {
                LeafType::Empty | LeafType::String => Ok(String::new()),
                _ => Err(self.invalid("", "a value is required")),
            };
        };

        match self {
            LeafType::Int8 => self.signed(raw, i8::MIN as i64, i8::MAX as i64),
            LeafType::Int16 => self.signed(raw, i16::MIN as i64, i16::MAX as i64),
            LeafType::Int32 => self.signed(raw, i32::MIN as i64, i32::MAX as i64),
            LeafType::Int64 => self.signed(raw, i64::MIN, i64::MAX),
            LeafType::Uint8 => self.unsigned(raw, u8::MAX as u64),
            LeafType::Uint16 => self.unsigned(raw, u16::MAX as u64),
            LeafType::Uint32 => self.unsigned(raw, u32::MAX as u64),
            LeafType::Uint64 => self.unsigned(raw, u64::MAX),
            LeafType::Boolean => match raw.trim() {
                "true" => Ok("true".into()),
                "false" => Ok("false".into()),
                _ => Err(self.invalid(raw, "expected \"true\" or \"false\"")),
            },
            LeafType::Decimal64 { fraction_digits } => self.decimal(raw, *fraction_digits),
            LeafType::Empty => {
                if raw.is_empty() {
                    Ok(String::new())
                } else {
                    Err(self.invalid(raw, "empty leaves carry no value"))
                }
            }
            LeafType::String => Ok(raw.to_string()),
            LeafType::Enumeration(names) => {
                if names.iter().any(|n| n == raw) {
                    Ok(raw.to_string())
                } else {
                    Err(self.invalid(raw, &format!("expected one of {}", names.join(", "))))
                }
            }
        }
    }

    fn signed(&self, raw: &str, min: i64, max: i64) -> Result<String> {
        let text = raw.trim().trim_start_matches('+');
        let n: i64 = text
            .parse()
            .map_err(|_| self.invalid(raw, "not an integer"))?;
        if n < min || n > max {
            return Err(self.invalid(raw, &format!("out of range {min}..{max}")));
        }
        Ok(n.to_string())
    }

    fn unsigned(&self, raw: &str, max: u64) -> Result<String> {
        let text = raw.trim().trim_start_matches('+');
        let n: u64 = text
            .parse()
            .map_err(|_| self.invalid(raw, "not an unsigned integer"))?;
        if n > max {
            return Err(self.invalid(raw, &format!("out of range 0..{max}")));
        }
        Ok(n.to_string())
    }

    fn decimal(&self, raw: &str, fraction_digits: u8) -> Result<String> {
        let text = raw.trim();
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };
        let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
        let well_formed = !int_part.is_empty()
            && int_part.bytes().all(|b| b.is_ascii_digit())
            && frac_part.bytes().all(|b| b.is_ascii_digit());
        if !well_formed {
            return Err(self.invalid(raw, "not a decimal number"));
        }

        let frac = frac_part.trim_end_matches('0');
        if frac.len() > fraction_digits as usize {
            return Err(self.invalid(
                raw,
                &format!("more than {fraction_digits} fraction digits"),
            ));
        }
        // 18 significant digits fit a decimal64 regardless of fraction-digits.
        let int = int_part.trim_start_matches('0');
        if int.len() + fraction_digits as usize > 18 {
            return Err(self.invalid(raw, "out of decimal64 range"));
        }

        let int = if int.is_empty() { "0" } else { int };
        let frac = if frac.is_empty() { "0" } else { frac };
        let sign = if negative && (int != "0" || frac != "0") { "-" } else { "" };
        Ok(format!("{sign}{int}.{frac}"))
    }

    fn invalid(&self, value: &str, reason: &str) -> TypeError {
        TypeError::InvalidValue {
            ty: self.name().to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for LeafType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_ranges_enforced() {
        assert_eq!(LeafType::Int8.canonicalize(Some("-128")).unwrap(), "-128");
        assert!(LeafType::Int8.canonicalize(Some("128")).is_err());
        assert_eq!(LeafType::Uint8.canonicalize(Some("255")).unwrap(), "255");
        assert!(LeafType::Uint8.canonicalize(Some("-1")).is_err());
        assert!(LeafType::Uint16.canonicalize(Some("65536")).is_err());
        assert_eq!(
            LeafType::Uint64.canonicalize(Some("18446744073709551615")).unwrap(),
            "18446744073709551615"
        );
    }

    #[test]
    fn integers_are_canonicalized() {
        assert_eq!(LeafType::Int32.canonicalize(Some("+0042")).unwrap(), "42");
        assert!(LeafType::Int32.canonicalize(Some("4.2")).is_err());
        assert!(LeafType::Int32.canonicalize(None).is_err());
    }

    #[test]
    fn boolean_literals() {
        assert_eq!(LeafType::Boolean.canonicalize(Some("true")).unwrap(), "true");
        assert!(LeafType::Boolean.canonicalize(Some("True")).is_err());
    }

    #[test]
    fn decimal64_canonical_form() {
        let ty = LeafType::Decimal64 { fraction_digits: 3 };
        assert_eq!(ty.canonicalize(Some("4.442")).unwrap(), "4.442");
        assert_eq!(ty.canonicalize(Some("4")).unwrap(), "4.0");
        assert_eq!(ty.canonicalize(Some("004.4400")).unwrap(), "4.44");
        assert_eq!(ty.canonicalize(Some("-0.000")).unwrap(), "0.0");
        assert!(ty.canonicalize(Some("4.4421")).is_err());
        assert!(ty.canonicalize(Some("abc")).is_err());
        assert!(ty.canonicalize(Some(".5")).is_err());
    }

    #[test]
    fn empty_and_string_accept_missing_value() {
        assert_eq!(LeafType::Empty.canonicalize(None).unwrap(), "");
        assert_eq!(LeafType::Empty.canonicalize(Some("")).unwrap(), "");
        assert!(LeafType::Empty.canonicalize(Some("x")).is_err());
        assert_eq!(LeafType::String.canonicalize(None).unwrap(), "");
    }

    #[test]
    fn enumeration_membership() {
        let ty = LeafType::Enumeration(vec!["up".into(), "down".into()]);
        assert!(ty.canonicalize(Some("up")).is_ok());
        let err = ty.canonicalize(Some("sideways")).unwrap_err();
        assert!(err.to_string().contains("up, down"));
    }

    #[test]
    fn serde_representation() {
        let ty: LeafType = serde_json::from_str(r#""uint8""#).unwrap();
        assert_eq!(ty, LeafType::Uint8);
        let ty: LeafType =
            serde_json::from_str(r#"{"decimal64": {"fraction-digits": 2}}"#).unwrap();
        assert_eq!(ty, LeafType::Decimal64 { fraction_digits: 2 });
        let ty: LeafType = serde_json::from_str(r#"{"enumeration": ["a"]}"#).unwrap();
        assert_eq!(ty, LeafType::Enumeration(vec!["a".into()]));
    }

    #[test]
    fn node_kind_classification() {
        assert!(NodeKind::LeafList.is_terminal());
        assert!(NodeKind::List.is_inner());
        assert!(!NodeKind::Anydata.is_inner() && !NodeKind::Anydata.is_terminal());
        assert_eq!(NodeKind::LeafList.to_string(), "leaf-list");
    }
}
