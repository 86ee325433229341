//! Path expressions.
//!
//! The supported grammar is a small subset of XPath:
//!
//! ```text
//! path      := ("/" step)+
//! step      := "*" | [prefix ":"] name predicate*
//! predicate := "[" (name | ".") "=" quoted "]"
//! quoted    := "'" chars "'" | '"' chars '"'
//! ```
//!
//! `[key='v']` selects a list entry by key, `[.='v']` a leaf-list member by
//! value and `*` any child at that position.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TypeError};

/// A parsed, absolute path expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathExpr {
    pub steps: Vec<Step>,
}

/// One `/`-separated step of a path expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Step {
    /// Module prefix, when written as `module:name`.
    pub prefix: Option<String>,
    pub name: StepName,
    pub predicates: Vec<Predicate>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepName {
    Named(String),
    Wildcard,
}

/// An equality predicate attached to a step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Predicate {
    /// `[key='value']` on a list step.
    Key { name: String, value: String },
    /// `[.='value']` on a leaf-list step.
    Value(String),
}

impl Step {
    /// A named step without prefix or predicates.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            prefix: None,
            name: StepName::Named(name.into()),
            predicates: Vec::new(),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self.name, StepName::Wildcard)
    }

    /// The element name, `None` for a wildcard.
    pub fn name(&self) -> Option<&str> {
        match &self.name {
            StepName::Named(n) => Some(n),
            StepName::Wildcard => None,
        }
    }

    /// Key predicates in written order.
    pub fn keys(&self) -> impl Iterator<Item = (&str, &str)> {
        self.predicates.iter().filter_map(|p| match p {
            Predicate::Key { name, value } => Some((name.as_str(), value.as_str())),
            Predicate::Value(_) => None,
        })
    }

    /// The `[.='v']` predicate value, if any.
    pub fn value_predicate(&self) -> Option<&str> {
        self.predicates.iter().find_map(|p| match p {
            Predicate::Value(v) => Some(v.as_str()),
            Predicate::Key { .. } => None,
        })
    }
}

impl PathExpr {
    pub fn parse(input: &str) -> Result<Self> {
        Parser::new(input).parse()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Module named by the first step.
    pub fn module(&self) -> Option<&str> {
        self.steps.first().and_then(|s| s.prefix.as_deref())
    }

    pub fn has_wildcard(&self) -> bool {
        self.steps.iter().any(Step::is_wildcard)
    }
}

impl FromStr for PathExpr {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Key { name, value } => write!(f, "[{name}={}]", quote_literal(value)),
            Predicate::Value(value) => write!(f, "[.={}]", quote_literal(value)),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, "{prefix}:")?;
        }
        match &self.name {
            StepName::Named(n) => f.write_str(n)?,
            StepName::Wildcard => f.write_str("*")?,
        }
        for p in &self.predicates {
            write!(f, "{p}")?;
        }
        Ok(())
    }
}

impl fmt::Display for PathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            write!(f, "/{step}")?;
        }
        Ok(())
    }
}

/// Whether `value` can be written as a predicate literal. Literals have no
/// escapes, so a value holding both quote characters cannot.
pub fn is_quotable(value: &str) -> bool {
    !(value.contains('\'') && value.contains('"'))
}

/// Quote a predicate literal, preferring single quotes.
///
/// The result only parses back when [`is_quotable`] holds for `value`.
pub fn quote_literal(value: &str) -> String {
    if value.contains('\'') {
        format!("\"{value}\"")
    } else {
        format!("'{value}'")
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn parse(mut self) -> Result<PathExpr> {
        let mut steps = Vec::new();
        self.skip_ws();
        if self.peek().is_none() {
            return Err(self.error("empty path"));
        }
        while self.peek().is_some() {
            if !self.eat('/') {
                return Err(self.error("expected '/'"));
            }
            steps.push(self.step()?);
            self.skip_ws();
        }
        Ok(PathExpr { steps })
    }

    fn step(&mut self) -> Result<Step> {
        if self.eat('*') {
            if self.peek() == Some('[') {
                return Err(self.error("predicates are not allowed on '*'"));
            }
            return Ok(Step {
                prefix: None,
                name: StepName::Wildcard,
                predicates: Vec::new(),
            });
        }

        let first = self.identifier()?;
        let (prefix, name) = if self.eat(':') {
            if self.eat('*') {
                (Some(first), StepName::Wildcard)
            } else {
                (Some(first), StepName::Named(self.identifier()?))
            }
        } else {
            (None, StepName::Named(first))
        };

        let mut predicates = Vec::new();
        while self.eat('[') {
            if matches!(name, StepName::Wildcard) {
                return Err(self.error("predicates are not allowed on '*'"));
            }
            predicates.push(self.predicate()?);
        }

        Ok(Step {
            prefix,
            name,
            predicates,
        })
    }

    fn predicate(&mut self) -> Result<Predicate> {
        self.skip_ws();
        let subject = if self.eat('.') {
            None
        } else {
            Some(self.identifier()?)
        };
        self.skip_ws();
        if !self.eat('=') {
            return Err(self.error("expected '='"));
        }
        self.skip_ws();
        let value = self.quoted()?;
        self.skip_ws();
        if !self.eat(']') {
            return Err(self.error("expected ']'"));
        }
        Ok(match subject {
            Some(name) => Predicate::Key { name, value },
            None => Predicate::Value(value),
        })
    }

    fn quoted(&mut self) -> Result<String> {
        let quote = match self.peek() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.error("expected a quoted literal")),
        };
        self.pos += 1;
        let rest = &self.input[self.pos..];
        let end = rest
            .find(quote)
            .ok_or_else(|| self.error("unterminated literal"))?;
        let value = rest[..end].to_string();
        self.pos += end + 1;
        Ok(value)
    }

    fn identifier(&mut self) -> Result<String> {
        let rest = &self.input[self.pos..];
        let mut chars = rest.char_indices();
        match chars.next() {
            Some((_, c)) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return Err(self.error("expected an identifier")),
        }
        let end = chars
            .find(|(_, c)| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
            .map_or(rest.len(), |(i, _)| i);
        self.pos += end;
        Ok(rest[..end].to_string())
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn error(&self, reason: &str) -> TypeError {
        TypeError::InvalidPath {
            path: self.input.to_string(),
            offset: self.pos,
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prefixed_steps() {
        let p = PathExpr::parse("/minimal-integrationtest:types/str1").unwrap();
        assert_eq!(p.len(), 2);
        assert_eq!(p.module(), Some("minimal-integrationtest"));
        assert_eq!(p.steps[1].name(), Some("str1"));
        assert!(p.steps[1].prefix.is_none());
    }

    #[test]
    fn parses_key_predicates() {
        let p = PathExpr::parse("/m:c/multi[A='a'][B=\"b'x\"]/inner").unwrap();
        let keys: Vec<_> = p.steps[1].keys().collect();
        assert_eq!(keys, vec![("A", "a"), ("B", "b'x")]);
    }

    #[test]
    fn parses_value_predicate_and_wildcard() {
        let p = PathExpr::parse("/m:types/simplecollection[.='c']").unwrap();
        assert_eq!(p.steps[1].value_predicate(), Some("c"));

        let p = PathExpr::parse("/m:types/*").unwrap();
        assert!(p.has_wildcard());
    }

    #[test]
    fn display_roundtrips_text() {
        for text in [
            "/m:types/collection[x='a']/y",
            "/m:types/simplecollection[.='c']",
            "/m:types/*",
            "/m:a/m:b",
        ] {
            assert_eq!(PathExpr::parse(text).unwrap().to_string(), text);
        }
    }

    #[test]
    fn quote_prefers_single_quotes() {
        assert_eq!(quote_literal("abc"), "'abc'");
        assert_eq!(quote_literal("it's"), "\"it's\"");
        assert_eq!(quote_literal("say \"hi\""), "'say \"hi\"'");
        assert!(is_quotable("it's") && is_quotable("say \"hi\""));
        assert!(!is_quotable("it's \"both\""));
    }

    #[test]
    fn rejects_malformed_paths() {
        for bad in ["", "types", "/", "/m:a//b", "/m:a[x='1'", "/m:a[x=1]", "/*[x='1']", "/m:a/"] {
            let err = PathExpr::parse(bad).unwrap_err();
            assert!(matches!(err, TypeError::InvalidPath { .. }), "{bad:?} parsed");
        }
    }

    #[test]
    fn error_reports_offset() {
        match PathExpr::parse("/m:a[x='1'").unwrap_err() {
            TypeError::InvalidPath { offset, .. } => assert_eq!(offset, 10),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
