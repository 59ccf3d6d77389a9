//! Parameter trees.
//!
//! The whole public command surface is described by one recursive type:
//! a [`Params`] node is an ordered sequence of optionally named children,
//! so it behaves as a list and as a string-keyed map at the same time.
//! Leaves are typed scalars. Accessors coerce scalars to the requested type
//! where a sensible conversion exists (numbers and bools to text, text to
//! numbers), because scripted callers routinely pass everything as strings.

// Layer 1: Standard library imports
use std::fmt::Debug;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
// (none)

/// A typed scalar or a nested node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum ParamValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Binary(Vec<u8>),
    DateTime(DateTime<Utc>),
    Node(Params),
}

impl ParamValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ParamValue::Null)
    }

    /// Coerce to text. Nodes and binary blobs have no text form.
    pub fn as_text(&self) -> Option<String> {
        match self {
            ParamValue::Null => Some(String::new()),
            ParamValue::Bool(v) => Some(v.to_string()),
            ParamValue::Int(v) => Some(v.to_string()),
            ParamValue::UInt(v) => Some(v.to_string()),
            ParamValue::Float(v) => Some(v.to_string()),
            ParamValue::Str(v) => Some(v.clone()),
            ParamValue::DateTime(v) => Some(v.to_rfc3339()),
            ParamValue::Binary(_) | ParamValue::Node(_) => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ParamValue::Int(v) if *v >= 0 => Some(*v as u64),
            ParamValue::UInt(v) => Some(*v),
            ParamValue::Str(v) => v.parse().ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            ParamValue::UInt(v) => i64::try_from(*v).ok(),
            ParamValue::Str(v) => v.parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            ParamValue::Int(v) => Some(*v != 0),
            ParamValue::UInt(v) => Some(*v != 0),
            ParamValue::Str(v) => match v.as_str() {
                "true" | "1" | "yes" => Some(true),
                "false" | "0" | "no" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Params> {
        match self {
            ParamValue::Node(node) => Some(node),
            _ => None,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Str(value.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Str(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<u64> for ParamValue {
    fn from(value: u64) -> Self {
        ParamValue::UInt(value)
    }
}

impl From<Params> for ParamValue {
    fn from(value: Params) -> Self {
        ParamValue::Node(value)
    }
}

/// One child of a node: a value with an optional name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamEntry {
    pub name: Option<String>,
    pub value: ParamValue,
}

/// Ordered tree node; list-like and map-like access at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Params {
    entries: Vec<ParamEntry>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[ParamEntry] {
        &self.entries
    }

    /// Append a named child.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.entries.push(ParamEntry {
            name: Some(name.into()),
            value: value.into(),
        });
    }

    /// Append an unnamed (positional) child.
    pub fn push_unnamed(&mut self, value: impl Into<ParamValue>) {
        self.entries.push(ParamEntry {
            name: None,
            value: value.into(),
        });
    }

    /// Builder-style named child.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.push(name, value);
        self
    }

    /// Builder-style positional child.
    pub fn with_unnamed(mut self, value: impl Into<ParamValue>) -> Self {
        self.push_unnamed(value);
        self
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|e| e.name.as_deref() == Some(name))
            .map(|e| &e.value)
    }

    pub fn get_at(&self, index: usize) -> Option<&ParamValue> {
        self.entries.get(index).map(|e| &e.value)
    }

    /// Named lookup falling back to positional lookup, the way scripted
    /// commands address their first parameters.
    pub fn get_named_or_at(&self, name: &str, index: usize) -> Option<&ParamValue> {
        self.get(name).or_else(|| self.get_at(index))
    }

    pub fn get_string(&self, name: &str) -> Option<String> {
        self.get(name).and_then(ParamValue::as_text)
    }

    pub fn string_or(&self, name: &str, default: &str) -> String {
        self.get_string(name).unwrap_or_else(|| default.to_owned())
    }

    pub fn string_at(&self, index: usize) -> Option<String> {
        self.get_at(index).and_then(ParamValue::as_text)
    }

    pub fn uint_or(&self, name: &str, default: u64) -> u64 {
        self.get(name).and_then(ParamValue::as_u64).unwrap_or(default)
    }

    pub fn bool_or(&self, name: &str, default: bool) -> bool {
        self.get(name).and_then(ParamValue::as_bool).unwrap_or(default)
    }

    pub fn node(&self, name: &str) -> Option<&Params> {
        self.get(name).and_then(ParamValue::as_node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_and_positional_access() {
        let params = Params::new()
            .with("name", "Q")
            .with("retry_limit", 3u64)
            .with_unnamed("extra");

        assert_eq!(params.len(), 3);
        assert_eq!(params.get_string("name").as_deref(), Some("Q"));
        assert_eq!(params.string_at(0).as_deref(), Some("Q"));
        assert_eq!(params.string_at(2).as_deref(), Some("extra"));
        assert_eq!(params.uint_or("retry_limit", 0), 3);
    }

    #[test]
    fn test_named_or_positional_fallback() {
        let by_name = Params::new().with("queue_name", "Q");
        let by_pos = Params::new().with_unnamed("Q");

        assert_eq!(
            by_name.get_named_or_at("queue_name", 0).and_then(ParamValue::as_text),
            Some("Q".to_owned())
        );
        assert_eq!(
            by_pos.get_named_or_at("queue_name", 0).and_then(ParamValue::as_text),
            Some("Q".to_owned())
        );
    }

    #[test]
    fn test_scalar_coercion() {
        assert_eq!(ParamValue::Str("42".into()).as_u64(), Some(42));
        assert_eq!(ParamValue::Int(42).as_text().as_deref(), Some("42"));
        assert_eq!(ParamValue::Str("true".into()).as_bool(), Some(true));
        assert_eq!(ParamValue::UInt(0).as_bool(), Some(false));
        assert_eq!(ParamValue::Str("nope".into()).as_u64(), None);
    }

    #[test]
    fn test_nested_nodes() {
        let inner = Params::new().with("skip_sender", false);
        let outer = Params::new().with("_squeue", inner);

        let node = outer.node("_squeue").map(|n| n.bool_or("skip_sender", true));
        assert_eq!(node, Some(false));
    }

    #[test]
    fn test_defaults_for_missing_children() {
        let params = Params::new();
        assert_eq!(params.uint_or("missing", 7), 7);
        assert!(params.bool_or("missing", true));
        assert_eq!(params.string_or("missing", "x"), "x");
    }
}
