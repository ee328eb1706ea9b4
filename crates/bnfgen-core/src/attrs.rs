//! Scoped grammar attributes.
//!
//! Attributes attach to the grammar root or to individual rules, and a
//! declaration may carry a pattern restricting where it applies (the
//! pattern is a regex tested against a lookup subject, usually a rule name
//! or a sub-expression's rendered text). Resolution is most-specific-wins:
//! rule-pattern, then rule, then root-pattern, then root, then the caller
//! default.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A single attribute value. Unknown or mistyped values are never rejected
/// here; consumers that need a specific type ignore non-conforming values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttrValue {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Str(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Str(s)
    }
}

impl From<i64> for AttrValue {
    fn from(n: i64) -> Self {
        AttrValue::Int(n)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

/// One attribute declaration, optionally pattern-qualified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attr {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    pub value: AttrValue,
}

/// An ordered attribute bag. Declaration order is significant: within one
/// specificity tier the earliest declaration wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attrs(Vec<Attr>);

impl Attrs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an unqualified attribute (builder style).
    pub fn set(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.0.push(Attr {
            name: name.to_string(),
            pattern: None,
            value: value.into(),
        });
        self
    }

    /// Add a pattern-qualified attribute (builder style).
    pub fn set_for(mut self, name: &str, pattern: &str, value: impl Into<AttrValue>) -> Self {
        self.0.push(Attr {
            name: name.to_string(),
            pattern: Some(pattern.to_string()),
            value: value.into(),
        });
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attr> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Earliest pattern-qualified declaration of `name` whose pattern
    /// matches `subject`.
    pub fn find_qualified(&self, name: &str, subject: &str) -> Option<&AttrValue> {
        self.0
            .iter()
            .filter(|a| a.name == name)
            .find(|a| {
                a.pattern
                    .as_deref()
                    .is_some_and(|p| pattern_matches(p, subject))
            })
            .map(|a| &a.value)
    }

    /// Earliest unqualified declaration of `name`.
    pub fn find_plain(&self, name: &str) -> Option<&AttrValue> {
        self.0
            .iter()
            .find(|a| a.name == name && a.pattern.is_none())
            .map(|a| &a.value)
    }
}

/// Whole-subject regex match. A pattern that fails to compile matches
/// nothing; attribute lookups never fail loudly.
pub(crate) fn pattern_matches(pattern: &str, subject: &str) -> bool {
    match Regex::new(&format!("^(?:{pattern})$")) {
        Ok(re) => re.is_match(subject),
        Err(_) => false,
    }
}

/// Most-specific-wins resolution across a rule's attributes and the root
/// attributes. Pattern tiers test the caller's `matching` subject when
/// given, else the rule name.
pub fn resolve<'a>(
    rule_attrs: &'a Attrs,
    root_attrs: &'a Attrs,
    rule_name: &str,
    name: &str,
    matching: Option<&str>,
) -> Option<&'a AttrValue> {
    let subject = matching.unwrap_or(rule_name);
    rule_attrs
        .find_qualified(name, subject)
        .or_else(|| rule_attrs.find_plain(name))
        .or_else(|| root_attrs.find_qualified(name, subject))
        .or_else(|| root_attrs.find_plain(name))
}

/// A resolved `pin` attribute: commit after the n-th child of a sequence,
/// or after the first child whose rendered text matches a regex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinValue {
    Index(usize),
    Pattern(String),
}

impl PinValue {
    /// A boolean or non-positive pin is a type mismatch and is dropped.
    pub fn from_attr(value: &AttrValue) -> Option<Self> {
        match value {
            AttrValue::Int(n) if *n >= 1 => Some(PinValue::Index(*n as usize)),
            AttrValue::Str(s) => Some(PinValue::Pattern(s.clone())),
            _ => None,
        }
    }

    /// Does the pin fire after the child at `index` (0-based)?
    pub fn hits(&self, index: usize, child_text: &str) -> bool {
        match self {
            PinValue::Index(n) => index + 1 == *n,
            PinValue::Pattern(p) => pattern_matches(p, child_text),
        }
    }
}
