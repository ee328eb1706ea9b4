//! The grammar expression tree handed to the generator.
//!
//! A [`Grammar`] is an ordered sequence of [`Rule`]s plus root-level
//! attributes; the first rule is the grammar root. Expression nodes carry
//! no source positions: the rendered [`Display`] text stands in for source
//! text wherever the generator needs one (pin patterns, diagnostics).

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::attrs::{self, AttrValue, Attrs, PinValue};

/// One grammar production.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    pub expr: Expr,
    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    pub attrs: Attrs,
}

impl Rule {
    pub fn new(name: &str, expr: Expr) -> Self {
        Self {
            name: name.to_string(),
            expr,
            attrs: Attrs::new(),
        }
    }

    pub fn with_attrs(name: &str, expr: Expr, attrs: Attrs) -> Self {
        Self {
            name: name.to_string(),
            expr,
            attrs,
        }
    }
}

/// A grammar expression node.
///
/// `External` holds the head expression first, then the call arguments;
/// the head is a reference to an external parser function, a meta rule, or
/// a meta parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Reference(String),
    StringLiteral(String),
    NumberLiteral(String),
    Sequence(Vec<Expr>),
    Choice(Vec<Expr>),
    Optional(Box<Expr>),
    ZeroOrMore(Box<Expr>),
    OneOrMore(Box<Expr>),
    And(Box<Expr>),
    Not(Box<Expr>),
    Parenthesized(Box<Expr>),
    External(Vec<Expr>),
}

impl Expr {
    pub fn reference(name: &str) -> Self {
        Expr::Reference(name.to_string())
    }

    pub fn literal(text: &str) -> Self {
        Expr::StringLiteral(text.to_string())
    }

    pub fn number(text: &str) -> Self {
        Expr::NumberLiteral(text.to_string())
    }

    pub fn sequence(children: Vec<Expr>) -> Self {
        Expr::Sequence(children)
    }

    pub fn choice(children: Vec<Expr>) -> Self {
        Expr::Choice(children)
    }

    pub fn optional(child: Expr) -> Self {
        Expr::Optional(Box::new(child))
    }

    pub fn zero_or_more(child: Expr) -> Self {
        Expr::ZeroOrMore(Box::new(child))
    }

    pub fn one_or_more(child: Expr) -> Self {
        Expr::OneOrMore(Box::new(child))
    }

    pub fn and(child: Expr) -> Self {
        Expr::And(Box::new(child))
    }

    pub fn not(child: Expr) -> Self {
        Expr::Not(Box::new(child))
    }

    pub fn parenthesized(child: Expr) -> Self {
        Expr::Parenthesized(Box::new(child))
    }

    pub fn external(parts: Vec<Expr>) -> Self {
        Expr::External(parts)
    }

    /// Immediate sub-expressions, in order.
    pub fn children(&self) -> &[Expr] {
        match self {
            Expr::Sequence(c) | Expr::Choice(c) | Expr::External(c) => c,
            Expr::Optional(c)
            | Expr::ZeroOrMore(c)
            | Expr::OneOrMore(c)
            | Expr::And(c)
            | Expr::Not(c)
            | Expr::Parenthesized(c) => std::slice::from_ref(&**c),
            Expr::Reference(_) | Expr::StringLiteral(_) | Expr::NumberLiteral(_) => &[],
        }
    }

    /// Pre-order traversal over this node and everything below it.
    pub fn descendants(&self) -> impl Iterator<Item = &Expr> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            for child in node.children().iter().rev() {
                stack.push(child);
            }
            Some(node)
        })
    }
}

/// Wraps a child so container nodes re-render with grouping intact.
struct Atom<'a>(&'a Expr);

impl fmt::Display for Atom<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Expr::Sequence(_) | Expr::Choice(_) => write!(f, "({})", self.0),
            _ => write!(f, "{}", self.0),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, children: &[Expr], sep: &str, atoms: bool) -> fmt::Result {
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        if atoms {
            write!(f, "{}", Atom(child))?;
        } else {
            write!(f, "{child}")?;
        }
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Reference(name) => f.write_str(name),
            Expr::StringLiteral(text) => write!(f, "'{text}'"),
            Expr::NumberLiteral(text) => f.write_str(text),
            Expr::Sequence(children) => write_joined(f, children, " ", true),
            Expr::Choice(children) => write_joined(f, children, " | ", false),
            Expr::Optional(child) => write!(f, "{}?", Atom(child)),
            Expr::ZeroOrMore(child) => write!(f, "{}*", Atom(child)),
            Expr::OneOrMore(child) => write!(f, "{}+", Atom(child)),
            Expr::And(child) => write!(f, "&{}", Atom(child)),
            Expr::Not(child) => write!(f, "!{}", Atom(child)),
            Expr::Parenthesized(child) => write!(f, "({child})"),
            Expr::External(parts) => {
                f.write_str("<<")?;
                write_joined(f, parts, " ", true)?;
                f.write_str(">>")
            }
        }
    }
}

/// Two rules share a name; the grammar is rejected before generation.
#[derive(Debug, Clone, thiserror::Error)]
#[error("duplicate rule name `{0}`")]
pub struct DuplicateRule(pub String);

/// An ordered rule sequence plus root-level attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grammar {
    pub rules: Vec<Rule>,
    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    pub attrs: Attrs,
}

impl Grammar {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules,
            attrs: Attrs::new(),
        }
    }

    pub fn with_attrs(rules: Vec<Rule>, attrs: Attrs) -> Self {
        Self { rules, attrs }
    }

    /// The grammar root is the first rule.
    pub fn root(&self) -> Option<&Rule> {
        self.rules.first()
    }

    /// Ordered name-to-rule map; every rule name must be unique.
    pub fn rules_by_name(&self) -> Result<IndexMap<&str, &Rule>, DuplicateRule> {
        let mut map = IndexMap::with_capacity(self.rules.len());
        for rule in &self.rules {
            if map.insert(rule.name.as_str(), rule).is_some() {
                return Err(DuplicateRule(rule.name.clone()));
            }
        }
        Ok(map)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Attribute lookup for `rule`, most specific declaration first.
    pub fn attr<'a>(
        &'a self,
        rule: &'a Rule,
        name: &str,
        matching: Option<&str>,
    ) -> Option<&'a AttrValue> {
        attrs::resolve(&rule.attrs, &self.attrs, &rule.name, name, matching)
    }

    pub fn attr_str<'a>(&'a self, rule: &'a Rule, name: &str) -> Option<&'a str> {
        self.attr(rule, name, None).and_then(AttrValue::as_str)
    }

    pub fn attr_bool(&self, rule: &Rule, name: &str, default: bool) -> bool {
        self.attr(rule, name, None)
            .and_then(AttrValue::as_bool)
            .unwrap_or(default)
    }

    /// Root-scope lookup (no rule in play).
    pub fn root_attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.find_plain(name)
    }

    pub fn root_attr_str(&self, name: &str) -> Option<&str> {
        self.root_attr(name).and_then(AttrValue::as_str)
    }

    pub fn root_attr_bool(&self, name: &str, default: bool) -> bool {
        self.root_attr(name)
            .and_then(AttrValue::as_bool)
            .unwrap_or(default)
    }

    /// Resolve `pin` for one frame of `rule`. Pattern-qualified pins apply
    /// to any frame whose rendered text they match; an unqualified pin
    /// applies only to the rule's own (first non-trivial) frame.
    pub fn pin(&self, rule: &Rule, frame_text: &str, rule_frame: bool) -> Option<PinValue> {
        let qualified = rule
            .attrs
            .find_qualified("pin", frame_text)
            .or_else(|| self.attrs.find_qualified("pin", frame_text));
        if let Some(value) = qualified {
            return PinValue::from_attr(value);
        }
        if rule_frame {
            let plain = rule
                .attrs
                .find_plain("pin")
                .or_else(|| self.attrs.find_plain("pin"));
            if let Some(value) = plain {
                return PinValue::from_attr(value);
            }
        }
        None
    }
}
