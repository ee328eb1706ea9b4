//! Accessor-analysis surface consumed by PSI emission.
//!
//! The cardinality analyzer that maps each rule to its observable children
//! lives outside this workspace. Emitters only see this trait; anything
//! that can answer the query plugs in.

use serde::{Deserialize, Serialize};

/// How many children of a given type a rule can observably produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cardinality {
    Required,
    Optional,
    AnyNumber,
    AtLeastOne,
}

impl Cardinality {
    /// Many-valued children surface as list accessors.
    pub fn is_many(self) -> bool {
        matches!(self, Cardinality::AnyNumber | Cardinality::AtLeastOne)
    }

    /// Only plain optional children produce nullable accessors; list
    /// accessors return an empty list instead.
    pub fn is_nullable(self) -> bool {
        matches!(self, Cardinality::Optional)
    }
}

/// What a child slot refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChildTarget {
    Rule(String),
    Token(String),
}

/// One observable child of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleChild {
    pub target: ChildTarget,
    pub cardinality: Cardinality,
}

impl RuleChild {
    pub fn rule(name: &str, cardinality: Cardinality) -> Self {
        Self {
            target: ChildTarget::Rule(name.to_string()),
            cardinality,
        }
    }

    pub fn token(name: &str, cardinality: Cardinality) -> Self {
        Self {
            target: ChildTarget::Token(name.to_string()),
            cardinality,
        }
    }
}

/// Maps each rule to its observable children, in emission order.
pub trait RuleGraph {
    fn children_of(&self, rule: &str) -> Vec<RuleChild>;
}
