//! Grammar data model for the bnfgen parser generator.
//!
//! This crate defines the input surface of the generator:
//! - `grammar` - rules, expression trees, and their rendered source text
//! - `attrs` - scoped attribute bags with most-specific-wins resolution
//! - `graph` - the cardinality-analyzer trait consumed by PSI emission
//! - `utils` - naming-convention helpers shared by the emitters
//!
//! The BNF front-end that produces `Grammar` values lives outside this
//! workspace; grammars arrive either constructed in memory or as JSON.

pub mod attrs;
pub mod grammar;
pub mod graph;
pub mod utils;


pub use attrs::{Attr, AttrValue, Attrs, PinValue};
pub use grammar::{DuplicateRule, Expr, Grammar, Rule};
pub use graph::{Cardinality, ChildTarget, RuleChild, RuleGraph};
