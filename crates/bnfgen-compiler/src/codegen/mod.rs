//! Source emission: expression compilation, parser-unit dispatch, and the
//! element-type / PSI companions.
//!
//! All emitters share one read-only [`GenCx`] built before any code is
//! written: the ordered rule map, the rule-to-unit partition, and the root
//! identifiers. Iteration everywhere follows declaration order so output
//! is byte-stable across runs.

pub(crate) mod buffer;
pub(crate) mod element_types;
pub(crate) mod expr;
pub mod generator;
pub(crate) mod names;
pub(crate) mod psi;

#[cfg(test)]
mod buffer_tests;
#[cfg(test)]
mod expr_tests;

use bnfgen_core::{Grammar, Rule};
use indexmap::IndexMap;

use crate::{GenError, Result};

/// Default output-unit configuration, observable through generated files.
pub(crate) const DEFAULT_PARSER_CLASS: &str = "generated.GeneratedParser";
pub(crate) const DEFAULT_HOLDER_CLASS: &str = "generated.GeneratedTypes";
pub(crate) const DEFAULT_STUB_PARSER_CLASS: &str = "generated.ParserUtil";
pub(crate) const DEFAULT_PSI_PACKAGE: &str = "generated.psi";
pub(crate) const DEFAULT_PSI_IMPL_PACKAGE: &str = "generated.psi.impl";
pub(crate) const DEFAULT_PSI_IMPL_SUFFIX: &str = "Impl";
pub(crate) const DEFAULT_IMPL_BASE: &str = "com.intellij.extapi.psi.ASTWrapperPsiElement";

/// Shared generation context: the derived maps every emitter reads.
pub(crate) struct GenCx<'a> {
    pub grammar: &'a Grammar,
    /// Ordered rule map; the first entry is the grammar root.
    pub rules: IndexMap<&'a str, &'a Rule>,
    /// Output unit to rules it hosts, in declaration order.
    pub units: IndexMap<String, Vec<&'a str>>,
    /// Rule name to hosting unit.
    pub rule_units: IndexMap<&'a str, String>,
    pub root_rule: &'a str,
    pub root_unit: String,
}

impl<'a> GenCx<'a> {
    pub fn new(grammar: &'a Grammar) -> Result<Self> {
        let rules = grammar.rules_by_name()?;
        let Some(root) = grammar.root() else {
            return Err(GenError::EmptyGrammar);
        };

        let mut units: IndexMap<String, Vec<&str>> = IndexMap::new();
        let mut rule_units = IndexMap::new();
        for rule in &grammar.rules {
            let unit = grammar
                .attr_str(rule, "parserClass")
                .unwrap_or(DEFAULT_PARSER_CLASS)
                .to_string();
            units.entry(unit.clone()).or_default().push(rule.name.as_str());
            rule_units.insert(rule.name.as_str(), unit);
        }
        let root_unit = rule_units[root.name.as_str()].clone();

        Ok(Self {
            grammar,
            rules,
            units,
            rule_units,
            root_rule: root.name.as_str(),
            root_unit,
        })
    }

    pub fn is_root(&self, rule: &Rule) -> bool {
        rule.name == self.root_rule
    }

    /// A private root is promoted: the top-level marker in `parse` owns it.
    pub fn is_private(&self, rule: &Rule) -> bool {
        !self.is_root(rule) && self.grammar.attr_bool(rule, "private", false)
    }

    pub fn is_external(&self, rule: &Rule) -> bool {
        self.grammar.attr_bool(rule, "external", false)
    }

    pub fn is_meta(&self, rule: &Rule) -> bool {
        self.grammar.attr_bool(rule, "meta", false)
    }

    /// Public rules produce nodes: an element type, a PSI class, a `done`
    /// marker.
    pub fn is_public(&self, rule: &Rule) -> bool {
        !self.is_private(rule) && !self.is_external(rule)
    }

    pub fn generate_psi(&self, rule: &Rule) -> bool {
        self.grammar.attr_bool(rule, "generatePsi", true)
    }

    pub fn unit_of(&self, rule_name: &str) -> &str {
        &self.rule_units[rule_name]
    }

    pub fn holder_class(&self) -> &str {
        self.grammar
            .root_attr_str("elementTypeHolderClass")
            .unwrap_or(DEFAULT_HOLDER_CLASS)
    }

    pub fn stub_parser_class(&self) -> &str {
        self.grammar
            .root_attr_str("stubParserClass")
            .unwrap_or(DEFAULT_STUB_PARSER_CLASS)
    }

    pub fn psi_package(&self) -> &str {
        self.grammar
            .root_attr_str("psiPackage")
            .unwrap_or(DEFAULT_PSI_PACKAGE)
    }

    pub fn psi_impl_package(&self) -> &str {
        self.grammar
            .root_attr_str("psiImplPackage")
            .unwrap_or(DEFAULT_PSI_IMPL_PACKAGE)
    }
}
