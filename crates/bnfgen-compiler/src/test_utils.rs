//! Test helpers: a literal rule graph and generation shortcuts.

use std::collections::HashMap;

use bnfgen_core::{Grammar, RuleChild, RuleGraph};

use crate::{GeneratedFiles, Generator};

/// Rule graph backed by a literal map; rules absent from the map have no
/// observable children.
pub struct MapRuleGraph(pub HashMap<String, Vec<RuleChild>>);

impl MapRuleGraph {
    pub fn new(entries: Vec<(&str, Vec<RuleChild>)>) -> Self {
        Self(
            entries
                .into_iter()
                .map(|(rule, children)| (rule.to_string(), children))
                .collect(),
        )
    }

    pub fn empty() -> Self {
        Self(HashMap::new())
    }
}

impl RuleGraph for MapRuleGraph {
    fn children_of(&self, rule: &str) -> Vec<RuleChild> {
        self.0.get(rule).cloned().unwrap_or_default()
    }
}

/// Generate all files for a grammar whose PSI accessors don't matter.
pub fn generate(grammar: &Grammar) -> GeneratedFiles {
    let graph = MapRuleGraph::empty();
    Generator::new(grammar, &graph)
        .expect("generator construction succeeds")
        .generate()
        .expect("generation succeeds")
}

/// One generated file by its relative path.
pub fn file<'f>(files: &'f GeneratedFiles, path: &str) -> &'f str {
    files
        .get(path)
        .unwrap_or_else(|| panic!("missing generated file {path}, have: {:?}", files.keys()))
}

/// The parser unit hosting the grammar root, under default configuration.
pub fn root_parser(grammar: &Grammar) -> String {
    let files = generate(grammar);
    file(&files, "generated/GeneratedParser.java").to_string()
}

/// Count non-overlapping occurrences of `needle`.
pub fn count(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

/// Re-indent a dedented expected block to its in-file depth; blank lines
/// stay empty.
pub fn indent(block: &str, spaces: usize) -> String {
    block
        .lines()
        .map(|line| {
            if line.is_empty() {
                String::from("\n")
            } else {
                format!("{}{line}\n", " ".repeat(spaces))
            }
        })
        .collect()
}
