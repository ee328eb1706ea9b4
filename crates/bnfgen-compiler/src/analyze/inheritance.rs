//! The rule-extends relation and its transitive closure.
//!
//! `a { extends=b }` adds the edge `elementType(b) -> elementType(a)`. The
//! closed relation backs the emitted `type_extends_` predicate and the
//! marker-collapse check, so descendant sets keep insertion order to keep
//! output stable.

use indexmap::{IndexMap, IndexSet};

use crate::codegen::{names, GenCx};

pub(crate) struct Inheritance {
    /// Element type of a super rule to element types of every transitive
    /// sub rule; public keys also contain themselves.
    pub extends_map: IndexMap<String, IndexSet<String>>,
    /// Rules on either side of an `extends` edge.
    pub rules_with_inheritance: IndexSet<String>,
}

impl Inheritance {
    pub fn participates(&self, rule_name: &str) -> bool {
        self.rules_with_inheritance.contains(rule_name)
    }
}

pub(crate) fn analyze(cx: &GenCx) -> Inheritance {
    let mut extends_map: IndexMap<String, IndexSet<String>> = IndexMap::new();
    let mut marked: IndexSet<String> = IndexSet::new();

    for rule in &cx.grammar.rules {
        if !cx.is_public(rule) {
            continue;
        }
        let Some(super_name) = cx.grammar.attr_str(rule, "extends") else {
            continue;
        };
        // `extends` may also name a host class; only rule targets form edges.
        let Some(super_rule) = cx.rules.get(super_name).copied() else {
            continue;
        };
        extends_map
            .entry(names::element_type(cx, super_rule))
            .or_default()
            .insert(names::element_type(cx, rule));
        marked.insert(rule.name.clone());
        marked.insert(super_rule.name.clone());
    }

    close_transitively(&mut extends_map);

    // Public element types are reflexive members of their own set.
    for rule in &cx.grammar.rules {
        if !cx.is_public(rule) {
            continue;
        }
        let element_type = names::element_type(cx, rule);
        if let Some(descendants) = extends_map.get_mut(&element_type) {
            descendants.insert(element_type.clone());
        }
    }

    Inheritance {
        extends_map,
        rules_with_inheritance: marked,
    }
}

/// Iterative relaxation to a fixed point; cycles stabilize because the
/// sets only grow and the universe is finite.
fn close_transitively(extends_map: &mut IndexMap<String, IndexSet<String>>) {
    loop {
        let mut changed = false;
        let parents: Vec<String> = extends_map.keys().cloned().collect();
        for parent in &parents {
            let direct: Vec<String> = extends_map[parent].iter().cloned().collect();
            let mut inherited: Vec<String> = Vec::new();
            for descendant in &direct {
                if descendant == parent {
                    continue;
                }
                if let Some(transitive) = extends_map.get(descendant) {
                    inherited.extend(transitive.iter().cloned());
                }
            }
            let set = &mut extends_map[parent];
            for element_type in inherited {
                if element_type != *parent && set.insert(element_type) {
                    changed = true;
                }
            }
        }
        if !changed {
            return;
        }
    }
}
