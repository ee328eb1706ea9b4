//! Emitted-name derivation: element-type constants, token constants, PSI
//! class names, and accessor names.

use bnfgen_core::utils::{is_ident, to_pascal_case, to_upper_snake};
use bnfgen_core::{AttrValue, Grammar, Rule};

use super::{GenCx, DEFAULT_PSI_IMPL_SUFFIX};

/// Attribute names with generator-defined meaning; everything else at the
/// root is eligible as a token alias.
const KNOWN_ATTRS: &[&str] = &[
    "classHeader",
    "elementType",
    "elementTypeClass",
    "elementTypeFactory",
    "elementTypeHolderClass",
    "elementTypePrefix",
    "extends",
    "external",
    "generatePsi",
    "implements",
    "memoization",
    "meta",
    "methodRenames",
    "mixin",
    "parserClass",
    "parserImports",
    "pin",
    "private",
    "psiClassPrefix",
    "psiImplClassSuffix",
    "psiImplPackage",
    "psiPackage",
    "recoverUntil",
    "stubParserClass",
    "tokenTypeClass",
];

/// Element-type constant for a rule's node.
pub(crate) fn element_type(cx: &GenCx, rule: &Rule) -> String {
    let raw = cx
        .grammar
        .attr_str(rule, "elementType")
        .unwrap_or(&rule.name);
    let prefix = cx.grammar.root_attr_str("elementTypePrefix").unwrap_or("");
    format!("{prefix}{}", to_upper_snake(raw))
}

/// Constant for a token referenced by name.
pub(crate) fn named_token_constant(name: &str) -> String {
    to_upper_snake(name)
}

/// Constant for a literal token, if it gets one: a root alias attribute
/// wins, identifier-like text gets a `_` suffix to stay clear of rule
/// constants, and anything else is matched textually (no constant).
pub(crate) fn literal_token_constant(grammar: &Grammar, text: &str) -> Option<String> {
    for attr in grammar.attrs.iter() {
        if attr.pattern.is_none()
            && !KNOWN_ATTRS.contains(&attr.name.as_str())
            && attr.value.as_str() == Some(text)
        {
            return Some(to_upper_snake(&attr.name));
        }
    }
    if is_ident(text) {
        return Some(format!("{}_", to_upper_snake(text)));
    }
    None
}

/// PSI interface name for a public rule.
pub(crate) fn psi_interface_name(cx: &GenCx, rule: &Rule) -> String {
    let prefix = cx.grammar.root_attr_str("psiClassPrefix").unwrap_or("");
    format!("{prefix}{}", to_pascal_case(&rule.name))
}

/// PSI implementation class name for a public rule.
pub(crate) fn psi_impl_name(cx: &GenCx, rule: &Rule) -> String {
    let suffix = cx
        .grammar
        .root_attr_str("psiImplClassSuffix")
        .unwrap_or(DEFAULT_PSI_IMPL_SUFFIX);
    format!("{}{}", psi_interface_name(cx, rule), suffix)
}

/// Accessor name for a child, `methodRenames` applied. Renames are
/// pattern-qualified attributes matched against the computed name.
pub(crate) fn getter_name(grammar: &Grammar, rule: &Rule, child: &str, many: bool) -> String {
    let mut name = format!("get{}", to_pascal_case(child));
    if many {
        name.push_str("List");
    }
    let renamed = rule
        .attrs
        .find_qualified("methodRenames", &name)
        .or_else(|| grammar.attrs.find_qualified("methodRenames", &name))
        .and_then(AttrValue::as_str);
    match renamed {
        Some(renamed) => renamed.to_string(),
        None => name,
    }
}

/// Split a fully-qualified class name into package and simple name.
pub(crate) fn split_fqn(fqn: &str) -> (&str, &str) {
    match fqn.rsplit_once('.') {
        Some((package, class)) => (package, class),
        None => ("", fqn),
    }
}

/// Simple class name of a fully-qualified name.
pub(crate) fn class_name(fqn: &str) -> &str {
    split_fqn(fqn).1
}

/// Package-mirrored relative path of a class file.
pub(crate) fn file_path(fqn: &str) -> String {
    format!("{}.java", fqn.replace('.', "/"))
}

/// Escape text for a Java string literal.
pub(crate) fn escape_java(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
