//! The element-type holder: rule constants, token constants, and the PSI
//! factory.

use bnfgen_core::Rule;
use indexmap::{IndexMap, IndexSet};

use super::buffer::CodeBuffer;
use super::{names, GenCx};

const DEFAULT_TYPE_CLASS: &str = "com.intellij.psi.tree.IElementType";

pub(crate) fn emit(cx: &GenCx, tokens: &IndexMap<String, String>, header: &str) -> String {
    let (package, class) = names::split_fqn(cx.holder_class());
    let element_class = cx
        .grammar
        .root_attr_str("elementTypeClass")
        .unwrap_or(DEFAULT_TYPE_CLASS);
    let token_class = cx
        .grammar
        .root_attr_str("tokenTypeClass")
        .unwrap_or(DEFAULT_TYPE_CLASS);
    let factory = cx.grammar.root_attr_str("elementTypeFactory");
    let psi_rules: Vec<&Rule> = cx
        .grammar
        .rules
        .iter()
        .filter(|rule| cx.is_public(rule) && cx.generate_psi(rule))
        .collect();

    let mut buf = CodeBuffer::new();
    buf.out(header);
    buf.blank();
    if !package.is_empty() {
        buf.out(&format!("package {package};"));
        buf.blank();
    }
    if !psi_rules.is_empty() {
        buf.out("import com.intellij.lang.ASTNode;");
        buf.out("import com.intellij.psi.PsiElement;");
    }
    buf.out("import com.intellij.psi.tree.IElementType;");
    for custom in [element_class, token_class] {
        if custom != DEFAULT_TYPE_CLASS {
            buf.out(&format!("import {custom};"));
        }
    }
    if !psi_rules.is_empty() {
        buf.out(&format!("import {}.*;", cx.psi_impl_package()));
    }
    buf.blank();
    buf.out(&format!("public interface {class} {{"));
    buf.blank();

    // One constant per distinct public element type, even when several
    // rules alias the same one.
    let mut seen = IndexSet::new();
    for rule in cx.grammar.rules.iter().filter(|rule| cx.is_public(rule)) {
        let element_type = names::element_type(cx, rule);
        if !seen.insert(element_type.clone()) {
            continue;
        }
        let init = match factory {
            Some(factory) => format!("{factory}(\"{element_type}\")"),
            None => constructor(element_class, &element_type),
        };
        buf.out(&format!("IElementType {element_type} = {init};"));
    }

    if !tokens.is_empty() {
        buf.blank();
    }
    for (constant, text) in tokens {
        buf.out(&format!(
            "IElementType {constant} = {};",
            constructor(token_class, &names::escape_java(text))
        ));
    }

    if !psi_rules.is_empty() {
        buf.blank();
        buf.out("class Factory {");
        buf.out("public static PsiElement createElement(ASTNode node) {");
        buf.out("IElementType type = node.getElementType();");
        let mut seen = IndexSet::new();
        let mut first = true;
        for rule in &psi_rules {
            let element_type = names::element_type(cx, rule);
            if !seen.insert(element_type.clone()) {
                continue;
            }
            let keyword = if first { "if" } else { "else if" };
            buf.out(&format!("{keyword} (type == {element_type}) {{"));
            buf.out(&format!("return new {}(node);", names::psi_impl_name(cx, rule)));
            buf.out("}");
            first = false;
        }
        buf.out("throw new AssertionError(\"Unknown element type: \" + type);");
        buf.out("}");
        buf.out("}");
    }

    buf.out("}");
    buf.finish()
}

/// The default type class takes a debug name and a language; custom
/// classes take the name alone.
fn constructor(type_class: &str, debug_name: &str) -> String {
    if type_class == DEFAULT_TYPE_CLASS {
        format!("new IElementType(\"{debug_name}\", null)")
    } else {
        format!("new {}(\"{debug_name}\")", names::class_name(type_class))
    }
}
