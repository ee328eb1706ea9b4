//! PSI interface and implementation emission.
//!
//! One interface plus one implementation per public rule. Accessors come
//! from the external rule graph: each observable child becomes a typed
//! getter whose cardinality decides the return shape and nullability.

use bnfgen_core::utils::is_ident;
use bnfgen_core::{ChildTarget, Rule, RuleGraph};

use super::buffer::CodeBuffer;
use super::{names, GenCx, DEFAULT_IMPL_BASE};

struct Accessor {
    annotation: &'static str,
    ret: String,
    name: String,
    body: String,
    many: bool,
    token: bool,
}

pub(crate) fn interface(cx: &GenCx, graph: &dyn RuleGraph, rule: &Rule, header: &str) -> String {
    let name = names::psi_interface_name(cx, rule);
    let accessors = accessors(cx, graph, rule);

    let mut buf = CodeBuffer::new();
    buf.out(header);
    buf.blank();
    buf.out(&format!("package {};", cx.psi_package()));
    buf.blank();
    if accessors.iter().any(|a| a.many) {
        buf.out("import java.util.List;");
    }
    if !accessors.is_empty() {
        buf.out("import org.jetbrains.annotations.*;");
    }
    buf.out("import com.intellij.psi.PsiElement;");
    buf.blank();

    let supers = interface_supers(cx, rule);
    buf.out(&format!(
        "public interface {name} extends {} {{",
        supers.join(", ")
    ));
    buf.blank();
    for accessor in &accessors {
        buf.out(accessor.annotation);
        buf.out(&format!("{} {}();", accessor.ret, accessor.name));
        buf.blank();
    }
    buf.out("}");
    buf.finish()
}

pub(crate) fn implementation(
    cx: &GenCx,
    graph: &dyn RuleGraph,
    rule: &Rule,
    header: &str,
) -> String {
    let name = names::psi_impl_name(cx, rule);
    let iface = names::psi_interface_name(cx, rule);
    let accessors = accessors(cx, graph, rule);
    let base = impl_base(cx, rule);
    let base_simple = names::class_name(&base);

    let mut buf = CodeBuffer::new();
    buf.out(header);
    buf.blank();
    buf.out(&format!("package {};", cx.psi_impl_package()));
    buf.blank();
    if accessors.iter().any(|a| a.many) {
        buf.out("import java.util.List;");
    }
    if !accessors.is_empty() {
        buf.out("import org.jetbrains.annotations.*;");
    }
    buf.out("import com.intellij.lang.ASTNode;");
    if accessors.iter().any(|a| a.token) {
        buf.out("import com.intellij.psi.PsiElement;");
        buf.out(&format!("import static {}.*;", cx.holder_class()));
    }
    if accessors.iter().any(|a| !a.token) {
        buf.out("import com.intellij.psi.util.PsiTreeUtil;");
    }
    if base.contains('.') {
        buf.out(&format!("import {base};"));
    }
    buf.out(&format!("import {}.*;", cx.psi_package()));
    buf.blank();

    buf.out(&format!(
        "public class {name} extends {base_simple} implements {iface} {{"
    ));
    buf.blank();
    buf.out(&format!("public {name}(ASTNode node) {{"));
    buf.out("super(node);");
    buf.out("}");
    buf.blank();
    for accessor in &accessors {
        buf.out("@Override");
        buf.out(accessor.annotation);
        buf.out(&format!("public {} {}() {{", accessor.ret, accessor.name));
        buf.out(&format!("return {};", accessor.body));
        buf.out("}");
        buf.blank();
    }
    buf.out("}");
    buf.finish()
}

/// The parent rule named by `extends`, when it is a rule.
fn parent_rule<'a>(cx: &GenCx<'a>, rule: &Rule) -> Option<&'a Rule> {
    let target = cx.grammar.attr_str(rule, "extends")?;
    cx.rules.get(target).copied().filter(|parent| cx.is_public(parent))
}

fn interface_supers(cx: &GenCx, rule: &Rule) -> Vec<String> {
    let mut supers = Vec::new();
    if let Some(parent) = parent_rule(cx, rule) {
        supers.push(names::psi_interface_name(cx, parent));
    }
    if let Some(declared) = cx.grammar.attr_str(rule, "implements") {
        for item in declared.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match cx.rules.get(item).copied() {
                Some(named) if cx.is_public(named) => {
                    supers.push(names::psi_interface_name(cx, named));
                }
                _ => supers.push(item.to_string()),
            }
        }
    }
    if supers.is_empty() {
        supers.push("PsiElement".to_string());
    }
    supers
}

/// Implementation base: `mixin` wins, then the parent rule's
/// implementation, then an `extends` class, then the configured default.
fn impl_base(cx: &GenCx, rule: &Rule) -> String {
    if let Some(mixin) = cx.grammar.attr_str(rule, "mixin") {
        return mixin.to_string();
    }
    if let Some(parent) = parent_rule(cx, rule) {
        return names::psi_impl_name(cx, parent);
    }
    if let Some(extends) = cx.grammar.attr_str(rule, "extends") {
        return extends.to_string();
    }
    DEFAULT_IMPL_BASE.to_string()
}

fn accessors(cx: &GenCx, graph: &dyn RuleGraph, rule: &Rule) -> Vec<Accessor> {
    let mut out = Vec::new();
    for child in graph.children_of(&rule.name) {
        let many = child.cardinality.is_many();
        let annotation = if child.cardinality.is_nullable() {
            "@Nullable"
        } else {
            "@NotNull"
        };
        match &child.target {
            ChildTarget::Rule(target) => {
                let Some(target_rule) = cx.rules.get(target.as_str()).copied() else {
                    continue;
                };
                if !cx.is_public(target_rule) {
                    continue;
                }
                let ty = names::psi_interface_name(cx, target_rule);
                let (ret, body) = if many {
                    (
                        format!("List<{ty}>"),
                        format!("PsiTreeUtil.getChildrenOfTypeAsList(this, {ty}.class)"),
                    )
                } else {
                    (
                        ty.clone(),
                        format!("PsiTreeUtil.getChildOfType(this, {ty}.class)"),
                    )
                };
                out.push(Accessor {
                    annotation,
                    ret,
                    name: names::getter_name(cx.grammar, rule, target, many),
                    body,
                    many,
                    token: false,
                });
            }
            ChildTarget::Token(token) => {
                // Mixed-case token names are ambiguous against rule
                // references; literals never produce accessors.
                if !is_ident(token) || token.chars().any(|c| c.is_ascii_uppercase()) {
                    continue;
                }
                let constant = names::named_token_constant(token);
                let (ret, body) = if many {
                    (
                        "List<PsiElement>".to_string(),
                        format!("findChildrenByType({constant})"),
                    )
                } else {
                    (
                        "PsiElement".to_string(),
                        format!("findChildByType({constant})"),
                    )
                };
                out.push(Accessor {
                    annotation,
                    ret,
                    name: names::getter_name(cx.grammar, rule, token, many),
                    body,
                    many,
                    token: true,
                });
            }
        }
    }
    out
}
