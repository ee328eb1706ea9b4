//! Rule dispatch and file assembly.
//!
//! Rules are partitioned by `parserClass` and each partition becomes one
//! parser unit. The unit hosting the grammar root additionally carries the
//! `parse` entry point and the `type_extends_` predicate over the closed
//! inheritance relation. Files are rendered fully in memory and written in
//! one call each, so interrupting between files never leaves one half
//! emitted.

use std::fs;
use std::path::Path;

use bnfgen_core::{Grammar, Rule, RuleGraph};
use indexmap::{IndexMap, IndexSet};

use super::buffer::CodeBuffer;
use super::expr::ExprCompiler;
use super::{element_types, names, psi, GenCx};
use crate::analyze::{self, Inheritance};
use crate::{GenError, Result};

const DEFAULT_HEADER: &str = "// This is a generated file. Not intended for manual editing.";

/// Generated output: package-mirrored relative path to file contents.
pub type GeneratedFiles = IndexMap<String, String>;

/// The generator pipeline. Built once per grammar; `generate` runs the
/// whole pass.
pub struct Generator<'a> {
    cx: GenCx<'a>,
    graph: &'a dyn RuleGraph,
    inheritance: Inheritance,
    header: String,
}

impl<'a> Generator<'a> {
    pub fn new(grammar: &'a Grammar, graph: &'a dyn RuleGraph) -> Result<Self> {
        let cx = GenCx::new(grammar)?;
        let inheritance = analyze::analyze(&cx);
        let header = resolve_header(grammar);
        Ok(Self {
            cx,
            graph,
            inheritance,
            header,
        })
    }

    /// Render every output file in memory. Parser units come first: the
    /// simple-token set the holder needs is a side effect of compiling
    /// them.
    pub fn generate(&self) -> Result<GeneratedFiles> {
        let mut files = GeneratedFiles::new();
        let mut tokens = IndexMap::new();

        for unit in self.cx.units.keys() {
            let content = self.parser_unit(unit, &mut tokens)?;
            files.insert(names::file_path(unit), content);
        }

        files.insert(
            names::file_path(self.cx.holder_class()),
            element_types::emit(&self.cx, &tokens, &self.header),
        );

        for rule in &self.cx.grammar.rules {
            if !self.cx.is_public(rule) || !self.cx.generate_psi(rule) {
                continue;
            }
            let interface_fqn = format!(
                "{}.{}",
                self.cx.psi_package(),
                names::psi_interface_name(&self.cx, rule)
            );
            files.insert(
                names::file_path(&interface_fqn),
                psi::interface(&self.cx, self.graph, rule, &self.header),
            );
            let impl_fqn = format!(
                "{}.{}",
                self.cx.psi_impl_package(),
                names::psi_impl_name(&self.cx, rule)
            );
            files.insert(
                names::file_path(&impl_fqn),
                psi::implementation(&self.cx, self.graph, rule, &self.header),
            );
        }

        Ok(files)
    }

    /// Generate and write everything below `root`.
    pub fn generate_into(&self, root: &Path) -> Result<()> {
        let files = self.generate()?;
        for (relative, content) in &files {
            let path = root.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|source| GenError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            fs::write(&path, content).map_err(|source| GenError::Io {
                path: path.clone(),
                source,
            })?;
            log::debug!("generated {}", path.display());
        }
        Ok(())
    }

    fn parser_unit(&self, unit: &str, tokens: &mut IndexMap<String, String>) -> Result<String> {
        let is_root_unit = unit == self.cx.root_unit;
        let class = names::class_name(unit);
        let mut buf = CodeBuffer::new();

        self.unit_header(unit, is_root_unit, &mut buf);
        if is_root_unit {
            buf.out(&format!("public class {class} implements PsiParser {{"));
        } else {
            buf.out(&format!("public class {class} {{"));
        }
        buf.blank();

        if is_root_unit {
            self.parse_entry(&mut buf);
            self.extends_sets(&mut buf);
        }

        let mut compiler = ExprCompiler::new(&self.cx, &self.inheritance, unit, tokens);
        for rule_name in &self.cx.units[unit] {
            let rule = *self
                .cx
                .rules
                .get(*rule_name)
                .expect("unit partitions only hold known rules");
            if self.cx.is_external(rule) {
                continue;
            }
            compiler.compile_rule(rule, &mut buf)?;
        }

        for (field, call) in &compiler.fields {
            buf.out(&format!("static final Parser {field} = new Parser() {{"));
            buf.out("public boolean parse(PsiBuilder builder_) {");
            buf.out(&format!("return {call};"));
            buf.out("}");
            buf.out("};");
            buf.blank();
        }

        buf.out("}");
        Ok(buf.finish())
    }

    fn unit_header(&self, unit: &str, is_root_unit: bool, buf: &mut CodeBuffer) {
        buf.out(&self.header);
        buf.blank();
        let (package, _) = names::split_fqn(unit);
        if !package.is_empty() {
            buf.out(&format!("package {package};"));
            buf.blank();
        }
        if is_root_unit {
            buf.out("import com.intellij.lang.ASTNode;");
        }
        buf.out("import com.intellij.lang.PsiBuilder;");
        buf.out("import com.intellij.lang.PsiBuilder.Marker;");
        if self.unit_has_collapse(unit) {
            buf.out("import com.intellij.lang.LighterASTNode;");
        }
        if is_root_unit {
            buf.out("import com.intellij.lang.PsiParser;");
            buf.out("import com.intellij.psi.tree.IElementType;");
            if !self.inheritance.extends_map.is_empty() {
                buf.out("import com.intellij.psi.tree.TokenSet;");
            }
        }
        for attr in self.cx.grammar.attrs.iter() {
            if attr.name == "parserImports"
                && attr.pattern.is_none()
                && let Some(import) = attr.value.as_str()
            {
                buf.out(&format!("import {import};"));
            }
        }
        buf.out(&format!("import static {}.*;", self.cx.holder_class()));
        buf.out(&format!("import static {}.*;", self.cx.stub_parser_class()));
        for other in self.cx.units.keys() {
            if other != unit {
                buf.out(&format!("import {other};"));
            }
        }
        if !is_root_unit {
            buf.out(&format!("import static {}.*;", self.cx.root_unit));
        }
        buf.blank();
    }

    /// Collapse checks read `getLatestDoneMarker`; only units hosting
    /// inheritance-participating public rules need the import.
    fn unit_has_collapse(&self, unit: &str) -> bool {
        self.cx.units[unit].iter().any(|name| {
            let rule = self.cx.rules[name];
            self.cx.is_public(rule) && self.inheritance.participates(name)
        })
    }

    /// The public entry: dispatch a known element type straight to its
    /// rule, or wrap the grammar root in a top-level marker that drains
    /// whatever tokens remain. Draining here is the only place the builder
    /// may advance past the grammar's nominal end.
    fn parse_entry(&self, buf: &mut CodeBuffer) {
        buf.out("public ASTNode parse(IElementType root_, PsiBuilder builder_) {");
        buf.out("int level_ = 0;");
        buf.out("boolean result_;");
        let mut seen = IndexSet::new();
        let mut first = true;
        for rule in &self.cx.grammar.rules {
            if self.cx.is_root(rule) || !self.cx.is_public(rule) || self.cx.is_meta(rule) {
                continue;
            }
            let element_type = names::element_type(&self.cx, rule);
            if !seen.insert(element_type.clone()) {
                continue;
            }
            let keyword = if first { "if" } else { "else if" };
            buf.out(&format!("{keyword} (root_ == {element_type}) {{"));
            buf.out(&format!("result_ = {};", self.rule_call(rule)));
            buf.out("}");
            first = false;
        }
        if first {
            self.parse_fallback(buf);
        } else {
            buf.out("else {");
            self.parse_fallback(buf);
            buf.out("}");
        }
        buf.out("return builder_.getTreeBuilt();");
        buf.out("}");
        buf.blank();
        buf.out("protected boolean parse_root_(IElementType root_, PsiBuilder builder_, int level_) {");
        buf.out(&format!(
            "return {}(builder_, level_ + 1);",
            self.cx.root_rule
        ));
        buf.out("}");
        buf.blank();
    }

    fn parse_fallback(&self, buf: &mut CodeBuffer) {
        buf.out("Marker marker_ = builder_.mark();");
        buf.out("result_ = parse_root_(root_, builder_, level_);");
        buf.out("while (builder_.getTokenType() != null) {");
        buf.out("builder_.advanceLexer();");
        buf.out("}");
        buf.out("marker_.done(root_);");
    }

    /// `type_extends_` holds iff one token set contains both arguments;
    /// one set per super element type, reflexive entries included.
    fn extends_sets(&self, buf: &mut CodeBuffer) {
        if self.inheritance.extends_map.is_empty() {
            return;
        }
        buf.out("public static final TokenSet[] EXTENDS_SETS_ = new TokenSet[] {");
        for descendants in self.inheritance.extends_map.values() {
            let list = descendants.iter().cloned().collect::<Vec<_>>().join(", ");
            buf.out(&format!("create_token_set_({list}),"));
        }
        buf.out("};");
        buf.blank();
        buf.out("public static boolean type_extends_(IElementType child_, IElementType parent_) {");
        buf.out("for (TokenSet set_ : EXTENDS_SETS_) {");
        buf.out("if (set_.contains(child_) && set_.contains(parent_)) return true;");
        buf.out("}");
        buf.out("return false;");
        buf.out("}");
        buf.blank();
    }

    fn rule_call(&self, rule: &Rule) -> String {
        let unit = self.cx.unit_of(&rule.name);
        if unit == self.cx.root_unit {
            format!("{}(builder_, level_ + 1)", rule.name)
        } else {
            format!(
                "{}.{}(builder_, level_ + 1)",
                names::class_name(unit),
                rule.name
            )
        }
    }
}

/// `classHeader` names a header file; an unreadable path degrades to the
/// attribute text itself.
fn resolve_header(grammar: &Grammar) -> String {
    let Some(value) = grammar.root_attr_str("classHeader") else {
        return DEFAULT_HEADER.to_string();
    };
    match fs::read_to_string(value) {
        Ok(text) => text.trim_end().to_string(),
        Err(err) => {
            log::warn!("class header `{value}` is not readable ({err}); emitting it verbatim");
            value.to_string()
        }
    }
}
