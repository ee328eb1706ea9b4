//! The expression compiler: one grammar expression tree in, one family of
//! recursive-descent parser functions out.
//!
//! Every named node gets a function `parent_<index>`; the rule's own node
//! keeps the rule name. Trivial grouping nodes emit a tail call and pass
//! their frame duties (element type, recovery, collapse) to the first
//! non-trivial descendant. Everything else emits the standard frame:
//! recursion guard, marker, combinator body, commit policy, and an error
//! recording section where pins, lookaheads, or recovery demand one.
//!
//! Compilation also accumulates the referenced simple tokens and the
//! `Parser` thunk fields (recovery targets, reified meta arguments); the
//! dispatcher reads both back after all rules of a unit are compiled.

use std::collections::VecDeque;

use bnfgen_core::{Expr, PinValue, Rule};
use indexmap::{IndexMap, IndexSet};

use super::buffer::CodeBuffer;
use super::{names, GenCx};
use crate::analyze::Inheritance;
use crate::{GenError, Result};

/// One pending function: a named node plus the rule it belongs to.
struct Frame<'a> {
    name: String,
    node: &'a Expr,
    rule: &'a Rule,
    /// Carries the rule's frame duties (set on the rule's own node and
    /// passed through trivial wrappers).
    rule_frame: bool,
}

pub(crate) struct ExprCompiler<'c, 'a> {
    cx: &'c GenCx<'a>,
    inheritance: &'c Inheritance,
    /// Unit being emitted; calls into other units are qualified.
    unit: &'c str,
    memoize: bool,
    /// Token constant to debug text, in first-reference order. Shared
    /// across units and read back by the element-type emitter.
    tokens: &'c mut IndexMap<String, String>,
    /// `Parser` fields to append at the end of the unit.
    pub(crate) fields: IndexMap<String, String>,
    /// Meta parameters of the rule currently being compiled.
    current_params: Vec<String>,
    visited: IndexSet<String>,
    queue: VecDeque<Frame<'a>>,
}

impl<'c, 'a> ExprCompiler<'c, 'a> {
    pub fn new(
        cx: &'c GenCx<'a>,
        inheritance: &'c Inheritance,
        unit: &'c str,
        tokens: &'c mut IndexMap<String, String>,
    ) -> Self {
        let memoize = cx.grammar.root_attr_bool("memoization", false);
        Self {
            cx,
            inheritance,
            unit,
            memoize,
            tokens,
            fields: IndexMap::new(),
            current_params: Vec::new(),
            visited: IndexSet::new(),
            queue: VecDeque::new(),
        }
    }

    /// Emit the function family for one rule.
    pub fn compile_rule(&mut self, rule: &'a Rule, buf: &mut CodeBuffer) -> Result<()> {
        self.current_params = self.meta_params(rule);
        self.queue.push_back(Frame {
            name: rule.name.clone(),
            node: &rule.expr,
            rule,
            rule_frame: true,
        });
        while let Some(frame) = self.queue.pop_front() {
            if !self.visited.insert(frame.name.clone()) {
                continue;
            }
            self.emit_fn(&frame, buf)?;
        }
        Ok(())
    }

    /// A meta rule's parameters: the distinct lone-head external references
    /// that resolve to neither a rule nor an earlier parameter.
    fn meta_params(&self, rule: &Rule) -> Vec<String> {
        if !self.cx.is_meta(rule) {
            return Vec::new();
        }
        let mut params = Vec::new();
        for node in rule.expr.descendants() {
            if let Expr::External(parts) = node
                && let [Expr::Reference(head)] = parts.as_slice()
                && !self.cx.rules.contains_key(head.as_str())
                && !params.contains(head)
            {
                params.push(head.clone());
            }
        }
        params
    }

    fn emit_fn(&mut self, frame: &Frame<'a>, buf: &mut CodeBuffer) -> Result<()> {
        // Trivial grouping: tail-call the child, no marker of its own.
        if let Some(child) = trivial_child(frame.node) {
            let child_name = format!("{}_0", frame.name);
            self.signature(frame, buf);
            buf.out(&format!("return {};", self.frame_call(&child_name)));
            buf.out("}");
            buf.blank();
            self.queue.push_back(Frame {
                name: child_name,
                node: child,
                rule: frame.rule,
                rule_frame: frame.rule_frame,
            });
            return Ok(());
        }

        // A call-shaped body without node duties is a plain delegation:
        // private rules with reference bodies, and reified thunk targets.
        let public_frame = frame.rule_frame && self.cx.is_public(frame.rule);
        if is_call_node(frame.node) && !public_frame {
            self.signature(frame, buf);
            let base = format!("{}_0", frame.name);
            let call = self.call_expr(frame, frame.node, base)?;
            buf.out(&format!("return {call};"));
            buf.out("}");
            buf.blank();
            return Ok(());
        }

        self.standard_frame(frame, buf)
    }

    fn standard_frame(&mut self, frame: &Frame<'a>, buf: &mut CodeBuffer) -> Result<()> {
        let rule = frame.rule;
        let name = &frame.name;
        let node = frame.node;

        let predicate = matches!(node, Expr::And(_) | Expr::Not(_));
        let seed_true = matches!(node, Expr::Optional(_) | Expr::ZeroOrMore(_));
        let pin = match node {
            Expr::Sequence(children) if children.len() > 1 => {
                self.cx.grammar.pin(rule, &node.to_string(), frame.rule_frame)
            }
            _ => None,
        };
        let has_pin = pin.is_some();

        let produces_node = frame.rule_frame && self.cx.is_public(rule) && !predicate;
        let element_type = produces_node.then(|| names::element_type(self.cx, rule));
        let collapsible = produces_node && self.inheritance.participates(&rule.name);

        let recover = frame
            .rule_frame
            .then(|| self.cx.grammar.attr_str(rule, "recoverUntil"))
            .flatten()
            .filter(|target| self.cx.rules.contains_key(*target))
            .map(str::to_string);
        let section = if recover.is_some() {
            Some("_SECTION_RECOVER_")
        } else if matches!(node, Expr::And(_)) {
            Some("_SECTION_AND_")
        } else if matches!(node, Expr::Not(_)) {
            Some("_SECTION_NOT_")
        } else if has_pin {
            Some("_SECTION_GENERAL_")
        } else {
            None
        };
        // Frames seeded true never return false; nothing to memoize.
        let memoize = self.memoize && !seed_true;

        self.signature(frame, buf);
        buf.out(&format!(
            "if (!recursion_guard_(builder_, level_, \"{name}\")) return false;"
        ));
        if memoize {
            buf.out(&format!(
                "if (memoizedFalseBranch(builder_, \"{name}\")) return false;"
            ));
        }
        buf.out(&format!("boolean result_ = {seed_true};"));
        if has_pin {
            buf.out("boolean pinned_ = false;");
        }
        if collapsible {
            buf.out("final int start_ = builder_.getCurrentOffset();");
        }
        buf.out("final Marker marker_ = builder_.mark();");
        buf.out("try {");
        if let Some(kind) = section {
            buf.out(&format!(
                "enterErrorRecordingSection(builder_, level_, {kind});"
            ));
        }
        self.body(frame, pin.as_ref(), buf)?;
        buf.out("}");
        buf.out("finally {");
        self.commit(
            predicate,
            seed_true,
            has_pin,
            collapsible,
            element_type.as_deref(),
            buf,
        );
        if let Some(kind) = section {
            let pinned = if has_pin { "pinned_" } else { "false" };
            let recover_arg = match &recover {
                Some(target) => self.recover_field(target),
                None => "null".to_string(),
            };
            buf.out(&format!(
                "result_ = exitErrorRecordingSection(builder_, result_, level_, {pinned}, {kind}, {recover_arg});"
            ));
        }
        buf.out("}");
        let result = if has_pin { "result_ || pinned_" } else { "result_" };
        if memoize {
            let failed = if has_pin {
                "!(result_ || pinned_)"
            } else {
                "!result_"
            };
            buf.out(&format!(
                "if ({failed}) memoizeFalseBranch(builder_, \"{name}\");"
            ));
        }
        buf.out(&format!("return {result};"));
        buf.out("}");
        buf.blank();
        Ok(())
    }

    fn body(&mut self, frame: &Frame<'a>, pin: Option<&PinValue>, buf: &mut CodeBuffer) -> Result<()> {
        match frame.node {
            Expr::Sequence(children) => {
                if children.is_empty() {
                    return Err(GenError::unexpected(&frame.rule.name, "empty sequence"));
                }
                let mut pinned = false;
                for (i, child) in children.iter().enumerate() {
                    let call = self.child_call(frame, child, i)?;
                    if i == 0 {
                        buf.out(&format!("result_ = {call};"));
                    } else {
                        buf.out(&format!("result_ = result_ && {call};"));
                    }
                    if !pinned
                        && pin.is_some_and(|pin| pin.hits(i, &child.to_string()))
                    {
                        buf.out("pinned_ = result_;");
                        pinned = true;
                    }
                }
            }
            Expr::Choice(children) => {
                if children.is_empty() {
                    return Err(GenError::unexpected(&frame.rule.name, "empty choice"));
                }
                for (i, child) in children.iter().enumerate() {
                    let call = self.child_call(frame, child, i)?;
                    if i == 0 {
                        buf.out(&format!("result_ = {call};"));
                    } else {
                        buf.out(&format!("if (!result_) result_ = {call};"));
                    }
                }
            }
            Expr::Optional(child) => {
                let call = self.child_call(frame, child, 0)?;
                buf.out(&format!("{call};"));
            }
            Expr::ZeroOrMore(child) => self.repetition(frame, child, false, buf)?,
            Expr::OneOrMore(child) => self.repetition(frame, child, true, buf)?,
            Expr::And(child) => {
                let call = self.child_call(frame, child, 0)?;
                buf.out(&format!("result_ = {call};"));
            }
            Expr::Not(child) => {
                let call = self.child_call(frame, child, 0)?;
                buf.out(&format!("result_ = !{call};"));
            }
            // A call-shaped body under a public rule frame.
            Expr::Reference(_)
            | Expr::StringLiteral(_)
            | Expr::NumberLiteral(_)
            | Expr::External(_) => {
                let base = format!("{}_0", frame.name);
                let call = self.call_expr(frame, frame.node, base)?;
                buf.out(&format!("result_ = {call};"));
            }
            Expr::Parenthesized(_) => {
                return Err(GenError::unexpected(
                    &frame.rule.name,
                    "grouping node reached the standard frame",
                ));
            }
        }
        Ok(())
    }

    /// The mandatory empty-progress check keeps nullable inner rules from
    /// looping forever.
    fn repetition(
        &mut self,
        frame: &Frame<'a>,
        child: &'a Expr,
        at_least_one: bool,
        buf: &mut CodeBuffer,
    ) -> Result<()> {
        let call = self.child_call(frame, child, 0)?;
        if at_least_one {
            buf.out(&format!("result_ = {call};"));
        }
        buf.out("int offset_ = builder_.getCurrentOffset();");
        buf.out("while (result_ && !builder_.eof()) {");
        buf.out(&format!("if (!{call}) break;"));
        buf.out("int next_offset_ = builder_.getCurrentOffset();");
        buf.out("if (offset_ == next_offset_) {");
        buf.out(&format!(
            "builder_.error(\"Empty element parsed in {}\");",
            frame.name
        ));
        buf.out("break;");
        buf.out("}");
        buf.out("offset_ = next_offset_;");
        buf.out("}");
        Ok(())
    }

    fn commit(
        &mut self,
        predicate: bool,
        seed_true: bool,
        has_pin: bool,
        collapsible: bool,
        element_type: Option<&str>,
        buf: &mut CodeBuffer,
    ) {
        if predicate {
            buf.out("marker_.rollbackTo();");
            return;
        }
        let success = if has_pin { "result_ || pinned_" } else { "result_" };
        let Some(element_type) = element_type else {
            // Private frame: keep the contents, never a node.
            if seed_true {
                buf.out("marker_.drop();");
            } else {
                buf.out(&format!("if ({success}) {{"));
                buf.out("marker_.drop();");
                buf.out("}");
                buf.out("else {");
                buf.out("marker_.rollbackTo();");
                buf.out("}");
            }
            return;
        };
        if collapsible {
            let guard = if has_pin {
                "(result_ || pinned_)"
            } else {
                "result_"
            };
            buf.out(&format!(
                "LighterASTNode last_ = {guard} ? builder_.getLatestDoneMarker() : null;"
            ));
            buf.out(&format!(
                "if (last_ != null && last_.getStartOffset() == start_ && type_extends_(last_.getTokenType(), {element_type})) {{"
            ));
            buf.out("marker_.drop();");
            buf.out("}");
            buf.out(&format!("else if ({success}) {{"));
            buf.out(&format!("marker_.done({element_type});"));
            buf.out("}");
            buf.out("else {");
            buf.out("marker_.rollbackTo();");
            buf.out("}");
        } else {
            buf.out(&format!("if ({success}) {{"));
            buf.out(&format!("marker_.done({element_type});"));
            buf.out("}");
            buf.out("else {");
            buf.out("marker_.rollbackTo();");
            buf.out("}");
        }
    }

    /// Call expression for child `index` of a frame.
    fn child_call(&mut self, frame: &Frame<'a>, child: &'a Expr, index: usize) -> Result<String> {
        let base = format!("{}_{index}", frame.name);
        self.call_expr(frame, child, base)
    }

    /// Call expression for an arbitrary node: inline for call-shaped nodes,
    /// a queued sub-function for everything else. `base` names whatever
    /// the node needs synthesized.
    fn call_expr(&mut self, frame: &Frame<'a>, node: &'a Expr, base: String) -> Result<String> {
        match node {
            Expr::Parenthesized(child) => self.call_expr(frame, child, base),
            Expr::Sequence(children) | Expr::Choice(children) if children.len() == 1 => {
                self.call_expr(frame, &children[0], base)
            }
            Expr::Reference(target) => self.reference_call(frame, target),
            Expr::StringLiteral(text) => Ok(self.literal_call(text)),
            Expr::NumberLiteral(text) => Ok(format!(
                "consumeToken(builder_, \"{}\")",
                names::escape_java(text)
            )),
            Expr::External(parts) => self.external_call(frame, parts, &base),
            _ => {
                self.queue.push_back(Frame {
                    name: base.clone(),
                    node,
                    rule: frame.rule,
                    rule_frame: false,
                });
                Ok(self.frame_call(&base))
            }
        }
    }

    /// A reference is a meta parameter, a rule, or a token. Never nothing.
    fn reference_call(&mut self, frame: &Frame<'a>, target: &str) -> Result<String> {
        if self.current_params.iter().any(|p| p == target) {
            return Ok(format!("{target}.parse(builder_)"));
        }
        let Some(rule) = self.cx.rules.get(target).copied() else {
            let constant = names::named_token_constant(target);
            self.tokens
                .entry(constant.clone())
                .or_insert_with(|| target.to_string());
            return Ok(format!("consumeToken(builder_, {constant})"));
        };
        if self.cx.is_external(rule) {
            return self.external_rule_call(frame, rule);
        }
        let mut args = String::from("builder_, level_ + 1");
        if rule.name == frame.rule.name {
            for param in &self.current_params {
                args.push_str(", ");
                args.push_str(param);
            }
        }
        Ok(format!("{}({args})", self.qualified(target)))
    }

    fn literal_call(&mut self, text: &str) -> String {
        match names::literal_token_constant(self.cx.grammar, text) {
            Some(constant) => {
                self.tokens
                    .entry(constant.clone())
                    .or_insert_with(|| text.to_string());
                format!("consumeToken(builder_, {constant})")
            }
            None => format!("consumeToken(builder_, \"{}\")", names::escape_java(text)),
        }
    }

    /// `<<head args...>>`: a meta parameter, a meta rule, or an external
    /// parser function.
    fn external_call(&mut self, frame: &Frame<'a>, parts: &'a [Expr], base: &str) -> Result<String> {
        let Some((head, args)) = parts.split_first() else {
            return Err(GenError::unexpected(
                &frame.rule.name,
                "external expression with no head",
            ));
        };
        let Expr::Reference(head_name) = head else {
            return Err(GenError::unexpected(
                &frame.rule.name,
                format!("external head `{head}` is not a reference"),
            ));
        };
        if self.current_params.contains(head_name) {
            return Ok(format!("{head_name}.parse(builder_)"));
        }
        let mut call_args = String::from("builder_, level_ + 1");
        for (j, arg) in args.iter().enumerate() {
            let rendered = self.external_arg(frame, arg, format!("{base}_{j}"))?;
            call_args.push_str(", ");
            call_args.push_str(&rendered);
        }
        let callee = match self.cx.rules.get(head_name.as_str()) {
            Some(_) => self.qualified(head_name),
            None => head_name.clone(),
        };
        Ok(format!("{callee}({call_args})"))
    }

    /// A call through an `external` rule goes straight to its body.
    fn external_rule_call(&mut self, frame: &Frame<'a>, rule: &'a Rule) -> Result<String> {
        match &rule.expr {
            Expr::External(parts) => {
                let base = format!("{}_0", rule.name);
                self.external_call(frame, parts, &base)
            }
            Expr::Reference(function) => Ok(format!("{function}(builder_, level_ + 1)")),
            other => Err(GenError::unexpected(
                &rule.name,
                format!("external rule body `{other}` is not a call"),
            )),
        }
    }

    /// Reify one argument of an external or meta call.
    fn external_arg(&mut self, frame: &Frame<'a>, arg: &'a Expr, base: String) -> Result<String> {
        match arg {
            Expr::Reference(r) if self.current_params.contains(r) => Ok(r.clone()),
            Expr::Reference(r) => {
                if let Some(rule) = self.cx.rules.get(r.as_str()).copied() {
                    if self.cx.is_external(rule) {
                        return self.thunk(frame, arg, base);
                    }
                    let field = format!("{r}_parser_");
                    let call = format!("{}(builder_, 0)", self.qualified(r));
                    self.fields.entry(field.clone()).or_insert(call);
                    Ok(field)
                } else {
                    let constant = names::named_token_constant(r);
                    self.tokens
                        .entry(constant.clone())
                        .or_insert_with(|| r.to_string());
                    let field = format!("{r}_parser_");
                    let call = format!("consumeToken(builder_, {constant})");
                    self.fields.entry(field.clone()).or_insert(call);
                    Ok(field)
                }
            }
            Expr::StringLiteral(text) => Ok(format!("\"{}\"", names::escape_java(text))),
            Expr::NumberLiteral(text) => Ok(text.clone()),
            _ => self.thunk(frame, arg, base),
        }
    }

    /// Reify an expression as a parser thunk: a synthesized frame plus
    /// either a shared static field or, inside a meta rule, an inline
    /// anonymous parser that can see the parameters.
    fn thunk(&mut self, frame: &Frame<'a>, node: &'a Expr, base: String) -> Result<String> {
        self.queue.push_back(Frame {
            name: base.clone(),
            node,
            rule: frame.rule,
            rule_frame: false,
        });
        if self.current_params.is_empty() {
            let field = format!("{base}_parser_");
            self.fields
                .entry(field.clone())
                .or_insert(format!("{base}(builder_, 0)"));
            Ok(field)
        } else {
            let mut args = String::from("builder_, 0");
            for param in &self.current_params {
                args.push_str(", ");
                args.push_str(param);
            }
            Ok(format!(
                "new Parser() {{ public boolean parse(PsiBuilder builder_) {{ return {base}({args}); }} }}"
            ))
        }
    }

    /// Field holding the recovery parser for `recoverUntil`.
    fn recover_field(&mut self, target: &str) -> String {
        let field = format!("{target}_recover_parser_");
        let call = format!("{}(builder_, 0)", self.qualified(target));
        self.fields.entry(field.clone()).or_insert(call);
        field
    }

    /// Call to a frame of the current rule, parameters threaded.
    fn frame_call(&self, name: &str) -> String {
        let mut args = String::from("builder_, level_ + 1");
        for param in &self.current_params {
            args.push_str(", ");
            args.push_str(param);
        }
        format!("{name}({args})")
    }

    /// Rule function reference, qualified when it lives in another unit.
    fn qualified(&self, rule_name: &str) -> String {
        let unit = self.cx.unit_of(rule_name);
        if unit == self.unit {
            rule_name.to_string()
        } else {
            format!("{}.{rule_name}", names::class_name(unit))
        }
    }

    fn signature(&self, frame: &Frame<'_>, buf: &mut CodeBuffer) {
        let visibility = if frame.rule_frame {
            if self.cx.is_private(frame.rule) {
                "static"
            } else {
                "public static"
            }
        } else {
            "private static"
        };
        let mut params = String::from("PsiBuilder builder_, int level_");
        for param in &self.current_params {
            params.push_str(&format!(", final Parser {param}"));
        }
        buf.out(&format!(
            "{visibility} boolean {}({params}) {{",
            frame.name
        ));
    }
}

/// Single-child grouping that never opens a marker.
fn trivial_child(node: &Expr) -> Option<&Expr> {
    match node {
        Expr::Parenthesized(child) => Some(child),
        Expr::Sequence(children) | Expr::Choice(children) if children.len() == 1 => {
            Some(&children[0])
        }
        _ => None,
    }
}

/// Nodes that compile to a single call expression.
fn is_call_node(node: &Expr) -> bool {
    matches!(
        node,
        Expr::Reference(_) | Expr::StringLiteral(_) | Expr::NumberLiteral(_) | Expr::External(_)
    )
}
