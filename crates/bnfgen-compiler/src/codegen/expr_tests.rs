use bnfgen_core::{Attrs, Expr, Grammar, Rule};
use indoc::indoc;

use crate::test_utils::{count, indent, root_parser};

#[test]
fn simple_choice_emits_marker_frame() {
    let grammar = Grammar::new(vec![Rule::new(
        "root",
        Expr::choice(vec![Expr::literal("a"), Expr::literal("b")]),
    )]);
    let parser = root_parser(&grammar);
    let expected = indent(
        indoc! {r#"
            public static boolean root(PsiBuilder builder_, int level_) {
              if (!recursion_guard_(builder_, level_, "root")) return false;
              boolean result_ = false;
              final Marker marker_ = builder_.mark();
              try {
                result_ = consumeToken(builder_, A_);
                if (!result_) result_ = consumeToken(builder_, B_);
              }
              finally {
                if (result_) {
                  marker_.done(ROOT);
                }
                else {
                  marker_.rollbackTo();
                }
              }
              return result_;
            }
        "#},
        2,
    );
    assert!(
        parser.contains(&expected),
        "expected frame not found in:\n{parser}"
    );
}

#[test]
fn sequence_with_integer_pin() {
    let grammar = Grammar::new(vec![
        Rule::with_attrs(
            "stmt",
            Expr::sequence(vec![
                Expr::literal("if"),
                Expr::reference("cond"),
                Expr::literal("then"),
                Expr::reference("body"),
            ]),
            Attrs::new().set("pin", 2i64),
        ),
        Rule::new("cond", Expr::reference("identifier")),
        Rule::new("body", Expr::reference("identifier")),
    ]);
    let parser = root_parser(&grammar);

    // The pin lands right after the second child, exactly once.
    let expected = indent(
        indoc! {r#"
            result_ = consumeToken(builder_, IF_);
            result_ = result_ && cond(builder_, level_ + 1);
            pinned_ = result_;
            result_ = result_ && consumeToken(builder_, THEN_);
            result_ = result_ && body(builder_, level_ + 1);
        "#},
        6,
    );
    assert!(parser.contains(&expected), "pin placement wrong in:\n{parser}");
    assert_eq!(count(&parser, "pinned_ = result_;"), 1);

    // A pinned frame reports through the general section and commits on
    // either flag.
    assert!(parser.contains("boolean pinned_ = false;"));
    assert!(parser.contains("enterErrorRecordingSection(builder_, level_, _SECTION_GENERAL_);"));
    assert!(parser.contains(
        "result_ = exitErrorRecordingSection(builder_, result_, level_, pinned_, _SECTION_GENERAL_, null);"
    ));
    assert!(parser.contains("if (result_ || pinned_) {"));
    assert!(parser.contains("return result_ || pinned_;"));
}

#[test]
fn pin_applies_at_most_once_with_pattern() {
    let grammar = Grammar::new(vec![
        Rule::with_attrs(
            "pair",
            Expr::sequence(vec![
                Expr::reference("key"),
                Expr::reference("key"),
                Expr::reference("key"),
            ]),
            Attrs::new().set("pin", "key"),
        ),
        Rule::new("key", Expr::reference("identifier")),
    ]);
    let parser = root_parser(&grammar);
    assert_eq!(count(&parser, "pinned_ = result_;"), 1);
}

#[test]
fn zero_or_more_guards_empty_progress() {
    let grammar = Grammar::new(vec![
        Rule::new("list", Expr::zero_or_more(Expr::reference("item"))),
        Rule::new("item", Expr::reference("identifier")),
    ]);
    let parser = root_parser(&grammar);
    let expected = indent(
        indoc! {r#"
            public static boolean list(PsiBuilder builder_, int level_) {
              if (!recursion_guard_(builder_, level_, "list")) return false;
              boolean result_ = true;
              final Marker marker_ = builder_.mark();
              try {
                int offset_ = builder_.getCurrentOffset();
                while (result_ && !builder_.eof()) {
                  if (!item(builder_, level_ + 1)) break;
                  int next_offset_ = builder_.getCurrentOffset();
                  if (offset_ == next_offset_) {
                    builder_.error("Empty element parsed in list");
                    break;
                  }
                  offset_ = next_offset_;
                }
              }
              finally {
                if (result_) {
                  marker_.done(LIST);
                }
                else {
                  marker_.rollbackTo();
                }
              }
              return result_;
            }
        "#},
        2,
    );
    assert!(parser.contains(&expected), "loop frame wrong in:\n{parser}");
}

#[test]
fn one_or_more_seeds_then_loops() {
    let grammar = Grammar::new(vec![
        Rule::new("list", Expr::one_or_more(Expr::reference("item"))),
        Rule::new("item", Expr::reference("identifier")),
    ]);
    let parser = root_parser(&grammar);
    assert!(parser.contains("result_ = item(builder_, level_ + 1);"));
    assert!(parser.contains("while (result_ && !builder_.eof()) {"));
    assert!(parser.contains("if (!item(builder_, level_ + 1)) break;"));
    // Seeded by the first match, not by default.
    assert!(parser.contains("boolean result_ = false;"));
}

#[test]
fn every_repetition_checks_offsets() {
    let grammar = Grammar::new(vec![
        Rule::new(
            "root",
            Expr::sequence(vec![
                Expr::zero_or_more(Expr::reference("a")),
                Expr::one_or_more(Expr::reference("b")),
            ]),
        ),
        Rule::new("a", Expr::reference("identifier")),
        Rule::new("b", Expr::reference("identifier")),
    ]);
    let parser = root_parser(&grammar);
    assert_eq!(count(&parser, "while (result_ && !builder_.eof()) {"), 2);
    assert_eq!(count(&parser, "if (offset_ == next_offset_) {"), 2);
}

#[test]
fn collapse_inspects_latest_done_marker() {
    let grammar = Grammar::new(vec![
        Rule::new("expr", Expr::reference("addExpr")),
        Rule::with_attrs(
            "addExpr",
            Expr::sequence(vec![
                Expr::reference("mulExpr"),
                Expr::literal("+"),
                Expr::reference("mulExpr"),
            ]),
            Attrs::new().set("extends", "expr"),
        ),
        Rule::new("mulExpr", Expr::reference("number")),
    ]);
    let parser = root_parser(&grammar);

    let expected = indent(
        indoc! {r#"
            public static boolean expr(PsiBuilder builder_, int level_) {
              if (!recursion_guard_(builder_, level_, "expr")) return false;
              boolean result_ = false;
              final int start_ = builder_.getCurrentOffset();
              final Marker marker_ = builder_.mark();
              try {
                result_ = addExpr(builder_, level_ + 1);
              }
              finally {
                LighterASTNode last_ = result_ ? builder_.getLatestDoneMarker() : null;
                if (last_ != null && last_.getStartOffset() == start_ && type_extends_(last_.getTokenType(), EXPR)) {
                  marker_.drop();
                }
                else if (result_) {
                  marker_.done(EXPR);
                }
                else {
                  marker_.rollbackTo();
                }
              }
              return result_;
            }
        "#},
        2,
    );
    assert!(parser.contains(&expected), "collapse frame wrong in:\n{parser}");

    // Both sides of the edge collapse; the sub rule checks its own type.
    assert!(parser.contains("type_extends_(last_.getTokenType(), ADD_EXPR)"));
    // The unit imports what the collapse check reads.
    assert!(parser.contains("import com.intellij.lang.LighterASTNode;"));
}

#[test]
fn meta_rule_takes_parser_parameters() {
    let grammar = Grammar::new(vec![
        Rule::new(
            "root",
            Expr::external(vec![Expr::reference("commaList"), Expr::reference("expr")]),
        ),
        Rule::with_attrs(
            "commaList",
            Expr::sequence(vec![
                Expr::external(vec![Expr::reference("p")]),
                Expr::zero_or_more(Expr::sequence(vec![
                    Expr::literal(","),
                    Expr::external(vec![Expr::reference("p")]),
                ])),
            ]),
            Attrs::new().set("meta", true),
        ),
        Rule::new("expr", Expr::reference("identifier")),
    ]);
    let parser = root_parser(&grammar);

    // The parameter is a formal on the rule and every inner frame.
    assert!(parser.contains(
        "public static boolean commaList(PsiBuilder builder_, int level_, final Parser p) {"
    ));
    assert!(parser.contains(
        "private static boolean commaList_1(PsiBuilder builder_, int level_, final Parser p) {"
    ));
    assert!(parser.contains("result_ = p.parse(builder_);"));
    assert!(parser.contains("result_ = result_ && commaList_1(builder_, level_ + 1, p);"));

    // The call site reifies the argument as a shared parser thunk.
    assert!(parser.contains("result_ = commaList(builder_, level_ + 1, expr_parser_);"));
    assert!(parser.contains("static final Parser expr_parser_ = new Parser() {"));
    assert!(parser.contains("return expr(builder_, 0);"));
}

#[test]
fn negative_lookahead_with_recovery() {
    let grammar = Grammar::new(vec![
        Rule::with_attrs(
            "decl",
            Expr::sequence(vec![
                Expr::not(Expr::literal("}")),
                Expr::reference("keyword"),
                Expr::reference("name"),
            ]),
            Attrs::new().set("recoverUntil", "stmtEnd"),
        ),
        Rule::new("stmtEnd", Expr::literal(";")),
    ]);
    let parser = root_parser(&grammar);

    // The rule frame records through the recovery section and hands the
    // exit a thunk for the synchronization rule.
    assert!(parser.contains("enterErrorRecordingSection(builder_, level_, _SECTION_RECOVER_);"));
    assert!(parser.contains(
        "result_ = exitErrorRecordingSection(builder_, result_, level_, false, _SECTION_RECOVER_, stmtEnd_recover_parser_);"
    ));
    assert!(parser.contains("static final Parser stmtEnd_recover_parser_ = new Parser() {"));
    assert!(parser.contains("return stmtEnd(builder_, 0);"));

    // The lookahead sub-frame rolls back unconditionally and negates.
    let expected = indent(
        indoc! {r#"
            private static boolean decl_0(PsiBuilder builder_, int level_) {
              if (!recursion_guard_(builder_, level_, "decl_0")) return false;
              boolean result_ = false;
              final Marker marker_ = builder_.mark();
              try {
                enterErrorRecordingSection(builder_, level_, _SECTION_NOT_);
                result_ = !consumeToken(builder_, "}");
              }
              finally {
                marker_.rollbackTo();
                result_ = exitErrorRecordingSection(builder_, result_, level_, false, _SECTION_NOT_, null);
              }
              return result_;
            }
        "#},
        2,
    );
    assert!(parser.contains(&expected), "lookahead frame wrong in:\n{parser}");
}

#[test]
fn positive_lookahead_rolls_back_without_negation() {
    let grammar = Grammar::new(vec![Rule::new(
        "root",
        Expr::sequence(vec![Expr::and(Expr::literal("fn")), Expr::reference("name")]),
    )]);
    let parser = root_parser(&grammar);
    assert!(parser.contains("enterErrorRecordingSection(builder_, level_, _SECTION_AND_);"));
    assert!(parser.contains("result_ = consumeToken(builder_, FN_);"));
    assert!(parser.contains("marker_.rollbackTo();"));
    assert!(!parser.contains("result_ = !consumeToken(builder_, FN_);"));
}

#[test]
fn optional_discards_child_result() {
    let grammar = Grammar::new(vec![
        Rule::new(
            "root",
            Expr::sequence(vec![
                Expr::reference("item"),
                Expr::optional(Expr::reference("tail")),
            ]),
        ),
        Rule::new("item", Expr::reference("identifier")),
        Rule::new("tail", Expr::reference("identifier")),
    ]);
    let parser = root_parser(&grammar);
    // The optional frame seeds true, calls for effect, and always drops.
    assert!(parser.contains("tail(builder_, level_ + 1);"));
    assert!(parser.contains("boolean result_ = true;"));
    assert!(parser.contains("marker_.drop();"));
}

#[test]
fn trivial_grouping_tail_calls_without_marker() {
    let grammar = Grammar::new(vec![Rule::new(
        "root",
        Expr::parenthesized(Expr::choice(vec![
            Expr::literal("a"),
            Expr::literal("b"),
        ])),
    )]);
    let parser = root_parser(&grammar);
    assert!(parser.contains("return root_0(builder_, level_ + 1);"));
    // The frame duties pass through: the child function owns the node.
    assert!(parser.contains("public static boolean root_0(PsiBuilder builder_, int level_) {"));
    assert!(parser.contains("marker_.done(ROOT);"));
}

#[test]
fn private_reference_body_delegates_directly() {
    let grammar = Grammar::new(vec![
        Rule::new("root", Expr::reference("inner")),
        Rule::with_attrs(
            "inner",
            Expr::reference("item"),
            Attrs::new().set("private", true),
        ),
        Rule::new("item", Expr::reference("identifier")),
    ]);
    let parser = root_parser(&grammar);
    let expected = indent(
        indoc! {"
            static boolean inner(PsiBuilder builder_, int level_) {
              return item(builder_, level_ + 1);
            }
        "},
        2,
    );
    assert!(parser.contains(&expected), "delegation wrong in:\n{parser}");
}

#[test]
fn private_frames_drop_instead_of_done() {
    let grammar = Grammar::new(vec![
        Rule::new("root", Expr::reference("inner")),
        Rule::with_attrs(
            "inner",
            Expr::choice(vec![Expr::literal("a"), Expr::literal("b")]),
            Attrs::new().set("private", true),
        ),
    ]);
    let parser = root_parser(&grammar);
    // The private frame still marks for rollback but never names a node.
    assert!(!parser.contains("marker_.done(INNER);"));
    assert!(parser.contains("marker_.drop();"));
    assert!(parser.contains("static boolean inner(PsiBuilder builder_, int level_) {"));
}

#[test]
fn unknown_references_become_token_consumption() {
    let grammar = Grammar::new(vec![Rule::new(
        "root",
        Expr::sequence(vec![
            Expr::reference("identifier"),
            Expr::literal("("),
            Expr::number("42"),
        ]),
    )]);
    let parser = root_parser(&grammar);
    assert!(parser.contains("consumeToken(builder_, IDENTIFIER)"));
    // Unaliased punctuation and numbers match textually.
    assert!(parser.contains("consumeToken(builder_, \"(\")"));
    assert!(parser.contains("consumeToken(builder_, \"42\")"));
}

#[test]
fn aliased_literal_uses_root_attribute_name() {
    let grammar = Grammar::with_attrs(
        vec![Rule::new(
            "root",
            Expr::sequence(vec![Expr::literal("("), Expr::literal(")")]),
        )],
        Attrs::new().set("LEFT_PAREN", "(").set("RIGHT_PAREN", ")"),
    );
    let parser = root_parser(&grammar);
    assert!(parser.contains("consumeToken(builder_, LEFT_PAREN)"));
    assert!(parser.contains("consumeToken(builder_, RIGHT_PAREN)"));
}

#[test]
fn memoization_brackets_failing_frames() {
    let grammar = Grammar::with_attrs(
        vec![Rule::new(
            "root",
            Expr::choice(vec![Expr::literal("a"), Expr::literal("b")]),
        )],
        Attrs::new().set("memoization", true),
    );
    let parser = root_parser(&grammar);
    assert!(parser.contains("if (memoizedFalseBranch(builder_, \"root\")) return false;"));
    assert!(parser.contains("if (!result_) memoizeFalseBranch(builder_, \"root\");"));
}

#[test]
fn marker_operations_balance_per_function() {
    let grammar = Grammar::new(vec![
        Rule::with_attrs(
            "stmt",
            Expr::sequence(vec![
                Expr::literal("if"),
                Expr::reference("cond"),
                Expr::optional(Expr::reference("body")),
                Expr::zero_or_more(Expr::reference("tail")),
                Expr::not(Expr::literal(";")),
            ]),
            Attrs::new().set("pin", 1i64),
        ),
        Rule::new("cond", Expr::reference("identifier")),
        Rule::new("body", Expr::reference("identifier")),
        Rule::new("tail", Expr::reference("identifier")),
    ]);
    let parser = root_parser(&grammar);
    // `parse` opens one top-level marker closed by done(root_); every
    // other mark belongs to a frame with its own commit block.
    let marks = count(&parser, "builder_.mark();");
    let frame_marks = count(&parser, "final Marker marker_ = builder_.mark();");
    assert_eq!(marks, frame_marks + 1);
    let commits = count(&parser, "marker_.done(")
        + count(&parser, "marker_.drop();")
        + count(&parser, "marker_.rollbackTo();");
    assert!(commits >= frame_marks);
}
