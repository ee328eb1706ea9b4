use indoc::indoc;

use super::buffer::CodeBuffer;

#[test]
fn indents_after_open_brace() {
    let mut buf = CodeBuffer::new();
    buf.out("public class Foo {");
    buf.out("int x;");
    buf.out("}");
    assert_eq!(
        buf.finish(),
        indoc! {"
            public class Foo {
              int x;
            }
        "}
    );
}

#[test]
fn dedents_before_close_brace() {
    let mut buf = CodeBuffer::new();
    buf.out("if (a) {");
    buf.out("b();");
    buf.out("}");
    buf.out("else {");
    buf.out("c();");
    buf.out("}");
    assert_eq!(
        buf.finish(),
        indoc! {"
            if (a) {
              b();
            }
            else {
              c();
            }
        "}
    );
}

#[test]
fn nested_blocks() {
    let mut buf = CodeBuffer::new();
    buf.out("class A {");
    buf.out("void f() {");
    buf.out("while (x) {");
    buf.out("g();");
    buf.out("}");
    buf.out("}");
    buf.out("}");
    assert_eq!(
        buf.finish(),
        indoc! {"
            class A {
              void f() {
                while (x) {
                  g();
                }
              }
            }
        "}
    );
}

#[test]
fn multiline_emit_marks_continuations() {
    let mut buf = CodeBuffer::new();
    buf.out("class A {");
    buf.out("int x = 1\n+ 2;");
    buf.out("}");
    assert_eq!(
        buf.finish(),
        indoc! {"
            class A {
              int x = 1
               + 2;
            }
        "}
    );
}

#[test]
fn blank_lines_carry_no_indent() {
    let mut buf = CodeBuffer::new();
    buf.out("class A {");
    buf.blank();
    buf.out("int x;");
    buf.out("}");
    assert_eq!(buf.finish(), "class A {\n\n  int x;\n}\n");
}

#[test]
fn finish_normalizes_trailing_newlines() {
    let mut buf = CodeBuffer::new();
    buf.out("int x;");
    buf.blank();
    buf.blank();
    assert_eq!(buf.finish(), "int x;\n");
}

#[test]
fn unbalanced_close_never_underflows() {
    let mut buf = CodeBuffer::new();
    buf.out("}");
    buf.out("int x;");
    assert_eq!(buf.finish(), "}\nint x;\n");
}
