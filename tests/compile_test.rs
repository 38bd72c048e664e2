// End-to-end pipeline tests: X source in, C lines out.

use xc::analyzer::analyze;
use xc::emitter::emit;
use xc::error::{CompileError, CompileResult};
use xc::parser::parse;
use xc::source::SourceFile;
use xc::tokenizer::tokenize;

/// Run the whole pipeline on in-memory text.
fn compile_text(text: &str) -> CompileResult<SourceFile> {
    let source = SourceFile::from_text("test.x", text);
    let tokens = tokenize(&source)?;
    let program = parse(&source, &tokens)?;
    let types = analyze(&source, &program)?;
    emit(&program, &types, &source.filename)
}

fn compile_lines(text: &str) -> Vec<String> {
    compile_text(text)
        .expect("compilation failed")
        .content
        .iter()
        .map(|line| line.trim_end().to_string())
        .collect()
}

#[test]
fn test_minimal_program() {
    let lines = compile_lines("int main(void) { return 0; }");

    assert!(lines.contains(&"int32_t main(void)".to_string()));
    assert!(lines.contains(&"    return 0;".to_string()));
}

#[test]
fn test_struct_with_method() {
    let lines = compile_lines(
        "struct Pt { int x; int y; } int Pt::sum(void) { return self.x + self.y; }",
    );

    assert!(lines.contains(&"typedef struct Pt Pt;".to_string()));
    assert!(lines.contains(&"int32_t Pt_sum(Pt* self);".to_string()));
    assert!(lines.contains(&"struct Pt".to_string()));
    assert!(lines.contains(&"    int32_t x;".to_string()));
    assert!(lines.contains(&"    int32_t y;".to_string()));
    assert!(lines.contains(&"    return (((*self).x) + ((*self).y));".to_string()));
}

#[test]
fn test_self_referencing_struct_fails_semantic_analysis() {
    let result = compile_text("struct X { X inner; } int main(void) { return 0; }");

    assert!(matches!(result, Err(CompileError::Analyze { .. })));
}

#[test]
fn test_for_loop_variable_escapes_the_loop() {
    let lines =
        compile_lines("int f(void) { for (int i = 0; i < 10; i += 1) { break; } return i; }");

    assert!(lines.contains(&"    for (int32_t i = 0;(i < 10);(i += 1))".to_string()));
    assert!(lines.contains(&"        break;".to_string()));
    assert!(lines.contains(&"    return i;".to_string()));
}

#[test]
fn test_returning_null_from_int_function_fails() {
    let result = compile_text("int g(void) { return null; }");

    assert!(matches!(result, Err(CompileError::Analyze { .. })));
}

#[test]
fn test_octal_literal_is_rewritten() {
    let lines = compile_lines("int main(void) { int x = 0o17; return x; }");

    assert!(lines.contains(&"    int32_t x = 0017;".to_string()));
}

#[test]
fn test_empty_source_emits_only_the_preamble() {
    let code = compile_text("").expect("compilation failed");
    let text = code.content.concat();

    assert!(text.contains("#include <stdint.h>"));
    assert!(text.contains("#include <stdbool.h>"));
    assert!(text.contains("#include <stdlib.h>"));
    assert!(text.contains("#include <stddef.h>"));
    assert!(!text.contains("struct"));
    assert!(!text.contains("("));
}

#[test]
fn test_null_assignment_to_reference() {
    let lines = compile_lines(
        "struct Node { &Node next; } void clear(&Node n) { n.next = null; } int main(void) { return 0; }",
    );

    assert!(lines.contains(&"void clear(Node* n);".to_string()));
    assert!(lines.contains(&"    (((*n).next) = NULL);".to_string()));
}

#[test]
fn test_reference_parameters_auto_deref() {
    let lines = compile_lines(
        "struct Pt { int x; int y; } \
         int read_x(&Pt p) { return p.x; } \
         int main(void) { Pt q; return read_x(&q); }",
    );

    assert!(lines.contains(&"int32_t read_x(Pt* p);".to_string()));
    assert!(lines.contains(&"    return ((*p).x);".to_string()));
    assert!(lines.contains(&"    return read_x((&q));".to_string()));
}

#[test]
fn test_method_receiver_address() {
    let lines = compile_lines(
        "struct Counter { int value; } \
         void Counter::bump(int by) { self.value += by; } \
         int main(void) { Counter c; c.bump(2); return 0; }",
    );

    assert!(lines.contains(&"void Counter_bump(Counter* self, int32_t by);".to_string()));
    assert!(lines.contains(&"    Counter_bump(&c, 2);".to_string()));
    assert!(lines.contains(&"    (((*self).value) += by);".to_string()));
}

#[test]
fn test_boolean_xor_collapses_to_bitwise() {
    let lines = compile_lines("bool f(bool a, bool b) { return a ^^ b; }");

    assert!(lines.contains(&"    return (a ^ b);".to_string()));
}

#[test]
fn test_equivalent_programs_emit_identical_output() {
    let compact = compile_lines("int add(int a, int b) { return a + b; }");
    let airy = compile_lines(
        "// adds two numbers\nint add(int a, /* left */ int b)\n{\n    return a + b; // sum\n}\n",
    );

    assert_eq!(compact, airy);
}

#[test]
fn test_lexical_errors_stop_the_pipeline() {
    assert!(matches!(
        compile_text("int main(void) { int x = 0b102; return x; }"),
        Err(CompileError::Tokenize { .. })
    ));
}

#[test]
fn test_syntax_errors_stop_the_pipeline() {
    assert!(matches!(
        compile_text("int main(void) { return 0 }"),
        Err(CompileError::Parse { .. })
    ));
}

#[test]
fn test_multiple_semantic_errors_are_counted() {
    let result = compile_text(
        "int main(void) { int x = ghost; int y = phantom; return x + y; }",
    );

    assert!(matches!(result, Err(CompileError::Analyze { count }) if count >= 2));
}

#[test]
fn test_declaration_order_is_preserved() {
    let lines = compile_lines(
        "struct B { int b; } struct A { int a; } int main(void) { return 0; }",
    );

    let b_index = lines
        .iter()
        .position(|line| line == "typedef struct B B;")
        .expect("typedef for B missing");
    let a_index = lines
        .iter()
        .position(|line| line == "typedef struct A A;")
        .expect("typedef for A missing");

    assert!(b_index < a_index);
}
