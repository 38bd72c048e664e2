//! C code generation.
//!
//! Takes a validated program plus the analyzer's type map and produces a C
//! translation unit, section by section:
//!
//! 1. header comment and includes
//! 2. `typedef struct S S;` per struct
//! 3. function prototypes
//! 4. struct definitions
//! 5. function bodies
//!
//! All sections iterate in declaration order, so two semantically equal
//! programs produce byte-identical output.
//!
//! Expressions are emitted fully parenthesised; precedence was already
//! decided by the parser and the C compiler just reads it back. An
//! identifier whose evaluated type is a reference loads through `(*name)`,
//! which keeps plain member access (`.`) and value semantics identical on
//! both sides of the translation.

use crate::analyzer::TypeMap;
use crate::ast::{
    BlockStatement, Conditional, DataType, Declaration, ElseBranch, Expression, Function, Program,
    Statement, Structure, VariableDeclaration,
};
use crate::error::{CompileError, CompileResult};
use crate::source::SourceFile;
use crate::token::TokenKind;

/// Translate `program` into a C source buffer named `<input>.c`.
pub fn emit(program: &Program, types: &TypeMap, input_filename: &str) -> CompileResult<SourceFile> {
    let mut emitter = CEmitter {
        program,
        types,
        code: SourceFile {
            filename: format!("{input_filename}.c"),
            content: Vec::new(),
        },
        indentation: 0,
        has_error: false,
    };

    emitter.generate();

    if emitter.has_error {
        Err(CompileError::Emit)
    } else {
        Ok(emitter.code)
    }
}

struct CEmitter<'a> {
    program: &'a Program,
    types: &'a TypeMap,
    code: SourceFile,
    indentation: usize,
    has_error: bool,
}

impl<'a> CEmitter<'a> {
    fn generate(&mut self) {
        self.write_line("// -- AUTO-GENERATED CODE -- ");
        self.write_line("");

        self.write_line("#include <stdint.h>");
        self.write_line("#include <stdbool.h>");
        self.write_line("#include <stdlib.h>");
        self.write_line("#include <stddef.h>");
        self.write_line("");

        self.generate_structure_declarations();
        self.generate_function_declarations();
        self.generate_structure_implementations();
        self.generate_function_implementations();

        self.write_line("// -- END OF AUTO-GENERATED CODE -- ");
    }

    fn structures(&self) -> impl Iterator<Item = &'a Structure> {
        let program = self.program;
        program
            .declarations
            .iter()
            .filter_map(|declaration| match declaration {
                Declaration::Structure(structure) => Some(structure),
                _ => None,
            })
    }

    fn functions(&self) -> impl Iterator<Item = &'a Function> {
        let program = self.program;
        program
            .declarations
            .iter()
            .filter_map(|declaration| match declaration {
                Declaration::Function(function) => Some(function),
                _ => None,
            })
    }

    fn generate_structure_declarations(&mut self) {
        for structure in self.structures() {
            self.write_line(&format!("typedef struct {0} {0};", structure.name.lexeme));
        }
        self.write_line("");
    }

    fn generate_function_declarations(&mut self) {
        for function in self.functions() {
            let signature = self.translate_function_signature(function);
            self.write_line(&format!("{signature};"));
        }
        self.write_line("");
    }

    fn generate_structure_implementations(&mut self) {
        for structure in self.structures() {
            self.write_line(&format!("struct {}", structure.name.lexeme));
            self.write_line("{");
            self.indentation += 1;

            for member in &structure.members {
                let member_type = self.translate_data_type(Some(&member.data_type));
                self.write_line(&format!("{} {};", member_type, member.name.lexeme));
            }

            self.indentation -= 1;
            self.write_line("};");
            self.write_line("");
        }
        self.write_line("");
    }

    fn generate_function_implementations(&mut self) {
        for function in self.functions() {
            let signature = self.translate_function_signature(function);
            self.write_line(&signature);
            self.generate_block(&function.body);
            self.write_line("");
        }
        self.write_line("");
    }

    fn generate_block(&mut self, block: &BlockStatement) {
        self.write_line("{");
        self.indentation += 1;

        for statement in &block.statements {
            self.generate_statement(statement);
        }

        self.indentation -= 1;
        self.write_line("}");
    }

    fn generate_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Expression(expression) => {
                let line = self.translate_expression(expression);
                self.write_line(&format!("{line};"));
            }
            Statement::VariableDeclaration(declaration) => {
                let line = self.translate_variable_declaration(declaration);
                self.write_line(&format!("{line};"));
            }
            Statement::Conditional(conditional) => self.generate_conditional(conditional),
            Statement::While(iteration) => {
                let condition = self.translate_expression(&iteration.condition);
                self.write_line(&format!("while ({condition})"));
                self.generate_block(&iteration.body);
            }
            Statement::For(iteration) => {
                let initial = iteration
                    .initial
                    .as_ref()
                    .map(|declaration| self.translate_variable_declaration(declaration))
                    .unwrap_or_default();
                let condition = iteration
                    .condition
                    .as_ref()
                    .map(|expression| self.translate_expression(expression))
                    .unwrap_or_default();
                let update = iteration
                    .update
                    .as_ref()
                    .map(|expression| self.translate_expression(expression))
                    .unwrap_or_default();

                self.write_line(&format!("for ({initial};{condition};{update})"));
                self.generate_block(&iteration.body);
            }
            Statement::Return(Some(expression)) => {
                let value = self.translate_expression(expression);
                self.write_line(&format!("return {value};"));
            }
            Statement::Return(None) => self.write_line("return;"),
            Statement::Break => self.write_line("break;"),
            Statement::Continue => self.write_line("continue;"),
        }
    }

    fn generate_conditional(&mut self, conditional: &Conditional) {
        let condition = self.translate_expression(&conditional.condition);
        self.write_line(&format!("if ({condition})"));
        self.generate_block(&conditional.body);

        match &conditional.else_case {
            Some(ElseBranch::Block(block)) => {
                self.write_line("else");
                self.generate_block(block);
            }
            Some(ElseBranch::If(nested)) => {
                self.write_line("else");
                self.generate_conditional(nested);
            }
            None => {}
        }
    }

    // ===== Translations =====

    fn translate_data_type(&mut self, data_type: Option<&DataType>) -> String {
        let Some(data_type) = data_type else {
            return "void".to_string();
        };

        let mut translated = match data_type.type_name.kind {
            TokenKind::Bool => "bool".to_string(),
            TokenKind::Byte => "int8_t".to_string(),
            TokenKind::Short => "int16_t".to_string(),
            TokenKind::Int => "int32_t".to_string(),
            TokenKind::Long => "int64_t".to_string(),
            TokenKind::Float => "float".to_string(),
            TokenKind::Double => "double".to_string(),
            TokenKind::Identifier => data_type.type_name.lexeme.clone(),
            _ => self.error(),
        };

        if data_type.is_reference {
            translated.push('*');
        }

        translated
    }

    fn translate_function_signature(&mut self, function: &Function) -> String {
        let return_type = self.translate_data_type(function.return_type.as_ref());

        let name = match &function.owner {
            Some(owner) => format!("{}_{}", owner.lexeme, function.name.lexeme),
            None => function.name.lexeme.clone(),
        };

        let mut parameters = Vec::new();

        if let Some(owner) = &function.owner {
            parameters.push(format!("{}* self", owner.lexeme));
        }

        for parameter in &function.parameters {
            let parameter_type = self.translate_data_type(Some(&parameter.data_type));
            parameters.push(format!("{} {}", parameter_type, parameter.name.lexeme));
        }

        let parameters = if parameters.is_empty() {
            "void".to_string()
        } else {
            parameters.join(", ")
        };

        format!("{return_type} {name}({parameters})")
    }

    fn translate_expression(&mut self, expression: &Expression) -> String {
        match expression {
            Expression::PrefixUnary {
                operator, operand, ..
            } => {
                let operator = match operator.kind {
                    TokenKind::PlusPlus => "++",
                    TokenKind::MinusMinus => "--",
                    TokenKind::Bang => "!",
                    TokenKind::Tilde => "~",
                    TokenKind::Minus => "-",
                    TokenKind::Amp => "&",
                    _ => return self.error(),
                };

                format!("({}{})", operator, self.translate_expression(operand))
            }
            Expression::PostfixUnary {
                operator, operand, ..
            } => {
                let operator = match operator.kind {
                    TokenKind::PlusPlus => "++",
                    TokenKind::MinusMinus => "--",
                    _ => return self.error(),
                };

                format!("({}{})", self.translate_expression(operand), operator)
            }
            Expression::Binary {
                operator,
                left,
                right,
                ..
            } => {
                let operator = match operator.kind {
                    TokenKind::Plus => "+",
                    TokenKind::Minus => "-",
                    TokenKind::Star => "*",
                    TokenKind::Slash => "/",
                    TokenKind::Percent => "%",
                    TokenKind::Amp => "&",
                    TokenKind::Pipe => "|",
                    TokenKind::Caret => "^",
                    TokenKind::LtLt => "<<",
                    TokenKind::GtGt => ">>",
                    TokenKind::EqEq => "==",
                    TokenKind::NotEq => "!=",
                    TokenKind::Lt => "<",
                    TokenKind::Le => "<=",
                    TokenKind::Gt => ">",
                    TokenKind::Ge => ">=",
                    TokenKind::AndAnd => "&&",
                    TokenKind::OrOr => "||",
                    // Boolean XOR has no C spelling of its own; on `bool`
                    // operands bitwise `^` computes the same value.
                    TokenKind::CaretCaret => "^",
                    TokenKind::Eq => "=",
                    TokenKind::PlusEq => "+=",
                    TokenKind::MinusEq => "-=",
                    TokenKind::StarEq => "*=",
                    TokenKind::SlashEq => "/=",
                    TokenKind::PercentEq => "%=",
                    TokenKind::AmpEq => "&=",
                    TokenKind::PipeEq => "|=",
                    TokenKind::CaretEq => "^=",
                    TokenKind::LtLtEq => "<<=",
                    TokenKind::GtGtEq => ">>=",
                    _ => return self.error(),
                };

                format!(
                    "({} {} {})",
                    self.translate_expression(left),
                    operator,
                    self.translate_expression(right)
                )
            }
            Expression::Literal { value, .. } => match value.kind {
                TokenKind::True => "true".to_string(),
                TokenKind::False => "false".to_string(),
                TokenKind::Null => "NULL".to_string(),
                _ => self.error(),
            },
            Expression::Number { value, .. } => match value.kind {
                TokenKind::IntegerLiteral => {
                    // C has no `0o` prefix; `0o17` becomes the octal `0017`.
                    let mut number = value.lexeme.clone();
                    if number.len() > 2 && number.starts_with("0o") {
                        number.replace_range(1..2, "0");
                    }
                    number
                }
                TokenKind::FloatLiteral => format!("{}f", value.lexeme),
                _ => self.error(),
            },
            Expression::FunctionCall {
                callee, arguments, ..
            } => self.translate_function_call(callee, arguments),
            Expression::MemberAccess { owner, member, .. } => {
                format!(
                    "({}.{})",
                    self.translate_expression(owner),
                    member.lexeme
                )
            }
            Expression::Identifier { id, name } => {
                let is_reference = self
                    .types
                    .get(id)
                    .is_some_and(|data_type| data_type.is_reference);

                if is_reference {
                    format!("(*{})", name.lexeme)
                } else {
                    name.lexeme.clone()
                }
            }
            Expression::ArrayAccess { .. } => self.error(),
        }
    }

    fn translate_function_call(
        &mut self,
        callee: &Expression,
        arguments: &[Expression],
    ) -> String {
        match callee {
            // `value.m(a, b)` lowers to `Owner_m(&value, a, b)`; a receiver
            // that is already a reference is passed through as it loads.
            Expression::MemberAccess { owner, member, .. } => {
                let Some(owner_type) = self.types.get(&owner.id()).cloned() else {
                    return self.error();
                };

                let function_name =
                    format!("{}_{}", owner_type.type_name.lexeme, member.lexeme);

                let receiver = format!(
                    "{}{}",
                    if owner_type.is_reference { "" } else { "&" },
                    self.translate_expression(owner)
                );

                let mut translated = vec![receiver];
                for argument in arguments {
                    translated.push(self.translate_expression(argument));
                }

                format!("{}({})", function_name, translated.join(", "))
            }
            _ => {
                let function_name = self.translate_expression(callee);

                let translated: Vec<String> = arguments
                    .iter()
                    .map(|argument| self.translate_expression(argument))
                    .collect();

                format!("{}({})", function_name, translated.join(", "))
            }
        }
    }

    fn translate_variable_declaration(&mut self, declaration: &VariableDeclaration) -> String {
        let mut translated = format!(
            "{} {}",
            self.translate_data_type(Some(&declaration.declarator.data_type)),
            declaration.declarator.name.lexeme
        );

        if let Some(initial) = &declaration.initial {
            translated.push_str(" = ");
            translated.push_str(&self.translate_expression(initial));
        }

        translated
    }

    fn write_line(&mut self, line: &str) {
        let indentation = "    ".repeat(self.indentation);
        self.code.content.push(format!("{indentation}{line}\n"));
    }

    fn error(&mut self) -> String {
        self.has_error = true;
        "/* ERROR */".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use crate::parser::parse;
    use crate::tokenizer::tokenize;

    fn emit_text(text: &str) -> Vec<String> {
        let source = SourceFile::from_text("test.x", text);
        let tokens = tokenize(&source).expect("tokenizing failed");
        let program = parse(&source, &tokens).expect("parsing failed");
        let types = analyze(&source, &program).expect("analysis failed");
        let code = emit(&program, &types, &source.filename).expect("emission failed");

        code.content
            .iter()
            .map(|line| line.trim_end().to_string())
            .collect()
    }

    #[test]
    fn test_output_filename() {
        let source = SourceFile::from_text("foo.x", "");
        let tokens = tokenize(&source).unwrap();
        let program = parse(&source, &tokens).unwrap();
        let types = analyze(&source, &program).unwrap();
        let code = emit(&program, &types, "foo.x").unwrap();

        assert_eq!(code.filename, "foo.x.c");
    }

    #[test]
    fn test_empty_program_gets_only_the_preamble() {
        let lines = emit_text("");

        assert!(lines.contains(&"#include <stdint.h>".to_string()));
        assert!(lines.contains(&"#include <stddef.h>".to_string()));
        assert!(!lines.iter().any(|line| line.contains("struct")));
    }

    #[test]
    fn test_main_translation() {
        let lines = emit_text("int main(void) { return 0; }");

        assert!(lines.contains(&"int32_t main(void);".to_string()));
        assert!(lines.contains(&"int32_t main(void)".to_string()));
        assert!(lines.contains(&"    return 0;".to_string()));
    }

    #[test]
    fn test_struct_and_method_translation() {
        let lines = emit_text(
            "struct Pt { int x; int y; } int Pt::sum(void) { return self.x + self.y; }",
        );

        assert!(lines.contains(&"typedef struct Pt Pt;".to_string()));
        assert!(lines.contains(&"int32_t Pt_sum(Pt* self);".to_string()));
        assert!(lines.contains(&"    int32_t x;".to_string()));
        assert!(lines.contains(&"    int32_t y;".to_string()));
        assert!(lines.contains(&"    return (((*self).x) + ((*self).y));".to_string()));
    }

    #[test]
    fn test_method_call_takes_the_receiver_address() {
        let lines = emit_text(
            "struct Pt { int x; int y; } int Pt::sum(void) { return self.x + self.y; } \
             int main(void) { Pt p; return p.sum(); }",
        );

        assert!(lines.contains(&"    return Pt_sum(&p);".to_string()));
    }

    #[test]
    fn test_octal_rewrite_and_float_suffix() {
        let lines = emit_text("int main(void) { int x = 0o17; float f = 1.5; return x; }");

        assert!(lines.contains(&"    int32_t x = 0017;".to_string()));
        assert!(lines.contains(&"    float f = 1.5f;".to_string()));
    }

    #[test]
    fn test_type_widths() {
        let lines = emit_text(
            "struct S { bool a; byte b; short c; int d; long e; float f; double g; &S h; }",
        );

        assert!(lines.contains(&"    bool a;".to_string()));
        assert!(lines.contains(&"    int8_t b;".to_string()));
        assert!(lines.contains(&"    int16_t c;".to_string()));
        assert!(lines.contains(&"    int32_t d;".to_string()));
        assert!(lines.contains(&"    int64_t e;".to_string()));
        assert!(lines.contains(&"    float f;".to_string()));
        assert!(lines.contains(&"    double g;".to_string()));
        assert!(lines.contains(&"    S* h;".to_string()));
    }

    #[test]
    fn test_control_flow_translation() {
        let lines = emit_text(
            "int f(int n) { \
               int total = 0; \
               for (int i = 0; i < n; i += 1) { \
                 if (i % 2 == 0) { total += i; } else { continue; } \
               } \
               while (total > 100) { total -= 1; } \
               return total; \
             }",
        );

        assert!(lines.contains(&"    for (int32_t i = 0;(i < n);(i += 1))".to_string()));
        assert!(lines.contains(&"        if (((i % 2) == 0))".to_string()));
        assert!(lines.contains(&"        else".to_string()));
        assert!(lines.contains(&"            continue;".to_string()));
        assert!(lines.contains(&"    while ((total > 100))".to_string()));
    }

    #[test]
    fn test_bare_for_loop_translation() {
        let lines = emit_text("int f(void) { for (;;) { break; } return 0; }");

        assert!(lines.contains(&"    for (;;)".to_string()));
        assert!(lines.contains(&"        break;".to_string()));
    }

    #[test]
    fn test_output_ignores_whitespace_and_comments() {
        let compact = emit_text("int main(void) { return 0; }");
        let airy = emit_text("// entry\nint  main( void )\n{\n    /* body */\n    return 0;\n}");

        assert_eq!(compact, airy);
    }
}
