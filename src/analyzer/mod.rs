//! Semantic analysis.
//!
//! Three phases over the parsed program:
//!
//! 1. Load every top-level declaration into the [`SymbolTable`]; functions
//!    and structs share one namespace.
//! 2. Validate structures: member types must exist, member names must be
//!    unique, and a struct may only contain itself behind a reference or an
//!    array.
//! 3. Validate functions: owner and return type must name known structs,
//!    parameter names must be unique (`self` is reserved for methods), and
//!    the body is walked statement by statement with a [`SymbolStack`] of
//!    local bindings.
//!
//! The walk types every expression it meets and memoises the result in a
//! [`TypeMap`] keyed by expression id; the emitter reads the same map.
//! Errors never stop the walk, so a single run reports everything it can
//! find.

mod expressions;
mod statements;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::ast::{DataType, Declaration, Function, NodeId, Program, Structure};
use crate::diagnostics::Reporter;
use crate::error::{CompileError, CompileResult};
use crate::source::SourceFile;
use crate::symbols::{SymbolStack, SymbolTable};
use crate::token::{Token, TokenKind};

/// Evaluated type of every typed expression, keyed by expression id.
pub type TypeMap = FxHashMap<NodeId, DataType>;

/// Validate a program and compute its expression types.
pub fn analyze(source: &SourceFile, program: &Program) -> CompileResult<TypeMap> {
    let mut analyzer = Analyzer::new(source);
    analyzer.check_semantics(program);

    if analyzer.reporter.has_errors() {
        Err(CompileError::Analyze {
            count: analyzer.reporter.error_count(),
        })
    } else {
        Ok(analyzer.types)
    }
}

pub(crate) struct Analyzer<'a> {
    reporter: Reporter<'a>,
    pub(crate) symbol_table: SymbolTable<'a>,
    pub(crate) types: TypeMap,
    /// Nesting depth of `while`/`for` bodies around the current statement.
    pub(crate) loop_depth: u32,
    /// Return type of the function whose body is being walked.
    pub(crate) current_return: Option<&'a DataType>,
}

impl<'a> Analyzer<'a> {
    fn new(source: &'a SourceFile) -> Analyzer<'a> {
        Analyzer {
            reporter: Reporter::new(source),
            symbol_table: SymbolTable::new(),
            types: TypeMap::default(),
            loop_depth: 0,
            current_return: None,
        }
    }

    fn check_semantics(&mut self, program: &'a Program) {
        self.load_symbols(program);
        self.validate_structures(program);
        self.validate_functions(program);
    }

    fn load_symbols(&mut self, program: &'a Program) {
        for declaration in &program.declarations {
            if self.symbol_table.load(declaration) {
                continue;
            }

            match declaration {
                Declaration::Function(function) => self.report(
                    &format!("function `{}` is already defined", function.name.lexeme),
                    Some(&function.name),
                ),
                Declaration::Structure(structure) => self.report(
                    &format!("struct `{}` already defined", structure.name.lexeme),
                    Some(&structure.name),
                ),
            }
        }
    }

    fn validate_structures(&mut self, program: &'a Program) {
        for declaration in &program.declarations {
            if let Declaration::Structure(structure) = declaration {
                self.validate_structure_members(structure);
            }
        }
    }

    fn validate_functions(&mut self, program: &'a Program) {
        for declaration in &program.declarations {
            if let Declaration::Function(function) = declaration {
                self.validate_function_owner(function);
                self.validate_function_return_type(function);
                self.validate_function_parameters(function);
                self.validate_function_body(function);
            }
        }
    }

    fn validate_structure_members(&mut self, structure: &Structure) {
        let mut member_table = FxHashSet::default();

        for member in &structure.members {
            let member_type = &member.data_type;

            if member_type.type_name.kind == TokenKind::Identifier {
                if self
                    .symbol_table
                    .lookup_structure(&member_type.type_name.lexeme)
                    .is_none()
                {
                    self.report(
                        &format!("type `{}` is undefined", member_type.type_name.lexeme),
                        Some(&member_type.type_name),
                    );
                } else {
                    let contains_self = member_type.type_name.lexeme == structure.name.lexeme;
                    let has_indirection = member_type.is_reference || member_type.dimensions > 0;

                    if contains_self && !has_indirection {
                        self.report(
                            &format!(
                                "struct `{}` contains a self referencing member",
                                structure.name.lexeme
                            ),
                            Some(&member.name),
                        );
                    }
                }
            }

            if !member_table.insert(member.name.lexeme.clone()) {
                self.report(
                    &format!(
                        "struct `{}` has multiple members of `{}`",
                        structure.name.lexeme, member.name.lexeme
                    ),
                    Some(&member.name),
                );
            }
        }
    }

    fn validate_function_owner(&mut self, function: &Function) {
        let Some(owner) = &function.owner else {
            return;
        };

        if self.symbol_table.lookup_structure(&owner.lexeme).is_none() {
            self.report(
                &format!("struct `{}` is undefined", owner.lexeme),
                Some(owner),
            );
        }
    }

    fn validate_function_return_type(&mut self, function: &Function) {
        let Some(return_type) = &function.return_type else {
            return;
        };

        // Primitive return types need no lookup.
        if return_type.type_name.kind != TokenKind::Identifier {
            return;
        }

        if self
            .symbol_table
            .lookup_structure(&return_type.type_name.lexeme)
            .is_none()
        {
            self.report(
                &format!("struct `{}` is undefined", return_type.type_name.lexeme),
                Some(&return_type.type_name),
            );
        }
    }

    fn validate_function_parameters(&mut self, function: &Function) {
        let mut parameter_table = FxHashSet::default();

        if function.owner.is_some() {
            parameter_table.insert("self".to_string());
        }

        for parameter in &function.parameters {
            let parameter_type = &parameter.data_type;

            if parameter_type.type_name.kind == TokenKind::Identifier
                && self
                    .symbol_table
                    .lookup_structure(&parameter_type.type_name.lexeme)
                    .is_none()
            {
                self.report(
                    &format!("type `{}` is undefined", parameter_type.type_name.lexeme),
                    Some(&parameter_type.type_name),
                );
            }

            if !parameter_table.insert(parameter.name.lexeme.clone()) {
                self.report(
                    &format!("multiple parameter name of `{}`", parameter.name.lexeme),
                    Some(&parameter.name),
                );
            }
        }
    }

    fn validate_function_body(&mut self, function: &'a Function) {
        let mut stack = SymbolStack::new();
        stack.push_frame();

        for parameter in &function.parameters {
            stack.add_symbol(&parameter.name.lexeme, parameter.data_type.clone());
        }

        if let Some(owner) = &function.owner {
            // Methods see their receiver as a reference binding named `self`.
            let self_type = DataType {
                is_reference: true,
                type_name: owner.clone(),
                dimensions: 0,
            };
            stack.add_symbol("self", self_type);
        }

        self.current_return = function.return_type.as_ref();
        self.loop_depth = 0;

        self.validate_block(&mut stack, &function.body);

        stack.pop_frame();
        self.current_return = None;
    }

    // ===== Reporting =====

    pub(crate) fn report(&mut self, message: &str, token: Option<&Token>) {
        match token {
            Some(token) => self.reporter.at_token(message, token),
            None => self.reporter.plain(message),
        }
    }

    /// Report and yield "no type"; the expression walkers return this so an
    /// error both surfaces and poisons the surrounding expression.
    pub(crate) fn type_error(&mut self, message: &str, token: Option<&Token>) -> Option<DataType> {
        self.report(message, token);
        None
    }
}

// ===== Type helpers =====

/// Structural type equality, with one special case: the `null` literal's
/// type is equal to every reference type.
pub(crate) fn is_same_type(a: Option<&DataType>, b: Option<&DataType>) -> bool {
    let (Some(a), Some(b)) = (a, b) else {
        return a.is_none() && b.is_none();
    };

    if (a.is_reference && b.type_name.kind == TokenKind::Null)
        || (b.is_reference && a.type_name.kind == TokenKind::Null)
    {
        return true;
    }

    a.dimensions == b.dimensions
        && a.is_reference == b.is_reference
        && a.type_name.lexeme == b.type_name.lexeme
}

/// A type that was never written in the source, positioned at `at` so later
/// diagnostics still point somewhere sensible.
fn synthetic_type(kind: TokenKind, lexeme: &str, at: &Token, is_reference: bool) -> DataType {
    DataType {
        is_reference,
        dimensions: 0,
        type_name: Token {
            index: at.index,
            line: at.line,
            column: at.column,
            kind,
            lexeme: lexeme.to_string(),
        },
    }
}

pub(crate) fn bool_type(at: &Token) -> DataType {
    synthetic_type(TokenKind::Bool, "bool", at, false)
}

pub(crate) fn int_type(at: &Token) -> DataType {
    synthetic_type(TokenKind::Int, "int", at, false)
}

pub(crate) fn float_type(at: &Token) -> DataType {
    synthetic_type(TokenKind::Float, "float", at, false)
}

pub(crate) fn null_type(at: &Token) -> DataType {
    synthetic_type(TokenKind::Null, "null", at, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::tokenizer::tokenize;

    fn analyze_text(text: &str) -> CompileResult<TypeMap> {
        let source = SourceFile::from_text("test.x", text);
        let tokens = tokenize(&source)?;
        let program = parse(&source, &tokens)?;
        analyze(&source, &program)
    }

    #[test]
    fn test_accepts_a_valid_program() {
        assert!(analyze_text("int main(void) { return 0; }").is_ok());
    }

    #[test]
    fn test_duplicate_declarations_share_one_namespace() {
        assert!(analyze_text("struct A { int x; } int A(void) { return 0; }").is_err());
    }

    #[test]
    fn test_self_referencing_member_by_value() {
        assert!(analyze_text("struct Node { Node next; }").is_err());
    }

    #[test]
    fn test_self_reference_behind_reference_or_array() {
        assert!(analyze_text("struct Node { &Node next; Node[] children; }").is_ok());
    }

    #[test]
    fn test_duplicate_members() {
        assert!(analyze_text("struct P { int x; int x; }").is_err());
    }

    #[test]
    fn test_unknown_member_type() {
        assert!(analyze_text("struct P { Missing m; }").is_err());
    }

    #[test]
    fn test_self_is_reserved_for_methods() {
        assert!(
            analyze_text("struct P { int x; } int P::get(int self) { return self; }").is_err()
        );
    }

    #[test]
    fn test_return_type_must_match() {
        assert!(analyze_text("int g(void) { return null; }").is_err());
        assert!(analyze_text("int g(void) { return; }").is_err());
        assert!(analyze_text("void g(void) { return 1; }").is_err());
        assert!(analyze_text("void g(void) { return; }").is_ok());
    }

    #[test]
    fn test_null_matches_reference_types_only() {
        assert!(analyze_text("struct P { int x; } void f(void) { &P p = null; }").is_ok());
        assert!(analyze_text("void f(void) { int x = null; }").is_err());
    }

    #[test]
    fn test_break_requires_a_loop() {
        assert!(analyze_text("void f(void) { break; }").is_err());
        assert!(analyze_text("void f(void) { while (true) { break; } }").is_ok());
        assert!(analyze_text("void f(void) { for (;;) { break; } }").is_ok());
    }

    #[test]
    fn test_for_init_binding_is_visible_after_the_loop() {
        assert!(analyze_text(
            "int f(void) { for (int i = 0; i < 10; i += 1) { break; } return i; }"
        )
        .is_ok());
    }

    #[test]
    fn test_analysis_is_idempotent() {
        let source = SourceFile::from_text(
            "test.x",
            "struct Pt { int x; int y; } int Pt::sum(void) { return self.x + self.y; } \
             int main(void) { Pt p; return p.sum(); }",
        );
        let tokens = tokenize(&source).unwrap();
        let program = parse(&source, &tokens).unwrap();

        let first = analyze(&source, &program).unwrap();
        let second = analyze(&source, &program).unwrap();

        assert_eq!(first, second);
    }
}
