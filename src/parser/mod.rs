//! Recursive descent parser for X.
//!
//! The grammar is split across three `impl Parser` blocks mirroring its
//! shape:
//! - [`declarations`]: structs, functions, types, declarators
//! - [`statements`]: statements and blocks
//! - [`expressions`]: precedence climbing for expressions
//!
//! # Error model
//!
//! Every production returns `Result<Node, Vec<SyntaxError>>`. A composite
//! rule keeps parsing after a child fails, accumulating the child error lists
//! so one broken declaration reports everything wrong with it; if anything
//! accumulated, the partial node is discarded and the list is returned
//! instead. Errors carry the token index where they were detected
//! (`occurrence`), which drives both the caret rendering and the
//! "furthest failure wins" selection in [`Parser::try_parse`].
//!
//! Recovery happens at declaration and block boundaries by synchronising on
//! `;` or `}`.

mod declarations;
mod expressions;
mod statements;

use crate::ast::{NodeId, Program};
use crate::diagnostics::Reporter;
use crate::error::{CompileError, CompileResult};
use crate::source::SourceFile;
use crate::token::{Token, TokenKind, TokenStream};

/// A failed production: why, and the token index where it was detected.
#[derive(Debug)]
pub struct SyntaxError {
    pub reason: String,
    pub occurrence: usize,
}

pub type ParseResult<T> = Result<T, Vec<SyntaxError>>;

/// Parse a token stream into a [`Program`].
///
/// All syntax errors are rendered before this returns; `Err` carries only
/// the count.
pub fn parse(source: &SourceFile, tokens: &TokenStream) -> CompileResult<Program> {
    let mut parser = Parser::new(source, tokens);
    let program = parser.parse_program();

    if parser.reporter.has_errors() {
        Err(CompileError::Parse {
            count: parser.reporter.error_count(),
        })
    } else {
        Ok(program)
    }
}

pub struct Parser<'a> {
    tokens: &'a TokenStream,
    position: usize,
    next_node_id: NodeId,
    reporter: Reporter<'a>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a SourceFile, tokens: &'a TokenStream) -> Parser<'a> {
        Parser {
            tokens,
            position: 0,
            next_node_id: 0,
            reporter: Reporter::new(source),
        }
    }

    /// Parse every top-level declaration, recovering at `;` / `}` after a
    /// failed one.
    pub fn parse_program(&mut self) -> Program {
        let mut program = Program::default();

        while !self.at_end() {
            match self.parse_declaration() {
                Ok(declaration) => program.declarations.push(declaration),
                Err(errors) => {
                    self.report(&errors);

                    while !self.at_end()
                        && !(self.consume_if(TokenKind::Semicolon)
                            || self.consume_if(TokenKind::RBrace))
                    {
                        self.next();
                    }
                }
            }
        }

        program
    }

    // ===== Cursor primitives =====

    pub(crate) fn at_end(&self) -> bool {
        self.current().kind == TokenKind::Eof
    }

    pub(crate) fn current(&self) -> &Token {
        &self.tokens[self.position]
    }

    /// Advance past the current token and return it.
    pub(crate) fn next(&mut self) -> &Token {
        if self.at_end() {
            return &self.tokens[self.position];
        }

        self.position += 1;
        &self.tokens[self.position - 1]
    }

    pub(crate) fn peek(&self) -> &Token {
        if self.at_end() {
            return self.current();
        }

        &self.tokens[self.position + 1]
    }

    pub(crate) fn matches(&self, expect: TokenKind) -> bool {
        if self.at_end() && expect != TokenKind::Eof {
            return false;
        }

        self.current().kind == expect
    }

    pub(crate) fn match_next(&self, expect: TokenKind) -> bool {
        if self.at_end() && expect != TokenKind::Eof {
            return false;
        }

        self.peek().kind == expect
    }

    pub(crate) fn consume_if(&mut self, expect: TokenKind) -> bool {
        if !self.matches(expect) {
            return false;
        }

        self.position += 1;
        true
    }

    pub(crate) fn next_id(&mut self) -> NodeId {
        let id = self.next_node_id;
        self.next_node_id += 1;
        id
    }

    // ===== Errors =====

    /// A fresh single-entry error list anchored at the cursor.
    pub(crate) fn error(&self, reason: &str) -> Vec<SyntaxError> {
        vec![SyntaxError {
            reason: reason.to_string(),
            occurrence: self.position,
        }]
    }

    fn report(&mut self, errors: &[SyntaxError]) {
        for error in errors {
            let occurrence = error.occurrence.min(self.tokens.len() - 1);
            let left = &self.tokens[occurrence.max(1) - 1];
            let right = &self.tokens[occurrence];
            self.reporter.at_span(&error.reason, left, right);
        }
    }

    /// Backtracking choice: try each alternative from the same cursor
    /// position. The first success wins. If all fail, the failure that got
    /// furthest past the starting point is the most useful diagnostic; it is
    /// returned and the cursor is left at its occurrence.
    pub(crate) fn try_parse<T>(
        &mut self,
        rules: &[fn(&mut Parser<'a>) -> ParseResult<T>],
        message: &str,
    ) -> ParseResult<T> {
        let snapshot = self.position;
        let mut best: Option<Vec<SyntaxError>> = None;

        for rule in rules {
            match rule(self) {
                Ok(node) => return Ok(node),
                Err(errors) => {
                    let occurrence = chain_occurrence(&errors);
                    if occurrence > snapshot
                        && best
                            .as_ref()
                            .map_or(true, |best| occurrence > chain_occurrence(best))
                    {
                        best = Some(errors);
                    }
                }
            }

            self.position = snapshot;
        }

        let result = best.unwrap_or_else(|| self.error(message));
        self.position = chain_occurrence(&result);

        Err(result)
    }
}

/// The token index a whole error chain is anchored at: where its first
/// failure was detected.
fn chain_occurrence(errors: &[SyntaxError]) -> usize {
    errors.first().map_or(0, |error| error.occurrence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Declaration, ElseBranch, Expression, Statement};
    use crate::tokenizer::tokenize;

    fn parse_text(text: &str) -> CompileResult<Program> {
        let source = SourceFile::from_text("test.x", text);
        let tokens = tokenize(&source)?;
        parse(&source, &tokens)
    }

    #[test]
    fn test_parse_simple_function() {
        let program = parse_text("int main(void) { return 0; }").unwrap();

        assert_eq!(program.declarations.len(), 1);
        match &program.declarations[0] {
            Declaration::Function(function) => {
                assert_eq!(function.name.lexeme, "main");
                assert!(function.owner.is_none());
                assert!(function.parameters.is_empty());
                assert!(function
                    .return_type
                    .as_ref()
                    .is_some_and(|t| t.type_name.lexeme == "int"));
                assert_eq!(function.body.statements.len(), 1);
            }
            _ => panic!("expected a function"),
        }
    }

    #[test]
    fn test_parse_void_function() {
        let program = parse_text("void report(void) { }").unwrap();

        match &program.declarations[0] {
            Declaration::Function(function) => assert!(function.return_type.is_none()),
            _ => panic!("expected a function"),
        }
    }

    #[test]
    fn test_parse_struct() {
        let program = parse_text("struct Pt { int x; int y; }").unwrap();

        match &program.declarations[0] {
            Declaration::Structure(structure) => {
                assert_eq!(structure.name.lexeme, "Pt");
                assert_eq!(structure.members.len(), 2);
                assert_eq!(structure.members[1].name.lexeme, "y");
            }
            _ => panic!("expected a struct"),
        }
    }

    #[test]
    fn test_parse_method_with_owner() {
        let program = parse_text(
            "struct Pt { int x; int y; } int Pt::sum(void) { return self.x + self.y; }",
        )
        .unwrap();

        match &program.declarations[1] {
            Declaration::Function(function) => {
                assert!(function.owner.as_ref().is_some_and(|o| o.lexeme == "Pt"));
                assert_eq!(function.name.lexeme, "sum");
            }
            _ => panic!("expected a function"),
        }
    }

    #[test]
    fn test_parse_reference_array_type() {
        let program = parse_text("struct S { &S neighbor; int[][] cells; }").unwrap();

        match &program.declarations[0] {
            Declaration::Structure(structure) => {
                assert!(structure.members[0].data_type.is_reference);
                assert_eq!(structure.members[1].data_type.dimensions, 2);
            }
            _ => panic!("expected a struct"),
        }
    }

    #[test]
    fn test_precedence() {
        let program = parse_text("int main(void) { int x = 1 + 2 * 3; return x; }").unwrap();

        let Declaration::Function(function) = &program.declarations[0] else {
            panic!("expected a function");
        };
        let Statement::VariableDeclaration(declaration) = &function.body.statements[0] else {
            panic!("expected a declaration");
        };
        let Some(Expression::Binary {
            operator, right, ..
        }) = &declaration.initial
        else {
            panic!("expected a binary initializer");
        };

        // 1 + (2 * 3)
        assert_eq!(operator.lexeme, "+");
        assert!(
            matches!(**right, Expression::Binary { ref operator, .. } if operator.lexeme == "*")
        );
    }

    #[test]
    fn test_else_if_chain() {
        let program = parse_text(
            "int f(int x) { if (x > 0) { return 1; } else if (x < 0) { return 2; } else { return 3; } }",
        )
        .unwrap();

        let Declaration::Function(function) = &program.declarations[0] else {
            panic!("expected a function");
        };
        let Statement::Conditional(conditional) = &function.body.statements[0] else {
            panic!("expected a conditional");
        };
        let Some(ElseBranch::If(nested)) = &conditional.else_case else {
            panic!("expected an else-if branch");
        };
        assert!(matches!(nested.else_case, Some(ElseBranch::Block(_))));
    }

    #[test]
    fn test_bare_for_loop() {
        let program = parse_text("int f(void) { for (;;) { } return 0; }").unwrap();

        let Declaration::Function(function) = &program.declarations[0] else {
            panic!("expected a function");
        };
        let Statement::For(iteration) = &function.body.statements[0] else {
            panic!("expected a for loop");
        };
        assert!(iteration.initial.is_none());
        assert!(iteration.condition.is_none());
        assert!(iteration.update.is_none());
        assert!(iteration.body.statements.is_empty());
    }

    #[test]
    fn test_missing_semicolon_is_an_error() {
        assert!(parse_text("int main(void) { return 0 }").is_err());
    }

    #[test]
    fn test_recovers_and_reports_later_declarations() {
        // The first declaration is broken; recovery still reaches the second
        // one and reports its error too.
        let result = parse_text("int broken( { } int also_broken(void) { return }");
        assert!(matches!(result, Err(CompileError::Parse { count }) if count >= 2));
    }

    #[test]
    fn test_empty_source_is_an_empty_program() {
        let program = parse_text("").unwrap();
        assert!(program.declarations.is_empty());
    }
}
