//! Statement parsing.
//!
//! A statement is picked by trying each alternative in order; the failure
//! that consumed the most tokens becomes the reported error.

use crate::ast::{
    BlockStatement, Conditional, ElseBranch, For, Statement, VariableDeclaration, While,
};
use crate::parser::{ParseResult, Parser};
use crate::token::TokenKind;

impl<'a> Parser<'a> {
    pub(crate) fn parse_statement(&mut self) -> ParseResult<Statement> {
        self.try_parse(
            &[
                |p| p.parse_expression_statement(),
                |p| {
                    p.parse_variable_declaration_statement()
                        .map(Statement::VariableDeclaration)
                },
                |p| p.parse_conditional_statement().map(Statement::Conditional),
                |p| p.parse_while_iteration().map(Statement::While),
                |p| p.parse_for_iteration().map(Statement::For),
                |p| p.parse_return_statement(),
                |p| p.parse_continue_statement(),
                |p| p.parse_break_statement(),
            ],
            "expected statement",
        )
    }

    /// `{ statement* }` with recovery: after a bad statement the cursor skips
    /// forward until a `}` has been consumed.
    pub(crate) fn parse_block_statement(&mut self) -> ParseResult<BlockStatement> {
        let mut errors = Vec::new();

        if !self.consume_if(TokenKind::LBrace) {
            errors.extend(self.error("expected `{`"));
        }

        let mut statements = Vec::new();
        while !self.at_end() && !self.matches(TokenKind::RBrace) {
            match self.parse_statement() {
                Ok(statement) => statements.push(statement),
                Err(statement_errors) => {
                    errors.extend(statement_errors);

                    while !self.at_end() && !self.consume_if(TokenKind::RBrace) {
                        self.next();
                    }
                }
            }
        }

        if self.at_end() || !self.consume_if(TokenKind::RBrace) {
            errors.extend(self.error("expected `}`"));
        }

        if errors.is_empty() {
            Ok(BlockStatement { statements })
        } else {
            Err(errors)
        }
    }

    fn parse_expression_statement(&mut self) -> ParseResult<Statement> {
        match self.parse_expression() {
            Ok(expression) => {
                if self.consume_if(TokenKind::Semicolon) {
                    Ok(Statement::Expression(expression))
                } else {
                    Err(self.error("expected `;`"))
                }
            }
            Err(mut errors) => {
                if !self.consume_if(TokenKind::Semicolon) {
                    errors.extend(self.error("expected `;`"));
                }
                Err(errors)
            }
        }
    }

    pub(crate) fn parse_variable_declaration_statement(
        &mut self,
    ) -> ParseResult<VariableDeclaration> {
        let mut errors = Vec::new();

        let declarator = match self.parse_variable_declarator() {
            Ok(declarator) => Some(declarator),
            Err(declarator_errors) => {
                errors.extend(declarator_errors);
                None
            }
        };

        let mut initial = None;
        if self.consume_if(TokenKind::Eq) {
            match self.parse_expression() {
                Ok(expression) => initial = Some(expression),
                Err(initial_errors) => errors.extend(initial_errors),
            }
        }

        if !self.consume_if(TokenKind::Semicolon) {
            errors.extend(self.error("expected `;`"));
        }

        match declarator {
            Some(declarator) if errors.is_empty() => Ok(VariableDeclaration {
                declarator,
                initial,
            }),
            _ => Err(errors),
        }
    }

    fn parse_while_iteration(&mut self) -> ParseResult<While> {
        if !self.consume_if(TokenKind::While) {
            return Err(self.error("expected keyword `while`"));
        }

        let mut errors = Vec::new();

        let condition = match self.parse_grouping() {
            Ok(expression) => Some(expression),
            Err(condition_errors) => {
                errors.extend(condition_errors);
                None
            }
        };

        let body = match self.parse_block_statement() {
            Ok(block) => Some(block),
            Err(body_errors) => {
                errors.extend(body_errors);
                None
            }
        };

        match (condition, body) {
            (Some(condition), Some(body)) if errors.is_empty() => Ok(While { condition, body }),
            _ => Err(errors),
        }
    }

    fn parse_for_iteration(&mut self) -> ParseResult<For> {
        if !self.consume_if(TokenKind::For) {
            return Err(self.error("expected keyword `for`"));
        }

        let mut errors = Vec::new();

        if !self.consume_if(TokenKind::LParen) {
            errors.extend(self.error("expected `(`"));
        }

        // Each clause is either its leading terminator or a real clause; the
        // init clause owns its `;` because it parses as a full declaration.
        let mut initial = None;
        if !self.consume_if(TokenKind::Semicolon) {
            match self.parse_variable_declaration_statement() {
                Ok(declaration) => initial = Some(Box::new(declaration)),
                Err(initial_errors) => errors.extend(initial_errors),
            }
        }

        let mut condition = None;
        if !self.consume_if(TokenKind::Semicolon) {
            match self.parse_expression() {
                Ok(expression) => condition = Some(expression),
                Err(condition_errors) => errors.extend(condition_errors),
            }

            if !self.consume_if(TokenKind::Semicolon) {
                errors.extend(self.error("expected `;`"));
            }
        }

        let mut update = None;
        if !self.consume_if(TokenKind::RParen) {
            match self.parse_expression() {
                Ok(expression) => update = Some(expression),
                Err(update_errors) => errors.extend(update_errors),
            }

            if !self.consume_if(TokenKind::RParen) {
                errors.extend(self.error("expected `)`"));
            }
        }

        let body = match self.parse_block_statement() {
            Ok(block) => Some(block),
            Err(body_errors) => {
                errors.extend(body_errors);
                None
            }
        };

        match body {
            Some(body) if errors.is_empty() => Ok(For {
                initial,
                condition,
                update,
                body,
            }),
            _ => Err(errors),
        }
    }

    fn parse_return_statement(&mut self) -> ParseResult<Statement> {
        if !self.consume_if(TokenKind::Return) {
            return Err(self.error("expected keyword `return`"));
        }

        if self.consume_if(TokenKind::Semicolon) {
            return Ok(Statement::Return(None));
        }

        match self.parse_expression() {
            Ok(expression) => {
                if self.consume_if(TokenKind::Semicolon) {
                    Ok(Statement::Return(Some(expression)))
                } else {
                    Err(self.error("expected `;`"))
                }
            }
            Err(mut errors) => {
                if !self.consume_if(TokenKind::Semicolon) {
                    errors.extend(self.error("expected `;`"));
                }
                Err(errors)
            }
        }
    }

    fn parse_continue_statement(&mut self) -> ParseResult<Statement> {
        if !self.consume_if(TokenKind::Continue) {
            return Err(self.error("expected keyword `continue`"));
        }

        if !self.consume_if(TokenKind::Semicolon) {
            return Err(self.error("expected `;`"));
        }

        Ok(Statement::Continue)
    }

    fn parse_break_statement(&mut self) -> ParseResult<Statement> {
        if !self.consume_if(TokenKind::Break) {
            return Err(self.error("expected keyword `break`"));
        }

        if !self.consume_if(TokenKind::Semicolon) {
            return Err(self.error("expected `;`"));
        }

        Ok(Statement::Break)
    }

    pub(crate) fn parse_conditional_statement(&mut self) -> ParseResult<Conditional> {
        if !self.consume_if(TokenKind::If) {
            return Err(self.error("expected keyword `if`"));
        }

        let mut errors = Vec::new();

        let condition = match self.parse_grouping() {
            Ok(expression) => Some(expression),
            Err(condition_errors) => {
                errors.extend(condition_errors);
                None
            }
        };

        let body = match self.parse_block_statement() {
            Ok(block) => Some(block),
            Err(body_errors) => {
                errors.extend(body_errors);
                None
            }
        };

        let mut else_case = None;
        if self.consume_if(TokenKind::Else) {
            match self.try_parse(
                &[
                    |p| {
                        p.parse_conditional_statement()
                            .map(|nested| ElseBranch::If(Box::new(nested)))
                    },
                    |p| p.parse_block_statement().map(ElseBranch::Block),
                ],
                "expected keyword `if` or `{`",
            ) {
                Ok(branch) => else_case = Some(branch),
                Err(else_errors) => errors.extend(else_errors),
            }
        }

        match (condition, body) {
            (Some(condition), Some(body)) if errors.is_empty() => Ok(Conditional {
                condition,
                body,
                else_case,
            }),
            _ => Err(errors),
        }
    }
}
