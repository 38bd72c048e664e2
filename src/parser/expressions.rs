//! Expression parsing.
//!
//! One function per precedence level, lowest first; every level is
//! left-associative, assignment included:
//!
//! ```text
//! assignment → boolean-or → boolean-xor → boolean-and → bitwise-or
//!   → bitwise-xor → bitwise-and → equality → relational → shift
//!   → additive → multiplicative → prefix → postfix → primary
//! ```
//!
//! An operand that failed to parse flows through as its error list; the
//! combining helpers merge both sides so a broken `a +  + b` reports each
//! failure once.

use crate::ast::Expression;
use crate::parser::{ParseResult, Parser};
use crate::token::{Token, TokenKind};

impl<'a> Parser<'a> {
    pub(crate) fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> ParseResult<Expression> {
        let mut expression = self.parse_boolean_or();

        while matches!(
            self.current().kind,
            TokenKind::Eq
                | TokenKind::PlusEq
                | TokenKind::MinusEq
                | TokenKind::StarEq
                | TokenKind::SlashEq
                | TokenKind::PercentEq
                | TokenKind::PipeEq
                | TokenKind::CaretEq
                | TokenKind::AmpEq
                | TokenKind::LtLtEq
                | TokenKind::GtGtEq
        ) {
            let operator = self.next().clone();
            let right = self.parse_boolean_or();
            expression = self.new_binary(operator, expression, right);
        }

        expression
    }

    fn parse_boolean_or(&mut self) -> ParseResult<Expression> {
        let mut expression = self.parse_boolean_xor();

        while self.matches(TokenKind::OrOr) {
            let operator = self.next().clone();
            let right = self.parse_boolean_xor();
            expression = self.new_binary(operator, expression, right);
        }

        expression
    }

    fn parse_boolean_xor(&mut self) -> ParseResult<Expression> {
        let mut expression = self.parse_boolean_and();

        while self.matches(TokenKind::CaretCaret) {
            let operator = self.next().clone();
            let right = self.parse_boolean_and();
            expression = self.new_binary(operator, expression, right);
        }

        expression
    }

    fn parse_boolean_and(&mut self) -> ParseResult<Expression> {
        let mut expression = self.parse_bitwise_or();

        while self.matches(TokenKind::AndAnd) {
            let operator = self.next().clone();
            let right = self.parse_bitwise_or();
            expression = self.new_binary(operator, expression, right);
        }

        expression
    }

    fn parse_bitwise_or(&mut self) -> ParseResult<Expression> {
        let mut expression = self.parse_bitwise_xor();

        while self.matches(TokenKind::Pipe) {
            let operator = self.next().clone();
            let right = self.parse_bitwise_xor();
            expression = self.new_binary(operator, expression, right);
        }

        expression
    }

    fn parse_bitwise_xor(&mut self) -> ParseResult<Expression> {
        let mut expression = self.parse_bitwise_and();

        while self.matches(TokenKind::Caret) {
            let operator = self.next().clone();
            let right = self.parse_bitwise_and();
            expression = self.new_binary(operator, expression, right);
        }

        expression
    }

    fn parse_bitwise_and(&mut self) -> ParseResult<Expression> {
        let mut expression = self.parse_equality();

        while self.matches(TokenKind::Amp) {
            let operator = self.next().clone();
            let right = self.parse_equality();
            expression = self.new_binary(operator, expression, right);
        }

        expression
    }

    fn parse_equality(&mut self) -> ParseResult<Expression> {
        let mut expression = self.parse_relational();

        while matches!(self.current().kind, TokenKind::EqEq | TokenKind::NotEq) {
            let operator = self.next().clone();
            let right = self.parse_relational();
            expression = self.new_binary(operator, expression, right);
        }

        expression
    }

    fn parse_relational(&mut self) -> ParseResult<Expression> {
        let mut expression = self.parse_shift();

        while matches!(
            self.current().kind,
            TokenKind::Lt | TokenKind::Gt | TokenKind::Le | TokenKind::Ge
        ) {
            let operator = self.next().clone();
            let right = self.parse_shift();
            expression = self.new_binary(operator, expression, right);
        }

        expression
    }

    fn parse_shift(&mut self) -> ParseResult<Expression> {
        let mut expression = self.parse_additive();

        while matches!(self.current().kind, TokenKind::LtLt | TokenKind::GtGt) {
            let operator = self.next().clone();
            let right = self.parse_additive();
            expression = self.new_binary(operator, expression, right);
        }

        expression
    }

    fn parse_additive(&mut self) -> ParseResult<Expression> {
        let mut expression = self.parse_multiplicative();

        while matches!(self.current().kind, TokenKind::Plus | TokenKind::Minus) {
            let operator = self.next().clone();
            let right = self.parse_multiplicative();
            expression = self.new_binary(operator, expression, right);
        }

        expression
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expression> {
        let mut expression = self.parse_prefix();

        while matches!(
            self.current().kind,
            TokenKind::Star | TokenKind::Slash | TokenKind::Percent
        ) {
            let operator = self.next().clone();
            let right = self.parse_prefix();
            expression = self.new_binary(operator, expression, right);
        }

        expression
    }

    fn parse_prefix(&mut self) -> ParseResult<Expression> {
        if matches!(
            self.current().kind,
            TokenKind::PlusPlus
                | TokenKind::MinusMinus
                | TokenKind::Minus
                | TokenKind::Bang
                | TokenKind::Tilde
                | TokenKind::Amp
        ) {
            let operator = self.next().clone();
            let operand = self.parse_postfix()?;

            return Ok(Expression::PrefixUnary {
                id: self.next_id(),
                operator,
                operand: Box::new(operand),
            });
        }

        self.parse_postfix()
    }

    /// Member access, call, and index chains, then one optional trailing
    /// `++`/`--`.
    fn parse_postfix(&mut self) -> ParseResult<Expression> {
        let mut expression = self.parse_primary();

        while matches!(
            self.current().kind,
            TokenKind::Dot | TokenKind::LParen | TokenKind::LBracket
        ) {
            if self.consume_if(TokenKind::Dot) {
                let mut errors = Vec::new();

                let owner = match expression {
                    Ok(owner) => Some(owner),
                    Err(owner_errors) => {
                        errors.extend(owner_errors);
                        None
                    }
                };

                let mut member = None;
                if self.matches(TokenKind::Identifier) {
                    member = Some(self.next().clone());
                } else {
                    errors.extend(self.error("expected identifier"));
                }

                expression = match (owner, member) {
                    (Some(owner), Some(member)) if errors.is_empty() => {
                        Ok(Expression::MemberAccess {
                            id: self.next_id(),
                            owner: Box::new(owner),
                            member,
                        })
                    }
                    _ => Err(errors),
                };
            } else if self.consume_if(TokenKind::LParen) {
                let mut errors = Vec::new();

                let callee = match expression {
                    Ok(callee) => Some(callee),
                    Err(callee_errors) => {
                        errors.extend(callee_errors);
                        None
                    }
                };

                let mut arguments = Vec::new();
                if !self.consume_if(TokenKind::RParen) {
                    match self.parse_expression_list() {
                        Ok(parsed) => arguments = parsed,
                        Err(argument_errors) => errors.extend(argument_errors),
                    }

                    if !self.consume_if(TokenKind::RParen) {
                        errors.extend(self.error("expected `)`"));
                    }
                }

                expression = match callee {
                    Some(callee) if errors.is_empty() => Ok(Expression::FunctionCall {
                        id: self.next_id(),
                        callee: Box::new(callee),
                        arguments,
                    }),
                    _ => Err(errors),
                };
            } else if self.consume_if(TokenKind::LBracket) {
                let mut errors = Vec::new();

                let array = match expression {
                    Ok(array) => Some(array),
                    Err(array_errors) => {
                        errors.extend(array_errors);
                        None
                    }
                };

                let index = match self.parse_expression() {
                    Ok(index) => Some(index),
                    Err(index_errors) => {
                        errors.extend(index_errors);
                        None
                    }
                };

                if !self.consume_if(TokenKind::RBracket) {
                    errors.extend(self.error("expected `]`"));
                }

                expression = match (array, index) {
                    (Some(array), Some(index)) if errors.is_empty() => {
                        Ok(Expression::ArrayAccess {
                            id: self.next_id(),
                            array: Box::new(array),
                            index: Box::new(index),
                        })
                    }
                    _ => Err(errors),
                };
            }
        }

        if matches!(
            self.current().kind,
            TokenKind::PlusPlus | TokenKind::MinusMinus
        ) {
            let operator = self.next().clone();
            expression = expression.map(|operand| Expression::PostfixUnary {
                id: self.next_id(),
                operator,
                operand: Box::new(operand),
            });
        }

        expression
    }

    fn parse_primary(&mut self) -> ParseResult<Expression> {
        self.try_parse(
            &[
                |p| p.parse_grouping(),
                |p| p.parse_literal(),
                |p| p.parse_number_constant(),
                |p| p.parse_identifier_constant(),
            ],
            "expected primary expression",
        )
    }

    fn parse_literal(&mut self) -> ParseResult<Expression> {
        if !matches!(
            self.current().kind,
            TokenKind::True | TokenKind::False | TokenKind::Null
        ) {
            return Err(self.error("expected literal value"));
        }

        let value = self.next().clone();
        Ok(Expression::Literal {
            id: self.next_id(),
            value,
        })
    }

    fn parse_number_constant(&mut self) -> ParseResult<Expression> {
        if !matches!(
            self.current().kind,
            TokenKind::IntegerLiteral | TokenKind::FloatLiteral
        ) {
            return Err(self.error("expected numeric constant"));
        }

        let value = self.next().clone();
        Ok(Expression::Number {
            id: self.next_id(),
            value,
        })
    }

    fn parse_identifier_constant(&mut self) -> ParseResult<Expression> {
        if !self.matches(TokenKind::Identifier) {
            return Err(self.error("expected an identifier"));
        }

        let name = self.next().clone();
        Ok(Expression::Identifier {
            id: self.next_id(),
            name,
        })
    }

    /// `( expression )` — used for primaries and for the mandatory parens of
    /// `if`/`while` conditions.
    pub(crate) fn parse_grouping(&mut self) -> ParseResult<Expression> {
        if !self.consume_if(TokenKind::LParen) {
            return Err(self.error("expected `(`"));
        }

        match self.parse_expression() {
            Ok(expression) => {
                if self.consume_if(TokenKind::RParen) {
                    Ok(expression)
                } else {
                    Err(self.error("expected `)`"))
                }
            }
            Err(mut errors) => {
                if !self.consume_if(TokenKind::RParen) {
                    errors.extend(self.error("expected `)`"));
                }
                Err(errors)
            }
        }
    }

    fn parse_expression_list(&mut self) -> ParseResult<Vec<Expression>> {
        let mut expressions = Vec::new();
        let mut errors = Vec::new();

        loop {
            match self.parse_expression() {
                Ok(expression) => expressions.push(expression),
                Err(expression_errors) => errors.extend(expression_errors),
            }

            if self.at_end() || !self.consume_if(TokenKind::Comma) {
                break;
            }
        }

        if errors.is_empty() {
            Ok(expressions)
        } else {
            Err(errors)
        }
    }

    /// Build a binary node, merging operand failures into one list.
    fn new_binary(
        &mut self,
        operator: Token,
        left: ParseResult<Expression>,
        right: ParseResult<Expression>,
    ) -> ParseResult<Expression> {
        match (left, right) {
            (Ok(left), Ok(right)) => Ok(Expression::Binary {
                id: self.next_id(),
                operator,
                left: Box::new(left),
                right: Box::new(right),
            }),
            (Err(mut errors), Err(right_errors)) => {
                errors.extend(right_errors);
                Err(errors)
            }
            (Err(errors), _) | (_, Err(errors)) => Err(errors),
        }
    }
}
