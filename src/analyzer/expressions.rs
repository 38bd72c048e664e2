//! Expression typing.
//!
//! Every function here either produces the expression's [`DataType`] or
//! reports why it has none and yields `None`. `None` poisons the enclosing
//! expression without a second report, so each broken leaf is diagnosed
//! exactly once per walk.

use crate::analyzer::{bool_type, float_type, int_type, is_same_type, null_type, Analyzer};
use crate::ast::{DataType, Expression, Function};
use crate::symbols::SymbolStack;
use crate::token::{Token, TokenKind};

impl<'a> Analyzer<'a> {
    /// Type an expression, memoised through the crate-wide type map.
    pub(crate) fn type_of_expression(
        &mut self,
        stack: &SymbolStack,
        expression: &Expression,
    ) -> Option<DataType> {
        if let Some(known) = self.types.get(&expression.id()) {
            return Some(known.clone());
        }

        let evaluated = match expression {
            Expression::PrefixUnary {
                operator, operand, ..
            } => self.type_of_prefix(stack, operator, operand),
            Expression::PostfixUnary {
                operator, operand, ..
            } => self.type_of_postfix(stack, operator, operand),
            Expression::Binary {
                operator,
                left,
                right,
                ..
            } => self.type_of_binary(stack, operator, left, right),
            Expression::Number { value, .. } => type_of_number(value),
            Expression::Identifier { name, .. } => self.type_of_identifier(stack, name),
            Expression::Literal { value, .. } => type_of_literal(value),
            Expression::MemberAccess { owner, member, .. } => {
                self.type_of_member_access(stack, owner, member)
            }
            Expression::FunctionCall {
                callee, arguments, ..
            } => self.type_of_function_call(stack, callee, arguments),
            // Array accesses are parsed but carry no type; the backend does
            // not translate them.
            Expression::ArrayAccess { .. } => None,
        };

        if let Some(data_type) = &evaluated {
            self.types.insert(expression.id(), data_type.clone());
        }

        evaluated
    }

    fn type_of_prefix(
        &mut self,
        stack: &SymbolStack,
        operator: &Token,
        operand: &Expression,
    ) -> Option<DataType> {
        match operator.kind {
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                if let Expression::Identifier { name, .. } = operand {
                    if stack
                        .lookup_symbol(&name.lexeme)
                        .is_some_and(|t| t.is_integer() && t.dimensions == 0)
                    {
                        return self.type_of_expression(stack, operand);
                    }
                }

                self.type_error(
                    &format!("invalid operand for prefix `{}`", operator.lexeme),
                    Some(operator),
                )
            }
            TokenKind::Bang => {
                let operand_type = self.type_of_expression(stack, operand);

                if operand_type
                    .as_ref()
                    .is_some_and(|t| t.is_boolean() && t.dimensions == 0)
                {
                    return operand_type;
                }

                self.type_error(
                    &format!("invalid operand for prefix `{}`", operator.lexeme),
                    Some(operator),
                )
            }
            TokenKind::Tilde => {
                let operand_type = self.type_of_expression(stack, operand);

                if operand_type
                    .as_ref()
                    .is_some_and(|t| t.is_integer() && t.dimensions == 0)
                {
                    return operand_type;
                }

                self.type_error(
                    &format!("invalid operand for prefix `{}`", operator.lexeme),
                    Some(operator),
                )
            }
            TokenKind::Minus => {
                if matches!(operand, Expression::Number { .. }) {
                    return self.type_of_expression(stack, operand);
                }

                self.type_error(
                    &format!("invalid operand for prefix `{}`", operator.lexeme),
                    Some(operator),
                )
            }
            TokenKind::Amp => {
                if !matches!(
                    operand,
                    Expression::Identifier { .. } | Expression::MemberAccess { .. }
                ) {
                    return self.type_error("cannot get the reference", Some(operator));
                }

                let Some(operand_type) = self.type_of_expression(stack, operand) else {
                    return self.type_error("could not infer type", Some(operator));
                };

                if operand_type.is_reference || operand_type.dimensions > 0 {
                    return self.type_error("cannot get the reference", Some(operator));
                }

                Some(DataType {
                    is_reference: true,
                    ..operand_type
                })
            }
            _ => None,
        }
    }

    fn type_of_postfix(
        &mut self,
        stack: &SymbolStack,
        operator: &Token,
        operand: &Expression,
    ) -> Option<DataType> {
        if let Expression::Identifier { name, .. } = operand {
            if stack
                .lookup_symbol(&name.lexeme)
                .is_some_and(|t| t.is_integer() && t.dimensions == 0)
            {
                return self.type_of_expression(stack, operand);
            }
        }

        self.type_error(
            &format!("invalid operand for postfix `{}`", operator.lexeme),
            Some(operator),
        )
    }

    fn type_of_binary(
        &mut self,
        stack: &SymbolStack,
        operator: &Token,
        left: &Expression,
        right: &Expression,
    ) -> Option<DataType> {
        let left_type = self.type_of_expression(stack, left);
        let right_type = self.type_of_expression(stack, right);

        let (Some(left_type), Some(right_type)) = (left_type, right_type) else {
            return None;
        };

        match operator.kind {
            TokenKind::Plus | TokenKind::Minus | TokenKind::Star | TokenKind::Slash => {
                // Arithmetic is floating when either side is; an all-integer
                // or all-float expression keeps the left operand's type.
                if left_type.is_integer() && right_type.is_floating_point() {
                    Some(right_type)
                } else if left_type.is_numeric() && right_type.is_numeric() {
                    Some(left_type)
                } else {
                    self.unsupported_operands(operator, &left_type, &right_type)
                }
            }
            TokenKind::Percent
            | TokenKind::Amp
            | TokenKind::Pipe
            | TokenKind::Caret
            | TokenKind::LtLt
            | TokenKind::GtGt => {
                if left_type.is_integer() && right_type.is_integer() {
                    Some(left_type)
                } else {
                    self.unsupported_operands(operator, &left_type, &right_type)
                }
            }
            TokenKind::EqEq | TokenKind::NotEq => {
                if left_type.is_boolean() && right_type.is_boolean() {
                    Some(left_type)
                } else if left_type.is_numeric() && right_type.is_numeric() {
                    Some(bool_type(operator))
                } else {
                    self.unsupported_operands(operator, &left_type, &right_type)
                }
            }
            TokenKind::Lt | TokenKind::Gt | TokenKind::Le | TokenKind::Ge => {
                if left_type.is_numeric() && right_type.is_numeric() {
                    Some(bool_type(operator))
                } else {
                    self.unsupported_operands(operator, &left_type, &right_type)
                }
            }
            TokenKind::AndAnd | TokenKind::OrOr | TokenKind::CaretCaret => {
                if left_type.is_boolean() && right_type.is_boolean() {
                    Some(left_type)
                } else {
                    self.unsupported_operands(operator, &left_type, &right_type)
                }
            }
            TokenKind::Eq => {
                if !is_assignable(left) {
                    return self.type_error("left operand must be assignable", Some(operator));
                }

                if !is_same_type(Some(&left_type), Some(&right_type)) {
                    return self.type_error(
                        &format!(
                            "could not assign `{}` to `{}`",
                            left_type.type_name.lexeme, right_type.type_name.lexeme
                        ),
                        Some(operator),
                    );
                }

                Some(left_type)
            }
            TokenKind::PlusEq | TokenKind::MinusEq | TokenKind::StarEq | TokenKind::SlashEq => {
                if !is_assignable(left) {
                    return self.type_error("left operand must be assignable", Some(operator));
                }

                if !left_type.is_numeric() {
                    return self.type_error(
                        "left operand must be either an integer type or floating point type",
                        Some(operator),
                    );
                }

                if !right_type.is_numeric() {
                    return self.type_error(
                        "right operand must be either an integer type or floating point type",
                        Some(operator),
                    );
                }

                Some(left_type)
            }
            TokenKind::PercentEq
            | TokenKind::AmpEq
            | TokenKind::PipeEq
            | TokenKind::CaretEq
            | TokenKind::LtLtEq
            | TokenKind::GtGtEq => {
                if !is_assignable(left) {
                    return self.type_error("left operand must be assignable", Some(operator));
                }

                if !left_type.is_integer() {
                    return self.type_error("left operand must be an integer type", Some(operator));
                }

                if !right_type.is_integer() {
                    return self
                        .type_error("right operand must be an integer type", Some(operator));
                }

                Some(left_type)
            }
            _ => None,
        }
    }

    fn type_of_identifier(&mut self, stack: &SymbolStack, name: &Token) -> Option<DataType> {
        if let Some(data_type) = stack.lookup_symbol(&name.lexeme) {
            return Some(data_type.clone());
        }

        self.type_error(&format!("`{}` is undefined", name.lexeme), Some(name))
    }

    fn type_of_member_access(
        &mut self,
        stack: &SymbolStack,
        owner: &Expression,
        member: &Token,
    ) -> Option<DataType> {
        let Some(owner_type) = self.type_of_expression(stack, owner) else {
            return self.type_error(
                &format!("could not determine what `{}` is", member.lexeme),
                Some(member),
            );
        };

        let Some(structure) = self
            .symbol_table
            .lookup_structure(&owner_type.type_name.lexeme)
        else {
            return self.type_error(
                &format!(
                    "type `{}` does not have a member `{}`",
                    owner_type.type_name.lexeme, member.lexeme
                ),
                Some(member),
            );
        };

        for declarator in &structure.members {
            if declarator.name.lexeme == member.lexeme {
                return Some(declarator.data_type.clone());
            }
        }

        self.type_error(
            &format!(
                "struct `{}` does not have a member `{}`",
                structure.name.lexeme, member.lexeme
            ),
            Some(member),
        )
    }

    fn type_of_function_call(
        &mut self,
        stack: &SymbolStack,
        callee: &Expression,
        arguments: &[Expression],
    ) -> Option<DataType> {
        match callee {
            // A plain `f(...)` resolves through the global namespace and may
            // not name a method.
            Expression::Identifier { name, .. } => {
                let Some(function) = self.symbol_table.lookup_function(&name.lexeme) else {
                    return self
                        .type_error(&format!("`{}()` is undefined", name.lexeme), Some(name));
                };

                if let Some(owner) = &function.owner {
                    return self.type_error(
                        &format!(
                            "`{}::{}()` cannot be called here",
                            owner.lexeme, function.name.lexeme
                        ),
                        Some(name),
                    );
                }

                self.check_arguments(stack, function, arguments, name)
            }
            // `value.m(...)` resolves `m` as a method of the value's struct.
            Expression::MemberAccess { owner, member, .. } => {
                let Some(operand_type) = self.type_of_expression(stack, owner) else {
                    return self.type_error(
                        "could not determine where this member function comes from",
                        Some(member),
                    );
                };

                let function = self
                    .symbol_table
                    .lookup_function(&member.lexeme)
                    .filter(|function| {
                        function
                            .owner
                            .as_ref()
                            .is_some_and(|owner| owner.lexeme == operand_type.type_name.lexeme)
                    });

                let Some(function) = function else {
                    return self.type_error(
                        &format!(
                            "`{}` does not have a member function `{}()`",
                            operand_type.type_name.lexeme, member.lexeme
                        ),
                        Some(member),
                    );
                };

                if operand_type.dimensions != 0 {
                    return self
                        .type_error("array types do not have member functions", Some(member));
                }

                self.check_arguments(stack, function, arguments, member)
            }
            _ => self.type_error("cannot call function", None),
        }
    }

    fn check_arguments(
        &mut self,
        stack: &SymbolStack,
        function: &Function,
        arguments: &[Expression],
        anchor: &Token,
    ) -> Option<DataType> {
        let required = function.parameters.len();

        if arguments.len() != required {
            return self.type_error(
                &format!(
                    "`{}()` requires {} arguments but were given {}",
                    function.name.lexeme,
                    required,
                    arguments.len()
                ),
                Some(anchor),
            );
        }

        for (argument, parameter) in arguments.iter().zip(&function.parameters) {
            let given_type = self.type_of_expression(stack, argument);

            if !is_same_type(given_type.as_ref(), Some(&parameter.data_type)) {
                return self.type_error("invalid arguments", Some(anchor));
            }
        }

        function.return_type.clone()
    }

    fn unsupported_operands(
        &mut self,
        operator: &Token,
        left: &DataType,
        right: &DataType,
    ) -> Option<DataType> {
        self.type_error(
            &format!(
                "no support for `{}` operation between `{}` and `{}`",
                operator.lexeme, left.type_name.lexeme, right.type_name.lexeme
            ),
            Some(operator),
        )
    }
}

fn is_assignable(expression: &Expression) -> bool {
    matches!(
        expression,
        Expression::Identifier { .. } | Expression::MemberAccess { .. }
    )
}

fn type_of_number(value: &Token) -> Option<DataType> {
    match value.kind {
        TokenKind::IntegerLiteral => Some(int_type(value)),
        TokenKind::FloatLiteral => Some(float_type(value)),
        _ => None,
    }
}

fn type_of_literal(value: &Token) -> Option<DataType> {
    match value.kind {
        TokenKind::True | TokenKind::False => Some(bool_type(value)),
        TokenKind::Null => Some(null_type(value)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use crate::analyzer::analyze;
    use crate::error::CompileResult;
    use crate::parser::parse;
    use crate::source::SourceFile;
    use crate::tokenizer::tokenize;

    fn analyze_body(body: &str) -> CompileResult<()> {
        let text = format!("struct Pt {{ int x; int y; }} int Pt::sum(void) {{ return self.x + self.y; }} void helper(int a, float b) {{ }} int main(void) {{ {body} return 0; }}");
        let source = SourceFile::from_text("test.x", &text);
        let tokens = tokenize(&source)?;
        let program = parse(&source, &tokens)?;
        analyze(&source, &program).map(|_| ())
    }

    #[test]
    fn test_arithmetic_needs_numeric_operands() {
        assert!(analyze_body("int x = 1 + 2;").is_ok());
        assert!(analyze_body("float f = 0.5 * 2.5;").is_ok());
        assert!(analyze_body("int x = 1 + true;").is_err());
    }

    #[test]
    fn test_mixed_arithmetic_is_floating() {
        // int ⊕ float takes the floating side.
        assert!(analyze_body("float f = 1 + 0.5;").is_ok());
        assert!(analyze_body("float f = 0.5 + 1;").is_ok());
        assert!(analyze_body("int x = 1 + 0.5;").is_err());
    }

    #[test]
    fn test_modulo_and_bitwise_are_integer_only() {
        assert!(analyze_body("int x = 7 % 2;").is_ok());
        assert!(analyze_body("int x = 7 & 2;").is_ok());
        assert!(analyze_body("int x = 0.5 % 2;").is_err());
        assert!(analyze_body("int x = 1 << 0.5;").is_err());
    }

    #[test]
    fn test_comparisons_yield_bool() {
        assert!(analyze_body("bool b = 1 < 2;").is_ok());
        assert!(analyze_body("bool b = 1.5 == 2;").is_ok());
        assert!(analyze_body("bool b = true == false;").is_ok());
        assert!(analyze_body("bool b = true == 1;").is_err());
    }

    #[test]
    fn test_boolean_connectives() {
        assert!(analyze_body("bool b = true && false || true ^^ false;").is_ok());
        assert!(analyze_body("bool b = 1 && true;").is_err());
    }

    #[test]
    fn test_assignment_needs_an_assignable_left_side() {
        assert!(analyze_body("int x = 0; x = 1;").is_ok());
        assert!(analyze_body("Pt p; p.x = 1;").is_ok());
        assert!(analyze_body("1 = 2;").is_err());
    }

    #[test]
    fn test_compound_assignment_operand_rules() {
        assert!(analyze_body("int x = 0; x += 1;").is_ok());
        assert!(analyze_body("int x = 0; x %= true;").is_err());
        assert!(analyze_body("bool b = true; b += 1;").is_err());
    }

    #[test]
    fn test_increment_needs_an_integer_variable() {
        assert!(analyze_body("int x = 0; ++x; x++;").is_ok());
        assert!(analyze_body("float f = 0.5; ++f;").is_err());
        assert!(analyze_body("++3;").is_err());
    }

    #[test]
    fn test_reference_of_needs_a_plain_value() {
        assert!(analyze_body("int x = 0; &int r = &x;").is_ok());
        assert!(analyze_body("int x = 0; &int r = &x; &int s = &r;").is_err());
        assert!(analyze_body("&int r = &3;").is_err());
    }

    #[test]
    fn test_member_access() {
        assert!(analyze_body("Pt p; int x = p.x;").is_ok());
        assert!(analyze_body("Pt p; int x = p.z;").is_err());
        assert!(analyze_body("int i = 0; int x = i.x;").is_err());
    }

    #[test]
    fn test_function_calls() {
        assert!(analyze_body("helper(1, 0.5);").is_ok());
        assert!(analyze_body("helper(1);").is_err());
        assert!(analyze_body("helper(0.5, 1);").is_err());
        assert!(analyze_body("missing();").is_err());
    }

    #[test]
    fn test_method_calls() {
        assert!(analyze_body("Pt p; int s = p.sum();").is_ok());
        assert!(analyze_body("sum();").is_err());
        assert!(analyze_body("int i = 0; i.sum();").is_err());
    }

    #[test]
    fn test_undefined_identifier() {
        assert!(analyze_body("int x = ghost;").is_err());
    }
}
