//! Statement validation.
//!
//! Scope rules worth calling out:
//! - `while` bodies and both arms of a conditional get their own frame.
//! - A `for` loop's init declaration binds in the *enclosing* frame and its
//!   body shares that frame too, so loop variables stay visible after the
//!   loop.
//! - `break`/`continue` are legal whenever `loop_depth` is non-zero, however
//!   many frames deep the statement sits.

use crate::analyzer::{is_same_type, Analyzer};
use crate::ast::{
    BlockStatement, Conditional, DataType, ElseBranch, Expression, Statement, VariableDeclaration,
};
use crate::symbols::SymbolStack;
use crate::token::TokenKind;

impl<'a> Analyzer<'a> {
    pub(crate) fn validate_block(&mut self, stack: &mut SymbolStack, block: &BlockStatement) {
        for statement in &block.statements {
            self.validate_statement(stack, statement);
        }
    }

    fn validate_statement(&mut self, stack: &mut SymbolStack, statement: &Statement) {
        match statement {
            Statement::VariableDeclaration(declaration) => {
                self.validate_variable_declaration(stack, declaration);
            }
            Statement::Expression(expression) => {
                self.type_of_expression(stack, expression);
            }
            Statement::While(iteration) => {
                if !self.has_boolean_type(stack, &iteration.condition) {
                    self.report("while condition should evaluate to be bool", None);
                }

                stack.push_frame();
                self.loop_depth += 1;
                self.validate_block(stack, &iteration.body);
                self.loop_depth -= 1;
                stack.pop_frame();
            }
            Statement::For(iteration) => {
                if let Some(initial) = &iteration.initial {
                    self.validate_variable_declaration(stack, initial);
                }

                if let Some(condition) = &iteration.condition {
                    if !self.has_boolean_type(stack, condition) {
                        self.report("for loop condition must evaluate to a bool", None);
                    }
                }

                if let Some(update) = &iteration.update {
                    self.type_of_expression(stack, update);
                }

                self.loop_depth += 1;
                self.validate_block(stack, &iteration.body);
                self.loop_depth -= 1;
            }
            Statement::Conditional(conditional) => {
                self.validate_conditional(stack, conditional);
            }
            Statement::Return(expression) => {
                self.validate_return(stack, expression.as_ref());
            }
            Statement::Break => {
                if self.loop_depth == 0 {
                    self.report("`break` statement must be within a loop", None);
                }
            }
            Statement::Continue => {
                if self.loop_depth == 0 {
                    self.report("`continue` statement must be within a loop", None);
                }
            }
        }
    }

    fn validate_variable_declaration(
        &mut self,
        stack: &mut SymbolStack,
        declaration: &VariableDeclaration,
    ) {
        let variable_type = &declaration.declarator.data_type;
        let variable_name = &declaration.declarator.name;

        if variable_type.type_name.kind == TokenKind::Identifier
            && self
                .symbol_table
                .lookup_structure(&variable_type.type_name.lexeme)
                .is_none()
        {
            self.report(
                &format!("type `{}` is undefined", variable_type.type_name.lexeme),
                Some(&variable_type.type_name),
            );
        }

        if stack.lookup_symbol(&variable_name.lexeme).is_some() {
            self.report(
                &format!(
                    "variable name of `{}` is already defined",
                    variable_name.lexeme
                ),
                Some(variable_name),
            );
        } else {
            stack.add_symbol(&variable_name.lexeme, variable_type.clone());
        }

        let Some(initial) = &declaration.initial else {
            return;
        };

        let Some(initial_type) = self.type_of_expression(stack, initial) else {
            self.report("could not assign initial value", Some(variable_name));
            return;
        };

        if !is_same_type(Some(variable_type), Some(&initial_type)) {
            self.report(
                &format!(
                    "`{}` was declared as `{}` but was initialized as `{}`",
                    variable_name.lexeme,
                    variable_type.type_name.lexeme,
                    initial_type.type_name.lexeme
                ),
                Some(variable_name),
            );
        }
    }

    fn validate_conditional(&mut self, stack: &mut SymbolStack, conditional: &Conditional) {
        if !self.has_boolean_type(stack, &conditional.condition) {
            self.report("if condition should evaluate to be bool", None);
        }

        stack.push_frame();
        self.validate_block(stack, &conditional.body);
        stack.pop_frame();

        match &conditional.else_case {
            Some(ElseBranch::Block(block)) => {
                stack.push_frame();
                self.validate_block(stack, block);
                stack.pop_frame();
            }
            Some(ElseBranch::If(nested)) => self.validate_conditional(stack, nested),
            None => {}
        }
    }

    fn validate_return(&mut self, stack: &SymbolStack, expression: Option<&Expression>) {
        let current_return: Option<&DataType> = self.current_return;

        match (expression, current_return) {
            (None, None) => {}
            (None, Some(_)) => self.report("expected a return value", None),
            (Some(_), None) => self.report(
                "given a return value when the function should not return anything",
                None,
            ),
            (Some(expression), Some(_)) => {
                let value_type = self.type_of_expression(stack, expression);

                if !is_same_type(value_type.as_ref(), current_return) {
                    self.report("mismatch in return type", None);
                }
            }
        }
    }

    fn has_boolean_type(&mut self, stack: &SymbolStack, expression: &Expression) -> bool {
        self.type_of_expression(stack, expression)
            .is_some_and(|data_type| data_type.is_boolean())
    }
}
