//! Declaration parsing: structs, functions, data types, and declarators.
//!
//! ```text
//! declaration ::= structure | function
//! structure   ::= "struct" IDENT "{" members? "}"
//! function    ::= type (IDENT "::")? IDENT "(" ("void" | parameters)? ")" block
//! type        ::= "&"? (IDENT | primitive) ("[" "]")*
//! ```

use crate::ast::{DataType, Declaration, Function, Structure, VariableDeclarator};
use crate::parser::{ParseResult, Parser};
use crate::token::TokenKind;

impl<'a> Parser<'a> {
    pub(crate) fn parse_declaration(&mut self) -> ParseResult<Declaration> {
        self.try_parse(
            &[
                |p| p.parse_structure().map(Declaration::Structure),
                |p| p.parse_function().map(Declaration::Function),
            ],
            "expected declaration",
        )
    }

    pub(crate) fn parse_structure(&mut self) -> ParseResult<Structure> {
        if !self.consume_if(TokenKind::Struct) {
            return Err(self.error("expected keyword `struct`"));
        }

        let mut errors = Vec::new();

        let mut name = None;
        if self.matches(TokenKind::Identifier) {
            name = Some(self.next().clone());
        } else {
            errors.extend(self.error("expected identifier"));
        }

        if !self.consume_if(TokenKind::LBrace) {
            errors.extend(self.error("expected `{`"));
        }

        let mut members = Vec::new();
        if !self.matches(TokenKind::RBrace) {
            match self.try_parse(
                &[|p| p.parse_structure_members()],
                "expected structure members",
            ) {
                Ok(parsed) => members = parsed,
                Err(member_errors) => errors.extend(member_errors),
            }
        }

        if !self.consume_if(TokenKind::RBrace) {
            errors.extend(self.error("expected `}`"));
        }

        match name {
            Some(name) if errors.is_empty() => Ok(Structure { name, members }),
            _ => Err(errors),
        }
    }

    /// One or more `type name ;` members. Recovery inside the body
    /// synchronises on `;` or the closing `}`.
    fn parse_structure_members(&mut self) -> ParseResult<Vec<VariableDeclarator>> {
        let mut members = Vec::new();
        let mut errors = Vec::new();

        loop {
            match self.parse_variable_declarator() {
                Ok(member) => {
                    if self.consume_if(TokenKind::Semicolon) {
                        members.push(member);
                    } else {
                        errors.extend(self.error("expected `;`"));
                    }
                }
                Err(member_errors) => {
                    errors.extend(member_errors);

                    while !self.at_end()
                        && !(self.consume_if(TokenKind::Semicolon)
                            || self.matches(TokenKind::RBrace))
                    {
                        self.next();
                    }
                }
            }

            if self.at_end() || self.matches(TokenKind::RBrace) {
                break;
            }
        }

        if errors.is_empty() {
            Ok(members)
        } else {
            Err(errors)
        }
    }

    pub(crate) fn parse_function(&mut self) -> ParseResult<Function> {
        let mut errors = Vec::new();

        let mut return_type = None;
        match self.parse_data_type() {
            // A bare `void` return type means "returns nothing".
            Ok(data_type) => {
                if data_type.type_name.kind != TokenKind::Void
                    || data_type.is_reference
                    || data_type.dimensions > 0
                {
                    return_type = Some(data_type);
                }
            }
            Err(type_errors) => errors.extend(type_errors),
        }

        // `Owner::name` is only recognised from an identifier directly
        // followed by `::`; anything else is a plain function name.
        let mut owner = None;
        if self.matches(TokenKind::Identifier) && self.match_next(TokenKind::ColonColon) {
            owner = Some(self.next().clone());
            self.next(); // ::
        }

        let mut name = None;
        if self.matches(TokenKind::Identifier) {
            name = Some(self.next().clone());
        } else {
            errors.extend(self.error("expected identifier"));
        }

        if !self.consume_if(TokenKind::LParen) {
            errors.extend(self.error("expected `(`"));
        }

        let mut parameters = Vec::new();
        if !self.consume_if(TokenKind::Void) && !self.matches(TokenKind::RParen) {
            match self.try_parse(&[|p| p.parse_parameters()], "expected parameters") {
                Ok(parsed) => parameters = parsed,
                Err(parameter_errors) => errors.extend(parameter_errors),
            }
        }

        if !self.consume_if(TokenKind::RParen) {
            errors.extend(self.error("expected `)`"));
        }

        let body = match self.parse_block_statement() {
            Ok(block) => Some(block),
            Err(body_errors) => {
                errors.extend(body_errors);
                None
            }
        };

        match (name, body) {
            (Some(name), Some(body)) if errors.is_empty() => Ok(Function {
                owner,
                return_type,
                name,
                parameters,
                body,
            }),
            _ => Err(errors),
        }
    }

    fn parse_parameters(&mut self) -> ParseResult<Vec<VariableDeclarator>> {
        let mut parameters = Vec::new();
        let mut errors = Vec::new();

        loop {
            match self.parse_variable_declarator() {
                Ok(parameter) => parameters.push(parameter),
                Err(parameter_errors) => errors.extend(parameter_errors),
            }

            if self.at_end() || !self.consume_if(TokenKind::Comma) {
                break;
            }
        }

        if errors.is_empty() {
            Ok(parameters)
        } else {
            Err(errors)
        }
    }

    pub(crate) fn parse_data_type(&mut self) -> ParseResult<DataType> {
        let is_reference = self.consume_if(TokenKind::Amp);

        if !self.matches(TokenKind::Identifier) && !self.current().kind.is_type_keyword() {
            return Err(self.error("expected identifier, or type"));
        }

        let type_name = self.next().clone();

        let mut dimensions = 0;
        while !self.at_end()
            && self.matches(TokenKind::LBracket)
            && self.match_next(TokenKind::RBracket)
        {
            self.next(); // [
            self.next(); // ]
            dimensions += 1;
        }

        Ok(DataType {
            is_reference,
            type_name,
            dimensions,
        })
    }

    pub(crate) fn parse_variable_declarator(&mut self) -> ParseResult<VariableDeclarator> {
        let mut errors = Vec::new();

        let data_type = match self.parse_data_type() {
            Ok(data_type) => Some(data_type),
            Err(type_errors) => {
                errors.extend(type_errors);
                None
            }
        };

        let mut name = None;
        if self.matches(TokenKind::Identifier) {
            name = Some(self.next().clone());
        } else {
            errors.extend(self.error("expected identifier"));
        }

        match (data_type, name) {
            (Some(data_type), Some(name)) if errors.is_empty() => {
                Ok(VariableDeclarator { data_type, name })
            }
            _ => Err(errors),
        }
    }
}
