//! Symbol bookkeeping for the analyzer.
//!
//! [`SymbolTable`] is the flat top-level namespace: functions and structs
//! share it, so a struct and a function may not use the same name. It holds
//! borrowed references into the [`Program`](crate::ast::Program), which owns
//! every declaration.
//!
//! [`SymbolStack`] tracks local bindings while a function body is walked: one
//! frame per lexical scope, innermost last.

use rustc_hash::FxHashMap;

use crate::ast::{DataType, Declaration, Function, Structure};

#[derive(Default)]
pub struct SymbolTable<'a> {
    symbols: FxHashMap<String, &'a Declaration>,
}

impl<'a> SymbolTable<'a> {
    pub fn new() -> SymbolTable<'a> {
        SymbolTable::default()
    }

    /// Register a top-level declaration. Returns `false` when the name is
    /// taken, by either kind of declaration.
    pub fn load(&mut self, declaration: &'a Declaration) -> bool {
        let name = match declaration {
            Declaration::Function(function) => &function.name.lexeme,
            Declaration::Structure(structure) => &structure.name.lexeme,
        };

        if self.symbols.contains_key(name) {
            return false;
        }

        self.symbols.insert(name.clone(), declaration);
        true
    }

    pub fn lookup_function(&self, name: &str) -> Option<&'a Function> {
        match self.symbols.get(name) {
            Some(Declaration::Function(function)) => Some(function),
            _ => None,
        }
    }

    pub fn lookup_structure(&self, name: &str) -> Option<&'a Structure> {
        match self.symbols.get(name) {
            Some(Declaration::Structure(structure)) => Some(structure),
            _ => None,
        }
    }
}

#[derive(Default)]
pub struct SymbolStack {
    frames: Vec<FxHashMap<String, DataType>>,
}

impl SymbolStack {
    pub fn new() -> SymbolStack {
        SymbolStack::default()
    }

    pub fn push_frame(&mut self) {
        self.frames.push(FxHashMap::default());
    }

    pub fn pop_frame(&mut self) {
        self.frames.pop();
    }

    /// Bind a name in the innermost frame.
    pub fn add_symbol(&mut self, name: &str, data_type: DataType) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.to_string(), data_type);
        }
    }

    /// Resolve a name, innermost frame first.
    pub fn lookup_symbol(&self, name: &str) -> Option<&DataType> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Token, TokenKind};

    fn int_type() -> DataType {
        DataType {
            is_reference: false,
            dimensions: 0,
            type_name: Token {
                index: 0,
                line: 0,
                column: 0,
                kind: TokenKind::Int,
                lexeme: "int".to_string(),
            },
        }
    }

    #[test]
    fn test_stack_shadowing() {
        let mut stack = SymbolStack::new();
        stack.push_frame();
        stack.add_symbol("x", int_type());

        stack.push_frame();
        let mut shadow = int_type();
        shadow.is_reference = true;
        stack.add_symbol("x", shadow);

        assert!(stack.lookup_symbol("x").is_some_and(|t| t.is_reference));

        stack.pop_frame();
        assert!(stack.lookup_symbol("x").is_some_and(|t| !t.is_reference));
    }

    #[test]
    fn test_lookup_misses_popped_frames() {
        let mut stack = SymbolStack::new();
        stack.push_frame();
        stack.push_frame();
        stack.add_symbol("inner", int_type());
        stack.pop_frame();

        assert!(stack.lookup_symbol("inner").is_none());
    }
}
