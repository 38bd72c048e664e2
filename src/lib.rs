//! # xc
//!
//! A compiler front-end for X, a small statically-typed language with
//! structs, methods, and references, targeting portable C.
//!
//! ## Compilation pipeline
//!
//! ```text
//! Source → Tokenizer → Parser → Analyzer → CEmitter → <input>.c
//! ```
//!
//! 1. [`source`] — loads the input as newline-terminated lines.
//! 2. [`tokenizer`] — scans characters into a [`token::TokenStream`].
//! 3. [`parser`] — recursive descent into an [`ast::Program`], with error
//!    recovery at declaration and block boundaries.
//! 4. [`analyzer`] — symbol resolution and type checking; produces the
//!    [`analyzer::TypeMap`] of every expression's evaluated type.
//! 5. [`emitter`] — writes the C translation unit, using only `<stdint.h>`,
//!    `<stdbool.h>`, `<stdlib.h>`, and `<stddef.h>`.
//!
//! Every stage runs to completion and reports all the diagnostics it can
//! find; a stage with at least one error stops the pipeline afterwards.

pub mod analyzer;
pub mod ast;
pub mod diagnostics;
pub mod emitter;
pub mod error;
pub mod parser;
pub mod source;
pub mod symbols;
pub mod token;
pub mod tokenizer;

pub use error::{CompileError, CompileResult};

use source::SourceFile;

/// Compile the file at `target` into `<target>.c`.
pub fn compile(target: &str) -> CompileResult<()> {
    let source = SourceFile::load(target)?;
    let tokens = tokenizer::tokenize(&source)?;
    let program = parser::parse(&source, &tokens)?;
    let types = analyzer::analyze(&source, &program)?;
    let code = emitter::emit(&program, &types, &source.filename)?;

    code.write()
}
