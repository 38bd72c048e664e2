//! Shared error types for the compilation pipeline.
//!
//! Individual diagnostics are rendered to stderr as they are discovered (see
//! [`crate::diagnostics`]); the variants here only summarise why a stage gave
//! up, so the driver can print one final line and pick an exit code.

use thiserror::Error;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("{source}: `{path}`")]
    OpenSource {
        path: String,
        source: std::io::Error,
    },

    #[error("cannot write `{path}`: {source}")]
    WriteOutput {
        path: String,
        source: std::io::Error,
    },

    #[error("found {count} lexical error(s)")]
    Tokenize { count: usize },

    #[error("found {count} syntax error(s)")]
    Parse { count: usize },

    #[error("found {count} semantic error(s)")]
    Analyze { count: usize },

    #[error("could not translate the program to C")]
    Emit,
}
