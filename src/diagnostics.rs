//! Diagnostic rendering.
//!
//! Every error is printed to stderr as soon as it is discovered, in a
//! rustc-like four-line shape:
//!
//! ```text
//! xc: error: <message>
//!  --> <filename>:<line>:<column>
//!    :
//!  <line> | <line-content>
//!    :     ^^^^
//! ```
//!
//! Lines and columns are 0-based everywhere else in the crate and converted
//! to 1-based only here. The [`Reporter`] also counts what it printed so each
//! pipeline stage can decide, once it has run to completion, whether to hand
//! its output to the next stage.

use color_print::cformat;

use crate::source::SourceFile;
use crate::token::Token;

pub struct Reporter<'a> {
    source: &'a SourceFile,
    errors: usize,
}

impl<'a> Reporter<'a> {
    pub fn new(source: &'a SourceFile) -> Reporter<'a> {
        Reporter { source, errors: 0 }
    }

    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    /// An error with no usable anchor; the bare message is all we can print.
    pub fn plain(&mut self, message: &str) {
        self.errors += 1;
        eprintln!("{}", cformat!("xc: <red,bold>error</>: {}", message));
    }

    /// An error underlining a single token's lexeme.
    pub fn at_token(&mut self, message: &str, token: &Token) {
        self.errors += 1;

        let header = cformat!("xc: <red,bold>error</>: {}", message);
        let info = format!(
            " --> {}:{}:{}",
            self.source.filename,
            token.line + 1,
            token.column + 1
        );

        eprintln!("{header}");
        eprintln!("{info}");
        if let Some(line) = self.source.line(token.line) {
            let width = token.lexeme.len().min(line.len().saturating_sub(token.column));
            self.preview(token.line, line, token.column, width.max(1));
        }
    }

    /// An error between two stream-adjacent tokens; the caret span covers the
    /// right token, the gap between the two, or the pair, depending on how
    /// they sit on the line.
    pub fn at_span(&mut self, message: &str, left: &Token, right: &Token) {
        self.errors += 1;

        let line_no = left.line;
        let after_left = left.column + left.lexeme.len();

        let header = cformat!("xc: <red,bold>error</>: {}", message);
        let info = format!(
            " --> {}:{}:{}",
            self.source.filename,
            line_no + 1,
            after_left + 1
        );

        eprintln!("{header}");
        eprintln!("{info}");

        let Some(line) = self.source.line(line_no) else {
            return;
        };

        let (start, width) = if left.index == right.index {
            (left.column, left.lexeme.len())
        } else if left.line != right.line {
            (after_left, 1)
        } else if after_left == right.column {
            (left.column, left.lexeme.len() + right.lexeme.len())
        } else {
            (after_left, right.column - after_left)
        };

        self.preview(line_no, line, start, width.max(1));
    }

    /// The divider / line-content / underline tail of a diagnostic. The line
    /// content still carries its '\n', so only the underline needs one.
    fn preview(&self, line_no: usize, line: &str, start: usize, width: usize) {
        let number = (line_no + 1).to_string();
        let divider = format!("{}:", " ".repeat(number.len() + 2));
        let underline = "^".repeat(width.min(line.len().saturating_sub(start)).max(1));

        eprint!("{divider}\n {number} | {line}");
        eprintln!("{divider}{}{underline}", " ".repeat(start + 1));
    }
}
