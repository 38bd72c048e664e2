//! Source file representation.
//!
//! A [`SourceFile`] is an immutable filename plus the file's lines, each line
//! carrying its terminating `'\n'` (one is appended to the last line if the
//! file does not end with a newline). Keeping whole lines around lets every
//! diagnostic path render a preview of the offending line without re-reading
//! the file. The C emitter reuses the same type for its output buffer.

use std::fs;

use crate::error::{CompileError, CompileResult};

#[derive(Debug, Clone, Default)]
pub struct SourceFile {
    pub filename: String,
    pub content: Vec<String>,
}

impl SourceFile {
    /// Load a source file from disk.
    pub fn load(path: &str) -> CompileResult<SourceFile> {
        let text = fs::read_to_string(path).map_err(|source| CompileError::OpenSource {
            path: path.to_string(),
            source,
        })?;

        Ok(SourceFile::from_text(path, &text))
    }

    /// Build a source file from in-memory text.
    pub fn from_text(filename: &str, text: &str) -> SourceFile {
        SourceFile {
            filename: filename.to_string(),
            content: text.lines().map(|line| format!("{line}\n")).collect(),
        }
    }

    /// The line at `index`, if the file has that many lines.
    pub fn line(&self, index: usize) -> Option<&str> {
        self.content.get(index).map(String::as_str)
    }

    /// Write the buffered content to `self.filename`.
    pub fn write(&self) -> CompileResult<()> {
        fs::write(&self.filename, self.content.concat()).map_err(|source| {
            CompileError::WriteOutput {
                path: self.filename.clone(),
                source,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_are_newline_terminated() {
        let source = SourceFile::from_text("test.x", "int x;\nint y;");
        assert_eq!(source.content.len(), 2);
        assert_eq!(source.line(0), Some("int x;\n"));
        assert_eq!(source.line(1), Some("int y;\n"));
    }

    #[test]
    fn test_empty_file_has_no_lines() {
        let source = SourceFile::from_text("test.x", "");
        assert!(source.content.is_empty());
        assert_eq!(source.line(0), None);
    }
}
