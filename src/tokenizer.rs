//! Tokenizer for X source code.
//!
//! Scans the source one byte at a time with two cursors: `head` points at the
//! next unread character and `tail` at the start of the lexeme currently
//! being built. Consumed characters accumulate in a buffer until a token is
//! emitted, at which point the buffer becomes the token's lexeme and `tail`
//! snaps forward to `head`. Whitespace runs, comments, and malformed lexemes
//! are scanned the same way but never reach the stream.
//!
//! Lexical errors are rendered immediately and recorded; scanning always
//! continues to the end of the input so one bad literal does not hide the
//! next one.

use crate::diagnostics::Reporter;
use crate::error::{CompileError, CompileResult};
use crate::source::SourceFile;
use crate::token::{Token, TokenKind, TokenStream};

/// Tokenize an entire source file.
///
/// Returns the token stream (always terminated by a single `Eof` token) when
/// no lexical errors were found.
pub fn tokenize(source: &SourceFile) -> CompileResult<TokenStream> {
    let mut tokenizer = Tokenizer::new(source);
    tokenizer.run();

    if tokenizer.reporter.has_errors() {
        Err(CompileError::Tokenize {
            count: tokenizer.reporter.error_count(),
        })
    } else {
        Ok(tokenizer.tokens)
    }
}

#[derive(Clone, Copy, Default)]
struct Position {
    line: usize,
    column: usize,
}

struct Tokenizer<'a> {
    source: &'a SourceFile,
    reporter: Reporter<'a>,
    head: Position,
    tail: Position,
    lexeme_buffer: String,
    tokens: TokenStream,
}

impl<'a> Tokenizer<'a> {
    fn new(source: &'a SourceFile) -> Tokenizer<'a> {
        Tokenizer {
            source,
            reporter: Reporter::new(source),
            head: Position::default(),
            tail: Position::default(),
            lexeme_buffer: String::new(),
            tokens: Vec::new(),
        }
    }

    fn run(&mut self) {
        while !self.at_end() {
            let c = self.next();
            self.process(c);
        }

        self.add_token(TokenKind::Eof);
    }

    fn process(&mut self, c: u8) {
        let kind = match c {
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b';' => TokenKind::Semicolon,
            b',' => TokenKind::Comma,
            b'.' => TokenKind::Dot,
            b'~' => TokenKind::Tilde,
            b':' => {
                if self.match_char(b':') {
                    TokenKind::ColonColon
                } else {
                    TokenKind::Colon
                }
            }
            b'=' => {
                if self.match_char(b'=') {
                    TokenKind::EqEq
                } else {
                    TokenKind::Eq
                }
            }
            b'+' => {
                if self.match_char(b'+') {
                    TokenKind::PlusPlus
                } else if self.match_char(b'=') {
                    TokenKind::PlusEq
                } else {
                    TokenKind::Plus
                }
            }
            b'-' => {
                if self.match_char(b'-') {
                    TokenKind::MinusMinus
                } else if self.match_char(b'=') {
                    TokenKind::MinusEq
                } else {
                    TokenKind::Minus
                }
            }
            b'*' => {
                if self.match_char(b'=') {
                    TokenKind::StarEq
                } else {
                    TokenKind::Star
                }
            }
            b'/' => {
                if self.match_char(b'/') {
                    self.scan_line_comment()
                } else if self.match_char(b'*') {
                    self.scan_block_comment()
                } else if self.match_char(b'=') {
                    TokenKind::SlashEq
                } else {
                    TokenKind::Slash
                }
            }
            b'%' => {
                if self.match_char(b'=') {
                    TokenKind::PercentEq
                } else {
                    TokenKind::Percent
                }
            }
            b'&' => {
                if self.match_char(b'&') {
                    TokenKind::AndAnd
                } else if self.match_char(b'=') {
                    TokenKind::AmpEq
                } else {
                    TokenKind::Amp
                }
            }
            b'^' => {
                if self.match_char(b'^') {
                    TokenKind::CaretCaret
                } else if self.match_char(b'=') {
                    TokenKind::CaretEq
                } else {
                    TokenKind::Caret
                }
            }
            b'|' => {
                if self.match_char(b'|') {
                    TokenKind::OrOr
                } else if self.match_char(b'=') {
                    TokenKind::PipeEq
                } else {
                    TokenKind::Pipe
                }
            }
            b'<' => {
                if self.match_char(b'<') {
                    if self.match_char(b'=') {
                        TokenKind::LtLtEq
                    } else {
                        TokenKind::LtLt
                    }
                } else if self.match_char(b'=') {
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                }
            }
            b'>' => {
                if self.match_char(b'>') {
                    if self.match_char(b'=') {
                        TokenKind::GtGtEq
                    } else {
                        TokenKind::GtGt
                    }
                } else if self.match_char(b'=') {
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            b'!' => {
                if self.match_char(b'=') {
                    TokenKind::NotEq
                } else {
                    TokenKind::Bang
                }
            }
            b'\'' => self.scan_character_literal(),
            _ => {
                if c.is_ascii_whitespace() {
                    self.scan_whitespace()
                } else if c == b'0' && self.current() != b'.' {
                    self.scan_zero_prefix_literal()
                } else if c.is_ascii_digit() {
                    self.scan_numeric_literal()
                } else if c == b'_' || c.is_ascii_alphabetic() {
                    self.scan_identifier()
                } else {
                    self.scan_unrecognized_symbol()
                }
            }
        };

        self.add_token(kind);
    }

    // ===== Cursor primitives =====

    fn line_content(&self, line: usize) -> &str {
        self.source.line(line).unwrap_or("")
    }

    fn at_end(&self) -> bool {
        let total_lines = self.source.content.len();
        if total_lines == 0 || self.head.line >= total_lines {
            return true;
        }

        // The terminating '\n' of the last line is never consumed.
        let on_last_line = self.head.line == total_lines - 1;
        let on_end_of_line =
            self.head.column >= self.line_content(self.head.line).len().saturating_sub(1);

        on_last_line && on_end_of_line
    }

    fn current(&self) -> u8 {
        self.line_content(self.head.line)
            .as_bytes()
            .get(self.head.column)
            .copied()
            .unwrap_or(0)
    }

    fn next(&mut self) -> u8 {
        let c = self.current();

        if c == b'\n' {
            self.head.line += 1;
            self.head.column = 0;
        } else {
            self.head.column += 1;
        }

        self.lexeme_buffer.push(c as char);
        c
    }

    fn peek(&self) -> u8 {
        if self.at_end() || self.current() == b'\n' {
            return 0;
        }

        self.line_content(self.head.line)
            .as_bytes()
            .get(self.head.column + 1)
            .copied()
            .unwrap_or(0)
    }

    fn match_char(&mut self, expect: u8) -> bool {
        if self.at_end() || self.current() != expect {
            return false;
        }

        self.next();
        true
    }

    fn consume(&mut self) -> String {
        let lexeme = std::mem::take(&mut self.lexeme_buffer);
        self.tail = self.head;
        lexeme
    }

    // ===== Token construction =====

    fn add_token(&mut self, kind: TokenKind) {
        match kind {
            TokenKind::Whitespace | TokenKind::Comment | TokenKind::Unknown => {
                self.consume();
            }
            _ => {
                let token = self.create_token(kind);
                self.tokens.push(token);
            }
        }
    }

    fn create_token(&mut self, kind: TokenKind) -> Token {
        Token {
            index: self.tokens.len(),
            line: self.tail.line,
            column: self.tail.column,
            kind,
            lexeme: self.consume(),
        }
    }

    fn error(&mut self, message: &str) -> TokenKind {
        let token = self.create_token(TokenKind::Unknown);
        self.reporter.at_token(message, &token);
        TokenKind::Unknown
    }

    fn error_with_symbol(&mut self, message: &str, symbol: u8) -> TokenKind {
        let message = format!("{}: `{}`", message, symbol as char);
        self.error(&message)
    }

    // ===== Scanning routines =====

    fn scan_line_comment(&mut self) -> TokenKind {
        while !self.at_end() && !self.match_char(b'\n') {
            self.next();
        }

        TokenKind::Comment
    }

    fn scan_block_comment(&mut self) -> TokenKind {
        loop {
            if self.at_end() {
                return self.error("missing terminating `*/`");
            }

            if self.match_char(b'*') {
                if self.match_char(b'/') {
                    return TokenKind::Comment;
                }
            } else {
                self.next();
            }
        }
    }

    fn scan_whitespace(&mut self) -> TokenKind {
        while !self.at_end() && self.current().is_ascii_whitespace() {
            self.next();
        }

        TokenKind::Whitespace
    }

    fn scan_identifier(&mut self) -> TokenKind {
        while !self.at_end() && (self.current() == b'_' || self.current().is_ascii_alphanumeric()) {
            self.next();
        }

        TokenKind::keyword(&self.lexeme_buffer).unwrap_or(TokenKind::Identifier)
    }

    /// A literal opened by `0`: either `0` alone or a `0b`/`0o`/`0x` radix
    /// literal.
    fn scan_zero_prefix_literal(&mut self) -> TokenKind {
        if self.match_char(b'b') {
            self.scan_radix_digits(is_binary_digit, "binary")
        } else if self.match_char(b'o') {
            self.scan_radix_digits(is_octal_digit, "octal")
        } else if self.match_char(b'x') {
            self.scan_radix_digits(is_hexadecimal_digit, "hexadecimal")
        } else if self.current().is_ascii_alphanumeric() || self.current() == b'_' {
            self.skip_to_boundary();
            self.error("`0` should be alone or pair with `b`, `o`, or `x`")
        } else {
            TokenKind::IntegerLiteral
        }
    }

    fn scan_radix_digits(&mut self, is_digit: fn(u8) -> bool, radix: &str) -> TokenKind {
        if !is_digit(self.current()) {
            return self.error(&format!("incomplete or invalid {radix} literal"));
        }

        while !self.at_end() && is_digit(self.current()) {
            self.next();
        }

        if self.current().is_ascii_alphanumeric() || self.current() == b'_' {
            let invalid = self.current();
            self.skip_to_boundary();
            return self.error_with_symbol(&format!("invalid {radix} digit"), invalid);
        }

        TokenKind::IntegerLiteral
    }

    fn scan_numeric_literal(&mut self) -> TokenKind {
        while self.current().is_ascii_digit() {
            self.next();
        }

        // A float needs at least one digit after the dot; `1.` stays an
        // integer followed by `.`.
        if self.peek().is_ascii_digit() && self.match_char(b'.') {
            while self.current().is_ascii_digit() {
                self.next();
            }

            return TokenKind::FloatLiteral;
        }

        TokenKind::IntegerLiteral
    }

    fn scan_character_literal(&mut self) -> TokenKind {
        if self.match_char(b'\\') {
            return self.scan_escape_sequence();
        }

        let literal = self.next();

        if literal == b'\'' {
            return self.error("character literal cannot be empty");
        }

        if literal.is_ascii_whitespace() && literal != b' ' {
            self.skip_to_quote();
            return self.error(
                "whitespace other than ` ` is not allowed in a character literal; use an escape sequence instead",
            );
        }

        if !self.match_char(b'\'') {
            self.skip_to_quote();
            return self.error(if self.at_end() {
                "missing terminating `'`"
            } else {
                "too many characters for a character literal"
            });
        }

        TokenKind::CharacterLiteral
    }

    fn scan_escape_sequence(&mut self) -> TokenKind {
        let c = self.next();

        match c {
            b'n' | b't' | b'b' | b'r' | b'a' | b'\'' | b'"' | b'\\' | b'f' | b'v' => {}
            b'0' => {
                if self.match_char(b'b') {
                    if let Some(kind) = self.scan_escape_radix(is_binary_digit, "binary") {
                        return kind;
                    }
                } else if self.match_char(b'o') {
                    if let Some(kind) = self.scan_escape_radix(is_octal_digit, "octal") {
                        return kind;
                    }
                } else if self.match_char(b'x') {
                    if let Some(kind) = self.scan_escape_radix(is_hexadecimal_digit, "hexadecimal")
                    {
                        return kind;
                    }
                } else if self.current().is_ascii_alphabetic() || self.current() == b'_' {
                    self.skip_to_quote();
                    return self.error("`0` should be alone or pair with `b`, `o`, or `x`");
                } else if self.current() == b'.' || self.current().is_ascii_digit() {
                    if self.scan_numeric_literal() == TokenKind::FloatLiteral {
                        self.skip_to_quote();
                        return self.error("escape sequence cannot be a floating point value");
                    }
                }
            }
            _ if c.is_ascii_digit() => {
                if self.scan_numeric_literal() == TokenKind::FloatLiteral {
                    self.skip_to_quote();
                    return self.error("escape sequence cannot be a floating point value");
                }
            }
            _ => {}
        }

        if !self.match_char(b'\'') {
            let invalid = self.current();
            self.skip_to_quote();
            return self.error_with_symbol("invalid escape sequence", invalid);
        }

        TokenKind::CharacterLiteral
    }

    /// Digits of a `\0b…`/`\0o…`/`\0x…` escape. `None` means the digits were
    /// well-formed and the caller still has to match the closing quote.
    fn scan_escape_radix(&mut self, is_digit: fn(u8) -> bool, radix: &str) -> Option<TokenKind> {
        if !is_digit(self.current()) {
            self.skip_to_quote();
            return Some(self.error(&format!("incomplete or invalid {radix} literal")));
        }

        while !self.at_end() && is_digit(self.current()) {
            self.next();
        }

        if self.current().is_ascii_alphanumeric() || self.current() == b'_' {
            let invalid = self.current();
            self.skip_to_quote();
            return Some(self.error_with_symbol(&format!("invalid {radix} digit"), invalid));
        }

        None
    }

    fn scan_unrecognized_symbol(&mut self) -> TokenKind {
        while !self.at_end() && !is_recognized(self.current()) {
            self.next();
        }

        let symbol = self.lexeme_buffer.as_bytes().first().copied().unwrap_or(0);
        self.error_with_symbol("Unrecognized symbol", symbol)
    }

    /// Skip ahead to the next symbol or whitespace; used to swallow the rest
    /// of a malformed numeric literal before reporting it.
    fn skip_to_boundary(&mut self) {
        while !self.at_end() && !(is_symbol(self.current()) || self.current().is_ascii_whitespace())
        {
            self.next();
        }
    }

    /// Skip ahead past the closing quote of a malformed character literal.
    fn skip_to_quote(&mut self) {
        while !self.at_end() && !self.match_char(b'\'') {
            self.next();
        }
    }
}

// ===== Character classes =====

fn is_binary_digit(c: u8) -> bool {
    matches!(c, b'0' | b'1')
}

fn is_octal_digit(c: u8) -> bool {
    matches!(c, b'0'..=b'7')
}

fn is_hexadecimal_digit(c: u8) -> bool {
    c.is_ascii_hexdigit()
}

fn is_symbol(c: u8) -> bool {
    matches!(
        c,
        b'(' | b')'
            | b'['
            | b']'
            | b'{'
            | b'}'
            | b';'
            | b':'
            | b','
            | b'.'
            | b'='
            | b'~'
            | b'+'
            | b'-'
            | b'*'
            | b'/'
            | b'%'
            | b'&'
            | b'^'
            | b'|'
            | b'<'
            | b'>'
            | b'!'
            | b'\''
    )
}

fn is_recognized(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c.is_ascii_whitespace() || is_symbol(c) || c == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize_text(text: &str) -> CompileResult<TokenStream> {
        tokenize(&SourceFile::from_text("test.x", text))
    }

    fn kinds(text: &str) -> Vec<TokenKind> {
        tokenize_text(text)
            .unwrap()
            .iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn test_simple_tokens() {
        let tokens = tokenize_text("int main(void) { return 0; }").unwrap();

        assert_eq!(tokens[0].kind, TokenKind::Int);
        assert!(matches!(&tokens[1], Token { kind: TokenKind::Identifier, lexeme, .. } if lexeme == "main"));
        assert_eq!(tokens[2].kind, TokenKind::LParen);
        assert_eq!(tokens[3].kind, TokenKind::Void);
        assert_eq!(tokens[4].kind, TokenKind::RParen);
        assert_eq!(tokens[5].kind, TokenKind::LBrace);
        assert_eq!(tokens[6].kind, TokenKind::Return);
        assert_eq!(tokens[7].kind, TokenKind::IntegerLiteral);
        assert_eq!(tokens[7].lexeme, "0");
        assert_eq!(tokens[8].kind, TokenKind::Semicolon);
        assert_eq!(tokens[9].kind, TokenKind::RBrace);
        assert_eq!(tokens[10].kind, TokenKind::Eof);
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("++ -- += -= == != && || ^^ :: <<= >>="),
            vec![
                TokenKind::PlusPlus,
                TokenKind::MinusMinus,
                TokenKind::PlusEq,
                TokenKind::MinusEq,
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::AndAnd,
                TokenKind::OrOr,
                TokenKind::CaretCaret,
                TokenKind::ColonColon,
                TokenKind::LtLtEq,
                TokenKind::GtGtEq,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_are_elided() {
        let tokens = tokenize_text("int x; // trailing\nint y; /* block\ncomment */ int z;").unwrap();
        let idents: Vec<&str> = tokens
            .iter()
            .filter(|token| token.kind == TokenKind::Identifier)
            .map(|token| token.lexeme.as_str())
            .collect();

        assert_eq!(idents, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_unterminated_block_comment() {
        assert!(tokenize_text("int x; /* never closed").is_err());
    }

    #[test]
    fn test_radix_literals() {
        let tokens = tokenize_text("0 0b101 0o17 0x1F").unwrap();

        assert!(tokens[..4]
            .iter()
            .all(|token| token.kind == TokenKind::IntegerLiteral));
        assert_eq!(tokens[2].lexeme, "0o17");
    }

    #[test]
    fn test_invalid_radix_literals() {
        assert!(tokenize_text("0b102").is_err());
        assert!(tokenize_text("0o19").is_err());
        assert!(tokenize_text("0xFG").is_err());
        assert!(tokenize_text("00").is_err());
    }

    #[test]
    fn test_float_needs_digit_after_dot() {
        let tokens = tokenize_text("1.5 2. 0.25").unwrap();

        assert_eq!(tokens[0].kind, TokenKind::FloatLiteral);
        assert_eq!(tokens[0].lexeme, "1.5");
        assert_eq!(tokens[1].kind, TokenKind::IntegerLiteral);
        assert_eq!(tokens[2].kind, TokenKind::Dot);
        assert_eq!(tokens[3].kind, TokenKind::FloatLiteral);
        assert_eq!(tokens[3].lexeme, "0.25");
    }

    #[test]
    fn test_character_literals() {
        let tokens = tokenize_text(r"'a' '\n' '\0x1F' '\65'").unwrap();

        assert!(tokens[..4]
            .iter()
            .all(|token| token.kind == TokenKind::CharacterLiteral));
    }

    #[test]
    fn test_bad_character_literals() {
        assert!(tokenize_text("''").is_err());
        assert!(tokenize_text("'ab'").is_err());
        assert!(tokenize_text(r"'\0.5'").is_err());
        assert!(tokenize_text(r"'\q'").is_err());
    }

    #[test]
    fn test_unrecognized_symbol() {
        assert!(tokenize_text("int @ x;").is_err());
    }

    #[test]
    fn test_empty_source() {
        let tokens = tokenize_text("").unwrap();

        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Eof);
    }

    #[test]
    fn test_lexemes_partition_the_input() {
        let text = "int main(void) {\n    int x = 0o17; // octal\n    return x;\n}\n";
        let tokens = tokenize_text(text).unwrap();

        let joined: String = tokens.iter().map(|token| token.lexeme.as_str()).collect();
        let stripped: String = text
            .replace("// octal", "")
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();

        assert_eq!(joined, stripped);
    }
}
