//! Lexical analysis: character stream to token stream, including
//! indentation-as-syntax (section 4.C).
//!
//! The driving loop below is the familiar shape for a regex-table lexer
//! (skip whitespace, find the longest match, advance position) with
//! stateful indentation bookkeeping layered on top, since a purely
//! regex-table-driven match loop can't express indentation-as-syntax on
//! its own.

mod token;

pub use token::*;

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

/// Source location. Two positions (`start`, `end`) plus the originating
/// file name, used both by tokens and, after parsing, by every AST node
/// (section 3.2, section 4.B).
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Span {
    /// (line, column), both zero-based internally; `Display` adds one.
    pub start: (usize, usize),
    pub end: (usize, usize),
    pub file: String,
}

impl Span {
    pub fn new(start: (usize, usize), end: (usize, usize), file: impl Into<String>) -> Self {
        Span {
            start,
            end,
            file: file.into(),
        }
    }

    /// Merge two spans from the same file into one spanning both.
    pub fn merge(&self, other: &Span) -> Span {
        Span {
            start: self.start,
            end: other.end,
            file: self.file.clone(),
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.file,
            self.start.0 + 1,
            self.start.1 + 1
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.span, self.message)
    }
}

impl std::error::Error for LexError {}

pub type LexResult<T> = Result<T, LexError>;

static IDENTIFIER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*").unwrap());
static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+(\.[0-9]+)?[lLdD]?").unwrap());

const SPACES_PER_TAB: usize = 4;

struct IndentStack {
    levels: Vec<usize>,
}

impl IndentStack {
    fn new() -> Self {
        IndentStack { levels: vec![0] }
    }

    fn top(&self) -> usize {
        *self.levels.last().unwrap()
    }
}

pub struct Lexer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    file: String,
    position: usize,
    line: usize,
    col: usize,
    tokens: Vec<Token>,
    indents: IndentStack,
    /// True right after a NEWLINE token, before indentation has been
    /// measured for the following line (section 4.C).
    at_line_start: bool,
    /// True once any non-whitespace token has been emitted; indentation
    /// changes on the very first line never synthesize INDENT/DEDENT.
    seen_token: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str, file: impl Into<String>) -> Self {
        Lexer {
            input,
            bytes: input.as_bytes(),
            file: file.into(),
            position: 0,
            line: 0,
            col: 0,
            tokens: vec![],
            indents: IndentStack::new(),
            at_line_start: true,
            seen_token: false,
        }
    }

    fn here(&self) -> (usize, usize) {
        (self.line, self.col)
    }

    fn span_from(&self, start: (usize, usize)) -> Span {
        Span::new(start, self.here(), self.file.clone())
    }

    fn peek_byte(&self) -> Option<u8> {
        self.bytes.get(self.position).copied()
    }

    fn advance_byte(&mut self) {
        if let Some(b) = self.peek_byte() {
            if b == b'\n' {
                self.line += 1;
                self.col = 0;
            } else {
                self.col += 1;
            }
            self.position += 1;
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.position..]
    }

    fn push(&mut self, kind: TokenKind, lexeme: impl Into<String>, start: (usize, usize)) {
        let span = self.span_from(start);
        self.tokens.push(Token::new(kind, lexeme, span));
        self.seen_token = true;
    }

    /// Measure leading whitespace of the current line (called right after
    /// a NEWLINE) and synthesize INDENT/DEDENT tokens by comparing against
    /// the indent stack (section 4.C). One tab counts as four spaces for
    /// the comparison (section 6.1); mixing tabs and spaces at the same
    /// level is a warning, not modeled as a hard lex error here since the
    /// core only emits errors through the token stream for fatal cases.
    fn measure_indent(&mut self) -> usize {
        let mut width = 0usize;
        loop {
            match self.peek_byte() {
                Some(b' ') => {
                    width += 1;
                    self.advance_byte();
                }
                Some(b'\t') => {
                    width += SPACES_PER_TAB;
                    self.advance_byte();
                }
                _ => break,
            }
        }
        width
    }

    fn handle_indentation(&mut self) {
        // Blank lines and comment-only lines carry no indentation meaning.
        if matches!(self.peek_byte(), Some(b'\n') | None) {
            return;
        }
        if self.rest().starts_with("//") || self.rest().starts_with('#') {
            return;
        }

        let start = self.here();
        let width = self.measure_indent();

        if !self.seen_token {
            // Leading indentation before the first token is insignificant.
            self.indents.levels = vec![width];
            return;
        }

        if width > self.indents.top() {
            self.indents.levels.push(width);
            self.push(TokenKind::Indent, "", start);
        } else {
            while width < self.indents.top() {
                self.indents.levels.pop();
                self.push(TokenKind::Dedent, "", start);
            }
        }
    }

    fn eat_inline_whitespace_and_comments(&mut self) {
        loop {
            match self.peek_byte() {
                Some(b' ') | Some(b'\t') | Some(b'\r') => self.advance_byte(),
                _ => {
                    if self.rest().starts_with("//") || self.rest().starts_with('#') {
                        while !matches!(self.peek_byte(), Some(b'\n') | None) {
                            self.advance_byte();
                        }
                        continue;
                    }
                    return;
                }
            }
        }
    }

    fn lex_string(&mut self, interpolated: bool) -> LexResult<Token> {
        let start = self.here();
        if interpolated {
            self.advance_byte(); // '$'
        }
        self.advance_byte(); // opening quote
        let mut raw = String::new();
        loop {
            match self.peek_byte() {
                None | Some(b'\n') => {
                    return Err(LexError {
                        message: "unterminated string literal".into(),
                        span: self.span_from(start),
                    });
                }
                Some(b'"') => {
                    self.advance_byte();
                    break;
                }
                Some(b'\\') => {
                    raw.push('\\');
                    self.advance_byte();
                    if let Some(c) = self.peek_byte() {
                        raw.push(c as char);
                        self.advance_byte();
                    }
                }
                Some(_) => {
                    let ch = self.rest().chars().next().unwrap();
                    raw.push(ch);
                    for _ in 0..ch.len_utf8() {
                        self.advance_byte();
                    }
                }
            }
        }

        if interpolated {
            Ok(Token::new(
                TokenKind::Literal(LiteralValue::InterpolatedStr(raw.clone())),
                raw,
                self.span_from(start),
            ))
        } else {
            let decoded = unescape::unescape(&raw).ok_or_else(|| LexError {
                message: "invalid escape sequence in string literal".into(),
                span: self.span_from(start),
            })?;
            Ok(Token::new(
                TokenKind::Literal(LiteralValue::Str(decoded)),
                raw,
                self.span_from(start),
            ))
        }
    }

    fn lex_char(&mut self) -> LexResult<Token> {
        let start = self.here();
        self.advance_byte(); // opening quote
        let mut raw = String::new();
        match self.peek_byte() {
            Some(b'\\') => {
                raw.push('\\');
                self.advance_byte();
                if let Some(c) = self.peek_byte() {
                    raw.push(c as char);
                    self.advance_byte();
                }
            }
            Some(_) => {
                let ch = self.rest().chars().next().unwrap();
                raw.push(ch);
                for _ in 0..ch.len_utf8() {
                    self.advance_byte();
                }
            }
            None => {
                return Err(LexError {
                    message: "unterminated character literal".into(),
                    span: self.span_from(start),
                })
            }
        }

        if self.peek_byte() != Some(b'\'') {
            return Err(LexError {
                message: "unterminated character literal".into(),
                span: self.span_from(start),
            });
        }
        self.advance_byte();

        let decoded = unescape::unescape(&raw).ok_or_else(|| LexError {
            message: "invalid escape sequence in character literal".into(),
            span: self.span_from(start),
        })?;
        let ch = decoded.chars().next().ok_or_else(|| LexError {
            message: "empty character literal".into(),
            span: self.span_from(start),
        })?;

        Ok(Token::new(
            TokenKind::Literal(LiteralValue::Char(ch)),
            format!("'{raw}'"),
            self.span_from(start),
        ))
    }

    fn lex_number(&mut self) -> Token {
        let start = self.here();
        let m = NUMBER_RE.find(self.rest()).unwrap();
        let text = m.as_str().to_string();
        for _ in 0..text.len() {
            self.advance_byte();
        }

        let literal = if text.ends_with(['l', 'L']) {
            let n: i64 = text[..text.len() - 1].parse().unwrap_or(0);
            LiteralValue::Long(n)
        } else if text.contains('.') || text.ends_with(['d', 'D']) {
            let numeric = text.trim_end_matches(['d', 'D']);
            let n: f64 = numeric.parse().unwrap_or(0.0);
            LiteralValue::Double(n)
        } else {
            let n: i64 = text.parse().unwrap_or(0);
            LiteralValue::Int(n)
        };

        Token::new(TokenKind::Literal(literal), text, self.span_from(start))
    }

    fn lex_identifier_or_keyword(&mut self) -> Token {
        let start = self.here();
        let m = IDENTIFIER_RE.find(self.rest()).unwrap();
        let text = m.as_str().to_string();
        for _ in 0..text.len() {
            self.advance_byte();
        }

        let kind = match text.as_str() {
            "true" => TokenKind::Literal(LiteralValue::Bool(true)),
            "false" => TokenKind::Literal(LiteralValue::Bool(false)),
            _ => match Keyword::from_identifier(&text) {
                Some(kw) => TokenKind::Keyword(kw),
                None => TokenKind::Identifier,
            },
        };

        Token::new(kind, text, self.span_from(start))
    }

    fn lex_punct(&mut self) -> Option<Token> {
        let start = self.here();
        let rest = self.rest();
        for (punct, text) in Punct::table() {
            if rest.starts_with(text) {
                for _ in 0..text.len() {
                    self.advance_byte();
                }
                return Some(Token::new(TokenKind::Punct(*punct), *text, self.span_from(start)));
            }
        }
        None
    }

    /// Run the lexer to completion, producing a finite token sequence
    /// terminated by `Eof` (section 4.C contract). Re-lexing is only ever
    /// possible by constructing a fresh `Lexer` from offset zero.
    pub fn lex(mut self) -> LexResult<Vec<Token>> {
        loop {
            if self.at_line_start {
                self.handle_indentation();
                self.at_line_start = false;
            }

            self.eat_inline_whitespace_and_comments();

            match self.peek_byte() {
                None => break,
                Some(b'\n') => {
                    let start = self.here();
                    self.advance_byte();
                    self.push(TokenKind::Newline, "\n", start);
                    self.at_line_start = true;
                }
                Some(b'"') => {
                    let tok = self.lex_string(false)?;
                    self.tokens.push(tok);
                    self.seen_token = true;
                }
                Some(b'$') if self.rest().starts_with("$\"") => {
                    let tok = self.lex_string(true)?;
                    self.tokens.push(tok);
                    self.seen_token = true;
                }
                Some(b'\'') => {
                    let tok = self.lex_char()?;
                    self.tokens.push(tok);
                    self.seen_token = true;
                }
                Some(b) if b.is_ascii_digit() => {
                    let tok = self.lex_number();
                    self.tokens.push(tok);
                    self.seen_token = true;
                }
                Some(b) if b.is_ascii_alphabetic() || b == b'_' => {
                    let tok = self.lex_identifier_or_keyword();
                    self.tokens.push(tok);
                    self.seen_token = true;
                }
                Some(_) => match self.lex_punct() {
                    Some(tok) => {
                        self.tokens.push(tok);
                        self.seen_token = true;
                    }
                    None => {
                        let start = self.here();
                        let ch = self.rest().chars().next().unwrap();
                        return Err(LexError {
                            message: format!("unexpected character '{ch}'"),
                            span: self.span_from(start),
                        });
                    }
                },
            }
        }

        // Close any still-open indentation levels before EOF so that
        // INDENT/DEDENT counts balance (section 8, "Indentation
        // well-formedness").
        let start = self.here();
        while self.indents.top() > 0 {
            self.indents.levels.pop();
            self.push(TokenKind::Dedent, "", start);
        }

        self.push(TokenKind::Eof, "", start);
        Ok(self.tokens)
    }
}

/// Convenience entry point used by the parser, loader and tests.
pub fn lex(source: &str, file: impl Into<String>) -> LexResult<Vec<Token>> {
    Lexer::new(source, file).lex()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        lex(src, "test.sdl").unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_identifier() {
        let ks = kinds("letter");
        assert_eq!(ks, vec![TokenKind::Identifier, TokenKind::Eof]);
    }

    #[test]
    fn lexes_int_literal() {
        let ks = kinds("1337");
        assert_eq!(
            ks,
            vec![TokenKind::Literal(LiteralValue::Int(1337)), TokenKind::Eof]
        );
    }

    #[test]
    fn lexes_long_and_double_suffixes() {
        assert_eq!(
            kinds("42l"),
            vec![TokenKind::Literal(LiteralValue::Long(42)), TokenKind::Eof]
        );
        assert_eq!(
            kinds("3.14"),
            vec![
                TokenKind::Literal(LiteralValue::Double(3.14)),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn keyword_wins_over_identifier() {
        for kw in ["fn", "var", "return", "shared", "private", "import"] {
            let ks = kinds(kw);
            assert!(
                matches!(ks[0], TokenKind::Keyword(_)),
                "{kw} should lex as a keyword, got {:?}",
                ks[0]
            );
        }
    }

    #[test]
    fn longest_match_operators() {
        let ks = kinds("<= => == != ++ --");
        assert_eq!(
            ks,
            vec![
                TokenKind::Punct(Punct::Le),
                TokenKind::Punct(Punct::Arrow),
                TokenKind::Punct(Punct::Eq),
                TokenKind::Punct(Punct::Ne),
                TokenKind::Punct(Punct::Increment),
                TokenKind::Punct(Punct::Decrement),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn indentation_is_balanced() {
        let src = "fn f() =>\n  var x: int = 1\n  if x => \n    return x\n  return 0\n";
        let tokens = lex(src, "test.sdl").unwrap();
        let indents = tokens
            .iter()
            .filter(|t| matches!(t.kind, TokenKind::Indent))
            .count();
        let dedents = tokens
            .iter()
            .filter(|t| matches!(t.kind, TokenKind::Dedent))
            .count();
        assert_eq!(indents, dedents);
    }

    #[test]
    fn interpolated_string_is_single_token() {
        let ks = kinds("$\"hello {name}\"");
        assert!(matches!(
            ks[0],
            TokenKind::Literal(LiteralValue::InterpolatedStr(_))
        ));
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let result = lex("\"hello", "test.sdl");
        assert!(result.is_err());
    }

    #[test]
    fn comment_runs_to_end_of_line() {
        let ks = kinds("var x: int = 1 // a comment\nvar y: int = 2");
        // the comment must not introduce any extra tokens
        assert!(!ks
            .iter()
            .any(|k| matches!(k, TokenKind::Literal(LiteralValue::Str(_)))));
    }
}
