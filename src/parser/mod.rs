//! Recursive-descent, precedence-climbing parser (section 4.E).
//!
//! Hand-written rather than built on a grammar macro: a `rust-sitter`
//! or `pest` grammar assumes a stateless, declarative rule set, which
//! cannot easily express indentation-as-syntax (the lexer already turns
//! that into `Indent`/`Dedent` tokens; the parser only has to treat
//! them as block delimiters, which a hand-written recursive descent
//! does directly).

mod error;
mod expr;
mod parse_state;
mod stmt;
mod types;

#[cfg(test)]
mod test_helpers;

pub use error::ParseError;

use crate::ast::Module;
use crate::lexer::{Keyword, Punct, Token, TokenKind};
use parse_state::ParseState;

pub struct Parser {
    state: ParseState,
    file: String,
    pub errors: Vec<ParseError>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>, file: impl Into<String>) -> Self {
        Parser {
            state: ParseState::new(tokens),
            file: file.into(),
            errors: vec![],
        }
    }

    fn peek(&self) -> &Token {
        self.state.peek()
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.state.peek_at(offset)
    }

    fn advance(&mut self) -> Token {
        self.state.advance()
    }

    fn is_eof(&self) -> bool {
        self.state.is_eof()
    }

    fn at_punct(&self, p: Punct) -> bool {
        self.peek().is_punct(p)
    }

    fn at_keyword(&self, k: Keyword) -> bool {
        self.peek().is_keyword(k)
    }

    fn at_newline(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Newline)
    }

    fn at_dedent_or_eof(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Dedent | TokenKind::Eof)
    }

    fn expect_punct(&mut self, p: Punct) -> Result<Token, ParseError> {
        if self.at_punct(p) {
            Ok(self.advance())
        } else if self.is_eof() {
            Err(ParseError::eof(p.as_str()))
        } else {
            let found = self.peek().clone();
            Err(ParseError::new(
                format!("expected `{}`, found {found}", p.as_str()),
                found.span,
            ))
        }
    }

    fn expect_keyword(&mut self, k: Keyword) -> Result<Token, ParseError> {
        if self.at_keyword(k) {
            Ok(self.advance())
        } else if self.is_eof() {
            Err(ParseError::eof(k.as_str()))
        } else {
            let found = self.peek().clone();
            Err(ParseError::new(
                format!("expected keyword `{}`, found {found}", k.as_str()),
                found.span,
            ))
        }
    }

    fn expect_identifier(&mut self) -> Result<Token, ParseError> {
        if matches!(self.peek().kind, TokenKind::Identifier) {
            Ok(self.advance())
        } else if self.is_eof() {
            Err(ParseError::eof("an identifier"))
        } else {
            let found = self.peek().clone();
            Err(ParseError::new(format!("expected an identifier, found {found}"), found.span))
        }
    }

    fn expect_kind(&mut self, expected: &str, pred: impl Fn(&TokenKind) -> bool) -> Result<Token, ParseError> {
        if pred(&self.peek().kind) {
            Ok(self.advance())
        } else if self.is_eof() {
            Err(ParseError::eof(expected))
        } else {
            let found = self.peek().clone();
            Err(ParseError::new(format!("expected {expected}, found {found}"), found.span))
        }
    }

    /// Consume zero or more blank statement separators (section 4.C: a
    /// run of consecutive `Newline` tokens carries no grammatical
    /// meaning once a statement has been fully parsed).
    fn skip_newlines(&mut self) {
        while self.at_newline() {
            self.advance();
        }
    }

    /// Resynchronize after a statement-level parse error by discarding
    /// tokens up to the next statement boundary (section 4.E, "error
    /// recovery"): a `Newline` at the current nesting depth, a `Dedent`,
    /// or end of input. This bounds a single malformed statement's
    /// damage to itself rather than aborting the whole parse.
    fn synchronize(&mut self) {
        loop {
            match self.peek().kind {
                TokenKind::Newline => {
                    self.advance();
                    return;
                }
                TokenKind::Dedent | TokenKind::Eof => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn span_from(&self, start: &Token) -> crate::lexer::Span {
        start.span.merge(&self.peek_at(0).span)
    }
}

/// Parse a full module's tokens into top-level statements (section
/// 4.E). Errors are accumulated rather than aborting the parse so a
/// single syntax error never hides the rest of the file (section 7,
/// "parser keeps going").
pub fn parse_module(tokens: Vec<Token>, file: impl Into<String>) -> (Module, Vec<ParseError>) {
    let file = file.into();
    let mut parser = Parser::new(tokens, file.clone());
    let mut statements = vec![];

    parser.skip_newlines();
    while !parser.is_eof() {
        match stmt::parse_statement(&mut parser) {
            Ok(statement) => statements.push(statement),
            Err(e) => {
                parser.errors.push(e);
                parser.synchronize();
            }
        }
        parser.skip_newlines();
    }

    (Module::new(file, statements), parser.errors)
}

/// Convenience entry point used by the loader and tests: lex then parse
/// in one call, merging lex errors into the parse-error list so callers
/// only need to check one `Vec`.
pub fn parse_source(source: &str, file: impl Into<String>) -> (Module, Vec<ParseError>) {
    let file = file.into();
    match crate::lexer::lex(source, file.clone()) {
        Ok(tokens) => parse_module(tokens, file),
        Err(lex_error) => (
            Module::new(file, vec![]),
            vec![ParseError::new(lex_error.message, lex_error.span)],
        ),
    }
}
