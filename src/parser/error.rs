//! Parse error type (section 4.E).

use std::fmt;

use crate::lexer::Span;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ParseError {
    pub message: String,
    pub span: Option<Span>,
}

impl ParseError {
    pub fn new(message: impl ToString, span: Span) -> Self {
        ParseError {
            message: message.to_string(),
            span: Some(span),
        }
    }

    pub fn eof(expected: &str) -> Self {
        ParseError {
            message: format!("unexpected end of input while parsing {expected}"),
            span: None,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.span {
            Some(span) => write!(f, "{span}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for ParseError {}
