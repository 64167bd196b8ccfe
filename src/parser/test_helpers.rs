//! In-process parsing helpers for tests (no subprocess, no filesystem).

use crate::ast::Module;
use crate::parser::ParseError;

pub fn parse_ok(source: &str) -> Module {
    let (module, errors) = super::parse_source(source, "test.sdl");
    assert!(errors.is_empty(), "expected no parse errors, got {errors:?}");
    module
}

pub fn parse_errors(source: &str) -> Vec<ParseError> {
    let (_, errors) = super::parse_source(source, "test.sdl");
    errors
}
