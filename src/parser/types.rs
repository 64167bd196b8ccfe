//! Type-annotation grammar (section 4.E), shared by variable/parameter
//! declarations and the `Type[n]` sized-array-allocation expression.

use crate::ast::{MemQual, TypeAnnotation};
use crate::lexer::{Keyword, Punct, TokenKind};
use crate::parser::{ParseError, Parser};

/// Keywords that double as primitive type names (section 6.1).
fn primitive_name(keyword: Keyword) -> Option<&'static str> {
    Some(match keyword {
        Keyword::Int => "int",
        Keyword::Long => "long",
        Keyword::Double => "double",
        Keyword::Char => "char",
        Keyword::Str => "str",
        Keyword::Bool => "bool",
        Keyword::Byte => "byte",
        Keyword::Void => "void",
        Keyword::Nil => "nil",
        _ => return None,
    })
}

pub fn parse_type_annotation(parser: &mut Parser) -> Result<TypeAnnotation, ParseError> {
    let base = parse_base_type(parser)?;
    parse_array_suffix(parser, base)
}

fn parse_array_suffix(parser: &mut Parser, mut base: TypeAnnotation) -> Result<TypeAnnotation, ParseError> {
    while parser.at_punct(Punct::LBracket) && matches!(parser.peek_at(1).kind, TokenKind::Punct(Punct::RBracket)) {
        let start_span = base.span();
        parser.expect_punct(Punct::LBracket)?;
        parser.expect_punct(Punct::RBracket)?;
        let span = start_span.merge(&parser.peek_at(0).span);
        base = TypeAnnotation::Array(Box::new(base), span);
    }
    Ok(base)
}

fn parse_base_type(parser: &mut Parser) -> Result<TypeAnnotation, ParseError> {
    if parser.at_punct(Punct::LParen) {
        return parse_function_type(parser);
    }

    let tok = parser.expect_kind("a type name", |k| {
        matches!(k, TokenKind::Identifier)
            || matches!(k, TokenKind::Keyword(kw) if primitive_name(*kw).is_some())
    })?;
    let name = match &tok.kind {
        TokenKind::Keyword(kw) => primitive_name(*kw).unwrap().to_string(),
        _ => tok.lexeme.clone(),
    };
    Ok(TypeAnnotation::Named(name, tok.span))
}

fn parse_function_type(parser: &mut Parser) -> Result<TypeAnnotation, ParseError> {
    let open = parser.expect_punct(Punct::LParen)?;
    let mut params = vec![];
    let mut param_mem_quals = vec![];
    let mut is_variadic = false;

    if !parser.at_punct(Punct::RParen) {
        loop {
            if parser.at_punct(Punct::Ellipsis) {
                parser.advance();
                is_variadic = true;
            }
            params.push(parse_type_annotation(parser)?);
            param_mem_quals.push(parse_optional_mem_qual(parser));
            if parser.at_punct(Punct::Comma) {
                parser.advance();
                continue;
            }
            break;
        }
    }
    parser.expect_punct(Punct::RParen)?;
    parser.expect_punct(Punct::Arrow)?;
    let return_type = Box::new(parse_type_annotation(parser)?);
    let span = open.span.merge(&return_type.span());
    Ok(TypeAnnotation::Function {
        params,
        param_mem_quals,
        is_variadic,
        return_type,
        span,
    })
}

/// `as val` / `as ref` prefix used on function parameters (section
/// 4.H); absent means `MemQual::Default`.
pub fn parse_optional_mem_qual(parser: &mut Parser) -> MemQual {
    if parser.at_keyword(Keyword::As) {
        parser.advance();
        if parser.at_keyword(Keyword::Val) {
            parser.advance();
            return MemQual::Val;
        }
        if parser.at_keyword(Keyword::Ref) {
            parser.advance();
            return MemQual::Ref;
        }
    }
    MemQual::Default
}
