//! Expression grammar: precedence-climbing binary operators over a
//! recursive-descent primary/postfix core (section 4.E).

use crate::ast::{
    BinaryOp, CallArg, Expr, InterpolatedPart, Lambda, LambdaParam, Literal, UnaryOp,
};
use crate::lexer::{Keyword, LiteralValue, Punct, Token, TokenKind};
use crate::parser::types::{parse_optional_mem_qual, parse_type_annotation};
use crate::parser::{ParseError, Parser};

pub fn parse_expression(parser: &mut Parser) -> Result<Expr, ParseError> {
    parse_binary(parser, 0)
}

fn binary_op_for(tok: &Token) -> Option<BinaryOp> {
    match &tok.kind {
        TokenKind::Punct(Punct::Plus) => Some(BinaryOp::Add),
        TokenKind::Punct(Punct::Minus) => Some(BinaryOp::Sub),
        TokenKind::Punct(Punct::Star) => Some(BinaryOp::Mul),
        TokenKind::Punct(Punct::Slash) => Some(BinaryOp::Div),
        TokenKind::Punct(Punct::Percent) => Some(BinaryOp::Mod),
        TokenKind::Punct(Punct::Eq) => Some(BinaryOp::Eq),
        TokenKind::Punct(Punct::Ne) => Some(BinaryOp::Ne),
        TokenKind::Punct(Punct::Lt) => Some(BinaryOp::Lt),
        TokenKind::Punct(Punct::Le) => Some(BinaryOp::Le),
        TokenKind::Punct(Punct::Gt) => Some(BinaryOp::Gt),
        TokenKind::Punct(Punct::Ge) => Some(BinaryOp::Ge),
        TokenKind::Punct(Punct::AndAnd) => Some(BinaryOp::And),
        TokenKind::Punct(Punct::OrOr) => Some(BinaryOp::Or),
        _ => None,
    }
}

/// Precedence-climbing binary-operator loop (section 4.E): at each step,
/// only consume an operator whose precedence is at least `min_prec`,
/// recursing with `precedence + 1` on the right so operators of equal
/// precedence associate left.
fn parse_binary(parser: &mut Parser, min_prec: u8) -> Result<Expr, ParseError> {
    let mut left = parse_unary(parser)?;

    loop {
        let Some(op) = binary_op_for(parser.peek()) else { break };
        let prec = op.precedence();
        if prec < min_prec {
            break;
        }
        parser.advance();
        let right = parse_binary(parser, prec + 1)?;
        let span = left.span().merge(&right.span());
        left = Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            span,
        };
    }

    Ok(left)
}

fn parse_unary(parser: &mut Parser) -> Result<Expr, ParseError> {
    if parser.at_punct(Punct::Minus) {
        let tok = parser.advance();
        let operand = parse_unary(parser)?;
        let span = tok.span.merge(&operand.span());
        return Ok(Expr::Unary {
            op: UnaryOp::Neg,
            operand: Box::new(operand),
            span,
        });
    }
    if parser.at_punct(Punct::Bang) {
        let tok = parser.advance();
        let operand = parse_unary(parser)?;
        let span = tok.span.merge(&operand.span());
        return Ok(Expr::Unary {
            op: UnaryOp::Not,
            operand: Box::new(operand),
            span,
        });
    }
    if parser.at_punct(Punct::Increment) || parser.at_punct(Punct::Decrement) {
        let prefix_tok = parser.advance();
        let is_increment = matches!(prefix_tok.kind, TokenKind::Punct(Punct::Increment));
        let target = parse_unary(parser)?;
        let span = prefix_tok.span.merge(&target.span());
        return Ok(if is_increment {
            Expr::Increment { target: Box::new(target), prefix: true, span }
        } else {
            Expr::Decrement { target: Box::new(target), prefix: true, span }
        });
    }
    if parser.at_keyword(Keyword::Spawn) {
        let tok = parser.advance();
        let call = parse_unary(parser)?;
        let span = tok.span.merge(&call.span());
        return Ok(Expr::ThreadSpawn { call: Box::new(call), span });
    }
    if parser.at_keyword(Keyword::Sync) {
        let tok = parser.advance();
        let handle = parse_unary(parser)?;
        let span = tok.span.merge(&handle.span());
        return Ok(Expr::ThreadSync { handle: Box::new(handle), span });
    }
    if parser.at_punct(Punct::Ellipsis) {
        let tok = parser.advance();
        let inner = parse_unary(parser)?;
        let span = tok.span.merge(&inner.span());
        return Ok(Expr::Spread { inner: Box::new(inner), span });
    }
    parse_postfix(parser)
}

fn parse_postfix(parser: &mut Parser) -> Result<Expr, ParseError> {
    let mut expr = parse_primary(parser)?;

    loop {
        if parser.at_punct(Punct::Dot) {
            parser.advance();
            let property = parser.expect_identifier()?;
            let span = expr.span().merge(&property.span);
            expr = Expr::Member {
                receiver: Box::new(expr),
                property: property.lexeme,
                span,
            };
        } else if parser.at_punct(Punct::LParen) {
            let (args, end) = parse_call_args(parser)?;
            let span = expr.span().merge(&end);
            expr = Expr::Call { callee: Box::new(expr), args, is_tail_call: false, span };
        } else if parser.at_punct(Punct::LBracket) {
            expr = parse_index_or_slice(parser, expr)?;
        } else if parser.at_punct(Punct::Range) {
            parser.advance();
            let to = parse_unary(parser)?;
            let span = expr.span().merge(&to.span());
            expr = Expr::Range { from: Box::new(expr), to: Box::new(to), span };
        } else if parser.at_punct(Punct::Increment) {
            let tok = parser.advance();
            let span = expr.span().merge(&tok.span);
            expr = Expr::Increment { target: Box::new(expr), prefix: false, span };
        } else if parser.at_punct(Punct::Decrement) {
            let tok = parser.advance();
            let span = expr.span().merge(&tok.span);
            expr = Expr::Decrement { target: Box::new(expr), prefix: false, span };
        } else {
            break;
        }
    }

    Ok(expr)
}

fn parse_index_or_slice(parser: &mut Parser, array: Expr) -> Result<Expr, ParseError> {
    let open = parser.expect_punct(Punct::LBracket)?;
    let from = if parser.at_punct(Punct::Colon) || parser.at_punct(Punct::RBracket) {
        None
    } else {
        Some(Box::new(parse_expression(parser)?))
    };

    if parser.at_punct(Punct::Colon) {
        parser.advance();
        let to = if parser.at_punct(Punct::RBracket) {
            None
        } else {
            Some(Box::new(parse_expression(parser)?))
        };
        let end = parser.expect_punct(Punct::RBracket)?;
        let span = array.span().merge(&end.span);
        return Ok(Expr::ArraySlice { array: Box::new(array), from, to, span });
    }

    let index = from.ok_or_else(|| ParseError::new("expected an index expression", open.span.clone()))?;
    let end = parser.expect_punct(Punct::RBracket)?;
    let span = array.span().merge(&end.span);
    Ok(Expr::ArrayAccess { array: Box::new(array), index, span })
}

fn parse_call_args(parser: &mut Parser) -> Result<(Vec<CallArg>, crate::lexer::Span), ParseError> {
    parser.expect_punct(Punct::LParen)?;
    let mut args = vec![];
    if !parser.at_punct(Punct::RParen) {
        loop {
            let spread = if parser.at_punct(Punct::Ellipsis) {
                parser.advance();
                true
            } else {
                false
            };
            let value = Box::new(parse_expression(parser)?);
            args.push(CallArg { value, spread });
            if parser.at_punct(Punct::Comma) {
                parser.advance();
                continue;
            }
            break;
        }
    }
    let close = parser.expect_punct(Punct::RParen)?;
    Ok((args, close.span))
}

fn is_primitive_type_keyword(tok: &Token) -> bool {
    matches!(
        tok.kind,
        TokenKind::Keyword(
            Keyword::Int
                | Keyword::Long
                | Keyword::Double
                | Keyword::Char
                | Keyword::Str
                | Keyword::Bool
                | Keyword::Byte
                | Keyword::Void
        )
    )
}

fn parse_primary(parser: &mut Parser) -> Result<Expr, ParseError> {
    let tok = parser.peek().clone();

    // `Type[n]` / `Type[n] = default` sized array allocation (section
    // 3.4): only primitive-type keywords can start this form, since a
    // user identifier followed by `[` is always indexing instead.
    if is_primitive_type_keyword(&tok) && matches!(parser.peek_at(1).kind, TokenKind::Punct(Punct::LBracket)) {
        let element_type = parse_type_annotation(parser)?;
        parser.expect_punct(Punct::LBracket)?;
        let size = Box::new(parse_expression(parser)?);
        let close = parser.expect_punct(Punct::RBracket)?;
        let mut span = tok.span.merge(&close.span);
        let default = if parser.at_punct(Punct::Assign) {
            parser.advance();
            let d = parse_expression(parser)?;
            span = span.merge(&d.span());
            Some(Box::new(d))
        } else {
            None
        };
        return Ok(Expr::SizedArrayAlloc { element_type, size, default, span });
    }

    match &tok.kind {
        TokenKind::Literal(LiteralValue::Int(n)) => {
            parser.advance();
            Ok(Expr::Literal(Literal::Int(*n), tok.span))
        }
        TokenKind::Literal(LiteralValue::Long(n)) => {
            parser.advance();
            Ok(Expr::Literal(Literal::Long(*n), tok.span))
        }
        TokenKind::Literal(LiteralValue::Double(n)) => {
            parser.advance();
            Ok(Expr::Literal(Literal::Double(*n), tok.span))
        }
        TokenKind::Literal(LiteralValue::Char(c)) => {
            parser.advance();
            Ok(Expr::Literal(Literal::Char(*c), tok.span))
        }
        TokenKind::Literal(LiteralValue::Str(s)) => {
            parser.advance();
            Ok(Expr::Literal(Literal::Str(s.clone()), tok.span))
        }
        TokenKind::Literal(LiteralValue::Bool(b)) => {
            parser.advance();
            Ok(Expr::Literal(Literal::Bool(*b), tok.span))
        }
        TokenKind::Literal(LiteralValue::InterpolatedStr(raw)) => {
            parser.advance();
            parse_interpolated(raw, tok.span)
        }
        TokenKind::Keyword(Keyword::Nil) => {
            parser.advance();
            Ok(Expr::Literal(Literal::Nil, tok.span))
        }
        TokenKind::Identifier => parse_identifier_led(parser),
        TokenKind::Punct(Punct::LParen) => {
            parser.advance();
            let inner = parse_expression(parser)?;
            parser.expect_punct(Punct::RParen)?;
            Ok(inner)
        }
        TokenKind::Punct(Punct::LBracket) => parse_array_literal(parser),
        TokenKind::Keyword(Keyword::Fn) => parse_lambda(parser),
        _ if parser.is_eof() => Err(ParseError::eof("an expression")),
        _ => Err(ParseError::new(format!("unexpected {tok} in expression position"), tok.span)),
    }
}

/// An identifier either starts a plain variable reference or, if it is
/// immediately followed by `.`, a static-method call `Type.method(...)`
/// on one of the recognized host types (section 4.G.2) — disambiguated
/// one token of lookahead at a time by `parse_postfix`, except that a
/// static call's `(args)` is parsed right here so `type_name` is never
/// misread as a variable named after a host type.
fn parse_identifier_led(parser: &mut Parser) -> Result<Expr, ParseError> {
    let name = parser.advance();
    if is_host_type_name(&name.lexeme)
        && parser.at_punct(Punct::Dot)
        && matches!(parser.peek_at(1).kind, TokenKind::Identifier)
        && matches!(parser.peek_at(2).kind, TokenKind::Punct(Punct::LParen))
    {
        parser.advance(); // `.`
        let method = parser.expect_identifier()?;
        let (args, end) = parse_call_args(parser)?;
        let span = name.span.merge(&end);
        return Ok(Expr::StaticCall {
            type_name: name.lexeme,
            method: method.lexeme,
            args,
            span,
        });
    }
    Ok(Expr::Variable(name.lexeme, name.span))
}

fn is_host_type_name(name: &str) -> bool {
    matches!(
        name,
        "TextFile"
            | "BinaryFile"
            | "Date"
            | "Time"
            | "Stdin"
            | "Stdout"
            | "Stderr"
            | "Bytes"
            | "Path"
            | "Directory"
            | "Process"
            | "TcpListener"
            | "TcpStream"
            | "UdpSocket"
            | "Random"
            | "UUID"
            | "Environment"
            | "Interceptor"
    )
}

fn parse_array_literal(parser: &mut Parser) -> Result<Expr, ParseError> {
    let open = parser.expect_punct(Punct::LBracket)?;
    let mut elements = vec![];
    if !parser.at_punct(Punct::RBracket) {
        loop {
            elements.push(parse_expression(parser)?);
            if parser.at_punct(Punct::Comma) {
                parser.advance();
                continue;
            }
            break;
        }
    }
    let close = parser.expect_punct(Punct::RBracket)?;
    Ok(Expr::Array { elements, span: open.span.merge(&close.span) })
}

/// Lambda literal: `fn (params): RetType => body` or, with an
/// inferred return type, `fn (params) => body` (section 4.E, section
/// 4.G.1 "lambda return type" inference note).
fn parse_lambda(parser: &mut Parser) -> Result<Expr, ParseError> {
    let start = parser.expect_keyword(Keyword::Fn)?;
    parser.expect_punct(Punct::LParen)?;
    let mut params = vec![];
    if !parser.at_punct(Punct::RParen) {
        loop {
            let name = parser.expect_identifier()?;
            let type_annotation = if parser.at_punct(Punct::Colon) {
                parser.advance();
                Some(parse_type_annotation(parser)?)
            } else {
                None
            };
            params.push(LambdaParam { name: name.lexeme, type_annotation, span: name.span });
            if parser.at_punct(Punct::Comma) {
                parser.advance();
                continue;
            }
            break;
        }
    }
    parser.expect_punct(Punct::RParen)?;

    let return_type = if parser.at_punct(Punct::Colon) {
        parser.advance();
        Some(parse_type_annotation(parser)?)
    } else {
        None
    };

    let body = crate::parser::stmt::parse_block_statements(parser)?;
    let span = start.span.merge(&parser.peek_at(0).span);
    Ok(Expr::Lambda(Lambda { params, return_type, body, span }))
}

/// Decompose a `$"literal {expr} literal"` token's raw text into
/// alternating string/expression parts (section 4.C: the lexer keeps
/// the whole thing as one token; the parser recursively parses the
/// embedded expressions).
fn parse_interpolated(raw: &str, span: crate::lexer::Span) -> Result<Expr, ParseError> {
    let mut parts = vec![];
    let mut literal = String::new();
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '{' {
            if !literal.is_empty() {
                parts.push(InterpolatedPart::Str(std::mem::take(&mut literal)));
            }
            let mut inner = String::new();
            let mut depth = 1;
            for c in chars.by_ref() {
                if c == '{' {
                    depth += 1;
                } else if c == '}' {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                inner.push(c);
            }
            let decoded = unescape::unescape(&inner).unwrap_or(inner);
            let (_, expr_tokens) = (
                (),
                crate::lexer::lex(&decoded, span.file.clone())
                    .map_err(|e| ParseError::new(e.message, e.span))?,
            );
            let mut sub_parser = Parser::new(expr_tokens, span.file.clone());
            let expr = parse_expression(&mut sub_parser)?;
            parts.push(InterpolatedPart::Expr(Box::new(expr)));
        } else {
            literal.push(c);
        }
    }
    if !literal.is_empty() {
        parts.push(InterpolatedPart::Str(literal));
    }

    Ok(Expr::Interpolated { parts, span })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::test_helpers::parse_ok;
    use crate::ast::Statement;

    fn first_expr(src: &str) -> Expr {
        let module = parse_ok(src);
        match &module.statements[0] {
            Statement::Expression(e) => e.clone(),
            other => panic!("expected an expression statement, got {other:?}"),
        }
    }

    #[test]
    fn precedence_climbing_respects_arithmetic_priority() {
        let expr = first_expr("1 + 2 * 3\n");
        match expr {
            Expr::Binary { op: BinaryOp::Add, right, .. } => {
                assert!(matches!(*right, Expr::Binary { op: BinaryOp::Mul, .. }));
            }
            other => panic!("expected a top-level `+`, got {other:?}"),
        }
    }

    #[test]
    fn equal_precedence_associates_left() {
        let expr = first_expr("1 - 2 - 3\n");
        match expr {
            Expr::Binary { op: BinaryOp::Sub, left, .. } => {
                assert!(matches!(*left, Expr::Binary { op: BinaryOp::Sub, .. }));
            }
            other => panic!("expected a top-level `-`, got {other:?}"),
        }
    }

    #[test]
    fn postfix_chain_parses_call_then_member_then_index() {
        let expr = first_expr("get_items().first[0]\n");
        assert!(matches!(expr, Expr::ArrayAccess { .. }));
    }

    #[test]
    fn static_call_on_host_type() {
        let expr = first_expr("Random.new()\n");
        assert!(matches!(expr, Expr::StaticCall { .. }));
    }

    #[test]
    fn thread_spawn_and_sync_parse() {
        let expr = first_expr("spawn worker(b)\n");
        assert!(matches!(expr, Expr::ThreadSpawn { .. }));
        let expr = first_expr("sync h\n");
        assert!(matches!(expr, Expr::ThreadSync { .. }));
    }
}
