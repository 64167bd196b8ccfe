//! Statement grammar (section 4.E): indentation-delimited blocks,
//! declarations, control flow, and the two import forms.

use crate::ast::{
    Block, ElseBranch, For, ForEach, Function, FunctionParam, If, Import, Statement, VarDecl, While,
};
use crate::lexer::{Keyword, Punct, TokenKind};
use crate::parser::expr::parse_expression;
use crate::parser::types::{parse_optional_mem_qual, parse_type_annotation};
use crate::parser::{ParseError, Parser};

pub fn parse_statement(parser: &mut Parser) -> Result<Statement, ParseError> {
    if parser.at_keyword(Keyword::Fn) {
        return parse_function(parser).map(Statement::Function);
    }
    if parser.at_keyword(Keyword::Var) {
        return parse_var_decl(parser).map(Statement::VarDecl);
    }
    if parser.at_keyword(Keyword::Return) {
        return parse_return(parser);
    }
    if parser.at_keyword(Keyword::If) {
        return parse_if(parser).map(Statement::If);
    }
    if parser.at_keyword(Keyword::While) {
        return parse_while(parser).map(Statement::While);
    }
    if parser.at_keyword(Keyword::For) {
        return parse_for_or_foreach(parser);
    }
    if parser.at_keyword(Keyword::Break) {
        let tok = parser.advance();
        return Ok(Statement::Break(tok.span));
    }
    if parser.at_keyword(Keyword::Continue) {
        let tok = parser.advance();
        return Ok(Statement::Continue(tok.span));
    }
    if parser.at_keyword(Keyword::Import) {
        return parse_import(parser).map(Statement::Import);
    }
    if parser.at_keyword(Keyword::Shared) || parser.at_keyword(Keyword::Private) || parser.at_punct(Punct::Arrow) {
        return parse_bare_block(parser).map(Statement::Block);
    }

    let expr = parse_expression(parser)?;
    if parser.at_punct(Punct::Assign) {
        parser.advance();
        let value = parse_expression(parser)?;
        let span = expr.span().merge(&value.span());
        let assignment = match expr {
            crate::ast::Expr::ArrayAccess { array, index, .. } => crate::ast::Expr::IndexAssign {
                container: array,
                index,
                value: Box::new(value),
                span,
            },
            target => crate::ast::Expr::Assign { target: Box::new(target), value: Box::new(value), span },
        };
        return Ok(Statement::Expression(assignment));
    }
    Ok(Statement::Expression(expr))
}

/// Parse an indentation-delimited block's statements given that the
/// leading `modifier? =>` has already been consumed by the caller
/// (section 4.E, section 4.C for the `Indent`/`Dedent` tokens
/// themselves).
pub fn parse_block_statements(parser: &mut Parser) -> Result<Vec<Statement>, ParseError> {
    parser.expect_punct(Punct::Arrow)?;
    parser.skip_newlines();

    // A block may legally be empty (the body simply dedents right back
    // out) — only require `Indent` when the following line is in fact
    // more indented.
    if !matches!(parser.peek().kind, TokenKind::Indent) {
        return Ok(vec![]);
    }
    parser.advance();

    let mut statements = vec![];
    parser.skip_newlines();
    while !matches!(parser.peek().kind, TokenKind::Dedent | TokenKind::Eof) {
        match parse_statement(parser) {
            Ok(stmt) => statements.push(stmt),
            Err(e) => {
                parser.errors.push(e);
                parser.synchronize();
            }
        }
        parser.skip_newlines();
    }
    if matches!(parser.peek().kind, TokenKind::Dedent) {
        parser.advance();
    }
    Ok(statements)
}

fn parse_block_modifier(parser: &mut Parser) -> crate::ast::BlockModifier {
    if parser.at_keyword(Keyword::Shared) {
        parser.advance();
        crate::ast::BlockModifier::Shared
    } else if parser.at_keyword(Keyword::Private) {
        parser.advance();
        crate::ast::BlockModifier::Private
    } else {
        crate::ast::BlockModifier::Default
    }
}

fn parse_block(parser: &mut Parser) -> Result<Block, ParseError> {
    let start = parser.peek().clone();
    let modifier = parse_block_modifier(parser);
    let statements = parse_block_statements(parser)?;
    let span = start.span.merge(&parser.peek_at(0).span);
    Ok(Block { statements, modifier, span })
}

fn parse_bare_block(parser: &mut Parser) -> Result<Block, ParseError> {
    parse_block(parser)
}

/// `fn [shared|private] name(params): ReturnType => body` (section
/// 4.E). The return type is introduced by `:` rather than reusing `=>`,
/// which is reserved exclusively for opening a block body — the same
/// split `var name: Type = init` uses between a type annotation and a
/// value.
fn parse_function(parser: &mut Parser) -> Result<Function, ParseError> {
    let start = parser.expect_keyword(Keyword::Fn)?;
    let modifier = parse_fn_modifier(parser);
    let name = parser.expect_identifier()?;
    parser.expect_punct(Punct::LParen)?;
    let mut params = vec![];
    if !parser.at_punct(Punct::RParen) {
        loop {
            let pname = parser.expect_identifier()?;
            parser.expect_punct(Punct::Colon)?;
            let type_annotation = parse_type_annotation(parser)?;
            let mem_qual = parse_optional_mem_qual(parser);
            params.push(FunctionParam { name: pname.lexeme, type_annotation, mem_qual, span: pname.span });
            if parser.at_punct(Punct::Comma) {
                parser.advance();
                continue;
            }
            break;
        }
    }
    parser.expect_punct(Punct::RParen)?;
    parser.expect_punct(Punct::Colon)?;
    let return_type = parse_type_annotation(parser)?;
    let body = parse_block_statements(parser)?;
    let span = start.span.merge(&parser.peek_at(0).span);
    Ok(Function { name: name.lexeme, params, return_type, modifier, body, span })
}

fn parse_fn_modifier(parser: &mut Parser) -> crate::ast::FnModifier {
    if parser.at_keyword(Keyword::Shared) {
        parser.advance();
        crate::ast::FnModifier::Shared
    } else if parser.at_keyword(Keyword::Private) {
        parser.advance();
        crate::ast::FnModifier::Private
    } else {
        crate::ast::FnModifier::Default
    }
}

fn parse_var_decl(parser: &mut Parser) -> Result<VarDecl, ParseError> {
    let start = parser.expect_keyword(Keyword::Var)?;
    let name = parser.expect_identifier()?;
    let declared_type = if parser.at_punct(Punct::Colon) {
        parser.advance();
        Some(parse_type_annotation(parser)?)
    } else {
        None
    };
    let mem_qual = parse_optional_mem_qual(parser);
    let initializer = if parser.at_punct(Punct::Assign) {
        parser.advance();
        Some(parse_expression(parser)?)
    } else {
        None
    };
    let span = start.span.merge(&parser.peek_at(0).span);
    Ok(VarDecl { name: name.lexeme, declared_type, initializer, mem_qual, span })
}

fn parse_return(parser: &mut Parser) -> Result<Statement, ParseError> {
    let start = parser.expect_keyword(Keyword::Return)?;
    if parser.at_newline() || parser.at_dedent_or_eof() {
        return Ok(Statement::Return(None, start.span));
    }
    let value = parse_expression(parser)?;
    let span = start.span.merge(&value.span());
    Ok(Statement::Return(Some(value), span))
}

fn parse_if(parser: &mut Parser) -> Result<If, ParseError> {
    let start = parser.expect_keyword(Keyword::If)?;
    let condition = parse_expression(parser)?;
    let then_branch = parse_block(parser)?;
    let else_branch = if parser.at_keyword(Keyword::Else) {
        parser.advance();
        if parser.at_keyword(Keyword::If) {
            Some(Box::new(ElseBranch::If(parse_if(parser)?)))
        } else {
            Some(Box::new(ElseBranch::Block(parse_block(parser)?)))
        }
    } else {
        None
    };
    let span = start.span.merge(&parser.peek_at(0).span);
    Ok(If { condition, then_branch, else_branch, span })
}

fn parse_while(parser: &mut Parser) -> Result<While, ParseError> {
    let start = parser.expect_keyword(Keyword::While)?;
    let is_shared = parser.at_keyword(Keyword::Shared);
    if is_shared {
        parser.advance();
    }
    let condition = parse_expression(parser)?;
    let body = parse_block(parser)?;
    let span = start.span.merge(&parser.peek_at(0).span);
    Ok(While { condition, body, is_shared, span })
}

/// `for` introduces either a C-style loop (has a `;`-separated
/// init/condition/step) or a `for x in iterable` loop; disambiguated by
/// scanning past the header for `in` vs `;` (section 4.E).
fn parse_for_or_foreach(parser: &mut Parser) -> Result<Statement, ParseError> {
    let start = parser.expect_keyword(Keyword::For)?;
    let is_shared = parser.at_keyword(Keyword::Shared);
    if is_shared {
        parser.advance();
    }

    if matches!(parser.peek().kind, TokenKind::Identifier) && matches!(parser.peek_at(1).kind, TokenKind::Keyword(Keyword::In)) {
        let binding = parser.advance();
        parser.advance(); // `in`
        let iterable = parse_expression(parser)?;
        let body = parse_block(parser)?;
        let span = start.span.merge(&parser.peek_at(0).span);
        return Ok(Statement::ForEach(ForEach { binding: binding.lexeme, iterable, body, is_shared, span }));
    }

    let init = if parser.at_punct(Punct::Colon) {
        None
    } else {
        Some(Box::new(parse_statement(parser)?))
    };
    parser.expect_punct(Punct::Colon)?;
    let condition = if parser.at_punct(Punct::Colon) { None } else { Some(parse_expression(parser)?) };
    parser.expect_punct(Punct::Colon)?;
    let step = if parser.at_punct(Punct::Arrow) { None } else { Some(parse_expression(parser)?) };
    let body = parse_block(parser)?;
    let span = start.span.merge(&parser.peek_at(0).span);
    Ok(Statement::For(For { init, condition, step, body, is_shared, span }))
}

fn parse_import(parser: &mut Parser) -> Result<Import, ParseError> {
    let start = parser.expect_keyword(Keyword::Import)?;
    let path_tok = parser.expect_kind("a string literal path", |k| {
        matches!(k, TokenKind::Literal(crate::lexer::LiteralValue::Str(_)))
    })?;
    let path = match path_tok.kind {
        TokenKind::Literal(crate::lexer::LiteralValue::Str(s)) => s,
        _ => unreachable!(),
    };
    let namespace = if parser.at_keyword(Keyword::As) {
        parser.advance();
        Some(parser.expect_identifier()?.lexeme)
    } else {
        None
    };
    let span = start.span.merge(&parser.peek_at(0).span);
    Ok(Import { path, namespace, span })
}
