//! Pass 4 (run order): string-literal concatenation (section 4.I rule
//! 5). Applied bottom-up: consecutive
//! string-literal parts of an interpolated string merge into one, and a
//! binary `+` of two string literals folds to a single literal.

use crate::ast::{BinaryOp, ElseBranch, Expr, If, InterpolatedPart, Literal, Module, Statement};

use super::OptimizerPass;

pub struct StringLiteralMerge;

impl OptimizerPass for StringLiteralMerge {
    fn name(&self) -> &'static str {
        "string-literal-merge"
    }

    fn run(&self, module: &mut Module) -> usize {
        let mut merged = 0;
        for stmt in module.statements.iter_mut() {
            visit_statement(stmt, &mut merged);
        }
        merged
    }
}

fn visit_statement(stmt: &mut Statement, merged: &mut usize) {
    match stmt {
        Statement::Expression(e) => visit_expr(e, merged),
        Statement::VarDecl(v) => {
            if let Some(init) = v.initializer.as_mut() {
                visit_expr(init, merged);
            }
        }
        Statement::Return(Some(e), _) => visit_expr(e, merged),
        Statement::Return(None, _) => {}
        Statement::Function(f) => visit_block(&mut f.body, merged),
        Statement::Block(b) => visit_block(&mut b.statements, merged),
        Statement::If(i) => visit_if(i, merged),
        Statement::While(w) => {
            visit_expr(&mut w.condition, merged);
            visit_block(&mut w.body.statements, merged);
        }
        Statement::For(f) => {
            if let Some(init) = f.init.as_deref_mut() {
                visit_statement(init, merged);
            }
            if let Some(c) = f.condition.as_mut() {
                visit_expr(c, merged);
            }
            if let Some(s) = f.step.as_mut() {
                visit_expr(s, merged);
            }
            visit_block(&mut f.body.statements, merged);
        }
        Statement::ForEach(f) => {
            visit_expr(&mut f.iterable, merged);
            visit_block(&mut f.body.statements, merged);
        }
        Statement::Break(_) | Statement::Continue(_) | Statement::Import(_) => {}
    }
}

fn visit_if(i: &mut If, merged: &mut usize) {
    visit_expr(&mut i.condition, merged);
    visit_block(&mut i.then_branch.statements, merged);
    if let Some(branch) = i.else_branch.as_deref_mut() {
        match branch {
            ElseBranch::Block(b) => visit_block(&mut b.statements, merged),
            ElseBranch::If(inner) => visit_if(inner, merged),
        }
    }
}

fn visit_block(stmts: &mut [Statement], merged: &mut usize) {
    for s in stmts.iter_mut() {
        visit_statement(s, merged);
    }
}

fn visit_expr(expr: &mut Expr, merged: &mut usize) {
    match expr {
        Expr::Binary { left, right, .. } => {
            visit_expr(left, merged);
            visit_expr(right, merged);
        }
        Expr::Unary { operand, .. } => visit_expr(operand, merged),
        Expr::Assign { target, value, .. } => {
            visit_expr(target, merged);
            visit_expr(value, merged);
        }
        Expr::IndexAssign { container, index, value, .. } => {
            visit_expr(container, merged);
            visit_expr(index, merged);
            visit_expr(value, merged);
        }
        Expr::Call { callee, args, .. } => {
            visit_expr(callee, merged);
            for a in args.iter_mut() {
                visit_expr(&mut a.value, merged);
            }
        }
        Expr::Array { elements, .. } => {
            for e in elements.iter_mut() {
                visit_expr(e, merged);
            }
        }
        Expr::SizedArrayAlloc { size, default, .. } => {
            visit_expr(size, merged);
            if let Some(d) = default.as_mut() {
                visit_expr(d, merged);
            }
        }
        Expr::ArrayAccess { array, index, .. } => {
            visit_expr(array, merged);
            visit_expr(index, merged);
        }
        Expr::ArraySlice { array, from, to, .. } => {
            visit_expr(array, merged);
            if let Some(f) = from.as_mut() {
                visit_expr(f, merged);
            }
            if let Some(t) = to.as_mut() {
                visit_expr(t, merged);
            }
        }
        Expr::Range { from, to, .. } => {
            visit_expr(from, merged);
            visit_expr(to, merged);
        }
        Expr::Spread { inner, .. } => visit_expr(inner, merged),
        Expr::Increment { target, .. } | Expr::Decrement { target, .. } => visit_expr(target, merged),
        Expr::Interpolated { parts, .. } => {
            for p in parts.iter_mut() {
                if let InterpolatedPart::Expr(e) = p {
                    visit_expr(e, merged);
                }
            }
            merge_interpolated_parts(parts, merged);
        }
        Expr::Member { receiver, .. } => visit_expr(receiver, merged),
        Expr::Lambda(l) => visit_block(&mut l.body, merged),
        Expr::StaticCall { args, .. } => {
            for a in args.iter_mut() {
                visit_expr(&mut a.value, merged);
            }
        }
        Expr::ThreadSpawn { call, .. } => visit_expr(call, merged),
        Expr::ThreadSync { handle, .. } => visit_expr(handle, merged),
        Expr::Literal(..) | Expr::Variable(..) => {}
    }

    if let Expr::Binary { op: BinaryOp::Add, left, right, span } = expr {
        if let (Expr::Literal(Literal::Str(a), _), Expr::Literal(Literal::Str(b), _)) = (left.as_ref(), right.as_ref()) {
            let folded = Expr::Literal(Literal::Str(format!("{a}{b}")), span.clone());
            *expr = folded;
            *merged += 1;
        }
    }
}

/// Consecutive `Str` parts collapse into one; a part sitting between
/// two embedded expressions (or at an end) is left alone.
fn merge_interpolated_parts(parts: &mut Vec<InterpolatedPart>, merged: &mut usize) {
    let mut out: Vec<InterpolatedPart> = Vec::with_capacity(parts.len());
    for part in parts.drain(..) {
        match (out.last_mut(), &part) {
            (Some(InterpolatedPart::Str(prev)), InterpolatedPart::Str(next)) => {
                prev.push_str(next);
                *merged += 1;
            }
            _ => out.push(part),
        }
    }
    *parts = out;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::*;
    use crate::lexer::Span;

    fn span() -> Span {
        Span::default()
    }

    #[test]
    fn consecutive_string_literal_parts_merge() {
        let mut module = Module::new(
            "test.sdl",
            vec![Statement::Expression(Expr::Interpolated {
                parts: vec![
                    InterpolatedPart::Str("hello ".into()),
                    InterpolatedPart::Str("world".into()),
                    InterpolatedPart::Expr(Box::new(Expr::Variable("x".into(), span()))),
                    InterpolatedPart::Str("!".into()),
                ],
                span: span(),
            })],
        );
        let merged = StringLiteralMerge.run(&mut module);
        assert_eq!(merged, 1);
        let Statement::Expression(Expr::Interpolated { parts, .. }) = &module.statements[0] else { unreachable!() };
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], InterpolatedPart::Str("hello world".into()));
    }

    #[test]
    fn binary_add_of_two_string_literals_folds() {
        let mut module = Module::new(
            "test.sdl",
            vec![Statement::Expression(Expr::Binary {
                op: BinaryOp::Add,
                left: Box::new(Expr::Literal(Literal::Str("foo".into()), span())),
                right: Box::new(Expr::Literal(Literal::Str("bar".into()), span())),
                span: span(),
            })],
        );
        let merged = StringLiteralMerge.run(&mut module);
        assert_eq!(merged, 1);
        let Statement::Expression(Expr::Literal(Literal::Str(s), _)) = &module.statements[0] else { unreachable!() };
        assert_eq!(s, "foobar");
    }
}
