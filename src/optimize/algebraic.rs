//! Pass 5 (run order): algebraic identities on expressions (section
//! 4.I rule 2).
//!
//! Deliberately excluded per section 9 Open Question (a): `x * 0` is
//! NOT folded to `0`, since `x` may have side effects that must still
//! run. Every identity implemented here drops only a literal operand
//! that contributes nothing to the result, never the other operand.

use crate::ast::{BinaryOp, ElseBranch, Expr, If, InterpolatedPart, Literal, Module, Statement, UnaryOp};

use super::OptimizerPass;

pub struct AlgebraicIdentities;

impl OptimizerPass for AlgebraicIdentities {
    fn name(&self) -> &'static str {
        "algebraic-identities"
    }

    fn run(&self, module: &mut Module) -> usize {
        let mut folded = 0;
        for stmt in module.statements.iter_mut() {
            visit_statement(stmt, &mut folded);
        }
        folded
    }
}

fn visit_statement(stmt: &mut Statement, folded: &mut usize) {
    match stmt {
        Statement::Expression(e) => visit_expr(e, folded),
        Statement::VarDecl(v) => {
            if let Some(init) = v.initializer.as_mut() {
                visit_expr(init, folded);
            }
        }
        Statement::Return(Some(e), _) => visit_expr(e, folded),
        Statement::Return(None, _) => {}
        Statement::Function(f) => visit_block(&mut f.body, folded),
        Statement::Block(b) => visit_block(&mut b.statements, folded),
        Statement::If(i) => visit_if(i, folded),
        Statement::While(w) => {
            visit_expr(&mut w.condition, folded);
            visit_block(&mut w.body.statements, folded);
        }
        Statement::For(f) => {
            if let Some(init) = f.init.as_deref_mut() {
                visit_statement(init, folded);
            }
            if let Some(c) = f.condition.as_mut() {
                visit_expr(c, folded);
            }
            if let Some(s) = f.step.as_mut() {
                visit_expr(s, folded);
            }
            visit_block(&mut f.body.statements, folded);
        }
        Statement::ForEach(f) => {
            visit_expr(&mut f.iterable, folded);
            visit_block(&mut f.body.statements, folded);
        }
        Statement::Break(_) | Statement::Continue(_) | Statement::Import(_) => {}
    }
}

fn visit_if(i: &mut If, folded: &mut usize) {
    visit_expr(&mut i.condition, folded);
    visit_block(&mut i.then_branch.statements, folded);
    if let Some(branch) = i.else_branch.as_deref_mut() {
        match branch {
            ElseBranch::Block(b) => visit_block(&mut b.statements, folded),
            ElseBranch::If(inner) => visit_if(inner, folded),
        }
    }
}

fn visit_block(stmts: &mut [Statement], folded: &mut usize) {
    for s in stmts.iter_mut() {
        visit_statement(s, folded);
    }
}

/// Recurse into children first, then try to fold this node — so a
/// chain like `(x + 0) * 1` collapses the inner identity before the
/// outer one is even considered (section 4.I: "bottom up").
fn visit_expr(expr: &mut Expr, folded: &mut usize) {
    match expr {
        Expr::Binary { left, right, .. } => {
            visit_expr(left, folded);
            visit_expr(right, folded);
        }
        Expr::Unary { operand, .. } => visit_expr(operand, folded),
        Expr::Assign { target, value, .. } => {
            visit_expr(target, folded);
            visit_expr(value, folded);
        }
        Expr::IndexAssign { container, index, value, .. } => {
            visit_expr(container, folded);
            visit_expr(index, folded);
            visit_expr(value, folded);
        }
        Expr::Call { callee, args, .. } => {
            visit_expr(callee, folded);
            for a in args.iter_mut() {
                visit_expr(&mut a.value, folded);
            }
        }
        Expr::Array { elements, .. } => {
            for e in elements.iter_mut() {
                visit_expr(e, folded);
            }
        }
        Expr::SizedArrayAlloc { size, default, .. } => {
            visit_expr(size, folded);
            if let Some(d) = default.as_mut() {
                visit_expr(d, folded);
            }
        }
        Expr::ArrayAccess { array, index, .. } => {
            visit_expr(array, folded);
            visit_expr(index, folded);
        }
        Expr::ArraySlice { array, from, to, .. } => {
            visit_expr(array, folded);
            if let Some(f) = from.as_mut() {
                visit_expr(f, folded);
            }
            if let Some(t) = to.as_mut() {
                visit_expr(t, folded);
            }
        }
        Expr::Range { from, to, .. } => {
            visit_expr(from, folded);
            visit_expr(to, folded);
        }
        Expr::Spread { inner, .. } => visit_expr(inner, folded),
        Expr::Increment { target, .. } | Expr::Decrement { target, .. } => visit_expr(target, folded),
        Expr::Interpolated { parts, .. } => {
            for p in parts.iter_mut() {
                if let InterpolatedPart::Expr(e) = p {
                    visit_expr(e, folded);
                }
            }
        }
        Expr::Member { receiver, .. } => visit_expr(receiver, folded),
        Expr::Lambda(l) => visit_block(&mut l.body, folded),
        Expr::StaticCall { args, .. } => {
            for a in args.iter_mut() {
                visit_expr(&mut a.value, folded);
            }
        }
        Expr::ThreadSpawn { call, .. } => visit_expr(call, folded),
        Expr::ThreadSync { handle, .. } => visit_expr(handle, folded),
        Expr::Literal(..) | Expr::Variable(..) => {}
    }

    if let Some(replacement) = try_fold(expr) {
        *expr = replacement;
        *folded += 1;
    }
}

fn numeric_value(e: &Expr) -> Option<f64> {
    match e {
        Expr::Literal(Literal::Int(v), _) => Some(*v as f64),
        Expr::Literal(Literal::Long(v), _) => Some(*v as f64),
        Expr::Literal(Literal::Double(v), _) => Some(*v),
        _ => None,
    }
}

fn is_zero(e: &Expr) -> bool {
    numeric_value(e).map(|v| v == 0.0).unwrap_or(false)
}

fn is_one(e: &Expr) -> bool {
    numeric_value(e).map(|v| v == 1.0).unwrap_or(false)
}

fn try_fold(expr: &Expr) -> Option<Expr> {
    match expr {
        Expr::Binary { op: BinaryOp::Add, left, right, .. } if is_zero(right) => Some((**left).clone()),
        Expr::Binary { op: BinaryOp::Add, left, right, .. } if is_zero(left) => Some((**right).clone()),
        Expr::Binary { op: BinaryOp::Sub, left, right, .. } if is_zero(right) => Some((**left).clone()),
        Expr::Binary { op: BinaryOp::Mul, left, right, .. } if is_one(right) => Some((**left).clone()),
        Expr::Binary { op: BinaryOp::Mul, left, right, .. } if is_one(left) => Some((**right).clone()),
        Expr::Binary { op: BinaryOp::Div, left, right, .. } if is_one(right) => Some((**left).clone()),
        Expr::Unary { op: UnaryOp::Not, operand, .. } => match operand.as_ref() {
            Expr::Unary { op: UnaryOp::Not, operand: inner, .. } => Some((**inner).clone()),
            _ => None,
        },
        Expr::Unary { op: UnaryOp::Neg, operand, .. } => match operand.as_ref() {
            Expr::Unary { op: UnaryOp::Neg, operand: inner, .. } => Some((**inner).clone()),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::*;
    use crate::lexer::Span;

    fn span() -> Span {
        Span::default()
    }

    fn var(name: &str) -> Expr {
        Expr::Variable(name.into(), span())
    }

    fn int(n: i64) -> Expr {
        Expr::Literal(Literal::Int(n), span())
    }

    fn wrap(expr: Expr) -> Module {
        Module::new(
            "test.sdl",
            vec![Statement::VarDecl(VarDecl {
                name: "y".into(),
                declared_type: Some(TypeAnnotation::Named("int".into(), span())),
                initializer: Some(expr),
                mem_qual: MemQual::Default,
                span: span(),
            })],
        )
    }

    /// Section 8 scenario 3: `(x + 0) * 1` becomes just `x`.
    #[test]
    fn chained_identities_fold_bottom_up() {
        let mut module = wrap(Expr::Binary {
            op: BinaryOp::Mul,
            left: Box::new(Expr::Binary { op: BinaryOp::Add, left: Box::new(var("x")), right: Box::new(int(0)), span: span() }),
            right: Box::new(int(1)),
            span: span(),
        });
        let folded = AlgebraicIdentities.run(&mut module);
        assert_eq!(folded, 2);
        let Statement::VarDecl(v) = &module.statements[0] else { unreachable!() };
        assert_eq!(v.initializer, Some(var("x")));
    }

    #[test]
    fn multiplication_by_zero_is_never_folded() {
        let mut module = wrap(Expr::Binary { op: BinaryOp::Mul, left: Box::new(var("x")), right: Box::new(int(0)), span: span() });
        let folded = AlgebraicIdentities.run(&mut module);
        assert_eq!(folded, 0);
    }

    #[test]
    fn double_negation_cancels() {
        let mut module = wrap(Expr::Unary {
            op: UnaryOp::Neg,
            operand: Box::new(Expr::Unary { op: UnaryOp::Neg, operand: Box::new(var("x")), span: span() }),
            span: span(),
        });
        let folded = AlgebraicIdentities.run(&mut module);
        assert_eq!(folded, 1);
        let Statement::VarDecl(v) = &module.statements[0] else { unreachable!() };
        assert_eq!(v.initializer, Some(var("x")));
    }
}
