//! Pass 2 (run order): dead variable removal (section 4.I rule 3).

use std::collections::HashSet;

use crate::ast::{ElseBranch, Expr, If, InterpolatedPart, Module, Statement};

use super::OptimizerPass;

pub struct DeadVariableRemoval;

impl OptimizerPass for DeadVariableRemoval {
    fn name(&self) -> &'static str {
        "dead-variable-removal"
    }

    fn run(&self, module: &mut Module) -> usize {
        let mut removed = 0;
        for stmt in module.statements.iter_mut() {
            if let Statement::Function(f) = stmt {
                process_block(&mut f.body, &mut removed);
            }
        }
        removed
    }
}

/// Drop any `var_decl` in `stmts` whose name is never read anywhere in
/// `stmts` (including nested control-flow children) and whose
/// initializer is pure, then recurse to let nested blocks sweep their
/// own locals.
fn process_block(stmts: &mut Vec<Statement>, removed: &mut usize) {
    let mut reads = HashSet::new();
    collect_reads_in_block(stmts, &mut reads);

    stmts.retain(|stmt| match stmt {
        Statement::VarDecl(decl) => {
            let used = reads.contains(&decl.name);
            let pure_init = decl.initializer.as_ref().map(is_pure).unwrap_or(true);
            let keep = used || !pure_init;
            if !keep {
                *removed += 1;
            }
            keep
        }
        _ => true,
    });

    for stmt in stmts.iter_mut() {
        recurse_children(stmt, removed);
    }
}

fn recurse_children(stmt: &mut Statement, removed: &mut usize) {
    match stmt {
        Statement::Function(f) => process_block(&mut f.body, removed),
        Statement::Block(b) => process_block(&mut b.statements, removed),
        Statement::If(i) => process_if(i, removed),
        Statement::While(w) => process_block(&mut w.body.statements, removed),
        Statement::For(f) => {
            if let Some(init) = f.init.as_deref_mut() {
                recurse_children(init, removed);
            }
            process_block(&mut f.body.statements, removed);
        }
        Statement::ForEach(f) => process_block(&mut f.body.statements, removed),
        Statement::Expression(_)
        | Statement::VarDecl(_)
        | Statement::Return(..)
        | Statement::Break(_)
        | Statement::Continue(_)
        | Statement::Import(_) => {}
    }
}

fn process_if(i: &mut If, removed: &mut usize) {
    process_block(&mut i.then_branch.statements, removed);
    if let Some(branch) = i.else_branch.as_deref_mut() {
        match branch {
            ElseBranch::Block(b) => process_block(&mut b.statements, removed),
            ElseBranch::If(inner) => process_if(inner, removed),
        }
    }
}

fn collect_reads_in_if(i: &If, reads: &mut HashSet<String>) {
    collect_reads_in_expr(&i.condition, reads);
    collect_reads_in_block(&i.then_branch.statements, reads);
    if let Some(branch) = &i.else_branch {
        match branch.as_ref() {
            ElseBranch::Block(b) => collect_reads_in_block(&b.statements, reads),
            ElseBranch::If(inner) => collect_reads_in_if(inner, reads),
        }
    }
}

fn collect_reads_in_block(stmts: &[Statement], reads: &mut HashSet<String>) {
    for stmt in stmts {
        collect_reads_in_stmt(stmt, reads);
    }
}

fn collect_reads_in_stmt(stmt: &Statement, reads: &mut HashSet<String>) {
    match stmt {
        Statement::Expression(e) => collect_reads_in_expr(e, reads),
        Statement::VarDecl(v) => {
            if let Some(init) = &v.initializer {
                collect_reads_in_expr(init, reads);
            }
        }
        Statement::Return(Some(e), _) => collect_reads_in_expr(e, reads),
        Statement::Return(None, _) => {}
        // A nested function opens its own scope (it has no closure over
        // the enclosing block's locals), so its body is not a source of
        // reads for *this* block — it gets its own dead-variable pass.
        Statement::Function(_) => {}
        Statement::Block(b) => collect_reads_in_block(&b.statements, reads),
        Statement::If(i) => collect_reads_in_if(i, reads),
        Statement::While(w) => {
            collect_reads_in_expr(&w.condition, reads);
            collect_reads_in_block(&w.body.statements, reads);
        }
        Statement::For(f) => {
            if let Some(init) = &f.init {
                collect_reads_in_stmt(init, reads);
            }
            if let Some(cond) = &f.condition {
                collect_reads_in_expr(cond, reads);
            }
            if let Some(step) = &f.step {
                collect_reads_in_expr(step, reads);
            }
            collect_reads_in_block(&f.body.statements, reads);
        }
        Statement::ForEach(f) => {
            collect_reads_in_expr(&f.iterable, reads);
            collect_reads_in_block(&f.body.statements, reads);
        }
        Statement::Break(_) | Statement::Continue(_) | Statement::Import(_) => {}
    }
}

/// Every expression form is a read site except the two called out in
/// section 4.I rule 3: a plain assignment's LHS is not a read of its
/// target, while an `index_assign`'s container *is* a read.
fn collect_reads_in_expr(expr: &Expr, reads: &mut HashSet<String>) {
    match expr {
        Expr::Literal(..) => {}
        Expr::Variable(name, _) => {
            reads.insert(name.clone());
        }
        Expr::Binary { left, right, .. } => {
            collect_reads_in_expr(left, reads);
            collect_reads_in_expr(right, reads);
        }
        Expr::Unary { operand, .. } => collect_reads_in_expr(operand, reads),
        Expr::Assign { value, .. } => collect_reads_in_expr(value, reads),
        Expr::IndexAssign { container, index, value, .. } => {
            collect_reads_in_expr(container, reads);
            collect_reads_in_expr(index, reads);
            collect_reads_in_expr(value, reads);
        }
        Expr::Call { callee, args, .. } => {
            collect_reads_in_expr(callee, reads);
            for arg in args {
                collect_reads_in_expr(&arg.value, reads);
            }
        }
        Expr::Array { elements, .. } => {
            for e in elements {
                collect_reads_in_expr(e, reads);
            }
        }
        Expr::SizedArrayAlloc { size, default, .. } => {
            collect_reads_in_expr(size, reads);
            if let Some(d) = default {
                collect_reads_in_expr(d, reads);
            }
        }
        Expr::ArrayAccess { array, index, .. } => {
            collect_reads_in_expr(array, reads);
            collect_reads_in_expr(index, reads);
        }
        Expr::ArraySlice { array, from, to, .. } => {
            collect_reads_in_expr(array, reads);
            if let Some(f) = from {
                collect_reads_in_expr(f, reads);
            }
            if let Some(t) = to {
                collect_reads_in_expr(t, reads);
            }
        }
        Expr::Range { from, to, .. } => {
            collect_reads_in_expr(from, reads);
            collect_reads_in_expr(to, reads);
        }
        Expr::Spread { inner, .. } => collect_reads_in_expr(inner, reads),
        Expr::Increment { target, .. } | Expr::Decrement { target, .. } => collect_reads_in_expr(target, reads),
        Expr::Interpolated { parts, .. } => {
            for part in parts {
                if let InterpolatedPart::Expr(e) = part {
                    collect_reads_in_expr(e, reads);
                }
            }
        }
        Expr::Member { receiver, .. } => collect_reads_in_expr(receiver, reads),
        Expr::Lambda(l) => collect_reads_in_block(&l.body, reads),
        Expr::StaticCall { args, .. } => {
            for arg in args {
                collect_reads_in_expr(&arg.value, reads);
            }
        }
        Expr::ThreadSpawn { call, .. } => collect_reads_in_expr(call, reads),
        Expr::ThreadSync { handle, .. } => collect_reads_in_expr(handle, reads),
    }
}

/// An initializer is pure when evaluating it cannot itself be observed
/// to have run: no call (static, instance, or user function — all may
/// perform I/O or mutate shared state), no increment/decrement, no
/// nested assignment, no thread spawn/sync.
fn is_pure(expr: &Expr) -> bool {
    match expr {
        Expr::Call { .. }
        | Expr::Increment { .. }
        | Expr::Decrement { .. }
        | Expr::Assign { .. }
        | Expr::IndexAssign { .. }
        | Expr::StaticCall { .. }
        | Expr::ThreadSpawn { .. }
        | Expr::ThreadSync { .. } => false,
        Expr::Literal(..) | Expr::Variable(..) => true,
        Expr::Binary { left, right, .. } => is_pure(left) && is_pure(right),
        Expr::Unary { operand, .. } => is_pure(operand),
        Expr::Array { elements, .. } => elements.iter().all(is_pure),
        Expr::SizedArrayAlloc { size, default, .. } => is_pure(size) && default.as_deref().map(is_pure).unwrap_or(true),
        Expr::ArrayAccess { array, index, .. } => is_pure(array) && is_pure(index),
        Expr::ArraySlice { array, from, to, .. } => {
            is_pure(array) && from.as_deref().map(is_pure).unwrap_or(true) && to.as_deref().map(is_pure).unwrap_or(true)
        }
        Expr::Range { from, to, .. } => is_pure(from) && is_pure(to),
        Expr::Spread { inner, .. } => is_pure(inner),
        Expr::Interpolated { parts, .. } => parts.iter().all(|p| match p {
            InterpolatedPart::Str(_) => true,
            InterpolatedPart::Expr(e) => is_pure(e),
        }),
        Expr::Member { receiver, .. } => is_pure(receiver),
        // Constructing a lambda value has no side effect; running its
        // body does, but that happens later at the call site.
        Expr::Lambda(_) => true,
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

    fn int_ty() -> TypeAnnotation {
        TypeAnnotation::Named("int".into(), span())
    }

    fn decl(name: &str, value: i64) -> Statement {
        Statement::VarDecl(VarDecl {
            name: name.into(),
            declared_type: Some(int_ty()),
            initializer: Some(Expr::Literal(Literal::Int(value), span())),
            mem_qual: MemQual::Default,
            span: span(),
        })
    }

    #[test]
    fn unused_pure_variable_is_removed() {
        let mut module = Module::new(
            "test.sdl",
            vec![Statement::Function(Function {
                name: "f".into(),
                params: vec![],
                return_type: int_ty(),
                modifier: FnModifier::Default,
                body: vec![decl("unused", 1), Statement::Return(Some(Expr::Literal(Literal::Int(2), span())), span())],
                span: span(),
            })],
        );
        let removed = DeadVariableRemoval.run(&mut module);
        assert_eq!(removed, 1);
        let Statement::Function(f) = &module.statements[0] else { unreachable!() };
        assert_eq!(f.body.len(), 1);
    }

    #[test]
    fn unused_impure_variable_is_kept_for_its_side_effect() {
        let mut module = Module::new(
            "test.sdl",
            vec![Statement::Function(Function {
                name: "f".into(),
                params: vec![],
                return_type: TypeAnnotation::Named("void".into(), span()),
                modifier: FnModifier::Default,
                body: vec![Statement::VarDecl(VarDecl {
                    name: "ignored".into(),
                    declared_type: Some(int_ty()),
                    initializer: Some(Expr::Call {
                        callee: Box::new(Expr::Variable("sideeffect".into(), span())),
                        args: vec![],
                        is_tail_call: false,
                        span: span(),
                    }),
                    mem_qual: MemQual::Default,
                    span: span(),
                })],
                span: span(),
            })],
        );
        let removed = DeadVariableRemoval.run(&mut module);
        assert_eq!(removed, 0);
    }

    #[test]
    fn variable_read_only_inside_a_nested_block_is_kept() {
        let mut module = Module::new(
            "test.sdl",
            vec![Statement::Function(Function {
                name: "f".into(),
                params: vec![],
                return_type: int_ty(),
                modifier: FnModifier::Default,
                body: vec![
                    decl("x", 1),
                    Statement::If(If {
                        condition: Expr::Literal(Literal::Bool(true), span()),
                        then_branch: Block {
                            statements: vec![Statement::Return(Some(Expr::Variable("x".into(), span())), span())],
                            modifier: BlockModifier::Default,
                            span: span(),
                        },
                        else_branch: None,
                        span: span(),
                    }),
                    Statement::Return(Some(Expr::Literal(Literal::Int(0), span())), span()),
                ],
                span: span(),
            })],
        );
        let removed = DeadVariableRemoval.run(&mut module);
        assert_eq!(removed, 0);
    }
}
