//! Pass 3 (run order): tail-call marking (section 4.I rule 4).

use crate::ast::{ElseBranch, Expr, Function, If, Module, Statement};

use super::OptimizerPass;

pub struct TailCallMarking;

impl OptimizerPass for TailCallMarking {
    fn name(&self) -> &'static str {
        "tail-call-marking"
    }

    fn run(&self, module: &mut Module) -> usize {
        let mut marked = 0;
        for stmt in module.statements.iter_mut() {
            if let Statement::Function(f) = stmt {
                mark_function(f, &mut marked);
            }
        }
        marked
    }
}

fn mark_function(f: &mut Function, marked: &mut usize) {
    let name = f.name.clone();
    mark_block(&mut f.body, &name, marked);
}

fn mark_block(stmts: &mut [Statement], fn_name: &str, marked: &mut usize) {
    for stmt in stmts.iter_mut() {
        mark_statement(stmt, fn_name, marked);
    }
}

/// Recurses into every control-flow child so a tail call inside, e.g.,
/// the `then` branch of an `if` with no `else` still qualifies (section
/// 4.I rule 4, last sentence) — reachability isn't reconsidered here,
/// only the syntactic shape `return f(...)`.
fn mark_statement(stmt: &mut Statement, fn_name: &str, marked: &mut usize) {
    match stmt {
        Statement::Return(Some(value), _) => mark_if_self_call(value, fn_name, marked),
        Statement::Return(None, _) => {}
        Statement::Function(nested) => mark_function(nested, marked),
        Statement::Block(b) => mark_block(&mut b.statements, fn_name, marked),
        Statement::If(i) => mark_if(i, fn_name, marked),
        Statement::While(w) => mark_block(&mut w.body.statements, fn_name, marked),
        Statement::For(f) => {
            if let Some(init) = f.init.as_deref_mut() {
                mark_statement(init, fn_name, marked);
            }
            mark_block(&mut f.body.statements, fn_name, marked);
        }
        Statement::ForEach(f) => mark_block(&mut f.body.statements, fn_name, marked),
        Statement::Expression(_) | Statement::VarDecl(_) | Statement::Break(_) | Statement::Continue(_) | Statement::Import(_) => {}
    }
}

fn mark_if(i: &mut If, fn_name: &str, marked: &mut usize) {
    mark_block(&mut i.then_branch.statements, fn_name, marked);
    if let Some(branch) = i.else_branch.as_deref_mut() {
        match branch {
            ElseBranch::Block(b) => mark_block(&mut b.statements, fn_name, marked),
            ElseBranch::If(inner) => mark_if(inner, fn_name, marked),
        }
    }
}

/// A call is a tail call only when the `return`ed expression IS the
/// call itself (`return f(...)`), not when the call is nested inside a
/// larger expression (`return n + f(...)` is not, section 8 scenario
/// 1) — and only when its callee is a bare reference to the enclosing
/// function's own name (direct self-recursion).
fn mark_if_self_call(value: &mut Expr, fn_name: &str, marked: &mut usize) {
    if let Expr::Call { callee, is_tail_call, .. } = value {
        if let Expr::Variable(name, _) = callee.as_ref() {
            if name == fn_name && !*is_tail_call {
                *is_tail_call = true;
                *marked += 1;
            }
        }
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

    fn call_sum(arg: Expr) -> Expr {
        Expr::Call {
            callee: Box::new(Expr::Variable("sum".into(), span())),
            args: vec![CallArg { value: Box::new(arg), spread: false }],
            is_tail_call: false,
            span: span(),
        }
    }

    /// Section 8 scenario 1: `return n + sum(n - 1)` is not a tail call
    /// because of the outer `+`.
    #[test]
    fn call_wrapped_in_a_binary_expression_is_not_a_tail_call() {
        let mut module = Module::new(
            "test.sdl",
            vec![Statement::Function(Function {
                name: "sum".into(),
                params: vec![FunctionParam { name: "n".into(), type_annotation: int_ty(), mem_qual: MemQual::Default, span: span() }],
                return_type: int_ty(),
                modifier: FnModifier::Default,
                body: vec![Statement::Return(
                    Some(Expr::Binary {
                        op: BinaryOp::Add,
                        left: Box::new(Expr::Variable("n".into(), span())),
                        right: Box::new(call_sum(Expr::Literal(Literal::Int(1), span()))),
                        span: span(),
                    }),
                    span(),
                )],
                span: span(),
            })],
        );
        let marked = TailCallMarking.run(&mut module);
        assert_eq!(marked, 0);
    }

    #[test]
    fn direct_self_call_in_return_position_is_a_tail_call() {
        let mut module = Module::new(
            "test.sdl",
            vec![Statement::Function(Function {
                name: "sum".into(),
                params: vec![FunctionParam { name: "n".into(), type_annotation: int_ty(), mem_qual: MemQual::Default, span: span() }],
                return_type: int_ty(),
                modifier: FnModifier::Default,
                body: vec![Statement::Return(Some(call_sum(Expr::Literal(Literal::Int(1), span()))), span())],
                span: span(),
            })],
        );
        let marked = TailCallMarking.run(&mut module);
        assert_eq!(marked, 1);
        let Statement::Function(f) = &module.statements[0] else { unreachable!() };
        let Statement::Return(Some(Expr::Call { is_tail_call, .. }), _) = &f.body[0] else { unreachable!() };
        assert!(is_tail_call);
    }

    #[test]
    fn a_tail_call_inside_an_else_less_if_still_qualifies() {
        let mut module = Module::new(
            "test.sdl",
            vec![Statement::Function(Function {
                name: "sum".into(),
                params: vec![FunctionParam { name: "n".into(), type_annotation: int_ty(), mem_qual: MemQual::Default, span: span() }],
                return_type: int_ty(),
                modifier: FnModifier::Default,
                body: vec![Statement::If(If {
                    condition: Expr::Literal(Literal::Bool(true), span()),
                    then_branch: Block {
                        statements: vec![Statement::Return(Some(call_sum(Expr::Literal(Literal::Int(1), span()))), span())],
                        modifier: BlockModifier::Default,
                        span: span(),
                    },
                    else_branch: None,
                    span: span(),
                })],
                span: span(),
            })],
        );
        let marked = TailCallMarking.run(&mut module);
        assert_eq!(marked, 1);
    }
}
