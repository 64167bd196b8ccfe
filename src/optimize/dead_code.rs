//! Pass 1: unreachable-statement removal (section 4.I rule 1).

use crate::ast::{ElseBranch, If, Module, Statement};

use super::OptimizerPass;

pub struct UnreachableStatementRemoval;

impl OptimizerPass for UnreachableStatementRemoval {
    fn name(&self) -> &'static str {
        "unreachable-statement-removal"
    }

    fn run(&self, module: &mut Module) -> usize {
        let mut removed = 0;
        for stmt in module.statements.iter_mut() {
            visit_statement(stmt, &mut removed);
        }
        removed
    }
}

/// Truncate `stmts` right after its first terminator (if any), then
/// recurse into whatever control-flow children survived.
fn truncate_block(stmts: &mut Vec<Statement>, removed: &mut usize) {
    if let Some(idx) = stmts.iter().position(Statement::is_terminator) {
        if idx + 1 < stmts.len() {
            *removed += stmts.len() - (idx + 1);
            stmts.truncate(idx + 1);
        }
    }
    for stmt in stmts.iter_mut() {
        visit_statement(stmt, removed);
    }
}

fn visit_statement(stmt: &mut Statement, removed: &mut usize) {
    match stmt {
        Statement::Function(f) => truncate_block(&mut f.body, removed),
        Statement::Block(b) => truncate_block(&mut b.statements, removed),
        Statement::If(i) => visit_if(i, removed),
        Statement::While(w) => truncate_block(&mut w.body.statements, removed),
        Statement::For(f) => {
            if let Some(init) = f.init.as_deref_mut() {
                visit_statement(init, removed);
            }
            truncate_block(&mut f.body.statements, removed);
        }
        Statement::ForEach(f) => truncate_block(&mut f.body.statements, removed),
        Statement::Expression(_)
        | Statement::VarDecl(_)
        | Statement::Return(..)
        | Statement::Break(_)
        | Statement::Continue(_)
        | Statement::Import(_) => {}
    }
}

fn visit_if(i: &mut If, removed: &mut usize) {
    truncate_block(&mut i.then_branch.statements, removed);
    if let Some(branch) = i.else_branch.as_deref_mut() {
        match branch {
            ElseBranch::Block(b) => truncate_block(&mut b.statements, removed),
            ElseBranch::If(inner) => visit_if(inner, removed),
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

    /// Section 8 scenario 2: `return 1; var x = 2; return x;` reduces to
    /// a single `return 1`.
    #[test]
    fn statements_after_return_are_removed() {
        let mut module = Module::new(
            "test.sdl",
            vec![Statement::Function(Function {
                name: "f".into(),
                params: vec![],
                return_type: int_ty(),
                modifier: FnModifier::Default,
                body: vec![
                    Statement::Return(Some(Expr::Literal(Literal::Int(1), span())), span()),
                    Statement::VarDecl(VarDecl {
                        name: "x".into(),
                        declared_type: Some(int_ty()),
                        initializer: Some(Expr::Literal(Literal::Int(2), span())),
                        mem_qual: MemQual::Default,
                        span: span(),
                    }),
                    Statement::Return(Some(Expr::Variable("x".into(), span())), span()),
                ],
                span: span(),
            })],
        );

        let removed = UnreachableStatementRemoval.run(&mut module);
        assert_eq!(removed, 2);

        let Statement::Function(f) = &module.statements[0] else { unreachable!() };
        assert_eq!(f.body.len(), 1);
        assert!(matches!(f.body[0], Statement::Return(Some(Expr::Literal(Literal::Int(1), _)), _)));
    }

    #[test]
    fn an_if_without_an_else_never_truncates_its_surrounding_block() {
        // `if n <= 0 => return 0` followed by another statement: the
        // `if` has no `else`, so per section 9 Open Question (b) it is
        // never a terminator, and the following `return` survives.
        let mut module = Module::new(
            "test.sdl",
            vec![Statement::Function(Function {
                name: "sum".into(),
                params: vec![],
                return_type: int_ty(),
                modifier: FnModifier::Default,
                body: vec![
                    Statement::If(If {
                        condition: Expr::Literal(Literal::Bool(true), span()),
                        then_branch: Block {
                            statements: vec![Statement::Return(Some(Expr::Literal(Literal::Int(0), span())), span())],
                            modifier: BlockModifier::Default,
                            span: span(),
                        },
                        else_branch: None,
                        span: span(),
                    }),
                    Statement::Return(Some(Expr::Literal(Literal::Int(1), span())), span()),
                ],
                span: span(),
            })],
        );

        let removed = UnreachableStatementRemoval.run(&mut module);
        assert_eq!(removed, 0);
        let Statement::Function(f) = &module.statements[0] else { unreachable!() };
        assert_eq!(f.body.len(), 2);
    }
}
