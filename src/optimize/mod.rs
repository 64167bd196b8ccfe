//! AST-rewriting optimizer (section 4.I).
//!
//! Five composable, idempotent passes run in a fixed order by
//! [`optimize`], each implementing the [`OptimizerPass`] trait: a
//! `Vec<Box<dyn OptimizerPass>>` driven by a single `optimize()`
//! function, generalized here to this language's five AST-rewrite
//! rules. Each pass gets its own file so it stays independently
//! unit-testable.
//!
//! Pass order — dead code, then dead variables, then tail calls, then
//! string-literal merge, then algebraic identities last — is a design
//! decision recorded in DESIGN.md: running algebraic identities last
//! lets it catch folds any earlier pass exposes (e.g. a sibling
//! statement's removal leaving behind an otherwise-untouched `x + 0`),
//! and dead-code removal runs first since it can make a variable
//! declaration dead that dead-variable removal then sweeps.

mod algebraic;
mod dead_code;
mod dead_vars;
mod string_merge;
mod tail_call;

pub use algebraic::AlgebraicIdentities;
pub use dead_code::UnreachableStatementRemoval;
pub use dead_vars::DeadVariableRemoval;
pub use string_merge::StringLiteralMerge;
pub use tail_call::TailCallMarking;

use crate::ast::Module;
use crate::diagnostics::Context as DiagContext;

/// Per-pass rewrite counters (section 4.I), reported for testing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub statements_removed: usize,
    pub variables_removed: usize,
    pub noops_removed: usize,
    pub tail_calls_optimized: usize,
    pub string_literals_merged: usize,
}

/// One AST rewrite rule (section 4.I). `run` rewrites `module` in place
/// and returns how many rewrites it made, so the driver can attribute
/// counts to the right [`Counters`] field.
pub trait OptimizerPass {
    fn name(&self) -> &'static str;
    fn run(&self, module: &mut Module) -> usize;
}

/// Run the fixed pass pipeline over `module`, logging a trace line with
/// the aggregate counters (section 4.K) and returning them.
pub fn optimize(module: &mut Module, diag: &mut DiagContext) -> Counters {
    let mut counters = Counters::default();

    counters.statements_removed += UnreachableStatementRemoval.run(module);
    counters.variables_removed += DeadVariableRemoval.run(module);
    counters.tail_calls_optimized += TailCallMarking.run(module);
    counters.string_literals_merged += StringLiteralMerge.run(module);
    counters.noops_removed += AlgebraicIdentities.run(module);

    if diag.verbose {
        log::debug!("optimizer finished for '{}': {counters:?}", module.file);
    }

    counters
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

    #[test]
    fn optimize_is_idempotent_on_a_mixed_function() {
        let function = Function {
            name: "f".into(),
            params: vec![],
            return_type: int_ty(),
            modifier: FnModifier::Default,
            body: vec![
                Statement::VarDecl(VarDecl {
                    name: "y".into(),
                    declared_type: Some(int_ty()),
                    initializer: Some(Expr::Binary {
                        op: BinaryOp::Mul,
                        left: Box::new(Expr::Binary {
                            op: BinaryOp::Add,
                            left: Box::new(Expr::Variable("x".into(), span())),
                            right: Box::new(Expr::Literal(Literal::Int(0), span())),
                            span: span(),
                        }),
                        right: Box::new(Expr::Literal(Literal::Int(1), span())),
                        span: span(),
                    }),
                    mem_qual: MemQual::Default,
                    span: span(),
                }),
                Statement::Return(Some(Expr::Variable("y".into(), span())), span()),
                Statement::VarDecl(VarDecl {
                    name: "unreachable".into(),
                    declared_type: Some(int_ty()),
                    initializer: Some(Expr::Literal(Literal::Int(2), span())),
                    mem_qual: MemQual::Default,
                    span: span(),
                }),
            ],
            span: span(),
        };
        let mut module = Module::new("test.sdl", vec![Statement::Function(function)]);
        let mut diag = DiagContext::new(false);

        let first = optimize(&mut module, &mut diag);
        let after_first = module.clone();
        let second = optimize(&mut module, &mut diag);

        assert_eq!(module, after_first, "running the optimizer twice must not change the AST further");
        assert_eq!(first.statements_removed, 1);
        assert_eq!(second.statements_removed, 0);
        assert_eq!(first.noops_removed, 2);
    }
}
