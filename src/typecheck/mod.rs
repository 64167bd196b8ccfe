//! Type checker driver (section 4.G): two passes over a module's
//! top-level statements — forward-declare every function signature, then
//! check each statement's body — so that mutually recursive functions
//! resolve regardless of declaration order (section 4.F).

pub mod dispatch;
pub mod error;
pub mod expr;
pub mod stmt;
pub mod ty;

use crate::ast::Module;
use crate::diagnostics::Context as DiagContext;
use crate::symbols::Scope;
use error::TypeCheckError;

/// Type-check every statement in `module`, recording structured errors
/// both in the returned `Result` and as diagnostics on `diag` (section
/// 4.K). `scope` is returned so the escape analyzer (section 4.H) can
/// reuse the same symbol table rather than re-declaring every function
/// and variable from scratch.
pub fn type_check_module(module: &Module, diag: &mut DiagContext) -> Result<Scope, Vec<TypeCheckError>> {
    let mut scope = Scope::new();
    let mut errors = stmt::forward_declare(&module.statements, &mut scope);

    for statement in &module.statements {
        if let Err(e) = stmt::check_statement(statement, &mut scope, 0, None) {
            errors.push(e);
        }
    }

    for e in &errors {
        diag.error(e.to_string(), e.span());
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    stmt::collect_mem_qual_warnings(&module.statements, diag);

    Ok(scope)
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
    fn well_typed_function_checks_clean() {
        let function = Statement::Function(Function {
            name: "add".into(),
            params: vec![
                FunctionParam {
                    name: "a".into(),
                    type_annotation: int_ty(),
                    mem_qual: MemQual::Default,
                    span: span(),
                },
                FunctionParam {
                    name: "b".into(),
                    type_annotation: int_ty(),
                    mem_qual: MemQual::Default,
                    span: span(),
                },
            ],
            return_type: int_ty(),
            modifier: FnModifier::Default,
            body: vec![Statement::Return(
                Some(Expr::Binary {
                    op: BinaryOp::Add,
                    left: Box::new(Expr::Variable("a".into(), span())),
                    right: Box::new(Expr::Variable("b".into(), span())),
                    span: span(),
                }),
                span(),
            )],
            span: span(),
        });
        let module = Module::new("test.sdl", vec![function]);
        let mut diag = DiagContext::new(false);
        assert!(type_check_module(&module, &mut diag).is_ok());
    }

    #[test]
    fn mismatched_return_type_is_rejected() {
        let function = Statement::Function(Function {
            name: "f".into(),
            params: vec![],
            return_type: int_ty(),
            modifier: FnModifier::Default,
            body: vec![Statement::Return(
                Some(Expr::Literal(Literal::Str("nope".into()), span())),
                span(),
            )],
            span: span(),
        });
        let module = Module::new("test.sdl", vec![function]);
        let mut diag = DiagContext::new(false);
        assert!(type_check_module(&module, &mut diag).is_err());
    }

    #[test]
    fn break_outside_loop_is_rejected() {
        let module = Module::new("test.sdl", vec![Statement::Break(span())]);
        let mut diag = DiagContext::new(false);
        assert!(type_check_module(&module, &mut diag).is_err());
    }

    #[test]
    fn mutually_recursive_functions_resolve_via_forward_declaration() {
        let is_even = Statement::Function(Function {
            name: "is_even".into(),
            params: vec![FunctionParam {
                name: "n".into(),
                type_annotation: int_ty(),
                mem_qual: MemQual::Default,
                span: span(),
            }],
            return_type: TypeAnnotation::Named("bool".into(), span()),
            modifier: FnModifier::Default,
            body: vec![Statement::Return(
                Some(Expr::Call {
                    callee: Box::new(Expr::Variable("is_odd".into(), span())),
                    args: vec![CallArg {
                        value: Box::new(Expr::Variable("n".into(), span())),
                        spread: false,
                    }],
                    is_tail_call: false,
                    span: span(),
                }),
                span(),
            )],
            span: span(),
        });
        let is_odd = Statement::Function(Function {
            name: "is_odd".into(),
            params: vec![FunctionParam {
                name: "n".into(),
                type_annotation: int_ty(),
                mem_qual: MemQual::Default,
                span: span(),
            }],
            return_type: TypeAnnotation::Named("bool".into(), span()),
            modifier: FnModifier::Default,
            body: vec![Statement::Return(Some(Expr::Literal(Literal::Bool(true), span())), span())],
            span: span(),
        });
        let module = Module::new("test.sdl", vec![is_even, is_odd]);
        let mut diag = DiagContext::new(false);
        assert!(type_check_module(&module, &mut diag).is_ok());
    }

    /// Section 8 scenario 4's type-checking half: `fn worker(buf: byte[]):
    /// int`, `var b: byte[] = {1,2,3}`, `var h: int = spawn worker(b)`,
    /// `var r: int = sync h` must all type-check cleanly — the scenario's
    /// only expected error is the frozen write, which escape analysis
    /// (not the type checker) reports.
    #[test]
    fn thread_spawn_and_sync_type_check_against_the_spawned_calls_signature() {
        let byte_array_ty = TypeAnnotation::Array(Box::new(TypeAnnotation::Named("byte".into(), span())), span());
        let worker = Statement::Function(Function {
            name: "worker".into(),
            params: vec![FunctionParam {
                name: "buf".into(),
                type_annotation: byte_array_ty.clone(),
                mem_qual: MemQual::Default,
                span: span(),
            }],
            return_type: int_ty(),
            modifier: FnModifier::Default,
            body: vec![Statement::Return(
                Some(Expr::Call {
                    callee: Box::new(Expr::Variable("len".into(), span())),
                    args: vec![CallArg { value: Box::new(Expr::Variable("buf".into(), span())), spread: false }],
                    is_tail_call: false,
                    span: span(),
                }),
                span(),
            )],
            span: span(),
        });
        let main = Statement::Function(Function {
            name: "main".into(),
            params: vec![],
            return_type: TypeAnnotation::Named("void".into(), span()),
            modifier: FnModifier::Default,
            body: vec![
                Statement::VarDecl(VarDecl {
                    name: "b".into(),
                    declared_type: Some(byte_array_ty),
                    initializer: Some(Expr::Array {
                        elements: vec![
                            Expr::Literal(Literal::Int(1), span()),
                            Expr::Literal(Literal::Int(2), span()),
                            Expr::Literal(Literal::Int(3), span()),
                        ],
                        span: span(),
                    }),
                    mem_qual: MemQual::Default,
                    span: span(),
                }),
                Statement::VarDecl(VarDecl {
                    name: "h".into(),
                    declared_type: Some(int_ty()),
                    initializer: Some(Expr::ThreadSpawn {
                        call: Box::new(Expr::Call {
                            callee: Box::new(Expr::Variable("worker".into(), span())),
                            args: vec![CallArg { value: Box::new(Expr::Variable("b".into(), span())), spread: false }],
                            is_tail_call: false,
                            span: span(),
                        }),
                        span: span(),
                    }),
                    mem_qual: MemQual::Default,
                    span: span(),
                }),
                Statement::VarDecl(VarDecl {
                    name: "r".into(),
                    declared_type: Some(int_ty()),
                    initializer: Some(Expr::ThreadSync {
                        handle: Box::new(Expr::Variable("h".into(), span())),
                        span: span(),
                    }),
                    mem_qual: MemQual::Default,
                    span: span(),
                }),
            ],
            span: span(),
        });
        let module = Module::new("test.sdl", vec![worker, main]);
        let mut diag = DiagContext::new(false);
        assert!(type_check_module(&module, &mut diag).is_ok());
    }
}
