//! Statement type checking and the forward-declaration pass that lets
//! sibling functions call each other regardless of source order (section
//! 4.F, 4.G.3).

use crate::ast::{
    Block, ElseBranch, For, ForEach, Function, If, Statement, VarDecl, While,
};
use crate::lexer::Span;
use crate::symbols::Scope;
use crate::typecheck::error::TypeCheckError;
use crate::typecheck::expr::check_expr;
use crate::typecheck::ty::{resolve_type_annotation, Type};

/// Where a `return` statement's value, if any, is checked against. A
/// function's declared return type is fixed (`inferred: false`); a
/// lambda without a `-> Type` annotation instead widens `ty` to the
/// first `return`'s type the first time one is seen (section 4.G.1,
/// "lambda return type" note in [`crate::typecheck::expr`]).
pub struct ReturnSlot<'a> {
    pub ty: &'a mut Type,
    pub inferred: bool,
}

pub fn check_statement(
    stmt: &Statement,
    scope: &mut Scope,
    loop_depth: usize,
    mut current_return: Option<&mut ReturnSlot>,
) -> Result<(), TypeCheckError> {
    match stmt {
        Statement::Expression(e) => {
            check_expr(e, scope)?;
            Ok(())
        }

        Statement::VarDecl(decl) => check_var_decl(decl, scope),

        Statement::Function(function) => check_function_body(function, scope),

        Statement::Return(value, span) => {
            let Some(slot) = current_return.as_deref_mut() else {
                return Err(TypeCheckError::ReturnOutsideFunction(span.clone()));
            };
            let value_ty = match value {
                Some(e) => check_expr(e, scope)?,
                None => Type::Void,
            };
            if slot.inferred && *slot.ty == Type::Void && value_ty != Type::Void {
                *slot.ty = value_ty;
                return Ok(());
            }
            let compatible = match value {
                Some(e) => value_ty.assignable_to_expr(slot.ty, e),
                None => value_ty.assignable_to(slot.ty),
            };
            if !compatible {
                return Err(crate::typecheck::error::TypeCheckError::TypeMismatch(
                    crate::typecheck::error::TypeMismatch {
                        expected: slot.ty.to_string(),
                        found: value_ty.to_string(),
                        context: "return value".into(),
                    },
                    span.clone(),
                ));
            }
            Ok(())
        }

        Statement::Block(block) => check_block(block, scope, loop_depth, current_return),

        Statement::If(if_stmt) => check_if(if_stmt, scope, loop_depth, current_return),

        Statement::While(while_stmt) => check_while(while_stmt, scope, current_return),

        Statement::For(for_stmt) => check_for(for_stmt, scope, current_return),

        Statement::ForEach(for_each) => check_for_each(for_each, scope, current_return),

        Statement::Break(span) => {
            if loop_depth == 0 {
                return Err(TypeCheckError::BreakOutsideLoop(span.clone()));
            }
            Ok(())
        }

        Statement::Continue(span) => {
            if loop_depth == 0 {
                return Err(TypeCheckError::ContinueOutsideLoop(span.clone()));
            }
            Ok(())
        }

        Statement::Import(_) => Ok(()),
    }
}

fn check_var_decl(decl: &VarDecl, scope: &mut Scope) -> Result<(), TypeCheckError> {
    let declared_ty = decl.declared_type.as_ref().map(resolve_type_annotation).transpose()?;
    // A lambda initializer is type-inferred from the declared function
    // type (section 4.G.3) rather than requiring full annotations of
    // its own.
    let initializer_ty = match &decl.initializer {
        Some(crate::ast::Expr::Lambda(lambda)) => {
            Some(crate::typecheck::expr::check_lambda(lambda, declared_ty.as_ref(), scope)?)
        }
        Some(e) => Some(check_expr(e, scope)?),
        None => None,
    };

    let resolved = match (declared_ty, initializer_ty) {
        (Some(declared), Some(init)) => {
            let compatible = match &decl.initializer {
                Some(e) => init.assignable_to_expr(&declared, e),
                None => init.assignable_to(&declared),
            };
            if !compatible {
                return Err(crate::typecheck::error::TypeCheckError::TypeMismatch(
                    crate::typecheck::error::TypeMismatch {
                        expected: declared.to_string(),
                        found: init.to_string(),
                        context: format!("initializer for `{}`", decl.name),
                    },
                    decl.span.clone(),
                ));
            }
            declared
        }
        (Some(declared), None) => declared,
        (None, Some(init)) => init,
        (None, None) => {
            return Err(crate::typecheck::error::TypeCheckError::TypeMismatch(
                crate::typecheck::error::TypeMismatch {
                    expected: "a declared type or an initializer".into(),
                    found: "neither".into(),
                    context: format!("declaration of `{}`", decl.name),
                },
                decl.span.clone(),
            ))
        }
    };

    scope.declare_variable(&decl.name, resolved, decl.mem_qual, &decl.span)?;
    Ok(())
}

/// Register every top-level function's signature before checking any
/// body, so mutual recursion resolves (section 4.F "two-pass" note).
/// Non-function statements at module scope are left for the ordinary
/// pass.
pub fn forward_declare(statements: &[Statement], scope: &mut Scope) -> Vec<TypeCheckError> {
    let mut errors = vec![];
    for stmt in statements {
        if let Statement::Function(function) = stmt {
            match function_type(function) {
                Ok(ty) => {
                    if let Err(e) = scope.declare_function(&function.name, ty, function.modifier, &function.span) {
                        errors.push(e);
                    }
                }
                Err(e) => errors.push(e),
            }
        }
    }
    errors
}

/// Shared with [`crate::loader`], which registers a namespaced import's
/// exported functions in the same shape (section 4.J step 4).
pub(crate) fn function_type(function: &Function) -> Result<Type, TypeCheckError> {
    let mut params = vec![];
    let mut quals = vec![];
    for p in &function.params {
        params.push(resolve_type_annotation(&p.type_annotation)?);
        quals.push(p.mem_qual);
    }
    Ok(Type::Function {
        return_type: Box::new(resolve_type_annotation(&function.return_type)?),
        params,
        param_mem_quals: Some(quals),
        is_variadic: false,
    })
}

/// `as ref` only makes sense on a primitive (section 4.H: it is how a
/// primitive is passed by reference); on anything else it is a hard
/// error rather than a silent no-op, since the caller would otherwise
/// expect aliasing that can't happen. `as val` on a primitive is
/// harmless — the parameter is already passed by value — so it is left
/// for [`collect_mem_qual_warnings`] to flag as a warning, not an error
/// (section 9 Open Question (c)).
fn check_param_mem_qual(
    param: &crate::ast::FunctionParam,
    ty: &Type,
) -> Result<(), TypeCheckError> {
    if param.mem_qual == crate::ast::MemQual::Ref && !ty.is_primitive() {
        return Err(TypeCheckError::InvalidMemQual(
            crate::typecheck::error::InvalidMemQual {
                detail: format!("`{}: {} as ref` — `as ref` only applies to primitive types", param.name, ty),
            },
            param.span.clone(),
        ));
    }
    Ok(())
}

/// A second, warning-only sweep over every function's parameters
/// (including nested function statements), run after the hard-error
/// pass has already succeeded. `as val` on a parameter whose resolved
/// type is already primitive changes nothing at runtime, so it is
/// reported rather than rejected.
pub fn collect_mem_qual_warnings(statements: &[Statement], diag: &mut crate::diagnostics::Context) {
    for statement in statements {
        match statement {
            Statement::Function(function) => {
                for p in &function.params {
                    if p.mem_qual == crate::ast::MemQual::Val {
                        if let Ok(ty) = resolve_type_annotation(&p.type_annotation) {
                            if ty.is_primitive() {
                                diag.warning(
                                    format!("`{}: {} as val` has no effect: `{}` is already passed by value", p.name, ty, ty),
                                    p.span.clone(),
                                );
                            }
                        }
                    }
                }
                collect_mem_qual_warnings(&function.body, diag);
            }
            Statement::Block(b) => collect_mem_qual_warnings(&b.statements, diag),
            Statement::If(i) => collect_mem_qual_warnings_if(i, diag),
            Statement::While(w) => collect_mem_qual_warnings(&w.body.statements, diag),
            Statement::For(f) => collect_mem_qual_warnings(&f.body.statements, diag),
            Statement::ForEach(f) => collect_mem_qual_warnings(&f.body.statements, diag),
            Statement::Expression(_)
            | Statement::VarDecl(_)
            | Statement::Return(..)
            | Statement::Break(_)
            | Statement::Continue(_)
            | Statement::Import(_) => {}
        }
    }
}

fn collect_mem_qual_warnings_if(if_stmt: &If, diag: &mut crate::diagnostics::Context) {
    collect_mem_qual_warnings(&if_stmt.then_branch.statements, diag);
    if let Some(branch) = &if_stmt.else_branch {
        match branch.as_ref() {
            ElseBranch::Block(b) => collect_mem_qual_warnings(&b.statements, diag),
            ElseBranch::If(i) => collect_mem_qual_warnings_if(i, diag),
        }
    }
}

fn check_function_body(function: &Function, scope: &mut Scope) -> Result<(), TypeCheckError> {
    let symbol = scope.lookup(&function.name);
    scope.push(None);
    for p in &function.params {
        let ty = resolve_type_annotation(&p.type_annotation)?;
        check_param_mem_qual(p, &ty)?;
        scope.declare_parameter(&p.name, ty, p.mem_qual, &p.span)?;
    }
    let mut return_type = resolve_type_annotation(&function.return_type)?;
    if function.modifier == crate::ast::FnModifier::Private && !return_type.is_primitive() {
        scope.pop();
        return Err(TypeCheckError::InvalidMemQual(
            crate::typecheck::error::InvalidMemQual {
                detail: format!(
                    "`private fn {}` cannot return non-primitive type `{}` — it would outlive the function's own arena",
                    function.name, return_type
                ),
            },
            function.span.clone(),
        ));
    }
    let mut slot = ReturnSlot {
        ty: &mut return_type,
        inferred: false,
    };
    for s in &function.body {
        check_statement(s, scope, 0, Some(&mut slot))?;
    }
    scope.pop();
    if let Some(symbol) = symbol {
        Scope::mark_pending(&symbol, false);
    }
    Ok(())
}

fn check_block(
    block: &Block,
    scope: &mut Scope,
    loop_depth: usize,
    mut current_return: Option<&mut ReturnSlot>,
) -> Result<(), TypeCheckError> {
    scope.push(Some(block.modifier));
    for s in &block.statements {
        check_statement(s, scope, loop_depth, current_return.as_deref_mut())?;
    }
    scope.pop();
    Ok(())
}

fn check_if(
    if_stmt: &If,
    scope: &mut Scope,
    loop_depth: usize,
    mut current_return: Option<&mut ReturnSlot>,
) -> Result<(), TypeCheckError> {
    let cond_ty = check_expr(&if_stmt.condition, scope)?;
    if cond_ty != Type::Bool {
        return Err(condition_must_be_bool(&cond_ty, &if_stmt.span));
    }
    check_block(&if_stmt.then_branch, scope, loop_depth, current_return.as_deref_mut())?;
    match &if_stmt.else_branch {
        Some(branch) => match branch.as_ref() {
            ElseBranch::Block(b) => check_block(b, scope, loop_depth, current_return),
            ElseBranch::If(i) => check_if(i, scope, loop_depth, current_return),
        },
        None => Ok(()),
    }
}

fn check_while(while_stmt: &While, scope: &mut Scope, current_return: Option<&mut ReturnSlot>) -> Result<(), TypeCheckError> {
    let cond_ty = check_expr(&while_stmt.condition, scope)?;
    if cond_ty != Type::Bool {
        return Err(condition_must_be_bool(&cond_ty, &while_stmt.span));
    }
    check_block(&while_stmt.body, scope, 1, current_return)
}

fn check_for(for_stmt: &For, scope: &mut Scope, current_return: Option<&mut ReturnSlot>) -> Result<(), TypeCheckError> {
    scope.push(None);
    if let Some(init) = &for_stmt.init {
        check_statement(init, scope, 0, None)?;
    }
    if let Some(cond) = &for_stmt.condition {
        let cond_ty = check_expr(cond, scope)?;
        if cond_ty != Type::Bool {
            scope.pop();
            return Err(condition_must_be_bool(&cond_ty, &for_stmt.span));
        }
    }
    if let Some(step) = &for_stmt.step {
        check_expr(step, scope)?;
    }
    let result = check_block(&for_stmt.body, scope, 1, current_return);
    scope.pop();
    result
}

fn check_for_each(for_each: &ForEach, scope: &mut Scope, current_return: Option<&mut ReturnSlot>) -> Result<(), TypeCheckError> {
    let iterable_ty = check_expr(&for_each.iterable, scope)?;
    let elem_ty = iterable_ty.element_type().cloned().ok_or_else(|| {
        crate::typecheck::error::TypeCheckError::NotIndexable(
            crate::typecheck::error::NotIndexable { found: iterable_ty.to_string() },
            for_each.span.clone(),
        )
    })?;
    scope.push(None);
    scope.declare_variable(&for_each.binding, elem_ty, crate::ast::MemQual::Default, &for_each.span)?;
    let result = check_block(&for_each.body, scope, 1, current_return);
    scope.pop();
    result
}

fn condition_must_be_bool(found: &Type, span: &Span) -> TypeCheckError {
    crate::typecheck::error::TypeCheckError::TypeMismatch(
        crate::typecheck::error::TypeMismatch {
            expected: Type::Bool.to_string(),
            found: found.to_string(),
            context: "condition".into(),
        },
        span.clone(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::*;
    use crate::diagnostics::Context as DiagContext;
    use crate::lexer::Span;

    fn span() -> Span {
        Span::default()
    }

    fn int_ty() -> TypeAnnotation {
        TypeAnnotation::Named("int".into(), span())
    }

    fn array_int_ty() -> TypeAnnotation {
        TypeAnnotation::Array(Box::new(int_ty()), span())
    }

    fn function_with(param: FunctionParam, return_type: TypeAnnotation, modifier: FnModifier) -> Function {
        Function {
            name: "f".into(),
            params: vec![param],
            return_type,
            modifier,
            body: vec![Statement::Return(Some(Expr::Variable("x".into(), span())), span())],
            span: span(),
        }
    }

    #[test]
    fn as_ref_on_a_non_primitive_parameter_is_rejected() {
        let param = FunctionParam {
            name: "x".into(),
            type_annotation: array_int_ty(),
            mem_qual: MemQual::Ref,
            span: span(),
        };
        let mut scope = Scope::new();
        let function = function_with(param, array_int_ty(), FnModifier::Default);
        scope.declare_function(&function.name, function_type(&function).unwrap(), function.modifier, &function.span).unwrap();
        let err = check_function_body(&function, &mut scope);
        assert!(matches!(err, Err(TypeCheckError::InvalidMemQual(..))));
    }

    #[test]
    fn as_ref_on_a_primitive_parameter_is_fine() {
        let param = FunctionParam {
            name: "x".into(),
            type_annotation: int_ty(),
            mem_qual: MemQual::Ref,
            span: span(),
        };
        let mut scope = Scope::new();
        let function = function_with(param, int_ty(), FnModifier::Default);
        scope.declare_function(&function.name, function_type(&function).unwrap(), function.modifier, &function.span).unwrap();
        assert!(check_function_body(&function, &mut scope).is_ok());
    }

    #[test]
    fn as_val_on_a_primitive_parameter_is_a_warning_not_an_error() {
        let param = FunctionParam {
            name: "x".into(),
            type_annotation: int_ty(),
            mem_qual: MemQual::Val,
            span: span(),
        };
        let function = Statement::Function(function_with(param, int_ty(), FnModifier::Default));
        let module = Module::new("test.sdl", vec![function]);
        let mut diag = DiagContext::new(false);
        let result = crate::typecheck::type_check_module(&module, &mut diag);
        assert!(result.is_ok());
        assert!(diag
            .diagnostics()
            .iter()
            .any(|d| d.severity == crate::diagnostics::Severity::Warning));
    }

    #[test]
    fn private_function_returning_an_array_is_rejected() {
        let param = FunctionParam {
            name: "x".into(),
            type_annotation: int_ty(),
            mem_qual: MemQual::Default,
            span: span(),
        };
        let mut scope = Scope::new();
        let function = Function {
            body: vec![Statement::Return(
                Some(Expr::Array { elements: vec![], span: span() }),
                span(),
            )],
            ..function_with(param, array_int_ty(), FnModifier::Private)
        };
        scope.declare_function(&function.name, function_type(&function).unwrap(), function.modifier, &function.span).unwrap();
        let err = check_function_body(&function, &mut scope);
        assert!(matches!(err, Err(TypeCheckError::InvalidMemQual(..))));
    }
}
