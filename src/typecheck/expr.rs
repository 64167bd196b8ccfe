//! Expression type checking (section 4.G.1).

use crate::ast::{BinaryOp, CallArg, Expr, InterpolatedPart, Literal, MemQual, UnaryOp};
use crate::lexer::Span;
use crate::symbols::Scope;
use crate::typecheck::dispatch;
use crate::typecheck::error::{
    ArityMismatch, NotCallable, NotIndexable, TypeCheckError, TypeMismatch, UndefinedSymbol,
    UnknownMethod,
};
use crate::typecheck::ty::{resolve_type_annotation, HostType, Type};

fn mismatch(expected: impl ToString, found: &Type, context: impl ToString, span: &Span) -> TypeCheckError {
    TypeCheckError::TypeMismatch(
        TypeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
            context: context.to_string(),
        },
        span.clone(),
    )
}

/// Check `expr` against the current scope, returning its resolved type.
/// Threading `scope` by `&mut` follows directly from the symbol table
/// owning the mutable per-symbol state (`frozen_args`, `pending`) that a
/// few expression forms update in place — `thread_spawn` below is the
/// main example.
pub fn check_expr(expr: &Expr, scope: &mut Scope) -> Result<Type, TypeCheckError> {
    match expr {
        Expr::Literal(lit, _) => Ok(match lit {
            Literal::Int(_) => Type::Int,
            Literal::Long(_) => Type::Long,
            Literal::Double(_) => Type::Double,
            Literal::Char(_) => Type::Char,
            Literal::Str(_) => Type::Str,
            Literal::Bool(_) => Type::Bool,
            Literal::Nil => Type::Nil,
        }),

        Expr::Variable(name, span) => scope.lookup(name).map(|s| s.borrow().ty.clone()).ok_or_else(|| {
            TypeCheckError::UndefinedSymbol(UndefinedSymbol { name: name.clone() }, span.clone())
        }),

        Expr::Binary { op, left, right, span } => check_binary(*op, left, right, span, scope),

        Expr::Unary { op, operand, span } => {
            let ty = check_expr(operand, scope)?;
            match op {
                UnaryOp::Neg if ty.is_numeric() => Ok(ty),
                UnaryOp::Neg => Err(mismatch("a numeric type", &ty, "unary `-`", span)),
                UnaryOp::Not if ty == Type::Bool => Ok(Type::Bool),
                UnaryOp::Not => Err(mismatch(Type::Bool, &ty, "unary `!`", span)),
            }
        }

        Expr::Assign { target, value, span } => {
            check_lvalue(target, span)?;
            let target_ty = check_expr(target, scope)?;
            let value_ty = check_expr(value, scope)?;
            if !value_ty.assignable_to_expr(&target_ty, value) {
                return Err(mismatch(&target_ty, &value_ty, "assignment", span));
            }
            Ok(target_ty)
        }

        Expr::IndexAssign {
            container,
            index,
            value,
            span,
        } => {
            let container_ty = check_expr(container, scope)?;
            let index_ty = check_expr(index, scope)?;
            if index_ty != Type::Int {
                return Err(mismatch(Type::Int, &index_ty, "array index", span));
            }
            let elem = container_ty
                .element_type()
                .cloned()
                .ok_or_else(|| TypeCheckError::NotIndexable(NotIndexable { found: container_ty.to_string() }, span.clone()))?;
            let value_ty = check_expr(value, scope)?;
            if !value_ty.assignable_to_expr(&elem, value) {
                return Err(mismatch(&elem, &value_ty, "indexed assignment", span));
            }
            Ok(elem)
        }

        Expr::Call { callee, args, span } => check_call(callee, args, span, scope),

        Expr::Array { elements, span } => {
            let mut elem_ty: Option<Type> = None;
            for e in elements {
                let ty = check_expr(e, scope)?;
                elem_ty = Some(match elem_ty {
                    None => ty,
                    Some(Type::Nil) => ty,
                    Some(current) if ty == Type::Nil => current,
                    Some(current) if current == ty => current,
                    Some(current) => return Err(mismatch(&current, &ty, "array literal element", span)),
                });
            }
            Ok(Type::Array(Box::new(elem_ty.unwrap_or(Type::Nil))))
        }

        Expr::SizedArrayAlloc {
            element_type,
            size,
            default,
            span,
        } => {
            let elem = resolve_type_annotation(element_type)?;
            let size_ty = check_expr(size, scope)?;
            if size_ty != Type::Int {
                return Err(mismatch(Type::Int, &size_ty, "array size", span));
            }
            if let Some(default) = default {
                let default_ty = check_expr(default, scope)?;
                if !default_ty.assignable_to_expr(&elem, default) {
                    return Err(mismatch(&elem, &default_ty, "array default value", span));
                }
            }
            Ok(Type::Array(Box::new(elem)))
        }

        Expr::ArrayAccess { array, index, span } => {
            let array_ty = check_expr(array, scope)?;
            let index_ty = check_expr(index, scope)?;
            if index_ty != Type::Int {
                return Err(mismatch(Type::Int, &index_ty, "array index", span));
            }
            array_ty
                .element_type()
                .cloned()
                .ok_or_else(|| TypeCheckError::NotIndexable(NotIndexable { found: array_ty.to_string() }, span.clone()))
        }

        Expr::ArraySlice { array, from, to, span } => {
            let array_ty = check_expr(array, scope)?;
            if array_ty.element_type().is_none() {
                return Err(TypeCheckError::NotIndexable(
                    NotIndexable { found: array_ty.to_string() },
                    span.clone(),
                ));
            }
            for bound in [from, to].into_iter().flatten() {
                let bound_ty = check_expr(bound, scope)?;
                if bound_ty != Type::Int {
                    return Err(mismatch(Type::Int, &bound_ty, "slice bound", span));
                }
            }
            Ok(array_ty)
        }

        Expr::Range { from, to, span } => {
            let from_ty = check_expr(from, scope)?;
            let to_ty = check_expr(to, scope)?;
            if from_ty != Type::Int || to_ty != Type::Int {
                return Err(mismatch("int", if from_ty != Type::Int { &from_ty } else { &to_ty }, "range bound", span));
            }
            Ok(Type::Array(Box::new(Type::Int)))
        }

        Expr::Spread { span, .. } => Err(TypeCheckError::TypeMismatch(
            TypeMismatch {
                expected: "a call argument position".into(),
                found: "spread expression".into(),
                context: "spread outside of a call".into(),
            },
            span.clone(),
        )),

        Expr::Increment { target, span, .. } | Expr::Decrement { target, span, .. } => {
            check_lvalue(target, span)?;
            let ty = check_expr(target, scope)?;
            if !ty.is_numeric() {
                return Err(mismatch("a numeric type", &ty, "increment/decrement", span));
            }
            Ok(ty)
        }

        Expr::Interpolated { parts, .. } => {
            for part in parts {
                if let InterpolatedPart::Expr(e) = part {
                    check_expr(e, scope)?;
                }
            }
            Ok(Type::Str)
        }

        Expr::Member { receiver, property, span } => {
            let receiver_ty = check_expr(receiver, scope)?;
            if property == "length" {
                if receiver_ty.element_type().is_some() || receiver_ty == Type::Str {
                    return Ok(Type::Int);
                }
            }
            Err(TypeCheckError::UnknownMethod(
                UnknownMethod {
                    receiver_type: receiver_ty.to_string(),
                    method: property.clone(),
                },
                span.clone(),
            ))
        }

        Expr::Lambda(lambda) => check_lambda(lambda, None, scope),

        Expr::StaticCall {
            type_name,
            method,
            args,
            span,
        } => {
            if !dispatch::is_known_static_type(type_name) {
                return Err(TypeCheckError::UndefinedType(
                    crate::typecheck::error::UndefinedType { type_name: type_name.clone() },
                    span.clone(),
                ));
            }
            let arg_types = check_args(args, scope)?;
            match dispatch::static_method(type_name, method, &arg_types) {
                Some(Ok(ty)) => Ok(ty),
                Some(Err(message)) => Err(mismatch("a compatible argument list", &Type::Any, message, span)),
                None => Err(TypeCheckError::UnknownMethod(
                    UnknownMethod {
                        receiver_type: type_name.clone(),
                        method: method.clone(),
                    },
                    span.clone(),
                )),
            }
        }

        Expr::ThreadSpawn { call, span } => {
            let Some((callee, args)) = call.as_call() else {
                return Err(TypeCheckError::SpawnRequiresCall(span.clone()));
            };
            // A spawn's result is the spawned call's own return type —
            // the spec's own example (`var h: int = spawn worker(b)`
            // where `worker` returns `int`) declares the handle variable
            // with that type directly, rather than an opaque handle type
            // the variable's declared type could never match.
            let callee_ty = check_expr(callee, scope)?;
            let (return_type, param_mem_quals) = match &callee_ty {
                Type::Function { return_type, param_mem_quals, .. } => {
                    (return_type.as_ref().clone(), param_mem_quals.clone())
                }
                other => return Err(TypeCheckError::NotCallable(NotCallable { found: other.to_string() }, span.clone())),
            };
            for (i, arg) in args.iter().enumerate() {
                let arg_ty = check_expr(&arg.value, scope)?;
                if let Expr::Variable(name, _) = arg.value.as_ref() {
                    // Section 4.H: only an array/string argument, or a
                    // primitive passed `as ref`, is frozen. A by-value
                    // primitive argument is copied into the spawned call
                    // and stays free to mutate in the spawning function.
                    let passed_as_ref = param_mem_quals
                        .as_ref()
                        .and_then(|quals| quals.get(i))
                        .map(|q| *q == MemQual::Ref)
                        .unwrap_or(false);
                    let freezes = matches!(arg_ty, Type::Array(_)) || arg_ty == Type::Str || passed_as_ref;
                    if freezes {
                        if let Some(symbol) = scope.lookup(name) {
                            Scope::freeze(&symbol);
                        }
                    }
                }
            }
            Ok(return_type)
        }

        Expr::ThreadSync { handle, span: _ } => {
            // The handle carries its spawned call's return type already
            // (set above), so `sync` just yields that type back;
            // `find_spawn_source` is kept so a later wrapper-expression
            // syntax around the synced handle has one place to extend.
            let ty = check_expr(handle, scope)?;
            if let Expr::Variable(name, _) = find_spawn_source(handle) {
                if let Some(symbol) = scope.lookup(name) {
                    Scope::unfreeze(&symbol);
                }
            }
            Ok(ty)
        }
    }
}

/// `thread_sync` takes the handle variable itself, not the spawned call,
/// so unfreezing walks straight through: kept as its own helper in case
/// later syntax allows syncing through a wrapper expression.
fn find_spawn_source(handle: &Expr) -> &Expr {
    handle
}

/// Check a lambda, optionally back-inferring any parameter or return
/// type the source left unannotated from `expected` (section 4.G.1
/// "lambda" rule, 4.G.2 point 2, 4.G.3 var-decl rule): a call-site
/// passes the corresponding formal parameter's `Type::Function`, a
/// `var_decl` passes its declared function type; a bare lambda
/// expression checked on its own passes `None` and must be fully
/// annotated.
pub(crate) fn check_lambda(
    lambda: &crate::ast::Lambda,
    expected: Option<&Type>,
    scope: &mut Scope,
) -> Result<Type, TypeCheckError> {
    let expected_fn = match expected {
        Some(Type::Function { params, return_type, .. }) => Some((params.as_slice(), return_type.as_ref())),
        _ => None,
    };

    let mut params = vec![];
    for (i, p) in lambda.params.iter().enumerate() {
        let ty = match &p.type_annotation {
            Some(annotation) => resolve_type_annotation(annotation)?,
            None => match expected_fn.and_then(|(params, _)| params.get(i)) {
                Some(inferred) => inferred.clone(),
                None => {
                    return Err(mismatch(
                        "an explicit parameter type",
                        &Type::Any,
                        format!("lambda parameter `{}`", p.name),
                        &p.span,
                    ))
                }
            },
        };
        params.push((p.name.clone(), ty));
    }
    scope.push(None);
    for (name, ty) in &params {
        scope.declare_parameter(name, ty.clone(), crate::ast::MemQual::Default, &lambda.span)?;
    }
    let declared_return = lambda.return_type.as_ref().map(resolve_type_annotation).transpose()?;
    let inferred = declared_return.is_none() && expected_fn.is_none();
    let mut return_type = declared_return
        .or_else(|| expected_fn.map(|(_, ret)| ret.clone()))
        .unwrap_or(Type::Void);
    let mut slot = crate::typecheck::stmt::ReturnSlot {
        ty: &mut return_type,
        inferred,
    };
    for stmt in &lambda.body {
        crate::typecheck::stmt::check_statement(stmt, scope, 0, Some(&mut slot))?;
    }
    scope.pop();
    Ok(Type::Function {
        return_type: Box::new(return_type),
        params: params.into_iter().map(|(_, t)| t).collect(),
        param_mem_quals: None,
        is_variadic: false,
    })
}

fn check_args(args: &[CallArg], scope: &mut Scope) -> Result<Vec<Type>, TypeCheckError> {
    let mut types = vec![];
    for arg in args {
        if arg.spread {
            let ty = check_expr(&arg.value, scope)?;
            let elem = ty.element_type().cloned().ok_or_else(|| {
                mismatch("an array", &ty, "spread argument", &arg.value.span())
            })?;
            types.push(elem);
        } else {
            types.push(check_expr(&arg.value, scope)?);
        }
    }
    Ok(types)
}

fn check_call(callee: &Expr, args: &[CallArg], span: &Span, scope: &mut Scope) -> Result<Type, TypeCheckError> {
    if let Expr::Member { receiver, property, .. } = callee {
        let receiver_ty = check_expr(receiver, scope)?;
        let arg_types = check_args(args, scope)?;
        return match dispatch::instance_method(&receiver_ty, property, &arg_types) {
            Some(Ok(ty)) => Ok(ty),
            Some(Err(message)) => Err(mismatch("a compatible argument list", &Type::Any, message, span)),
            None => Err(TypeCheckError::UnknownMethod(
                UnknownMethod {
                    receiver_type: receiver_ty.to_string(),
                    method: property.clone(),
                },
                span.clone(),
            )),
        };
    }

    // Resolve a plain-variable callee's symbol type up front, before
    // its arguments are checked, so a lambda argument missing parameter
    // or return annotations can be back-inferred from the matching
    // formal parameter (section 4.G.2 point 2) instead of being
    // rejected for lacking an explicit type. Builtin globals are tried
    // only when the name isn't already a resolvable symbol, so a
    // user-declared function shadows a same-named builtin rather than
    // being silently bypassed by it.
    if let Expr::Variable(name, _) = callee {
        if scope.lookup(name).is_none() {
            let arg_types = check_args(args, scope)?;
            if let Some(result) = dispatch::builtin_global(name, &arg_types) {
                return result.map_err(|message| mismatch("a compatible argument list", &Type::Any, message, span));
            }
        }
    }

    let callee_ty = check_expr(callee, scope)?;
    match callee_ty {
        Type::Function {
            return_type,
            params,
            is_variadic,
            ..
        } => {
            if is_variadic {
                if args.len() < params.len() {
                    return Err(TypeCheckError::ArityMismatch(
                        ArityMismatch {
                            callee: describe_callee(callee),
                            expected: params.len(),
                            found: args.len(),
                        },
                        span.clone(),
                    ));
                }
            } else if args.len() != params.len() {
                return Err(TypeCheckError::ArityMismatch(
                    ArityMismatch {
                        callee: describe_callee(callee),
                        expected: params.len(),
                        found: args.len(),
                    },
                    span.clone(),
                ));
            }

            let mut arg_types = Vec::with_capacity(args.len());
            for (i, arg) in args.iter().enumerate() {
                let ty = if arg.spread {
                    let t = check_expr(&arg.value, scope)?;
                    t.element_type().cloned().ok_or_else(|| {
                        mismatch("an array", &t, "spread argument", &arg.value.span())
                    })?
                } else if let Expr::Lambda(lambda) = arg.value.as_ref() {
                    check_lambda(lambda, params.get(i), scope)?
                } else {
                    check_expr(&arg.value, scope)?
                };
                arg_types.push(ty);
            }

            for (i, (expected, found)) in params.iter().zip(arg_types.iter()).enumerate() {
                let compatible = match args.get(i) {
                    Some(arg) if !arg.spread => found.assignable_to_expr(expected, &arg.value),
                    _ => found.assignable_to(expected),
                };
                if !compatible {
                    return Err(mismatch(expected, found, "call argument", span));
                }
            }
            if is_variadic {
                for extra in &arg_types[params.len()..] {
                    if !(extra.is_primitive() || *extra == Type::Str) {
                        return Err(mismatch(
                            "a primitive or `str`",
                            extra,
                            "variadic call argument",
                            span,
                        ));
                    }
                }
            }
            Ok(*return_type)
        }
        other => Err(TypeCheckError::NotCallable(NotCallable { found: other.to_string() }, span.clone())),
    }
}

fn describe_callee(callee: &Expr) -> String {
    match callee {
        Expr::Variable(name, _) => name.clone(),
        _ => "<expression>".to_string(),
    }
}

fn check_binary(
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
    span: &Span,
    scope: &mut Scope,
) -> Result<Type, TypeCheckError> {
    let left_ty = check_expr(left, scope)?;
    let right_ty = check_expr(right, scope)?;
    use BinaryOp::*;
    match op {
        Add if left_ty == Type::Str || right_ty == Type::Str => Ok(Type::Str),
        Add | Sub | Mul | Div | Mod => left_ty.numeric_dominant(&right_ty).ok_or_else(|| {
            mismatch("two numeric operands", &right_ty, format!("binary `{op:?}`"), span)
        }),
        Eq | Ne => Ok(Type::Bool),
        Lt | Le | Gt | Ge => {
            if left_ty.numeric_dominant(&right_ty).is_none() {
                return Err(mismatch("two numeric operands", &right_ty, format!("binary `{op:?}`"), span));
            }
            Ok(Type::Bool)
        }
        And | Or => {
            if left_ty != Type::Bool || right_ty != Type::Bool {
                return Err(mismatch(Type::Bool, if left_ty != Type::Bool { &left_ty } else { &right_ty }, format!("binary `{op:?}`"), span));
            }
            Ok(Type::Bool)
        }
    }
}

/// Only variables, member accesses and array indices are valid
/// assignment/increment targets (section 4.G.1).
fn check_lvalue(expr: &Expr, span: &Span) -> Result<(), TypeCheckError> {
    match expr {
        Expr::Variable(..) | Expr::Member { .. } | Expr::ArrayAccess { .. } => Ok(()),
        _ => Err(TypeCheckError::TypeMismatch(
            TypeMismatch {
                expected: "an assignable expression".into(),
                found: "a non-assignable expression".into(),
                context: "assignment target".into(),
            },
            span.clone(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{FnModifier, Lambda, LambdaParam, Literal, MemQual, Statement, TypeAnnotation};

    fn span() -> Span {
        Span::default()
    }

    fn int_ty() -> TypeAnnotation {
        TypeAnnotation::Named("int".into(), span())
    }

    fn bool_ty() -> TypeAnnotation {
        TypeAnnotation::Named("bool".into(), span())
    }

    /// `fn apply(n: int, f: (int) -> bool): bool => return f(n)`, the
    /// higher-order function a back-inferred lambda argument is checked
    /// against below.
    fn declare_apply(scope: &mut Scope) {
        let callback_ty = Type::Function {
            return_type: Box::new(Type::Bool),
            params: vec![Type::Int],
            param_mem_quals: None,
            is_variadic: false,
        };
        let apply_ty = Type::Function {
            return_type: Box::new(Type::Bool),
            params: vec![Type::Int, callback_ty],
            param_mem_quals: None,
            is_variadic: false,
        };
        scope
            .declare_function("apply", apply_ty, FnModifier::Default, &span())
            .unwrap();
    }

    #[test]
    fn bare_lambda_without_annotations_is_rejected() {
        let mut scope = Scope::new();
        let lambda = Lambda {
            params: vec![LambdaParam { name: "x".into(), type_annotation: None, span: span() }],
            return_type: None,
            body: vec![Statement::Return(Some(Expr::Variable("x".into(), span())), span())],
            span: span(),
        };
        assert!(check_expr(&Expr::Lambda(lambda), &mut scope).is_err());
    }

    #[test]
    fn lambda_argument_infers_missing_param_and_return_type_from_callee() {
        let mut scope = Scope::new();
        declare_apply(&mut scope);
        let lambda = Lambda {
            params: vec![LambdaParam { name: "x".into(), type_annotation: None, span: span() }],
            return_type: None,
            body: vec![Statement::Return(
                Some(Expr::Binary {
                    op: BinaryOp::Gt,
                    left: Box::new(Expr::Variable("x".into(), span())),
                    right: Box::new(Expr::Literal(Literal::Int(0), span())),
                    span: span(),
                }),
                span(),
            )],
            span: span(),
        };
        let call = Expr::Call {
            callee: Box::new(Expr::Variable("apply".into(), span())),
            args: vec![
                CallArg { value: Box::new(Expr::Literal(Literal::Int(5), span())), spread: false },
                CallArg { value: Box::new(Expr::Lambda(lambda)), spread: false },
            ],
            is_tail_call: false,
            span: span(),
        };
        assert_eq!(check_expr(&call, &mut scope), Ok(Type::Bool));
    }

    #[test]
    fn lambda_var_decl_infers_from_declared_function_type() {
        use crate::typecheck::stmt::check_statement;

        let mut scope = Scope::new();
        let decl = crate::ast::VarDecl {
            name: "pred".into(),
            declared_type: Some(TypeAnnotation::Function {
                params: vec![int_ty()],
                param_mem_quals: vec![MemQual::Default],
                is_variadic: false,
                return_type: Box::new(bool_ty()),
                span: span(),
            }),
            initializer: Some(Expr::Lambda(Lambda {
                params: vec![LambdaParam { name: "n".into(), type_annotation: None, span: span() }],
                return_type: None,
                body: vec![Statement::Return(
                    Some(Expr::Binary {
                        op: BinaryOp::Gt,
                        left: Box::new(Expr::Variable("n".into(), span())),
                        right: Box::new(Expr::Literal(Literal::Int(0), span())),
                        span: span(),
                    }),
                    span(),
                )],
                span: span(),
            })),
            mem_qual: MemQual::Default,
            span: span(),
        };
        assert!(check_statement(&Statement::VarDecl(decl), &mut scope, 0, None).is_ok());
        assert_eq!(
            scope.lookup("pred").unwrap().borrow().ty,
            Type::Function {
                return_type: Box::new(Type::Bool),
                params: vec![Type::Int],
                param_mem_quals: None,
                is_variadic: false,
            }
        );
    }

    #[test]
    fn user_function_shadows_same_named_builtin() {
        let mut scope = Scope::new();
        scope
            .declare_function(
                "len",
                Type::Function {
                    return_type: Box::new(Type::Str),
                    params: vec![Type::Int],
                    param_mem_quals: None,
                    is_variadic: false,
                },
                FnModifier::Default,
                &span(),
            )
            .unwrap();
        let call = Expr::Call {
            callee: Box::new(Expr::Variable("len".into(), span())),
            args: vec![CallArg { value: Box::new(Expr::Literal(Literal::Int(1), span())), spread: false }],
            is_tail_call: false,
            span: span(),
        };
        // The builtin `len` only accepts arrays/strings and returns
        // `int`; the user's shadowing declaration returns `str` instead,
        // which is what proves the shadow took effect rather than the
        // builtin.
        assert_eq!(check_expr(&call, &mut scope), Ok(Type::Str));
    }
}
