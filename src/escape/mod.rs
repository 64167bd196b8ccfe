//! Escape analysis and memory-qualifier resolution (section 4.H).
//!
//! Walks a checked module's statements a second time (type checking has
//! already proven every name resolves, so this pass can stay purely
//! structural) to:
//!
//! 1. resolve each `default` function/block's effective arena modifier
//!    (`default` implicitly promotes to `shared` the moment a value can
//!    outlive the arena that allocated it — returning a non-`void` value
//!    is the case modeled here);
//! 2. reject a value declared inside a `private` block escaping that
//!    block through `return`;
//! 3. track `thread_spawn`'s frozen arguments and reject mutating one
//!    before the matching `thread_sync`.
//!
//! Structured the same way the type checker is: first resolve structure,
//! then validate — adapted from types to arenas.

use std::collections::HashSet;

use crate::ast::{BlockModifier, ElseBranch, Expr, FnModifier, Function, MemQual, Module, Statement};
use crate::diagnostics::Context as DiagContext;
use crate::lexer::Span;
use crate::symbols::Scope;
use crate::typecheck::ty::Type;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscapeError {
    PrivateValueEscapesBlock { variable: String, span: Span },
    FrozenArgumentMutated { variable: String, span: Span },
}

impl EscapeError {
    pub fn span(&self) -> Span {
        match self {
            EscapeError::PrivateValueEscapesBlock { span, .. } => span.clone(),
            EscapeError::FrozenArgumentMutated { span, .. } => span.clone(),
        }
    }
}

impl std::fmt::Display for EscapeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EscapeError::PrivateValueEscapesBlock { variable, .. } => {
                write!(f, "`{variable}` was declared in a `private` block and cannot escape it")
            }
            EscapeError::FrozenArgumentMutated { variable, .. } => {
                write!(f, "`{variable}` is frozen by a pending `thread_spawn` and cannot be mutated before `thread_sync`")
            }
        }
    }
}

/// Per-function analysis state: which local names were declared under a
/// `private` block (and so may never outlive it), which names are
/// currently frozen by an in-flight `thread_spawn`, and which names hold
/// a non-`void` spawn result not yet consumed by `thread_sync`.
#[derive(Default)]
struct FunctionState {
    private_locals: HashSet<String>,
    frozen: HashSet<String>,
    pending_spawns: HashSet<String>,
}

/// `scope` is the same symbol table the type checker populated (section
/// 4.G) — reused here so each function's `effective_modifier` (section
/// 3.8 invariant) lands on the same [`crate::symbols::Symbol`] the rest
/// of the pipeline looks up by name, rather than a second table.
pub fn analyze_module(module: &Module, scope: &mut Scope, diag: &mut DiagContext) -> Result<(), Vec<EscapeError>> {
    let mut errors = vec![];
    for statement in &module.statements {
        if let Statement::Function(function) = statement {
            let effective = effective_function_modifier(function);
            if let Some(symbol) = scope.lookup(&function.name) {
                Scope::set_effective_modifier(&symbol, effective);
            }
            analyze_function(function, scope, &mut errors, diag);
        }
    }
    for e in &errors {
        diag.error(e.to_string(), e.span());
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// The effective modifier a `default` function/block resolves to
/// (section 4.H): `shared` the moment its body can hand a value back to
/// its caller, `private` otherwise (values die with the function's own
/// arena, same as an explicit `private` would have meant).
pub fn effective_function_modifier(function: &Function) -> FnModifier {
    if function.modifier != FnModifier::Default {
        return function.modifier;
    }
    if body_returns_a_value(&function.body) {
        FnModifier::Shared
    } else {
        FnModifier::Private
    }
}

fn body_returns_a_value(statements: &[Statement]) -> bool {
    statements.iter().any(|s| match s {
        Statement::Return(Some(_), _) => true,
        Statement::If(if_stmt) => {
            body_returns_a_value(&if_stmt.then_branch.statements)
                || if_stmt
                    .else_branch
                    .as_ref()
                    .map(|b| match b.as_ref() {
                        ElseBranch::Block(b) => body_returns_a_value(&b.statements),
                        ElseBranch::If(i) => body_returns_a_value(std::slice::from_ref(&Statement::If(i.clone()))),
                    })
                    .unwrap_or(false)
        }
        Statement::Block(b) => body_returns_a_value(&b.statements),
        Statement::While(w) => body_returns_a_value(&w.body.statements),
        Statement::For(f) => body_returns_a_value(&f.body.statements),
        Statement::ForEach(f) => body_returns_a_value(&f.body.statements),
        _ => false,
    })
}

fn analyze_function(function: &Function, scope: &Scope, errors: &mut Vec<EscapeError>, diag: &mut DiagContext) {
    let mut state = FunctionState::default();
    analyze_block(&function.body, scope, &mut state, false, errors, diag);
    for name in &state.pending_spawns {
        diag.warning(
            format!("`{name}` holds a pending `thread_spawn` result that is never consumed by `thread_sync`"),
            function.span.clone(),
        );
    }
}

/// `in_private` is true while walking a block whose nearest enclosing
/// arena boundary is `private` — at the point a `return` is seen with
/// `in_private` set, any variable it references that was declared
/// inside that same private region is flagged (section 4.H rule 2).
fn analyze_block(
    statements: &[Statement],
    scope: &Scope,
    state: &mut FunctionState,
    in_private: bool,
    errors: &mut Vec<EscapeError>,
    diag: &mut DiagContext,
) {
    for stmt in statements {
        analyze_statement(stmt, scope, state, in_private, errors, diag);
    }
}

fn analyze_statement(
    stmt: &Statement,
    scope: &Scope,
    state: &mut FunctionState,
    in_private: bool,
    errors: &mut Vec<EscapeError>,
    diag: &mut DiagContext,
) {
    match stmt {
        Statement::VarDecl(decl) => {
            if in_private {
                state.private_locals.insert(decl.name.clone());
            }
            if let Some(init) = &decl.initializer {
                check_frozen_mutation(init, state, errors);
                if matches!(init, Expr::ThreadSpawn { .. }) {
                    track_spawn_and_sync(init, scope, state);
                    state.pending_spawns.insert(decl.name.clone());
                }
            }
        }
        Statement::Expression(expr) => {
            track_spawn_and_sync(expr, scope, state);
            if let Expr::ThreadSync { handle, .. } = expr {
                if let Some(name) = root_variable(handle) {
                    state.pending_spawns.remove(name);
                }
            }
            check_frozen_mutation(expr, state, errors);
        }
        Statement::Return(Some(value), span) => {
            check_frozen_mutation(value, state, errors);
            if in_private {
                if let Some(name) = root_variable(value) {
                    if state.private_locals.contains(name) {
                        errors.push(EscapeError::PrivateValueEscapesBlock {
                            variable: name.to_string(),
                            span: span.clone(),
                        });
                    }
                }
            }
        }
        Statement::Return(None, _) | Statement::Break(_) | Statement::Continue(_) | Statement::Import(_) => {}
        Statement::Function(nested) => analyze_function(nested, scope, errors, diag),
        Statement::Block(block) => {
            let nested_private = in_private || block.modifier == BlockModifier::Private;
            analyze_block(&block.statements, scope, state, nested_private, errors, diag);
        }
        Statement::If(if_stmt) => {
            check_frozen_mutation(&if_stmt.condition, state, errors);
            let then_private = in_private || if_stmt.then_branch.modifier == BlockModifier::Private;
            analyze_block(&if_stmt.then_branch.statements, scope, state, then_private, errors, diag);
            match &if_stmt.else_branch {
                Some(branch) => match branch.as_ref() {
                    ElseBranch::Block(b) => {
                        let else_private = in_private || b.modifier == BlockModifier::Private;
                        analyze_block(&b.statements, scope, state, else_private, errors, diag);
                    }
                    ElseBranch::If(i) => {
                        analyze_statement(&Statement::If(i.clone()), scope, state, in_private, errors, diag)
                    }
                },
                None => {}
            }
        }
        Statement::While(w) => {
            check_frozen_mutation(&w.condition, state, errors);
            let body_private = in_private || w.body.modifier == BlockModifier::Private;
            analyze_block(&w.body.statements, scope, state, body_private, errors, diag);
        }
        Statement::For(f) => {
            let body_private = in_private || f.body.modifier == BlockModifier::Private;
            analyze_block(&f.body.statements, scope, state, body_private, errors, diag);
        }
        Statement::ForEach(f) => {
            let body_private = in_private || f.body.modifier == BlockModifier::Private;
            analyze_block(&f.body.statements, scope, state, body_private, errors, diag);
        }
    }
}

/// The innermost variable name an expression is "about", for the
/// purposes of the two escape checks above — good enough for the direct
/// `return x` and `thread_spawn worker(x)` shapes these rules target
/// without trying to track aliasing through arbitrary expressions.
fn root_variable(expr: &Expr) -> Option<&str> {
    match expr {
        Expr::Variable(name, _) => Some(name),
        Expr::Member { receiver, .. } => root_variable(receiver),
        Expr::ArrayAccess { array, .. } => root_variable(array),
        _ => None,
    }
}

/// The callee's per-parameter memory qualifiers, if `callee` resolves to
/// a known function in `scope`.
fn callee_param_mem_quals(callee: &Expr, scope: &Scope) -> Option<Vec<MemQual>> {
    let name = root_variable(callee)?;
    let symbol = scope.lookup(name)?;
    let borrowed = symbol.borrow();
    match &borrowed.ty {
        Type::Function { param_mem_quals, .. } => param_mem_quals.clone(),
        _ => None,
    }
}

/// Whether the argument at `index` should freeze under `thread_spawn`
/// (section 4.H): an array or string always freezes (the spawned thread
/// may hold the only live view of it), a primitive only freezes when the
/// callee declared that parameter `as ref`.
fn argument_freezes(arg: &Expr, index: usize, callee: &Expr, scope: &Scope) -> bool {
    let Some(name) = root_variable(arg) else { return false };
    let Some(symbol) = scope.lookup(name) else { return false };
    let is_array_or_str = matches!(symbol.borrow().ty, Type::Array(_) | Type::Str);
    if is_array_or_str {
        return true;
    }
    callee_param_mem_quals(callee, scope)
        .and_then(|quals| quals.get(index).copied())
        .map(|q| q == MemQual::Ref)
        .unwrap_or(false)
}

fn track_spawn_and_sync(expr: &Expr, scope: &Scope, state: &mut FunctionState) {
    match expr {
        Expr::ThreadSpawn { call, .. } => {
            if let Some((callee, args)) = call.as_call() {
                for (i, arg) in args.iter().enumerate() {
                    if let Some(name) = root_variable(&arg.value) {
                        if argument_freezes(&arg.value, i, callee, scope) {
                            state.frozen.insert(name.to_string());
                        }
                    }
                }
            }
        }
        Expr::ThreadSync { handle, .. } => {
            if let Some(name) = root_variable(handle) {
                state.frozen.remove(name);
            }
        }
        _ => {}
    }
}

/// Reject mutating a variable that is currently frozen by a pending
/// `thread_spawn` (section 4.H rule 3). Only the direct assignment
/// targets are checked; reads of a frozen variable remain legal.
fn check_frozen_mutation(expr: &Expr, state: &FunctionState, errors: &mut Vec<EscapeError>) {
    match expr {
        Expr::Assign { target, span, .. } | Expr::IndexAssign { container: target, span, .. } => {
            if let Some(name) = root_variable(target) {
                if state.frozen.contains(name) {
                    errors.push(EscapeError::FrozenArgumentMutated { variable: name.to_string(), span: span.clone() });
                }
            }
        }
        Expr::Increment { target, span, .. } | Expr::Decrement { target, span, .. } => {
            if let Some(name) = root_variable(target) {
                if state.frozen.contains(name) {
                    errors.push(EscapeError::FrozenArgumentMutated { variable: name.to_string(), span: span.clone() });
                }
            }
        }
        _ => {}
    }
}
