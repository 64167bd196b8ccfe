//! Type-checker error taxonomy (section 7).

use crate::lexer::Span;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndefinedType {
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndefinedSymbol {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMismatch {
    pub expected: String,
    pub found: String,
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArityMismatch {
    pub callee: String,
    pub expected: usize,
    pub found: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMethod {
    pub receiver_type: String,
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateDeclaration {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotCallable {
    pub found: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotIndexable {
    pub found: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidMemQual {
    pub detail: String,
}

/// Every way a module can fail to type check (section 7). Each variant
/// pairs a structured detail struct with the [`Span`] a diagnostic
/// should point at, rather than one untyped string bag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeCheckError {
    UndefinedType(UndefinedType, Span),
    UndefinedSymbol(UndefinedSymbol, Span),
    TypeMismatch(TypeMismatch, Span),
    ArityMismatch(ArityMismatch, Span),
    UnknownMethod(UnknownMethod, Span),
    DuplicateDeclaration(DuplicateDeclaration, Span),
    NotCallable(NotCallable, Span),
    NotIndexable(NotIndexable, Span),
    InvalidMemQual(InvalidMemQual, Span),
    BreakOutsideLoop(Span),
    ContinueOutsideLoop(Span),
    ReturnOutsideFunction(Span),
    SpawnRequiresCall(Span),
}

impl TypeCheckError {
    pub fn span(&self) -> Span {
        match self {
            TypeCheckError::UndefinedType(_, s)
            | TypeCheckError::UndefinedSymbol(_, s)
            | TypeCheckError::TypeMismatch(_, s)
            | TypeCheckError::ArityMismatch(_, s)
            | TypeCheckError::UnknownMethod(_, s)
            | TypeCheckError::DuplicateDeclaration(_, s)
            | TypeCheckError::NotCallable(_, s)
            | TypeCheckError::NotIndexable(_, s)
            | TypeCheckError::InvalidMemQual(_, s)
            | TypeCheckError::BreakOutsideLoop(s)
            | TypeCheckError::ContinueOutsideLoop(s)
            | TypeCheckError::ReturnOutsideFunction(s)
            | TypeCheckError::SpawnRequiresCall(s) => s.clone(),
        }
    }
}

impl std::fmt::Display for TypeCheckError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeCheckError::UndefinedType(e, _) => write!(f, "undefined type `{}`", e.type_name),
            TypeCheckError::UndefinedSymbol(e, _) => write!(f, "undefined symbol `{}`", e.name),
            TypeCheckError::TypeMismatch(e, _) => write!(
                f,
                "type mismatch in {}: expected `{}`, found `{}`",
                e.context, e.expected, e.found
            ),
            TypeCheckError::ArityMismatch(e, _) => write!(
                f,
                "`{}` expects {} argument(s), found {}",
                e.callee, e.expected, e.found
            ),
            TypeCheckError::UnknownMethod(e, _) => {
                write!(f, "`{}` has no method `{}`", e.receiver_type, e.method)
            }
            TypeCheckError::DuplicateDeclaration(e, _) => {
                write!(f, "`{}` is already declared in this scope", e.name)
            }
            TypeCheckError::NotCallable(e, _) => write!(f, "`{}` is not callable", e.found),
            TypeCheckError::NotIndexable(e, _) => write!(f, "`{}` is not indexable", e.found),
            TypeCheckError::InvalidMemQual(e, _) => write!(f, "invalid memory qualifier: {}", e.detail),
            TypeCheckError::BreakOutsideLoop(_) => write!(f, "`break` outside of a loop"),
            TypeCheckError::ContinueOutsideLoop(_) => write!(f, "`continue` outside of a loop"),
            TypeCheckError::ReturnOutsideFunction(_) => write!(f, "`return` outside of a function"),
            TypeCheckError::SpawnRequiresCall(_) => {
                write!(f, "`spawn` requires a direct function call expression")
            }
        }
    }
}

impl std::error::Error for TypeCheckError {}
