//! Type annotations as written in source text, prior to resolution
//! against the closed host-type set (section 3.3). The type checker
//! (section 4.G) turns these into [`crate::typecheck::ty::Type`].

use crate::ast::MemQual;
use crate::lexer::Span;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum TypeAnnotation {
    Named(String, Span),
    Array(Box<TypeAnnotation>, Span),
    Function {
        params: Vec<TypeAnnotation>,
        param_mem_quals: Vec<MemQual>,
        is_variadic: bool,
        return_type: Box<TypeAnnotation>,
        span: Span,
    },
}

impl TypeAnnotation {
    pub fn span(&self) -> Span {
        match self {
            TypeAnnotation::Named(_, s) => s.clone(),
            TypeAnnotation::Array(_, s) => s.clone(),
            TypeAnnotation::Function { span, .. } => span.clone(),
        }
    }
}
