//! The closed semantic type lattice (section 3.3), resolved from source
//! [`crate::ast::TypeAnnotation`]s by [`resolve_type_annotation`].

use crate::ast::{Expr, Literal, MemQual, TypeAnnotation};
use crate::lexer::Span;
use crate::typecheck::error::{TypeCheckError, UndefinedType};

/// Host types provided by the standard library and named directly in
/// static-method dispatch (section 4.G.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum HostType {
    TextFile,
    BinaryFile,
    Date,
    Time,
    Process,
    TcpListener,
    TcpStream,
    UdpSocket,
    Random,
    Uuid,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Type {
    Int,
    Long,
    Double,
    Char,
    Str,
    Bool,
    Byte,
    Void,
    /// Assignable to any type (section 3.3 invariant); also the element
    /// type of an empty array literal until adopted at a declaration
    /// boundary.
    Nil,
    /// Placeholder used only transiently during inference; never a valid
    /// `expr_type` after successful checking (section 3.8 invariant).
    Any,
    Array(Box<Type>),
    Function {
        return_type: Box<Type>,
        params: Vec<Type>,
        param_mem_quals: Option<Vec<MemQual>>,
        is_variadic: bool,
    },
    Host(HostType),
}

impl Type {
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Type::Int
                | Type::Long
                | Type::Double
                | Type::Char
                | Type::Bool
                | Type::Byte
                | Type::Void
                | Type::Nil
        )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Long | Type::Double | Type::Byte)
    }

    pub fn element_type(&self) -> Option<&Type> {
        match self {
            Type::Array(inner) => Some(inner),
            _ => None,
        }
    }

    /// Assignability, accounting for the coercions named in section 3.3:
    /// `nil` is assignable to anything (including empty-array adoption,
    /// handled one level up by the array-literal rule). `int`/`byte`
    /// equivalence is deliberately NOT included here — section 3.3
    /// restricts it to single-element *literal* narrowing, so it is only
    /// available through [`Type::assignable_to_expr`], which callers use
    /// whenever the source expression is at hand.
    pub fn assignable_to(&self, target: &Type) -> bool {
        if self == target {
            return true;
        }
        match (self, target) {
            (Type::Nil, _) | (_, Type::Any) | (Type::Any, _) => true,
            (Type::Array(_), Type::Array(elem)) if **elem == Type::Nil => true,
            (Type::Array(a), Type::Array(b)) => a.assignable_to(b),
            _ => false,
        }
    }

    /// As [`Type::assignable_to`], but also allows a bare `int` literal to
    /// narrow to `byte` (section 3.3: "single-element narrowing only").
    /// There is no `byte` literal syntax, so the only direction this ever
    /// fires is `Int -> Byte`, and only when `source` is literally an
    /// `Expr::Literal(Literal::Int(_), _)` — an already-typed `int`
    /// variable or expression does not narrow. An array literal narrows
    /// element-wise (section 8 scenario 4's `var b: byte[] = {1,2,3}`):
    /// every element must itself be a narrowable `int` literal, so an
    /// arbitrary `int[]` variable assigned to a `byte[]` target still
    /// does not narrow.
    pub fn assignable_to_expr(&self, target: &Type, source: &Expr) -> bool {
        if self.assignable_to(target) {
            return true;
        }
        match (self, target, source) {
            (Type::Int, Type::Byte, Expr::Literal(Literal::Int(_), _)) => true,
            (Type::Array(elem), Type::Array(target_elem), Expr::Array { elements, .. }) => {
                elements.iter().all(|e| elem.assignable_to_expr(target_elem, e))
            }
            _ => false,
        }
    }

    /// The wider of two numeric types for binary-arithmetic dominance
    /// (section 4.G.1): `double` dominates `long`, which dominates `int`
    /// and `byte`.
    pub fn numeric_dominant(&self, other: &Type) -> Option<Type> {
        if !self.is_numeric() || !other.is_numeric() {
            return None;
        }
        let rank = |t: &Type| match t {
            Type::Byte => 0,
            Type::Int => 1,
            Type::Long => 2,
            Type::Double => 3,
            _ => unreachable!(),
        };
        if rank(self) >= rank(other) {
            Some(self.clone())
        } else {
            Some(other.clone())
        }
    }
}

impl Eq for Type {}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Long => write!(f, "long"),
            Type::Double => write!(f, "double"),
            Type::Char => write!(f, "char"),
            Type::Str => write!(f, "str"),
            Type::Bool => write!(f, "bool"),
            Type::Byte => write!(f, "byte"),
            Type::Void => write!(f, "void"),
            Type::Nil => write!(f, "nil"),
            Type::Any => write!(f, "any"),
            Type::Array(inner) => write!(f, "{inner}[]"),
            Type::Function {
                return_type,
                params,
                ..
            } => {
                write!(f, "(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ") -> {return_type}")
            }
            Type::Host(h) => write!(f, "{h:?}"),
        }
    }
}

/// Resolve a parsed [`TypeAnnotation`] into a concrete [`Type`], erroring
/// on unknown named types (section 4.G).
pub fn resolve_type_annotation(annotation: &TypeAnnotation) -> Result<Type, TypeCheckError> {
    match annotation {
        TypeAnnotation::Named(name, span) => named_type(name, span),
        TypeAnnotation::Array(inner, _) => {
            Ok(Type::Array(Box::new(resolve_type_annotation(inner)?)))
        }
        TypeAnnotation::Function {
            params,
            param_mem_quals,
            is_variadic,
            return_type,
            ..
        } => {
            let mut resolved_params = vec![];
            for p in params {
                resolved_params.push(resolve_type_annotation(p)?);
            }
            let quals = if param_mem_quals.iter().all(|q| matches!(q, MemQual::Default)) {
                None
            } else {
                Some(param_mem_quals.clone())
            };
            Ok(Type::Function {
                return_type: Box::new(resolve_type_annotation(return_type)?),
                params: resolved_params,
                param_mem_quals: quals,
                is_variadic: *is_variadic,
            })
        }
    }
}

fn named_type(name: &str, span: &Span) -> Result<Type, TypeCheckError> {
    Ok(match name {
        "int" => Type::Int,
        "long" => Type::Long,
        "double" => Type::Double,
        "char" => Type::Char,
        "str" => Type::Str,
        "bool" => Type::Bool,
        "byte" => Type::Byte,
        "void" => Type::Void,
        "nil" => Type::Nil,
        "any" => Type::Any,
        "text_file" => Type::Host(HostType::TextFile),
        "binary_file" => Type::Host(HostType::BinaryFile),
        "date" => Type::Host(HostType::Date),
        "time" => Type::Host(HostType::Time),
        "process" => Type::Host(HostType::Process),
        "tcp_listener" => Type::Host(HostType::TcpListener),
        "tcp_stream" => Type::Host(HostType::TcpStream),
        "udp_socket" => Type::Host(HostType::UdpSocket),
        "random" => Type::Host(HostType::Random),
        "uuid" => Type::Host(HostType::Uuid),
        _ => {
            return Err(TypeCheckError::UndefinedType(
                UndefinedType {
                    type_name: name.to_string(),
                },
                span.clone(),
            ))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_literals_resolve() {
        let span = Span::default();
        assert_eq!(
            resolve_type_annotation(&TypeAnnotation::Named("int".into(), span.clone())),
            Ok(Type::Int)
        );
        assert_eq!(
            resolve_type_annotation(&TypeAnnotation::Named("double".into(), span)),
            Ok(Type::Double)
        );
    }

    #[test]
    fn unknown_named_type_errors() {
        let span = Span::default();
        assert!(resolve_type_annotation(&TypeAnnotation::Named("Frobnicator".into(), span)).is_err());
    }

    #[test]
    fn nil_assignable_to_anything() {
        assert!(Type::Nil.assignable_to(&Type::Str));
        assert!(Type::Nil.assignable_to(&Type::Array(Box::new(Type::Int))));
    }

    #[test]
    fn int_byte_narrowing_requires_a_literal_source() {
        let span = Span::default();
        assert!(!Type::Int.assignable_to(&Type::Byte));
        assert!(!Type::Byte.assignable_to(&Type::Int));
        let literal = Expr::Literal(Literal::Int(1), span.clone());
        assert!(Type::Int.assignable_to_expr(&Type::Byte, &literal));
        let variable = Expr::Variable("x".into(), span);
        assert!(!Type::Int.assignable_to_expr(&Type::Byte, &variable));
    }

    /// Section 8 scenario 4: `var b: byte[] = {1,2,3}` must narrow, but
    /// an already-`int[]`-typed variable assigned to a `byte[]` target
    /// must not (the minor review fix: no blanket array element coercion).
    #[test]
    fn byte_array_literal_narrows_element_wise_but_int_array_variable_does_not() {
        let span = Span::default();
        let literal_array = Expr::Array {
            elements: vec![
                Expr::Literal(Literal::Int(1), span.clone()),
                Expr::Literal(Literal::Int(2), span.clone()),
                Expr::Literal(Literal::Int(3), span.clone()),
            ],
            span: span.clone(),
        };
        let byte_array = Type::Array(Box::new(Type::Byte));
        let int_array = Type::Array(Box::new(Type::Int));
        assert!(int_array.assignable_to_expr(&byte_array, &literal_array));

        let variable_array = Expr::Variable("someIntArray".into(), span);
        assert!(!int_array.assignable_to_expr(&byte_array, &variable_array));
        assert!(!int_array.assignable_to(&byte_array));
    }

    #[test]
    fn numeric_dominance_prefers_double() {
        assert_eq!(Type::Int.numeric_dominant(&Type::Double), Some(Type::Double));
        assert_eq!(Type::Byte.numeric_dominant(&Type::Int), Some(Type::Int));
    }
}
