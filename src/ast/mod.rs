//! Typed abstract syntax tree (section 3.4, 3.5, 3.6).
//!
//! Node ownership: the reference compiler arena-allocates every node and
//! links siblings with raw pointers (section 9, "Cyclic AST links"). Here
//! nodes are owned sum types (`Box`/`Vec`), an `Expression<T>`/`Statement<T>`
//! tree rather than an arena of raw pointers — Rust's ownership model
//! already gives the "valid only while the owner is live" guarantee the
//! reference arena provides by convention.

pub mod expr;
pub mod module;
pub mod qualifiers;
pub mod stmt;
pub mod type_annotation;

pub use expr::*;
pub use module::Module;
pub use qualifiers::{BlockModifier, FnModifier, MemQual};
pub use stmt::*;
pub use type_annotation::TypeAnnotation;
