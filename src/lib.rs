//! Front end and middle end for the Sindral compiler.
//!
//! The pipeline, in order, is:
//!
//! ```text
//! source text -> lexer -> parser -> loader (imports) -> type checker
//!             -> escape analyzer -> optimizer -> (external code generator)
//! ```
//!
//! Every later stage consumes the AST produced by the stage before it;
//! none of them touch the filesystem or spawn a process themselves (see
//! [`loader`] for the trait boundary used to keep this core embeddable).

pub mod arena;
pub mod ast;
pub mod diagnostics;
pub mod escape;
pub mod lexer;
pub mod loader;
pub mod optimize;
pub mod parser;
pub mod symbols;
pub mod typecheck;

pub use diagnostics::{Context, Diagnostic, Severity};
