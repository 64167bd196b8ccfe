//! Symbol table: scope stack plus a namespace side-map (section 4.F).
//!
//! Each symbol is an `Rc<RefCell<_>>` handle so that later passes (escape
//! analysis marking a symbol "pending" or "frozen") can mutate it after
//! the type checker already stored a clone of the handle in several
//! places, without needing the whole table to be `&mut`.

mod scope;

pub use scope::Scope;

use std::cell::RefCell;
use std::rc::Rc;

use crate::ast::{FnModifier, MemQual};
use crate::typecheck::ty::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Parameter,
    Function,
}

/// A declared name's full bookkeeping record (section 4.F table). Mutable
/// fields (`pending`, `frozen_args`, `effective_modifier`) are filled in
/// by later passes; the type checker only ever reads them back.
#[derive(Debug, Clone)]
pub struct SymbolData {
    pub name: String,
    pub kind: SymbolKind,
    pub ty: Type,
    pub mem_qual: MemQual,
    /// Present only for `SymbolKind::Function`.
    pub declared_modifier: Option<FnModifier>,
    /// Filled in once escape analysis has resolved the `default` ->
    /// `shared`/`private` promotion rule (section 4.H).
    pub effective_modifier: Option<FnModifier>,
    /// Set by `thread_spawn` on the arguments captured into a spawned
    /// call, cleared by the matching `thread_sync` (section 4.H).
    pub frozen_args: bool,
    /// True between a forward declaration being registered and its body
    /// being checked, so mutually-recursive functions can resolve calls
    /// to each other (section 4.F, "two-pass" note).
    pub pending: bool,
}

pub type SymbolRef = Rc<RefCell<SymbolData>>;

pub fn new_symbol(
    name: impl Into<String>,
    kind: SymbolKind,
    ty: Type,
    mem_qual: MemQual,
    declared_modifier: Option<FnModifier>,
) -> SymbolRef {
    Rc::new(RefCell::new(SymbolData {
        name: name.into(),
        kind,
        ty,
        mem_qual,
        declared_modifier,
        effective_modifier: None,
        frozen_args: false,
        pending: kind == SymbolKind::Function,
    }))
}
