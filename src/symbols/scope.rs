//! Lexical scope stack plus namespace side-table (section 4.F).

use std::collections::HashMap;

use crate::ast::{BlockModifier, FnModifier, MemQual};
use crate::symbols::{new_symbol, SymbolData, SymbolKind, SymbolRef};
use crate::typecheck::error::{DuplicateDeclaration, TypeCheckError};
use crate::typecheck::ty::Type;
use crate::lexer::Span;

/// One lexical frame. `arena_modifier` records which of `default`,
/// `shared`, `private` introduced this frame, consumed by escape
/// analysis (section 4.H) to find the nearest enclosing `private`
/// boundary without re-walking the AST.
struct Frame {
    symbols: HashMap<String, SymbolRef>,
    arena_modifier: Option<BlockModifier>,
}

/// Scope stack (inner to outer lookup) plus a flat namespace table
/// (section 4.F): namespaces never nest and are looked up only via
/// `namespace.member` syntax, so they live outside the ordinary stack.
pub struct Scope {
    frames: Vec<Frame>,
    namespaces: HashMap<String, HashMap<String, SymbolRef>>,
}

impl Scope {
    pub fn new() -> Self {
        Scope {
            frames: vec![Frame {
                symbols: HashMap::new(),
                arena_modifier: None,
            }],
            namespaces: HashMap::new(),
        }
    }

    pub fn push(&mut self, arena_modifier: Option<BlockModifier>) {
        self.frames.push(Frame {
            symbols: HashMap::new(),
            arena_modifier,
        });
    }

    pub fn pop(&mut self) {
        assert!(self.frames.len() > 1, "cannot pop the root scope");
        self.frames.pop();
    }

    /// Is the innermost enclosing arena boundary `private` (section
    /// 4.H)? Walks outward from the current frame, stopping at the
    /// first frame that declares an arena modifier at all.
    pub fn innermost_arena_is_private(&self) -> bool {
        self.frames
            .iter()
            .rev()
            .find_map(|f| f.arena_modifier)
            .map(|m| m == BlockModifier::Private)
            .unwrap_or(false)
    }

    fn current(&mut self) -> &mut Frame {
        self.frames.last_mut().unwrap()
    }

    /// Declare a name in the current frame, rejecting redeclaration
    /// within the SAME frame (shadowing an outer frame is allowed).
    fn declare(&mut self, name: &str, span: &Span, symbol: SymbolRef) -> Result<SymbolRef, TypeCheckError> {
        let frame = self.current();
        if frame.symbols.contains_key(name) {
            return Err(TypeCheckError::DuplicateDeclaration(
                DuplicateDeclaration {
                    name: name.to_string(),
                },
                span.clone(),
            ));
        }
        frame.symbols.insert(name.to_string(), symbol.clone());
        Ok(symbol)
    }

    pub fn declare_variable(
        &mut self,
        name: &str,
        ty: Type,
        mem_qual: MemQual,
        span: &Span,
    ) -> Result<SymbolRef, TypeCheckError> {
        let symbol = new_symbol(name, SymbolKind::Variable, ty, mem_qual, None);
        self.declare(name, span, symbol)
    }

    pub fn declare_parameter(
        &mut self,
        name: &str,
        ty: Type,
        mem_qual: MemQual,
        span: &Span,
    ) -> Result<SymbolRef, TypeCheckError> {
        let symbol = new_symbol(name, SymbolKind::Parameter, ty, mem_qual, None);
        self.declare(name, span, symbol)
    }

    pub fn declare_function(
        &mut self,
        name: &str,
        ty: Type,
        modifier: FnModifier,
        span: &Span,
    ) -> Result<SymbolRef, TypeCheckError> {
        let symbol = new_symbol(name, SymbolKind::Function, ty, MemQual::Default, Some(modifier));
        self.declare(name, span, symbol)
    }

    pub fn lookup(&self, name: &str) -> Option<SymbolRef> {
        self.frames
            .iter()
            .rev()
            .find_map(|f| f.symbols.get(name).cloned())
    }

    pub fn declare_namespace(&mut self, namespace: &str) {
        self.namespaces.entry(namespace.to_string()).or_default();
    }

    pub fn add_to_namespace(&mut self, namespace: &str, name: &str, ty: Type, modifier: FnModifier) {
        let table = self.namespaces.entry(namespace.to_string()).or_default();
        table.insert(
            name.to_string(),
            new_symbol(name, SymbolKind::Function, ty, MemQual::Default, Some(modifier)),
        );
    }

    pub fn lookup_in_namespace(&self, namespace: &str, name: &str) -> Option<SymbolRef> {
        self.namespaces.get(namespace)?.get(name).cloned()
    }

    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.namespaces.contains_key(namespace)
    }

    pub fn mark_pending(symbol: &SymbolRef, pending: bool) {
        symbol.borrow_mut().pending = pending;
    }

    pub fn set_effective_modifier(symbol: &SymbolRef, modifier: FnModifier) {
        symbol.borrow_mut().effective_modifier = Some(modifier);
    }

    pub fn freeze(symbol: &SymbolRef) {
        symbol.borrow_mut().frozen_args = true;
    }

    pub fn unfreeze(symbol: &SymbolRef) {
        symbol.borrow_mut().frozen_args = false;
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        Span::default()
    }

    #[test]
    fn inner_scope_shadows_outer() {
        let mut scope = Scope::new();
        scope
            .declare_variable("x", Type::Int, MemQual::Default, &span())
            .unwrap();
        scope.push(None);
        scope
            .declare_variable("x", Type::Str, MemQual::Default, &span())
            .unwrap();
        assert_eq!(scope.lookup("x").unwrap().borrow().ty, Type::Str);
        scope.pop();
        assert_eq!(scope.lookup("x").unwrap().borrow().ty, Type::Int);
    }

    #[test]
    fn redeclaration_in_same_frame_errors() {
        let mut scope = Scope::new();
        scope
            .declare_variable("x", Type::Int, MemQual::Default, &span())
            .unwrap();
        assert!(scope
            .declare_variable("x", Type::Str, MemQual::Default, &span())
            .is_err());
    }

    #[test]
    fn namespace_lookup_is_isolated_from_scope_stack() {
        let mut scope = Scope::new();
        scope.declare_namespace("math");
        scope.add_to_namespace("math", "sqrt", Type::Int, FnModifier::Default);
        assert!(scope.lookup("sqrt").is_none());
        assert!(scope.lookup_in_namespace("math", "sqrt").is_some());
    }

    #[test]
    fn innermost_private_arena_is_detected_through_nested_shared_block() {
        let mut scope = Scope::new();
        scope.push(Some(BlockModifier::Private));
        scope.push(Some(BlockModifier::Shared));
        assert!(!scope.innermost_arena_is_private());
        scope.pop();
        assert!(scope.innermost_arena_is_private());
    }
}
