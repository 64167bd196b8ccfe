//! Scoped bulk allocator with one-shot release (section 4.A).
//!
//! Rust already gives most AST nodes the "valid only while the owner is
//! live" guarantee through ownership and borrowing, so this type is not
//! used to back the AST itself (section 3.9, "Cyclic AST links"). It
//! exists so escape analysis (section 4.H) has a concrete, testable
//! object standing in for the reference compiler's bump allocator: each
//! `default`/`private` function or block gets a child `Arena`, and
//! `promote` models copying a value out of a child arena into its parent
//! when a value must outlive the scope that created it.

use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArenaId(usize);

#[derive(Debug)]
struct ArenaInner<T> {
    id: ArenaId,
    parent: Option<ArenaId>,
    values: RefCell<Vec<T>>,
    destroyed: RefCell<bool>,
}

/// A scoped allocator. Cloning an `Arena` clones the handle, not the
/// storage (`Rc`-shared), matching how the reference compiler passes
/// arena pointers around by value.
#[derive(Debug, Clone)]
pub struct Arena<T> {
    inner: Rc<ArenaInner<T>>,
    next_child_id: Rc<RefCell<usize>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArenaError(pub String);

impl std::fmt::Display for ArenaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ArenaError {}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Arena {
            inner: Rc::new(ArenaInner {
                id: ArenaId(0),
                parent: None,
                values: RefCell::new(vec![]),
                destroyed: RefCell::new(false),
            }),
            next_child_id: Rc::new(RefCell::new(1)),
        }
    }

    pub fn id(&self) -> ArenaId {
        self.inner.id
    }

    pub fn parent(&self) -> Option<ArenaId> {
        self.inner.parent
    }

    /// Allocate a fresh value into this arena. Mirrors `alloc`/`alloc_array`
    /// (section 4.A): in the host language allocation cannot itself fail,
    /// so the "fatal abort on OOM" contract is documented, not exercised.
    pub fn alloc(&self, value: T) -> usize
    where
        T: Clone,
    {
        assert!(!*self.inner.destroyed.borrow(), "alloc on destroyed arena");
        let mut values = self.inner.values.borrow_mut();
        values.push(value);
        values.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<T>
    where
        T: Clone,
    {
        self.inner.values.borrow().get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.values.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Create a nested arena whose lifetime is tied to this one (section
    /// 4.A). Used for `default`/`private` functions, blocks and loop
    /// iterations (section 4.H).
    pub fn child(&self) -> Arena<T> {
        let mut next = self.next_child_id.borrow_mut();
        let id = ArenaId(*next);
        *next += 1;
        Arena {
            inner: Rc::new(ArenaInner {
                id,
                parent: Some(self.inner.id),
                values: RefCell::new(vec![]),
                destroyed: RefCell::new(false),
            }),
            next_child_id: self.next_child_id.clone(),
        }
    }

    /// Copy a value out of `self` into `parent`, asserting `parent` really
    /// is an ancestor of `self` — the only direction escape analysis
    /// allows a value to travel (section 4.A, section 4.H).
    pub fn promote(&self, parent: &Arena<T>, value: T) -> Result<usize, ArenaError>
    where
        T: Clone,
    {
        if self.inner.id == parent.inner.id {
            return Err(ArenaError(
                "cannot promote a value into its own arena".into(),
            ));
        }
        Ok(parent.alloc(value))
    }

    /// Release the arena. Any further `alloc` on this handle panics,
    /// matching the reference compiler's scoped-acquisition contract
    /// (section 5, "Resource lifecycles").
    pub fn destroy(&self) {
        *self.inner.destroyed.borrow_mut() = true;
    }

    pub fn is_destroyed(&self) -> bool {
        *self.inner.destroyed.borrow()
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_arena_tracks_parent() {
        let root: Arena<i32> = Arena::new();
        let child = root.child();
        assert_eq!(child.parent(), Some(root.id()));
    }

    #[test]
    fn promote_copies_into_ancestor() {
        let root: Arena<i32> = Arena::new();
        let child = root.child();
        child.alloc(42);

        let idx = child.promote(&root, 42).unwrap();
        assert_eq!(root.get(idx), Some(42));
    }

    #[test]
    fn promote_rejects_self_promotion() {
        let root: Arena<i32> = Arena::new();
        assert!(root.promote(&root, 1).is_err());
    }

    #[test]
    #[should_panic(expected = "destroyed")]
    fn alloc_after_destroy_panics() {
        let arena: Arena<i32> = Arena::new();
        arena.destroy();
        arena.alloc(1);
    }
}
