//! Type environments
//!
//! A module under check owns its environment mutably; once checking
//! finishes the environment is frozen and shared read-only with dependent
//! modules through an `Arc` parent chain. Lookup walks from the innermost
//! environment outward.

use crate::ast::Span;
use rustc_hash::FxHashMap;
use sett_types::TypeId;
use std::sync::Arc;

/// A single binding: its type and where it was declared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    /// The binding's type
    pub ty: TypeId,
    /// Declaration site
    pub span: Span,
}

/// Environment mapping names to typed bindings
#[derive(Debug, Clone, Default)]
pub struct TypeEnvironment {
    bindings: FxHashMap<String, Binding>,
    parent: Option<Arc<TypeEnvironment>>,
    frozen: bool,
}

impl TypeEnvironment {
    /// Create an empty root environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an environment layered over a finalized dependency
    pub fn with_parent(parent: Arc<TypeEnvironment>) -> Self {
        TypeEnvironment {
            bindings: FxHashMap::default(),
            parent: Some(parent),
            frozen: false,
        }
    }

    /// Bind a name in this environment
    ///
    /// Rebinding an existing name shadows the old binding. Panics in
    /// debug builds if the environment is frozen; frozen environments
    /// are dependency environments and must not change.
    pub fn bind(&mut self, name: impl Into<String>, ty: TypeId, span: Span) {
        debug_assert!(!self.frozen, "bind on a frozen environment");
        self.bindings.insert(name.into(), Binding { ty, span });
    }

    /// Look up a name, walking the parent chain
    pub fn lookup(&self, name: &str) -> Option<Binding> {
        if let Some(binding) = self.bindings.get(name) {
            return Some(*binding);
        }
        self.parent.as_ref()?.lookup(name)
    }

    /// Whether this environment (not a parent) binds the name
    pub fn binds_locally(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Freeze and wrap for read-only sharing
    pub fn freeze(mut self) -> Arc<TypeEnvironment> {
        self.frozen = true;
        Arc::new(self)
    }

    /// Whether the environment has been finalized
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Number of local bindings
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether there are no local bindings
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sett_types::TypeContext;

    #[test]
    fn test_bind_and_lookup() {
        let mut ctx = TypeContext::new();
        let int = ctx.int_type();

        let mut env = TypeEnvironment::new();
        env.bind("x", int, Span::default());
        assert_eq!(env.lookup("x").map(|b| b.ty), Some(int));
        assert!(env.lookup("y").is_none());
    }

    #[test]
    fn test_parent_chain_lookup() {
        let mut ctx = TypeContext::new();
        let int = ctx.int_type();
        let str_ = ctx.str_type();

        let mut dep = TypeEnvironment::new();
        dep.bind("shared", int, Span::default());
        let dep = dep.freeze();

        let mut env = TypeEnvironment::with_parent(dep);
        env.bind("local", str_, Span::default());

        assert_eq!(env.lookup("shared").map(|b| b.ty), Some(int));
        assert_eq!(env.lookup("local").map(|b| b.ty), Some(str_));
        assert!(!env.binds_locally("shared"));
    }

    #[test]
    fn test_shadowing() {
        let mut ctx = TypeContext::new();
        let int = ctx.int_type();
        let str_ = ctx.str_type();

        let mut dep = TypeEnvironment::new();
        dep.bind("x", int, Span::default());
        let dep = dep.freeze();

        let mut env = TypeEnvironment::with_parent(dep);
        env.bind("x", str_, Span::default());
        assert_eq!(env.lookup("x").map(|b| b.ty), Some(str_));
    }
}
