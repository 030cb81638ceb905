//! Type context for interning and constructing types
//!
//! All types live in a `TypeContext`. Interning guarantees that two
//! structurally equal trees share one `TypeId`, so equality of
//! canonicalized types is id equality. The sum/product/intersection
//! constructors canonicalize at construction time: same-kind children are
//! absorbed and duplicates removed.

use crate::error::TypeError;
use crate::ty::{
    AtomicType, IntersectionType, MetaLiftType, NegationType, OpaqueId, OpaqueType, ProductType,
    SumType, Type, TypeId,
};
use rustc_hash::FxHashMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Opaque identities are unique across the whole compilation run, not one
/// context, so canonical cache payloads can cross module boundaries.
static NEXT_OPAQUE: AtomicU32 = AtomicU32::new(0);

/// Type context that manages all types in a compilation unit
///
/// Uses type interning so identical types share a `TypeId`, enabling
/// cheap equality and memoization.
#[derive(Debug, Clone)]
pub struct TypeContext {
    /// Storage for all types, indexed by TypeId
    types: Vec<Arc<Type>>,

    /// Reverse mapping from Type to TypeId for interning
    type_to_id: FxHashMap<Type, TypeId>,

    /// Named type definitions (aliases, opaque declarations)
    named_types: FxHashMap<String, TypeId>,
}

impl Default for TypeContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeContext {
    /// Create a new type context with the built-in types pre-interned
    pub fn new() -> Self {
        let mut ctx = TypeContext {
            types: Vec::new(),
            type_to_id: FxHashMap::default(),
            named_types: FxHashMap::default(),
        };

        for atom in AtomicType::ALL {
            ctx.intern(Type::Atomic(atom));
        }
        ctx.intern(Type::Never);
        ctx.intern(Type::Any);
        ctx.intern(Type::TypeUniverse);
        ctx.intern(Type::Error);
        ctx.intern(Type::SelfParam);

        ctx
    }

    /// Intern a type, returning its TypeId
    ///
    /// If the type already exists, returns the existing TypeId.
    pub fn intern(&mut self, ty: Type) -> TypeId {
        if let Some(&id) = self.type_to_id.get(&ty) {
            return id;
        }

        let id = TypeId(self.types.len() as u32);
        self.types.push(Arc::new(ty.clone()));
        self.type_to_id.insert(ty, id);
        id
    }

    /// Get a type by its TypeId
    pub fn get(&self, id: TypeId) -> Option<&Type> {
        self.types.get(id.0 as usize).map(|arc| arc.as_ref())
    }

    /// Look up a type's id without interning
    pub fn lookup(&self, ty: &Type) -> Option<TypeId> {
        self.type_to_id.get(ty).copied()
    }

    /// Number of interned types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if the context is empty (never true after `new`)
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    // Built-in types

    /// Get the `int` type
    pub fn int_type(&mut self) -> TypeId {
        self.intern(Type::Atomic(AtomicType::Int))
    }

    /// Get the `float` type
    pub fn float_type(&mut self) -> TypeId {
        self.intern(Type::Atomic(AtomicType::Float))
    }

    /// Get the `str` type
    pub fn str_type(&mut self) -> TypeId {
        self.intern(Type::Atomic(AtomicType::Str))
    }

    /// Get the `bool` type
    pub fn bool_type(&mut self) -> TypeId {
        self.intern(Type::Atomic(AtomicType::Bool))
    }

    /// Get the `none` type
    pub fn none_type(&mut self) -> TypeId {
        self.intern(Type::Atomic(AtomicType::None))
    }

    /// Get the never (bottom) type
    pub fn never_type(&mut self) -> TypeId {
        self.intern(Type::Never)
    }

    /// Get the any (top) type
    pub fn any_type(&mut self) -> TypeId {
        self.intern(Type::Any)
    }

    /// Get the `type` universe
    pub fn universe_type(&mut self) -> TypeId {
        self.intern(Type::TypeUniverse)
    }

    /// Get the error placeholder type
    pub fn error_type(&mut self) -> TypeId {
        self.intern(Type::Error)
    }

    /// Get the trait receiver placeholder
    pub fn self_param(&mut self) -> TypeId {
        self.intern(Type::SelfParam)
    }

    // Composite constructors

    /// Create a sum type from members
    ///
    /// Flattens nested sums, deduplicates, and sorts members by TypeId so
    /// the sum is commutative and associative by representation. An empty
    /// sum is `Never`; a single-member sum is the member itself.
    pub fn sum_type(&mut self, members: Vec<TypeId>) -> TypeId {
        let mut flat = Vec::with_capacity(members.len());
        for member in members {
            if let Some(Type::Sum(s)) = self.get(member) {
                flat.extend_from_slice(&s.members);
            } else {
                flat.push(member);
            }
        }
        flat.sort_unstable();
        flat.dedup();

        match flat.len() {
            0 => self.never_type(),
            1 => flat[0],
            _ => self.intern(Type::Sum(SumType { members: flat })),
        }
    }

    /// Create a product type from components
    ///
    /// Flattens nested products (associativity) but preserves order.
    /// A single-component product is the component itself.
    pub fn product_type(&mut self, components: Vec<TypeId>) -> TypeId {
        let mut flat = Vec::with_capacity(components.len());
        for component in components {
            if let Some(Type::Product(p)) = self.get(component) {
                flat.extend_from_slice(&p.components);
            } else {
                flat.push(component);
            }
        }

        if flat.len() == 1 {
            return flat[0];
        }
        self.intern(Type::Product(ProductType { components: flat }))
    }

    /// Create an intersection type from members
    ///
    /// Flattens nested intersections, deduplicates and sorts. An empty
    /// intersection is `Any`; a single member collapses to itself.
    pub fn intersection_type(&mut self, members: Vec<TypeId>) -> TypeId {
        let mut flat = Vec::with_capacity(members.len());
        for member in members {
            if let Some(Type::Intersection(i)) = self.get(member) {
                flat.extend_from_slice(&i.members);
            } else {
                flat.push(member);
            }
        }
        flat.sort_unstable();
        flat.dedup();

        match flat.len() {
            0 => self.any_type(),
            1 => flat[0],
            _ => self.intern(Type::Intersection(IntersectionType { members: flat })),
        }
    }

    /// Create a negation type
    pub fn negation_type(&mut self, inner: TypeId) -> TypeId {
        self.intern(Type::Negation(NegationType { inner }))
    }

    /// Create an opaque type with a fresh declaration-site identity
    ///
    /// The identity is drawn from a counter, never from the inner type, so
    /// two declarations over identical inner types stay distinct.
    pub fn opaque_type(&mut self, name: impl Into<String>, inner: TypeId) -> TypeId {
        let identity = OpaqueId(NEXT_OPAQUE.fetch_add(1, Ordering::Relaxed));
        self.intern(Type::Opaque(OpaqueType {
            identity,
            name: name.into(),
            inner,
        }))
    }

    /// Create a reference to a named trait
    pub fn trait_ref(&mut self, name: impl Into<String>) -> TypeId {
        self.intern(Type::TraitRef(name.into()))
    }

    /// Create a meta-lift type { P } over a predicate
    pub fn meta_lift(&mut self, predicate: TypeId) -> TypeId {
        self.intern(Type::MetaLift(MetaLiftType { predicate }))
    }

    // Named types

    /// Register a named type (alias or opaque declaration)
    pub fn register_named_type(&mut self, name: impl Into<String>, ty: TypeId) {
        self.named_types.insert(name.into(), ty);
    }

    /// Look up a named type
    pub fn lookup_named_type(&self, name: &str) -> Option<TypeId> {
        self.named_types.get(name).copied()
    }

    /// Resolve a named type, erroring if not found
    pub fn resolve_named_type(&self, name: &str) -> Result<TypeId, TypeError> {
        self.lookup_named_type(name)
            .ok_or_else(|| TypeError::UndefinedType {
                name: name.to_string(),
            })
    }

    /// Render a type in surface syntax, recursively
    pub fn display(&self, id: TypeId) -> String {
        let mut out = String::new();
        self.fmt_type(id, &mut out, false);
        out
    }

    fn fmt_type(&self, id: TypeId, out: &mut String, nested: bool) {
        let Some(ty) = self.get(id) else {
            let _ = write!(out, "<invalid {}>", id.as_u32());
            return;
        };

        match ty {
            Type::Atomic(a) => out.push_str(a.name()),
            Type::Sum(s) => {
                if nested {
                    out.push('(');
                }
                for (i, &member) in s.members.iter().enumerate() {
                    if i > 0 {
                        out.push_str(" | ");
                    }
                    self.fmt_type(member, out, true);
                }
                if nested {
                    out.push(')');
                }
            }
            Type::Product(p) => {
                out.push('(');
                for (i, &component) in p.components.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.fmt_type(component, out, true);
                }
                out.push(')');
            }
            Type::Intersection(x) => {
                if nested {
                    out.push('(');
                }
                for (i, &member) in x.members.iter().enumerate() {
                    if i > 0 {
                        out.push_str(" & ");
                    }
                    self.fmt_type(member, out, true);
                }
                if nested {
                    out.push(')');
                }
            }
            Type::Negation(n) => {
                out.push('!');
                self.fmt_type(n.inner, out, true);
            }
            Type::Opaque(o) => out.push_str(&o.name),
            Type::TraitRef(name) => out.push_str(name),
            Type::MetaLift(m) => {
                out.push('{');
                self.fmt_type(m.predicate, out, false);
                out.push('}');
            }
            Type::SelfParam => out.push_str("Self"),
            Type::Never => out.push_str("never"),
            Type::Any => out.push_str("any"),
            Type::TypeUniverse => out.push_str("type"),
            Type::Error => out.push_str("<error>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_interning() {
        let mut ctx = TypeContext::new();
        let a = ctx.int_type();
        let b = ctx.int_type();
        assert_eq!(a, b);
    }

    #[test]
    fn test_sum_flattening() {
        let mut ctx = TypeContext::new();
        let int = ctx.int_type();
        let str_ = ctx.str_type();
        let bool_ = ctx.bool_type();

        let inner = ctx.sum_type(vec![int, str_]);
        let outer = ctx.sum_type(vec![inner, bool_]);

        match ctx.get(outer) {
            Some(Type::Sum(s)) => {
                assert_eq!(s.members.len(), 3);
                assert!(s.members.contains(&int));
                assert!(s.members.contains(&str_));
                assert!(s.members.contains(&bool_));
            }
            other => panic!("expected sum, got {:?}", other),
        }
    }

    #[test]
    fn test_sum_commutative_by_construction() {
        let mut ctx = TypeContext::new();
        let int = ctx.int_type();
        let str_ = ctx.str_type();

        let ab = ctx.sum_type(vec![int, str_]);
        let ba = ctx.sum_type(vec![str_, int]);
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_sum_dedup_and_collapse() {
        let mut ctx = TypeContext::new();
        let int = ctx.int_type();
        let str_ = ctx.str_type();

        let dup = ctx.sum_type(vec![int, str_, int]);
        match ctx.get(dup) {
            Some(Type::Sum(s)) => assert_eq!(s.members.len(), 2),
            other => panic!("expected sum, got {:?}", other),
        }

        let single = ctx.sum_type(vec![int]);
        assert_eq!(single, int);

        let empty = ctx.sum_type(vec![]);
        assert_eq!(empty, ctx.never_type());
    }

    #[test]
    fn test_product_order_preserved() {
        let mut ctx = TypeContext::new();
        let int = ctx.int_type();
        let str_ = ctx.str_type();

        let ab = ctx.product_type(vec![int, str_]);
        let ba = ctx.product_type(vec![str_, int]);
        assert_ne!(ab, ba);
    }

    #[test]
    fn test_product_flattening() {
        let mut ctx = TypeContext::new();
        let int = ctx.int_type();
        let str_ = ctx.str_type();
        let bool_ = ctx.bool_type();

        let inner = ctx.product_type(vec![int, str_]);
        let outer = ctx.product_type(vec![inner, bool_]);

        match ctx.get(outer) {
            Some(Type::Product(p)) => assert_eq!(p.components.len(), 3),
            other => panic!("expected product, got {:?}", other),
        }
    }

    #[test]
    fn test_intersection_collapse() {
        let mut ctx = TypeContext::new();
        let int = ctx.int_type();

        let single = ctx.intersection_type(vec![int, int]);
        assert_eq!(single, int);

        let empty = ctx.intersection_type(vec![]);
        assert_eq!(empty, ctx.any_type());
    }

    #[test]
    fn test_opaque_identities_fresh() {
        let mut ctx = TypeContext::new();
        let int = ctx.int_type();

        let meters = ctx.opaque_type("Meters", int);
        let feet = ctx.opaque_type("Feet", int);
        assert_ne!(meters, feet);

        // Same name, new declaration site: still distinct.
        let meters2 = ctx.opaque_type("Meters", int);
        assert_ne!(meters, meters2);
    }

    #[test]
    fn test_named_types() {
        let mut ctx = TypeContext::new();
        let int = ctx.int_type();
        ctx.register_named_type("Count", int);

        assert_eq!(ctx.lookup_named_type("Count"), Some(int));
        assert_eq!(ctx.resolve_named_type("Count"), Ok(int));
        assert!(ctx.resolve_named_type("Missing").is_err());
    }

    #[test]
    fn test_display() {
        let mut ctx = TypeContext::new();
        let int = ctx.int_type();
        let none = ctx.none_type();
        let sum = ctx.sum_type(vec![int, none]);
        assert_eq!(ctx.display(sum), "int | none");

        let str_ = ctx.str_type();
        let prod = ctx.product_type(vec![int, str_]);
        assert_eq!(ctx.display(prod), "(int, str)");

        let neg = ctx.negation_type(int);
        assert_eq!(ctx.display(neg), "!int");

        let opaque = ctx.opaque_type("Meters", int);
        assert_eq!(ctx.display(opaque), "Meters");
    }
}
