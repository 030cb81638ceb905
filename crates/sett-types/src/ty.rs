//! Core type definitions for the Sett type system
//!
//! Types denote sets of values. The algebra composes them with sum (union
//! of member sets), product (ordered tuples), intersection, and negation,
//! plus opaque (nominal) wrapping, trait references, and meta-types.

use std::fmt;

/// Unique identifier for a type in the type context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) u32);

impl TypeId {
    /// Create a TypeId from a raw value
    ///
    /// Prefer using `TypeContext` methods; this is for interop only.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw value of this TypeId
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({})", self.0)
    }
}

/// Declaration-site identity for an opaque type
///
/// Fresh per declaration, never derived from the wrapped type: two opaque
/// wrappers over structurally identical types are distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OpaqueId(pub(crate) u32);

impl OpaqueId {
    /// Get the raw value of this identity
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

/// Built-in atomic types (primitive value sets)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomicType {
    /// The `int` type (arbitrary machine integers)
    Int,
    /// The `float` type
    Float,
    /// The `str` type
    Str,
    /// The `bool` type
    Bool,
    /// The `none` type (single unit-like value)
    None,
}

impl AtomicType {
    /// Surface name of this atomic type
    pub fn name(&self) -> &'static str {
        match self {
            AtomicType::Int => "int",
            AtomicType::Float => "float",
            AtomicType::Str => "str",
            AtomicType::Bool => "bool",
            AtomicType::None => "none",
        }
    }

    /// All atomic types, in declaration order
    pub const ALL: [AtomicType; 5] = [
        AtomicType::Int,
        AtomicType::Float,
        AtomicType::Str,
        AtomicType::Bool,
        AtomicType::None,
    ];
}

impl fmt::Display for AtomicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sum type: T1 | T2 | ... | Tn
///
/// Members are flattened, deduplicated and sorted by TypeId at
/// construction, so sums are commutative and associative by representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SumType {
    /// Members of the sum, sorted and deduplicated
    pub members: Vec<TypeId>,
}

/// Product type: (T1, T2, ..., Tn)
///
/// Ordered and non-commutative; nested products are flattened
/// (associativity).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProductType {
    /// Components in order
    pub components: Vec<TypeId>,
}

/// Intersection type: T1 & T2 & ... & Tn
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IntersectionType {
    /// Members of the intersection, sorted and deduplicated
    pub members: Vec<TypeId>,
}

/// Negation type: !T (complement relative to the ambient universe)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NegationType {
    /// Negated type
    pub inner: TypeId,
}

/// Opaque type: a nominally distinct wrapper around an inner type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OpaqueType {
    /// Declaration-site identity
    pub identity: OpaqueId,
    /// Declared name, for display
    pub name: String,
    /// Wrapped type (not a supertype or subtype of the wrapper)
    pub inner: TypeId,
}

/// Meta-lift type: { P }, the set of first-order types satisfying P
///
/// The predicate is a trait reference or a composition of trait
/// references under intersection/negation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetaLiftType {
    /// Lifted predicate
    pub predicate: TypeId,
}

/// The core type representation in Sett
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// Built-in atomic type
    Atomic(AtomicType),

    /// Sum type: T1 | T2 | ... | Tn
    Sum(SumType),

    /// Product type: (T1, T2, ..., Tn)
    Product(ProductType),

    /// Intersection type: T1 & T2 & ... & Tn
    Intersection(IntersectionType),

    /// Negation type: !T
    Negation(NegationType),

    /// Opaque (nominal) wrapper
    Opaque(OpaqueType),

    /// Reference to a named trait, usable as a capability constraint
    TraitRef(String),

    /// Meta-type of first-order types satisfying a predicate
    MetaLift(MetaLiftType),

    /// Placeholder receiver type inside trait requirement signatures
    SelfParam,

    /// Bottom type (empty set)
    Never,

    /// Top type (ambient universe of first-order values)
    Any,

    /// The meta-type of all types, member of itself by axiom
    TypeUniverse,

    /// Placeholder substituted for declarations that failed to check
    Error,
}

impl Type {
    /// Check if this type is an atomic type
    pub fn is_atomic(&self) -> bool {
        matches!(self, Type::Atomic(_))
    }

    /// Check if this type is a sum type
    pub fn is_sum(&self) -> bool {
        matches!(self, Type::Sum(_))
    }

    /// Check if this type is a product type
    pub fn is_product(&self) -> bool {
        matches!(self, Type::Product(_))
    }

    /// Check if this type is the never type
    pub fn is_never(&self) -> bool {
        matches!(self, Type::Never)
    }

    /// Check if this type is the any type
    pub fn is_any(&self) -> bool {
        matches!(self, Type::Any)
    }

    /// Check if this type is the error placeholder
    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error)
    }

    /// Check if this type is a trait reference or composition root
    pub fn is_trait_ref(&self) -> bool {
        matches!(self, Type::TraitRef(_))
    }

    /// Get the atomic type if this is atomic
    pub fn as_atomic(&self) -> Option<AtomicType> {
        match self {
            Type::Atomic(a) => Some(*a),
            _ => None,
        }
    }

    /// Get the sum type if this is a sum
    pub fn as_sum(&self) -> Option<&SumType> {
        match self {
            Type::Sum(s) => Some(s),
            _ => None,
        }
    }

    /// Get the product type if this is a product
    pub fn as_product(&self) -> Option<&ProductType> {
        match self {
            Type::Product(p) => Some(p),
            _ => None,
        }
    }

    /// Get the opaque type if this is opaque
    pub fn as_opaque(&self) -> Option<&OpaqueType> {
        match self {
            Type::Opaque(o) => Some(o),
            _ => None,
        }
    }

    /// Get the meta-lift payload if this is a lifted predicate
    pub fn as_meta_lift(&self) -> Option<&MetaLiftType> {
        match self {
            Type::MetaLift(m) => Some(m),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_names() {
        assert_eq!(AtomicType::Int.name(), "int");
        assert_eq!(AtomicType::Float.name(), "float");
        assert_eq!(AtomicType::Str.name(), "str");
        assert_eq!(AtomicType::Bool.name(), "bool");
        assert_eq!(AtomicType::None.name(), "none");
    }

    #[test]
    fn test_type_is_methods() {
        let int_ty = Type::Atomic(AtomicType::Int);
        assert!(int_ty.is_atomic());
        assert!(!int_ty.is_sum());

        assert!(Type::Never.is_never());
        assert!(!Type::Never.is_any());
        assert!(Type::Any.is_any());
        assert!(Type::Error.is_error());
    }

    #[test]
    fn test_type_as_methods() {
        let int_ty = Type::Atomic(AtomicType::Int);
        assert_eq!(int_ty.as_atomic(), Some(AtomicType::Int));
        assert!(int_ty.as_sum().is_none());
        assert!(int_ty.as_product().is_none());
    }

    #[test]
    fn test_opaque_identity_distinguishes() {
        let a = Type::Opaque(OpaqueType {
            identity: OpaqueId(0),
            name: "Meters".into(),
            inner: TypeId(0),
        });
        let b = Type::Opaque(OpaqueType {
            identity: OpaqueId(1),
            name: "Meters".into(),
            inner: TypeId(0),
        });
        assert_ne!(a, b);
    }
}
