//! Subtyping and membership for the Sett type algebra
//!
//! Implements the containment relation T <: U over canonical forms.
//! Membership of a value is containment of the narrowest type describing
//! the value's construction site, so `member` delegates to `is_subtype`.
//!
//! `type` (the universe) is a member of itself by axiom. The axiom is an
//! id-equality short circuit ahead of all structural recursion; any other
//! structural self-membership cycle trips the paradox guard, which is an
//! internal engine defect rather than a user-facing condition.

use crate::context::TypeContext;
use crate::error::TypeError;
use crate::ty::{Type, TypeId};
use rustc_hash::FxHashSet;

/// Context for checking subtyping and membership
///
/// Inputs are expected in canonical form (see `Normalizer`); on
/// non-canonical inputs the relation is sound but incomplete.
#[derive(Debug)]
pub struct SubtypeContext<'a> {
    type_ctx: &'a TypeContext,

    /// Pairs on the current recursion path, for the paradox guard
    in_progress: FxHashSet<(TypeId, TypeId)>,

    /// Deepest recursion reached by the last query
    max_depth: u32,
}

impl<'a> SubtypeContext<'a> {
    /// Create a new subtype context
    pub fn new(type_ctx: &'a TypeContext) -> Self {
        SubtypeContext {
            type_ctx,
            in_progress: FxHashSet::default(),
            max_depth: 0,
        }
    }

    /// Check if `sub` is a subtype of `sup`
    ///
    /// Convenience wrapper over [`try_subtype`](Self::try_subtype); a
    /// paradox-guard trip answers `false`.
    pub fn is_subtype(&mut self, sub: TypeId, sup: TypeId) -> bool {
        self.try_subtype(sub, sup).unwrap_or(false)
    }

    /// Check if a value whose construction-site type is `value_ty` is a
    /// member of `target`
    pub fn is_member(&mut self, value_ty: TypeId, target: TypeId) -> bool {
        self.is_subtype(value_ty, target)
    }

    /// Fallible subtype check surfacing the paradox guard
    pub fn try_subtype(&mut self, sub: TypeId, sup: TypeId) -> Result<bool, TypeError> {
        self.in_progress.clear();
        self.max_depth = 0;
        self.check(sub, sup, 1)
    }

    /// Fallible membership check surfacing the paradox guard
    pub fn try_member(&mut self, value_ty: TypeId, target: TypeId) -> Result<bool, TypeError> {
        self.try_subtype(value_ty, target)
    }

    /// Deepest structural recursion reached by the last query
    pub fn last_recursion_depth(&self) -> u32 {
        self.max_depth
    }

    fn check(&mut self, sub: TypeId, sup: TypeId, depth: u32) -> Result<bool, TypeError> {
        self.max_depth = self.max_depth.max(depth);

        // Reflexivity, and the `type : type` axiom: interning makes both
        // an id comparison, short-circuiting before structural recursion.
        if sub == sup {
            return Ok(true);
        }

        if !self.in_progress.insert((sub, sup)) {
            return Err(TypeError::ParadoxGuard {
                ty: self.type_ctx.display(sub),
            });
        }
        let result = self.check_structural(sub, sup, depth);
        self.in_progress.remove(&(sub, sup));
        result
    }

    fn check_structural(&mut self, sub: TypeId, sup: TypeId, depth: u32) -> Result<bool, TypeError> {
        let sub_ty = match self.type_ctx.get(sub) {
            Some(ty) => ty,
            None => return Ok(false),
        };
        let sup_ty = match self.type_ctx.get(sup) {
            Some(ty) => ty,
            None => return Ok(false),
        };

        match (sub_ty, sup_ty) {
            // The error placeholder silences cascading mismatches.
            (Type::Error, _) | (_, Type::Error) => Ok(true),

            // never is the bottom, any the top.
            (Type::Never, _) => Ok(true),
            (_, Type::Any) => Ok(true),

            // Every sum disjunct on the left must be contained.
            (Type::Sum(s), _) => {
                for &member in &s.members.clone() {
                    if !self.check(member, sup, depth + 1)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }

            // Containment in a sum holds through some disjunct.
            (_, Type::Sum(s)) => {
                for &member in &s.members.clone() {
                    if self.check(sub, member, depth + 1)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }

            // Containment in an intersection requires every member.
            (_, Type::Intersection(x)) => {
                for &member in &x.members.clone() {
                    if !self.check(sub, member, depth + 1)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }

            // An intersection is below anything one of its members is below.
            (Type::Intersection(x), _) => {
                for &member in &x.members.clone() {
                    if self.check(member, sup, depth + 1)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }

            // Every first-order type is a member of the universe; the
            // universe's own membership is the id fast path above.
            (_, Type::TypeUniverse) => Ok(true),

            // !A <: !B iff B <: A.
            (Type::Negation(a), Type::Negation(b)) => {
                let (a, b) = (a.inner, b.inner);
                self.check(b, a, depth + 1)
            }

            // A <: !B iff A and B have no overlap in the ambient universe.
            (_, Type::Negation(n)) => {
                let negated = n.inner;
                self.disjoint(sub, negated, depth + 1)
            }

            // A bare negation is only below any, negations and sums of them.
            (Type::Negation(_), _) => Ok(false),

            // Products: equal arity, component-wise containment.
            (Type::Product(p1), Type::Product(p2)) => {
                if p1.components.len() != p2.components.len() {
                    return Ok(false);
                }
                let pairs: Vec<_> = p1
                    .components
                    .iter()
                    .copied()
                    .zip(p2.components.iter().copied())
                    .collect();
                for (c1, c2) in pairs {
                    if !self.check(c1, c2, depth + 1)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }

            // Opaque identity: a wrapper is a subtype only of itself (the
            // id fast path), any, or negations of disjoint types. Never of
            // its inner type, never of a same-shaped other identity.
            (Type::Opaque(_), _) | (_, Type::Opaque(_)) => Ok(false),

            // Remaining kind pairs are unrelated: distinct atomics,
            // distinct trait refs, universe vs first-order types.
            _ => Ok(false),
        }
    }

    /// Provable disjointness of two canonical types
    ///
    /// Sound but conservative: `false` means "not provably disjoint".
    fn disjoint(&mut self, a: TypeId, b: TypeId, depth: u32) -> Result<bool, TypeError> {
        self.max_depth = self.max_depth.max(depth);

        if a == b {
            return Ok(matches!(self.type_ctx.get(a), Some(Type::Never)));
        }

        let a_ty = match self.type_ctx.get(a) {
            Some(ty) => ty,
            None => return Ok(false),
        };
        let b_ty = match self.type_ctx.get(b) {
            Some(ty) => ty,
            None => return Ok(false),
        };

        match (a_ty, b_ty) {
            (Type::Never, _) | (_, Type::Never) => Ok(true),
            (Type::Any, _) | (_, Type::Any) => Ok(false),
            (Type::Error, _) | (_, Type::Error) => Ok(false),

            // A sum is disjoint from B iff every disjunct is.
            (Type::Sum(s), _) => {
                for &member in &s.members.clone() {
                    if !self.disjoint(member, b, depth + 1)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (_, Type::Sum(s)) => {
                for &member in &s.members.clone() {
                    if !self.disjoint(a, member, depth + 1)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }

            // An intersection is disjoint from B if any member is.
            (Type::Intersection(x), _) => {
                for &member in &x.members.clone() {
                    if self.disjoint(member, b, depth + 1)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            (_, Type::Intersection(x)) => {
                for &member in &x.members.clone() {
                    if self.disjoint(a, member, depth + 1)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }

            // x and !B are disjoint iff x is contained in B.
            (Type::Negation(n), _) => {
                let negated = n.inner;
                self.check(b, negated, depth + 1)
            }
            (_, Type::Negation(n)) => {
                let negated = n.inner;
                self.check(a, negated, depth + 1)
            }

            (Type::Atomic(x), Type::Atomic(y)) => Ok(x != y),

            // Opaque values carry their declaration tag: they overlap
            // nothing but the same identity (handled by the id fast path).
            (Type::Opaque(_), _) | (_, Type::Opaque(_)) => Ok(true),

            (Type::Product(p1), Type::Product(p2)) => {
                if p1.components.len() != p2.components.len() {
                    return Ok(true);
                }
                let pairs: Vec<_> = p1
                    .components
                    .iter()
                    .copied()
                    .zip(p2.components.iter().copied())
                    .collect();
                for (c1, c2) in pairs {
                    if self.disjoint(c1, c2, depth + 1)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }

            // Tuples never overlap scalar kinds.
            (Type::Product(_), Type::Atomic(_)) | (Type::Atomic(_), Type::Product(_)) => Ok(true),

            // The universe of types shares no values with first-order sets.
            (Type::TypeUniverse, Type::Atomic(_) | Type::Product(_))
            | (Type::Atomic(_) | Type::Product(_), Type::TypeUniverse) => Ok(true),
            (Type::MetaLift(_), Type::Atomic(_) | Type::Product(_))
            | (Type::Atomic(_) | Type::Product(_), Type::MetaLift(_)) => Ok(true),

            // Trait bounds and lifted predicates may overlap anything else.
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::Normalizer;

    #[test]
    fn test_reflexivity() {
        let mut ctx = TypeContext::new();
        let int = ctx.int_type();
        let mut sub = SubtypeContext::new(&ctx);
        assert!(sub.is_subtype(int, int));
    }

    #[test]
    fn test_never_bottom_any_top() {
        let mut ctx = TypeContext::new();
        let never = ctx.never_type();
        let any = ctx.any_type();
        let int = ctx.int_type();

        let mut sub = SubtypeContext::new(&ctx);
        assert!(sub.is_subtype(never, int));
        assert!(sub.is_subtype(int, any));
        assert!(!sub.is_subtype(any, int));
        assert!(!sub.is_subtype(int, never));
    }

    #[test]
    fn test_sum_containment() {
        let mut ctx = TypeContext::new();
        let int = ctx.int_type();
        let none = ctx.none_type();
        let str_ = ctx.str_type();
        let sum = ctx.sum_type(vec![int, none]);

        let mut sub = SubtypeContext::new(&ctx);
        assert!(sub.is_member(int, sum));
        assert!(sub.is_member(none, sum));
        assert!(!sub.is_member(str_, sum));
        assert!(sub.is_subtype(sum, sum));
        assert!(!sub.is_subtype(sum, int));
    }

    #[test]
    fn test_product_componentwise() {
        let mut ctx = TypeContext::new();
        let int = ctx.int_type();
        let str_ = ctx.str_type();
        let any = ctx.any_type();

        let narrow = ctx.product_type(vec![int, str_]);
        let wide = ctx.product_type(vec![any, str_]);
        let swapped = ctx.product_type(vec![str_, int]);
        let longer = ctx.product_type(vec![int, str_, int]);

        let mut sub = SubtypeContext::new(&ctx);
        assert!(sub.is_subtype(narrow, wide));
        assert!(!sub.is_subtype(wide, narrow));
        assert!(!sub.is_subtype(narrow, swapped));
        assert!(!sub.is_subtype(narrow, longer));
    }

    #[test]
    fn test_intersection_containment() {
        let mut ctx = TypeContext::new();
        let int = ctx.int_type();
        let ord = ctx.trait_ref("Ord");
        let eq = ctx.trait_ref("Eq");
        let both = ctx.intersection_type(vec![ord, eq]);

        let mut sub = SubtypeContext::new(&ctx);
        // Containment in an intersection needs every member.
        assert!(!sub.is_subtype(int, both));
        assert!(sub.is_subtype(both, ord));
        assert!(sub.is_subtype(both, eq));
    }

    #[test]
    fn test_negation_disjointness() {
        let mut ctx = TypeContext::new();
        let int = ctx.int_type();
        let str_ = ctx.str_type();
        let not_str = ctx.negation_type(str_);

        let mut sub = SubtypeContext::new(&ctx);
        // int and str are disjoint, so int <: !str.
        assert!(sub.is_subtype(int, not_str));
        assert!(!sub.is_subtype(str_, not_str));
    }

    #[test]
    fn test_negation_contravariance() {
        let mut ctx = TypeContext::new();
        let int = ctx.int_type();
        let none = ctx.none_type();
        let sum = ctx.sum_type(vec![int, none]);
        let not_sum = ctx.negation_type(sum);
        let not_int = ctx.negation_type(int);

        let mut sub = SubtypeContext::new(&ctx);
        // !(int | none) <: !int because int <: int | none.
        assert!(sub.is_subtype(not_sum, not_int));
        assert!(!sub.is_subtype(not_int, not_sum));
    }

    #[test]
    fn test_opaque_nominal_distinctness() {
        let mut ctx = TypeContext::new();
        let int = ctx.int_type();
        let foo = ctx.opaque_type("Foo", int);
        let bar = ctx.opaque_type("Bar", int);

        let mut sub = SubtypeContext::new(&ctx);
        assert!(sub.is_subtype(foo, foo));
        assert!(!sub.is_subtype(foo, bar));
        assert!(!sub.is_subtype(foo, int));
        assert!(!sub.is_subtype(int, foo));

        // An opaque type is below the negation of an unrelated identity.
        let not_bar = ctx.negation_type(bar);
        let mut sub = SubtypeContext::new(&ctx);
        assert!(sub.is_subtype(foo, not_bar));
    }

    #[test]
    fn test_universe_self_membership_bounded() {
        let mut ctx = TypeContext::new();
        let universe = ctx.universe_type();

        let mut sub = SubtypeContext::new(&ctx);
        assert_eq!(sub.try_member(universe, universe), Ok(true));
        // Axiom lookup, not structural descent.
        assert_eq!(sub.last_recursion_depth(), 1);
    }

    #[test]
    fn test_member_of_universe() {
        let mut ctx = TypeContext::new();
        let universe = ctx.universe_type();
        let int = ctx.int_type();
        let str_ = ctx.str_type();
        let pair = ctx.product_type(vec![int, str_]);
        let ord = ctx.trait_ref("Ord");
        let lifted = ctx.meta_lift(ord);

        let mut sub = SubtypeContext::new(&ctx);
        assert!(sub.is_member(int, universe));
        assert!(sub.is_member(pair, universe));
        assert!(sub.is_subtype(lifted, universe));
        assert!(!sub.is_subtype(universe, int));
    }

    #[test]
    fn test_membership_after_normalization() {
        let mut ctx = TypeContext::new();
        let int = ctx.int_type();
        let none = ctx.none_type();
        let str_ = ctx.str_type();
        let messy = ctx.sum_type(vec![none, int]);
        let target = Normalizer::new(&mut ctx).normalize(messy).unwrap();

        let mut sub = SubtypeContext::new(&ctx);
        assert!(sub.is_member(int, target));
        assert!(sub.is_member(none, target));
        assert!(!sub.is_member(str_, target));
    }
}
