//! Normalization of type expressions to canonical form
//!
//! Rewrites an expression toward a fixed point: flattening and
//! deduplication (done by the constructors), distribution of products
//! over sums, double-negation elimination, De Morgan pushing of negation
//! through sums and intersections, and absorption against `any`, `never`
//! and complement pairs.
//!
//! Every rewrite and every composite node visit charges a step budget.
//! Exceeding the budget yields `TypeError::BudgetExceeded` instead of
//! looping, which bounds the exponential blow-up of repeated
//! distribution over deeply nested sums.

use crate::context::TypeContext;
use crate::error::TypeError;
use crate::ty::{MetaLiftType, NegationType, OpaqueType, Type, TypeId};
use rustc_hash::FxHashMap;

/// Default rewrite step limit per normalization run
pub const DEFAULT_STEP_LIMIT: u32 = 10_000;

/// Bounded step budget shared by normalization and type-level evaluation
#[derive(Debug, Clone)]
pub struct StepBudget {
    limit: u32,
    used: u32,
}

impl StepBudget {
    /// Create a budget with the given step limit
    pub fn new(limit: u32) -> Self {
        StepBudget { limit, used: 0 }
    }

    /// Charge one step, failing once the limit is exceeded
    pub fn charge(&mut self) -> Result<(), TypeError> {
        if self.used >= self.limit {
            return Err(TypeError::BudgetExceeded { limit: self.limit });
        }
        self.used += 1;
        Ok(())
    }

    /// Steps consumed so far
    pub fn used(&self) -> u32 {
        self.used
    }

    /// Configured limit
    pub fn limit(&self) -> u32 {
        self.limit
    }
}

impl Default for StepBudget {
    fn default() -> Self {
        Self::new(DEFAULT_STEP_LIMIT)
    }
}

/// Rewrites type expressions into canonical form
///
/// Canonical forms are unique per denotation up to the implemented rules,
/// so interned canonical trees compare by `TypeId`. Successful
/// normalization is idempotent.
pub struct Normalizer<'a> {
    ctx: &'a mut TypeContext,
    budget: StepBudget,
    memo: FxHashMap<TypeId, TypeId>,
}

impl<'a> Normalizer<'a> {
    /// Create a normalizer with the default step budget
    pub fn new(ctx: &'a mut TypeContext) -> Self {
        Self::with_budget(ctx, StepBudget::default())
    }

    /// Create a normalizer with an explicit step budget
    pub fn with_budget(ctx: &'a mut TypeContext, budget: StepBudget) -> Self {
        Normalizer {
            ctx,
            budget,
            memo: FxHashMap::default(),
        }
    }

    /// Steps consumed so far
    pub fn steps_used(&self) -> u32 {
        self.budget.used()
    }

    /// Normalize a type to canonical form
    pub fn normalize(&mut self, id: TypeId) -> Result<TypeId, TypeError> {
        if let Some(&normal) = self.memo.get(&id) {
            return Ok(normal);
        }

        let normal = self.rewrite(id)?;
        self.memo.insert(id, normal);
        self.memo.insert(normal, normal);
        Ok(normal)
    }

    fn rewrite(&mut self, id: TypeId) -> Result<TypeId, TypeError> {
        let ty = match self.ctx.get(id) {
            Some(ty) => ty.clone(),
            None => return Ok(id),
        };

        match ty {
            Type::Atomic(_)
            | Type::TraitRef(_)
            | Type::SelfParam
            | Type::Never
            | Type::Any
            | Type::TypeUniverse
            | Type::Error => Ok(id),

            Type::Opaque(o) => {
                self.budget.charge()?;
                let inner = self.normalize(o.inner)?;
                if inner == o.inner {
                    Ok(id)
                } else {
                    Ok(self.ctx.intern(Type::Opaque(OpaqueType {
                        identity: o.identity,
                        name: o.name,
                        inner,
                    })))
                }
            }

            Type::MetaLift(m) => {
                self.budget.charge()?;
                let predicate = self.normalize(m.predicate)?;
                if predicate == m.predicate {
                    Ok(id)
                } else {
                    Ok(self.ctx.intern(Type::MetaLift(MetaLiftType { predicate })))
                }
            }

            Type::Sum(s) => {
                self.budget.charge()?;
                let mut members = Vec::with_capacity(s.members.len());
                for member in s.members {
                    members.push(self.normalize(member)?);
                }
                self.rebuild_sum(members)
            }

            Type::Intersection(x) => {
                self.budget.charge()?;
                let mut members = Vec::with_capacity(x.members.len());
                for member in x.members {
                    members.push(self.normalize(member)?);
                }
                self.rebuild_intersection(members)
            }

            Type::Negation(n) => {
                self.budget.charge()?;
                let inner = self.normalize(n.inner)?;
                self.rebuild_negation(inner)
            }

            Type::Product(p) => {
                self.budget.charge()?;
                let mut components = Vec::with_capacity(p.components.len());
                for component in p.components {
                    components.push(self.normalize(component)?);
                }
                self.rebuild_product(components)
            }
        }
    }

    /// Rebuild a sum from normalized members, applying absorption
    fn rebuild_sum(&mut self, members: Vec<TypeId>) -> Result<TypeId, TypeError> {
        let flat = self.ctx.sum_type(members);
        let mut members = match self.ctx.get(flat) {
            Some(Type::Sum(s)) => s.members.clone(),
            _ => return Ok(flat),
        };

        let never = self.ctx.never_type();
        let any = self.ctx.any_type();

        // A | any → any
        if members.contains(&any) {
            self.budget.charge()?;
            return Ok(any);
        }

        // A | never → A
        let before = members.len();
        members.retain(|&m| m != never);
        if members.len() != before {
            self.budget.charge()?;
        }

        // A | !A → any (relative to the ambient universe)
        for &m in &members {
            let complement = self.ctx.lookup(&Type::Negation(NegationType { inner: m }));
            if let Some(neg) = complement {
                if members.contains(&neg) {
                    self.budget.charge()?;
                    return Ok(any);
                }
            }
        }

        Ok(self.ctx.sum_type(members))
    }

    /// Rebuild an intersection from normalized members, applying absorption
    fn rebuild_intersection(&mut self, members: Vec<TypeId>) -> Result<TypeId, TypeError> {
        let flat = self.ctx.intersection_type(members);
        let mut members = match self.ctx.get(flat) {
            Some(Type::Intersection(x)) => x.members.clone(),
            _ => return Ok(flat),
        };

        let never = self.ctx.never_type();
        let any = self.ctx.any_type();

        // A & never → never
        if members.contains(&never) {
            self.budget.charge()?;
            return Ok(never);
        }

        // A & any → A
        let before = members.len();
        members.retain(|&m| m != any);
        if members.len() != before {
            self.budget.charge()?;
        }

        // A & !A → never
        for &m in &members {
            let complement = self.ctx.lookup(&Type::Negation(NegationType { inner: m }));
            if let Some(neg) = complement {
                if members.contains(&neg) {
                    self.budget.charge()?;
                    return Ok(never);
                }
            }
        }

        Ok(self.ctx.intersection_type(members))
    }

    /// Rebuild a negation over a normalized inner type
    fn rebuild_negation(&mut self, inner: TypeId) -> Result<TypeId, TypeError> {
        let inner_ty = match self.ctx.get(inner) {
            Some(ty) => ty.clone(),
            None => return Ok(self.ctx.negation_type(inner)),
        };

        match inner_ty {
            // !!A → A
            Type::Negation(n) => {
                self.budget.charge()?;
                self.normalize(n.inner)
            }

            // !(A | B) → !A & !B
            Type::Sum(s) => {
                self.budget.charge()?;
                let mut negated = Vec::with_capacity(s.members.len());
                for member in s.members {
                    negated.push(self.ctx.negation_type(member));
                }
                let intersection = self.ctx.intersection_type(negated);
                self.normalize(intersection)
            }

            // !(A & B) → !A | !B
            Type::Intersection(x) => {
                self.budget.charge()?;
                let mut negated = Vec::with_capacity(x.members.len());
                for member in x.members {
                    negated.push(self.ctx.negation_type(member));
                }
                let sum = self.ctx.sum_type(negated);
                self.normalize(sum)
            }

            // !never → any, !any → never
            Type::Never => {
                self.budget.charge()?;
                Ok(self.ctx.any_type())
            }
            Type::Any => {
                self.budget.charge()?;
                Ok(self.ctx.never_type())
            }

            _ => Ok(self.ctx.negation_type(inner)),
        }
    }

    /// Rebuild a product from normalized components, distributing over sums
    fn rebuild_product(&mut self, components: Vec<TypeId>) -> Result<TypeId, TypeError> {
        let never = self.ctx.never_type();

        // A product with an empty component denotes the empty set.
        if components.contains(&never) {
            self.budget.charge()?;
            return Ok(never);
        }

        let has_sum = components
            .iter()
            .any(|&c| matches!(self.ctx.get(c), Some(Type::Sum(_))));
        if !has_sum {
            return Ok(self.ctx.product_type(components));
        }

        // (A, (B | C)) → (A, B) | (A, C); one step per emitted variant.
        let mut variants: Vec<Vec<TypeId>> = vec![Vec::new()];
        for &component in &components {
            let sum_members = match self.ctx.get(component) {
                Some(Type::Sum(s)) => Some(s.members.clone()),
                _ => None,
            };
            match sum_members {
                Some(members) => {
                    let mut expanded = Vec::with_capacity(variants.len() * members.len());
                    for variant in &variants {
                        for &member in &members {
                            self.budget.charge()?;
                            let mut next = variant.clone();
                            next.push(member);
                            expanded.push(next);
                        }
                    }
                    variants = expanded;
                }
                None => {
                    for variant in &mut variants {
                        variant.push(component);
                    }
                }
            }
        }

        let mut products = Vec::with_capacity(variants.len());
        for variant in variants {
            products.push(self.ctx.product_type(variant));
        }
        let sum = self.rebuild_sum(products)?;
        self.normalize(sum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(ctx: &mut TypeContext, id: TypeId) -> TypeId {
        Normalizer::new(ctx).normalize(id).expect("within budget")
    }

    #[test]
    fn test_leaves_are_normal() {
        let mut ctx = TypeContext::new();
        let int = ctx.int_type();
        assert_eq!(normalize(&mut ctx, int), int);

        let universe = ctx.universe_type();
        assert_eq!(normalize(&mut ctx, universe), universe);
    }

    #[test]
    fn test_double_negation() {
        let mut ctx = TypeContext::new();
        let int = ctx.int_type();
        let neg = ctx.negation_type(int);
        let double = ctx.negation_type(neg);

        assert_eq!(normalize(&mut ctx, double), int);
    }

    #[test]
    fn test_de_morgan_over_sum() {
        let mut ctx = TypeContext::new();
        let int = ctx.int_type();
        let str_ = ctx.str_type();
        let sum = ctx.sum_type(vec![int, str_]);
        let neg = ctx.negation_type(sum);

        let normal = normalize(&mut ctx, neg);

        let neg_int = ctx.negation_type(int);
        let neg_str = ctx.negation_type(str_);
        let expected = ctx.intersection_type(vec![neg_int, neg_str]);
        assert_eq!(normal, expected);
    }

    #[test]
    fn test_absorption_any_never() {
        let mut ctx = TypeContext::new();
        let int = ctx.int_type();
        let never = ctx.never_type();
        let any = ctx.any_type();

        let with_never = ctx.sum_type(vec![int, never]);
        assert_eq!(normalize(&mut ctx, with_never), int);

        let with_any = ctx.intersection_type(vec![int, any]);
        assert_eq!(normalize(&mut ctx, with_any), int);
    }

    #[test]
    fn test_complement_absorption() {
        let mut ctx = TypeContext::new();
        let int = ctx.int_type();
        let neg_int = ctx.negation_type(int);

        let sum = ctx.sum_type(vec![int, neg_int]);
        let any = ctx.any_type();
        assert_eq!(normalize(&mut ctx, sum), any);

        let inter = ctx.intersection_type(vec![int, neg_int]);
        let never = ctx.never_type();
        assert_eq!(normalize(&mut ctx, inter), never);
    }

    #[test]
    fn test_product_distributes_over_sum() {
        let mut ctx = TypeContext::new();
        let int = ctx.int_type();
        let str_ = ctx.str_type();
        let bool_ = ctx.bool_type();

        let sum = ctx.sum_type(vec![str_, bool_]);
        let prod = ctx.product_type(vec![int, sum]);

        let normal = normalize(&mut ctx, prod);

        let prod_is = ctx.product_type(vec![int, str_]);
        let prod_ib = ctx.product_type(vec![int, bool_]);
        let expected = ctx.sum_type(vec![prod_is, prod_ib]);
        assert_eq!(normal, expected);
    }

    #[test]
    fn test_product_with_never_is_never() {
        let mut ctx = TypeContext::new();
        let int = ctx.int_type();
        let never = ctx.never_type();
        let prod = ctx.product_type(vec![int, never]);

        assert_eq!(normalize(&mut ctx, prod), never);
    }

    #[test]
    fn test_idempotent() {
        let mut ctx = TypeContext::new();
        let int = ctx.int_type();
        let str_ = ctx.str_type();
        let sum = ctx.sum_type(vec![int, str_]);
        let neg = ctx.negation_type(sum);
        let prod = ctx.product_type(vec![neg, sum]);

        let once = normalize(&mut ctx, prod);
        let twice = normalize(&mut ctx, once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_budget_exceeded_on_deep_nest() {
        let mut ctx = TypeContext::new();
        let int = ctx.int_type();
        let str_ = ctx.str_type();

        // Alternating sums-in-products blow up under distribution.
        let mut ty = ctx.sum_type(vec![int, str_]);
        for _ in 0..32 {
            let paired = ctx.product_type(vec![ty, ty]);
            ty = ctx.sum_type(vec![paired, int]);
        }

        let mut normalizer = Normalizer::with_budget(&mut ctx, StepBudget::new(64));
        let result = normalizer.normalize(ty);
        assert_eq!(result, Err(TypeError::BudgetExceeded { limit: 64 }));
    }

    #[test]
    fn test_opaque_identity_survives_normalization() {
        let mut ctx = TypeContext::new();
        let int = ctx.int_type();
        let never = ctx.never_type();
        let messy = ctx.sum_type(vec![int, never]);
        let opaque = ctx.opaque_type("Meters", messy);

        let normal = normalize(&mut ctx, opaque);
        let normal_ty = ctx.get(normal).unwrap().as_opaque().unwrap().clone();
        let original = ctx.get(opaque).unwrap().as_opaque().unwrap().clone();
        assert_eq!(normal_ty.identity, original.identity);
        assert_eq!(normal_ty.inner, int);
    }
}
