//! Trait definitions and capability resolution
//!
//! A trait is a named capability set: required associated-function
//! signatures (parameterized over the `SelfParam` placeholder receiver)
//! and required associated constants. Traits compose only through
//! intersection and negation over trait references.
//!
//! Negated constraints are decided under a closed-world assumption
//! scoped to the current compilation graph: the registry is assumed to
//! list every implementer visible to this run.

use crate::context::TypeContext;
use crate::error::TypeError;
use crate::subtype::SubtypeContext;
use crate::ty::{
    IntersectionType, MetaLiftType, NegationType, OpaqueType, ProductType, SumType, Type, TypeId,
};
use rustc_hash::FxHashMap;

/// A required associated-function signature inside a trait definition
///
/// Parameter and return positions may use `SelfParam` for the receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraitMethodSig {
    /// Function name
    pub name: String,
    /// Parameter types (placeholder allowed)
    pub params: Vec<TypeId>,
    /// Return type (placeholder allowed)
    pub ret: TypeId,
}

/// A required associated constant inside a trait definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraitConstSig {
    /// Constant name
    pub name: String,
    /// Required type (placeholder allowed)
    pub ty: TypeId,
}

/// A named trait: required functions and constants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraitDef {
    /// Trait name
    pub name: String,
    /// Required associated functions
    pub methods: Vec<TraitMethodSig>,
    /// Required associated constants
    pub consts: Vec<TraitConstSig>,
}

/// A concrete associated function provided by a type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssocFn {
    /// Function name
    pub name: String,
    /// Parameter types
    pub params: Vec<TypeId>,
    /// Return type
    pub ret: TypeId,
}

/// A concrete associated constant provided by a type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssocConst {
    /// Constant name
    pub name: String,
    /// Constant type
    pub ty: TypeId,
}

/// Closed-world registry of traits and per-type associated namespaces
#[derive(Debug, Clone, Default)]
pub struct TraitRegistry {
    traits: FxHashMap<String, TraitDef>,
    fns: FxHashMap<TypeId, Vec<AssocFn>>,
    consts: FxHashMap<TypeId, Vec<AssocConst>>,
}

impl TraitRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a trait definition
    pub fn register_trait(&mut self, def: TraitDef) {
        self.traits.insert(def.name.clone(), def);
    }

    /// Look up a trait by name
    pub fn get_trait(&self, name: &str) -> Option<&TraitDef> {
        self.traits.get(name)
    }

    /// Add an associated function to a type's namespace
    pub fn register_assoc_fn(&mut self, ty: TypeId, f: AssocFn) {
        self.fns.entry(ty).or_default().push(f);
    }

    /// Add an associated constant to a type's namespace
    pub fn register_assoc_const(&mut self, ty: TypeId, c: AssocConst) {
        self.consts.entry(ty).or_default().push(c);
    }

    /// Associated functions of a type
    pub fn assoc_fns(&self, ty: TypeId) -> &[AssocFn] {
        self.fns.get(&ty).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Associated constants of a type
    pub fn assoc_consts(&self, ty: TypeId) -> &[AssocConst] {
        self.consts.get(&ty).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Decides capability-set satisfaction against a registry
pub struct TraitResolver<'a> {
    ctx: &'a mut TypeContext,
    registry: &'a TraitRegistry,
}

impl<'a> TraitResolver<'a> {
    /// Create a resolver over a context and registry
    pub fn new(ctx: &'a mut TypeContext, registry: &'a TraitRegistry) -> Self {
        TraitResolver { ctx, registry }
    }

    /// Check whether `t` satisfies a trait constraint
    ///
    /// The constraint is a trait reference or a composition of trait
    /// references under intersection/negation; anything else is an
    /// invalid predicate.
    pub fn implements(&mut self, t: TypeId, constraint: TypeId) -> Result<bool, TypeError> {
        let constraint_ty = match self.ctx.get(constraint) {
            Some(ty) => ty.clone(),
            None => {
                return Err(TypeError::InvalidPredicate {
                    reason: "unknown constraint type".into(),
                })
            }
        };

        match constraint_ty {
            Type::TraitRef(name) => self.implements_direct(t, &name),

            Type::Intersection(x) => {
                for member in x.members {
                    if !self.implements(t, member)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }

            // Closed world: "does not implement" is decidable against the
            // registry of this compilation graph.
            Type::Negation(n) => Ok(!self.implements(t, n.inner)?),

            other => Err(TypeError::InvalidPredicate {
                reason: format!("expected a trait composition, got {:?}", other),
            }),
        }
    }

    fn implements_direct(&mut self, t: TypeId, trait_name: &str) -> Result<bool, TypeError> {
        let def = self
            .registry
            .get_trait(trait_name)
            .cloned()
            .ok_or_else(|| TypeError::UndefinedTrait {
                name: trait_name.to_string(),
            })?;

        for req in &def.methods {
            let params: Vec<TypeId> = req
                .params
                .iter()
                .map(|&p| self.substitute_self(p, t))
                .collect();
            let ret = self.substitute_self(req.ret, t);
            if !self.has_compatible_fn(t, &req.name, &params, ret) {
                return Ok(false);
            }
        }

        for req in &def.consts {
            let required = self.substitute_self(req.ty, t);
            if !self.has_compatible_const(t, &req.name, required) {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Search `t`'s associated-function namespace for a compatible match:
    /// same name, same arity, parameters contravariant-or-equal, return
    /// covariant. There are no references in this value-oriented model, so
    /// these are the only variance directions.
    fn has_compatible_fn(
        &mut self,
        t: TypeId,
        name: &str,
        required_params: &[TypeId],
        required_ret: TypeId,
    ) -> bool {
        let candidates: Vec<AssocFn> = self
            .registry
            .assoc_fns(t)
            .iter()
            .filter(|f| f.name == name && f.params.len() == required_params.len())
            .cloned()
            .collect();

        let mut sub = SubtypeContext::new(self.ctx);
        candidates.iter().any(|candidate| {
            let params_ok = required_params
                .iter()
                .zip(&candidate.params)
                .all(|(&req, &given)| sub.is_subtype(req, given));
            params_ok && sub.is_subtype(candidate.ret, required_ret)
        })
    }

    fn has_compatible_const(&mut self, t: TypeId, name: &str, required: TypeId) -> bool {
        let candidates: Vec<AssocConst> = self
            .registry
            .assoc_consts(t)
            .iter()
            .filter(|c| c.name == name)
            .cloned()
            .collect();

        let mut sub = SubtypeContext::new(self.ctx);
        candidates
            .iter()
            .any(|candidate| sub.is_subtype(candidate.ty, required))
    }

    /// Substitute the receiver placeholder with a concrete type
    pub fn substitute_self(&mut self, ty: TypeId, target: TypeId) -> TypeId {
        let current = match self.ctx.get(ty) {
            Some(t) => t.clone(),
            None => return ty,
        };

        match current {
            Type::SelfParam => target,

            Type::Atomic(_)
            | Type::TraitRef(_)
            | Type::Never
            | Type::Any
            | Type::TypeUniverse
            | Type::Error => ty,

            Type::Sum(SumType { members }) => {
                let members = members
                    .into_iter()
                    .map(|m| self.substitute_self(m, target))
                    .collect();
                self.ctx.sum_type(members)
            }
            Type::Product(ProductType { components }) => {
                let components = components
                    .into_iter()
                    .map(|c| self.substitute_self(c, target))
                    .collect();
                self.ctx.product_type(components)
            }
            Type::Intersection(IntersectionType { members }) => {
                let members = members
                    .into_iter()
                    .map(|m| self.substitute_self(m, target))
                    .collect();
                self.ctx.intersection_type(members)
            }
            Type::Negation(NegationType { inner }) => {
                let inner = self.substitute_self(inner, target);
                self.ctx.negation_type(inner)
            }
            // The wrapper keeps its declaration identity across substitution.
            Type::Opaque(OpaqueType {
                identity,
                name,
                inner,
            }) => {
                let inner = self.substitute_self(inner, target);
                self.ctx.intern(Type::Opaque(OpaqueType {
                    identity,
                    name,
                    inner,
                }))
            }
            Type::MetaLift(MetaLiftType { predicate }) => {
                let predicate = self.substitute_self(predicate, target);
                self.ctx.meta_lift(predicate)
            }
        }
    }
}
