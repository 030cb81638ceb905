//! Meta-types and type-level evaluation
//!
//! The lifting syntax `{P}` produces a meta-type whose members are the
//! first-order types satisfying the predicate `P`. Type-level functions
//! are pure: they take and return types, and are evaluated by a
//! restricted constant-folding interpreter over the algebra. Evaluation
//! runs under the same step-budget discipline as normalization and fails
//! with `BudgetExceeded` on non-termination.
//!
//! `TyExpr` is also the syntactic type-expression surface consumed from
//! the external parser; the checker elaborates every annotation through
//! [`Evaluator::eval`].

use crate::context::TypeContext;
use crate::error::TypeError;
use crate::normalize::StepBudget;
use crate::traits::TraitRegistry;
use crate::ty::{Type, TypeId};
use rustc_hash::FxHashMap;

/// Syntactic type expression, as delivered by the external parser
#[derive(Debug, Clone, PartialEq)]
pub enum TyExpr {
    /// A name: built-in atomic, named type, trait, or type-function
    /// parameter, resolved in that order
    Name(String),
    /// Sum: `A | B`
    Sum(Vec<TyExpr>),
    /// Product: `A, B`
    Product(Vec<TyExpr>),
    /// Intersection: `A & B`
    Intersection(Vec<TyExpr>),
    /// Negation: `!A`
    Negation(Box<TyExpr>),
    /// Opaque introduction: `type Name(A)`; a fresh identity per
    /// elaboration site
    Opaque {
        /// Declared name
        name: String,
        /// Wrapped expression
        inner: Box<TyExpr>,
    },
    /// Meta-lift: `{P}` where `P` is a trait composition
    Lift(Box<TyExpr>),
    /// Type-level function application: `F(A, B)`
    Apply {
        /// Function name
        func: String,
        /// Argument expressions
        args: Vec<TyExpr>,
    },
    /// The universe `type`
    Universe,
    /// The bottom type `never`
    Never,
    /// The top type `any`
    Any,
}

/// A pure type-level function: parameters and a body expression
#[derive(Debug, Clone, PartialEq)]
pub struct TypeFnDef {
    /// Function name
    pub name: String,
    /// Parameter names
    pub params: Vec<String>,
    /// Body expression
    pub body: TyExpr,
}

/// Restricted constant-folding interpreter for type expressions
///
/// Purely maps `TyExpr` trees to interned types; no side effects are
/// expressible. Each node and each application charges the budget.
pub struct Evaluator<'a> {
    ctx: &'a mut TypeContext,
    registry: &'a TraitRegistry,
    fns: &'a FxHashMap<String, TypeFnDef>,
    budget: StepBudget,
}

impl<'a> Evaluator<'a> {
    /// Create an evaluator with the default budget
    pub fn new(
        ctx: &'a mut TypeContext,
        registry: &'a TraitRegistry,
        fns: &'a FxHashMap<String, TypeFnDef>,
    ) -> Self {
        Self::with_budget(ctx, registry, fns, StepBudget::default())
    }

    /// Create an evaluator with an explicit budget
    pub fn with_budget(
        ctx: &'a mut TypeContext,
        registry: &'a TraitRegistry,
        fns: &'a FxHashMap<String, TypeFnDef>,
        budget: StepBudget,
    ) -> Self {
        Evaluator {
            ctx,
            registry,
            fns,
            budget,
        }
    }

    /// Evaluate a type expression to an interned type
    pub fn eval(&mut self, expr: &TyExpr) -> Result<TypeId, TypeError> {
        let empty = FxHashMap::default();
        self.eval_in(expr, &empty)
    }

    fn eval_in(
        &mut self,
        expr: &TyExpr,
        env: &FxHashMap<String, TypeId>,
    ) -> Result<TypeId, TypeError> {
        self.budget.charge()?;

        match expr {
            TyExpr::Name(name) => self.resolve_name(name, env),

            TyExpr::Sum(exprs) => {
                let mut members = Vec::with_capacity(exprs.len());
                for e in exprs {
                    members.push(self.eval_in(e, env)?);
                }
                Ok(self.ctx.sum_type(members))
            }

            TyExpr::Product(exprs) => {
                let mut components = Vec::with_capacity(exprs.len());
                for e in exprs {
                    components.push(self.eval_in(e, env)?);
                }
                Ok(self.ctx.product_type(components))
            }

            TyExpr::Intersection(exprs) => {
                let mut members = Vec::with_capacity(exprs.len());
                for e in exprs {
                    members.push(self.eval_in(e, env)?);
                }
                Ok(self.ctx.intersection_type(members))
            }

            TyExpr::Negation(inner) => {
                let inner = self.eval_in(inner, env)?;
                Ok(self.ctx.negation_type(inner))
            }

            TyExpr::Opaque { name, inner } => {
                let inner = self.eval_in(inner, env)?;
                Ok(self.ctx.opaque_type(name.clone(), inner))
            }

            TyExpr::Lift(predicate) => {
                let predicate = self.eval_in(predicate, env)?;
                self.validate_predicate(predicate)?;
                Ok(self.ctx.meta_lift(predicate))
            }

            TyExpr::Apply { func, args } => {
                let def = self
                    .fns
                    .get(func)
                    .cloned()
                    .ok_or_else(|| TypeError::UndefinedTypeFn { name: func.clone() })?;
                if def.params.len() != args.len() {
                    return Err(TypeError::TypeFnArity {
                        name: func.clone(),
                        expected: def.params.len(),
                        actual: args.len(),
                    });
                }

                // Call-by-value: arguments fold in the caller's scope.
                let mut call_env = FxHashMap::default();
                for (param, arg) in def.params.iter().zip(args) {
                    let value = self.eval_in(arg, env)?;
                    call_env.insert(param.clone(), value);
                }
                self.eval_in(&def.body, &call_env)
            }

            TyExpr::Universe => Ok(self.ctx.universe_type()),
            TyExpr::Never => Ok(self.ctx.never_type()),
            TyExpr::Any => Ok(self.ctx.any_type()),
        }
    }

    fn resolve_name(
        &mut self,
        name: &str,
        env: &FxHashMap<String, TypeId>,
    ) -> Result<TypeId, TypeError> {
        if let Some(&bound) = env.get(name) {
            return Ok(bound);
        }

        match name {
            "int" => return Ok(self.ctx.int_type()),
            "float" => return Ok(self.ctx.float_type()),
            "str" => return Ok(self.ctx.str_type()),
            "bool" => return Ok(self.ctx.bool_type()),
            "none" => return Ok(self.ctx.none_type()),
            _ => {}
        }

        if let Some(id) = self.ctx.lookup_named_type(name) {
            return Ok(id);
        }

        if self.registry.get_trait(name).is_some() {
            return Ok(self.ctx.trait_ref(name));
        }

        Err(TypeError::UndefinedType {
            name: name.to_string(),
        })
    }

    /// A lifted predicate must be a trait composition
    fn validate_predicate(&self, predicate: TypeId) -> Result<(), TypeError> {
        match self.ctx.get(predicate) {
            Some(Type::TraitRef(_)) => Ok(()),
            Some(Type::Intersection(x)) => {
                for &member in &x.members {
                    self.validate_predicate(member)?;
                }
                Ok(())
            }
            Some(Type::Negation(n)) => self.validate_predicate(n.inner),
            Some(other) => Err(TypeError::InvalidPredicate {
                reason: format!("expected a trait composition, got {:?}", other),
            }),
            None => Err(TypeError::InvalidPredicate {
                reason: "unknown predicate type".into(),
            }),
        }
    }
}
