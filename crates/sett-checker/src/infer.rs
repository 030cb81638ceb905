//! Gradual inference
//!
//! The checker walks a module's declarations in order, synthesizing a
//! type for every initializer and reconciling it with the declared
//! annotation when one is present. No unification variables are needed:
//! every binding is initialized at its declaration. Recoverable errors
//! substitute the error placeholder for the offending declaration and
//! checking continues, so one run reports many independent diagnostics.

use crate::ast::{Decl, Expr, Module, Span};
use crate::env::TypeEnvironment;
use crate::error::CheckError;
use crate::narrowing::{self, NarrowingObligation};
use rustc_hash::FxHashMap;
use sett_types::{
    Evaluator, Normalizer, SubtypeContext, TraitRegistry, TraitResolver, TyExpr, TypeContext,
    TypeFnDef, TypeId,
};

/// One registered function signature; a name may carry several
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FnSig {
    /// Parameter types
    pub params: Vec<TypeId>,
    /// Return type
    pub ret: TypeId,
}

/// A declaration with its final checked type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckedDecl {
    /// Declared name
    pub name: String,
    /// Checked type (the error placeholder when the declaration failed)
    pub ty: TypeId,
    /// Declaration span
    pub span: Span,
}

/// Result of checking one module
#[derive(Debug, Clone, PartialEq)]
pub struct CheckedModule {
    /// Typed declarations, in source order
    pub decls: Vec<CheckedDecl>,
    /// Narrowing obligations collected at use sites
    pub obligations: Vec<NarrowingObligation>,
    /// Accumulated diagnostics
    pub errors: Vec<CheckError>,
}

impl CheckedModule {
    /// Whether the module checked without diagnostics
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Obligations that compile to runtime tag checks
    pub fn runtime_checks(&self) -> impl Iterator<Item = &NarrowingObligation> {
        self.obligations.iter().filter(|ob| ob.needs_runtime_check())
    }
}

/// The module checker
pub struct Checker<'a> {
    ctx: &'a mut TypeContext,
    registry: &'a TraitRegistry,
    type_fns: FxHashMap<String, TypeFnDef>,
    functions: FxHashMap<String, Vec<FnSig>>,
    errors: Vec<CheckError>,
    obligations: Vec<NarrowingObligation>,
}

impl<'a> Checker<'a> {
    /// Create a checker over a type context and trait registry
    pub fn new(ctx: &'a mut TypeContext, registry: &'a TraitRegistry) -> Self {
        Checker {
            ctx,
            registry,
            type_fns: FxHashMap::default(),
            functions: FxHashMap::default(),
            errors: Vec::new(),
            obligations: Vec::new(),
        }
    }

    /// Register a callable signature; repeated names form an overload set
    pub fn register_fn(&mut self, name: impl Into<String>, sig: FnSig) {
        self.functions.entry(name.into()).or_default().push(sig);
    }

    /// Check a module against (and extending) the given environment
    pub fn check_module(mut self, module: &Module, env: &mut TypeEnvironment) -> CheckedModule {
        let mut decls = Vec::with_capacity(module.decls.len());

        for decl in &module.decls {
            match decl {
                Decl::Let {
                    name,
                    annotation,
                    init,
                    span,
                } => {
                    let ty = self.check_let(annotation.as_ref(), init, env, *span);
                    env.bind(name.clone(), ty, *span);
                    decls.push(CheckedDecl {
                        name: name.clone(),
                        ty,
                        span: *span,
                    });
                }
                Decl::TypeAlias { name, expr, span } => {
                    match self.elaborate(expr, *span) {
                        Ok(ty) => self.ctx.register_named_type(name.clone(), ty),
                        Err(err) => {
                            self.errors.push(err);
                            let error = self.ctx.error_type();
                            self.ctx.register_named_type(name.clone(), error);
                        }
                    }
                }
                Decl::TypeFn {
                    name,
                    params,
                    body,
                    span: _,
                } => {
                    self.type_fns.insert(
                        name.clone(),
                        TypeFnDef {
                            name: name.clone(),
                            params: params.clone(),
                            body: body.clone(),
                        },
                    );
                }
            }
        }

        CheckedModule {
            decls,
            obligations: self.obligations,
            errors: self.errors,
        }
    }

    /// Check one `let`, producing the binding's type
    fn check_let(
        &mut self,
        annotation: Option<&TyExpr>,
        init: &Expr,
        env: &TypeEnvironment,
        span: Span,
    ) -> TypeId {
        let Some(annotation) = annotation else {
            return self.synth_expr(init, env);
        };

        let declared = match self.elaborate(annotation, span) {
            Ok(ty) => ty,
            Err(err) => {
                self.errors.push(err);
                // Still synthesize so errors inside the initializer are
                // reported too.
                self.synth_expr(init, env);
                return self.ctx.error_type();
            }
        };

        // A meta-typed binding ranges over concrete types: the bound
        // type must satisfy the lifted predicate. Its initializer is a
        // quoted type, not a first-order value, so it is elaborated here
        // rather than synthesized.
        if let Some(lift) = self.ctx.get(declared).and_then(|t| t.as_meta_lift()) {
            let predicate = lift.predicate;
            return self.check_meta_binding(init, predicate, declared, env, span);
        }

        let synthesized = self.synth_expr(init, env);

        let (synth_norm, declared_norm) = match self.normalize_pair(synthesized, declared, span) {
            Ok(pair) => pair,
            Err(err) => {
                self.errors.push(err);
                return self.ctx.error_type();
            }
        };

        let ok = {
            let mut sub = SubtypeContext::new(self.ctx);
            match sub.try_subtype(synth_norm, declared_norm) {
                Ok(ok) => ok,
                Err(err) => {
                    self.errors.push(CheckError::from_type_error(err, span));
                    return self.ctx.error_type();
                }
            }
        };

        if !ok {
            self.errors.push(CheckError::TypeMismatch {
                expected: self.ctx.display(declared_norm),
                actual: self.ctx.display(synth_norm),
                span: init.span(),
            });
            return self.ctx.error_type();
        }

        declared_norm
    }

    fn check_meta_binding(
        &mut self,
        init: &Expr,
        predicate: TypeId,
        declared: TypeId,
        env: &TypeEnvironment,
        span: Span,
    ) -> TypeId {
        let member = match init {
            Expr::TypeValue { expr, span } => match self.elaborate(expr, *span) {
                Ok(ty) => ty,
                Err(err) => {
                    self.errors.push(err);
                    return self.ctx.error_type();
                }
            },
            other => {
                let actual = self.synth_expr(other, env);
                self.errors.push(CheckError::TypeMismatch {
                    expected: self.ctx.display(declared),
                    actual: self.ctx.display(actual),
                    span: other.span(),
                });
                return self.ctx.error_type();
            }
        };

        let satisfied = {
            let mut resolver = TraitResolver::new(self.ctx, self.registry);
            match resolver.implements(member, predicate) {
                Ok(ok) => ok,
                Err(err) => {
                    self.errors.push(CheckError::from_type_error(err, span));
                    return self.ctx.error_type();
                }
            }
        };

        if !satisfied {
            self.errors.push(CheckError::UnresolvedTrait {
                ty: self.ctx.display(member),
                trait_name: self.ctx.display(predicate),
                span: init.span(),
            });
            return self.ctx.error_type();
        }

        declared
    }

    /// Synthesize the type of an expression
    ///
    /// Failures are recorded and the error placeholder returned, so one
    /// bad subexpression never silences its siblings.
    fn synth_expr(&mut self, expr: &Expr, env: &TypeEnvironment) -> TypeId {
        match expr {
            Expr::IntLit { .. } => self.ctx.int_type(),
            Expr::FloatLit { .. } => self.ctx.float_type(),
            Expr::StrLit { .. } => self.ctx.str_type(),
            Expr::BoolLit { .. } => self.ctx.bool_type(),
            Expr::NoneLit { .. } => self.ctx.none_type(),
            Expr::Var { name, span } => match env.lookup(name) {
                Some(binding) => binding.ty,
                None => {
                    self.errors.push(CheckError::UndefinedVariable {
                        name: name.clone(),
                        span: *span,
                    });
                    self.ctx.error_type()
                }
            },
            Expr::Tuple { elems, .. } => {
                let components: Vec<TypeId> =
                    elems.iter().map(|e| self.synth_expr(e, env)).collect();
                self.ctx.product_type(components)
            }
            Expr::Call { name, args, span } => {
                let arg_tys: Vec<TypeId> =
                    args.iter().map(|a| self.synth_expr(a, env)).collect();
                self.resolve_call(name, &arg_tys, *span)
            }
            Expr::Is { expr, target, span } => {
                let scrutinee = self.synth_expr(expr, env);
                match self.elaborate(target, *span) {
                    Ok(target_ty) => {
                        self.obligate(scrutinee, target_ty, *span);
                    }
                    Err(err) => self.errors.push(err),
                }
                self.ctx.bool_type()
            }
            Expr::Coalesce {
                expr,
                fallback,
                span,
            } => {
                let scrutinee = self.synth_expr(expr, env);
                let fallback_ty = self.synth_expr(fallback, env);
                let none = self.ctx.none_type();

                // The runtime check distinguishes `none`; after it, the
                // scrutinee contributes its none-free remainder.
                self.obligate(scrutinee, none, *span);
                let stripped = narrowing::without_member(self.ctx, scrutinee, none);
                self.ctx.sum_type(vec![stripped, fallback_ty])
            }
            Expr::TypeValue { expr, span } => {
                // A quoted type is a value of the universe; elaborate for
                // effect so bad quotes are reported here.
                if let Err(err) = self.elaborate(expr, *span) {
                    self.errors.push(err);
                    return self.ctx.error_type();
                }
                self.ctx.universe_type()
            }
        }
    }

    /// Record a narrowing obligation for a use site
    fn obligate(&mut self, from: TypeId, target: TypeId, span: Span) {
        match narrowing::discharge(self.ctx, from, target, span) {
            Ok(ob) => self.obligations.push(ob),
            Err(err) => self.errors.push(CheckError::from_type_error(err, span)),
        }
    }

    /// Overload resolution: applicable candidates, then dominance filtering
    fn resolve_call(&mut self, name: &str, args: &[TypeId], span: Span) -> TypeId {
        let Some(sigs) = self.functions.get(name) else {
            self.errors.push(CheckError::NotCallable {
                name: name.to_string(),
                span,
            });
            return self.ctx.error_type();
        };
        let sigs = sigs.clone();

        let mut applicable: Vec<&FnSig> = Vec::new();
        for sig in &sigs {
            if sig.params.len() != args.len() {
                continue;
            }
            let mut sub = SubtypeContext::new(self.ctx);
            if args
                .iter()
                .zip(&sig.params)
                .all(|(&arg, &param)| sub.is_subtype(arg, param))
            {
                applicable.push(sig);
            }
        }

        if applicable.is_empty() {
            let given = args
                .iter()
                .map(|&a| self.ctx.display(a))
                .collect::<Vec<_>>()
                .join(", ");
            self.errors.push(CheckError::NoMatchingOverload {
                name: name.to_string(),
                given,
                span,
            });
            return self.ctx.error_type();
        }

        // A candidate survives unless another applicable candidate is
        // strictly more specific.
        let mut survivors: Vec<&FnSig> = Vec::new();
        for (i, cand) in applicable.iter().enumerate() {
            let dominated = applicable.iter().enumerate().any(|(j, other)| {
                i != j && self.more_specific(other, cand) && !self.more_specific(cand, other)
            });
            if !dominated {
                survivors.push(*cand);
            }
        }

        match survivors.len() {
            1 => survivors[0].ret,
            n => {
                self.errors.push(CheckError::AmbiguousOverload {
                    name: name.to_string(),
                    candidates: n,
                    span,
                });
                self.ctx.error_type()
            }
        }
    }

    fn more_specific(&self, a: &FnSig, b: &FnSig) -> bool {
        let mut sub = SubtypeContext::new(self.ctx);
        a.params
            .iter()
            .zip(&b.params)
            .all(|(&pa, &pb)| sub.is_subtype(pa, pb))
    }

    /// Elaborate a syntactic type expression to an interned type
    fn elaborate(&mut self, expr: &TyExpr, span: Span) -> Result<TypeId, CheckError> {
        let mut eval = Evaluator::new(self.ctx, self.registry, &self.type_fns);
        eval.eval(expr)
            .map_err(|err| CheckError::from_type_error(err, span))
    }

    fn normalize_pair(
        &mut self,
        a: TypeId,
        b: TypeId,
        span: Span,
    ) -> Result<(TypeId, TypeId), CheckError> {
        let mut norm = Normalizer::new(self.ctx);
        let a = norm
            .normalize(a)
            .map_err(|err| CheckError::from_type_error(err, span))?;
        let b = norm
            .normalize(b)
            .map_err(|err| CheckError::from_type_error(err, span))?;
        Ok((a, b))
    }
}
