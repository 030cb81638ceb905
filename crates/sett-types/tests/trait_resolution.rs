use rustc_hash::FxHashMap;
use sett_types::traits::{AssocFn, TraitMethodSig};
use sett_types::{
    Evaluator, StepBudget, TraitDef, TraitRegistry, TraitResolver, TyExpr, TypeContext,
    TypeError, TypeFnDef,
};

fn ord_trait(ctx: &mut TypeContext) -> TraitDef {
    let self_ = ctx.self_param();
    let int = ctx.int_type();
    TraitDef {
        name: "Ord".into(),
        methods: vec![TraitMethodSig {
            name: "cmp".into(),
            params: vec![self_, self_],
            ret: int,
        }],
        consts: vec![],
    }
}

fn show_trait(ctx: &mut TypeContext) -> TraitDef {
    let self_ = ctx.self_param();
    let str_ = ctx.str_type();
    TraitDef {
        name: "Show".into(),
        methods: vec![TraitMethodSig {
            name: "show".into(),
            params: vec![self_],
            ret: str_,
        }],
        consts: vec![],
    }
}

#[test]
fn test_trait_satisfied_by_assoc_fn() {
    let mut ctx = TypeContext::new();
    let mut registry = TraitRegistry::new();
    let ord = ord_trait(&mut ctx);
    registry.register_trait(ord);

    let int = ctx.int_type();
    registry.register_assoc_fn(
        int,
        AssocFn {
            name: "cmp".into(),
            params: vec![int, int],
            ret: int,
        },
    );

    let constraint = ctx.trait_ref("Ord");
    let mut resolver = TraitResolver::new(&mut ctx, &registry);
    assert_eq!(resolver.implements(int, constraint), Ok(true));
}

#[test]
fn test_missing_method_fails_constraint() {
    let mut ctx = TypeContext::new();
    let mut registry = TraitRegistry::new();
    let ord = ord_trait(&mut ctx);
    registry.register_trait(ord);

    let str_ = ctx.str_type();
    let constraint = ctx.trait_ref("Ord");
    let mut resolver = TraitResolver::new(&mut ctx, &registry);
    assert_eq!(resolver.implements(str_, constraint), Ok(false));
}

#[test]
fn test_intersection_of_traits_is_conjunction() {
    let mut ctx = TypeContext::new();
    let mut registry = TraitRegistry::new();
    let ord = ord_trait(&mut ctx);
    let show = show_trait(&mut ctx);
    registry.register_trait(ord);
    registry.register_trait(show);

    let int = ctx.int_type();
    registry.register_assoc_fn(
        int,
        AssocFn {
            name: "cmp".into(),
            params: vec![int, int],
            ret: int,
        },
    );

    let ord_ref = ctx.trait_ref("Ord");
    let show_ref = ctx.trait_ref("Show");
    let both = ctx.intersection_type(vec![ord_ref, show_ref]);

    let mut resolver = TraitResolver::new(&mut ctx, &registry);
    // cmp alone is not enough for Ord & Show.
    assert_eq!(resolver.implements(int, both), Ok(false));

    let mut registry2 = TraitRegistry::new();
    let mut ctx2 = TypeContext::new();
    let ord2 = ord_trait(&mut ctx2);
    let show2 = show_trait(&mut ctx2);
    registry2.register_trait(ord2);
    registry2.register_trait(show2);
    let int2 = ctx2.int_type();
    let str2 = ctx2.str_type();
    registry2.register_assoc_fn(
        int2,
        AssocFn {
            name: "cmp".into(),
            params: vec![int2, int2],
            ret: int2,
        },
    );
    registry2.register_assoc_fn(
        int2,
        AssocFn {
            name: "show".into(),
            params: vec![int2],
            ret: str2,
        },
    );
    let ord_ref2 = ctx2.trait_ref("Ord");
    let show_ref2 = ctx2.trait_ref("Show");
    let both2 = ctx2.intersection_type(vec![ord_ref2, show_ref2]);
    let mut resolver2 = TraitResolver::new(&mut ctx2, &registry2);
    assert_eq!(resolver2.implements(int2, both2), Ok(true));
}

#[test]
fn test_negated_constraint_is_closed_world() {
    let mut ctx = TypeContext::new();
    let mut registry = TraitRegistry::new();
    let ord = ord_trait(&mut ctx);
    registry.register_trait(ord);

    let int = ctx.int_type();
    let str_ = ctx.str_type();
    registry.register_assoc_fn(
        int,
        AssocFn {
            name: "cmp".into(),
            params: vec![int, int],
            ret: int,
        },
    );

    let ord_ref = ctx.trait_ref("Ord");
    let not_ord = ctx.negation_type(ord_ref);

    let mut resolver = TraitResolver::new(&mut ctx, &registry);
    assert_eq!(resolver.implements(str_, not_ord), Ok(true));
    assert_eq!(resolver.implements(int, not_ord), Ok(false));
}

#[test]
fn test_undefined_trait_is_an_error() {
    let mut ctx = TypeContext::new();
    let registry = TraitRegistry::new();
    let int = ctx.int_type();
    let constraint = ctx.trait_ref("Hashable");

    let mut resolver = TraitResolver::new(&mut ctx, &registry);
    assert_eq!(
        resolver.implements(int, constraint),
        Err(TypeError::UndefinedTrait {
            name: "Hashable".into()
        })
    );
}

#[test]
fn test_meta_binding_accepts_conforming_type() {
    // `let T: {Ord} = int` elaborates the annotation, then checks the
    // bound type against the lifted predicate.
    let mut ctx = TypeContext::new();
    let mut registry = TraitRegistry::new();
    let ord = ord_trait(&mut ctx);
    registry.register_trait(ord);

    let int = ctx.int_type();
    registry.register_assoc_fn(
        int,
        AssocFn {
            name: "cmp".into(),
            params: vec![int, int],
            ret: int,
        },
    );

    let fns = FxHashMap::default();
    let annotation = TyExpr::Lift(Box::new(TyExpr::Name("Ord".into())));
    let lifted = {
        let mut eval = Evaluator::new(&mut ctx, &registry, &fns);
        eval.eval(&annotation).unwrap()
    };

    let predicate = ctx.get(lifted).unwrap().as_meta_lift().unwrap().predicate;
    let mut resolver = TraitResolver::new(&mut ctx, &registry);
    assert_eq!(resolver.implements(int, predicate), Ok(true));

    let str_ = ctx.str_type();
    let mut resolver = TraitResolver::new(&mut ctx, &registry);
    assert_eq!(resolver.implements(str_, predicate), Ok(false));
}

#[test]
fn test_type_function_expansion() {
    let mut ctx = TypeContext::new();
    let registry = TraitRegistry::new();

    let mut fns = FxHashMap::default();
    fns.insert(
        "Optional".to_string(),
        TypeFnDef {
            name: "Optional".into(),
            params: vec!["T".into()],
            body: TyExpr::Sum(vec![TyExpr::Name("T".into()), TyExpr::Name("none".into())]),
        },
    );

    let expr = TyExpr::Apply {
        func: "Optional".into(),
        args: vec![TyExpr::Name("int".into())],
    };
    let result = {
        let mut eval = Evaluator::new(&mut ctx, &registry, &fns);
        eval.eval(&expr).unwrap()
    };

    let int = ctx.int_type();
    let none = ctx.none_type();
    let expected = ctx.sum_type(vec![int, none]);
    assert_eq!(result, expected);
}

#[test]
fn test_divergent_type_function_hits_budget() {
    let mut ctx = TypeContext::new();
    let registry = TraitRegistry::new();

    let mut fns = FxHashMap::default();
    fns.insert(
        "Loop".to_string(),
        TypeFnDef {
            name: "Loop".into(),
            params: vec!["T".into()],
            body: TyExpr::Apply {
                func: "Loop".into(),
                args: vec![TyExpr::Name("T".into())],
            },
        },
    );

    let expr = TyExpr::Apply {
        func: "Loop".into(),
        args: vec![TyExpr::Name("int".into())],
    };
    let result = {
        let mut eval = Evaluator::with_budget(&mut ctx, &registry, &fns, StepBudget::new(100));
        eval.eval(&expr)
    };
    assert_eq!(result, Err(TypeError::BudgetExceeded { limit: 100 }));
}
