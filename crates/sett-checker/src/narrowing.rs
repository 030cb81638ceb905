//! Narrowing obligations
//!
//! When a declaration is annotated strictly broader than its initializer
//! (typically a sum supertype), each use site that needs the narrower
//! type owes a proof. Obligations provable by subtyping are discharged
//! statically; the rest compile to deferred runtime tag checks attached
//! to the narrowing operators (`is` tests and `else` coalescing). The
//! external value representation retains enough constructive metadata to
//! answer those checks.

use crate::ast::Span;
use sett_types::{SubtypeContext, Type, TypeContext, TypeError, TypeId};

/// How an obligation is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObligationKind {
    /// Provably satisfied: the scrutinee's type is contained in the target
    StaticTrue,
    /// Provably unsatisfiable: the scrutinee's type is disjoint from the
    /// target, so the test is constant-false
    StaticFalse,
    /// Undecidable statically; a runtime tag check is emitted
    RuntimeTagCheck,
}

/// A narrowing proof owed at one use site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NarrowingObligation {
    /// Declared (broad) type of the scrutinee
    pub from: TypeId,
    /// Type required at the use site
    pub target: TypeId,
    /// Resolution
    pub kind: ObligationKind,
    /// Use site
    pub span: Span,
}

impl NarrowingObligation {
    /// Whether this obligation needs runtime support
    pub fn needs_runtime_check(&self) -> bool {
        self.kind == ObligationKind::RuntimeTagCheck
    }
}

/// Decide an obligation for a scrutinee of type `from` tested against
/// `target`
pub fn discharge(
    ctx: &mut TypeContext,
    from: TypeId,
    target: TypeId,
    span: Span,
) -> Result<NarrowingObligation, TypeError> {
    let kind = {
        let mut sub = SubtypeContext::new(ctx);
        if sub.try_member(from, target)? {
            ObligationKind::StaticTrue
        } else {
            ObligationKind::RuntimeTagCheck
        }
    };

    // Containment failed; a test against a provably disjoint target is
    // constant-false, which is still a static answer.
    let kind = if kind == ObligationKind::RuntimeTagCheck {
        let not_target = ctx.negation_type(target);
        let mut sub = SubtypeContext::new(ctx);
        if sub.try_subtype(from, not_target)? {
            ObligationKind::StaticFalse
        } else {
            ObligationKind::RuntimeTagCheck
        }
    } else {
        kind
    };

    Ok(NarrowingObligation {
        from,
        target,
        kind,
        span,
    })
}

/// Remove one member from a sum
///
/// The result of `x else fallback` no longer contains `none`; this strips
/// it from the scrutinee's type. A non-sum type equal to the removed
/// member collapses to `Never`; anything else passes through unchanged.
pub fn without_member(ctx: &mut TypeContext, ty: TypeId, removed: TypeId) -> TypeId {
    let Some(def) = ctx.get(ty).cloned() else {
        return ty;
    };

    match def {
        Type::Sum(sum) => {
            let remaining: Vec<TypeId> = sum
                .members
                .iter()
                .copied()
                .filter(|member| *member != removed)
                .collect();
            ctx.sum_type(remaining)
        }
        _ if ty == removed => ctx.never_type(),
        _ => ty,
    }
}
