//! Sett Type System
//!
//! Algebraic type representation, normalization, and decision procedures
//! for Sett. Types denote sets of values; the engine composes them with
//! sum, product, intersection, and negation, wraps them in opaque nominal
//! declarations, constrains them by trait capability, and lifts them into
//! meta-types for type-level evaluation.

#![warn(missing_docs)]

pub mod context;
pub mod error;
pub mod fingerprint;
pub mod meta;
pub mod normalize;
pub mod subtype;
pub mod traits;
pub mod ty;

pub use context::TypeContext;
pub use error::TypeError;
pub use fingerprint::{CanonicalFingerprint, NormalCache};
pub use meta::{Evaluator, TyExpr, TypeFnDef};
pub use normalize::{Normalizer, StepBudget, DEFAULT_STEP_LIMIT};
pub use subtype::SubtypeContext;
pub use traits::{TraitDef, TraitRegistry, TraitResolver};
pub use ty::{AtomicType, OpaqueId, Type, TypeId};
