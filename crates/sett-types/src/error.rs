//! Type system errors

use thiserror::Error;

/// Errors that can occur during type operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    /// Declared and inferred types are unrelated by subtyping
    #[error("Type mismatch: expected {expected}, got {actual}")]
    Mismatch {
        /// Expected type (rendered)
        expected: String,
        /// Actual type (rendered)
        actual: String,
    },

    /// A required trait is not implemented
    #[error("Type '{ty}' does not implement trait '{trait_name}'")]
    UnresolvedTrait {
        /// The type under test (rendered)
        ty: String,
        /// The unimplemented trait
        trait_name: String,
    },

    /// Overload resolution found more than one undominated candidate
    #[error("Ambiguous call to '{name}': {candidates} equally applicable overloads")]
    AmbiguousOverload {
        /// Callee name
        name: String,
        /// Number of surviving candidates
        candidates: usize,
    },

    /// A rewrite or evaluation exceeded its step budget
    #[error("Normalization budget exceeded after {limit} steps; simplify the type expression")]
    BudgetExceeded {
        /// Configured step limit
        limit: u32,
    },

    /// A self-membership check reached structural recursion outside the
    /// sanctioned `type` axiom. Internal engine defect, never a user-facing
    /// language condition.
    #[error("Paradox guard tripped: structural self-membership on {ty}")]
    ParadoxGuard {
        /// The offending type (rendered)
        ty: String,
    },

    /// Undefined named type
    #[error("Undefined type: {name}")]
    UndefinedType {
        /// Name that was not found
        name: String,
    },

    /// Undefined trait reference
    #[error("Undefined trait: {name}")]
    UndefinedTrait {
        /// Name that was not found
        name: String,
    },

    /// Undefined type-level function
    #[error("Undefined type function: {name}")]
    UndefinedTypeFn {
        /// Name that was not found
        name: String,
    },

    /// Wrong number of arguments to a type-level function
    #[error("Type function '{name}' expects {expected} argument(s), got {actual}")]
    TypeFnArity {
        /// Function name
        name: String,
        /// Expected argument count
        expected: usize,
        /// Actual argument count
        actual: usize,
    },

    /// A predicate position held something other than a trait composition
    #[error("Invalid meta-type predicate: {reason}")]
    InvalidPredicate {
        /// Why the predicate was rejected
        reason: String,
    },

    /// A canonical cache payload failed to decode
    #[error("Corrupt canonical encoding: {reason}")]
    CorruptEncoding {
        /// What went wrong
        reason: String,
    },
}

impl TypeError {
    /// Whether the enclosing declaration can substitute the error
    /// placeholder and continue checking
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            TypeError::BudgetExceeded { .. } | TypeError::ParadoxGuard { .. }
        )
    }
}
