//! Checker errors
//!
//! Every error carries the span of the declaration or expression it is
//! attached to; the whole run never aborts on the first failure.

use crate::ast::Span;
use sett_types::TypeError;
use thiserror::Error;

/// Errors produced while checking a module
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CheckError {
    /// Declared and inferred types are unrelated by subtyping
    #[error("Type '{actual}' is not assignable to type '{expected}'")]
    TypeMismatch {
        /// Declared type (rendered)
        expected: String,
        /// Synthesized type (rendered)
        actual: String,
        /// Offending expression
        span: Span,
    },

    /// A meta-typed binding's member does not satisfy its predicate
    #[error("Type '{ty}' does not implement trait '{trait_name}'")]
    UnresolvedTrait {
        /// The type under test (rendered)
        ty: String,
        /// The unimplemented trait
        trait_name: String,
        /// Offending expression
        span: Span,
    },

    /// More than one undominated overload candidate at a call site
    #[error("Ambiguous call to '{name}': {candidates} equally applicable overloads")]
    AmbiguousOverload {
        /// Callee name
        name: String,
        /// Number of surviving candidates
        candidates: usize,
        /// Call site
        span: Span,
    },

    /// No overload accepts the given arguments
    #[error("No overload of '{name}' matches arguments ({given})")]
    NoMatchingOverload {
        /// Callee name
        name: String,
        /// Rendered argument types
        given: String,
        /// Call site
        span: Span,
    },

    /// Normalization or evaluation ran out of budget; the enclosing
    /// declaration is abandoned
    #[error("Normalization budget exceeded after {limit} steps; simplify the type expression")]
    BudgetExceeded {
        /// Configured step limit
        limit: u32,
        /// Enclosing declaration
        span: Span,
    },

    /// Internal engine defect: unguarded structural self-membership
    #[error("Internal: paradox guard tripped on {ty}")]
    ParadoxGuard {
        /// The offending type (rendered)
        ty: String,
        /// Enclosing declaration
        span: Span,
    },

    /// Reference to an unbound name
    #[error("Cannot find name '{name}'")]
    UndefinedVariable {
        /// The unbound name
        name: String,
        /// Reference site
        span: Span,
    },

    /// Reference to an unknown named type
    #[error("Cannot find type '{name}'")]
    UndefinedType {
        /// The unknown name
        name: String,
        /// Reference site
        span: Span,
    },

    /// Call of a name with no registered signatures
    #[error("'{name}' is not a function")]
    NotCallable {
        /// Callee name
        name: String,
        /// Call site
        span: Span,
    },

    /// An annotation or type expression was rejected by the evaluator
    #[error("Invalid type expression: {message}")]
    InvalidTypeExpr {
        /// Evaluator's reason
        message: String,
        /// Annotation site
        span: Span,
    },
}

impl CheckError {
    /// Attach a span to an engine-level error
    pub fn from_type_error(err: TypeError, span: Span) -> Self {
        match err {
            TypeError::Mismatch { expected, actual } => CheckError::TypeMismatch {
                expected,
                actual,
                span,
            },
            TypeError::UnresolvedTrait { ty, trait_name } => CheckError::UnresolvedTrait {
                ty,
                trait_name,
                span,
            },
            TypeError::AmbiguousOverload { name, candidates } => CheckError::AmbiguousOverload {
                name,
                candidates,
                span,
            },
            TypeError::BudgetExceeded { limit } => CheckError::BudgetExceeded { limit, span },
            TypeError::ParadoxGuard { ty } => CheckError::ParadoxGuard { ty, span },
            TypeError::UndefinedType { name } | TypeError::UndefinedTrait { name } => {
                CheckError::UndefinedType { name, span }
            }
            other => CheckError::InvalidTypeExpr {
                message: other.to_string(),
                span,
            },
        }
    }

    /// Whether checking can continue past this declaration with the
    /// error placeholder substituted
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            CheckError::BudgetExceeded { .. } | CheckError::ParadoxGuard { .. }
        )
    }

    /// The source span this error points at
    pub fn span(&self) -> Span {
        match self {
            CheckError::TypeMismatch { span, .. }
            | CheckError::UnresolvedTrait { span, .. }
            | CheckError::AmbiguousOverload { span, .. }
            | CheckError::NoMatchingOverload { span, .. }
            | CheckError::BudgetExceeded { span, .. }
            | CheckError::ParadoxGuard { span, .. }
            | CheckError::UndefinedVariable { span, .. }
            | CheckError::UndefinedType { span, .. }
            | CheckError::NotCallable { span, .. }
            | CheckError::InvalidTypeExpr { span, .. } => *span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_type_error_keeps_span() {
        let span = Span::new(3, 9, 2, 4);
        let err = CheckError::from_type_error(
            TypeError::BudgetExceeded { limit: 500 },
            span,
        );
        assert_eq!(err, CheckError::BudgetExceeded { limit: 500, span });
        assert!(!err.is_recoverable());
        assert_eq!(err.span(), span);
    }

    #[test]
    fn test_undefined_trait_maps_to_undefined_type() {
        let span = Span::default();
        let err = CheckError::from_type_error(
            TypeError::UndefinedTrait {
                name: "Ord".into(),
            },
            span,
        );
        assert!(matches!(err, CheckError::UndefinedType { ref name, .. } if name == "Ord"));
    }
}
