//! Sett Type Checker
//!
//! The checker front half of the Sett engine:
//! - the AST surface handed over by the external parser
//! - type environments with read-only dependency sharing
//! - gradual inference (synthesis plus annotation reconciliation)
//! - narrowing obligations and their runtime-check fallback
//! - diagnostics rendering with source context and JSON output
//!
//! # Usage
//!
//! ```ignore
//! use sett_checker::{Checker, TypeEnvironment};
//! use sett_types::{TraitRegistry, TypeContext};
//!
//! let mut ctx = TypeContext::new();
//! let registry = TraitRegistry::new();
//!
//! let mut env = TypeEnvironment::new();
//! let checked = Checker::new(&mut ctx, &registry).check_module(&module, &mut env);
//! for error in &checked.errors {
//!     // render with sett_checker::Diagnostic
//! }
//! ```

#![warn(missing_docs)]

pub mod ast;
pub mod diagnostic;
pub mod env;
pub mod error;
pub mod infer;
pub mod narrowing;

pub use ast::{Decl, Expr, Module, Span};
pub use diagnostic::{Diagnostic, ErrorCode, JsonDiagnostic};
pub use env::{Binding, TypeEnvironment};
pub use error::CheckError;
pub use infer::{CheckedDecl, CheckedModule, Checker, FnSig};
pub use narrowing::{NarrowingObligation, ObligationKind};
