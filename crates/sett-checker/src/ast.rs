//! Checker-facing AST surface
//!
//! Declarations and expressions arrive from the external parser already
//! shaped like this. Every node carries a source span so diagnostics can
//! point back into the file.

use sett_types::TyExpr;

/// A half-open byte range in a source file, with line/column of the start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Start byte offset
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
    /// 1-indexed line of the start
    pub line: u32,
    /// 1-indexed column of the start
    pub column: u32,
}

impl Span {
    /// Create a new span
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the span covers no bytes
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Smallest span covering both
    pub fn merge(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line: self.line.min(other.line),
            column: if self.start <= other.start {
                self.column
            } else {
                other.column
            },
        }
    }
}

impl Default for Span {
    fn default() -> Self {
        Span::new(0, 0, 1, 1)
    }
}

/// A module: an ordered list of declarations
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    /// Declarations, in source order
    pub decls: Vec<Decl>,
}

/// A top-level declaration
#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    /// `let name[: annotation] = init`
    ///
    /// Every binding is initialized at its declaration; an omitted
    /// annotation is synthesized from the initializer.
    Let {
        /// Bound name
        name: String,
        /// Optional declared type
        annotation: Option<TyExpr>,
        /// Initializer (always present)
        init: Expr,
        /// Declaration span
        span: Span,
    },
    /// `type Name = expr` — a named type alias
    TypeAlias {
        /// Alias name
        name: String,
        /// Aliased type expression
        expr: TyExpr,
        /// Declaration span
        span: Span,
    },
    /// `type Fn(params) = body` — a pure type-level function
    TypeFn {
        /// Function name
        name: String,
        /// Parameter names
        params: Vec<String>,
        /// Body expression
        body: TyExpr,
        /// Declaration span
        span: Span,
    },
}

impl Decl {
    /// The span of this declaration
    pub fn span(&self) -> Span {
        match self {
            Decl::Let { span, .. } | Decl::TypeAlias { span, .. } | Decl::TypeFn { span, .. } => {
                *span
            }
        }
    }

    /// The declared name
    pub fn name(&self) -> &str {
        match self {
            Decl::Let { name, .. } | Decl::TypeAlias { name, .. } | Decl::TypeFn { name, .. } => {
                name
            }
        }
    }
}

/// An expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Integer literal
    IntLit {
        /// Literal value
        value: i64,
        /// Source span
        span: Span,
    },
    /// Float literal
    FloatLit {
        /// Literal value
        value: f64,
        /// Source span
        span: Span,
    },
    /// String literal
    StrLit {
        /// Literal value
        value: String,
        /// Source span
        span: Span,
    },
    /// Boolean literal
    BoolLit {
        /// Literal value
        value: bool,
        /// Source span
        span: Span,
    },
    /// The `none` literal
    NoneLit {
        /// Source span
        span: Span,
    },
    /// Variable reference
    Var {
        /// Referenced name
        name: String,
        /// Source span
        span: Span,
    },
    /// Tuple construction: `(a, b, ...)`
    Tuple {
        /// Element expressions
        elems: Vec<Expr>,
        /// Source span
        span: Span,
    },
    /// Call of a registered function, possibly overloaded
    Call {
        /// Callee name
        name: String,
        /// Argument expressions
        args: Vec<Expr>,
        /// Source span
        span: Span,
    },
    /// Membership test: `expr is T`; yields `bool` and may leave a
    /// runtime tag check behind
    Is {
        /// Scrutinee
        expr: Box<Expr>,
        /// Target type expression
        target: TyExpr,
        /// Source span
        span: Span,
    },
    /// Error-coalescing: `expr else fallback`; strips `none` from the
    /// scrutinee's type
    Coalesce {
        /// Scrutinee
        expr: Box<Expr>,
        /// Fallback evaluated when the scrutinee is `none`
        fallback: Box<Expr>,
        /// Source span
        span: Span,
    },
    /// A type used as a value, as bound by meta-typed declarations
    TypeValue {
        /// The quoted type expression
        expr: TyExpr,
        /// Source span
        span: Span,
    },
}

impl Expr {
    /// The span of this expression
    pub fn span(&self) -> Span {
        match self {
            Expr::IntLit { span, .. }
            | Expr::FloatLit { span, .. }
            | Expr::StrLit { span, .. }
            | Expr::BoolLit { span, .. }
            | Expr::NoneLit { span }
            | Expr::Var { span, .. }
            | Expr::Tuple { span, .. }
            | Expr::Call { span, .. }
            | Expr::Is { span, .. }
            | Expr::Coalesce { span, .. }
            | Expr::TypeValue { span, .. } => *span,
        }
    }
}
