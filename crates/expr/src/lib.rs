//! The value-expression language used inside facture templates.
//!
//! Expressions appear in predicate operands, sort keys, aggregate
//! operands, computed fields, totals, and dynamic-table cells. The
//! grammar is deliberately small: literals, scope/variable selections,
//! arithmetic, and a closed set of built-in functions. Comparison and
//! boolean logic live in the structured predicate model, not here.

pub mod ast;
pub mod engine;
pub mod error;
pub mod functions;
mod parser;

// --- Public API ---
pub use ast::{BinaryOp, Expression, PathSegment, Selection};
pub use engine::{
    EvaluationContext, display_text, evaluate, evaluate_as_bool, evaluate_as_string, select,
    truthy,
};
pub use error::ExprError;
pub use functions::{ExprFunction, FunctionRegistry};
pub use parser::parse_expression;
