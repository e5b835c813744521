//! Deterministic template evaluation.
//!
//! This crate turns a validated template description plus an input
//! dataset into a canonicalized [`EvaluationResult`]: shaped rows,
//! groups, aggregates, totals, and resolved bindings. It also owns the
//! closed [`StrategyRegistry`] of allowlisted extension hooks.

pub mod canonical;
pub mod error;
mod pipeline;
pub mod strategy;

// --- Public API ---
pub use canonical::canonicalize;
pub use error::{EvaluationCode, EvaluationError};
pub use pipeline::{EvaluationResult, GroupResult, evaluate, evaluate_validated};
pub use strategy::{StrategyError, StrategyFn, StrategyInput, StrategyRegistry};
