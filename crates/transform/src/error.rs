//! The evaluation error taxonomy.
//!
//! Every failure carries a machine-readable code plus whatever context
//! is available: the offending operation id, a structural path, and the
//! underlying validation issues for schema failures. Callers are meant
//! to tell "your template is malformed" apart from "your extension hook
//! misbehaved" by code alone.

use facture_template::Issue;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationCode {
    SchemaValidationFailed,
    MissingBinding,
    UnknownStrategy,
    StrategyExecutionFailed,
    InvalidTransformInput,
    InvalidOperand,
}

impl fmt::Display for EvaluationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EvaluationCode::SchemaValidationFailed => "SCHEMA_VALIDATION_FAILED",
            EvaluationCode::MissingBinding => "MISSING_BINDING",
            EvaluationCode::UnknownStrategy => "UNKNOWN_STRATEGY",
            EvaluationCode::StrategyExecutionFailed => "STRATEGY_EXECUTION_FAILED",
            EvaluationCode::InvalidTransformInput => "INVALID_TRANSFORM_INPUT",
            EvaluationCode::InvalidOperand => "INVALID_OPERAND",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
#[error("{code}: {message}")]
pub struct EvaluationError {
    pub code: EvaluationCode,
    pub operation_id: Option<String>,
    pub path: Option<String>,
    pub issues: Vec<Issue>,
    pub message: String,
}

impl EvaluationError {
    pub fn new(code: EvaluationCode, message: impl Into<String>) -> Self {
        Self { code, operation_id: None, path: None, issues: Vec::new(), message: message.into() }
    }

    pub fn with_operation(mut self, id: &str) -> Self {
        self.operation_id = Some(id.to_string());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// A template failed re-validation on its way into the evaluator.
    pub fn schema(issues: Vec<Issue>) -> Self {
        let message = format!("template failed validation with {} issue(s)", issues.len());
        Self {
            code: EvaluationCode::SchemaValidationFailed,
            operation_id: None,
            path: None,
            issues,
            message,
        }
    }
}
