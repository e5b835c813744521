use crate::issue::Issue;
use thiserror::Error;

/// Consolidated error for the throwing validation entry point.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Template validation failed with {} issue(s)", .0.len())]
    Validation(Vec<Issue>),
}

impl TemplateError {
    /// The structural issues behind this error, if any.
    pub fn issues(&self) -> &[Issue] {
        match self {
            TemplateError::Validation(issues) => issues,
            TemplateError::Json(_) => &[],
        }
    }
}
