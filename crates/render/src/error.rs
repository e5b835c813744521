use thiserror::Error;

/// Rendering failures. Validation rules out most of these up front;
/// the renderer still refuses to emit markup over inconsistent input
/// rather than producing a partially wrong document.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("binding '{0}' is not present in the evaluation result")]
    MissingBinding(String),

    #[error("repeat source '{0}' is not an array in the evaluation result")]
    InvalidRepeatSource(String),

    #[error("total '{0}' is not present in the evaluation result")]
    MissingTotal(String),

    #[error("cell expression failed: {0}")]
    Expression(String),
}
