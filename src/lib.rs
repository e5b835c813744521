//! Declarative invoice engine.
//!
//! A template is a versioned JSON description (metadata, style catalog,
//! data bindings, a transform pipeline, a layout tree) rather than
//! executable code. This crate wires the member crates into the two
//! public entry points:
//!
//! - [`preview`] — validate, evaluate, render; returns markup and
//!   stylesheet text for an interactive host to display.
//! - [`generate`] — the same pipeline plus the document wrapper;
//!   returns a complete standalone HTML document.
//!
//! Both share the validate → evaluate → render path, so a template
//! previews exactly as it generates.

// Foundation crates
pub use facture_expr as expr;
pub use facture_template as template;

// Evaluation crates
pub use facture_transform as transform;

// Render crates
pub use facture_render as render;

// Commonly used types at the crate root
pub use facture_render::{DocumentOptions, RenderError, RenderOutput, wrap};
pub use facture_template::{
    Issue, IssueCode, TemplateError, ValidatedTemplate, validate, validate_str,
};
pub use facture_transform::{
    EvaluationCode, EvaluationError, EvaluationResult, StrategyRegistry,
};

use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FactureError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Validates and evaluates the template against the dataset, then
/// renders markup and stylesheet text.
pub fn preview(template_source: &Value, dataset: &Value) -> Result<RenderOutput, FactureError> {
    let template =
        validate(template_source).map_err(TemplateError::Validation)?;
    log::debug!("previewing template '{}'", template.metadata.name);
    let result =
        facture_transform::evaluate_validated(&template, dataset, StrategyRegistry::global())?;
    Ok(facture_render::render(&template, &result)?)
}

/// Runs the same pipeline as [`preview`] and wraps the output into a
/// standalone HTML document.
pub fn generate(
    template_source: &Value,
    dataset: &Value,
    options: &DocumentOptions,
) -> Result<String, FactureError> {
    let output = preview(template_source, dataset)?;
    Ok(wrap(&output.markup, &output.stylesheet, options))
}
