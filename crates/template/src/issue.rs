//! Structural validation issues: machine-readable code, path, message.

use serde::Serialize;
use std::fmt;

/// A single structural defect found while validating a template
/// description. The path addresses the offending location in the
/// source document, e.g. `layout.children[2].repeat.sourceBinding`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub code: IssueCode,
    pub path: String,
    pub message: String,
}

impl Issue {
    pub fn new(code: IssueCode, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code, path: path.into(), message: message.into() }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}: {}", self.code, self.path, self.message)
    }
}

/// Machine-readable issue codes, stable across releases so editors can
/// key diagnostics on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    UnsupportedKind,
    UnsupportedVersion,
    UnknownField,
    MissingField,
    InvalidType,
    InvalidValue,
    EmptyList,
    InvalidExpression,
    UnknownToken,
    UnknownClass,
    UnknownBinding,
    DuplicateName,
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IssueCode::UnsupportedKind => "UNSUPPORTED_KIND",
            IssueCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            IssueCode::UnknownField => "UNKNOWN_FIELD",
            IssueCode::MissingField => "MISSING_FIELD",
            IssueCode::InvalidType => "INVALID_TYPE",
            IssueCode::InvalidValue => "INVALID_VALUE",
            IssueCode::EmptyList => "EMPTY_LIST",
            IssueCode::InvalidExpression => "INVALID_EXPRESSION",
            IssueCode::UnknownToken => "UNKNOWN_TOKEN",
            IssueCode::UnknownClass => "UNKNOWN_CLASS",
            IssueCode::UnknownBinding => "UNKNOWN_BINDING",
            IssueCode::DuplicateName => "DUPLICATE_NAME",
        };
        f.write_str(name)
    }
}
