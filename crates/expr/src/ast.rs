//! Defines the Abstract Syntax Tree (AST) for value expressions.
use serde_json::Value;

/// The top-level representation of a parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A literal value, like a string, number, or boolean.
    Literal(Value),
    /// A path to select data from the current scope or a named variable.
    Selection(Selection),
    /// An arithmetic operation over two sub-expressions.
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// A call to a registered built-in function.
    FunctionCall { name: String, args: Vec<Expression> },
}

/// Arithmetic operators supported by the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Represents a segment in a selection path.
#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    /// An object key (e.g., `.name`).
    Key(String),
    /// An array index (e.g., `[0]`).
    Index(usize),
}

/// Represents a path for selecting data.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// Selects a node from the current scope using key/index lookups.
    Path(Vec<PathSegment>),
    /// Selects from a named variable (`$item.amount`).
    Variable {
        name: String,
        path: Vec<PathSegment>,
    },
}

impl Selection {
    /// A display form used in "unresolved binding" diagnostics.
    pub fn describe(&self) -> String {
        fn segments(path: &[PathSegment]) -> String {
            let mut out = String::new();
            for seg in path {
                match seg {
                    PathSegment::Key(k) => {
                        if !out.is_empty() {
                            out.push('.');
                        }
                        out.push_str(k);
                    }
                    PathSegment::Index(i) => {
                        out.push('[');
                        out.push_str(&i.to_string());
                        out.push(']');
                    }
                }
            }
            out
        }
        match self {
            Selection::Path(path) => segments(path),
            Selection::Variable { name, path } => {
                let rest = segments(path);
                if rest.is_empty() {
                    format!("${name}")
                } else if rest.starts_with('[') {
                    format!("${name}{rest}")
                } else {
                    format!("${name}.{rest}")
                }
            }
        }
    }
}
