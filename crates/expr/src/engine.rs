//! Evaluates parsed expressions against a scope, variables, and functions.
use super::ast::{BinaryOp, Expression, PathSegment, Selection};
use super::error::ExprError;
use super::functions::FunctionRegistry;
use serde_json::{Value, json};
use std::collections::HashMap;

/// Everything an expression may observe during evaluation.
///
/// The scope is the current data node (the dataset root, or one row of a
/// collection); variables hold named values like the repeat item binding
/// or the totals-stage `$aggregates`/`$groups`.
pub struct EvaluationContext<'a> {
    pub scope: &'a Value,
    pub variables: &'a HashMap<String, Value>,
    pub functions: &'a FunctionRegistry,
}

/// Evaluates an expression to a JSON value.
///
/// A selection that does not resolve (missing key, out-of-range index,
/// undeclared variable) is reported as `ExprError::Unresolved`; callers
/// that tolerate absent data (predicates, aggregate operands) match on
/// that variant instead of treating it as null.
pub fn evaluate(expr: &Expression, e_ctx: &EvaluationContext) -> Result<Value, ExprError> {
    match expr {
        Expression::Literal(v) => Ok(v.clone()),
        Expression::Selection(sel) => select(sel, e_ctx).map(Value::clone),
        Expression::Binary { op, left, right } => {
            let lhs = evaluate(left, e_ctx)?;
            let rhs = evaluate(right, e_ctx)?;
            apply_binary(*op, &lhs, &rhs)
        }
        Expression::FunctionCall { name, args } => {
            let func = e_ctx
                .functions
                .get(name)
                .ok_or_else(|| ExprError::UnknownFunction(name.clone()))?;
            let mut evaluated = Vec::with_capacity(args.len());
            for arg in args {
                evaluated.push(evaluate(arg, e_ctx)?);
            }
            Ok(func(e_ctx, evaluated))
        }
    }
}

/// Resolves a selection to a reference into the scope or variables.
pub fn select<'a>(
    sel: &Selection,
    e_ctx: &'a EvaluationContext,
) -> Result<&'a Value, ExprError> {
    let (mut current, path) = match sel {
        Selection::Path(path) => (e_ctx.scope, path.as_slice()),
        Selection::Variable { name, path } => {
            let root = e_ctx
                .variables
                .get(name)
                .ok_or_else(|| ExprError::Unresolved(sel.describe()))?;
            (root, path.as_slice())
        }
    };
    for segment in path {
        current = match segment {
            PathSegment::Key(key) => current.get(key.as_str()),
            PathSegment::Index(idx) => current.get(idx),
        }
        .ok_or_else(|| ExprError::Unresolved(sel.describe()))?;
    }
    Ok(current)
}

fn apply_binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, ExprError> {
    let (a, b) = match (lhs.as_f64(), rhs.as_f64()) {
        (Some(a), Some(b)) => (a, b),
        _ => {
            return Err(ExprError::TypeError(format!(
                "arithmetic requires numbers, got {lhs} and {rhs}"
            )));
        }
    };
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => {
            if b == 0.0 {
                return Err(ExprError::TypeError("division by zero".to_string()));
            }
            a / b
        }
    };
    Ok(json!(result))
}

/// Evaluates an expression and coerces the result to a boolean.
///
/// Null, `false`, zero, and the empty string are false; everything else
/// is true.
pub fn evaluate_as_bool(expr: &Expression, e_ctx: &EvaluationContext) -> Result<bool, ExprError> {
    Ok(truthy(&evaluate(expr, e_ctx)?))
}

pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Evaluates an expression and renders the result as display text.
pub fn evaluate_as_string(
    expr: &Expression,
    e_ctx: &EvaluationContext,
) -> Result<String, ExprError> {
    Ok(display_text(&evaluate(expr, e_ctx)?))
}

/// The user-facing textual form of a value: bare strings stay bare,
/// integral floats drop the trailing `.0`, everything else serializes.
pub fn display_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}
