//! Defines the registry and built-in implementations for expression functions.
use super::engine::{EvaluationContext, display_text};
use serde_json::{Value, json};
use std::collections::HashMap;

/// The signature for a built-in expression function.
pub type ExprFunction = fn(e_ctx: &EvaluationContext, args: Vec<Value>) -> Value;

/// A registry holding all functions available to the evaluation engine.
///
/// The set is closed: it is populated from the built-ins below and the
/// engine has no way to register caller-supplied code at evaluation
/// time.
pub struct FunctionRegistry {
    functions: HashMap<String, ExprFunction>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self { functions: HashMap::new() }
    }

    fn register(&mut self, name: &str, func: ExprFunction) {
        self.functions.insert(name.to_lowercase(), func);
    }

    /// Finds a function by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&ExprFunction> {
        self.functions.get(&name.to_lowercase())
    }
}

// --- Built-in Function Implementations ---

fn upper(_e_ctx: &EvaluationContext, args: Vec<Value>) -> Value {
    args.first().and_then(|v| v.as_str()).map(|s| s.to_uppercase().into()).unwrap_or(Value::Null)
}

fn lower(_e_ctx: &EvaluationContext, args: Vec<Value>) -> Value {
    args.first().and_then(|v| v.as_str()).map(|s| s.to_lowercase().into()).unwrap_or(Value::Null)
}

fn concat(_e_ctx: &EvaluationContext, args: Vec<Value>) -> Value {
    args.iter().map(display_text).collect::<String>().into()
}

fn round(_e_ctx: &EvaluationContext, args: Vec<Value>) -> Value {
    let Some(n) = args.first().and_then(|v| v.as_f64()) else {
        return Value::Null;
    };
    // Optional second argument: number of decimal places.
    let places = args.get(1).and_then(|v| v.as_f64()).unwrap_or(0.0) as i32;
    let factor = 10f64.powi(places);
    json!((n * factor).round() / factor)
}

fn abs(_e_ctx: &EvaluationContext, args: Vec<Value>) -> Value {
    args.first().and_then(|v| v.as_f64()).map(|n| json!(n.abs())).unwrap_or(Value::Null)
}

fn coalesce(_e_ctx: &EvaluationContext, args: Vec<Value>) -> Value {
    args.into_iter().find(|v| !v.is_null()).unwrap_or(Value::Null)
}

/// Sums a named per-group aggregate across the `$groups` variable.
/// Only meaningful in the totals stage, which provides that variable.
fn sum_groups(e_ctx: &EvaluationContext, args: Vec<Value>) -> Value {
    let Some(name) = args.first().and_then(|v| v.as_str()) else {
        return Value::Null;
    };
    let Some(groups) = e_ctx.variables.get("groups").and_then(|v| v.as_array()) else {
        return Value::Null;
    };
    let mut total = 0.0;
    let mut found = false;
    for group in groups {
        if let Some(v) = group.get("aggregates").and_then(|a| a.get(name)).and_then(|v| v.as_f64())
        {
            total += v;
            found = true;
        }
    }
    if found { json!(total) } else { Value::Null }
}

impl Default for FunctionRegistry {
    /// Creates a new registry populated with all built-in functions.
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register("upper", upper);
        registry.register("lower", lower);
        registry.register("concat", concat);
        registry.register("round", round);
        registry.register("abs", abs);
        registry.register("coalesce", coalesce);
        registry.register("sumGroups", sum_groups);
        registry
    }
}
