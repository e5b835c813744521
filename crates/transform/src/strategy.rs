//! The closed allowlist of named extension strategies.
//!
//! A template may opt into a small number of vetted behaviors by naming
//! a strategy id on a transform operation. The registry is populated
//! once from the hard-coded mapping below and is read-only from then
//! on: it never accepts caller-supplied function bodies or source text,
//! which is the boundary that keeps template evaluation free of
//! arbitrary code execution. An unknown id is a hard failure.

use facture_expr::display_text;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StrategyError {
    #[error("Strategy '{0}' is not allowlisted")]
    NotAllowlisted(String),

    #[error("Strategy '{id}' failed: {message}")]
    ExecutionFailed { id: String, message: String },
}

/// Input handed to a strategy, shaped by the stage that invokes it.
#[derive(Debug)]
pub enum StrategyInput<'a> {
    /// Derive a group key for one row. `key` is the evaluated default
    /// key expression when the operation declared one.
    GroupKey { row: &'a Value, key: Option<&'a Value> },
    /// Fold the resolved operand values of one aggregation scope.
    Aggregate { values: &'a [Value] },
}

/// A pure, synchronous strategy function. Strategies observe only
/// their input and must be deterministic.
pub type StrategyFn = fn(&StrategyInput) -> Result<Value, String>;

pub struct StrategyRegistry {
    strategies: BTreeMap<&'static str, StrategyFn>,
}

impl StrategyRegistry {
    /// The registry with the built-in allowlist. Constructible directly
    /// for tests; production callers share [`StrategyRegistry::global`].
    pub fn builtin() -> Self {
        let mut strategies: BTreeMap<&'static str, StrategyFn> = BTreeMap::new();
        strategies.insert("group/initial-letter", initial_letter);
        strategies.insert("aggregate/distinct-count", distinct_count);
        strategies.insert("aggregate/median", median);
        Self { strategies }
    }

    /// The process-wide registry, initialized once and never extended.
    pub fn global() -> &'static StrategyRegistry {
        static REGISTRY: OnceLock<StrategyRegistry> = OnceLock::new();
        REGISTRY.get_or_init(StrategyRegistry::builtin)
    }

    pub fn allowlisted_ids(&self) -> Vec<&'static str> {
        self.strategies.keys().copied().collect()
    }

    pub fn is_allowlisted(&self, id: &str) -> bool {
        self.strategies.contains_key(id)
    }

    pub fn resolve(&self, id: &str) -> Result<StrategyFn, StrategyError> {
        self.strategies
            .get(id)
            .copied()
            .ok_or_else(|| StrategyError::NotAllowlisted(id.to_string()))
    }

    pub fn execute(&self, id: &str, input: &StrategyInput) -> Result<Value, StrategyError> {
        let func = self.resolve(id)?;
        func(input).map_err(|message| StrategyError::ExecutionFailed { id: id.to_string(), message })
    }
}

// --- Built-in strategies ---

/// Group key derivation: the uppercased first letter of the default key
/// expression's value.
fn initial_letter(input: &StrategyInput) -> Result<Value, String> {
    let StrategyInput::GroupKey { key, .. } = input else {
        return Err("only applicable to group operations".to_string());
    };
    let Some(key) = key else {
        return Err("requires a key expression to derive the initial from".to_string());
    };
    let text = display_text(key);
    match text.chars().next() {
        Some(c) => Ok(json!(c.to_uppercase().to_string())),
        None => Ok(json!("")),
    }
}

/// Aggregate: the number of distinct operand values.
fn distinct_count(input: &StrategyInput) -> Result<Value, String> {
    let StrategyInput::Aggregate { values } = input else {
        return Err("only applicable to aggregate operations".to_string());
    };
    let mut seen: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    seen.sort();
    seen.dedup();
    Ok(json!(seen.len() as f64))
}

/// Aggregate: the median of numeric operand values.
fn median(input: &StrategyInput) -> Result<Value, String> {
    let StrategyInput::Aggregate { values } = input else {
        return Err("only applicable to aggregate operations".to_string());
    };
    let mut nums: Vec<f64> = Vec::with_capacity(values.len());
    for v in values.iter() {
        match v.as_f64() {
            Some(n) => nums.push(n),
            None => return Err(format!("non-numeric operand value {v}")),
        }
    }
    if nums.is_empty() {
        return Ok(Value::Null);
    }
    nums.sort_by(|a, b| a.total_cmp(b));
    let mid = nums.len() / 2;
    let median = if nums.len() % 2 == 0 {
        (nums[mid - 1] + nums[mid]) / 2.0
    } else {
        nums[mid]
    };
    Ok(json!(median))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_id_is_a_hard_failure() {
        let registry = StrategyRegistry::builtin();
        assert!(!registry.is_allowlisted("group/guess"));
        assert_eq!(
            registry.resolve("group/guess").unwrap_err(),
            StrategyError::NotAllowlisted("group/guess".to_string())
        );
    }

    #[test]
    fn allowlist_is_closed_and_sorted() {
        let registry = StrategyRegistry::builtin();
        assert_eq!(
            registry.allowlisted_ids(),
            vec!["aggregate/distinct-count", "aggregate/median", "group/initial-letter"]
        );
    }

    #[test]
    fn initial_letter_uses_the_key_value() {
        let registry = StrategyRegistry::builtin();
        let row = json!({ "category": "services" });
        let key = json!("services");
        let out = registry
            .execute("group/initial-letter", &StrategyInput::GroupKey { row: &row, key: Some(&key) })
            .unwrap();
        assert_eq!(out, json!("S"));
    }

    #[test]
    fn median_of_even_count() {
        let registry = StrategyRegistry::builtin();
        let values = vec![json!(1.0), json!(5.0), json!(2.0), json!(4.0)];
        let out = registry
            .execute("aggregate/median", &StrategyInput::Aggregate { values: &values })
            .unwrap();
        assert_eq!(out, json!(3.0));
    }

    #[test]
    fn strategy_failure_is_reported_distinctly() {
        let registry = StrategyRegistry::builtin();
        let values = vec![json!("not a number")];
        let err = registry
            .execute("aggregate/median", &StrategyInput::Aggregate { values: &values })
            .unwrap_err();
        assert!(matches!(err, StrategyError::ExecutionFailed { .. }));
    }
}
