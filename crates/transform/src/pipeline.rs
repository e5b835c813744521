//! The deterministic transform pipeline.
//!
//! Stages always run in the fixed order `filter → sort → group →
//! aggregate → computed-field → totals-compose`, regardless of the
//! order operations were declared in. The ordering matches the natural
//! dependency chain, and fixing it removes the ambiguity a user-ordered
//! pipeline would invite. Before the result is returned it passes
//! through the canonicalization pass, so evaluating the same template
//! against the same dataset twice serializes byte-identically.

use crate::canonical::canonicalize;
use crate::error::{EvaluationCode, EvaluationError};
use crate::strategy::{StrategyInput, StrategyRegistry};
use facture_expr::{
    EvaluationContext, ExprError, Expression, FunctionRegistry, evaluate as eval_expr, select,
};
use facture_template::{
    AggregateFn, Aggregation, CompareOp, Operation, OperationKind, Predicate, SortDirection,
    ValidatedTemplate, validate,
};
use indexmap::IndexMap;
use itertools::Itertools;
use serde::Serialize;
use serde_json::{Value, json};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// The canonicalized product of one evaluation run. Freshly allocated
/// per call; the evaluator never caches or shares results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationResult {
    /// The shaped rows of the pipeline source collection.
    pub output: Vec<Value>,
    /// Partitions in first-seen order, when a group operation ran.
    pub groups: Vec<GroupResult>,
    /// Overall aggregates by name.
    pub aggregates: BTreeMap<String, Value>,
    /// Composed totals by name.
    pub totals: BTreeMap<String, Value>,
    /// Resolved bindings: every value binding plus every collection;
    /// the pipeline source maps to the shaped rows.
    pub bindings: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupResult {
    pub key: Value,
    pub rows: Vec<Value>,
    pub aggregates: BTreeMap<String, Value>,
}

/// Validates the template description and evaluates it against the
/// dataset. Validation here is defense in depth: the evaluator never
/// runs an invalid document, no matter who handed it in.
pub fn evaluate(
    template_source: &Value,
    dataset: &Value,
    registry: &StrategyRegistry,
) -> Result<EvaluationResult, EvaluationError> {
    let template = validate(template_source).map_err(EvaluationError::schema)?;
    evaluate_validated(&template, dataset, registry)
}

/// Evaluates an already-validated template against the dataset.
pub fn evaluate_validated(
    template: &ValidatedTemplate,
    dataset: &Value,
    registry: &StrategyRegistry,
) -> Result<EvaluationResult, EvaluationError> {
    let functions = FunctionRegistry::default();

    // Resolve the binding catalogs against the dataset.
    let empty_vars = HashMap::new();
    let root_ctx =
        EvaluationContext { scope: dataset, variables: &empty_vars, functions: &functions };

    let mut variables: HashMap<String, Value> = HashMap::new();
    for (name, binding) in &template.bindings.values {
        match select(&binding.path, &root_ctx) {
            Ok(v) => {
                variables.insert(name.clone(), v.clone());
            }
            Err(_) if !binding.required => {
                variables.insert(name.clone(), Value::Null);
            }
            Err(_) => {
                return Err(EvaluationError::new(
                    EvaluationCode::MissingBinding,
                    format!("value binding '{name}' did not resolve against the dataset"),
                )
                .with_path(format!("bindings.values.{name}")));
            }
        }
    }

    let mut collections: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    for (name, binding) in &template.bindings.collections {
        match select(&binding.path, &root_ctx) {
            Ok(Value::Array(items)) => {
                collections.insert(name.clone(), items.clone());
            }
            Ok(other) => {
                return Err(EvaluationError::new(
                    EvaluationCode::InvalidTransformInput,
                    format!("collection binding '{name}' must be an array, got {other}"),
                )
                .with_path(format!("bindings.collections.{name}")));
            }
            Err(_) => {
                return Err(EvaluationError::new(
                    EvaluationCode::MissingBinding,
                    format!("collection binding '{name}' did not resolve against the dataset"),
                )
                .with_path(format!("bindings.collections.{name}")));
            }
        }
    }

    let env = Env { variables: &variables, functions: &functions };
    let pipeline = &template.transforms;

    // Every referenced strategy must be allowlisted before any stage
    // runs; an unknown id is a hard failure, never a fallback.
    for op in &pipeline.operations {
        if let Some(id) = op.strategy_id.as_deref()
            && !registry.is_allowlisted(id)
        {
            return Err(EvaluationError::new(
                EvaluationCode::UnknownStrategy,
                format!(
                    "strategy '{id}' is not allowlisted (known: {})",
                    registry.allowlisted_ids().iter().join(", ")
                ),
            )
            .with_operation(&op.id));
        }
    }

    let mut rows = collections.get(&pipeline.source).cloned().unwrap_or_default();
    log::debug!(
        "evaluating pipeline over '{}' ({} rows, {} operations)",
        pipeline.source,
        rows.len(),
        pipeline.operations.len()
    );

    // filter
    for op in ops_of(pipeline, "filter") {
        let OperationKind::Filter { predicate } = &op.kind else { unreachable!() };
        let mut kept = Vec::with_capacity(rows.len());
        for row in rows {
            if eval_predicate(predicate, &env.ctx(&row)).map_err(|e| expr_error(e, op))? {
                kept.push(row);
            }
        }
        rows = kept;
        log::debug!("filter '{}' kept {} rows", op.id, rows.len());
    }

    // sort
    for op in ops_of(pipeline, "sort") {
        let OperationKind::Sort { keys } = &op.kind else { unreachable!() };
        rows = sort_rows(rows, keys, &env, op)?;
    }

    // group
    let mut groups: Vec<(Value, Vec<usize>)> = Vec::new();
    for op in ops_of(pipeline, "group") {
        let OperationKind::Group { key } = &op.kind else { unreachable!() };
        groups = group_rows(&rows, key.as_ref(), op, &env, registry)?;
        log::debug!("group '{}' produced {} partitions", op.id, groups.len());
    }

    // aggregate
    let mut aggregates: BTreeMap<String, Value> = BTreeMap::new();
    let mut group_aggregates: Vec<BTreeMap<String, Value>> = vec![BTreeMap::new(); groups.len()];
    for op in ops_of(pipeline, "aggregate") {
        let OperationKind::Aggregate { aggregations } = &op.kind else { unreachable!() };
        for agg in aggregations {
            let overall = operand_values(&rows, (0..rows.len()).collect(), agg, &env, op)?;
            if overall.is_empty() && !rows.is_empty() {
                return Err(EvaluationError::new(
                    EvaluationCode::InvalidOperand,
                    format!("aggregate '{}' operand resolved against no row", agg.name),
                )
                .with_operation(&op.id));
            }
            aggregates.insert(agg.name.clone(), fold(agg, &overall, op, registry)?);

            for (gi, (_, indices)) in groups.iter().enumerate() {
                let values = operand_values(&rows, indices.clone(), agg, &env, op)?;
                group_aggregates[gi].insert(agg.name.clone(), fold(agg, &values, op, registry)?);
            }
        }
    }

    // computed-field
    for op in ops_of(pipeline, "computed-field") {
        let OperationKind::ComputedField { fields } = &op.kind else { unreachable!() };
        for row in rows.iter_mut() {
            let mut derived = Vec::with_capacity(fields.len());
            for field in fields {
                let value =
                    eval_expr(&field.expr, &env.ctx(row)).map_err(|e| expr_error(e, op))?;
                derived.push((field.name.clone(), value));
            }
            let Some(obj) = row.as_object_mut() else {
                return Err(EvaluationError::new(
                    EvaluationCode::InvalidTransformInput,
                    "computed fields require object rows",
                )
                .with_operation(&op.id));
            };
            for (name, value) in derived {
                obj.insert(name, value);
            }
        }
    }

    // totals-compose
    let mut totals: BTreeMap<String, Value> = BTreeMap::new();
    for op in ops_of(pipeline, "totals-compose") {
        let OperationKind::TotalsCompose { totals: specs } = &op.kind else { unreachable!() };
        let mut scope_vars = variables.clone();
        scope_vars.insert(
            "aggregates".to_string(),
            Value::Object(aggregates.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
        );
        scope_vars.insert(
            "groups".to_string(),
            Value::Array(
                groups
                    .iter()
                    .zip(&group_aggregates)
                    .map(|((key, _), aggs)| {
                        json!({
                            "key": key,
                            "aggregates": Value::Object(
                                aggs.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
                            ),
                        })
                    })
                    .collect(),
            ),
        );
        let totals_env = Env { variables: &scope_vars, functions: &functions };
        for spec in specs {
            let value = eval_expr(&spec.expr, &totals_env.ctx(dataset)).map_err(|e| match e {
                ExprError::Unresolved(name) => EvaluationError::new(
                    EvaluationCode::InvalidOperand,
                    format!("total '{}' references '{name}', which no prior stage produced", spec.name),
                )
                .with_operation(&op.id),
                other => expr_error(other, op),
            })?;
            totals.insert(spec.name.clone(), value);
        }
    }

    // Materialize groups from the final row values, then canonicalize
    // the whole result at the boundary.
    let groups = groups
        .into_iter()
        .zip(group_aggregates)
        .map(|((key, indices), aggregates)| GroupResult {
            key,
            rows: indices.iter().map(|&i| rows[i].clone()).collect(),
            aggregates,
        })
        .collect::<Vec<_>>();

    let mut bindings: BTreeMap<String, Value> = variables
        .iter()
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    for (name, items) in collections {
        if name == pipeline.source {
            bindings.insert(name, Value::Array(rows.clone()));
        } else {
            bindings.insert(name, Value::Array(items));
        }
    }

    let mut result =
        EvaluationResult { output: rows, groups, aggregates, totals, bindings };
    canonicalize_result(&mut result);
    Ok(result)
}

// --- Stage helpers ---

struct Env<'a> {
    variables: &'a HashMap<String, Value>,
    functions: &'a FunctionRegistry,
}

impl<'a> Env<'a> {
    fn ctx<'b>(&'b self, scope: &'b Value) -> EvaluationContext<'b> {
        EvaluationContext { scope, variables: self.variables, functions: self.functions }
    }
}

fn ops_of<'a>(
    pipeline: &'a facture_template::TransformPipeline,
    kind: &'static str,
) -> impl Iterator<Item = &'a Operation> {
    pipeline.operations.iter().filter(move |op| op.kind.kind() == kind)
}

fn expr_error(e: ExprError, op: &Operation) -> EvaluationError {
    match e {
        ExprError::Unresolved(name) => EvaluationError::new(
            EvaluationCode::MissingBinding,
            format!("expression references unresolved binding '{name}'"),
        )
        .with_operation(&op.id),
        other => EvaluationError::new(EvaluationCode::InvalidTransformInput, other.to_string())
            .with_operation(&op.id),
    }
}

/// Predicates never fail on absent data: an unresolved operand makes
/// the enclosing comparison false.
fn eval_predicate(predicate: &Predicate, ctx: &EvaluationContext) -> Result<bool, ExprError> {
    match predicate {
        Predicate::And(conditions) => {
            for c in conditions {
                if !eval_predicate(c, ctx)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Predicate::Or(conditions) => {
            for c in conditions {
                if eval_predicate(c, ctx)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Predicate::Not(inner) => Ok(!eval_predicate(inner, ctx)?),
        Predicate::Compare { left, op, right } => {
            let lhs = match eval_expr(left, ctx) {
                Ok(v) => v,
                Err(ExprError::Unresolved(_)) => return Ok(false),
                Err(e) => return Err(e),
            };
            let rhs = match eval_expr(right, ctx) {
                Ok(v) => v,
                Err(ExprError::Unresolved(_)) => return Ok(false),
                Err(e) => return Err(e),
            };
            Ok(compare_values(&lhs, &rhs, *op))
        }
    }
}

fn compare_values(lhs: &Value, rhs: &Value, op: CompareOp) -> bool {
    match op {
        CompareOp::Eq | CompareOp::Ne => {
            let equal = match (lhs.as_f64(), rhs.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => lhs == rhs,
            };
            (op == CompareOp::Eq) == equal
        }
        CompareOp::Lt | CompareOp::Le | CompareOp::Gt | CompareOp::Ge => {
            let ordering = match (lhs, rhs) {
                (Value::String(a), Value::String(b)) => a.cmp(b),
                _ => match (lhs.as_f64(), rhs.as_f64()) {
                    (Some(a), Some(b)) => match a.partial_cmp(&b) {
                        Some(o) => o,
                        None => return false,
                    },
                    // Ordering across mismatched types is always false.
                    _ => return false,
                },
            };
            match op {
                CompareOp::Lt => ordering == Ordering::Less,
                CompareOp::Le => ordering != Ordering::Greater,
                CompareOp::Gt => ordering == Ordering::Greater,
                CompareOp::Ge => ordering != Ordering::Less,
                _ => unreachable!(),
            }
        }
    }
}

/// Stable multi-key sort; ties fall back to the original input index so
/// repeated evaluation of identical input yields identical order.
fn sort_rows(
    rows: Vec<Value>,
    keys: &[facture_template::SortKey],
    env: &Env,
    op: &Operation,
) -> Result<Vec<Value>, EvaluationError> {
    let mut keyed: Vec<(usize, Vec<Value>, Value)> = Vec::with_capacity(rows.len());
    for (index, row) in rows.into_iter().enumerate() {
        let mut row_keys = Vec::with_capacity(keys.len());
        for key in keys {
            let value = match eval_expr(&key.expr, &env.ctx(&row)) {
                Ok(v) => v,
                Err(ExprError::Unresolved(_)) => Value::Null,
                Err(e) => return Err(expr_error(e, op)),
            };
            row_keys.push(value);
        }
        keyed.push((index, row_keys, row));
    }
    keyed.sort_by(|(ia, ka, _), (ib, kb, _)| {
        for (key, (a, b)) in keys.iter().zip(ka.iter().zip(kb)) {
            let ordering = match key.direction {
                SortDirection::Asc => cmp_values(a, b),
                SortDirection::Desc => cmp_values(b, a),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        ia.cmp(ib)
    });
    Ok(keyed.into_iter().map(|(_, _, row)| row).collect())
}

/// A total order over JSON values: nulls, then booleans, numbers,
/// strings, and finally composites by serialized form.
fn cmp_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(f64::NAN), y.as_f64().unwrap_or(f64::NAN));
            x.total_cmp(&y)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(_) | Value::Object(_), Value::Array(_) | Value::Object(_))
            if rank(a) == rank(b) =>
        {
            a.to_string().cmp(&b.to_string())
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Partitions rows by key expression or strategy, preserving first-seen
/// group order.
fn group_rows(
    rows: &[Value],
    key: Option<&Expression>,
    op: &Operation,
    env: &Env,
    registry: &StrategyRegistry,
) -> Result<Vec<(Value, Vec<usize>)>, EvaluationError> {
    let mut partitions: IndexMap<String, (Value, Vec<usize>)> = IndexMap::new();
    for (index, row) in rows.iter().enumerate() {
        let key_value = match key {
            Some(expr) => Some(eval_expr(expr, &env.ctx(row)).map_err(|e| expr_error(e, op))?),
            None => None,
        };
        let group_key = match op.strategy_id.as_deref() {
            Some(id) => registry
                .execute(id, &StrategyInput::GroupKey { row, key: key_value.as_ref() })
                .map_err(|e| {
                    EvaluationError::new(EvaluationCode::StrategyExecutionFailed, e.to_string())
                        .with_operation(&op.id)
                })?,
            None => key_value.unwrap_or(Value::Null),
        };
        if group_key.is_array() || group_key.is_object() {
            return Err(EvaluationError::new(
                EvaluationCode::InvalidTransformInput,
                format!("grouping on a non-scalar key {group_key}"),
            )
            .with_operation(&op.id));
        }
        partitions
            .entry(group_key.to_string())
            .or_insert_with(|| (group_key, Vec::new()))
            .1
            .push(index);
    }
    Ok(partitions.into_values().collect())
}

/// Resolves an aggregation operand over the given row indices; rows
/// where the operand is absent or null are skipped.
fn operand_values(
    rows: &[Value],
    indices: Vec<usize>,
    agg: &Aggregation,
    env: &Env,
    op: &Operation,
) -> Result<Vec<Value>, EvaluationError> {
    let mut values = Vec::with_capacity(indices.len());
    for index in indices {
        match eval_expr(&agg.operand, &env.ctx(&rows[index])) {
            Ok(Value::Null) | Err(ExprError::Unresolved(_)) => {}
            Ok(v) => values.push(v),
            Err(e) => return Err(expr_error(e, op)),
        }
    }
    Ok(values)
}

fn fold(
    agg: &Aggregation,
    values: &[Value],
    op: &Operation,
    registry: &StrategyRegistry,
) -> Result<Value, EvaluationError> {
    if let Some(id) = op.strategy_id.as_deref() {
        return registry.execute(id, &StrategyInput::Aggregate { values }).map_err(|e| {
            EvaluationError::new(EvaluationCode::StrategyExecutionFailed, e.to_string())
                .with_operation(&op.id)
        });
    }

    if agg.func == AggregateFn::Count {
        return Ok(json!(values.len() as f64));
    }
    let mut nums = Vec::with_capacity(values.len());
    for v in values {
        match v.as_f64() {
            Some(n) => nums.push(n),
            None => {
                return Err(EvaluationError::new(
                    EvaluationCode::InvalidOperand,
                    format!("aggregate '{}' requires numeric operands, got {v}", agg.name),
                )
                .with_operation(&op.id));
            }
        }
    }
    let folded = match agg.func {
        AggregateFn::Sum => json!(nums.iter().sum::<f64>()),
        AggregateFn::Avg if nums.is_empty() => Value::Null,
        AggregateFn::Avg => json!(nums.iter().sum::<f64>() / nums.len() as f64),
        AggregateFn::Min => {
            nums.iter().copied().reduce(f64::min).map(|n| json!(n)).unwrap_or(Value::Null)
        }
        AggregateFn::Max => {
            nums.iter().copied().reduce(f64::max).map(|n| json!(n)).unwrap_or(Value::Null)
        }
        AggregateFn::Count => unreachable!(),
    };
    Ok(folded)
}

fn canonicalize_result(result: &mut EvaluationResult) {
    for row in &mut result.output {
        canonicalize(row);
    }
    for group in &mut result.groups {
        canonicalize(&mut group.key);
        for row in &mut group.rows {
            canonicalize(row);
        }
        for value in group.aggregates.values_mut() {
            canonicalize(value);
        }
    }
    for value in result.aggregates.values_mut() {
        canonicalize(value);
    }
    for value in result.totals.values_mut() {
        canonicalize(value);
    }
    for value in result.bindings.values_mut() {
        canonicalize(value);
    }
}
