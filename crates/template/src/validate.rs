//! Structural validation of a template description.
//!
//! The validator walks the raw JSON document once, building the typed
//! model while collecting every defect it finds. It is strict: unknown
//! fields anywhere in the structure are rejected, every invariant of
//! the data model is enforced, and a template is only returned when the
//! issue list is empty. The `version` gate runs before everything else.

use crate::error::TemplateError;
use crate::issue::{Issue, IssueCode};
use crate::model::*;
use facture_expr::{Expression, Selection, parse_expression};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// A template that passed structural validation. Only this module can
/// construct one, so holding a `ValidatedTemplate` is proof the
/// description satisfied every invariant.
#[derive(Debug, Clone)]
pub struct ValidatedTemplate(Template);

impl std::ops::Deref for ValidatedTemplate {
    type Target = Template;
    fn deref(&self) -> &Template {
        &self.0
    }
}

impl ValidatedTemplate {
    pub fn template(&self) -> &Template {
        &self.0
    }
}

/// Validates a parsed template description, reporting every structural
/// defect found.
pub fn validate(value: &Value) -> Result<ValidatedTemplate, Vec<Issue>> {
    let mut v = Validator::default();
    let template = v.root(value);
    if v.issues.is_empty() {
        log::debug!("template '{}' validated", template.metadata.name);
        Ok(ValidatedTemplate(template))
    } else {
        log::warn!("template validation failed with {} issue(s)", v.issues.len());
        Err(v.issues)
    }
}

/// Parses and validates template source text, consolidating any issues
/// into a single error.
pub fn validate_str(source: &str) -> Result<ValidatedTemplate, TemplateError> {
    let value: Value = serde_json::from_str(source)?;
    validate(&value).map_err(TemplateError::Validation)
}

#[derive(Default)]
struct Validator {
    issues: Vec<Issue>,
}

const ROOT_FIELDS: &[&str] =
    &["kind", "version", "metadata", "styles", "bindings", "transforms", "layout"];

impl Validator {
    fn issue(&mut self, code: IssueCode, path: &str, message: impl Into<String>) {
        self.issues.push(Issue::new(code, path, message));
    }

    // --- Root ---

    fn root(&mut self, value: &Value) -> Template {
        let Some(map) = value.as_object() else {
            self.issue(IssueCode::InvalidType, "", "template description must be an object");
            return placeholder_template();
        };

        // The kind/version gate runs before any other validation.
        match map.get("kind").and_then(Value::as_str) {
            Some(TEMPLATE_KIND) => {}
            Some(other) => {
                self.issue(
                    IssueCode::UnsupportedKind,
                    "kind",
                    format!("expected '{TEMPLATE_KIND}', got '{other}'"),
                );
                return placeholder_template();
            }
            None => {
                self.issue(IssueCode::MissingField, "kind", "missing discriminator field");
                return placeholder_template();
            }
        }
        match map.get("version").and_then(Value::as_u64) {
            Some(TEMPLATE_VERSION) => {}
            Some(other) => {
                self.issue(
                    IssueCode::UnsupportedVersion,
                    "version",
                    format!("only version {TEMPLATE_VERSION} is accepted, got {other}"),
                );
                return placeholder_template();
            }
            None => {
                self.issue(IssueCode::MissingField, "version", "missing integer version");
                return placeholder_template();
            }
        }

        self.check_unknown(map, "", ROOT_FIELDS);

        let metadata = match map.get("metadata") {
            Some(v) => self.metadata(v),
            None => {
                self.issue(IssueCode::MissingField, "metadata", "missing field");
                Metadata::default()
            }
        };
        let styles = match map.get("styles") {
            Some(v) => self.styles(v),
            None => {
                self.issue(IssueCode::MissingField, "styles", "missing field");
                StyleCatalog::default()
            }
        };
        let bindings = match map.get("bindings") {
            Some(v) => self.bindings(v),
            None => {
                self.issue(IssueCode::MissingField, "bindings", "missing field");
                BindingCatalog::default()
            }
        };
        let transforms = match map.get("transforms") {
            Some(v) => self.transforms(v, &bindings),
            None => {
                self.issue(IssueCode::MissingField, "transforms", "missing field");
                TransformPipeline { source: String::new(), operations: Vec::new() }
            }
        };

        // Names a `totals` layout node may legally reference.
        let total_names: HashSet<&str> = transforms
            .operations
            .iter()
            .filter_map(|op| match &op.kind {
                OperationKind::TotalsCompose { totals } => Some(totals),
                _ => None,
            })
            .flatten()
            .map(|t| t.name.as_str())
            .collect();

        let layout = match map.get("layout") {
            Some(v) => self.layout_root(v, &styles, &bindings, &total_names),
            None => {
                self.issue(IssueCode::MissingField, "layout", "missing field");
                LayoutNode::Document { classes: Vec::new(), children: Vec::new() }
            }
        };

        Template { metadata, styles, bindings, transforms, layout }
    }

    // --- Metadata ---

    fn metadata(&mut self, value: &Value) -> Metadata {
        let Some(map) = self.object(value, "metadata") else {
            return Metadata::default();
        };
        self.check_unknown(map, "metadata", &["name", "description", "locale"]);
        Metadata {
            name: self.required_string(map, "metadata", "name").unwrap_or_default(),
            description: self.optional_string(map, "metadata", "description"),
            locale: self.optional_string(map, "metadata", "locale"),
        }
    }

    // --- Styles ---

    fn styles(&mut self, value: &Value) -> StyleCatalog {
        let Some(map) = self.object(value, "styles") else {
            return StyleCatalog::default();
        };
        self.check_unknown(map, "styles", &["tokens", "classes"]);

        let mut catalog = StyleCatalog::default();
        if let Some(tokens) = map.get("tokens")
            && let Some(tokens) = self.object(tokens, "styles.tokens")
        {
            for (name, v) in tokens {
                let path = format!("styles.tokens.{name}");
                self.check_name(name, &path);
                match scalar_text(v) {
                    Some(text) => {
                        catalog.tokens.insert(name.clone(), text);
                    }
                    None => self.issue(
                        IssueCode::InvalidType,
                        &path,
                        "token value must be a string or number",
                    ),
                }
            }
        }
        if let Some(classes) = map.get("classes")
            && let Some(classes) = self.object(classes, "styles.classes")
        {
            for (name, v) in classes {
                let path = format!("styles.classes.{name}");
                self.check_name(name, &path);
                let mut class = StyleClass::default();
                if let Some(decls) = self.object(v, &path) {
                    for (prop, raw) in decls {
                        let prop_path = format!("{path}.{prop}");
                        match scalar_text(raw) {
                            Some(text) => {
                                if let Some(token) = text.strip_prefix('$')
                                    && !catalog.tokens.contains_key(token)
                                {
                                    self.issue(
                                        IssueCode::UnknownToken,
                                        &prop_path,
                                        format!("style token '{token}' is not declared"),
                                    );
                                }
                                class.declarations.insert(prop.clone(), text);
                            }
                            None => self.issue(
                                IssueCode::InvalidType,
                                &prop_path,
                                "declaration value must be a string or number",
                            ),
                        }
                    }
                }
                catalog.classes.insert(name.clone(), class);
            }
        }
        catalog
    }

    // --- Bindings ---

    fn bindings(&mut self, value: &Value) -> BindingCatalog {
        let Some(map) = self.object(value, "bindings") else {
            return BindingCatalog::default();
        };
        self.check_unknown(map, "bindings", &["values", "collections"]);

        let mut catalog = BindingCatalog::default();
        if let Some(values) = map.get("values")
            && let Some(values) = self.object(values, "bindings.values")
        {
            for (name, v) in values {
                let path = format!("bindings.values.{name}");
                self.check_name(name, &path);
                let Some(decl) = self.object(v, &path) else { continue };
                self.check_unknown(decl, &path, &["path", "required"]);
                let Some(sel) = self.data_path(decl, &path) else { continue };
                let required = match decl.get("required") {
                    None => true,
                    Some(Value::Bool(b)) => *b,
                    Some(_) => {
                        self.issue(
                            IssueCode::InvalidType,
                            &format!("{path}.required"),
                            "must be a boolean",
                        );
                        true
                    }
                };
                catalog.values.insert(name.clone(), ValueBinding { path: sel, required });
            }
        }
        if let Some(collections) = map.get("collections")
            && let Some(collections) = self.object(collections, "bindings.collections")
        {
            for (name, v) in collections {
                let path = format!("bindings.collections.{name}");
                self.check_name(name, &path);
                if catalog.values.contains_key(name) {
                    self.issue(
                        IssueCode::DuplicateName,
                        &path,
                        "name already declared as a value binding",
                    );
                }
                let Some(decl) = self.object(v, &path) else { continue };
                self.check_unknown(decl, &path, &["path"]);
                if let Some(sel) = self.data_path(decl, &path) {
                    catalog.collections.insert(name.clone(), CollectionBinding { path: sel });
                }
            }
        }
        catalog
    }

    /// Parses a binding's `path` field: a plain dotted/indexed path into
    /// the dataset, with no variables, functions, or arithmetic.
    fn data_path(&mut self, map: &Map<String, Value>, path: &str) -> Option<Selection> {
        let field = format!("{path}.path");
        let raw = self.required_string(map, path, "path")?;
        match parse_expression(&raw) {
            Ok(Expression::Selection(sel @ Selection::Path(_))) => Some(sel),
            Ok(_) => {
                self.issue(IssueCode::InvalidExpression, &field, "must be a plain data path");
                None
            }
            Err(e) => {
                self.issue(IssueCode::InvalidExpression, &field, e.to_string());
                None
            }
        }
    }

    // --- Transforms ---

    fn transforms(&mut self, value: &Value, bindings: &BindingCatalog) -> TransformPipeline {
        let empty = TransformPipeline { source: String::new(), operations: Vec::new() };
        let Some(map) = self.object(value, "transforms") else { return empty };
        self.check_unknown(map, "transforms", &["source", "operations"]);

        let source = self.required_string(map, "transforms", "source").unwrap_or_default();
        if !source.is_empty() && !bindings.collections.contains_key(&source) {
            self.issue(
                IssueCode::UnknownBinding,
                "transforms.source",
                format!("'{source}' is not a declared collection binding"),
            );
        }

        let mut seen_ids = HashSet::new();
        let operations = self
            .non_empty_array(map, "transforms", "operations", |v, item, path| {
                let op = v.operation(item, path)?;
                if !seen_ids.insert(op.id.clone()) {
                    v.issue(
                        IssueCode::DuplicateName,
                        &format!("{path}.id"),
                        format!("operation id '{}' is already used", op.id),
                    );
                }
                Some(op)
            })
            .unwrap_or_default();

        TransformPipeline { source, operations }
    }

    fn operation(&mut self, value: &Value, path: &str) -> Option<Operation> {
        let map = self.object(value, path)?;
        let id = self.required_string(map, path, "id").unwrap_or_default();
        let strategy_id = self.optional_string(map, path, "strategyId");
        let kind_name = self.required_string(map, path, "kind")?;

        let base = ["id", "kind", "strategyId"];
        let kind = match kind_name.as_str() {
            "filter" => {
                self.check_unknown(map, path, &[&base[..], &["predicate"]].concat());
                let predicate = match map.get("predicate") {
                    Some(v) => self.predicate(v, &format!("{path}.predicate")),
                    None => {
                        self.issue(
                            IssueCode::MissingField,
                            &format!("{path}.predicate"),
                            "missing field",
                        );
                        None
                    }
                }?;
                OperationKind::Filter { predicate }
            }
            "sort" => {
                self.check_unknown(map, path, &[&base[..], &["keys"]].concat());
                let keys = self.non_empty_array(map, path, "keys", |v, item, item_path| {
                    let m = v.object(item, item_path)?;
                    v.check_unknown(m, item_path, &["expr", "direction"]);
                    let expr = v.required_expr(m, item_path, "expr")?;
                    let direction = match m.get("direction").and_then(Value::as_str) {
                        None | Some("asc") => SortDirection::Asc,
                        Some("desc") => SortDirection::Desc,
                        Some(other) => {
                            v.issue(
                                IssueCode::InvalidValue,
                                &format!("{item_path}.direction"),
                                format!("expected 'asc' or 'desc', got '{other}'"),
                            );
                            SortDirection::Asc
                        }
                    };
                    Some(SortKey { expr, direction })
                })?;
                OperationKind::Sort { keys }
            }
            "group" => {
                self.check_unknown(map, path, &[&base[..], &["key"]].concat());
                let key = match map.get("key") {
                    Some(_) => Some(self.required_expr(map, path, "key")?),
                    None => None,
                };
                if key.is_none() && strategy_id.is_none() {
                    self.issue(
                        IssueCode::MissingField,
                        &format!("{path}.key"),
                        "group requires a key expression or a strategyId",
                    );
                }
                OperationKind::Group { key }
            }
            "aggregate" => {
                self.check_unknown(map, path, &[&base[..], &["aggregations"]].concat());
                let aggregations =
                    self.non_empty_array(map, path, "aggregations", |v, item, item_path| {
                        let m = v.object(item, item_path)?;
                        v.check_unknown(m, item_path, &["name", "fn", "operand"]);
                        let name = v.required_string(m, item_path, "name")?;
                        let func = match v.required_string(m, item_path, "fn")?.as_str() {
                            "sum" => AggregateFn::Sum,
                            "count" => AggregateFn::Count,
                            "avg" => AggregateFn::Avg,
                            "min" => AggregateFn::Min,
                            "max" => AggregateFn::Max,
                            other => {
                                v.issue(
                                    IssueCode::InvalidValue,
                                    &format!("{item_path}.fn"),
                                    format!("unknown aggregate function '{other}'"),
                                );
                                return None;
                            }
                        };
                        let operand = v.required_expr(m, item_path, "operand")?;
                        Some(Aggregation { name, func, operand })
                    })?;
                OperationKind::Aggregate { aggregations }
            }
            "computed-field" => {
                self.check_unknown(map, path, &[&base[..], &["fields"]].concat());
                let fields = self.non_empty_array(map, path, "fields", |v, item, item_path| {
                    let m = v.object(item, item_path)?;
                    v.check_unknown(m, item_path, &["name", "expr"]);
                    Some(ComputedField {
                        name: v.required_string(m, item_path, "name")?,
                        expr: v.required_expr(m, item_path, "expr")?,
                    })
                })?;
                OperationKind::ComputedField { fields }
            }
            "totals-compose" => {
                self.check_unknown(map, path, &[&base[..], &["totals"]].concat());
                let totals = self.non_empty_array(map, path, "totals", |v, item, item_path| {
                    let m = v.object(item, item_path)?;
                    v.check_unknown(m, item_path, &["name", "expr"]);
                    Some(TotalSpec {
                        name: v.required_string(m, item_path, "name")?,
                        expr: v.required_expr(m, item_path, "expr")?,
                    })
                })?;
                OperationKind::TotalsCompose { totals }
            }
            other => {
                self.issue(
                    IssueCode::UnsupportedKind,
                    &format!("{path}.kind"),
                    format!("unknown operation kind '{other}'"),
                );
                return None;
            }
        };

        // Only group and aggregate consume a strategy; accepting one
        // elsewhere would let it be silently ignored.
        if strategy_id.is_some()
            && !matches!(kind, OperationKind::Group { .. } | OperationKind::Aggregate { .. })
        {
            self.issue(
                IssueCode::InvalidValue,
                &format!("{path}.strategyId"),
                format!("'{}' operations do not take a strategy", kind.kind()),
            );
        }

        Some(Operation { id, strategy_id, kind })
    }

    fn predicate(&mut self, value: &Value, path: &str) -> Option<Predicate> {
        let map = self.object(value, path)?;
        let kind = self.required_string(map, path, "kind")?;
        match kind.as_str() {
            "and" | "or" => {
                self.check_unknown(map, path, &["kind", "conditions"]);
                let conditions = self
                    .non_empty_array(map, path, "conditions", |v, item, p| v.predicate(item, p))?;
                Some(if kind == "and" {
                    Predicate::And(conditions)
                } else {
                    Predicate::Or(conditions)
                })
            }
            "not" => {
                self.check_unknown(map, path, &["kind", "condition"]);
                let inner = match map.get("condition") {
                    Some(v) => self.predicate(v, &format!("{path}.condition")),
                    None => {
                        self.issue(
                            IssueCode::MissingField,
                            &format!("{path}.condition"),
                            "missing field",
                        );
                        None
                    }
                }?;
                Some(Predicate::Not(Box::new(inner)))
            }
            "compare" => {
                self.check_unknown(map, path, &["kind", "left", "op", "right"]);
                let left = self.required_expr(map, path, "left")?;
                let op = match self.required_string(map, path, "op")?.as_str() {
                    "eq" => CompareOp::Eq,
                    "ne" => CompareOp::Ne,
                    "lt" => CompareOp::Lt,
                    "le" => CompareOp::Le,
                    "gt" => CompareOp::Gt,
                    "ge" => CompareOp::Ge,
                    other => {
                        self.issue(
                            IssueCode::InvalidValue,
                            &format!("{path}.op"),
                            format!("unknown comparison operator '{other}'"),
                        );
                        return None;
                    }
                };
                let right = self.required_expr(map, path, "right")?;
                Some(Predicate::Compare { left, op, right })
            }
            other => {
                self.issue(
                    IssueCode::UnsupportedKind,
                    &format!("{path}.kind"),
                    format!("unknown predicate kind '{other}'"),
                );
                None
            }
        }
    }

    // --- Layout ---

    fn layout_root(
        &mut self,
        value: &Value,
        styles: &StyleCatalog,
        bindings: &BindingCatalog,
        total_names: &HashSet<&str>,
    ) -> LayoutNode {
        self.layout_node(value, "layout", true, styles, bindings, total_names)
            .unwrap_or(LayoutNode::Document { classes: Vec::new(), children: Vec::new() })
    }

    fn layout_node(
        &mut self,
        value: &Value,
        path: &str,
        is_root: bool,
        styles: &StyleCatalog,
        bindings: &BindingCatalog,
        total_names: &HashSet<&str>,
    ) -> Option<LayoutNode> {
        let map = self.object(value, path)?;
        let kind = self.required_string(map, path, "kind")?;

        if is_root && kind != "document" {
            self.issue(
                IssueCode::UnsupportedKind,
                &format!("{path}.kind"),
                format!("layout root must be a 'document' node, got '{kind}'"),
            );
            return None;
        }
        if !is_root && kind == "document" {
            self.issue(
                IssueCode::UnsupportedKind,
                &format!("{path}.kind"),
                "'document' is only allowed at the layout root",
            );
            return None;
        }

        let classes = self.classes(map, path, styles);
        let base = ["kind", "classes"];

        let node = match kind.as_str() {
            "document" => {
                self.check_unknown(map, path, &[&base[..], &["children"]].concat());
                let children = self.children(map, path, styles, bindings, total_names);
                LayoutNode::Document { classes, children }
            }
            "section" => {
                self.check_unknown(map, path, &[&base[..], &["children"]].concat());
                let children = self.children(map, path, styles, bindings, total_names);
                LayoutNode::Section { classes, children }
            }
            "stack" => {
                self.check_unknown(map, path, &[&base[..], &["direction", "children"]].concat());
                let direction = match map.get("direction").and_then(Value::as_str) {
                    None | Some("vertical") => StackDirection::Vertical,
                    Some("horizontal") => StackDirection::Horizontal,
                    Some(other) => {
                        self.issue(
                            IssueCode::InvalidValue,
                            &format!("{path}.direction"),
                            format!("expected 'vertical' or 'horizontal', got '{other}'"),
                        );
                        StackDirection::Vertical
                    }
                };
                let children = self.children(map, path, styles, bindings, total_names);
                LayoutNode::Stack { classes, direction, children }
            }
            "text" => {
                self.check_unknown(map, path, &[&base[..], &["content"]].concat());
                let content = match map.get("content") {
                    Some(Value::String(s)) => s.clone(),
                    Some(_) => {
                        self.issue(
                            IssueCode::InvalidType,
                            &format!("{path}.content"),
                            "must be a string",
                        );
                        String::new()
                    }
                    None => {
                        self.issue(
                            IssueCode::MissingField,
                            &format!("{path}.content"),
                            "missing field",
                        );
                        String::new()
                    }
                };
                LayoutNode::Text { classes, content }
            }
            "field" => {
                self.check_unknown(map, path, &[&base[..], &["binding", "label"]].concat());
                let binding = self.required_string(map, path, "binding").unwrap_or_default();
                if !binding.is_empty() && !bindings.values.contains_key(&binding) {
                    self.issue(
                        IssueCode::UnknownBinding,
                        &format!("{path}.binding"),
                        format!("'{binding}' is not a declared value binding"),
                    );
                }
                let label = self.optional_string(map, path, "label");
                LayoutNode::Field { classes, binding, label }
            }
            "image" => {
                self.check_unknown(map, path, &[&base[..], &["src", "alt"]].concat());
                let src = match map.get("src") {
                    Some(Value::String(url)) => Some(ImageSource::Url(url.clone())),
                    Some(Value::Object(src_map)) => {
                        let src_path = format!("{path}.src");
                        self.check_unknown(src_map, &src_path, &["binding"]);
                        let binding =
                            self.required_string(src_map, &src_path, "binding").unwrap_or_default();
                        if !binding.is_empty() && !bindings.values.contains_key(&binding) {
                            self.issue(
                                IssueCode::UnknownBinding,
                                &format!("{src_path}.binding"),
                                format!("'{binding}' is not a declared value binding"),
                            );
                        }
                        Some(ImageSource::Binding(binding))
                    }
                    Some(_) => {
                        self.issue(
                            IssueCode::InvalidType,
                            &format!("{path}.src"),
                            "must be a URL string or a binding reference object",
                        );
                        None
                    }
                    None => {
                        self.issue(IssueCode::MissingField, &format!("{path}.src"), "missing field");
                        None
                    }
                };
                LayoutNode::Image {
                    classes,
                    src: src.unwrap_or(ImageSource::Url(String::new())),
                    alt: self.optional_string(map, path, "alt"),
                }
            }
            "divider" => {
                self.check_unknown(map, path, &base);
                LayoutNode::Divider { classes }
            }
            "table" => {
                self.check_unknown(map, path, &[&base[..], &["columns", "rows"]].concat());
                let columns = self.string_array(map, path, "columns");
                let rows = self.static_rows(map, path);
                LayoutNode::Table { classes, columns, rows }
            }
            "dynamic-table" => {
                self.check_unknown(map, path, &[&base[..], &["repeat", "columns"]].concat());
                let repeat = self.repeat_binding(map, path, bindings);
                let columns = self.non_empty_array(map, path, "columns", |v, item, item_path| {
                    let m = v.object(item, item_path)?;
                    v.check_unknown(m, item_path, &["header", "cell"]);
                    Some(DynamicColumn {
                        header: v.required_string(m, item_path, "header")?,
                        cell: v.required_expr(m, item_path, "cell")?,
                    })
                });
                LayoutNode::DynamicTable {
                    classes,
                    repeat: repeat?,
                    columns: columns.unwrap_or_default(),
                }
            }
            "totals" => {
                self.check_unknown(map, path, &[&base[..], &["entries"]].concat());
                let entries = match map.get("entries") {
                    None => None,
                    Some(_) => {
                        let names = self.string_array(map, path, "entries");
                        for (i, name) in names.iter().enumerate() {
                            if !total_names.contains(name.as_str()) {
                                self.issue(
                                    IssueCode::UnknownBinding,
                                    &format!("{path}.entries[{i}]"),
                                    format!("'{name}' is not a composed total"),
                                );
                            }
                        }
                        Some(names)
                    }
                };
                LayoutNode::Totals { classes, entries }
            }
            other => {
                self.issue(
                    IssueCode::UnsupportedKind,
                    &format!("{path}.kind"),
                    format!("unknown layout node kind '{other}'"),
                );
                return None;
            }
        };
        Some(node)
    }

    fn static_rows(&mut self, map: &Map<String, Value>, path: &str) -> Vec<Vec<String>> {
        let rows_path = format!("{path}.rows");
        match map.get("rows") {
            Some(Value::Array(items)) => {
                let mut rows = Vec::with_capacity(items.len());
                for (i, row) in items.iter().enumerate() {
                    let row_path = format!("{rows_path}[{i}]");
                    match row {
                        Value::Array(cells) => {
                            let mut out = Vec::with_capacity(cells.len());
                            for (j, cell) in cells.iter().enumerate() {
                                match scalar_text(cell) {
                                    Some(text) => out.push(text),
                                    None => self.issue(
                                        IssueCode::InvalidType,
                                        &format!("{row_path}[{j}]"),
                                        "cell must be a string or number",
                                    ),
                                }
                            }
                            rows.push(out);
                        }
                        _ => self.issue(
                            IssueCode::InvalidType,
                            &row_path,
                            "row must be an array of cells",
                        ),
                    }
                }
                rows
            }
            Some(_) => {
                self.issue(IssueCode::InvalidType, &rows_path, "must be an array");
                Vec::new()
            }
            None => {
                self.issue(IssueCode::MissingField, &rows_path, "missing field");
                Vec::new()
            }
        }
    }

    /// Both repeat fields are mandatory; each missing one is reported
    /// at its own path so editors can jump straight to it.
    fn repeat_binding(
        &mut self,
        map: &Map<String, Value>,
        path: &str,
        bindings: &BindingCatalog,
    ) -> Option<RepeatBinding> {
        let repeat_path = format!("{path}.repeat");
        let Some(repeat) = map.get("repeat") else {
            self.issue(
                IssueCode::MissingField,
                &format!("{repeat_path}.sourceBinding"),
                "dynamic-table requires repeat metadata",
            );
            self.issue(
                IssueCode::MissingField,
                &format!("{repeat_path}.itemBinding"),
                "dynamic-table requires repeat metadata",
            );
            return None;
        };
        let repeat = self.object(repeat, &repeat_path)?;
        self.check_unknown(repeat, &repeat_path, &["sourceBinding", "itemBinding"]);
        let source_binding = self.required_string(repeat, &repeat_path, "sourceBinding");
        let item_binding = self.required_string(repeat, &repeat_path, "itemBinding");
        let (source_binding, item_binding) = (source_binding?, item_binding?);
        if !bindings.collections.contains_key(&source_binding) {
            self.issue(
                IssueCode::UnknownBinding,
                &format!("{repeat_path}.sourceBinding"),
                format!("'{source_binding}' is not a declared collection binding"),
            );
        }
        Some(RepeatBinding { source_binding, item_binding })
    }

    fn children(
        &mut self,
        map: &Map<String, Value>,
        path: &str,
        styles: &StyleCatalog,
        bindings: &BindingCatalog,
        total_names: &HashSet<&str>,
    ) -> Vec<LayoutNode> {
        match map.get("children") {
            Some(Value::Array(items)) => {
                let mut children = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let child_path = format!("{path}.children[{i}]");
                    if let Some(node) =
                        self.layout_node(item, &child_path, false, styles, bindings, total_names)
                    {
                        children.push(node);
                    }
                }
                children
            }
            Some(_) => {
                self.issue(IssueCode::InvalidType, &format!("{path}.children"), "must be an array");
                Vec::new()
            }
            None => {
                self.issue(IssueCode::MissingField, &format!("{path}.children"), "missing field");
                Vec::new()
            }
        }
    }

    fn classes(
        &mut self,
        map: &Map<String, Value>,
        path: &str,
        styles: &StyleCatalog,
    ) -> Vec<String> {
        match map.get("classes") {
            None => Vec::new(),
            Some(_) => {
                let names = self.string_array(map, path, "classes");
                for (i, name) in names.iter().enumerate() {
                    if !styles.classes.contains_key(name) {
                        self.issue(
                            IssueCode::UnknownClass,
                            &format!("{path}.classes[{i}]"),
                            format!("style class '{name}' is not declared"),
                        );
                    }
                }
                names
            }
        }
    }

    // --- Generic helpers ---

    fn object<'a>(&mut self, value: &'a Value, path: &str) -> Option<&'a Map<String, Value>> {
        match value.as_object() {
            Some(map) => Some(map),
            None => {
                self.issue(IssueCode::InvalidType, path, "must be an object");
                None
            }
        }
    }

    fn check_unknown(&mut self, map: &Map<String, Value>, path: &str, allowed: &[&str]) {
        for key in map.keys() {
            if !allowed.contains(&key.as_str()) {
                let field_path = if path.is_empty() { key.clone() } else { format!("{path}.{key}") };
                self.issue(IssueCode::UnknownField, &field_path, "unknown field");
            }
        }
    }

    fn required_string(
        &mut self,
        map: &Map<String, Value>,
        path: &str,
        key: &str,
    ) -> Option<String> {
        let field_path = format!("{path}.{key}");
        match map.get(key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::String(_)) => {
                self.issue(IssueCode::InvalidValue, &field_path, "must not be empty");
                None
            }
            Some(_) => {
                self.issue(IssueCode::InvalidType, &field_path, "must be a string");
                None
            }
            None => {
                self.issue(IssueCode::MissingField, &field_path, "missing field");
                None
            }
        }
    }

    fn optional_string(
        &mut self,
        map: &Map<String, Value>,
        path: &str,
        key: &str,
    ) -> Option<String> {
        match map.get(key) {
            None => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                self.issue(IssueCode::InvalidType, &format!("{path}.{key}"), "must be a string");
                None
            }
        }
    }

    fn required_expr(
        &mut self,
        map: &Map<String, Value>,
        path: &str,
        key: &str,
    ) -> Option<Expression> {
        let raw = self.required_string(map, path, key)?;
        match parse_expression(&raw) {
            Ok(expr) => Some(expr),
            Err(e) => {
                self.issue(IssueCode::InvalidExpression, &format!("{path}.{key}"), e.to_string());
                None
            }
        }
    }

    fn string_array(&mut self, map: &Map<String, Value>, path: &str, key: &str) -> Vec<String> {
        let field_path = format!("{path}.{key}");
        match map.get(key) {
            Some(Value::Array(items)) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    match item.as_str() {
                        Some(s) => out.push(s.to_string()),
                        None => self.issue(
                            IssueCode::InvalidType,
                            &format!("{field_path}[{i}]"),
                            "must be a string",
                        ),
                    }
                }
                out
            }
            Some(_) => {
                self.issue(IssueCode::InvalidType, &field_path, "must be an array of strings");
                Vec::new()
            }
            None => {
                self.issue(IssueCode::MissingField, &field_path, "missing field");
                Vec::new()
            }
        }
    }

    /// Validates a required, non-empty array field, mapping each element
    /// through `parse_item`. Element failures are collected but do not
    /// stop the walk, so every defective element is reported.
    fn non_empty_array<T>(
        &mut self,
        map: &Map<String, Value>,
        path: &str,
        key: &str,
        mut parse_item: impl FnMut(&mut Self, &Value, &str) -> Option<T>,
    ) -> Option<Vec<T>> {
        let field_path = format!("{path}.{key}");
        match map.get(key) {
            Some(Value::Array(items)) if !items.is_empty() => {
                let mut out = Vec::with_capacity(items.len());
                let mut failed = false;
                for (i, item) in items.iter().enumerate() {
                    match parse_item(self, item, &format!("{field_path}[{i}]")) {
                        Some(t) => out.push(t),
                        None => failed = true,
                    }
                }
                if failed { None } else { Some(out) }
            }
            Some(Value::Array(_)) => {
                self.issue(IssueCode::EmptyList, &field_path, "must not be empty");
                None
            }
            Some(_) => {
                self.issue(IssueCode::InvalidType, &field_path, "must be an array");
                None
            }
            None => {
                self.issue(IssueCode::MissingField, &field_path, "missing field");
                None
            }
        }
    }

    fn check_name(&mut self, name: &str, path: &str) {
        if name.is_empty() || name.chars().any(|c| c.is_whitespace() || c == '"' || c == '\'') {
            self.issue(IssueCode::InvalidValue, path, "name must be non-empty with no whitespace");
        }
    }
}

/// Accepts string or numeric scalar content, normalized to text.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn placeholder_template() -> Template {
    Template {
        metadata: Metadata::default(),
        styles: StyleCatalog::default(),
        bindings: BindingCatalog::default(),
        transforms: TransformPipeline { source: String::new(), operations: Vec::new() },
        layout: LayoutNode::Document { classes: Vec::new(), children: Vec::new() },
    }
}
