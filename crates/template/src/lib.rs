//! Template description model and schema validation.
//!
//! A template description is a versioned, declarative JSON document:
//! metadata, a style token/class catalog, value and collection
//! bindings, a transform pipeline, and a layout tree. This crate owns
//! the typed model and the strict structural validator that is the only
//! way to obtain a [`ValidatedTemplate`].

pub mod error;
pub mod issue;
pub mod model;
mod validate;

// --- Public API ---
pub use error::TemplateError;
pub use issue::{Issue, IssueCode};
pub use model::*;
pub use validate::{ValidatedTemplate, validate, validate_str};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn minimal_template() -> Value {
        json!({
            "kind": "invoice-template",
            "version": 1,
            "metadata": { "name": "Minimal" },
            "styles": {
                "tokens": { "accent": "#336699" },
                "classes": { "title": { "color": "$accent", "font-size": "24px" } }
            },
            "bindings": {
                "values": { "invoiceNumber": { "path": "invoice.number" } },
                "collections": { "lineItems": { "path": "invoice.items" } }
            },
            "transforms": {
                "source": "lineItems",
                "operations": [
                    { "id": "sum-amounts", "kind": "aggregate", "aggregations": [
                        { "name": "amountSum", "fn": "sum", "operand": "amount" }
                    ]}
                ]
            },
            "layout": {
                "kind": "document",
                "children": [
                    { "kind": "text", "classes": ["title"], "content": "Invoice" },
                    { "kind": "field", "binding": "invoiceNumber", "label": "No." }
                ]
            }
        })
    }

    fn issue_paths(issues: &[Issue]) -> Vec<&str> {
        issues.iter().map(|i| i.path.as_str()).collect()
    }

    #[test]
    fn accepts_a_minimal_template() {
        let template = validate(&minimal_template()).expect("should validate");
        assert_eq!(template.metadata.name, "Minimal");
        assert_eq!(template.transforms.source, "lineItems");
        assert_eq!(template.layout.kind(), "document");
        assert_eq!(template.layout.children().len(), 2);
    }

    #[test]
    fn version_mismatch_is_rejected_before_anything_else() {
        let mut doc = minimal_template();
        doc["version"] = json!(2);
        // Break something else too; only the version issue may surface.
        doc["layout"] = json!(null);
        let issues = validate(&doc).unwrap_err();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, IssueCode::UnsupportedVersion);
        assert_eq!(issues[0].path, "version");
    }

    #[test]
    fn wrong_kind_discriminator_is_rejected() {
        let mut doc = minimal_template();
        doc["kind"] = json!("report-template");
        let issues = validate(&doc).unwrap_err();
        assert_eq!(issues[0].code, IssueCode::UnsupportedKind);
    }

    #[test]
    fn unknown_fields_are_rejected_everywhere() {
        let mut doc = minimal_template();
        doc["extra"] = json!(1);
        doc["metadata"]["author"] = json!("x");
        doc["layout"]["children"][0]["surprise"] = json!(true);
        let issues = validate(&doc).unwrap_err();
        let paths = issue_paths(&issues);
        assert!(paths.contains(&"extra"));
        assert!(paths.contains(&"metadata.author"));
        assert!(paths.contains(&"layout.children[0].surprise"));
        assert!(issues.iter().all(|i| i.code == IssueCode::UnknownField));
    }

    #[test]
    fn dynamic_table_without_repeat_fields_is_invalid() {
        let mut doc = minimal_template();
        doc["layout"]["children"]
            .as_array_mut()
            .unwrap()
            .push(json!({
                "kind": "dynamic-table",
                "repeat": { "sourceBinding": "lineItems" },
                "columns": [ { "header": "Amount", "cell": "$item.amount" } ]
            }));
        let issues = validate(&doc).unwrap_err();
        assert!(issues.iter().any(|i| {
            i.code == IssueCode::MissingField
                && i.path == "layout.children[2].repeat.itemBinding"
        }));
    }

    #[test]
    fn dynamic_table_without_repeat_block_reports_both_fields() {
        let mut doc = minimal_template();
        doc["layout"]["children"].as_array_mut().unwrap().push(json!({
            "kind": "dynamic-table",
            "columns": [ { "header": "Amount", "cell": "$item.amount" } ]
        }));
        let issues = validate(&doc).unwrap_err();
        let paths = issue_paths(&issues);
        assert!(paths.contains(&"layout.children[2].repeat.sourceBinding"));
        assert!(paths.contains(&"layout.children[2].repeat.itemBinding"));
    }

    #[test]
    fn empty_operation_list_is_rejected() {
        let mut doc = minimal_template();
        doc["transforms"]["operations"] = json!([]);
        let issues = validate(&doc).unwrap_err();
        assert!(issues.iter().any(|i| {
            i.code == IssueCode::EmptyList && i.path == "transforms.operations"
        }));
    }

    #[test]
    fn logical_predicate_needs_conditions() {
        let mut doc = minimal_template();
        doc["transforms"]["operations"].as_array_mut().unwrap().push(json!({
            "id": "f1", "kind": "filter",
            "predicate": { "kind": "and", "conditions": [] }
        }));
        let issues = validate(&doc).unwrap_err();
        assert!(issues.iter().any(|i| {
            i.code == IssueCode::EmptyList
                && i.path == "transforms.operations[1].predicate.conditions"
        }));
    }

    #[test]
    fn undeclared_style_token_is_reported() {
        let mut doc = minimal_template();
        doc["styles"]["classes"]["title"]["color"] = json!("$missingToken");
        let issues = validate(&doc).unwrap_err();
        assert!(issues.iter().any(|i| {
            i.code == IssueCode::UnknownToken && i.path == "styles.classes.title.color"
        }));
    }

    #[test]
    fn undeclared_class_reference_is_reported() {
        let mut doc = minimal_template();
        doc["layout"]["children"][0]["classes"] = json!(["nope"]);
        let issues = validate(&doc).unwrap_err();
        assert!(issues.iter().any(|i| i.code == IssueCode::UnknownClass));
    }

    #[test]
    fn transform_source_must_be_a_collection_binding() {
        let mut doc = minimal_template();
        doc["transforms"]["source"] = json!("invoiceNumber");
        let issues = validate(&doc).unwrap_err();
        assert!(issues.iter().any(|i| {
            i.code == IssueCode::UnknownBinding && i.path == "transforms.source"
        }));
    }

    #[test]
    fn invalid_expression_is_reported_with_path() {
        let mut doc = minimal_template();
        doc["transforms"]["operations"][0]["aggregations"][0]["operand"] = json!("amount +");
        let issues = validate(&doc).unwrap_err();
        assert!(issues.iter().any(|i| {
            i.code == IssueCode::InvalidExpression
                && i.path == "transforms.operations[0].aggregations[0].operand"
        }));
    }

    #[test]
    fn group_requires_key_or_strategy() {
        let mut doc = minimal_template();
        doc["transforms"]["operations"].as_array_mut().unwrap().push(json!({
            "id": "g1", "kind": "group"
        }));
        let issues = validate(&doc).unwrap_err();
        assert!(issues.iter().any(|i| {
            i.code == IssueCode::MissingField && i.path == "transforms.operations[1].key"
        }));
    }

    #[test]
    fn strategy_on_a_non_consuming_operation_is_rejected() {
        let mut doc = minimal_template();
        doc["transforms"]["operations"].as_array_mut().unwrap().push(json!({
            "id": "f1", "kind": "filter", "strategyId": "group/initial-letter",
            "predicate": {
                "kind": "compare", "left": "amount", "op": "ge", "right": "0"
            }
        }));
        let issues = validate(&doc).unwrap_err();
        assert!(issues.iter().any(|i| {
            i.code == IssueCode::InvalidValue
                && i.path == "transforms.operations[1].strategyId"
        }));
    }

    #[test]
    fn group_with_strategy_only_is_accepted() {
        let mut doc = minimal_template();
        doc["transforms"]["operations"].as_array_mut().unwrap().push(json!({
            "id": "g1", "kind": "group", "strategyId": "group/initial-letter"
        }));
        validate(&doc).expect("strategy-only group should validate");
    }

    #[test]
    fn nested_document_node_is_rejected() {
        let mut doc = minimal_template();
        doc["layout"]["children"].as_array_mut().unwrap().push(json!({
            "kind": "document", "children": []
        }));
        let issues = validate(&doc).unwrap_err();
        assert!(issues.iter().any(|i| i.path == "layout.children[2].kind"));
    }

    #[test]
    fn collecting_is_exhaustive_not_first_error() {
        let mut doc = minimal_template();
        doc["metadata"]["author"] = json!("x");
        doc["transforms"]["source"] = json!("invoiceNumber");
        doc["layout"]["children"][0]["classes"] = json!(["nope"]);
        let issues = validate(&doc).unwrap_err();
        assert!(issues.len() >= 3, "expected all defects reported, got {issues:?}");
    }

    #[test]
    fn validate_str_consolidates_issues() {
        let err = validate_str("{\"kind\": \"invoice-template\", \"version\": 9}").unwrap_err();
        match err {
            TemplateError::Validation(issues) => {
                assert_eq!(issues[0].code, IssueCode::UnsupportedVersion)
            }
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn validated_template_derefs_to_model() {
        let template = validate(&minimal_template()).unwrap();
        match &template.layout {
            LayoutNode::Document { children, .. } => {
                assert!(matches!(children[1], LayoutNode::Field { .. }))
            }
            _ => panic!("root must be a document"),
        }
    }
}
