mod common;

use common::{init_logging, invoice_dataset, invoice_template};
use facture::{
    DocumentOptions, EvaluationCode, FactureError, IssueCode, StrategyRegistry, generate, preview,
};
use serde_json::json;

#[test]
fn preview_renders_the_grouped_invoice() {
    init_logging();
    let output = preview(&invoice_template(), &invoice_dataset()).unwrap();

    assert!(output.markup.contains("<p class=\"title\">Invoice</p>"));
    assert!(output.markup.contains("<p><strong>Billed to</strong> Acme &amp; Sons</p>"));
    assert!(output.markup.contains("<p class=\"muted\"><strong>No.</strong> 2026-001</p>"));
    assert!(output.markup.contains("<tr><td>Widgets</td><td>Products</td><td>10</td></tr>"));
    assert!(output.markup.contains("<tr><td>Support</td><td>Services</td><td>20</td></tr>"));
    assert!(output.markup.contains("<dt>grandTotal</dt><dd>35</dd>"));
    assert!(output.stylesheet.contains("--accent: #336699;"));
    assert!(output.stylesheet.contains("color: var(--accent);"));
}

#[test]
fn evaluation_is_deterministic_end_to_end() {
    init_logging();
    let first = preview(&invoice_template(), &invoice_dataset()).unwrap();
    let second = preview(&invoice_template(), &invoice_dataset()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn preview_and_generate_agree() {
    init_logging();
    let output = preview(&invoice_template(), &invoice_dataset()).unwrap();
    let options = DocumentOptions { title: Some("Invoice 2026-001".to_string()), ..Default::default() };
    let document = generate(&invoice_template(), &invoice_dataset(), &options).unwrap();

    // The wrapped document embeds the preview output verbatim.
    assert!(document.starts_with("<!DOCTYPE html>"));
    assert!(document.contains("<title>Invoice 2026-001</title>"));
    assert!(document.contains(&output.markup));
    assert!(document.contains(&output.stylesheet));
}

#[test]
fn grouped_totals_match_the_dataset() {
    init_logging();
    let result = facture::transform::evaluate(
        &invoice_template(),
        &invoice_dataset(),
        StrategyRegistry::global(),
    )
    .unwrap();

    assert_eq!(result.groups.len(), 2);
    assert_eq!(result.groups[0].key, json!("Products"));
    assert_eq!(result.groups[0].aggregates["amountSum"], json!(15.0));
    assert_eq!(result.groups[1].key, json!("Services"));
    assert_eq!(result.groups[1].aggregates["amountSum"], json!(20.0));
    assert_eq!(result.totals["grandTotal"], json!(35.0));
}

#[test]
fn validation_reports_every_defect_at_once() {
    init_logging();
    let mut template = invoice_template();
    template["theme"] = json!({});
    template["layout"]["children"][2]["repeat"] = json!({ "itemBinding": "item" });
    template["layout"]["children"][0]["children"][0]["classes"] = json!(["missing"]);

    let err = preview(&template, &invoice_dataset()).unwrap_err();
    let FactureError::Template(err) = err else {
        panic!("expected a template error, got {err}");
    };
    let paths: Vec<&str> = err.issues().iter().map(|i| i.path.as_str()).collect();
    assert!(paths.contains(&"theme"));
    assert!(paths.contains(&"layout.children[2].repeat.sourceBinding"));
    assert!(paths.contains(&"layout.children[0].children[0].classes[0]"));
}

#[test]
fn version_gate_runs_before_everything_else() {
    init_logging();
    let mut template = invoice_template();
    template["version"] = json!(2);
    // Also broken elsewhere, but the version mismatch must be the only
    // reported issue.
    template["layout"] = json!({ "kind": "section", "children": [] });

    let err = preview(&template, &invoice_dataset()).unwrap_err();
    let FactureError::Template(err) = err else {
        panic!("expected a template error, got {err}");
    };
    assert_eq!(err.issues().len(), 1);
    assert_eq!(err.issues()[0].code, IssueCode::UnsupportedVersion);
    assert_eq!(err.issues()[0].path, "version");
}

#[test]
fn dynamic_table_without_repeat_is_never_degraded() {
    init_logging();
    let mut template = invoice_template();
    let table = template["layout"]["children"][2].as_object_mut().unwrap();
    table.remove("repeat");

    let err = preview(&template, &invoice_dataset()).unwrap_err();
    let FactureError::Template(err) = err else {
        panic!("expected a template error, got {err}");
    };
    let paths: Vec<&str> = err.issues().iter().map(|i| i.path.as_str()).collect();
    assert!(paths.contains(&"layout.children[2].repeat.sourceBinding"));
    assert!(paths.contains(&"layout.children[2].repeat.itemBinding"));
}

#[test]
fn unknown_strategy_aborts_evaluation() {
    init_logging();
    let mut template = invoice_template();
    template["transforms"]["operations"][0]["strategyId"] = json!("group/unvetted");

    let err = preview(&template, &invoice_dataset()).unwrap_err();
    let FactureError::Evaluation(err) = err else {
        panic!("expected an evaluation error, got {err}");
    };
    assert_eq!(err.code, EvaluationCode::UnknownStrategy);
    assert_eq!(err.operation_id.as_deref(), Some("by-category"));
}

#[test]
fn hostile_dataset_values_are_escaped() {
    init_logging();
    let mut dataset = invoice_dataset();
    dataset["customer"]["name"] = json!("<script>alert(1)</script>");
    dataset["invoice"]["items"][0]["description"] = json!("\"/><img src=x onerror=x>");

    let document =
        generate(&invoice_template(), &dataset, &DocumentOptions::default()).unwrap();
    assert!(!document.contains("<script>alert"));
    assert!(!document.contains("<img src=x"));
    assert!(document.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    assert!(document.contains("&quot;/&gt;&lt;img src=x onerror=x&gt;"));
}
