//! Rendering of evaluated templates to markup and stylesheet text.
//!
//! The renderer is a pure function over a validated template and an
//! evaluation result. The same output feeds both the interactive
//! preview and headless document generation; the only extra step for
//! the latter is the document wrapper.

pub mod document;
pub mod error;
mod escape;
mod markup;
mod stylesheet;

// --- Public API ---
pub use document::{DocumentOptions, wrap};
pub use error::RenderError;
pub use escape::escape_html;

use facture_template::ValidatedTemplate;
use facture_transform::EvaluationResult;

/// The two text artifacts a consumer needs to show the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutput {
    pub markup: String,
    pub stylesheet: String,
}

/// Renders a validated template and its evaluation result.
pub fn render(
    template: &ValidatedTemplate,
    result: &EvaluationResult,
) -> Result<RenderOutput, RenderError> {
    let markup = markup::markup(template, result)?;
    let stylesheet = stylesheet::stylesheet(&template.styles);
    Ok(RenderOutput { markup, stylesheet })
}

#[cfg(test)]
mod tests {
    use super::*;
    use facture_template::validate;
    use facture_transform::StrategyRegistry;
    use serde_json::{Value, json};

    fn invoice_template() -> Value {
        json!({
            "kind": "invoice-template",
            "version": 1,
            "metadata": { "name": "Invoice" },
            "styles": {
                "tokens": { "accent": "#336699" },
                "classes": { "title": { "color": "$accent" } }
            },
            "bindings": {
                "values": { "customer": { "path": "customer.name" } },
                "collections": { "lineItems": { "path": "items" } }
            },
            "transforms": {
                "source": "lineItems",
                "operations": [
                    { "id": "sums", "kind": "aggregate", "aggregations": [
                        { "name": "amountSum", "fn": "sum", "operand": "amount" }
                    ]},
                    { "id": "totals", "kind": "totals-compose", "totals": [
                        { "name": "grandTotal", "expr": "$aggregates.amountSum" }
                    ]}
                ]
            },
            "layout": {
                "kind": "document",
                "children": [
                    { "kind": "text", "classes": ["title"], "content": "Invoice" },
                    { "kind": "field", "binding": "customer", "label": "Billed to" },
                    { "kind": "divider" },
                    { "kind": "dynamic-table",
                      "repeat": { "sourceBinding": "lineItems", "itemBinding": "item" },
                      "columns": [
                          { "header": "Description", "cell": "$item.description" },
                          { "header": "Amount", "cell": "amount" }
                      ]
                    },
                    { "kind": "totals" }
                ]
            }
        })
    }

    fn dataset() -> Value {
        json!({
            "customer": { "name": "Acme & Sons <Ltd>" },
            "items": [
                { "description": "Consulting", "amount": 100 },
                { "description": "Hosting", "amount": 25 }
            ]
        })
    }

    fn rendered() -> RenderOutput {
        let template = validate(&invoice_template()).unwrap();
        let result = facture_transform::evaluate(
            &invoice_template(),
            &dataset(),
            &StrategyRegistry::builtin(),
        )
        .unwrap();
        render(&template, &result).unwrap()
    }

    #[test]
    fn markup_covers_every_node() {
        let output = rendered();
        assert!(output.markup.starts_with("<main>\n"));
        assert!(output.markup.contains("<p class=\"title\">Invoice</p>"));
        assert!(output.markup.contains(
            "<p><strong>Billed to</strong> Acme &amp; Sons &lt;Ltd&gt;</p>"
        ));
        assert!(output.markup.contains("<hr>"));
        assert!(output.markup.contains("<tr><th>Description</th><th>Amount</th></tr>"));
        assert!(output.markup.contains("<tr><td>Consulting</td><td>100</td></tr>"));
        assert!(output.markup.contains("<tr><td>Hosting</td><td>25</td></tr>"));
        assert!(output.markup.contains("<dt>grandTotal</dt><dd>125</dd>"));
        assert!(output.markup.ends_with("</main>\n"));
    }

    #[test]
    fn stylesheet_resolves_token_references() {
        let output = rendered();
        assert!(output.stylesheet.contains("--accent: #336699;"));
        assert!(output.stylesheet.contains(".title {\n  color: var(--accent);\n}"));
    }

    #[test]
    fn rendering_is_deterministic() {
        assert_eq!(rendered(), rendered());
    }

    #[test]
    fn dataset_values_are_escaped_in_table_cells() {
        let template = validate(&invoice_template()).unwrap();
        let hostile = json!({
            "customer": { "name": "Acme" },
            "items": [
                { "description": "<script>alert(1)</script>", "amount": 1 }
            ]
        });
        let result = facture_transform::evaluate(
            &invoice_template(),
            &hostile,
            &StrategyRegistry::builtin(),
        )
        .unwrap();
        let output = render(&template, &result).unwrap();
        assert!(!output.markup.contains("<script>"));
        assert!(output.markup.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    }

    #[test]
    fn dynamic_table_renders_shaped_rows() {
        // The pipeline filters the source collection; the table must
        // reflect the shaped rows, not the raw dataset.
        let mut source = invoice_template();
        source["transforms"]["operations"] = json!([
            { "id": "expensive", "kind": "filter", "predicate": {
                "kind": "compare", "left": "amount", "op": "gt", "right": "50"
            }},
            { "id": "sums", "kind": "aggregate", "aggregations": [
                { "name": "amountSum", "fn": "sum", "operand": "amount" }
            ]},
            { "id": "totals", "kind": "totals-compose", "totals": [
                { "name": "grandTotal", "expr": "$aggregates.amountSum" }
            ]}
        ]);
        let template = validate(&source).unwrap();
        let result =
            facture_transform::evaluate(&source, &dataset(), &StrategyRegistry::builtin())
                .unwrap();
        let output = render(&template, &result).unwrap();
        assert!(output.markup.contains("Consulting"));
        assert!(!output.markup.contains("Hosting"));
        assert!(output.markup.contains("<dt>grandTotal</dt><dd>100</dd>"));
    }

    #[test]
    fn totals_node_honors_named_entries() {
        let mut source = invoice_template();
        source["transforms"]["operations"][1]["totals"] = json!([
            { "name": "grandTotal", "expr": "$aggregates.amountSum" },
            { "name": "rounded", "expr": "round($aggregates.amountSum)" }
        ]);
        source["layout"]["children"][4] = json!({
            "kind": "totals", "entries": ["rounded"]
        });
        let template = validate(&source).unwrap();
        let result =
            facture_transform::evaluate(&source, &dataset(), &StrategyRegistry::builtin())
                .unwrap();
        let output = render(&template, &result).unwrap();
        assert!(output.markup.contains("<dt>rounded</dt>"));
        assert!(!output.markup.contains("<dt>grandTotal</dt>"));
    }
}
