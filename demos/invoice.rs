//! Generates a standalone invoice document and prints it to stdout.
//!
//! ```sh
//! cargo run --example invoice > invoice.html
//! ```

use facture::{DocumentOptions, generate};
use serde_json::json;

fn main() {
    env_logger::init();

    let template = json!({
        "kind": "invoice-template",
        "version": 1,
        "metadata": { "name": "Demo Invoice", "locale": "en-US" },
        "styles": {
            "tokens": { "accent": "#336699" },
            "classes": {
                "title": { "color": "$accent", "font-size": "24px" }
            }
        },
        "bindings": {
            "values": { "customer": { "path": "customer.name" } },
            "collections": { "lineItems": { "path": "items" } }
        },
        "transforms": {
            "source": "lineItems",
            "operations": [
                { "id": "sums", "kind": "aggregate", "aggregations": [
                    { "name": "total", "fn": "sum", "operand": "amount" }
                ]},
                { "id": "totals", "kind": "totals-compose", "totals": [
                    { "name": "total", "expr": "$aggregates.total" }
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
    });

    let dataset = json!({
        "customer": { "name": "Acme & Sons" },
        "items": [
            { "description": "Consulting", "amount": 1200 },
            { "description": "Hosting", "amount": 300 }
        ]
    });

    let options = DocumentOptions {
        title: Some("Demo Invoice".to_string()),
        ..Default::default()
    };
    match generate(&template, &dataset, &options) {
        Ok(document) => println!("{document}"),
        Err(e) => {
            eprintln!("generation failed: {e}");
            std::process::exit(1);
        }
    }
}
