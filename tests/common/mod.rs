use serde_json::{Value, json};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A full-featured invoice template: styles with token references, both
/// binding catalogs, a grouped pipeline with composed totals, and every
/// layout node the renderer supports in a realistic arrangement.
pub fn invoice_template() -> Value {
    json!({
        "kind": "invoice-template",
        "version": 1,
        "metadata": {
            "name": "Standard Invoice",
            "description": "Grouped line items with a grand total",
            "locale": "en-US"
        },
        "styles": {
            "tokens": {
                "accent": "#336699",
                "gap": "12px"
            },
            "classes": {
                "title": { "color": "$accent", "font-size": "24px" },
                "muted": { "opacity": "0.6" },
                "items": { "margin-top": "$gap" }
            }
        },
        "bindings": {
            "values": {
                "customer": { "path": "customer.name" },
                "invoiceNumber": { "path": "invoice.number" },
                "purchaseOrder": { "path": "invoice.po", "required": false }
            },
            "collections": {
                "lineItems": { "path": "invoice.items" }
            }
        },
        "transforms": {
            "source": "lineItems",
            "operations": [
                { "id": "by-category", "kind": "group", "key": "category" },
                { "id": "sums", "kind": "aggregate", "aggregations": [
                    { "name": "amountSum", "fn": "sum", "operand": "amount" }
                ]},
                { "id": "grand-total", "kind": "totals-compose", "totals": [
                    { "name": "grandTotal", "expr": "sumGroups('amountSum')" }
                ]}
            ]
        },
        "layout": {
            "kind": "document",
            "children": [
                { "kind": "section", "children": [
                    { "kind": "text", "classes": ["title"], "content": "Invoice" },
                    { "kind": "stack", "direction": "horizontal", "children": [
                        { "kind": "field", "binding": "customer", "label": "Billed to" },
                        { "kind": "field", "binding": "invoiceNumber", "label": "No.",
                          "classes": ["muted"] }
                    ]}
                ]},
                { "kind": "divider" },
                { "kind": "dynamic-table", "classes": ["items"],
                  "repeat": { "sourceBinding": "lineItems", "itemBinding": "item" },
                  "columns": [
                      { "header": "Description", "cell": "$item.description" },
                      { "header": "Category", "cell": "category" },
                      { "header": "Amount", "cell": "amount" }
                  ]
                },
                { "kind": "totals" }
            ]
        }
    })
}

pub fn invoice_dataset() -> Value {
    json!({
        "customer": { "name": "Acme & Sons" },
        "invoice": {
            "number": "2026-001",
            "items": [
                { "description": "Widgets", "category": "Products", "amount": 10 },
                { "description": "Support", "category": "Services", "amount": 20 },
                { "description": "Gadgets", "category": "Products", "amount": 5 }
            ]
        }
    })
}
