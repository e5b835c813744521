//! Markup generation from the layout tree and an evaluation result.
//!
//! The walk is an exhaustive match over node kinds; every interpolated
//! data value passes through HTML escaping on its way out. Identical
//! `(template, result)` input yields identical markup text.

use crate::error::RenderError;
use crate::escape::escape_html;
use facture_expr::{
    EvaluationContext, ExprError, FunctionRegistry, display_text, evaluate as eval_expr,
};
use facture_template::{
    DynamicColumn, ImageSource, LayoutNode, RepeatBinding, StackDirection, ValidatedTemplate,
};
use facture_transform::EvaluationResult;
use itertools::Itertools;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Write;

pub fn markup(
    template: &ValidatedTemplate,
    result: &EvaluationResult,
) -> Result<String, RenderError> {
    let variables: HashMap<String, Value> =
        result.bindings.iter().map(|(name, value)| (name.clone(), value.clone())).collect();
    let mut writer = MarkupWriter {
        result,
        variables,
        functions: FunctionRegistry::default(),
        out: String::new(),
        depth: 0,
    };
    writer.node(&template.layout)?;
    Ok(writer.out)
}

struct MarkupWriter<'a> {
    result: &'a EvaluationResult,
    /// Resolved bindings exposed to cell expressions as `$name`.
    variables: HashMap<String, Value>,
    functions: FunctionRegistry,
    out: String,
    depth: usize,
}

impl MarkupWriter<'_> {
    fn node(&mut self, node: &LayoutNode) -> Result<(), RenderError> {
        match node {
            LayoutNode::Document { children, .. } => {
                self.container("main", node, children)?;
            }
            LayoutNode::Section { children, .. } => {
                self.container("section", node, children)?;
            }
            LayoutNode::Stack { direction, children, .. } => {
                let direction = match direction {
                    StackDirection::Vertical => "vertical",
                    StackDirection::Horizontal => "horizontal",
                };
                self.line(&format!(
                    "<div{} data-direction=\"{direction}\">",
                    class_attr(node.classes())
                ));
                self.depth += 1;
                for child in children {
                    self.node(child)?;
                }
                self.depth -= 1;
                self.line("</div>");
            }
            LayoutNode::Text { content, .. } => {
                self.line(&format!(
                    "<p{}>{}</p>",
                    class_attr(node.classes()),
                    escape_html(content)
                ));
            }
            LayoutNode::Field { binding, label, .. } => {
                let value = self
                    .result
                    .bindings
                    .get(binding)
                    .ok_or_else(|| RenderError::MissingBinding(binding.clone()))?;
                let text = escape_html(&display_text(value));
                match label {
                    Some(label) => self.line(&format!(
                        "<p{}><strong>{}</strong> {text}</p>",
                        class_attr(node.classes()),
                        escape_html(label)
                    )),
                    None => self.line(&format!("<p{}>{text}</p>", class_attr(node.classes()))),
                }
            }
            LayoutNode::Image { src, alt, .. } => {
                let src = match src {
                    ImageSource::Url(url) => url.clone(),
                    ImageSource::Binding(binding) => {
                        let value = self
                            .result
                            .bindings
                            .get(binding)
                            .ok_or_else(|| RenderError::MissingBinding(binding.clone()))?;
                        display_text(value)
                    }
                };
                self.line(&format!(
                    "<img{} src=\"{}\" alt=\"{}\">",
                    class_attr(node.classes()),
                    escape_html(&src),
                    escape_html(alt.as_deref().unwrap_or(""))
                ));
            }
            LayoutNode::Divider { .. } => {
                self.line(&format!("<hr{}>", class_attr(node.classes())));
            }
            LayoutNode::Table { columns, rows, .. } => {
                self.line(&format!("<table{}>", class_attr(node.classes())));
                self.depth += 1;
                self.header_row(columns);
                self.line("<tbody>");
                self.depth += 1;
                for row in rows {
                    let cells =
                        row.iter().map(|c| format!("<td>{}</td>", escape_html(c))).join("");
                    self.line(&format!("<tr>{cells}</tr>"));
                }
                self.depth -= 1;
                self.line("</tbody>");
                self.depth -= 1;
                self.line("</table>");
            }
            LayoutNode::DynamicTable { repeat, columns, .. } => {
                self.dynamic_table(node, repeat, columns)?;
            }
            LayoutNode::Totals { entries, .. } => {
                let names: Vec<&String> = match entries {
                    Some(entries) => entries.iter().collect(),
                    None => self.result.totals.keys().collect(),
                };
                self.line(&format!("<dl{}>", class_attr(node.classes())));
                self.depth += 1;
                for name in names {
                    let value = self
                        .result
                        .totals
                        .get(name)
                        .ok_or_else(|| RenderError::MissingTotal(name.clone()))?;
                    self.line(&format!(
                        "<dt>{}</dt><dd>{}</dd>",
                        escape_html(name),
                        escape_html(&display_text(value))
                    ));
                }
                self.depth -= 1;
                self.line("</dl>");
            }
        }
        Ok(())
    }

    fn container(
        &mut self,
        tag: &str,
        node: &LayoutNode,
        children: &[LayoutNode],
    ) -> Result<(), RenderError> {
        self.line(&format!("<{tag}{}>", class_attr(node.classes())));
        self.depth += 1;
        for child in children {
            self.node(child)?;
        }
        self.depth -= 1;
        self.line(&format!("</{tag}>"));
        Ok(())
    }

    /// Renders one row per element of the repeat source collection, with
    /// the row exposed to cell expressions as `$<itemBinding>` and as
    /// the expression scope.
    fn dynamic_table(
        &mut self,
        node: &LayoutNode,
        repeat: &RepeatBinding,
        columns: &[DynamicColumn],
    ) -> Result<(), RenderError> {
        let source = self
            .result
            .bindings
            .get(&repeat.source_binding)
            .ok_or_else(|| RenderError::MissingBinding(repeat.source_binding.clone()))?;
        let Value::Array(rows) = source else {
            return Err(RenderError::InvalidRepeatSource(repeat.source_binding.clone()));
        };
        log::debug!(
            "rendering dynamic table over '{}' ({} rows)",
            repeat.source_binding,
            rows.len()
        );

        self.line(&format!("<table{}>", class_attr(node.classes())));
        self.depth += 1;
        let headers: Vec<String> = columns.iter().map(|c| c.header.clone()).collect();
        self.header_row(&headers);
        self.line("<tbody>");
        self.depth += 1;
        for row in rows {
            let mut variables = self.variables.clone();
            variables.insert(repeat.item_binding.clone(), row.clone());
            let ctx = EvaluationContext {
                scope: row,
                variables: &variables,
                functions: &self.functions,
            };
            let mut cells = String::new();
            for column in columns {
                let text = match eval_expr(&column.cell, &ctx) {
                    Ok(value) => display_text(&value),
                    // An absent field renders as an empty cell.
                    Err(ExprError::Unresolved(_)) => String::new(),
                    Err(e) => return Err(RenderError::Expression(e.to_string())),
                };
                let _ = write!(cells, "<td>{}</td>", escape_html(&text));
            }
            self.line(&format!("<tr>{cells}</tr>"));
        }
        self.depth -= 1;
        self.line("</tbody>");
        self.depth -= 1;
        self.line("</table>");
        Ok(())
    }

    fn header_row(&mut self, columns: &[String]) {
        self.line("<thead>");
        self.depth += 1;
        let cells = columns.iter().map(|c| format!("<th>{}</th>", escape_html(c))).join("");
        self.line(&format!("<tr>{cells}</tr>"));
        self.depth -= 1;
        self.line("</thead>");
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }
}

fn class_attr(classes: &[String]) -> String {
    if classes.is_empty() {
        String::new()
    } else {
        format!(" class=\"{}\"", escape_html(&classes.join(" ")))
    }
}
