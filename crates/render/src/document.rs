//! Wrapping renderer output into a standalone HTML document.
//!
//! The wrapper is the only difference between the interactive preview
//! and headless generation; it contains no evaluation or rendering
//! logic of its own.

use crate::escape::escape_html;
use std::fmt::Write;

#[derive(Debug, Clone, Default)]
pub struct DocumentOptions {
    pub title: Option<String>,
    pub body_class: Option<String>,
    pub lang: Option<String>,
}

/// Wraps markup and stylesheet text into a complete HTML document.
pub fn wrap(markup: &str, stylesheet: &str, options: &DocumentOptions) -> String {
    let lang = options.lang.as_deref().unwrap_or("en");
    let title = options.title.as_deref().unwrap_or("Document");

    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n");
    let _ = writeln!(out, "<html lang=\"{}\">", escape_html(lang));
    out.push_str("<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(out, "<title>{}</title>", escape_html(title));
    if !stylesheet.is_empty() {
        out.push_str("<style>\n");
        out.push_str(stylesheet);
        out.push_str("</style>\n");
    }
    out.push_str("</head>\n");
    match &options.body_class {
        Some(class) => {
            let _ = writeln!(out, "<body class=\"{}\">", escape_html(class));
        }
        None => out.push_str("<body>\n"),
    }
    out.push_str(markup);
    out.push_str("</body>\n</html>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_markup_and_stylesheet() {
        let options = DocumentOptions {
            title: Some("Invoice 42".to_string()),
            body_class: Some("print".to_string()),
            lang: Some("nb".to_string()),
        };
        let doc = wrap("<main>\n</main>\n", ".title { color: red; }\n", &options);
        assert!(doc.starts_with("<!DOCTYPE html>\n<html lang=\"nb\">\n"));
        assert!(doc.contains("<title>Invoice 42</title>"));
        assert!(doc.contains("<style>\n.title { color: red; }\n</style>"));
        assert!(doc.contains("<body class=\"print\">\n<main>\n</main>\n</body>"));
    }

    #[test]
    fn defaults_apply_when_options_are_empty() {
        let doc = wrap("<main>\n</main>\n", "", &DocumentOptions::default());
        assert!(doc.contains("<html lang=\"en\">"));
        assert!(doc.contains("<title>Document</title>"));
        assert!(!doc.contains("<style>"));
        assert!(doc.contains("<body>\n"));
    }

    #[test]
    fn options_are_escaped() {
        let options = DocumentOptions {
            title: Some("<b>bold</b>".to_string()),
            ..Default::default()
        };
        let doc = wrap("", "", &options);
        assert!(doc.contains("<title>&lt;b&gt;bold&lt;/b&gt;</title>"));
    }
}
