//! Stylesheet text generation from the template's style catalog.
//!
//! Tokens become `:root` custom properties and classes become plain
//! class rules, both in declaration order. A declaration value that is
//! a bare `$token` reference resolves to `var(--token)`; the validator
//! has already confirmed the token exists.

use facture_template::StyleCatalog;
use std::fmt::Write;

pub fn stylesheet(styles: &StyleCatalog) -> String {
    let mut out = String::new();
    if !styles.tokens.is_empty() {
        out.push_str(":root {\n");
        for (name, value) in &styles.tokens {
            let _ = writeln!(out, "  --{name}: {value};");
        }
        out.push_str("}\n");
    }
    for (name, class) in &styles.classes {
        if !out.is_empty() {
            out.push('\n');
        }
        let _ = writeln!(out, ".{name} {{");
        for (property, value) in &class.declarations {
            let resolved = match value.strip_prefix('$') {
                Some(token) => format!("var(--{token})"),
                None => value.clone(),
            };
            let _ = writeln!(out, "  {property}: {resolved};");
        }
        out.push_str("}\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use facture_template::StyleClass;

    #[test]
    fn tokens_then_classes_in_declaration_order() {
        let mut styles = StyleCatalog::default();
        styles.tokens.insert("accent".to_string(), "#336699".to_string());
        styles.tokens.insert("gap".to_string(), "8px".to_string());
        let mut title = StyleClass::default();
        title.declarations.insert("color".to_string(), "$accent".to_string());
        title.declarations.insert("margin-bottom".to_string(), "$gap".to_string());
        styles.classes.insert("title".to_string(), title);
        let mut muted = StyleClass::default();
        muted.declarations.insert("opacity".to_string(), "0.6".to_string());
        styles.classes.insert("muted".to_string(), muted);

        assert_eq!(
            stylesheet(&styles),
            ":root {\n  --accent: #336699;\n  --gap: 8px;\n}\n\n\
             .title {\n  color: var(--accent);\n  margin-bottom: var(--gap);\n}\n\n\
             .muted {\n  opacity: 0.6;\n}\n"
        );
    }

    #[test]
    fn empty_catalog_yields_empty_stylesheet() {
        assert_eq!(stylesheet(&StyleCatalog::default()), "");
    }
}
