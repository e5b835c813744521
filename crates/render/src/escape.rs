//! HTML escaping for interpolated data.
//!
//! Every value that originates in the caller's dataset passes through
//! here before it reaches the markup. Dataset values are never trusted
//! as pre-sanitized.

/// Escapes text for use in element content and attribute values.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
