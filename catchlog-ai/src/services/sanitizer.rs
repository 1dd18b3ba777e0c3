//! HTML-safe coercion of untrusted JSON values
//!
//! Vision-model output is untrusted: any field may hold any JSON type and
//! any markup. Values are coerced to text, HTML-escaped and trimmed so the
//! result can be embedded directly in a page.
//!
//! Escaping is encode-once: an `&` that already begins one of the entities
//! this module emits is left alone, so running the sanitizer over its own
//! output changes nothing.

use serde_json::Value;

/// Entities produced by [`escape_html`]
const EMITTED_ENTITIES: [&str; 5] = ["&amp;", "&lt;", "&gt;", "&quot;", "&#x27;"];

/// Escape `& < > " '` for embedding in HTML text or attribute values
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());

    for (index, ch) in input.char_indices() {
        match ch {
            '&' => {
                let rest = &input[index..];
                if EMITTED_ENTITIES.iter().any(|entity| rest.starts_with(entity)) {
                    out.push('&');
                } else {
                    out.push_str("&amp;");
                }
            }
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }

    out
}

/// Text form of an arbitrary JSON value
///
/// null → "", booleans and numbers → their literal text, arrays → elements
/// joined with ",", objects → "" (no meaningful text form).
pub fn coerce_to_string(value: &Value) -> String {
    match value {
        Value::Null | Value::Object(_) => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(coerce_to_string)
            .collect::<Vec<_>>()
            .join(","),
    }
}

/// Coerce, escape and trim a value
pub fn sanitize_value(value: &Value) -> String {
    escape_html(&coerce_to_string(value)).trim().to_string()
}

/// Sanitize an optional field, substituting `default` when empty
pub fn sanitize_or(value: Option<&Value>, default: &str) -> String {
    let sanitized = value.map(sanitize_value).unwrap_or_default();
    if sanitized.is_empty() {
        default.to_string()
    } else {
        sanitized
    }
}
