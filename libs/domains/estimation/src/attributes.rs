//! Typed access to block payloads.
//!
//! Parsers disagree on how nested blocks are shaped: `settings { ... }` may
//! arrive as a mapping or as a one-element sequence of mappings. Values that
//! went through interpolation may also arrive as strings (`"100"`, `"true"`).
//! The accessors here accept all of those shapes.

use serde_json::{Map, Value};

/// The nested key/value payload of a block
pub type AttributeSet = Map<String, Value>;

/// Read helpers over an [`AttributeSet`]
pub trait AttributeExt {
    /// String attribute, without coercion
    fn str_attr(&self, key: &str) -> Option<&str>;

    /// String attribute, rendering numbers and booleans as text
    fn string_attr(&self, key: &str) -> Option<String>;

    /// Numeric attribute, parsing numeric strings
    fn f64_attr(&self, key: &str) -> Option<f64>;

    /// Boolean attribute, parsing `"true"`/`"false"`
    fn bool_attr(&self, key: &str) -> Option<bool>;

    /// First nested block under `key`
    fn block(&self, key: &str) -> Option<&AttributeSet>;

    /// Every nested block under `key`
    fn blocks(&self, key: &str) -> Vec<&AttributeSet>;
}

impl AttributeExt for AttributeSet {
    fn str_attr(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    fn string_attr(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    fn f64_attr(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(value_as_f64)
    }

    fn bool_attr(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        }
    }

    fn block(&self, key: &str) -> Option<&AttributeSet> {
        self.blocks(key).into_iter().next()
    }

    fn blocks(&self, key: &str) -> Vec<&AttributeSet> {
        match self.get(key) {
            Some(Value::Object(map)) => vec![map],
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_object).collect(),
            _ => Vec::new(),
        }
    }
}

/// Numeric view of a value, accepting numeric strings
pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Unwrap a block payload that may be a one-element sequence
pub fn unwrap_block(value: &Value) -> Option<&AttributeSet> {
    match value {
        Value::Object(map) => Some(map),
        Value::Array(items) => items.first().and_then(Value::as_object),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(value: Value) -> AttributeSet {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_numeric_coercion() {
        let a = attrs(json!({ "size": 100, "iops": "2500", "zone": "us-central1-a" }));
        assert_eq!(a.f64_attr("size"), Some(100.0));
        assert_eq!(a.f64_attr("iops"), Some(2500.0));
        assert_eq!(a.f64_attr("zone"), None);
        assert_eq!(a.f64_attr("missing"), None);
    }

    #[test]
    fn test_bool_coercion() {
        let a = attrs(json!({ "on": true, "off": "false", "odd": "yes" }));
        assert_eq!(a.bool_attr("on"), Some(true));
        assert_eq!(a.bool_attr("off"), Some(false));
        assert_eq!(a.bool_attr("odd"), None);
    }

    #[test]
    fn test_block_shapes() {
        let mapping = attrs(json!({ "settings": { "tier": "db-f1-micro" } }));
        let sequence = attrs(json!({ "settings": [{ "tier": "db-g1-small" }] }));

        assert_eq!(
            mapping.block("settings").and_then(|s| s.str_attr("tier")),
            Some("db-f1-micro")
        );
        assert_eq!(
            sequence.block("settings").and_then(|s| s.str_attr("tier")),
            Some("db-g1-small")
        );
        assert!(mapping.block("ip_configuration").is_none());
    }

    #[test]
    fn test_string_attr_renders_scalars() {
        let a = attrs(json!({ "n": 3, "b": false, "s": "x", "o": {} }));
        assert_eq!(a.string_attr("n").as_deref(), Some("3"));
        assert_eq!(a.string_attr("b").as_deref(), Some("false"));
        assert_eq!(a.string_attr("s").as_deref(), Some("x"));
        assert_eq!(a.string_attr("o"), None);
    }
}
