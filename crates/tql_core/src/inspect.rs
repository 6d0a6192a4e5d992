//! Literal-like rendering of values for error messages.

use crate::Value;

const MAX_ARRAY_LENGTH: usize = 10;
const MAX_RECURSIVE_DEPTH: usize = 2;

/// Renders a value the way error messages quote rejected values.
///
/// Strings are quoted, objects render as `{ key: value }` with bare keys and
/// arrays as `[a, b]`. Containers nested two levels down collapse to
/// `[Object]` / `[Array]`, and long arrays are truncated.
pub fn inspect(value: &Value) -> String {
    format_value(value, 0)
}

fn format_value(value: &Value, depth: usize) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        // Serializing a string cannot fail.
        Value::String(s) => serde_json::to_string(s).unwrap_or_else(|_| format!("\"{s}\"")),
        Value::Array(items) => format_array(items, depth),
        Value::Object(map) => format_object(map, depth),
    }
}

fn format_array(items: &[Value], depth: usize) -> String {
    if items.is_empty() {
        return "[]".to_string();
    }
    if depth >= MAX_RECURSIVE_DEPTH {
        return "[Array]".to_string();
    }

    let mut parts: Vec<String> = items
        .iter()
        .take(MAX_ARRAY_LENGTH)
        .map(|item| format_value(item, depth + 1))
        .collect();

    let remaining = items.len().saturating_sub(MAX_ARRAY_LENGTH);
    if remaining == 1 {
        parts.push("... 1 more item".to_string());
    } else if remaining > 1 {
        parts.push(format!("... {remaining} more items"));
    }

    format!("[{}]", parts.join(", "))
}

fn format_object(map: &crate::Map, depth: usize) -> String {
    if map.is_empty() {
        return "{}".to_string();
    }
    if depth >= MAX_RECURSIVE_DEPTH {
        return "[Object]".to_string();
    }

    let entries: Vec<String> = map
        .iter()
        .map(|(key, value)| format!("{key}: {}", format_value(value, depth + 1)))
        .collect();

    format!("{{ {} }}", entries.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_inspect_scalars() {
        assert_eq!(inspect(&json!(null)), "null");
        assert_eq!(inspect(&json!(true)), "true");
        assert_eq!(inspect(&json!(42)), "42");
        assert_eq!(inspect(&json!(1.5)), "1.5");
        assert_eq!(inspect(&json!("a \"b\"")), r#""a \"b\"""#);
    }

    #[test]
    fn test_inspect_object() {
        assert_eq!(
            inspect(&json!({"hey": "wrong non String value"})),
            r#"{ hey: "wrong non String value" }"#
        );
        assert_eq!(inspect(&json!({})), "{}");
        assert_eq!(inspect(&json!({"a": [1, null]})), "{ a: [1, null] }");
    }

    #[test]
    fn test_inspect_depth_limit() {
        assert_eq!(
            inspect(&json!({"a": {"b": {"c": {"d": 1}}}})),
            "{ a: { b: [Object] } }"
        );
        assert_eq!(inspect(&json!([[[1]]])), "[[[Array]]]");
    }

    #[test]
    fn test_inspect_long_array() {
        let items: Vec<u32> = (0..12).collect();
        assert_eq!(
            inspect(&json!(items)),
            "[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, ... 2 more items]"
        );
    }
}
