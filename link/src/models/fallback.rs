//! Default-value fallback used by field reads.

use serde_json::Value as JsonValue;

/// Returns `true` for values a loosely-typed reader would treat as present.
///
/// `null`, `false`, `0` and `""` are falsy. Arrays and objects are always
/// truthy, even when empty.
pub fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(_) | JsonValue::Object(_) => true,
    }
}

/// Resolve a stored value against a caller-supplied default.
///
/// Arrays and objects are returned as stored. Scalars are returned only when
/// truthy, so a stored `false`, `0` or `""` yields `default` instead. Callers
/// that need to observe a stored falsy scalar must read the record directly.
pub fn res_or_default(value: JsonValue, default: JsonValue) -> JsonValue {
    match value {
        JsonValue::Array(_) | JsonValue::Object(_) => value,
        other if is_truthy(&other) => other,
        _ => default,
    }
}
