// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime value helpers
//!
//! Workflow data flows as untyped JSON values; these helpers give the
//! engine and resolver a consistent vocabulary for coercion and display.

pub use serde_json::Value;

/// Short kind name for a value, used in type-mismatch diagnostics.
pub fn value_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "float",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Truthiness in the engine's condition positions (If nodes, while loops).
///
/// Null and absent are false; numbers are false at zero; strings are false
/// when empty; lists and dicts are false when empty.
pub fn value_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Coerce a value to an integer where the engine needs a count or index.
pub fn value_as_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

/// Render a value the way it appears inside an interpolated string.
///
/// Strings render bare (no surrounding quotes); everything else renders as
/// compact JSON.
pub fn value_to_display(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[path = "value_tests.rs"]
mod tests;
