// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Template variable resolution.
//!
//! Turns configured values into runtime values by substituting variable
//! references and evaluating safe expressions. Three reference syntaxes
//! are accepted — `{{ name }}`, `${name}`, and `%name%` — plus
//! `{{ expression }}` for anything that parses under the safe grammar.
//!
//! Resolution is fail-soft: an expression that does not parse is left as
//! literal text; an expression that parses but fails to evaluate resolves
//! to null with a logged warning. The resolver never errors.

use crate::expr;
use armada_core::{value_to_display, Value};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// `{{ anything }}` — the inner text is a bare name or an expression.
// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static BRACE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^{}]*)\}\}").expect("constant regex pattern is valid"));

/// `${name}`
#[allow(clippy::expect_used)]
static DOLLAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("constant regex pattern is valid")
});

/// `%name%`
#[allow(clippy::expect_used)]
static PERCENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"%([A-Za-z_][A-Za-z0-9_]*)%").expect("constant regex pattern is valid")
});

fn is_bare_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Resolve a configured value recursively.
///
/// Strings go through template resolution; lists and dicts resolve
/// element-wise; everything else passes through unchanged.
pub fn resolve_value(value: &Value, vars: &HashMap<String, Value>) -> Value {
    match value {
        Value::String(s) => resolve_template(s, vars),
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| resolve_value(v, vars)).collect())
        }
        Value::Object(map) => Value::Object(
            map.iter().map(|(k, v)| (k.clone(), resolve_value(v, vars))).collect(),
        ),
        other => other.clone(),
    }
}

/// Resolve one templated string.
///
/// A string that is exactly one reference resolves to the variable's typed
/// value (`{{ count }}` with `count = 3` yields integer 3, not `"3"`);
/// references embedded in longer text render to strings in place.
pub fn resolve_template(template: &str, vars: &HashMap<String, Value>) -> Value {
    // Whole-string reference: preserve the value's type.
    if let Some(caps) = BRACE_PATTERN.captures(template) {
        if caps.get(0).map(|m| m.as_str()) == Some(template.trim()) {
            if let Some(inner) = caps.get(1) {
                return resolve_brace_inner(inner.as_str().trim(), template, vars);
            }
        }
    }
    for pattern in [&DOLLAR_PATTERN, &PERCENT_PATTERN] {
        if let Some(caps) = pattern.captures(template) {
            if caps.get(0).map(|m| m.as_str()) == Some(template.trim()) {
                if let Some(name) = caps.get(1) {
                    return lookup(name.as_str(), template, vars);
                }
            }
        }
    }

    // Embedded references render into the surrounding text.
    let pass1 = BRACE_PATTERN.replace_all(template, |caps: &regex::Captures| {
        let inner = caps[1].trim().to_string();
        let original = caps[0].to_string();
        match resolve_brace_inner(&inner, &original, vars) {
            Value::String(s) => s,
            Value::Null if !vars.contains_key(inner.as_str()) && is_bare_name(&inner) => {
                // Unknown bare names stay verbatim so typos are visible in
                // the output rather than silently vanishing.
                original
            }
            other => value_to_display(&other),
        }
    });
    let pass2 = DOLLAR_PATTERN.replace_all(&pass1, |caps: &regex::Captures| {
        match vars.get(&caps[1]) {
            Some(v) => value_to_display(v),
            None => caps[0].to_string(),
        }
    });
    let pass3 = PERCENT_PATTERN.replace_all(&pass2, |caps: &regex::Captures| {
        match vars.get(&caps[1]) {
            Some(v) => value_to_display(v),
            None => caps[0].to_string(),
        }
    });

    Value::String(pass3.into_owned())
}

/// Resolve the inside of a `{{ … }}` reference: bare name lookup first,
/// then safe-expression evaluation.
fn resolve_brace_inner(inner: &str, original: &str, vars: &HashMap<String, Value>) -> Value {
    if is_bare_name(inner) {
        return lookup(inner, original, vars);
    }
    match expr::parse(inner) {
        Ok(parsed) => match expr::evaluate(&parsed, vars) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(expression = inner, error = %e, "expression evaluation failed");
                Value::Null
            }
        },
        // Not a safe expression: literal text, never evaluated.
        Err(_) => Value::String(original.to_string()),
    }
}

fn lookup(name: &str, original: &str, vars: &HashMap<String, Value>) -> Value {
    match vars.get(name) {
        Some(v) => v.clone(),
        None => {
            tracing::warn!(variable = name, template = original, "unknown variable in template");
            Value::Null
        }
    }
}

#[cfg(test)]
#[path = "resolve_tests.rs"]
mod tests;
