//! Dual-input coercion shared by every path that reads verification fields.
//!
//! Kickbox returns native JSON booleans and numbers; HubSpot stores every
//! property as a string and hands them back as strings. The helpers here
//! accept either encoding so callers never need to know which path a value
//! came from.

use serde_json::Value;

/// Native `true`, or a string equal to `"true"` ignoring case. Anything else is `false`.
pub fn coerce_bool(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// Parses a number or numeric string.
///
/// Absent, `null` and blank strings yield `None`. A present value that cannot be
/// parsed (or is not finite) degrades to `0.0`. Out-of-range values pass through.
pub fn coerce_f64(value: Option<&Value>) -> Option<f64> {
    let parsed = match value {
        None | Some(Value::Null) => return None,
        Some(Value::String(s)) if s.trim().is_empty() => return None,
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };

    Some(parsed.filter(|f| f.is_finite()).unwrap_or(0.0))
}

/// Strings pass through, scalars are stringified, `null` and structured values yield `None`.
pub fn coerce_string(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    }
}

/// HubSpot enumeration option for a boolean property.
pub fn bool_to_property(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Drops empty strings; used where the card treats `""` like a missing value.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}
