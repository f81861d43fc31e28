//! Column type inference from sample values.

use serde_json::Value;

use super::ColumnType;
use crate::temporal;

/// Derive a column type from one sample value.
///
/// Rules are checked in order: integers, other numerics (including numeric
/// strings), date objects, other objects/arrays, date strings, then strings.
pub fn infer(value: &Value) -> ColumnType {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => ColumnType::Integer,
        Value::Number(_) => ColumnType::Float,
        Value::Object(map) if map.contains_key("date") => ColumnType::DateTime,
        Value::Object(_) | Value::Array(_) => ColumnType::Json,
        Value::String(s) if is_numeric(s) => ColumnType::Float,
        Value::String(s) if temporal::parse_datetime(s).is_some() => ColumnType::DateTime,
        _ => ColumnType::String,
    }
}

fn is_numeric(s: &str) -> bool {
    let trimmed = s.trim();
    trimmed.chars().any(|c| c.is_ascii_digit()) && trimmed.parse::<f64>().is_ok_and(f64::is_finite)
}
