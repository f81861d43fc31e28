//! Record to row coercion.
//!
//! Every row carries one value per schema column, in schema order. Keys the
//! schema does not know are dropped; missing keys become NULL.

use serde_json::Value;

use rmodels_core::schema::SchemaDescriptor;
use rmodels_core::temporal::{format_timestamp, parse_date_object, parse_datetime};
use rmodels_core::{Record, SqlRow, SqlValue};

/// Coerce one remote record into a row matching `schema`.
pub fn row(record: &Record, schema: &SchemaDescriptor) -> SqlRow {
    schema
        .names()
        .map(|name| record.get(name).map_or(SqlValue::Null, value))
        .collect()
}

/// Coerce one raw JSON value.
///
/// Date objects and date strings become `YYYY-MM-DD HH:MM:SS` text;
/// other objects and arrays are stored as JSON text.
pub fn value(raw: &Value) -> SqlValue {
    match raw {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => n.as_f64().map_or(SqlValue::Null, SqlValue::Real),
        },
        Value::String(s) => match parse_datetime(s) {
            Some(dt) => SqlValue::Text(format_timestamp(&dt)),
            None => SqlValue::Text(s.clone()),
        },
        Value::Object(object) => match parse_date_object(object) {
            Some(dt) => SqlValue::Text(format_timestamp(&dt)),
            None => SqlValue::Text(raw.to_string()),
        },
        Value::Array(_) => SqlValue::Text(raw.to_string()),
    }
}
