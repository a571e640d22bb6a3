//! Row transformer.
//!
//! Converts raw SQLite rows into JSON objects before they leave the query
//! layer:
//!
//! - `snake_case` column names become `camelCase` keys
//! - INTEGER 0/1 in a column declared `BOOLEAN`/`BOOL` becomes `true`/`false`
//! - TEXT holding an ISO-8601 timestamp is normalized to RFC 3339 UTC
//! - TEXT starting with `{` or `[` is parsed as JSON, falling back to the
//!   raw string
//!
//! Key order follows the statement's column order (`serde_json` is built
//! with `preserve_order`).

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use inflector::cases::camelcase::to_camel_case;
use inflector::cases::snakecase::is_snake_case;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use serde_json::{Map, Number, Value};

/// A transformed row: column key -> value, in column order.
pub type Row = Map<String, Value>;

static TIMESTAMP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}(:\d{2}(\.\d+)?)?(Z|[+-]\d{2}:?\d{2})?$")
        .expect("timestamp pattern is valid")
});

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Column name plus its declared type (as written in `CREATE TABLE`).
#[derive(Debug, Clone)]
struct ColumnInfo {
    key: String,
    is_bool: bool,
}

/// Run `sql` with positional `params` and return transformed rows.
pub fn query_rows(
    conn: &Connection,
    sql: &str,
    params: &[SqlValue],
) -> rusqlite::Result<Vec<Row>> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<ColumnInfo> = stmt
        .columns()
        .iter()
        .map(|c| ColumnInfo {
            key: column_key(c.name()),
            is_bool: c
                .decl_type()
                .map(|t| t.to_ascii_uppercase().contains("BOOL"))
                .unwrap_or(false),
        })
        .collect();

    let mut rows = stmt.query(params_from_iter(params.iter()))?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut map = Row::with_capacity(columns.len());
        for (idx, column) in columns.iter().enumerate() {
            let value = transform_value(row.get_ref(idx)?, column.is_bool);
            map.insert(column.key.clone(), value);
        }
        out.push(map);
    }
    Ok(out)
}

/// Output key for a raw column name.
///
/// Only snake_case names are rewritten; anything else is kept verbatim.
pub fn column_key(name: &str) -> String {
    if name.contains('_') && is_snake_case(name) {
        to_camel_case(name)
    } else {
        name.to_string()
    }
}

/// Convert one raw value.
pub fn transform_value(raw: ValueRef<'_>, is_bool_column: bool) -> Value {
    match raw {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) if is_bool_column && (i == 0 || i == 1) => Value::Bool(i == 1),
        ValueRef::Integer(i) => Value::Number(i.into()),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(bytes) => transform_text(&String::from_utf8_lossy(bytes)),
        ValueRef::Blob(bytes) => Value::String(format!("<blob {} bytes>", bytes.len())),
    }
}

fn transform_text(text: &str) -> Value {
    let trimmed = text.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(parsed) = serde_json::from_str::<Value>(text) {
            return parsed;
        }
    }

    if TIMESTAMP_RE.is_match(text) {
        if let Some(ts) = parse_timestamp(text) {
            return Value::String(ts.to_rfc3339_opts(SecondsFormat::Millis, true));
        }
    }

    Value::String(text.to_string())
}

/// Parse an ISO-8601 timestamp; values without an offset are taken as UTC.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
}
