//! CSV export of query results.

use std::io;

use csv::{Terminator, WriterBuilder};
use rusqlite::Connection;
use serde_json::Value;
use tracing::info;

use crate::chart::ChartConfig;
use crate::error::Result;
use crate::query::{execute_query, parse_filters, Filters, QueryLimits, QueryRequest, Row};

/// Render `rows` as CSV with a header line.
///
/// Fields containing a comma, quote, CR or LF are quoted with inner quotes
/// doubled. Nulls and missing keys are empty; objects and arrays are
/// written as JSON text. Lines end with `\r\n`.
pub fn to_csv(columns: &[String], rows: &[Row]) -> Result<String> {
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::CRLF)
        .from_writer(Vec::new());
    writer.write_record(columns).map_err(io::Error::from)?;
    for row in rows {
        writer
            .write_record(columns.iter().map(|c| field_text(row.get(c.as_str()))))
            .map_err(io::Error::from)?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e).into())
}

/// Export up to `max_rows` rows of `table` matching `filters`.
pub fn export_table(
    conn: &Connection,
    table: &str,
    filters: Filters,
    max_rows: u32,
) -> Result<String> {
    let rows = max_rows.max(1);
    let limits = QueryLimits {
        default_page_size: rows,
        max_page_size: rows,
        ..QueryLimits::default()
    };
    let request = QueryRequest::new(table).filters(filters);
    let result = execute_query(conn, &request, &limits)?;
    info!(
        table,
        rows = result.rows.len(),
        total = result.total,
        "exported table as CSV"
    );
    to_csv(&result.columns, &result.rows)
}

/// Export the rows behind a saved chart config (its table and filters).
pub fn export_chart(conn: &Connection, config: &ChartConfig, max_rows: u32) -> Result<String> {
    let filters = match &config.filters {
        Some(map) => parse_filters(map)?,
        None => Filters::new(),
    };
    export_table(conn, &config.table, filters, max_rows)
}

fn field_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => other.to_string(),
    }
}
