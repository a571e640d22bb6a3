//! Schema introspection over SQLite's catalog.

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sql::Ident;

const TABLES_SQL: &str = "SELECT name FROM sqlite_master \
     WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
     ORDER BY name";

const COLUMNS_SQL: &str = "SELECT name, type FROM pragma_table_info(?1) ORDER BY cid";

/// One column of a table, in catalog order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    /// Declared type; empty when the column was declared without one.
    #[serde(rename = "type")]
    pub declared_type: String,
}

/// List user tables, sorted by name. SQLite's internal tables are excluded.
pub fn get_tables(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare(TABLES_SQL)
        .map_err(|e| Error::query("list tables", e))?;
    let tables = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
        .map_err(|e| Error::query("list tables", e))?;
    Ok(tables)
}

/// Check whether `table` is one of the user tables.
pub fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    Ok(get_tables(conn)?.iter().any(|t| t == table))
}

/// Declared columns of `table`, in definition order.
///
/// An unknown table yields an empty list (SQLite's pragma behaves that way).
pub fn get_table_schema(conn: &Connection, table: &str) -> Result<Vec<ColumnSchema>> {
    let table = Ident::parse(table)?;
    let context = format!("schema of {}", table);

    let mut stmt = conn
        .prepare(COLUMNS_SQL)
        .map_err(|e| Error::query(&context, e))?;
    let columns = stmt
        .query_map(params![table.as_str()], |row| {
            Ok(ColumnSchema {
                name: row.get(0)?,
                declared_type: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            })
        })
        .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
        .map_err(|e| Error::query(&context, e))?;
    Ok(columns)
}
