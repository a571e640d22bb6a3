//! Registered database files.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::{now_text, read_timestamp, AppStore};
use crate::error::{Error, Result};

/// A database file the user has registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedConnection {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub last_accessed: DateTime<Utc>,
    pub size_bytes: Option<u64>,
    pub table_count: Option<u64>,
    pub is_valid: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewConnection {
    pub name: String,
    pub path: String,
}

impl NewConnection {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// What a health check learned about a database file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStats {
    pub size_bytes: Option<u64>,
    pub table_count: Option<u64>,
    pub is_valid: bool,
}

impl Default for ConnectionStats {
    fn default() -> Self {
        Self {
            size_bytes: None,
            table_count: None,
            is_valid: true,
        }
    }
}

const SELECT_CONNECTION: &str = "SELECT id, name, path, last_accessed, size_bytes, table_count, is_valid \
     FROM connections";

fn connection_from_row(row: &Row<'_>) -> rusqlite::Result<SavedConnection> {
    let last_accessed: String = row.get(3)?;
    Ok(SavedConnection {
        id: row.get(0)?,
        name: row.get(1)?,
        path: row.get(2)?,
        last_accessed: read_timestamp(&last_accessed),
        size_bytes: row.get::<_, Option<i64>>(4)?.map(|n| n.max(0) as u64),
        table_count: row.get::<_, Option<i64>>(5)?.map(|n| n.max(0) as u64),
        is_valid: row.get(6)?,
    })
}

impl AppStore {
    pub fn create_connection(
        &self,
        new: &NewConnection,
        stats: &ConnectionStats,
    ) -> Result<SavedConnection> {
        self.conn.execute(
            "INSERT INTO connections (name, path, last_accessed, size_bytes, table_count, is_valid) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                new.name,
                new.path,
                now_text(),
                stats.size_bytes.map(|n| n as i64),
                stats.table_count.map(|n| n as i64),
                stats.is_valid,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_connection(id)?
            .ok_or(Error::Store(rusqlite::Error::QueryReturnedNoRows))
    }

    /// All connections, most recently accessed first.
    pub fn list_connections(&self) -> Result<Vec<SavedConnection>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} ORDER BY last_accessed DESC, id DESC",
            SELECT_CONNECTION
        ))?;
        let connections = stmt
            .query_map([], connection_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(connections)
    }

    pub fn get_connection(&self, id: i64) -> Result<Option<SavedConnection>> {
        let connection = self
            .conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_CONNECTION),
                params![id],
                connection_from_row,
            )
            .optional()?;
        Ok(connection)
    }

    /// Record an access; returns false for an unknown id.
    pub fn touch_connection(&self, id: i64) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE connections SET last_accessed = ?1 WHERE id = ?2",
            params![now_text(), id],
        )?;
        Ok(rows > 0)
    }

    pub fn update_connection_stats(&self, id: i64, stats: &ConnectionStats) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE connections SET size_bytes = ?1, table_count = ?2, is_valid = ?3 WHERE id = ?4",
            params![
                stats.size_bytes.map(|n| n as i64),
                stats.table_count.map(|n| n as i64),
                stats.is_valid,
                id,
            ],
        )?;
        Ok(rows > 0)
    }

    /// Delete a connection and its saved visualizations.
    pub fn delete_connection(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM connections WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }
}
