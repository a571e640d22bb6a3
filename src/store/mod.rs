//! The application's own SQLite store.
//!
//! Holds everything sqlviz persists about itself, separate from the user
//! databases it browses:
//!
//! ```text
//! connections            -> registered database files
//! insight_templates      -> chart recipes (three defaults seeded)
//! saved_visualizations   -> chart configs, cascade-deleted with their connection
//! meta                   -> schema version
//! ```
//!
//! JSON documents (template and visualization configs) are stored as text.

mod connections;
mod templates;
mod visualizations;

pub use connections::{ConnectionStats, NewConnection, SavedConnection};
pub use templates::DEFAULT_TEMPLATES;
pub use visualizations::{NewVisualization, SavedVisualization};

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::error::Result;
use crate::query::row::parse_timestamp;

/// Current store schema version. Bump when the table layout changes.
const STORE_VERSION: i32 = 1;

const SCHEMA_SQL: &str = "
    CREATE TABLE IF NOT EXISTS meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS connections (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        path TEXT NOT NULL,
        last_accessed TEXT NOT NULL,
        size_bytes INTEGER,
        table_count INTEGER,
        is_valid BOOLEAN NOT NULL DEFAULT 1
    );

    CREATE TABLE IF NOT EXISTS insight_templates (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        description TEXT,
        type TEXT NOT NULL,
        config TEXT NOT NULL,
        category TEXT,
        is_default BOOLEAN NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS saved_visualizations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        connection_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        type TEXT NOT NULL,
        config TEXT NOT NULL,
        table_name TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        FOREIGN KEY (connection_id) REFERENCES connections(id) ON DELETE CASCADE
    );
";

/// CRUD over the application database.
pub struct AppStore {
    conn: Connection,
}

impl AppStore {
    /// Open or create the store at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init()?;
        info!(path = %path.display(), "opened app store");
        Ok(store)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    fn init(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(SCHEMA_SQL)?;

        let stored_version: Option<i32> = self
            .conn
            .query_row("SELECT value FROM meta WHERE key = 'version'", [], |row| {
                let s: String = row.get(0)?;
                Ok(s.parse().unwrap_or(0))
            })
            .optional()?;

        match stored_version {
            Some(v) if v == STORE_VERSION => {}
            Some(v) => {
                warn!(found = v, expected = STORE_VERSION, "app store version mismatch");
                self.set_version()?;
            }
            None => self.set_version()?,
        }
        Ok(())
    }

    fn set_version(&self) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES ('version', ?)",
            params![STORE_VERSION.to_string()],
        )?;
        Ok(())
    }

    /// Stored schema version.
    pub fn version(&self) -> Result<i32> {
        let v: String = self
            .conn
            .query_row("SELECT value FROM meta WHERE key = 'version'", [], |row| {
                row.get(0)
            })?;
        Ok(v.parse().unwrap_or(0))
    }
}

// =============================================================================
// Column helpers shared by the submodules
// =============================================================================

fn now_text() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn read_timestamp(text: &str) -> DateTime<Utc> {
    parse_timestamp(text).unwrap_or_default()
}

/// Parse a stored JSON document; malformed text reads as `{}`.
fn read_config(kind: &str, id: i64, text: &str) -> Value {
    match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            warn!(kind, id, error = %e, "malformed stored config, using empty object");
            Value::Object(Map::new())
        }
    }
}
