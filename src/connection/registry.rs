//! Connection ids -> open handles.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags};
use tracing::info;

use super::cache::{ConnectionCache, DbHandle};
use crate::error::{Error, Result};
use crate::query::get_tables;
use crate::store::{AppStore, ConnectionStats, NewConnection, SavedConnection};
use crate::template::TableCatalog;

/// Inspect a database file: size on disk and number of user tables.
///
/// A file that cannot be opened read-only, or is not a SQLite database, is
/// reported as invalid rather than as an error.
pub fn inspect_database(path: &Path) -> ConnectionStats {
    let size_bytes = std::fs::metadata(path).ok().map(|m| m.len());
    let table_count = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .ok()
        .and_then(|conn| get_tables(&conn).ok())
        .map(|tables| tables.len() as u64);
    ConnectionStats {
        size_bytes,
        table_count,
        is_valid: size_bytes.is_some() && table_count.is_some(),
    }
}

/// Resolves registered connection ids to cached read-only handles.
pub struct ConnectionRegistry {
    store: Mutex<AppStore>,
    cache: ConnectionCache,
}

impl ConnectionRegistry {
    pub fn new(store: AppStore, cache: ConnectionCache) -> Self {
        Self {
            store: Mutex::new(store),
            cache,
        }
    }

    pub fn store(&self) -> &Mutex<AppStore> {
        &self.store
    }

    pub fn cache(&self) -> &ConnectionCache {
        &self.cache
    }

    /// Register a database file. Fails with InvalidInput if it cannot be
    /// opened as a SQLite database.
    pub fn register(&self, new: &NewConnection) -> Result<SavedConnection> {
        let stats = inspect_database(Path::new(&new.path));
        if !stats.is_valid {
            return Err(Error::invalid(format!(
                "Not a readable SQLite database: {}",
                new.path
            )));
        }
        let saved = self.store.lock().create_connection(new, &stats)?;
        info!(id = saved.id, path = %saved.path, "registered connection");
        Ok(saved)
    }

    /// Look up a connection, failing with NotFound for an unknown id.
    pub fn connection(&self, id: i64) -> Result<SavedConnection> {
        self.store
            .lock()
            .get_connection(id)?
            .ok_or_else(|| Error::not_found(format!("Connection not found with ID: {}", id)))
    }

    /// Open (or reuse) the handle for `id` and record the access.
    pub fn handle(&self, id: i64) -> Result<Arc<DbHandle>> {
        let connection = self.connection(id)?;
        let handle = self.cache.get_or_open(id, Path::new(&connection.path))?;
        self.store.lock().touch_connection(id)?;
        Ok(handle)
    }

    /// Re-inspect the file behind `id` and store the result.
    pub fn refresh_stats(&self, id: i64) -> Result<ConnectionStats> {
        let connection = self.connection(id)?;
        let stats = inspect_database(Path::new(&connection.path));
        self.store.lock().update_connection_stats(id, &stats)?;
        Ok(stats)
    }

    /// Delete a connection and close its cached handle.
    pub fn remove(&self, id: i64) -> Result<bool> {
        let deleted = self.store.lock().delete_connection(id)?;
        self.cache.close(id);
        Ok(deleted)
    }
}

impl TableCatalog for ConnectionRegistry {
    fn table_names(&self, connection_id: i64) -> Result<Vec<String>> {
        let handle = self.handle(connection_id)?;
        let conn = handle.lock();
        get_tables(&conn)
    }
}
