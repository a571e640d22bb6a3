//! LRU cache of read-only database handles.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lru::LruCache;
use parking_lot::{Mutex, MutexGuard};
use rusqlite::{Connection, InterruptHandle, OpenFlags};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// An open read-only connection to one user database.
///
/// Work on the connection holds the mutex; the interrupt handle can be used
/// from any thread to abort the statement in progress.
pub struct DbHandle {
    path: PathBuf,
    conn: Mutex<Connection>,
    interrupt: InterruptHandle,
}

impl std::fmt::Debug for DbHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbHandle").field("path", &self.path).finish_non_exhaustive()
    }
}

impl DbHandle {
    /// Open `path` read-only. The file must already exist.
    pub fn open(path: &Path) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags)
            .map_err(|e| Error::query(format!("open {}", path.display()), e))?;
        Ok(Self::from_connection(conn, path))
    }

    /// Wrap an already-open connection.
    pub fn from_connection(conn: Connection, path: impl Into<PathBuf>) -> Self {
        let interrupt = conn.get_interrupt_handle();
        Self {
            path: path.into(),
            conn: Mutex::new(conn),
            interrupt,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Exclusive access to the connection.
    pub fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }

    /// Abort whatever statement is running on this handle.
    pub fn interrupt(&self) {
        self.interrupt.interrupt();
    }

    /// Close the connection, reporting any error SQLite returns.
    fn close(self) {
        let path = self.path;
        if let Err((_, e)) = self.conn.into_inner().close() {
            warn!(path = %path.display(), error = %e, "error closing database");
        }
    }
}

/// Handles keyed by connection id, least recently used evicted first.
///
/// Evicted or removed handles are closed once the last in-flight user drops
/// its `Arc`.
pub struct ConnectionCache {
    entries: Mutex<LruCache<i64, Arc<DbHandle>>>,
}

impl ConnectionCache {
    /// Create a cache holding at most `capacity` handles (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Cached handle for `id`, opening `path` on a miss.
    pub fn get_or_open(&self, id: i64, path: &Path) -> Result<Arc<DbHandle>> {
        let mut entries = self.entries.lock();
        if let Some(handle) = entries.get(&id) {
            if handle.path() == path {
                return Ok(Arc::clone(handle));
            }
        }

        let handle = Arc::new(DbHandle::open(path)?);
        debug!(id, path = %path.display(), "opened database handle");
        if let Some((evicted_id, evicted)) = entries.push(id, Arc::clone(&handle)) {
            // push also returns the old value when `id` was already cached
            info!(id = evicted_id, "closing evicted database handle");
            release(evicted);
        }
        Ok(handle)
    }

    /// Drop the handle for `id`. Returns false if it was not cached.
    pub fn close(&self, id: i64) -> bool {
        let removed = self.entries.lock().pop(&id);
        match removed {
            Some(handle) => {
                debug!(id, "closing database handle");
                release(handle);
                true
            }
            None => false,
        }
    }

    /// Drop every handle. Returns how many were cached.
    pub fn close_all(&self) -> usize {
        let drained: Vec<_> = {
            let mut entries = self.entries.lock();
            let mut drained = Vec::with_capacity(entries.len());
            while let Some((_, handle)) = entries.pop_lru() {
                drained.push(handle);
            }
            drained
        };
        let count = drained.len();
        drained.into_iter().for_each(release);
        if count > 0 {
            info!(count, "closed all database handles");
        }
        count
    }

    pub fn contains(&self, id: i64) -> bool {
        self.entries.lock().contains(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }
}

impl Drop for ConnectionCache {
    fn drop(&mut self) {
        self.close_all();
    }
}

/// Close now if nobody else holds the handle; otherwise the last holder's
/// drop closes it.
fn release(handle: Arc<DbHandle>) {
    if let Ok(handle) = Arc::try_unwrap(handle) {
        handle.close();
    }
}
