//! Running blocking SQLite work from async code.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::Connection;
use tracing::{debug, warn};

use super::cache::DbHandle;
use crate::error::{Error, Result};

/// Default per-query budget.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Where one deadline-bound call is, as seen by both sides.
///
/// The worker moves Pending -> Running once it holds the connection and
/// Running -> Done before releasing it. The waiter moves Pending ->
/// Cancelled on timeout, and only interrupts while the state is Running, so
/// an interrupt can never reach a statement issued by another caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Pending,
    Running,
    Done,
    Cancelled,
}

/// Run `f` against `handle` on the blocking pool, giving up after `timeout`.
///
/// On timeout [`Error::Timeout`] is returned. If `f` is already running its
/// statement is interrupted; if it is still waiting for the connection it is
/// skipped once the connection frees up.
pub async fn run_with_deadline<T, F>(handle: Arc<DbHandle>, timeout: Duration, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
{
    let ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
    let phase = Arc::new(Mutex::new(Phase::Pending));

    let worker = Arc::clone(&handle);
    let worker_phase = Arc::clone(&phase);
    let task = tokio::task::spawn_blocking(move || {
        let conn = worker.lock();
        {
            let mut phase = worker_phase.lock();
            if *phase == Phase::Cancelled {
                return Err(Error::Timeout(ms));
            }
            *phase = Phase::Running;
        }
        let result = f(&conn);
        *worker_phase.lock() = Phase::Done;
        result
    });

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(Error::Task(join_err.to_string())),
        Err(_) => {
            let mut phase = phase.lock();
            match *phase {
                Phase::Running => {
                    handle.interrupt();
                    warn!(
                        path = %handle.path().display(),
                        timeout_ms = ms,
                        "query exceeded deadline, interrupted"
                    );
                }
                Phase::Pending => {
                    *phase = Phase::Cancelled;
                    debug!(
                        path = %handle.path().display(),
                        timeout_ms = ms,
                        "deadline passed while waiting for the connection"
                    );
                }
                Phase::Done | Phase::Cancelled => {}
            }
            Err(Error::Timeout(ms))
        }
    }
}

/// Run `f` on the blocking pool without a deadline.
pub async fn run_blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Task(e.to_string()))?
}
