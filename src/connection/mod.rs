//! Access to user database files.
//!
//! - [`cache`] - LRU of read-only handles, closed on eviction and shutdown
//! - [`deadline`] - runs blocking query work with a per-call timeout
//! - [`registry`] - resolves connection ids from the app store to handles

pub mod cache;
pub mod deadline;
pub mod registry;

pub use cache::{ConnectionCache, DbHandle};
pub use deadline::{run_blocking, run_with_deadline, DEFAULT_QUERY_TIMEOUT};
pub use registry::{inspect_database, ConnectionRegistry};
