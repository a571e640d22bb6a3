//! Random row sampling.

use rusqlite::Connection;
use tracing::debug;

use super::composer::QueryLimits;
use super::row::{query_rows, Row};
use crate::error::{Error, Result};
use crate::sql::{Ident, OrderBy, Select};

/// Up to `sample_size` rows of `table` in random order.
///
/// Not seeded: repeated calls may return different rows. The size defaults
/// to `limits.default_sample_size` and is clamped to `limits.max_sample_size`.
pub fn get_sample_data(
    conn: &Connection,
    table: &str,
    sample_size: Option<u32>,
    limits: &QueryLimits,
) -> Result<Vec<Row>> {
    let table = Ident::parse(table)?;
    let size = limits.sample_size(sample_size)?;

    let sql = Select::star(&table)
        .order_by(Some(OrderBy::Random))
        .limit(u64::from(size))
        .to_sql();
    debug!(table = %table, size, "sampling rows");

    query_rows(conn, &sql, &[]).map_err(|e| Error::query(format!("sample {}", table), e))
}
