//! Query composer: paginated, sorted, filtered reads of one table.
//!
//! ```text
//! QueryRequest ──► validate table / sort column
//!              ──► build_where(filters)          (shared by both statements)
//!              ──► SELECT COUNT(*) ... WHERE     → total
//!              ──► SELECT * ... WHERE ORDER BY LIMIT OFFSET → rows
//!              ──► columns from first row, or from the schema when empty
//! ```
//!
//! Any engine failure aborts the whole operation; no partial result is
//! returned.

use rusqlite::{params_from_iter, Connection};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::filter::Filters;
use super::predicate::build_where;
use super::row::{column_key, query_rows, Row};
use super::schema::get_table_schema;
use crate::error::{Error, Result};
use crate::sql::{Ident, OrderBy, Select, SortDir};

/// Page size used when a request does not name one.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Sample size used when a request does not name one.
pub const DEFAULT_SAMPLE_SIZE: u32 = 100;

/// Upper bounds applied to caller-supplied sizes.
///
/// Sizes above the cap are clamped, not rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryLimits {
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub default_sample_size: u32,
    pub max_sample_size: u32,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: 1000,
            default_sample_size: DEFAULT_SAMPLE_SIZE,
            max_sample_size: 1000,
        }
    }
}

impl QueryLimits {
    /// Resolve a requested page size: default when unset, clamped to the cap.
    pub fn page_size(&self, requested: Option<u32>) -> Result<u32> {
        let size = requested.unwrap_or(self.default_page_size);
        if size == 0 {
            return Err(Error::invalid("pageSize must be a positive integer"));
        }
        Ok(size.min(self.max_page_size.max(1)))
    }

    /// Resolve a requested sample size the same way.
    pub fn sample_size(&self, requested: Option<u32>) -> Result<u32> {
        let size = requested.unwrap_or(self.default_sample_size);
        if size == 0 {
            return Err(Error::invalid("sampleSize must be a positive integer"));
        }
        Ok(size.min(self.max_sample_size.max(1)))
    }
}

/// A read request against one table.
#[derive(Debug, Clone, Default, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct QueryRequest {
    pub table: String,
    /// 1-based page; defaults to 1.
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort_column: Option<String>,
    pub sort_direction: SortDir,
    pub filters: Filters,
}

impl QueryRequest {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn sort(mut self, column: impl Into<String>, direction: SortDir) -> Self {
        self.sort_column = Some(column.into());
        self.sort_direction = direction;
        self
    }

    pub fn filters(mut self, filters: Filters) -> Self {
        self.filters = filters;
        self
    }
}

/// One page of rows plus the filtered total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    /// Rows matching the filters, ignoring pagination.
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

/// Where the column list of a result comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageShape {
    /// Columns are the first row's keys.
    HasRows,
    /// No rows on this page; columns come from the declared schema.
    Empty,
}

impl PageShape {
    pub fn of(rows: &[Row]) -> Self {
        if rows.is_empty() {
            PageShape::Empty
        } else {
            PageShape::HasRows
        }
    }
}

/// Run a paginated query.
pub fn execute_query(
    conn: &Connection,
    request: &QueryRequest,
    limits: &QueryLimits,
) -> Result<QueryResult> {
    let table = Ident::parse(&request.table)?;

    let page = request.page.unwrap_or(1);
    if page == 0 {
        return Err(Error::invalid("page must be a positive integer"));
    }
    let page_size = limits.page_size(request.page_size)?;
    let offset = u64::from(page - 1) * u64::from(page_size);

    let clause = build_where(&request.filters)?;
    let order = match request.sort_column.as_deref() {
        Some(column) if !column.is_empty() => Some(OrderBy::column(
            Ident::parse(column)?,
            request.sort_direction,
        )),
        _ => None,
    };

    let condition = clause.condition();
    let count_sql = Select::count(&table).filter(condition.as_deref()).to_sql();
    let data_sql = Select::star(&table)
        .filter(condition.as_deref())
        .order_by(order)
        .limit(u64::from(page_size))
        .offset(offset)
        .to_sql();

    debug!(
        table = %table,
        sql = %data_sql,
        params = clause.params().len(),
        page,
        page_size,
        "executing table query"
    );

    let total: i64 = conn
        .query_row(&count_sql, params_from_iter(clause.params().iter()), |row| {
            row.get(0)
        })
        .map_err(|e| Error::query(format!("count rows of {}", table), e))?;

    let rows = query_rows(conn, &data_sql, clause.params())
        .map_err(|e| Error::query(format!("read page of {}", table), e))?;

    let columns = match PageShape::of(&rows) {
        PageShape::HasRows => rows[0].keys().cloned().collect(),
        PageShape::Empty => get_table_schema(conn, table.as_str())?
            .iter()
            .map(|c| column_key(&c.name))
            .collect(),
    };

    Ok(QueryResult {
        columns,
        rows,
        total: u64::try_from(total).unwrap_or(0),
        page,
        page_size,
    })
}
