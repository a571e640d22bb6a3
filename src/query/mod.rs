//! Read-only query processing against user SQLite files.
//!
//! ```text
//! filters (JSON / filter[col]=v) ──► filter ──► predicate ──┐
//!                                                            ▼
//! QueryRequest ─────────────────────────────────────► composer ──► QueryResult
//!                                                       │    ▲
//!                                        schema ◄───────┘    └── row (transform)
//! ```
//!
//! Every function here takes a plain `&rusqlite::Connection`; obtaining the
//! handle and bounding execution time is the caller's job (see
//! [`crate::connection`]).

pub mod composer;
pub mod filter;
pub mod predicate;
pub mod row;
pub mod sample;
pub mod schema;

pub use composer::{execute_query, PageShape, QueryLimits, QueryRequest, QueryResult};
pub use filter::{filters_from_query, parse_filters, FilterExpression, FilterOp, FilterScalar, Filters};
pub use predicate::{build_where, WhereClause};
pub use row::{query_rows, Row};
pub use sample::get_sample_data;
pub use schema::{get_table_schema, get_tables, table_exists, ColumnSchema};
