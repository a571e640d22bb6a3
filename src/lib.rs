//! # sqlviz
//!
//! A read-only browser for SQLite files: paginated and filtered table reads,
//! insight templates and chart-ready data.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │          HTTP API (web) / CLI (src/bin/main.rs)          │
//! └─────────────────────────────────────────────────────────┘
//!            │                              │
//!            ▼                              ▼
//! ┌──────────────────────────┐  ┌──────────────────────────┐
//! │  template  (fields,      │  │  chart  (shaper,         │
//! │            apply)        │  │          preview)        │
//! └──────────────────────────┘  └──────────────────────────┘
//!            │                              │
//!            ▼                              ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │  query  (filter -> predicate -> composer, schema,        │
//! │          sample, row)                                    │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [sql: ident, select]
//! ┌─────────────────────────────────────────────────────────┐
//! │  connection (LRU of read-only handles, deadlines)        │
//! │  store      (connections, templates, visualizations)     │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Every table and column name that reaches SQL text has passed
//! [`sql::validate_identifier`]; every value is bound as a parameter.

pub mod chart;
pub mod config;
pub mod connection;
pub mod error;
pub mod export;
pub mod query;
pub mod sql;
pub mod store;
pub mod template;

#[cfg(feature = "server")]
pub mod web;

pub use error::{Error, ErrorKind, Result};

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::chart::{
        preview_chart, shape_chart_data, ChartConfig, ChartData, ChartType, Dataset,
    };
    pub use crate::config::Settings;
    pub use crate::connection::{ConnectionCache, ConnectionRegistry, DbHandle};
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::export::to_csv;
    pub use crate::query::{
        execute_query, get_sample_data, get_table_schema, get_tables, parse_filters,
        FilterExpression, Filters, QueryLimits, QueryRequest, QueryResult, Row,
    };
    pub use crate::sql::{validate_identifier, SortDir};
    pub use crate::store::AppStore;
    pub use crate::template::{apply_template, extract_fields, FieldMappings, InsightTemplate};
}
