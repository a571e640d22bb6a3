//! Chart preview: run a chart config's query and shape the result.

use rusqlite::Connection;
use tracing::debug;

use super::shaper::shape_chart_data;
use super::types::{ChartConfig, ChartData};
use crate::error::Result;
use crate::query::{execute_query, parse_filters, Filters, QueryLimits, QueryRequest};
use crate::sql::validate_identifier;

/// Fetch up to `max_rows` rows for `config` and shape them.
pub fn preview_chart(conn: &Connection, config: &ChartConfig, max_rows: u32) -> Result<ChartData> {
    validate_identifier(&config.table)?;
    validate_identifier(&config.x_field)?;
    validate_identifier(&config.y_field)?;
    if let Some(group_by) = config.group_by() {
        validate_identifier(group_by)?;
    }

    let filters = match &config.filters {
        Some(map) => parse_filters(map)?,
        None => Filters::new(),
    };

    let rows = max_rows.max(1);
    let limits = QueryLimits {
        default_page_size: rows,
        max_page_size: rows,
        ..QueryLimits::default()
    };
    let request = QueryRequest::new(config.table.clone()).filters(filters);
    let result = execute_query(conn, &request, &limits)?;

    debug!(
        table = %config.table,
        chart_type = %config.chart_type,
        rows = result.rows.len(),
        total = result.total,
        "chart preview"
    );
    Ok(shape_chart_data(&result.rows, config))
}
