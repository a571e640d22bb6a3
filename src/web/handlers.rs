//! API handlers.
//!
//! Store work runs on the blocking pool; queries against user databases run
//! under the configured per-query deadline.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use rusqlite::Connection;
use serde::Deserialize;
use std::sync::Arc;

use crate::chart::{preview_chart, ChartConfig, ChartData};
use crate::connection::{run_blocking, run_with_deadline};
use crate::error::{Error, Result};
use crate::export::{export_chart, export_table};
use crate::query::{
    execute_query, filters_from_query, get_sample_data, get_table_schema, get_tables,
    table_exists, ColumnSchema, QueryRequest, QueryResult, Row,
};
use crate::sql::{validate_identifier, SortDir};
use crate::store::{
    AppStore, ConnectionStats, NewConnection, NewVisualization, SavedConnection,
    SavedVisualization,
};
use crate::template::{FieldMappings, InsightTemplate};

use super::server::AppState;

type SharedState = State<Arc<AppState>>;

/// Raw query-string pairs, in request order.
type QueryPairs = Query<Vec<(String, String)>>;

// ============================================================================
// Helpers
// ============================================================================

/// Run `f` against the app store on the blocking pool.
async fn with_store<T, F>(state: &AppState, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&AppStore) -> Result<T> + Send + 'static,
{
    let registry = Arc::clone(&state.registry);
    run_blocking(move || f(&registry.store().lock())).await
}

/// Run `f` against connection `id`'s database under the query deadline.
async fn with_database<T, F>(state: &AppState, id: i64, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
{
    let registry = Arc::clone(&state.registry);
    let handle = run_blocking(move || registry.handle(id)).await?;
    run_with_deadline(handle, state.settings.limits.query_timeout(), f).await
}

fn require_table(conn: &Connection, table: &str) -> Result<()> {
    validate_identifier(table)?;
    if !table_exists(conn, table)? {
        return Err(Error::not_found(format!("Table does not exist: {}", table)));
    }
    Ok(())
}

fn lookup<T>(found: Option<T>, what: &str, id: i64) -> Result<T> {
    found.ok_or_else(|| Error::not_found(format!("{} not found with ID: {}", what, id)))
}

fn parse_count(name: &str, value: &str) -> Result<u32> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::invalid(format!("{} must be a non-negative integer", name)))
}

fn pair<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn filter_pairs(pairs: &[(String, String)]) -> impl Iterator<Item = (&str, &str)> {
    pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
}

/// Build a [`QueryRequest`] from `page`, `pageSize`, `sortColumn`,
/// `sortDirection` and `filter[col]` parameters.
fn data_request(table: &str, pairs: &[(String, String)]) -> Result<QueryRequest> {
    let mut request = QueryRequest::new(table).filters(filters_from_query(filter_pairs(pairs)));
    if let Some(page) = pair(pairs, "page") {
        request = request.page(parse_count("page", page)?);
    }
    if let Some(size) = pair(pairs, "pageSize") {
        request = request.page_size(parse_count("pageSize", size)?);
    }
    if let Some(column) = pair(pairs, "sortColumn").filter(|c| !c.is_empty()) {
        let direction = pair(pairs, "sortDirection")
            .map(SortDir::parse_lossy)
            .unwrap_or_default();
        request = request.sort(column, direction);
    }
    Ok(request)
}

fn csv_response(filename: &str, body: String) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}.csv\"", filename),
            ),
        ],
        body,
    )
}

// ============================================================================
// Connections
// ============================================================================

/// GET /api/connections
pub async fn list_connections(State(state): SharedState) -> Result<Json<Vec<SavedConnection>>> {
    with_store(&state, |store| store.list_connections())
        .await
        .map(Json)
}

/// POST /api/connections
pub async fn create_connection(
    State(state): SharedState,
    Json(new): Json<NewConnection>,
) -> Result<(StatusCode, Json<SavedConnection>)> {
    if new.name.trim().is_empty() || new.path.trim().is_empty() {
        return Err(Error::invalid("Connection name and path are required"));
    }
    let registry = Arc::clone(&state.registry);
    let saved = run_blocking(move || registry.register(&new)).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

/// GET /api/connections/{id}
pub async fn get_connection(
    State(state): SharedState,
    Path(id): Path<i64>,
) -> Result<Json<SavedConnection>> {
    let registry = Arc::clone(&state.registry);
    run_blocking(move || registry.connection(id)).await.map(Json)
}

/// DELETE /api/connections/{id}
pub async fn delete_connection(
    State(state): SharedState,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    let registry = Arc::clone(&state.registry);
    if run_blocking(move || registry.remove(id)).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::not_found(format!("Connection not found with ID: {}", id)))
    }
}

/// GET /api/connections/{id}/health
pub async fn connection_health(
    State(state): SharedState,
    Path(id): Path<i64>,
) -> Result<Json<ConnectionStats>> {
    let registry = Arc::clone(&state.registry);
    run_blocking(move || registry.refresh_stats(id))
        .await
        .map(Json)
}

// ============================================================================
// Browsing
// ============================================================================

/// GET /api/connections/{id}/tables
pub async fn list_tables(
    State(state): SharedState,
    Path(id): Path<i64>,
) -> Result<Json<Vec<String>>> {
    with_database(&state, id, get_tables).await.map(Json)
}

/// GET /api/connections/{id}/tables/{table}/schema
pub async fn table_schema(
    State(state): SharedState,
    Path((id, table)): Path<(i64, String)>,
) -> Result<Json<Vec<ColumnSchema>>> {
    with_database(&state, id, move |conn| {
        require_table(conn, &table)?;
        get_table_schema(conn, &table)
    })
    .await
    .map(Json)
}

/// GET /api/connections/{id}/tables/{table}/data
pub async fn table_data(
    State(state): SharedState,
    Path((id, table)): Path<(i64, String)>,
    Query(pairs): QueryPairs,
) -> Result<Json<QueryResult>> {
    let request = data_request(&table, &pairs)?;
    let limits = state.settings.limits.query_limits();
    with_database(&state, id, move |conn| {
        require_table(conn, &request.table)?;
        execute_query(conn, &request, &limits)
    })
    .await
    .map(Json)
}

/// GET /api/connections/{id}/tables/{table}/data/sample
pub async fn table_sample(
    State(state): SharedState,
    Path((id, table)): Path<(i64, String)>,
    Query(pairs): QueryPairs,
) -> Result<Json<Vec<Row>>> {
    let size = pair(&pairs, "sampleSize")
        .map(|v| parse_count("sampleSize", v))
        .transpose()?;
    let limits = state.settings.limits.query_limits();
    with_database(&state, id, move |conn| {
        require_table(conn, &table)?;
        get_sample_data(conn, &table, size, &limits)
    })
    .await
    .map(Json)
}

// ============================================================================
// Templates
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct TemplateQuery {
    pub category: Option<String>,
}

/// GET /api/templates
pub async fn list_templates(
    State(state): SharedState,
    Query(query): Query<TemplateQuery>,
) -> Result<Json<Vec<InsightTemplate>>> {
    with_store(&state, move |store| match query.category.as_deref() {
        Some(category) if !category.is_empty() => store.list_templates_by_category(category),
        _ => store.list_templates(),
    })
    .await
    .map(Json)
}

/// GET /api/templates/{id}
pub async fn get_template(
    State(state): SharedState,
    Path(id): Path<i64>,
) -> Result<Json<InsightTemplate>> {
    with_store(&state, move |store| lookup(store.get_template(id)?, "Template", id))
        .await
        .map(Json)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyTemplateRequest {
    pub connection_id: i64,
    #[serde(default)]
    pub mappings: FieldMappings,
}

/// POST /api/templates/{id}/apply
pub async fn apply_template(
    State(state): SharedState,
    Path(id): Path<i64>,
    Json(req): Json<ApplyTemplateRequest>,
) -> Result<Json<ChartConfig>> {
    let registry = Arc::clone(&state.registry);
    run_blocking(move || {
        crate::template::apply_template(
            registry.store(),
            &*registry,
            id,
            req.connection_id,
            &req.mappings,
        )
    })
    .await
    .map(Json)
}

// ============================================================================
// Visualizations
// ============================================================================

/// GET /api/visualizations
pub async fn list_visualizations(
    State(state): SharedState,
) -> Result<Json<Vec<SavedVisualization>>> {
    with_store(&state, |store| store.list_visualizations())
        .await
        .map(Json)
}

/// POST /api/visualizations
pub async fn create_visualization(
    State(state): SharedState,
    Json(new): Json<NewVisualization>,
) -> Result<(StatusCode, Json<SavedVisualization>)> {
    validate_new_visualization(&new)?;
    let saved = with_store(&state, move |store| store.create_visualization(&new)).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

/// GET /api/visualizations/{id}
pub async fn get_visualization(
    State(state): SharedState,
    Path(id): Path<i64>,
) -> Result<Json<SavedVisualization>> {
    with_store(&state, move |store| {
        lookup(store.get_visualization(id)?, "Visualization", id)
    })
    .await
    .map(Json)
}

/// PUT /api/visualizations/{id}
pub async fn update_visualization(
    State(state): SharedState,
    Path(id): Path<i64>,
    Json(update): Json<NewVisualization>,
) -> Result<Json<SavedVisualization>> {
    validate_new_visualization(&update)?;
    with_store(&state, move |store| {
        lookup(store.update_visualization(id, &update)?, "Visualization", id)
    })
    .await
    .map(Json)
}

/// DELETE /api/visualizations/{id}
pub async fn delete_visualization(
    State(state): SharedState,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    if with_store(&state, move |store| store.delete_visualization(id)).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::not_found(format!(
            "Visualization not found with ID: {}",
            id
        )))
    }
}

fn validate_new_visualization(new: &NewVisualization) -> Result<()> {
    if new.name.trim().is_empty() {
        return Err(Error::invalid("Visualization name is required"));
    }
    validate_identifier(&new.config.table)?;
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    pub connection_id: i64,
    pub config: ChartConfig,
}

/// POST /api/visualizations/preview
pub async fn preview_visualization(
    State(state): SharedState,
    Json(req): Json<PreviewRequest>,
) -> Result<Json<ChartData>> {
    let max_rows = state.settings.limits.preview_rows;
    let config = req.config;
    with_database(&state, req.connection_id, move |conn| {
        require_table(conn, &config.table)?;
        preview_chart(conn, &config, max_rows)
    })
    .await
    .map(Json)
}

// ============================================================================
// Export
// ============================================================================

/// GET /api/export/csv/{viz_id}
pub async fn export_visualization_csv(
    State(state): SharedState,
    Path(viz_id): Path<i64>,
) -> Result<impl IntoResponse> {
    let viz = with_store(&state, move |store| {
        lookup(store.get_visualization(viz_id)?, "Visualization", viz_id)
    })
    .await?;
    let config = viz.chart_config()?;
    let max_rows = state.settings.limits.export_rows;
    let csv = with_database(&state, viz.connection_id, move |conn| {
        require_table(conn, &config.table)?;
        export_chart(conn, &config, max_rows)
    })
    .await?;
    Ok(csv_response(&format!("visualization-{}", viz_id), csv))
}

/// GET /api/export/csv/table/{connection_id}/{table}
pub async fn export_table_csv(
    State(state): SharedState,
    Path((connection_id, table)): Path<(i64, String)>,
    Query(pairs): QueryPairs,
) -> Result<impl IntoResponse> {
    validate_identifier(&table)?;
    let filters = filters_from_query(filter_pairs(&pairs));
    let max_rows = state.settings.limits.export_rows;
    let name = table.clone();
    let csv = with_database(&state, connection_id, move |conn| {
        require_table(conn, &table)?;
        export_table(conn, &table, filters, max_rows)
    })
    .await?;
    Ok(csv_response(&name, csv))
}
