//! Integration tests for table reads: filters -> WHERE -> paginated SELECT.
//!
//! Every test runs against an in-memory SQLite database built from scratch.

use rusqlite::Connection;
use serde_json::{json, Value};
use sqlviz::error::{Error, ErrorKind};
use sqlviz::query::{
    execute_query, filters_from_query, get_sample_data, get_table_schema, get_tables,
    parse_filters, Filters, QueryLimits, QueryRequest,
};
use sqlviz::sql::{validate_identifier, SortDir};

fn sales_db() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE sales (region TEXT, amount INTEGER);
         INSERT INTO sales VALUES ('east', 10), ('west', 20);",
    )
    .unwrap();
    conn
}

/// 25 rows: id 1..=25, bucket = id % 3, label 'item-<id>'.
fn items_db() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE items (id INTEGER PRIMARY KEY, bucket INTEGER, label TEXT);")
        .unwrap();
    for id in 1..=25 {
        conn.execute(
            "INSERT INTO items (id, bucket, label) VALUES (?1, ?2, ?3)",
            rusqlite::params![id, id % 3, format!("item-{}", id)],
        )
        .unwrap();
    }
    conn
}

fn filters(value: Value) -> Filters {
    parse_filters(value.as_object().unwrap()).unwrap()
}

fn ids(rows: &[sqlviz::query::Row]) -> Vec<i64> {
    rows.iter().map(|r| r["id"].as_i64().unwrap()).collect()
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_unfiltered_first_page() {
    let conn = sales_db();
    let request = QueryRequest::new("sales").page(1).page_size(10);
    let result = execute_query(&conn, &request, &QueryLimits::default()).unwrap();

    assert_eq!(result.total, 2);
    assert_eq!(result.rows.len(), 2);
    assert_eq!(result.columns, vec!["region", "amount"]);
    assert_eq!(result.page, 1);
    assert_eq!(result.page_size, 10);
    assert_eq!(result.rows[0]["region"], json!("east"));
    assert_eq!(result.rows[1]["amount"], json!(20));
}

#[test]
fn test_substring_filter() {
    let conn = sales_db();
    let request = QueryRequest::new("sales").filters(filters(json!({"region": "east"})));
    let result = execute_query(&conn, &request, &QueryLimits::default()).unwrap();

    assert_eq!(result.total, 1);
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0]["region"], json!("east"));
}

#[test]
fn test_substring_filter_matches_inside_values() {
    let conn = sales_db();
    let request = QueryRequest::new("sales").filters(filters(json!({"region": "es"})));
    let result = execute_query(&conn, &request, &QueryLimits::default()).unwrap();
    assert_eq!(result.total, 1);
    assert_eq!(result.rows[0]["region"], json!("west"));
}

#[test]
fn test_query_string_filters() {
    let conn = sales_db();
    let pairs = [("filter[region]", "we"), ("page", "1"), ("filter[amount]", "")];
    let request = QueryRequest::new("sales").filters(filters_from_query(pairs));
    let result = execute_query(&conn, &request, &QueryLimits::default()).unwrap();
    assert_eq!(result.total, 1);
    assert_eq!(result.rows[0]["region"], json!("west"));
}

#[test]
fn test_empty_result_takes_columns_from_schema() {
    let conn = sales_db();
    let request = QueryRequest::new("sales").filters(filters(json!({"region": "north"})));
    let result = execute_query(&conn, &request, &QueryLimits::default()).unwrap();

    assert_eq!(result.total, 0);
    assert!(result.rows.is_empty());
    assert_eq!(result.columns, vec!["region", "amount"]);
}

// ============================================================================
// Round trips
// ============================================================================

#[test]
fn test_eq_filter_returns_exact_matches() {
    let conn = items_db();
    let request = QueryRequest::new("items")
        .page_size(100)
        .filters(filters(json!({"bucket": {"eq": 2}})));
    let result = execute_query(&conn, &request, &QueryLimits::default()).unwrap();

    let expected: Vec<i64> = (1..=25).filter(|id| id % 3 == 2).collect();
    assert_eq!(ids(&result.rows), expected);
    assert_eq!(result.total, expected.len() as u64);
}

#[test]
fn test_array_filter_returns_union() {
    let conn = items_db();
    let request = QueryRequest::new("items")
        .page_size(100)
        .filters(filters(json!({"bucket": [0, 1]})));
    let result = execute_query(&conn, &request, &QueryLimits::default()).unwrap();

    let expected: Vec<i64> = (1..=25).filter(|id| id % 3 != 2).collect();
    assert_eq!(ids(&result.rows), expected);
}

#[test]
fn test_empty_array_matches_nothing() {
    let conn = items_db();
    let request = QueryRequest::new("items").filters(filters(json!({"bucket": []})));
    let result = execute_query(&conn, &request, &QueryLimits::default()).unwrap();
    assert_eq!(result.total, 0);
}

#[test]
fn test_comparison_filters_combine_with_and() {
    let conn = items_db();
    let request = QueryRequest::new("items")
        .page_size(100)
        .filters(filters(json!({"id": {"gte": 20}, "bucket": {"neq": 0}})));
    let result = execute_query(&conn, &request, &QueryLimits::default()).unwrap();
    assert_eq!(ids(&result.rows), vec![20, 22, 23, 25]);
}

#[test]
fn test_like_operator_binds_pattern_verbatim() {
    let conn = items_db();
    let request = QueryRequest::new("items")
        .page_size(100)
        .filters(filters(json!({"label": {"like": "item-2_"}})));
    let result = execute_query(&conn, &request, &QueryLimits::default()).unwrap();
    assert_eq!(ids(&result.rows), vec![20, 21, 22, 23, 24, 25]);
}

#[test]
fn test_filter_values_are_bound_not_spliced() {
    let conn = sales_db();
    let request =
        QueryRequest::new("sales").filters(filters(json!({"region": "'; DROP TABLE sales; --"})));
    let result = execute_query(&conn, &request, &QueryLimits::default()).unwrap();
    assert_eq!(result.total, 0);
    assert_eq!(get_tables(&conn).unwrap(), vec!["sales"]);
}

// ============================================================================
// Pagination and sorting
// ============================================================================

#[test]
fn test_pages_partition_the_table() {
    let conn = items_db();
    let limits = QueryLimits::default();
    let mut seen = Vec::new();
    for page in 1..=3 {
        let request = QueryRequest::new("items").page(page).page_size(10);
        let result = execute_query(&conn, &request, &limits).unwrap();
        assert_eq!(result.total, 25);
        assert!(result.rows.len() <= 10);
        seen.extend(ids(&result.rows));
    }
    assert_eq!(seen, (1..=25).collect::<Vec<_>>());
}

#[test]
fn test_last_page_holds_the_remainder() {
    let conn = items_db();
    let request = QueryRequest::new("items").page(3).page_size(10);
    let result = execute_query(&conn, &request, &QueryLimits::default()).unwrap();
    assert_eq!(result.rows.len(), 5);
    assert_eq!(ids(&result.rows), vec![21, 22, 23, 24, 25]);
}

#[test]
fn test_page_past_the_end_is_empty() {
    let conn = items_db();
    let request = QueryRequest::new("items").page(4).page_size(10);
    let result = execute_query(&conn, &request, &QueryLimits::default()).unwrap();
    assert_eq!(result.total, 25);
    assert!(result.rows.is_empty());
    assert_eq!(result.columns, vec!["id", "bucket", "label"]);
}

#[test]
fn test_sort_descending() {
    let conn = items_db();
    let request = QueryRequest::new("items")
        .page_size(3)
        .sort("id", SortDir::parse_lossy("DESC"));
    let result = execute_query(&conn, &request, &QueryLimits::default()).unwrap();
    assert_eq!(ids(&result.rows), vec![25, 24, 23]);
}

#[test]
fn test_unknown_sort_direction_is_ascending() {
    let conn = items_db();
    let request = QueryRequest::new("items")
        .page_size(3)
        .sort("id", SortDir::parse_lossy("sideways"));
    let result = execute_query(&conn, &request, &QueryLimits::default()).unwrap();
    assert_eq!(ids(&result.rows), vec![1, 2, 3]);
}

#[test]
fn test_page_size_is_clamped() {
    let conn = items_db();
    let limits = QueryLimits {
        max_page_size: 20,
        ..QueryLimits::default()
    };
    let request = QueryRequest::new("items").page_size(500);
    let result = execute_query(&conn, &request, &limits).unwrap();
    assert_eq!(result.page_size, 20);
    assert_eq!(result.rows.len(), 20);
}

#[test]
fn test_zero_page_is_rejected() {
    let conn = items_db();
    let err = execute_query(&conn, &QueryRequest::new("items").page(0), &QueryLimits::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let err = execute_query(
        &conn,
        &QueryRequest::new("items").page_size(0),
        &QueryLimits::default(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

// ============================================================================
// Identifiers
// ============================================================================

#[test]
fn test_unsafe_identifiers_are_rejected_before_sql() {
    let conn = sales_db();
    let limits = QueryLimits::default();

    for table in ["sales; DROP TABLE sales", "sales\"", "my table", ""] {
        let err = execute_query(&conn, &QueryRequest::new(table), &limits).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput, "table {:?}", table);
    }

    let err = execute_query(
        &conn,
        &QueryRequest::new("sales").sort("amount desc", SortDir::Asc),
        &limits,
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let bad_filter = parse_filters(json!({"region or 1=1": "x"}).as_object().unwrap()).unwrap();
    let err = execute_query(&conn, &QueryRequest::new("sales").filters(bad_filter), &limits)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    assert!(validate_identifier("sales_2024").is_ok());
}

#[test]
fn test_unknown_table_is_an_engine_error() {
    let conn = sales_db();
    let err = execute_query(&conn, &QueryRequest::new("missing"), &QueryLimits::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(err.to_string().contains("missing"));
}

#[test]
fn test_unknown_filter_column_is_an_engine_error() {
    let conn = sales_db();
    let request = QueryRequest::new("sales").filters(filters(json!({"regoin": "east"})));
    let err = execute_query(&conn, &request, &QueryLimits::default()).unwrap_err();
    assert!(matches!(err, Error::Query { .. }), "got {:?}", err);
    assert!(format!("{:?}", err).contains("regoin"));
}

#[test]
fn test_filter_on_own_column_name_does_not_match_everything() {
    // a misspelled column compared with its own name must fail, not match
    let conn = sales_db();
    let request = QueryRequest::new("sales").filters(filters(json!({"regoin": "regoin"})));
    let err = execute_query(&conn, &request, &QueryLimits::default()).unwrap_err();
    assert!(matches!(err, Error::Query { .. }), "got {:?}", err);
}

#[test]
fn test_unknown_sort_column_is_an_engine_error() {
    let conn = sales_db();
    let request = QueryRequest::new("sales").sort("amout", SortDir::Desc);
    let err = execute_query(&conn, &request, &QueryLimits::default()).unwrap_err();
    assert!(matches!(err, Error::Query { .. }), "got {:?}", err);
    assert_eq!(err.kind(), ErrorKind::Internal);
}

#[test]
fn test_unknown_operator_is_rejected() {
    let err = parse_filters(json!({"amount": {"between": [1, 2]}}).as_object().unwrap())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(err.to_string().contains("between"));
}

// ============================================================================
// Schema and sampling
// ============================================================================

#[test]
fn test_schema_introspection() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE zeta (a INTEGER);
         CREATE TABLE alpha (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, price REAL);",
    )
    .unwrap();

    // sqlite_sequence exists because of AUTOINCREMENT but is not listed.
    assert_eq!(get_tables(&conn).unwrap(), vec!["alpha", "zeta"]);

    let columns = get_table_schema(&conn, "alpha").unwrap();
    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    let types: Vec<&str> = columns.iter().map(|c| c.declared_type.as_str()).collect();
    assert_eq!(names, vec!["id", "name", "price"]);
    assert_eq!(types, vec!["INTEGER", "TEXT", "REAL"]);
}

#[test]
fn test_sample_is_bounded_and_drawn_from_table() {
    let conn = items_db();
    let limits = QueryLimits::default();

    let rows = get_sample_data(&conn, "items", Some(5), &limits).unwrap();
    assert_eq!(rows.len(), 5);
    assert!(ids(&rows).iter().all(|id| (1..=25).contains(id)));

    let rows = get_sample_data(&conn, "items", None, &limits).unwrap();
    assert_eq!(rows.len(), 25);
}
