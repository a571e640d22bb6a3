//! Integration tests for insight templates: stored config -> fields ->
//! applied chart config.

use rusqlite::Connection;
use serde_json::json;
use sqlviz::chart::ChartType;
use sqlviz::connection::{ConnectionCache, ConnectionRegistry};
use sqlviz::error::ErrorKind;
use sqlviz::store::{AppStore, NewConnection, DEFAULT_TEMPLATES};
use sqlviz::template::{apply_template, extract_fields, FieldMappings, NewTemplate};

fn sales_db() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE sales (region TEXT, amount INTEGER, quarter TEXT);")
        .unwrap();
    conn
}

fn seeded_store() -> AppStore {
    let store = AppStore::open_in_memory().unwrap();
    store.seed_default_templates().unwrap();
    store
}

fn template_id(store: &AppStore, name: &str) -> i64 {
    store
        .list_templates()
        .unwrap()
        .into_iter()
        .find(|t| t.name == name)
        .map(|t| t.id)
        .unwrap()
}

fn mappings(pairs: &[(&str, &str)]) -> FieldMappings {
    pairs.iter().copied().collect()
}

// ============================================================================
// Field extraction
// ============================================================================

#[test]
fn test_explicit_fields_are_returned_unmodified() {
    let config = json!({
        "fields": [
            {"id": "category", "name": "Category", "description": "Grouping column", "required": true},
            {"id": "value", "name": "Value", "description": "Measure", "required": false}
        ],
        "requiredMappings": {"ignored": {}}
    });
    let fields = extract_fields(&config);
    assert_eq!(fields.len(), 2);
    assert_eq!(fields[0].id, "category");
    assert_eq!(fields[0].description, "Grouping column");
    assert!(fields[0].required);
    assert_eq!(fields[1].id, "value");
    assert!(!fields[1].required);
}

#[test]
fn test_default_fields_follow_allow_grouping() {
    let ids = |config: serde_json::Value| -> Vec<String> {
        extract_fields(&config).into_iter().map(|f| f.id).collect()
    };
    assert_eq!(ids(json!({"type": "bar"})), vec!["xField", "yField"]);
    assert_eq!(
        ids(json!({"allowGrouping": true})),
        vec!["xField", "yField", "groupBy"]
    );
    assert_eq!(ids(json!({"allowGrouping": false})), vec!["xField", "yField"]);
}

#[test]
fn test_seeded_templates_expose_axis_fields() {
    let store = seeded_store();
    let templates = store.list_templates().unwrap();
    assert_eq!(templates.len(), DEFAULT_TEMPLATES.len());
    for template in &templates {
        assert!(template.is_default);
        let ids: Vec<&str> = template.fields.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["xField", "yField"], "template {}", template.name);
    }
}

// ============================================================================
// Application
// ============================================================================

#[test]
fn test_apply_default_template() {
    let store = seeded_store();
    let id = template_id(&store, "Top Items Analysis");
    let conn = sales_db();

    let config = apply_template(
        &store,
        &conn,
        id,
        1,
        &mappings(&[("xField", "sales.region"), ("yField", "sales.amount")]),
    )
    .unwrap();

    assert_eq!(config.chart_type, ChartType::Bar);
    assert_eq!(config.table, "sales");
    assert_eq!(config.x_field, "region");
    assert_eq!(config.y_field, "amount");
    assert_eq!(config.group_by, None);
    assert_eq!(
        config
            .options
            .as_ref()
            .and_then(|o| o.pointer("/plugins/title/text")),
        Some(&json!("Top Items"))
    );

    let wire = serde_json::to_value(&config).unwrap();
    assert_eq!(wire["type"], "bar");
    assert_eq!(wire["xField"], "region");
    assert_eq!(wire["yField"], "amount");
}

#[test]
fn test_apply_grouped_template() {
    let store = seeded_store();
    let created = store
        .create_template(&NewTemplate {
            name: "Regional Trend".to_string(),
            description: String::new(),
            chart_type: "line".to_string(),
            config: json!({"allowGrouping": true}),
            category: "Trends".to_string(),
            is_default: false,
        })
        .unwrap();
    assert_eq!(created.fields.len(), 3);

    let config = apply_template(
        &store,
        &sales_db(),
        created.id,
        1,
        &mappings(&[
            ("xField", "sales.quarter"),
            ("yField", "sales.amount"),
            ("groupBy", "sales.region"),
        ]),
    )
    .unwrap();
    assert_eq!(config.chart_type, ChartType::Line);
    assert_eq!(config.group_by.as_deref(), Some("region"));
}

#[test]
fn test_missing_required_mapping_names_the_field() {
    let store = seeded_store();
    let id = template_id(&store, "Trend Over Time");
    let err = apply_template(
        &store,
        &sales_db(),
        id,
        1,
        &mappings(&[("xField", "sales.quarter")]),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(err.to_string().contains("Y-Axis Field"), "{}", err);
}

#[test]
fn test_unknown_template_is_not_found() {
    let store = seeded_store();
    let err = apply_template(&store, &sales_db(), 9999, 1, &mappings(&[])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_malformed_mapping_is_rejected() {
    let store = seeded_store();
    let id = template_id(&store, "Top Items Analysis");
    let err = apply_template(
        &store,
        &sales_db(),
        id,
        1,
        &mappings(&[("xField", "region"), ("yField", "sales.amount")]),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(err.to_string().contains("tableName.columnName"));
}

#[test]
fn test_table_must_exist() {
    let store = seeded_store();
    let id = template_id(&store, "Top Items Analysis");
    let err = apply_template(
        &store,
        &sales_db(),
        id,
        1,
        &mappings(&[("xField", "orders.region"), ("yField", "orders.amount")]),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(err.to_string().contains("orders"));
}

#[test]
fn test_mappings_deserialize_in_request_order() {
    let parsed: FieldMappings =
        serde_json::from_value(json!({"yField": "sales.amount", "xField": "sales.region"}))
            .unwrap();
    let order: Vec<&str> = parsed.iter().map(|(field, _)| field).collect();
    assert_eq!(order, vec!["yField", "xField"]);
}

#[test]
fn test_apply_through_registry() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("sales.db");
    Connection::open(&db_path)
        .unwrap()
        .execute_batch("CREATE TABLE sales (region TEXT, amount INTEGER);")
        .unwrap();

    let registry = ConnectionRegistry::new(seeded_store(), ConnectionCache::new(2));
    let saved = registry
        .register(&NewConnection::new("sales", db_path.to_string_lossy()))
        .unwrap();
    let id = template_id(&registry.store().lock(), "Distribution Analysis");

    let config = apply_template(
        registry.store(),
        &registry,
        id,
        saved.id,
        &mappings(&[("xField", "sales.region"), ("yField", "sales.amount")]),
    )
    .unwrap();
    assert_eq!(config.chart_type, ChartType::Pie);

    let err = apply_template(
        registry.store(),
        &registry,
        id,
        saved.id + 1,
        &mappings(&[("xField", "sales.region"), ("yField", "sales.amount")]),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
