//! App store tests against an on-disk database.

use rusqlite::Connection;
use serde_json::json;
use sqlviz::chart::{ChartConfig, ChartType};
use sqlviz::error::ErrorKind;
use sqlviz::export::export_chart;
use sqlviz::store::{AppStore, ConnectionStats, NewConnection, NewVisualization, DEFAULT_TEMPLATES};
use sqlviz::template::NewTemplate;

fn store_in(dir: &tempfile::TempDir) -> AppStore {
    AppStore::open(&dir.path().join("app.db")).unwrap()
}

fn stats() -> ConnectionStats {
    ConnectionStats {
        size_bytes: Some(8192),
        table_count: Some(1),
        is_valid: true,
    }
}

#[test]
fn test_seeding_is_idempotent_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = store_in(&dir);
        assert_eq!(store.seed_default_templates().unwrap(), DEFAULT_TEMPLATES.len());
        assert_eq!(store.seed_default_templates().unwrap(), 0);
    }
    let store = store_in(&dir);
    assert_eq!(store.seed_default_templates().unwrap(), 0);

    let mut names: Vec<String> = store
        .list_templates()
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    names.sort();
    let mut expected: Vec<&str> = DEFAULT_TEMPLATES.to_vec();
    expected.sort();
    assert_eq!(names, expected);
}

#[test]
fn test_templates_by_category() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.seed_default_templates().unwrap();
    store
        .create_template(&NewTemplate {
            name: "Revenue Mix".to_string(),
            description: "Share of revenue".to_string(),
            chart_type: "doughnut".to_string(),
            config: json!({"requiredMappings": {"xField": {"name": "Segment"}, "yField": {}}}),
            category: "Analysis".to_string(),
            is_default: false,
        })
        .unwrap();

    let analysis = store.list_templates_by_category("Analysis").unwrap();
    let names: Vec<&str> = analysis.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Distribution Analysis", "Revenue Mix"]);

    let mix = &analysis[1];
    assert!(!mix.is_default);
    assert_eq!(mix.fields[0].name, "Segment");
    assert_eq!(mix.fields[1].description, "Field for yField");

    assert!(store.list_templates_by_category("Nope").unwrap().is_empty());
}

#[test]
fn test_visualization_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let connection = store
        .create_connection(&NewConnection::new("sales", "/data/sales.db"), &stats())
        .unwrap();

    let config = ChartConfig::new(ChartType::Bar, "sales", "region", "amount");
    let saved = store
        .create_visualization(&NewVisualization {
            connection_id: connection.id,
            name: "Sales by region".to_string(),
            config: config.clone(),
        })
        .unwrap();
    assert_eq!(saved.chart_type, "bar");
    assert_eq!(saved.table_name, "sales");
    assert_eq!(saved.chart_config().unwrap(), config);

    let updated = store
        .update_visualization(
            saved.id,
            &NewVisualization {
                connection_id: connection.id,
                name: "Sales trend".to_string(),
                config: ChartConfig::new(ChartType::Line, "sales", "quarter", "amount"),
            },
        )
        .unwrap()
        .unwrap();
    assert_eq!(updated.name, "Sales trend");
    assert_eq!(updated.chart_type, "line");
    assert!(updated.updated_at >= saved.updated_at);
    assert_eq!(updated.created_at, saved.created_at);

    let wire = serde_json::to_value(&updated).unwrap();
    assert_eq!(wire["connectionId"], json!(connection.id));
    assert_eq!(wire["tableName"], json!("sales"));
    assert_eq!(wire["type"], json!("line"));

    assert!(store.delete_visualization(saved.id).unwrap());
    assert!(!store.delete_visualization(saved.id).unwrap());
    assert_eq!(store.get_visualization(saved.id).unwrap(), None);
}

#[test]
fn test_visualization_requires_connection() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let err = store
        .create_visualization(&NewVisualization {
            connection_id: 77,
            name: "orphan".to_string(),
            config: ChartConfig::new(ChartType::Pie, "sales", "region", "amount"),
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_deleting_connection_removes_its_visualizations() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let keep = store
        .create_connection(&NewConnection::new("keep", "/data/keep.db"), &stats())
        .unwrap();
    let dropped = store
        .create_connection(&NewConnection::new("drop", "/data/drop.db"), &stats())
        .unwrap();
    for connection_id in [keep.id, dropped.id] {
        store
            .create_visualization(&NewVisualization {
                connection_id,
                name: format!("viz {}", connection_id),
                config: ChartConfig::new(ChartType::Bar, "t", "x", "y"),
            })
            .unwrap();
    }

    assert!(store.delete_connection(dropped.id).unwrap());
    let remaining = store.list_visualizations().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].connection_id, keep.id);
}

#[test]
fn test_saved_visualization_exports_its_rows() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("sales.db");
    let db = Connection::open(&db_path).unwrap();
    db.execute_batch(
        "CREATE TABLE sales (region TEXT, amount INTEGER);
         INSERT INTO sales VALUES ('east', 10), ('west', 20), ('north, far', 30);",
    )
    .unwrap();

    let store = store_in(&dir);
    let connection = store
        .create_connection(
            &NewConnection::new("sales", db_path.to_string_lossy()),
            &stats(),
        )
        .unwrap();
    let saved = store
        .create_visualization(&NewVisualization {
            connection_id: connection.id,
            name: "Big sales".to_string(),
            config: ChartConfig::new(ChartType::Bar, "sales", "region", "amount")
                .with_filters(json!({"amount": {"gt": 15}}).as_object().unwrap().clone()),
        })
        .unwrap();

    let config = store
        .get_visualization(saved.id)
        .unwrap()
        .unwrap()
        .chart_config()
        .unwrap();
    let csv = export_chart(&db, &config, 100).unwrap();
    assert_eq!(csv, "region,amount\r\nwest,20\r\n\"north, far\",30\r\n");
}
