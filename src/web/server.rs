//! Axum web server for sqlviz.
//!
//! Builds the router over the shared [`AppState`] and runs it until Ctrl+C.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::Settings;
use crate::connection::{ConnectionCache, ConnectionRegistry};
use crate::error::Error;
use crate::store::AppStore;

use super::handlers;

/// Application state shared across handlers.
pub struct AppState {
    pub settings: Settings,
    pub registry: Arc<ConnectionRegistry>,
}

impl AppState {
    pub fn new(settings: Settings, store: AppStore) -> Self {
        let cache = ConnectionCache::new(settings.cache.max_connections);
        Self {
            settings,
            registry: Arc::new(ConnectionRegistry::new(store, cache)),
        }
    }
}

/// Errors leave the API as `{"error": {"message", "status"}}`.
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        let body = json!({
            "error": {
                "message": self.to_string(),
                "status": status.as_u16(),
            }
        });
        (status, Json(body)).into_response()
    }
}

/// Build the axum router with all routes.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Connections
        .route(
            "/api/connections",
            get(handlers::list_connections).post(handlers::create_connection),
        )
        .route(
            "/api/connections/{id}",
            get(handlers::get_connection).delete(handlers::delete_connection),
        )
        .route(
            "/api/connections/{id}/health",
            get(handlers::connection_health),
        )
        // Browsing
        .route("/api/connections/{id}/tables", get(handlers::list_tables))
        .route(
            "/api/connections/{id}/tables/{table}/schema",
            get(handlers::table_schema),
        )
        .route(
            "/api/connections/{id}/tables/{table}/data",
            get(handlers::table_data),
        )
        .route(
            "/api/connections/{id}/tables/{table}/data/sample",
            get(handlers::table_sample),
        )
        // Templates
        .route("/api/templates", get(handlers::list_templates))
        .route("/api/templates/{id}", get(handlers::get_template))
        .route("/api/templates/{id}/apply", post(handlers::apply_template))
        // Visualizations
        .route(
            "/api/visualizations",
            get(handlers::list_visualizations).post(handlers::create_visualization),
        )
        .route(
            "/api/visualizations/preview",
            post(handlers::preview_visualization),
        )
        .route(
            "/api/visualizations/{id}",
            get(handlers::get_visualization)
                .put(handlers::update_visualization)
                .delete(handlers::delete_visualization),
        )
        // Export
        .route(
            "/api/export/csv/{viz_id}",
            get(handlers::export_visualization_csv),
        )
        .route(
            "/api/export/csv/table/{connection_id}/{table}",
            get(handlers::export_table_csv),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the web server.
///
/// Opens (and seeds) the app store named in `settings`, serves until Ctrl+C,
/// then closes every cached database handle.
pub async fn serve(settings: Settings, open_browser: bool) -> Result<(), Box<dyn std::error::Error>> {
    let app_db = settings.app_db_path()?;
    let store = AppStore::open(&app_db)?;
    let seeded = store.seed_default_templates()?;
    if seeded > 0 {
        info!(count = seeded, "seeded default templates");
    }

    let addr = settings.bind_addr();
    let state = Arc::new(AppState::new(settings, store));
    let registry = Arc::clone(&state.registry);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let url = format!("http://{}", addr);

    println!("sqlviz");
    println!("   URL: {}", url);
    println!("   App store: {}", app_db.display());
    println!();
    println!("   Press Ctrl+C to stop");

    if open_browser {
        let _ = open::that(&url);
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let closed = registry.cache().close_all();
    info!(closed, "closed cached database handles");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
