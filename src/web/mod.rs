//! HTTP API for sqlviz.
//!
//! JSON over axum; errors are mapped to 400 / 404 / 500 with a
//! `{"error": {"message", "status"}}` body.

mod handlers;
mod server;

pub use handlers::{ApplyTemplateRequest, PreviewRequest, TemplateQuery};
pub use server::{router, serve, AppState};
