//! Insight templates.
//!
//! A template is a stored chart recipe with abstract field slots
//! (`xField`, `yField`, ...). [`fields`] works out which slots a stored
//! config asks for; [`apply`] binds a user's `table.column` choices to those
//! slots and produces a concrete [`ChartConfig`](crate::chart::ChartConfig).

pub mod apply;
pub mod fields;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use apply::{apply_template, FieldMappings, TableCatalog, TemplateSource};
pub use fields::extract_fields;

/// One logical slot a template needs bound to a real column.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateField {
    pub id: String,
    pub name: String,
    pub description: String,
    pub required: bool,
}

impl TemplateField {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            required,
        }
    }
}

/// A stored template together with the fields derived from its config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightTemplate {
    pub id: i64,
    pub name: String,
    pub description: String,
    /// Chart type as stored; checked when the template is applied.
    #[serde(rename = "type")]
    pub chart_type: String,
    pub config: Value,
    pub category: String,
    pub is_default: bool,
    pub fields: Vec<TemplateField>,
}

/// Data for creating a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTemplate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub chart_type: String,
    pub config: Value,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub is_default: bool,
}
