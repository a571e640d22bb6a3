//! Template application: bind `table.column` choices to a template's fields.

use std::fmt;

use rusqlite::Connection;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::fields::{GROUP_BY, X_FIELD, Y_FIELD};
use super::InsightTemplate;
use crate::chart::{ChartConfig, ChartType};
use crate::error::{Error, Result};
use crate::query::get_tables;

// =============================================================================
// Collaborators
// =============================================================================

/// Looks templates up by id.
pub trait TemplateSource {
    fn template(&self, id: i64) -> Result<Option<InsightTemplate>>;
}

impl<T: TemplateSource> TemplateSource for parking_lot::Mutex<T> {
    fn template(&self, id: i64) -> Result<Option<InsightTemplate>> {
        self.lock().template(id)
    }
}

/// Lists the user tables behind a registered connection.
///
/// Implementations fail with NotFound when the connection id is unknown.
pub trait TableCatalog {
    fn table_names(&self, connection_id: i64) -> Result<Vec<String>>;
}

/// A single open database serves any connection id.
impl TableCatalog for Connection {
    fn table_names(&self, _connection_id: i64) -> Result<Vec<String>> {
        get_tables(self)
    }
}

// =============================================================================
// Field mappings
// =============================================================================

/// Template field id -> `"table.column"`, in the order the caller sent them.
///
/// Order matters: the table is taken from the first entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMappings(Vec<(String, String)>);

impl FieldMappings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a mapping, replacing an existing one in place.
    pub fn insert(&mut self, field: impl Into<String>, column: impl Into<String>) {
        let field = field.into();
        let column = column.into();
        match self.0.iter_mut().find(|(f, _)| *f == field) {
            Some(entry) => entry.1 = column,
            None => self.0.push((field, column)),
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, c)| c.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(f, c)| (f.as_str(), c.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldMappings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut mappings = FieldMappings::new();
        for (k, v) in iter {
            mappings.insert(k, v);
        }
        mappings
    }
}

impl Serialize for FieldMappings {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (field, column) in &self.0 {
            map.serialize_entry(field, column)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FieldMappings {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct MappingsVisitor;

        impl<'de> Visitor<'de> for MappingsVisitor {
            type Value = FieldMappings;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object of field id -> \"table.column\"")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut mappings = FieldMappings::new();
                while let Some((field, column)) = access.next_entry::<String, Option<String>>()? {
                    // null reads as "not mapped"
                    mappings.insert(field, column.unwrap_or_default());
                }
                Ok(mappings)
            }
        }

        deserializer.deserialize_map(MappingsVisitor)
    }
}

/// Split `"table.column"`. Both parts must be present and non-empty.
pub fn split_field(value: &str) -> Option<(&str, &str)> {
    let mut parts = value.split('.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(table), Some(column), None) if !table.is_empty() && !column.is_empty() => {
            Some((table, column))
        }
        _ => None,
    }
}

// =============================================================================
// Apply
// =============================================================================

/// Resolve template `template_id` against `connection_id` using `mappings`.
pub fn apply_template<S, C>(
    templates: &S,
    catalog: &C,
    template_id: i64,
    connection_id: i64,
    mappings: &FieldMappings,
) -> Result<ChartConfig>
where
    S: TemplateSource + ?Sized,
    C: TableCatalog + ?Sized,
{
    resolve(templates, catalog, template_id, connection_id, mappings).inspect_err(|e| {
        warn!(
            template_id,
            connection_id,
            error = %e,
            "template application failed"
        )
    })
}

fn resolve<S, C>(
    templates: &S,
    catalog: &C,
    template_id: i64,
    connection_id: i64,
    mappings: &FieldMappings,
) -> Result<ChartConfig>
where
    S: TemplateSource + ?Sized,
    C: TableCatalog + ?Sized,
{
    let template = templates
        .template(template_id)?
        .ok_or_else(|| Error::not_found(format!("Template not found with ID: {}", template_id)))?;

    let missing: Vec<&str> = template
        .fields
        .iter()
        .filter(|f| f.required && mappings.get(&f.id).map_or(true, str::is_empty))
        .map(|f| f.name.as_str())
        .collect();
    if !missing.is_empty() {
        return Err(Error::invalid(format!(
            "Missing required field mappings: {}",
            missing.join(", ")
        )));
    }

    // unmapped (null or empty) entries do not name a table
    let first = mappings
        .iter()
        .map(|(_, column)| column)
        .find(|c| !c.is_empty())
        .ok_or_else(|| Error::invalid("No fields mapped"))?;
    let (table, _) = split_field(first)
        .ok_or_else(|| Error::invalid("Invalid field format. Expected: tableName.columnName"))?;

    let tables = catalog.table_names(connection_id)?;
    if !tables.iter().any(|t| t == table) {
        return Err(Error::invalid(format!("Table does not exist: {}", table)));
    }

    let column_for = |field: &str| -> Option<String> {
        mappings
            .get(field)
            .and_then(split_field)
            .map(|(_, column)| column.to_string())
    };
    let x_field = column_for(X_FIELD).unwrap_or_default();
    let y_field = column_for(Y_FIELD).unwrap_or_default();
    if x_field.is_empty() || y_field.is_empty() {
        return Err(Error::invalid(
            "Both xField and yField must be mapped to table.column values",
        ));
    }

    let chart_type: ChartType = template.chart_type.parse()?;
    Ok(ChartConfig {
        chart_type,
        table: table.to_string(),
        x_field,
        y_field,
        group_by: column_for(GROUP_BY),
        filters: None,
        options: template.config.get("options").cloned(),
    })
}
