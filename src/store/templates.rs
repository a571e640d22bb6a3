//! Insight template storage and the seeded defaults.

use rusqlite::{params, OptionalExtension, Row};
use serde_json::json;
use tracing::info;

use super::{read_config, AppStore};
use crate::error::Result;
use crate::template::{extract_fields, InsightTemplate, NewTemplate, TemplateSource};

/// (name, description, type, category, title)
const DEFAULTS: [(&str, &str, &str, &str, &str); 3] = [
    (
        "Top Items Analysis",
        "Identifies the highest-performing items based on a numeric value",
        "bar",
        "Performance",
        "Top Items",
    ),
    (
        "Trend Over Time",
        "Visualizes how a metric changes over time",
        "line",
        "Trends",
        "Trend Analysis",
    ),
    (
        "Distribution Analysis",
        "Shows how values are distributed across categories",
        "pie",
        "Analysis",
        "Distribution Analysis",
    ),
];

/// Names of the templates [`AppStore::seed_default_templates`] installs.
pub const DEFAULT_TEMPLATES: [&str; 3] = [DEFAULTS[0].0, DEFAULTS[1].0, DEFAULTS[2].0];

fn default_templates() -> Vec<NewTemplate> {
    DEFAULTS
        .iter()
        .map(|(name, description, chart_type, category, title)| NewTemplate {
            name: name.to_string(),
            description: description.to_string(),
            chart_type: chart_type.to_string(),
            config: json!({
                "type": chart_type,
                "options": {
                    "plugins": {
                        "title": {"display": true, "text": title}
                    }
                }
            }),
            category: category.to_string(),
            is_default: true,
        })
        .collect()
}

const SELECT_TEMPLATE: &str =
    "SELECT id, name, description, type, config, category, is_default FROM insight_templates";

fn template_from_row(row: &Row<'_>) -> rusqlite::Result<InsightTemplate> {
    let id: i64 = row.get(0)?;
    let config_text: String = row.get(4)?;
    let config = read_config("template", id, &config_text);
    Ok(InsightTemplate {
        id,
        name: row.get(1)?,
        description: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        chart_type: row.get(3)?,
        fields: extract_fields(&config),
        config,
        category: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        is_default: row.get(6)?,
    })
}

impl AppStore {
    /// All templates, sorted by name.
    pub fn list_templates(&self) -> Result<Vec<InsightTemplate>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} ORDER BY name", SELECT_TEMPLATE))?;
        let templates = stmt
            .query_map([], template_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(templates)
    }

    pub fn list_templates_by_category(&self, category: &str) -> Result<Vec<InsightTemplate>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE category = ?1 ORDER BY name",
            SELECT_TEMPLATE
        ))?;
        let templates = stmt
            .query_map(params![category], template_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(templates)
    }

    pub fn get_template(&self, id: i64) -> Result<Option<InsightTemplate>> {
        let template = self
            .conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_TEMPLATE),
                params![id],
                template_from_row,
            )
            .optional()?;
        Ok(template)
    }

    pub fn create_template(&self, new: &NewTemplate) -> Result<InsightTemplate> {
        let config = serde_json::to_string(&new.config)?;
        self.conn.execute(
            "INSERT INTO insight_templates (name, description, type, config, category, is_default) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                new.name,
                new.description,
                new.chart_type,
                config,
                new.category,
                new.is_default
            ],
        )?;
        Ok(InsightTemplate {
            id: self.conn.last_insert_rowid(),
            name: new.name.clone(),
            description: new.description.clone(),
            chart_type: new.chart_type.clone(),
            fields: extract_fields(&new.config),
            config: new.config.clone(),
            category: new.category.clone(),
            is_default: new.is_default,
        })
    }

    /// Install the default templates that are not present yet (matched by
    /// name). Returns how many were added.
    pub fn seed_default_templates(&self) -> Result<usize> {
        let mut added = 0;
        for template in default_templates() {
            let exists: bool = self.conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM insight_templates WHERE name = ?1)",
                params![template.name],
                |row| row.get(0),
            )?;
            if !exists {
                self.create_template(&template)?;
                added += 1;
            }
        }
        if added > 0 {
            info!(added, "seeded default templates");
        }
        Ok(added)
    }
}

impl TemplateSource for AppStore {
    fn template(&self, id: i64) -> Result<Option<InsightTemplate>> {
        self.get_template(id)
    }
}
