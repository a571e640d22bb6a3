//! Saved visualizations.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{now_text, read_config, read_timestamp, AppStore};
use crate::chart::ChartConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedVisualization {
    pub id: i64,
    pub connection_id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub chart_type: String,
    /// Stored chart config; `{}` if the stored text was malformed.
    pub config: Value,
    pub table_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SavedVisualization {
    /// Decode the stored config.
    pub fn chart_config(&self) -> Result<ChartConfig> {
        serde_json::from_value(self.config.clone()).map_err(|e| {
            Error::invalid(format!(
                "Visualization {} has an invalid chart config: {}",
                self.id, e
            ))
        })
    }
}

/// Data for creating or replacing a visualization. Type and table come from
/// the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVisualization {
    pub connection_id: i64,
    pub name: String,
    pub config: ChartConfig,
}

const SELECT_VISUALIZATION: &str = "SELECT id, connection_id, name, type, config, table_name, created_at, updated_at \
     FROM saved_visualizations";

fn visualization_from_row(row: &Row<'_>) -> rusqlite::Result<SavedVisualization> {
    let id: i64 = row.get(0)?;
    let config_text: String = row.get(4)?;
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;
    Ok(SavedVisualization {
        id,
        connection_id: row.get(1)?,
        name: row.get(2)?,
        chart_type: row.get(3)?,
        config: read_config("visualization", id, &config_text),
        table_name: row.get(5)?,
        created_at: read_timestamp(&created_at),
        updated_at: read_timestamp(&updated_at),
    })
}

impl AppStore {
    /// Save a visualization. Fails with NotFound if the connection does not
    /// exist.
    pub fn create_visualization(&self, new: &NewVisualization) -> Result<SavedVisualization> {
        if self.get_connection(new.connection_id)?.is_none() {
            return Err(Error::not_found(format!(
                "Connection not found with ID: {}",
                new.connection_id
            )));
        }

        let config = serde_json::to_string(&new.config)?;
        let now = now_text();
        self.conn.execute(
            "INSERT INTO saved_visualizations \
             (connection_id, name, type, config, table_name, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                new.connection_id,
                new.name,
                new.config.chart_type.as_str(),
                config,
                new.config.table,
                now
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_visualization(id)?
            .ok_or(Error::Store(rusqlite::Error::QueryReturnedNoRows))
    }

    /// All visualizations, most recently updated first.
    pub fn list_visualizations(&self) -> Result<Vec<SavedVisualization>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} ORDER BY updated_at DESC, id DESC",
            SELECT_VISUALIZATION
        ))?;
        let visualizations = stmt
            .query_map([], visualization_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(visualizations)
    }

    pub fn get_visualization(&self, id: i64) -> Result<Option<SavedVisualization>> {
        let visualization = self
            .conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_VISUALIZATION),
                params![id],
                visualization_from_row,
            )
            .optional()?;
        Ok(visualization)
    }

    /// Replace name and config. Returns `None` for an unknown id.
    pub fn update_visualization(
        &self,
        id: i64,
        update: &NewVisualization,
    ) -> Result<Option<SavedVisualization>> {
        let config = serde_json::to_string(&update.config)?;
        let rows = self.conn.execute(
            "UPDATE saved_visualizations \
             SET name = ?1, type = ?2, config = ?3, table_name = ?4, updated_at = ?5 \
             WHERE id = ?6",
            params![
                update.name,
                update.config.chart_type.as_str(),
                config,
                update.config.table,
                now_text(),
                id
            ],
        )?;
        if rows == 0 {
            return Ok(None);
        }
        self.get_visualization(id)
    }

    pub fn delete_visualization(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM saved_visualizations WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }
}
