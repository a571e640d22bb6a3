//! Chart configuration and chart data types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;

/// Fixed palette; datasets (or pie slices) cycle through it by index.
pub const PALETTE: [&str; 10] = [
    "#2563EB", "#D946EF", "#F59E0B", "#10B981", "#6366F1", "#EF4444", "#8B5CF6", "#EC4899",
    "#06B6D4", "#84CC16",
];

/// Palette colour for index `i`.
pub fn palette_color(i: usize) -> &'static str {
    PALETTE[i % PALETTE.len()]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Bar,
    Line,
    Pie,
    Doughnut,
}

impl ChartType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Bar => "bar",
            ChartType::Line => "line",
            ChartType::Pie => "pie",
            ChartType::Doughnut => "doughnut",
        }
    }

    /// Pie and doughnut charts colour each data point, not each dataset.
    pub fn is_radial(&self) -> bool {
        matches!(self, ChartType::Pie | ChartType::Doughnut)
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bar" => Ok(ChartType::Bar),
            "line" => Ok(ChartType::Line),
            "pie" => Ok(ChartType::Pie),
            "doughnut" => Ok(ChartType::Doughnut),
            other => Err(Error::invalid(format!(
                "Unsupported chart type '{}': expected bar, line, pie or doughnut",
                other
            ))),
        }
    }
}

/// A concrete chart: real table and column bindings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfig {
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    pub table: String,
    pub x_field: String,
    pub y_field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
    /// Same JSON shapes the query layer's filter parser accepts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
}

impl ChartConfig {
    pub fn new(
        chart_type: ChartType,
        table: impl Into<String>,
        x_field: impl Into<String>,
        y_field: impl Into<String>,
    ) -> Self {
        Self {
            chart_type,
            table: table.into(),
            x_field: x_field.into(),
            y_field: y_field.into(),
            group_by: None,
            filters: None,
            options: None,
        }
    }

    #[must_use]
    pub fn with_group_by(mut self, group_by: impl Into<String>) -> Self {
        self.group_by = Some(group_by.into());
        self
    }

    #[must_use]
    pub fn with_filters(mut self, filters: Map<String, Value>) -> Self {
        self.filters = Some(filters);
        self
    }

    /// Group-by column, treating an empty string as unset.
    pub fn group_by(&self) -> Option<&str> {
        self.group_by.as_deref().filter(|g| !g.is_empty())
    }
}

/// Either one colour for the whole dataset or one per data point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Color {
    Single(String),
    PerPoint(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub label: String,
    /// Parallel to [`ChartData::labels`].
    pub data: Vec<f64>,
    pub background_color: Color,
    pub border_color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}
