//! Chart data shaper: flat rows -> labels plus one or more datasets.
//!
//! Lookups are by exact field name first, then by the camelCase key the row
//! transformer produces, so both `unit_price` and `unitPrice` find the same
//! column.

use serde_json::Value;

use super::types::{palette_color, ChartConfig, ChartData, Color, Dataset};
use crate::query::row::{column_key, Row};

/// Label for rows whose x value is missing or null.
pub const UNKNOWN_LABEL: &str = "Unknown";
/// Group for rows whose group-by value is missing or null.
pub const OTHER_GROUP: &str = "Other";
/// Label of the placeholder dataset returned for empty input.
pub const NO_DATA_LABEL: &str = "No Data";

/// Shape `rows` for `config`.
///
/// Never fails: empty input yields a single empty "No Data" dataset and
/// values that are not numeric count as 0.
pub fn shape_chart_data(rows: &[Row], config: &ChartConfig) -> ChartData {
    if rows.is_empty() {
        let color = palette_color(0).to_string();
        return ChartData {
            labels: Vec::new(),
            datasets: vec![Dataset {
                label: NO_DATA_LABEL.to_string(),
                data: Vec::new(),
                background_color: Color::Single(color.clone()),
                border_color: Color::Single(color),
            }],
        };
    }

    match config.group_by() {
        None => single_series(rows, config),
        Some(group_by) => grouped(rows, config, group_by),
    }
}

fn single_series(rows: &[Row], config: &ChartConfig) -> ChartData {
    let labels: Vec<String> = rows.iter().map(|r| x_label(r, &config.x_field)).collect();
    let data: Vec<f64> = rows
        .iter()
        .map(|r| to_number(field(r, &config.y_field)))
        .collect();

    let color = if config.chart_type.is_radial() {
        Color::PerPoint((0..data.len()).map(|i| palette_color(i).to_string()).collect())
    } else {
        Color::Single(palette_color(0).to_string())
    };

    ChartData {
        labels,
        datasets: vec![Dataset {
            label: config.y_field.clone(),
            data,
            background_color: color.clone(),
            border_color: color,
        }],
    }
}

/// One dataset per distinct group, in first-seen order. Labels stay one per
/// row, as in the single-series case, so a repeated x value repeats its
/// label; each (group, label) cell takes the first matching row's y value,
/// or 0 when no row matches.
fn grouped(rows: &[Row], config: &ChartConfig, group_by: &str) -> ChartData {
    let keyed: Vec<(String, String, &Row)> = rows
        .iter()
        .map(|r| {
            let group = stringify(field(r, group_by)).unwrap_or_else(|| OTHER_GROUP.to_string());
            (x_label(r, &config.x_field), group, r)
        })
        .collect();

    let labels: Vec<String> = keyed.iter().map(|(label, _, _)| label.clone()).collect();
    let groups = distinct(keyed.iter().map(|(_, group, _)| group));

    let datasets = groups
        .into_iter()
        .enumerate()
        .map(|(i, group)| {
            let data = labels
                .iter()
                .map(|label| {
                    keyed
                        .iter()
                        .find(|(l, g, _)| l == label && *g == group)
                        .map(|(_, _, row)| to_number(field(row, &config.y_field)))
                        .unwrap_or(0.0)
                })
                .collect();
            let color = palette_color(i).to_string();
            Dataset {
                label: group,
                data,
                background_color: Color::Single(color.clone()),
                border_color: Color::Single(color),
            }
        })
        .collect();

    ChartData { labels, datasets }
}

fn distinct<'a>(values: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for v in values {
        if !out.contains(v) {
            out.push(v.clone());
        }
    }
    out
}

fn field<'a>(row: &'a Row, name: &str) -> Option<&'a Value> {
    row.get(name).or_else(|| row.get(&column_key(name)))
}

fn x_label(row: &Row, x_field: &str) -> String {
    stringify(field(row, x_field)).unwrap_or_else(|| UNKNOWN_LABEL.to_string())
}

/// Display form of a value; `None` for missing or null.
fn stringify(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// Numeric coercion; anything unparseable counts as 0.
fn to_number(value: Option<&Value>) -> f64 {
    let n = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if n.is_finite() {
        n
    } else {
        0.0
    }
}
