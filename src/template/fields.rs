//! Field extraction from a template's stored config.
//!
//! Resolution is a fallback chain; exactly one branch runs:
//!
//! 1. `config.fields` is an array: returned as declared, minus entries that
//!    are not field objects (logged and skipped)
//! 2. `config.requiredMappings` is an object: one field per entry
//! 3. otherwise: `xField` and `yField`, plus `groupBy` when
//!    `config.allowGrouping` is truthy

use serde_json::{Map, Value};
use tracing::warn;

use super::TemplateField;

pub const X_FIELD: &str = "xField";
pub const Y_FIELD: &str = "yField";
pub const GROUP_BY: &str = "groupBy";

/// Derive the fields a template config asks for.
pub fn extract_fields(config: &Value) -> Vec<TemplateField> {
    if let Some(Value::Array(fields)) = config.get("fields") {
        return fields
            .iter()
            .enumerate()
            .filter_map(|(index, f)| {
                match serde_json::from_value::<TemplateField>(f.clone()) {
                    Ok(field) => Some(field),
                    Err(e) => {
                        warn!(index, error = %e, "skipping malformed template field");
                        None
                    }
                }
            })
            .collect();
    }

    if let Some(Value::Object(mappings)) = config.get("requiredMappings") {
        return from_required_mappings(mappings);
    }

    let mut fields = vec![
        TemplateField::new(
            X_FIELD,
            "X-Axis Field",
            "Field to use for the X-axis (categories)",
            true,
        ),
        TemplateField::new(
            Y_FIELD,
            "Y-Axis Field",
            "Field to use for the Y-axis (values)",
            true,
        ),
    ];
    if config.get("allowGrouping").is_some_and(is_truthy) {
        fields.push(TemplateField::new(
            GROUP_BY,
            "Group By Field",
            "Optional field to group data by",
            false,
        ));
    }
    fields
}

fn from_required_mappings(mappings: &Map<String, Value>) -> Vec<TemplateField> {
    mappings
        .iter()
        .map(|(id, entry)| {
            let name = entry
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or(id.as_str())
                .to_string();
            let description = entry
                .get("description")
                .and_then(Value::as_str)
                .filter(|d| !d.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("Field for {}", name));
            // absent means required
            let required = entry.get("required").map_or(true, is_truthy);
            TemplateField {
                id: id.clone(),
                name,
                description,
                required,
            }
        })
        .collect()
}

/// Loose truthiness for flags in hand-written configs.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
