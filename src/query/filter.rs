//! Filter expressions.
//!
//! A filter is one column's condition. Programmatic callers (chart preview,
//! saved visualizations) send loosely-typed JSON; the HTTP table view sends
//! `filter[<column>]=<value>` strings. Both are parsed into
//! [`FilterExpression`] up front, so the predicate builder only ever sees
//! well-formed shapes and unknown ones are rejected instead of ignored.

use std::collections::BTreeMap;

use rusqlite::types::Value as SqlValue;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Column name -> filter. Iteration (and therefore parameter) order is by
/// column name.
pub type Filters = BTreeMap<String, FilterExpression>;

/// A single bound operand.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterScalar {
    Text(String),
    Integer(i64),
    Real(f64),
    Bool(bool),
}

impl FilterScalar {
    fn from_json(column: &str, value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(FilterScalar::Text(s.clone())),
            Value::Bool(b) => Ok(FilterScalar::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(FilterScalar::Integer(i)),
                None => n.as_f64().map(FilterScalar::Real).ok_or_else(|| {
                    Error::invalid(format!("Filter on '{}': number {} out of range", column, n))
                }),
            },
            other => Err(Error::invalid(format!(
                "Filter on '{}': operand must be a string, number or boolean, got {}",
                column,
                json_kind(other)
            ))),
        }
    }

    /// Value to bind. Booleans bind as 1/0, matching SQLite storage.
    pub fn to_sql_value(&self) -> SqlValue {
        match self {
            FilterScalar::Text(s) => SqlValue::Text(s.clone()),
            FilterScalar::Integer(i) => SqlValue::Integer(*i),
            FilterScalar::Real(f) => SqlValue::Real(*f),
            FilterScalar::Bool(b) => SqlValue::Integer(i64::from(*b)),
        }
    }
}

/// Comparison operator of an operator-tagged filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
}

impl FilterOp {
    pub const ALL: [FilterOp; 7] = [
        FilterOp::Eq,
        FilterOp::Neq,
        FilterOp::Gt,
        FilterOp::Gte,
        FilterOp::Lt,
        FilterOp::Lte,
        FilterOp::Like,
    ];

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.key() == key)
    }

    /// JSON key naming this operator.
    pub fn key(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Neq => "neq",
            FilterOp::Gt => "gt",
            FilterOp::Gte => "gte",
            FilterOp::Lt => "lt",
            FilterOp::Lte => "lte",
            FilterOp::Like => "like",
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Neq => "!=",
            FilterOp::Gt => ">",
            FilterOp::Gte => ">=",
            FilterOp::Lt => "<",
            FilterOp::Lte => "<=",
            FilterOp::Like => "LIKE",
        }
    }
}

/// One column's filter condition.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpression {
    /// Substring match: `col LIKE %value%`.
    Contains(String),
    /// Exact match on a number or boolean: `col = value`.
    Equals(FilterScalar),
    /// Membership: `col IN (v1, v2, ...)`.
    AnyOf(Vec<FilterScalar>),
    /// `col <op> value`.
    Compare { op: FilterOp, value: FilterScalar },
}

impl FilterExpression {
    /// Parse a JSON filter value.
    ///
    /// Returns `Ok(None)` for values that mean "no filter" (`null`, `""`).
    pub fn from_json(column: &str, value: &Value) -> Result<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) if s.is_empty() => Ok(None),
            Value::String(s) => Ok(Some(FilterExpression::Contains(s.clone()))),
            Value::Bool(_) | Value::Number(_) => Ok(Some(FilterExpression::Equals(
                FilterScalar::from_json(column, value)?,
            ))),
            Value::Array(items) => {
                let values = items
                    .iter()
                    .map(|item| FilterScalar::from_json(column, item))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Some(FilterExpression::AnyOf(values)))
            }
            Value::Object(obj) => Self::compare_from_json(column, obj).map(Some),
        }
    }

    fn compare_from_json(column: &str, obj: &Map<String, Value>) -> Result<Self> {
        let mut entries = obj.iter();
        let (key, operand) = match (entries.next(), entries.next()) {
            (Some(entry), None) => entry,
            _ => {
                return Err(Error::invalid(format!(
                    "Filter on '{}': operator object must have exactly one key",
                    column
                )))
            }
        };

        let op = FilterOp::from_key(key).ok_or_else(|| {
            let known: Vec<&str> = FilterOp::ALL.iter().map(FilterOp::key).collect();
            Error::invalid(format!(
                "Filter on '{}': unknown operator '{}' (expected one of {})",
                column,
                key,
                known.join(", ")
            ))
        })?;

        Ok(FilterExpression::Compare {
            op,
            value: FilterScalar::from_json(column, operand)?,
        })
    }
}

/// Parse a JSON object of column -> filter value.
pub fn parse_filters(map: &Map<String, Value>) -> Result<Filters> {
    let mut filters = Filters::new();
    for (column, value) in map {
        if let Some(expr) = FilterExpression::from_json(column, value)? {
            filters.insert(column.clone(), expr);
        }
    }
    Ok(filters)
}

/// Collect `filter[<column>]=<value>` query pairs as substring filters.
///
/// Other keys are ignored; empty values are skipped.
pub fn filters_from_query<'a, I>(pairs: I) -> Filters
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .filter_map(|(key, value)| {
            let column = key.strip_prefix("filter[")?.strip_suffix(']')?;
            if value.is_empty() {
                return None;
            }
            Some((column.to_string(), FilterExpression::Contains(value.to_string())))
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
