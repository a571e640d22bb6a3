//! Predicate builder: filters -> parameterized WHERE condition.

use rusqlite::types::Value as SqlValue;

use super::filter::{FilterExpression, Filters};
use crate::error::Result;
use crate::sql::Ident;

/// A parameterized boolean condition.
///
/// `params` are in placeholder order; the count query and the data query
/// bind the same list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereClause {
    conditions: Vec<String>,
    params: Vec<SqlValue>,
}

impl WhereClause {
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Conditions joined with `AND`, or `None` when nothing filters.
    pub fn condition(&self) -> Option<String> {
        if self.conditions.is_empty() {
            None
        } else {
            Some(self.conditions.join(" AND "))
        }
    }

    /// Full clause text: `WHERE ...` or the empty string.
    pub fn to_sql(&self) -> String {
        self.condition()
            .map(|c| format!("WHERE {}", c))
            .unwrap_or_default()
    }

    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    fn push(&mut self, condition: String, params: impl IntoIterator<Item = SqlValue>) {
        self.conditions.push(condition);
        self.params.extend(params);
    }
}

/// Build the WHERE condition for `filters`.
///
/// Fails with InvalidInput if a filter key is not a safe identifier.
pub fn build_where(filters: &Filters) -> Result<WhereClause> {
    let mut clause = WhereClause::default();

    for (column, expr) in filters {
        let column = Ident::parse(column)?;
        let col = column.quoted();

        match expr {
            FilterExpression::Contains(text) if text.is_empty() => {}
            FilterExpression::Contains(text) => {
                clause.push(
                    format!("{} LIKE ?", col),
                    [SqlValue::Text(format!("%{}%", text))],
                );
            }
            FilterExpression::Equals(value) => {
                clause.push(format!("{} = ?", col), [value.to_sql_value()]);
            }
            FilterExpression::AnyOf(values) if values.is_empty() => {
                // An empty allowed set matches nothing.
                clause.push("1 = 0".to_string(), std::iter::empty());
            }
            FilterExpression::AnyOf(values) => {
                let placeholders = vec!["?"; values.len()].join(", ");
                clause.push(
                    format!("{} IN ({})", col, placeholders),
                    values.iter().map(|v| v.to_sql_value()),
                );
            }
            FilterExpression::Compare { op, value } => {
                clause.push(format!("{} {} ?", col, op.as_sql()), [value.to_sql_value()]);
            }
        }
    }

    Ok(clause)
}
