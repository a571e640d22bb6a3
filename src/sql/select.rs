//! SELECT statement builder.
//!
//! Covers exactly the statement shapes the query layer issues against user
//! databases: `SELECT *` and `SELECT COUNT(*)` over one table, with an
//! optional WHERE condition, ORDER BY and LIMIT/OFFSET. Table and column
//! names come in as [`Ident`], so nothing unvalidated reaches the SQL text;
//! values are always bound separately as `?` placeholders.

use serde::{Deserialize, Serialize};

use super::ident::Ident;

// =============================================================================
// ORDER BY
// =============================================================================

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

impl SortDir {
    /// Parse a user-supplied direction, case-insensitively.
    ///
    /// Anything other than `desc` sorts ascending.
    pub fn parse_lossy(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("desc") {
            SortDir::Desc
        } else {
            SortDir::Asc
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }
    }
}

/// Ordering applied to a SELECT.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderBy {
    Column { column: Ident, dir: SortDir },
    /// `ORDER BY RANDOM()`, used for sampling.
    Random,
}

impl OrderBy {
    pub fn column(column: Ident, dir: SortDir) -> Self {
        OrderBy::Column { column, dir }
    }

    fn to_sql(&self) -> String {
        match self {
            OrderBy::Column { column, dir } => {
                format!("ORDER BY {} {}", column.quoted(), dir.as_sql())
            }
            OrderBy::Random => "ORDER BY RANDOM()".to_string(),
        }
    }
}

// =============================================================================
// SELECT
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Projection {
    Star,
    CountStar,
}

/// A single-table SELECT.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct Select {
    projection: Projection,
    table: Ident,
    condition: Option<String>,
    order_by: Option<OrderBy>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl Select {
    /// `SELECT * FROM table`.
    pub fn star(table: &Ident) -> Self {
        Self::new(Projection::Star, table)
    }

    /// `SELECT COUNT(*) AS total FROM table`.
    pub fn count(table: &Ident) -> Self {
        Self::new(Projection::CountStar, table)
    }

    fn new(projection: Projection, table: &Ident) -> Self {
        Self {
            projection,
            table: table.clone(),
            condition: None,
            order_by: None,
            limit: None,
            offset: None,
        }
    }

    /// Attach a WHERE condition (without the `WHERE` keyword).
    ///
    /// `None` or an empty string leaves the statement unfiltered.
    pub fn filter(mut self, condition: Option<&str>) -> Self {
        self.condition = condition
            .filter(|c| !c.trim().is_empty())
            .map(str::to_string);
        self
    }

    pub fn order_by(mut self, order: Option<OrderBy>) -> Self {
        self.order_by = order;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Render SQL text.
    pub fn to_sql(&self) -> String {
        let mut sql = match self.projection {
            Projection::Star => format!("SELECT * FROM {}", self.table.quoted()),
            Projection::CountStar => {
                format!("SELECT COUNT(*) AS total FROM {}", self.table.quoted())
            }
        };

        if let Some(condition) = &self.condition {
            sql.push_str(" WHERE ");
            sql.push_str(condition);
        }

        if let Some(order) = &self.order_by {
            sql.push(' ');
            sql.push_str(&order.to_sql());
        }

        // SQLite needs a LIMIT before OFFSET; -1 means unbounded.
        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => {
                sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset))
            }
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {}", limit)),
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {}", offset)),
            (None, None) => {}
        }

        sql
    }
}
