//! Query construction models.
//!
//! A [`SelectQuery`] is the only statement pgpeek sends for table data. Identifiers are quoted
//! into the SQL text; filter values travel separately as bound parameters.

use serde::Serialize;

/// Maximum number of rows any table query returns.
pub const ROW_LIMIT: usize = 100;

/// Column name to filter text, in column order.
///
/// Empty or whitespace-only text means "no filter" for that column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterMap {
    entries: Vec<(String, String)>,
}

impl FilterMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a map with one empty entry per column.
    pub fn for_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { entries: columns.into_iter().map(|c| (c.into(), String::new())).collect() }
    }

    /// Set the filter text for a column, appending the column if it is new.
    pub fn set(&mut self, column: impl Into<String>, text: impl Into<String>) {
        let column = column.into();
        let text = text.into();
        match self.entries.iter_mut().find(|(c, _)| *c == column) {
            Some(entry) => entry.1 = text,
            None => self.entries.push((column, text)),
        }
    }

    /// Get the filter text for a column.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.entries.iter().find(|(c, _)| c == column).map(|(_, t)| t.as_str())
    }

    /// Column names in order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(c, _)| c.as_str())
    }

    /// All entries in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(c, t)| (c.as_str(), t.as_str()))
    }

    /// Entries whose trimmed text is non-empty.
    pub fn active(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().filter(|(_, t)| !t.trim().is_empty())
    }

    /// Blank every entry, keeping the columns.
    pub fn clear_values(&mut self) {
        for entry in &mut self.entries {
            entry.1.clear();
        }
    }

    /// Number of columns in the map.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the map has no columns.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Single-column sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortSpec {
    /// Column to order by
    pub column: String,
    /// Descending when true
    pub descending: bool,
}

impl SortSpec {
    /// Create a sort key.
    pub fn new(column: impl Into<String>, descending: bool) -> Self {
        Self { column: column.into(), descending }
    }
}

/// Comparison applied by a filter predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FilterOp {
    /// Exact numeric equality
    Equals,
    /// Case-insensitive pattern match (`ILIKE`)
    ContainsIgnoreCase,
}

/// One `column op value` condition of a WHERE clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Predicate {
    /// Column being filtered
    pub column: String,
    /// Comparison operator
    pub op: FilterOp,
    /// Bound parameter value
    pub value: String,
}

impl Predicate {
    /// Render the predicate with its value as placeholder `$index`.
    fn to_sql(&self, index: usize) -> String {
        let column = quote_ident(&self.column);
        match self.op {
            // Bound as text and cast so it compares against any numeric column type
            FilterOp::Equals => format!("{column} = ${index}::text::numeric"),
            FilterOp::ContainsIgnoreCase => format!("{column} ILIKE ${index}"),
        }
    }
}

/// A `SELECT *` over one table with optional filters and ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectQuery {
    /// Table to read from
    pub table: String,
    /// WHERE conditions, ANDed in order
    pub predicates: Vec<Predicate>,
    /// Optional ORDER BY
    pub sort: Option<SortSpec>,
    /// LIMIT value
    pub limit: usize,
}

impl SelectQuery {
    /// SQL text with `$n` placeholders.
    pub fn sql(&self) -> String {
        let mut sql = format!("SELECT * FROM {}", quote_ident(&self.table));

        if !self.predicates.is_empty() {
            let conditions: Vec<String> = self
                .predicates
                .iter()
                .enumerate()
                .map(|(i, p)| p.to_sql(i + 1))
                .collect();
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        if let Some(sort) = &self.sort {
            sql.push_str(" ORDER BY ");
            sql.push_str(&quote_ident(&sort.column));
            if sort.descending {
                sql.push_str(" DESC");
            }
        }

        sql.push_str(&format!(" LIMIT {}", self.limit));
        sql
    }

    /// Parameter values matching the placeholders in [`SelectQuery::sql`].
    pub fn params(&self) -> Vec<String> {
        self.predicates.iter().map(|p| p.value.clone()).collect()
    }
}

impl std::fmt::Display for SelectQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.sql())
    }
}

/// Quote an identifier for PostgreSQL, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
