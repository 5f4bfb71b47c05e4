//! Query result models.

use serde::Serialize;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::PeekError;

/// Column metadata from query results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    /// Column name
    pub name: String,
    /// PostgreSQL type OID
    pub type_oid: u32,
    /// Human-readable type name
    pub type_name: String,
}

impl ColumnInfo {
    /// Create column metadata.
    pub fn new(name: impl Into<String>, type_oid: u32, type_name: impl Into<String>) -> Self {
        Self { name: name.into(), type_oid, type_name: type_name.into() }
    }
}

/// A single row of values, one per column.
pub type Row = Vec<JsonValue>;

/// Columns and rows captured from the most recent query.
#[derive(Debug, Clone, Serialize)]
pub struct ResultSet {
    query_id: Uuid,
    columns: Vec<ColumnInfo>,
    rows: Vec<Row>,
    execution_time_ms: u64,
}

impl ResultSet {
    /// Build a result set, rejecting rows whose length differs from the column count.
    pub fn new(
        query_id: Uuid,
        columns: Vec<ColumnInfo>,
        rows: Vec<Row>,
        execution_time_ms: u64,
    ) -> Result<Self, PeekError> {
        if let Some((index, row)) =
            rows.iter().enumerate().find(|(_, row)| row.len() != columns.len())
        {
            return Err(PeekError::internal(format!(
                "Row {index} has {} values but the result has {} columns",
                row.len(),
                columns.len()
            )));
        }

        Ok(Self { query_id, columns, rows, execution_time_ms })
    }

    /// ID assigned to the query that produced this result.
    pub fn query_id(&self) -> Uuid {
        self.query_id
    }

    /// Column metadata in query order.
    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    /// Rows in the order the server returned them.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Time to execute in milliseconds.
    pub fn execution_time_ms(&self) -> u64 {
        self.execution_time_ms
    }

    /// Get column names.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Get the number of rows returned.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check if the result has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Text written to an export file for a cell. NULL becomes an empty field.
pub fn cell_to_field(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Text shown in the result grid for a cell.
pub fn cell_to_display(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "NULL".to_string(),
        other => cell_to_field(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn columns() -> Vec<ColumnInfo> {
        vec![ColumnInfo::new("c1", 23, "int4"), ColumnInfo::new("c2", 25, "text")]
    }

    #[test]
    fn test_result_set_accessors() {
        let id = Uuid::new_v4();
        let result =
            ResultSet::new(id, columns(), vec![vec![json!(1), json!("a")]], 4).unwrap();

        assert_eq!(result.query_id(), id);
        assert_eq!(result.column_names(), vec!["c1", "c2"]);
        assert_eq!(result.row_count(), 1);
        assert!(!result.is_empty());
        assert_eq!(result.execution_time_ms(), 4);
    }

    #[test]
    fn test_result_set_rejects_ragged_rows() {
        let err = ResultSet::new(
            Uuid::new_v4(),
            columns(),
            vec![vec![json!(1), json!("a")], vec![json!(2)]],
            0,
        )
        .unwrap_err();

        assert!(matches!(err, PeekError::Internal { .. }));
        assert!(err.to_string().contains("Row 1 has 1 values"));
    }

    #[test]
    fn test_zero_rows_keeps_columns() {
        let result = ResultSet::new(Uuid::new_v4(), columns(), Vec::new(), 0).unwrap();
        assert!(result.is_empty());
        assert_eq!(result.columns().len(), 2);
    }

    #[test]
    fn test_cell_formatting() {
        assert_eq!(cell_to_field(&JsonValue::Null), "");
        assert_eq!(cell_to_display(&JsonValue::Null), "NULL");
        assert_eq!(cell_to_field(&json!("France")), "France");
        assert_eq!(cell_to_field(&json!(2021)), "2021");
        assert_eq!(cell_to_field(&json!(1.5)), "1.5");
        assert_eq!(cell_to_field(&json!(true)), "true");
        assert_eq!(cell_to_field(&json!([1, 2])), "[1,2]");
        assert_eq!(cell_to_display(&json!({"k": "v"})), "{\"k\":\"v\"}");
    }
}
