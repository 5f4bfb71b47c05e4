//! Table listing.
//!
//! pgpeek only needs the names of the base tables in the `public` schema; everything else
//! about a table is learned from the columns of the query that displays it.

use crate::error::PeekError;
use crate::services::connection::PooledConnection;

/// Catalog query for the table picker.
pub const LIST_TABLES_SQL: &str = r#"
    SELECT table_name::text AS name
    FROM information_schema.tables
    WHERE table_schema = 'public'
      AND table_type = 'BASE TABLE'
    ORDER BY table_name
"#;

/// Schema lookup service.
pub struct SchemaService;

impl SchemaService {
    /// List base tables in the public schema, ascending by name.
    pub async fn list_tables(conn: &PooledConnection) -> Result<Vec<String>, PeekError> {
        tracing::debug!(connection_id = %conn.connection_id(), "Listing tables");

        let rows = conn.query(LIST_TABLES_SQL, &[]).await.map_err(|e| {
            tracing::warn!(error = %e, "Failed to list tables");
            e
        })?;

        let tables: Vec<String> = rows.into_iter().map(|row| row.get("name")).collect();
        tracing::debug!(count = tables.len(), "Tables listed");
        Ok(tables)
    }
}
