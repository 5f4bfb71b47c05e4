//! Backend services for pgpeek.
//!
//! - `connection` - The session's single connection, via deadpool-postgres
//! - `schema` - Table listing for the table picker
//! - `query_builder` - Filter/sort to SELECT translation
//! - `query` - Query execution and row conversion
//! - `export` - CSV export of the current result

pub mod connection;
pub mod export;
pub mod query;
pub mod query_builder;
pub mod schema;

pub use connection::{ConnectionPool, PooledConnection};
pub use export::{CsvExporter, ExportOutcome};
pub use query::QueryService;
pub use query_builder::QueryBuilder;
pub use schema::SchemaService;
