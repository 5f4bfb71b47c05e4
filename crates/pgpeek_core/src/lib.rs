//! Core types and services for the pgpeek table browser.
//!
//! This crate provides everything below the terminal front end:
//!
//! - **error**: Error handling with PostgreSQL-specific details
//! - **models**: Connection parameters, filters, queries, results and column controls
//! - **services**: Connection, table listing, query building and execution, CSV export
//! - **state**: Browsing state and the session driver
//! - **logging**: Structured logging setup

pub mod error;
pub mod logging;
pub mod models;
pub mod services;
pub mod state;

pub use error::{ErrorInfo, PeekError};
pub use models::{
    ColumnControl, ColumnInfo, ConnectionOptions, ConnectionParams, FilterMap, FilterPanel,
    ResultSet, Row, SelectQuery, SortSpec, SortTrigger, ROW_LIMIT,
};
pub use services::{CsvExporter, ExportOutcome, QueryBuilder};
pub use state::{BrowserState, Session, SessionPhase};
