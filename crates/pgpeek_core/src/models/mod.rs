//! Data models for pgpeek.
//!
//! - `connection` - ConnectionParams, ConnectionOptions
//! - `query` - FilterMap, SortSpec, Predicate, SelectQuery
//! - `result` - ColumnInfo, ResultSet and cell formatting
//! - `controls` - Per-column filter slots and sort triggers

pub mod connection;
pub mod controls;
pub mod query;
pub mod result;

pub use connection::{ConnectionOptions, ConnectionParams};
pub use controls::{ColumnControl, FilterPanel, SortTrigger};
pub use query::{FilterMap, FilterOp, Predicate, SelectQuery, SortSpec, ROW_LIMIT};
pub use result::{ColumnInfo, ResultSet, Row};
