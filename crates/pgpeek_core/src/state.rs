//! Browsing session state.
//!
//! [`BrowserState`] holds everything the user sees (table list, current table, filter slots,
//! applied filters, sort key, last result). Each user action is a transition on it that returns
//! the query to run next. [`Session`] owns the connection and the runtime, runs those queries
//! and feeds the outcome back.

use std::path::Path;

use serde::Serialize;

use crate::error::PeekError;
use crate::models::{ConnectionParams, FilterMap, FilterPanel, ResultSet, SelectQuery, SortSpec};
use crate::services::{
    ConnectionPool, CsvExporter, ExportOutcome, QueryBuilder, QueryService, SchemaService,
};

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionPhase {
    /// No connection open
    Disconnected,
    /// Connected, no table shown yet
    Connected,
    /// A table is shown with no filter or sort applied
    TableSelected,
    /// A table is shown with filters and/or a sort key applied
    Filtered,
}

/// Why a query is being run; decides what happens to the controls afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// First query for a newly selected table; controls are regenerated from its columns.
    TableSelected,
    /// Re-run after apply, reset or sort; controls are kept.
    Refresh,
}

/// A query produced by a state transition, waiting to be executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingQuery {
    /// What to run
    pub query: SelectQuery,
    /// Why it runs
    pub kind: QueryKind,
}

/// Everything shown by the browser, independent of the connection.
#[derive(Debug, Default)]
pub struct BrowserState {
    tables: Vec<String>,
    selected_table: Option<String>,
    current_table: Option<String>,
    panel: FilterPanel,
    filters: FilterMap,
    sort: Option<SortSpec>,
    last_result: Option<ResultSet>,
}

impl BrowserState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Table picker ==========

    /// Replace the table list and preselect its first entry.
    pub fn set_tables(&mut self, tables: Vec<String>) {
        self.selected_table = tables.first().cloned();
        self.tables = tables;
    }

    /// Tables available in the picker.
    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    /// Table currently chosen in the picker.
    pub fn selected_table(&self) -> Option<&str> {
        self.selected_table.as_deref()
    }

    /// Choose a table in the picker without showing it.
    pub fn pick_table(&mut self, table: &str) -> Result<(), PeekError> {
        if !self.tables.iter().any(|t| t == table) {
            return Err(PeekError::invalid_input(format!("Unknown table: {table}")));
        }
        self.selected_table = Some(table.to_string());
        Ok(())
    }

    // ========== Transitions ==========

    /// Show `table`: drop every filter, sort key and control of the previous table and build
    /// the unfiltered query.
    pub fn select_table(&mut self, table: &str) -> PendingQuery {
        self.current_table = Some(table.to_string());
        self.filters = FilterMap::new();
        self.sort = None;
        self.panel.clear();
        self.last_result = None;

        PendingQuery {
            query: QueryBuilder::build(table, &self.filters, None),
            kind: QueryKind::TableSelected,
        }
    }

    /// Copy the filter slots into the applied filters. `None` when no table is shown.
    pub fn apply_filter(&mut self) -> Option<PendingQuery> {
        let table = self.current_table.as_deref()?;
        self.filters = self.panel.filter_map();
        Some(Self::refresh(table, &self.filters, self.sort.as_ref()))
    }

    /// Blank every slot, the applied filters and the sort key. `None` when no table is shown.
    pub fn reset_filter(&mut self) -> Option<PendingQuery> {
        let table = self.current_table.as_deref()?;
        self.panel.clear_filter_texts();
        self.filters.clear_values();
        self.sort = None;
        Some(Self::refresh(table, &self.filters, None))
    }

    /// Order by one column, keeping the applied filters. Slot edits that were not applied yet
    /// stay unapplied. `Ok(None)` when no table is shown.
    pub fn sort_by_column(
        &mut self,
        column: &str,
        descending: bool,
    ) -> Result<Option<PendingQuery>, PeekError> {
        let Some(table) = self.current_table.as_deref() else {
            return Ok(None);
        };
        if !self.panel.has_column(column) {
            return Err(PeekError::invalid_input(format!("Unknown column: {column}")));
        }
        self.sort = Some(SortSpec::new(column, descending));
        Ok(Some(Self::refresh(table, &self.filters, self.sort.as_ref())))
    }

    /// Edit one filter slot without applying it.
    pub fn set_filter_text(&mut self, column: &str, text: &str) -> Result<(), PeekError> {
        self.panel.set_filter_text(column, text)
    }

    fn refresh(table: &str, filters: &FilterMap, sort: Option<&SortSpec>) -> PendingQuery {
        PendingQuery { query: QueryBuilder::build(table, filters, sort), kind: QueryKind::Refresh }
    }

    // ========== Query lifecycle ==========

    /// Clear the displayed result before a query runs.
    pub fn begin_query(&mut self) {
        self.last_result = None;
    }

    /// Record the outcome of a query.
    ///
    /// After a table selection the controls are rebuilt from the returned columns, or emptied
    /// when the query failed. A failure always leaves the last result empty.
    pub fn finish_query(
        &mut self,
        kind: QueryKind,
        outcome: Result<ResultSet, PeekError>,
    ) -> Result<&ResultSet, PeekError> {
        match outcome {
            Ok(result) => {
                if kind == QueryKind::TableSelected {
                    let columns = result.column_names();
                    self.panel.regenerate(&columns);
                    self.filters = FilterMap::for_columns(columns);
                }
                Ok(&*self.last_result.insert(result))
            }
            Err(e) => {
                if kind == QueryKind::TableSelected {
                    self.panel.clear();
                    self.filters = FilterMap::new();
                }
                self.last_result = None;
                Err(e)
            }
        }
    }

    // ========== Accessors ==========

    /// Table being shown.
    pub fn current_table(&self) -> Option<&str> {
        self.current_table.as_deref()
    }

    /// Filter slots and sort triggers.
    pub fn panel(&self) -> &FilterPanel {
        &self.panel
    }

    /// Filters used by the last built query.
    pub fn filters(&self) -> &FilterMap {
        &self.filters
    }

    /// Active sort key.
    pub fn sort(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    /// Result of the most recent successful query.
    pub fn last_result(&self) -> Option<&ResultSet> {
        self.last_result.as_ref()
    }

    /// Lifecycle phase, given whether a connection is open.
    pub fn phase(&self, connected: bool) -> SessionPhase {
        if !connected {
            SessionPhase::Disconnected
        } else if self.current_table.is_none() {
            SessionPhase::Connected
        } else if self.sort.is_some() || self.filters.active().next().is_some() {
            SessionPhase::Filtered
        } else {
            SessionPhase::TableSelected
        }
    }
}

/// An interactive browsing session over a single connection.
///
/// Every database call blocks on a current-thread runtime, so exactly one query is in flight
/// at a time and each call completes before the next action is handled.
pub struct Session {
    runtime: tokio::runtime::Runtime,
    connection: Option<ConnectionPool>,
    browser: BrowserState,
    exporter: CsvExporter,
}

impl Session {
    /// Create a disconnected session.
    pub fn new() -> Result<Self, PeekError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| PeekError::internal(format!("Failed to create tokio runtime: {e}")))?;

        tracing::debug!("Session created");

        Ok(Self {
            runtime,
            connection: None,
            browser: BrowserState::new(),
            exporter: CsvExporter::new(),
        })
    }

    // ========== Connection ==========

    /// Open a connection, closing any previous one first.
    ///
    /// All browsing state of the previous connection is discarded, even when the new
    /// connection fails.
    pub fn connect(&mut self, params: ConnectionParams) -> Result<(), PeekError> {
        self.disconnect();

        tracing::debug!(url = %params.display_url(), "Connecting");
        let pool = self.runtime.block_on(ConnectionPool::connect(params)).map_err(|e| {
            tracing::warn!(error = %e, "Connection failed");
            e
        })?;

        self.connection = Some(pool);
        Ok(())
    }

    /// Close the connection, if any, and forget all browsing state.
    pub fn disconnect(&mut self) {
        if let Some(pool) = self.connection.take() {
            pool.close();
        }
        self.browser = BrowserState::new();
    }

    /// Fetch the table list into the picker, preselecting the first table.
    pub fn load_tables(&mut self) -> Result<&[String], PeekError> {
        let pool = self.connection.as_ref().ok_or_else(PeekError::not_connected)?;
        let tables = self.runtime.block_on(async {
            let conn = pool.get().await?;
            SchemaService::list_tables(&conn).await
        })?;

        self.browser.set_tables(tables);
        Ok(self.browser.tables())
    }

    // ========== Browsing ==========

    /// Choose a table in the picker.
    pub fn pick_table(&mut self, table: &str) -> Result<(), PeekError> {
        self.browser.pick_table(table)
    }

    /// Show a table: `table`, or the picker's selection when `None`.
    ///
    /// `Ok(None)` when there is nothing to show.
    pub fn show_table(&mut self, table: Option<&str>) -> Result<Option<&ResultSet>, PeekError> {
        if self.connection.is_none() {
            return Err(PeekError::not_connected());
        }
        let table = match table {
            Some(table) => {
                self.browser.pick_table(table)?;
                table.to_string()
            }
            None => match self.browser.selected_table() {
                Some(table) => table.to_string(),
                None => return Ok(None),
            },
        };

        tracing::debug!(table = %table, "Showing table");
        let pending = self.browser.select_table(&table);
        self.run(pending).map(Some)
    }

    /// Edit one filter slot.
    pub fn set_filter_text(&mut self, column: &str, text: &str) -> Result<(), PeekError> {
        self.browser.set_filter_text(column, text)
    }

    /// Apply the filter slots and re-run the table query.
    pub fn apply_filter(&mut self) -> Result<Option<&ResultSet>, PeekError> {
        match self.browser.apply_filter() {
            Some(pending) => self.run(pending).map(Some),
            None => Ok(None),
        }
    }

    /// Clear filters and sort, then re-run the table query.
    pub fn reset_filter(&mut self) -> Result<Option<&ResultSet>, PeekError> {
        match self.browser.reset_filter() {
            Some(pending) => self.run(pending).map(Some),
            None => Ok(None),
        }
    }

    /// Sort by one column and re-run the table query.
    pub fn sort_by_column(
        &mut self,
        column: &str,
        descending: bool,
    ) -> Result<Option<&ResultSet>, PeekError> {
        match self.browser.sort_by_column(column, descending)? {
            Some(pending) => self.run(pending).map(Some),
            None => Ok(None),
        }
    }

    fn run(&mut self, pending: PendingQuery) -> Result<&ResultSet, PeekError> {
        self.browser.begin_query();

        let outcome = match &self.connection {
            Some(pool) => self.runtime.block_on(async {
                let conn = pool.get().await?;
                QueryService::execute(&conn, &pending.query).await
            }),
            None => Err(PeekError::not_connected()),
        };

        self.browser.finish_query(pending.kind, outcome)
    }

    // ========== Export ==========

    /// Export the last result as CSV.
    pub fn export(&self, path: impl AsRef<Path>) -> Result<ExportOutcome, PeekError> {
        self.exporter.export(self.browser.last_result(), path)
    }

    // ========== Accessors ==========

    /// Check if a connection is open.
    pub fn is_connected(&self) -> bool {
        self.connection.as_ref().is_some_and(|pool| !pool.is_closed())
    }

    /// Parameters of the open connection.
    pub fn connection_params(&self) -> Option<&ConnectionParams> {
        self.connection.as_ref().map(|pool| pool.params())
    }

    /// Browsing state.
    pub fn browser(&self) -> &BrowserState {
        &self.browser
    }

    /// Lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        self.browser.phase(self.is_connected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ColumnInfo;
    use serde_json::json;
    use uuid::Uuid;

    fn medals_result(rows: usize) -> ResultSet {
        ResultSet::new(
            Uuid::new_v4(),
            vec![
                ColumnInfo::new("country", 25, "text"),
                ColumnInfo::new("year", 23, "int4"),
                ColumnInfo::new("count", 23, "int4"),
            ],
            (0..rows).map(|i| vec![json!("FRA"), json!(2021), json!(i)]).collect(),
            2,
        )
        .unwrap()
    }

    fn athletes_result() -> ResultSet {
        ResultSet::new(Uuid::new_v4(), vec![ColumnInfo::new("athlete", 25, "text")], Vec::new(), 1)
            .unwrap()
    }

    /// State with `medals` shown and its controls generated.
    fn medals_state() -> BrowserState {
        let mut state = BrowserState::new();
        state.set_tables(vec!["athletes".to_string(), "medals".to_string()]);
        let pending = state.select_table("medals");
        state.finish_query(pending.kind, Ok(medals_result(3))).unwrap();
        state
    }

    #[test]
    fn test_set_tables_preselects_first() {
        let mut state = BrowserState::new();
        state.set_tables(vec!["athletes".to_string(), "medals".to_string()]);
        assert_eq!(state.selected_table(), Some("athletes"));

        state.pick_table("medals").unwrap();
        assert_eq!(state.selected_table(), Some("medals"));

        let err = state.pick_table("nope").unwrap_err();
        assert!(matches!(err, PeekError::InvalidInput { .. }));

        state.set_tables(Vec::new());
        assert_eq!(state.selected_table(), None);
    }

    #[test]
    fn test_select_table_builds_unfiltered_query_and_regenerates_controls() {
        let mut state = BrowserState::new();
        let pending = state.select_table("medals");
        assert_eq!(pending.kind, QueryKind::TableSelected);
        assert_eq!(pending.query.sql(), "SELECT * FROM \"medals\" LIMIT 100");

        let result = state.finish_query(pending.kind, Ok(medals_result(3))).unwrap();
        assert_eq!(result.row_count(), 3);

        let columns: Vec<&str> = state.panel().controls().iter().map(|c| c.column.as_str()).collect();
        assert_eq!(columns, vec!["country", "year", "count"]);
        assert_eq!(state.filters().columns().collect::<Vec<_>>(), columns);
        assert_eq!(state.phase(true), SessionPhase::TableSelected);
    }

    #[test]
    fn test_table_switch_clears_filters_and_sort() {
        let mut state = medals_state();
        state.set_filter_text("country", "fra").unwrap();
        state.apply_filter().unwrap();
        state.sort_by_column("count", true).unwrap();
        assert_eq!(state.phase(true), SessionPhase::Filtered);

        let pending = state.select_table("athletes");
        assert!(pending.query.predicates.is_empty());
        assert!(pending.query.sort.is_none());
        assert!(state.sort().is_none());
        assert!(state.filters().is_empty());
        assert!(state.last_result().is_none());

        state.finish_query(pending.kind, Ok(athletes_result())).unwrap();
        assert_eq!(state.filters().columns().collect::<Vec<_>>(), vec!["athlete"]);
        assert!(!state.panel().has_column("country"));
    }

    #[test]
    fn test_apply_filter_reads_slots_and_keeps_sort() {
        let mut state = medals_state();
        state.sort_by_column("count", true).unwrap();
        state.set_filter_text("country", "fra").unwrap();
        state.set_filter_text("year", "2021").unwrap();

        let pending = state.apply_filter().unwrap();
        assert_eq!(pending.kind, QueryKind::Refresh);
        assert_eq!(
            pending.query.sql(),
            "SELECT * FROM \"medals\" WHERE \"country\" ILIKE $1 AND \"year\" = $2::text::numeric \
             ORDER BY \"count\" DESC LIMIT 100"
        );
        assert_eq!(pending.query.params(), vec!["%fra%".to_string(), "2021".to_string()]);
    }

    #[test]
    fn test_sort_keeps_applied_filters_only() {
        let mut state = medals_state();
        state.set_filter_text("country", "fra").unwrap();
        state.apply_filter().unwrap();
        state.set_filter_text("year", "2021").unwrap();

        let pending = state.sort_by_column("year", false).unwrap().unwrap();
        assert_eq!(pending.query.params(), vec!["%fra%".to_string()]);
        assert!(pending.query.sql().ends_with("ORDER BY \"year\" LIMIT 100"));
        assert_eq!(state.panel().control("year").unwrap().filter_text, "2021");
    }

    #[test]
    fn test_sort_by_unknown_column_is_rejected() {
        let mut state = medals_state();
        let err = state.sort_by_column("medal", true).unwrap_err();
        assert!(matches!(err, PeekError::InvalidInput { .. }));
        assert!(state.sort().is_none());
    }

    #[test]
    fn test_reset_clears_slots_filters_and_sort() {
        let mut state = medals_state();
        state.set_filter_text("country", "fra").unwrap();
        state.apply_filter().unwrap();
        state.sort_by_column("count", false).unwrap();

        let pending = state.reset_filter().unwrap();
        assert_eq!(pending.query.sql(), "SELECT * FROM \"medals\" LIMIT 100");
        assert!(state.sort().is_none());
        assert_eq!(state.filters().active().count(), 0);
        assert_eq!(state.panel().control("country").unwrap().filter_text, "");
        assert_eq!(state.panel().len(), 3);
    }

    #[test]
    fn test_actions_without_table_are_noops() {
        let mut state = BrowserState::new();
        assert!(state.apply_filter().is_none());
        assert!(state.reset_filter().is_none());
        assert!(state.sort_by_column("count", true).unwrap().is_none());
        assert_eq!(state.phase(true), SessionPhase::Connected);
        assert_eq!(state.phase(false), SessionPhase::Disconnected);
    }

    #[test]
    fn test_failed_refresh_clears_result_but_keeps_controls() {
        let mut state = medals_state();
        state.set_filter_text("year", "2021").unwrap();
        let pending = state.apply_filter().unwrap();

        state.begin_query();
        assert!(state.last_result().is_none());

        let err = state
            .finish_query(pending.kind, Err(PeekError::query_message("boom")))
            .unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert!(state.last_result().is_none());
        assert_eq!(state.panel().len(), 3);
    }

    #[test]
    fn test_failed_table_selection_leaves_no_stale_controls() {
        let mut state = medals_state();
        let pending = state.select_table("athletes");
        let _ = state.finish_query(pending.kind, Err(PeekError::query_message("permission denied")));

        assert!(state.panel().is_empty());
        assert!(state.filters().is_empty());
        assert!(state.last_result().is_none());
        assert_eq!(state.current_table(), Some("athletes"));
    }

    #[test]
    fn test_new_result_supersedes_previous() {
        let mut state = medals_state();
        let pending = state.apply_filter().unwrap();
        state.begin_query();
        state.finish_query(pending.kind, Ok(medals_result(1))).unwrap();
        assert_eq!(state.last_result().unwrap().row_count(), 1);
    }

    #[test]
    fn test_session_starts_disconnected() {
        let mut session = Session::new().unwrap();
        assert!(!session.is_connected());
        assert_eq!(session.phase(), SessionPhase::Disconnected);
        assert!(session.connection_params().is_none());

        let err = session.show_table(Some("medals")).unwrap_err();
        assert!(matches!(err, PeekError::Connection { .. }));
        assert!(session.load_tables().is_err());

        assert!(session.apply_filter().unwrap().is_none());
        assert!(session.reset_filter().unwrap().is_none());
        assert!(session.sort_by_column("count", true).unwrap().is_none());
    }

    #[test]
    fn test_session_export_without_result_is_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let session = Session::new().unwrap();
        assert_eq!(session.export(&path).unwrap(), ExportOutcome::NoData);
        assert!(!path.exists());
    }

    #[test]
    fn test_session_connect_with_bad_port_stays_disconnected() {
        let mut session = Session::new().unwrap();
        let params = ConnectionParams::new("localhost", "not-a-port", "postgres", "postgres", "");

        let err = session.connect(params).unwrap_err();
        assert!(matches!(err, PeekError::Connection { .. }));
        assert!(err.to_string().contains("Invalid port"));
        assert!(!session.is_connected());
    }
}
