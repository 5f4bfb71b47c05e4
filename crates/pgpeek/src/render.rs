//! Text rendering for results, controls and notifications.

use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};

use pgpeek_core::models::result::cell_to_display;
use pgpeek_core::{ErrorInfo, FilterPanel, ResultSet, SortSpec, ROW_LIMIT};

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Result grid: one header row of column names, then the data rows.
pub fn result_grid(result: &ResultSet) -> Table {
    let mut table = new_table();
    table.set_header(result.column_names());
    for row in result.rows() {
        table.add_row(row.iter().map(cell_to_display));
    }
    table
}

/// One-line summary printed under the grid.
pub fn result_summary(result: &ResultSet) -> String {
    let rows = match result.row_count() {
        1 => "1 row".to_string(),
        n => format!("{n} rows"),
    };
    let capped = if result.row_count() >= ROW_LIMIT {
        format!(" (first {ROW_LIMIT} only)")
    } else {
        String::new()
    };
    format!("{rows}{capped} in {} ms", result.execution_time_ms())
}

/// Numbered table listing with the picker selection marked.
pub fn table_list(tables: &[String], selected: Option<&str>) -> String {
    if tables.is_empty() {
        return "No tables in the public schema.".to_string();
    }
    tables
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let marker = if Some(name.as_str()) == selected { '*' } else { ' ' };
            format!("{marker} {:>3}  {name}", i + 1)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Filter slots and sort triggers, one line per column. The active trigger is bracketed.
pub fn filter_panel(panel: &FilterPanel, sort: Option<&SortSpec>) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Column", "Filter", "Sort"]);
    for control in panel.controls() {
        let triggers = [&control.sort_ascending, &control.sort_descending]
            .into_iter()
            .map(|trigger| {
                if sort == Some(&trigger.sort_spec()) {
                    format!("[{}]", trigger.label())
                } else {
                    format!(" {} ", trigger.label())
                }
            })
            .collect::<String>();
        table.add_row(vec![control.column.clone(), control.filter_text.clone(), triggers]);
    }
    table
}

/// Error notification.
pub fn error_notice(info: &ErrorInfo) -> String {
    let mut lines = vec![format!("[{}] {}", info.error_type, info.message)];
    if let Some(detail) = &info.technical_detail {
        lines.extend(detail.lines().map(|line| format!("  {line}")));
    }
    if let Some(hint) = &info.hint {
        lines.push(format!("  Hint: {hint}"));
    }
    lines.join("\n")
}

/// Informational notification.
pub fn info_notice(title: &str, message: &str) -> String {
    format!("[{title}] {message}")
}
