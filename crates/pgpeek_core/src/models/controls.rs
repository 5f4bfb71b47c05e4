//! Per-column filter and sort controls.
//!
//! The browser shows one filter slot and a pair of sort triggers for every column of the
//! current table. This module describes those controls as plain data so any front end can
//! render them.

use serde::Serialize;

use crate::error::PeekError;
use crate::models::query::{FilterMap, SortSpec};

/// A button that orders the table by one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortTrigger {
    /// Column to order by
    pub column: String,
    /// Descending when true
    pub descending: bool,
}

impl SortTrigger {
    /// Short label for the trigger.
    pub fn label(&self) -> &'static str {
        if self.descending {
            "↓"
        } else {
            "↑"
        }
    }

    /// The sort key this trigger applies.
    pub fn sort_spec(&self) -> SortSpec {
        SortSpec::new(self.column.clone(), self.descending)
    }
}

/// Filter slot and sort triggers for one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnControl {
    /// Column the controls are bound to
    pub column: String,
    /// Current text of the filter slot
    pub filter_text: String,
    /// Ascending sort trigger
    pub sort_ascending: SortTrigger,
    /// Descending sort trigger
    pub sort_descending: SortTrigger,
}

impl ColumnControl {
    fn new(column: &str) -> Self {
        Self {
            column: column.to_string(),
            filter_text: String::new(),
            sort_ascending: SortTrigger { column: column.to_string(), descending: false },
            sort_descending: SortTrigger { column: column.to_string(), descending: true },
        }
    }
}

/// The row of controls shown above the result grid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterPanel {
    controls: Vec<ColumnControl>,
}

impl FilterPanel {
    /// Create an empty panel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every control with fresh ones for `columns`, left to right.
    pub fn regenerate<S: AsRef<str>>(&mut self, columns: &[S]) {
        self.controls = columns.iter().map(|c| ColumnControl::new(c.as_ref())).collect();
    }

    /// Drop every control.
    pub fn clear(&mut self) {
        self.controls.clear();
    }

    /// Controls in column order.
    pub fn controls(&self) -> &[ColumnControl] {
        &self.controls
    }

    /// Controls for one column.
    pub fn control(&self, column: &str) -> Option<&ColumnControl> {
        self.controls.iter().find(|c| c.column == column)
    }

    /// Edit the text of a column's filter slot.
    pub fn set_filter_text(
        &mut self,
        column: &str,
        text: impl Into<String>,
    ) -> Result<(), PeekError> {
        let control = self
            .controls
            .iter_mut()
            .find(|c| c.column == column)
            .ok_or_else(|| PeekError::invalid_input(format!("Unknown column: {column}")))?;
        control.filter_text = text.into();
        Ok(())
    }

    /// Blank every filter slot.
    pub fn clear_filter_texts(&mut self) {
        for control in &mut self.controls {
            control.filter_text.clear();
        }
    }

    /// Snapshot of every slot's current text.
    pub fn filter_map(&self) -> FilterMap {
        let mut map = FilterMap::new();
        for control in &self.controls {
            map.set(control.column.clone(), control.filter_text.clone());
        }
        map
    }

    /// Check whether the panel has a control for `column`.
    pub fn has_column(&self, column: &str) -> bool {
        self.control(column).is_some()
    }

    /// Number of columns with controls.
    pub fn len(&self) -> usize {
        self.controls.len()
    }

    /// Check if the panel has no controls.
    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }
}
