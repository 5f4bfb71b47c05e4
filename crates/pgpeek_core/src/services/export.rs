//! CSV export of the current result.

use std::path::{Path, PathBuf};

use csv::WriterBuilder;

use crate::error::PeekError;
use crate::models::result::cell_to_field;
use crate::models::ResultSet;

/// What an export request did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// The file was written.
    Written {
        /// Destination file
        path: PathBuf,
        /// Number of data rows written (header excluded)
        rows: usize,
    },
    /// There was no result to export; nothing was written.
    NoData,
}

/// Writes result sets as comma-separated UTF-8 text.
#[derive(Debug, Default)]
pub struct CsvExporter;

impl CsvExporter {
    /// Create an exporter.
    pub fn new() -> Self {
        Self
    }

    /// Write the header row followed by every data row to `path`.
    ///
    /// Returns [`ExportOutcome::NoData`] without touching the filesystem when there is no
    /// result or the result has no rows.
    pub fn export(
        &self,
        result: Option<&ResultSet>,
        path: impl AsRef<Path>,
    ) -> Result<ExportOutcome, PeekError> {
        let path = path.as_ref();
        let result = match result {
            Some(result) if !result.is_empty() => result,
            _ => {
                tracing::debug!(path = %path.display(), "Nothing to export");
                return Ok(ExportOutcome::NoData);
            }
        };

        tracing::debug!(
            path = %path.display(),
            rows = result.row_count(),
            columns = result.columns().len(),
            "Exporting result"
        );

        let mut writer = WriterBuilder::new()
            .from_path(path)
            .map_err(|e| {
                tracing::warn!(path = %path.display(), error = %e, "Failed to open export file");
                PeekError::from(e)
            })?;

        writer.write_record(result.column_names())?;
        for row in result.rows() {
            writer.write_record(row.iter().map(cell_to_field))?;
        }
        writer.flush()?;

        tracing::info!(path = %path.display(), rows = result.row_count(), "Export completed");

        Ok(ExportOutcome::Written { path: path.to_path_buf(), rows: result.row_count() })
    }
}

/// Append `.csv` when the chosen file name has no extension.
pub fn with_default_extension(path: impl Into<PathBuf>) -> PathBuf {
    let mut path = path.into();
    if path.extension().is_none() {
        path.set_extension("csv");
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ColumnInfo;
    use serde_json::json;
    use uuid::Uuid;

    fn sample_result() -> ResultSet {
        ResultSet::new(
            Uuid::new_v4(),
            vec![ColumnInfo::new("c1", 23, "int4"), ColumnInfo::new("c2", 25, "text")],
            vec![vec![json!(1), json!("a")], vec![json!(2), json!("b")]],
            1,
        )
        .unwrap()
    }

    #[test]
    fn test_export_writes_header_then_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let outcome = CsvExporter::new().export(Some(&sample_result()), &path).unwrap();
        assert_eq!(outcome, ExportOutcome::Written { path: path.clone(), rows: 2 });

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec!["c1,c2", "1,a", "2,b"]);
    }

    #[test]
    fn test_export_quotes_and_nulls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quoted.csv");
        let result = ResultSet::new(
            Uuid::new_v4(),
            vec![ColumnInfo::new("name", 25, "text"), ColumnInfo::new("note", 25, "text")],
            vec![vec![json!("Côte d'Ivoire, CIV"), serde_json::Value::Null]],
            0,
        )
        .unwrap();

        CsvExporter::new().export(Some(&result), &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "name,note\n\"Côte d'Ivoire, CIV\",\n");
    }

    #[test]
    fn test_export_without_result_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("none.csv");

        let outcome = CsvExporter::new().export(None, &path).unwrap();
        assert_eq!(outcome, ExportOutcome::NoData);
        assert!(!path.exists());
    }

    #[test]
    fn test_export_of_empty_result_is_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        let result = ResultSet::new(
            Uuid::new_v4(),
            vec![ColumnInfo::new("c1", 23, "int4")],
            Vec::new(),
            0,
        )
        .unwrap();

        let outcome = CsvExporter::new().export(Some(&result), &path).unwrap();
        assert_eq!(outcome, ExportOutcome::NoData);
        assert!(!path.exists());
    }

    #[test]
    fn test_export_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.csv");

        let err = CsvExporter::new().export(Some(&sample_result()), &path).unwrap_err();
        assert_eq!(err.category(), "Export");
    }

    #[test]
    fn test_default_extension() {
        assert_eq!(with_default_extension("medals"), PathBuf::from("medals.csv"));
        assert_eq!(with_default_extension("medals.txt"), PathBuf::from("medals.txt"));
        assert_eq!(with_default_extension("dir/medals"), PathBuf::from("dir/medals.csv"));
    }
}
