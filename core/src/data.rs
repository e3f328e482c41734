//! Data loading utilities using DuckDB
//!
//! Every source table is registered as a DuckDB view; the backfill, diff and
//! export stages all run as SQL over those views.

use crate::error::{AddrdiffError, Result};
use duckdb::Connection;
use indexmap::IndexMap;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One row rendered as column name -> string value, in column order
pub type Record = IndexMap<String, String>;

/// Column name and DuckDB type of a registered table
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
}

/// Basic information about a registered table
#[derive(Debug, Clone, Serialize)]
pub struct DataInfo {
    pub source: PathBuf,
    pub sheet: Option<String>,
    pub row_count: u64,
    pub columns: Vec<ColumnInfo>,
}

impl DataInfo {
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Data processor holding the in-memory DuckDB connection shared by one run
pub struct DataProcessor {
    pub connection: Connection,
    excel_loaded: bool,
}

impl DataProcessor {
    /// Create a new data processor with an in-memory database
    pub fn new() -> Result<Self> {
        let connection = Connection::open_in_memory()?;

        // Keep rows in file order; the exported tables should read like the
        // originals
        connection.execute("SET preserve_insertion_order=true", [])?;
        connection.execute("SET enable_progress_bar=false", [])?;

        Ok(Self {
            connection,
            excel_loaded: false,
        })
    }

    /// Register a source file as a named view and return its basic info
    pub fn register_table(
        &mut self,
        view: &str,
        file_path: &Path,
        sheet: Option<&str>,
        skip_rows: u32,
    ) -> Result<DataInfo> {
        if !file_path.exists() {
            return Err(AddrdiffError::invalid_input(format!(
                "File not found: {}",
                file_path.display()
            )));
        }
        if !file_path.is_file() {
            return Err(AddrdiffError::invalid_input(format!(
                "Path is not a file: {}",
                file_path.display()
            )));
        }

        let read_expr = self.build_read_expression(file_path, sheet, skip_rows)?;
        let create_view_sql = format!(
            "CREATE OR REPLACE VIEW {} AS SELECT * FROM {read_expr}",
            quote_ident(view)
        );

        self.connection
            .execute(&create_view_sql, [])
            .map_err(|e| self.convert_duckdb_error(e, file_path))?;

        Ok(DataInfo {
            source: file_path.to_path_buf(),
            sheet: sheet.map(|s| s.to_string()),
            row_count: self.row_count(view)?,
            columns: self.column_info(view)?,
        })
    }

    /// Build the table function call that reads the file
    fn build_read_expression(
        &mut self,
        file_path: &Path,
        sheet: Option<&str>,
        skip_rows: u32,
    ) -> Result<String> {
        let path_str = escape_literal(&file_path.to_string_lossy());
        let extension = file_path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase());

        match extension.as_deref() {
            Some("csv") | Some("tsv") => Ok(format!(
                "read_csv('{path_str}', header = true, skip = {skip_rows})"
            )),
            Some("xlsx") => {
                self.ensure_excel_extension()?;
                // The excel reader has no skip option; start the range at the
                // header row instead (XFD/1048576 are the sheet bounds)
                let header_row = skip_rows as u64 + 1;
                let mut args = format!(
                    "'{path_str}', header = true, range = 'A{header_row}:XFD1048576', stop_at_empty = false"
                );
                if let Some(sheet_name) = sheet {
                    args.push_str(&format!(", sheet = '{}'", escape_literal(sheet_name)));
                }
                Ok(format!("read_xlsx({args})"))
            }
            Some(ext) => Err(AddrdiffError::invalid_input(format!(
                "Unsupported file format '.{ext}': {}",
                file_path.display()
            ))),
            None => Err(AddrdiffError::invalid_input(format!(
                "File has no extension: {}",
                file_path.display()
            ))),
        }
    }

    /// Load the DuckDB excel extension, installing it on first use
    pub fn ensure_excel_extension(&mut self) -> Result<()> {
        if self.excel_loaded {
            return Ok(());
        }
        if self.connection.execute("LOAD excel", []).is_err() {
            self.connection.execute("INSTALL excel", []).map_err(|e| {
                AddrdiffError::data_processing(format!(
                    "Failed to install DuckDB excel extension: {e}"
                ))
            })?;
            self.connection.execute("LOAD excel", []).map_err(|e| {
                AddrdiffError::data_processing(format!(
                    "Failed to load DuckDB excel extension: {e}"
                ))
            })?;
        }
        self.excel_loaded = true;
        Ok(())
    }

    /// Get column names and types of a registered view
    pub fn column_info(&self, view: &str) -> Result<Vec<ColumnInfo>> {
        let mut stmt = self
            .connection
            .prepare(&format!("DESCRIBE {}", quote_ident(view)))?;
        let columns = stmt
            .query_map([], |row| {
                Ok(ColumnInfo {
                    name: row.get(0)?,
                    data_type: row.get(1)?,
                })
            })?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(columns)
    }

    /// Get the row count of a registered view
    pub fn row_count(&self, view: &str) -> Result<u64> {
        let count: u64 = self
            .connection
            .prepare(&format!("SELECT COUNT(*) FROM {}", quote_ident(view)))?
            .query_row([], |row| row.get(0))
            .map_err(|e| {
                AddrdiffError::data_processing(format!("Failed to get row count: {e}"))
            })?;
        Ok(count)
    }

    /// Verify that a view carries all required columns; missing ones halt
    /// processing with an error naming the table and the columns
    pub fn require_columns(&self, view: &str, table_label: &str, required: &[&str]) -> Result<()> {
        let present = self.column_info(view)?;
        let missing: Vec<String> = required
            .iter()
            .filter(|name| !present.iter().any(|c| c.name == **name))
            .map(|name| name.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AddrdiffError::missing_columns(table_label, missing))
        }
    }

    /// Extract up to `limit` rows of a view, with every value rendered as a
    /// string (NULLs become empty strings)
    pub fn preview_rows(&self, view: &str, limit: usize) -> Result<Vec<Vec<String>>> {
        let columns = self.column_info(view)?;
        let select_list = columns
            .iter()
            .map(|c| format!("COALESCE(CAST({} AS VARCHAR), '')", quote_ident(&c.name)))
            .collect::<Vec<_>>()
            .join(", ");

        let mut stmt = self.connection.prepare(&format!(
            "SELECT {select_list} FROM {} LIMIT {limit}",
            quote_ident(view)
        ))?;
        let rows = stmt
            .query_map([], |row| {
                let mut values = Vec::with_capacity(columns.len());
                for i in 0..columns.len() {
                    values.push(row.get::<_, String>(i)?);
                }
                Ok(values)
            })?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Extract up to `limit` rows of a view as ordered name -> value records
    /// (keeps column order stable through JSON serialization)
    pub fn preview_records(&self, view: &str, limit: usize) -> Result<Vec<Record>> {
        let columns = self.column_info(view)?;
        let rows = self.preview_rows(view, limit)?;
        Ok(rows
            .into_iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|c| c.name.clone())
                    .zip(row)
                    .collect::<Record>()
            })
            .collect())
    }

    /// Check if a file format is supported
    pub fn is_supported_format(file_path: &Path) -> bool {
        file_path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                matches!(ext.to_lowercase().as_str(), "csv" | "tsv" | "xlsx")
            })
            .unwrap_or(false)
    }

    fn convert_duckdb_error(&self, error: duckdb::Error, file_path: &Path) -> AddrdiffError {
        let error_msg = error.to_string();
        if error_msg.contains("CSV Error") || error_msg.contains("Invalid CSV") {
            AddrdiffError::data_processing(format!(
                "Malformed CSV file '{}': {error_msg}",
                file_path.display()
            ))
        } else if error_msg.contains("sheet") || error_msg.contains("Sheet") {
            AddrdiffError::invalid_input(format!(
                "Failed to read worksheet from '{}': {error_msg}",
                file_path.display()
            ))
        } else {
            AddrdiffError::data_processing(format!(
                "Failed to read '{}': {error_msg}",
                file_path.display()
            ))
        }
    }
}

/// Quote an identifier for use in SQL
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Escape a string literal for use in SQL
pub fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_data_processor_creation() {
        let processor = DataProcessor::new();
        assert!(processor.is_ok());
    }

    #[test]
    fn test_supported_formats() {
        assert!(DataProcessor::is_supported_format(Path::new("test.csv")));
        assert!(DataProcessor::is_supported_format(Path::new("test.tsv")));
        assert!(DataProcessor::is_supported_format(Path::new("test.xlsx")));
        assert!(!DataProcessor::is_supported_format(Path::new("test.txt")));
        assert!(!DataProcessor::is_supported_format(Path::new("test")));
    }

    #[test]
    fn test_csv_loading() {
        let temp_dir = TempDir::new().unwrap();
        let csv_path = temp_dir.path().join("test.csv");
        let csv_content = "GID,Адрес,Округ\n101,Main St 1,North\n102,Main St 2,South\n";
        fs::write(&csv_path, csv_content).unwrap();

        let mut processor = DataProcessor::new().unwrap();
        let info = processor.register_table("old_data", &csv_path, None, 0).unwrap();
        assert_eq!(info.row_count, 2);
        assert_eq!(info.column_count(), 3);
        assert_eq!(info.column_names(), vec!["GID", "Адрес", "Округ"]);
    }

    #[test]
    fn test_csv_loading_with_skip_rows() {
        let temp_dir = TempDir::new().unwrap();
        let csv_path = temp_dir.path().join("test.csv");
        let csv_content = "junk line one\njunk line two\nGID,Адрес\n101,Main St 1\n";
        fs::write(&csv_path, csv_content).unwrap();

        let mut processor = DataProcessor::new().unwrap();
        let info = processor.register_table("data", &csv_path, None, 2).unwrap();
        assert_eq!(info.row_count, 1);
        assert_eq!(info.column_names(), vec!["GID", "Адрес"]);
    }

    #[test]
    fn test_require_columns_reports_missing() {
        let temp_dir = TempDir::new().unwrap();
        let csv_path = temp_dir.path().join("test.csv");
        fs::write(&csv_path, "GID,Адрес\n101,Main St 1\n").unwrap();

        let mut processor = DataProcessor::new().unwrap();
        processor.register_table("data", &csv_path, None, 0).unwrap();

        assert!(processor
            .require_columns("data", "new", &["GID", "Адрес"])
            .is_ok());

        let err = processor
            .require_columns("data", "new", &["GID", "Адрес", "Средняя проходимость месяц"])
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("new"));
        assert!(message.contains("Средняя проходимость месяц"));
        assert!(!message.contains("GID,"));
    }

    #[test]
    fn test_preview_rows_stringifies_nulls() {
        let temp_dir = TempDir::new().unwrap();
        let csv_path = temp_dir.path().join("test.csv");
        fs::write(&csv_path, "GID,Округ\n101,North\n102,\n").unwrap();

        let mut processor = DataProcessor::new().unwrap();
        processor.register_table("data", &csv_path, None, 0).unwrap();

        let rows = processor.preview_rows("data", 10).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["101", "North"]);
        assert_eq!(rows[1], vec!["102", ""]);
    }

    #[test]
    fn test_preview_records_keep_column_order() {
        let temp_dir = TempDir::new().unwrap();
        let csv_path = temp_dir.path().join("test.csv");
        fs::write(&csv_path, "GID,Адрес,Округ\n101,Main St 1,North\n").unwrap();

        let mut processor = DataProcessor::new().unwrap();
        processor.register_table("data", &csv_path, None, 0).unwrap();

        let records = processor.preview_records("data", 10).unwrap();
        assert_eq!(records.len(), 1);
        let keys: Vec<&String> = records[0].keys().collect();
        assert_eq!(keys, vec!["GID", "Адрес", "Округ"]);
        assert_eq!(records[0]["Округ"], "North");

        // Column order survives JSON serialization
        let json = serde_json::to_string(&records[0]).unwrap();
        assert!(json.find("GID").unwrap() < json.find("Округ").unwrap());
    }

    #[test]
    fn test_unsupported_format_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.txt");
        fs::write(&path, "not a table").unwrap();

        let mut processor = DataProcessor::new().unwrap();
        let err = processor.register_table("data", &path, None, 0).unwrap_err();
        assert!(err.to_string().contains("Unsupported file format"));
    }

    #[test]
    fn test_missing_file_rejected() {
        let mut processor = DataProcessor::new().unwrap();
        let err = processor
            .register_table("data", Path::new("does_not_exist.csv"), None, 0)
            .unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("GID"), "\"GID\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }
}
