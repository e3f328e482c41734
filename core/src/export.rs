//! Data export using the DuckDB COPY command
//!
//! Both result tables (the backfilled table and the changes table) are views
//! on the processor's connection; exporting is a single COPY to the output
//! path, with the format picked from the file extension.

use crate::data::{escape_literal, quote_ident, DataProcessor};
use crate::error::{AddrdiffError, Result};
use std::path::Path;

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values format
    Csv,
    /// JSON format
    Json,
    /// Microsoft Excel format (XLSX)
    Excel,
}

impl ExportFormat {
    /// Get the DuckDB format string for COPY command
    pub fn duckdb_format(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "CSV",
            ExportFormat::Json => "JSON",
            ExportFormat::Excel => "XLSX",
        }
    }

    /// Determine format from file extension
    pub fn from_extension(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase());

        match extension.as_deref() {
            Some("csv") => Ok(ExportFormat::Csv),
            Some("json") => Ok(ExportFormat::Json),
            Some("xlsx") => Ok(ExportFormat::Excel),
            Some(ext) => Err(AddrdiffError::invalid_input(format!(
                "Unsupported file extension: {ext}"
            ))),
            None => Err(AddrdiffError::invalid_input("No file extension provided")),
        }
    }
}

/// Export options for customizing output
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Whether to include a header row (CSV and Excel)
    pub include_header: bool,
    /// CSV delimiter character (only applies to CSV format)
    pub delimiter: char,
    /// Whether to force overwrite existing files
    pub force: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            include_header: true,
            delimiter: ',',
            force: false,
        }
    }
}

/// Validate an output path before anything is written: the extension must
/// map to a supported format, and an existing file needs the force option.
pub fn validate_output(output_path: &Path, force: bool) -> Result<ExportFormat> {
    let format = ExportFormat::from_extension(output_path)?;

    if output_path.exists() && !force {
        return Err(AddrdiffError::invalid_input(format!(
            "Output file already exists: {}. Use force option to overwrite.",
            output_path.display()
        )));
    }

    Ok(format)
}

/// Export a registered view to a file using DuckDB COPY
pub fn export_view(
    processor: &mut DataProcessor,
    view: &str,
    output_path: &Path,
    options: &ExportOptions,
) -> Result<()> {
    let format = validate_output(output_path, options.force)?;

    if format == ExportFormat::Excel {
        processor.ensure_excel_extension()?;
    }

    let copy_command = build_copy_command(view, output_path, format, options);
    processor
        .connection
        .execute(&copy_command, [])
        .map_err(|e| AddrdiffError::data_processing(format!("Export failed: {e}")))?;

    log::info!(
        "Exported view '{view}' to {} ({})",
        output_path.display(),
        format.duckdb_format()
    );
    Ok(())
}

/// Build the DuckDB COPY command for the specified format and options
fn build_copy_command(
    view: &str,
    output_path: &Path,
    format: ExportFormat,
    options: &ExportOptions,
) -> String {
    let path_str = escape_literal(&output_path.to_string_lossy());
    let view = quote_ident(view);

    match format {
        ExportFormat::Csv => {
            let header = if options.include_header { "true" } else { "false" };
            let delimiter = escape_literal(&options.delimiter.to_string());
            format!(
                "COPY (SELECT * FROM {view}) TO '{path_str}' (FORMAT CSV, HEADER {header}, DELIMITER '{delimiter}')"
            )
        }
        ExportFormat::Json => {
            format!("COPY (SELECT * FROM {view}) TO '{path_str}' (FORMAT JSON)")
        }
        ExportFormat::Excel => {
            let header = if options.include_header { "true" } else { "false" };
            format!("COPY (SELECT * FROM {view}) TO '{path_str}' (FORMAT xlsx, HEADER {header})")
        }
    }
}
