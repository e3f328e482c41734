//! The full load-merge-diff-export pipeline
//!
//! One user invocation drives one synchronous cycle: register both source
//! tables, validate their columns, build the backfill and diff views, and
//! export the requested output files. Any error halts the run.

use crate::config::Config;
use crate::data::{DataInfo, DataProcessor};
use crate::diff::{self, DiffSummary};
use crate::error::Result;
use crate::export::{self, ExportOptions};
use crate::merge::{self, BackfillSummary};
use crate::sheet;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// View name the old table is registered under
pub const OLD_VIEW: &str = "old_data";
/// View name the new table is registered under
pub const NEW_VIEW: &str = "new_data";

/// Inputs and outputs of one update run
#[derive(Debug, Clone)]
pub struct UpdateOptions {
    /// Old export, carrying the manually curated category column
    pub old_file: PathBuf,
    /// New export the category is merged into
    pub new_file: PathBuf,
    /// Explicit worksheet of the old file (resolved by prefix otherwise)
    pub old_sheet: Option<String>,
    /// Explicit worksheet of the new file (first sheet otherwise)
    pub new_sheet: Option<String>,
    /// Override for the configured number of skipped preamble rows
    pub skip_rows: Option<u32>,
    /// Where to write the full backfilled table (skipped when None)
    pub full_output: Option<PathBuf>,
    /// Where to write the changes table (skipped when None)
    pub diff_output: Option<PathBuf>,
    /// Overwrite existing output files
    pub force: bool,
}

impl UpdateOptions {
    pub fn new(old_file: impl Into<PathBuf>, new_file: impl Into<PathBuf>) -> Self {
        Self {
            old_file: old_file.into(),
            new_file: new_file.into(),
            old_sheet: None,
            new_sheet: None,
            skip_rows: None,
            full_output: None,
            diff_output: None,
            force: false,
        }
    }
}

/// Everything a caller needs to render the outcome of a run
#[derive(Debug, Clone, Serialize)]
pub struct UpdateReport {
    pub old: DataInfo,
    pub new: DataInfo,
    pub backfill: Option<BackfillSummary>,
    pub diff: Option<DiffSummary>,
    pub full_output: Option<PathBuf>,
    pub diff_output: Option<PathBuf>,
}

/// One load-merge-diff-export cycle over a single DuckDB connection
pub struct UpdateSession {
    processor: DataProcessor,
    config: Config,
}

impl UpdateSession {
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self {
            processor: DataProcessor::new()?,
            config,
        })
    }

    pub fn processor(&self) -> &DataProcessor {
        &self.processor
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the full pipeline: backfill, diff, and both exports
    pub fn run_update(&mut self, options: &UpdateOptions) -> Result<UpdateReport> {
        Self::validate_outputs(options)?;
        let (old_info, new_info) = self.load_tables(options)?;
        self.validate_for_backfill()?;

        let backfill = merge::backfill_view(
            &mut self.processor,
            OLD_VIEW,
            NEW_VIEW,
            &self.config.columns,
        )?;
        let diff = diff::diff_views(
            &mut self.processor,
            OLD_VIEW,
            NEW_VIEW,
            &self.config.columns,
        )?;

        if let Some(path) = &options.full_output {
            self.export(merge::BACKFILLED_VIEW, path, options.force)?;
        }
        if let Some(path) = &options.diff_output {
            self.export(diff::CHANGES_VIEW, path, options.force)?;
        }

        Ok(UpdateReport {
            old: old_info,
            new: new_info,
            backfill: Some(backfill),
            diff: Some(diff),
            full_output: options.full_output.clone(),
            diff_output: options.diff_output.clone(),
        })
    }

    /// Run the backfill stage only
    pub fn run_backfill(&mut self, options: &UpdateOptions) -> Result<UpdateReport> {
        Self::validate_outputs(options)?;
        let (old_info, new_info) = self.load_tables(options)?;
        self.validate_for_backfill()?;

        let backfill = merge::backfill_view(
            &mut self.processor,
            OLD_VIEW,
            NEW_VIEW,
            &self.config.columns,
        )?;

        if let Some(path) = &options.full_output {
            self.export(merge::BACKFILLED_VIEW, path, options.force)?;
        }

        Ok(UpdateReport {
            old: old_info,
            new: new_info,
            backfill: Some(backfill),
            diff: None,
            full_output: options.full_output.clone(),
            diff_output: None,
        })
    }

    /// Run the change classification stage only
    pub fn run_diff(&mut self, options: &UpdateOptions) -> Result<UpdateReport> {
        Self::validate_outputs(options)?;
        let (old_info, new_info) = self.load_tables(options)?;
        self.validate_for_diff()?;

        let diff = diff::diff_views(
            &mut self.processor,
            OLD_VIEW,
            NEW_VIEW,
            &self.config.columns,
        )?;

        if let Some(path) = &options.diff_output {
            self.export(diff::CHANGES_VIEW, path, options.force)?;
        }

        Ok(UpdateReport {
            old: old_info,
            new: new_info,
            backfill: None,
            diff: Some(diff),
            full_output: None,
            diff_output: options.diff_output.clone(),
        })
    }

    /// Check every requested output path up front so a bad extension or an
    /// unforced overwrite fails before any file is written. A run writing
    /// two outputs must never leave only the first one behind.
    fn validate_outputs(options: &UpdateOptions) -> Result<()> {
        for path in [&options.full_output, &options.diff_output]
            .into_iter()
            .flatten()
        {
            export::validate_output(path, options.force)?;
        }
        Ok(())
    }

    /// Register both source tables, resolving the old file's worksheet by
    /// the configured prefix when it is an xlsx file
    fn load_tables(&mut self, options: &UpdateOptions) -> Result<(DataInfo, DataInfo)> {
        let skip_rows = options.skip_rows.unwrap_or(self.config.sheet.skip_rows);

        let old_sheet = if is_xlsx(&options.old_file) {
            Some(sheet::resolve_sheet(
                &options.old_file,
                &self.config.sheet.name_prefix,
                options.old_sheet.as_deref(),
            )?)
        } else {
            None
        };

        let old_info = self.processor.register_table(
            OLD_VIEW,
            &options.old_file,
            old_sheet.as_deref(),
            skip_rows,
        )?;
        log::info!(
            "Loaded old table: {} rows, {} columns",
            old_info.row_count,
            old_info.column_count()
        );

        let new_info = self.processor.register_table(
            NEW_VIEW,
            &options.new_file,
            options.new_sheet.as_deref(),
            skip_rows,
        )?;
        log::info!(
            "Loaded new table: {} rows, {} columns",
            new_info.row_count,
            new_info.column_count()
        );

        Ok((old_info, new_info))
    }

    fn validate_for_backfill(&self) -> Result<()> {
        let columns = &self.config.columns;
        self.processor
            .require_columns(OLD_VIEW, "old", &columns.required_old())?;
        self.processor
            .require_columns(NEW_VIEW, "new", &columns.required())?;
        Ok(())
    }

    fn validate_for_diff(&self) -> Result<()> {
        let columns = &self.config.columns;
        self.processor
            .require_columns(OLD_VIEW, "old", &columns.required())?;
        self.processor
            .require_columns(NEW_VIEW, "new", &columns.required())?;
        Ok(())
    }

    fn export(&mut self, view: &str, path: &Path, force: bool) -> Result<()> {
        let options = ExportOptions {
            force,
            ..ExportOptions::default()
        };
        export::export_view(&mut self.processor, view, path, &options)
    }
}

fn is_xlsx(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("xlsx"))
        .unwrap_or(false)
}
