//! Command implementations for addrdiff CLI

use crate::cli::{Commands, TableArgs};
use crate::output::{JsonFormatter, PrettyPrinter};
use crate::progress::ProgressReporter;
use addrdiff_core::config::{self, Config};
use addrdiff_core::diff::CHANGES_VIEW;
use addrdiff_core::error::Result;
use addrdiff_core::pipeline::{UpdateOptions, UpdateSession};
use addrdiff_core::sheet;
use std::path::{Path, PathBuf};

/// Execute a command
pub fn execute_command(command: Commands) -> Result<()> {
    match command {
        Commands::Update {
            old,
            new,
            full_output,
            diff_output,
            table,
            force,
            json,
        } => update_command(&old, &new, full_output, diff_output, &table, force, json),
        Commands::Backfill {
            old,
            new,
            output,
            table,
            force,
            json,
        } => backfill_command(&old, &new, output, &table, force, json),
        Commands::Diff {
            old,
            new,
            output,
            limit,
            table,
            force,
            json,
        } => diff_command(&old, &new, output, limit, &table, force, json),
        Commands::Sheets {
            file,
            all,
            sheet_prefix,
            json,
        } => sheets_command(&file, all, sheet_prefix.as_deref(), json),
    }
}

/// Run the full pipeline and write both output files
fn update_command(
    old: &Path,
    new: &Path,
    full_output: PathBuf,
    diff_output: PathBuf,
    table: &TableArgs,
    force: bool,
    json: bool,
) -> Result<()> {
    let config = load_config(table)?;
    let mut options = build_options(old, new, table, force);
    options.full_output = Some(full_output);
    options.diff_output = Some(diff_output);

    let mut session = UpdateSession::new(config)?;
    let report = run_with_progress(json, "Merging and comparing tables...", || {
        session.run_update(&options)
    })?;

    if json {
        println!("{}", JsonFormatter::format_report(&report)?);
    } else {
        PrettyPrinter::print_update_report(&report);
    }
    Ok(())
}

/// Run the backfill stage only
fn backfill_command(
    old: &Path,
    new: &Path,
    output: PathBuf,
    table: &TableArgs,
    force: bool,
    json: bool,
) -> Result<()> {
    let config = load_config(table)?;
    let mut options = build_options(old, new, table, force);
    options.full_output = Some(output);

    let mut session = UpdateSession::new(config)?;
    let report = run_with_progress(json, "Backfilling categories...", || {
        session.run_backfill(&options)
    })?;

    if json {
        println!("{}", JsonFormatter::format_report(&report)?);
    } else {
        PrettyPrinter::print_update_report(&report);
    }
    Ok(())
}

/// Run the change classification stage only
fn diff_command(
    old: &Path,
    new: &Path,
    output: Option<PathBuf>,
    limit: usize,
    table: &TableArgs,
    force: bool,
    json: bool,
) -> Result<()> {
    let config = load_config(table)?;
    let mut options = build_options(old, new, table, force);
    options.diff_output = output;

    let mut session = UpdateSession::new(config)?;
    let report = run_with_progress(json, "Comparing tables...", || {
        session.run_diff(&options)
    })?;

    let summary = report.diff.clone().unwrap_or_default();
    let columns = session.processor().column_info(CHANGES_VIEW)?;
    let rows = session.processor().preview_rows(CHANGES_VIEW, limit)?;

    if json {
        let records = session.processor().preview_records(CHANGES_VIEW, limit)?;
        println!("{}", JsonFormatter::format_diff(&summary, &records)?);
    } else {
        PrettyPrinter::print_diff_summary(&summary);
        PrettyPrinter::print_diff_rows(&columns, &rows, summary.total_changes());
        if let Some(path) = &report.diff_output {
            println!();
            println!("📥 Changes written to {}", path.display());
        }
    }
    Ok(())
}

/// List the worksheets of an xlsx file
fn sheets_command(file: &Path, all: bool, sheet_prefix: Option<&str>, json: bool) -> Result<()> {
    let config = config::get_config()?;
    let names = sheet::list_sheets(file)?;
    let prefix = sheet_prefix.unwrap_or(&config.sheet.name_prefix);

    let listed = if all {
        names
    } else {
        sheet::matching_sheets(&names, prefix)
    };

    if json {
        println!("{}", JsonFormatter::format_sheets(&listed)?);
    } else {
        PrettyPrinter::print_sheet_list(&listed);
    }
    Ok(())
}

/// Resolve the config file and apply command-line overrides
fn load_config(table: &TableArgs) -> Result<Config> {
    let mut config = config::get_config()?;

    if let Some(prefix) = &table.sheet_prefix {
        config.sheet.name_prefix = prefix.clone();
    }
    if let Some(skip_rows) = table.skip_rows {
        config.sheet.skip_rows = skip_rows;
    }
    if let Some(key) = &table.key_column {
        config.columns.key = key.clone();
    }
    if let Some(address) = &table.address_column {
        config.columns.address = address.clone();
    }
    if let Some(metric) = &table.metric_column {
        config.columns.metric = metric.clone();
    }
    if let Some(category) = &table.category_column {
        config.columns.category = category.clone();
    }

    Ok(config)
}

fn build_options(old: &Path, new: &Path, table: &TableArgs, force: bool) -> UpdateOptions {
    let mut options = UpdateOptions::new(old, new);
    options.old_sheet = table.sheet.clone();
    options.new_sheet = table.new_sheet.clone();
    options.skip_rows = table.skip_rows;
    options.force = force;
    options
}

/// Run a pipeline stage behind a spinner unless JSON output was requested
fn run_with_progress<T>(
    json: bool,
    message: &str,
    run: impl FnOnce() -> Result<T>,
) -> Result<T> {
    if json {
        return run();
    }
    let mut progress = ProgressReporter::new();
    progress.start_phase(message);
    let result = run();
    match &result {
        Ok(_) => progress.finish_phase("Done"),
        Err(_) => drop(progress),
    }
    result
}
