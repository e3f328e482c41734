//! Output formatting utilities

use addrdiff_core::data::{ColumnInfo, DataInfo, Record};
use addrdiff_core::diff::DiffSummary;
use addrdiff_core::error::Result;
use addrdiff_core::merge::BackfillSummary;
use addrdiff_core::pipeline::UpdateReport;
use serde::Serialize;

/// Pretty printer for addrdiff output
pub struct PrettyPrinter;

impl PrettyPrinter {
    /// Print the report of a full update run
    pub fn print_update_report(report: &UpdateReport) {
        println!("📊 Address program update");
        println!("├─ Old table: {}", describe_table(&report.old));
        println!("├─ New table: {}", describe_table(&report.new));

        if let Some(backfill) = &report.backfill {
            Self::print_backfill_line(backfill, "├─");
        }
        if let Some(diff) = &report.diff {
            if diff.has_changes() {
                println!(
                    "├─ ❌ Changes: {} ({} added, {} removed, {} changed)",
                    diff.total_changes(),
                    diff.added,
                    diff.removed,
                    diff.changed
                );
            } else {
                println!("├─ ✅ Changes: none");
            }
        }

        match (&report.full_output, &report.diff_output) {
            (Some(full), Some(diff)) => {
                println!("├─ 📥 Full table: {}", full.display());
                println!("└─ 📥 Changes: {}", diff.display());
            }
            (Some(full), None) => println!("└─ 📥 Full table: {}", full.display()),
            (None, Some(diff)) => println!("└─ 📥 Changes: {}", diff.display()),
            (None, None) => println!("└─ No output files requested"),
        }
    }

    /// Print the diff summary for console-only diff runs
    pub fn print_diff_summary(summary: &DiffSummary) {
        if !summary.has_changes() {
            println!("✅ No changes between the two tables");
            return;
        }

        println!("🔍 Changes compared to the old table");
        println!("├─ Added: {}", summary.added);
        println!("├─ Removed: {}", summary.removed);
        println!("├─ Changed: {}", summary.changed);
        println!("└─ Unchanged (excluded): {}", summary.unchanged);
    }

    /// Print a sample of changed rows as an aligned table
    pub fn print_diff_rows(columns: &[ColumnInfo], rows: &[Vec<String>], total: u64) {
        if rows.is_empty() {
            return;
        }

        let header: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        let widths = column_widths(&header, rows);

        println!();
        println!("{}", render_row(&header, &widths));
        for row in rows {
            let cells: Vec<&str> = row.iter().map(|v| v.as_str()).collect();
            println!("{}", render_row(&cells, &widths));
        }
        if (rows.len() as u64) < total {
            println!("... and {} more changed rows", total - rows.len() as u64);
        }
    }

    /// Print worksheet names
    pub fn print_sheet_list(sheets: &[String]) {
        if sheets.is_empty() {
            println!("No sheets found.");
            return;
        }

        println!("📄 Worksheets:");
        for (i, sheet) in sheets.iter().enumerate() {
            let prefix = if i == sheets.len() - 1 {
                "└─"
            } else {
                "├─"
            };
            println!("{prefix} {sheet}");
        }
    }

    fn print_backfill_line(backfill: &BackfillSummary, prefix: &str) {
        if backfill.unmatched == 0 {
            println!(
                "{prefix} ✅ Categories: all {} rows matched",
                backfill.matched
            );
        } else {
            println!(
                "{prefix} 🟡 Categories: {} matched, {} left empty",
                backfill.matched, backfill.unmatched
            );
        }
    }
}

/// JSON formatter for machine-readable output
pub struct JsonFormatter;

impl JsonFormatter {
    /// Format a run report as JSON
    pub fn format_report(report: &UpdateReport) -> Result<String> {
        Ok(serde_json::to_string_pretty(report)?)
    }

    /// Format the diff summary plus a sample of changed rows as JSON.
    /// Serialized directly (not via `serde_json::Value`) so the records keep
    /// their column order.
    pub fn format_diff(summary: &DiffSummary, changes: &[Record]) -> Result<String> {
        #[derive(Serialize)]
        struct DiffJson<'a> {
            summary: &'a DiffSummary,
            changes: &'a [Record],
        }

        Ok(serde_json::to_string_pretty(&DiffJson { summary, changes })?)
    }

    /// Format a sheet listing as JSON
    pub fn format_sheets(sheets: &[String]) -> Result<String> {
        Ok(serde_json::to_string_pretty(&serde_json::json!({
            "sheets": sheets
        }))?)
    }
}

fn describe_table(info: &DataInfo) -> String {
    let mut line = format!(
        "{} rows, {} columns ({})",
        info.row_count,
        info.column_count(),
        info.source.display()
    );
    if let Some(sheet) = &info.sheet {
        line.push_str(&format!(", sheet '{sheet}'"));
    }
    line
}

fn column_widths(header: &[&str], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, value) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(value.chars().count());
            }
        }
    }
    widths
}

fn render_row(cells: &[&str], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths.iter())
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}
