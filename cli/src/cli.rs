//! Command-line interface for addrdiff

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "addrdiff")]
#[command(about = "Category backfill and change detection for address program spreadsheets")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Options shared by every command that reads the source tables.
/// Each one overrides the corresponding addrdiff.toml setting.
#[derive(Args, Debug, Clone, Default)]
pub struct TableArgs {
    /// Worksheet of the old file (auto-selected by prefix when omitted)
    #[arg(long)]
    pub sheet: Option<String>,

    /// Worksheet of the new file (reader default when omitted)
    #[arg(long)]
    pub new_sheet: Option<String>,

    /// Number of preamble rows above the header row
    #[arg(long)]
    pub skip_rows: Option<u32>,

    /// Prefix used to find candidate worksheets in the old file
    #[arg(long)]
    pub sheet_prefix: Option<String>,

    /// Header of the key column
    #[arg(long)]
    pub key_column: Option<String>,

    /// Header of the address column
    #[arg(long)]
    pub address_column: Option<String>,

    /// Header of the traffic metric column
    #[arg(long)]
    pub metric_column: Option<String>,

    /// Header of the category column carried over from the old file
    #[arg(long)]
    pub category_column: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Backfill categories into the new file and report the changes
    Update {
        /// Old export, carrying the manually curated category column
        old: PathBuf,

        /// New export the category is merged into
        new: PathBuf,

        /// Output path for the full backfilled table
        #[arg(long, default_value = "backfilled.xlsx")]
        full_output: PathBuf,

        /// Output path for the changes table
        #[arg(long, default_value = "changes.xlsx")]
        diff_output: PathBuf,

        #[command(flatten)]
        table: TableArgs,

        /// Overwrite existing output files
        #[arg(long)]
        force: bool,

        /// Output the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Backfill categories into the new file
    Backfill {
        /// Old export, carrying the manually curated category column
        old: PathBuf,

        /// New export the category is merged into
        new: PathBuf,

        /// Output path for the backfilled table
        #[arg(long, default_value = "backfilled.xlsx")]
        output: PathBuf,

        #[command(flatten)]
        table: TableArgs,

        /// Overwrite an existing output file
        #[arg(long)]
        force: bool,

        /// Output the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Classify added/removed/changed rows between the two files
    Diff {
        /// Old export
        old: PathBuf,

        /// New export
        new: PathBuf,

        /// Optional output path for the changes table
        #[arg(long)]
        output: Option<PathBuf>,

        /// Number of changed rows to print to the console
        #[arg(long, default_value = "10")]
        limit: usize,

        #[command(flatten)]
        table: TableArgs,

        /// Overwrite an existing output file
        #[arg(long)]
        force: bool,

        /// Output the summary and changed rows as JSON
        #[arg(long)]
        json: bool,
    },

    /// List worksheets of an xlsx file
    Sheets {
        /// The xlsx file to inspect
        file: PathBuf,

        /// List every sheet, not only those matching the prefix
        #[arg(long)]
        all: bool,

        /// Prefix used to filter sheet names
        #[arg(long)]
        sheet_prefix: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
