//! # addrdiff-core
//!
//! Core library for addrdiff - merges the manually curated category column
//! of an older address program export into a newer one by key, and reports
//! the added/removed/changed rows between the two.
//!
//! This crate provides the core functionality that can be used by different
//! interfaces (CLI, web APIs, etc.).

pub mod config;
pub mod data;
pub mod diff;
pub mod error;
pub mod export;
pub mod merge;
pub mod pipeline;
pub mod sheet;

// Re-export the most commonly used types for convenience
pub use config::{ColumnSpec, Config, SheetConfig};
pub use data::{ColumnInfo, DataInfo, DataProcessor, Record};
pub use diff::{ChangeType, DiffSummary};
pub use error::{AddrdiffError, Result};
pub use export::{ExportFormat, ExportOptions};
pub use merge::BackfillSummary;
pub use pipeline::{UpdateOptions, UpdateReport, UpdateSession};
