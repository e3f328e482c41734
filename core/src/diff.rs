//! Change classification between the old and new tables
//!
//! Performs a full outer join on the key and classifies every row. The full
//! classification lands in the `diff_all` view; `diff_changes` excludes
//! unchanged rows and is what gets exported and shown to the user.

use crate::config::ColumnSpec;
use crate::data::{quote_ident, DataProcessor};
use crate::error::{AddrdiffError, Result};
use serde::{Deserialize, Serialize};

/// Name of the view holding every joined row with its classification
pub const DIFF_VIEW: &str = "diff_all";
/// Name of the view holding only added/removed/changed rows
pub const CHANGES_VIEW: &str = "diff_changes";
/// Name of the classification column in both views
pub const CHANGE_COLUMN: &str = "change_type";

/// Suffix appended to old-side column names in the diff output
pub const OLD_SUFFIX: &str = "_old";
/// Suffix appended to new-side column names in the diff output
pub const NEW_SUFFIX: &str = "_new";

/// Classification of a joined row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeType {
    /// Key present only in the new table
    Added,
    /// Key present only in the old table
    Removed,
    /// Key present in both, address or metric differs
    Changed,
    /// Key present in both, address and metric identical
    Unchanged,
}

impl ChangeType {
    /// Stable label used in the diff output column
    pub fn label(&self) -> &'static str {
        match self {
            ChangeType::Added => "Added",
            ChangeType::Removed => "Removed",
            ChangeType::Changed => "Changed",
            ChangeType::Unchanged => "Unchanged",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Added" => Some(ChangeType::Added),
            "Removed" => Some(ChangeType::Removed),
            "Changed" => Some(ChangeType::Changed),
            "Unchanged" => Some(ChangeType::Unchanged),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Row counts per classification
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiffSummary {
    pub added: u64,
    pub removed: u64,
    pub changed: u64,
    pub unchanged: u64,
}

impl DiffSummary {
    pub fn total_changes(&self) -> u64 {
        self.added + self.removed + self.changed
    }

    pub fn has_changes(&self) -> bool {
        self.total_changes() > 0
    }
}

/// Build the diff views from the registered old and new tables and return
/// the per-classification counts.
pub fn diff_views(
    processor: &mut DataProcessor,
    old_view: &str,
    new_view: &str,
    columns: &ColumnSpec,
) -> Result<DiffSummary> {
    let key = quote_ident(&columns.key);
    let address = quote_ident(&columns.address);
    let metric = quote_ident(&columns.metric);

    // Classification rule, evaluated in order: only-old is Removed, only-new
    // is Added, any field difference is Changed. NULL fields on both sides
    // compare equal.
    let create_diff_sql = format!(
        "CREATE OR REPLACE VIEW {diff_view} AS \
         SELECT \
             COALESCE(o.{key}, n.{key}) AS {key}, \
             o.{address} AS {address_old}, \
             o.{metric} AS {metric_old}, \
             n.{address} AS {address_new}, \
             n.{metric} AS {metric_new}, \
             CASE \
                 WHEN n.{key} IS NULL THEN '{removed}' \
                 WHEN o.{key} IS NULL THEN '{added}' \
                 WHEN o.{address} IS DISTINCT FROM n.{address} \
                      OR o.{metric} IS DISTINCT FROM n.{metric} THEN '{changed}' \
                 ELSE '{unchanged}' \
             END AS {change_column} \
         FROM {old} o FULL OUTER JOIN {new} n ON o.{key} = n.{key}",
        diff_view = quote_ident(DIFF_VIEW),
        address_old = quote_ident(&format!("{}{}", columns.address, OLD_SUFFIX)),
        metric_old = quote_ident(&format!("{}{}", columns.metric, OLD_SUFFIX)),
        address_new = quote_ident(&format!("{}{}", columns.address, NEW_SUFFIX)),
        metric_new = quote_ident(&format!("{}{}", columns.metric, NEW_SUFFIX)),
        removed = ChangeType::Removed.label(),
        added = ChangeType::Added.label(),
        changed = ChangeType::Changed.label(),
        unchanged = ChangeType::Unchanged.label(),
        change_column = quote_ident(CHANGE_COLUMN),
        old = quote_ident(old_view),
        new = quote_ident(new_view),
    );
    processor.connection.execute(&create_diff_sql, [])?;

    let create_changes_sql = format!(
        "CREATE OR REPLACE VIEW {} AS SELECT * FROM {} WHERE {} <> '{}'",
        quote_ident(CHANGES_VIEW),
        quote_ident(DIFF_VIEW),
        quote_ident(CHANGE_COLUMN),
        ChangeType::Unchanged.label()
    );
    processor.connection.execute(&create_changes_sql, [])?;

    summarize(processor)
}

fn summarize(processor: &DataProcessor) -> Result<DiffSummary> {
    let mut stmt = processor.connection.prepare(&format!(
        "SELECT {col}, COUNT(*) FROM {view} GROUP BY {col}",
        col = quote_ident(CHANGE_COLUMN),
        view = quote_ident(DIFF_VIEW)
    ))?;

    let mut summary = DiffSummary::default();
    let counts = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?))
        })?
        .collect::<duckdb::Result<Vec<_>>>()?;

    for (label, count) in counts {
        match ChangeType::from_label(&label) {
            Some(ChangeType::Added) => summary.added = count,
            Some(ChangeType::Removed) => summary.removed = count,
            Some(ChangeType::Changed) => summary.changed = count,
            Some(ChangeType::Unchanged) => summary.unchanged = count,
            None => {
                return Err(AddrdiffError::data_processing(format!(
                    "Unexpected change classification: {label}"
                )))
            }
        }
    }
    Ok(summary)
}
