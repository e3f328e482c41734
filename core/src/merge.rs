//! Category backfill
//!
//! Carries the manually curated category column from the old table into the
//! new one by key lookup. The result is materialized as the `backfilled`
//! view: every column of the new table in its original order, with the
//! category inserted immediately after the key column.

use crate::config::ColumnSpec;
use crate::data::{quote_ident, DataProcessor};
use crate::error::{AddrdiffError, Result};
use serde::Serialize;

/// Name of the view holding the backfilled table
pub const BACKFILLED_VIEW: &str = "backfilled";

/// Outcome of a category backfill
#[derive(Debug, Clone, Serialize)]
pub struct BackfillSummary {
    /// Rows in the backfilled table
    pub rows: u64,
    /// Rows whose key was found in the old table
    pub matched: u64,
    /// Rows whose key was absent (category left empty)
    pub unmatched: u64,
}

/// Build the backfilled view from the registered old and new tables.
///
/// Keys absent from the old table get an empty category. Duplicate keys in
/// the old table are not guarded against; they fan the join out.
pub fn backfill_view(
    processor: &mut DataProcessor,
    old_view: &str,
    new_view: &str,
    columns: &ColumnSpec,
) -> Result<BackfillSummary> {
    let new_columns = processor.column_info(new_view)?;

    if new_columns.iter().any(|c| c.name == columns.category) {
        return Err(AddrdiffError::invalid_input(format!(
            "New table already contains a '{}' column; refusing to overwrite it",
            columns.category
        )));
    }
    if !new_columns.iter().any(|c| c.name == columns.key) {
        return Err(AddrdiffError::missing_columns(
            "new",
            vec![columns.key.clone()],
        ));
    }

    let mut select_list = Vec::with_capacity(new_columns.len() + 1);
    for column in &new_columns {
        select_list.push(format!("n.{}", quote_ident(&column.name)));
        if column.name == columns.key {
            select_list.push(format!(
                "COALESCE(CAST(o.{} AS VARCHAR), '') AS {}",
                quote_ident(&columns.category),
                quote_ident(&columns.category)
            ));
        }
    }

    let join_clause = format!(
        "FROM {} n LEFT JOIN {} o ON n.{key} = o.{key}",
        quote_ident(new_view),
        quote_ident(old_view),
        key = quote_ident(&columns.key)
    );

    let create_view_sql = format!(
        "CREATE OR REPLACE VIEW {} AS SELECT {} {join_clause}",
        quote_ident(BACKFILLED_VIEW),
        select_list.join(", ")
    );
    processor.connection.execute(&create_view_sql, [])?;

    let (matched, unmatched): (u64, u64) = processor
        .connection
        .prepare(&format!(
            "SELECT \
                 COUNT(*) FILTER (WHERE o.{key} IS NOT NULL), \
                 COUNT(*) FILTER (WHERE o.{key} IS NULL) \
             {join_clause}",
            key = quote_ident(&columns.key)
        ))?
        .query_row([], |row| Ok((row.get(0)?, row.get(1)?)))?;

    log::debug!("Backfilled {} rows ({unmatched} without a category)", matched + unmatched);

    Ok(BackfillSummary {
        rows: processor.row_count(BACKFILLED_VIEW)?,
        matched,
        unmatched,
    })
}
