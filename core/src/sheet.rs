//! Worksheet discovery for xlsx files
//!
//! DuckDB's excel extension reads a single worksheet at a time and offers no
//! way to enumerate them, so the sheet list is pulled straight out of the
//! xlsx container: an xlsx file is a zip archive and `xl/workbook.xml` names
//! every worksheet in workbook order.

use crate::error::{AddrdiffError, Result};
use regex::Regex;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// List all worksheet names of an xlsx file, in workbook order
pub fn list_sheets(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Err(AddrdiffError::invalid_input(format!(
            "File not found: {}",
            path.display()
        )));
    }

    let file = File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut workbook_xml = String::new();
    archive
        .by_name("xl/workbook.xml")
        .map_err(|_| {
            AddrdiffError::invalid_input(format!(
                "Not a valid xlsx file (no workbook found): {}",
                path.display()
            ))
        })?
        .read_to_string(&mut workbook_xml)?;

    parse_sheet_names(&workbook_xml)
}

/// Filter sheet names down to those matching the configured prefix
/// (trimmed, case-insensitive)
pub fn matching_sheets(names: &[String], prefix: &str) -> Vec<String> {
    let prefix_lower = prefix.trim().to_lowercase();
    names
        .iter()
        .filter(|name| name.trim().to_lowercase().starts_with(&prefix_lower))
        .cloned()
        .collect()
}

/// Pick the worksheet to read from the old file.
///
/// Mirrors the selection rules of the interactive tool: no matching sheet is
/// an error, a single match is selected automatically, and an ambiguous match
/// requires the caller to name the sheet explicitly.
pub fn resolve_sheet(path: &Path, prefix: &str, explicit: Option<&str>) -> Result<String> {
    let all_names = list_sheets(path)?;

    if let Some(name) = explicit {
        if all_names.iter().any(|n| n == name) {
            return Ok(name.to_string());
        }
        return Err(AddrdiffError::invalid_input(format!(
            "Sheet '{}' not found in {}. Available sheets: {}",
            name,
            path.display(),
            all_names.join(", ")
        )));
    }

    let candidates = matching_sheets(&all_names, prefix);
    match candidates.len() {
        0 => Err(AddrdiffError::invalid_input(format!(
            "No sheet starting with '{}' found in {}",
            prefix,
            path.display()
        ))),
        1 => {
            log::info!("Automatically selected sheet: {}", candidates[0]);
            Ok(candidates[0].clone())
        }
        _ => Err(AddrdiffError::invalid_input(format!(
            "Multiple sheets starting with '{}' found in {}: {}. Use --sheet to pick one.",
            prefix,
            path.display(),
            candidates.join(", ")
        ))),
    }
}

fn parse_sheet_names(workbook_xml: &str) -> Result<Vec<String>> {
    // Attribute order inside <sheet> is not fixed, so match the name
    // attribute anywhere within the tag
    let sheet_re = Regex::new(r#"<sheet\b[^>]*?\bname="([^"]*)""#)
        .map_err(|e| AddrdiffError::data_processing(format!("Invalid sheet pattern: {e}")))?;

    Ok(sheet_re
        .captures_iter(workbook_xml)
        .map(|caps| unescape_xml(&caps[1]))
        .collect())
}

/// Decode the predefined XML entities sheet names may contain
fn unescape_xml(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
