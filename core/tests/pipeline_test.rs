//! End-to-end tests for the update pipeline over CSV fixtures

use addrdiff_core::config::Config;
use addrdiff_core::pipeline::{UpdateOptions, UpdateSession};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const OLD_CSV: &str = "\
GID,Адрес,Средняя проходимость месяц,Округ
101,Ленина 1,1000,ЦАО
102,Ленина 2,2000,САО
103,Ленина 3,3000,ЮАО
104,Ленина 4,4000,ВАО
";

const NEW_CSV: &str = "\
GID,Адрес,Средняя проходимость месяц
101,Ленина 1,1000
102,Ленина 2,2500
103,Мира 3,3000
105,Ленина 5,5000
";

struct Fixture {
    _temp_dir: TempDir,
    old_path: PathBuf,
    new_path: PathBuf,
    out_dir: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let old_path = temp_dir.path().join("old.csv");
        let new_path = temp_dir.path().join("new.csv");
        let out_dir = temp_dir.path().to_path_buf();
        fs::write(&old_path, OLD_CSV).expect("Failed to write old fixture");
        fs::write(&new_path, NEW_CSV).expect("Failed to write new fixture");
        Self {
            _temp_dir: temp_dir,
            old_path,
            new_path,
            out_dir,
        }
    }

    fn options(&self) -> UpdateOptions {
        let mut options = UpdateOptions::new(&self.old_path, &self.new_path);
        options.skip_rows = Some(0);
        options
    }
}

#[test]
fn test_full_update_run() {
    let fixture = Fixture::new();
    let mut options = fixture.options();
    options.full_output = Some(fixture.out_dir.join("backfilled.csv"));
    options.diff_output = Some(fixture.out_dir.join("changes.csv"));

    let mut session = UpdateSession::new(Config::default()).unwrap();
    let report = session.run_update(&options).unwrap();

    assert_eq!(report.old.row_count, 4);
    assert_eq!(report.new.row_count, 4);

    let backfill = report.backfill.unwrap();
    assert_eq!(backfill.rows, 4);
    assert_eq!(backfill.matched, 3);
    assert_eq!(backfill.unmatched, 1);

    let diff = report.diff.unwrap();
    assert_eq!(diff.unchanged, 1); // 101
    assert_eq!(diff.changed, 2); // 102 metric, 103 address
    assert_eq!(diff.removed, 1); // 104
    assert_eq!(diff.added, 1); // 105

    assert!(options.full_output.as_ref().unwrap().exists());
    assert!(options.diff_output.as_ref().unwrap().exists());
}

#[test]
fn test_backfilled_output_roundtrip() {
    let fixture = Fixture::new();
    let mut options = fixture.options();
    let output = fixture.out_dir.join("backfilled.csv");
    options.full_output = Some(output.clone());

    let mut session = UpdateSession::new(Config::default()).unwrap();
    let report = session.run_backfill(&options).unwrap();
    assert!(report.diff.is_none());

    // Re-read the export on a fresh session: row count and values survive
    let mut reread = addrdiff_core::DataProcessor::new().unwrap();
    let info = reread.register_table("reread", &output, None, 0).unwrap();
    assert_eq!(info.row_count, 4);
    assert_eq!(
        info.column_names(),
        vec!["GID", "Округ", "Адрес", "Средняя проходимость месяц"]
    );

    let rows = reread.preview_rows("reread", 10).unwrap();
    let by_key: std::collections::HashMap<String, Vec<String>> = rows
        .into_iter()
        .map(|row| (row[0].clone(), row))
        .collect();
    assert_eq!(by_key["101"], vec!["101", "ЦАО", "Ленина 1", "1000"]);
    assert_eq!(by_key["102"], vec!["102", "САО", "Ленина 2", "2500"]);
    assert_eq!(by_key["103"], vec!["103", "ЮАО", "Мира 3", "3000"]);
    assert_eq!(by_key["105"], vec!["105", "", "Ленина 5", "5000"]);
}

#[test]
fn test_diff_only_run_exports_changes() {
    let fixture = Fixture::new();
    let mut options = fixture.options();
    let output = fixture.out_dir.join("changes.csv");
    options.diff_output = Some(output.clone());

    let mut session = UpdateSession::new(Config::default()).unwrap();
    let report = session.run_diff(&options).unwrap();
    assert!(report.backfill.is_none());
    assert_eq!(report.diff.unwrap().total_changes(), 4);

    let mut reread = addrdiff_core::DataProcessor::new().unwrap();
    let info = reread.register_table("changes", &output, None, 0).unwrap();
    // Unchanged rows are excluded from the export
    assert_eq!(info.row_count, 4);
}

#[test]
fn test_missing_category_column_halts() {
    let temp_dir = TempDir::new().unwrap();
    let old_path = temp_dir.path().join("old.csv");
    let new_path = temp_dir.path().join("new.csv");
    // Old table lacks the category column entirely
    fs::write(&old_path, "GID,Адрес,Средняя проходимость месяц\n101,Ленина 1,1000\n").unwrap();
    fs::write(&new_path, NEW_CSV).unwrap();

    let mut options = UpdateOptions::new(&old_path, &new_path);
    options.skip_rows = Some(0);
    options.full_output = Some(temp_dir.path().join("backfilled.csv"));

    let mut session = UpdateSession::new(Config::default()).unwrap();
    let err = session.run_update(&options).unwrap_err();
    assert!(err.to_string().contains("Округ"));

    // Processing halted before any output was written
    assert!(!temp_dir.path().join("backfilled.csv").exists());
}

#[test]
fn test_update_writes_nothing_when_second_output_blocked() {
    let fixture = Fixture::new();
    let mut options = fixture.options();
    let full_output = fixture.out_dir.join("backfilled.csv");
    let diff_output = fixture.out_dir.join("changes.csv");
    // Only the changes file is in the way
    fs::write(&diff_output, "leftover").unwrap();
    options.full_output = Some(full_output.clone());
    options.diff_output = Some(diff_output.clone());

    let mut session = UpdateSession::new(Config::default()).unwrap();
    let err = session.run_update(&options).unwrap_err();
    assert!(err.to_string().contains("already exists"));

    // The run halted before either export, not between the two
    assert!(!full_output.exists());
    assert_eq!(fs::read_to_string(&diff_output).unwrap(), "leftover");
}

#[test]
fn test_update_rejects_bad_output_extension_up_front() {
    let fixture = Fixture::new();
    let mut options = fixture.options();
    let full_output = fixture.out_dir.join("backfilled.csv");
    options.full_output = Some(full_output.clone());
    options.diff_output = Some(fixture.out_dir.join("changes.parquet"));

    let mut session = UpdateSession::new(Config::default()).unwrap();
    let err = session.run_update(&options).unwrap_err();
    assert!(err.to_string().contains("Unsupported file extension"));
    assert!(!full_output.exists());
}

#[test]
fn test_existing_outputs_need_force() {
    let fixture = Fixture::new();
    let mut options = fixture.options();
    let output = fixture.out_dir.join("backfilled.csv");
    fs::write(&output, "leftover").unwrap();
    options.full_output = Some(output.clone());

    let mut session = UpdateSession::new(Config::default()).unwrap();
    let err = session.run_backfill(&options).unwrap_err();
    assert!(err.to_string().contains("already exists"));

    options.force = true;
    let mut session = UpdateSession::new(Config::default()).unwrap();
    session.run_backfill(&options).unwrap();
    assert!(fs::read_to_string(&output).unwrap().starts_with("GID"));
}
