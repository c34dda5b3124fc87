//! Analytical store behavior as seen by the pipeline and dashboard readers.

use std::sync::Arc;

use analytics_core::{to_table, CoverageCompanyWeekly, IsoWeekKey, TableRow};
use duckdb_client::{check_connection, init_schema, DuckDbStore, StoreConfig, WriteMode};
use integration_tests::fixtures::date;
use integration_tests::setup::TestContext;
use pipeline::Pipeline;

fn coverage(week: u32, covered: u64, total: u64) -> CoverageCompanyWeekly {
    CoverageCompanyWeekly {
        week: IsoWeekKey { year: 2025, week },
        baseline_date: date("2025-03-03"),
        covered_users: covered,
        total_users: total,
        coverage_rate: covered as f64 / total as f64,
    }
}

/// Test that an upsert replaces matching keys and keeps the rest.
#[test]
fn test_upsert_replaces_matching_week() {
    let store = DuckDbStore::open_in_memory().unwrap();
    init_schema(&store).unwrap();

    let initial = to_table(&[coverage(10, 5, 10), coverage(11, 6, 10)]).unwrap();
    store
        .write(&initial, WriteMode::Upsert, CoverageCompanyWeekly::KEYS)
        .unwrap();

    let update = to_table(&[coverage(11, 8, 10)]).unwrap();
    let summary = store
        .write(&update, WriteMode::Upsert, CoverageCompanyWeekly::KEYS)
        .unwrap();
    assert_eq!(summary.rows_written, 1);

    let rows: i64 = store
        .query_scalar("SELECT COUNT(*) FROM coverage_company_weekly")
        .unwrap();
    assert_eq!(rows, 2);
    let week10: f64 = store
        .query_scalar("SELECT coverage_rate FROM coverage_company_weekly WHERE iso_week = 10")
        .unwrap();
    let week11: f64 = store
        .query_scalar("SELECT coverage_rate FROM coverage_company_weekly WHERE iso_week = 11")
        .unwrap();
    assert_eq!(week10, 0.5);
    assert_eq!(week11, 0.8);
}

/// Test that tables written by a run survive reopening the file.
#[tokio::test]
async fn test_file_store_persists_between_opens() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache").join("usage.duckdb");
    let config = StoreConfig::default().with_path(&path);

    {
        let mut ctx = TestContext::new();
        ctx.store = Arc::new(DuckDbStore::open(&config).unwrap());
        ctx.pipeline(ctx.options()).run().await.unwrap();
    }

    let reopened = DuckDbStore::open(&config).unwrap();
    assert!(check_connection(&reopened));
    let weeks: i64 = reopened
        .query_scalar("SELECT COUNT(*) FROM coverage_company_weekly")
        .unwrap();
    assert_eq!(weeks, 2);
}

/// Test that a read-only handle can query but not write.
#[test]
fn test_read_only_handle_rejects_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("usage.duckdb");

    {
        let store = DuckDbStore::open(&StoreConfig::default().with_path(&path)).unwrap();
        let table = to_table(&[coverage(10, 5, 10)]).unwrap();
        store.write(&table, WriteMode::Replace, &[]).unwrap();
    }

    let reader = DuckDbStore::open_read_only(&path).unwrap();
    let table = reader.read_table("coverage_company_weekly").unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table.rows()[0][4].as_i64(), Some(5));

    let table = to_table(&[coverage(11, 6, 10)]).unwrap();
    assert!(reader.write(&table, WriteMode::Append, &[]).is_err());
}

/// Test that a read-only open of a missing file fails instead of creating it.
#[test]
fn test_read_only_requires_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.duckdb");

    assert!(DuckDbStore::open_read_only(&path).is_err());
    assert!(!path.exists());
}

/// Test that replacing with no rows still leaves the table in place.
#[test]
fn test_replace_with_no_rows_keeps_schema() {
    let store = DuckDbStore::open_in_memory().unwrap();
    let rows: Vec<CoverageCompanyWeekly> = Vec::new();
    let empty = to_table(&rows).unwrap();

    store.write(&empty, WriteMode::Replace, &[]).unwrap();

    assert!(store.table_exists("coverage_company_weekly").unwrap());
    assert_eq!(
        store.table_columns("coverage_company_weekly").unwrap(),
        CoverageCompanyWeekly::columns()
            .into_iter()
            .map(|c| c.name)
            .collect::<Vec<_>>()
    );
}
