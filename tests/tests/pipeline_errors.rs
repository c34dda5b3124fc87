//! Failure handling across pipeline stages.
//!
//! A failed stage stops the run, is reported with the stage it happened in,
//! and leaves the store untouched when nothing reached the load stage.

use analytics_core::Error;
use duckdb_client::WriteMode;
use integration_tests::fixtures;
use integration_tests::setup::TestContext;
use pipeline::{Pipeline, Stage};
use sqlserver_client::Extract;

/// Test that an unreachable source fails the extract stage.
#[tokio::test]
async fn test_source_failure_stops_at_extract() {
    let ctx = TestContext::new();
    ctx.source.fail_on("*");

    let failure = ctx.pipeline(ctx.options()).run().await.unwrap_err();

    assert_eq!(failure.stage, Stage::Extracting);
    assert!(failure.completed.is_empty());
    assert!(matches!(failure.source, Error::Connectivity(_)));
    assert!(!ctx.store.table_exists("coverage_company_weekly").unwrap());
}

/// Test that a failure on a later extract aborts before any query after it.
#[tokio::test]
async fn test_extract_failure_skips_remaining_queries() {
    let ctx = TestContext::new();
    ctx.source.fail_on(Extract::Messages.name());

    let failure = ctx.pipeline(ctx.options()).run().await.unwrap_err();

    assert_eq!(failure.stage, Stage::Extracting);
    let fetched: Vec<String> = ctx
        .source
        .captured_queries()
        .into_iter()
        .map(|q| q.name)
        .collect();
    assert_eq!(fetched, vec!["employees", "daily_active", "messages"]);
}

/// Test that a source table missing a required column fails the transform.
#[tokio::test]
async fn test_missing_column_fails_transform() {
    let ctx = TestContext::new();
    let without_count = fixtures::scenario_messages()
        .project(&["MsgDate", "EmpId"])
        .unwrap();
    ctx.source.set_table(Extract::Messages.name(), without_count);

    let failure = ctx.pipeline(ctx.options()).run().await.unwrap_err();

    assert_eq!(failure.stage, Stage::Transforming);
    assert_eq!(failure.completed.len(), 1);
    match &failure.source {
        Error::MissingColumn { column, .. } => assert_eq!(column, "MessageCount"),
        other => panic!("expected missing column, got {:?}", other),
    }
    assert!(!ctx.store.table_exists("messages_weekly_total").unwrap());
}

/// Test that an empty roster is rejected rather than producing zero rates.
#[tokio::test]
async fn test_empty_roster_is_rejected() {
    let ctx = TestContext::new();
    ctx.source
        .set_table(Extract::Employees.name(), fixtures::employees_table(&[]));

    let failure = ctx.pipeline(ctx.options()).run().await.unwrap_err();

    assert_eq!(failure.stage, Stage::Transforming);
    assert!(matches!(failure.source, Error::Validation(_)));
}

/// Test that a write the store cannot apply fails the load stage.
#[tokio::test]
async fn test_incompatible_table_fails_load() {
    let ctx = TestContext::new();
    ctx.store
        .execute_batch("CREATE TABLE coverage_company_weekly (legacy_column BIGINT)")
        .unwrap();

    let failure = ctx
        .pipeline(ctx.options().write_mode(WriteMode::Upsert))
        .run()
        .await
        .unwrap_err();

    assert_eq!(failure.stage, Stage::Loading);
    assert_eq!(failure.completed.len(), 2);
    assert!(matches!(failure.source, Error::StorageWrite { .. }));

    // the existing table is left as it was
    let rows: i64 = ctx
        .store
        .query_scalar("SELECT COUNT(*) FROM coverage_company_weekly")
        .unwrap();
    assert_eq!(rows, 0);
}

/// Test that the failure message names the stage.
#[tokio::test]
async fn test_failure_display_names_stage() {
    let ctx = TestContext::new();
    ctx.source.fail_on("*");

    let failure = ctx.pipeline(ctx.options()).run().await.unwrap_err();

    assert!(failure.to_string().contains("extract"));
}
