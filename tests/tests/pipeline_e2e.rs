//! End-to-end tests for the usage pipeline.
//!
//! These tests verify the complete flow:
//! Mock source → Extract → Transform → Load → DuckDB

use duckdb_client::{schema, WriteMode};
use integration_tests::fixtures::{self, date};
use integration_tests::setup::TestContext;
use pipeline::{Pipeline, Stage};
use sqlserver_client::{Extract, START_DATE, TARGET_DATE};

const DERIVED_TABLES: [&str; 9] = [
    "coverage_company_weekly",
    "coverage_unit_weekly",
    "active_rate_workingday_daily",
    "activation_next_month_company",
    "retention_monthly_company",
    "messages_weekly_total",
    "messages_weekly_percapita",
    "message_distribution_weekly_20_60_20",
    "message_leaderboard",
];

fn count(ctx: &TestContext, table: &str) -> i64 {
    ctx.store
        .query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .unwrap()
}

/// Test that a full refresh writes every derived table.
#[tokio::test]
async fn test_full_refresh_writes_all_tables() {
    let ctx = TestContext::new();

    let report = ctx
        .pipeline(ctx.options().full_refresh(true))
        .run()
        .await
        .expect("run should succeed");

    assert_eq!(report.pipeline, "usage");
    let stages: Vec<Stage> = report.timings.iter().map(|t| t.stage).collect();
    assert_eq!(stages, vec![Stage::Extracting, Stage::Transforming, Stage::Loading]);
    assert_eq!(report.output.len(), DERIVED_TABLES.len());

    for table in DERIVED_TABLES {
        assert!(ctx.store.table_exists(table).unwrap(), "{} missing", table);
    }
    assert_eq!(count(&ctx, "coverage_company_weekly"), 2);
    assert_eq!(count(&ctx, "coverage_unit_weekly"), 6);
    // weekdays only: the Saturday login has no row
    assert_eq!(count(&ctx, "active_rate_workingday_daily"), 5);
    assert_eq!(count(&ctx, "activation_next_month_company"), 6);
    assert_eq!(count(&ctx, "retention_monthly_company"), 1);
    assert_eq!(count(&ctx, "messages_weekly_total"), 2);
    assert_eq!(count(&ctx, "message_leaderboard"), 5);
}

/// Test company coverage counts ever-used employees on each baseline date.
#[tokio::test]
async fn test_company_coverage_values() {
    let ctx = TestContext::new();
    ctx.pipeline(ctx.options()).run().await.unwrap();

    let (covered, total): (i64, i64) = (
        ctx.store
            .query_scalar("SELECT covered_users FROM coverage_company_weekly WHERE iso_week = 2")
            .unwrap(),
        ctx.store
            .query_scalar("SELECT total_users FROM coverage_company_weekly WHERE iso_week = 2")
            .unwrap(),
    );
    assert_eq!((covered, total), (5, 6));

    let baseline = ctx
        .store
        .query("baseline", "SELECT baseline_date FROM coverage_company_weekly WHERE iso_week = 3")
        .unwrap();
    assert_eq!(baseline.rows()[0][0].as_date(), Some(date("2025-01-13")));
}

/// Test unit coverage only counts employees active in the week.
#[tokio::test]
async fn test_unit_coverage_values() {
    let ctx = TestContext::new();
    ctx.pipeline(ctx.options()).run().await.unwrap();

    let table = ctx
        .store
        .query(
            "units",
            "SELECT iso_week, unit_id, unit_name, covered_users, total_users \
             FROM coverage_unit_weekly ORDER BY iso_week, unit_id",
        )
        .unwrap();
    let rows: Vec<(i64, String, String, i64, i64)> = table
        .rows()
        .iter()
        .map(|r| {
            (
                r[0].as_i64().unwrap(),
                r[1].to_text().unwrap(),
                r[2].to_text().unwrap(),
                r[3].as_i64().unwrap(),
                r[4].as_i64().unwrap(),
            )
        })
        .collect();

    assert_eq!(
        rows,
        vec![
            (2, "R0100".to_string(), "Sales".to_string(), 1, 3),
            (2, "R0200".to_string(), "Engineering".to_string(), 2, 2),
            (2, "U9999".to_string(), "未定義".to_string(), 0, 1),
            (3, "R0100".to_string(), "Sales".to_string(), 2, 3),
            (3, "R0200".to_string(), "Engineering".to_string(), 0, 2),
            (3, "U9999".to_string(), "未定義".to_string(), 1, 1),
        ]
    );
}

/// Test message tables: weekday totals, the 20/60/20 split, and the leaderboard.
#[tokio::test]
async fn test_message_tables() {
    let ctx = TestContext::new();
    ctx.pipeline(ctx.options()).run().await.unwrap();

    let total: i64 = ctx
        .store
        .query_scalar("SELECT total_messages FROM messages_weekly_total WHERE iso_week = 2")
        .unwrap();
    assert_eq!(total, 100);

    let shares = ctx
        .store
        .query(
            "shares",
            "SELECT segment, user_count, message_sum FROM message_distribution_weekly_20_60_20 \
             WHERE iso_week = 2 ORDER BY message_sum DESC",
        )
        .unwrap();
    let shares: Vec<(String, i64, i64)> = shares
        .rows()
        .iter()
        .map(|r| (r[0].to_text().unwrap(), r[1].as_i64().unwrap(), r[2].as_i64().unwrap()))
        .collect();
    assert_eq!(
        shares,
        vec![
            ("mid60".to_string(), 3, 50),
            ("top20".to_string(), 1, 40),
            ("bottom20".to_string(), 1, 10),
        ]
    );

    // the leaderboard includes weekend messages
    let leader = ctx
        .store
        .query(
            "leader",
            "SELECT emp_id, unit_name, total_messages FROM message_leaderboard WHERE rank = 1",
        )
        .unwrap();
    assert_eq!(leader.rows()[0][0].to_text().as_deref(), Some("E001"));
    assert_eq!(leader.rows()[0][1].to_text().as_deref(), Some("Sales"));
    assert_eq!(leader.rows()[0][2].as_i64(), Some(139));
}

/// Test cohort and retention rates.
#[tokio::test]
async fn test_cohort_and_retention() {
    let ctx = TestContext::new();
    ctx.pipeline(ctx.options()).run().await.unwrap();

    let december_cohort: f64 = ctx
        .store
        .query_scalar(
            "SELECT activation_rate FROM activation_next_month_company \
             WHERE hire_month = DATE '2024-12-01'",
        )
        .unwrap();
    assert_eq!(december_cohort, 1.0);

    let november_cohort: i64 = ctx
        .store
        .query_scalar(
            "SELECT used_next_month FROM activation_next_month_company \
             WHERE hire_month = DATE '2024-11-01'",
        )
        .unwrap();
    assert_eq!(november_cohort, 0);

    let registered: i64 = ctx
        .store
        .query_scalar("SELECT registered_total FROM retention_monthly_company")
        .unwrap();
    assert_eq!(registered, 5);
}

/// Test that re-running with the same inputs leaves identical tables.
#[tokio::test]
async fn test_rerun_is_idempotent() {
    let ctx = TestContext::new();

    ctx.pipeline(ctx.options()).run().await.unwrap();
    let first: Vec<_> = DERIVED_TABLES
        .iter()
        .map(|t| ctx.store.read_table(t).unwrap())
        .collect();

    ctx.pipeline(ctx.options()).run().await.unwrap();
    let second: Vec<_> = DERIVED_TABLES
        .iter()
        .map(|t| ctx.store.read_table(t).unwrap())
        .collect();

    assert_eq!(first, second);
}

/// Test that merge mode upserts instead of duplicating rows.
#[tokio::test]
async fn test_upsert_rerun_keeps_one_row_per_key() {
    let ctx = TestContext::new();
    schema::init_schema(&ctx.store).unwrap();

    let options = ctx.options().write_mode(WriteMode::Upsert);
    ctx.pipeline(options.clone()).run().await.unwrap();
    ctx.pipeline(options).run().await.unwrap();

    assert_eq!(count(&ctx, "coverage_company_weekly"), 2);
    assert_eq!(count(&ctx, "coverage_unit_weekly"), 6);
    assert_eq!(count(&ctx, "message_distribution_weekly_20_60_20"), 6);
}

/// Test that merge mode still replaces the leaderboard wholesale.
#[tokio::test]
async fn test_merge_rerun_replaces_leaderboard() {
    let ctx = TestContext::new();
    let options = ctx.options().write_mode(WriteMode::Upsert);
    ctx.pipeline(options.clone()).run().await.unwrap();
    assert_eq!(count(&ctx, "message_leaderboard"), 5);

    // only E003 sends messages in the second extract
    ctx.source.set_table(
        Extract::Messages.name(),
        fixtures::messages_table(&[("2025-01-07", "E003", 300)]),
    );
    ctx.pipeline(options).run().await.unwrap();

    assert_eq!(count(&ctx, "message_leaderboard"), 1);
    let e003: i64 = ctx
        .store
        .query_scalar("SELECT COUNT(*) FROM message_leaderboard WHERE emp_id = 'E003'")
        .unwrap();
    let leader_total: i64 = ctx
        .store
        .query_scalar("SELECT total_messages FROM message_leaderboard WHERE rank = 1")
        .unwrap();
    assert_eq!((e003, leader_total), (1, 300));

    // keyed tables keep merging
    assert_eq!(count(&ctx, "coverage_company_weekly"), 2);
}

/// Test that incremental runs bind a start date on windowed extracts only.
#[tokio::test]
async fn test_incremental_run_binds_start_date() {
    let ctx = TestContext::new();

    ctx.pipeline(ctx.options().lookback_days(30))
        .run()
        .await
        .unwrap();

    let queries = ctx.source.captured_queries();
    assert_eq!(queries.len(), Extract::ALL.len());
    for query in &queries {
        assert_eq!(query.params.get(TARGET_DATE), Some(date("2025-01-31")));
        assert_eq!(query.params.get(START_DATE), Some(date("2025-01-01")));
    }

    let daily = queries.iter().find(|q| q.name == "daily_active").unwrap();
    assert!(daily.sql.contains(":start_date"));
    let employees = queries.iter().find(|q| q.name == "employees").unwrap();
    assert!(!employees.sql.contains(":start_date"));
}

/// Test that a full refresh never binds a start date.
#[tokio::test]
async fn test_full_refresh_has_no_window() {
    let ctx = TestContext::new();

    ctx.pipeline(ctx.options().full_refresh(true))
        .run()
        .await
        .unwrap();

    for query in ctx.source.captured_queries() {
        assert!(query.params.get(START_DATE).is_none());
        assert!(!query.sql.contains(":start_date"), "{} is windowed", query.name);
    }
}
