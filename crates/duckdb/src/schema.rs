//! Derived table schemas.
//!
//! DDL is generated from each row type's column list so the stored shape
//! cannot drift from what the transform stage produces.

use analytics_core::{
    ActivationNextMonthCompany, ActiveRateDaily, Column, CoverageCompanyWeekly,
    CoverageUnitWeekly, MessageDistributionWeekly, MessageLeaderboardEntry,
    MessagesWeeklyPerCapita, MessagesWeeklyTotal, Result, RetentionMonthlyCompany, TableRow,
};
use tracing::info;

use crate::client::{quote_ident, DuckDbStore};

/// `CREATE TABLE IF NOT EXISTS` for one row type.
pub fn create_table<R: TableRow>() -> String {
    ddl(R::TABLE, &R::columns())
}

fn ddl(table: &str, columns: &[Column]) -> String {
    let body = columns
        .iter()
        .map(|c| format!("    {} {}", quote_ident(&c.name), c.kind.sql_type()))
        .collect::<Vec<_>>()
        .join(",\n");
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n);",
        quote_ident(table),
        body
    )
}

/// DDL for every derived table.
pub fn all_tables() -> Vec<String> {
    vec![
        create_table::<CoverageCompanyWeekly>(),
        create_table::<CoverageUnitWeekly>(),
        create_table::<ActiveRateDaily>(),
        create_table::<ActivationNextMonthCompany>(),
        create_table::<RetentionMonthlyCompany>(),
        create_table::<MessagesWeeklyTotal>(),
        create_table::<MessagesWeeklyPerCapita>(),
        create_table::<MessageDistributionWeekly>(),
        create_table::<MessageLeaderboardEntry>(),
    ]
}

/// Creates any missing derived tables. Existing tables are left untouched.
pub fn init_schema(store: &DuckDbStore) -> Result<()> {
    for statement in all_tables() {
        store.ensure_table(&statement)?;
    }
    info!(path = store.db_path(), tables = all_tables().len(), "Store schema initialized");
    Ok(())
}
