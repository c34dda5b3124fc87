//! Load stage: write derived tables to the analytical store.

use analytics_core::Result;
use duckdb_client::{DuckDbStore, WriteMode, WriteSummary};

use crate::engine::{DerivedTables, OutputTable};

/// Writes each derived table in its own transaction.
///
/// A failure stops the load; tables written before it stay committed.
pub fn load(store: &DuckDbStore, derived: &DerivedTables, mode: WriteMode) -> Result<Vec<WriteSummary>> {
    let mut summaries = Vec::new();
    for output in derived.to_tables()? {
        let mode = effective_mode(&output, mode);
        let keys: &[&str] = match mode {
            WriteMode::Upsert => output.keys,
            WriteMode::Replace | WriteMode::Append => &[],
        };
        summaries.push(store.write(&output.table, mode, keys)?);
    }
    Ok(summaries)
}

fn effective_mode(output: &OutputTable, requested: WriteMode) -> WriteMode {
    if output.replace_only {
        WriteMode::Replace
    } else {
        requested
    }
}
