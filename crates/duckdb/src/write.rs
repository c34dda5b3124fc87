//! Transactional table writes.

use std::fmt;
use std::time::Instant;

use analytics_core::{Error, Result, Table, Value};
use duckdb::{Connection, ToSql};
use serde::{Deserialize, Serialize};
use telemetry::metrics;
use tracing::{debug, info, warn};

use crate::client::{quote_ident, table_columns, table_exists, DuckDbStore};

/// How a derived table is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Drop and recreate from the incoming data.
    #[default]
    Replace,
    /// Insert rows, creating the table if needed.
    Append,
    /// Update rows matching the key columns, insert the rest.
    Upsert,
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WriteMode::Replace => "replace",
            WriteMode::Append => "append",
            WriteMode::Upsert => "upsert",
        })
    }
}

/// Outcome of one table write.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteSummary {
    pub table: String,
    pub mode: WriteMode,
    pub rows_written: usize,
    /// Incoming columns the existing table does not have.
    pub dropped_columns: Vec<String>,
}

impl DuckDbStore {
    /// Writes `table` in a single transaction. Any failure rolls back and
    /// leaves the previous contents untouched.
    pub fn write(&self, table: &Table, mode: WriteMode, keys: &[&str]) -> Result<WriteSummary> {
        let name = table.name();
        if name.is_empty() {
            return Err(Error::validation("cannot write a table without a name"));
        }
        if mode == WriteMode::Upsert && keys.is_empty() {
            return Err(Error::storage_write(name, "upsert requires key columns"));
        }
        if mode != WriteMode::Replace && table.is_empty() {
            warn!(table = name, %mode, "No rows to write, skipping");
            return Ok(WriteSummary {
                table: name.to_string(),
                mode,
                rows_written: 0,
                dropped_columns: Vec::new(),
            });
        }

        let start = Instant::now();
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction()
            .map_err(|e| Error::storage_write(name, e.to_string()))?;

        let outcome = match mode {
            WriteMode::Replace => replace(&tx, table),
            WriteMode::Append => append(&tx, table),
            WriteMode::Upsert => upsert(&tx, table, keys),
        };

        match outcome {
            Ok(summary) => {
                tx.commit()
                    .map_err(|e| Error::storage_write(name, e.to_string()))?;
                metrics().tables_written.inc();
                metrics().rows_written.inc_by(summary.rows_written as u64);
                info!(
                    table = name,
                    %mode,
                    rows = summary.rows_written,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Wrote table"
                );
                Ok(summary)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback() {
                    warn!(table = name, error = %rollback, "Rollback failed");
                }
                metrics().write_rollbacks.inc();
                warn!(table = name, %mode, error = %e, "Write rolled back");
                Err(match e {
                    Error::StorageWrite { .. } | Error::Validation(_) => e,
                    other => Error::storage_write(name, other.to_string()),
                })
            }
        }
    }
}

fn replace(conn: &Connection, table: &Table) -> Result<WriteSummary> {
    let name = table.name();
    exec(conn, name, &create_sql(table, true))?;
    let columns = table.column_names();
    let rows_written = insert_rows(conn, table, &columns)?;
    Ok(summary(table, WriteMode::Replace, rows_written, Vec::new()))
}

fn append(conn: &Connection, table: &Table) -> Result<WriteSummary> {
    let (columns, dropped) = target_columns(conn, table)?;
    let rows_written = insert_rows(conn, table, &columns)?;
    Ok(summary(table, WriteMode::Append, rows_written, dropped))
}

fn upsert(conn: &Connection, table: &Table, keys: &[&str]) -> Result<WriteSummary> {
    let name = table.name();
    let (columns, dropped) = target_columns(conn, table)?;

    for key in keys {
        if !columns.iter().any(|c| c.eq_ignore_ascii_case(key)) {
            return Err(Error::storage_write(
                name,
                format!("key column '{}' is not present in both incoming and stored data", key),
            ));
        }
    }

    let indices = column_indices(table, &columns)?;
    let key_positions: Vec<usize> = columns
        .iter()
        .enumerate()
        .filter(|(_, c)| keys.iter().any(|k| k.eq_ignore_ascii_case(c)))
        .map(|(i, _)| i)
        .collect();
    let value_positions: Vec<usize> = (0..columns.len())
        .filter(|i| !key_positions.contains(i))
        .collect();

    let key_filter = key_positions
        .iter()
        .map(|&i| format!("{} IS NOT DISTINCT FROM ?", quote_ident(&columns[i])))
        .collect::<Vec<_>>()
        .join(" AND ");

    let probe_sql = if value_positions.is_empty() {
        format!(
            "SELECT COUNT(*) FROM {} WHERE {}",
            quote_ident(name),
            key_filter
        )
    } else {
        let assignments = value_positions
            .iter()
            .map(|&i| format!("{} = ?", quote_ident(&columns[i])))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "UPDATE {} SET {} WHERE {}",
            quote_ident(name),
            assignments,
            key_filter
        )
    };
    let insert_sql = insert_sql(name, &columns);

    let mut probe = conn.prepare(&probe_sql).map_err(|e| write_err(name, e))?;
    let mut insert = conn.prepare(&insert_sql).map_err(|e| write_err(name, e))?;

    let mut updated = 0usize;
    let mut inserted = 0usize;
    for row in table.rows() {
        let projected: Vec<&Value> = indices.iter().map(|&i| &row[i]).collect();

        let mut probe_params: Vec<Box<dyn ToSql>> = value_positions
            .iter()
            .map(|&i| to_sql(projected[i]))
            .collect();
        probe_params.extend(key_positions.iter().map(|&i| to_sql(projected[i])));
        let probe_refs: Vec<&dyn ToSql> = probe_params.iter().map(AsRef::as_ref).collect();

        let matched = if value_positions.is_empty() {
            let count: i64 = probe
                .query_row(probe_refs.as_slice(), |r| r.get(0))
                .map_err(|e| write_err(name, e))?;
            count as usize
        } else {
            probe
                .execute(probe_refs.as_slice())
                .map_err(|e| write_err(name, e))?
        };

        if matched > 0 {
            updated += 1;
            continue;
        }

        let params: Vec<Box<dyn ToSql>> = projected.iter().map(|v| to_sql(v)).collect();
        let refs: Vec<&dyn ToSql> = params.iter().map(AsRef::as_ref).collect();
        insert
            .execute(refs.as_slice())
            .map_err(|e| write_err(name, e))?;
        inserted += 1;
    }

    debug!(table = name, updated, inserted, "Upserted rows");
    Ok(summary(table, WriteMode::Upsert, updated + inserted, dropped))
}

/// Resolves the columns to write for append/upsert, creating the table from
/// the incoming shape when it does not exist yet.
fn target_columns(conn: &Connection, table: &Table) -> Result<(Vec<String>, Vec<String>)> {
    let name = table.name();
    if !table_exists(conn, name)? {
        exec(conn, name, &create_sql(table, false))?;
        let columns = table.column_names().iter().map(|c| c.to_string()).collect();
        return Ok((columns, Vec::new()));
    }

    let existing = table_columns(conn, name)?;
    let mut columns = Vec::new();
    let mut dropped = Vec::new();
    for incoming in table.column_names() {
        match existing.iter().find(|c| c.eq_ignore_ascii_case(incoming)) {
            Some(stored) => columns.push(stored.clone()),
            None => dropped.push(incoming.to_string()),
        }
    }

    if !dropped.is_empty() {
        warn!(
            table = name,
            columns = ?dropped,
            "Incoming columns not present in stored table, dropping them"
        );
    }
    if columns.is_empty() {
        return Err(Error::storage_write(
            name,
            "incoming data shares no columns with the stored table",
        ));
    }
    Ok((columns, dropped))
}

fn insert_rows<S: AsRef<str>>(conn: &Connection, table: &Table, columns: &[S]) -> Result<usize> {
    let name = table.name();
    if table.is_empty() {
        return Ok(0);
    }

    let columns: Vec<String> = columns.iter().map(|c| c.as_ref().to_string()).collect();
    let indices = column_indices(table, &columns)?;
    let mut stmt = conn
        .prepare(&insert_sql(name, &columns))
        .map_err(|e| write_err(name, e))?;

    for row in table.rows() {
        let params: Vec<Box<dyn ToSql>> = indices.iter().map(|&i| to_sql(&row[i])).collect();
        let refs: Vec<&dyn ToSql> = params.iter().map(AsRef::as_ref).collect();
        stmt.execute(refs.as_slice())
            .map_err(|e| write_err(name, e))?;
    }
    Ok(table.len())
}

fn column_indices(table: &Table, columns: &[String]) -> Result<Vec<usize>> {
    columns
        .iter()
        .map(|c| {
            table
                .column_index(c)
                .ok_or_else(|| Error::missing_column(table.name(), c.as_str()))
        })
        .collect()
}

fn create_sql(table: &Table, replace: bool) -> String {
    let columns = table
        .columns()
        .iter()
        .map(|c| format!("{} {}", quote_ident(&c.name), c.kind.sql_type()))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "CREATE {}TABLE {} ({})",
        if replace { "OR REPLACE " } else { "" },
        quote_ident(table.name()),
        columns
    )
}

fn insert_sql(table: &str, columns: &[String]) -> String {
    let names = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        names,
        placeholders
    )
}

fn exec(conn: &Connection, table: &str, sql: &str) -> Result<()> {
    conn.execute_batch(sql).map_err(|e| write_err(table, e))
}

fn to_sql(value: &Value) -> Box<dyn ToSql> {
    match value {
        Value::Null => Box::new(None::<String>),
        Value::Int(v) => Box::new(*v),
        Value::Float(v) => Box::new(*v),
        Value::Text(v) => Box::new(v.clone()),
        Value::Date(v) => Box::new(*v),
    }
}

fn summary(table: &Table, mode: WriteMode, rows_written: usize, dropped: Vec<String>) -> WriteSummary {
    WriteSummary {
        table: table.name().to_string(),
        mode,
        rows_written,
        dropped_columns: dropped,
    }
}

fn write_err(table: &str, e: duckdb::Error) -> Error {
    Error::storage_write(table, e.to_string())
}
