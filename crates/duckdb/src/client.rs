//! DuckDB connection wrapper.

use std::path::Path;

use analytics_core::{Error, Result};
use duckdb::{AccessMode, Connection};
use parking_lot::Mutex;
use tracing::info;

use crate::config::StoreConfig;

/// Embedded analytical store.
///
/// A single connection serialized behind a mutex; DuckDB allows one writer
/// process per file.
pub struct DuckDbStore {
    pub(crate) conn: Mutex<Connection>,
    db_path: String,
}

impl DuckDbStore {
    /// Opens (or creates) the database file.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let path = config.path.as_path();
        info!(path = %path.display(), "Opening DuckDB store");

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::storage(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }

        let conn = Connection::open(path).map_err(storage_err)?;
        let pragmas = config.pragmas();
        if !pragmas.is_empty() {
            conn.execute_batch(&pragmas).map_err(storage_err)?;
        }

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path.to_string_lossy().to_string(),
        })
    }

    /// Opens an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(storage_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: ":memory:".to_string(),
        })
    }

    /// Opens an existing file without write access, for dashboard readers.
    pub fn open_read_only(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::storage(format!(
                "database file {} does not exist",
                path.display()
            )));
        }

        let flags = duckdb::Config::default()
            .access_mode(AccessMode::ReadOnly)
            .map_err(storage_err)?;
        let conn = Connection::open_with_flags(path, flags).map_err(storage_err)?;

        info!(path = %path.display(), "Opened DuckDB store read-only");
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path.to_string_lossy().to_string(),
        })
    }

    /// Executes a batch of statements.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch(sql).map_err(storage_err)
    }

    /// Ensures a table exists using caller-supplied DDL.
    pub fn ensure_table(&self, ddl: &str) -> Result<()> {
        self.execute_batch(ddl)
    }

    /// Query for a single scalar value.
    pub fn query_scalar<T: duckdb::types::FromSql>(&self, sql: &str) -> Result<T> {
        let conn = self.conn.lock();
        conn.query_row(sql, [], |row| row.get(0))
            .map_err(storage_err)
    }

    pub fn table_exists(&self, table: &str) -> Result<bool> {
        let conn = self.conn.lock();
        table_exists(&conn, table)
    }

    /// Column names of an existing table, in declaration order.
    pub fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        table_columns(&conn, table)
    }

    pub fn db_path(&self) -> &str {
        &self.db_path
    }
}

pub(crate) fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = 'main' AND table_name = ?",
            [table],
            |row| row.get(0),
        )
        .map_err(storage_err)?;
    Ok(count > 0)
}

pub(crate) fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare(
            "SELECT column_name FROM information_schema.columns \
             WHERE table_schema = 'main' AND table_name = ? ORDER BY ordinal_position",
        )
        .map_err(storage_err)?;
    let names = stmt
        .query_map([table], |row| row.get::<_, String>(0))
        .map_err(storage_err)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(storage_err)?;
    Ok(names)
}

/// Quotes an identifier for interpolation into SQL.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub(crate) fn storage_err(e: duckdb::Error) -> Error {
    Error::storage(e.to_string())
}
