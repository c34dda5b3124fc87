//! Read helpers for the analytical store.

use analytics_core::{Error, Result, Table, Value};
use chrono::{DateTime, NaiveDate};
use duckdb::types::{TimeUnit, ValueRef};

use crate::client::{storage_err, DuckDbStore};

/// Days from 0001-01-01 to the Unix epoch.
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

impl DuckDbStore {
    /// Runs a query and returns its result as a table.
    ///
    /// The statement runs exactly once; column names come from the executed
    /// statement and each cell is decoded from DuckDB's native value.
    /// Timestamps are truncated to their date.
    pub fn query(&self, name: &str, sql: &str) -> Result<Table> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql).map_err(storage_err)?;
        let mut rows = stmt.query([]).map_err(storage_err)?;
        let columns = rows
            .as_ref()
            .map(|s| s.column_names())
            .unwrap_or_default();

        let mut values = Vec::new();
        while let Some(row) = rows.next().map_err(storage_err)? {
            let decoded = (0..columns.len())
                .map(|idx| row.get_ref(idx).map_err(storage_err).and_then(from_duckdb))
                .collect::<Result<Vec<_>>>()?;
            values.push(decoded);
        }

        Table::from_rows(name, columns, values)
    }

    /// Reads a whole stored table.
    pub fn read_table(&self, table: &str) -> Result<Table> {
        if !self.table_exists(table)? {
            return Err(Error::storage(format!("table '{}' does not exist", table)));
        }
        self.query(table, &format!("SELECT * FROM \"{}\"", table.replace('"', "\"\"")))
    }
}

fn from_duckdb(value: ValueRef<'_>) -> Result<Value> {
    Ok(match value {
        ValueRef::Null => Value::Null,
        ValueRef::Boolean(b) => Value::Int(i64::from(b)),
        ValueRef::TinyInt(i) => Value::Int(i64::from(i)),
        ValueRef::SmallInt(i) => Value::Int(i64::from(i)),
        ValueRef::Int(i) => Value::Int(i64::from(i)),
        ValueRef::BigInt(i) => Value::Int(i),
        ValueRef::UTinyInt(i) => Value::Int(i64::from(i)),
        ValueRef::USmallInt(i) => Value::Int(i64::from(i)),
        ValueRef::UInt(i) => Value::Int(i64::from(i)),
        // SUM over BIGINT yields HUGEINT
        ValueRef::HugeInt(i) => i64::try_from(i)
            .map(Value::Int)
            .unwrap_or(Value::Float(i as f64)),
        ValueRef::UBigInt(i) => i64::try_from(i)
            .map(Value::Int)
            .unwrap_or(Value::Float(i as f64)),
        ValueRef::Float(f) => Value::Float(f64::from(f)),
        ValueRef::Double(f) => Value::Float(f),
        ValueRef::Decimal(d) => d
            .to_string()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|e| Error::storage(format!("unreadable decimal {}: {}", d, e)))?,
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Date32(days) => days
            .checked_add(EPOCH_DAYS_FROM_CE)
            .and_then(NaiveDate::from_num_days_from_ce_opt)
            .map(Value::Date)
            .ok_or_else(|| Error::storage(format!("date out of range: {} days", days)))?,
        ValueRef::Timestamp(unit, raw) => {
            let micros = match unit {
                TimeUnit::Second => raw.saturating_mul(1_000_000),
                TimeUnit::Millisecond => raw.saturating_mul(1_000),
                TimeUnit::Microsecond => raw,
                TimeUnit::Nanosecond => raw / 1_000,
            };
            DateTime::from_timestamp_micros(micros)
                .map(|ts| Value::Date(ts.date_naive()))
                .ok_or_else(|| Error::storage(format!("timestamp out of range: {}", raw)))?
        }
        other => {
            return Err(Error::storage(format!("unsupported column value {:?}", other)))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use analytics_core::ColumnType;

    #[test]
    fn test_query_preserves_column_order_and_types() {
        let store = DuckDbStore::open_in_memory().unwrap();
        store
            .execute_batch(
                "CREATE TABLE t (week_label VARCHAR, total BIGINT, rate DOUBLE, day DATE);
                 INSERT INTO t VALUES ('2025-W10', 12, 0.5, DATE '2025-03-03');",
            )
            .unwrap();

        let table = store.read_table("t").unwrap();

        assert_eq!(table.column_names(), vec!["week_label", "total", "rate", "day"]);
        assert_eq!(table.columns()[3].kind, ColumnType::Date);
        assert_eq!(
            table.rows()[0],
            vec![
                Value::Text("2025-W10".into()),
                Value::Int(12),
                Value::Float(0.5),
                Value::Date(NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()),
            ]
        );
    }

    #[test]
    fn test_date_shaped_text_stays_text() {
        let store = DuckDbStore::open_in_memory().unwrap();
        store
            .execute_batch(
                "CREATE TABLE t (note VARCHAR);
                 INSERT INTO t VALUES ('2025-03-03');",
            )
            .unwrap();

        let table = store.read_table("t").unwrap();

        assert_eq!(table.columns()[0].kind, ColumnType::Text);
        assert_eq!(table.rows()[0][0], Value::Text("2025-03-03".into()));
    }

    #[test]
    fn test_trailing_semicolon_is_accepted() {
        let store = DuckDbStore::open_in_memory().unwrap();
        store
            .execute_batch("CREATE TABLE t (a BIGINT); INSERT INTO t VALUES (1), (2);")
            .unwrap();

        let table = store.query("t", "SELECT a FROM t ORDER BY a;").unwrap();
        assert_eq!(table.rows(), &[vec![Value::Int(1)], vec![Value::Int(2)]]);
    }

    #[test]
    fn test_aggregates_and_timestamps_decode() {
        let store = DuckDbStore::open_in_memory().unwrap();
        store
            .execute_batch(
                "CREATE TABLE t (n BIGINT, \"at\" TIMESTAMP);
                 INSERT INTO t VALUES (40, TIMESTAMP '2025-01-06 09:30:00'), (60, NULL);",
            )
            .unwrap();

        let table = store
            .query("t", "SELECT SUM(n) AS total, MIN(\"at\") AS first_at FROM t")
            .unwrap();

        assert_eq!(table.rows()[0][0], Value::Int(100));
        assert_eq!(
            table.rows()[0][1],
            Value::Date(NaiveDate::from_ymd_opt(2025, 1, 6).unwrap())
        );
    }

    #[test]
    fn test_empty_result_keeps_header() {
        let store = DuckDbStore::open_in_memory().unwrap();
        store.execute_batch("CREATE TABLE t (a BIGINT, b VARCHAR)").unwrap();

        let table = store.query("t", "SELECT * FROM t").unwrap();
        assert!(table.is_empty());
        assert_eq!(table.column_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_read_missing_table_fails() {
        let store = DuckDbStore::open_in_memory().unwrap();
        assert!(store.read_table("nope").is_err());
    }
}
