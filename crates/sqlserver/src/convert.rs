//! TDS row conversion into pipeline values.

use analytics_core::{Error, Result, Table, Value};
use chrono::{NaiveDate, NaiveDateTime};
use tiberius::{ColumnData, FromSql, Row};

/// Convert a single TDS cell.
pub fn to_value(data: ColumnData<'static>) -> Result<Value> {
    let value = match &data {
        ColumnData::U8(v) => (*v).map(|v| Value::Int(i64::from(v))),
        ColumnData::I16(v) => (*v).map(|v| Value::Int(i64::from(v))),
        ColumnData::I32(v) => (*v).map(|v| Value::Int(i64::from(v))),
        ColumnData::I64(v) => (*v).map(Value::Int),
        ColumnData::F32(v) => (*v).map(|v| Value::Float(f64::from(v))),
        ColumnData::F64(v) => (*v).map(Value::Float),
        ColumnData::Bit(v) => (*v).map(|v| Value::Int(i64::from(v))),
        ColumnData::String(v) => v.as_ref().map(|s| Value::Text(s.to_string())),
        ColumnData::Guid(v) => (*v).map(|g| Value::Text(g.to_string())),
        ColumnData::Numeric(v) => (*v).map(|n| {
            Value::Float(n.value() as f64 / 10f64.powi(i32::from(n.scale())))
        }),
        ColumnData::Date(_) => NaiveDate::from_sql(&data)
            .map_err(conversion_error)?
            .map(Value::Date),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            NaiveDateTime::from_sql(&data)
                .map_err(conversion_error)?
                .map(|ts| Value::Date(ts.date()))
        }
        other => {
            return Err(Error::validation(format!(
                "unsupported source column type: {:?}",
                other
            )))
        }
    };
    Ok(value.unwrap_or(Value::Null))
}

/// Build a [`Table`] from a result set. Column names are passed separately so
/// an empty result still carries its header.
pub fn to_table(name: &str, columns: Vec<String>, rows: Vec<Row>) -> Result<Table> {
    let mut values = Vec::with_capacity(rows.len());
    for row in rows {
        let cells = row.into_iter().map(to_value).collect::<Result<Vec<_>>>()?;
        values.push(cells);
    }
    Table::from_rows(name, columns, values)
}

fn conversion_error(e: tiberius::error::Error) -> Error {
    Error::validation(format!("source value conversion failed: {}", e))
}
