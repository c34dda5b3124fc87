//! Typed raw records built from source extracts.
//!
//! Every builder validates the columns it needs up front and fails with a
//! `MissingColumn` error naming the table and column, so a malformed extract
//! never reaches the rate computations.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::table::{Table, Value};

/// Display name for employees whose unit cannot be resolved.
pub const UNDEFINED_UNIT_NAME: &str = "未定義";

const EMP_ID: &[&str] = &["EmpId", "EmpNo", "emp_id"];
const UNIT_ID: &[&str] = &["UnitId", "unit_id"];
const UNIT_NAME: &[&str] = &["UnitName", "unit_name"];
const ROOT_UNIT_ID: &[&str] = &["RootUnitId", "RootOrgId", "root_org_id"];
const ROOT_UNIT_NAME: &[&str] = &["RootUnitName", "RootOrgName", "root_org_name"];
const IN_DATE: &[&str] = &["InDate", "in_date"];
const OUT_DATE: &[&str] = &["OutDate", "out_date"];
const ACTIVE_DATE: &[&str] = &["ActiveDate", "active_date"];
const MSG_DATE: &[&str] = &["MsgDate", "stat_date"];
const SENDER_ID: &[&str] = &[
    "EmpId",
    "SendEmpid",
    "SenderEmpId",
    "SenderEmpNo",
    "EmpNo",
    "emp_id",
];
const MESSAGE_COUNT: &[&str] = &["MessageCount", "message_count"];
const FIRST_ACTIVE: &[&str] = &["FirstActiveDate", "first_active_date"];
const LAST_ACTIVE: &[&str] = &["LastActiveDate", "last_active_date"];

/// A roster row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeRecord {
    pub emp_id: String,
    pub unit_id: Option<String>,
    pub unit_name: Option<String>,
    pub root_org_id: Option<String>,
    pub root_org_name: Option<String>,
    /// `None` when the roster has no hire date; such rows count as employed
    /// from the start of time.
    pub in_date: Option<NaiveDate>,
    pub out_date: Option<NaiveDate>,
}

impl EmployeeRecord {
    /// `in_date <= d AND (out_date IS NULL OR out_date > d)`.
    pub fn is_employed_on(&self, date: NaiveDate) -> bool {
        let hired = self.in_date.map_or(true, |in_date| in_date <= date);
        let not_left = self.out_date.map_or(true, |out_date| out_date > date);
        hired && not_left
    }

    /// Aggregation unit: the root org when known, else the direct unit.
    pub fn agg_unit_id(&self) -> Option<&str> {
        self.root_org_id.as_deref().or(self.unit_id.as_deref())
    }

    pub fn agg_unit_name(&self) -> &str {
        self.root_org_name
            .as_deref()
            .or(self.unit_name.as_deref())
            .unwrap_or(UNDEFINED_UNIT_NAME)
    }

    pub fn from_table(table: &Table) -> Result<Vec<Self>> {
        let emp_idx = table.require_column(EMP_ID)?;
        let unit_idx = table.require_column(UNIT_ID)?;
        let in_idx = table.require_column(IN_DATE)?;
        let out_idx = table.require_column(OUT_DATE)?;
        let unit_name_idx = table.optional_column(UNIT_NAME);
        let root_id_idx = table.optional_column(ROOT_UNIT_ID);
        let root_name_idx = table.optional_column(ROOT_UNIT_NAME);

        table
            .rows()
            .iter()
            .map(|row| -> Result<Self> {
                Ok(Self {
                    emp_id: required_text(table, row, emp_idx)?,
                    unit_id: row[unit_idx].to_text(),
                    unit_name: unit_name_idx.and_then(|i| row[i].to_text()),
                    root_org_id: root_id_idx.and_then(|i| row[i].to_text()),
                    root_org_name: root_name_idx.and_then(|i| row[i].to_text()),
                    in_date: optional_date(table, row, in_idx)?,
                    out_date: optional_date(table, row, out_idx)?,
                })
            })
            .collect()
    }
}

/// One day on which an employee used the application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActivationEvent {
    pub emp_id: String,
    pub date: NaiveDate,
}

impl ActivationEvent {
    pub fn from_table(table: &Table) -> Result<Vec<Self>> {
        let emp_idx = table.require_column(EMP_ID)?;
        let date_idx = table.require_column(ACTIVE_DATE)?;

        table
            .rows()
            .iter()
            .map(|row| -> Result<Self> {
                Ok(Self {
                    emp_id: required_text(table, row, emp_idx)?,
                    date: required_date(table, row, date_idx)?,
                })
            })
            .collect()
    }
}

/// Messages sent by one employee on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEvent {
    pub emp_id: String,
    pub date: NaiveDate,
    pub count: u64,
}

impl MessageEvent {
    pub fn from_table(table: &Table) -> Result<Vec<Self>> {
        let emp_idx = table.require_column(SENDER_ID)?;
        let date_idx = table.require_column(MSG_DATE)?;
        let count_idx = table.require_column(MESSAGE_COUNT)?;

        table
            .rows()
            .iter()
            .map(|row| -> Result<Self> {
                let count = row[count_idx]
                    .as_i64()
                    .filter(|c| *c >= 0)
                    .ok_or_else(|| invalid_value(table, count_idx, &row[count_idx]))?;
                Ok(Self {
                    emp_id: required_text(table, row, emp_idx)?,
                    date: required_date(table, row, date_idx)?,
                    count: count as u64,
                })
            })
            .collect()
    }
}

/// First and last activation of an employee over the whole history up to
/// the target date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EverUsedRecord {
    pub emp_id: String,
    pub first_active: NaiveDate,
    pub last_active: NaiveDate,
}

impl EverUsedRecord {
    pub fn from_table(table: &Table) -> Result<Vec<Self>> {
        let emp_idx = table.require_column(EMP_ID)?;
        let first_idx = table.require_column(FIRST_ACTIVE)?;
        let last_idx = table.require_column(LAST_ACTIVE)?;

        table
            .rows()
            .iter()
            .map(|row| -> Result<Self> {
                Ok(Self {
                    emp_id: required_text(table, row, emp_idx)?,
                    first_active: required_date(table, row, first_idx)?,
                    last_active: required_date(table, row, last_idx)?,
                })
            })
            .collect()
    }
}

fn column_name(table: &Table, idx: usize) -> &str {
    table.columns()[idx].name.as_str()
}

fn invalid_value(table: &Table, idx: usize, value: &Value) -> Error {
    Error::validation(format!(
        "table '{}' column '{}' has invalid {} value {:?}",
        table.name(),
        column_name(table, idx),
        value.type_name(),
        value
    ))
}

fn required_text(table: &Table, row: &[Value], idx: usize) -> Result<String> {
    row[idx].to_text().ok_or_else(|| {
        Error::validation(format!(
            "table '{}' has an empty required '{}'",
            table.name(),
            column_name(table, idx)
        ))
    })
}

fn required_date(table: &Table, row: &[Value], idx: usize) -> Result<NaiveDate> {
    row[idx]
        .as_date()
        .ok_or_else(|| invalid_value(table, idx, &row[idx]))
}

fn optional_date(table: &Table, row: &[Value], idx: usize) -> Result<Option<NaiveDate>> {
    match &row[idx] {
        Value::Null => Ok(None),
        Value::Text(s) if s.trim().is_empty() => Ok(None),
        other => other
            .as_date()
            .map(Some)
            .ok_or_else(|| invalid_value(table, idx, other)),
    }
}
