//! Typed rows for every derived metric table.
//!
//! Each row type knows its table name, its logical key, and how to flatten
//! itself into a `Table` row; the store builds DDL from the same column lists.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::IsoWeekKey;
use crate::error::Result;
use crate::table::{Column, ColumnType, Table, Value};

/// A row of a derived table.
pub trait TableRow {
    /// Table name in the analytical store.
    const TABLE: &'static str;
    /// Columns identifying a row; used for upserts.
    const KEYS: &'static [&'static str];
    /// Whole-table snapshots that must be replaced even when a run merges.
    const REPLACE_ONLY: bool = false;

    fn columns() -> Vec<Column>;

    fn values(&self) -> Vec<Value>;
}

/// Flattens typed rows into a store-ready table.
pub fn to_table<R: TableRow>(rows: &[R]) -> Result<Table> {
    let mut table = Table::new(R::TABLE, R::columns());
    for row in rows {
        table.push_row(row.values())?;
    }
    Ok(table)
}

fn col(name: &str, kind: ColumnType) -> Column {
    Column::new(name, kind)
}

fn week_columns() -> Vec<Column> {
    vec![
        col("iso_year", ColumnType::Integer),
        col("iso_week", ColumnType::Integer),
        col("week_label", ColumnType::Text),
    ]
}

fn week_values(week: &IsoWeekKey) -> Vec<Value> {
    vec![
        Value::from(week.year),
        Value::from(week.week),
        Value::from(week.label()),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageCompanyWeekly {
    pub week: IsoWeekKey,
    pub baseline_date: NaiveDate,
    pub covered_users: u64,
    pub total_users: u64,
    pub coverage_rate: f64,
}

impl TableRow for CoverageCompanyWeekly {
    const TABLE: &'static str = "coverage_company_weekly";
    const KEYS: &'static [&'static str] = &["iso_year", "iso_week"];

    fn columns() -> Vec<Column> {
        let mut cols = week_columns();
        cols.extend([
            col("baseline_date", ColumnType::Date),
            col("covered_users", ColumnType::Integer),
            col("total_users", ColumnType::Integer),
            col("coverage_rate", ColumnType::Double),
        ]);
        cols
    }

    fn values(&self) -> Vec<Value> {
        let mut values = week_values(&self.week);
        values.extend([
            Value::from(self.baseline_date),
            Value::from(self.covered_users),
            Value::from(self.total_users),
            Value::from(self.coverage_rate),
        ]);
        values
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageUnitWeekly {
    pub week: IsoWeekKey,
    pub baseline_date: NaiveDate,
    pub unit_id: Option<String>,
    pub unit_name: String,
    /// Employed on the baseline date and active during this week.
    pub covered_users: u64,
    pub total_users: u64,
    pub coverage_rate: f64,
}

impl TableRow for CoverageUnitWeekly {
    const TABLE: &'static str = "coverage_unit_weekly";
    const KEYS: &'static [&'static str] = &["iso_year", "iso_week", "unit_id"];

    fn columns() -> Vec<Column> {
        let mut cols = week_columns();
        cols.extend([
            col("baseline_date", ColumnType::Date),
            col("unit_id", ColumnType::Text),
            col("unit_name", ColumnType::Text),
            col("covered_users", ColumnType::Integer),
            col("total_users", ColumnType::Integer),
            col("coverage_rate", ColumnType::Double),
        ]);
        cols
    }

    fn values(&self) -> Vec<Value> {
        let mut values = week_values(&self.week);
        values.extend([
            Value::from(self.baseline_date),
            Value::from(self.unit_id.clone()),
            Value::from(self.unit_name.clone()),
            Value::from(self.covered_users),
            Value::from(self.total_users),
            Value::from(self.coverage_rate),
        ]);
        values
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveRateDaily {
    pub stat_date: NaiveDate,
    pub active_users: u64,
    pub total_users: u64,
    pub active_rate: f64,
}

impl TableRow for ActiveRateDaily {
    const TABLE: &'static str = "active_rate_workingday_daily";
    const KEYS: &'static [&'static str] = &["stat_date"];

    fn columns() -> Vec<Column> {
        vec![
            col("stat_date", ColumnType::Date),
            col("active_users", ColumnType::Integer),
            col("total_users", ColumnType::Integer),
            col("active_rate", ColumnType::Double),
        ]
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::from(self.stat_date),
            Value::from(self.active_users),
            Value::from(self.total_users),
            Value::from(self.active_rate),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationNextMonthCompany {
    /// First day of the hire month.
    pub hire_month: NaiveDate,
    pub new_hires: u64,
    pub used_next_month: u64,
    pub activation_rate: f64,
}

impl TableRow for ActivationNextMonthCompany {
    const TABLE: &'static str = "activation_next_month_company";
    const KEYS: &'static [&'static str] = &["hire_month"];

    fn columns() -> Vec<Column> {
        vec![
            col("hire_month", ColumnType::Date),
            col("new_hires", ColumnType::Integer),
            col("used_next_month", ColumnType::Integer),
            col("activation_rate", ColumnType::Double),
        ]
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::from(self.hire_month),
            Value::from(self.new_hires),
            Value::from(self.used_next_month),
            Value::from(self.activation_rate),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionMonthlyCompany {
    /// First day of the activity month.
    pub active_month: NaiveDate,
    pub active_users: u64,
    pub registered_total: u64,
    pub retention_rate: f64,
}

impl TableRow for RetentionMonthlyCompany {
    const TABLE: &'static str = "retention_monthly_company";
    const KEYS: &'static [&'static str] = &["active_month"];

    fn columns() -> Vec<Column> {
        vec![
            col("active_month", ColumnType::Date),
            col("active_users", ColumnType::Integer),
            col("registered_total", ColumnType::Integer),
            col("retention_rate", ColumnType::Double),
        ]
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::from(self.active_month),
            Value::from(self.active_users),
            Value::from(self.registered_total),
            Value::from(self.retention_rate),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagesWeeklyTotal {
    pub week: IsoWeekKey,
    pub week_start: NaiveDate,
    pub total_messages: u64,
    pub sender_count: u64,
}

impl TableRow for MessagesWeeklyTotal {
    const TABLE: &'static str = "messages_weekly_total";
    const KEYS: &'static [&'static str] = &["iso_year", "iso_week"];

    fn columns() -> Vec<Column> {
        let mut cols = week_columns();
        cols.extend([
            col("week_start", ColumnType::Date),
            col("total_messages", ColumnType::Integer),
            col("sender_count", ColumnType::Integer),
        ]);
        cols
    }

    fn values(&self) -> Vec<Value> {
        let mut values = week_values(&self.week);
        values.extend([
            Value::from(self.week_start),
            Value::from(self.total_messages),
            Value::from(self.sender_count),
        ]);
        values
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagesWeeklyPerCapita {
    pub week: IsoWeekKey,
    pub total_messages: u64,
    /// Employees in service on any weekday with messages that week.
    pub employee_total: u64,
    pub messages_per_capita: f64,
}

impl TableRow for MessagesWeeklyPerCapita {
    const TABLE: &'static str = "messages_weekly_percapita";
    const KEYS: &'static [&'static str] = &["iso_year", "iso_week"];

    fn columns() -> Vec<Column> {
        let mut cols = week_columns();
        cols.extend([
            col("total_messages", ColumnType::Integer),
            col("employee_total", ColumnType::Integer),
            col("messages_per_capita", ColumnType::Double),
        ]);
        cols
    }

    fn values(&self) -> Vec<Value> {
        let mut values = week_values(&self.week);
        values.extend([
            Value::from(self.total_messages),
            Value::from(self.employee_total),
            Value::from(self.messages_per_capita),
        ]);
        values
    }
}

/// Population band of the 20/60/20 split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Segment {
    Top20,
    Mid60,
    Bottom20,
}

impl Segment {
    pub const ALL: [Segment; 3] = [Segment::Top20, Segment::Mid60, Segment::Bottom20];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Top20 => "top20",
            Self::Mid60 => "mid60",
            Self::Bottom20 => "bottom20",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageDistributionWeekly {
    pub week: IsoWeekKey,
    pub segment: Segment,
    pub user_count: u64,
    pub message_sum: u64,
    pub share_percent: f64,
}

impl TableRow for MessageDistributionWeekly {
    const TABLE: &'static str = "message_distribution_weekly_20_60_20";
    const KEYS: &'static [&'static str] = &["iso_year", "iso_week", "segment"];

    fn columns() -> Vec<Column> {
        let mut cols = week_columns();
        cols.extend([
            col("segment", ColumnType::Text),
            col("user_count", ColumnType::Integer),
            col("message_sum", ColumnType::Integer),
            col("share_percent", ColumnType::Double),
        ]);
        cols
    }

    fn values(&self) -> Vec<Value> {
        let mut values = week_values(&self.week);
        values.extend([
            Value::from(self.segment.as_str()),
            Value::from(self.user_count),
            Value::from(self.message_sum),
            Value::from(self.share_percent),
        ]);
        values
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageLeaderboardEntry {
    pub rank: u32,
    pub emp_id: String,
    pub unit_id: Option<String>,
    pub unit_name: String,
    pub total_messages: u64,
}

impl TableRow for MessageLeaderboardEntry {
    const TABLE: &'static str = "message_leaderboard";
    const KEYS: &'static [&'static str] = &["rank"];
    // a rank only means something within one ranking
    const REPLACE_ONLY: bool = true;

    fn columns() -> Vec<Column> {
        vec![
            col("rank", ColumnType::Integer),
            col("emp_id", ColumnType::Text),
            col("unit_id", ColumnType::Text),
            col("unit_name", ColumnType::Text),
            col("total_messages", ColumnType::Integer),
        ]
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::from(self.rank),
            Value::from(self.emp_id.clone()),
            Value::from(self.unit_id.clone()),
            Value::from(self.unit_name.clone()),
            Value::from(self.total_messages),
        ]
    }
}
