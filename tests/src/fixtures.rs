//! Raw source tables for a small two-week scenario in January 2025.
//!
//! Column names match what the source queries return.

use analytics_core::{Table, Value};
use chrono::NaiveDate;

/// Target date the scenario is built around.
pub const TARGET_DATE: &str = "2025-01-31";
pub const RETENTION_BASELINE: &str = "2025-01-01";

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

fn opt_text(s: Option<&str>) -> Value {
    s.map(text).unwrap_or(Value::Null)
}

fn opt_date(s: Option<&str>) -> Value {
    s.map(|d| Value::Date(date(d))).unwrap_or(Value::Null)
}

fn table(name: &str, columns: &[&str], rows: Vec<Vec<Value>>) -> Table {
    Table::from_rows(name, columns.iter().map(|c| c.to_string()).collect(), rows).unwrap()
}

/// One roster row: `(emp, unit, unit_name, root, root_name, in, out)`.
pub type EmployeeRow<'a> = (
    &'a str,
    &'a str,
    Option<&'a str>,
    Option<&'a str>,
    Option<&'a str>,
    Option<&'a str>,
    Option<&'a str>,
);

pub fn employees_table(rows: &[EmployeeRow<'_>]) -> Table {
    table(
        "employees",
        &["EmpId", "UnitId", "UnitName", "RootUnitId", "RootUnitName", "InDate", "OutDate"],
        rows.iter()
            .map(|(emp, unit, unit_name, root, root_name, in_date, out_date)| {
                vec![
                    text(emp),
                    text(unit),
                    opt_text(*unit_name),
                    opt_text(*root),
                    opt_text(*root_name),
                    opt_date(*in_date),
                    opt_date(*out_date),
                ]
            })
            .collect(),
    )
}

pub fn daily_active_table(rows: &[(&str, &str)]) -> Table {
    table(
        "daily_active",
        &["ActiveDate", "EmpId"],
        rows.iter()
            .map(|(day, emp)| vec![Value::Date(date(day)), text(emp)])
            .collect(),
    )
}

pub fn messages_table(rows: &[(&str, &str, i64)]) -> Table {
    table(
        "messages",
        &["MsgDate", "EmpId", "MessageCount"],
        rows.iter()
            .map(|(day, emp, count)| vec![Value::Date(date(day)), text(emp), Value::Int(*count)])
            .collect(),
    )
}

pub fn ever_used_table(rows: &[(&str, &str, &str)]) -> Table {
    table(
        "ever_used",
        &["EmpId", "FirstActiveDate", "LastActiveDate"],
        rows.iter()
            .map(|(emp, first, last)| {
                vec![text(emp), Value::Date(date(first)), Value::Date(date(last))]
            })
            .collect(),
    )
}

/// Six employees over two root orgs plus one employee with no root.
///
/// E004 leaves on 2025-01-15, E005 joins on 2025-01-06, E006 never uses the app.
pub fn scenario_employees() -> Table {
    employees_table(&[
        ("E001", "U0101", Some("Sales East"), Some("R0100"), Some("Sales"), Some("2024-03-01"), None),
        ("E002", "U0102", Some("Sales West"), Some("R0100"), Some("Sales"), Some("2024-11-18"), None),
        ("E003", "U0201", Some("Platform"), Some("R0200"), Some("Engineering"), Some("2024-12-02"), None),
        ("E004", "U0201", Some("Platform"), Some("R0200"), Some("Engineering"), Some("2023-05-01"), Some("2025-01-15")),
        ("E005", "U9999", None, None, None, Some("2025-01-06"), None),
        ("E006", "U0102", Some("Sales West"), Some("R0100"), Some("Sales"), Some("2024-01-01"), None),
    ])
}

/// Activity in ISO weeks 2 and 3 of 2025, with one Saturday login.
pub fn scenario_daily_active() -> Table {
    daily_active_table(&[
        ("2025-01-06", "E001"),
        ("2025-01-06", "E003"),
        ("2025-01-07", "E001"),
        ("2025-01-08", "E004"),
        ("2025-01-13", "E002"),
        ("2025-01-14", "E005"),
        ("2025-01-18", "E001"),
    ])
}

/// Week 2 weekday total is 100 from five senders; the Saturday count only
/// reaches the leaderboard.
pub fn scenario_messages() -> Table {
    messages_table(&[
        ("2025-01-06", "E001", 40),
        ("2025-01-07", "E003", 25),
        ("2025-01-08", "E004", 15),
        ("2025-01-09", "E002", 10),
        ("2025-01-10", "E005", 10),
        ("2025-01-11", "E001", 99),
        ("2025-01-13", "E002", 8),
    ])
}

pub fn scenario_ever_used() -> Table {
    ever_used_table(&[
        ("E001", "2024-10-01", "2025-01-18"),
        ("E002", "2025-01-13", "2025-01-13"),
        ("E003", "2025-01-06", "2025-01-06"),
        ("E004", "2024-06-01", "2025-01-08"),
        ("E005", "2025-01-14", "2025-01-14"),
    ])
}
