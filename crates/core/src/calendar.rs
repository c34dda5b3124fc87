//! Calendar helpers: ISO weeks, calendar months, and working days.

use std::fmt;

use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An ISO-8601 (year, week) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IsoWeekKey {
    pub year: i32,
    pub week: u32,
}

impl IsoWeekKey {
    pub fn of(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }

    /// Display label, e.g. `2025-W07`.
    pub fn label(&self) -> String {
        self.to_string()
    }

    /// Monday of the week.
    pub fn monday(&self) -> Result<NaiveDate> {
        NaiveDate::from_isoywd_opt(self.year, self.week, Weekday::Mon)
            .ok_or_else(|| Error::internal(format!("invalid ISO week {}", self)))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        Self::of(date) == *self
    }
}

impl fmt::Display for IsoWeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

/// Monday through Friday.
pub fn is_working_day(date: NaiveDate) -> bool {
    date.weekday().num_days_from_monday() < 5
}

/// First day of the date's calendar month.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

/// Inclusive `[start, end]` bounds of the calendar month after `month`.
pub fn next_month_window(month: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
    let start = month_start(month)
        .checked_add_months(Months::new(1))
        .ok_or_else(|| Error::internal(format!("month overflow after {}", month)))?;
    let end = start
        .checked_add_months(Months::new(1))
        .and_then(|d| d.checked_sub_days(Days::new(1)))
        .ok_or_else(|| Error::internal(format!("month overflow after {}", start)))?;
    Ok((start, end))
}

/// Ratio with the zero-denominator convention used across every derived table.
pub fn rate(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
