//! Point-in-time employment snapshots.

use std::collections::{HashMap, HashSet};

use analytics_core::EmployeeRecord;
use chrono::NaiveDate;

/// Roster view answering "who was employed on day d".
///
/// Snapshots are evaluated on demand for every date a metric needs; each one
/// is a linear scan over the roster.
pub struct Roster<'a> {
    employees: &'a [EmployeeRecord],
    by_id: HashMap<&'a str, &'a EmployeeRecord>,
}

impl<'a> Roster<'a> {
    pub fn new(employees: &'a [EmployeeRecord]) -> Self {
        let by_id = employees.iter().map(|e| (e.emp_id.as_str(), e)).collect();
        Self { employees, by_id }
    }

    /// Employees employed on `date`.
    pub fn employed_on(&self, date: NaiveDate) -> impl Iterator<Item = &'a EmployeeRecord> {
        self.employees.iter().filter(move |e| e.is_employed_on(date))
    }

    /// Distinct ids employed on `date`.
    pub fn employed_ids(&self, date: NaiveDate) -> HashSet<&'a str> {
        self.employed_on(date).map(|e| e.emp_id.as_str()).collect()
    }

    pub fn headcount(&self, date: NaiveDate) -> u64 {
        self.employed_ids(date).len() as u64
    }

    /// Ids employed on at least one of `dates`.
    pub fn employed_on_any<I>(&self, dates: I) -> HashSet<&'a str>
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        let mut ids = HashSet::new();
        for date in dates {
            ids.extend(self.employed_ids(date));
        }
        ids
    }

    pub fn get(&self, emp_id: &str) -> Option<&'a EmployeeRecord> {
        self.by_id.get(emp_id).copied()
    }

    pub fn len(&self) -> usize {
        self.employees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.employees.is_empty()
    }
}
