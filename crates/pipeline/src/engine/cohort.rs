//! Next-month activation of new-hire cohorts.

use std::collections::{BTreeMap, HashMap, HashSet};

use analytics_core::{
    month_start, next_month_window, rate, ActivationEvent, ActivationNextMonthCompany,
    EmployeeRecord, Result,
};
use chrono::NaiveDate;

/// Cohorts are keyed by hire month; a hire counts once if any activation
/// falls inside the following calendar month. Hire months after the target
/// date's month are not reported.
pub fn activation_next_month(
    employees: &[EmployeeRecord],
    activations: &[ActivationEvent],
    target_date: NaiveDate,
) -> Result<Vec<ActivationNextMonthCompany>> {
    let last_month = month_start(target_date);

    let mut cohorts: BTreeMap<NaiveDate, HashSet<&str>> = BTreeMap::new();
    for employee in employees {
        if let Some(in_date) = employee.in_date {
            let month = month_start(in_date);
            if month <= last_month {
                cohorts.entry(month).or_default().insert(employee.emp_id.as_str());
            }
        }
    }

    let mut dates_by_emp: HashMap<&str, Vec<NaiveDate>> = HashMap::new();
    for event in activations {
        dates_by_emp.entry(event.emp_id.as_str()).or_default().push(event.date);
    }

    let mut rows = Vec::with_capacity(cohorts.len());
    for (hire_month, hires) in cohorts {
        let (start, end) = next_month_window(hire_month)?;
        let used = hires
            .iter()
            .filter(|id| {
                dates_by_emp
                    .get(*id)
                    .is_some_and(|dates| dates.iter().any(|d| *d >= start && *d <= end))
            })
            .count() as u64;
        let new_hires = hires.len() as u64;
        rows.push(ActivationNextMonthCompany {
            hire_month,
            new_hires,
            used_next_month: used,
            activation_rate: rate(used, new_hires),
        });
    }
    Ok(rows)
}
