//! Monthly retention against a fixed registered base.

use std::collections::{BTreeMap, HashSet};

use analytics_core::{month_start, rate, ActivationEvent, EverUsedRecord, RetentionMonthlyCompany};
use chrono::NaiveDate;

/// Every month on or after `baseline` divides its distinct active users by
/// the same denominator: employees whose activity ever reached `baseline`.
pub fn retention_monthly(
    activations: &[ActivationEvent],
    ever_used: &[EverUsedRecord],
    baseline: NaiveDate,
) -> Vec<RetentionMonthlyCompany> {
    let registered_total = ever_used
        .iter()
        .filter(|r| r.last_active >= baseline)
        .map(|r| r.emp_id.as_str())
        .collect::<HashSet<_>>()
        .len() as u64;

    let mut by_month: BTreeMap<NaiveDate, HashSet<&str>> = BTreeMap::new();
    for event in activations.iter().filter(|e| e.date >= baseline) {
        by_month
            .entry(month_start(event.date))
            .or_default()
            .insert(event.emp_id.as_str());
    }

    by_month
        .into_iter()
        .map(|(month, users)| {
            let active = users.len() as u64;
            RetentionMonthlyCompany {
                active_month: month,
                active_users: active,
                registered_total,
                retention_rate: rate(active, registered_total),
            }
        })
        .collect()
}
