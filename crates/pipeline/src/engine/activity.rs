//! Working-day active rate.

use std::collections::{BTreeMap, HashSet};

use analytics_core::{is_working_day, rate, ActivationEvent, ActiveRateDaily};
use chrono::NaiveDate;

use super::snapshot::Roster;

/// One row per weekday with activity. Active users are restricted to those
/// employed that day so the rate never exceeds one.
pub fn active_rate_daily(roster: &Roster<'_>, activations: &[ActivationEvent]) -> Vec<ActiveRateDaily> {
    let mut by_day: BTreeMap<NaiveDate, HashSet<&str>> = BTreeMap::new();
    for event in activations.iter().filter(|e| is_working_day(e.date)) {
        by_day.entry(event.date).or_default().insert(event.emp_id.as_str());
    }

    by_day
        .into_iter()
        .map(|(day, users)| {
            let employed = roster.employed_ids(day);
            let active = users.iter().filter(|id| employed.contains(*id)).count() as u64;
            let total = employed.len() as u64;
            ActiveRateDaily {
                stat_date: day,
                active_users: active,
                total_users: total,
                active_rate: rate(active, total),
            }
        })
        .collect()
}
