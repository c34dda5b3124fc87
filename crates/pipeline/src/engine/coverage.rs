//! Weekly coverage, company-wide and per aggregation unit.
//!
//! Both scopes snapshot employment on the week's baseline date. They differ
//! in the numerator: the company counts anyone who has ever used the app up
//! to the target date, a unit counts only employees active during that week.

use std::collections::{BTreeMap, HashSet};

use analytics_core::{
    rate, ActivationEvent, CoverageCompanyWeekly, CoverageUnitWeekly, EverUsedRecord, IsoWeekKey,
};
use chrono::NaiveDate;

use super::snapshot::Roster;

/// Baseline date per ISO week: the earliest activation observed in it.
pub fn week_baselines(activations: &[ActivationEvent]) -> BTreeMap<IsoWeekKey, NaiveDate> {
    let mut baselines: BTreeMap<IsoWeekKey, NaiveDate> = BTreeMap::new();
    for event in activations {
        baselines
            .entry(IsoWeekKey::of(event.date))
            .and_modify(|d| *d = (*d).min(event.date))
            .or_insert(event.date);
    }
    baselines
}

pub fn company_weekly(
    roster: &Roster<'_>,
    baselines: &BTreeMap<IsoWeekKey, NaiveDate>,
    ever_used: &[EverUsedRecord],
    target_date: NaiveDate,
) -> Vec<CoverageCompanyWeekly> {
    let users: HashSet<&str> = ever_used
        .iter()
        .filter(|r| r.first_active <= target_date)
        .map(|r| r.emp_id.as_str())
        .collect();

    baselines
        .iter()
        .map(|(week, &baseline)| {
            let employed = roster.employed_ids(baseline);
            let covered = employed.iter().filter(|id| users.contains(*id)).count() as u64;
            let total = employed.len() as u64;
            CoverageCompanyWeekly {
                week: *week,
                baseline_date: baseline,
                covered_users: covered,
                total_users: total,
                coverage_rate: rate(covered, total),
            }
        })
        .collect()
}

pub fn unit_weekly(
    roster: &Roster<'_>,
    baselines: &BTreeMap<IsoWeekKey, NaiveDate>,
    activations: &[ActivationEvent],
) -> Vec<CoverageUnitWeekly> {
    let mut active_by_week: BTreeMap<IsoWeekKey, HashSet<&str>> = BTreeMap::new();
    for event in activations {
        active_by_week
            .entry(IsoWeekKey::of(event.date))
            .or_default()
            .insert(event.emp_id.as_str());
    }

    let mut rows = Vec::new();
    for (week, &baseline) in baselines {
        let active = active_by_week.get(week);

        // unit id -> (unit name, employed ids, covered ids)
        let mut units: BTreeMap<Option<&str>, (&str, HashSet<&str>, HashSet<&str>)> =
            BTreeMap::new();
        for employee in roster.employed_on(baseline) {
            let entry = units
                .entry(employee.agg_unit_id())
                .or_insert_with(|| (employee.agg_unit_name(), HashSet::new(), HashSet::new()));
            entry.1.insert(employee.emp_id.as_str());
            if active.is_some_and(|ids| ids.contains(employee.emp_id.as_str())) {
                entry.2.insert(employee.emp_id.as_str());
            }
        }

        for (unit_id, (unit_name, employed, covered)) in units {
            let total = employed.len() as u64;
            if total == 0 {
                continue;
            }
            let covered = covered.len() as u64;
            rows.push(CoverageUnitWeekly {
                week: *week,
                baseline_date: baseline,
                unit_id: unit_id.map(str::to_string),
                unit_name: unit_name.to_string(),
                covered_users: covered,
                total_users: total,
                coverage_rate: rate(covered, total),
            });
        }
    }
    rows
}
