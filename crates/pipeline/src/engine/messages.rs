//! Weekly message volume over working days.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use analytics_core::{
    is_working_day, rate, IsoWeekKey, MessageEvent, MessagesWeeklyPerCapita, MessagesWeeklyTotal,
    Result,
};
use chrono::NaiveDate;

use super::snapshot::Roster;

#[derive(Default)]
struct WeekAccumulator<'a> {
    total: u64,
    senders: HashSet<&'a str>,
    days: BTreeSet<NaiveDate>,
}

fn by_week(messages: &[MessageEvent]) -> BTreeMap<IsoWeekKey, WeekAccumulator<'_>> {
    let mut weeks: BTreeMap<IsoWeekKey, WeekAccumulator<'_>> = BTreeMap::new();
    for event in messages.iter().filter(|m| is_working_day(m.date)) {
        let week = weeks.entry(IsoWeekKey::of(event.date)).or_default();
        week.total += event.count;
        week.senders.insert(event.emp_id.as_str());
        week.days.insert(event.date);
    }
    weeks
}

/// Weekly totals and distinct senders, keyed by the Monday of the week.
pub fn weekly_total(messages: &[MessageEvent]) -> Result<Vec<MessagesWeeklyTotal>> {
    by_week(messages)
        .into_iter()
        .map(|(week, acc)| {
            Ok(MessagesWeeklyTotal {
                week,
                week_start: week.monday()?,
                total_messages: acc.total,
                sender_count: acc.senders.len() as u64,
            })
        })
        .collect()
}

/// Weekly messages divided by everyone employed on any day that had messages.
pub fn weekly_per_capita(roster: &Roster<'_>, messages: &[MessageEvent]) -> Vec<MessagesWeeklyPerCapita> {
    by_week(messages)
        .into_iter()
        .map(|(week, acc)| {
            let employees = roster.employed_on_any(acc.days.iter().copied()).len() as u64;
            MessagesWeeklyPerCapita {
                week,
                total_messages: acc.total,
                employee_total: employees,
                messages_per_capita: rate(acc.total, employees),
            }
        })
        .collect()
}
