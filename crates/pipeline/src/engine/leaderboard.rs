//! Top senders over the extract window.

use std::collections::HashMap;

use analytics_core::{MessageEvent, MessageLeaderboardEntry, UNDEFINED_UNIT_NAME};

use super::snapshot::Roster;

pub const LEADERBOARD_SIZE: usize = 10;

pub fn message_leaderboard(roster: &Roster<'_>, messages: &[MessageEvent]) -> Vec<MessageLeaderboardEntry> {
    let mut totals: HashMap<&str, u64> = HashMap::new();
    for event in messages {
        *totals.entry(event.emp_id.as_str()).or_default() += event.count;
    }

    let mut ranked: Vec<(&str, u64)> = totals.into_iter().filter(|(_, total)| *total > 0).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    ranked
        .into_iter()
        .take(LEADERBOARD_SIZE)
        .enumerate()
        .map(|(idx, (emp_id, total))| {
            let employee = roster.get(emp_id);
            MessageLeaderboardEntry {
                rank: idx as u32 + 1,
                emp_id: emp_id.to_string(),
                unit_id: employee.and_then(|e| e.agg_unit_id()).map(str::to_string),
                unit_name: employee
                    .map(|e| e.agg_unit_name())
                    .unwrap_or(UNDEFINED_UNIT_NAME)
                    .to_string(),
                total_messages: total,
            }
        })
        .collect()
}
