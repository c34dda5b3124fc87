//! 20/60/20 concentration of weekly message volume.

use std::collections::{BTreeMap, HashMap};

use analytics_core::{is_working_day, IsoWeekKey, MessageDistributionWeekly, MessageEvent, Segment};

/// Band sizes for `n` ranked users: `(top, mid, bottom)`.
///
/// `top = max(round(0.2n), 1)`, `mid = max(round(0.6n), 0)` clamped so the
/// bands never exceed `n`, and bottom takes the remainder.
pub fn band_sizes(n: usize) -> (usize, usize, usize) {
    let top = ((n as f64 * 0.2).round() as usize).max(1);
    let mut mid = (n as f64 * 0.6).round() as usize;
    if top + mid > n {
        mid = n.saturating_sub(top);
    }
    let bottom = n.saturating_sub(top + mid);
    (top, mid, bottom)
}

/// Splits one group's per-user counts into the three bands.
///
/// Users are ranked by count descending, ties broken by id ascending.
/// Returns `None` for groups with no users or no messages.
pub fn split(counts: &[(&str, u64)]) -> Option<[(Segment, u64, u64, f64); 3]> {
    let total: u64 = counts.iter().map(|(_, c)| c).sum();
    if counts.is_empty() || total == 0 {
        return None;
    }

    let mut ranked = counts.to_vec();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let (top, mid, bottom) = band_sizes(ranked.len());
    let bands = [
        (Segment::Top20, 0, top),
        (Segment::Mid60, top, top + mid),
        (Segment::Bottom20, top + mid, top + mid + bottom),
    ];

    Some(bands.map(|(segment, from, to)| {
        let sum: u64 = ranked[from..to].iter().map(|(_, c)| c).sum();
        let share = sum as f64 / total as f64 * 100.0;
        (segment, (to - from) as u64, sum, share)
    }))
}

/// Weekly 20/60/20 rows over working-day messages.
pub fn weekly_distribution(messages: &[MessageEvent]) -> Vec<MessageDistributionWeekly> {
    let mut weeks: BTreeMap<IsoWeekKey, HashMap<&str, u64>> = BTreeMap::new();
    for event in messages.iter().filter(|m| is_working_day(m.date)) {
        *weeks
            .entry(IsoWeekKey::of(event.date))
            .or_default()
            .entry(event.emp_id.as_str())
            .or_default() += event.count;
    }

    let mut rows = Vec::new();
    for (week, per_user) in weeks {
        let counts: Vec<(&str, u64)> = per_user.into_iter().collect();
        let Some(bands) = split(&counts) else {
            continue;
        };
        rows.extend(
            bands
                .into_iter()
                .map(|(segment, users, sum, share)| MessageDistributionWeekly {
                    week,
                    segment,
                    user_count: users,
                    message_sum: sum,
                    share_percent: share,
                }),
        );
    }
    rows
}
