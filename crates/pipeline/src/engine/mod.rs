//! Aggregation engine: raw extracts in, derived metric tables out.
//!
//! Everything here is a pure function of the parsed extracts, the target
//! date, and the retention baseline.

pub mod activity;
pub mod coverage;
pub mod cohort;
pub mod distribution;
pub mod leaderboard;
pub mod messages;
pub mod retention;
pub mod snapshot;

use analytics_core::{
    to_table, ActivationEvent, ActivationNextMonthCompany, ActiveRateDaily, CoverageCompanyWeekly,
    CoverageUnitWeekly, EmployeeRecord, Error, EverUsedRecord, MessageDistributionWeekly,
    MessageEvent, MessageLeaderboardEntry, MessagesWeeklyPerCapita, MessagesWeeklyTotal, Result,
    RetentionMonthlyCompany, Table, TableRow,
};
use chrono::NaiveDate;
use tracing::debug;

use crate::extract::Extracts;
use snapshot::Roster;

/// Typed records parsed from the raw extracts.
#[derive(Debug, Clone, Default)]
pub struct EngineInputs {
    pub employees: Vec<EmployeeRecord>,
    pub activations: Vec<ActivationEvent>,
    pub messages: Vec<MessageEvent>,
    pub ever_used: Vec<EverUsedRecord>,
}

impl EngineInputs {
    /// Validates and parses every extract. Missing columns and malformed
    /// values fail here, before any ratio is computed.
    pub fn from_extracts(extracts: &Extracts) -> Result<Self> {
        let inputs = Self {
            employees: EmployeeRecord::from_table(&extracts.employees)?,
            activations: ActivationEvent::from_table(&extracts.daily_active)?,
            messages: MessageEvent::from_table(&extracts.messages)?,
            ever_used: EverUsedRecord::from_table(&extracts.ever_used)?,
        };
        if inputs.employees.is_empty() {
            return Err(Error::validation(format!(
                "table '{}' returned no roster rows",
                extracts.employees.name()
            )));
        }
        Ok(inputs)
    }
}

/// Every derived table produced by one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedTables {
    pub coverage_company: Vec<CoverageCompanyWeekly>,
    pub coverage_unit: Vec<CoverageUnitWeekly>,
    pub active_rate_daily: Vec<ActiveRateDaily>,
    pub activation_next_month: Vec<ActivationNextMonthCompany>,
    pub retention_monthly: Vec<RetentionMonthlyCompany>,
    pub messages_weekly_total: Vec<MessagesWeeklyTotal>,
    pub messages_weekly_per_capita: Vec<MessagesWeeklyPerCapita>,
    pub message_distribution: Vec<MessageDistributionWeekly>,
    pub message_leaderboard: Vec<MessageLeaderboardEntry>,
}

/// A store-ready table with the key columns used for upserts.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTable {
    pub table: Table,
    pub keys: &'static [&'static str],
    /// Always written with replace, whatever the run's write mode.
    pub replace_only: bool,
}

fn output<R: TableRow>(rows: &[R]) -> Result<OutputTable> {
    Ok(OutputTable {
        table: to_table(rows)?,
        keys: R::KEYS,
        replace_only: R::REPLACE_ONLY,
    })
}

impl DerivedTables {
    /// Flattens every table in load order.
    pub fn to_tables(&self) -> Result<Vec<OutputTable>> {
        Ok(vec![
            output(&self.coverage_company)?,
            output(&self.coverage_unit)?,
            output(&self.active_rate_daily)?,
            output(&self.activation_next_month)?,
            output(&self.retention_monthly)?,
            output(&self.messages_weekly_total)?,
            output(&self.messages_weekly_per_capita)?,
            output(&self.message_distribution)?,
            output(&self.message_leaderboard)?,
        ])
    }

    pub fn row_count(&self) -> usize {
        self.coverage_company.len()
            + self.coverage_unit.len()
            + self.active_rate_daily.len()
            + self.activation_next_month.len()
            + self.retention_monthly.len()
            + self.messages_weekly_total.len()
            + self.messages_weekly_per_capita.len()
            + self.message_distribution.len()
            + self.message_leaderboard.len()
    }
}

/// Computes every derived table. Events dated after `target_date` are ignored.
pub fn transform(
    inputs: &EngineInputs,
    target_date: NaiveDate,
    retention_baseline: NaiveDate,
) -> Result<DerivedTables> {
    let activations: Vec<ActivationEvent> = inputs
        .activations
        .iter()
        .filter(|e| e.date <= target_date)
        .cloned()
        .collect();
    let messages: Vec<MessageEvent> = inputs
        .messages
        .iter()
        .filter(|m| m.date <= target_date)
        .cloned()
        .collect();

    let roster = Roster::new(&inputs.employees);
    let baselines = coverage::week_baselines(&activations);
    debug!(
        employees = roster.len(),
        activations = activations.len(),
        messages = messages.len(),
        weeks = baselines.len(),
        "Aggregating"
    );

    Ok(DerivedTables {
        coverage_company: coverage::company_weekly(&roster, &baselines, &inputs.ever_used, target_date),
        coverage_unit: coverage::unit_weekly(&roster, &baselines, &activations),
        active_rate_daily: activity::active_rate_daily(&roster, &activations),
        activation_next_month: cohort::activation_next_month(&inputs.employees, &activations, target_date)?,
        retention_monthly: retention::retention_monthly(&activations, &inputs.ever_used, retention_baseline),
        messages_weekly_total: messages::weekly_total(&messages)?,
        messages_weekly_per_capita: messages::weekly_per_capita(&roster, &messages),
        message_distribution: distribution::weekly_distribution(&messages),
        message_leaderboard: leaderboard::message_leaderboard(&roster, &messages),
    })
}
