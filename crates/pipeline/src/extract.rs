//! Extract stage: pull the four raw tables from the source.

use analytics_core::{Result, Table};
use chrono::NaiveDate;
use sqlserver_client::{Extract, QueryParams, SourceReader, START_DATE, TARGET_DATE};
use tracing::info;

/// Raw tables as returned by the source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extracts {
    pub employees: Table,
    pub daily_active: Table,
    pub messages: Table,
    pub ever_used: Table,
}

impl Extracts {
    /// `(name, rows)` for each extract, in fetch order.
    pub fn row_counts(&self) -> Vec<(&str, usize)> {
        vec![
            (Extract::Employees.name(), self.employees.len()),
            (Extract::DailyActive.name(), self.daily_active.len()),
            (Extract::Messages.name(), self.messages.len()),
            (Extract::EverUsed.name(), self.ever_used.len()),
        ]
    }
}

/// Query parameters for a run. `start_date` is bound only for incremental runs.
pub fn query_params(target_date: NaiveDate, start_date: Option<NaiveDate>) -> QueryParams {
    let mut params = QueryParams::new().with(TARGET_DATE, target_date);
    if let Some(start) = start_date {
        params.insert(START_DATE, start);
    }
    params
}

/// Fetches every extract sequentially over the source's single connection.
pub async fn extract<S>(
    source: &S,
    target_date: NaiveDate,
    start_date: Option<NaiveDate>,
) -> Result<Extracts>
where
    S: SourceReader + ?Sized,
{
    let params = query_params(target_date, start_date);
    let incremental = start_date.is_some();

    let extracts = Extracts {
        employees: fetch(source, Extract::Employees, incremental, &params).await?,
        daily_active: fetch(source, Extract::DailyActive, incremental, &params).await?,
        messages: fetch(source, Extract::Messages, incremental, &params).await?,
        ever_used: fetch(source, Extract::EverUsed, incremental, &params).await?,
    };

    for (name, rows) in extracts.row_counts() {
        info!(extract = name, rows, "Extracted");
    }
    Ok(extracts)
}

async fn fetch<S>(
    source: &S,
    extract: Extract,
    incremental: bool,
    params: &QueryParams,
) -> Result<Table>
where
    S: SourceReader + ?Sized,
{
    source
        .fetch(extract.name(), &extract.sql(incremental), params)
        .await
}
