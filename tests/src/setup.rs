//! Test setup and context.

use std::sync::Arc;

use duckdb_client::DuckDbStore;
use pipeline::{PipelineOptions, UsagePipeline};
use sqlserver_client::Extract;

use crate::fixtures::{self, date, RETENTION_BASELINE, TARGET_DATE};
use crate::mocks::MockSource;

/// Wires a mock source loaded with the January scenario to an in-memory store.
pub struct TestContext {
    pub source: Arc<MockSource>,
    pub store: Arc<DuckDbStore>,
}

impl TestContext {
    pub fn new() -> Self {
        let source = MockSource::new()
            .with_table(Extract::Employees.name(), fixtures::scenario_employees())
            .with_table(Extract::DailyActive.name(), fixtures::scenario_daily_active())
            .with_table(Extract::Messages.name(), fixtures::scenario_messages())
            .with_table(Extract::EverUsed.name(), fixtures::scenario_ever_used());
        let store = DuckDbStore::open_in_memory().unwrap();

        Self {
            source: Arc::new(source),
            store: Arc::new(store),
        }
    }

    /// Options for the scenario's target date and retention baseline.
    pub fn options(&self) -> PipelineOptions {
        PipelineOptions::new(date(TARGET_DATE), date(RETENTION_BASELINE))
    }

    pub fn pipeline(&self, options: PipelineOptions) -> UsagePipeline<MockSource> {
        UsagePipeline::new(self.source.clone(), self.store.clone(), options)
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
