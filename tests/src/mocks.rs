//! Mock implementations for testing.

use std::collections::HashMap;
use std::sync::Arc;

use analytics_core::{Error, Result, Table};
use async_trait::async_trait;
use parking_lot::Mutex;
use sqlserver_client::{QueryParams, SourceReader};

/// A query the pipeline sent to the source.
#[derive(Debug, Clone)]
pub struct CapturedQuery {
    pub name: String,
    pub sql: String,
    pub params: QueryParams,
}

/// Source that serves canned tables by extract name.
///
/// Implements the same `SourceReader` trait as `SqlServerSource`, so the
/// pipeline runs its real extract path against in-memory data.
#[derive(Clone, Default)]
pub struct MockSource {
    tables: Arc<Mutex<HashMap<String, Table>>>,
    queries: Arc<Mutex<Vec<CapturedQuery>>>,
    /// Extract name that should fail, or `"*"` for all.
    fail_on: Arc<Mutex<Option<String>>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `table` for every fetch of extract `name`.
    pub fn with_table(self, name: &str, table: Table) -> Self {
        self.set_table(name, table);
        self
    }

    pub fn set_table(&self, name: &str, table: Table) {
        self.tables.lock().insert(name.to_string(), table);
    }

    /// Get all captured queries.
    pub fn captured_queries(&self) -> Vec<CapturedQuery> {
        self.queries.lock().clone()
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().len()
    }

    /// Simulate a connectivity failure on one extract (`"*"` for every fetch).
    pub fn fail_on(&self, name: &str) {
        *self.fail_on.lock() = Some(name.to_string());
    }

    pub fn clear_failure(&self) {
        *self.fail_on.lock() = None;
    }
}

#[async_trait]
impl SourceReader for MockSource {
    async fn fetch(&self, name: &str, query: &str, params: &QueryParams) -> Result<Table> {
        self.queries.lock().push(CapturedQuery {
            name: name.to_string(),
            sql: query.to_string(),
            params: params.clone(),
        });

        let failing = self
            .fail_on
            .lock()
            .as_deref()
            .is_some_and(|target| target == "*" || target == name);
        if failing {
            return Err(Error::connectivity(format!("mock source unavailable for '{}'", name)));
        }

        self.tables
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::query(format!("mock source has no table '{}'", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_source_captures_and_fails() {
        let source = MockSource::new().with_table("employees", Table::new("employees", vec![]));

        source
            .fetch("employees", "SELECT 1", &QueryParams::new())
            .await
            .unwrap();
        assert_eq!(source.query_count(), 1);

        source.fail_on("employees");
        let err = source
            .fetch("employees", "SELECT 1", &QueryParams::new())
            .await
            .unwrap_err();
        assert!(err.is_retryable());

        source.clear_failure();
        assert!(source
            .fetch("messages", "SELECT 1", &QueryParams::new())
            .await
            .is_err());
    }
}
