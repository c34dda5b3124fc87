//! Store health checks.

use tracing::{debug, error};

use crate::client::DuckDbStore;

/// Check the store answers a trivial query.
pub fn check_connection(store: &DuckDbStore) -> bool {
    match store.query_scalar::<i32>("SELECT 1") {
        Ok(_) => {
            debug!("DuckDB store healthy");
            true
        }
        Err(e) => {
            error!("DuckDB health check failed: {}", e);
            false
        }
    }
}
