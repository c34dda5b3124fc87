//! Source health checks.

use tracing::{debug, error};

use crate::client::{SourceReader, SqlServerSource};
use crate::params::QueryParams;

/// Check source connectivity with a trivial query.
pub async fn check_connection(source: &SqlServerSource) -> bool {
    match source.fetch("health", "SELECT 1 AS ok", &QueryParams::new()).await {
        Ok(_) => {
            debug!("Source connection healthy");
            true
        }
        Err(e) => {
            error!("Source health check failed: {}", e);
            false
        }
    }
}
