//! Internal telemetry for the usage analytics pipeline.
//!
//! Structured logging via `tracing`, plus in-process counters that summarize
//! each pipeline run.

pub mod metrics;
pub mod tracing_setup;

pub use metrics::*;
pub use tracing_setup::*;
