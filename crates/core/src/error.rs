//! Unified error types for the usage analytics pipeline.
//!
//! The taxonomy maps one-to-one onto the failure classes a run can hit:
//! - configuration: missing or invalid connection parameters, never retried
//! - connectivity: transient network/auth failures talking to the source
//! - validation: extracts missing a required column or dimension
//! - storage write: a failed table write, rolled back before surfacing

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the pipeline.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("connectivity error: {0}")]
    Connectivity(String),

    #[error("source query error: {0}")]
    Query(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("validation error: table '{table}' is missing required column '{column}'")]
    MissingColumn { table: String, column: String },

    #[error("storage write error on '{table}': {message}")]
    StorageWrite { table: String, message: String },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn connectivity(msg: impl Into<String>) -> Self {
        Self::Connectivity(msg.into())
    }

    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn missing_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::MissingColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    pub fn storage_write(table: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::StorageWrite {
            table: table.into(),
            message: msg.into(),
        }
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Only connectivity failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connectivity(_))
    }

    /// Short machine-readable class name, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Connectivity(_) => "connectivity",
            Self::Query(_) => "query",
            Self::Validation(_) | Self::MissingColumn { .. } => "validation",
            Self::StorageWrite { .. } => "storage_write",
            Self::Storage(_) => "storage",
            Self::Internal(_) => "internal",
        }
    }
}
