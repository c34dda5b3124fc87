//! Tracing setup for structured logging.
//!
//! Console output goes to stderr in either a human-readable or JSON format.
//! An optional log file receives plain-text output under its own filter, so
//! a batch host can keep debug detail on disk while the console stays quiet.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter, Layer,
};

/// Console output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Tracing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracingConfig {
    /// Console filter (e.g., "info", "pipeline=debug")
    #[serde(default = "default_filter")]
    pub filter: String,
    #[serde(default)]
    pub format: LogFormat,
    /// Whether to log span open/close
    #[serde(default)]
    pub span_events: bool,
    /// Append plain-text logs to this file as well
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Filter for the log file; falls back to `filter`
    #[serde(default)]
    pub file_filter: Option<String>,
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            format: LogFormat::Pretty,
            span_events: false,
            file: None,
            file_filter: None,
        }
    }
}

impl TracingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_span_events(mut self, span_events: bool) -> Self {
        self.span_events = span_events;
        self
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    pub fn file_filter(&self) -> &str {
        self.file_filter.as_deref().unwrap_or(&self.filter)
    }
}

#[derive(Debug, Error)]
pub enum TracingError {
    #[error("cannot open log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("tracing already initialized: {0}")]
    Init(#[from] TryInitError),
}

/// Initialize tracing with the given configuration.
///
/// `RUST_LOG` takes precedence over the configured console filter. Fails if
/// the log file cannot be opened or a global subscriber is already set.
pub fn init_tracing(config: &TracingConfig) -> Result<(), TracingError> {
    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let console_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let (json_layer, pretty_layer) = match config.format {
        LogFormat::Json => (
            Some(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_span_events(span_events)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_filter(console_filter),
            ),
            None,
        ),
        LogFormat::Pretty => (
            None,
            Some(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_span_events(span_events)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .with_filter(console_filter),
            ),
        ),
    };

    let file_layer = match &config.file {
        Some(path) => {
            let file = open_log_file(path)?;
            let filter =
                EnvFilter::try_new(config.file_filter()).unwrap_or_else(|_| EnvFilter::new("info"));
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(true)
                    .with_filter(filter),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(json_layer)
        .with(pretty_layer)
        .with(file_layer)
        .try_init()?;

    tracing::debug!(
        filter = %config.filter,
        file = ?config.file,
        "Tracing initialized"
    );
    Ok(())
}

fn open_log_file(path: &Path) -> Result<File, TracingError> {
    let to_err = |source| TracingError::LogFile {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(to_err)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(to_err)
}
