//! Application configuration.
//!
//! Layered like this: serialized defaults, then `config/default.toml` (or the
//! `--config` file), then `USAGE__SECTION__KEY` environment variables, then the
//! flat `SOURCE_DB_*` / `DUCKDB_PATH` / `ETL_*` / `LOG_*` variables.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use duckdb_client::{StoreConfig, WriteMode};
use serde::{Deserialize, Serialize};
use sqlserver_client::SqlServerConfig;
use telemetry::{LogFormat, TracingConfig};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub source: SqlServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub etl: EtlConfig,
    #[serde(default)]
    pub logging: TracingConfig,
}

/// Run defaults for the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EtlConfig {
    /// Window for incremental runs
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
    /// Fixed start of the retention denominator
    #[serde(default = "default_retention_baseline")]
    pub retention_baseline: NaiveDate,
    #[serde(default)]
    pub write_mode: WriteMode,
}

const DEFAULT_LOG_FILE: &str = "logs/etl.log";

fn default_lookback_days() -> u32 {
    90
}

fn default_retention_baseline() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default()
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback_days(),
            retention_baseline: default_retention_baseline(),
            write_mode: WriteMode::default(),
        }
    }
}

/// Load configuration from files and environment.
pub fn load(path: Option<&Path>) -> Result<AppConfig> {
    let file = match path {
        Some(path) => config::File::from(path).required(true),
        None => config::File::with_name("config/default").required(false),
    };

    let config = config::Config::builder()
        .add_source(config::Config::try_from(&AppConfig::default())?)
        .add_source(file.format(config::FileFormat::Toml))
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("USAGE")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: AppConfig = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}

/// Applies the flat environment variables the deployment scripts set.
pub fn apply_env_overrides<F>(config: &mut AppConfig, var: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let source = &mut config.source;
    if let Some(host) = var("SOURCE_DB_HOST") {
        source.host = host;
    }
    if let Some(port) = var("SOURCE_DB_PORT") {
        source.port = port.trim().parse().context("SOURCE_DB_PORT must be a port number")?;
    }
    if let Some(database) = var("SOURCE_DB_NAME") {
        source.database = database;
    }
    if let Some(username) = var("SOURCE_DB_USER") {
        source.username = username;
    }
    if let Some(password) = var("SOURCE_DB_PASSWORD") {
        source.password = password;
    }
    if let Some(encrypt) = var("SOURCE_DB_ENCRYPT") {
        source.encrypt = parse_flag(&encrypt);
    }
    if let Some(trust) = var("SOURCE_DB_TRUST_CERT") {
        source.trust_cert = parse_flag(&trust);
    }
    if let Some(app) = var("SOURCE_DB_APPNAME") {
        source.application_name = app;
    }
    if let Some(timeout) = var("SOURCE_DB_TIMEOUT") {
        source.connect_timeout_secs = timeout
            .trim()
            .parse()
            .context("SOURCE_DB_TIMEOUT must be whole seconds")?;
    }
    if let Some(timeout) = var("SOURCE_DB_QUERY_TIMEOUT") {
        source.query_timeout_secs = timeout
            .trim()
            .parse()
            .context("SOURCE_DB_QUERY_TIMEOUT must be whole seconds")?;
    }

    if let Some(path) = var("DUCKDB_PATH") {
        config.store.path = path.into();
    }

    if let Some(days) = var("ETL_LOOKBACK_DAYS") {
        config.etl.lookback_days = days
            .trim()
            .parse()
            .context("ETL_LOOKBACK_DAYS must be a day count")?;
    }
    if let Some(baseline) = var("ETL_RETENTION_BASELINE") {
        config.etl.retention_baseline = NaiveDate::parse_from_str(baseline.trim(), "%Y-%m-%d")
            .context("ETL_RETENTION_BASELINE must be YYYY-MM-DD")?;
    }

    if let Some(level) = var("LOG_LEVEL") {
        config.logging.filter = level.to_lowercase();
    }
    if let Some(json) = var("LOG_JSON") {
        config.logging.format = if parse_flag(&json) {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        };
    }
    if let Some(enabled) = var("LOG_FILE_ENABLED") {
        config.logging.file = parse_flag(&enabled).then(|| {
            var("LOG_FILE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE))
        });
    } else if let Some(path) = var("LOG_FILE_PATH") {
        config.logging.file = Some(PathBuf::from(path));
    }
    if let Some(level) = var("LOG_FILE_LEVEL") {
        config.logging.file_filter = Some(level.to_lowercase());
    }
    Ok(())
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
