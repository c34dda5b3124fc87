//! SQL Server connection configuration.

use analytics_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tiberius::{AuthMethod, EncryptionLevel};

/// Source database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlServerConfig {
    /// Server host name
    #[serde(default)]
    pub host: String,
    /// TDS port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Database name
    #[serde(default)]
    pub database: String,
    /// SQL login
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Require TLS for the whole session
    #[serde(default)]
    pub encrypt: bool,
    /// Accept the server certificate without validation
    #[serde(default = "default_true")]
    pub trust_cert: bool,
    /// Application name reported to the server
    #[serde(default = "default_application_name")]
    pub application_name: String,
    /// Login timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Session query timeout in seconds
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
    /// Connection attempts after the first failure
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Fixed pause between connection attempts
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_port() -> u16 {
    1433
}

fn default_true() -> bool {
    true
}

fn default_application_name() -> String {
    "usage-etl".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_query_timeout_secs() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    2000
}

impl Default for SqlServerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_port(),
            database: String::new(),
            username: String::new(),
            password: String::new(),
            encrypt: false,
            trust_cert: default_true(),
            application_name: default_application_name(),
            connect_timeout_secs: default_connect_timeout_secs(),
            query_timeout_secs: default_query_timeout_secs(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl SqlServerConfig {
    /// Fails fast when any mandatory connection parameter is missing.
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("host", self.host.trim()),
            ("database", self.database.trim()),
            ("username", self.username.trim()),
            ("password", self.password.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(Error::configuration(format!(
                "source connection is incomplete, missing: {}",
                missing.join(", ")
            )));
        }
        if self.query_timeout_secs == 0 || self.connect_timeout_secs == 0 {
            return Err(Error::configuration("source timeouts must be positive"));
        }
        Ok(())
    }

    /// Builds the TDS client configuration.
    pub fn to_tds_config(&self) -> tiberius::Config {
        let mut config = tiberius::Config::new();
        config.host(&self.host);
        config.port(self.port);
        config.database(&self.database);
        config.application_name(&self.application_name);
        config.authentication(AuthMethod::sql_server(&self.username, &self.password));
        config.encryption(if self.encrypt {
            EncryptionLevel::Required
        } else {
            EncryptionLevel::Off
        });
        if self.trust_cert {
            config.trust_cert();
        }
        config
    }
}
