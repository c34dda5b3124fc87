//! Analytical store configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// DuckDB store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database file, created with its parent directories on first open
    #[serde(default = "default_path")]
    pub path: PathBuf,
    /// Worker threads DuckDB may use
    #[serde(default)]
    pub threads: Option<u32>,
    /// Memory cap, e.g. `"1GB"`
    #[serde(default)]
    pub memory_limit: Option<String>,
}

fn default_path() -> PathBuf {
    PathBuf::from("./data/duck_cache.duckdb")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            threads: None,
            memory_limit: None,
        }
    }
}

impl StoreConfig {
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// Session pragmas applied after opening.
    pub fn pragmas(&self) -> String {
        let mut sql = String::new();
        if let Some(threads) = self.threads {
            sql.push_str(&format!("PRAGMA threads={};\n", threads));
        }
        if let Some(ref limit) = self.memory_limit {
            sql.push_str(&format!(
                "PRAGMA memory_limit='{}';\n",
                limit.replace('\'', "''")
            ));
        }
        sql
    }
}
