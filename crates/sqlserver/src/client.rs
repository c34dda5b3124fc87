//! SQL Server source client.

use std::time::{Duration, Instant};

use analytics_core::{Error, Result, Table};
use async_trait::async_trait;
use telemetry::metrics;
use tiberius::{Client, Query};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info, warn};

use crate::config::SqlServerConfig;
use crate::convert;
use crate::params::{bind_named, QueryParams};

type TdsClient = Client<Compat<TcpStream>>;

/// Read side of the pipeline: run a parameterized query and return a table.
#[async_trait]
pub trait SourceReader: Send + Sync {
    async fn fetch(&self, name: &str, query: &str, params: &QueryParams) -> Result<Table>;
}

/// Single lazily-opened connection to the source database.
///
/// Connection attempts are retried with a fixed backoff. Query failures are
/// never retried; a failure on the wire drops the connection so the next
/// fetch reconnects.
pub struct SqlServerSource {
    config: SqlServerConfig,
    conn: Mutex<Option<TdsClient>>,
}

impl SqlServerSource {
    /// Creates a source client. No network traffic happens until the first fetch.
    pub fn new(config: SqlServerConfig) -> Result<Self> {
        config.validate()?;

        info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            "Created SQL Server source"
        );

        Ok(Self {
            config,
            conn: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &SqlServerConfig {
        &self.config
    }

    async fn connect_once(&self) -> Result<TdsClient> {
        let tds_config = self.config.to_tds_config();
        let addr = tds_config.get_addr();
        let limit = Duration::from_secs(self.config.connect_timeout_secs);

        let connect = async {
            let tcp = TcpStream::connect(&addr)
                .await
                .map_err(|e| Error::connectivity(format!("tcp connect to {} failed: {}", addr, e)))?;
            tcp.set_nodelay(true)
                .map_err(|e| Error::connectivity(format!("socket setup failed: {}", e)))?;

            let mut client = Client::connect(tds_config, tcp.compat_write())
                .await
                .map_err(|e| Error::connectivity(format!("login to {} failed: {}", addr, e)))?;

            let session = format!(
                "SET LOCK_TIMEOUT {}",
                self.config.query_timeout_secs.saturating_mul(1000)
            );
            client
                .simple_query(session)
                .await
                .map_err(|e| Error::connectivity(format!("session setup failed: {}", e)))?
                .into_results()
                .await
                .map_err(|e| Error::connectivity(format!("session setup failed: {}", e)))?;

            Ok(client)
        };

        tokio::time::timeout(limit, connect)
            .await
            .map_err(|_| Error::connectivity(format!("connect to {} timed out after {:?}", addr, limit)))?
    }

    async fn connect_with_retry(&self) -> Result<TdsClient> {
        let attempts = self.config.max_retries + 1;
        let backoff = Duration::from_millis(self.config.retry_backoff_ms);
        let mut last_error = None;

        for attempt in 1..=attempts {
            if attempt > 1 {
                metrics().source_connect_retries.inc();
                tokio::time::sleep(backoff).await;
            }

            match self.connect_once().await {
                Ok(client) => {
                    info!(attempt, host = %self.config.host, "Connected to source database");
                    return Ok(client);
                }
                Err(e) => {
                    warn!(attempt, attempts, error = %e, "Source connection attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(Error::connectivity(format!(
            "could not connect after {} attempts: {}",
            attempts,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }
}

#[async_trait]
impl SourceReader for SqlServerSource {
    async fn fetch(&self, name: &str, query: &str, params: &QueryParams) -> Result<Table> {
        let bound = bind_named(query, params)?;
        let limit = Duration::from_secs(self.config.query_timeout_secs);

        let mut guard = self.conn.lock().await;
        if guard.is_none() {
            *guard = Some(self.connect_with_retry().await?);
        }
        let client = guard
            .as_mut()
            .ok_or_else(|| Error::internal("source connection missing after connect"))?;

        let start = Instant::now();
        metrics().source_queries.inc();

        let mut statement = Query::new(bound.sql);
        for value in bound.values {
            statement.bind(value);
        }

        let outcome = tokio::time::timeout(limit, async {
            let mut stream = statement.query(client).await?;
            let columns: Vec<String> = stream
                .columns()
                .await?
                .map(|cols| cols.iter().map(|c| c.name().to_string()).collect())
                .unwrap_or_default();
            let rows = stream.into_first_result().await?;
            Ok::<_, tiberius::error::Error>((columns, rows))
        })
        .await;

        let (columns, rows) = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                let lost = is_connection_error(&e);
                if lost {
                    *guard = None;
                }
                warn!(extract = name, error = %e, connection_dropped = lost, "Source query failed");
                return Err(if lost {
                    Error::connectivity(format!("connection lost during '{}': {}", name, e))
                } else {
                    Error::query(format!("extract '{}' failed: {}", name, e))
                });
            }
            Err(_) => {
                *guard = None;
                warn!(extract = name, timeout = ?limit, "Source query timed out");
                return Err(Error::query(format!(
                    "extract '{}' timed out after {:?}",
                    name, limit
                )));
            }
        };
        drop(guard);

        let table = convert::to_table(name, columns, rows)?;
        metrics().rows_extracted.inc_by(table.len() as u64);
        debug!(
            extract = name,
            rows = table.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fetched extract"
        );
        Ok(table)
    }
}

fn is_connection_error(e: &tiberius::error::Error) -> bool {
    matches!(
        e,
        tiberius::error::Error::Io { .. }
            | tiberius::error::Error::Tls(_)
            | tiberius::error::Error::Routing { .. }
    )
}
