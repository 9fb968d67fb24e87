//! Database connection management and row transport.
//!
//! The `Backend` trait is the seam between the collection orchestrator and
//! the server: production code uses [`PgBackend`], tests use the scripted
//! [`MockBackend`](super::mock::MockBackend).
//!
//! All introspection statements go through the simple-query protocol so
//! every value arrives as text. That matches the folding model in
//! [`metrics`](super::metrics): column values are parsed leniently into
//! integers, and a single code path serves every result shape.

use std::time::{Duration, Instant};

use postgres::{Client, NoTls, SimpleQueryMessage};
use tracing::debug;

use super::QueryName;
use crate::config::CollectorConfig;

/// Maximum age of a connection before it is closed and reopened.
const MAX_CONNECTION_LIFETIME: Duration = Duration::from_secs(10 * 60);

/// One result row with owned column names and text values.
///
/// NULL values are `None`, mirroring nullable text scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRow {
    columns: Vec<String>,
    values: Vec<Option<String>>,
}

impl TextRow {
    pub fn new(columns: Vec<String>, values: Vec<Option<String>>) -> Self {
        Self { columns, values }
    }

    /// Column names, in result order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Value at position `idx`; `None` for NULL or out of range.
    pub fn get(&self, idx: usize) -> Option<&str> {
        self.values.get(idx).and_then(|v| v.as_deref())
    }

    /// Value of the named column; `None` for NULL or unknown column.
    pub fn by_name(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| self.get(idx))
    }
}

/// Abstraction over the database connection.
///
/// The orchestrator owns exactly one backend and drives it from a single
/// thread; implementations do not need to be thread-safe.
pub trait Backend {
    /// Ensures a live connection exists, opening one if needed.
    ///
    /// Returns the failure message if the connection cannot be established
    /// or the liveness probe fails; the backend must then be left in the
    /// disconnected state so the next cycle retries from scratch.
    fn ensure_connected(&mut self) -> Result<(), String>;

    /// Executes one introspection statement and returns its rows as text.
    ///
    /// `query` is the logical name of the statement, used for logging and
    /// mock dispatch; `sql` is the statement text from the query catalog.
    fn fetch(&mut self, query: QueryName, sql: &str) -> Result<Vec<TextRow>, String>;

    /// Drops the current connection, if any.
    fn disconnect(&mut self);
}

/// Production backend over a single synchronous PostgreSQL connection.
///
/// The connection is opened lazily, probed with `SELECT 1` on open, and
/// recycled once it exceeds [`MAX_CONNECTION_LIFETIME`]. The per-query
/// budget is enforced with a `statement_timeout` session option plus a
/// connect timeout; a timed-out query fails on its own without tearing
/// the connection down.
pub struct PgBackend {
    conninfo: String,
    query_timeout: Duration,
    client: Option<Client>,
    opened_at: Option<Instant>,
}

impl PgBackend {
    pub fn new(config: &CollectorConfig) -> Self {
        Self {
            conninfo: config.conninfo.clone(),
            query_timeout: config.query_timeout,
            client: None,
            opened_at: None,
        }
    }

    fn open(&mut self) -> Result<(), String> {
        let mut pg_config: postgres::Config = self
            .conninfo
            .parse()
            .map_err(|e: postgres::Error| format!("invalid connection string: {}", e))?;

        pg_config
            .connect_timeout(self.query_timeout)
            .options(&format!(
                "-c statement_timeout={}",
                self.query_timeout.as_millis()
            ));

        let mut client = match pg_config.connect(NoTls) {
            Ok(client) => client,
            Err(e) => return Err(format_postgres_error(&e)),
        };

        // Liveness probe within the same timeout budget. On failure the
        // half-open client is dropped and we stay disconnected.
        if let Err(e) = client.simple_query("SELECT 1") {
            return Err(format!("ping failed: {}", format_postgres_error(&e)));
        }

        self.client = Some(client);
        self.opened_at = Some(Instant::now());
        debug!("connection established");
        Ok(())
    }
}

impl Backend for PgBackend {
    fn ensure_connected(&mut self) -> Result<(), String> {
        if let Some(opened_at) = self.opened_at
            && opened_at.elapsed() > MAX_CONNECTION_LIFETIME
        {
            debug!("connection exceeded max lifetime, reopening");
            self.disconnect();
        }

        if self.client.is_some() {
            return Ok(());
        }

        self.open()
    }

    fn fetch(&mut self, query: QueryName, sql: &str) -> Result<Vec<TextRow>, String> {
        let Some(client) = self.client.as_mut() else {
            return Err("not connected".to_string());
        };

        match client.simple_query(sql) {
            Ok(messages) => {
                let rows: Vec<TextRow> = messages
                    .iter()
                    .filter_map(|message| match message {
                        SimpleQueryMessage::Row(row) => {
                            let columns = row
                                .columns()
                                .iter()
                                .map(|c| c.name().to_string())
                                .collect();
                            let values = (0..row.len())
                                .map(|i| row.get(i).map(str::to_string))
                                .collect();
                            Some(TextRow::new(columns, values))
                        }
                        _ => None,
                    })
                    .collect();
                debug!(query = %query, rows = rows.len(), "query executed");
                Ok(rows)
            }
            Err(e) => {
                let message = format_postgres_error(&e);
                if e.is_closed() {
                    // The stream itself died; force a full reopen next cycle.
                    self.disconnect();
                }
                Err(message)
            }
        }
    }

    fn disconnect(&mut self) {
        self.client = None;
        self.opened_at = None;
    }
}

/// Formats a PostgreSQL error message for display.
pub(crate) fn format_postgres_error(e: &postgres::Error) -> String {
    if let Some(db_error) = e.as_db_error() {
        format!("{}: {}", db_error.severity(), db_error.message())
    } else {
        let msg = e.to_string();
        if msg.contains("Connection refused") {
            "connection refused".to_string()
        } else if msg.contains("password authentication failed") {
            "password authentication failed".to_string()
        } else if msg.contains("does not exist") {
            msg.split("FATAL:").last().unwrap_or(&msg).trim().to_string()
        } else {
            msg
        }
    }
}
