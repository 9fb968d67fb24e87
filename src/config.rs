//! Collector configuration.
//!
//! The connection target comes from the standard libpq environment
//! variables; timeouts and refresh intervals have daemon-friendly defaults
//! and builder-style overrides.

use std::time::Duration;

use crate::collector::CollectError;

/// Default budget for a single introspection query (also used as the
/// connect/ping timeout).
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(2);

/// Default interval between server settings re-checks.
pub const DEFAULT_SETTINGS_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Default interval between database list refreshes.
pub const DEFAULT_DATABASE_LIST_INTERVAL: Duration = Duration::from_secs(60);

/// Default interval between standby application list refreshes.
pub const DEFAULT_STANDBY_LIST_INTERVAL: Duration = Duration::from_secs(60);

/// Configuration for a [`Collector`](crate::collector::Collector).
///
/// Connection parameters are read from the standard environment variables:
/// - PGHOST (default: localhost)
/// - PGPORT (default: 5432)
/// - PGUSER (default: $USER)
/// - PGPASSWORD (default: empty)
/// - PGDATABASE (default: same as PGUSER)
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// libpq-style connection string (`host=... port=... user=...`).
    pub conninfo: String,
    /// Per-query timeout budget; also bounds connect and liveness probe.
    pub query_timeout: Duration,
    /// How often server settings (max_connections) are re-checked.
    pub settings_interval: Duration,
    /// How often the database list is refreshed.
    pub database_list_interval: Duration,
    /// How often the standby application list is refreshed.
    pub standby_list_interval: Duration,
}

impl CollectorConfig {
    /// Creates a configuration from environment variables.
    ///
    /// Uses $USER as default if PGUSER is not set.
    pub fn from_env() -> Result<Self, CollectError> {
        let user = std::env::var("PGUSER")
            .or_else(|_| std::env::var("USER"))
            .map_err(|_| CollectError::EnvNotSet("PGUSER or USER".to_string()))?;

        let host = std::env::var("PGHOST").unwrap_or_else(|_| "localhost".to_string());
        let port = std::env::var("PGPORT").unwrap_or_else(|_| "5432".to_string());
        let password = std::env::var("PGPASSWORD").unwrap_or_default();
        let database = std::env::var("PGDATABASE").unwrap_or_else(|_| user.clone());

        let conninfo = if password.is_empty() {
            format!(
                "host={} port={} user={} dbname={}",
                host, port, user, database
            )
        } else {
            format!(
                "host={} port={} user={} password={} dbname={}",
                host, port, user, password, database
            )
        };

        Ok(Self::with_conninfo(conninfo))
    }

    /// Creates a configuration with an explicit connection string.
    pub fn with_conninfo(conninfo: impl Into<String>) -> Self {
        Self {
            conninfo: conninfo.into(),
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            settings_interval: DEFAULT_SETTINGS_INTERVAL,
            database_list_interval: DEFAULT_DATABASE_LIST_INTERVAL,
            standby_list_interval: DEFAULT_STANDBY_LIST_INTERVAL,
        }
    }

    /// Sets the per-query timeout budget.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Sets the settings re-check interval.
    ///
    /// `Duration::ZERO` forces a re-check on every cycle.
    pub fn with_settings_interval(mut self, interval: Duration) -> Self {
        self.settings_interval = interval;
        self
    }

    /// Sets the database list refresh interval.
    pub fn with_database_list_interval(mut self, interval: Duration) -> Self {
        self.database_list_interval = interval;
        self
    }

    /// Sets the standby application list refresh interval.
    pub fn with_standby_list_interval(mut self, interval: Duration) -> Self {
        self.standby_list_interval = interval;
        self
    }
}
