//! PostgreSQL metrics collection.
//!
//! One [`Collector`] drives one synchronous collection cycle per tick:
//!
//! 1. ensure the connection is open (lazy, probed, lifetime-capped);
//! 2. ensure the server version is cached (queried once per lifetime);
//! 3. refresh stale metadata windows (settings, database list, standby
//!    application list), notifying the entity observer about standby
//!    churn;
//! 4. run the fixed catalog of per-cycle metric queries in order, then the
//!    entity-dependent groups for non-empty tracked sets;
//! 5. return the snapshot, or the partial snapshot plus the stage that
//!    failed.
//!
//! The collector is generic over [`Backend`] so tests run against the
//! scripted [`mock::MockBackend`] instead of a live server.

mod backend;
mod catalog;
mod database;
mod entities;
mod metrics;
pub mod mock;
mod queries;
mod replication;
mod schedule;
mod server;
mod wal;

use std::time::Instant;

pub use backend::{Backend, PgBackend, TextRow};
pub use catalog::RelKind;
pub use entities::{EntityObserver, NullObserver};
pub use metrics::{Merge, Metrics};
pub use schedule::RefreshWindow;

use entities::EntityTracker;
use tracing::debug;

use crate::config::CollectorConfig;

/// Minimum server version exposing `write_lag`/`flush_lag`/`replay_lag`
/// in `pg_stat_replication`. Older servers skip the lag group entirely;
/// this is a capability gate, not an error.
const MIN_VERSION_STANDBY_LAG: i64 = 100_000;

/// Logical names of the introspection queries; used for mock dispatch and
/// for tagging errors with the stage that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryName {
    ServerVersion,
    SettingsMaxConnections,
    DatabaseList,
    StandbyAppList,
    ServerConnections,
    Checkpoints,
    ServerUptime,
    TxidWraparound,
    WalWrites,
    WalFiles,
    WalArchiveFiles,
    CatalogRelations,
    AutovacuumWorkers,
    StandbyAppWalDelta,
    StandbyAppWalLag,
    DatabaseStats,
    DatabaseConflicts,
    DatabaseLocks,
}

impl std::fmt::Display for QueryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            QueryName::ServerVersion => "server version",
            QueryName::SettingsMaxConnections => "settings max connections",
            QueryName::DatabaseList => "database list",
            QueryName::StandbyAppList => "standby app list",
            QueryName::ServerConnections => "server connections",
            QueryName::Checkpoints => "checkpoints",
            QueryName::ServerUptime => "server uptime",
            QueryName::TxidWraparound => "txid wraparound",
            QueryName::WalWrites => "wal writes",
            QueryName::WalFiles => "wal files",
            QueryName::WalArchiveFiles => "wal archive files",
            QueryName::CatalogRelations => "catalog relations",
            QueryName::AutovacuumWorkers => "autovacuum workers",
            QueryName::StandbyAppWalDelta => "replication standby app wal delta",
            QueryName::StandbyAppWalLag => "replication standby app wal lag",
            QueryName::DatabaseStats => "database stats",
            QueryName::DatabaseConflicts => "database conflicts",
            QueryName::DatabaseLocks => "database locks",
        };
        f.write_str(name)
    }
}

/// Error type for collection cycles.
#[derive(Debug)]
pub enum CollectError {
    /// Environment variable not set.
    EnvNotSet(String),
    /// Connection open or liveness probe failed; no snapshot produced,
    /// the next cycle retries from scratch.
    Connection(String),
    /// A metadata fetch (version, settings, database or standby list)
    /// failed before any metric collection started.
    Metadata {
        query: QueryName,
        message: String,
    },
    /// A metric query failed mid-sequence. The snapshot accumulated up to
    /// that point is carried along.
    Query {
        query: QueryName,
        message: String,
        partial: Metrics,
    },
}

impl std::fmt::Display for CollectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectError::EnvNotSet(var) => write!(f, "PostgreSQL: {} not set", var),
            CollectError::Connection(message) => write!(f, "connection error: {}", message),
            CollectError::Metadata { query, message } | CollectError::Query { query, message, .. } => {
                write!(f, "querying {} error: {}", query, message)
            }
        }
    }
}

impl std::error::Error for CollectError {}

/// A failed metric query, before the partial snapshot is attached.
pub(crate) struct QueryFailure {
    query: QueryName,
    message: String,
}

/// Collection orchestrator.
///
/// Owns the single database connection (through its backend), the cached
/// server version, the three metadata refresh windows and the tracked
/// entity sets. Constructed once and driven from a single thread.
pub struct Collector<B: Backend> {
    backend: B,
    observer: Box<dyn EntityObserver>,
    server_version: i64,
    max_connections: i64,
    settings_window: RefreshWindow,
    database_window: RefreshWindow,
    standby_window: RefreshWindow,
    databases: EntityTracker,
    standby_apps: EntityTracker,
}

impl Collector<PgBackend> {
    /// Creates a collector over a real PostgreSQL connection.
    pub fn from_config(config: &CollectorConfig) -> Self {
        Self::new(PgBackend::new(config), config)
    }
}

impl<B: Backend> Collector<B> {
    /// Creates a collector over an explicit backend.
    ///
    /// Entity notifications are discarded until an observer is attached
    /// with [`with_observer`](Self::with_observer).
    pub fn new(backend: B, config: &CollectorConfig) -> Self {
        Self {
            backend,
            observer: Box::new(NullObserver),
            server_version: 0,
            max_connections: 0,
            settings_window: RefreshWindow::new(config.settings_interval),
            database_window: RefreshWindow::new(config.database_list_interval),
            standby_window: RefreshWindow::new(config.standby_list_interval),
            databases: EntityTracker::new(),
            standby_apps: EntityTracker::new(),
        }
    }

    /// Attaches the presentation observer receiving standby application
    /// added/removed notifications.
    pub fn with_observer(mut self, observer: Box<dyn EntityObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Cached numeric server version (0 until the first successful cycle).
    pub fn server_version(&self) -> i64 {
        self.server_version
    }

    /// Names of the currently tracked standby applications.
    pub fn standby_apps(&self) -> &[String] {
        self.standby_apps.names()
    }

    /// Names of the currently tracked databases.
    pub fn databases(&self) -> &[String] {
        self.databases.names()
    }

    /// Runs one collection cycle and returns the snapshot.
    ///
    /// Any failure short-circuits the remaining steps of this cycle; a
    /// metric-stage failure still returns the partially populated
    /// snapshot inside [`CollectError::Query`]. Nothing is retried
    /// within a cycle.
    pub fn collect(&mut self) -> Result<Metrics, CollectError> {
        self.backend
            .ensure_connected()
            .map_err(CollectError::Connection)?;

        self.ensure_server_version()?;

        let now = Instant::now();

        if self.settings_window.is_stale(now) {
            self.refresh_settings()?;
            self.settings_window.mark_refreshed(now);
        }

        if self.database_window.is_stale(now) {
            let databases = self.fetch_database_list()?;
            debug!(databases = databases.len(), "database list refreshed");
            self.databases.replace(databases, &mut NullObserver);
            self.database_window.mark_refreshed(now);
        }

        if self.standby_window.is_stale(now) {
            let apps = self.fetch_standby_app_list()?;
            debug!(standby_apps = apps.len(), "standby app list refreshed");
            self.standby_apps.replace(apps, self.observer.as_mut());
            self.standby_window.mark_refreshed(now);
        }

        let mut mx = Metrics::new();
        match self.collect_metrics(&mut mx) {
            Ok(()) => Ok(mx),
            Err(failure) => Err(CollectError::Query {
                query: failure.query,
                message: failure.message,
                partial: mx,
            }),
        }
    }

    /// The fixed metric sequence, then the entity-dependent groups.
    fn collect_metrics(&mut self, mx: &mut Metrics) -> Result<(), QueryFailure> {
        self.collect_connections(mx)?;
        self.collect_checkpoints(mx)?;
        self.collect_uptime(mx)?;
        self.collect_txid_wraparound(mx)?;
        self.collect_wal_writes(mx)?;
        self.collect_wal_files(mx)?;
        self.collect_wal_archive_files(mx)?;
        self.collect_catalog_relations(mx)?;
        self.collect_autovacuum_workers(mx)?;

        if !self.standby_apps.is_empty() {
            self.collect_standby_wal_delta(mx)?;
            if self.server_version >= MIN_VERSION_STANDBY_LAG {
                self.collect_standby_wal_lag(mx)?;
            }
        }

        if !self.databases.is_empty() {
            self.collect_database_stats(mx)?;
            self.collect_database_conflicts(mx)?;
            self.collect_database_locks(mx)?;
        }

        Ok(())
    }

    /// Queries the server version once; cached for the collector lifetime.
    fn ensure_server_version(&mut self) -> Result<(), CollectError> {
        if self.server_version != 0 {
            return Ok(());
        }

        let rows = self.fetch_metadata(QueryName::ServerVersion, queries::server_version())?;
        let text = rows.first().and_then(|row| row.get(0)).unwrap_or("");
        self.server_version =
            text.trim()
                .parse()
                .map_err(|e| CollectError::Metadata {
                    query: QueryName::ServerVersion,
                    message: format!("invalid version {:?}: {}", text, e),
                })?;
        debug!(version = self.server_version, "server version cached");
        Ok(())
    }

    /// Re-reads server settings (max_connections). Strict parse: a
    /// malformed setting is a metadata error, unlike metric values.
    fn refresh_settings(&mut self) -> Result<(), CollectError> {
        let rows = self.fetch_metadata(
            QueryName::SettingsMaxConnections,
            queries::settings_max_connections(),
        )?;
        let text = rows.first().and_then(|row| row.get(0)).unwrap_or("");
        self.max_connections =
            text.trim()
                .parse()
                .map_err(|e| CollectError::Metadata {
                    query: QueryName::SettingsMaxConnections,
                    message: format!("invalid max_connections {:?}: {}", text, e),
                })?;
        Ok(())
    }

    /// Runs a metric query, tagging failures with the logical stage.
    fn fetch(&mut self, query: QueryName, sql: &str) -> Result<Vec<TextRow>, QueryFailure> {
        self.backend
            .fetch(query, sql)
            .map_err(|message| QueryFailure { query, message })
    }

    /// Runs a metric query expected to yield a single value; malformed
    /// numeric text degrades to 0.
    fn fetch_scalar(&mut self, query: QueryName, sql: &str) -> Result<i64, QueryFailure> {
        let rows = self.fetch(query, sql)?;
        let text = rows.first().and_then(|row| row.get(0)).unwrap_or("");
        Ok(metrics::parse_metric_value(text))
    }

    /// Runs a metadata query; failures abort the cycle before metrics.
    fn fetch_metadata(
        &mut self,
        query: QueryName,
        sql: &str,
    ) -> Result<Vec<TextRow>, CollectError> {
        self.backend
            .fetch(query, sql)
            .map_err(|message| CollectError::Metadata { query, message })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    use super::mock::{MockBackend, rows, scalar};
    use super::*;

    struct Recorder(Rc<RefCell<Vec<String>>>);

    impl EntityObserver for Recorder {
        fn on_added(&mut self, name: &str) {
            self.0.borrow_mut().push(format!("+{name}"));
        }
        fn on_removed(&mut self, name: &str) {
            self.0.borrow_mut().push(format!("-{name}"));
        }
    }

    fn config() -> CollectorConfig {
        CollectorConfig::with_conninfo("host=mock")
    }

    /// Backend scripted with a healthy PG 14 server, no databases and no
    /// standby applications tracked.
    fn scripted() -> MockBackend {
        let mut backend = MockBackend::new();
        backend.respond(QueryName::ServerVersion, scalar("140005"));
        backend.respond(QueryName::SettingsMaxConnections, scalar("100"));
        backend.respond(QueryName::DatabaseList, rows(&[]));
        backend.respond(QueryName::StandbyAppList, rows(&[]));
        backend.respond(QueryName::ServerConnections, scalar("25"));
        backend.respond(
            QueryName::Checkpoints,
            rows(&[&[
                ("checkpoints_timed", "10"),
                ("checkpoints_req", "2"),
                ("buffers_alloc", "300"),
            ]]),
        );
        backend.respond(QueryName::ServerUptime, scalar("86400.7"));
        backend.respond(
            QueryName::TxidWraparound,
            rows(&[&[
                ("oldest_current_xid", "12345"),
                ("percent_towards_wraparound", "1"),
                ("percent_towards_emergency_autovacuum", "6"),
            ]]),
        );
        backend.respond(QueryName::WalWrites, scalar("987654"));
        backend.respond(
            QueryName::WalFiles,
            rows(&[&[("wal_recycled_files", "10"), ("wal_written_files", "5")]]),
        );
        backend.respond(
            QueryName::WalArchiveFiles,
            rows(&[&[
                ("wal_archive_files_ready_count", "1"),
                ("wal_archive_files_done_count", "9"),
            ]]),
        );
        backend.respond(
            QueryName::CatalogRelations,
            rows(&[&[("relkind", "r"), ("count", "42"), ("size", "81920")]]),
        );
        backend.respond(
            QueryName::AutovacuumWorkers,
            rows(&[&[("autovacuum_analyze", "0"), ("autovacuum_vacuum", "1")]]),
        );
        backend
    }

    #[test]
    fn full_cycle_collects_core_metrics() {
        let mut collector = Collector::new(scripted(), &config());
        let mx = collector.collect().expect("cycle should succeed");

        assert_eq!(mx.get("server_connections_used"), Some(25));
        assert_eq!(mx.get("server_connections_available"), Some(75));
        assert_eq!(mx.get("server_connections_utilization"), Some(25));
        assert_eq!(mx.get("checkpoints_timed"), Some(10));
        assert_eq!(mx.get("server_uptime"), Some(86400));
        assert_eq!(mx.get("oldest_current_xid"), Some(12345));
        assert_eq!(mx.get("wal_writes"), Some(987654));
        assert_eq!(mx.get("wal_recycled_files"), Some(10));
        assert_eq!(mx.get("wal_archive_files_done_count"), Some(9));
        assert_eq!(mx.get("catalog_relkind_r_count"), Some(42));
        assert_eq!(mx.get("catalog_relkind_r_size"), Some(81920));
        assert_eq!(mx.get("autovacuum_vacuum"), Some(1));
        // Pre-seeded kind with no catalog rows.
        assert_eq!(mx.get("catalog_relkind_v_count"), Some(0));
        assert_eq!(collector.server_version(), 140005);
    }

    #[test]
    fn entity_dependent_groups_skip_empty_sets() {
        let mut collector = Collector::new(scripted(), &config());
        collector.collect().expect("cycle should succeed");

        let backend = &collector.backend;
        assert_eq!(backend.fetch_count(QueryName::StandbyAppWalDelta), 0);
        assert_eq!(backend.fetch_count(QueryName::StandbyAppWalLag), 0);
        assert_eq!(backend.fetch_count(QueryName::DatabaseStats), 0);
        assert_eq!(backend.fetch_count(QueryName::DatabaseLocks), 0);
    }

    #[test]
    fn snapshots_are_deterministic_across_cycles() {
        let mut collector = Collector::new(scripted(), &config());
        let first = collector.collect().expect("first cycle");
        let second = collector.collect().expect("second cycle");

        assert_eq!(first, second);
    }

    #[test]
    fn server_version_is_queried_exactly_once() {
        let mut collector = Collector::new(scripted(), &config());
        for _ in 0..5 {
            collector.collect().expect("cycle");
        }
        assert_eq!(collector.backend.fetch_count(QueryName::ServerVersion), 1);
    }

    #[test]
    fn metadata_windows_fire_once_within_interval() {
        let mut collector = Collector::new(scripted(), &config());
        for _ in 0..5 {
            collector.collect().expect("cycle");
        }

        let backend = &collector.backend;
        assert_eq!(backend.fetch_count(QueryName::SettingsMaxConnections), 1);
        assert_eq!(backend.fetch_count(QueryName::DatabaseList), 1);
        assert_eq!(backend.fetch_count(QueryName::StandbyAppList), 1);
        // Per-cycle metrics are not windowed.
        assert_eq!(backend.fetch_count(QueryName::ServerConnections), 5);
    }

    #[test]
    fn zero_interval_refreshes_every_cycle() {
        let config = config().with_settings_interval(Duration::ZERO);
        let mut collector = Collector::new(scripted(), &config);
        for _ in 0..3 {
            collector.collect().expect("cycle");
        }

        assert_eq!(
            collector.backend.fetch_count(QueryName::SettingsMaxConnections),
            3
        );
        assert_eq!(collector.backend.fetch_count(QueryName::DatabaseList), 1);
    }

    #[test]
    fn standby_churn_notifies_observer_in_order() {
        let mut backend = scripted();
        // Standby list evolves across four cycles: {} -> {a} -> {a,b} -> {}.
        backend.respond(QueryName::StandbyAppList, rows(&[&[("application_name", "a")]]));
        backend.respond(
            QueryName::StandbyAppList,
            rows(&[
                &[("application_name", "a")],
                &[("application_name", "b")],
            ]),
        );
        backend.respond(QueryName::StandbyAppList, rows(&[]));
        backend.respond(
            QueryName::StandbyAppWalDelta,
            rows(&[&[("application_name", "a"), ("wal_sent_delta", "1")]]),
        );
        backend.respond(
            QueryName::StandbyAppWalLag,
            rows(&[&[("application_name", "a"), ("wal_write_lag", "0")]]),
        );

        let events = Rc::new(RefCell::new(Vec::new()));
        let config = config().with_standby_list_interval(Duration::ZERO);
        let mut collector = Collector::new(backend, &config)
            .with_observer(Box::new(Recorder(events.clone())));

        for _ in 0..4 {
            collector.collect().expect("cycle");
        }

        assert_eq!(*events.borrow(), vec!["+a", "+b", "-a", "-b"]);
        assert!(collector.standby_apps().is_empty());
    }

    #[test]
    fn standby_list_deduplicates_application_names() {
        let mut backend = scripted();
        backend.respond(
            QueryName::StandbyAppList,
            rows(&[
                &[("application_name", "replica1")],
                &[("application_name", "replica1")],
                &[("application_name", "replica2")],
            ]),
        );
        backend.respond(
            QueryName::StandbyAppWalDelta,
            rows(&[&[("application_name", "replica1"), ("wal_sent_delta", "1")]]),
        );

        let config = config().with_standby_list_interval(Duration::ZERO);
        let mut collector = Collector::new(backend, &config);
        collector.collect().expect("first cycle");
        collector.collect().expect("second cycle");

        assert_eq!(collector.standby_apps(), ["replica1", "replica2"]);
    }

    #[test]
    fn partial_failure_returns_accumulated_snapshot() {
        let mut backend = scripted();
        backend.clear(QueryName::WalFiles);
        backend.respond_err(QueryName::WalFiles, "permission denied");

        let mut collector = Collector::new(backend, &config());
        let err = collector.collect().expect_err("wal files should fail");

        match err {
            CollectError::Query {
                query,
                message,
                partial,
            } => {
                assert_eq!(query, QueryName::WalFiles);
                assert!(message.contains("permission denied"));
                // Everything before the failing stage is present.
                assert!(partial.contains_key("server_connections_used"));
                assert!(partial.contains_key("checkpoints_timed"));
                assert!(partial.contains_key("server_uptime"));
                assert!(partial.contains_key("wal_writes"));
                // Nothing after it is.
                assert!(!partial.contains_key("wal_archive_files_done_count"));
                assert!(!partial.contains_key("catalog_relkind_r_count"));
            }
            other => panic!("unexpected error: {other}"),
        }

        // Later stages were never attempted.
        assert_eq!(collector.backend.fetch_count(QueryName::WalArchiveFiles), 0);
        assert_eq!(collector.backend.fetch_count(QueryName::CatalogRelations), 0);
    }

    #[test]
    fn connection_failure_short_circuits_the_cycle() {
        let mut backend = scripted();
        backend.fail_connect("connection refused");

        let mut collector = Collector::new(backend, &config());
        let err = collector.collect().expect_err("connect should fail");

        assert!(matches!(err, CollectError::Connection(_)));
        assert_eq!(collector.backend.fetch_count(QueryName::ServerVersion), 0);
    }

    #[test]
    fn failed_metadata_refresh_is_retried_next_cycle() {
        let mut backend = scripted();
        backend.clear(QueryName::DatabaseList);
        backend.respond_err(QueryName::DatabaseList, "timeout");
        backend.respond(QueryName::DatabaseList, rows(&[]));

        let mut collector = Collector::new(backend, &config());

        let err = collector.collect().expect_err("first cycle fails");
        assert!(matches!(
            err,
            CollectError::Metadata {
                query: QueryName::DatabaseList,
                ..
            }
        ));
        // Metadata failures abort before any metric query runs.
        assert_eq!(collector.backend.fetch_count(QueryName::ServerConnections), 0);

        collector.collect().expect("second cycle succeeds");
        // The window was not marked on failure, so the list was re-fetched.
        assert_eq!(collector.backend.fetch_count(QueryName::DatabaseList), 2);
    }

    #[test]
    fn malformed_scalar_text_degrades_to_zero() {
        let mut backend = scripted();
        backend.clear(QueryName::WalWrites);
        backend.respond(QueryName::WalWrites, scalar("not a number"));

        let mut collector = Collector::new(backend, &config());
        let mx = collector.collect().expect("cycle should still succeed");

        assert_eq!(mx.get("wal_writes"), Some(0));
    }

    #[test]
    fn empty_catalog_result_still_seeds_all_kinds() {
        let mut backend = scripted();
        backend.clear(QueryName::CatalogRelations);
        backend.respond(QueryName::CatalogRelations, rows(&[]));

        let mut collector = Collector::new(backend, &config());
        let mx = collector.collect().expect("cycle");

        for kind in RelKind::ALL {
            assert_eq!(mx.get(&format!("catalog_relkind_{}_count", kind.code())), Some(0));
            assert_eq!(mx.get(&format!("catalog_relkind_{}_size", kind.code())), Some(0));
        }
    }

    #[test]
    fn unknown_relkind_rows_are_skipped() {
        let mut backend = scripted();
        backend.clear(QueryName::CatalogRelations);
        backend.respond(
            QueryName::CatalogRelations,
            rows(&[
                &[("relkind", "x"), ("count", "7"), ("size", "1024")],
                &[("relkind", "i"), ("count", "3"), ("size", "2048")],
            ]),
        );

        let mut collector = Collector::new(backend, &config());
        let mx = collector.collect().expect("cycle");

        assert!(!mx.contains_key("catalog_relkind_x_count"));
        assert_eq!(mx.get("catalog_relkind_i_count"), Some(3));
    }

    #[test]
    fn standby_delta_rows_accumulate_per_application() {
        let mut backend = scripted();
        backend.respond(
            QueryName::StandbyAppList,
            rows(&[&[("application_name", "replica1")]]),
        );
        // Two WAL senders for the same application.
        backend.respond(
            QueryName::StandbyAppWalDelta,
            rows(&[
                &[("application_name", "replica1"), ("wal_sent_delta", "40")],
                &[("application_name", "replica1"), ("wal_sent_delta", "60")],
            ]),
        );
        backend.respond(
            QueryName::StandbyAppWalLag,
            rows(&[&[("application_name", "replica1"), ("wal_write_lag", "2")]]),
        );

        let config = config().with_standby_list_interval(Duration::ZERO);
        let mut collector = Collector::new(backend, &config);
        collector.collect().expect("first cycle tracks the standby");
        let mx = collector.collect().expect("second cycle");

        assert_eq!(mx.get("repl_standby_app_replica1_wal_sent_delta"), Some(100));
        assert_eq!(mx.get("repl_standby_app_replica1_wal_write_lag"), Some(2));
    }

    #[test]
    fn standby_lag_requires_version_ten() {
        let mut backend = scripted();
        backend.clear(QueryName::ServerVersion);
        backend.respond(QueryName::ServerVersion, scalar("90605"));
        backend.respond(
            QueryName::StandbyAppList,
            rows(&[&[("application_name", "replica1")]]),
        );
        backend.respond(
            QueryName::StandbyAppWalDelta,
            rows(&[&[("application_name", "replica1"), ("wal_sent_delta", "1")]]),
        );

        let config = config().with_standby_list_interval(Duration::ZERO);
        let mut collector = Collector::new(backend, &config);
        collector.collect().expect("first cycle");
        collector.collect().expect("second cycle");

        assert!(collector.backend.fetch_count(QueryName::StandbyAppWalDelta) >= 1);
        assert_eq!(collector.backend.fetch_count(QueryName::StandbyAppWalLag), 0);
    }

    #[test]
    fn duplicate_database_stat_rows_overwrite() {
        let mut backend = scripted();
        backend.respond(QueryName::DatabaseList, rows(&[&[("datname", "appdb")]]));
        backend.respond(
            QueryName::DatabaseStats,
            rows(&[
                &[("datname", "appdb"), ("numbackends", "5")],
                &[("datname", "appdb"), ("numbackends", "9")],
            ]),
        );

        let config = config().with_database_list_interval(Duration::ZERO);
        let mut collector = Collector::new(backend, &config);
        collector.collect().expect("first cycle tracks the database");
        let mx = collector.collect().expect("second cycle");

        assert_eq!(mx.get("db_appdb_numbackends"), Some(9));
        assert_eq!(collector.databases(), ["appdb"]);
    }

    #[test]
    fn database_locks_expand_per_mode() {
        let mut backend = scripted();
        backend.respond(QueryName::DatabaseList, rows(&[&[("datname", "appdb")]]));
        backend.respond(
            QueryName::DatabaseLocks,
            rows(&[
                &[("datname", "appdb"), ("mode", "AccessShareLock"), ("locks_count", "4")],
                &[("datname", "appdb"), ("mode", "RowExclusiveLock"), ("locks_count", "1")],
            ]),
        );

        let config = config().with_database_list_interval(Duration::ZERO);
        let mut collector = Collector::new(backend, &config);
        collector.collect().expect("first cycle");
        let mx = collector.collect().expect("second cycle");

        assert_eq!(mx.get("db_appdb_AccessShareLock_locks_count"), Some(4));
        assert_eq!(mx.get("db_appdb_RowExclusiveLock_locks_count"), Some(1));
    }

    #[test]
    fn error_messages_identify_the_stage() {
        let err = CollectError::Metadata {
            query: QueryName::StandbyAppList,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "querying standby app list error: boom");

        let err = CollectError::Query {
            query: QueryName::WalFiles,
            message: "denied".to_string(),
            partial: Metrics::new(),
        };
        assert_eq!(err.to_string(), "querying wal files error: denied");
    }
}
