//! SQL text catalog for the introspection queries.
//!
//! The orchestrator only knows logical query names and the shape of each
//! result; the statement text lives here, keyed by server version where
//! the syntax differs (pre-10 servers spell WAL functions with `xlog`).

/// Versions 10+ renamed the xlog functions and replication columns.
const VERSION_WAL_RENAME: i64 = 100_000;

pub(super) fn server_version() -> &'static str {
    "SHOW server_version_num"
}

pub(super) fn settings_max_connections() -> &'static str {
    "SELECT current_setting('max_connections')::bigint"
}

pub(super) fn database_list() -> &'static str {
    r#"
        SELECT datname
          FROM pg_database
         WHERE has_database_privilege((SELECT current_user), datname, 'connect')
           AND NOT datname ~* '^template\d'
         ORDER BY datname
    "#
}

pub(super) fn standby_app_list() -> &'static str {
    "SELECT application_name FROM pg_stat_replication WHERE application_name IS NOT NULL"
}

pub(super) fn server_connections_used() -> &'static str {
    "SELECT count(*) FROM pg_stat_activity"
}

pub(super) fn checkpoints() -> &'static str {
    r#"
        SELECT checkpoints_timed,
               checkpoints_req,
               buffers_checkpoint,
               buffers_clean,
               maxwritten_clean,
               buffers_backend,
               buffers_backend_fsync,
               buffers_alloc
          FROM pg_stat_bgwriter
    "#
}

pub(super) fn server_uptime() -> &'static str {
    "SELECT EXTRACT(epoch FROM now() - pg_postmaster_start_time())"
}

pub(super) fn txid_wraparound() -> &'static str {
    r#"
        WITH max_age AS (
            SELECT 2000000000 AS max_old_xid,
                   setting AS autovacuum_freeze_max_age
              FROM pg_settings
             WHERE name = 'autovacuum_freeze_max_age'
        ), per_database AS (
            SELECT greatest(age(d.datfrozenxid), 0) AS oldest_current_xid,
                   m.max_old_xid,
                   m.autovacuum_freeze_max_age
              FROM pg_database d
             CROSS JOIN max_age m
             WHERE d.datallowconn
        )
        SELECT max(oldest_current_xid) AS oldest_current_xid,
               max(round(100 * (oldest_current_xid / max_old_xid::float))) AS percent_towards_wraparound,
               max(round(100 * (oldest_current_xid / autovacuum_freeze_max_age::float))) AS percent_towards_emergency_autovacuum
          FROM per_database
    "#
}

pub(super) fn wal_writes(server_version: i64) -> String {
    if server_version >= VERSION_WAL_RENAME {
        r#"
            SELECT pg_wal_lsn_diff(
                       CASE pg_is_in_recovery()
                           WHEN true THEN pg_last_wal_receive_lsn()
                           ELSE pg_current_wal_lsn()
                       END,
                       '0/0') AS wal_writes
        "#
        .to_string()
    } else {
        r#"
            SELECT pg_xlog_location_diff(
                       CASE pg_is_in_recovery()
                           WHEN true THEN pg_last_xlog_receive_location()
                           ELSE pg_current_xlog_location()
                       END,
                       '0/0') AS wal_writes
        "#
        .to_string()
    }
}

pub(super) fn wal_files(server_version: i64) -> String {
    let (walfile_name, current_lsn, wal_dir) = if server_version >= VERSION_WAL_RENAME {
        ("pg_walfile_name", "pg_current_wal_lsn()", "pg_ls_waldir()")
    } else {
        (
            "pg_xlogfile_name",
            "pg_current_xlog_location()",
            "pg_ls_dir('pg_xlog') AS name",
        )
    };

    format!(
        r#"
            SELECT count(*) FILTER (WHERE type = 'recycled') AS wal_recycled_files,
                   count(*) FILTER (WHERE type = 'written') AS wal_written_files
              FROM (SELECT CASE
                               WHEN name > {walfile_name}({current_lsn}) THEN 'recycled'
                               ELSE 'written'
                           END AS type
                      FROM {wal_dir}
                     WHERE name ~ '^[0-9A-F]{{24}}$') files
        "#
    )
}

pub(super) fn wal_archive_files(server_version: i64) -> String {
    let source = if server_version >= 120_000 {
        "pg_ls_archive_statusdir() AS files(archive_file, size, modification)"
    } else if server_version >= VERSION_WAL_RENAME {
        "pg_ls_dir('pg_wal/archive_status') AS files(archive_file)"
    } else {
        "pg_ls_dir('pg_xlog/archive_status') AS files(archive_file)"
    };

    format!(
        r#"
            SELECT coalesce(sum((archive_file ~ '\.ready$')::int), 0) AS wal_archive_files_ready_count,
                   coalesce(sum((archive_file ~ '\.done$')::int), 0) AS wal_archive_files_done_count
              FROM {source}
        "#
    )
}

pub(super) fn catalog_relations() -> &'static str {
    r#"
        SELECT relkind,
               count(1) AS count,
               sum(relpages) * current_setting('block_size')::numeric AS size
          FROM pg_class
         GROUP BY relkind
    "#
}

pub(super) fn autovacuum_workers() -> &'static str {
    r#"
        SELECT count(*) FILTER (WHERE query LIKE 'autovacuum: ANALYZE%') AS autovacuum_analyze,
               count(*) FILTER (WHERE query LIKE 'autovacuum: VACUUM ANALYZE%') AS autovacuum_vacuum_analyze,
               count(*) FILTER (WHERE query LIKE 'autovacuum: VACUUM %'
                                  AND query NOT LIKE 'autovacuum: VACUUM ANALYZE%'
                                  AND query NOT LIKE '%to prevent wraparound%') AS autovacuum_vacuum,
               count(*) FILTER (WHERE query LIKE '%to prevent wraparound%') AS autovacuum_vacuum_freeze,
               count(*) FILTER (WHERE query LIKE 'autovacuum: BRIN summarize%') AS autovacuum_brin_summarize
          FROM pg_stat_activity
         WHERE query NOT LIKE '%pg_stat_activity%'
    "#
}

pub(super) fn standby_app_wal_delta(server_version: i64) -> String {
    if server_version >= VERSION_WAL_RENAME {
        r#"
            SELECT application_name,
                   pg_wal_lsn_diff(
                       CASE pg_is_in_recovery()
                           WHEN true THEN pg_last_wal_receive_lsn()
                           ELSE pg_current_wal_lsn()
                       END,
                       sent_lsn) AS wal_sent_delta,
                   pg_wal_lsn_diff(sent_lsn, write_lsn) AS wal_write_delta,
                   pg_wal_lsn_diff(write_lsn, flush_lsn) AS wal_flush_delta,
                   pg_wal_lsn_diff(flush_lsn, replay_lsn) AS wal_replay_delta
              FROM pg_stat_replication
             WHERE application_name IS NOT NULL
        "#
        .to_string()
    } else {
        r#"
            SELECT application_name,
                   pg_xlog_location_diff(
                       CASE pg_is_in_recovery()
                           WHEN true THEN pg_last_xlog_receive_location()
                           ELSE pg_current_xlog_location()
                       END,
                       sent_location) AS wal_sent_delta,
                   pg_xlog_location_diff(sent_location, write_location) AS wal_write_delta,
                   pg_xlog_location_diff(write_location, flush_location) AS wal_flush_delta,
                   pg_xlog_location_diff(flush_location, replay_location) AS wal_replay_delta
              FROM pg_stat_replication
             WHERE application_name IS NOT NULL
        "#
        .to_string()
    }
}

pub(super) fn standby_app_wal_lag() -> &'static str {
    r#"
        SELECT application_name,
               coalesce(EXTRACT(epoch FROM write_lag)::bigint, 0) AS wal_write_lag,
               coalesce(EXTRACT(epoch FROM flush_lag)::bigint, 0) AS wal_flush_lag,
               coalesce(EXTRACT(epoch FROM replay_lag)::bigint, 0) AS wal_replay_lag
          FROM pg_stat_replication
         WHERE application_name IS NOT NULL
    "#
}

pub(super) fn database_stats(databases: &[String]) -> String {
    format!(
        r#"
            SELECT datname,
                   numbackends,
                   xact_commit,
                   xact_rollback,
                   blks_read,
                   blks_hit,
                   tup_returned,
                   tup_fetched,
                   tup_inserted,
                   tup_updated,
                   tup_deleted,
                   temp_files,
                   temp_bytes,
                   deadlocks
              FROM pg_stat_database
             WHERE datname IN ({})
        "#,
        in_list(databases)
    )
}

pub(super) fn database_conflicts(databases: &[String]) -> String {
    format!(
        r#"
            SELECT datname,
                   confl_tablespace,
                   confl_lock,
                   confl_snapshot,
                   confl_bufferpin,
                   confl_deadlock
              FROM pg_stat_database_conflicts
             WHERE datname IN ({})
        "#,
        in_list(databases)
    )
}

pub(super) fn database_locks(databases: &[String]) -> String {
    format!(
        r#"
            SELECT d.datname,
                   l.mode,
                   count(l.mode) AS locks_count
              FROM pg_locks l
              JOIN pg_database d ON d.oid = l.database
             WHERE d.datname IN ({})
             GROUP BY d.datname, l.mode
        "#,
        in_list(databases)
    )
}

/// Renders names as a quoted SQL IN-list. Single quotes are doubled.
fn in_list(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("'{}'", name.replace('\'', "''")))
        .collect::<Vec<_>>()
        .join(", ")
}
