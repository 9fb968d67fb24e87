//! pgpulsed - PostgreSQL runtime-state collector daemon.
//!
//! Drives one collection cycle per interval against a single server and
//! emits each snapshot as a JSON line on stdout. Partial snapshots from
//! failed cycles are emitted too, tagged with the stage that failed.

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use serde::Serialize;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use pgpulse::collector::{CollectError, Collector, EntityObserver, Metrics};
use pgpulse::config::CollectorConfig;

/// PostgreSQL runtime-state collector daemon.
#[derive(Parser)]
#[command(name = "pgpulsed", about = "PostgreSQL runtime-state collector daemon", version)]
struct Args {
    /// Collection interval in seconds.
    #[arg(short, long, default_value = "10")]
    interval: u64,

    /// Per-query timeout in milliseconds (also bounds connect and ping).
    #[arg(long, default_value = "2000")]
    query_timeout_ms: u64,

    /// How often server settings are re-checked, in seconds.
    #[arg(long, default_value = "600")]
    settings_interval: u64,

    /// How often the database list is refreshed, in seconds.
    #[arg(long, default_value = "60")]
    database_list_interval: u64,

    /// How often the standby application list is refreshed, in seconds.
    #[arg(long, default_value = "60")]
    standby_list_interval: u64,

    /// Run a single collection cycle and exit.
    #[arg(long)]
    once: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("pgpulsed={}", level).parse().unwrap())
        .add_directive(format!("pgpulse={}", level).parse().unwrap());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Logs standby application churn as it is observed.
struct LoggingObserver;

impl EntityObserver for LoggingObserver {
    fn on_added(&mut self, name: &str) {
        info!("Standby application attached: {}", name);
    }

    fn on_removed(&mut self, name: &str) {
        info!("Standby application detached: {}", name);
    }
}

/// One emitted JSON line.
#[derive(Serialize)]
struct SnapshotLine<'a> {
    ts: String,
    /// Stage that failed when the snapshot is partial, absent otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    failed_stage: Option<String>,
    metrics: &'a Metrics,
}

fn emit_snapshot(mx: &Metrics, failed_stage: Option<String>) {
    let line = SnapshotLine {
        ts: Utc::now().to_rfc3339(),
        failed_stage,
        metrics: mx,
    };
    match serde_json::to_string(&line) {
        Ok(json) => println!("{}", json),
        Err(e) => error!("Failed to serialize snapshot: {}", e),
    }
}

fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    let config = match CollectorConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            print_pg_hint(&e.to_string());
            std::process::exit(1);
        }
    };
    let config = config
        .with_query_timeout(Duration::from_millis(args.query_timeout_ms))
        .with_settings_interval(Duration::from_secs(args.settings_interval))
        .with_database_list_interval(Duration::from_secs(args.database_list_interval))
        .with_standby_list_interval(Duration::from_secs(args.standby_list_interval));

    info!("pgpulsed {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Config: interval={}s, query_timeout={}ms, settings={}s, databases={}s, standbys={}s",
        args.interval,
        args.query_timeout_ms,
        args.settings_interval,
        args.database_list_interval,
        args.standby_list_interval
    );

    let mut collector = Collector::from_config(&config).with_observer(Box::new(LoggingObserver));

    let interval = Duration::from_secs(args.interval);

    // Setup graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    info!("Starting collection loop");

    let mut cycle_count: u64 = 0;
    let mut hinted = false;

    while running.load(Ordering::SeqCst) {
        match collector.collect() {
            Ok(mx) => {
                cycle_count += 1;
                debug!(
                    "Cycle #{}: {} metrics, server version {}",
                    cycle_count,
                    mx.len(),
                    collector.server_version()
                );
                emit_snapshot(&mx, None);
            }
            Err(CollectError::Query {
                query,
                message,
                partial,
            }) => {
                cycle_count += 1;
                warn!("Querying {} error: {}", query, message);
                emit_snapshot(&partial, Some(query.to_string()));
            }
            Err(e) => {
                error!("Collection failed: {}", e);
                if !hinted && matches!(e, CollectError::Connection(_)) {
                    print_pg_hint(&e.to_string());
                    hinted = true;
                }
            }
        }

        if args.once {
            break;
        }

        // Sleep with periodic checks for shutdown signal
        let sleep_interval = Duration::from_millis(100);
        let mut remaining = interval;
        while remaining > Duration::ZERO && running.load(Ordering::SeqCst) {
            let sleep_time = remaining.min(sleep_interval);
            std::thread::sleep(sleep_time);
            remaining = remaining.saturating_sub(sleep_time);
        }
    }

    info!("Shutdown complete, {} cycles collected", cycle_count);
}

/// Prints a colored connection hint with configuration examples.
fn print_pg_hint(error: &str) {
    // ANSI colors: red for error, yellow for hints, reset after
    const RED: &str = "\x1b[1;31m";
    const YELLOW: &str = "\x1b[33m";
    const RESET: &str = "\x1b[0m";

    eprintln!("{RED}PostgreSQL: {error}{RESET}");
    eprintln!();
    eprintln!("{YELLOW}  Configure connection with environment variables:");
    eprintln!("    export PGHOST=localhost");
    eprintln!("    export PGPORT=5432");
    eprintln!("    export PGUSER=postgres");
    eprintln!("    export PGPASSWORD=secret");
    eprintln!("    export PGDATABASE=postgres");
    eprintln!();
    eprintln!("  Collection will be retried every cycle.{RESET}");
}
