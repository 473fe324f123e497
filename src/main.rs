//! bucketstats binary entry point.
//!
//! The collector daemon and its operational commands share one binary.
//! Core functionality is provided by the `bucketstats` library crate.

use std::str::FromStr;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bucketstats::{
    analytics::Analytics,
    collector::CollectionDriver,
    config::AppConfig,
    snapshot::SnapshotWriter,
    storage::{BucketStore, RepairBackfill},
    RgwAdminClient,
};

/// Bucket statistics collector for RADOS Gateway clusters
#[derive(Parser, Debug)]
#[command(name = "bucketstats", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        default_value = "configs/config.yaml",
        env = "BUCKETSTATS_CONFIG"
    )]
    config: String,

    /// Database path (overrides config file)
    #[arg(long, env = "BUCKETSTATS_DB_PATH")]
    db_path: Option<String>,

    /// Snapshot cache path (overrides config file)
    #[arg(long, env = "BUCKETSTATS_CACHE_PATH")]
    cache_path: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Populate the store with a full bulk sweep, ignoring the cutover
    Bootstrap,

    /// Run one collection cycle, or keep collecting with --continuous
    Collect {
        /// Run cycles until interrupted
        #[arg(long)]
        continuous: bool,
    },

    /// Print store totals, freshness, and replication rollup
    Status,

    /// Backfill NULL collection timestamps
    Repair {
        /// Report what would change without touching anything
        #[arg(long)]
        dry_run: bool,

        /// Backfill value: "now" (rows look fresh) or "epoch" (rows are
        /// re-collected on the next cycle)
        #[arg(long, default_value = "now")]
        backfill: String,
    },

    /// Re-export stored statistics in the admin tool's native JSON shape
    Export {
        /// Export a single bucket instead of the full population
        #[arg(long)]
        bucket: Option<String>,

        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<String>,

        /// Compact JSON instead of pretty-printed
        #[arg(long)]
        compact: bool,
    },

    /// Historical reports over the append-only history
    Analytics {
        /// One of: growth, buckets, owners, changes, classes, forecast,
        /// history
        #[arg(long, default_value = "growth")]
        report: String,

        /// Bucket name, required by the history report
        #[arg(long)]
        bucket: Option<String>,

        /// History window in days
        #[arg(long, default_value_t = 30)]
        days: u32,

        /// Maximum entries in listing reports
        #[arg(long, default_value_t = 20)]
        limit: usize,

        /// Minimum percent change for the changes report
        #[arg(long, default_value_t = 10.0)]
        min_change_pct: f64,

        /// Projection horizon in days for the forecast report
        #[arg(long, default_value_t = 30)]
        horizon: u32,
    },

    /// Show one bucket's current record
    Bucket { name: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,bucketstats=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    tracing::info!("Loading configuration from: {}", cli.config);
    let mut config = AppConfig::load(&cli.config)?;

    // CLI > ENV > config file
    if let Some(path) = cli.db_path {
        config.database.path = path;
    }
    if let Some(path) = cli.cache_path {
        config.cache.path = path;
    }

    match cli.command {
        Command::Bootstrap => {
            let mut driver = build_driver(&config)?;
            let report = driver.run_bootstrap().await?;
            tracing::info!(
                collected = report.collected,
                duration_s = report.duration.as_secs(),
                "Bootstrap complete"
            );
        }

        Command::Collect { continuous } => {
            let mut driver = build_driver(&config)?;
            if continuous {
                let (tx, rx) = watch::channel(false);
                tokio::spawn(async move {
                    shutdown_signal().await;
                    let _ = tx.send(true);
                });
                tracing::info!(
                    interval_s = config.collection.refresh_interval.as_secs(),
                    "Starting continuous collection, press Ctrl+C to stop"
                );
                driver.run_continuous(rx).await?;
                tracing::info!("Shutdown complete");
            } else {
                let report = driver.run_once().await?;
                tracing::info!(
                    strategy = %report.strategy,
                    collected = report.collected,
                    failed = report.failed,
                    duration_s = report.duration.as_secs(),
                    "Cycle complete"
                );
            }
        }

        Command::Status => {
            let store = BucketStore::open_read_only(&config.database.path)?;
            let doc = status_report(&store)?;
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }

        Command::Repair { dry_run, backfill } => {
            let backfill = RepairBackfill::from_str(&backfill)
                .map_err(|_| format!("invalid backfill value: '{backfill}' (expected 'now' or 'epoch')"))?;
            let mut store = BucketStore::open(&config.database.path)?;
            let affected = store.repair_timestamps(dry_run, backfill)?;
            if dry_run {
                println!("{affected} rows have NULL collection timestamps (dry run, nothing changed)");
            } else {
                println!("repaired {affected} rows (backfill: {backfill})");
            }
        }

        Command::Export {
            bucket,
            output,
            compact,
        } => {
            let store = BucketStore::open_read_only(&config.database.path)?;
            let doc = match bucket {
                Some(name) => {
                    let stats = store
                        .get_stats(&name)?
                        .ok_or_else(|| format!("bucket not found: {name}"))?;
                    stats.to_admin_json()
                }
                None => {
                    let rows = store.export_rows()?;
                    serde_json::Value::Array(
                        rows.iter().map(|s| s.to_admin_json()).collect(),
                    )
                }
            };
            let body = if compact {
                serde_json::to_string(&doc)?
            } else {
                serde_json::to_string_pretty(&doc)?
            };
            match output {
                Some(path) => std::fs::write(&path, body)?,
                None => println!("{body}"),
            }
        }

        Command::Analytics {
            report,
            bucket,
            days,
            limit,
            min_change_pct,
            horizon,
        } => {
            let store = BucketStore::open_read_only(&config.database.path)?;
            let analytics = Analytics::new(&store);
            let doc = match report.as_str() {
                "growth" => serde_json::to_value(analytics.cluster_growth(days)?)?,
                "history" => {
                    let name = bucket.ok_or("the history report requires --bucket <name>")?;
                    serde_json::to_value(analytics.bucket_history(&name, days)?)?
                }
                "buckets" => {
                    serde_json::to_value(analytics.fastest_growing_buckets(days, limit)?)?
                }
                "owners" => {
                    serde_json::to_value(analytics.fastest_growing_owners(days, limit)?)?
                }
                "changes" => {
                    serde_json::to_value(analytics.bucket_changes(days, min_change_pct)?)?
                }
                "classes" => serde_json::to_value(analytics.class_distribution()?)?,
                "forecast" => serde_json::to_value(analytics.capacity_forecast(days, horizon)?)?,
                other => return Err(format!("unknown report: '{other}'").into()),
            };
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }

        Command::Bucket { name } => {
            let store = BucketStore::open_read_only(&config.database.path)?;
            let stats = store
                .get_stats(&name)?
                .ok_or_else(|| format!("bucket not found: {name}"))?;
            let doc = serde_json::json!({
                "stats": stats.to_admin_json(),
                "collected_at": stats.collected_at,
                "collection_duration_ms": stats.collection_duration_ms,
            });
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
    }

    Ok(())
}

fn build_driver(config: &AppConfig) -> Result<CollectionDriver, Box<dyn std::error::Error>> {
    let client = Arc::new(RgwAdminClient::new(
        config.client.binary.clone(),
        config.client.ceph_conf.clone(),
    ));
    let store = BucketStore::open(&config.database.path)?;
    let snapshot = SnapshotWriter::new(&config.cache.path, config.cache.snapshot_options());
    Ok(CollectionDriver::new(
        client,
        store,
        snapshot,
        config.collection.clone(),
    ))
}

/// Staleness cutoffs reported by `status`.
const STATUS_THRESHOLDS: [(&str, std::time::Duration); 4] = [
    ("1m", std::time::Duration::from_secs(60)),
    ("5m", std::time::Duration::from_secs(5 * 60)),
    ("10m", std::time::Duration::from_secs(10 * 60)),
    ("1h", std::time::Duration::from_secs(60 * 60)),
];

/// Store totals, stale counts at several cutoffs, and the replication
/// rollup, with a repair hint when rows carry NULL timestamps.
fn status_report(
    store: &BucketStore,
) -> Result<serde_json::Value, bucketstats::storage::StorageError> {
    let now = chrono::Utc::now();
    let mut stale = serde_json::Map::new();
    for (label, threshold) in STATUS_THRESHOLDS {
        stale.insert(
            format!("over_{label}"),
            store.stale_names(now, threshold)?.len().into(),
        );
    }

    let mut doc = serde_json::json!({
        "summary": store.summary()?,
        "stale": stale,
        "sync": store.sync_summary()?,
    });
    let nulls = store.null_timestamp_count()?;
    if nulls > 0 {
        doc["warning"] = serde_json::Value::String(format!(
            "{nulls} rows have NULL collection timestamps; run `bucketstats repair` to backfill"
        ));
    }
    Ok(doc)
}

/// Resolve when the process is asked to stop.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bucketstats::model::BucketStats;
    use bucketstats::storage::HistoryMode;
    use chrono::{Duration as ChronoDuration, Utc};

    #[test]
    fn test_status_report_counts_stale_per_threshold() {
        let mut store = BucketStore::open_in_memory().unwrap();
        let now = Utc::now();
        let mut fresh = BucketStats::named("fresh");
        fresh.collected_at = now;
        let mut lagging = BucketStats::named("lagging");
        lagging.collected_at = now - ChronoDuration::minutes(30);
        store
            .persist_batch(&[fresh, lagging], HistoryMode::Always)
            .unwrap();

        let doc = status_report(&store).unwrap();
        assert_eq!(doc["summary"]["total_buckets"], 2);
        assert_eq!(doc["stale"]["over_1m"], 1);
        assert_eq!(doc["stale"]["over_5m"], 1);
        assert_eq!(doc["stale"]["over_1h"], 0);
        // Nothing to repair, so no warning.
        assert!(doc.get("warning").is_none());
        assert_eq!(doc["summary"]["never_collected"], 0);
    }
}
