//! End-to-end collection cycle tests.
//!
//! Drives the full pipeline (listing, staleness, strategy, worker pool,
//! persistence, snapshot publication) against a scripted admin client.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};

use bucketstats::analytics::Analytics;
use bucketstats::client::{AdminClient, ClientError};
use bucketstats::collector::{CollectionDriver, Strategy};
use bucketstats::config::CollectionConfig;
use bucketstats::model::{BucketStats, StorageClassUsage, SyncInfo};
use bucketstats::snapshot::{SnapshotOptions, SnapshotWriter};
use bucketstats::storage::{BucketStore, HistoryMode};

// =============================================================================
// Test Helpers
// =============================================================================

/// Scripted admin client: fixed population, per-bucket failure injection,
/// and call counters.
struct ScriptedAdmin {
    sizes: BTreeMap<String, u64>,
    failing: Vec<String>,
    bulk_calls: AtomicUsize,
    stat_calls: AtomicUsize,
}

impl ScriptedAdmin {
    fn new(buckets: impl IntoIterator<Item = (String, u64)>) -> Self {
        Self {
            sizes: buckets.into_iter().collect(),
            failing: Vec::new(),
            bulk_calls: AtomicUsize::new(0),
            stat_calls: AtomicUsize::new(0),
        }
    }

    fn stats_for(&self, name: &str) -> Result<BucketStats, ClientError> {
        let size = self
            .sizes
            .get(name)
            .ok_or_else(|| ClientError::NotFound(name.to_string()))?;
        Ok(observation(name, *size, Utc::now()))
    }
}

#[async_trait::async_trait]
impl AdminClient for ScriptedAdmin {
    async fn list_buckets(&self, _: Duration) -> Result<Vec<String>, ClientError> {
        Ok(self.sizes.keys().cloned().collect())
    }

    async fn bulk_stats(&self, _: Duration) -> Result<Vec<BucketStats>, ClientError> {
        self.bulk_calls.fetch_add(1, Ordering::SeqCst);
        self.sizes.keys().map(|n| self.stats_for(n)).collect()
    }

    async fn bucket_stats(&self, name: &str, _: Duration) -> Result<BucketStats, ClientError> {
        self.stat_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.iter().any(|f| f == name) {
            return Err(ClientError::Timeout(Duration::from_secs(1)));
        }
        self.stats_for(name)
    }

    async fn sync_status(&self, _: &str, _: Duration) -> Result<SyncInfo, ClientError> {
        Ok(SyncInfo::unknown())
    }
}

fn observation(name: &str, size: u64, collected_at: DateTime<Utc>) -> BucketStats {
    let mut stats = BucketStats::named(name);
    stats.owner = "tester".to_string();
    stats.usage.insert(
        "rgw.main".to_string(),
        StorageClassUsage {
            size,
            size_actual: size,
            size_utilized: size,
            num_objects: size / 100,
        },
    );
    stats.recompute_totals();
    stats.collected_at = collected_at;
    stats
}

fn test_cfg() -> CollectionConfig {
    CollectionConfig {
        refresh_interval: Duration::from_secs(300),
        stale_threshold: Duration::from_secs(3600),
        bulk_cutover: 500,
        command_timeout: Duration::from_secs(5),
        bulk_timeout: Duration::from_secs(60),
        workers: 4,
        max_workers: 100,
        auto_scale: true,
        buckets_per_worker: 50,
        collect_sync: false,
        history: HistoryMode::Always,
    }
}

fn population(n: usize) -> Vec<(String, u64)> {
    (0..n).map(|i| (format!("bucket-{i:04}"), 1_000)).collect()
}

/// Store pre-seeded so that the first `stale` buckets of the population are
/// past the staleness threshold and the rest are fresh.
fn seeded_store(buckets: &[(String, u64)], stale: usize) -> BucketStore {
    let now = Utc::now();
    let old = now - ChronoDuration::hours(2);
    let batch: Vec<BucketStats> = buckets
        .iter()
        .enumerate()
        .map(|(i, (name, size))| observation(name, *size, if i < stale { old } else { now }))
        .collect();

    let mut store = BucketStore::open_in_memory().unwrap();
    store.persist_batch(&batch, HistoryMode::Always).unwrap();
    store
}

struct TestRig {
    driver: CollectionDriver,
    admin: Arc<ScriptedAdmin>,
    snapshot_path: std::path::PathBuf,
    _dir: tempfile::TempDir,
}

fn rig(admin: ScriptedAdmin, store: BucketStore, cfg: CollectionConfig) -> TestRig {
    let dir = tempfile::tempdir().unwrap();
    let snapshot_path = dir.path().join("bucket-stats.json");
    let admin = Arc::new(admin);
    let driver = CollectionDriver::new(
        Arc::clone(&admin) as Arc<dyn AdminClient>,
        store,
        SnapshotWriter::new(&snapshot_path, SnapshotOptions::default()),
        cfg,
    );
    TestRig {
        driver,
        admin,
        snapshot_path,
        _dir: dir,
    }
}

fn read_snapshot(path: &std::path::Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn bootstrap_populates_store_history_and_snapshot() {
    let admin = ScriptedAdmin::new([
        ("alpha".to_string(), 100),
        ("beta".to_string(), 200),
        ("gamma".to_string(), 300),
    ]);
    let mut rig = rig(admin, BucketStore::open_in_memory().unwrap(), test_cfg());

    let report = rig.driver.run_bootstrap().await.unwrap();
    assert_eq!(report.strategy, Strategy::Bulk);
    assert_eq!(report.collected, 3);
    assert_eq!(rig.admin.bulk_calls.load(Ordering::SeqCst), 1);
    assert_eq!(rig.admin.stat_calls.load(Ordering::SeqCst), 0);

    let store = rig.driver.store();
    let summary = store.summary().unwrap();
    assert_eq!(summary.total_buckets, 3);
    assert_eq!(summary.total_size_bytes, 600);

    // One history row per bucket from the first observation.
    let analytics = Analytics::new(store);
    for name in ["alpha", "beta", "gamma"] {
        assert_eq!(analytics.bucket_history(name, 1).unwrap().len(), 1);
    }

    let doc = read_snapshot(&rig.snapshot_path);
    assert_eq!(doc["summary"]["total_buckets"], 3);
    assert_eq!(doc["summary"]["total_size_bytes"], 600);
    assert_eq!(doc["buckets"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn large_stale_backlog_switches_to_bulk() {
    // 600 of 1000 stale, cutover 500: strictly above, so bulk wins.
    let buckets = population(1_000);
    let store = seeded_store(&buckets, 600);
    let mut rig = rig(ScriptedAdmin::new(buckets), store, test_cfg());

    let report = rig.driver.run_once().await.unwrap();
    assert_eq!(report.strategy, Strategy::Bulk);
    assert_eq!(report.stale, 600);
    assert_eq!(report.collected, 1_000);
    assert_eq!(rig.admin.bulk_calls.load(Ordering::SeqCst), 1);
    assert_eq!(rig.admin.stat_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn boundary_stale_backlog_stays_incremental() {
    // Exactly at the cutover: incremental, one fetch per stale bucket.
    let buckets = population(1_000);
    let store = seeded_store(&buckets, 500);
    let mut rig = rig(ScriptedAdmin::new(buckets), store, test_cfg());

    let report = rig.driver.run_once().await.unwrap();
    assert_eq!(report.strategy, Strategy::Incremental);
    assert_eq!(report.stale, 500);
    assert_eq!(report.collected, 500);
    assert_eq!(rig.admin.bulk_calls.load(Ordering::SeqCst), 0);
    assert_eq!(rig.admin.stat_calls.load(Ordering::SeqCst), 500);
}

#[tokio::test]
async fn small_backlog_fetches_only_stale_buckets() {
    let buckets = population(100);
    let store = seeded_store(&buckets, 10);
    let mut rig = rig(ScriptedAdmin::new(buckets), store, test_cfg());

    let report = rig.driver.run_once().await.unwrap();
    assert_eq!(report.strategy, Strategy::Incremental);
    assert_eq!(report.collected, 10);
    // 10 stale at 50 buckets per worker: a single worker suffices.
    assert_eq!(report.workers, 1);
    assert_eq!(rig.admin.stat_calls.load(Ordering::SeqCst), 10);
}

#[tokio::test]
async fn failed_fetch_keeps_previous_row_and_publishes() {
    let buckets = population(10);
    let store = seeded_store(&buckets, 10);
    let mut admin = ScriptedAdmin::new(buckets);
    admin.failing.push("bucket-0003".to_string());
    let mut rig = rig(admin, store, test_cfg());

    let before = rig
        .driver
        .store()
        .get_stats("bucket-0003")
        .unwrap()
        .unwrap();

    let report = rig.driver.run_once().await.unwrap();
    assert_eq!(report.collected, 9);
    assert_eq!(report.failed, 1);

    // The failed bucket keeps its previous observation untouched.
    let after = rig
        .driver
        .store()
        .get_stats("bucket-0003")
        .unwrap()
        .unwrap();
    assert_eq!(after.collected_at, before.collected_at);
    assert_eq!(after.size_bytes, before.size_bytes);

    // The cycle still publishes a snapshot covering the full population.
    let doc = read_snapshot(&rig.snapshot_path);
    assert_eq!(doc["summary"]["total_buckets"], 10);
}

#[tokio::test]
async fn new_bucket_is_collected_incrementally() {
    let mut buckets = population(5);
    let store = seeded_store(&buckets, 0);
    buckets.push(("brand-new".to_string(), 4_200));
    let mut rig = rig(ScriptedAdmin::new(buckets), store, test_cfg());

    let report = rig.driver.run_once().await.unwrap();
    assert_eq!(report.strategy, Strategy::Incremental);
    assert_eq!(report.stale, 1);
    assert_eq!(report.collected, 1);
    assert_eq!(rig.admin.stat_calls.load(Ordering::SeqCst), 1);

    let stats = rig.driver.store().get_stats("brand-new").unwrap().unwrap();
    assert_eq!(stats.size_bytes, 4_200);
}
