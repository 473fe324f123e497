//! Bounded concurrent fetch pool for the incremental path.
//!
//! One task per stale bucket, admission-limited by a semaphore sized to the
//! worker count. The pool drains every task before reporting: results are
//! merged only after the full fan-out completes, and a single slow or failed
//! bucket never discards its siblings' results.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::client::{AdminClient, ClientError};
use crate::model::{BucketStats, SyncInfo};

/// Worker count for a cycle: one worker per `buckets_per_worker` stale
/// buckets, clamped to `[1, max_workers]`.
pub fn worker_count(stale: usize, buckets_per_worker: usize, max_workers: usize) -> usize {
    if buckets_per_worker == 0 {
        return 1;
    }
    (stale / buckets_per_worker).clamp(1, max_workers.max(1))
}

/// Outcome of one pool fan-out.
#[derive(Debug, Default)]
pub struct FetchReport {
    /// Successfully fetched statistics, ready to persist.
    pub collected: Vec<BucketStats>,
    /// Buckets whose fetch failed; their stored rows stay untouched.
    pub failed: Vec<String>,
    /// Tasks that panicked or were cancelled before reporting.
    pub aborted: usize,
}

/// Fetch statistics for each named bucket with bounded concurrency.
///
/// Failures are per-bucket: each is logged and counted, never escalated.
/// When `collect_sync` is set, replication status is fetched after the base
/// statistics; a sync failure downgrades that bucket's replication state to
/// unknown but keeps the base statistics.
pub async fn fetch_many(
    client: Arc<dyn AdminClient>,
    names: Vec<String>,
    workers: usize,
    command_timeout: Duration,
    collect_sync: bool,
) -> FetchReport {
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut tasks = JoinSet::new();

    for name in names {
        let client = Arc::clone(&client);
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    return (
                        name,
                        Err(ClientError::Command("worker pool closed".to_string())),
                    )
                }
            };

            let result = match client.bucket_stats(&name, command_timeout).await {
                Ok(mut stats) => {
                    if collect_sync {
                        match client.sync_status(&name, command_timeout).await {
                            Ok(sync) => stats.sync = Some(sync),
                            Err(e) => {
                                tracing::warn!(
                                    bucket = %name,
                                    error = %e,
                                    "Sync status fetch failed, keeping base statistics"
                                );
                                stats.sync = Some(SyncInfo::unknown());
                            }
                        }
                    }
                    Ok(stats)
                }
                Err(e) => Err(e),
            };
            (name, result)
        });
    }

    // Full drain before reporting.
    let mut report = FetchReport::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, Ok(stats))) => report.collected.push(stats),
            Ok((name, Err(e))) => {
                tracing::warn!(bucket = %name, error = %e, "Bucket fetch failed");
                report.failed.push(name);
            }
            Err(e) => {
                tracing::error!(error = %e, "Fetch task aborted");
                report.aborted += 1;
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::model::{SyncState, StorageClassUsage};

    #[test]
    fn test_worker_count_scales_with_backlog() {
        // 50 buckets per worker, capped at 100 workers.
        assert_eq!(worker_count(10, 50, 100), 1);
        assert_eq!(worker_count(250, 50, 100), 5);
        assert_eq!(worker_count(5_000, 50, 100), 100);
        assert_eq!(worker_count(1_000_000, 50, 100), 100);
    }

    #[test]
    fn test_worker_count_degenerate_inputs() {
        assert_eq!(worker_count(0, 50, 100), 1);
        assert_eq!(worker_count(100, 0, 100), 1);
        assert_eq!(worker_count(100, 50, 0), 1);
    }

    /// In-memory admin client with per-bucket failure injection and a
    /// high-water mark of concurrent calls.
    struct FakeAdmin {
        sizes: HashMap<String, u64>,
        failing: HashSet<String>,
        sync_failing: HashSet<String>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl FakeAdmin {
        fn new(names: &[(&str, u64)]) -> Self {
            Self {
                sizes: names
                    .iter()
                    .map(|(n, s)| (n.to_string(), *s))
                    .collect(),
                failing: HashSet::new(),
                sync_failing: HashSet::new(),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }

        fn stats_for(&self, name: &str) -> Result<BucketStats, ClientError> {
            let size = self
                .sizes
                .get(name)
                .ok_or_else(|| ClientError::NotFound(name.to_string()))?;
            let mut stats = BucketStats::named(name);
            stats.usage.insert(
                "rgw.main".to_string(),
                StorageClassUsage {
                    size: *size,
                    num_objects: 1,
                    ..Default::default()
                },
            );
            stats.recompute_totals();
            Ok(stats)
        }
    }

    #[async_trait::async_trait]
    impl AdminClient for FakeAdmin {
        async fn list_buckets(&self, _: Duration) -> Result<Vec<String>, ClientError> {
            let mut names: Vec<String> = self.sizes.keys().cloned().collect();
            names.sort();
            Ok(names)
        }

        async fn bulk_stats(&self, _: Duration) -> Result<Vec<BucketStats>, ClientError> {
            let mut names: Vec<String> = self.sizes.keys().cloned().collect();
            names.sort();
            names.iter().map(|n| self.stats_for(n)).collect()
        }

        async fn bucket_stats(
            &self,
            name: &str,
            _: Duration,
        ) -> Result<BucketStats, ClientError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing.contains(name) {
                return Err(ClientError::Command(format!("injected failure: {name}")));
            }
            self.stats_for(name)
        }

        async fn sync_status(&self, name: &str, _: Duration) -> Result<SyncInfo, ClientError> {
            if self.sync_failing.contains(name) {
                return Err(ClientError::Command("sync unavailable".to_string()));
            }
            Ok(SyncInfo {
                state: SyncState::Synced,
                behind_shards: 0,
                behind_entries: 0,
                source_zone: "zone-a".to_string(),
            })
        }
    }

    fn names(prefix: &str, n: usize) -> Vec<(String, u64)> {
        (0..n).map(|i| (format!("{prefix}{i}"), 100)).collect()
    }

    #[tokio::test]
    async fn test_fetch_many_collects_all() {
        let population: Vec<(String, u64)> = names("b", 10);
        let refs: Vec<(&str, u64)> =
            population.iter().map(|(n, s)| (n.as_str(), *s)).collect();
        let admin = Arc::new(FakeAdmin::new(&refs));

        let report = fetch_many(
            admin,
            population.iter().map(|(n, _)| n.clone()).collect(),
            4,
            Duration::from_secs(1),
            false,
        )
        .await;

        assert_eq!(report.collected.len(), 10);
        assert!(report.failed.is_empty());
        assert_eq!(report.aborted, 0);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_discard_siblings() {
        let population: Vec<(String, u64)> = names("b", 10);
        let refs: Vec<(&str, u64)> =
            population.iter().map(|(n, s)| (n.as_str(), *s)).collect();
        let mut admin = FakeAdmin::new(&refs);
        admin.failing.insert("b3".to_string());
        let admin = Arc::new(admin);

        let report = fetch_many(
            admin,
            population.iter().map(|(n, _)| n.clone()).collect(),
            4,
            Duration::from_secs(1),
            false,
        )
        .await;

        assert_eq!(report.collected.len(), 9);
        assert_eq!(report.failed, vec!["b3".to_string()]);
        assert!(report.collected.iter().all(|s| s.name != "b3"));
    }

    #[tokio::test]
    async fn test_concurrency_never_exceeds_worker_count() {
        let population: Vec<(String, u64)> = names("b", 20);
        let refs: Vec<(&str, u64)> =
            population.iter().map(|(n, s)| (n.as_str(), *s)).collect();
        let admin = Arc::new(FakeAdmin::new(&refs));

        fetch_many(
            Arc::clone(&admin) as Arc<dyn AdminClient>,
            population.iter().map(|(n, _)| n.clone()).collect(),
            3,
            Duration::from_secs(1),
            false,
        )
        .await;

        assert!(admin.max_in_flight.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_sync_failure_downgrades_to_unknown() {
        let mut admin = FakeAdmin::new(&[("a", 100), ("b", 200)]);
        admin.sync_failing.insert("b".to_string());
        let admin = Arc::new(admin);

        let report = fetch_many(
            admin,
            vec!["a".to_string(), "b".to_string()],
            2,
            Duration::from_secs(1),
            true,
        )
        .await;

        assert_eq!(report.collected.len(), 2);
        let a = report.collected.iter().find(|s| s.name == "a").unwrap();
        let b = report.collected.iter().find(|s| s.name == "b").unwrap();
        assert_eq!(a.sync.as_ref().unwrap().state, SyncState::Synced);
        assert_eq!(b.sync.as_ref().unwrap().state, SyncState::Unknown);
    }
}
