//! Staleness evaluation: which buckets need collection this cycle.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::storage::{BucketStore, StorageError};

/// Result of comparing the live bucket population against the store.
#[derive(Debug, Clone)]
pub struct StalenessReport {
    /// Buckets currently known to the cluster.
    pub listed: usize,
    /// Buckets currently in the store.
    pub known: usize,
    /// Listed buckets the store has never seen, in listing order.
    pub new_names: Vec<String>,
    /// Stored buckets past the staleness threshold and still listed,
    /// oldest observation first.
    pub stale_stored: Vec<String>,
}

impl StalenessReport {
    /// Total buckets needing collection. Never-observed buckets are stale
    /// by definition.
    pub fn stale_count(&self) -> usize {
        self.new_names.len() + self.stale_stored.len()
    }

    /// All names to collect: never-observed buckets first, then stored
    /// buckets oldest first.
    pub fn stale_names(self) -> Vec<String> {
        let mut names = self.new_names;
        names.extend(self.stale_stored);
        names
    }
}

/// Compare the listed population against the store at `now`.
///
/// Buckets that exist in the store but have vanished from the listing are
/// excluded: their rows are retained for history, but fetching them would
/// only produce not-found errors.
pub fn evaluate_staleness(
    store: &BucketStore,
    listed: &[String],
    now: DateTime<Utc>,
    threshold: Duration,
) -> Result<StalenessReport, StorageError> {
    let known = store.known_names()?;

    let new_names: Vec<String> = listed
        .iter()
        .filter(|name| !known.contains(*name))
        .cloned()
        .collect();

    let listed_set: std::collections::HashSet<&str> =
        listed.iter().map(String::as_str).collect();
    let stale_stored: Vec<String> = store
        .stale_names(now, threshold)?
        .into_iter()
        .filter(|name| listed_set.contains(name.as_str()))
        .collect();

    Ok(StalenessReport {
        listed: listed.len(),
        known: known.len(),
        new_names,
        stale_stored,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BucketStats, StorageClassUsage};
    use crate::storage::HistoryMode;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn sample(name: &str, collected_at: DateTime<Utc>) -> BucketStats {
        let mut stats = BucketStats::named(name);
        stats.usage.insert(
            "rgw.main".to_string(),
            StorageClassUsage {
                size: 10,
                num_objects: 1,
                ..Default::default()
            },
        );
        stats.recompute_totals();
        stats.collected_at = collected_at;
        stats
    }

    #[test]
    fn test_new_buckets_are_stale() {
        let store = BucketStore::open_in_memory().unwrap();
        let listed = vec!["a".to_string(), "b".to_string()];

        let report =
            evaluate_staleness(&store, &listed, at(10_000), Duration::from_secs(600)).unwrap();
        assert_eq!(report.listed, 2);
        assert_eq!(report.known, 0);
        assert_eq!(report.stale_count(), 2);
        assert_eq!(report.stale_names(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_fresh_buckets_are_not_stale() {
        let mut store = BucketStore::open_in_memory().unwrap();
        store
            .upsert(&sample("a", at(9_950)), HistoryMode::Always)
            .unwrap();

        let listed = vec!["a".to_string()];
        let report =
            evaluate_staleness(&store, &listed, at(10_000), Duration::from_secs(600)).unwrap();
        assert_eq!(report.stale_count(), 0);
    }

    #[test]
    fn test_new_first_then_stored_oldest_first() {
        let mut store = BucketStore::open_in_memory().unwrap();
        store
            .upsert(&sample("old", at(5_000)), HistoryMode::Always)
            .unwrap();
        store
            .upsert(&sample("older", at(1_000)), HistoryMode::Always)
            .unwrap();
        store
            .upsert(&sample("fresh", at(9_990)), HistoryMode::Always)
            .unwrap();

        let listed = vec![
            "old".to_string(),
            "brand-new".to_string(),
            "older".to_string(),
            "fresh".to_string(),
        ];
        let report =
            evaluate_staleness(&store, &listed, at(10_000), Duration::from_secs(600)).unwrap();
        assert_eq!(
            report.stale_names(),
            vec![
                "brand-new".to_string(),
                "older".to_string(),
                "old".to_string()
            ]
        );
    }

    #[test]
    fn test_delisted_buckets_are_skipped() {
        let mut store = BucketStore::open_in_memory().unwrap();
        store
            .upsert(&sample("deleted", at(1_000)), HistoryMode::Always)
            .unwrap();

        let report =
            evaluate_staleness(&store, &[], at(10_000), Duration::from_secs(600)).unwrap();
        assert_eq!(report.known, 1);
        assert_eq!(report.stale_count(), 0);
    }
}
