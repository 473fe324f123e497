//! Pre-computed snapshot artifact for dashboard consumers.
//!
//! The snapshot is a single JSON document derived from the store at the end
//! of every collection cycle. Publication is atomic: the document is written
//! to a sibling temp file and renamed over the destination, so readers see
//! either the previous complete snapshot or the new complete snapshot,
//! never a partial write. Readers need no locks and never touch the
//! database.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::storage::{
    BucketListRow, BucketStore, OwnerRow, StorageError, StoreSummary, SyncBehindRow, SyncSummary,
};

/// Errors that can occur building or publishing a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// One band of the collection-freshness histogram.
#[derive(Debug, Clone, Serialize)]
pub struct FreshnessBand {
    pub label: String,
    pub count: u64,
}

/// The published snapshot document.
#[derive(Debug, Serialize)]
pub struct Snapshot {
    pub generated_at: DateTime<Utc>,
    pub summary: StoreSummary,
    /// How recently buckets were collected, bucketed into configured bands.
    pub freshness: Vec<FreshnessBand>,
    pub top_by_size: Vec<BucketListRow>,
    pub top_by_objects: Vec<BucketListRow>,
    pub by_owner: Vec<OwnerRow>,
    pub sync: SyncSummary,
    pub sync_behind: Vec<SyncBehindRow>,
    /// Every known bucket, name order.
    pub buckets: Vec<BucketListRow>,
}

/// Snapshot shape knobs.
#[derive(Debug, Clone)]
pub struct SnapshotOptions {
    /// Entries in each top-N listing.
    pub top_limit: usize,
    /// Entries in the per-owner listing.
    pub owner_limit: usize,
    /// Entries in the replication-lag listing.
    pub behind_limit: usize,
    /// Ascending band edges for the freshness histogram.
    pub freshness_bands: Vec<Duration>,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            top_limit: 100,
            owner_limit: 50,
            behind_limit: 50,
            freshness_bands: vec![
                Duration::from_secs(10 * 60),
                Duration::from_secs(60 * 60),
                Duration::from_secs(24 * 60 * 60),
            ],
        }
    }
}

/// Builds snapshot documents and publishes them atomically.
pub struct SnapshotWriter {
    path: PathBuf,
    options: SnapshotOptions,
}

impl SnapshotWriter {
    pub fn new(path: impl Into<PathBuf>, options: SnapshotOptions) -> Self {
        Self {
            path: path.into(),
            options,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Assemble a snapshot from the store's current rows.
    pub fn build(&self, store: &BucketStore, now: DateTime<Utc>) -> Result<Snapshot, SnapshotError> {
        let buckets = store.all_rows()?;
        let freshness = freshness_histogram(&buckets, now, &self.options.freshness_bands);

        Ok(Snapshot {
            generated_at: now,
            summary: store.summary()?,
            freshness,
            top_by_size: store.top_by_size(self.options.top_limit)?,
            top_by_objects: store.top_by_objects(self.options.top_limit)?,
            by_owner: store.by_owner(self.options.owner_limit)?,
            sync: store.sync_summary()?,
            sync_behind: store.sync_behind(self.options.behind_limit)?,
            buckets,
        })
    }

    /// Build and publish in one step. On any failure the previously
    /// published document is left untouched.
    pub fn publish(&self, store: &BucketStore) -> Result<(), SnapshotError> {
        let snapshot = self.build(store, Utc::now())?;
        self.write(&snapshot)
    }

    /// Atomically replace the published document: write a sibling temp file,
    /// then rename it over the destination.
    pub fn write(&self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        let body = serde_json::to_vec_pretty(snapshot)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &body)?;
        fs::rename(&tmp, &self.path)?;
        tracing::debug!(
            path = %self.path.display(),
            bytes = body.len(),
            buckets = snapshot.buckets.len(),
            "Snapshot published"
        );
        Ok(())
    }
}

fn freshness_histogram(
    buckets: &[BucketListRow],
    now: DateTime<Utc>,
    bands: &[Duration],
) -> Vec<FreshnessBand> {
    let mut counts = vec![0u64; bands.len() + 2];
    let over_idx = bands.len();
    let never_idx = bands.len() + 1;

    for row in buckets {
        match row.collected_at {
            None => counts[never_idx] += 1,
            Some(at) => {
                let age = (now - at).to_std().unwrap_or(Duration::ZERO);
                let idx = bands
                    .iter()
                    .position(|band| age <= *band)
                    .unwrap_or(over_idx);
                counts[idx] += 1;
            }
        }
    }

    let mut out = Vec::with_capacity(counts.len());
    for (i, band) in bands.iter().enumerate() {
        out.push(FreshnessBand {
            label: format!("within {}", humantime::format_duration(*band)),
            count: counts[i],
        });
    }
    if let Some(last) = bands.last() {
        out.push(FreshnessBand {
            label: format!("over {}", humantime::format_duration(*last)),
            count: counts[over_idx],
        });
    }
    out.push(FreshnessBand {
        label: "never".to_string(),
        count: counts[never_idx],
    });
    out
}
