//! The collection driver: owns the store and runs cycles to completion.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use thiserror::Error;
use tokio::sync::watch;

use crate::client::{AdminClient, ClientError};
use crate::collector::{
    evaluate_staleness, fetch_many, select_strategy, worker_count, Strategy,
};
use crate::config::CollectionConfig;
use crate::snapshot::{SnapshotError, SnapshotWriter};
use crate::storage::{BucketStore, StorageError};

/// Cycle-fatal errors.
///
/// Per-bucket fetch failures are absorbed by the worker pool; only the
/// listing call, a bulk sweep, persistence, and snapshot publication can
/// fail a whole cycle.
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("admin client error: {0}")]
    Client(#[from] ClientError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// What one completed cycle did.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub strategy: Strategy,
    /// Buckets listed by the cluster.
    pub listed: usize,
    /// Buckets that needed collection.
    pub stale: usize,
    /// Workers used on the incremental path (1 for bulk).
    pub workers: usize,
    /// Buckets persisted this cycle.
    pub collected: usize,
    /// Per-bucket fetch failures, retried on the next cycle.
    pub failed: usize,
    pub duration: Duration,
}

/// Runs collection cycles against one store.
///
/// The driver is the single writer: it owns the [`BucketStore`] for the
/// process lifetime and commits each cycle's batch in one transaction
/// before publishing the snapshot.
pub struct CollectionDriver {
    client: Arc<dyn AdminClient>,
    store: BucketStore,
    snapshot: SnapshotWriter,
    cfg: CollectionConfig,
}

impl CollectionDriver {
    pub fn new(
        client: Arc<dyn AdminClient>,
        store: BucketStore,
        snapshot: SnapshotWriter,
        cfg: CollectionConfig,
    ) -> Self {
        Self {
            client,
            store,
            snapshot,
            cfg,
        }
    }

    pub fn store(&self) -> &BucketStore {
        &self.store
    }

    /// First-run population: a full bulk sweep, no staleness evaluation.
    ///
    /// The sweep covers every bucket the cluster knows about, so the
    /// listing call and the evaluator are skipped entirely.
    pub async fn run_bootstrap(&mut self) -> Result<CycleReport, CollectorError> {
        let started = Instant::now();
        tracing::info!("Bootstrapping with a full bulk sweep");
        let collected = self.bulk_sweep().await?;
        self.snapshot.publish(&self.store)?;
        Ok(CycleReport {
            strategy: Strategy::Bulk,
            listed: collected,
            stale: collected,
            workers: 1,
            collected,
            failed: 0,
            duration: started.elapsed(),
        })
    }

    /// Run one collection cycle to completion.
    pub async fn run_once(&mut self) -> Result<CycleReport, CollectorError> {
        self.cycle().await
    }

    /// Run cycles until shutdown is signalled.
    ///
    /// The delay is end-to-start: the next cycle starts `refresh_interval`
    /// after the previous one finished, however long it took. A cycle in
    /// flight when shutdown arrives runs to completion and commits; only
    /// the idle wait is interruptible.
    pub async fn run_continuous(
        &mut self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), CollectorError> {
        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.run_once().await {
                Ok(report) => tracing::info!(
                    strategy = %report.strategy,
                    collected = report.collected,
                    failed = report.failed,
                    duration_s = report.duration.as_secs(),
                    "Collection cycle complete"
                ),
                Err(e) => tracing::error!(
                    error = %e,
                    "Collection cycle failed, retrying after the refresh interval"
                ),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.cfg.refresh_interval) => {}
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("Shutdown requested, stopping collection loop");
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    /// All-or-nothing sweep: a bulk failure fails the caller. Replication
    /// status is not part of the sweep output; it is refreshed by later
    /// incremental passes.
    async fn bulk_sweep(&mut self) -> Result<usize, CollectorError> {
        let batch = self.client.bulk_stats(self.cfg.bulk_timeout).await?;
        self.store.persist_batch(&batch, self.cfg.history)?;
        Ok(batch.len())
    }

    async fn cycle(&mut self) -> Result<CycleReport, CollectorError> {
        let started = Instant::now();
        let now = Utc::now();

        let listed = self.client.list_buckets(self.cfg.command_timeout).await?;
        let staleness =
            evaluate_staleness(&self.store, &listed, now, self.cfg.stale_threshold)?;
        let stale = staleness.stale_count();

        let listed_count = staleness.listed;
        let strategy = select_strategy(stale, self.cfg.bulk_cutover);
        tracing::info!(
            listed = staleness.listed,
            known = staleness.known,
            stale,
            %strategy,
            "Cycle starting"
        );

        let (collected, failed, workers) = match strategy {
            Strategy::Bulk => {
                let collected = self.bulk_sweep().await?;
                (collected, 0, 1)
            }
            Strategy::Incremental => {
                let names = staleness.stale_names();
                if names.is_empty() {
                    (0, 0, 0)
                } else {
                    let workers = if self.cfg.auto_scale {
                        worker_count(
                            names.len(),
                            self.cfg.buckets_per_worker,
                            self.cfg.max_workers,
                        )
                    } else {
                        self.cfg.workers.max(1)
                    };
                    tracing::debug!(stale = names.len(), workers, "Fanning out fetches");

                    let report = fetch_many(
                        Arc::clone(&self.client),
                        names,
                        workers,
                        self.cfg.command_timeout,
                        self.cfg.collect_sync,
                    )
                    .await;
                    self.store
                        .persist_batch(&report.collected, self.cfg.history)?;
                    (
                        report.collected.len(),
                        report.failed.len() + report.aborted,
                        workers,
                    )
                }
            }
        };

        // Published even when nothing was stale: consumers watch generated_at
        // to tell a quiet cluster from a dead collector.
        self.snapshot.publish(&self.store)?;

        Ok(CycleReport {
            strategy,
            listed: listed_count,
            stale,
            workers,
            collected,
            failed,
            duration: started.elapsed(),
        })
    }
}
