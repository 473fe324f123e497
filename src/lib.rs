//! Bucket statistics collection engine for RADOS Gateway clusters.
//!
//! This crate keeps per-bucket usage statistics continuously fresh: it polls
//! the cluster's admin control plane, persists observations in an embedded
//! DuckDB store with append-only history, and publishes a pre-computed JSON
//! snapshot that dashboards read without ever touching the database.
//!
//! # Architecture
//!
//! - **Client**: deadline-enforced `radosgw-admin` subprocess calls
//! - **Collector**: staleness evaluation, bulk/incremental strategy
//!   selection, self-scaling worker pool, and the cycle driver
//! - **Storage**: DuckDB persistence with additive schema migration
//! - **Snapshot**: atomically published dashboard document
//! - **Analytics**: growth, change, and capacity reports over history

pub mod analytics;
pub mod client;
pub mod collector;
pub mod config;
pub mod model;
pub mod snapshot;
pub mod storage;

pub use client::{AdminClient, ClientError, RgwAdminClient};
pub use collector::{CollectionDriver, CollectorError, CycleReport, Strategy};
pub use config::AppConfig;
pub use model::{BucketStats, SyncInfo, SyncState};
pub use snapshot::{Snapshot, SnapshotWriter};
pub use storage::{BucketStore, HistoryMode, RepairBackfill, StorageError};
