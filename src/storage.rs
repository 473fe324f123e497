//! Persistence layer over an embedded DuckDB database.
//!
//! Three tables, all owned by this module:
//! - `bucket_stats`: one current row per bucket, upserted in place
//! - `bucket_stats_history`: append-only time series, one row per persisted
//!   observation
//! - `storage_class_usage`: per-storage-class breakdown of the current row
//!
//! The store is single-writer: one [`BucketStore`] with write access exists
//! per collector process, held by the collection driver. Operational commands
//! open read-only connections; dashboards read the published snapshot
//! artifact instead of the database.

mod error;
mod schema;
mod store;

pub use error::StorageError;
pub use schema::migrate;
pub use store::{
    BucketListRow, BucketStore, HistoryMode, OwnerRow, RepairBackfill, StoreSummary, SyncBehindRow,
    SyncSummary,
};
