//! Admin client trait and error types.

use std::time::Duration;

use thiserror::Error;

use crate::model::{BucketStats, SyncInfo};

/// Errors that can occur talking to the admin control plane.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The call exceeded its deadline and was abandoned.
    #[error("admin command timed out after {0:?}")]
    Timeout(Duration),

    /// The bucket vanished between listing and fetch.
    #[error("bucket not found: {0}")]
    NotFound(String),

    /// Malformed or unexpected response shape.
    #[error("failed to parse admin response: {0}")]
    Parse(String),

    /// The admin command exited non-zero.
    #[error("admin command failed: {0}")]
    Command(String),

    /// The admin command could not be spawned or read.
    #[error("admin command I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Client for the cluster's administrative control plane.
///
/// Deadlines are caller-supplied and enforced on every call; a hung control
/// plane never hangs the collector. Per-bucket calls are independent of each
/// other, and the bulk call is all-or-nothing.
#[async_trait::async_trait]
pub trait AdminClient: Send + Sync {
    /// List the names of every bucket known to the cluster.
    async fn list_buckets(&self, deadline: Duration) -> Result<Vec<String>, ClientError>;

    /// Fetch statistics for every bucket in one call.
    ///
    /// Either the full population parses or the call fails wholesale; a
    /// truncated or malformed response never yields a partial set.
    async fn bulk_stats(&self, deadline: Duration) -> Result<Vec<BucketStats>, ClientError>;

    /// Fetch statistics for a single bucket.
    async fn bucket_stats(&self, name: &str, deadline: Duration)
        -> Result<BucketStats, ClientError>;

    /// Fetch multisite replication status for a single bucket.
    ///
    /// Callers merge the result into the base snapshot; a failure here must
    /// not discard the base snapshot.
    async fn sync_status(&self, name: &str, deadline: Duration) -> Result<SyncInfo, ClientError>;
}
