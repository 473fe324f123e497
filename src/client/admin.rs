//! `radosgw-admin` subprocess client.
//!
//! Every call spawns the admin binary with `--format=json`, waits up to the
//! caller's deadline, and kills the child if the deadline elapses. The admin
//! tool has no native timeout of its own, so the deadline is enforced here.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tokio::time::timeout;

use crate::client::{parse, AdminClient, ClientError};
use crate::model::{BucketStats, SyncInfo};

/// Default admin binary name, resolved via `PATH`.
pub const DEFAULT_ADMIN_BINARY: &str = "radosgw-admin";

/// Default Ceph configuration path.
pub const DEFAULT_CEPH_CONF: &str = "/etc/ceph/ceph.conf";

/// Control-plane client backed by the `radosgw-admin` CLI.
#[derive(Debug, Clone)]
pub struct RgwAdminClient {
    binary: String,
    ceph_conf: String,
}

impl RgwAdminClient {
    pub fn new(binary: impl Into<String>, ceph_conf: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            ceph_conf: ceph_conf.into(),
        }
    }

    /// Run one admin command, returning stdout on success.
    ///
    /// `kill_on_drop` ensures the child is reaped when the deadline fires
    /// and the future is dropped.
    async fn run(&self, args: &[&str], deadline: Duration) -> Result<String, ClientError> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-c")
            .arg(&self.ceph_conf)
            .args(args)
            .arg("--format=json")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(binary = %self.binary, ?args, ?deadline, "Running admin command");

        let child = cmd.spawn()?;
        let output = timeout(deadline, child.wait_with_output())
            .await
            .map_err(|_| {
                tracing::warn!(?args, ?deadline, "Admin command deadline exceeded, killing");
                ClientError::Timeout(deadline)
            })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.to_ascii_lowercase().contains("no such") {
                // The per-bucket commands always carry `--bucket <name>`.
                let name = args
                    .iter()
                    .skip_while(|a| **a != "--bucket")
                    .nth(1)
                    .unwrap_or(&"")
                    .to_string();
                return Err(ClientError::NotFound(name));
            }
            return Err(ClientError::Command(format!(
                "exit {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait::async_trait]
impl AdminClient for RgwAdminClient {
    async fn list_buckets(&self, deadline: Duration) -> Result<Vec<String>, ClientError> {
        let body = self.run(&["bucket", "list"], deadline).await?;
        parse::parse_bucket_list(&body)
    }

    async fn bulk_stats(&self, deadline: Duration) -> Result<Vec<BucketStats>, ClientError> {
        let start = Instant::now();
        let body = self.run(&["bucket", "stats"], deadline).await?;
        tracing::info!(
            elapsed_s = start.elapsed().as_secs(),
            bytes = body.len(),
            "Bulk stats response received"
        );
        parse::parse_bulk_stats(&body)
    }

    async fn bucket_stats(
        &self,
        name: &str,
        deadline: Duration,
    ) -> Result<BucketStats, ClientError> {
        let start = Instant::now();
        let body = self
            .run(&["bucket", "stats", "--bucket", name], deadline)
            .await?;
        let duration_ms = start.elapsed().as_millis().min(u32::MAX as u128) as u32;
        parse::parse_single_stats(&body, duration_ms)
    }

    async fn sync_status(&self, name: &str, deadline: Duration) -> Result<SyncInfo, ClientError> {
        let body = self
            .run(&["bucket", "sync", "status", "--bucket", name], deadline)
            .await?;
        Ok(parse::parse_sync_status(&body))
    }
}
