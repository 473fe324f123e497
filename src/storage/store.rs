//! The bucket statistics store.
//!
//! All writes go through [`BucketStore`] methods that take `&mut self`, so
//! the single-writer discipline is enforced by the borrow checker rather
//! than by convention. Multi-row writes run inside one transaction: a cycle
//! either lands in full or not at all.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use duckdb::{params, AccessMode, Config, Connection, OptionalExt};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::model::{BucketQuota, BucketStats, ExplicitPlacement, StorageClassUsage, SyncInfo, SyncState};
use crate::storage::{schema, StorageError};

/// When to append a history row for a persisted observation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryMode {
    /// Every persisted observation gets a history row.
    #[default]
    Always,
    /// Append only when size or object count differs from the current row.
    OnChange,
}

/// Value written into NULL `collected_at` slots by the repair operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RepairBackfill {
    /// Backfill with the current time: rows look fresh and are re-collected
    /// on the normal staleness schedule.
    #[default]
    Now,
    /// Backfill with the epoch: rows look maximally stale and are picked up
    /// by the very next cycle.
    Epoch,
}

/// Cluster-wide aggregate over the current rows.
#[derive(Debug, Clone, Serialize)]
pub struct StoreSummary {
    pub total_buckets: u64,
    pub total_owners: u64,
    pub total_objects: u64,
    pub total_size_bytes: u64,
    pub total_size_actual_bytes: u64,
    /// Rows whose `collected_at` is NULL (imported or damaged).
    pub never_collected: u64,
    pub oldest_collection: Option<DateTime<Utc>>,
    pub newest_collection: Option<DateTime<Utc>>,
}

/// One bucket in a listing or top-N query.
#[derive(Debug, Clone, Serialize)]
pub struct BucketListRow {
    pub name: String,
    pub owner: String,
    pub size_bytes: u64,
    pub size_actual_bytes: u64,
    pub num_objects: u64,
    pub num_shards: u32,
    pub collected_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_status: Option<SyncState>,
}

/// Per-owner aggregate.
#[derive(Debug, Clone, Serialize)]
pub struct OwnerRow {
    pub owner: String,
    pub buckets: u64,
    pub total_size_bytes: u64,
    pub total_objects: u64,
}

/// Replication rollup over buckets that have a recorded sync status.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncSummary {
    /// Count of buckets per state (`synced`, `behind`, ...).
    pub by_state: BTreeMap<String, u64>,
    pub total_behind_shards: u64,
    pub total_behind_entries: u64,
}

/// One bucket lagging its replication source.
#[derive(Debug, Clone, Serialize)]
pub struct SyncBehindRow {
    pub name: String,
    pub owner: String,
    pub state: SyncState,
    pub behind_shards: u32,
    pub behind_entries: u64,
}

/// Handle on the statistics database.
pub struct BucketStore {
    conn: Connection,
}

impl BucketStore {
    /// Open (creating if absent) and migrate the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = Connection::open(path.as_ref())?;
        schema::migrate(&conn)?;
        Ok(Self { conn })
    }

    /// Open an existing store read-only. No migration is attempted.
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let config = Config::default().access_mode(AccessMode::ReadOnly)?;
        let conn = Connection::open_with_flags(path.as_ref(), config)?;
        Ok(Self { conn })
    }

    /// Open an in-memory store, for tests and one-off tooling.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        schema::migrate(&conn)?;
        Ok(Self { conn })
    }

    pub(crate) fn raw(&self) -> &Connection {
        &self.conn
    }

    /// Persist one observation. See [`BucketStore::persist_batch`].
    pub fn upsert(&mut self, stats: &BucketStats, mode: HistoryMode) -> Result<(), StorageError> {
        self.persist_batch(std::slice::from_ref(stats), mode)
    }

    /// Persist a batch of observations in a single transaction.
    ///
    /// For each bucket this upserts the current row, refreshes its
    /// storage-class rows wholesale, and appends history per `mode`. Either
    /// the whole batch commits or none of it does.
    pub fn persist_batch(
        &mut self,
        batch: &[BucketStats],
        mode: HistoryMode,
    ) -> Result<(), StorageError> {
        let tx = self.conn.transaction()?;
        for stats in batch {
            upsert_one(&tx, stats, mode)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Names of every bucket the store currently knows.
    pub fn known_names(&self) -> Result<HashSet<String>, StorageError> {
        let mut stmt = self.conn.prepare("SELECT bucket_name FROM bucket_stats")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut names = HashSet::new();
        for name in rows {
            names.insert(name?);
        }
        Ok(names)
    }

    /// Names of stored buckets not collected within `threshold` of `now`,
    /// oldest first. Rows with a NULL timestamp sort first: their age is
    /// unknown, so they are treated as maximally stale.
    pub fn stale_names(
        &self,
        now: DateTime<Utc>,
        threshold: Duration,
    ) -> Result<Vec<String>, StorageError> {
        let cutoff = micros(now) - threshold.as_micros().min(i64::MAX as u128) as i64;
        let mut stmt = self.conn.prepare(
            "SELECT bucket_name FROM bucket_stats
             WHERE collected_at IS NULL OR collected_at < ?
             ORDER BY collected_at ASC NULLS FIRST, bucket_name ASC",
        )?;
        let rows = stmt.query_map([cutoff], |row| row.get::<_, String>(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Aggregate totals over the current rows.
    pub fn summary(&self) -> Result<StoreSummary, StorageError> {
        self.conn
            .query_row(
                "SELECT CAST(COUNT(*) AS BIGINT),
                        CAST(COUNT(DISTINCT owner) AS BIGINT),
                        CAST(COALESCE(SUM(num_objects), 0) AS BIGINT),
                        CAST(COALESCE(SUM(size_bytes), 0) AS BIGINT),
                        CAST(COALESCE(SUM(size_actual_bytes), 0) AS BIGINT),
                        CAST(COUNT(*) FILTER (WHERE collected_at IS NULL) AS BIGINT),
                        MIN(collected_at),
                        MAX(collected_at)
                 FROM bucket_stats",
                [],
                |row| {
                    Ok(StoreSummary {
                        total_buckets: row.get::<_, i64>(0)? as u64,
                        total_owners: row.get::<_, i64>(1)? as u64,
                        total_objects: row.get::<_, i64>(2)? as u64,
                        total_size_bytes: row.get::<_, i64>(3)? as u64,
                        total_size_actual_bytes: row.get::<_, i64>(4)? as u64,
                        never_collected: row.get::<_, i64>(5)? as u64,
                        oldest_collection: row.get::<_, Option<i64>>(6)?.and_then(from_micros),
                        newest_collection: row.get::<_, Option<i64>>(7)?.and_then(from_micros),
                    })
                },
            )
            .map_err(Into::into)
    }

    /// The `limit` largest buckets by logical size.
    pub fn top_by_size(&self, limit: usize) -> Result<Vec<BucketListRow>, StorageError> {
        self.list_rows("ORDER BY size_bytes DESC, bucket_name ASC", Some(limit))
    }

    /// The `limit` largest buckets by object count.
    pub fn top_by_objects(&self, limit: usize) -> Result<Vec<BucketListRow>, StorageError> {
        self.list_rows("ORDER BY num_objects DESC, bucket_name ASC", Some(limit))
    }

    /// Every current row, name order.
    pub fn all_rows(&self) -> Result<Vec<BucketListRow>, StorageError> {
        self.list_rows("ORDER BY bucket_name ASC", None)
    }

    fn list_rows(
        &self,
        order_and_limit: &str,
        limit: Option<usize>,
    ) -> Result<Vec<BucketListRow>, StorageError> {
        let mut sql = format!(
            "SELECT bucket_name, owner, size_bytes, size_actual_bytes, num_objects,
                    num_shards, collected_at, sync_status
             FROM bucket_stats {order_and_limit}"
        );
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<i64>>(2)?,
                row.get::<_, Option<i64>>(3)?,
                row.get::<_, Option<i64>>(4)?,
                row.get::<_, Option<i32>>(5)?,
                row.get::<_, Option<i64>>(6)?,
                row.get::<_, Option<String>>(7)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (name, owner, size, actual, objects, shards, at, status) = row?;
            out.push(BucketListRow {
                name,
                owner: owner.unwrap_or_default(),
                size_bytes: size.unwrap_or(0) as u64,
                size_actual_bytes: actual.unwrap_or(0) as u64,
                num_objects: objects.unwrap_or(0) as u64,
                num_shards: shards.unwrap_or(0) as u32,
                collected_at: at.and_then(from_micros),
                sync_status: status.as_deref().map(parse_sync_state).transpose()?,
            });
        }
        Ok(out)
    }

    /// Per-owner aggregates, largest first.
    pub fn by_owner(&self, limit: usize) -> Result<Vec<OwnerRow>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT owner,
                    CAST(COUNT(*) AS BIGINT),
                    CAST(COALESCE(SUM(size_bytes), 0) AS BIGINT),
                    CAST(COALESCE(SUM(num_objects), 0) AS BIGINT)
             FROM bucket_stats
             GROUP BY owner
             ORDER BY 3 DESC, owner ASC
             LIMIT ?",
        )?;
        let rows = stmt.query_map([limit as i64], |row| {
            Ok(OwnerRow {
                owner: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                buckets: row.get::<_, i64>(1)? as u64,
                total_size_bytes: row.get::<_, i64>(2)? as u64,
                total_objects: row.get::<_, i64>(3)? as u64,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Replication rollup over buckets with a recorded status.
    pub fn sync_summary(&self) -> Result<SyncSummary, StorageError> {
        let mut summary = SyncSummary::default();
        let mut stmt = self.conn.prepare(
            "SELECT sync_status,
                    CAST(COUNT(*) AS BIGINT),
                    CAST(COALESCE(SUM(sync_behind_shards), 0) AS BIGINT),
                    CAST(COALESCE(SUM(sync_behind_entries), 0) AS BIGINT)
             FROM bucket_stats
             WHERE sync_status IS NOT NULL
             GROUP BY sync_status",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;
        for row in rows {
            let (state, count, shards, entries) = row?;
            summary.by_state.insert(state, count as u64);
            summary.total_behind_shards += shards as u64;
            summary.total_behind_entries += entries as u64;
        }
        Ok(summary)
    }

    /// Buckets lagging replication, most entries behind first.
    pub fn sync_behind(&self, limit: usize) -> Result<Vec<SyncBehindRow>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT bucket_name, owner, sync_status, sync_behind_shards, sync_behind_entries
             FROM bucket_stats
             WHERE sync_status = 'behind'
             ORDER BY sync_behind_entries DESC, bucket_name ASC
             LIMIT ?",
        )?;
        let rows = stmt.query_map([limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<i32>>(3)?,
                row.get::<_, Option<i64>>(4)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (name, owner, state, shards, entries) = row?;
            out.push(SyncBehindRow {
                name,
                owner: owner.unwrap_or_default(),
                state: parse_sync_state(&state)?,
                behind_shards: shards.unwrap_or(0) as u32,
                behind_entries: entries.unwrap_or(0) as u64,
            });
        }
        Ok(out)
    }

    /// Count rows with a NULL collection timestamp.
    pub fn null_timestamp_count(&self) -> Result<u64, StorageError> {
        let count: i64 = self.conn.query_row(
            "SELECT CAST(COUNT(*) AS BIGINT) FROM bucket_stats WHERE collected_at IS NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Backfill NULL collection timestamps.
    ///
    /// With `dry_run` set, reports the number of rows that would change and
    /// touches nothing. Returns the affected (or would-be affected) count.
    pub fn repair_timestamps(
        &mut self,
        dry_run: bool,
        backfill: RepairBackfill,
    ) -> Result<u64, StorageError> {
        if dry_run {
            return self.null_timestamp_count();
        }
        let value = match backfill {
            RepairBackfill::Now => micros(Utc::now()),
            RepairBackfill::Epoch => 0,
        };
        let changed = self.conn.execute(
            "UPDATE bucket_stats SET collected_at = ? WHERE collected_at IS NULL",
            [value],
        )?;
        tracing::info!(rows = changed, %backfill, "Repaired NULL collection timestamps");
        Ok(changed as u64)
    }

    /// Fetch one bucket's full record, or None if unknown.
    pub fn get_stats(&self, name: &str) -> Result<Option<BucketStats>, StorageError> {
        let found = self
            .conn
            .query_row(
                &format!("{STATS_SELECT} WHERE bucket_name = ?"),
                [name],
                raw_stats_row,
            )
            .optional()?;
        found.map(RawStatsRow::into_stats).transpose()
    }

    /// Every bucket's full record, name order. Drives the export command.
    pub fn export_rows(&self) -> Result<Vec<BucketStats>, StorageError> {
        let mut stmt = self
            .conn
            .prepare(&format!("{STATS_SELECT} ORDER BY bucket_name ASC"))?;
        let rows = stmt.query_map([], raw_stats_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?.into_stats()?);
        }
        Ok(out)
    }
}

fn micros(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_micros()
}

fn from_micros(us: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_micros(us)
}

fn parse_sync_state(s: &str) -> Result<SyncState, StorageError> {
    SyncState::from_str(s)
        .map_err(|_| StorageError::InvalidData(format!("unknown sync state: {s}")))
}

fn upsert_one(
    conn: &Connection,
    stats: &BucketStats,
    mode: HistoryMode,
) -> Result<(), StorageError> {
    let record_history = match mode {
        HistoryMode::Always => true,
        HistoryMode::OnChange => {
            let current: Option<(i64, i64)> = conn
                .query_row(
                    "SELECT size_bytes, num_objects FROM bucket_stats WHERE bucket_name = ?",
                    [&stats.name],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            match current {
                Some((size, objects)) => {
                    size != stats.size_bytes as i64 || objects != stats.num_objects as i64
                }
                None => true,
            }
        }
    };

    let usage_json = serde_json::to_string(&stats.usage)?;
    let quota_json = serde_json::to_string(&stats.quota)?;
    let placement_json = serde_json::to_string(&stats.explicit_placement)?;
    let collected_at = micros(stats.collected_at);
    let sync = stats.sync.as_ref();

    conn.execute(
        "INSERT OR REPLACE INTO bucket_stats (
            bucket_name, bucket_id, marker, tenant, owner,
            zonegroup, placement_rule, explicit_placement, num_shards, index_type,
            versioning, versioned, versioning_enabled, object_lock_enabled, mfa_enabled,
            ver, master_ver, max_marker, mtime, creation_time,
            size_bytes, size_actual_bytes, size_utilized_bytes, num_objects,
            usage_json, quota_json,
            sync_status, sync_behind_shards, sync_behind_entries, sync_source_zone,
            collected_at, collection_duration_ms
         ) VALUES (
            ?, ?, ?, ?, ?,
            ?, ?, ?, ?, ?,
            ?, ?, ?, ?, ?,
            ?, ?, ?, ?, ?,
            ?, ?, ?, ?,
            ?, ?,
            ?, ?, ?, ?,
            ?, ?
         )",
        params![
            stats.name,
            stats.id,
            stats.marker,
            stats.tenant,
            stats.owner,
            stats.zonegroup,
            stats.placement_rule,
            placement_json,
            stats.num_shards as i32,
            stats.index_type,
            stats.versioning,
            stats.versioned,
            stats.versioning_enabled,
            stats.object_lock_enabled,
            stats.mfa_enabled,
            stats.ver,
            stats.master_ver,
            stats.max_marker,
            stats.mtime,
            stats.creation_time,
            stats.size_bytes as i64,
            stats.size_actual_bytes as i64,
            stats.size_utilized_bytes as i64,
            stats.num_objects as i64,
            usage_json,
            quota_json,
            sync.map(|s| s.state.to_string()),
            sync.map(|s| s.behind_shards as i32),
            sync.map(|s| s.behind_entries as i64),
            sync.map(|s| s.source_zone.as_str()),
            collected_at,
            stats.collection_duration_ms as i32,
        ],
    )?;

    // Wholesale refresh: classes absent from this observation disappear.
    conn.execute(
        "DELETE FROM storage_class_usage WHERE bucket_name = ?",
        [&stats.name],
    )?;
    for (class, usage) in &stats.usage {
        conn.execute(
            "INSERT INTO storage_class_usage (
                bucket_name, storage_class, size_bytes, size_actual_bytes,
                size_utilized_bytes, num_objects, collected_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                stats.name,
                class,
                usage.size as i64,
                usage.size_actual as i64,
                usage.size_utilized as i64,
                usage.num_objects as i64,
                collected_at,
            ],
        )?;
    }

    if record_history {
        conn.execute(
            "INSERT INTO bucket_stats_history (
                bucket_name, owner, size_bytes, size_actual_bytes, num_objects,
                sync_behind_shards, sync_behind_entries, collected_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                stats.name,
                stats.owner,
                stats.size_bytes as i64,
                stats.size_actual_bytes as i64,
                stats.num_objects as i64,
                sync.map(|s| s.behind_shards as i32),
                sync.map(|s| s.behind_entries as i64),
                collected_at,
            ],
        )?;
    }

    Ok(())
}

const STATS_SELECT: &str = "SELECT
    bucket_name, bucket_id, marker, tenant, owner,
    zonegroup, placement_rule, explicit_placement, num_shards, index_type,
    versioning, versioned, versioning_enabled, object_lock_enabled, mfa_enabled,
    ver, master_ver, max_marker, mtime, creation_time,
    size_bytes, size_actual_bytes, size_utilized_bytes, num_objects,
    usage_json, quota_json,
    sync_status, sync_behind_shards, sync_behind_entries, sync_source_zone,
    collected_at, collection_duration_ms
 FROM bucket_stats";

/// Column-for-column image of one bucket_stats row, pre-decoding.
struct RawStatsRow {
    name: String,
    id: Option<String>,
    marker: Option<String>,
    tenant: Option<String>,
    owner: Option<String>,
    zonegroup: Option<String>,
    placement_rule: Option<String>,
    explicit_placement: Option<String>,
    num_shards: Option<i32>,
    index_type: Option<String>,
    versioning: Option<String>,
    versioned: Option<bool>,
    versioning_enabled: Option<bool>,
    object_lock_enabled: Option<bool>,
    mfa_enabled: Option<bool>,
    ver: Option<String>,
    master_ver: Option<String>,
    max_marker: Option<String>,
    mtime: Option<String>,
    creation_time: Option<String>,
    size_bytes: Option<i64>,
    size_actual_bytes: Option<i64>,
    size_utilized_bytes: Option<i64>,
    num_objects: Option<i64>,
    usage_json: Option<String>,
    quota_json: Option<String>,
    sync_status: Option<String>,
    sync_behind_shards: Option<i32>,
    sync_behind_entries: Option<i64>,
    sync_source_zone: Option<String>,
    collected_at: Option<i64>,
    collection_duration_ms: Option<i32>,
}

fn raw_stats_row(row: &duckdb::Row<'_>) -> Result<RawStatsRow, duckdb::Error> {
    Ok(RawStatsRow {
        name: row.get(0)?,
        id: row.get(1)?,
        marker: row.get(2)?,
        tenant: row.get(3)?,
        owner: row.get(4)?,
        zonegroup: row.get(5)?,
        placement_rule: row.get(6)?,
        explicit_placement: row.get(7)?,
        num_shards: row.get(8)?,
        index_type: row.get(9)?,
        versioning: row.get(10)?,
        versioned: row.get(11)?,
        versioning_enabled: row.get(12)?,
        object_lock_enabled: row.get(13)?,
        mfa_enabled: row.get(14)?,
        ver: row.get(15)?,
        master_ver: row.get(16)?,
        max_marker: row.get(17)?,
        mtime: row.get(18)?,
        creation_time: row.get(19)?,
        size_bytes: row.get(20)?,
        size_actual_bytes: row.get(21)?,
        size_utilized_bytes: row.get(22)?,
        num_objects: row.get(23)?,
        usage_json: row.get(24)?,
        quota_json: row.get(25)?,
        sync_status: row.get(26)?,
        sync_behind_shards: row.get(27)?,
        sync_behind_entries: row.get(28)?,
        sync_source_zone: row.get(29)?,
        collected_at: row.get(30)?,
        collection_duration_ms: row.get(31)?,
    })
}

impl RawStatsRow {
    fn into_stats(self) -> Result<BucketStats, StorageError> {
        let usage: BTreeMap<String, StorageClassUsage> = match self.usage_json.as_deref() {
            Some(s) if !s.is_empty() => serde_json::from_str(s)?,
            _ => BTreeMap::new(),
        };
        let quota: BucketQuota = match self.quota_json.as_deref() {
            Some(s) if !s.is_empty() => serde_json::from_str(s)?,
            _ => BucketQuota::default(),
        };
        let explicit_placement: ExplicitPlacement = match self.explicit_placement.as_deref() {
            Some(s) if !s.is_empty() => serde_json::from_str(s)?,
            _ => ExplicitPlacement::default(),
        };
        let sync = match self.sync_status {
            Some(state) => Some(SyncInfo {
                state: parse_sync_state(&state)?,
                behind_shards: self.sync_behind_shards.unwrap_or(0) as u32,
                behind_entries: self.sync_behind_entries.unwrap_or(0) as u64,
                source_zone: self.sync_source_zone.unwrap_or_default(),
            }),
            None => None,
        };

        Ok(BucketStats {
            name: self.name,
            id: self.id.unwrap_or_default(),
            marker: self.marker.unwrap_or_default(),
            tenant: self.tenant.unwrap_or_default(),
            owner: self.owner.unwrap_or_default(),
            zonegroup: self.zonegroup.unwrap_or_default(),
            placement_rule: self.placement_rule.unwrap_or_default(),
            explicit_placement,
            num_shards: self.num_shards.unwrap_or(0) as u32,
            index_type: self.index_type.unwrap_or_default(),
            versioning: self.versioning.unwrap_or_default(),
            versioned: self.versioned.unwrap_or(false),
            versioning_enabled: self.versioning_enabled.unwrap_or(false),
            object_lock_enabled: self.object_lock_enabled.unwrap_or(false),
            mfa_enabled: self.mfa_enabled.unwrap_or(false),
            ver: self.ver.unwrap_or_default(),
            master_ver: self.master_ver.unwrap_or_default(),
            max_marker: self.max_marker.unwrap_or_default(),
            mtime: self.mtime.unwrap_or_default(),
            creation_time: self.creation_time.unwrap_or_default(),
            size_bytes: self.size_bytes.unwrap_or(0) as u64,
            size_actual_bytes: self.size_actual_bytes.unwrap_or(0) as u64,
            size_utilized_bytes: self.size_utilized_bytes.unwrap_or(0) as u64,
            num_objects: self.num_objects.unwrap_or(0) as u64,
            usage,
            quota,
            sync,
            // NULL maps to the epoch; only repaired or freshly collected
            // rows carry a real timestamp.
            collected_at: self
                .collected_at
                .and_then(from_micros)
                .unwrap_or(DateTime::UNIX_EPOCH),
            collection_duration_ms: self.collection_duration_ms.unwrap_or(0) as u32,
        })
    }
}
