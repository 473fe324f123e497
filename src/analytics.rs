//! Historical analysis over the append-only history table.
//!
//! Everything here is read-only: reports run against whatever the store
//! currently holds and never mutate it. Day bucketing uses UTC epoch days
//! computed from the stored microsecond timestamps.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use duckdb::Connection;
use serde::Serialize;

use crate::storage::{BucketStore, StorageError};

const MICROS_PER_DAY: i64 = 86_400_000_000;

/// One day of cluster-wide totals.
#[derive(Debug, Clone, Serialize)]
pub struct GrowthDay {
    /// UTC calendar day, `YYYY-MM-DD`.
    pub day: String,
    pub total_size_bytes: u64,
    pub total_objects: u64,
    #[serde(skip)]
    epoch_day: i64,
}

/// Size change of one bucket over the report window.
#[derive(Debug, Clone, Serialize)]
pub struct BucketGrowth {
    pub name: String,
    pub owner: String,
    pub start_size_bytes: u64,
    pub end_size_bytes: u64,
    pub growth_bytes: i64,
}

/// Size change of one owner over the report window.
#[derive(Debug, Clone, Serialize)]
pub struct OwnerGrowth {
    pub owner: String,
    pub start_size_bytes: u64,
    pub end_size_bytes: u64,
    pub growth_bytes: i64,
}

/// One history observation of a bucket.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryPoint {
    pub collected_at: DateTime<Utc>,
    pub size_bytes: u64,
    pub num_objects: u64,
}

/// A bucket whose size changed significantly over the window.
#[derive(Debug, Clone, Serialize)]
pub struct BucketChange {
    pub name: String,
    pub owner: String,
    pub old_size_bytes: u64,
    pub new_size_bytes: u64,
    pub delta_bytes: i64,
    pub change_pct: f64,
}

/// Aggregate usage of one storage class across the cluster.
#[derive(Debug, Clone, Serialize)]
pub struct ClassDistribution {
    pub storage_class: String,
    pub buckets: u64,
    pub total_objects: u64,
    pub total_size_bytes: u64,
}

/// Linear projection of cluster capacity.
#[derive(Debug, Clone, Serialize)]
pub struct CapacityForecast {
    pub current_size_bytes: u64,
    /// Observed average growth per day over the history window.
    pub daily_growth_bytes: f64,
    pub horizon_days: u32,
    pub projected_size_bytes: f64,
}

/// Read-only analytical queries against one store.
pub struct Analytics<'a> {
    conn: &'a Connection,
}

impl<'a> Analytics<'a> {
    pub fn new(store: &'a BucketStore) -> Self {
        Self { conn: store.raw() }
    }

    /// Cluster-wide daily totals over the last `days` days.
    pub fn cluster_growth(&self, days: u32) -> Result<Vec<GrowthDay>, StorageError> {
        let since = since_micros(days);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT CAST(collected_at // {MICROS_PER_DAY} AS BIGINT) AS day_idx,
                    CAST(COALESCE(SUM(size_bytes), 0) AS BIGINT),
                    CAST(COALESCE(SUM(num_objects), 0) AS BIGINT)
             FROM bucket_stats_history
             WHERE collected_at >= ?
             GROUP BY day_idx
             ORDER BY day_idx"
        ))?;
        let rows = stmt.query_map([since], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (epoch_day, size, objects) = row?;
            out.push(GrowthDay {
                day: format_epoch_day(epoch_day),
                total_size_bytes: size as u64,
                total_objects: objects as u64,
                epoch_day,
            });
        }
        Ok(out)
    }

    /// Buckets with the largest absolute growth over the window. Requires at
    /// least two observations per bucket.
    pub fn fastest_growing_buckets(
        &self,
        days: u32,
        limit: usize,
    ) -> Result<Vec<BucketGrowth>, StorageError> {
        let since = since_micros(days);
        let mut stmt = self.conn.prepare(
            "WITH growth AS (
                SELECT bucket_name,
                       CAST(MIN(size_bytes) AS BIGINT) AS start_size,
                       CAST(MAX(size_bytes) AS BIGINT) AS end_size
                FROM bucket_stats_history
                WHERE collected_at >= ?
                GROUP BY bucket_name
                HAVING COUNT(*) >= 2
            )
            SELECT g.bucket_name, b.owner, g.start_size, g.end_size
            FROM growth g JOIN bucket_stats b ON g.bucket_name = b.bucket_name
            ORDER BY g.end_size - g.start_size DESC, g.bucket_name ASC
            LIMIT ?",
        )?;
        let rows = stmt.query_map(duckdb::params![since, limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (name, owner, start, end) = row?;
            out.push(BucketGrowth {
                name,
                owner: owner.unwrap_or_default(),
                start_size_bytes: start as u64,
                end_size_bytes: end as u64,
                growth_bytes: end - start,
            });
        }
        Ok(out)
    }

    /// Owners with the largest growth in daily totals over the window.
    pub fn fastest_growing_owners(
        &self,
        days: u32,
        limit: usize,
    ) -> Result<Vec<OwnerGrowth>, StorageError> {
        let since = since_micros(days);
        let mut stmt = self.conn.prepare(&format!(
            "WITH owner_daily AS (
                SELECT owner,
                       CAST(collected_at // {MICROS_PER_DAY} AS BIGINT) AS day_idx,
                       CAST(COALESCE(SUM(size_bytes), 0) AS BIGINT) AS size
                FROM bucket_stats_history
                WHERE collected_at >= ? AND owner IS NOT NULL
                GROUP BY owner, day_idx
            )
            SELECT owner,
                   CAST(MIN(size) AS BIGINT) AS start_size,
                   CAST(MAX(size) AS BIGINT) AS end_size
            FROM owner_daily
            GROUP BY owner
            ORDER BY end_size - start_size DESC, owner ASC
            LIMIT ?"
        ))?;
        let rows = stmt.query_map(duckdb::params![since, limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (owner, start, end) = row?;
            out.push(OwnerGrowth {
                owner,
                start_size_bytes: start as u64,
                end_size_bytes: end as u64,
                growth_bytes: end - start,
            });
        }
        Ok(out)
    }

    /// Observations of one bucket over the last `days` days, oldest first.
    pub fn bucket_history(
        &self,
        name: &str,
        days: u32,
    ) -> Result<Vec<HistoryPoint>, StorageError> {
        let since = since_micros(days);
        let mut stmt = self.conn.prepare(
            "SELECT collected_at, size_bytes, num_objects
             FROM bucket_stats_history
             WHERE bucket_name = ? AND collected_at >= ?
             ORDER BY collected_at",
        )?;
        let rows = stmt.query_map(duckdb::params![name, since], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (at, size, objects) = row?;
            out.push(HistoryPoint {
                collected_at: DateTime::from_timestamp_micros(at).ok_or_else(|| {
                    StorageError::InvalidData(format!("timestamp out of range: {at}"))
                })?,
                size_bytes: size as u64,
                num_objects: objects as u64,
            });
        }
        Ok(out)
    }

    /// Buckets whose size changed by at least `min_change_pct` percent over
    /// the window, largest absolute change first.
    pub fn bucket_changes(
        &self,
        days: u32,
        min_change_pct: f64,
    ) -> Result<Vec<BucketChange>, StorageError> {
        let since = since_micros(days);
        let mut stmt = self.conn.prepare(
            "WITH changes AS (
                SELECT bucket_name,
                       CAST(arg_min(size_bytes, collected_at) AS BIGINT) AS old_size,
                       CAST(arg_max(size_bytes, collected_at) AS BIGINT) AS new_size
                FROM bucket_stats_history
                WHERE collected_at >= ?
                GROUP BY bucket_name
                HAVING COUNT(*) >= 2
            )
            SELECT c.bucket_name, b.owner, c.old_size, c.new_size
            FROM changes c JOIN bucket_stats b ON c.bucket_name = b.bucket_name
            ORDER BY ABS(c.new_size - c.old_size) DESC, c.bucket_name ASC",
        )?;
        let rows = stmt.query_map([since], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (name, owner, old, new) = row?;
            let change_pct = if old > 0 {
                (new - old) as f64 * 100.0 / old as f64
            } else {
                0.0
            };
            if change_pct.abs() < min_change_pct {
                continue;
            }
            out.push(BucketChange {
                name,
                owner: owner.unwrap_or_default(),
                old_size_bytes: old as u64,
                new_size_bytes: new as u64,
                delta_bytes: new - old,
                change_pct,
            });
        }
        Ok(out)
    }

    /// Current storage-class usage across the cluster, largest class first.
    pub fn class_distribution(&self) -> Result<Vec<ClassDistribution>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT storage_class,
                    CAST(COUNT(DISTINCT bucket_name) AS BIGINT),
                    CAST(COALESCE(SUM(num_objects), 0) AS BIGINT),
                    CAST(COALESCE(SUM(size_bytes), 0) AS BIGINT)
             FROM storage_class_usage
             GROUP BY storage_class
             ORDER BY 4 DESC, storage_class ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ClassDistribution {
                storage_class: row.get(0)?,
                buckets: row.get::<_, i64>(1)? as u64,
                total_objects: row.get::<_, i64>(2)? as u64,
                total_size_bytes: row.get::<_, i64>(3)? as u64,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Linear capacity projection from the daily growth series.
    ///
    /// Returns None when the window holds fewer than two distinct days,
    /// since no rate can be derived from a single point.
    pub fn capacity_forecast(
        &self,
        history_days: u32,
        horizon_days: u32,
    ) -> Result<Option<CapacityForecast>, StorageError> {
        let growth = self.cluster_growth(history_days)?;
        let (first, last) = match (growth.first(), growth.last()) {
            (Some(f), Some(l)) if l.epoch_day > f.epoch_day => (f, l),
            _ => return Ok(None),
        };

        let span_days = (last.epoch_day - first.epoch_day) as f64;
        let daily_growth_bytes =
            (last.total_size_bytes as f64 - first.total_size_bytes as f64) / span_days;

        let current_size_bytes: i64 = self.conn.query_row(
            "SELECT CAST(COALESCE(SUM(size_bytes), 0) AS BIGINT) FROM bucket_stats",
            [],
            |row| row.get(0),
        )?;

        Ok(Some(CapacityForecast {
            current_size_bytes: current_size_bytes as u64,
            daily_growth_bytes,
            horizon_days,
            projected_size_bytes: current_size_bytes as f64
                + daily_growth_bytes * horizon_days as f64,
        }))
    }
}

fn since_micros(days: u32) -> i64 {
    (Utc::now() - ChronoDuration::days(days as i64)).timestamp_micros()
}

fn format_epoch_day(epoch_day: i64) -> String {
    DateTime::from_timestamp(epoch_day * 86_400, 0)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| epoch_day.to_string())
}
