//! Database schema definitions and migrations.
//!
//! Migration is additive-only: tables and indexes are created with
//! `IF NOT EXISTS`, and columns introduced after the first release are added
//! via `ALTER TABLE ... ADD COLUMN IF NOT EXISTS`. Existing rows and history
//! are never dropped or rewritten by a schema upgrade.

use duckdb::Connection;

use crate::storage::StorageError;

/// SQL statement for creating the bucket_stats table (current state).
///
/// One row per bucket, keyed by name. All timestamps are epoch microseconds
/// (BIGINT); `collected_at` is nullable so that rows imported from damaged
/// stores can be flagged for repair instead of being invented.
/// Note: nested documents (usage map, quota, placement) stored as JSON
/// strings for prepared statement compatibility.
pub const BUCKET_STATS_TABLE_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS bucket_stats (
    bucket_name            VARCHAR PRIMARY KEY,
    bucket_id              VARCHAR,
    marker                 VARCHAR,
    tenant                 VARCHAR,
    owner                  VARCHAR,
    zonegroup              VARCHAR,
    placement_rule         VARCHAR,
    explicit_placement     VARCHAR DEFAULT '{}',
    num_shards             INTEGER,
    index_type             VARCHAR,
    versioning             VARCHAR,
    versioned              BOOLEAN,
    versioning_enabled     BOOLEAN,
    object_lock_enabled    BOOLEAN,
    mfa_enabled            BOOLEAN,
    ver                    VARCHAR,
    master_ver             VARCHAR,
    max_marker             VARCHAR,
    mtime                  VARCHAR,
    creation_time          VARCHAR,
    size_bytes             BIGINT,
    size_actual_bytes      BIGINT,
    size_utilized_bytes    BIGINT,
    num_objects            BIGINT,
    usage_json             VARCHAR DEFAULT '{}',
    quota_json             VARCHAR DEFAULT '{}',
    sync_status            VARCHAR,
    sync_behind_shards     INTEGER,
    sync_behind_entries    BIGINT,
    sync_source_zone       VARCHAR,
    collected_at           BIGINT,
    collection_duration_ms INTEGER
);
"#;

/// SQL statement for creating the bucket_stats_history table.
///
/// Append-only; rows are never updated or deleted by the collector.
pub const HISTORY_TABLE_DDL: &str = r#"
CREATE SEQUENCE IF NOT EXISTS bucket_stats_history_id_seq;
CREATE TABLE IF NOT EXISTS bucket_stats_history (
    id                  BIGINT PRIMARY KEY DEFAULT NEXTVAL('bucket_stats_history_id_seq'),
    bucket_name         VARCHAR NOT NULL,
    owner               VARCHAR,
    size_bytes          BIGINT NOT NULL,
    size_actual_bytes   BIGINT,
    num_objects         BIGINT NOT NULL,
    sync_behind_shards  INTEGER,
    sync_behind_entries BIGINT,
    collected_at        BIGINT NOT NULL
);
"#;

/// SQL statement for creating the storage_class_usage table.
///
/// Refreshed wholesale per bucket on every persist: classes that disappear
/// from the gateway's report disappear from the table.
pub const CLASS_USAGE_TABLE_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS storage_class_usage (
    bucket_name         VARCHAR NOT NULL,
    storage_class       VARCHAR NOT NULL,
    size_bytes          BIGINT,
    size_actual_bytes   BIGINT,
    size_utilized_bytes BIGINT,
    num_objects         BIGINT,
    collected_at        BIGINT,
    PRIMARY KEY (bucket_name, storage_class)
);
"#;

/// Full expected column set per table, excluding primary keys.
///
/// Applied with `ADD COLUMN IF NOT EXISTS` so that a store created by any
/// earlier release is brought to the current shape without touching existing
/// rows. Types here deliberately omit NOT NULL: a constraint cannot be added
/// retroactively to a populated table.
const EXPECTED_COLUMNS: &[(&str, &str, &str)] = &[
    ("bucket_stats", "bucket_id", "VARCHAR"),
    ("bucket_stats", "marker", "VARCHAR"),
    ("bucket_stats", "tenant", "VARCHAR"),
    ("bucket_stats", "owner", "VARCHAR"),
    ("bucket_stats", "zonegroup", "VARCHAR"),
    ("bucket_stats", "placement_rule", "VARCHAR"),
    ("bucket_stats", "explicit_placement", "VARCHAR DEFAULT '{}'"),
    ("bucket_stats", "num_shards", "INTEGER"),
    ("bucket_stats", "index_type", "VARCHAR"),
    ("bucket_stats", "versioning", "VARCHAR"),
    ("bucket_stats", "versioned", "BOOLEAN"),
    ("bucket_stats", "versioning_enabled", "BOOLEAN"),
    ("bucket_stats", "object_lock_enabled", "BOOLEAN"),
    ("bucket_stats", "mfa_enabled", "BOOLEAN"),
    ("bucket_stats", "ver", "VARCHAR"),
    ("bucket_stats", "master_ver", "VARCHAR"),
    ("bucket_stats", "max_marker", "VARCHAR"),
    ("bucket_stats", "mtime", "VARCHAR"),
    ("bucket_stats", "creation_time", "VARCHAR"),
    ("bucket_stats", "size_bytes", "BIGINT"),
    ("bucket_stats", "size_actual_bytes", "BIGINT"),
    ("bucket_stats", "size_utilized_bytes", "BIGINT"),
    ("bucket_stats", "num_objects", "BIGINT"),
    ("bucket_stats", "usage_json", "VARCHAR DEFAULT '{}'"),
    ("bucket_stats", "quota_json", "VARCHAR DEFAULT '{}'"),
    ("bucket_stats", "sync_status", "VARCHAR"),
    ("bucket_stats", "sync_behind_shards", "INTEGER"),
    ("bucket_stats", "sync_behind_entries", "BIGINT"),
    ("bucket_stats", "sync_source_zone", "VARCHAR"),
    ("bucket_stats", "collected_at", "BIGINT"),
    ("bucket_stats", "collection_duration_ms", "INTEGER"),
    ("bucket_stats_history", "owner", "VARCHAR"),
    ("bucket_stats_history", "size_bytes", "BIGINT"),
    ("bucket_stats_history", "size_actual_bytes", "BIGINT"),
    ("bucket_stats_history", "num_objects", "BIGINT"),
    ("bucket_stats_history", "sync_behind_shards", "INTEGER"),
    ("bucket_stats_history", "sync_behind_entries", "BIGINT"),
    ("bucket_stats_history", "collected_at", "BIGINT"),
    ("storage_class_usage", "size_bytes", "BIGINT"),
    ("storage_class_usage", "size_actual_bytes", "BIGINT"),
    ("storage_class_usage", "size_utilized_bytes", "BIGINT"),
    ("storage_class_usage", "num_objects", "BIGINT"),
    ("storage_class_usage", "collected_at", "BIGINT"),
];

/// SQL statements for query indexes.
pub const INDEXES_DDL: &str = r#"
CREATE INDEX IF NOT EXISTS idx_stats_owner ON bucket_stats (owner);
CREATE INDEX IF NOT EXISTS idx_stats_collected ON bucket_stats (collected_at);
CREATE INDEX IF NOT EXISTS idx_history_bucket ON bucket_stats_history (bucket_name);
CREATE INDEX IF NOT EXISTS idx_history_time ON bucket_stats_history (collected_at);
"#;

/// Bring the database schema up to date.
///
/// Safe to call on a fresh file, a current store, or a store created by an
/// older release. Any failure here leaves the store unusable for the cycle;
/// callers must not write around a failed migration.
pub fn migrate(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(BUCKET_STATS_TABLE_DDL)
        .map_err(|e| StorageError::Migration(format!("bucket_stats: {e}")))?;
    conn.execute_batch(HISTORY_TABLE_DDL)
        .map_err(|e| StorageError::Migration(format!("bucket_stats_history: {e}")))?;
    conn.execute_batch(CLASS_USAGE_TABLE_DDL)
        .map_err(|e| StorageError::Migration(format!("storage_class_usage: {e}")))?;

    for (table, column, sql_type) in EXPECTED_COLUMNS {
        conn.execute_batch(&format!(
            "ALTER TABLE {table} ADD COLUMN IF NOT EXISTS {column} {sql_type};"
        ))
        .map_err(|e| StorageError::Migration(format!("{table}.{column}: {e}")))?;
    }

    conn.execute_batch(INDEXES_DDL)
        .map_err(|e| StorageError::Migration(format!("indexes: {e}")))?;

    tracing::info!("Database schema up to date");
    Ok(())
}
