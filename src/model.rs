//! Canonical bucket statistics types.
//!
//! [`BucketStats`] mirrors the shape of `radosgw-admin bucket stats` output
//! one-for-one so that collected data can be re-exported in the admin tool's
//! native format. Collection metadata (`collected_at`, duration) is added by
//! this system and never appears in the export.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use strum_macros::{AsRefStr, Display, EnumString};

/// Replication (multisite sync) state of a bucket.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SyncState {
    /// All shards caught up with the source zone.
    Synced,
    /// One or more shards lag the source zone.
    Behind,
    /// Sync reported an error condition.
    Error,
    /// Status could not be determined (including non-multisite deployments).
    Unknown,
}

/// Replication status block.
///
/// Present as a whole or absent as a whole on [`BucketStats`]; partial
/// replication data is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncInfo {
    pub state: SyncState,
    /// Number of index shards lagging the source zone.
    pub behind_shards: u32,
    /// Number of log entries not yet applied.
    pub behind_entries: u64,
    /// Source zone name, empty when unknown.
    pub source_zone: String,
}

impl SyncInfo {
    pub fn unknown() -> Self {
        Self {
            state: SyncState::Unknown,
            behind_shards: 0,
            behind_entries: 0,
            source_zone: String::new(),
        }
    }
}

/// Per-storage-class usage breakdown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageClassUsage {
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub size_actual: u64,
    #[serde(default)]
    pub size_utilized: u64,
    #[serde(default)]
    pub num_objects: u64,
}

/// Explicit pool placement descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplicitPlacement {
    #[serde(default)]
    pub data_pool: String,
    #[serde(default)]
    pub data_extra_pool: String,
    #[serde(default)]
    pub index_pool: String,
}

/// Bucket quota descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketQuota {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub check_on_raw: bool,
    #[serde(default = "default_max_size")]
    pub max_size: i64,
    #[serde(default)]
    pub max_size_kb: i64,
    #[serde(default = "default_max_size")]
    pub max_objects: i64,
}

fn default_max_size() -> i64 {
    -1
}

impl Default for BucketQuota {
    fn default() -> Self {
        Self {
            enabled: false,
            check_on_raw: false,
            max_size: -1,
            max_size_kb: 0,
            max_objects: -1,
        }
    }
}

/// Last-known administrative state of one bucket.
///
/// One current row exists per `name`; the aggregate size/object counters are
/// derived from the per-class `usage` map at parse time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketStats {
    // Identity
    pub name: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub marker: String,
    #[serde(default)]
    pub tenant: String,
    #[serde(default)]
    pub owner: String,

    // Placement
    #[serde(default)]
    pub zonegroup: String,
    #[serde(default)]
    pub placement_rule: String,
    #[serde(default)]
    pub explicit_placement: ExplicitPlacement,

    // Sharding & indexing
    #[serde(default)]
    pub num_shards: u32,
    #[serde(default = "default_index_type")]
    pub index_type: String,

    // Versioning & features
    #[serde(default = "default_versioning")]
    pub versioning: String,
    #[serde(default)]
    pub versioned: bool,
    #[serde(default)]
    pub versioning_enabled: bool,
    #[serde(default)]
    pub object_lock_enabled: bool,
    #[serde(default)]
    pub mfa_enabled: bool,

    // Version counters
    #[serde(default)]
    pub ver: String,
    #[serde(default)]
    pub master_ver: String,
    #[serde(default)]
    pub max_marker: String,

    // Source-system timestamps (kept verbatim as reported by the gateway)
    #[serde(default)]
    pub mtime: String,
    #[serde(default)]
    pub creation_time: String,

    // Aggregated usage
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default)]
    pub size_actual_bytes: u64,
    #[serde(default)]
    pub size_utilized_bytes: u64,
    #[serde(default)]
    pub num_objects: u64,

    /// Per-storage-class breakdown, e.g. `"rgw.main" -> {size, ...}`.
    #[serde(default)]
    pub usage: BTreeMap<String, StorageClassUsage>,

    #[serde(default)]
    pub quota: BucketQuota,

    /// Replication status; all-or-nothing.
    #[serde(default)]
    pub sync: Option<SyncInfo>,

    // Collection metadata (ours, not the gateway's)
    pub collected_at: DateTime<Utc>,
    #[serde(default)]
    pub collection_duration_ms: u32,
}

fn default_index_type() -> String {
    "Normal".to_string()
}

fn default_versioning() -> String {
    "off".to_string()
}

impl BucketStats {
    /// Create a stats record with only the identity set; counters zeroed.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: String::new(),
            marker: String::new(),
            tenant: String::new(),
            owner: String::new(),
            zonegroup: String::new(),
            placement_rule: String::new(),
            explicit_placement: ExplicitPlacement::default(),
            num_shards: 0,
            index_type: default_index_type(),
            versioning: default_versioning(),
            versioned: false,
            versioning_enabled: false,
            object_lock_enabled: false,
            mfa_enabled: false,
            ver: String::new(),
            master_ver: String::new(),
            max_marker: String::new(),
            mtime: String::new(),
            creation_time: String::new(),
            size_bytes: 0,
            size_actual_bytes: 0,
            size_utilized_bytes: 0,
            num_objects: 0,
            usage: BTreeMap::new(),
            quota: BucketQuota::default(),
            sync: None,
            collected_at: Utc::now(),
            collection_duration_ms: 0,
        }
    }

    /// Recompute the aggregate counters from the per-class usage map.
    pub fn recompute_totals(&mut self) {
        self.size_bytes = self.usage.values().map(|u| u.size).sum();
        self.size_actual_bytes = self.usage.values().map(|u| u.size_actual).sum();
        self.size_utilized_bytes = self.usage.values().map(|u| u.size_utilized).sum();
        self.num_objects = self.usage.values().map(|u| u.num_objects).sum();
    }

    /// Render in the exact `radosgw-admin bucket stats` JSON shape.
    ///
    /// Field presence and naming are a compatibility contract with the admin
    /// tool; collection metadata is deliberately omitted.
    pub fn to_admin_json(&self) -> serde_json::Value {
        json!({
            "bucket": self.name,
            "num_shards": self.num_shards,
            "tenant": self.tenant,
            "versioning": self.versioning,
            "zonegroup": self.zonegroup,
            "placement_rule": self.placement_rule,
            "explicit_placement": self.explicit_placement,
            "id": self.id,
            "marker": if self.marker.is_empty() { &self.id } else { &self.marker },
            "index_type": self.index_type,
            "versioned": self.versioned,
            "versioning_enabled": self.versioning_enabled,
            "object_lock_enabled": self.object_lock_enabled,
            "mfa_enabled": self.mfa_enabled,
            "owner": self.owner,
            "ver": self.ver,
            "master_ver": self.master_ver,
            "mtime": self.mtime,
            "creation_time": self.creation_time,
            "max_marker": self.max_marker,
            "usage": self.usage,
            "bucket_quota": self.quota,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_sync_state_roundtrip() {
        assert_eq!(SyncState::from_str("synced").unwrap(), SyncState::Synced);
        assert_eq!(SyncState::from_str("BEHIND").unwrap(), SyncState::Behind);
        assert_eq!(SyncState::Behind.as_ref(), "behind");
        assert!(SyncState::from_str("caught-up").is_err());
    }

    #[test]
    fn test_recompute_totals() {
        let mut stats = BucketStats::named("b1");
        stats.usage.insert(
            "rgw.main".to_string(),
            StorageClassUsage {
                size: 100,
                size_actual: 120,
                size_utilized: 100,
                num_objects: 3,
            },
        );
        stats.usage.insert(
            "COLD".to_string(),
            StorageClassUsage {
                size: 50,
                size_actual: 64,
                size_utilized: 50,
                num_objects: 1,
            },
        );
        stats.recompute_totals();

        assert_eq!(stats.size_bytes, 150);
        assert_eq!(stats.size_actual_bytes, 184);
        assert_eq!(stats.num_objects, 4);
    }

    #[test]
    fn test_admin_json_shape() {
        let mut stats = BucketStats::named("imgs");
        stats.id = "abc123".to_string();
        stats.owner = "alice".to_string();
        stats.num_shards = 11;
        let doc = stats.to_admin_json();

        assert_eq!(doc["bucket"], "imgs");
        assert_eq!(doc["owner"], "alice");
        assert_eq!(doc["num_shards"], 11);
        // marker falls back to id when unset
        assert_eq!(doc["marker"], "abc123");
        assert_eq!(doc["bucket_quota"]["max_size"], -1);
        assert_eq!(doc["bucket_quota"]["enabled"], false);
        // collection metadata must not leak into the export
        assert!(doc.get("collected_at").is_none());
    }

    #[test]
    fn test_admin_json_keeps_explicit_marker() {
        let mut stats = BucketStats::named("logs");
        stats.id = "id-1".to_string();
        stats.marker = "marker-1".to_string();
        assert_eq!(stats.to_admin_json()["marker"], "marker-1");
    }
}
