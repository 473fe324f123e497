//! Strict parsing of `radosgw-admin` responses into canonical types.
//!
//! Responses are deserialized into validated intermediate structs with
//! explicit defaults for optional fields; unexpected shapes are rejected
//! with [`ClientError::Parse`] rather than silently coerced.

use std::collections::BTreeMap;

use chrono::Utc;
use regex::Regex;
use serde::Deserialize;

use crate::client::ClientError;
use crate::model::{
    BucketQuota, BucketStats, ExplicitPlacement, StorageClassUsage, SyncInfo, SyncState,
};

/// Raw `bucket stats` entry as emitted by the admin tool.
#[derive(Debug, Deserialize)]
struct RawBucketStats {
    bucket: String,
    #[serde(default)]
    id: String,
    #[serde(default)]
    marker: String,
    #[serde(default)]
    tenant: String,
    #[serde(default)]
    owner: String,
    #[serde(default)]
    zonegroup: String,
    #[serde(default)]
    placement_rule: String,
    #[serde(default)]
    explicit_placement: ExplicitPlacement,
    #[serde(default)]
    num_shards: u32,
    #[serde(default = "default_index_type")]
    index_type: String,
    #[serde(default = "default_versioning")]
    versioning: String,
    #[serde(default)]
    versioned: bool,
    #[serde(default)]
    versioning_enabled: bool,
    #[serde(default)]
    object_lock_enabled: bool,
    #[serde(default)]
    mfa_enabled: bool,
    #[serde(default, deserialize_with = "string_or_number")]
    ver: String,
    #[serde(default, deserialize_with = "string_or_number")]
    master_ver: String,
    #[serde(default)]
    max_marker: String,
    #[serde(default)]
    mtime: String,
    #[serde(default)]
    creation_time: String,
    #[serde(default)]
    usage: BTreeMap<String, StorageClassUsage>,
    #[serde(default)]
    bucket_quota: BucketQuota,
}

fn default_index_type() -> String {
    "Normal".to_string()
}

fn default_versioning() -> String {
    "off".to_string()
}

/// Older gateways emit `ver`/`master_ver` as integers, newer ones as
/// `"shard#ver"` strings; accept both.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StrOrNum {
        Str(String),
        Num(i64),
    }
    Ok(match StrOrNum::deserialize(deserializer)? {
        StrOrNum::Str(s) => s,
        StrOrNum::Num(n) => n.to_string(),
    })
}

impl RawBucketStats {
    fn into_stats(self, duration_ms: u32) -> BucketStats {
        let mut stats = BucketStats {
            name: self.bucket,
            id: self.id,
            marker: self.marker,
            tenant: self.tenant,
            owner: self.owner,
            zonegroup: self.zonegroup,
            placement_rule: self.placement_rule,
            explicit_placement: self.explicit_placement,
            num_shards: self.num_shards,
            index_type: self.index_type,
            versioning: self.versioning,
            versioned: self.versioned,
            versioning_enabled: self.versioning_enabled,
            object_lock_enabled: self.object_lock_enabled,
            mfa_enabled: self.mfa_enabled,
            ver: self.ver,
            master_ver: self.master_ver,
            max_marker: self.max_marker,
            mtime: self.mtime,
            creation_time: self.creation_time,
            size_bytes: 0,
            size_actual_bytes: 0,
            size_utilized_bytes: 0,
            num_objects: 0,
            usage: self.usage,
            quota: self.bucket_quota,
            sync: None,
            collected_at: Utc::now(),
            collection_duration_ms: duration_ms,
        };
        stats.recompute_totals();
        stats
    }
}

/// Parse a `bucket list` response: a JSON array of names, or of objects
/// carrying a `bucket`/`name` key on some gateway versions.
pub fn parse_bucket_list(body: &str) -> Result<Vec<String>, ClientError> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ListEntry {
        Name(String),
        Object {
            #[serde(default)]
            bucket: Option<String>,
            #[serde(default)]
            name: Option<String>,
        },
    }

    let entries: Vec<ListEntry> = serde_json::from_str(body.trim())
        .map_err(|e| ClientError::Parse(format!("bucket list: {e}")))?;

    let mut names = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry {
            ListEntry::Name(n) => names.push(n),
            ListEntry::Object { bucket, name } => {
                if let Some(n) = bucket.or(name).filter(|n| !n.is_empty()) {
                    names.push(n);
                }
            }
        }
    }
    Ok(names)
}

/// Parse a bulk `bucket stats` response covering the full population.
///
/// Any malformed entry fails the whole call; the bulk path commits all
/// buckets or none.
pub fn parse_bulk_stats(body: &str) -> Result<Vec<BucketStats>, ClientError> {
    let trimmed = body.trim();
    let raw: Vec<RawBucketStats> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed).map_err(|e| ClientError::Parse(format!("bulk stats: {e}")))?
    } else {
        // A single-bucket cluster emits one object rather than a list.
        vec![serde_json::from_str(trimmed)
            .map_err(|e| ClientError::Parse(format!("bulk stats: {e}")))?]
    };

    if raw.iter().any(|r| r.bucket.is_empty()) {
        return Err(ClientError::Parse(
            "bulk stats: entry with empty bucket name".to_string(),
        ));
    }

    Ok(raw.into_iter().map(|r| r.into_stats(0)).collect())
}

/// Parse a per-bucket `bucket stats` response.
pub fn parse_single_stats(body: &str, duration_ms: u32) -> Result<BucketStats, ClientError> {
    let raw: RawBucketStats = serde_json::from_str(body.trim())
        .map_err(|e| ClientError::Parse(format!("bucket stats: {e}")))?;
    if raw.bucket.is_empty() {
        return Err(ClientError::Parse(
            "bucket stats: empty bucket name".to_string(),
        ));
    }
    Ok(raw.into_stats(duration_ms))
}

/// Parse `bucket sync status` output.
///
/// Newer gateways emit a JSON array of per-source-zone shard states; older
/// ones emit human-readable text. Both are handled; anything unrecognized
/// degrades to [`SyncState::Unknown`] rather than failing the caller.
pub fn parse_sync_status(body: &str) -> SyncInfo {
    let trimmed = body.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
            return parse_sync_json(&value);
        }
        return SyncInfo::unknown();
    }
    parse_sync_text(trimmed)
}

fn parse_sync_json(value: &serde_json::Value) -> SyncInfo {
    let mut info = SyncInfo {
        state: SyncState::Synced,
        behind_shards: 0,
        behind_entries: 0,
        source_zone: String::new(),
    };

    let zones = match value {
        serde_json::Value::Array(items) => items.as_slice(),
        other => std::slice::from_ref(other),
    };

    for zone in zones {
        if let Some(source) = zone.get("source_zone").and_then(|v| v.as_str()) {
            if !source.is_empty() {
                info.source_zone = source.to_string();
            }
        }
        info.behind_shards += zone
            .get("shards_behind")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32;
        info.behind_entries += zone
            .get("entries_behind")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
    }

    if info.behind_shards > 0 || info.behind_entries > 0 {
        info.state = SyncState::Behind;
    }
    info
}

fn parse_sync_text(text: &str) -> SyncInfo {
    let mut info = SyncInfo {
        state: SyncState::Synced,
        behind_shards: 0,
        behind_entries: 0,
        source_zone: String::new(),
    };

    let shards_re = Regex::new(r"(?i)(\d+)\s+shards?\s+behind").expect("static regex");
    let entries_re = Regex::new(r"(?i)(\d+)\s+entr(?:y|ies)\s+behind").expect("static regex");
    let zone_re = Regex::new(r"(?i)source\s+zone[:\s]+(\S+)").expect("static regex");

    if let Some(caps) = shards_re.captures(text) {
        info.behind_shards = caps[1].parse().unwrap_or(0);
        info.state = SyncState::Behind;
    }
    if let Some(caps) = entries_re.captures(text) {
        info.behind_entries = caps[1].parse().unwrap_or(0);
        info.state = SyncState::Behind;
    }
    if let Some(caps) = zone_re.captures(text) {
        info.source_zone = caps[1].to_string();
    }

    let lower = text.to_ascii_lowercase();
    if lower.contains("error") {
        info.state = SyncState::Error;
    } else if lower.contains("caught up") || lower.contains("in sync") {
        if info.behind_shards == 0 && info.behind_entries == 0 {
            info.state = SyncState::Synced;
        }
    }
    info
}
