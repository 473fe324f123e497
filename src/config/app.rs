//! Application configuration structures.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::{DEFAULT_ADMIN_BINARY, DEFAULT_CEPH_CONF};
use crate::snapshot::SnapshotOptions;
use crate::storage::HistoryMode;

use super::validation::{expand_env_vars, parse_duration, ConfigError};

// =============================================================================
// Constants
// =============================================================================

/// Default delay between the end of one cycle and the start of the next.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Default age past which a stored bucket is considered stale.
pub const DEFAULT_STALE_THRESHOLD: Duration = Duration::from_secs(60 * 60);

/// Default stale count above which a cycle switches to a bulk sweep.
pub const DEFAULT_BULK_CUTOVER: usize = 500;

/// Default deadline for a single admin command.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// Default deadline for a cluster-wide bulk sweep (30 minutes).
pub const DEFAULT_BULK_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Default fixed worker count when auto-scaling is disabled.
pub const DEFAULT_WORKERS: usize = 10;

/// Default auto-scaling ceiling.
pub const DEFAULT_MAX_WORKERS: usize = 100;

/// Default stale buckets handled per worker when auto-scaling.
pub const DEFAULT_BUCKETS_PER_WORKER: usize = 50;

fn default_freshness_bands() -> Vec<String> {
    vec!["10m".to_string(), "1h".to_string(), "1d".to_string()]
}

// =============================================================================
// Database Configuration
// =============================================================================

/// Statistics database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database file path.
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "bucketstats.db".to_string(),
        }
    }
}

// =============================================================================
// Admin Client Configuration
// =============================================================================

/// Admin control-plane client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Admin binary, resolved via PATH unless absolute.
    pub binary: String,

    /// Cluster configuration file passed to the admin binary.
    pub ceph_conf: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            binary: DEFAULT_ADMIN_BINARY.to_string(),
            ceph_conf: DEFAULT_CEPH_CONF.to_string(),
        }
    }
}

// =============================================================================
// Collection Configuration
// =============================================================================

/// Collection engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    /// End-to-start delay between cycles (default: 5m).
    #[serde(with = "humantime_serde")]
    pub refresh_interval: Duration,

    /// Age past which a stored bucket is stale (default: 1h).
    #[serde(with = "humantime_serde")]
    pub stale_threshold: Duration,

    /// Stale count above which a cycle runs a bulk sweep (default: 500).
    pub bulk_cutover: usize,

    /// Deadline for one admin command (default: 60s).
    #[serde(with = "humantime_serde")]
    pub command_timeout: Duration,

    /// Deadline for a cluster-wide bulk sweep (default: 30m).
    #[serde(with = "humantime_serde")]
    pub bulk_timeout: Duration,

    /// Fixed worker count used when `auto_scale` is off (default: 10).
    pub workers: usize,

    /// Auto-scaling ceiling (default: 100).
    pub max_workers: usize,

    /// Scale workers to the stale backlog (default: true).
    pub auto_scale: bool,

    /// Stale buckets per worker when auto-scaling (default: 50).
    pub buckets_per_worker: usize,

    /// Also fetch multisite replication status per bucket (default: false).
    pub collect_sync: bool,

    /// History policy: `always` or `on_change` (default: always).
    pub history: HistoryMode,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            stale_threshold: DEFAULT_STALE_THRESHOLD,
            bulk_cutover: DEFAULT_BULK_CUTOVER,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            bulk_timeout: DEFAULT_BULK_TIMEOUT,
            workers: DEFAULT_WORKERS,
            max_workers: DEFAULT_MAX_WORKERS,
            auto_scale: true,
            buckets_per_worker: DEFAULT_BUCKETS_PER_WORKER,
            collect_sync: false,
            history: HistoryMode::Always,
        }
    }
}

// =============================================================================
// Snapshot Cache Configuration
// =============================================================================

/// Published snapshot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Path of the published JSON document.
    pub path: String,

    /// Entries in each top-N listing (default: 100).
    pub top_limit: usize,

    /// Entries in the per-owner listing (default: 50).
    pub owner_limit: usize,

    /// Entries in the replication-lag listing (default: 50).
    pub behind_limit: usize,

    /// Ascending freshness histogram band edges (default: 10m, 1h, 1d).
    pub freshness_bands: Vec<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: "bucket-stats.json".to_string(),
            top_limit: 100,
            owner_limit: 50,
            behind_limit: 50,
            freshness_bands: default_freshness_bands(),
        }
    }
}

impl CacheConfig {
    /// Convert to snapshot options. Band strings are validated by
    /// [`AppConfig::validate`]; anything unparsable is skipped here.
    pub fn snapshot_options(&self) -> SnapshotOptions {
        SnapshotOptions {
            top_limit: self.top_limit,
            owner_limit: self.owner_limit,
            behind_limit: self.behind_limit,
            freshness_bands: self
                .freshness_bands
                .iter()
                .filter_map(|s| parse_duration(s).ok())
                .collect(),
        }
    }
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Statistics database configuration.
    pub database: DatabaseConfig,

    /// Admin client configuration.
    pub client: ClientConfig,

    /// Collection engine configuration.
    pub collection: CollectionConfig,

    /// Published snapshot configuration.
    pub cache: CacheConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// Environment variables (`${VAR}`, `${VAR:-default}`) are expanded in
    /// the raw file content before parsing.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_yaml::from_str(&expand_env_vars(&content))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.path.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "database path must not be empty".to_string(),
            ));
        }

        if self.client.binary.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "client binary must not be empty".to_string(),
            ));
        }

        let c = &self.collection;
        if c.refresh_interval.is_zero() {
            return Err(ConfigError::ValidationError(
                "collection refresh_interval must be positive".to_string(),
            ));
        }
        if c.stale_threshold.is_zero() {
            return Err(ConfigError::ValidationError(
                "collection stale_threshold must be positive".to_string(),
            ));
        }
        if c.command_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "collection command_timeout must be positive".to_string(),
            ));
        }
        if c.bulk_timeout < c.command_timeout {
            return Err(ConfigError::ValidationError(
                "collection bulk_timeout must be at least command_timeout".to_string(),
            ));
        }
        if c.workers == 0 {
            return Err(ConfigError::ValidationError(
                "collection workers must be positive".to_string(),
            ));
        }
        if c.max_workers == 0 {
            return Err(ConfigError::ValidationError(
                "collection max_workers must be positive".to_string(),
            ));
        }
        if c.buckets_per_worker == 0 {
            return Err(ConfigError::ValidationError(
                "collection buckets_per_worker must be positive".to_string(),
            ));
        }

        if self.cache.path.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "cache path must not be empty".to_string(),
            ));
        }
        if self.cache.top_limit == 0 {
            return Err(ConfigError::ValidationError(
                "cache top_limit must be positive".to_string(),
            ));
        }
        if self.cache.freshness_bands.is_empty() {
            return Err(ConfigError::ValidationError(
                "cache freshness_bands must not be empty".to_string(),
            ));
        }
        let mut previous = Duration::ZERO;
        for band in &self.cache.freshness_bands {
            let parsed = parse_duration(band).map_err(|e| {
                ConfigError::ValidationError(format!("cache freshness_bands '{band}': {e}"))
            })?;
            if parsed <= previous {
                return Err(ConfigError::ValidationError(
                    "cache freshness_bands must be strictly ascending".to_string(),
                ));
            }
            previous = parsed;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.database.path, "bucketstats.db");
        assert_eq!(config.client.binary, DEFAULT_ADMIN_BINARY);
        assert_eq!(config.collection.bulk_cutover, 500);
        assert_eq!(config.collection.buckets_per_worker, 50);
        assert_eq!(config.collection.bulk_timeout, Duration::from_secs(1800));
        assert_eq!(config.collection.history, HistoryMode::Always);
        assert!(!config.collection.collect_sync);
    }

    #[test]
    fn test_parse_yaml_with_humantime_durations() {
        let yaml = r#"
database:
  path: /var/lib/bucketstats/stats.db
collection:
  refresh_interval: 2m
  stale_threshold: 30m
  bulk_cutover: 750
  bulk_timeout: 45m
  history: on_change
cache:
  path: /var/cache/bucket-stats.json
  top_limit: 25
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        config.validate().unwrap();

        assert_eq!(config.collection.refresh_interval, Duration::from_secs(120));
        assert_eq!(config.collection.stale_threshold, Duration::from_secs(1800));
        assert_eq!(config.collection.bulk_cutover, 750);
        assert_eq!(config.collection.history, HistoryMode::OnChange);
        assert_eq!(config.cache.top_limit, 25);
        // Unspecified sections keep defaults.
        assert_eq!(config.client.binary, DEFAULT_ADMIN_BINARY);
        assert_eq!(config.collection.max_workers, 100);
    }

    #[test]
    fn test_validation_rejects_zero_workers() {
        let mut config = AppConfig::default();
        config.collection.max_workers = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_workers"));
    }

    #[test]
    fn test_validation_rejects_bulk_timeout_below_command_timeout() {
        let mut config = AppConfig::default();
        config.collection.bulk_timeout = Duration::from_secs(1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_unordered_bands() {
        let mut config = AppConfig::default();
        config.cache.freshness_bands = vec!["1h".to_string(), "10m".to_string()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("ascending"));

        config.cache.freshness_bands = vec!["not-a-duration".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_expands_env_vars() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "database:\n  path: ${TEST_UNSET_DB_PATH_98765:-/tmp/fallback.db}\n",
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.database.path, "/tmp/fallback.db");
    }

    #[test]
    fn test_snapshot_options_from_cache_config() {
        let cache = CacheConfig::default();
        let options = cache.snapshot_options();
        assert_eq!(options.top_limit, 100);
        assert_eq!(
            options.freshness_bands,
            vec![
                Duration::from_secs(600),
                Duration::from_secs(3600),
                Duration::from_secs(86400)
            ]
        );
    }
}
