//! Configuration for the statistics collector.
//!
//! YAML-based loading with environment-variable expansion and validation:
//! - Database settings (store path)
//! - Admin client settings (binary, cluster config path)
//! - Collection settings (intervals, strategy cutover, worker scaling)
//! - Snapshot cache settings (path, listing limits, freshness bands)

mod app;
mod validation;

pub use app::{AppConfig, CacheConfig, ClientConfig, CollectionConfig, DatabaseConfig};
pub use validation::{expand_env_vars, parse_duration, ConfigError};
