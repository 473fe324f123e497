//! Config file helpers: duration parsing and environment expansion.

use std::time::Duration;

use thiserror::Error;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse YAML configuration.
    #[error("failed to parse YAML config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Configuration validation failed.
    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Parse a humantime duration string, the format used by the collection
/// timing knobs (`refresh_interval`, `stale_threshold`, timeouts) and the
/// snapshot freshness bands.
///
/// # Examples
///
/// ```
/// use bucketstats::config::parse_duration;
///
/// assert_eq!(parse_duration("30s").unwrap().as_secs(), 30);
/// assert_eq!(parse_duration("5m").unwrap().as_secs(), 300);
/// assert_eq!(parse_duration("1h30m").unwrap().as_secs(), 5400);
/// assert_eq!(parse_duration("1d").unwrap().as_secs(), 86_400);
/// ```
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("duration string is empty".to_string());
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

/// Expand `${VAR}` and `${VAR:-default}` references in raw config text
/// before it reaches the YAML parser. Unset variables without a default
/// expand to the empty string and are caught by validation.
pub fn expand_env_vars(input: &str) -> String {
    static VAR_PATTERN: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();

    let pattern = VAR_PATTERN.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("failed to compile env var regex")
    });

    pattern
        .replace_all(input, |caps: &regex::Captures| {
            let fallback = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            std::env::var(&caps[1]).unwrap_or_else(|_| fallback.to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_valid() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_duration("30m").unwrap(), Duration::from_secs(1800));
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
    }

    #[test]
    fn test_parse_duration_invalid() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("30x").is_err());
        assert!(parse_duration("30").is_err());
    }

    #[test]
    fn test_expand_env_vars_no_vars() {
        assert_eq!(expand_env_vars("path: /var/lib/stats"), "path: /var/lib/stats");
    }

    #[test]
    fn test_expand_env_vars_with_default() {
        // Use a variable that definitely doesn't exist
        let result = expand_env_vars("conf: ${NONEXISTENT_CEPH_CONF_12345:-/etc/ceph/ceph.conf}");
        assert_eq!(result, "conf: /etc/ceph/ceph.conf");
    }

    #[test]
    fn test_expand_env_vars_unset_without_default() {
        assert_eq!(expand_env_vars("path: ${NONEXISTENT_DB_PATH_12345}"), "path: ");
    }

    #[test]
    fn test_expand_env_vars_from_env() {
        std::env::set_var("TEST_STATS_DB_PATH", "/tmp/stats.db");
        let result = expand_env_vars("path: ${TEST_STATS_DB_PATH}");
        assert_eq!(result, "path: /tmp/stats.db");
        std::env::remove_var("TEST_STATS_DB_PATH");
    }
}
