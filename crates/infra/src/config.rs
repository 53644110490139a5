//! Runtime configuration, read from `ATRIUM_*` environment variables.

use std::path::PathBuf;

use thiserror::Error;

pub const CACHE_ENABLED: &str = "ATRIUM_CACHE_ENABLED";
pub const CACHE_MAX_USERS: &str = "ATRIUM_CACHE_MAX_USERS";
pub const SNAPSHOT: &str = "ATRIUM_SNAPSHOT";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{key}: expected a boolean, got '{value}'")]
    InvalidBool { key: &'static str, value: String },

    #[error("{key}: expected a positive integer, got '{value}'")]
    InvalidNumber { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessConfig {
    /// Wrap the evaluator in a per-user decision cache.
    pub cache_enabled: bool,
    /// Users kept in the cache before the least recently used is evicted.
    pub cache_max_users: usize,
    /// Default snapshot file for the CLI.
    pub snapshot_path: Option<PathBuf>,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_max_users: 1024,
            snapshot_path: None,
        }
    }
}

impl AccessConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset or blank keys keep their
    /// defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(value) = get(CACHE_ENABLED) {
            config.cache_enabled = match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::InvalidBool {
                        key: CACHE_ENABLED,
                        value,
                    });
                }
            };
        }

        if let Some(value) = get(CACHE_MAX_USERS) {
            config.cache_max_users = match value.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidNumber {
                        key: CACHE_MAX_USERS,
                        value,
                    });
                }
            };
        }

        config.snapshot_path = get(SNAPSHOT).map(PathBuf::from);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        assert_eq!(AccessConfig::from_lookup(lookup(&[])).unwrap(), AccessConfig::default());
    }

    #[test]
    fn parses_all_keys() {
        let config = AccessConfig::from_lookup(lookup(&[
            (CACHE_ENABLED, "off"),
            (CACHE_MAX_USERS, "64"),
            (SNAPSHOT, "/var/lib/atrium/access.json"),
        ]))
        .unwrap();
        assert!(!config.cache_enabled);
        assert_eq!(config.cache_max_users, 64);
        assert_eq!(
            config.snapshot_path,
            Some(PathBuf::from("/var/lib/atrium/access.json"))
        );
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(matches!(
            AccessConfig::from_lookup(lookup(&[(CACHE_ENABLED, "maybe")])),
            Err(ConfigError::InvalidBool { .. })
        ));
        assert!(matches!(
            AccessConfig::from_lookup(lookup(&[(CACHE_MAX_USERS, "0")])),
            Err(ConfigError::InvalidNumber { .. })
        ));
    }
}
