//! Runtime configuration resolved from the environment.
//!
//! # Responsibility
//! - Resolve database location, collection name and logging settings.
//! - Apply defaults for unset or blank variables.
//!
//! # Invariants
//! - Values are trimmed; blank values behave as unset.
//! - Logging stays disabled unless `SHELTER_LOG_DIR` is provided.

use crate::logging::default_log_level;
use std::path::PathBuf;

pub const DB_PATH_ENV: &str = "SHELTER_DB_PATH";
pub const COLLECTION_ENV: &str = "SHELTER_COLLECTION";
pub const LOG_LEVEL_ENV: &str = "SHELTER_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "SHELTER_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "shelter.sqlite3";
pub const DEFAULT_COLLECTION: &str = "animals";

/// Resolved process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShelterConfig {
    /// SQLite file backing every collection.
    pub db_path: PathBuf,
    /// Collection holding animal records.
    pub collection: String,
    /// Log level passed to `init_logging`.
    pub log_level: String,
    /// Absolute directory for rolling log files, when logging is wanted.
    pub log_dir: Option<PathBuf>,
}

impl ShelterConfig {
    /// Resolves configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Self {
            db_path: read(DB_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DB_FILE_NAME)),
            collection: read(COLLECTION_ENV).unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            log_level: read(LOG_LEVEL_ENV).unwrap_or_else(|| default_log_level().to_string()),
            log_dir: read(LOG_DIR_ENV).map(PathBuf::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ShelterConfig, DEFAULT_COLLECTION};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn config_from(pairs: &[(&str, &str)]) -> ShelterConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        ShelterConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]);
        assert!(config.db_path.ends_with("shelter.sqlite3"));
        assert_eq!(config.collection, DEFAULT_COLLECTION);
        assert!(!config.log_level.is_empty());
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn explicit_values_are_trimmed() {
        let config = config_from(&[
            ("SHELTER_DB_PATH", " /data/aac.sqlite3 "),
            ("SHELTER_COLLECTION", "outcomes"),
            ("SHELTER_LOG_LEVEL", "warn"),
            ("SHELTER_LOG_DIR", "/var/log/shelter"),
        ]);
        assert_eq!(config.db_path, PathBuf::from("/data/aac.sqlite3"));
        assert_eq!(config.collection, "outcomes");
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/shelter")));
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = config_from(&[("SHELTER_COLLECTION", "   "), ("SHELTER_LOG_DIR", "")]);
        assert_eq!(config.collection, DEFAULT_COLLECTION);
        assert_eq!(config.log_dir, None);
    }
}
