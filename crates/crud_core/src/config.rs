//! Process configuration resolved from environment variables.
//!
//! | variable         | default                  |
//! |------------------|--------------------------|
//! | `CRUD_DB_PATH`   | `crud.sqlite3`           |
//! | `CRUD_LOG_LEVEL` | [`default_log_level`]    |
//! | `CRUD_LOG_DIR`   | unset (logging disabled) |

use crate::logging::{default_log_level, normalize_level, normalize_log_dir, LoggingError};
use std::path::PathBuf;

pub const DB_PATH_VAR: &str = "CRUD_DB_PATH";
pub const LOG_LEVEL_VAR: &str = "CRUD_LOG_LEVEL";
pub const LOG_DIR_VAR: &str = "CRUD_LOG_DIR";
pub const DEFAULT_DB_FILE_NAME: &str = "crud.sqlite3";

/// Resolved core configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    /// Normalized level name.
    pub log_level: &'static str,
    /// Absolute directory for rolling log files. `None` disables file logs.
    pub log_dir: Option<PathBuf>,
}

impl CoreConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, LoggingError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, LoggingError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let db_path = read(DB_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE_NAME));
        let log_level = match read(LOG_LEVEL_VAR) {
            Some(level) => normalize_level(&level)?,
            None => default_log_level(),
        };
        let log_dir = read(LOG_DIR_VAR)
            .map(|dir| normalize_log_dir(&dir))
            .transpose()?;

        Ok(Self {
            db_path,
            log_level,
            log_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{CoreConfig, DEFAULT_DB_FILE_NAME};
    use crate::logging::{default_log_level, LoggingError};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset_or_blank() {
        let config = CoreConfig::from_lookup(lookup(&[("CRUD_DB_PATH", "  ")])).unwrap();
        assert_eq!(config.db_path, PathBuf::from(DEFAULT_DB_FILE_NAME));
        assert_eq!(config.log_level, default_log_level());
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn explicit_values_are_normalized() {
        let config = CoreConfig::from_lookup(lookup(&[
            ("CRUD_DB_PATH", "/var/lib/crud/employees.db"),
            ("CRUD_LOG_LEVEL", "WARNING"),
            ("CRUD_LOG_DIR", "/var/log/crud"),
        ]))
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/var/lib/crud/employees.db"));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/crud")));
    }

    #[test]
    fn invalid_level_and_relative_log_dir_are_rejected() {
        let err = CoreConfig::from_lookup(lookup(&[("CRUD_LOG_LEVEL", "chatty")])).unwrap_err();
        assert_eq!(err, LoggingError::UnsupportedLevel("chatty".to_string()));

        let err = CoreConfig::from_lookup(lookup(&[("CRUD_LOG_DIR", "logs")])).unwrap_err();
        assert!(matches!(err, LoggingError::InvalidDirectory(_)));
    }
}
