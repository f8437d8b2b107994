//! Run configuration
//!
//! Loaded from an optional TOML file; the binary layers command-line flags on top.
//!
//! ```toml
//! song_data = "data/song_data"
//! log_data = "data/log_data"
//! timezone = "utc"
//!
//! [database]
//! backend = "postgres"
//! host = "127.0.0.1"
//! dbname = "sparkifydb"
//! user = "student"
//! password = "student"
//! ```

use crate::error::EtlError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default file name pattern for data files
pub const DEFAULT_FILE_PATTERN: &str = r"(?i)\.json$";

/// Which clock the `time` dimension is expressed in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeZoneMode {
    #[default]
    Local,
    Utc,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sqlite,
    Postgres,
}

/// Connection target for the persistence sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: Backend,

    /// SQLite database file
    pub path: PathBuf,

    pub host: String,
    pub dbname: String,
    pub user: String,
    pub password: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            backend: Backend::Sqlite,
            path: PathBuf::from("sparkify.db"),
            host: String::from("127.0.0.1"),
            dbname: String::from("sparkifydb"),
            user: String::from("student"),
            password: String::from("student"),
        }
    }
}

impl DatabaseConfig {
    /// libpq-style key/value connection string
    pub fn connection_string(&self) -> String {
        format!(
            "host={} dbname={} user={} password={}",
            self.host, self.dbname, self.user, self.password
        )
    }
}

/// Configuration for a full load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EtlConfig {
    /// Root of the song metadata tree
    pub song_data: PathBuf,

    /// Root of the event log tree
    pub log_data: PathBuf,

    /// Regex matched against file names during discovery
    pub file_pattern: String,

    pub timezone: TimeZoneMode,

    pub database: DatabaseConfig,
}

impl Default for EtlConfig {
    fn default() -> Self {
        EtlConfig {
            song_data: PathBuf::from("data/song_data"),
            log_data: PathBuf::from("data/log_data"),
            file_pattern: String::from(DEFAULT_FILE_PATTERN),
            timezone: TimeZoneMode::Local,
            database: DatabaseConfig::default(),
        }
    }
}

impl EtlConfig {
    /// Read a TOML config file; missing keys take their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, EtlError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| EtlError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, EtlError> {
        toml::from_str(text).map_err(|e| EtlError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EtlConfig::default();
        assert_eq!(config.song_data, PathBuf::from("data/song_data"));
        assert_eq!(config.database.backend, Backend::Sqlite);
        assert_eq!(
            config.database.connection_string(),
            "host=127.0.0.1 dbname=sparkifydb user=student password=student"
        );
    }

    #[test]
    fn test_partial_toml() {
        let config = EtlConfig::from_toml(
            r#"
            log_data = "/tmp/logs"
            timezone = "utc"

            [database]
            backend = "postgres"
            host = "db.internal"
            "#,
        )
        .unwrap();

        assert_eq!(config.log_data, PathBuf::from("/tmp/logs"));
        assert_eq!(config.song_data, PathBuf::from("data/song_data"));
        assert_eq!(config.timezone, TimeZoneMode::Utc);
        assert_eq!(config.database.backend, Backend::Postgres);
        assert_eq!(config.database.host, "db.internal");
        assert_eq!(config.database.dbname, "sparkifydb");
    }

    #[test]
    fn test_invalid_toml() {
        let result = EtlConfig::from_toml("timezone = \"mars\"");
        assert!(matches!(result, Err(EtlError::Config(_))));
    }
}
