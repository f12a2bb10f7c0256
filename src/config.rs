//! Runtime configuration
//!
//! Settings are resolved in three layers: built-in defaults, an optional TOML
//! file, then environment variables. Empty environment values count as unset,
//! except `LOG_FILE` where an empty value disables the file log.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entity::{EntityKind, SnapshotDate};
use crate::ingest::DEFAULT_BATCH_SIZE;
use crate::store::{Connector, Store, StoreError};

/// Errors raised while resolving configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A setting has an unusable value
    #[error("Invalid value for {key}: '{value}' ({reason})")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },

    /// TOML parsing error
    #[error("Config file parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Config file could not be read
    #[error("Cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No snapshot date could be determined for a single-pass run
    #[error("Cannot determine dump date: {0}")]
    MissingDumpDate(String),

    /// Entity kind argument not recognised
    #[error("Unsupported data type: {0}")]
    UnsupportedKind(String),
}

impl ConfigError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            ConfigError::MissingDumpDate(reason) => format!(
                "Cannot determine the dump date: {reason}\n\n\
                Hint: Run inside a checked-out archive whose HEAD commit message contains \
                'dump-YYYY-MM-DD.', or set DATA_DATE=YYYY-MM-DD."
            ),
            ConfigError::UnsupportedKind(kind) => format!(
                "Unsupported data type: {kind}\n\n\
                Hint: Use one of character, person, subject or all."
            ),
            ConfigError::Invalid { key, .. } => {
                format!("{self}\n\nHint: Check the {key} setting.")
            }
            _ => self.to_string(),
        }
    }

    fn invalid(key: &str, value: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Database backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Postgres,
    DuckDb,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Backend::Postgres),
            "duckdb" => Ok(Backend::DuckDb),
            other => Err(format!(
                "Invalid backend: {other}. Expected: postgres, duckdb"
            )),
        }
    }
}

/// PostgreSQL connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: "bangumi".to_string(),
            user: "postgres".to_string(),
            password: "postgres".to_string(),
        }
    }
}

impl PostgresConfig {
    /// `host:port/dbname`, without credentials
    pub fn describe(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.database)
    }
}

/// Which store to write to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: Backend,
    pub postgres: PostgresConfig,
    pub duckdb_path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            postgres: PostgresConfig::default(),
            duckdb_path: PathBuf::from("bangumi.duckdb"),
        }
    }
}

impl Connector for DatabaseConfig {
    fn connect(&self) -> Result<Box<dyn Store>, StoreError> {
        match self.backend {
            #[cfg(feature = "postgres-backend")]
            Backend::Postgres => Ok(Box::new(crate::store::PostgresStore::connect(
                &self.postgres,
            )?)),
            #[cfg(not(feature = "postgres-backend"))]
            Backend::Postgres => Err(StoreError::Unsupported("postgres".to_string())),

            #[cfg(feature = "duckdb-backend")]
            Backend::DuckDb => Ok(Box::new(crate::store::DuckDbStore::open(
                &self.duckdb_path.display().to_string(),
            )?)),
            #[cfg(not(feature = "duckdb-backend"))]
            Backend::DuckDb => Err(StoreError::Unsupported("duckdb".to_string())),
        }
    }

    fn describe(&self) -> String {
        match self.backend {
            Backend::Postgres => format!("postgres:{}", self.postgres.describe()),
            Backend::DuckDb => format!("duckdb:{}", self.duckdb_path.display()),
        }
    }
}

/// Location and layout of the dump archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Working tree holding the JSONL files (a git checkout in walker mode)
    pub dir: PathBuf,
    /// Branch whose history is walked
    pub branch: String,
    pub character_file: String,
    pub person_file: String,
    pub subject_file: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("bangumiArchive"),
            branch: "master".to_string(),
            character_file: EntityKind::Character.default_file_name().to_string(),
            person_file: EntityKind::Person.default_file_name().to_string(),
            subject_file: EntityKind::Subject.default_file_name().to_string(),
        }
    }
}

impl ArchiveConfig {
    /// Archive rooted at `dir` with default file names
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    /// Input file for an entity kind
    pub fn file_for(&self, kind: EntityKind) -> PathBuf {
        let name = match kind {
            EntityKind::Character => &self.character_file,
            EntityKind::Person => &self.person_file,
            EntityKind::Subject => &self.subject_file,
        };
        self.dir.join(name)
    }

    /// Every input file, in processing order
    pub fn data_files(&self) -> Vec<PathBuf> {
        EntityKind::ALL.iter().map(|k| self.file_for(*k)).collect()
    }
}

/// Batching and progress display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub batch_size: usize,
    pub show_progress: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            show_progress: true,
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Plain-text log file, in addition to stdout
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: Some(PathBuf::from("bangumi_data_processor.log")),
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub archive: ArchiveConfig,
    pub batch: BatchConfig,
    pub log: LogConfig,
    /// Explicit snapshot date for single-pass runs
    pub data_date: Option<SnapshotDate>,
    /// First checkpoint of a backfill walk; enables walker mode
    pub start_date: Option<SnapshotDate>,
}

impl AppConfig {
    /// Defaults, then the optional TOML file, then the process environment
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match file {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Defaults overlaid with values from `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.apply_overrides(lookup)?;
        Ok(config)
    }

    /// Parse TOML text; absent keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Overlay environment-style variables onto this configuration
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("DB_BACKEND") {
            self.database.backend = v
                .parse()
                .map_err(|e: String| ConfigError::invalid("DB_BACKEND", &v, e))?;
        }
        if let Some(v) = get("DB_HOST") {
            self.database.postgres.host = v;
        }
        if let Some(v) = get("DB_PORT") {
            self.database.postgres.port = parse_number("DB_PORT", &v)?;
        }
        if let Some(v) = get("DB_NAME") {
            self.database.postgres.database = v;
        }
        if let Some(v) = get("DB_USER") {
            self.database.postgres.user = v;
        }
        if let Some(v) = get("DB_PASSWORD") {
            self.database.postgres.password = v;
        }
        if let Some(v) = get("DUCKDB_PATH") {
            self.database.duckdb_path = PathBuf::from(v);
        }

        if let Some(v) = get("ARCHIVE_DIR") {
            self.archive.dir = PathBuf::from(v);
        }
        if let Some(v) = get("ARCHIVE_BRANCH") {
            self.archive.branch = v;
        }

        if let Some(v) = get("DATA_DATE") {
            self.data_date = Some(parse_date("DATA_DATE", &v)?);
        }
        if let Some(v) = get("DATA_START_DATE") {
            self.start_date = Some(parse_date("DATA_START_DATE", &v)?);
        }

        if let Some(v) = get("BATCH_SIZE") {
            let size: usize = parse_number("BATCH_SIZE", &v)?;
            if size == 0 {
                return Err(ConfigError::invalid("BATCH_SIZE", &v, "must be at least 1"));
            }
            self.batch.batch_size = size;
        }
        if let Some(v) = get("SHOW_PROGRESS") {
            self.batch.show_progress = parse_flag("SHOW_PROGRESS", &v)?;
        }

        if let Some(v) = get("LOG_LEVEL") {
            self.log.level = v;
        }
        if let Some(v) = lookup("LOG_FILE") {
            let v = v.trim();
            self.log.file = (!v.is_empty()).then(|| PathBuf::from(v));
        }

        Ok(())
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(key, value, "expected a non-negative integer"))
}

fn parse_date(key: &str, value: &str) -> Result<SnapshotDate, ConfigError> {
    SnapshotDate::parse(value).map_err(|e| ConfigError::invalid(key, value, e.to_string()))
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(key, value, "expected true or false")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.database.backend, Backend::Postgres);
        assert_eq!(config.database.postgres.describe(), "localhost:5432/bangumi");
        assert_eq!(config.batch.batch_size, 1000);
        assert!(config.batch.show_progress);
        assert_eq!(
            config.archive.file_for(EntityKind::Subject),
            PathBuf::from("bangumiArchive/subject.jsonlines")
        );
        assert_eq!(
            config.log.file,
            Some(PathBuf::from("bangumi_data_processor.log"))
        );
        assert!(config.start_date.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DB_BACKEND", "duckdb"),
            ("DB_PORT", "6543"),
            ("DATA_START_DATE", "2024-02-01"),
            ("DATA_DATE", ""),
            ("BATCH_SIZE", "50"),
            ("SHOW_PROGRESS", "false"),
            ("LOG_FILE", ""),
        ]))
        .unwrap();

        assert_eq!(config.database.backend, Backend::DuckDb);
        assert_eq!(config.database.postgres.port, 6543);
        assert_eq!(config.start_date.unwrap().to_string(), "2024-02-01");
        assert!(config.data_date.is_none());
        assert_eq!(config.batch.batch_size, 50);
        assert!(!config.batch.show_progress);
        assert!(config.log.file.is_none());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(AppConfig::from_lookup(lookup(&[("DB_PORT", "abc")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("BATCH_SIZE", "0")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("DATA_DATE", "2024-2-30")])).is_err());
        let err = AppConfig::from_lookup(lookup(&[("DB_BACKEND", "mysql")])).unwrap_err();
        assert!(err.user_message().contains("DB_BACKEND"));
    }

    #[test]
    fn test_toml_then_env() {
        let mut config = AppConfig::from_toml_str(
            r#"
            start_date = "2023-12-01"

            [database]
            backend = "duckdb"
            duckdb_path = "stats.duckdb"

            [archive]
            dir = "/data/archive"
            "#,
        )
        .unwrap();
        assert_eq!(config.database.backend, Backend::DuckDb);
        assert_eq!(config.archive.branch, "master");
        assert_eq!(config.start_date.unwrap().to_string(), "2023-12-01");

        config
            .apply_overrides(lookup(&[("ARCHIVE_DIR", "/other")]))
            .unwrap();
        assert_eq!(config.archive.dir, PathBuf::from("/other"));
        assert_eq!(config.database.duckdb_path, PathBuf::from("stats.duckdb"));
    }
}
