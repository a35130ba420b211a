// crates/clientbook-config/src/config.rs
// ============================================================================
// Module: Clientbook Configuration
// Description: Configuration loading and validation for the clientbook CLI.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: clientbook-core, clientbook-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The path comes from the caller, else `CLIENTBOOK_CONFIG`, else
//! `clientbook.toml` in the working directory. Only the implicit default file
//! may be absent, in which case the built-in defaults apply. Every section is
//! optional and validated after parsing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use clientbook_core::is_reserved_key;
use clientbook_core::runtime::DEFAULT_DUPLICATE_MARKER;
use clientbook_store_sqlite::SqliteStoreConfig;
use clientbook_store_sqlite::SqliteStoreMode;
use clientbook_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "clientbook.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "CLIENTBOOK_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default `SQLite` database path.
const DEFAULT_STORE_PATH: &str = "clientbook.db";
/// Default records table name.
const DEFAULT_TABLE: &str = "clients";
/// Default local cache directory.
const DEFAULT_CACHE_DIR: &str = ".clientbook";
/// Default store busy timeout in milliseconds.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum store busy timeout in milliseconds.
pub(crate) const MAX_BUSY_TIMEOUT_MS: u64 = 60_000;
/// Maximum records table name length.
pub(crate) const MAX_TABLE_NAME_LENGTH: usize = 64;
/// Maximum duplication marker length.
pub(crate) const MAX_DUPLICATE_MARKER_LENGTH: usize = 64;
/// Maximum primary field key length.
pub(crate) const MAX_FIELD_KEY_LENGTH: usize = 128;
/// Table names owned by the `SQLite` store.
const STORE_OWNED_TABLES: &[&str] = &["store_meta", "columns"];

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Clientbook configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ClientbookConfig {
    /// Schema source configuration.
    #[serde(default)]
    pub schema: SchemaConfig,
    /// Remote store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Local cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Record defaults.
    #[serde(default)]
    pub records: RecordsConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// File the configuration was read from (not serialized).
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl ClientbookConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (resolved, explicit) = resolve_path(path)?;
        validate_path(&resolved)?;
        if !explicit && !resolved.exists() {
            let mut config = Self::default();
            config.validate()?;
            return Ok(config);
        }
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config = Self::from_toml(content)?;
        config.source = Some(resolved);
        Ok(config)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.store.validate()?;
        self.cache.validate()?;
        self.records.validate()?;
        Ok(())
    }
}

/// Where the session schema is resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SchemaSourceMode {
    /// Metadata rows in the store, with physical columns kept in sync.
    #[default]
    MetadataTable,
    /// Physical columns of the records table only.
    Structure,
    /// Local cache only; records are kept in the cache as well.
    LocalOnly,
}

impl SchemaSourceMode {
    /// Returns the configuration label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MetadataTable => "metadata_table",
            Self::Structure => "structure",
            Self::LocalOnly => "local_only",
        }
    }
}

/// Schema source configuration.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct SchemaConfig {
    /// Schema source mode.
    #[serde(default)]
    pub source: SchemaSourceMode,
}

/// Remote store backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// Use the `SQLite`-backed durable store.
    #[default]
    Sqlite,
    /// Use the in-memory store (nothing survives the process).
    Memory,
}

/// Remote store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Store backend type.
    #[serde(rename = "type", default)]
    pub store_type: StoreType,
    /// `SQLite` database path when using the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Records table name.
    #[serde(default = "default_table")]
    pub table: String,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default, skip_serializing)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default, skip_serializing)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::default(),
            path: None,
            table: default_table(),
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl StoreConfig {
    /// Returns the effective `SQLite` database path.
    #[must_use]
    pub fn effective_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH))
    }

    /// Builds the `SQLite` store configuration.
    #[must_use]
    pub fn sqlite_config(&self) -> SqliteStoreConfig {
        let mut config = SqliteStoreConfig::new(self.effective_path());
        config.busy_timeout_ms = self.busy_timeout_ms;
        config.journal_mode = self.journal_mode;
        config.sync_mode = self.sync_mode;
        config.table.clone_from(&self.table);
        config
    }

    /// Validates store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_table_name(&self.table)?;
        if self.busy_timeout_ms > MAX_BUSY_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "store.busy_timeout_ms must be at most {MAX_BUSY_TIMEOUT_MS}"
            )));
        }
        match self.store_type {
            StoreType::Memory => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid(
                        "memory store must not set path".to_string(),
                    ));
                }
                Ok(())
            }
            StoreType::Sqlite => {
                if let Some(path) = &self.path {
                    validate_path_string("store.path", &path.to_string_lossy())?;
                }
                Ok(())
            }
        }
    }
}

/// Local cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Directory holding cache entries.
    #[serde(default = "default_cache_dir")]
    pub path: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_dir(),
        }
    }
}

impl CacheConfig {
    /// Validates cache configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("cache.path", &self.path.to_string_lossy())?;
        if self.path.is_file() {
            return Err(ConfigError::Invalid("cache.path must be a directory".to_string()));
        }
        Ok(())
    }
}

/// Record defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecordsConfig {
    /// Field used for sorting and duplication; defaults to the lowest-ranked
    /// field.
    #[serde(default)]
    pub primary_field: Option<String>,
    /// Suffix appended to the primary field of duplicated records.
    #[serde(default = "default_duplicate_marker")]
    pub duplicate_marker: String,
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            primary_field: None,
            duplicate_marker: default_duplicate_marker(),
        }
    }
}

impl RecordsConfig {
    /// Validates record defaults.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(key) = &self.primary_field {
            if key.trim().is_empty() || key.len() > MAX_FIELD_KEY_LENGTH {
                return Err(ConfigError::Invalid(
                    "records.primary_field must be a non-empty field key".to_string(),
                ));
            }
            if key.chars().any(char::is_whitespace) {
                return Err(ConfigError::Invalid(
                    "records.primary_field must not contain whitespace".to_string(),
                ));
            }
            if is_reserved_key(key) {
                return Err(ConfigError::Invalid(format!(
                    "records.primary_field must not be a reserved key: {key}"
                )));
            }
        }
        if self.duplicate_marker.is_empty() {
            return Err(ConfigError::Invalid(
                "records.duplicate_marker must be non-empty".to_string(),
            ));
        }
        if self.duplicate_marker.len() > MAX_DUPLICATE_MARKER_LENGTH {
            return Err(ConfigError::Invalid(
                "records.duplicate_marker exceeds max length".to_string(),
            ));
        }
        Ok(())
    }
}

/// Log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Errors only.
    Error,
    /// Warnings and errors.
    #[default]
    Warn,
    /// Informational events.
    Info,
    /// Debug events.
    Debug,
    /// Everything.
    Trace,
}

impl LogLevel {
    /// Returns the filter directive for the level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable single-line events.
    #[default]
    Compact,
    /// One JSON object per event.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Minimum level emitted.
    #[serde(default)]
    pub level: LogLevel,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
///
/// Returns the path and whether it was requested explicitly.
fn resolve_path(path: Option<&Path>) -> Result<(PathBuf, bool), ConfigError> {
    if let Some(path) = path {
        return Ok((path.to_path_buf(), true));
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok((PathBuf::from(env_path), true));
    }
    Ok((PathBuf::from(DEFAULT_CONFIG_NAME), false))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    let path = Path::new(trimmed);
    for component in path.components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates the records table name.
fn validate_table_name(table: &str) -> Result<(), ConfigError> {
    if table.is_empty() || table.len() > MAX_TABLE_NAME_LENGTH {
        return Err(ConfigError::Invalid("store.table length out of range".to_string()));
    }
    let mut chars = table.chars();
    let starts_ok = chars.next().is_some_and(|ch| ch.is_ascii_alphabetic() || ch == '_');
    if !starts_ok || !chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
        return Err(ConfigError::Invalid(
            "store.table must be an ascii identifier".to_string(),
        ));
    }
    if STORE_OWNED_TABLES.contains(&table) {
        return Err(ConfigError::Invalid(format!("store.table is reserved: {table}")));
    }
    Ok(())
}

/// Returns the default records table name.
fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

/// Returns the default busy timeout.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Returns the default cache directory.
fn default_cache_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_DIR)
}

/// Returns the default duplication marker.
fn default_duplicate_marker() -> String {
    DEFAULT_DUPLICATE_MARKER.to_string()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
