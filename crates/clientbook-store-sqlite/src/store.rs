// crates/clientbook-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Client Store
// Description: Durable records, field metadata, and table structure in SQLite.
// Purpose: Back every clientbook remote collaborator with one database file.
// Dependencies: clientbook-core, rusqlite, serde, serde_json, thiserror, tokio
// ============================================================================

//! ## Overview
//! This module implements [`RecordBackend`], [`FieldMetadataBackend`], and
//! [`TableStructureBackend`] over a single `SQLite` database. Records live in
//! a table with one physical `TEXT` column per field plus the reserved `id`
//! and `created_at` columns. Field metadata rows live in the `columns` table
//! and the schema version in `store_meta`.
//!
//! Connection access is serialized through a mutex and every operation runs
//! on the blocking thread pool. Identifiers are always double-quoted; the
//! records table must be the configured one and record values must target
//! existing columns.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use clientbook_core::FieldDefinition;
use clientbook_core::FieldKey;
use clientbook_core::FieldMetadataBackend;
use clientbook_core::FieldValues;
use clientbook_core::PhysicalField;
use clientbook_core::Record;
use clientbook_core::RecordBackend;
use clientbook_core::RecordId;
use clientbook_core::RemoteError;
use clientbook_core::TableStructureBackend;
use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::ToSql;
use rusqlite::params;
use rusqlite::types::ValueRef;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum length of a table or column name.
const MAX_IDENTIFIER_LENGTH: usize = 128;
/// Default records table name.
pub const DEFAULT_RECORDS_TABLE: &str = "clients";
/// Record identifier column.
const ID_COLUMN: &str = "id";
/// Record creation timestamp column.
const CREATED_AT_COLUMN: &str = "created_at";
/// Tables owned by the store that cannot serve as the records table.
const INTERNAL_TABLES: &[&str] = &["store_meta", "columns"];
/// Column type affinities accepted by `add_column`.
const COLUMN_TYPES: &[&str] = &["TEXT", "INTEGER", "REAL", "NUMERIC", "BLOB"];

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` client store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
/// - `table` must not name a store-owned table.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Records table name.
    #[serde(default = "default_records_table")]
    pub table: String,
}

impl SqliteStoreConfig {
    /// Creates a configuration with default pragmas and table name.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
            table: default_records_table(),
        }
    }
}

/// Returns the default busy timeout.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Returns the default records table name.
fn default_records_table() -> String {
    DEFAULT_RECORDS_TABLE.to_string()
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
///
/// # Invariants
/// - Error messages avoid embedding record values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored data failed to decode.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid request or configuration.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Write collided with an existing row or column.
    #[error("sqlite store conflict: {0}")]
    Conflict(String),
    /// Addressed row, column, or table does not exist.
    #[error("sqlite store missing: {0}")]
    NotFound(String),
}

impl From<SqliteStoreError> for RemoteError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::NotFound(message) => Self::NotFound(message),
            SqliteStoreError::Conflict(message) | SqliteStoreError::Invalid(message) => {
                Self::Rejected(message)
            }
            other => Self::Transport(other.to_string()),
        }
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed clientbook remote.
///
/// # Invariants
/// - `SQLite` connection access is serialized through a mutex.
/// - The records table always has `id` and `created_at` columns.
#[derive(Clone)]
pub struct SqliteClientStore {
    /// Store configuration.
    config: Arc<SqliteStoreConfig>,
    /// Shared connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteClientStore {
    /// Opens an `SQLite`-backed client store, creating tables as needed.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the path or table name is invalid or
    /// the database cannot be opened or initialized.
    pub fn new(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        validate_identifier(&config.table)?;
        if INTERNAL_TABLES.contains(&config.table.as_str()) {
            return Err(SqliteStoreError::Invalid(format!(
                "records table name is reserved: {}",
                config.table
            )));
        }
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection, &config.table)?;
        tracing::debug!(
            path = %config.path.display(),
            table = %config.table,
            "sqlite client store opened"
        );
        Ok(Self {
            config: Arc::new(config),
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Returns the store configuration.
    #[must_use]
    pub fn config(&self) -> &SqliteStoreConfig {
        &self.config
    }

    /// Returns the records table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.config.table
    }

    /// Verifies the store can execute a simple SQL statement.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] if the mutex is poisoned or the query fails.
    pub async fn check_connection(&self) -> Result<(), SqliteStoreError> {
        self.run(|connection| {
            connection
                .query_row("SELECT 1", params![], |row| row.get::<_, i64>(0))
                .map(|_| ())
                .map_err(|err| SqliteStoreError::Db(err.to_string()))
        })
        .await
    }

    /// Rejects tables other than the configured records table.
    fn ensure_table(&self, table: &str) -> Result<String, SqliteStoreError> {
        if table == self.config.table {
            Ok(table.to_string())
        } else {
            Err(SqliteStoreError::NotFound(format!("table {table}")))
        }
    }

    /// Runs `op` against the locked connection on the blocking pool.
    async fn run<T, F>(&self, op: F) -> Result<T, SqliteStoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, SqliteStoreError> + Send + 'static,
    {
        let connection = Arc::clone(&self.connection);
        tokio::task::spawn_blocking(move || {
            let mut guard = connection
                .lock()
                .map_err(|_| SqliteStoreError::Io("sqlite mutex poisoned".to_string()))?;
            op(&mut guard)
        })
        .await
        .map_err(|err| SqliteStoreError::Io(format!("sqlite task join failed: {err}")))?
    }
}

// ============================================================================
// SECTION: Record Backend
// ============================================================================

#[async_trait]
impl RecordBackend for SqliteClientStore {
    async fn list_records(&self, order_by: Option<&FieldKey>) -> Result<Vec<Record>, RemoteError> {
        let table = self.config.table.clone();
        let order_by = order_by.cloned();
        let records = self
            .run(move |connection| read_records(connection, &table, order_by.as_ref()))
            .await?;
        Ok(records)
    }

    async fn insert_record(&self, record: &Record) -> Result<Record, RemoteError> {
        let table = self.config.table.clone();
        let record = record.clone();
        let stored = self.run(move |connection| insert_record(connection, &table, record)).await?;
        tracing::debug!(record = %stored.id, "sqlite record inserted");
        Ok(stored)
    }

    async fn update_record(
        &self,
        id: &RecordId,
        values: &FieldValues,
    ) -> Result<Record, RemoteError> {
        let table = self.config.table.clone();
        let id = id.clone();
        let values = values.clone();
        let stored =
            self.run(move |connection| update_record(connection, &table, &id, &values)).await?;
        Ok(stored)
    }

    async fn delete_record(&self, id: &RecordId) -> Result<(), RemoteError> {
        let table = self.config.table.clone();
        let id = id.clone();
        self.run(move |connection| {
            let sql = format!("DELETE FROM {} WHERE {ID_COLUMN} = ?1", quote_identifier(&table));
            let changed = connection
                .execute(&sql, params![id.as_str()])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            if changed == 0 {
                return Err(SqliteStoreError::NotFound(format!("record {id}")));
            }
            Ok(())
        })
        .await?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Field Metadata Backend
// ============================================================================

#[async_trait]
impl FieldMetadataBackend for SqliteClientStore {
    async fn list_fields(&self) -> Result<Vec<FieldDefinition>, RemoteError> {
        Ok(self.run(|connection| read_fields(connection)).await?)
    }

    async fn insert_field(&self, field: &FieldDefinition) -> Result<(), RemoteError> {
        let field = field.clone();
        self.run(move |connection| insert_field_row(connection, &field)).await?;
        Ok(())
    }

    async fn update_field(
        &self,
        key: &FieldKey,
        field: &FieldDefinition,
    ) -> Result<(), RemoteError> {
        let key = key.clone();
        let field = field.clone();
        self.run(move |connection| {
            let options = encode_options(&field.options)?;
            let changed = connection
                .execute(
                    "UPDATE columns SET key = ?1, label = ?2, position = ?3, options_json = ?4 \
                     WHERE key = ?5",
                    params![field.key.as_str(), field.label, field.order, options, key.as_str()],
                )
                .map_err(|err| write_error(err, &format!("field {} already exists", field.key)))?;
            if changed == 0 {
                return Err(SqliteStoreError::NotFound(format!("field {key}")));
            }
            Ok(())
        })
        .await?;
        Ok(())
    }

    async fn delete_field(&self, key: &FieldKey) -> Result<(), RemoteError> {
        let key = key.clone();
        self.run(move |connection| {
            let changed = connection
                .execute("DELETE FROM columns WHERE key = ?1", params![key.as_str()])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            if changed == 0 {
                return Err(SqliteStoreError::NotFound(format!("field {key}")));
            }
            Ok(())
        })
        .await?;
        Ok(())
    }

    async fn replace_all_fields(&self, fields: &[FieldDefinition]) -> Result<(), RemoteError> {
        let fields = fields.to_vec();
        self.run(move |connection| {
            let tx =
                connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.execute("DELETE FROM columns", params![])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            for field in &fields {
                insert_field_row(&tx, field)?;
            }
            tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))
        })
        .await?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Table Structure Backend
// ============================================================================

#[async_trait]
impl TableStructureBackend for SqliteClientStore {
    async fn describe_table(&self, table: &str) -> Result<Vec<PhysicalField>, RemoteError> {
        let table = self.ensure_table(table)?;
        let columns = self.run(move |connection| table_columns(connection, &table)).await?;
        if columns.is_empty() {
            return Err(RemoteError::NotFound(format!("table {}", self.config.table)));
        }
        Ok(columns)
    }

    async fn add_column(
        &self,
        table: &str,
        name: &str,
        data_type: &str,
    ) -> Result<(), RemoteError> {
        let table = self.ensure_table(table)?;
        validate_identifier(name)?;
        let data_type = data_type.to_ascii_uppercase();
        if !COLUMN_TYPES.contains(&data_type.as_str()) {
            return Err(SqliteStoreError::Invalid(format!("unsupported column type: {data_type}"))
                .into());
        }
        let name = name.to_string();
        self.run(move |connection| {
            if column_exists(connection, &table, &name)? {
                return Err(SqliteStoreError::Conflict(format!("duplicate column name: {name}")));
            }
            let sql = format!(
                "ALTER TABLE {} ADD COLUMN {} {data_type}",
                quote_identifier(&table),
                quote_identifier(&name)
            );
            connection.execute_batch(&sql).map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tracing::debug!(table = %table, column = %name, "sqlite column added");
            Ok(())
        })
        .await?;
        Ok(())
    }

    async fn rename_column(&self, table: &str, old: &str, new: &str) -> Result<(), RemoteError> {
        let table = self.ensure_table(table)?;
        ensure_value_column(old)?;
        ensure_value_column(new)?;
        let (old, new) = (old.to_string(), new.to_string());
        self.run(move |connection| {
            if !column_exists(connection, &table, &old)? {
                return Err(SqliteStoreError::NotFound(format!("column {old}")));
            }
            if column_exists(connection, &table, &new)? {
                return Err(SqliteStoreError::Conflict(format!("duplicate column name: {new}")));
            }
            let sql = format!(
                "ALTER TABLE {} RENAME COLUMN {} TO {}",
                quote_identifier(&table),
                quote_identifier(&old),
                quote_identifier(&new)
            );
            connection.execute_batch(&sql).map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tracing::debug!(table = %table, from = %old, to = %new, "sqlite column renamed");
            Ok(())
        })
        .await?;
        Ok(())
    }

    async fn drop_column(&self, table: &str, name: &str) -> Result<(), RemoteError> {
        let table = self.ensure_table(table)?;
        ensure_value_column(name)?;
        let name = name.to_string();
        self.run(move |connection| {
            if !column_exists(connection, &table, &name)? {
                return Err(SqliteStoreError::NotFound(format!("column {name}")));
            }
            let sql = format!(
                "ALTER TABLE {} DROP COLUMN {}",
                quote_identifier(&table),
                quote_identifier(&name)
            );
            connection.execute_batch(&sql).map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tracing::debug!(table = %table, column = %name, "sqlite column dropped");
            Ok(())
        })
        .await?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Records
// ============================================================================

/// Reads every record, ordered case-insensitively by `order_by` when it is a
/// physical column.
fn read_records(
    connection: &Connection,
    table: &str,
    order_by: Option<&FieldKey>,
) -> Result<Vec<Record>, SqliteStoreError> {
    let known = value_columns(connection, table)?;
    let order = match order_by {
        Some(key) if known.contains(key.as_str()) => {
            format!(" ORDER BY {} COLLATE NOCASE, rowid", quote_identifier(key.as_str()))
        }
        _ => " ORDER BY rowid".to_string(),
    };
    let sql = format!("SELECT * FROM {}{order}", quote_identifier(table));
    query_records(connection, &sql, &[])
}

/// Reads the record stored under `id`.
fn read_record(
    connection: &Connection,
    table: &str,
    id: &RecordId,
) -> Result<Option<Record>, SqliteStoreError> {
    let sql = format!("SELECT * FROM {} WHERE {ID_COLUMN} = ?1", quote_identifier(table));
    let id = id.as_str().to_string();
    Ok(query_records(connection, &sql, &[&id])?.into_iter().next())
}

/// Runs a record query and maps every row.
fn query_records(
    connection: &Connection,
    sql: &str,
    bindings: &[&dyn ToSql],
) -> Result<Vec<Record>, SqliteStoreError> {
    let mut stmt = connection.prepare(sql).map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let names: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();
    let mut rows = stmt.query(bindings).map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let mut records = Vec::new();
    while let Some(row) = rows.next().map_err(|err| SqliteStoreError::Db(err.to_string()))? {
        records.push(map_record_row(row, &names)?);
    }
    Ok(records)
}

/// Maps a `SELECT *` row to a record. Null and blob cells are omitted.
fn map_record_row(row: &rusqlite::Row<'_>, names: &[String]) -> Result<Record, SqliteStoreError> {
    let mut id = None;
    let mut created_at = None;
    let mut values = FieldValues::new();
    for (index, name) in names.iter().enumerate() {
        let cell = row.get_ref(index).map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        match name.as_str() {
            ID_COLUMN => id = cell_text(cell),
            CREATED_AT_COLUMN => {
                if let ValueRef::Integer(millis) = cell {
                    created_at = Some(millis);
                }
            }
            _ => {
                if let Some(text) = cell_text(cell) {
                    values.insert(FieldKey::new(name.as_str()), text);
                }
            }
        }
    }
    let Some(id) = id else {
        return Err(SqliteStoreError::Corrupt("record row without id".to_string()));
    };
    let mut record = Record::new(RecordId::new(id), values);
    record.created_at = created_at;
    Ok(record)
}

/// Renders a cell as record text.
fn cell_text(cell: ValueRef<'_>) -> Option<String> {
    match cell {
        ValueRef::Null | ValueRef::Blob(_) => None,
        ValueRef::Integer(value) => Some(value.to_string()),
        ValueRef::Real(value) => Some(value.to_string()),
        ValueRef::Text(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
    }
}

/// Inserts `record`, stamping `created_at` when absent.
fn insert_record(
    connection: &Connection,
    table: &str,
    mut record: Record,
) -> Result<Record, SqliteStoreError> {
    let known = value_columns(connection, table)?;
    ensure_known_columns(&known, &record.values)?;
    let created_at = *record.created_at.get_or_insert_with(unix_millis);
    let id = record.id.as_str().to_string();
    let mut columns = vec![ID_COLUMN.to_string(), CREATED_AT_COLUMN.to_string()];
    let mut values: Vec<&dyn ToSql> = Vec::with_capacity(record.values.len() + 2);
    values.push(&id);
    values.push(&created_at);
    for (key, value) in &record.values {
        columns.push(quote_identifier(key.as_str()));
        values.push(value);
    }
    let placeholders: Vec<String> = (1 ..= columns.len()).map(|index| format!("?{index}")).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_identifier(table),
        columns.join(", "),
        placeholders.join(", ")
    );
    connection
        .execute(&sql, values.as_slice())
        .map_err(|err| write_error(err, &format!("record {} already exists", record.id)))?;
    Ok(record)
}

/// Replaces every value column of the record stored under `id`.
fn update_record(
    connection: &Connection,
    table: &str,
    id: &RecordId,
    values: &FieldValues,
) -> Result<Record, SqliteStoreError> {
    let known = value_columns(connection, table)?;
    ensure_known_columns(&known, values)?;
    let id_text = id.as_str().to_string();
    let changed = if known.is_empty() {
        let sql = format!("SELECT COUNT(1) FROM {} WHERE {ID_COLUMN} = ?1", quote_identifier(table));
        let count: i64 = connection
            .query_row(&sql, params![id_text], |row| row.get(0))
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        usize::from(count > 0)
    } else {
        let absent: Option<&str> = None;
        let mut assignments = Vec::with_capacity(known.len());
        let mut bindings: Vec<&dyn ToSql> = Vec::with_capacity(known.len() + 1);
        bindings.push(&id_text);
        for (index, column) in known.iter().enumerate() {
            assignments.push(format!("{} = ?{}", quote_identifier(column), index + 2));
            match values.get(&FieldKey::new(column.as_str())) {
                Some(value) => bindings.push(value),
                None => bindings.push(&absent),
            }
        }
        let sql = format!(
            "UPDATE {} SET {} WHERE {ID_COLUMN} = ?1",
            quote_identifier(table),
            assignments.join(", ")
        );
        connection
            .execute(&sql, bindings.as_slice())
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?
    };
    if changed == 0 {
        return Err(SqliteStoreError::NotFound(format!("record {id}")));
    }
    read_record(connection, table, id)?
        .ok_or_else(|| SqliteStoreError::NotFound(format!("record {id}")))
}

/// Rejects values addressed to columns the table does not have.
fn ensure_known_columns(
    known: &BTreeSet<String>,
    values: &FieldValues,
) -> Result<(), SqliteStoreError> {
    match values.keys().find(|key| !known.contains(key.as_str())) {
        Some(key) => Err(SqliteStoreError::Invalid(format!("unknown column: {key}"))),
        None => Ok(()),
    }
}

// ============================================================================
// SECTION: Field Metadata
// ============================================================================

/// Reads the metadata rows ordered by position.
fn read_fields(connection: &Connection) -> Result<Vec<FieldDefinition>, SqliteStoreError> {
    let mut stmt = connection
        .prepare("SELECT key, label, position, options_json FROM columns ORDER BY position, rowid")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let rows = stmt
        .query_map(params![], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
            ))
        })
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let mut fields = Vec::new();
    for row in rows {
        let (key, label, order, options_json) =
            row.map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let options: Vec<String> = serde_json::from_str(&options_json).map_err(|err| {
            SqliteStoreError::Corrupt(format!("options of field {key} failed to decode: {err}"))
        })?;
        fields.push(FieldDefinition {
            key: FieldKey::new(key),
            label,
            order,
            options,
        });
    }
    Ok(fields)
}

/// Inserts one metadata row.
fn insert_field_row(connection: &Connection, field: &FieldDefinition) -> Result<(), SqliteStoreError> {
    let options = encode_options(&field.options)?;
    connection
        .execute(
            "INSERT INTO columns (key, label, position, options_json) VALUES (?1, ?2, ?3, ?4)",
            params![field.key.as_str(), field.label, field.order, options],
        )
        .map_err(|err| write_error(err, &format!("field {} already exists", field.key)))?;
    Ok(())
}

/// Serializes choice options for storage.
fn encode_options(options: &[String]) -> Result<String, SqliteStoreError> {
    serde_json::to_string(options).map_err(|err| SqliteStoreError::Invalid(err.to_string()))
}

// ============================================================================
// SECTION: Structure
// ============================================================================

/// Lists the physical columns of `table` in declaration order.
fn table_columns(
    connection: &Connection,
    table: &str,
) -> Result<Vec<PhysicalField>, SqliteStoreError> {
    let mut stmt = connection
        .prepare("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let rows = stmt
        .query_map(params![table], |row| {
            Ok(PhysicalField::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>().map_err(|err| SqliteStoreError::Db(err.to_string()))
}

/// Returns the names of the non-reserved columns of `table`.
fn value_columns(connection: &Connection, table: &str) -> Result<BTreeSet<String>, SqliteStoreError> {
    Ok(table_columns(connection, table)?
        .into_iter()
        .map(|column| column.name)
        .filter(|name| name != ID_COLUMN && name != CREATED_AT_COLUMN)
        .collect())
}

/// Returns true when `table` has a column named `name`.
fn column_exists(connection: &Connection, table: &str, name: &str) -> Result<bool, SqliteStoreError> {
    let found: Option<i64> = connection
        .query_row("SELECT 1 FROM pragma_table_info(?1) WHERE name = ?2", params![table, name], |row| {
            row.get(0)
        })
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(found.is_some())
}

/// Rejects DDL against reserved record columns.
fn ensure_value_column(name: &str) -> Result<(), SqliteStoreError> {
    validate_identifier(name)?;
    if name == ID_COLUMN || name == CREATED_AT_COLUMN {
        return Err(SqliteStoreError::Invalid(format!("column is reserved: {name}")));
    }
    Ok(())
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Validates a table or column name before it is quoted into SQL.
fn validate_identifier(name: &str) -> Result<(), SqliteStoreError> {
    if name.is_empty() || name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(SqliteStoreError::Invalid("identifier length out of range".to_string()));
    }
    if name.chars().any(char::is_control) {
        return Err(SqliteStoreError::Invalid(
            "identifier contains control characters".to_string(),
        ));
    }
    Ok(())
}

/// Double-quotes an identifier, doubling embedded quotes.
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Maps a write failure, reporting constraint violations as conflicts.
fn write_error(err: rusqlite::Error, conflict: &str) -> SqliteStoreError {
    match err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            SqliteStoreError::Conflict(conflict.to_string())
        }
        other => SqliteStoreError::Db(other.to_string()),
    }
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version, then
/// ensures the records table exists.
fn initialize_schema(connection: &mut Connection, table: &str) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS columns (
                    key TEXT PRIMARY KEY,
                    label TEXT NOT NULL,
                    position INTEGER NOT NULL,
                    options_json TEXT NOT NULL DEFAULT '[]'
                );",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {} (
            {ID_COLUMN} TEXT PRIMARY KEY,
            {CREATED_AT_COLUMN} INTEGER NOT NULL
        );",
        quote_identifier(table)
    ))
    .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Returns the current unix epoch in milliseconds.
fn unix_millis() -> i64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}
