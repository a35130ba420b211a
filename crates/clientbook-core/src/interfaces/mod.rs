// crates/clientbook-core/src/interfaces/mod.rs
// ============================================================================
// Module: Clientbook Interfaces
// Description: Collaborator traits for remote storage and the local cache.
// Purpose: Decouple schema and record logic from concrete backends.
// Dependencies: crate::core, async-trait, thiserror
// ============================================================================

//! ## Overview
//! The core talks to storage exclusively through these traits:
//! - [`RecordBackend`] performs record CRUD.
//! - [`FieldMetadataBackend`] stores field definitions as rows (metadata-table
//!   deployments).
//! - [`TableStructureBackend`] introspects and alters the physical columns of
//!   the records table (structural deployments).
//! - [`LocalCache`] is a synchronous durable key/value store.
//!
//! Remote traits are async and report failures as [`RemoteError`]. The cache
//! is synchronous and reports failures as [`CacheError`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::FieldDefinition;
use crate::core::FieldKey;
use crate::core::FieldValues;
use crate::core::Record;
use crate::core::RecordId;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures surfaced by remote collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Transport or server failure.
    #[error("remote transport error: {0}")]
    Transport(String),
    /// The remote refused the request.
    #[error("remote rejected request: {0}")]
    Rejected(String),
    /// The addressed resource does not exist remotely.
    #[error("remote resource not found: {0}")]
    NotFound(String),
}

/// Failures surfaced by the local cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// Cache I/O error.
    #[error("cache io error: {0}")]
    Io(String),
    /// Cache key or payload is invalid.
    #[error("cache invalid data: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Records
// ============================================================================

/// Remote record CRUD.
#[async_trait]
pub trait RecordBackend: Send + Sync {
    /// Lists every record, ordered by the given field when supported.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] on transport or server failure.
    async fn list_records(&self, order_by: Option<&FieldKey>) -> Result<Vec<Record>, RemoteError>;

    /// Inserts a record and returns the stored form.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] when the insert fails.
    async fn insert_record(&self, record: &Record) -> Result<Record, RemoteError>;

    /// Replaces the values of an existing record and returns the stored form.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::NotFound`] when the record does not exist.
    async fn update_record(
        &self,
        id: &RecordId,
        values: &FieldValues,
    ) -> Result<Record, RemoteError>;

    /// Deletes a record.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::NotFound`] when the record does not exist.
    async fn delete_record(&self, id: &RecordId) -> Result<(), RemoteError>;
}

// ============================================================================
// SECTION: Field Metadata
// ============================================================================

/// Remote field metadata rows.
#[async_trait]
pub trait FieldMetadataBackend: Send + Sync {
    /// Lists stored field definitions.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] when the listing fails.
    async fn list_fields(&self) -> Result<Vec<FieldDefinition>, RemoteError>;

    /// Inserts a field definition.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] when the insert fails.
    async fn insert_field(&self, field: &FieldDefinition) -> Result<(), RemoteError>;

    /// Replaces the definition stored under `key`, which may change the key.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] when the update fails.
    async fn update_field(&self, key: &FieldKey, field: &FieldDefinition)
    -> Result<(), RemoteError>;

    /// Deletes a field definition.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] when the delete fails.
    async fn delete_field(&self, key: &FieldKey) -> Result<(), RemoteError>;

    /// Replaces every stored definition with `fields`.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] when the replacement fails.
    async fn replace_all_fields(&self, fields: &[FieldDefinition]) -> Result<(), RemoteError>;
}

// ============================================================================
// SECTION: Table Structure
// ============================================================================

/// Physical column reported by structural introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalField {
    /// Column name.
    pub name: String,
    /// Declared column type.
    pub data_type: String,
}

impl PhysicalField {
    /// Creates a physical field description.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// Remote structural introspection and DDL.
#[async_trait]
pub trait TableStructureBackend: Send + Sync {
    /// Returns the physical columns of `table` in declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] when introspection fails.
    async fn describe_table(&self, table: &str) -> Result<Vec<PhysicalField>, RemoteError>;

    /// Adds a physical column.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] when the column cannot be added.
    async fn add_column(&self, table: &str, name: &str, data_type: &str)
    -> Result<(), RemoteError>;

    /// Renames a physical column in place, preserving stored values.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] when the rename fails.
    async fn rename_column(&self, table: &str, old: &str, new: &str) -> Result<(), RemoteError>;

    /// Drops a physical column and its values.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] when the drop fails.
    async fn drop_column(&self, table: &str, name: &str) -> Result<(), RemoteError>;
}

// ============================================================================
// SECTION: Local Cache
// ============================================================================

/// Local durable key/value cache.
pub trait LocalCache: Send + Sync {
    /// Reads the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the cache cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the cache cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;
}
