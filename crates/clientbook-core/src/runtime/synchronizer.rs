// crates/clientbook-core/src/runtime/synchronizer.rs
// ============================================================================
// Module: Schema Synchronizer
// Description: Reconciles the field schema with the physical records table.
// Purpose: Keep physical columns aligned with field definitions.
// Dependencies: crate::{core, interfaces}, serde, tracing
// ============================================================================

//! ## Overview
//! In structural deployments the remote records table carries one physical
//! column per field. The synchronizer derives a schema from that structure,
//! adds missing columns, and performs the single-column DDL used by schema
//! mutations. A rename is always a physical rename so stored values survive.
//!
//! Bulk synchronization is partial-failure tolerant: each field is attempted
//! independently and failures are collected in a [`SyncReport`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;

use crate::core::FieldDefinition;
use crate::core::FieldKey;
use crate::core::RESERVED_FIELD_KEYS;
use crate::core::capitalize_first;
use crate::core::sort_fields;
use crate::interfaces::RemoteError;
use crate::interfaces::TableStructureBackend;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Column type used for every field column.
pub const DEFAULT_COLUMN_TYPE: &str = "TEXT";

// ============================================================================
// SECTION: Reports
// ============================================================================

/// Per-field failure recorded during bulk synchronization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSyncFailure {
    /// Field that could not be synchronized.
    pub key: FieldKey,
    /// Failure description.
    pub error: String,
}

/// Outcome of a bulk structural synchronization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Fields whose physical column was created.
    pub added: Vec<FieldKey>,
    /// Fields whose physical column already existed.
    pub already_present: Vec<FieldKey>,
    /// Fields skipped because their key is reserved.
    pub skipped_reserved: Vec<FieldKey>,
    /// Fields whose column could not be created.
    pub failed: Vec<FieldSyncFailure>,
}

impl SyncReport {
    /// Returns true when no field failed.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

// ============================================================================
// SECTION: Synchronizer
// ============================================================================

/// Structural synchronizer bound to one records table.
#[derive(Clone)]
pub struct SchemaSynchronizer {
    /// Structural backend.
    backend: Arc<dyn TableStructureBackend>,
    /// Records table name.
    table: String,
    /// Physical columns never exposed as fields.
    reserved: Vec<String>,
    /// Column type for new field columns.
    column_type: String,
}

impl SchemaSynchronizer {
    /// Creates a synchronizer for `table` with the default reserved columns.
    #[must_use]
    pub fn new(backend: Arc<dyn TableStructureBackend>, table: impl Into<String>) -> Self {
        Self {
            backend,
            table: table.into(),
            reserved: RESERVED_FIELD_KEYS.iter().map(|name| (*name).to_string()).collect(),
            column_type: DEFAULT_COLUMN_TYPE.to_string(),
        }
    }

    /// Returns the records table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns true when `name` is a reserved physical column.
    #[must_use]
    pub fn is_reserved(&self, name: &str) -> bool {
        self.reserved.iter().any(|reserved| reserved == name)
    }

    /// Derives a schema from the physical structure of the records table.
    ///
    /// Reserved columns are excluded. Labels capitalize the column name and
    /// order is the 1-based position among the remaining columns.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] when the table cannot be described.
    pub async fn reconcile_from_remote_structure(
        &self,
    ) -> Result<Vec<FieldDefinition>, RemoteError> {
        let columns = self.backend.describe_table(&self.table).await?;
        let fields = columns
            .into_iter()
            .filter(|column| !self.is_reserved(&column.name))
            .zip(1_i64 ..)
            .map(|(column, order)| FieldDefinition {
                label: capitalize_first(&column.name),
                key: FieldKey::new(column.name),
                order,
                options: Vec::new(),
            })
            .collect();
        Ok(fields)
    }

    /// Returns the physical column names of the records table.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] when the table cannot be described.
    pub async fn physical_names(&self) -> Result<BTreeSet<String>, RemoteError> {
        let columns = self.backend.describe_table(&self.table).await?;
        Ok(columns.into_iter().map(|column| column.name).collect())
    }

    /// Creates a physical column for every field that lacks one.
    ///
    /// Individual column failures are recorded and do not stop the remaining
    /// fields.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] only when the table cannot be described.
    pub async fn sync_to_remote(
        &self,
        fields: &[FieldDefinition],
    ) -> Result<SyncReport, RemoteError> {
        let mut present = self.physical_names().await?;
        let mut report = SyncReport::default();
        for field in fields {
            let name = field.key.as_str();
            if self.is_reserved(name) {
                report.skipped_reserved.push(field.key.clone());
                continue;
            }
            if present.contains(name) {
                report.already_present.push(field.key.clone());
                continue;
            }
            match self.backend.add_column(&self.table, name, &self.column_type).await {
                Ok(()) => {
                    present.insert(name.to_string());
                    report.added.push(field.key.clone());
                }
                Err(err) => {
                    tracing::warn!(field = %field.key, "column sync failed: {err}");
                    report.failed.push(FieldSyncFailure {
                        key: field.key.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }
        if !report.added.is_empty() {
            tracing::info!(
                table = %self.table,
                added = report.added.len(),
                failed = report.failed.len(),
                "columns synchronized"
            );
        }
        Ok(report)
    }

    /// Ensures a physical column exists for `key`.
    ///
    /// Returns `true` when the column was created and `false` when it already
    /// existed (for example a column retained after an earlier removal).
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] when introspection or the DDL fails.
    pub async fn add_field(&self, key: &FieldKey) -> Result<bool, RemoteError> {
        if self.physical_names().await?.contains(key.as_str()) {
            tracing::debug!(field = %key, "column already present");
            return Ok(false);
        }
        self.backend.add_column(&self.table, key.as_str(), &self.column_type).await?;
        Ok(true)
    }

    /// Renames the physical column backing a field.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] when the rename fails.
    pub async fn rename_field(&self, old: &FieldKey, new: &FieldKey) -> Result<(), RemoteError> {
        self.backend.rename_column(&self.table, old.as_str(), new.as_str()).await?;
        tracing::info!(table = %self.table, from = %old, to = %new, "column renamed");
        Ok(())
    }

    /// Drops the physical column backing a field.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] when the drop fails.
    pub async fn drop_field(&self, key: &FieldKey) -> Result<(), RemoteError> {
        self.backend.drop_column(&self.table, key.as_str()).await
    }
}

// ============================================================================
// SECTION: Merge
// ============================================================================

/// Merges locally held metadata into definitions derived from the remote.
///
/// The physical structure cannot express labels, ranks, or option lists, so
/// for every remote definition whose key matches a local one the local
/// `label`, `order`, and `options` win. Unmatched remote definitions are kept
/// as synthesized. The result is sorted by order.
#[must_use]
pub fn merge_local_metadata(
    remote: Vec<FieldDefinition>,
    local: &[FieldDefinition],
) -> Vec<FieldDefinition> {
    let local_by_key: BTreeMap<&FieldKey, &FieldDefinition> =
        local.iter().map(|field| (&field.key, field)).collect();
    let mut merged: Vec<FieldDefinition> = remote
        .into_iter()
        .map(|mut field| {
            if let Some(known) = local_by_key.get(&field.key) {
                field.label.clone_from(&known.label);
                field.order = known.order;
                field.options.clone_from(&known.options);
            }
            field
        })
        .collect();
    sort_fields(&mut merged);
    merged
}
