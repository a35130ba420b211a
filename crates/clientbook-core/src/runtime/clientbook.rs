// crates/clientbook-core/src/runtime/clientbook.rs
// ============================================================================
// Module: Clientbook
// Description: Session facade over the schema store and record store.
// Purpose: Own persistent domain state and orchestrate cross-store flows.
// Dependencies: crate::{core, interfaces, runtime}, tracing
// ============================================================================

//! ## Overview
//! [`Clientbook`] holds the persistent domain state of a session (the schema
//! and the loaded records) and routes every mutation through the stores.
//! Record mutations reload the sorted record list so the visible set is
//! always derived from persisted data. Transient editing state (drafts and
//! search input) stays with the caller.
//!
//! Cross-store flows live here: the primary field is resolved from the
//! schema (or an explicit override), renaming a field moves record values
//! when no physical column was renamed, and removing a field under
//! [`OrphanPolicy::Clear`] clears record values when the physical column was
//! not dropped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use crate::core::FieldDefinition;
use crate::core::FieldDraft;
use crate::core::FieldKey;
use crate::core::FieldValues;
use crate::core::Record;
use crate::core::RecordId;
use crate::interfaces::FieldMetadataBackend;
use crate::interfaces::LocalCache;
use crate::interfaces::RecordBackend;
use crate::interfaces::TableStructureBackend;
use crate::runtime::error::StoreError;
use crate::runtime::record_store::RecordIdIssuer;
use crate::runtime::record_store::RecordStore;
use crate::runtime::schema_store::FieldRemoval;
use crate::runtime::schema_store::FieldUpdate;
use crate::runtime::schema_store::OrphanPolicy;
use crate::runtime::schema_store::SchemaLoad;
use crate::runtime::schema_store::SchemaStore;
use crate::runtime::search::SearchState;
use crate::runtime::synchronizer::SchemaSynchronizer;
use crate::runtime::synchronizer::SyncReport;

// ============================================================================
// SECTION: Parts
// ============================================================================

/// Collaborators used to assemble a [`Clientbook`].
pub struct ClientbookParts {
    /// Local cache for the schema.
    pub cache: Arc<dyn LocalCache>,
    /// Record backend.
    pub records: Arc<dyn RecordBackend>,
    /// Optional metadata rows backend.
    pub metadata: Option<Arc<dyn FieldMetadataBackend>>,
    /// Optional structural backend.
    pub structure: Option<Arc<dyn TableStructureBackend>>,
    /// Records table name for structural synchronization.
    pub table: String,
    /// Explicit primary field overriding the lowest-ranked field.
    pub primary_field: Option<FieldKey>,
    /// Optional duplication marker override.
    pub duplicate_marker: Option<String>,
    /// Optional identifier issuer override.
    pub issuer: Option<Arc<dyn RecordIdIssuer>>,
}

impl ClientbookParts {
    /// Creates parts for a cache plus record backend, without schema remotes.
    #[must_use]
    pub fn new(cache: Arc<dyn LocalCache>, records: Arc<dyn RecordBackend>) -> Self {
        Self {
            cache,
            records,
            metadata: None,
            structure: None,
            table: "clients".to_string(),
            primary_field: None,
            duplicate_marker: None,
            issuer: None,
        }
    }
}

// ============================================================================
// SECTION: Clientbook
// ============================================================================

/// Session facade owning the schema and loaded records.
pub struct Clientbook {
    /// Schema store.
    schema: SchemaStore,
    /// Record store.
    records: RecordStore,
    /// Records from the last load, sorted by the primary field.
    loaded: Vec<Record>,
    /// Explicit primary field.
    primary_override: Option<FieldKey>,
}

impl Clientbook {
    /// Assembles a clientbook without loading anything.
    #[must_use]
    pub fn new(parts: ClientbookParts) -> Self {
        let mut schema = SchemaStore::new(parts.cache);
        if let Some(metadata) = parts.metadata {
            schema = schema.with_metadata(metadata);
        }
        if let Some(structure) = parts.structure {
            schema = schema.with_synchronizer(SchemaSynchronizer::new(structure, parts.table));
        }
        let mut records = RecordStore::new(parts.records);
        if let Some(marker) = parts.duplicate_marker {
            records = records.with_duplicate_marker(marker);
        }
        if let Some(issuer) = parts.issuer {
            records = records.with_issuer(issuer);
        }
        Self {
            schema,
            records,
            loaded: Vec::new(),
            primary_override: parts.primary_field,
        }
    }

    /// Assembles a clientbook, resolves the schema, and loads records.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when schema resolution or the record listing fails.
    pub async fn open(parts: ClientbookParts) -> Result<(Self, SchemaLoad), StoreError> {
        let mut clientbook = Self::new(parts);
        let load = clientbook.schema.load().await?;
        clientbook.refresh_records().await?;
        Ok((clientbook, load))
    }

    /// Returns the current schema.
    #[must_use]
    pub fn fields(&self) -> &[FieldDefinition] {
        self.schema.fields()
    }

    /// Returns the schema store.
    #[must_use]
    pub const fn schema(&self) -> &SchemaStore {
        &self.schema
    }

    /// Returns the loaded records.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.loaded
    }

    /// Returns the loaded record with `id`.
    #[must_use]
    pub fn record(&self, id: &RecordId) -> Option<&Record> {
        self.loaded.iter().find(|record| record.id == *id)
    }

    /// Returns the key used for sorting and duplication.
    #[must_use]
    pub fn primary_key(&self) -> Option<FieldKey> {
        self.primary_override
            .clone()
            .or_else(|| self.schema.primary_field().map(|field| field.key.clone()))
    }

    /// Returns the duplication marker.
    #[must_use]
    pub fn duplicate_marker(&self) -> &str {
        self.records.duplicate_marker()
    }

    /// Returns the loaded records matching the search state.
    #[must_use]
    pub fn search(&self, state: &SearchState) -> Vec<&Record> {
        state.apply(&self.loaded, self.schema.fields())
    }

    /// Reloads records sorted by the primary field.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Remote`] when the listing fails.
    pub async fn refresh_records(&mut self) -> Result<&[Record], StoreError> {
        let primary = self.primary_key();
        self.loaded = self.records.list(primary.as_ref()).await?;
        Ok(&self.loaded)
    }

    /// Adds a field.
    ///
    /// # Errors
    ///
    /// See [`SchemaStore::add`].
    pub async fn add_field(&mut self, draft: &FieldDraft) -> Result<FieldDefinition, StoreError> {
        self.schema.add(draft).await
    }

    /// Edits or renames a field and reloads records so renamed values show.
    ///
    /// Without a structural backend a rename rewrites every record holding a
    /// value under the old key, since no physical column carries the values.
    ///
    /// # Errors
    ///
    /// See [`SchemaStore::update`] and [`RecordStore::rename_field`].
    pub async fn update_field(
        &mut self,
        key: &FieldKey,
        draft: &FieldDraft,
    ) -> Result<FieldUpdate, StoreError> {
        let update = self.schema.update(key, draft).await?;
        if let Some(previous) = &update.renamed_from {
            if !self.schema.is_structural() {
                self.records.rename_field(previous, &update.field.key).await?;
            }
            self.refresh_records().await?;
        }
        Ok(update)
    }

    /// Removes a field and applies the orphan policy to stored values.
    ///
    /// Returns the removal and the number of records whose value was cleared
    /// by rewriting them.
    ///
    /// # Errors
    ///
    /// See [`SchemaStore::remove`] and [`RecordStore::clear_field`].
    pub async fn remove_field(
        &mut self,
        key: &FieldKey,
        policy: OrphanPolicy,
    ) -> Result<(FieldRemoval, usize), StoreError> {
        let removal = self.schema.remove(key, policy).await?;
        let cleared = if policy == OrphanPolicy::Clear && !removal.column_dropped {
            self.records.clear_field(key).await?
        } else {
            0
        };
        self.refresh_records().await?;
        Ok((removal, cleared))
    }

    /// Runs the explicit schema synchronization.
    ///
    /// # Errors
    ///
    /// See [`SchemaStore::synchronize`].
    pub async fn synchronize(&mut self) -> Result<SyncReport, StoreError> {
        self.schema.synchronize().await
    }

    /// Creates a record and reloads the list.
    ///
    /// # Errors
    ///
    /// See [`RecordStore::create`].
    pub async fn create_record(&mut self, values: FieldValues) -> Result<Record, StoreError> {
        let record = self.records.create(values).await?;
        self.refresh_records().await?;
        Ok(record)
    }

    /// Replaces a record's values and reloads the list.
    ///
    /// # Errors
    ///
    /// See [`RecordStore::update`].
    pub async fn update_record(
        &mut self,
        id: &RecordId,
        values: FieldValues,
    ) -> Result<Record, StoreError> {
        let record = self.records.update(id, values).await?;
        self.refresh_records().await?;
        Ok(record)
    }

    /// Deletes a record and reloads the list.
    ///
    /// # Errors
    ///
    /// See [`RecordStore::delete`].
    pub async fn delete_record(&mut self, id: &RecordId) -> Result<(), StoreError> {
        self.records.delete(id).await?;
        self.refresh_records().await?;
        Ok(())
    }

    /// Duplicates a loaded record and reloads the list.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when `id` is not loaded, otherwise see
    /// [`RecordStore::duplicate`].
    pub async fn duplicate_record(&mut self, id: &RecordId) -> Result<Record, StoreError> {
        let Some(source) = self.record(id).cloned() else {
            return Err(StoreError::NotFound(format!("record {id}")));
        };
        let primary = self.primary_key();
        let copy = self.records.duplicate(&source, primary.as_ref()).await?;
        self.refresh_records().await?;
        Ok(copy)
    }
}
