// crates/clientbook-core/src/runtime/schema_store.rs
// ============================================================================
// Module: Schema Store
// Description: Canonical field schema with remote-first persistence.
// Purpose: Load, add, edit, remove, and synchronize field definitions.
// Dependencies: crate::{core, interfaces, runtime}, serde, tracing
// ============================================================================

//! ## Overview
//! [`SchemaStore`] owns the in-memory schema and keeps it consistent with the
//! local cache and the configured remote copies (metadata rows, physical
//! columns, or both).
//!
//! Every mutation follows the same sequence: validate, write every remote,
//! then write the cache, then replace the in-memory list. A remote failure
//! returns [`StoreError::Persistence`] before anything local is touched.
//! When a second remote write fails after the first succeeded, the first is
//! compensated on a best-effort basis.
//!
//! # Invariants
//! - Keys are unique within [`SchemaStore::fields`].
//! - Fields are always sorted by order, ties in prior relative position.
//! - A renamed physical column exists before the cache names the new key.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

use crate::core::FieldDefinition;
use crate::core::FieldDraft;
use crate::core::FieldKey;
use crate::core::derive_key;
use crate::core::is_reserved_key;
use crate::core::primary_field;
use crate::core::sort_fields;
use crate::interfaces::FieldMetadataBackend;
use crate::interfaces::LocalCache;
use crate::interfaces::RemoteError;
use crate::runtime::error::StoreError;
use crate::runtime::sources::CacheSource;
use crate::runtime::sources::DefaultsSource;
use crate::runtime::sources::MetadataSource;
use crate::runtime::sources::SCHEMA_CACHE_KEY;
use crate::runtime::sources::SchemaChain;
use crate::runtime::sources::SchemaOrigin;
use crate::runtime::sources::StructureSource;
use crate::runtime::sources::encode_schema;
use crate::runtime::sources::normalize_schema;
use crate::runtime::synchronizer::SchemaSynchronizer;
use crate::runtime::synchronizer::SyncReport;
use crate::runtime::synchronizer::merge_local_metadata;

// ============================================================================
// SECTION: Types
// ============================================================================

/// What happens to stored values when a field is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanPolicy {
    /// Keep values in existing records.
    #[default]
    Retain,
    /// Remove values from existing records.
    Clear,
}

/// Result of [`SchemaStore::load`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaLoad {
    /// Resolved schema.
    pub fields: Vec<FieldDefinition>,
    /// Tier the schema came from.
    pub origin: SchemaOrigin,
    /// Whether the schema is now stored in the local cache.
    pub cached: bool,
    /// Structural seeding report when defaults were pushed to the table.
    pub seed_report: Option<SyncReport>,
}

/// Result of [`SchemaStore::update`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldUpdate {
    /// Stored definition after the update.
    pub field: FieldDefinition,
    /// Previous key when the update renamed the field.
    pub renamed_from: Option<FieldKey>,
}

/// Result of [`SchemaStore::remove`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldRemoval {
    /// Removed definition.
    pub field: FieldDefinition,
    /// Whether the physical column and its values were dropped.
    pub column_dropped: bool,
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Canonical field schema and its persistence.
pub struct SchemaStore {
    /// Local cache holding the serialized schema.
    cache: Arc<dyn LocalCache>,
    /// Optional remote metadata rows.
    metadata: Option<Arc<dyn FieldMetadataBackend>>,
    /// Optional structural synchronizer.
    synchronizer: Option<SchemaSynchronizer>,
    /// In-memory schema, sorted by order.
    fields: Vec<FieldDefinition>,
}

impl SchemaStore {
    /// Creates a cache-only schema store with an empty schema.
    #[must_use]
    pub fn new(cache: Arc<dyn LocalCache>) -> Self {
        Self {
            cache,
            metadata: None,
            synchronizer: None,
            fields: Vec::new(),
        }
    }

    /// Enables remote metadata rows as the canonical copy.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Arc<dyn FieldMetadataBackend>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Enables structural synchronization against the records table.
    #[must_use]
    pub fn with_synchronizer(mut self, synchronizer: SchemaSynchronizer) -> Self {
        self.synchronizer = Some(synchronizer);
        self
    }

    /// Returns the current schema sorted by order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    /// Returns the definition stored under `key`.
    #[must_use]
    pub fn field(&self, key: &FieldKey) -> Option<&FieldDefinition> {
        self.fields.iter().find(|field| field.key == *key)
    }

    /// Returns the primary field (lowest order).
    #[must_use]
    pub fn primary_field(&self) -> Option<&FieldDefinition> {
        primary_field(&self.fields)
    }

    /// Returns true when removals can drop physical columns.
    #[must_use]
    pub const fn is_structural(&self) -> bool {
        self.synchronizer.is_some()
    }

    /// Resolves the session schema through the source chain.
    ///
    /// Schemas fetched from a remote tier are written to the cache. When
    /// every tier is empty the defaults are seeded to each configured remote
    /// and cached only if seeding fully succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Remote`] when the metadata listing fails and
    /// [`StoreError::Cache`] when a remote schema cannot be cached.
    pub async fn load(&mut self) -> Result<SchemaLoad, StoreError> {
        let (fields, origin) = self.chain().resolve().await?;
        let mut seed_report = None;
        let cached = match origin {
            SchemaOrigin::Cache => true,
            SchemaOrigin::Metadata | SchemaOrigin::Structure => {
                self.write_cache(&fields)?;
                true
            }
            SchemaOrigin::Defaults => {
                let (seeded, report) = self.seed_defaults(&fields).await;
                seed_report = report;
                if seeded {
                    self.write_cache(&fields)?;
                }
                seeded
            }
        };
        self.fields.clone_from(&fields);
        Ok(SchemaLoad {
            fields,
            origin,
            cached,
            seed_report,
        })
    }

    /// Adds a field built from `draft`.
    ///
    /// The key is derived from the trimmed label and the order defaults to
    /// the current field count plus one.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] for a blank label or a key
    /// collision, and [`StoreError::Persistence`] when a remote write fails.
    /// Local state is unchanged on every error path.
    pub async fn add(&mut self, draft: &FieldDraft) -> Result<FieldDefinition, StoreError> {
        let label = validate_label(&draft.label)?;
        let key = FieldKey::new(derive_key(label));
        self.ensure_key_available(&key)?;
        let order = draft.order.unwrap_or_else(|| next_order(self.fields.len()));
        let field = FieldDefinition {
            key,
            label: label.to_string(),
            order,
            options: draft.options.clone(),
        };

        let column_added = match &self.synchronizer {
            Some(synchronizer) => {
                synchronizer.add_field(&field.key).await.map_err(StoreError::Persistence)?
            }
            None => false,
        };
        if let Some(metadata) = &self.metadata
            && let Err(err) = metadata.insert_field(&field).await
        {
            if column_added && let Some(synchronizer) = &self.synchronizer {
                compensate(synchronizer.drop_field(&field.key).await, "drop added column");
            }
            return Err(StoreError::Persistence(err));
        }

        let mut next = self.fields.clone();
        next.push(field.clone());
        sort_fields(&mut next);
        self.commit(next)?;
        tracing::info!(field = %field.key, order = field.order, "field added");
        Ok(field)
    }

    /// Replaces the field stored under `key` with `draft`.
    ///
    /// The key is re-derived only when the label changes, so keys that never
    /// matched their label survive edits of order or options. When the
    /// derived key differs the update is a rename: the physical column is
    /// renamed first, then the metadata row, then the cache. Moving stored
    /// values in deployments without a structural backend is the caller's
    /// job (see [`SchemaStore::is_structural`]).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown key,
    /// [`StoreError::Validation`] for a blank label or a colliding new key,
    /// and [`StoreError::Persistence`] when a remote write fails.
    pub async fn update(
        &mut self,
        key: &FieldKey,
        draft: &FieldDraft,
    ) -> Result<FieldUpdate, StoreError> {
        let Some(index) = self.fields.iter().position(|field| field.key == *key) else {
            return Err(StoreError::NotFound(format!("field {key}")));
        };
        let label = validate_label(&draft.label)?;
        let current = &self.fields[index];
        let new_key = if label == current.label {
            key.clone()
        } else {
            FieldKey::new(derive_key(label))
        };
        let renamed = new_key != *key;
        if renamed {
            self.ensure_key_available(&new_key)?;
        }
        let field = FieldDefinition {
            key: new_key,
            label: label.to_string(),
            order: draft.order.unwrap_or(current.order),
            options: draft.options.clone(),
        };

        let column_renamed = match &self.synchronizer {
            Some(synchronizer) if renamed => {
                synchronizer.rename_field(key, &field.key).await.map_err(StoreError::Persistence)?;
                true
            }
            _ => false,
        };
        if let Some(metadata) = &self.metadata
            && let Err(err) = upsert_metadata(metadata.as_ref(), key, &field).await
        {
            if column_renamed && let Some(synchronizer) = &self.synchronizer {
                compensate(synchronizer.rename_field(&field.key, key).await, "restore column name");
            }
            return Err(StoreError::Persistence(err));
        }

        let mut next = self.fields.clone();
        next[index] = field.clone();
        sort_fields(&mut next);
        self.commit(next)?;
        let renamed_from = renamed.then(|| key.clone());
        tracing::info!(field = %field.key, renamed = renamed, "field updated");
        Ok(FieldUpdate {
            field,
            renamed_from,
        })
    }

    /// Removes the field stored under `key`.
    ///
    /// The physical column is dropped only under [`OrphanPolicy::Clear`] in
    /// structural deployments; otherwise stored values are left untouched and
    /// clearing them is the caller's decision.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown key and
    /// [`StoreError::Persistence`] when a remote write fails.
    pub async fn remove(
        &mut self,
        key: &FieldKey,
        policy: OrphanPolicy,
    ) -> Result<FieldRemoval, StoreError> {
        let Some(existing) = self.field(key).cloned() else {
            return Err(StoreError::NotFound(format!("field {key}")));
        };
        if let Some(metadata) = &self.metadata {
            match metadata.delete_field(key).await {
                Ok(()) => {}
                Err(RemoteError::NotFound(_)) => {
                    tracing::debug!(field = %key, "field metadata already absent");
                }
                Err(err) => return Err(StoreError::Persistence(err)),
            }
        }
        let mut column_dropped = false;
        if policy == OrphanPolicy::Clear
            && let Some(synchronizer) = &self.synchronizer
        {
            if let Err(err) = synchronizer.drop_field(key).await {
                if let Some(metadata) = &self.metadata {
                    compensate(metadata.insert_field(&existing).await, "restore field metadata");
                }
                return Err(StoreError::Persistence(err));
            }
            column_dropped = true;
        }

        let next: Vec<FieldDefinition> =
            self.fields.iter().filter(|field| field.key != *key).cloned().collect();
        self.commit(next)?;
        tracing::info!(field = %key, column_dropped = column_dropped, "field removed");
        Ok(FieldRemoval {
            field: existing,
            column_dropped,
        })
    }

    /// Pushes the current schema to every remote and re-reads the canonical copy.
    ///
    /// Missing physical columns are created (per-field failures land in the
    /// report), metadata rows are replaced, and the re-fetched remote schema
    /// is merged with the in-memory labels, orders, and options.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Remote`] when the table cannot be described or
    /// the canonical copy cannot be re-read, and [`StoreError::Persistence`]
    /// when metadata rows cannot be replaced.
    pub async fn synchronize(&mut self) -> Result<SyncReport, StoreError> {
        let mut report = SyncReport::default();
        if let Some(synchronizer) = &self.synchronizer {
            report =
                synchronizer.sync_to_remote(&self.fields).await.map_err(StoreError::Remote)?;
        }
        let remote = if let Some(metadata) = &self.metadata {
            metadata.replace_all_fields(&self.fields).await.map_err(StoreError::Persistence)?;
            Some(metadata.list_fields().await.map_err(StoreError::Remote)?)
        } else if let Some(synchronizer) = &self.synchronizer {
            Some(synchronizer.reconcile_from_remote_structure().await.map_err(StoreError::Remote)?)
        } else {
            None
        };
        let next = match remote {
            Some(remote) => {
                let remote = normalize_schema(remote, SchemaOrigin::Metadata);
                merge_local_metadata(remote, &self.fields)
            }
            None => self.fields.clone(),
        };
        if next.is_empty() && !self.fields.is_empty() {
            tracing::warn!("remote schema empty after sync, keeping local schema");
            self.write_cache(&self.fields)?;
            return Ok(report);
        }
        self.commit(next)?;
        Ok(report)
    }

    /// Builds the resolution chain for the configured tiers.
    fn chain(&self) -> SchemaChain {
        let mut chain = SchemaChain::new()
            .with_source(Box::new(CacheSource::new(Arc::clone(&self.cache), SCHEMA_CACHE_KEY)));
        if let Some(metadata) = &self.metadata {
            chain = chain.with_source(Box::new(MetadataSource::new(Arc::clone(metadata))));
        }
        if let Some(synchronizer) = &self.synchronizer {
            chain = chain.with_source(Box::new(StructureSource::new(synchronizer.clone())));
        }
        chain.with_source(Box::new(DefaultsSource))
    }

    /// Persists the defaults to every configured remote.
    ///
    /// Returns whether seeding fully succeeded and the structural report.
    async fn seed_defaults(&self, fields: &[FieldDefinition]) -> (bool, Option<SyncReport>) {
        let mut seeded = true;
        if let Some(metadata) = &self.metadata
            && let Err(err) = metadata.replace_all_fields(fields).await
        {
            tracing::warn!("default schema not seeded to metadata: {err}");
            seeded = false;
        }
        let mut report = None;
        if let Some(synchronizer) = &self.synchronizer {
            match synchronizer.sync_to_remote(fields).await {
                Ok(sync) => {
                    seeded &= sync.is_complete();
                    report = Some(sync);
                }
                Err(err) => {
                    tracing::warn!("default schema not seeded to table: {err}");
                    seeded = false;
                }
            }
        }
        if seeded {
            tracing::info!(fields = fields.len(), "default schema seeded");
        }
        (seeded, report)
    }

    /// Rejects reserved keys and keys already in the schema.
    fn ensure_key_available(&self, key: &FieldKey) -> Result<(), StoreError> {
        if is_reserved_key(key.as_str()) {
            return Err(StoreError::Validation(format!("field key is reserved: {key}")));
        }
        if self.field(key).is_some() {
            return Err(StoreError::Validation(format!("field key already exists: {key}")));
        }
        Ok(())
    }

    /// Writes `next` to the cache, then makes it the in-memory schema.
    ///
    /// Remote writes have already succeeded when this runs, so the in-memory
    /// schema follows the remote even if the cache write fails.
    fn commit(&mut self, next: Vec<FieldDefinition>) -> Result<(), StoreError> {
        let cached = self.write_cache(&next);
        self.fields = next;
        cached
    }

    /// Overwrites the cached schema in full.
    fn write_cache(&self, fields: &[FieldDefinition]) -> Result<(), StoreError> {
        let encoded = encode_schema(fields)?;
        self.cache.set(SCHEMA_CACHE_KEY, &encoded)?;
        tracing::debug!(key = SCHEMA_CACHE_KEY, fields = fields.len(), "schema cached");
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the trimmed label or a validation error when blank.
fn validate_label(label: &str) -> Result<&str, StoreError> {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        return Err(StoreError::Validation("field label is required".to_string()));
    }
    Ok(trimmed)
}

/// Returns the default order for a field appended to `count` fields.
fn next_order(count: usize) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX).saturating_add(1)
}

/// Updates a metadata row, inserting it when the remote never stored it.
///
/// The cache outranks metadata on startup, so a field may be known locally
/// without a matching row.
async fn upsert_metadata(
    metadata: &dyn FieldMetadataBackend,
    key: &FieldKey,
    field: &FieldDefinition,
) -> Result<(), RemoteError> {
    match metadata.update_field(key, field).await {
        Err(RemoteError::NotFound(_)) => metadata.insert_field(field).await,
        other => other,
    }
}

/// Logs a failed compensation step.
fn compensate<E: std::fmt::Display>(result: Result<(), E>, step: &str) {
    if let Err(err) = result {
        tracing::warn!(step = step, "compensation failed: {err}");
    }
}
