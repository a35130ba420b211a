// crates/clientbook-core/src/runtime/sources.rs
// ============================================================================
// Module: Schema Sources
// Description: Ordered resolution chain for the startup schema.
// Purpose: Try cache, metadata rows, physical structure, and defaults in order.
// Dependencies: crate::{core, interfaces, runtime}, async-trait, serde_json, tracing
// ============================================================================

//! ## Overview
//! Each tier of schema persistence is a [`SchemaSource`] that either yields a
//! schema or reports that none is available. [`SchemaChain`] tries its
//! sources in order and stops at the first non-empty result:
//!
//! 1. local cache ([`CacheSource`])
//! 2. remote metadata rows ([`MetadataSource`])
//! 3. remote physical structure ([`StructureSource`])
//! 4. built-in defaults ([`DefaultsSource`])
//!
//! A corrupt cache entry and an unreachable table structure count as "not
//! available". A failing metadata listing is surfaced as an error because it
//! is the configured canonical copy.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::core::FieldDefinition;
use crate::core::default_schema;
use crate::core::sort_fields;
use crate::interfaces::FieldMetadataBackend;
use crate::interfaces::LocalCache;
use crate::runtime::error::StoreError;
use crate::runtime::synchronizer::SchemaSynchronizer;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Cache key holding the serialized schema.
pub const SCHEMA_CACHE_KEY: &str = "clientColumns";

// ============================================================================
// SECTION: Source Types
// ============================================================================

/// Tier that produced the resolved schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaOrigin {
    /// Local cache.
    Cache,
    /// Remote metadata rows.
    Metadata,
    /// Remote physical structure.
    Structure,
    /// Built-in defaults.
    Defaults,
}

impl SchemaOrigin {
    /// Returns the stable label for the origin.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Metadata => "metadata",
            Self::Structure => "structure",
            Self::Defaults => "defaults",
        }
    }
}

impl fmt::Display for SchemaOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tier of the schema resolution chain.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// Returns the tier this source represents.
    fn origin(&self) -> SchemaOrigin;

    /// Fetches the schema held by this tier.
    ///
    /// Returns `Ok(None)` when the tier has nothing usable.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the tier fails in a way that must not be
    /// masked by falling through to the next tier.
    async fn fetch(&self) -> Result<Option<Vec<FieldDefinition>>, StoreError>;
}

/// Schema held in the local cache.
pub struct CacheSource {
    /// Cache backend.
    cache: Arc<dyn LocalCache>,
    /// Cache key.
    key: String,
}

impl CacheSource {
    /// Creates a cache source reading `key`.
    #[must_use]
    pub fn new(cache: Arc<dyn LocalCache>, key: impl Into<String>) -> Self {
        Self {
            cache,
            key: key.into(),
        }
    }
}

#[async_trait]
impl SchemaSource for CacheSource {
    fn origin(&self) -> SchemaOrigin {
        SchemaOrigin::Cache
    }

    async fn fetch(&self) -> Result<Option<Vec<FieldDefinition>>, StoreError> {
        let raw = match self.cache.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(None),
            Err(err) => {
                tracing::warn!(key = %self.key, "schema cache unreadable: {err}");
                return Ok(None);
            }
        };
        match decode_schema(&raw) {
            Ok(fields) => Ok(non_empty(fields)),
            Err(err) => {
                tracing::warn!(key = %self.key, "schema cache corrupt, ignoring: {err}");
                Ok(None)
            }
        }
    }
}

/// Schema held as remote metadata rows.
pub struct MetadataSource {
    /// Metadata backend.
    backend: Arc<dyn FieldMetadataBackend>,
}

impl MetadataSource {
    /// Creates a metadata source.
    #[must_use]
    pub fn new(backend: Arc<dyn FieldMetadataBackend>) -> Self {
        Self {
            backend,
        }
    }
}

#[async_trait]
impl SchemaSource for MetadataSource {
    fn origin(&self) -> SchemaOrigin {
        SchemaOrigin::Metadata
    }

    async fn fetch(&self) -> Result<Option<Vec<FieldDefinition>>, StoreError> {
        let fields = self.backend.list_fields().await.map_err(StoreError::Remote)?;
        Ok(non_empty(fields))
    }
}

/// Schema derived from the physical records table.
pub struct StructureSource {
    /// Synchronizer bound to the records table.
    synchronizer: SchemaSynchronizer,
}

impl StructureSource {
    /// Creates a structure source.
    #[must_use]
    pub const fn new(synchronizer: SchemaSynchronizer) -> Self {
        Self {
            synchronizer,
        }
    }
}

#[async_trait]
impl SchemaSource for StructureSource {
    fn origin(&self) -> SchemaOrigin {
        SchemaOrigin::Structure
    }

    async fn fetch(&self) -> Result<Option<Vec<FieldDefinition>>, StoreError> {
        match self.synchronizer.reconcile_from_remote_structure().await {
            Ok(fields) => Ok(non_empty(fields)),
            Err(err) => {
                tracing::warn!(
                    table = %self.synchronizer.table(),
                    "table structure unavailable: {err}"
                );
                Ok(None)
            }
        }
    }
}

/// Built-in default schema.
pub struct DefaultsSource;

#[async_trait]
impl SchemaSource for DefaultsSource {
    fn origin(&self) -> SchemaOrigin {
        SchemaOrigin::Defaults
    }

    async fn fetch(&self) -> Result<Option<Vec<FieldDefinition>>, StoreError> {
        Ok(Some(default_schema()))
    }
}

// ============================================================================
// SECTION: Chain
// ============================================================================

/// Ordered list of schema sources.
#[derive(Default)]
pub struct SchemaChain {
    /// Sources in resolution order.
    sources: Vec<Box<dyn SchemaSource>>,
}

impl SchemaChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a source to the chain.
    #[must_use]
    pub fn with_source(mut self, source: Box<dyn SchemaSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Resolves the schema from the first source that has one.
    ///
    /// Results are normalized: duplicate keys keep their first occurrence and
    /// fields are sorted by order. An exhausted chain yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when a source fails without falling through.
    pub async fn resolve(&self) -> Result<(Vec<FieldDefinition>, SchemaOrigin), StoreError> {
        for source in &self.sources {
            if let Some(fields) = source.fetch().await? {
                let origin = source.origin();
                tracing::info!(origin = %origin, fields = fields.len(), "schema resolved");
                return Ok((normalize_schema(fields, origin), origin));
            }
            tracing::debug!(origin = %source.origin(), "schema source empty");
        }
        Ok((default_schema(), SchemaOrigin::Defaults))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Serializes a schema for the cache.
pub(crate) fn encode_schema(fields: &[FieldDefinition]) -> Result<String, StoreError> {
    serde_json::to_string(fields)
        .map_err(|err| StoreError::Validation(format!("schema encode failed: {err}")))
}

/// Parses a cached schema.
pub(crate) fn decode_schema(raw: &str) -> Result<Vec<FieldDefinition>, serde_json::Error> {
    serde_json::from_str(raw)
}

/// Drops duplicate keys (first wins) and sorts by order.
pub(crate) fn normalize_schema(
    fields: Vec<FieldDefinition>,
    origin: SchemaOrigin,
) -> Vec<FieldDefinition> {
    let mut seen = BTreeSet::new();
    let mut normalized = Vec::with_capacity(fields.len());
    for field in fields {
        if seen.insert(field.key.clone()) {
            normalized.push(field);
        } else {
            tracing::warn!(origin = %origin, field = %field.key, "duplicate field key dropped");
        }
    }
    sort_fields(&mut normalized);
    normalized
}

/// Maps an empty schema to "not available".
fn non_empty(fields: Vec<FieldDefinition>) -> Option<Vec<FieldDefinition>> {
    if fields.is_empty() { None } else { Some(fields) }
}
