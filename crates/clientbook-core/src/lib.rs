// crates/clientbook-core/src/lib.rs
// ============================================================================
// Module: Clientbook Core Library
// Description: Public API surface for the Clientbook core.
// Purpose: Expose field schema types, collaborator interfaces, and runtime stores.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Clientbook core manages a record collection whose shape is defined by a
//! runtime-editable field schema. It keeps three schema representations
//! consistent (remote physical structure, remote metadata rows, and a local
//! cache), performs record CRUD against the current schema, and filters
//! records with a pure search engine. Storage is reached through explicit
//! interfaces so the same logic runs against `SQLite`, in-memory doubles, or a
//! purely local cache.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::CacheError;
pub use interfaces::FieldMetadataBackend;
pub use interfaces::LocalCache;
pub use interfaces::PhysicalField;
pub use interfaces::RecordBackend;
pub use interfaces::RemoteError;
pub use interfaces::TableStructureBackend;
pub use runtime::Clientbook;
pub use runtime::ClientbookParts;
pub use runtime::FieldRemoval;
pub use runtime::FieldSyncFailure;
pub use runtime::FieldUpdate;
pub use runtime::FileCache;
pub use runtime::InMemoryCache;
pub use runtime::InMemoryRemote;
pub use runtime::LocalRecordBackend;
pub use runtime::MonotonicIdIssuer;
pub use runtime::OrphanPolicy;
pub use runtime::RecordIdIssuer;
pub use runtime::RecordStore;
pub use runtime::RemoteOp;
pub use runtime::SchemaLoad;
pub use runtime::SchemaOrigin;
pub use runtime::SchemaSource;
pub use runtime::SchemaStore;
pub use runtime::SchemaSynchronizer;
pub use runtime::SearchState;
pub use runtime::StoreError;
pub use runtime::SyncReport;
pub use runtime::filter_records;
pub use runtime::merge_local_metadata;
