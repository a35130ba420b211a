// crates/clientbook-core/src/runtime/mod.rs
// ============================================================================
// Module: Clientbook Runtime
// Description: Schema store, synchronizer, record store, search, and backends.
// Purpose: Execute schema and record operations against collaborator interfaces.
// Dependencies: crate::{core, interfaces}, serde_json, tracing
// ============================================================================

//! ## Overview
//! Runtime modules implement the schema resolution chain, schema mutations
//! with remote-first persistence, structural synchronization, record CRUD,
//! and filtering. Reference backends (in-memory remote, file and memory
//! caches, cache-backed records) live here as well so that every deployment
//! variant can be assembled without external services.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod cache;
pub mod clientbook;
pub mod error;
pub mod local_records;
pub mod memory;
pub mod record_store;
pub mod schema_store;
pub mod search;
pub mod sources;
pub mod synchronizer;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use cache::FileCache;
pub use cache::InMemoryCache;
pub use clientbook::Clientbook;
pub use clientbook::ClientbookParts;
pub use error::StoreError;
pub use local_records::LocalRecordBackend;
pub use local_records::RECORDS_CACHE_KEY;
pub use memory::InMemoryRemote;
pub use memory::RemoteOp;
pub use record_store::DEFAULT_DUPLICATE_MARKER;
pub use record_store::MonotonicIdIssuer;
pub use record_store::RecordIdIssuer;
pub use record_store::RecordStore;
pub use schema_store::FieldRemoval;
pub use schema_store::FieldUpdate;
pub use schema_store::OrphanPolicy;
pub use schema_store::SchemaLoad;
pub use schema_store::SchemaStore;
pub use search::SearchState;
pub use search::filter_records;
pub use sources::CacheSource;
pub use sources::DefaultsSource;
pub use sources::MetadataSource;
pub use sources::SCHEMA_CACHE_KEY;
pub use sources::SchemaChain;
pub use sources::SchemaOrigin;
pub use sources::SchemaSource;
pub use sources::StructureSource;
pub use synchronizer::FieldSyncFailure;
pub use synchronizer::SchemaSynchronizer;
pub use synchronizer::SyncReport;
pub use synchronizer::merge_local_metadata;
