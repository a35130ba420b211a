// crates/clientbook-store-sqlite/src/lib.rs
// ============================================================================
// Module: Clientbook SQLite Store
// Description: SQLite implementation of the clientbook remote collaborators.
// Purpose: Expose the durable store and its configuration.
// Dependencies: clientbook-core, rusqlite
// ============================================================================

//! ## Overview
//! One `SQLite` database holds the records table, the `columns` metadata
//! table, and a versioned `store_meta` table. [`SqliteClientStore`]
//! implements record CRUD, field metadata rows, and table structure DDL.

pub mod store;

pub use store::SqliteClientStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
