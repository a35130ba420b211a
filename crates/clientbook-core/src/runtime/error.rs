// crates/clientbook-core/src/runtime/error.rs
// ============================================================================
// Module: Store Errors
// Description: Error taxonomy for schema and record store operations.
// Purpose: Distinguish validation, persistence, remote, and lookup failures.
// Dependencies: crate::interfaces, thiserror
// ============================================================================

//! ## Overview
//! [`StoreError`] is returned by every store operation. Remote write failures
//! are reported as [`StoreError::Persistence`] and remote read failures as
//! [`StoreError::Remote`], so callers can tell whether a mutation was refused
//! or a listing was unavailable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::interfaces::CacheError;
use crate::interfaces::RemoteError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors surfaced by schema and record stores.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Input failed validation before any persistence was attempted.
    #[error("validation error: {0}")]
    Validation(String),
    /// A remote write failed; local state was not modified.
    #[error("persistence error: {0}")]
    Persistence(RemoteError),
    /// A remote read failed.
    #[error("remote error: {0}")]
    Remote(RemoteError),
    /// The addressed field or record does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// The local cache failed.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
}

impl StoreError {
    /// Maps a remote write failure, surfacing missing targets as not found.
    #[must_use]
    pub fn from_write(error: RemoteError) -> Self {
        match error {
            RemoteError::NotFound(message) => Self::NotFound(message),
            other => Self::Persistence(other),
        }
    }
}
