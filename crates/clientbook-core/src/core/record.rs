// crates/clientbook-core/src/core/record.rs
// ============================================================================
// Module: Records
// Description: Flat key/value client records.
// Purpose: Represent one client as an identifier plus field values.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`Record`] maps field keys to string values. Records are agnostic to
//! schema changes: a key absent from the map reads as the empty string, and
//! values for keys no longer in the schema are retained until explicitly
//! cleared.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::FieldKey;
use crate::core::identifiers::RecordId;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Field values of a record keyed by field key.
pub type FieldValues = BTreeMap<FieldKey, String>;

/// Stored client record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Opaque record identifier.
    pub id: RecordId,
    /// Creation timestamp in unix milliseconds, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    /// Field values.
    #[serde(default)]
    pub values: FieldValues,
}

impl Record {
    /// Creates a record with the provided values.
    #[must_use]
    pub const fn new(id: RecordId, values: FieldValues) -> Self {
        Self {
            id,
            created_at: None,
            values,
        }
    }

    /// Returns the value stored for a key, or the empty string when missing.
    #[must_use]
    pub fn value(&self, key: &FieldKey) -> &str {
        self.values.get(key).map_or("", String::as_str)
    }

    /// Returns true when the record stores a non-empty value for the key.
    #[must_use]
    pub fn has_value(&self, key: &FieldKey) -> bool {
        !self.value(key).is_empty()
    }
}
