// crates/clientbook-core/src/core/field.rs
// ============================================================================
// Module: Field Schema
// Description: Field definitions, drafts, key derivation, and ordering.
// Purpose: Define the runtime-editable column schema shared by all stores.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A schema is an ordered list of [`FieldDefinition`] values. Keys are derived
//! from labels with [`derive_key`] and are unique within a schema. Ordering
//! uses the integer `order` rank only; ties keep their prior relative
//! position, so every sort in the crate goes through [`sort_fields`].
//!
//! [`FieldDraft`] is the transient edit buffer used by add and edit flows. It
//! never carries a key: the key is always recomputed from the draft label.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::FieldKey;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Separator substituted for every whitespace run during key derivation.
pub const KEY_SEPARATOR: char = '_';

/// Keys owned by the record itself and never usable as field keys.
pub const RESERVED_FIELD_KEYS: &[&str] = &["id", "created_at"];

/// Built-in fields used when no schema source is available.
///
/// Entries are `(key, label, options)`; order is the 1-based position.
const DEFAULT_FIELDS: &[(&str, &str, &[&str])] = &[
    ("ragioneSociale", "R.Sociale", &[]),
    ("categoria", "Categoria", &["Cliente", "Fornitore", "Partner"]),
    ("indirizzo", "Indirizzo", &[]),
    ("citta", "Città", &[]),
    ("provincia", "Provincia", &[]),
    ("telefono", "Telefono", &[]),
    ("cellulare", "Cell", &[]),
];

// ============================================================================
// SECTION: Field Types
// ============================================================================

/// One entry of the field schema.
///
/// # Invariants
/// - `key` is unique within a schema.
/// - `order` need not be unique or contiguous; only the relative sort matters.
/// - Non-empty `options` restrict editors only. Stored values are never
///   validated against them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Storage identity of the field.
    pub key: FieldKey,
    /// Display label.
    pub label: String,
    /// Display rank (ascending).
    pub order: i64,
    /// Closed choice values; empty means free text.
    #[serde(default)]
    pub options: Vec<String>,
}

impl FieldDefinition {
    /// Builds a definition whose key is derived from the label.
    #[must_use]
    pub fn from_label(label: impl Into<String>, order: i64, options: Vec<String>) -> Self {
        let label = label.into();
        Self {
            key: FieldKey::new(derive_key(&label)),
            label,
            order,
            options,
        }
    }
}

/// Transient edit buffer for the add and edit field flows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDraft {
    /// Requested label.
    pub label: String,
    /// Requested order; `None` lets the store choose.
    #[serde(default)]
    pub order: Option<i64>,
    /// Requested option list.
    #[serde(default)]
    pub options: Vec<String>,
}

impl FieldDraft {
    /// Creates a draft with only a label.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            order: None,
            options: Vec::new(),
        }
    }

    /// Seeds a draft from an existing definition for the edit flow.
    #[must_use]
    pub fn from_field(field: &FieldDefinition) -> Self {
        Self {
            label: field.label.clone(),
            order: Some(field.order),
            options: field.options.clone(),
        }
    }

    /// Sets the requested order.
    #[must_use]
    pub const fn with_order(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }

    /// Sets the option list.
    #[must_use]
    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }

    /// Parses a comma-separated option list, dropping blank entries.
    #[must_use]
    pub fn parse_options(text: &str) -> Vec<String> {
        text.split(',')
            .map(str::trim)
            .filter(|option| !option.is_empty())
            .map(ToString::to_string)
            .collect()
    }
}

// ============================================================================
// SECTION: Schema Helpers
// ============================================================================

/// Derives the storage key for a label.
///
/// Lower-cases the label and replaces every run of whitespace with a single
/// [`KEY_SEPARATOR`]. Leading and trailing whitespace is not trimmed, so it
/// becomes a leading or trailing separator. The function is idempotent.
#[must_use]
pub fn derive_key(label: &str) -> String {
    let mut key = String::with_capacity(label.len());
    let mut in_whitespace = false;
    for ch in label.chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                key.push(KEY_SEPARATOR);
                in_whitespace = true;
            }
            continue;
        }
        in_whitespace = false;
        key.extend(ch.to_lowercase());
    }
    key
}

/// Sorts fields by order ascending, keeping ties in their prior position.
pub fn sort_fields(fields: &mut [FieldDefinition]) {
    fields.sort_by_key(|field| field.order);
}

/// Returns the field used as primary display and sort key.
///
/// This is the lowest-ranked field; ties resolve to the earliest entry.
#[must_use]
pub fn primary_field(fields: &[FieldDefinition]) -> Option<&FieldDefinition> {
    fields.iter().min_by_key(|field| field.order)
}

/// Returns true when `key` collides with a record-owned attribute.
#[must_use]
pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_FIELD_KEYS.contains(&key)
}

/// Upper-cases the first character of a name.
#[must_use]
pub fn capitalize_first(name: &str) -> String {
    let mut chars = name.chars();
    chars.next().map_or_else(String::new, |first| first.to_uppercase().chain(chars).collect())
}

/// Returns the built-in default schema.
#[must_use]
pub fn default_schema() -> Vec<FieldDefinition> {
    DEFAULT_FIELDS
        .iter()
        .zip(1_i64 ..)
        .map(|((key, label, options), order)| FieldDefinition {
            key: FieldKey::new(*key),
            label: (*label).to_string(),
            order,
            options: options.iter().map(|option| (*option).to_string()).collect(),
        })
        .collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
