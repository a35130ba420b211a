// crates/clientbook-core/src/runtime/search.rs
// ============================================================================
// Module: Search Engine
// Description: Case-insensitive substring filter over records.
// Purpose: Derive the visible record subset from a query and column selection.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! [`filter_records`] is a pure function of the record set, the schema, the
//! query, and an optional field restriction. It never re-sorts: the result
//! preserves input order. [`SearchState`] holds the transient query and
//! column selection of a front-end and recomputes on every call.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::FieldDefinition;
use crate::core::FieldKey;
use crate::core::Record;

// ============================================================================
// SECTION: Filter
// ============================================================================

/// Returns the records matching `query`.
///
/// A query that is empty after trimming matches everything. Otherwise the
/// searched keys are `restrict` when non-empty, else every schema key, and a
/// record matches when any searched value contains the query ignoring case.
/// Missing values never match a non-empty query.
#[must_use]
pub fn filter_records<'a>(
    records: &'a [Record],
    schema: &[FieldDefinition],
    query: &str,
    restrict: &[FieldKey],
) -> Vec<&'a Record> {
    if query.trim().is_empty() {
        return records.iter().collect();
    }
    let needle = query.to_lowercase();
    let keys: Vec<&FieldKey> = if restrict.is_empty() {
        schema.iter().map(|field| &field.key).collect()
    } else {
        restrict.iter().collect()
    };
    records
        .iter()
        .filter(|record| {
            keys.iter().any(|key| record.value(key).to_lowercase().contains(&needle))
        })
        .collect()
}

// ============================================================================
// SECTION: Search State
// ============================================================================

/// Transient query and column selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    /// Free-text query.
    query: String,
    /// Fields the search is restricted to, in selection order.
    selected: Vec<FieldKey>,
}

impl SearchState {
    /// Creates an empty search state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current query.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Returns the selected fields.
    #[must_use]
    pub fn selected(&self) -> &[FieldKey] {
        &self.selected
    }

    /// Replaces the query.
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Selects `key` when unselected and unselects it otherwise.
    ///
    /// Returns true when the field is selected afterwards.
    pub fn toggle_field(&mut self, key: &FieldKey) -> bool {
        if let Some(index) = self.selected.iter().position(|selected| selected == key) {
            self.selected.remove(index);
            false
        } else {
            self.selected.push(key.clone());
            true
        }
    }

    /// Drops selected fields that are no longer in the schema.
    pub fn retain_known(&mut self, schema: &[FieldDefinition]) {
        self.selected.retain(|key| schema.iter().any(|field| field.key == *key));
    }

    /// Clears the query and the selection.
    pub fn clear(&mut self) {
        self.query.clear();
        self.selected.clear();
    }

    /// Applies the state to `records`.
    #[must_use]
    pub fn apply<'a>(&self, records: &'a [Record], schema: &[FieldDefinition]) -> Vec<&'a Record> {
        filter_records(records, schema, &self.query, &self.selected)
    }
}
