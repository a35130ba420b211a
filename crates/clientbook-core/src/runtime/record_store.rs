// crates/clientbook-core/src/runtime/record_store.rs
// ============================================================================
// Module: Record Store
// Description: CRUD over client records with explicit identifier issuance.
// Purpose: Create, list, update, delete, and duplicate records.
// Dependencies: crate::{core, interfaces, runtime}, tracing
// ============================================================================

//! ## Overview
//! [`RecordStore`] is pure CRUD over records whose shape is whatever the
//! current schema defines. It never names fields itself; the primary field
//! used for sorting and duplication is passed in by the caller.
//!
//! Identifiers come from a [`RecordIdIssuer`]. The default
//! [`MonotonicIdIssuer`] derives identifiers from the wall clock but never
//! issues the same value twice within a process, even on a coarse clock.
//! Before its first create the store reports every stored identifier to the
//! issuer, so identifiers issued by earlier sessions ahead of the clock are
//! never reissued.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use crate::core::FieldKey;
use crate::core::FieldValues;
use crate::core::Record;
use crate::core::RecordId;
use crate::interfaces::RecordBackend;
use crate::runtime::error::StoreError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Suffix appended to the primary value of a duplicated record.
pub const DEFAULT_DUPLICATE_MARKER: &str = " (Copia)";

// ============================================================================
// SECTION: Identifier Issuance
// ============================================================================

/// Issues identifiers for new records.
pub trait RecordIdIssuer: Send + Sync {
    /// Returns an identifier never issued before by this issuer.
    fn issue(&self) -> RecordId;

    /// Records an identifier already stored so it is never issued.
    fn observe(&self, _id: &RecordId) {}
}

/// Time-derived identifier issuer with a strictly increasing sequence.
#[derive(Debug, Default)]
pub struct MonotonicIdIssuer {
    /// Last issued value.
    last: AtomicU64,
}

impl MonotonicIdIssuer {
    /// Creates an issuer seeded from the clock on first use.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    /// Creates an issuer whose next identifier is greater than `last`.
    #[must_use]
    pub const fn starting_after(last: u64) -> Self {
        Self {
            last: AtomicU64::new(last),
        }
    }
}

impl RecordIdIssuer for MonotonicIdIssuer {
    fn issue(&self) -> RecordId {
        let now = unix_millis_u64();
        let previous = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last.saturating_add(1)))
            })
            .unwrap_or_else(|last| last);
        RecordId::new(now.max(previous.saturating_add(1)).to_string())
    }

    fn observe(&self, id: &RecordId) {
        if let Ok(value) = id.as_str().parse::<u64>() {
            self.last.fetch_max(value, Ordering::SeqCst);
        }
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Record CRUD over a [`RecordBackend`].
#[derive(Clone)]
pub struct RecordStore {
    /// Remote record backend.
    backend: Arc<dyn RecordBackend>,
    /// Identifier issuer.
    ids: Arc<dyn RecordIdIssuer>,
    /// Suffix for duplicated primary values.
    duplicate_marker: String,
    /// Whether stored identifiers were reported to the issuer.
    ids_seeded: Arc<AtomicBool>,
}

impl RecordStore {
    /// Creates a record store with the monotonic issuer and default marker.
    #[must_use]
    pub fn new(backend: Arc<dyn RecordBackend>) -> Self {
        Self {
            backend,
            ids: Arc::new(MonotonicIdIssuer::new()),
            duplicate_marker: DEFAULT_DUPLICATE_MARKER.to_string(),
            ids_seeded: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Replaces the identifier issuer.
    #[must_use]
    pub fn with_issuer(mut self, ids: Arc<dyn RecordIdIssuer>) -> Self {
        self.ids = ids;
        self.ids_seeded = Arc::new(AtomicBool::new(false));
        self
    }

    /// Replaces the duplication marker.
    #[must_use]
    pub fn with_duplicate_marker(mut self, marker: impl Into<String>) -> Self {
        self.duplicate_marker = marker.into();
        self
    }

    /// Returns the duplication marker.
    #[must_use]
    pub fn duplicate_marker(&self) -> &str {
        &self.duplicate_marker
    }

    /// Lists records sorted by `primary` ascending, case-insensitive.
    ///
    /// The sort is stable, so records with equal primary values keep the
    /// backend order. Records without a primary value sort first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Remote`] when the listing fails.
    pub async fn list(&self, primary: Option<&FieldKey>) -> Result<Vec<Record>, StoreError> {
        let mut records = self.backend.list_records(primary).await.map_err(StoreError::Remote)?;
        self.observe_ids(&records);
        if let Some(primary) = primary {
            records.sort_by_cached_key(|record| record.value(primary).to_lowercase());
        }
        Ok(records)
    }

    /// Creates a record with a freshly issued identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Remote`] when the first create cannot list the
    /// stored identifiers and [`StoreError::Persistence`] when the insert fails.
    pub async fn create(&self, values: FieldValues) -> Result<Record, StoreError> {
        if !self.ids_seeded.load(Ordering::SeqCst) {
            let records = self.backend.list_records(None).await.map_err(StoreError::Remote)?;
            self.observe_ids(&records);
        }
        let record = Record {
            id: self.ids.issue(),
            created_at: Some(unix_millis()),
            values,
        };
        let stored = self.backend.insert_record(&record).await.map_err(StoreError::Persistence)?;
        tracing::debug!(record = %stored.id, "record created");
        Ok(stored)
    }

    /// Replaces every value of the record `id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the record does not exist and
    /// [`StoreError::Persistence`] for other remote failures.
    pub async fn update(&self, id: &RecordId, values: FieldValues) -> Result<Record, StoreError> {
        let stored =
            self.backend.update_record(id, &values).await.map_err(StoreError::from_write)?;
        tracing::debug!(record = %id, "record updated");
        Ok(stored)
    }

    /// Deletes the record `id`.
    ///
    /// Deleting a missing record is an error, not a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the record does not exist and
    /// [`StoreError::Persistence`] for other remote failures.
    pub async fn delete(&self, id: &RecordId) -> Result<(), StoreError> {
        self.backend.delete_record(id).await.map_err(StoreError::from_write)?;
        tracing::debug!(record = %id, "record deleted");
        Ok(())
    }

    /// Creates a copy of `source` under a new identifier.
    ///
    /// The primary value gets the duplication marker appended. The source
    /// record is not modified.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] when the insert fails.
    pub async fn duplicate(
        &self,
        source: &Record,
        primary: Option<&FieldKey>,
    ) -> Result<Record, StoreError> {
        let mut values = source.values.clone();
        if let Some(primary) = primary {
            let marked = format!("{}{}", source.value(primary), self.duplicate_marker);
            values.insert(primary.clone(), marked);
        }
        self.create(values).await
    }

    /// Removes the value for `key` from every record that has one.
    ///
    /// Returns the number of records rewritten.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the listing or a rewrite fails. Records
    /// rewritten before the failure stay rewritten.
    pub async fn clear_field(&self, key: &FieldKey) -> Result<usize, StoreError> {
        let records = self.backend.list_records(None).await.map_err(StoreError::Remote)?;
        let mut cleared = 0_usize;
        for mut record in records {
            if record.values.remove(key).is_none() {
                continue;
            }
            self.backend
                .update_record(&record.id, &record.values)
                .await
                .map_err(StoreError::from_write)?;
            cleared += 1;
        }
        tracing::info!(field = %key, records = cleared, "field values cleared");
        Ok(cleared)
    }

    /// Moves the value stored under `from` to `to` in every record that has one.
    ///
    /// A value already stored under `to` is overwritten. Returns the number
    /// of records rewritten.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the listing or a rewrite fails. Records
    /// rewritten before the failure stay rewritten.
    pub async fn rename_field(&self, from: &FieldKey, to: &FieldKey) -> Result<usize, StoreError> {
        let records = self.backend.list_records(None).await.map_err(StoreError::Remote)?;
        let mut moved = 0_usize;
        for mut record in records {
            let Some(value) = record.values.remove(from) else {
                continue;
            };
            record.values.insert(to.clone(), value);
            self.backend
                .update_record(&record.id, &record.values)
                .await
                .map_err(StoreError::from_write)?;
            moved += 1;
        }
        tracing::info!(from = %from, to = %to, records = moved, "field values moved");
        Ok(moved)
    }

    /// Reports stored identifiers to the issuer.
    fn observe_ids(&self, records: &[Record]) {
        for record in records {
            self.ids.observe(&record.id);
        }
        self.ids_seeded.store(true, Ordering::SeqCst);
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the current unix epoch in milliseconds.
fn unix_millis() -> i64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}

/// Returns the current unix epoch in milliseconds as an unsigned value.
fn unix_millis_u64() -> u64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    u64::try_from(now.as_millis()).unwrap_or(u64::MAX)
}
