// crates/clientbook-core/src/runtime/local_records.rs
// ============================================================================
// Module: Local Record Backend
// Description: RecordBackend persisted as a JSON list in the local cache.
// Purpose: Run the clientbook without any remote datastore.
// Dependencies: crate::{core, interfaces}, async-trait, serde_json
// ============================================================================

//! ## Overview
//! In the no-backend variant the whole record list lives in the local cache
//! under [`RECORDS_CACHE_KEY`]. Every operation reads the list, applies the
//! change, and writes the list back. Cache failures surface as
//! [`RemoteError::Transport`] so the stores treat them like any remote.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::FieldKey;
use crate::core::FieldValues;
use crate::core::Record;
use crate::core::RecordId;
use crate::interfaces::LocalCache;
use crate::interfaces::RecordBackend;
use crate::interfaces::RemoteError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Cache key holding the serialized record list.
pub const RECORDS_CACHE_KEY: &str = "contacts";

// ============================================================================
// SECTION: Backend
// ============================================================================

/// Record backend stored in a [`LocalCache`].
pub struct LocalRecordBackend {
    /// Backing cache.
    cache: Arc<dyn LocalCache>,
    /// Cache key for the record list.
    key: String,
    /// Serializes read-modify-write cycles.
    write_lock: Mutex<()>,
}

impl LocalRecordBackend {
    /// Creates a backend storing records under [`RECORDS_CACHE_KEY`].
    #[must_use]
    pub fn new(cache: Arc<dyn LocalCache>) -> Self {
        Self {
            cache,
            key: RECORDS_CACHE_KEY.to_string(),
            write_lock: Mutex::new(()),
        }
    }

    /// Reads the stored list; a missing entry is an empty list.
    fn read(&self) -> Result<Vec<Record>, RemoteError> {
        let raw = self.cache.get(&self.key).map_err(|err| RemoteError::Transport(err.to_string()))?;
        match raw {
            None => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|err| RemoteError::Transport(format!("stored records corrupt: {err}"))),
        }
    }

    /// Writes the full list.
    fn write(&self, records: &[Record]) -> Result<(), RemoteError> {
        let encoded = serde_json::to_string(records)
            .map_err(|err| RemoteError::Transport(err.to_string()))?;
        self.cache.set(&self.key, &encoded).map_err(|err| RemoteError::Transport(err.to_string()))
    }

    /// Runs a read-modify-write cycle under the write lock.
    fn modify<T>(
        &self,
        change: impl FnOnce(&mut Vec<Record>) -> Result<T, RemoteError>,
    ) -> Result<T, RemoteError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| RemoteError::Transport("local record lock poisoned".to_string()))?;
        let mut records = self.read()?;
        let outcome = change(&mut records)?;
        self.write(&records)?;
        Ok(outcome)
    }
}

#[async_trait]
impl RecordBackend for LocalRecordBackend {
    async fn list_records(&self, _order_by: Option<&FieldKey>) -> Result<Vec<Record>, RemoteError> {
        self.read()
    }

    async fn insert_record(&self, record: &Record) -> Result<Record, RemoteError> {
        self.modify(|records| {
            if records.iter().any(|existing| existing.id == record.id) {
                return Err(RemoteError::Rejected(format!("record {} already exists", record.id)));
            }
            records.push(record.clone());
            Ok(record.clone())
        })
    }

    async fn update_record(
        &self,
        id: &RecordId,
        values: &FieldValues,
    ) -> Result<Record, RemoteError> {
        self.modify(|records| {
            let Some(record) = records.iter_mut().find(|record| record.id == *id) else {
                return Err(RemoteError::NotFound(format!("record {id}")));
            };
            record.values.clone_from(values);
            Ok(record.clone())
        })
    }

    async fn delete_record(&self, id: &RecordId) -> Result<(), RemoteError> {
        self.modify(|records| {
            let before = records.len();
            records.retain(|record| record.id != *id);
            if records.len() == before {
                return Err(RemoteError::NotFound(format!("record {id}")));
            }
            Ok(())
        })
    }
}
