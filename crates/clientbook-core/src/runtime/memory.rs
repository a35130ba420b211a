// crates/clientbook-core/src/runtime/memory.rs
// ============================================================================
// Module: In-Memory Remote
// Description: In-memory implementation of every remote collaborator.
// Purpose: Provide a deterministic remote for tests and ephemeral sessions.
// Dependencies: crate::{core, interfaces}, async-trait
// ============================================================================

//! ## Overview
//! [`InMemoryRemote`] implements record CRUD, field metadata rows, and table
//! structure DDL over one shared state, so structural changes move record
//! values the way a real table would: renaming a column renames the key in
//! every record and dropping a column erases its values.
//!
//! Failures can be injected per operation (and per column for `add_column`)
//! to exercise partial-failure and rollback paths. Successful operations are
//! recorded in a journal. It is not intended for production use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use async_trait::async_trait;

use crate::core::FieldDefinition;
use crate::core::FieldKey;
use crate::core::FieldValues;
use crate::core::Record;
use crate::core::RecordId;
use crate::interfaces::FieldMetadataBackend;
use crate::interfaces::PhysicalField;
use crate::interfaces::RecordBackend;
use crate::interfaces::RemoteError;
use crate::interfaces::TableStructureBackend;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Remote operation identifiers for failure injection and the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RemoteOp {
    /// `list_records`.
    ListRecords,
    /// `insert_record`.
    InsertRecord,
    /// `update_record`.
    UpdateRecord,
    /// `delete_record`.
    DeleteRecord,
    /// `list_fields`.
    ListFields,
    /// `insert_field`.
    InsertField,
    /// `update_field`.
    UpdateField,
    /// `delete_field`.
    DeleteField,
    /// `replace_all_fields`.
    ReplaceAllFields,
    /// `describe_table`.
    DescribeTable,
    /// `add_column`.
    AddColumn,
    /// `rename_column`.
    RenameColumn,
    /// `drop_column`.
    DropColumn,
}

impl RemoteOp {
    /// Returns the operation name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ListRecords => "list_records",
            Self::InsertRecord => "insert_record",
            Self::UpdateRecord => "update_record",
            Self::DeleteRecord => "delete_record",
            Self::ListFields => "list_fields",
            Self::InsertField => "insert_field",
            Self::UpdateField => "update_field",
            Self::DeleteField => "delete_field",
            Self::ReplaceAllFields => "replace_all_fields",
            Self::DescribeTable => "describe_table",
            Self::AddColumn => "add_column",
            Self::RenameColumn => "rename_column",
            Self::DropColumn => "drop_column",
        }
    }
}

/// Shared remote state.
#[derive(Debug, Default)]
struct RemoteState {
    /// Records in insertion order.
    records: Vec<Record>,
    /// Metadata rows.
    fields: Vec<FieldDefinition>,
    /// Records table name, when the table exists.
    table: Option<String>,
    /// Physical columns of the records table.
    columns: Vec<PhysicalField>,
    /// Operations that fail.
    failing: BTreeSet<RemoteOp>,
    /// Columns whose creation fails.
    failing_columns: BTreeSet<String>,
    /// Successful operations in call order.
    journal: Vec<RemoteOp>,
}

/// In-memory remote datastore.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRemote {
    /// Shared state.
    state: Arc<Mutex<RemoteState>>,
}

impl InMemoryRemote {
    /// Creates an empty remote without a records table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a remote whose records table has `id`, `created_at`, and the
    /// given field columns.
    #[must_use]
    pub fn with_table(table: impl Into<String>, columns: &[&str]) -> Self {
        let remote = Self::new();
        if let Ok(mut state) = remote.state.lock() {
            state.table = Some(table.into());
            state.columns = [("id", "TEXT"), ("created_at", "INTEGER")]
                .iter()
                .map(|(name, data_type)| PhysicalField::new(*name, *data_type))
                .chain(columns.iter().map(|name| PhysicalField::new(*name, "TEXT")))
                .collect();
        }
        remote
    }

    /// Replaces the metadata rows without journaling the change.
    pub fn seed_fields(&self, fields: &[FieldDefinition]) {
        if let Ok(mut state) = self.state.lock() {
            state.fields = fields.to_vec();
        }
    }

    /// Makes every call of `op` fail with a transport error.
    pub fn fail(&self, op: RemoteOp) {
        if let Ok(mut state) = self.state.lock() {
            state.failing.insert(op);
        }
    }

    /// Makes `add_column` fail for `name` only.
    pub fn fail_column(&self, name: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.failing_columns.insert(name.to_string());
        }
    }

    /// Clears every injected failure.
    pub fn heal(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.failing.clear();
            state.failing_columns.clear();
        }
    }

    /// Returns the successful operations in call order.
    #[must_use]
    pub fn journal(&self) -> Vec<RemoteOp> {
        self.state.lock().map(|state| state.journal.clone()).unwrap_or_default()
    }

    /// Returns the stored metadata rows.
    #[must_use]
    pub fn stored_fields(&self) -> Vec<FieldDefinition> {
        self.state.lock().map(|state| state.fields.clone()).unwrap_or_default()
    }

    /// Returns the stored records.
    #[must_use]
    pub fn stored_records(&self) -> Vec<Record> {
        self.state.lock().map(|state| state.records.clone()).unwrap_or_default()
    }

    /// Returns the physical column names.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|state| state.columns.iter().map(|column| column.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Locks the state and checks for an injected failure of `op`.
    fn begin(&self, op: RemoteOp) -> Result<MutexGuard<'_, RemoteState>, RemoteError> {
        let state = self
            .state
            .lock()
            .map_err(|_| RemoteError::Transport("in-memory remote mutex poisoned".to_string()))?;
        if state.failing.contains(&op) {
            return Err(RemoteError::Transport(format!("injected failure: {}", op.as_str())));
        }
        Ok(state)
    }
}

impl RemoteState {
    /// Ensures `table` is the records table.
    fn check_table(&self, table: &str) -> Result<(), RemoteError> {
        match &self.table {
            Some(name) if name == table => Ok(()),
            _ => Err(RemoteError::NotFound(format!("table {table}"))),
        }
    }

    /// Returns the position of a physical column.
    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }
}

// ============================================================================
// SECTION: Record Backend
// ============================================================================

#[async_trait]
impl RecordBackend for InMemoryRemote {
    async fn list_records(&self, _order_by: Option<&FieldKey>) -> Result<Vec<Record>, RemoteError> {
        let mut state = self.begin(RemoteOp::ListRecords)?;
        state.journal.push(RemoteOp::ListRecords);
        Ok(state.records.clone())
    }

    async fn insert_record(&self, record: &Record) -> Result<Record, RemoteError> {
        let mut state = self.begin(RemoteOp::InsertRecord)?;
        if state.records.iter().any(|existing| existing.id == record.id) {
            return Err(RemoteError::Rejected(format!("record {} already exists", record.id)));
        }
        state.records.push(record.clone());
        state.journal.push(RemoteOp::InsertRecord);
        Ok(record.clone())
    }

    async fn update_record(
        &self,
        id: &RecordId,
        values: &FieldValues,
    ) -> Result<Record, RemoteError> {
        let mut state = self.begin(RemoteOp::UpdateRecord)?;
        let Some(record) = state.records.iter_mut().find(|record| record.id == *id) else {
            return Err(RemoteError::NotFound(format!("record {id}")));
        };
        record.values.clone_from(values);
        let stored = record.clone();
        state.journal.push(RemoteOp::UpdateRecord);
        Ok(stored)
    }

    async fn delete_record(&self, id: &RecordId) -> Result<(), RemoteError> {
        let mut state = self.begin(RemoteOp::DeleteRecord)?;
        let before = state.records.len();
        state.records.retain(|record| record.id != *id);
        if state.records.len() == before {
            return Err(RemoteError::NotFound(format!("record {id}")));
        }
        state.journal.push(RemoteOp::DeleteRecord);
        Ok(())
    }
}

// ============================================================================
// SECTION: Field Metadata Backend
// ============================================================================

#[async_trait]
impl FieldMetadataBackend for InMemoryRemote {
    async fn list_fields(&self) -> Result<Vec<FieldDefinition>, RemoteError> {
        let mut state = self.begin(RemoteOp::ListFields)?;
        state.journal.push(RemoteOp::ListFields);
        Ok(state.fields.clone())
    }

    async fn insert_field(&self, field: &FieldDefinition) -> Result<(), RemoteError> {
        let mut state = self.begin(RemoteOp::InsertField)?;
        if state.fields.iter().any(|existing| existing.key == field.key) {
            return Err(RemoteError::Rejected(format!("field {} already exists", field.key)));
        }
        state.fields.push(field.clone());
        state.journal.push(RemoteOp::InsertField);
        Ok(())
    }

    async fn update_field(
        &self,
        key: &FieldKey,
        field: &FieldDefinition,
    ) -> Result<(), RemoteError> {
        let mut state = self.begin(RemoteOp::UpdateField)?;
        let Some(existing) = state.fields.iter_mut().find(|existing| existing.key == *key) else {
            return Err(RemoteError::NotFound(format!("field {key}")));
        };
        *existing = field.clone();
        state.journal.push(RemoteOp::UpdateField);
        Ok(())
    }

    async fn delete_field(&self, key: &FieldKey) -> Result<(), RemoteError> {
        let mut state = self.begin(RemoteOp::DeleteField)?;
        let before = state.fields.len();
        state.fields.retain(|field| field.key != *key);
        if state.fields.len() == before {
            return Err(RemoteError::NotFound(format!("field {key}")));
        }
        state.journal.push(RemoteOp::DeleteField);
        Ok(())
    }

    async fn replace_all_fields(&self, fields: &[FieldDefinition]) -> Result<(), RemoteError> {
        let mut state = self.begin(RemoteOp::ReplaceAllFields)?;
        state.fields = fields.to_vec();
        state.journal.push(RemoteOp::ReplaceAllFields);
        Ok(())
    }
}

// ============================================================================
// SECTION: Table Structure Backend
// ============================================================================

#[async_trait]
impl TableStructureBackend for InMemoryRemote {
    async fn describe_table(&self, table: &str) -> Result<Vec<PhysicalField>, RemoteError> {
        let mut state = self.begin(RemoteOp::DescribeTable)?;
        state.check_table(table)?;
        state.journal.push(RemoteOp::DescribeTable);
        Ok(state.columns.clone())
    }

    async fn add_column(
        &self,
        table: &str,
        name: &str,
        data_type: &str,
    ) -> Result<(), RemoteError> {
        let mut state = self.begin(RemoteOp::AddColumn)?;
        state.check_table(table)?;
        if state.failing_columns.contains(name) {
            return Err(RemoteError::Transport(format!("injected failure for column {name}")));
        }
        if state.column_index(name).is_some() {
            return Err(RemoteError::Rejected(format!("duplicate column name: {name}")));
        }
        state.columns.push(PhysicalField::new(name, data_type));
        state.journal.push(RemoteOp::AddColumn);
        Ok(())
    }

    async fn rename_column(&self, table: &str, old: &str, new: &str) -> Result<(), RemoteError> {
        let mut state = self.begin(RemoteOp::RenameColumn)?;
        state.check_table(table)?;
        let Some(index) = state.column_index(old) else {
            return Err(RemoteError::NotFound(format!("column {old}")));
        };
        if state.column_index(new).is_some() {
            return Err(RemoteError::Rejected(format!("duplicate column name: {new}")));
        }
        state.columns[index].name = new.to_string();
        let (old_key, new_key) = (FieldKey::new(old), FieldKey::new(new));
        for record in &mut state.records {
            if let Some(value) = record.values.remove(&old_key) {
                record.values.insert(new_key.clone(), value);
            }
        }
        state.journal.push(RemoteOp::RenameColumn);
        Ok(())
    }

    async fn drop_column(&self, table: &str, name: &str) -> Result<(), RemoteError> {
        let mut state = self.begin(RemoteOp::DropColumn)?;
        state.check_table(table)?;
        let Some(index) = state.column_index(name) else {
            return Err(RemoteError::NotFound(format!("column {name}")));
        };
        state.columns.remove(index);
        let key = FieldKey::new(name);
        for record in &mut state.records {
            record.values.remove(&key);
        }
        state.journal.push(RemoteOp::DropColumn);
        Ok(())
    }
}
