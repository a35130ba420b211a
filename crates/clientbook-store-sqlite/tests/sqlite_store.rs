// crates/clientbook-store-sqlite/tests/sqlite_store.rs
// ============================================================================
// Module: SQLite Client Store Tests
// Description: Validate records, metadata rows, and DDL against SQLite.
// Purpose: Ensure the durable remote honors every collaborator contract.
// Dependencies: clientbook-core, clientbook-store-sqlite, rusqlite, tempfile
// ============================================================================

//! ## Overview
//! Integration tests for [`SqliteClientStore`]:
//! - Path safety and schema versioning
//! - Record CRUD, ordering, and column validation
//! - Metadata row CRUD and bulk replacement
//! - Column add/rename/drop and value preservation
//! - End-to-end clientbook sessions over one database file

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::sync::Arc;

use clientbook_core::Clientbook;
use clientbook_core::ClientbookParts;
use clientbook_core::FieldDefinition;
use clientbook_core::FieldDraft;
use clientbook_core::FieldKey;
use clientbook_core::FieldMetadataBackend;
use clientbook_core::FieldValues;
use clientbook_core::InMemoryCache;
use clientbook_core::Record;
use clientbook_core::RecordBackend;
use clientbook_core::RecordId;
use clientbook_core::RemoteError;
use clientbook_core::SchemaOrigin;
use clientbook_core::TableStructureBackend;
use clientbook_store_sqlite::SqliteClientStore;
use clientbook_store_sqlite::SqliteStoreConfig;
use clientbook_store_sqlite::SqliteStoreError;
use clientbook_store_sqlite::SqliteStoreMode;
use clientbook_store_sqlite::SqliteSyncMode;
use rusqlite::Connection;
use rusqlite::params;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn open(dir: &TempDir) -> SqliteClientStore {
    SqliteClientStore::new(SqliteStoreConfig::new(dir.path().join("clientbook.db"))).unwrap()
}

async fn open_with_columns(dir: &TempDir, columns: &[&str]) -> SqliteClientStore {
    let store = open(dir);
    for column in columns {
        store.add_column("clients", column, "TEXT").await.unwrap();
    }
    store
}

fn values(pairs: &[(&str, &str)]) -> FieldValues {
    pairs.iter().map(|(key, value)| (FieldKey::new(*key), (*value).to_string())).collect()
}

fn record(id: &str, pairs: &[(&str, &str)]) -> Record {
    Record::new(RecordId::new(id), values(pairs))
}

fn field(key: &str, label: &str, order: i64) -> FieldDefinition {
    FieldDefinition {
        key: FieldKey::new(key),
        label: label.to_string(),
        order,
        options: Vec::new(),
    }
}

fn column_names(columns: &[clientbook_core::PhysicalField]) -> Vec<&str> {
    columns.iter().map(|column| column.name.as_str()).collect()
}

fn set_version(path: &Path, version: i64) {
    let connection = Connection::open(path).unwrap();
    connection.execute("UPDATE store_meta SET version = ?1", params![version]).unwrap();
}

// ============================================================================
// SECTION: Open
// ============================================================================

#[test]
fn open_rejects_directory_path() {
    let dir = TempDir::new().unwrap();
    let err = SqliteClientStore::new(SqliteStoreConfig::new(dir.path())).err().unwrap();
    assert!(matches!(err, SqliteStoreError::Invalid(_)));
}

#[test]
fn open_rejects_overlong_component() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a".repeat(300));
    let err = SqliteClientStore::new(SqliteStoreConfig::new(path)).err().unwrap();
    assert_eq!(
        err,
        SqliteStoreError::Invalid("store path contains an overlong component".to_string())
    );
}

#[test]
fn open_rejects_store_owned_table_name() {
    let dir = TempDir::new().unwrap();
    let mut config = SqliteStoreConfig::new(dir.path().join("clientbook.db"));
    config.table = "columns".to_string();
    let err = SqliteClientStore::new(config).err().unwrap();
    assert!(matches!(err, SqliteStoreError::Invalid(_)));
}

#[test]
fn open_rejects_unknown_schema_version() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("clientbook.db");
    drop(SqliteClientStore::new(SqliteStoreConfig::new(&path)).unwrap());
    set_version(&path, 99);

    let err = SqliteClientStore::new(SqliteStoreConfig::new(&path)).err().unwrap();

    assert!(matches!(err, SqliteStoreError::VersionMismatch(_)));
}

#[tokio::test]
async fn open_creates_parent_directories_and_honors_pragmas() {
    let dir = TempDir::new().unwrap();
    let mut config = SqliteStoreConfig::new(dir.path().join("nested").join("store.db"));
    config.journal_mode = SqliteStoreMode::Delete;
    config.sync_mode = SqliteSyncMode::Normal;
    config.table = "contatti".to_string();

    let store = SqliteClientStore::new(config).unwrap();

    store.check_connection().await.unwrap();
    assert_eq!(store.table(), "contatti");
    let columns = store.describe_table("contatti").await.unwrap();
    assert_eq!(column_names(&columns), vec!["id", "created_at"]);
}

// ============================================================================
// SECTION: Records
// ============================================================================

#[tokio::test]
async fn records_round_trip_and_sort_case_insensitively() {
    let dir = TempDir::new().unwrap();
    let store = open_with_columns(&dir, &["ragioneSociale", "citta"]).await;
    for (id, name) in [("1", "beta"), ("2", "Acme"), ("3", "alfa")] {
        store.insert_record(&record(id, &[("ragioneSociale", name)])).await.unwrap();
    }

    let listed = store.list_records(Some(&FieldKey::new("ragioneSociale"))).await.unwrap();

    let names: Vec<&str> =
        listed.iter().map(|record| record.value(&FieldKey::new("ragioneSociale"))).collect();
    assert_eq!(names, vec!["Acme", "alfa", "beta"]);
    assert!(listed.iter().all(|record| record.created_at.is_some()));
    assert!(listed.iter().all(|record| !record.has_value(&FieldKey::new("citta"))));
}

#[tokio::test]
async fn unknown_order_column_falls_back_to_insertion_order() {
    let dir = TempDir::new().unwrap();
    let store = open_with_columns(&dir, &["ragioneSociale"]).await;
    store.insert_record(&record("b", &[("ragioneSociale", "Zeta")])).await.unwrap();
    store.insert_record(&record("a", &[("ragioneSociale", "Alfa")])).await.unwrap();

    let listed = store.list_records(Some(&FieldKey::new("missing"))).await.unwrap();

    let ids: Vec<&str> = listed.iter().map(|record| record.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "a"]);
}

#[tokio::test]
async fn insert_keeps_explicit_created_at() {
    let dir = TempDir::new().unwrap();
    let store = open_with_columns(&dir, &["note"]).await;
    let mut input = record("1", &[("note", "x")]);
    input.created_at = Some(1_700_000_000_000);

    let stored = store.insert_record(&input).await.unwrap();

    assert_eq!(stored.created_at, Some(1_700_000_000_000));
    assert_eq!(store.list_records(None).await.unwrap()[0].created_at, Some(1_700_000_000_000));
}

#[tokio::test]
async fn insert_rejects_duplicate_ids_and_unknown_columns() {
    let dir = TempDir::new().unwrap();
    let store = open_with_columns(&dir, &["ragioneSociale"]).await;
    store.insert_record(&record("1", &[("ragioneSociale", "A")])).await.unwrap();

    let duplicate = store.insert_record(&record("1", &[("ragioneSociale", "B")])).await;
    let unknown = store.insert_record(&record("2", &[("email", "a@b.it")])).await;

    assert!(matches!(duplicate, Err(RemoteError::Rejected(_))));
    assert!(matches!(unknown, Err(RemoteError::Rejected(_))));
    assert_eq!(store.list_records(None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn update_replaces_every_value_column() {
    let dir = TempDir::new().unwrap();
    let store = open_with_columns(&dir, &["ragioneSociale", "citta"]).await;
    let created = store
        .insert_record(&record("1", &[("ragioneSociale", "Acme"), ("citta", "Roma")]))
        .await
        .unwrap();

    let updated = store
        .update_record(&created.id, &values(&[("ragioneSociale", "Acme Srl")]))
        .await
        .unwrap();

    assert_eq!(updated.value(&FieldKey::new("ragioneSociale")), "Acme Srl");
    assert!(!updated.has_value(&FieldKey::new("citta")));
    assert_eq!(updated.created_at, created.created_at);
}

#[tokio::test]
async fn update_and_delete_of_missing_record_are_not_found() {
    let dir = TempDir::new().unwrap();
    let store = open_with_columns(&dir, &["note"]).await;
    let bare_dir = TempDir::new().unwrap();
    let bare = open(&bare_dir);
    let missing = RecordId::new("missing");

    let update = store.update_record(&missing, &values(&[("note", "x")])).await;
    let delete = store.delete_record(&missing).await;
    let bare_update = bare.update_record(&missing, &FieldValues::new()).await;

    assert!(matches!(update, Err(RemoteError::NotFound(_))));
    assert!(matches!(delete, Err(RemoteError::NotFound(_))));
    assert!(matches!(bare_update, Err(RemoteError::NotFound(_))));
}

#[tokio::test]
async fn delete_removes_the_row() {
    let dir = TempDir::new().unwrap();
    let store = open_with_columns(&dir, &["note"]).await;
    store.insert_record(&record("1", &[("note", "x")])).await.unwrap();

    store.delete_record(&RecordId::new("1")).await.unwrap();

    assert!(store.list_records(None).await.unwrap().is_empty());
}

// ============================================================================
// SECTION: Field Metadata
// ============================================================================

#[tokio::test]
async fn metadata_rows_are_listed_by_position() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    let mut categoria = field("categoria", "Categoria", 2);
    categoria.options = vec!["Cliente".to_string(), "Fornitore".to_string()];
    store.insert_field(&categoria).await.unwrap();
    store.insert_field(&field("ragioneSociale", "R.Sociale", 1)).await.unwrap();

    let fields = store.list_fields().await.unwrap();

    assert_eq!(fields, vec![field("ragioneSociale", "R.Sociale", 1), categoria]);
}

#[tokio::test]
async fn metadata_writes_report_conflicts_and_missing_rows() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    store.insert_field(&field("note", "Note", 1)).await.unwrap();

    let duplicate = store.insert_field(&field("note", "Altro", 2)).await;
    let missing_update =
        store.update_field(&FieldKey::new("missing"), &field("missing", "M", 1)).await;
    let missing_delete = store.delete_field(&FieldKey::new("missing")).await;

    assert!(matches!(duplicate, Err(RemoteError::Rejected(_))));
    assert!(matches!(missing_update, Err(RemoteError::NotFound(_))));
    assert!(matches!(missing_delete, Err(RemoteError::NotFound(_))));
}

#[tokio::test]
async fn metadata_update_can_rename_the_key() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    store.insert_field(&field("note", "Note", 3)).await.unwrap();

    store
        .update_field(&FieldKey::new("note"), &field("note_interne", "Note Interne", 3))
        .await
        .unwrap();
    store.delete_field(&FieldKey::new("note_interne")).await.unwrap();

    assert!(store.list_fields().await.unwrap().is_empty());
}

#[tokio::test]
async fn replace_all_overwrites_and_rolls_back_on_conflict() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    store.insert_field(&field("old", "Old", 1)).await.unwrap();

    store
        .replace_all_fields(&[field("a", "A", 1), field("b", "B", 2)])
        .await
        .unwrap();
    let conflicting = store.replace_all_fields(&[field("c", "C", 1), field("c", "C", 2)]).await;

    assert!(matches!(conflicting, Err(RemoteError::Rejected(_))));
    let keys: Vec<String> =
        store.list_fields().await.unwrap().iter().map(|field| field.key.to_string()).collect();
    assert_eq!(keys, vec!["a", "b"]);
}

#[tokio::test]
async fn corrupt_options_are_reported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("clientbook.db");
    let store = SqliteClientStore::new(SqliteStoreConfig::new(&path)).unwrap();
    store.insert_field(&field("categoria", "Categoria", 1)).await.unwrap();
    Connection::open(&path)
        .unwrap()
        .execute("UPDATE columns SET options_json = 'not json'", params![])
        .unwrap();

    let err = store.list_fields().await.unwrap_err();

    assert!(matches!(err, RemoteError::Transport(message) if message.contains("corruption")));
}

// ============================================================================
// SECTION: Structure
// ============================================================================

#[tokio::test]
async fn add_column_rejects_duplicates_and_unsupported_types() {
    let dir = TempDir::new().unwrap();
    let store = open_with_columns(&dir, &["note"]).await;

    let duplicate = store.add_column("clients", "note", "TEXT").await;
    let bad_type = store.add_column("clients", "eta", "VARCHAR(10)").await;
    let other_table = store.add_column("other", "note", "TEXT").await;

    assert!(matches!(duplicate, Err(RemoteError::Rejected(_))));
    assert!(matches!(bad_type, Err(RemoteError::Rejected(_))));
    assert!(matches!(other_table, Err(RemoteError::NotFound(_))));
}

#[tokio::test]
async fn columns_with_unusual_names_are_quoted() {
    let dir = TempDir::new().unwrap();
    let store = open_with_columns(&dir, &["r._sociale", "_note_", "say \"hi\""]).await;
    store
        .insert_record(&record("1", &[("r._sociale", "Acme"), ("say \"hi\"", "ciao")]))
        .await
        .unwrap();

    let listed = store.list_records(Some(&FieldKey::new("r._sociale"))).await.unwrap();

    assert_eq!(listed[0].value(&FieldKey::new("say \"hi\"")), "ciao");
    let columns = store.describe_table("clients").await.unwrap();
    assert_eq!(
        column_names(&columns),
        vec!["id", "created_at", "r._sociale", "_note_", "say \"hi\""]
    );
}

#[tokio::test]
async fn rename_column_preserves_values() {
    let dir = TempDir::new().unwrap();
    let store = open_with_columns(&dir, &["note", "citta"]).await;
    store.insert_record(&record("1", &[("note", "x")])).await.unwrap();

    store.rename_column("clients", "note", "note_interne").await.unwrap();
    let clash = store.rename_column("clients", "note_interne", "citta").await;
    let missing = store.rename_column("clients", "note", "altro").await;

    assert!(matches!(clash, Err(RemoteError::Rejected(_))));
    assert!(matches!(missing, Err(RemoteError::NotFound(_))));
    let listed = store.list_records(None).await.unwrap();
    assert_eq!(listed[0].value(&FieldKey::new("note_interne")), "x");
}

#[tokio::test]
async fn drop_column_erases_values_and_protects_reserved_columns() {
    let dir = TempDir::new().unwrap();
    let store = open_with_columns(&dir, &["note"]).await;
    store.insert_record(&record("1", &[("note", "x")])).await.unwrap();

    store.drop_column("clients", "note").await.unwrap();
    let reserved = store.drop_column("clients", "id").await;
    let missing = store.drop_column("clients", "note").await;

    assert!(matches!(reserved, Err(RemoteError::Rejected(_))));
    assert!(matches!(missing, Err(RemoteError::NotFound(_))));
    let listed = store.list_records(None).await.unwrap();
    assert!(listed[0].values.is_empty());
}

// ============================================================================
// SECTION: Clientbook Sessions
// ============================================================================

fn sqlite_parts(store: &SqliteClientStore) -> ClientbookParts {
    let mut parts = ClientbookParts::new(Arc::new(InMemoryCache::new()), Arc::new(store.clone()));
    parts.metadata = Some(Arc::new(store.clone()));
    parts.structure = Some(Arc::new(store.clone()));
    parts
}

#[tokio::test]
async fn first_session_seeds_defaults_into_sqlite() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);

    let (book, load) = Clientbook::open(sqlite_parts(&store)).await.unwrap();

    assert_eq!(load.origin, SchemaOrigin::Defaults);
    assert!(load.cached);
    assert!(load.seed_report.unwrap().is_complete());
    assert_eq!(store.list_fields().await.unwrap(), book.fields());
    let columns = store.describe_table("clients").await.unwrap();
    assert_eq!(columns.len(), 2 + book.fields().len());
}

#[tokio::test]
async fn later_session_reads_metadata_and_records() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    let (mut book, _) = Clientbook::open(sqlite_parts(&store)).await.unwrap();
    book.add_field(&FieldDraft::new("Partita IVA")).await.unwrap();
    book.create_record(values(&[("ragioneSociale", "Acme"), ("partita_iva", "IT123")]))
        .await
        .unwrap();
    drop(book);

    let reopened = open(&dir);
    let (book, load) = Clientbook::open(sqlite_parts(&reopened)).await.unwrap();

    assert_eq!(load.origin, SchemaOrigin::Metadata);
    assert!(book.schema().field(&FieldKey::new("partita_iva")).is_some());
    assert_eq!(book.records()[0].value(&FieldKey::new("partita_iva")), "IT123");
}
