// crates/clientbook-core/tests/clientbook.rs
// ============================================================================
// Module: Clientbook Facade Tests
// Description: Validate cross-store flows of the session facade.
// Purpose: Ensure orphan policies, duplication, and record reloads compose.
// Dependencies: clientbook-core, tempfile, tokio
// ============================================================================

//! ## Overview
//! End-to-end flows through [`Clientbook`] for the no-backend variant (file
//! cache plus cache-backed records) and the structural variant (in-memory
//! remote).

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

use std::sync::Arc;

use clientbook_core::Clientbook;
use clientbook_core::ClientbookParts;
use clientbook_core::FieldDraft;
use clientbook_core::FieldKey;
use clientbook_core::FieldValues;
use clientbook_core::FileCache;
use clientbook_core::InMemoryCache;
use clientbook_core::InMemoryRemote;
use clientbook_core::LocalRecordBackend;
use clientbook_core::OrphanPolicy;
use clientbook_core::RecordId;
use clientbook_core::SchemaOrigin;
use clientbook_core::SearchState;
use clientbook_core::StoreError;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn values(pairs: &[(&str, &str)]) -> FieldValues {
    pairs.iter().map(|(key, value)| (FieldKey::new(*key), (*value).to_string())).collect()
}

fn local_parts(dir: &TempDir) -> ClientbookParts {
    let cache = Arc::new(FileCache::new(dir.path().join("cache")));
    let records = Arc::new(LocalRecordBackend::new(cache.clone()));
    ClientbookParts::new(cache, records)
}

fn structural_parts(remote: &InMemoryRemote) -> ClientbookParts {
    let mut parts = ClientbookParts::new(Arc::new(InMemoryCache::new()), Arc::new(remote.clone()));
    parts.structure = Some(Arc::new(remote.clone()));
    parts
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[tokio::test]
async fn local_session_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let (mut book, load) = Clientbook::open(local_parts(&dir)).await.unwrap();
    assert_eq!(load.origin, SchemaOrigin::Defaults);
    assert!(load.cached);
    book.add_field(&FieldDraft::new("Email")).await.unwrap();
    book.create_record(values(&[("ragioneSociale", "Zeta"), ("email", "z@x.it")])).await.unwrap();
    book.create_record(values(&[("ragioneSociale", "alfa")])).await.unwrap();

    let (reopened, load) = Clientbook::open(local_parts(&dir)).await.unwrap();

    assert_eq!(load.origin, SchemaOrigin::Cache);
    assert_eq!(reopened.fields().len(), 8);
    let names: Vec<&str> = reopened
        .records()
        .iter()
        .map(|record| record.value(&FieldKey::new("ragioneSociale")))
        .collect();
    assert_eq!(names, vec!["alfa", "Zeta"]);
}

#[tokio::test]
async fn search_runs_against_loaded_records() {
    let dir = TempDir::new().unwrap();
    let (mut book, _) = Clientbook::open(local_parts(&dir)).await.unwrap();
    book.create_record(values(&[("ragioneSociale", "Acme"), ("citta", "Roma")])).await.unwrap();
    book.create_record(values(&[("ragioneSociale", "Beta"), ("citta", "Milano")])).await.unwrap();
    let mut state = SearchState::new();
    state.set_query("mil");

    let visible = book.search(&state);

    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].value(&FieldKey::new("ragioneSociale")), "Beta");
}

#[tokio::test]
async fn duplicate_record_appends_marker_to_primary_field() {
    let dir = TempDir::new().unwrap();
    let (mut book, _) = Clientbook::open(local_parts(&dir)).await.unwrap();
    let source =
        book.create_record(values(&[("ragioneSociale", "Acme"), ("citta", "Roma")])).await.unwrap();

    let copy = book.duplicate_record(&source.id).await.unwrap();

    assert_ne!(copy.id, source.id);
    assert_eq!(copy.value(&FieldKey::new("ragioneSociale")), "Acme (Copia)");
    assert_eq!(copy.value(&FieldKey::new("citta")), "Roma");
    assert_eq!(book.records().len(), 2);
    let missing = book.duplicate_record(&RecordId::new("nope")).await;
    assert!(matches!(missing, Err(StoreError::NotFound(_))));
}

#[tokio::test]
async fn primary_field_override_drives_sorting() {
    let dir = TempDir::new().unwrap();
    let mut parts = local_parts(&dir);
    parts.primary_field = Some(FieldKey::new("citta"));
    let (mut book, _) = Clientbook::open(parts).await.unwrap();
    book.create_record(values(&[("ragioneSociale", "A"), ("citta", "Torino")])).await.unwrap();
    book.create_record(values(&[("ragioneSociale", "B"), ("citta", "Bari")])).await.unwrap();

    let cities: Vec<&str> =
        book.records().iter().map(|record| record.value(&FieldKey::new("citta"))).collect();

    assert_eq!(cities, vec!["Bari", "Torino"]);
    assert_eq!(book.primary_key(), Some(FieldKey::new("citta")));
}

#[tokio::test]
async fn remove_field_retain_keeps_values() {
    let dir = TempDir::new().unwrap();
    let (mut book, _) = Clientbook::open(local_parts(&dir)).await.unwrap();
    book.create_record(values(&[("ragioneSociale", "A"), ("cellulare", "333")])).await.unwrap();

    let (_, cleared) =
        book.remove_field(&FieldKey::new("cellulare"), OrphanPolicy::Retain).await.unwrap();

    assert_eq!(cleared, 0);
    assert_eq!(book.records()[0].value(&FieldKey::new("cellulare")), "333");
}

#[tokio::test]
async fn remove_field_clear_rewrites_records_without_structure() {
    let dir = TempDir::new().unwrap();
    let (mut book, _) = Clientbook::open(local_parts(&dir)).await.unwrap();
    book.create_record(values(&[("ragioneSociale", "A"), ("cellulare", "333")])).await.unwrap();
    book.create_record(values(&[("ragioneSociale", "B")])).await.unwrap();

    let (removal, cleared) =
        book.remove_field(&FieldKey::new("cellulare"), OrphanPolicy::Clear).await.unwrap();

    assert!(!removal.column_dropped);
    assert_eq!(cleared, 1);
    assert!(book.records().iter().all(|record| !record.has_value(&FieldKey::new("cellulare"))));
}

#[tokio::test]
async fn remove_field_clear_drops_structural_column() {
    let remote = InMemoryRemote::with_table("clients", &["ragioneSociale", "note"]);
    let (mut book, load) = Clientbook::open(structural_parts(&remote)).await.unwrap();
    assert_eq!(load.origin, SchemaOrigin::Structure);
    book.create_record(values(&[("ragioneSociale", "A"), ("note", "x")])).await.unwrap();

    let (removal, cleared) =
        book.remove_field(&FieldKey::new("note"), OrphanPolicy::Clear).await.unwrap();

    assert!(removal.column_dropped);
    assert_eq!(cleared, 0);
    assert!(!book.records()[0].has_value(&FieldKey::new("note")));
}

#[tokio::test]
async fn rename_reloads_records_under_new_key() {
    let remote = InMemoryRemote::with_table("clients", &["ragioneSociale", "note"]);
    let (mut book, _) = Clientbook::open(structural_parts(&remote)).await.unwrap();
    book.create_record(values(&[("ragioneSociale", "A"), ("note", "x")])).await.unwrap();

    book.update_field(&FieldKey::new("note"), &FieldDraft::new("Note Interne")).await.unwrap();

    assert_eq!(book.records()[0].value(&FieldKey::new("note_interne")), "x");
}

#[tokio::test]
async fn local_rename_moves_values_to_new_key() {
    let dir = TempDir::new().unwrap();
    let (mut book, _) = Clientbook::open(local_parts(&dir)).await.unwrap();
    book.add_field(&FieldDraft::new("Note")).await.unwrap();
    book.create_record(values(&[("ragioneSociale", "A"), ("note", "vip")])).await.unwrap();

    let update =
        book.update_field(&FieldKey::new("note"), &FieldDraft::new("Note Interne")).await.unwrap();

    assert_eq!(update.renamed_from, Some(FieldKey::new("note")));
    let record = &book.records()[0];
    assert_eq!(record.value(&FieldKey::new("note_interne")), "vip");
    assert!(!record.values.contains_key(&FieldKey::new("note")));
    let mut state = SearchState::new();
    state.set_query("vip");
    assert_eq!(book.search(&state).len(), 1);

    let (reopened, _) = Clientbook::open(local_parts(&dir)).await.unwrap();
    assert_eq!(reopened.records()[0].value(&FieldKey::new("note_interne")), "vip");
}

#[tokio::test]
async fn editing_options_of_default_field_keeps_values_searchable() {
    let dir = TempDir::new().unwrap();
    let (mut book, _) = Clientbook::open(local_parts(&dir)).await.unwrap();
    book.create_record(values(&[("ragioneSociale", "A"), ("citta", "Roma")])).await.unwrap();
    let citta = FieldKey::new("citta");
    let draft = FieldDraft::from_field(book.schema().field(&citta).unwrap())
        .with_options(vec!["Roma".to_string(), "Milano".to_string()]);

    let update = book.update_field(&citta, &draft).await.unwrap();

    assert!(update.renamed_from.is_none());
    assert_eq!(update.field.key, citta);
    let mut state = SearchState::new();
    state.set_query("roma");
    assert_eq!(book.search(&state).len(), 1);
}

#[tokio::test]
async fn reopened_session_never_reissues_stored_ids() {
    let dir = TempDir::new().unwrap();
    let (mut book, _) = Clientbook::open(local_parts(&dir)).await.unwrap();
    for index in 0 .. 50 {
        let name = format!("R{index}");
        book.create_record(values(&[("ragioneSociale", name.as_str())])).await.unwrap();
    }
    drop(book);

    let (mut reopened, _) = Clientbook::open(local_parts(&dir)).await.unwrap();
    reopened.create_record(values(&[("ragioneSociale", "Nuovo")])).await.unwrap();

    assert_eq!(reopened.records().len(), 51);
}
