// crates/clientbook-cli/src/i18n.rs
// ============================================================================
// Module: CLI Internationalization Helpers
// Description: Provides message catalog and translation utilities for the CLI.
// Purpose: Centralize user-facing strings in English and Italian.
// Dependencies: Standard library collections and formatting utilities.
// ============================================================================

//! ## Overview
//! The clientbook CLI stores user-facing strings in a small translation
//! catalog so every locale renders the same set of messages. All runtime
//! output should be routed through the [`t!`](crate::t) macro.
//!
//! ## Invariants
//! - The catalog is initialized once and read-only thereafter.
//! - Missing keys fall back to English and then to the key itself.
//! - Placeholder substitutions preserve deterministic order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Supported CLI locales.
///
/// # Invariants
/// - [`Locale::En`] is the default fallback locale.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Locale {
    /// English (default).
    En,
    /// Italian.
    It,
}

impl Locale {
    /// Returns the canonical locale label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::It => "it",
        }
    }

    /// Attempts to parse a locale value (case-insensitive, tolerant of region tags).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        let normalized = value.to_ascii_lowercase();
        let lang = normalized.split(['-', '_', '.']).next().unwrap_or("");
        match lang {
            "en" => Some(Self::En),
            "it" => Some(Self::It),
            _ => None,
        }
    }
}

/// Ordered list of supported CLI locales.
pub const SUPPORTED_LOCALES: &[Locale] = &[Locale::En, Locale::It];

/// A formatted message argument captured by the [`macro@crate::t`] macro.
///
/// # Invariants
/// - `key` matches a placeholder name without braces (for example, `path`).
#[derive(Clone)]
pub struct MessageArg {
    /// The placeholder name used in message templates (e.g., `"path"`).
    pub key: &'static str,
    /// The formatted string value to substitute for this placeholder.
    pub value: String,
}

impl MessageArg {
    /// Constructs a new [`MessageArg`] from a key and displayable value.
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

// ============================================================================
// SECTION: Locale Selection
// ============================================================================

/// Global locale selection for CLI output.
static CURRENT_LOCALE: OnceLock<Locale> = OnceLock::new();

/// Sets the CLI locale. Only the first call wins.
pub fn set_locale(locale: Locale) {
    let _ = CURRENT_LOCALE.set(locale);
}

/// Returns the current CLI locale (defaults to English).
#[must_use]
pub fn current_locale() -> Locale {
    CURRENT_LOCALE.get().copied().unwrap_or(Locale::En)
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// English catalog entries.
const CATALOG_EN: &[(&str, &str)] = &[
    ("main.version", "clientbook {version}"),
    ("i18n.lang.invalid_env", "Invalid value for {env}: {value}. Expected 'en' or 'it'."),
    (
        "i18n.disclaimer.machine_translated",
        "Note: non-English output may be machine translated and imprecise.",
    ),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "output"),
    ("output.write_failed", "Failed to write to {stream}: {error}"),
    ("output.file_write_failed", "Failed to write {path}: {error}"),
    ("output.json_failed", "Failed to render JSON output: {error}"),
    ("input.read_failed", "Failed to read {path}: {error}"),
    (
        "input.read_too_large",
        "Refusing to read {path} because it is {size} bytes (limit {limit}).",
    ),
    ("telemetry.init_failed", "Failed to initialize logging: {error}"),
    ("config.load_failed", "Failed to load config: {error}"),
    ("config.validate.ok", "Config is valid ({source})."),
    ("config.source.defaults", "built-in defaults"),
    ("store.open_failed", "Failed to open store at {path}: {error}"),
    ("clientbook.open_failed", "Failed to load the clientbook: {error}"),
    ("schema.loaded", "Schema loaded from {origin} with {count} columns."),
    (
        "schema.seed.partial",
        "Warning: {count} default columns could not be created in the records table.",
    ),
    ("columns.list.empty", "No columns defined."),
    ("columns.list.row", "{order}\t{key}\t{label}\t{options}"),
    ("columns.list.no_options", "-"),
    ("columns.add.ok", "Added column {label} ({key})."),
    ("columns.add.failed", "Failed to add column: {error}"),
    ("columns.edit.ok", "Updated column {key}."),
    ("columns.edit.renamed", "Renamed column {from} to {key}."),
    ("columns.edit.failed", "Failed to update column {key}: {error}"),
    ("columns.edit.unknown", "Column {key} does not exist."),
    ("columns.remove.ok", "Removed column {key}."),
    ("columns.remove.cleared", "Cleared the value from {count} clients."),
    ("columns.remove.dropped", "Dropped the physical column {key}."),
    ("columns.remove.failed", "Failed to remove column {key}: {error}"),
    (
        "columns.sync.ok",
        "Synchronized columns: {added} added, {present} already present, {skipped} reserved.",
    ),
    ("columns.sync.field_failed", "Column {key} could not be created: {error}"),
    ("columns.sync.failed", "Failed to synchronize columns: {error}"),
    ("clients.list.empty", "No clients found."),
    ("clients.list.row", "{id}\t{summary}"),
    ("clients.list.count", "{shown} of {total} clients shown."),
    ("clients.values.invalid", "Invalid assignment '{value}'. Expected key=value."),
    ("clients.values.unknown_field", "Unknown column '{key}'."),
    ("clients.not_found", "Client {id} not found."),
    ("clients.add.ok", "Created client {id}."),
    ("clients.add.failed", "Failed to create client: {error}"),
    ("clients.edit.ok", "Updated client {id}."),
    ("clients.edit.failed", "Failed to update client {id}: {error}"),
    ("clients.delete.ok", "Deleted client {id}."),
    ("clients.delete.failed", "Failed to delete client {id}: {error}"),
    ("clients.duplicate.ok", "Duplicated client {source} as {id}."),
    ("clients.duplicate.failed", "Failed to duplicate client {id}: {error}"),
    ("clients.export.ok", "Exported {count} clients to {path}."),
    ("clients.import.ok", "Imported {count} clients from {path}."),
    ("clients.import.ignored", "Ignored unknown columns: {columns}"),
    ("clients.import.parse_failed", "Invalid CSV in {path}: {error}"),
    (
        "clients.import.failed",
        "Import stopped after {count} clients: {error}",
    ),
];

/// Italian catalog entries.
const CATALOG_IT: &[(&str, &str)] = &[
    ("main.version", "clientbook {version}"),
    ("i18n.lang.invalid_env", "Valore non valido per {env}: {value}. Atteso 'en' o 'it'."),
    (
        "i18n.disclaimer.machine_translated",
        "Nota: l'output non in inglese potrebbe essere tradotto automaticamente e impreciso.",
    ),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "output"),
    ("output.write_failed", "Scrittura su {stream} non riuscita: {error}"),
    ("output.file_write_failed", "Scrittura di {path} non riuscita: {error}"),
    ("output.json_failed", "Impossibile generare l'output JSON: {error}"),
    ("input.read_failed", "Lettura di {path} non riuscita: {error}"),
    (
        "input.read_too_large",
        "Lettura di {path} rifiutata: il file è di {size} byte (limite {limit}).",
    ),
    ("telemetry.init_failed", "Impossibile inizializzare il logging: {error}"),
    ("config.load_failed", "Caricamento della configurazione non riuscito: {error}"),
    ("config.validate.ok", "Configurazione valida ({source})."),
    ("config.source.defaults", "valori predefiniti"),
    ("store.open_failed", "Impossibile aprire l'archivio in {path}: {error}"),
    ("clientbook.open_failed", "Impossibile caricare la rubrica: {error}"),
    ("schema.loaded", "Schema caricato da {origin} con {count} colonne."),
    (
        "schema.seed.partial",
        "Attenzione: {count} colonne predefinite non sono state create nella tabella.",
    ),
    ("columns.list.empty", "Nessuna colonna definita."),
    ("columns.list.row", "{order}\t{key}\t{label}\t{options}"),
    ("columns.list.no_options", "-"),
    ("columns.add.ok", "Colonna {label} ({key}) aggiunta."),
    ("columns.add.failed", "Impossibile aggiungere la colonna: {error}"),
    ("columns.edit.ok", "Colonna {key} aggiornata."),
    ("columns.edit.renamed", "Colonna {from} rinominata in {key}."),
    ("columns.edit.failed", "Impossibile aggiornare la colonna {key}: {error}"),
    ("columns.edit.unknown", "La colonna {key} non esiste."),
    ("columns.remove.ok", "Colonna {key} rimossa."),
    ("columns.remove.cleared", "Valore rimosso da {count} clienti."),
    ("columns.remove.dropped", "Colonna fisica {key} eliminata."),
    ("columns.remove.failed", "Impossibile rimuovere la colonna {key}: {error}"),
    (
        "columns.sync.ok",
        "Colonne sincronizzate: {added} aggiunte, {present} già presenti, {skipped} riservate.",
    ),
    ("columns.sync.field_failed", "Impossibile creare la colonna {key}: {error}"),
    ("columns.sync.failed", "Sincronizzazione delle colonne non riuscita: {error}"),
    ("clients.list.empty", "Nessun cliente trovato."),
    ("clients.list.row", "{id}\t{summary}"),
    ("clients.list.count", "{shown} clienti mostrati su {total}."),
    ("clients.values.invalid", "Assegnazione '{value}' non valida. Atteso chiave=valore."),
    ("clients.values.unknown_field", "Colonna sconosciuta '{key}'."),
    ("clients.not_found", "Cliente {id} non trovato."),
    ("clients.add.ok", "Cliente {id} creato."),
    ("clients.add.failed", "Impossibile creare il cliente: {error}"),
    ("clients.edit.ok", "Cliente {id} aggiornato."),
    ("clients.edit.failed", "Impossibile aggiornare il cliente {id}: {error}"),
    ("clients.delete.ok", "Cliente {id} eliminato."),
    ("clients.delete.failed", "Impossibile eliminare il cliente {id}: {error}"),
    ("clients.duplicate.ok", "Cliente {source} duplicato come {id}."),
    ("clients.duplicate.failed", "Impossibile duplicare il cliente {id}: {error}"),
    ("clients.export.ok", "{count} clienti esportati in {path}."),
    ("clients.import.ok", "{count} clienti importati da {path}."),
    ("clients.import.ignored", "Colonne sconosciute ignorate: {columns}"),
    ("clients.import.parse_failed", "CSV non valido in {path}: {error}"),
    (
        "clients.import.failed",
        "Importazione interrotta dopo {count} clienti: {error}",
    ),
];

/// Returns the raw catalog entries for the requested locale.
pub(crate) const fn catalog_entries_for(locale: Locale) -> &'static [(&'static str, &'static str)] {
    match locale {
        Locale::En => CATALOG_EN,
        Locale::It => CATALOG_IT,
    }
}

/// Returns the message catalog for the requested locale.
pub(crate) fn catalog_for(locale: Locale) -> &'static HashMap<&'static str, &'static str> {
    static CATALOG_EN_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    static CATALOG_IT_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    let map = match locale {
        Locale::En => &CATALOG_EN_MAP,
        Locale::It => &CATALOG_IT_MAP,
    };
    map.get_or_init(|| catalog_entries_for(locale).iter().copied().collect())
}

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Translates `key` using the selected locale while substituting `args`.
#[must_use]
pub fn translate(key: &str, args: Vec<MessageArg>) -> String {
    let locale = current_locale();
    let template = catalog_for(locale)
        .get(key)
        .copied()
        .or_else(|| catalog_for(Locale::En).get(key).copied())
        .unwrap_or(key);
    if args.is_empty() {
        return template.to_string();
    }

    let mut result = template.to_string();
    for arg in args {
        let placeholder = format!("{{{}}}", arg.key);
        result = result.replace(&placeholder, &arg.value);
    }
    result
}

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Formats a localized message from a key and named arguments.
///
/// Named arguments are substituted into `{placeholder}` positions.
#[macro_export]
macro_rules! t {
    ($key:literal $(, $name:ident = $value:expr )* $(,)?) => {{
        let args = ::std::vec![
            $(
                $crate::i18n::MessageArg::new(stringify!($name), $value.to_string()),
            )*
        ];
        $crate::i18n::translate($key, args)
    }};
}
