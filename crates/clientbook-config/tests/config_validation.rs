//! Section validation tests for clientbook-config.
// crates/clientbook-config/tests/config_validation.rs
// =============================================================================
// Module: Config Section Validation Tests
// Description: Validate defaults and per-section constraints.
// Purpose: Ensure every section parses with defaults and fails closed.
// =============================================================================

use std::path::PathBuf;

use clientbook_config::ClientbookConfig;
use clientbook_config::ConfigError;
use clientbook_config::LogFormat;
use clientbook_config::LogLevel;
use clientbook_config::SchemaSourceMode;
use clientbook_config::StoreType;
use clientbook_store_sqlite::SqliteStoreMode;

type TestResult = Result<(), String>;

fn assert_invalid(result: Result<ClientbookConfig, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}

#[test]
fn empty_document_yields_defaults() -> TestResult {
    let config = ClientbookConfig::from_toml("").map_err(|err| err.to_string())?;
    if config.schema.source != SchemaSourceMode::MetadataTable {
        return Err("default schema source should be metadata_table".to_string());
    }
    if config.store.store_type != StoreType::Sqlite || config.store.table != "clients" {
        return Err("default store should be sqlite on clients".to_string());
    }
    if config.store.effective_path() != PathBuf::from("clientbook.db") {
        return Err("default store path should be clientbook.db".to_string());
    }
    if config.records.duplicate_marker != " (Copia)" || config.records.primary_field.is_some() {
        return Err("record defaults mismatch".to_string());
    }
    if config.logging.level != LogLevel::Warn || config.logging.format != LogFormat::Compact {
        return Err("logging defaults mismatch".to_string());
    }
    Ok(())
}

#[test]
fn full_document_parses() -> TestResult {
    let config = ClientbookConfig::from_toml(
        r#"
[schema]
source = "structure"

[store]
type = "sqlite"
path = "data/book.db"
table = "contatti"
busy_timeout_ms = 1000
journal_mode = "delete"
sync_mode = "normal"

[cache]
path = "cache"

[records]
primary_field = "ragioneSociale"
duplicate_marker = " (Copy)"

[logging]
level = "debug"
format = "json"
"#,
    )
    .map_err(|err| err.to_string())?;
    if config.schema.source != SchemaSourceMode::Structure {
        return Err("schema source not parsed".to_string());
    }
    if config.store.journal_mode != SqliteStoreMode::Delete {
        return Err("journal mode not parsed".to_string());
    }
    let sqlite = config.store.sqlite_config();
    if sqlite.table != "contatti" || sqlite.path != PathBuf::from("data/book.db") {
        return Err("sqlite config not derived".to_string());
    }
    if config.logging.format != LogFormat::Json || config.logging.level.as_str() != "debug" {
        return Err("logging not parsed".to_string());
    }
    Ok(())
}

#[test]
fn unknown_schema_source_is_a_parse_error() -> TestResult {
    assert_invalid(
        ClientbookConfig::from_toml("[schema]\nsource = \"remote\"\n"),
        "config parse error",
    )
}

#[test]
fn memory_store_rejects_path() -> TestResult {
    assert_invalid(
        ClientbookConfig::from_toml("[store]\ntype = \"memory\"\npath = \"x.db\"\n"),
        "memory store must not set path",
    )
}

#[test]
fn store_table_must_be_identifier() -> TestResult {
    assert_invalid(
        ClientbookConfig::from_toml("[store]\ntable = \"drop table\"\n"),
        "store.table must be an ascii identifier",
    )?;
    assert_invalid(
        ClientbookConfig::from_toml("[store]\ntable = \"store_meta\"\n"),
        "store.table is reserved",
    )
}

#[test]
fn busy_timeout_is_bounded() -> TestResult {
    assert_invalid(
        ClientbookConfig::from_toml("[store]\nbusy_timeout_ms = 600000\n"),
        "store.busy_timeout_ms must be at most",
    )
}

#[test]
fn primary_field_must_not_be_reserved_or_blank() -> TestResult {
    assert_invalid(
        ClientbookConfig::from_toml("[records]\nprimary_field = \"id\"\n"),
        "reserved key",
    )?;
    assert_invalid(
        ClientbookConfig::from_toml("[records]\nprimary_field = \"  \"\n"),
        "records.primary_field must be a non-empty field key",
    )?;
    assert_invalid(
        ClientbookConfig::from_toml("[records]\nprimary_field = \"a b\"\n"),
        "must not contain whitespace",
    )
}

#[test]
fn duplicate_marker_must_be_non_empty() -> TestResult {
    assert_invalid(
        ClientbookConfig::from_toml("[records]\nduplicate_marker = \"\"\n"),
        "records.duplicate_marker must be non-empty",
    )
}

#[test]
fn cache_path_must_be_non_empty() -> TestResult {
    assert_invalid(
        ClientbookConfig::from_toml("[cache]\npath = \"  \"\n"),
        "cache.path must be non-empty",
    )
}
