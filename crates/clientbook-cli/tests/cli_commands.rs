// crates/clientbook-cli/tests/cli_commands.rs
// ============================================================================
// Module: CLI Command Tests
// Description: Integration tests driving the clientbook binary end to end.
// Purpose: Ensure commands persist through the configured SQLite store.
// Dependencies: clientbook binary, serde_json, tempfile
// ============================================================================
//! ## Overview
//! Runs the `clientbook` binary against a temporary config, SQLite file, and
//! cache directory, one process per command.

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
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;

use serde_json::Value;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn clientbook_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_clientbook"))
}

fn write_config(root: &Path) -> PathBuf {
    let config_path = root.join("clientbook.toml");
    let config = format!(
        "[store]\npath = '{}'\n\n[cache]\npath = '{}'\n",
        root.join("book.db").display(),
        root.join("cache").display()
    );
    fs::write(&config_path, config).expect("write config");
    config_path
}

fn run(config: &Path, args: &[&str]) -> Output {
    Command::new(clientbook_bin())
        .arg("--config")
        .arg(config)
        .args(args)
        .env_remove("CLIENTBOOK_LANG")
        .env_remove("CLIENTBOOK_LOG")
        .output()
        .expect("run clientbook")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn run_json(config: &Path, args: &[&str]) -> Value {
    let mut full = args.to_vec();
    full.push("--json");
    let output = run(config, &full);
    assert!(
        output.status.success(),
        "command {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("json output")
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn config_validate_reports_the_source_file() {
    let root = TempDir::new().unwrap();
    let config = write_config(root.path());
    let output = run(&config, &["config", "validate"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Config is valid"));
    assert!(stdout(&output).contains("clientbook.toml"));
}

#[test]
fn invalid_config_fails_before_touching_the_store() {
    let root = TempDir::new().unwrap();
    let config = root.path().join("clientbook.toml");
    fs::write(&config, "[store]\ntable = \"store_meta\"\n").unwrap();
    let output = run(&config, &["columns", "list"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("store.table is reserved"));
    assert!(!root.path().join("book.db").exists());
}

#[test]
fn clients_round_trip_through_sqlite_and_csv() {
    let root = TempDir::new().unwrap();
    let config = write_config(root.path());

    let added = run(&config, &["columns", "add", "Email"]);
    assert!(added.status.success());
    assert!(stdout(&added).contains("(email)"));

    let zeta = run_json(
        &config,
        &["clients", "add", "--set", "ragioneSociale=Zeta", "--set", "email=z@example.it"],
    );
    let zeta_id = zeta["id"].as_str().unwrap().to_string();
    run_json(&config, &["clients", "add", "--set", "ragioneSociale=alfa", "--set", "citta=Roma"]);

    let listed = run_json(&config, &["clients", "list"]);
    let names: Vec<&str> = listed["records"]
        .as_array()
        .unwrap()
        .iter()
        .map(|record| record["values"]["ragioneSociale"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["alfa", "Zeta"]);

    let filtered = run_json(&config, &["clients", "list", "-q", "ROMA", "--field", "citta"]);
    assert_eq!(filtered["total"], 2);
    assert_eq!(filtered["records"].as_array().unwrap().len(), 1);

    let copy = run_json(&config, &["clients", "duplicate", &zeta_id]);
    assert_eq!(copy["record"]["values"]["ragioneSociale"], "Zeta (Copia)");
    assert_eq!(copy["record"]["values"]["email"], "z@example.it");

    let csv_path = root.path().join("export.csv");
    let exported = run(&config, &["clients", "export", "-o", csv_path.to_str().unwrap()]);
    assert!(exported.status.success());
    let csv = fs::read_to_string(&csv_path).unwrap();
    assert!(csv.starts_with("\"id\",\"ragioneSociale\",\"categoria\""));
    assert!(csv.lines().next().unwrap().ends_with("\"email\""));
    assert_eq!(csv.lines().count(), 4);

    let imported = run_json(&config, &["clients", "import", csv_path.to_str().unwrap()]);
    assert_eq!(imported["count"], 3);
    let listed = run_json(&config, &["clients", "list"]);
    assert_eq!(listed["total"], 6);
}

#[test]
fn column_rename_and_removal_keep_records_consistent() {
    let root = TempDir::new().unwrap();
    let config = write_config(root.path());
    run_json(&config, &["columns", "add", "Note", "--options", "a, b"]);
    run_json(&config, &["clients", "add", "--set", "ragioneSociale=Acme", "--set", "note=a"]);

    let renamed = run_json(&config, &["columns", "edit", "note", "--label", "Note Interne"]);
    assert_eq!(renamed["renamed_from"], "note");
    let listed = run_json(&config, &["clients", "list"]);
    assert_eq!(listed["records"][0]["values"]["note_interne"], "a");

    let removed = run_json(&config, &["columns", "remove", "note_interne", "--clear-values"]);
    assert_eq!(removed["column_dropped"], true);
    let listed = run_json(&config, &["clients", "list"]);
    assert!(listed["records"][0]["values"].get("note_interne").is_none());
}

#[test]
fn errors_are_localized_and_fail_the_process() {
    let root = TempDir::new().unwrap();
    let config = write_config(root.path());

    let missing = run(&config, &["clients", "edit", "nope", "--set", "citta=Roma"]);
    assert!(!missing.status.success());
    assert!(String::from_utf8_lossy(&missing.stderr).contains("Client nope not found."));

    let italian = run(&config, &["columns", "list", "--lang", "it"]);
    assert!(italian.status.success());
    assert!(stdout(&italian).contains("Schema caricato da"));

    let unknown = run(&config, &["clients", "add", "--set", "fax=1", "--lang", "it"]);
    assert!(!unknown.status.success());
    assert!(String::from_utf8_lossy(&unknown.stderr).contains("Colonna sconosciuta 'fax'"));
}

#[test]
fn local_only_edits_keep_values_across_processes() {
    let root = TempDir::new().unwrap();
    let config = write_config(root.path());
    let mut text = fs::read_to_string(&config).unwrap();
    text.push_str("\n[schema]\nsource = \"local_only\"\n");
    fs::write(&config, text).unwrap();

    run_json(&config, &["columns", "add", "Note"]);
    let mut add = vec!["clients", "add", "--set", "ragioneSociale=Acme", "--set", "citta=Roma"];
    add.extend(["--set", "note=vip"]);
    run_json(&config, &add);

    let edited = run_json(&config, &["columns", "edit", "citta", "--options", "Roma, Milano"]);
    assert!(edited["renamed_from"].is_null());
    let filtered = run_json(&config, &["clients", "list", "-q", "roma"]);
    assert_eq!(filtered["records"].as_array().unwrap().len(), 1);

    run_json(&config, &["columns", "edit", "note", "--label", "Note Interne"]);
    let listed = run_json(&config, &["clients", "list", "-q", "vip"]);
    assert_eq!(listed["records"][0]["values"]["note_interne"], "vip");

    let csv_path = root.path().join("multi.csv");
    fs::write(&csv_path, "\"ragioneSociale\",\"note_interne\"\n\"Beta\",\"riga uno\nriga due\"\n")
        .unwrap();
    for _ in 0 .. 2 {
        let imported = run_json(&config, &["clients", "import", csv_path.to_str().unwrap()]);
        assert_eq!(imported["count"], 1);
    }
    let listed = run_json(&config, &["clients", "list", "-q", "riga due"]);
    assert_eq!(listed["records"].as_array().unwrap().len(), 2);
    assert_eq!(listed["total"], 3);
    assert!(!root.path().join("book.db").exists());
}
