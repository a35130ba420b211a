// crates/clientbook-cli/tests/telemetry.rs
// ============================================================================
// Module: CLI Telemetry Tests
// Description: Validates log filter selection.
// Purpose: Ensure the environment override wins and bad directives fail.
// Dependencies: clientbook-cli telemetry module, clientbook-config
// ============================================================================

//! ## Overview
//! Checks which filter [`build_filter`] selects for config and override input.

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

use clientbook_cli::telemetry::build_filter;
use clientbook_config::LogLevel;
use clientbook_config::LoggingConfig;
use tracing::level_filters::LevelFilter;

#[test]
fn configured_level_applies_without_override() {
    let config = LoggingConfig {
        level: LogLevel::Debug,
        ..LoggingConfig::default()
    };
    let filter = build_filter(&config, None).unwrap();
    assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    let blank = build_filter(&config, Some("  ")).unwrap();
    assert_eq!(blank.max_level_hint(), Some(LevelFilter::DEBUG));
}

#[test]
fn environment_override_wins() {
    let filter = build_filter(&LoggingConfig::default(), Some("trace")).unwrap();
    assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));
}

#[test]
fn invalid_override_is_rejected() {
    let err = build_filter(&LoggingConfig::default(), Some("clientbook=loud")).unwrap_err();
    assert!(err.contains("CLIENTBOOK_LOG"));
}
