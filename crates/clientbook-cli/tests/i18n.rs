// crates/clientbook-cli/tests/i18n.rs
// ============================================================================
// Module: CLI i18n Tests
// Description: Exercises the translation catalog and placeholder substitution.
// Purpose: Ensure CLI user-facing strings route through stable i18n helpers.
// Dependencies: clientbook-cli i18n module and the `t!` macro.
// ============================================================================

//! ## Overview
//! Validates the public i18n surface: message arguments, key fallback, and
//! the [`t!`](clientbook_cli::t) macro.

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

use clientbook_cli::i18n::MessageArg;
use clientbook_cli::i18n::translate;
use clientbook_cli::t;

// ============================================================================
// SECTION: Tests
// ============================================================================

/// Confirms catalog entries resolve and replace placeholders.
#[test]
fn translate_substitutes_placeholders() {
    let args = vec![MessageArg::new("label", "Email"), MessageArg::new("key", "email")];
    assert_eq!(translate("columns.add.ok", args), "Added column Email (email).");
}

/// Confirms missing keys fall back to the key string.
#[test]
fn translate_falls_back_to_key() {
    assert_eq!(translate("missing.key", Vec::new()), "missing.key");
}

/// Confirms the t! macro formats named arguments of any displayable type.
#[test]
fn t_macro_formats_message() {
    let rendered = t!("clients.list.count", shown = 2, total = 5_usize);
    assert_eq!(rendered, "2 of 5 clients shown.");
}
