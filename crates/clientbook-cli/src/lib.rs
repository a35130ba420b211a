// crates/clientbook-cli/src/lib.rs
// ============================================================================
// Module: Clientbook CLI Library
// Description: Shared helpers for the clientbook command-line interface.
// Purpose: Provide reusable components for the CLI binary and tests.
// Dependencies: clientbook-core, clientbook-config, tracing-subscriber
// ============================================================================

//! ## Overview
//! This library houses the helpers the binary entry point (`src/main.rs`)
//! builds on: the internationalized message catalog, the CSV codec used by
//! record export and import, and the tracing subscriber setup.

// ============================================================================
// SECTION: Modules
// ============================================================================

/// CSV export and import of client records.
pub mod csv;
/// Internationalization helpers and message catalog.
pub mod i18n;
/// Tracing subscriber installation.
pub mod telemetry;

#[cfg(test)]
mod tests;
