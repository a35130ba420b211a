// crates/clientbook-config/src/lib.rs
// ============================================================================
// Module: Clientbook Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for clientbook.toml semantics.
// Dependencies: clientbook-core, clientbook-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `clientbook-config` defines the configuration model for the clientbook
//! CLI: where the schema is read from, which store backs records and field
//! metadata, where the local cache lives, record defaults, and logging.
//! Validation is strict and fail-closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
