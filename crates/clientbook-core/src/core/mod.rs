// crates/clientbook-core/src/core/mod.rs
// ============================================================================
// Module: Clientbook Core Types
// Description: Field schema and record structures.
// Purpose: Provide stable, serializable types shared by every store and front-end.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Core types define field definitions, the transient field draft used by edit
//! flows, record identifiers, and the flat record shape. Every component that
//! touches record shape iterates the current schema built from these types
//! rather than naming fields directly.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod field;
pub mod identifiers;
pub mod record;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use field::FieldDefinition;
pub use field::FieldDraft;
pub use field::KEY_SEPARATOR;
pub use field::RESERVED_FIELD_KEYS;
pub use field::capitalize_first;
pub use field::default_schema;
pub use field::derive_key;
pub use field::is_reserved_key;
pub use field::primary_field;
pub use field::sort_fields;
pub use identifiers::FieldKey;
pub use identifiers::RecordId;
pub use record::FieldValues;
pub use record::Record;
