//! Shelter domain model.
//!
//! # Responsibility
//! - Define the canonical animal record persisted in the shelter collection.
//! - Keep "field absent" and "field empty" distinct on the input side.
//!
//! # Invariants
//! - Every stored animal carries a unique `animal_id` and `row`.
//! - Stored documents keep the dashboard display field order.

pub mod animal;

/// Schemaless document shape exchanged with the storage collaborator.
///
/// Backed by `serde_json::Map` with `preserve_order`, so insertion order is
/// the serialization order.
pub type Document = serde_json::Map<String, serde_json::Value>;
