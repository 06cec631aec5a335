//! Document collection abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the document-store contract the record manager depends on.
//! - Isolate SQLite/JSON query details from service orchestration.
//!
//! # Invariants
//! - Filters are top-level equality matches; operator keys are rejected.
//! - Collections report write acknowledgment and modified counts.
//! - Reads issued after a write on the same handle observe that write.

pub mod collection;
pub mod sqlite_collection;
