//! Data-access layer for the animal shelter outcome dashboard.
//! This crate owns record synthesis, rescue classification and every write
//! path into the document store.

pub mod age;
pub mod classify;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod validation;

pub use config::ShelterConfig;
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LogLevel};
pub use model::animal::{
    AnimalDraft, AnimalId, AnimalRecord, AnimalValidationError, NewAnimal, RescueType,
};
pub use model::Document;
pub use repo::collection::{DocumentCollection, Projection, RepoError, RepoResult, UpdateSummary};
pub use repo::sqlite_collection::SqliteCollection;
pub use service::credential_service::CredentialService;
pub use service::record_manager::{InsertOutcome, RecordManager, ShelterError, ShelterResult};
pub use validation::{validate_name, IdentifierLookup};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
