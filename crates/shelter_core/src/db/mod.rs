//! Shelter store bootstrap: connection setup and the `documents` schema.
//!
//! # Responsibility
//! - Open the SQLite file (or an in-memory store) that holds every collection.
//! - Bring the `documents` schema up to the version this build understands.
//! - Report which bootstrap stage failed, with a stable error code for logs.
//!
//! # Invariants
//! - Schema version lives in `PRAGMA user_version`.
//! - No collection handle is built on a connection whose bootstrap failed.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Store failure, tagged with the bootstrap stage it came from.
#[derive(Debug)]
pub enum DbError {
    /// The store at `target` (a file path or `:memory:`) could not be opened.
    Open {
        target: String,
        source: rusqlite::Error,
    },
    /// A connection setting could not be applied.
    Configure {
        setting: &'static str,
        source: rusqlite::Error,
    },
    /// A schema migration failed and was rolled back.
    Migration {
        version: u32,
        name: &'static str,
        source: rusqlite::Error,
    },
    /// The store was written by a newer build.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// Statement failure outside bootstrap.
    Sqlite(rusqlite::Error),
}

impl DbError {
    /// Stable identifier used as `error_code=` in log events.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Open { .. } => "store_open_failed",
            Self::Configure { .. } => "store_configure_failed",
            Self::Migration { .. } => "store_migration_failed",
            Self::UnsupportedSchemaVersion { .. } => "store_schema_too_new",
            Self::Sqlite(_) => "store_statement_failed",
        }
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open { target, source } => {
                write!(f, "cannot open shelter store `{target}`: {source}")
            }
            Self::Configure { setting, source } => {
                write!(f, "cannot apply store setting `{setting}`: {source}")
            }
            Self::Migration {
                version,
                name,
                source,
            } => write!(f, "schema migration {version} ({name}) failed: {source}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "shelter schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::Sqlite(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Open { source, .. }
            | Self::Configure { source, .. }
            | Self::Migration { source, .. } => Some(source),
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

#[cfg(test)]
mod tests {
    use super::DbError;
    use std::error::Error;

    #[test]
    fn stage_errors_keep_context_and_source() {
        let err = DbError::Migration {
            version: 1,
            name: "documents",
            source: rusqlite::Error::InvalidQuery,
        };
        assert_eq!(err.error_code(), "store_migration_failed");
        assert!(err.to_string().starts_with("schema migration 1 (documents) failed"));
        assert!(err.source().is_some());
    }

    #[test]
    fn schema_version_error_has_no_source() {
        let err = DbError::UnsupportedSchemaVersion {
            db_version: 9,
            latest_supported: 1,
        };
        assert_eq!(err.error_code(), "store_schema_too_new");
        assert!(err.source().is_none());
    }
}
