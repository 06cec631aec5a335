//! Document collection contract.
//!
//! # Responsibility
//! - Describe the storage collaborator as a small `$set`-style document API.
//! - Own repository error types shared by every implementation.
//!
//! # Invariants
//! - `insert_sequenced` reads sequence maxima and inserts under one write lock.
//! - `update_*` counts a document as modified only when its body changed.
//! - Projections are applied after filtering and never reach storage.

use crate::db::DbError;
use crate::model::Document;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for collection queries and mutations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Filter or `$set` payload uses a shape the collection cannot express.
    UnsupportedQuery(String),
    /// Stored body could not be decoded as a document.
    InvalidData(String),
    Serialization(serde_json::Error),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UnsupportedQuery(message) => write!(f, "unsupported query: {message}"),
            Self::InvalidData(message) => write!(f, "invalid stored document: {message}"),
            Self::Serialization(err) => write!(f, "document serialization failed: {err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serialization(err) => Some(err),
            Self::UnsupportedQuery(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

/// Field projection applied to read results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// Return documents unchanged.
    All,
    /// Strip the listed top-level fields.
    Exclude(&'static [&'static str]),
    /// Keep only the listed top-level fields, in stored order.
    Include(&'static [&'static str]),
}

impl Projection {
    pub fn apply(self, mut document: Document) -> Document {
        match self {
            Self::All => document,
            Self::Exclude(excluded) => {
                document.retain(|key, _| !excluded.iter().any(|field| *field == key.as_str()));
                document
            }
            Self::Include(included) => {
                document.retain(|key, _| included.iter().any(|field| *field == key.as_str()));
                document
            }
        }
    }
}

/// Match and modification counts for one `$set` write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    pub matched: u64,
    pub modified: u64,
}

/// Fields that carry sequence identity on inserted documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceFields<'a> {
    /// Integer counter field, e.g. `row`.
    pub counter_field: &'a str,
    /// Prefixed identifier field, e.g. `animal_id`.
    pub id_field: &'a str,
    /// Identifier prefix followed by decimal digits, e.g. `A`.
    pub id_prefix: &'a str,
}

/// Next free sequence values, one above the current maxima.
///
/// Both start at 1 in an empty collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatedSequence {
    pub counter: i64,
    pub id_number: u64,
}

/// Storage collaborator for schemaless documents.
pub trait DocumentCollection {
    /// Collection name inside the backing store.
    fn name(&self) -> &str;

    /// Inserts one complete document. Returns the write acknowledgment.
    fn insert_one(&self, document: &Document) -> RepoResult<bool>;

    /// Allocates the next sequence values and inserts the document `build`
    /// produces for them, without letting another writer interleave.
    ///
    /// Fails with `InvalidData` when a current maximum has no successor.
    fn insert_sequenced(
        &self,
        sequence: &SequenceFields<'_>,
        build: &mut dyn FnMut(AllocatedSequence) -> RepoResult<Document>,
    ) -> RepoResult<bool>;

    /// Returns all documents matching `filter` in insertion order.
    fn find(&self, filter: &Document, projection: Projection) -> RepoResult<Vec<Document>>;

    /// Returns the first document matching `filter`.
    fn find_one(&self, filter: &Document, projection: Projection) -> RepoResult<Option<Document>>;

    /// Applies `set` to the first document matching `filter`.
    fn update_one(&self, filter: &Document, set: &Document) -> RepoResult<UpdateSummary>;

    /// Applies `set` to every document matching `filter`.
    fn update_many(&self, filter: &Document, set: &Document) -> RepoResult<UpdateSummary>;

    /// Deletes the first document matching `filter`. Returns the count deleted.
    fn delete_one(&self, filter: &Document) -> RepoResult<u64>;

    /// Deletes every document matching `filter`. Returns the count deleted.
    fn delete_many(&self, filter: &Document) -> RepoResult<u64>;
}
