//! Animal record use-case service.
//!
//! # Responsibility
//! - Accept dashboard payloads and reject non-object input up front.
//! - Enrich new records (sequence identity, ages, rescue classification).
//! - Keep derived fields consistent across update cascades.
//!
//! # Invariants
//! - `row` and `animal_id` are allocated under the collection's write lock.
//! - Every write that can change classification inputs of a dog is followed
//!   by a fresh `rescue_type` write; tags are replaced, never merged.
//! - `update` reports the modified count of the primary write only.
//! - Reclassification re-reads after writing, so the collection must offer
//!   read-after-write consistency.

use crate::age::{self, AgeUponOutcome};
use crate::classify::{self, RescueProfile};
use crate::model::animal::{fields, AnimalId, AnimalValidationError, NewAnimal, ANIMAL_ID_PREFIX};
use crate::model::Document;
use crate::repo::collection::{
    AllocatedSequence, DocumentCollection, Projection, RepoError, RepoResult, SequenceFields,
};
use crate::validation::{self, IdentifierLookup};
use chrono::{Local, NaiveDateTime};
use log::{error, info, warn};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Fields never returned by `find`.
pub const DASHBOARD_EXCLUDED_FIELDS: &[&str] = &["_id", "datetime", "monthyear", "rescue_type"];

const DASHBOARD_PROJECTION: Projection = Projection::Exclude(DASHBOARD_EXCLUDED_FIELDS);
const ANIMAL_SEQUENCE: SequenceFields<'static> = SequenceFields {
    counter_field: fields::ROW,
    id_field: fields::ANIMAL_ID,
    id_prefix: ANIMAL_ID_PREFIX,
};

pub type ShelterResult<T> = Result<T, ShelterError>;

/// Service error for record manager operations.
#[derive(Debug)]
pub enum ShelterError {
    /// An argument that must be a JSON object (or array) was something else.
    InvalidInputFormat {
        operation: &'static str,
        argument: &'static str,
        expected: &'static str,
    },
    /// A recognized field failed type or date validation.
    Validation(AnimalValidationError),
    /// Collection-level failure.
    Repo(RepoError),
}

impl Display for ShelterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInputFormat {
                operation,
                argument,
                expected,
            } => write!(
                f,
                "invalid data format: `{argument}` of {operation} must be {expected}"
            ),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ShelterError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidInputFormat { .. } => None,
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<AnimalValidationError> for ShelterError {
    fn from(value: AnimalValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ShelterError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Result of `insert`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The store acknowledged the new record.
    Inserted(AnimalId),
    /// The store did not acknowledge the write.
    NotAcknowledged,
}

impl InsertOutcome {
    pub fn animal_id(&self) -> Option<AnimalId> {
        match self {
            Self::Inserted(animal_id) => Some(*animal_id),
            Self::NotAcknowledged => None,
        }
    }

    /// Dashboard confirmation text.
    pub fn message(&self) -> String {
        match self {
            Self::Inserted(animal_id) => format!("New animal inserted with ID - {animal_id}"),
            Self::NotAcknowledged => "ERROR - animal not added".to_string(),
        }
    }
}

/// Record manager over one animal collection.
pub struct RecordManager<C: DocumentCollection> {
    collection: C,
}

impl<C: DocumentCollection> RecordManager<C> {
    /// Creates a manager over the provided collection handle.
    pub fn new(collection: C) -> Self {
        Self { collection }
    }

    pub fn collection(&self) -> &C {
        &self.collection
    }

    /// Inserts a dashboard record using the local clock.
    pub fn insert(&self, fields: &Value) -> ShelterResult<InsertOutcome> {
        self.insert_at(fields, Local::now().naive_local())
    }

    /// Synthesizes and inserts a complete record as of `now`.
    ///
    /// # Contract
    /// - `fields` must be a JSON object; unrecognized keys are dropped.
    /// - `row` and `animal_id` are one above the current collection maxima.
    /// - Dogs are classified before the write.
    ///
    /// # Errors
    /// - `InvalidInputFormat` for non-object input.
    /// - `Validation` for mistyped fields or an unusable `date_of_birth`.
    pub fn insert_at(&self, fields: &Value, now: NaiveDateTime) -> ShelterResult<InsertOutcome> {
        let started_at = Instant::now();
        let input = expect_object("insert", "fields", fields)?;
        let draft = NewAnimal::from_document(input)?.draft(now)?;

        let mut assigned = None;
        let mut build = |next: AllocatedSequence| -> RepoResult<Document> {
            let record = draft
                .clone()
                .into_record(next.counter, AnimalId::new(next.id_number));
            let record = classify::classify_if_dog(record);
            assigned = Some(record.animal_id);
            Ok(record.into_document()?)
        };
        let acknowledged = self
            .collection
            .insert_sequenced(&ANIMAL_SEQUENCE, &mut build)
            .map_err(|err| {
                error!(
                    "event=animal_insert module=service status=error duration_ms={} error={err}",
                    started_at.elapsed().as_millis()
                );
                err
            })?;

        match assigned.filter(|_| acknowledged) {
            Some(animal_id) => {
                info!(
                    "event=animal_insert module=service status=ok animal_id={animal_id} duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(InsertOutcome::Inserted(animal_id))
            }
            None => {
                warn!(
                    "event=animal_insert module=service status=not_acknowledged collection={}",
                    self.collection.name()
                );
                Ok(InsertOutcome::NotAcknowledged)
            }
        }
    }

    /// Inserts an already complete document without enrichment.
    ///
    /// Used by backup restore; returns the store acknowledgment.
    pub fn insert_backup(&self, document: &Value) -> ShelterResult<bool> {
        let document = expect_object("insert_backup", "document", document)?;
        Ok(self.collection.insert_one(document)?)
    }

    /// Restores a JSON array of complete documents.
    ///
    /// Every element is format-checked before the first write. Returns the
    /// number of acknowledged inserts.
    pub fn restore_backup(&self, documents: &Value) -> ShelterResult<usize> {
        let started_at = Instant::now();
        let items = documents
            .as_array()
            .ok_or(ShelterError::InvalidInputFormat {
                operation: "restore_backup",
                argument: "documents",
                expected: "a JSON array of objects",
            })?;
        let documents = items
            .iter()
            .map(|item| expect_object("restore_backup", "documents[]", item))
            .collect::<ShelterResult<Vec<_>>>()?;

        let mut acknowledged = 0;
        for document in documents {
            if self.collection.insert_one(document)? {
                acknowledged += 1;
            }
        }

        info!(
            "event=backup_restore module=service status=ok submitted={} acknowledged={acknowledged} duration_ms={}",
            items.len(),
            started_at.elapsed().as_millis()
        );
        Ok(acknowledged)
    }

    /// Returns matching records in insertion order.
    ///
    /// `DASHBOARD_EXCLUDED_FIELDS` are stripped and cannot be read back
    /// through this call.
    pub fn find(&self, filter: &Value) -> ShelterResult<Vec<Document>> {
        let filter = expect_object("find", "filter", filter)?;
        Ok(self.collection.find(filter, DASHBOARD_PROJECTION)?)
    }

    /// Updates records using the local clock for age recomputation.
    pub fn update(&self, filter: &Value, new_values: &Value) -> ShelterResult<u64> {
        self.update_at(filter, new_values, Local::now().naive_local())
    }

    /// Applies `new_values` as a `$set` and reclassifies affected dogs.
    ///
    /// # Contract
    /// - A `date_of_birth` in `new_values` recomputes both age fields into the
    ///   same write.
    /// - `animal_id` in `new_values`, else in `filter`, selects a single-record
    ///   update; otherwise every match is updated.
    /// - Returns the primary write's modified count; corrective `rescue_type`
    ///   writes are not counted.
    ///
    /// # Errors
    /// - `InvalidInputFormat` for non-object arguments.
    /// - `Repo` when either the primary or a corrective write fails. A failed
    ///   corrective write leaves the primary write in place.
    pub fn update_at(
        &self,
        filter: &Value,
        new_values: &Value,
        now: NaiveDateTime,
    ) -> ShelterResult<u64> {
        let started_at = Instant::now();
        let filter = expect_object("update", "filter", filter)?;
        let mut values = expect_object("update", "new_values", new_values)?.clone();

        if let Some(raw) = values.get(fields::DATE_OF_BIRTH).cloned() {
            let age = derive_age(&raw, now)?;
            values.insert(
                fields::AGE_UPON_OUTCOME.to_string(),
                Value::String(age.label),
            );
            values.insert(
                fields::AGE_UPON_OUTCOME_IN_WEEKS.to_string(),
                Value::from(age.weeks),
            );
        }

        let single_target = values
            .get(fields::ANIMAL_ID)
            .or_else(|| filter.get(fields::ANIMAL_ID))
            .cloned();

        let summary = match &single_target {
            Some(_) => self.collection.update_one(filter, &values)?,
            None => self.collection.update_many(filter, &values)?,
        };

        let reclassified = match &single_target {
            Some(animal_id) => self.reclassify_by_id(animal_id),
            None => self.reclassify_matching(&values),
        };
        if let Err(err) = reclassified {
            error!(
                "event=animal_update module=service status=error stage=reclassify modified={} error={err}",
                summary.modified
            );
            return Err(err);
        }

        info!(
            "event=animal_update module=service status=ok mode={} matched={} modified={} duration_ms={}",
            if single_target.is_some() { "single" } else { "bulk" },
            summary.matched,
            summary.modified,
            started_at.elapsed().as_millis()
        );
        Ok(summary.modified)
    }

    /// Deletes the first match, or every match when `many` is set.
    pub fn delete(&self, filter: &Value, many: bool) -> ShelterResult<u64> {
        let filter = expect_object("delete", "filter", filter)?;
        let deleted = if many {
            self.collection.delete_many(filter)?
        } else {
            self.collection.delete_one(filter)?
        };
        info!("event=animal_delete module=service status=ok many={many} deleted={deleted}");
        Ok(deleted)
    }

    /// Looks up an animal identifier, keeping storage failures visible.
    pub fn check_identifier(&self, animal_id: &str) -> IdentifierLookup {
        let filter = id_filter(Value::String(animal_id.to_string()));
        match self
            .collection
            .find_one(&filter, Projection::Include(&[fields::ANIMAL_ID]))
        {
            Ok(Some(_)) => IdentifierLookup::Found,
            Ok(None) => IdentifierLookup::NotFound,
            Err(err) => {
                warn!("event=animal_lookup module=service status=error error={err}");
                IdentifierLookup::LookupFailed(err.to_string())
            }
        }
    }

    /// Dashboard boolean form of `check_identifier`.
    ///
    /// Lookup failures read as "does not exist".
    pub fn identifier_exists(&self, animal_id: &str) -> bool {
        self.check_identifier(animal_id).exists()
    }

    /// Validates a dashboard name. See `validation::validate_name`.
    pub fn validate_name(name: &str) -> bool {
        validation::validate_name(name)
    }

    fn reclassify_by_id(&self, animal_id: &Value) -> ShelterResult<()> {
        let filter = id_filter(animal_id.clone());
        match self.collection.find_one(&filter, Projection::All)? {
            Some(document) => self.write_rescue_type(&filter, &document),
            None => {
                warn!("event=animal_reclassify module=service status=skipped reason=not_found");
                Ok(())
            }
        }
    }

    fn reclassify_matching(&self, values: &Document) -> ShelterResult<()> {
        for document in self.collection.find(values, Projection::All)? {
            if !classify::document_is_dog(&document) {
                continue;
            }
            let Some(animal_id) = document.get(fields::ANIMAL_ID).cloned() else {
                warn!("event=animal_reclassify module=service status=skipped reason=missing_animal_id");
                continue;
            };
            self.write_rescue_type(&id_filter(animal_id), &document)?;
        }
        Ok(())
    }

    fn write_rescue_type(&self, filter: &Document, document: &Document) -> ShelterResult<()> {
        if !classify::document_is_dog(document) {
            return Ok(());
        }

        let types = classify::rescue_types(&RescueProfile::from_document(document));
        let mut set = Document::new();
        set.insert(
            fields::RESCUE_TYPE.to_string(),
            serde_json::to_value(types).map_err(RepoError::from)?,
        );
        self.collection.update_one(filter, &set)?;
        Ok(())
    }
}

fn expect_object<'a>(
    operation: &'static str,
    argument: &'static str,
    value: &'a Value,
) -> ShelterResult<&'a Document> {
    value.as_object().ok_or_else(|| {
        warn!("event=input_rejected module=service status=error operation={operation} argument={argument}");
        ShelterError::InvalidInputFormat {
            operation,
            argument,
            expected: "a JSON object",
        }
    })
}

fn id_filter(animal_id: Value) -> Document {
    let mut filter = Document::new();
    filter.insert(fields::ANIMAL_ID.to_string(), animal_id);
    filter
}

/// Ages for an updated `date_of_birth`; an empty value clears them.
fn derive_age(raw: &Value, now: NaiveDateTime) -> ShelterResult<AgeUponOutcome> {
    let Value::String(raw) = raw else {
        return Err(AnimalValidationError::WrongType {
            field: fields::DATE_OF_BIRTH,
            expected: "a string",
        }
        .into());
    };
    if raw.trim().is_empty() {
        return Ok(AgeUponOutcome::unknown());
    }
    let date_of_birth = age::parse_date_of_birth(raw)?;
    Ok(age::age_upon_outcome(date_of_birth, now)?)
}
