//! Rescue-type classification rules.
//!
//! # Responsibility
//! - Decide which rescue-training categories a dog qualifies for.
//! - Keep the rule table in one place for every write path.
//!
//! # Invariants
//! - A category matches only when breed, sex and age bound all hold.
//! - Classification replaces `rescue_type`; it never merges with prior tags.
//! - Output order follows `RESCUE_RULES`, so repeated runs are identical.

use crate::model::animal::{fields, AnimalDraft, AnimalRecord, RescueType, DOG};
use crate::model::Document;
use serde_json::Value;

/// One row of the rescue eligibility table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RescueRule {
    pub category: RescueType,
    pub breeds: &'static [&'static str],
    pub sex_upon_outcome: &'static str,
    pub max_age_in_weeks: f64,
}

impl RescueRule {
    /// Returns whether all three predicates hold for `profile`.
    pub fn matches(&self, profile: &RescueProfile<'_>) -> bool {
        let within_age = profile
            .age_in_weeks
            .is_some_and(|weeks| weeks <= self.max_age_in_weeks);
        within_age
            && profile.sex_upon_outcome == self.sex_upon_outcome
            && self.breeds.iter().any(|breed| *breed == profile.breed)
    }
}

pub const RESCUE_RULES: [RescueRule; 3] = [
    RescueRule {
        category: RescueType::Water,
        breeds: &["Chesa Bay Retr Mix", "Labrador Retriever Mix", "Newfoundland"],
        sex_upon_outcome: "Intact Female",
        max_age_in_weeks: 156.0,
    },
    RescueRule {
        category: RescueType::MountainWilderness,
        breeds: &[
            "German Shepherd",
            "Alaskan Malamute",
            "Old English Sheepdog",
            "Siberian Husky",
            "Rottweiler",
        ],
        sex_upon_outcome: "Intact Male",
        max_age_in_weeks: 156.0,
    },
    RescueRule {
        category: RescueType::DisasterTracking,
        breeds: &[
            "Doberman Pinsch",
            "German Shepherd",
            "Golden Retriever",
            "Bloodhound",
            "Rottweiler",
        ],
        sex_upon_outcome: "Intact Male",
        max_age_in_weeks: 300.0,
    },
];

/// Fields that drive classification, borrowed from a record or document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RescueProfile<'a> {
    pub breed: &'a str,
    pub sex_upon_outcome: &'a str,
    /// `None` when the stored value is missing or not a number.
    pub age_in_weeks: Option<f64>,
}

impl<'a> RescueProfile<'a> {
    pub fn from_record(record: &'a AnimalRecord) -> Self {
        Self {
            breed: record.breed.as_str(),
            sex_upon_outcome: record.sex_upon_outcome.as_str(),
            age_in_weeks: Some(record.age_upon_outcome_in_weeks),
        }
    }

    pub fn from_draft(draft: &'a AnimalDraft) -> Self {
        Self {
            breed: draft.breed.as_str(),
            sex_upon_outcome: draft.sex_upon_outcome.as_str(),
            age_in_weeks: Some(draft.age_upon_outcome_in_weeks),
        }
    }

    /// Reads classification inputs from a stored document.
    ///
    /// Missing or non-string text fields read as `""`, which matches no rule.
    pub fn from_document(document: &'a Document) -> Self {
        let text = |field: &str| document.get(field).and_then(Value::as_str).unwrap_or("");
        Self {
            breed: text(fields::BREED),
            sex_upon_outcome: text(fields::SEX_UPON_OUTCOME),
            age_in_weeks: document
                .get(fields::AGE_UPON_OUTCOME_IN_WEEKS)
                .and_then(Value::as_f64),
        }
    }
}

/// Computes the full set of matching categories for `profile`.
pub fn rescue_types(profile: &RescueProfile<'_>) -> Vec<RescueType> {
    RESCUE_RULES
        .iter()
        .filter(|rule| rule.matches(profile))
        .map(|rule| rule.category)
        .collect()
}

/// Returns `record` with `rescue_type` overwritten by a fresh classification.
pub fn classify(mut record: AnimalRecord) -> AnimalRecord {
    let types = rescue_types(&RescueProfile::from_record(&record));
    record.rescue_type = Some(types);
    record
}

/// Classifies `record` only when it is a dog; other records pass through.
pub fn classify_if_dog(record: AnimalRecord) -> AnimalRecord {
    if record.is_dog() {
        classify(record)
    } else {
        record
    }
}

/// Categories `draft` would receive on insert, or `None` for non-dogs.
pub fn preview(draft: &AnimalDraft) -> Option<Vec<RescueType>> {
    (draft.animal_type == DOG).then(|| rescue_types(&RescueProfile::from_draft(draft)))
}

/// Returns whether a stored document describes a dog.
pub fn document_is_dog(document: &Document) -> bool {
    document.get(fields::ANIMAL_TYPE).and_then(Value::as_str) == Some(DOG)
}
