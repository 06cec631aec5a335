//! Animal record model.
//!
//! # Responsibility
//! - Define the canonical stored record and its typed identifier.
//! - Parse dashboard input into explicit presence-marked fields.
//! - Synthesize complete records with defaults applied exactly once.
//!
//! # Invariants
//! - `AnimalId` always renders as `"A" + decimal integer`.
//! - Struct field order is the stored document field order.
//! - Descriptive fields default to `""`, coordinates to `0.0`.
//! - `rescue_type` is only present on records that went through
//!   classification.

use crate::age::{self, AgeUponOutcome};
use crate::model::Document;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Stored field names.
pub mod fields {
    pub const ROW: &str = "row";
    pub const AGE_UPON_OUTCOME: &str = "age_upon_outcome";
    pub const ANIMAL_ID: &str = "animal_id";
    pub const ANIMAL_TYPE: &str = "animal_type";
    pub const BREED: &str = "breed";
    pub const COLOR: &str = "color";
    pub const DATE_OF_BIRTH: &str = "date_of_birth";
    pub const DATETIME: &str = "datetime";
    pub const MONTHYEAR: &str = "monthyear";
    pub const NAME: &str = "name";
    pub const OUTCOME_SUBTYPE: &str = "outcome_subtype";
    pub const OUTCOME_TYPE: &str = "outcome_type";
    pub const SEX_UPON_OUTCOME: &str = "sex_upon_outcome";
    pub const LOCATION_LAT: &str = "location_lat";
    pub const LOCATION_LONG: &str = "location_long";
    pub const AGE_UPON_OUTCOME_IN_WEEKS: &str = "age_upon_outcome_in_weeks";
    pub const RESCUE_TYPE: &str = "rescue_type";

    /// Display schema order shared by every synthesized record.
    pub const DISPLAY_ORDER: [&str; 16] = [
        ROW,
        AGE_UPON_OUTCOME,
        ANIMAL_ID,
        ANIMAL_TYPE,
        BREED,
        COLOR,
        DATE_OF_BIRTH,
        DATETIME,
        MONTHYEAR,
        NAME,
        OUTCOME_SUBTYPE,
        OUTCOME_TYPE,
        SEX_UPON_OUTCOME,
        LOCATION_LAT,
        LOCATION_LONG,
        AGE_UPON_OUTCOME_IN_WEEKS,
    ];
}

/// Prefix of every public animal identifier.
pub const ANIMAL_ID_PREFIX: &str = "A";
/// `animal_type` value that enables rescue classification.
pub const DOG: &str = "Dog";
/// `datetime` rendering of the insertion moment.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M";
/// `monthyear` rendering of the insertion moment.
pub const MONTHYEAR_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Validation failures for animal input and stored identifiers.
#[derive(Debug, Clone, PartialEq)]
pub enum AnimalValidationError {
    /// Field is present but carries the wrong JSON type.
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
    /// `date_of_birth` is not a `YYYY-MM-DD` calendar date.
    InvalidDate { value: String },
    /// `date_of_birth` lies after the reference moment.
    BirthDateInFuture { date_of_birth: NaiveDate },
    /// Identifier does not follow `A<digits>`.
    InvalidAnimalId(String),
}

impl Display for AnimalValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WrongType { field, expected } => {
                write!(f, "field `{field}` must be {expected}")
            }
            Self::InvalidDate { value } => {
                write!(f, "date_of_birth `{value}` is not a YYYY-MM-DD date")
            }
            Self::BirthDateInFuture { date_of_birth } => {
                write!(f, "date_of_birth {date_of_birth} is in the future")
            }
            Self::InvalidAnimalId(value) => write!(f, "invalid animal_id `{value}`"),
        }
    }
}

impl Error for AnimalValidationError {}

/// Public animal identifier, rendered as `A<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AnimalId(u64);

impl AnimalId {
    pub fn new(number: u64) -> Self {
        Self(number)
    }

    /// Numeric part of the identifier.
    pub fn number(self) -> u64 {
        self.0
    }
}

impl Display for AnimalId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{ANIMAL_ID_PREFIX}{}", self.0)
    }
}

impl FromStr for AnimalId {
    type Err = AnimalValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let digits = value
            .strip_prefix(ANIMAL_ID_PREFIX)
            .filter(|rest| !rest.is_empty() && rest.chars().all(|ch| ch.is_ascii_digit()))
            .ok_or_else(|| AnimalValidationError::InvalidAnimalId(value.to_string()))?;
        digits
            .parse::<u64>()
            .map(Self)
            .map_err(|_| AnimalValidationError::InvalidAnimalId(value.to_string()))
    }
}

impl Serialize for AnimalId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AnimalId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Rescue-training category a dog can qualify for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RescueType {
    Water,
    MountainWilderness,
    DisasterTracking,
}

impl RescueType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Water => "water",
            Self::MountainWilderness => "mountain_wilderness",
            Self::DisasterTracking => "disaster_tracking",
        }
    }
}

impl Display for RescueType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical stored animal record.
///
/// Serialized field order matches `fields::DISPLAY_ORDER`, followed by
/// `rescue_type` when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimalRecord {
    pub row: i64,
    #[serde(default)]
    pub age_upon_outcome: String,
    pub animal_id: AnimalId,
    #[serde(default)]
    pub animal_type: String,
    #[serde(default)]
    pub breed: String,
    #[serde(default)]
    pub color: String,
    /// Rendered as `YYYY-MM-DD`, or `""` when unknown.
    #[serde(default, with = "optional_date")]
    pub date_of_birth: Option<NaiveDate>,
    /// Insertion moment as `%Y-%m-%d %H:%M`, or `""`.
    #[serde(default)]
    pub datetime: String,
    /// Insertion moment as `%Y-%m-%dT%H:%M:%S`, or `""`.
    #[serde(default)]
    pub monthyear: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub outcome_subtype: String,
    #[serde(default)]
    pub outcome_type: String,
    #[serde(default)]
    pub sex_upon_outcome: String,
    #[serde(default)]
    pub location_lat: f64,
    #[serde(default)]
    pub location_long: f64,
    #[serde(default)]
    pub age_upon_outcome_in_weeks: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rescue_type: Option<Vec<RescueType>>,
}

impl AnimalRecord {
    /// Returns whether rescue classification applies to this record.
    pub fn is_dog(&self) -> bool {
        self.animal_type == DOG
    }

    /// Converts the record into a stored document in display order.
    pub fn into_document(self) -> Result<Document, serde_json::Error> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => Err(<serde_json::Error as serde::ser::Error>::custom(
                "animal record did not serialize to an object",
            )),
        }
    }

    /// Parses a stored document back into a typed record.
    pub fn from_document(document: Document) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(document))
    }
}

/// Dashboard input for a new animal.
///
/// `None` means the caller did not send the field. Defaults are applied in
/// `NewAnimal::draft`, never earlier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewAnimal {
    pub name: Option<String>,
    pub animal_type: Option<String>,
    pub breed: Option<String>,
    pub color: Option<String>,
    pub sex_upon_outcome: Option<String>,
    pub outcome_type: Option<String>,
    pub outcome_subtype: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub location_lat: Option<f64>,
    pub location_long: Option<f64>,
}

impl NewAnimal {
    /// Reads recognized fields from a dashboard document.
    ///
    /// Unrecognized fields are ignored. `null` reads as absent, and so does an
    /// empty `date_of_birth`.
    ///
    /// # Errors
    /// - `WrongType` when a recognized field carries the wrong JSON type.
    /// - `InvalidDate` when `date_of_birth` is not `YYYY-MM-DD`.
    pub fn from_document(document: &Document) -> Result<Self, AnimalValidationError> {
        let date_of_birth = match optional_text(document, fields::DATE_OF_BIRTH)? {
            Some(raw) if !raw.trim().is_empty() => Some(age::parse_date_of_birth(&raw)?),
            _ => None,
        };

        Ok(Self {
            name: optional_text(document, fields::NAME)?,
            animal_type: optional_text(document, fields::ANIMAL_TYPE)?,
            breed: optional_text(document, fields::BREED)?,
            color: optional_text(document, fields::COLOR)?,
            sex_upon_outcome: optional_text(document, fields::SEX_UPON_OUTCOME)?,
            outcome_type: optional_text(document, fields::OUTCOME_TYPE)?,
            outcome_subtype: optional_text(document, fields::OUTCOME_SUBTYPE)?,
            date_of_birth,
            location_lat: optional_number(document, fields::LOCATION_LAT)?,
            location_long: optional_number(document, fields::LOCATION_LONG)?,
        })
    }

    /// Applies defaults and derives ages as of `now`.
    ///
    /// # Errors
    /// - `BirthDateInFuture` when `date_of_birth` is after `now`.
    pub fn draft(self, now: NaiveDateTime) -> Result<AnimalDraft, AnimalValidationError> {
        let (age, datetime, monthyear) = match self.date_of_birth {
            Some(date_of_birth) => (
                age::age_upon_outcome(date_of_birth, now)?,
                now.format(DATETIME_FORMAT).to_string(),
                now.format(MONTHYEAR_FORMAT).to_string(),
            ),
            None => (AgeUponOutcome::unknown(), String::new(), String::new()),
        };

        Ok(AnimalDraft {
            age_upon_outcome: age.label,
            animal_type: self.animal_type.unwrap_or_default(),
            breed: self.breed.unwrap_or_default(),
            color: self.color.unwrap_or_default(),
            date_of_birth: self.date_of_birth,
            datetime,
            monthyear,
            name: self.name.unwrap_or_default(),
            outcome_subtype: self.outcome_subtype.unwrap_or_default(),
            outcome_type: self.outcome_type.unwrap_or_default(),
            sex_upon_outcome: self.sex_upon_outcome.unwrap_or_default(),
            location_lat: self.location_lat.unwrap_or(0.0),
            location_long: self.location_long.unwrap_or(0.0),
            age_upon_outcome_in_weeks: age.weeks,
        })
    }
}

/// Fully defaulted animal that still lacks its sequence identity.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimalDraft {
    pub age_upon_outcome: String,
    pub animal_type: String,
    pub breed: String,
    pub color: String,
    pub date_of_birth: Option<NaiveDate>,
    pub datetime: String,
    pub monthyear: String,
    pub name: String,
    pub outcome_subtype: String,
    pub outcome_type: String,
    pub sex_upon_outcome: String,
    pub location_lat: f64,
    pub location_long: f64,
    pub age_upon_outcome_in_weeks: f64,
}

impl AnimalDraft {
    /// Stamps sequence identity onto the draft.
    ///
    /// `rescue_type` is left unset; classification runs separately.
    pub fn into_record(self, row: i64, animal_id: AnimalId) -> AnimalRecord {
        AnimalRecord {
            row,
            age_upon_outcome: self.age_upon_outcome,
            animal_id,
            animal_type: self.animal_type,
            breed: self.breed,
            color: self.color,
            date_of_birth: self.date_of_birth,
            datetime: self.datetime,
            monthyear: self.monthyear,
            name: self.name,
            outcome_subtype: self.outcome_subtype,
            outcome_type: self.outcome_type,
            sex_upon_outcome: self.sex_upon_outcome,
            location_lat: self.location_lat,
            location_long: self.location_long,
            age_upon_outcome_in_weeks: self.age_upon_outcome_in_weeks,
            rescue_type: None,
        }
    }
}

fn optional_text(
    document: &Document,
    field: &'static str,
) -> Result<Option<String>, AnimalValidationError> {
    match document.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(_) => Err(AnimalValidationError::WrongType {
            field,
            expected: "a string",
        }),
    }
}

fn optional_number(
    document: &Document,
    field: &'static str,
) -> Result<Option<f64>, AnimalValidationError> {
    match document.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(value)) => value.as_f64().map(Some).ok_or(
            AnimalValidationError::WrongType {
                field,
                expected: "a finite number",
            },
        ),
        Some(_) => Err(AnimalValidationError::WrongType {
            field,
            expected: "a number",
        }),
    }
}

mod optional_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(
        value: &Option<NaiveDate>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(date) => serializer.collect_str(&date.format(FORMAT)),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        NaiveDate::parse_from_str(trimmed, FORMAT)
            .map(Some)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::{fields, AnimalId, AnimalValidationError, NewAnimal, RescueType};
    use crate::model::Document;
    use chrono::NaiveDate;
    use serde_json::json;

    fn document(value: serde_json::Value) -> Document {
        value.as_object().cloned().expect("fixture must be an object")
    }

    fn noon(date: NaiveDate) -> chrono::NaiveDateTime {
        date.and_hms_opt(12, 0, 0).expect("valid time")
    }

    #[test]
    fn animal_id_parses_and_renders() {
        let id: AnimalId = "A1200".parse().expect("A1200 should parse");
        assert_eq!(id.number(), 1200);
        assert_eq!(id.to_string(), "A1200");
    }

    #[test]
    fn animal_id_rejects_malformed_values() {
        for raw in ["", "A", "1200", "B12", "A12x", "a12"] {
            assert!(
                matches!(
                    raw.parse::<AnimalId>(),
                    Err(AnimalValidationError::InvalidAnimalId(_))
                ),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn rescue_type_serializes_as_snake_case() {
        let value = serde_json::to_value(vec![
            RescueType::Water,
            RescueType::MountainWilderness,
            RescueType::DisasterTracking,
        ])
        .unwrap();
        assert_eq!(
            value,
            json!(["water", "mountain_wilderness", "disaster_tracking"])
        );
    }

    #[test]
    fn draft_defaults_absent_fields() {
        let now = noon(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        let input = NewAnimal::from_document(&document(json!({ "name": "Rex" }))).unwrap();
        let record = input.draft(now).unwrap().into_record(1, AnimalId::new(1));

        assert_eq!(record.name, "Rex");
        assert_eq!(record.breed, "");
        assert_eq!(record.age_upon_outcome, "");
        assert_eq!(record.datetime, "");
        assert_eq!(record.location_lat, 0.0);
        assert_eq!(record.age_upon_outcome_in_weeks, 0.0);
        assert!(record.rescue_type.is_none());
    }

    #[test]
    fn draft_stamps_insertion_moment_when_birth_date_is_known() {
        let now = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 5, 7)
            .unwrap();
        let input = NewAnimal::from_document(&document(json!({
            "date_of_birth": "2024-02-23",
        })))
        .unwrap();
        let draft = input.draft(now).unwrap();

        assert_eq!(draft.datetime, "2024-03-01 09:05");
        assert_eq!(draft.monthyear, "2024-03-01T09:05:07");
        assert_eq!(draft.age_upon_outcome, "1 week");
    }

    #[test]
    fn from_document_rejects_wrong_types() {
        let err = NewAnimal::from_document(&document(json!({ "breed": 12 }))).unwrap_err();
        assert_eq!(
            err,
            AnimalValidationError::WrongType {
                field: "breed",
                expected: "a string"
            }
        );

        let err =
            NewAnimal::from_document(&document(json!({ "location_lat": "north" }))).unwrap_err();
        assert!(matches!(err, AnimalValidationError::WrongType { field: "location_lat", .. }));
    }

    #[test]
    fn stored_document_keeps_display_order() {
        let now = noon(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        let record = NewAnimal::default()
            .draft(now)
            .unwrap()
            .into_record(7, AnimalId::new(9));
        let document = record.into_document().unwrap();

        let keys: Vec<&str> = document.keys().map(String::as_str).collect();
        assert_eq!(keys, fields::DISPLAY_ORDER.to_vec());
        assert_eq!(document[fields::ANIMAL_ID], json!("A9"));
        assert_eq!(document[fields::DATE_OF_BIRTH], json!(""));
    }

    #[test]
    fn record_reads_back_from_document() {
        let now = noon(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        let mut record = NewAnimal {
            date_of_birth: NaiveDate::from_ymd_opt(2023, 3, 1),
            animal_type: Some("Dog".to_string()),
            ..NewAnimal::default()
        }
        .draft(now)
        .unwrap()
        .into_record(3, AnimalId::new(30));
        record.rescue_type = Some(vec![RescueType::Water]);

        let parsed = super::AnimalRecord::from_document(record.clone().into_document().unwrap())
            .unwrap();
        assert_eq!(parsed, record);
        assert!(parsed.is_dog());
    }
}
