//! Age derivation from date of birth.
//!
//! # Responsibility
//! - Render the human-readable `age_upon_outcome` label.
//! - Compute the fractional `age_upon_outcome_in_weeks` value.
//!
//! # Invariants
//! - Elapsed days are floored whole days between birth (midnight) and `now`.
//! - Label units: days below 7, weeks below 30, months below 365, else years.
//! - Plural suffix only when the unit count is greater than one, so a
//!   zero count renders singular (`"0 day"`).
//! - Weeks are `days / 7` without flooring.

use crate::model::animal::AnimalValidationError;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

const DATE_OF_BIRTH_FORMAT: &str = "%Y-%m-%d";
const SECONDS_PER_DAY: i64 = 86_400;
const DAYS_PER_WEEK: i64 = 7;
const DAYS_PER_MONTH: i64 = 30;
const DAYS_PER_YEAR: i64 = 365;

/// Derived age pair stored on every record.
#[derive(Debug, Clone, PartialEq)]
pub struct AgeUponOutcome {
    /// Human-readable age, e.g. `"3 weeks"`.
    pub label: String,
    /// Fractional age in weeks.
    pub weeks: f64,
}

impl AgeUponOutcome {
    /// Placeholder used when no birth date is known.
    pub fn unknown() -> Self {
        Self {
            label: String::new(),
            weeks: 0.0,
        }
    }
}

/// Parses a `YYYY-MM-DD` birth date.
pub fn parse_date_of_birth(raw: &str) -> Result<NaiveDate, AnimalValidationError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_OF_BIRTH_FORMAT).map_err(|_| {
        AnimalValidationError::InvalidDate {
            value: raw.to_string(),
        }
    })
}

/// Whole days elapsed since midnight of `date_of_birth`, floored.
pub fn elapsed_days(date_of_birth: NaiveDate, now: NaiveDateTime) -> i64 {
    let born = date_of_birth.and_time(NaiveTime::MIN);
    (now - born).num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Renders an elapsed day count as the dashboard age label.
pub fn describe_age(days: i64) -> String {
    let (count, unit) = if days < DAYS_PER_WEEK {
        (days, "day")
    } else if days < DAYS_PER_MONTH {
        (days / DAYS_PER_WEEK, "week")
    } else if days < DAYS_PER_YEAR {
        (days / DAYS_PER_MONTH, "month")
    } else {
        (days / DAYS_PER_YEAR, "year")
    };

    let suffix = if count > 1 { "s" } else { "" };
    format!("{count} {unit}{suffix}")
}

/// Fractional weeks for an elapsed day count.
pub fn weeks_from_days(days: i64) -> f64 {
    days as f64 / DAYS_PER_WEEK as f64
}

/// Derives both age fields for `date_of_birth` as of `now`.
///
/// # Errors
/// - `BirthDateInFuture` when the birth date lies after `now`.
pub fn age_upon_outcome(
    date_of_birth: NaiveDate,
    now: NaiveDateTime,
) -> Result<AgeUponOutcome, AnimalValidationError> {
    let days = elapsed_days(date_of_birth, now);
    if days < 0 {
        return Err(AnimalValidationError::BirthDateInFuture { date_of_birth });
    }

    Ok(AgeUponOutcome {
        label: describe_age(days),
        weeks: weeks_from_days(days),
    })
}

#[cfg(test)]
mod tests {
    use super::{age_upon_outcome, describe_age, elapsed_days, parse_date_of_birth};
    use crate::model::animal::AnimalValidationError;
    use chrono::{Duration, NaiveDate};

    #[test]
    fn describe_age_matches_unit_boundaries() {
        let cases = [
            (0, "0 day"),
            (1, "1 day"),
            (6, "6 days"),
            (7, "1 week"),
            (13, "1 week"),
            (14, "2 weeks"),
            (29, "4 weeks"),
            (30, "1 month"),
            (59, "1 month"),
            (364, "12 months"),
            (365, "1 year"),
            (730, "2 years"),
        ];
        for (days, expected) in cases {
            assert_eq!(describe_age(days), expected, "days={days}");
        }
    }

    #[test]
    fn elapsed_days_floors_partial_days() {
        let dob = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let late_same_day = dob.and_hms_opt(23, 59, 59).unwrap();
        let next_morning = dob.and_hms_opt(0, 0, 0).unwrap() + Duration::hours(25);

        assert_eq!(elapsed_days(dob, late_same_day), 0);
        assert_eq!(elapsed_days(dob, next_morning), 1);
    }

    #[test]
    fn weeks_are_not_floored() {
        let dob = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let now = NaiveDate::from_ymd_opt(2024, 1, 11)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();

        let age = age_upon_outcome(dob, now).unwrap();
        assert_eq!(age.label, "1 week");
        assert!((age.weeks - 10.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn future_birth_date_is_rejected() {
        let dob = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        let now = NaiveDate::from_ymd_opt(2029, 12, 31)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();

        let err = age_upon_outcome(dob, now).unwrap_err();
        assert_eq!(
            err,
            AnimalValidationError::BirthDateInFuture { date_of_birth: dob }
        );
    }

    #[test]
    fn parse_date_of_birth_requires_iso_dates() {
        assert_eq!(
            parse_date_of_birth(" 2021-06-30 ").unwrap(),
            NaiveDate::from_ymd_opt(2021, 6, 30).unwrap()
        );
        assert!(matches!(
            parse_date_of_birth("06/30/2021"),
            Err(AnimalValidationError::InvalidDate { .. })
        ));
    }
}
