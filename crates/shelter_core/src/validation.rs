//! Dashboard input validation helpers.
//!
//! # Responsibility
//! - Validate free-text names before they reach the record manager.
//! - Model identifier lookups as an explicit tri-state outcome.

use once_cell::sync::Lazy;
use regex::Regex;

/// Letters plus `*`, `-`, `.` and space, at most 15 characters.
static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{L}*\-. ]{0,15}$").expect("valid name regex"));

/// Returns whether `name` is acceptable for a new or updated animal.
pub fn validate_name(name: &str) -> bool {
    NAME_RE.is_match(name)
}

/// Outcome of looking up an animal identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifierLookup {
    /// At least one record carries the identifier.
    Found,
    /// The lookup ran and matched nothing.
    NotFound,
    /// The lookup itself failed; carries the rendered storage error.
    LookupFailed(String),
}

impl IdentifierLookup {
    /// Collapses the outcome to the dashboard boolean.
    ///
    /// A failed lookup reads as "does not exist".
    pub fn exists(&self) -> bool {
        matches!(self, Self::Found)
    }
}

#[cfg(test)]
mod tests {
    use super::{validate_name, IdentifierLookup};

    #[test]
    fn accepts_letters_and_permitted_punctuation() {
        assert!(validate_name("Mrs. Baker-Smith"));
        assert!(validate_name("*Buddy*"));
        assert!(validate_name(""));
        assert!(validate_name("Zoë"));
    }

    #[test]
    fn rejects_names_longer_than_fifteen_characters() {
        assert!(validate_name("Abcdefghijklmno"));
        assert!(!validate_name("Abcdefghijklmnop"));
    }

    #[test]
    fn rejects_digits_and_other_symbols() {
        assert!(!validate_name("Rex2"));
        assert!(!validate_name("Rex_Jr"));
        assert!(!validate_name("Rex!"));
        assert!(!validate_name("Rex\tJr"));
    }

    #[test]
    fn only_found_counts_as_existing() {
        assert!(IdentifierLookup::Found.exists());
        assert!(!IdentifierLookup::NotFound.exists());
        assert!(!IdentifierLookup::LookupFailed("disk I/O error".to_string()).exists());
    }
}
