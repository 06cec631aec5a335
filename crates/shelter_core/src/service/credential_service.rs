//! Dashboard credential checks.
//!
//! # Responsibility
//! - Resolve per-user salts from the salts collection.
//! - Match salted username/password digests against the credentials
//!   collection, and read the salted read/write permission flag.
//!
//! # Invariants
//! - Plain usernames and passwords never reach storage or logs.
//! - Salts are looked up by the SHA-256 hex digest of the plain username.
//! - A user without a stored salt is hashed with the literal salt `"none"`.

use crate::model::Document;
use crate::repo::collection::{DocumentCollection, Projection, RepoResult};
use log::{debug, info};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Default collection holding salted credential documents.
pub const CREDENTIALS_COLLECTION: &str = "users";
/// Default collection holding per-user salts.
pub const SALTS_COLLECTION: &str = "salts";

const SALT_USER_FIELD: &str = "user";
const SALT_VALUE_FIELD: &str = "salt";
const MISSING_SALT: &str = "none";
const PERMISSION_KEY: &str = "read/write";
const PERMISSION_GRANTED: &str = "True";
const PERMISSION_DENIED: &str = "False";

/// Lowercase SHA-256 hex digest of `input`.
pub fn sha256_hex(input: &str) -> String {
    format!("{:x}", Sha256::digest(input.as_bytes()))
}

/// Digest of `value` with `salt` appended.
pub fn salted_digest(value: &str, salt: &str) -> String {
    sha256_hex(&format!("{value}{salt}"))
}

/// Credential checks over a credentials collection and a salts collection.
pub struct CredentialService<C: DocumentCollection> {
    credentials: C,
    salts: C,
}

impl<C: DocumentCollection> CredentialService<C> {
    pub fn new(credentials: C, salts: C) -> Self {
        Self { credentials, salts }
    }

    /// Returns the stored salt for `username`, or `"none"` when absent.
    ///
    /// Non-string salt values are used in their JSON text form.
    pub fn salt_for(&self, username: &str) -> RepoResult<String> {
        let filter = single_field(SALT_USER_FIELD, sha256_hex(username));
        let salt = self
            .salts
            .find_one(&filter, Projection::Include(&[SALT_VALUE_FIELD]))?
            .and_then(|document| document.get(SALT_VALUE_FIELD).map(value_text));
        if salt.is_none() {
            debug!("event=salt_lookup module=auth status=missing");
        }
        Ok(salt.unwrap_or_else(|| MISSING_SALT.to_string()))
    }

    /// Returns whether the username/password pair is registered.
    pub fn check_user(&self, username: &str, password: &str) -> RepoResult<bool> {
        let salt = self.salt_for(username)?;
        Ok(self
            .credential_document(username, password, &salt)?
            .is_some())
    }

    /// Returns whether the pair is registered with read/write permission.
    ///
    /// An unknown pair, or a document without the permission key, reads as
    /// `false`.
    pub fn check_permission(&self, username: &str, password: &str) -> RepoResult<bool> {
        let salt = self.salt_for(username)?;
        let Some(document) = self.credential_document(username, password, &salt)? else {
            return Ok(false);
        };

        let granted = salted_digest(PERMISSION_GRANTED, &salt);
        Ok(document
            .get(&salted_digest(PERMISSION_KEY, &salt))
            .map(value_text)
            .is_some_and(|value| value == granted))
    }

    /// Stores the salt and credential documents for a dashboard user.
    ///
    /// Returns `true` when both writes were acknowledged.
    pub fn provision_user(
        &self,
        username: &str,
        password: &str,
        salt: &str,
        read_write: bool,
    ) -> RepoResult<bool> {
        let mut salt_document = single_field(SALT_USER_FIELD, sha256_hex(username));
        salt_document.insert(
            SALT_VALUE_FIELD.to_string(),
            Value::String(salt.to_string()),
        );

        let permission = if read_write {
            PERMISSION_GRANTED
        } else {
            PERMISSION_DENIED
        };
        let mut credential_document = single_field(
            &salted_digest(username, salt),
            salted_digest(password, salt),
        );
        credential_document.insert(
            salted_digest(PERMISSION_KEY, salt),
            Value::String(salted_digest(permission, salt)),
        );

        let acknowledged = self.salts.insert_one(&salt_document)?
            && self.credentials.insert_one(&credential_document)?;
        info!("event=user_provision module=auth status=ok acknowledged={acknowledged} read_write={read_write}");
        Ok(acknowledged)
    }

    fn credential_document(
        &self,
        username: &str,
        password: &str,
        salt: &str,
    ) -> RepoResult<Option<Document>> {
        let filter = single_field(&salted_digest(username, salt), salted_digest(password, salt));
        self.credentials.find_one(&filter, Projection::All)
    }
}

fn single_field(field: &str, value: String) -> Document {
    let mut document = Document::new();
    document.insert(field.to_string(), Value::String(value));
    document
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{salted_digest, sha256_hex};

    #[test]
    fn sha256_hex_matches_known_digest() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn salted_digest_appends_salt() {
        assert_eq!(salted_digest("ab", "c"), sha256_hex("abc"));
        assert_ne!(salted_digest("abc", "x"), sha256_hex("abc"));
    }
}
