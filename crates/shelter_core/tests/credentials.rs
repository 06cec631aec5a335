use rusqlite::Connection;
use serde_json::json;
use shelter_core::db::open_db_in_memory;
use shelter_core::service::credential_service::{
    salted_digest, sha256_hex, CREDENTIALS_COLLECTION, SALTS_COLLECTION,
};
use shelter_core::{CredentialService, Document, DocumentCollection, SqliteCollection};

fn service(conn: &Connection) -> CredentialService<SqliteCollection<'_>> {
    CredentialService::new(
        SqliteCollection::try_new(conn, CREDENTIALS_COLLECTION).unwrap(),
        SqliteCollection::try_new(conn, SALTS_COLLECTION).unwrap(),
    )
}

#[test]
fn provisioned_user_passes_credential_and_permission_checks() {
    let conn = open_db_in_memory().unwrap();
    let auth = service(&conn);
    assert!(auth.provision_user("aacuser", "s3cret", "pepper", true).unwrap());

    assert_eq!(auth.salt_for("aacuser").unwrap(), "pepper");
    assert!(auth.check_user("aacuser", "s3cret").unwrap());
    assert!(auth.check_permission("aacuser", "s3cret").unwrap());
}

#[test]
fn wrong_password_or_unknown_user_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let auth = service(&conn);
    auth.provision_user("aacuser", "s3cret", "pepper", true)
        .unwrap();

    assert!(!auth.check_user("aacuser", "guess").unwrap());
    assert!(!auth.check_permission("aacuser", "guess").unwrap());
    assert!(!auth.check_user("stranger", "s3cret").unwrap());
}

#[test]
fn read_only_user_lacks_write_permission() {
    let conn = open_db_in_memory().unwrap();
    let auth = service(&conn);
    auth.provision_user("viewer", "look", "salt-1", false)
        .unwrap();

    assert!(auth.check_user("viewer", "look").unwrap());
    assert!(!auth.check_permission("viewer", "look").unwrap());
}

#[test]
fn user_without_salt_is_hashed_with_none() {
    let conn = open_db_in_memory().unwrap();
    let auth = service(&conn);
    assert_eq!(auth.salt_for("legacy").unwrap(), "none");

    let credentials = SqliteCollection::try_new(&conn, CREDENTIALS_COLLECTION).unwrap();
    let mut document = Document::new();
    document.insert(
        salted_digest("legacy", "none"),
        json!(salted_digest("pw", "none")),
    );
    credentials.insert_one(&document).unwrap();

    assert!(auth.check_user("legacy", "pw").unwrap());
    // No permission key stored at all.
    assert!(!auth.check_permission("legacy", "pw").unwrap());
}

#[test]
fn plain_credentials_never_reach_storage() {
    let conn = open_db_in_memory().unwrap();
    let auth = service(&conn);
    auth.provision_user("aacuser", "s3cret", "pepper", true)
        .unwrap();

    let bodies: Vec<String> = conn
        .prepare("SELECT body FROM documents ORDER BY id;")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(bodies.len(), 2);
    for body in &bodies {
        assert!(!body.contains("aacuser"));
        assert!(!body.contains("s3cret"));
    }
    assert!(bodies[0].contains(&sha256_hex("aacuser")));
}
