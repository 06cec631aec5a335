//! SQLite-backed document collection.
//!
//! # Responsibility
//! - Store JSON documents per named collection in the `documents` table.
//! - Translate equality filters into `json_extract`/`json_each` predicates.
//! - Apply `$set` payloads in Rust so key order and modified counts are exact.
//!
//! # Invariants
//! - Every statement is scoped by `collection = ?`.
//! - Sequence allocation and the following insert share one
//!   `BEGIN IMMEDIATE` transaction.
//! - Sequence maxima are exact; a value with no representable successor
//!   fails the insert instead of being handed out again.
//! - Read paths reject undecodable bodies instead of skipping them.

use crate::model::Document;
use crate::repo::collection::{
    AllocatedSequence, DocumentCollection, Projection, RepoError, RepoResult, SequenceFields,
    UpdateSummary,
};
use rusqlite::types::Value as SqlValue;
use rusqlite::{
    named_params, params, params_from_iter, Connection, OptionalExtension, Transaction,
    TransactionBehavior,
};
use serde_json::{Number, Value};

const DOCUMENT_SELECT_SQL: &str = "SELECT id, body FROM documents WHERE collection = ?";

/// SQLite-backed document collection.
pub struct SqliteCollection<'conn> {
    conn: &'conn Connection,
    name: String,
}

impl<'conn> SqliteCollection<'conn> {
    /// Binds a collection name to a migrated connection.
    ///
    /// # Errors
    /// - `UnsupportedQuery` when `name` is blank.
    pub fn try_new(conn: &'conn Connection, name: impl Into<String>) -> RepoResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RepoError::UnsupportedQuery(
                "collection name cannot be empty".to_string(),
            ));
        }
        Ok(Self { conn, name })
    }

    fn select(
        &self,
        conn: &Connection,
        filter: &Document,
        limit: Option<u32>,
    ) -> RepoResult<Vec<(i64, Document)>> {
        let compiled = CompiledFilter::new(&self.name, filter)?;
        let mut sql = format!("{DOCUMENT_SELECT_SQL}{} ORDER BY id ASC", compiled.clauses);
        let mut bind_values = compiled.bind_values;
        if let Some(limit) = limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(SqlValue::Integer(i64::from(limit)));
        }

        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            let id: i64 = row.get("id")?;
            let body: String = row.get("body")?;
            documents.push((id, parse_body(&self.name, id, &body)?));
        }

        Ok(documents)
    }

    fn apply_set(
        &self,
        filter: &Document,
        set: &Document,
        limit: Option<u32>,
    ) -> RepoResult<UpdateSummary> {
        validate_set(set)?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut summary = UpdateSummary::default();
        for (id, mut document) in self.select(&tx, filter, limit)? {
            summary.matched += 1;

            let mut changed = false;
            for (field, value) in set {
                if document.get(field) != Some(value) {
                    document.insert(field.clone(), value.clone());
                    changed = true;
                }
            }
            if !changed {
                continue;
            }

            tx.execute(
                "UPDATE documents
                 SET
                    body = ?1,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?2;",
                params![serde_json::to_string(&document)?, id],
            )?;
            summary.modified += 1;
        }
        tx.commit()?;

        Ok(summary)
    }
}

impl DocumentCollection for SqliteCollection<'_> {
    fn name(&self) -> &str {
        &self.name
    }

    fn insert_one(&self, document: &Document) -> RepoResult<bool> {
        insert_body(self.conn, &self.name, document)
    }

    fn insert_sequenced(
        &self,
        sequence: &SequenceFields<'_>,
        build: &mut dyn FnMut(AllocatedSequence) -> RepoResult<Document>,
    ) -> RepoResult<bool> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let next = next_sequence(&tx, &self.name, sequence)?;
        let document = build(next)?;
        let acknowledged = insert_body(&tx, &self.name, &document)?;
        tx.commit()?;
        Ok(acknowledged)
    }

    fn find(&self, filter: &Document, projection: Projection) -> RepoResult<Vec<Document>> {
        Ok(self
            .select(self.conn, filter, None)?
            .into_iter()
            .map(|(_, document)| projection.apply(document))
            .collect())
    }

    fn find_one(&self, filter: &Document, projection: Projection) -> RepoResult<Option<Document>> {
        Ok(self
            .select(self.conn, filter, Some(1))?
            .into_iter()
            .next()
            .map(|(_, document)| projection.apply(document)))
    }

    fn update_one(&self, filter: &Document, set: &Document) -> RepoResult<UpdateSummary> {
        self.apply_set(filter, set, Some(1))
    }

    fn update_many(&self, filter: &Document, set: &Document) -> RepoResult<UpdateSummary> {
        self.apply_set(filter, set, None)
    }

    fn delete_one(&self, filter: &Document) -> RepoResult<u64> {
        let Some((id, _)) = self.select(self.conn, filter, Some(1))?.into_iter().next() else {
            return Ok(0);
        };
        let deleted = self
            .conn
            .execute("DELETE FROM documents WHERE id = ?1;", [id])?;
        Ok(deleted as u64)
    }

    fn delete_many(&self, filter: &Document) -> RepoResult<u64> {
        let compiled = CompiledFilter::new(&self.name, filter)?;
        let sql = format!(
            "DELETE FROM documents WHERE collection = ?{};",
            compiled.clauses
        );
        let deleted = self
            .conn
            .execute(&sql, params_from_iter(compiled.bind_values))?;
        Ok(deleted as u64)
    }
}

/// `WHERE` suffix plus bind values for one equality filter.
///
/// The first bind value is always the collection name.
struct CompiledFilter {
    clauses: String,
    bind_values: Vec<SqlValue>,
}

impl CompiledFilter {
    fn new(collection: &str, filter: &Document) -> RepoResult<Self> {
        let mut compiled = Self {
            clauses: String::new(),
            bind_values: vec![SqlValue::Text(collection.to_string())],
        };
        for (field, expected) in filter {
            compiled.push_condition(field, expected)?;
        }
        Ok(compiled)
    }

    fn push_condition(&mut self, field: &str, expected: &Value) -> RepoResult<()> {
        let path = field_path(field)?;
        match expected {
            Value::Null => {
                self.clauses.push_str(
                    " AND (json_type(documents.body, ?) IS NULL
                       OR json_type(documents.body, ?) = 'null')",
                );
                self.bind_values.push(SqlValue::Text(path.clone()));
                self.bind_values.push(SqlValue::Text(path));
            }
            Value::Bool(flag) => {
                let json_type = if *flag { "true" } else { "false" };
                self.clauses.push_str(" AND json_type(documents.body, ?) = ?");
                self.bind_values.push(SqlValue::Text(path));
                self.bind_values.push(SqlValue::Text(json_type.to_string()));
            }
            Value::Number(number) => self.push_scalar(path, number_to_sql(number)),
            Value::String(text) => self.push_scalar(path, SqlValue::Text(text.clone())),
            Value::Array(_) | Value::Object(_) => {
                reject_operators(field, expected)?;
                self.clauses
                    .push_str(" AND json_extract(documents.body, ?) = json(?)");
                self.bind_values.push(SqlValue::Text(path));
                self.bind_values
                    .push(SqlValue::Text(serde_json::to_string(expected)?));
            }
        }
        Ok(())
    }

    /// Scalar equality that also matches arrays containing the scalar.
    fn push_scalar(&mut self, path: String, expected: SqlValue) {
        self.clauses.push_str(
            " AND (json_extract(documents.body, ?) = ?
               OR (json_type(documents.body, ?) = 'array'
                   AND EXISTS (
                       SELECT 1 FROM json_each(documents.body, ?) AS item
                       WHERE item.value = ?
                   )))",
        );
        self.bind_values.push(SqlValue::Text(path.clone()));
        self.bind_values.push(expected.clone());
        self.bind_values.push(SqlValue::Text(path.clone()));
        self.bind_values.push(SqlValue::Text(path));
        self.bind_values.push(expected);
    }
}

fn next_sequence(
    conn: &Connection,
    collection: &str,
    sequence: &SequenceFields<'_>,
) -> RepoResult<AllocatedSequence> {
    let counter_path = field_path(sequence.counter_field)?;
    let max_counter: Option<f64> = conn.query_row(
        "SELECT MAX(json_extract(body, :path))
         FROM documents
         WHERE collection = :collection
           AND json_type(body, :path) IN ('integer', 'real');",
        named_params! { ":path": counter_path, ":collection": collection },
        |row| row.get(0),
    )?;
    let counter = match max_counter {
        None => 1,
        Some(max) => (max.floor() as i64).checked_add(1).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "`{}` sequence in `{collection}` is exhausted at {max}",
                sequence.counter_field
            ))
        })?,
    };

    // Digits are compared as text (longest, then greatest) so ids beyond the
    // SQLite integer range are never truncated.
    let id_path = field_path(sequence.id_field)?;
    let prefix_len = sequence.id_prefix.chars().count() as i64;
    let max_digits: Option<String> = conn
        .query_row(
            "SELECT digits
             FROM (
                 SELECT ltrim(substr(json_extract(body, :path), :digits_start), '0') AS digits
                 FROM documents
                 WHERE collection = :collection
                   AND json_type(body, :path) = 'text'
                   AND substr(json_extract(body, :path), 1, :prefix_len) = :prefix
                   AND length(json_extract(body, :path)) > :prefix_len
                   AND substr(json_extract(body, :path), :digits_start) NOT GLOB '*[^0-9]*'
             )
             ORDER BY length(digits) DESC, digits DESC
             LIMIT 1;",
            named_params! {
                ":path": id_path,
                ":collection": collection,
                ":prefix": sequence.id_prefix,
                ":prefix_len": prefix_len,
                ":digits_start": prefix_len + 1,
            },
            |row| row.get(0),
        )
        .optional()?;
    let id_number = match max_digits {
        None => 1,
        Some(digits) => next_id_number(&digits).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "`{}` sequence in `{collection}` is exhausted at {}{digits}",
                sequence.id_field, sequence.id_prefix
            ))
        })?,
    };

    Ok(AllocatedSequence { counter, id_number })
}

/// Successor of a decimal digit run without leading zeros; `""` reads as 0.
fn next_id_number(digits: &str) -> Option<u64> {
    if digits.is_empty() {
        return Some(1);
    }
    digits.parse::<u64>().ok()?.checked_add(1)
}

fn insert_body(conn: &Connection, collection: &str, document: &Document) -> RepoResult<bool> {
    let body = serde_json::to_string(document)?;
    let inserted = conn.execute(
        "INSERT INTO documents (collection, body) VALUES (?1, ?2);",
        params![collection, body],
    )?;
    Ok(inserted == 1)
}

fn parse_body(collection: &str, id: i64, body: &str) -> RepoResult<Document> {
    serde_json::from_str(body).map_err(|err| {
        RepoError::InvalidData(format!("document {id} in `{collection}`: {err}"))
    })
}

/// Builds a quoted JSON path for one top-level field.
fn field_path(field: &str) -> RepoResult<String> {
    if field.is_empty() {
        return Err(RepoError::UnsupportedQuery(
            "field name cannot be empty".to_string(),
        ));
    }
    if field.starts_with('$') {
        return Err(RepoError::UnsupportedQuery(format!(
            "operator `{field}` is not supported"
        )));
    }
    if field.contains('"') {
        return Err(RepoError::UnsupportedQuery(format!(
            "field name `{field}` cannot contain quotes"
        )));
    }
    if field.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
        return Ok(format!("$.{field}"));
    }
    Ok(format!("$.\"{field}\""))
}

fn validate_set(set: &Document) -> RepoResult<()> {
    for field in set.keys() {
        field_path(field)?;
    }
    Ok(())
}

fn reject_operators(field: &str, value: &Value) -> RepoResult<()> {
    match value {
        Value::Object(map) => {
            if let Some(key) = map.keys().find(|key| key.starts_with('$')) {
                return Err(RepoError::UnsupportedQuery(format!(
                    "operator `{key}` on field `{field}` is not supported"
                )));
            }
            map.values().try_for_each(|nested| reject_operators(field, nested))
        }
        Value::Array(items) => items
            .iter()
            .try_for_each(|nested| reject_operators(field, nested)),
        _ => Ok(()),
    }
}

fn number_to_sql(number: &Number) -> SqlValue {
    if let Some(value) = number.as_i64() {
        SqlValue::Integer(value)
    } else {
        SqlValue::Real(number.as_f64().unwrap_or(f64::NAN))
    }
}

#[cfg(test)]
mod tests {
    use super::{field_path, next_id_number, CompiledFilter};
    use crate::repo::collection::RepoError;
    use serde_json::json;

    #[test]
    fn field_path_quotes_only_when_needed() {
        assert_eq!(field_path("animal_id").unwrap(), "$.animal_id");
        assert_eq!(field_path("sex upon outcome").unwrap(), "$.\"sex upon outcome\"");
    }

    #[test]
    fn field_path_rejects_operators_and_quotes() {
        assert!(matches!(field_path("$gt"), Err(RepoError::UnsupportedQuery(_))));
        assert!(matches!(field_path("a\"b"), Err(RepoError::UnsupportedQuery(_))));
        assert!(matches!(field_path(""), Err(RepoError::UnsupportedQuery(_))));
    }

    #[test]
    fn next_id_number_is_exact_and_checked() {
        assert_eq!(next_id_number(""), Some(1));
        assert_eq!(next_id_number("1200"), Some(1201));
        assert_eq!(
            next_id_number("9223372036854775808"),
            Some(9_223_372_036_854_775_809)
        );
        assert_eq!(next_id_number("18446744073709551615"), None);
        assert_eq!(next_id_number("99999999999999999999"), None);
    }

    #[test]
    fn nested_operator_values_are_rejected() {
        let filter = json!({ "age_upon_outcome_in_weeks": { "$lte": 156 } });
        let err = CompiledFilter::new("animals", filter.as_object().unwrap())
            .err()
            .expect("operators must be rejected");
        assert!(err.to_string().contains("$lte"));
    }

    #[test]
    fn empty_filter_only_binds_collection() {
        let compiled = CompiledFilter::new("animals", &serde_json::Map::new()).unwrap();
        assert!(compiled.clauses.is_empty());
        assert_eq!(compiled.bind_values.len(), 1);
    }
}
