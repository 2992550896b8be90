//! Document store trait and the identifier/collection types it speaks.
//!
//! The store is implemented by the `formlogic-store` crate (memory and
//! file-backed). Stores hold plain JSON objects; they stamp `_id`,
//! `createdAt` and `updatedAt` on every document they write.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::StoreError;

// ---------------------------------------------------------------------------
// Identifiers and collections
// ---------------------------------------------------------------------------

/// Opaque document identifier assigned by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Generate a fresh identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an identifier, returning `None` if it is not well formed.
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s.trim()).ok().map(Self)
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DocumentId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("not a valid document id: {s:?}"))
    }
}

/// The document collections formlogic persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Forms,
    Responses,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Forms => "forms",
            Collection::Responses => "responses",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Field-equality filter over top-level document fields.
///
/// An empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    fields: BTreeMap<String, Value>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    /// Require `field` to equal `value`.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn matches(&self, doc: &Value) -> bool {
        self.fields
            .iter()
            .all(|(field, expected)| doc.get(field) == Some(expected))
    }
}

// ---------------------------------------------------------------------------
// Document store trait
// ---------------------------------------------------------------------------

/// Trait for document stores holding JSON objects keyed by [`DocumentId`].
///
/// Every operation is atomic per document. There are no cross-document
/// transactions and updates are last-writer-wins.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Human-readable backend name (e.g. "memory").
    fn name(&self) -> &str;

    /// Insert a new document, stamping `_id`, `createdAt` and `updatedAt`.
    async fn create(&self, collection: Collection, doc: Value) -> Result<DocumentId, StoreError>;

    async fn find_by_id(
        &self,
        collection: Collection,
        id: &DocumentId,
    ) -> Result<Option<Value>, StoreError>;

    /// All documents matching `filter`, in no particular order.
    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Value>, StoreError>;

    /// Replace a document's fields, keeping `_id` and `createdAt`.
    ///
    /// Returns the updated document, or `None` if no document has that id.
    async fn update_by_id(
        &self,
        collection: Collection,
        id: &DocumentId,
        doc: Value,
    ) -> Result<Option<Value>, StoreError>;

    /// Remove a document, returning it if it existed.
    async fn delete_by_id(
        &self,
        collection: Collection,
        id: &DocumentId,
    ) -> Result<Option<Value>, StoreError>;
}

// ---------------------------------------------------------------------------
// Stored documents
// ---------------------------------------------------------------------------

/// A document as read back from the store, with its identity and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stored<T> {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub document: T,
}

impl<T: serde::de::DeserializeOwned> Stored<T> {
    /// Decode a raw store document.
    pub fn from_document(collection: Collection, doc: Value) -> Result<Self, StoreError> {
        let id = doc
            .get("_id")
            .and_then(Value::as_str)
            .unwrap_or("<missing>")
            .to_string();
        serde_json::from_value(doc).map_err(|e| StoreError::Corrupt {
            collection,
            id,
            message: e.to_string(),
        })
    }
}

/// Stamp identity and timestamps onto a document about to be created.
pub fn stamp_created(doc: Value, id: &DocumentId, now: DateTime<Utc>) -> Result<Value, StoreError> {
    let Value::Object(mut map) = doc else {
        return Err(StoreError::NotAnObject);
    };
    let now = Value::String(now.to_rfc3339());
    map.insert("_id".into(), Value::String(id.to_string()));
    map.insert("createdAt".into(), now.clone());
    map.insert("updatedAt".into(), now);
    Ok(Value::Object(map))
}

/// Build the replacement for `existing`, keeping its `_id` and `createdAt`.
pub fn stamp_updated(
    existing: &Value,
    replacement: Value,
    now: DateTime<Utc>,
) -> Result<Value, StoreError> {
    let Value::Object(mut map) = replacement else {
        return Err(StoreError::NotAnObject);
    };
    for key in ["_id", "createdAt"] {
        match existing.get(key) {
            Some(v) => map.insert(key.into(), v.clone()),
            None => map.remove(key),
        };
    }
    map.insert("updatedAt".into(), Value::String(now.to_rfc3339()));
    Ok(Value::Object(map))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn document_id_parsing() {
        let id = DocumentId::new();
        assert_eq!(DocumentId::parse(&id.to_string()), Some(id));
        assert_eq!(DocumentId::parse("not-an-id"), None);
        assert_eq!(DocumentId::parse(""), None);
        assert!("123".parse::<DocumentId>().is_err());
    }

    #[test]
    fn filter_matching() {
        let doc = json!({ "formId": "abc", "n": 1 });
        assert!(Filter::all().matches(&doc));
        assert!(Filter::all().eq("formId", "abc").matches(&doc));
        assert!(!Filter::all().eq("formId", "xyz").matches(&doc));
        assert!(!Filter::all().eq("missing", 1).matches(&doc));
    }

    #[test]
    fn stamping_preserves_identity() {
        let id = DocumentId::new();
        let t0 = Utc::now();
        let created = stamp_created(json!({ "title": "a" }), &id, t0).unwrap();
        assert_eq!(created["_id"], id.to_string());
        assert_eq!(created["createdAt"], created["updatedAt"]);

        let t1 = t0 + chrono::Duration::seconds(5);
        let updated = stamp_updated(&created, json!({ "title": "b", "_id": "forged" }), t1).unwrap();
        assert_eq!(updated["_id"], id.to_string());
        assert_eq!(updated["createdAt"], created["createdAt"]);
        assert_ne!(updated["updatedAt"], created["updatedAt"]);
        assert_eq!(updated["title"], "b");
    }

    #[test]
    fn rejects_non_objects() {
        let err = stamp_created(json!([1, 2]), &DocumentId::new(), Utc::now()).unwrap_err();
        assert!(matches!(err, StoreError::NotAnObject));
    }
}
