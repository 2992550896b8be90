//! In-memory document store.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;

use formlogic_core::error::StoreError;
use formlogic_core::traits::{
    stamp_created, stamp_updated, Collection, DocumentId, DocumentStore, Filter,
};

/// A store that keeps every collection in process memory.
///
/// Used for tests and one-shot CLI runs; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, BTreeMap<DocumentId, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held in `collection`.
    pub async fn len(&self, collection: Collection) -> usize {
        self.collections
            .read()
            .await
            .get(&collection)
            .map_or(0, BTreeMap::len)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn create(&self, collection: Collection, doc: Value) -> Result<DocumentId, StoreError> {
        let id = DocumentId::new();
        let doc = stamp_created(doc, &id, Utc::now())?;
        self.collections
            .write()
            .await
            .entry(collection)
            .or_default()
            .insert(id, doc);
        tracing::debug!(%collection, %id, "created document");
        Ok(id)
    }

    async fn find_by_id(
        &self,
        collection: Collection,
        id: &DocumentId,
    ) -> Result<Option<Value>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Vec<Value>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .map(|docs| {
                docs.values()
                    .filter(|doc| filter.matches(doc))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn update_by_id(
        &self,
        collection: Collection,
        id: &DocumentId,
        doc: Value,
    ) -> Result<Option<Value>, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(existing) = collections
            .get_mut(&collection)
            .and_then(|docs| docs.get_mut(id))
        else {
            return Ok(None);
        };
        *existing = stamp_updated(existing, doc, Utc::now())?;
        Ok(Some(existing.clone()))
    }

    async fn delete_by_id(
        &self,
        collection: Collection,
        id: &DocumentId,
    ) -> Result<Option<Value>, StoreError> {
        let mut collections = self.collections.write().await;
        Ok(collections
            .get_mut(&collection)
            .and_then(|docs| docs.remove(id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn create_and_find() {
        let store = MemoryStore::new();
        let id = store
            .create(Collection::Forms, json!({ "title": "a" }))
            .await
            .unwrap();

        let doc = store
            .find_by_id(Collection::Forms, &id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc["title"], "a");
        assert_eq!(doc["_id"], id.to_string());

        assert!(store
            .find_by_id(Collection::Responses, &id)
            .await
            .unwrap()
            .is_none());
        assert_eq!(store.len(Collection::Forms).await, 1);
    }

    #[tokio::test]
    async fn find_filters_by_field() {
        let store = MemoryStore::new();
        store
            .create(Collection::Responses, json!({ "formId": "a" }))
            .await
            .unwrap();
        store
            .create(Collection::Responses, json!({ "formId": "b" }))
            .await
            .unwrap();

        let all = store.find(Collection::Responses, &Filter::all()).await.unwrap();
        assert_eq!(all.len(), 2);
        let only_a = store
            .find(Collection::Responses, &Filter::all().eq("formId", "a"))
            .await
            .unwrap();
        assert_eq!(only_a.len(), 1);
        assert!(store
            .find(Collection::Forms, &Filter::all())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn update_and_delete() {
        let store = MemoryStore::new();
        let id = store
            .create(Collection::Forms, json!({ "title": "a" }))
            .await
            .unwrap();

        let updated = store
            .update_by_id(Collection::Forms, &id, json!({ "title": "b" }))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated["title"], "b");
        assert_eq!(updated["_id"], id.to_string());

        let missing = DocumentId::new();
        assert!(store
            .update_by_id(Collection::Forms, &missing, json!({}))
            .await
            .unwrap()
            .is_none());

        assert!(store
            .delete_by_id(Collection::Forms, &id)
            .await
            .unwrap()
            .is_some());
        assert!(store
            .delete_by_id(Collection::Forms, &id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn rejects_non_object_documents() {
        let store = MemoryStore::new();
        let err = store
            .create(Collection::Forms, json!("just a string"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotAnObject));
    }
}
