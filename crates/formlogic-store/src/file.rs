//! JSON-file document store.
//!
//! Layout: `<data_dir>/<collection>/<id>.json`, one pretty-printed JSON
//! object per file. Each write goes to a sibling temp file that is then
//! renamed over the target, so readers never see a partial document.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use formlogic_core::error::StoreError;
use formlogic_core::traits::{
    stamp_created, stamp_updated, Collection, DocumentId, DocumentStore, Filter,
};

/// A store persisting documents as JSON files under a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn collection_dir(&self, collection: Collection) -> PathBuf {
        self.root.join(collection.as_str())
    }

    fn document_path(&self, collection: Collection, id: &DocumentId) -> PathBuf {
        self.collection_dir(collection).join(format!("{id}.json"))
    }

    async fn read_document(&self, path: &Path) -> Result<Option<Value>, StoreError> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(io_error(path, source)),
        }
    }

    async fn write_document(&self, path: &Path, doc: &Value) -> Result<(), StoreError> {
        let Some(dir) = path.parent().map(Path::to_path_buf) else {
            return Err(io_error(
                path,
                std::io::Error::new(ErrorKind::InvalidInput, "document path has no parent"),
            ));
        };
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_error(&dir, e))?;
        let content = serde_json::to_vec_pretty(doc)?;
        let target = path.to_path_buf();

        // Each write gets its own temp file so concurrent writers of one
        // document never share a partially written file.
        tokio::task::spawn_blocking(move || {
            let mut tmp = tempfile::Builder::new()
                .prefix(".write-")
                .suffix(".tmp")
                .tempfile_in(&dir)
                .map_err(|e| io_error(&dir, e))?;
            tmp.write_all(&content)
                .and_then(|()| tmp.as_file().sync_all())
                .map_err(|e| io_error(tmp.path(), e))?;
            tmp.persist(&target)
                .map_err(|e| io_error(&target, e.error))?;
            Ok(())
        })
        .await
        .map_err(|e| io_error(path, std::io::Error::other(e)))?
    }

    async fn load(
        &self,
        collection: Collection,
        id: &DocumentId,
    ) -> Result<Option<Value>, StoreError> {
        let path = self.document_path(collection, id);
        self.read_document(&path).await.map_err(|e| match e {
            StoreError::Serialization(err) => StoreError::Corrupt {
                collection,
                id: id.to_string(),
                message: err.to_string(),
            },
            other => other,
        })
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[async_trait]
impl DocumentStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn create(&self, collection: Collection, doc: Value) -> Result<DocumentId, StoreError> {
        let id = DocumentId::new();
        let doc = stamp_created(doc, &id, Utc::now())?;
        let path = self.document_path(collection, &id);
        self.write_document(&path, &doc).await?;
        tracing::debug!(%collection, %id, path = %path.display(), "created document");
        Ok(id)
    }

    async fn find_by_id(
        &self,
        collection: Collection,
        id: &DocumentId,
    ) -> Result<Option<Value>, StoreError> {
        self.load(collection, id).await
    }

    /// Scans the collection directory. Unreadable or corrupt files are
    /// skipped with a warning.
    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Vec<Value>, StoreError> {
        let dir = self.collection_dir(collection);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&dir, e)),
        };

        let mut docs = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(&dir, e))? {
            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            match self.read_document(&path).await {
                Ok(Some(doc)) if filter.matches(&doc) => docs.push(doc),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "skipping unreadable document"
                    );
                }
            }
        }
        Ok(docs)
    }

    async fn update_by_id(
        &self,
        collection: Collection,
        id: &DocumentId,
        doc: Value,
    ) -> Result<Option<Value>, StoreError> {
        let Some(existing) = self.load(collection, id).await? else {
            return Ok(None);
        };
        let updated = stamp_updated(&existing, doc, Utc::now())?;
        self.write_document(&self.document_path(collection, id), &updated)
            .await?;
        tracing::debug!(%collection, %id, "updated document");
        Ok(Some(updated))
    }

    async fn delete_by_id(
        &self,
        collection: Collection,
        id: &DocumentId,
    ) -> Result<Option<Value>, StoreError> {
        let Some(existing) = self.load(collection, id).await? else {
            return Ok(None);
        };
        let path = self.document_path(collection, id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&path, e)),
        }
        tracing::debug!(%collection, %id, "deleted document");
        Ok(Some(existing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let id = FileStore::new(dir.path())
            .create(Collection::Forms, json!({ "title": "kept" }))
            .await
            .unwrap();

        assert!(dir
            .path()
            .join("forms")
            .join(format!("{id}.json"))
            .exists());

        let reopened = FileStore::new(dir.path());
        let doc = reopened
            .find_by_id(Collection::Forms, &id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc["title"], "kept");
    }

    #[tokio::test]
    async fn empty_collection_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(store
            .find(Collection::Responses, &Filter::all())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn find_skips_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store
            .create(Collection::Responses, json!({ "formId": "a" }))
            .await
            .unwrap();
        std::fs::write(dir.path().join("responses").join("broken.json"), "{ not json").unwrap();
        std::fs::write(dir.path().join("responses").join("notes.txt"), "ignored").unwrap();

        let docs = store
            .find(Collection::Responses, &Filter::all())
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[tokio::test]
    async fn corrupt_document_by_id_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let id = DocumentId::new();
        std::fs::create_dir_all(dir.path().join("forms")).unwrap();
        std::fs::write(store.document_path(Collection::Forms, &id), "[").unwrap();

        let err = store.find_by_id(Collection::Forms, &id).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn update_and_delete_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let id = store
            .create(Collection::Forms, json!({ "title": "a" }))
            .await
            .unwrap();
        let created = store
            .find_by_id(Collection::Forms, &id)
            .await
            .unwrap()
            .unwrap();

        let updated = store
            .update_by_id(Collection::Forms, &id, json!({ "title": "b" }))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated["title"], "b");
        assert_eq!(updated["createdAt"], created["createdAt"]);

        let removed = store
            .delete_by_id(Collection::Forms, &id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(removed["title"], "b");
        assert!(store
            .find_by_id(Collection::Forms, &id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_updates_never_expose_partial_documents() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(FileStore::new(dir.path()));
        let id = store
            .create(Collection::Forms, json!({ "title": "start" }))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for writer in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                for round in 0..50 {
                    let title = format!("writer {writer} round {round}");
                    let updated = store
                        .update_by_id(Collection::Forms, &id, json!({ "title": title }))
                        .await
                        .unwrap();
                    assert!(updated.is_some());
                    let read = store
                        .find_by_id(Collection::Forms, &id)
                        .await
                        .unwrap()
                        .unwrap();
                    assert!(read["title"].as_str().unwrap().starts_with("writer "));
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let docs = store.find(Collection::Forms, &Filter::all()).await.unwrap();
        assert_eq!(docs.len(), 1);
        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("forms"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .filter(|name| name.to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "{leftovers:?}");
    }
}
