//! Form and response operations over a [`DocumentStore`].

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::assemble::{assemble_response, resolve_form_reference};
use crate::error::{FormError, StoreError};
use crate::model::{FormDefinition, FormResponse, DEFAULT_TITLE};
use crate::parser::{parse_definition_with_title, parse_submission};
use crate::statistics::{summarize_responses, ResponseSummary};
use crate::traits::{Collection, DocumentId, DocumentStore, Filter, Stored};
use crate::validate::ensure_valid;

pub type StoredForm = Stored<FormDefinition>;
pub type StoredResponse = Stored<FormResponse>;

/// Title and description of the form a response refers to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSummary {
    pub title: String,
    pub description: String,
}

/// A stored response joined with its form, if the form still exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseListing {
    #[serde(flatten)]
    pub response: StoredResponse,
    #[serde(default)]
    pub form: Option<FormSummary>,
}

/// Application service for saving forms and recording responses.
pub struct FormService {
    store: Arc<dyn DocumentStore>,
    default_title: String,
}

impl FormService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            default_title: DEFAULT_TITLE.to_string(),
        }
    }

    /// Title given to definitions saved without one.
    pub fn with_default_title(mut self, title: impl Into<String>) -> Self {
        self.default_title = title.into();
        self
    }

    // -- Forms --------------------------------------------------------------

    /// Validate and persist a new form definition.
    pub async fn save_definition(&self, payload: &Value) -> Result<StoredForm, FormError> {
        let definition = parse_definition_with_title(payload, &self.default_title)?;
        self.create_definition(definition).await
    }

    /// Persist an already-typed definition after validating it.
    pub async fn create_definition(
        &self,
        definition: FormDefinition,
    ) -> Result<StoredForm, FormError> {
        ensure_valid(&definition.form)?;
        let doc = serde_json::to_value(&definition).map_err(StoreError::from)?;
        let id = self.store.create(Collection::Forms, doc).await?;
        tracing::info!(
            %id,
            title = %definition.title,
            questions = definition.form.len(),
            "saved form definition"
        );
        self.fetch(Collection::Forms, id).await
    }

    /// All definitions, newest first.
    pub async fn list_definitions(&self) -> Result<Vec<StoredForm>, FormError> {
        let mut forms = self
            .find_all::<FormDefinition>(Collection::Forms, &Filter::all())
            .await?;
        forms.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(forms)
    }

    pub async fn get_definition(&self, id: &str) -> Result<StoredForm, FormError> {
        let id = parse_id(Collection::Forms, id)?;
        self.fetch(Collection::Forms, id).await
    }

    /// Replace a definition's title, description, questions and meta.
    ///
    /// Defaults are re-applied to missing fields and the new questions are
    /// validated before anything is written.
    pub async fn update_definition(
        &self,
        id: &str,
        payload: &Value,
    ) -> Result<StoredForm, FormError> {
        let id = parse_id(Collection::Forms, id)?;
        let definition = parse_definition_with_title(payload, &self.default_title)?;
        let doc = serde_json::to_value(&definition).map_err(StoreError::from)?;
        let updated = self
            .store
            .update_by_id(Collection::Forms, &id, doc)
            .await?
            .ok_or(FormError::NotFound {
                collection: Collection::Forms,
                id,
            })?;
        tracing::info!(%id, title = %definition.title, "updated form definition");
        Ok(Stored::from_document(Collection::Forms, updated)?)
    }

    /// Delete a definition. Responses that reference it are kept.
    pub async fn delete_definition(&self, id: &str) -> Result<StoredForm, FormError> {
        let id = parse_id(Collection::Forms, id)?;
        let removed = self
            .store
            .delete_by_id(Collection::Forms, &id)
            .await?
            .ok_or(FormError::NotFound {
                collection: Collection::Forms,
                id,
            })?;
        tracing::info!(%id, "deleted form definition");
        Ok(Stored::from_document(Collection::Forms, removed)?)
    }

    // -- Responses ----------------------------------------------------------

    /// Validate, evaluate and persist a response submission.
    ///
    /// The snapshot comes from `formSnapshot`/`form` in the payload; when
    /// absent and `formId` names a stored form, that form's questions are
    /// used instead.
    pub async fn submit_response(&self, payload: &Value) -> Result<StoredResponse, FormError> {
        let submission = parse_submission(payload)?;
        let form_id = resolve_form_reference(submission.form_id.as_ref());

        let snapshot = match (submission.form_snapshot, form_id) {
            (Some(snapshot), _) => snapshot,
            (None, Some(id)) => {
                match self.try_fetch::<FormDefinition>(Collection::Forms, id).await? {
                    Some(stored) => stored.document.form,
                    None => {
                        tracing::warn!(form_id = %id, "referenced form not found, empty snapshot");
                        Vec::new()
                    }
                }
            }
            (None, None) => Vec::new(),
        };

        let response = assemble_response(
            &snapshot,
            &submission.answers,
            form_id,
            Some(submission.meta),
        )?;
        let doc = serde_json::to_value(&response).map_err(StoreError::from)?;
        let id = self.store.create(Collection::Responses, doc).await?;
        tracing::info!(
            %id,
            form_id = ?response.form_id,
            answers = response.answers.len(),
            quotas_passed = response.all_quotas_passed(),
            "recorded response"
        );
        self.fetch(Collection::Responses, id).await
    }

    pub async fn get_response(&self, id: &str) -> Result<StoredResponse, FormError> {
        let id = parse_id(Collection::Responses, id)?;
        self.fetch(Collection::Responses, id).await
    }

    /// Responses, newest submission first, each joined with its form.
    ///
    /// A `form_id` that is not a valid identifier is ignored and every
    /// response is listed.
    pub async fn list_responses(
        &self,
        form_id: Option<&str>,
    ) -> Result<Vec<ResponseListing>, FormError> {
        let filter = match form_id {
            Some(raw) => match DocumentId::parse(raw) {
                Some(id) => Filter::all().eq("formId", id.to_string()),
                None => {
                    tracing::warn!(form_id = raw, "ignoring malformed form id filter");
                    Filter::all()
                }
            },
            None => Filter::all(),
        };

        let mut responses = self
            .find_all::<FormResponse>(Collection::Responses, &filter)
            .await?;
        responses.sort_by(|a, b| b.document.submitted_at.cmp(&a.document.submitted_at));

        let mut forms: BTreeMap<DocumentId, Option<FormSummary>> = BTreeMap::new();
        let mut listings = Vec::with_capacity(responses.len());
        for response in responses {
            let form = match response.document.form_id {
                Some(id) => {
                    if !forms.contains_key(&id) {
                        let summary = self
                            .try_fetch::<FormDefinition>(Collection::Forms, id)
                            .await?
                            .map(|f| FormSummary {
                                title: f.document.title,
                                description: f.document.description,
                            });
                        forms.insert(id, summary);
                    }
                    forms.get(&id).cloned().flatten()
                }
                None => None,
            };
            listings.push(ResponseListing { response, form });
        }
        Ok(listings)
    }

    /// Aggregate statistics for one form's responses.
    pub async fn form_statistics(&self, id: &str) -> Result<ResponseSummary, FormError> {
        let form = self.get_definition(id).await?;
        let filter = Filter::all().eq("formId", form.id.to_string());
        let responses: Vec<FormResponse> = self
            .find_all::<FormResponse>(Collection::Responses, &filter)
            .await?
            .into_iter()
            .map(|r| r.document)
            .collect();
        Ok(summarize_responses(&form.document.form, &responses))
    }

    // -- Helpers ------------------------------------------------------------

    async fn try_fetch<T: serde::de::DeserializeOwned>(
        &self,
        collection: Collection,
        id: DocumentId,
    ) -> Result<Option<Stored<T>>, FormError> {
        match self.store.find_by_id(collection, &id).await? {
            Some(doc) => Ok(Some(Stored::from_document(collection, doc)?)),
            None => Ok(None),
        }
    }

    async fn fetch<T: serde::de::DeserializeOwned>(
        &self,
        collection: Collection,
        id: DocumentId,
    ) -> Result<Stored<T>, FormError> {
        self.try_fetch(collection, id)
            .await?
            .ok_or(FormError::NotFound { collection, id })
    }

    async fn find_all<T: serde::de::DeserializeOwned>(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Vec<Stored<T>>, FormError> {
        let docs = self.store.find(collection, filter).await?;
        docs.into_iter()
            .map(|doc| Stored::from_document(collection, doc).map_err(FormError::from))
            .collect()
    }
}

fn parse_id(collection: Collection, raw: &str) -> Result<DocumentId, FormError> {
    DocumentId::parse(raw).ok_or_else(|| FormError::InvalidId {
        collection,
        id: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorClass;
    use crate::traits::{stamp_created, stamp_updated};
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::json;
    use std::sync::Mutex;

    /// Minimal in-process store for exercising the service.
    #[derive(Default)]
    struct VecStore {
        docs: Mutex<Vec<(Collection, DocumentId, Value)>>,
    }

    #[async_trait]
    impl DocumentStore for VecStore {
        fn name(&self) -> &str {
            "vec"
        }

        async fn create(
            &self,
            collection: Collection,
            doc: Value,
        ) -> Result<DocumentId, StoreError> {
            let id = DocumentId::new();
            let doc = stamp_created(doc, &id, Utc::now())?;
            self.docs.lock().unwrap().push((collection, id, doc));
            Ok(id)
        }

        async fn find_by_id(
            &self,
            collection: Collection,
            id: &DocumentId,
        ) -> Result<Option<Value>, StoreError> {
            let docs = self.docs.lock().unwrap();
            Ok(docs
                .iter()
                .find(|(c, i, _)| *c == collection && i == id)
                .map(|(_, _, d)| d.clone()))
        }

        async fn find(
            &self,
            collection: Collection,
            filter: &Filter,
        ) -> Result<Vec<Value>, StoreError> {
            let docs = self.docs.lock().unwrap();
            Ok(docs
                .iter()
                .filter(|(c, _, d)| *c == collection && filter.matches(d))
                .map(|(_, _, d)| d.clone())
                .collect())
        }

        async fn update_by_id(
            &self,
            collection: Collection,
            id: &DocumentId,
            doc: Value,
        ) -> Result<Option<Value>, StoreError> {
            let mut docs = self.docs.lock().unwrap();
            let entry = docs.iter_mut().find(|(c, i, _)| *c == collection && i == id);
            let Some(entry) = entry else {
                return Ok(None);
            };
            entry.2 = stamp_updated(&entry.2, doc, Utc::now())?;
            Ok(Some(entry.2.clone()))
        }

        async fn delete_by_id(
            &self,
            collection: Collection,
            id: &DocumentId,
        ) -> Result<Option<Value>, StoreError> {
            let mut docs = self.docs.lock().unwrap();
            let position = docs.iter().position(|(c, i, _)| *c == collection && i == id);
            Ok(position.map(|p| docs.remove(p).2))
        }
    }

    fn service() -> FormService {
        FormService::new(Arc::new(VecStore::default()))
    }

    fn color_form() -> Value {
        json!({
            "title": "Colors",
            "form": [
                {
                    "question": "Color?",
                    "type": "radio",
                    "options": ["Red", "Blue"],
                    "logic": [{ "option": "Red", "showQuestions": [1] }],
                    "quota": { "condition": "=", "value": 10 }
                },
                { "question": "Shade?", "type": "checkbox", "options": ["Light", "Dark"] }
            ]
        })
    }

    #[tokio::test]
    async fn save_applies_defaults() {
        let service = service().with_default_title("Survey");
        let saved = service
            .save_definition(&json!({
                "form": [{ "question": "Q", "type": "radio", "options": ["A"] }]
            }))
            .await
            .unwrap();
        assert_eq!(saved.document.title, "Survey");
        assert_eq!(saved.document.description, "");
        assert!(saved.document.meta.is_empty());
        assert_eq!(saved.created_at, saved.updated_at);
    }

    #[tokio::test]
    async fn invalid_and_missing_ids_are_classified() {
        let service = service();
        let err = service.get_definition("nope").await.unwrap_err();
        assert_eq!(err.class(), ErrorClass::Client);

        let err = service
            .get_definition(&DocumentId::new().to_string())
            .await
            .unwrap_err();
        assert_eq!(err.class(), ErrorClass::NotFound);
    }

    #[tokio::test]
    async fn submit_uses_stored_form_when_snapshot_missing() {
        let service = service();
        let form = service.save_definition(&color_form()).await.unwrap();

        let response = service
            .submit_response(&json!({
                "formId": form.id.to_string(),
                "answers": [{ "questionIndex": 0, "answer": "Red", "value": 10 }]
            }))
            .await
            .unwrap();

        assert_eq!(response.document.form_id, Some(form.id));
        assert_eq!(response.document.form_snapshot, form.document.form);
        assert_eq!(response.document.evaluated_quotas.len(), 1);
        assert!(response.document.evaluated_quotas[0].passed);
    }

    #[tokio::test]
    async fn invalid_form_id_is_dropped() {
        let service = service();
        let response = service
            .submit_response(&json!({ "formId": "123", "answers": [] }))
            .await
            .unwrap();
        assert_eq!(response.document.form_id, None);
        assert!(response.document.form_snapshot.is_empty());
    }

    #[tokio::test]
    async fn listing_joins_form_and_ignores_bad_filter() {
        let service = service();
        let form = service.save_definition(&color_form()).await.unwrap();
        service
            .submit_response(&json!({ "formId": form.id.to_string(), "answers": [] }))
            .await
            .unwrap();
        service
            .submit_response(&json!({ "answers": [] }))
            .await
            .unwrap();

        let filtered = service
            .list_responses(Some(&form.id.to_string()))
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].form.as_ref().unwrap().title, "Colors");

        let all = service.list_responses(Some("garbage")).await.unwrap();
        assert_eq!(all.len(), 2);
    }
}
