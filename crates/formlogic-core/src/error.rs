//! Error types for form validation, submission, and storage.
//!
//! Defined in `formlogic-core` so the service layer and every front end can
//! classify failures (client error, not found, server error) without string
//! matching.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::traits::{Collection, DocumentId};

/// Which kind of input a validation failure concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ValidationErrorKind {
    MalformedDefinition,
    MalformedAnswer,
    /// A `formId` that is not a well-formed identifier. Never fatal.
    InvalidReference,
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationErrorKind::MalformedDefinition => write!(f, "malformed definition"),
            ValidationErrorKind::MalformedAnswer => write!(f, "malformed answer"),
            ValidationErrorKind::InvalidReference => write!(f, "invalid reference"),
        }
    }
}

/// A single validation failure, pinpointing the offending record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    /// Question index for definitions, answer position for submissions.
    pub index: Option<usize>,
    /// Field path within the record (e.g. `logic[0].showQuestions`).
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn definition(
        index: Option<usize>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: ValidationErrorKind::MalformedDefinition,
            index,
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn answer(
        index: Option<usize>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: ValidationErrorKind::MalformedAnswer,
            index,
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn reference(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ValidationErrorKind::InvalidReference,
            index: None,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(i) => write!(f, "[{i}] {}: {}", self.field, self.message),
            None => write!(f, "{}: {}", self.field, self.message),
        }
    }
}

fn summarize(errors: &[ValidationError]) -> String {
    match errors {
        [] => "no details".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first} (and {} more)", rest.len()),
    }
}

/// How a failure should be reported to whoever made the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The caller sent something malformed.
    Client,
    /// The referenced document does not exist.
    NotFound,
    /// Anything else: storage failures, corrupt documents.
    Server,
}

impl ErrorClass {
    /// Process exit code used by the CLI front end.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorClass::Server => 1,
            ErrorClass::Client => 2,
            ErrorClass::NotFound => 3,
        }
    }
}

/// Errors raised by a document store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Documents must be JSON objects so the store can stamp `_id` and timestamps.
    #[error("document is not a JSON object")]
    NotAnObject,

    #[error("corrupt document {id} in {collection}: {message}")]
    Corrupt {
        collection: Collection,
        id: String,
        message: String,
    },
}

/// Errors produced by the form service and the validation front door.
#[derive(Debug, Error)]
pub enum FormError {
    #[error("malformed definition: {}", summarize(.0))]
    MalformedDefinition(Vec<ValidationError>),

    #[error("malformed answer: {}", summarize(.0))]
    MalformedAnswer(Vec<ValidationError>),

    #[error("invalid {collection} id: {id:?}")]
    InvalidId { collection: Collection, id: String },

    #[error("{collection} not found: {id}")]
    NotFound {
        collection: Collection,
        id: DocumentId,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl FormError {
    /// Classify this error the way a transport would map it to a status.
    pub fn class(&self) -> ErrorClass {
        match self {
            FormError::MalformedDefinition(_)
            | FormError::MalformedAnswer(_)
            | FormError::InvalidId { .. } => ErrorClass::Client,
            FormError::NotFound { .. } => ErrorClass::NotFound,
            FormError::Store(_) => ErrorClass::Server,
        }
    }

    /// The individual validation failures, if this is a validation error.
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            FormError::MalformedDefinition(errors) | FormError::MalformedAnswer(errors) => errors,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_errors() {
        let malformed = FormError::MalformedDefinition(vec![ValidationError::definition(
            Some(0),
            "question",
            "missing question text",
        )]);
        assert_eq!(malformed.class(), ErrorClass::Client);

        let not_found = FormError::NotFound {
            collection: Collection::Forms,
            id: DocumentId::new(),
        };
        assert_eq!(not_found.class(), ErrorClass::NotFound);

        let store = FormError::Store(StoreError::NotAnObject);
        assert_eq!(store.class(), ErrorClass::Server);
        assert_eq!(store.class().exit_code(), 1);
    }

    #[test]
    fn display_pinpoints_record() {
        let err = FormError::MalformedAnswer(vec![
            ValidationError::answer(Some(2), "questionIndex", "must be a non-negative integer"),
            ValidationError::answer(Some(3), "answer", "must be a sequence of strings"),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("[2] questionIndex"), "got: {msg}");
        assert!(msg.contains("1 more"), "got: {msg}");
        assert_eq!(err.validation_errors().len(), 2);
    }
}
