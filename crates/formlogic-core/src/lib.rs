//! formlogic-core: Form model, evaluation engine, and validation.
//!
//! This crate defines the form data model, the pure visibility/quota
//! evaluation engine, definition validation, response assembly, and the
//! document-store seam that the rest of formlogic builds on.

pub mod assemble;
pub mod engine;
pub mod error;
pub mod model;
pub mod parser;
pub mod service;
pub mod statistics;
pub mod traits;
pub mod validate;

pub use assemble::assemble_response;
pub use engine::{evaluate, evaluate_quotas, resolve_visibility, AnswerSet, Evaluation};
pub use error::{ErrorClass, FormError, StoreError, ValidationError, ValidationErrorKind};
pub use service::FormService;
pub use validate::validate_definition;
