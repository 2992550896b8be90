//! Response assembly: normalize raw answers, run the engine, build the record.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::engine::evaluate;
use crate::error::{FormError, ValidationError, ValidationErrorKind};
use crate::model::{AnswerItem, FormResponse, Meta, QuestionBlock};
use crate::parser::{as_index, parse_meta};
use crate::traits::DocumentId;

/// An answer exactly as submitted, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawAnswerItem(Value);

impl RawAnswerItem {
    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    fn field(&self, name: &str) -> Option<&Value> {
        self.0.get(name).filter(|v| !v.is_null())
    }
}

impl From<Value> for RawAnswerItem {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Normalize one raw answer found at `position` in the submission.
///
/// - `questionIndex` must be a non-negative integer;
/// - `answer` may be an array of scalars, a bare scalar (wrapped into a
///   one-element sequence), or missing/null (empty sequence); objects and
///   nested arrays are rejected;
/// - `questionText`, `value` and `meta` default to `""`, null and `{}`.
pub fn normalize_answer(
    position: usize,
    raw: &RawAnswerItem,
) -> Result<AnswerItem, Vec<ValidationError>> {
    let mut errors = Vec::new();
    let at = Some(position);

    let question_index = match raw.field("questionIndex").and_then(as_index) {
        Some(i) => i,
        None => {
            errors.push(ValidationError::answer(
                at,
                "questionIndex",
                "must be a non-negative integer",
            ));
            0
        }
    };

    let question_text = match raw.field("questionText") {
        None => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(_) => {
            errors.push(ValidationError::answer(at, "questionText", "must be a string"));
            String::new()
        }
    };

    let answer = match raw.field("answer") {
        None => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| {
                let label = scalar_label(item);
                if label.is_none() {
                    errors.push(ValidationError::answer(
                        at,
                        "answer",
                        format!("{item} is not an option label"),
                    ));
                }
                label
            })
            .collect(),
        Some(scalar) => match scalar_label(scalar) {
            Some(label) => vec![label],
            None => {
                errors.push(ValidationError::answer(
                    at,
                    "answer",
                    "must be a sequence of option labels",
                ));
                Vec::new()
            }
        },
    };

    let value = raw.field("value").cloned();
    let meta = parse_meta(
        raw.field("meta"),
        at,
        ValidationErrorKind::MalformedAnswer,
        &mut errors,
    );

    if errors.is_empty() {
        Ok(AnswerItem {
            question_index,
            question_text,
            answer,
            value,
            meta,
        })
    } else {
        Err(errors)
    }
}

fn scalar_label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Normalize every raw answer, collecting all failures.
pub fn normalize_answers(raw: &[RawAnswerItem]) -> Result<Vec<AnswerItem>, FormError> {
    let mut answers = Vec::with_capacity(raw.len());
    let mut errors = Vec::new();
    for (position, item) in raw.iter().enumerate() {
        match normalize_answer(position, item) {
            Ok(answer) => answers.push(answer),
            Err(errs) => errors.extend(errs),
        }
    }
    if errors.is_empty() {
        Ok(answers)
    } else {
        Err(FormError::MalformedAnswer(errors))
    }
}

/// Interpret a submitted `formId`.
///
/// Anything that is not a well-formed identifier is treated as "no
/// reference" and logged; it never fails the submission.
pub fn resolve_form_reference(raw: Option<&Value>) -> Option<DocumentId> {
    let raw = raw.filter(|v| !v.is_null())?;
    let parsed = raw.as_str().and_then(DocumentId::parse);
    if parsed.is_none() {
        let notice = ValidationError::reference("formId", format!("{raw} is not a form id"));
        tracing::warn!(kind = %notice.kind, "{notice}; storing response without a form reference");
    }
    parsed
}

/// Build a persistable response from a form and raw answers.
///
/// Visibility and quotas are computed from the normalized answers; answers
/// to hidden questions are kept but do not contribute quota entries.
pub fn assemble_response(
    form: &[QuestionBlock],
    raw_answers: &[RawAnswerItem],
    form_id: Option<DocumentId>,
    meta: Option<Meta>,
) -> Result<FormResponse, FormError> {
    assemble_response_at(form, raw_answers, form_id, meta, Utc::now())
}

/// [`assemble_response`] with an explicit submission time.
pub fn assemble_response_at(
    form: &[QuestionBlock],
    raw_answers: &[RawAnswerItem],
    form_id: Option<DocumentId>,
    meta: Option<Meta>,
    submitted_at: DateTime<Utc>,
) -> Result<FormResponse, FormError> {
    let answers = normalize_answers(raw_answers)?;

    let stray = answers
        .iter()
        .filter(|a| a.question_index >= form.len())
        .count();
    if stray > 0 {
        tracing::debug!(
            stray,
            questions = form.len(),
            "answers reference questions outside the snapshot"
        );
    }

    let evaluation = evaluate(form, &answers);

    Ok(FormResponse {
        form_id,
        form_snapshot: form.to_vec(),
        answers,
        evaluated_quotas: evaluation.evaluated_quotas,
        submitted_at,
        meta: meta.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuotaCondition;
    use serde_json::json;

    fn raw(values: Vec<Value>) -> Vec<RawAnswerItem> {
        values.into_iter().map(RawAnswerItem::from).collect()
    }

    fn form() -> Vec<QuestionBlock> {
        vec![
            QuestionBlock::radio("Color?", &["Red", "Blue"])
                .reveal("Red", [1])
                .with_quota(QuotaCondition::Equal, 10.0),
            QuestionBlock::checkbox("Shade?", &["Light", "Dark"])
                .with_quota(QuotaCondition::GreaterThan, 1.0),
        ]
    }

    #[test]
    fn fills_defaults_and_wraps_scalars() {
        let answers = normalize_answers(&raw(vec![
            json!({ "questionIndex": 0, "answer": "Red" }),
            json!({ "questionIndex": 1, "answer": null, "value": 0 }),
            json!({ "questionIndex": 2.0, "answer": [3, true] }),
        ]))
        .unwrap();

        assert_eq!(answers[0].answer, vec!["Red"]);
        assert_eq!(answers[0].question_text, "");
        assert!(answers[0].value.is_none());
        assert!(answers[0].meta.is_empty());

        assert!(answers[1].answer.is_empty());
        assert_eq!(answers[1].value, Some(json!(0)));

        assert_eq!(answers[2].question_index, 2);
        assert_eq!(answers[2].answer, vec!["3", "true"]);
    }

    #[test]
    fn rejects_malformed_answers() {
        let err = normalize_answers(&raw(vec![
            json!({ "questionIndex": "0", "answer": ["A"] }),
            json!({ "questionIndex": 1, "answer": { "nested": true } }),
            json!({ "questionIndex": 2, "answer": [["A"]] }),
            json!({ "questionIndex": -1 }),
        ]))
        .unwrap_err();

        let located: Vec<(Option<usize>, &str)> = err
            .validation_errors()
            .iter()
            .map(|e| (e.index, e.field.as_str()))
            .collect();
        assert_eq!(
            located,
            vec![
                (Some(0), "questionIndex"),
                (Some(1), "answer"),
                (Some(2), "answer"),
                (Some(3), "questionIndex"),
            ]
        );
    }

    #[test]
    fn invalid_reference_becomes_absent() {
        let id = DocumentId::new();
        assert_eq!(resolve_form_reference(Some(&json!(id.to_string()))), Some(id));
        assert_eq!(resolve_form_reference(Some(&json!("not-an-id"))), None);
        assert_eq!(resolve_form_reference(Some(&json!(42))), None);
        assert_eq!(resolve_form_reference(Some(&Value::Null)), None);
        assert_eq!(resolve_form_reference(None), None);
    }

    #[test]
    fn assembles_response_with_quotas() {
        let form = form();
        let submitted_at = Utc::now();
        let meta: Meta = serde_json::from_value(json!({ "channel": "kiosk" })).unwrap();
        let response = assemble_response_at(
            &form,
            &raw(vec![
                json!({ "questionIndex": 0, "answer": ["Red"], "value": 10 }),
                json!({ "questionIndex": 1, "answer": ["Light", "Dark"] }),
            ]),
            None,
            Some(meta),
            submitted_at,
        )
        .unwrap();

        assert_eq!(response.form_snapshot, form);
        assert_eq!(response.submitted_at, submitted_at);
        assert_eq!(response.meta["channel"], "kiosk");
        assert_eq!(response.evaluated_quotas.len(), 2);
        assert!(response.all_quotas_passed());
    }

    #[test]
    fn hidden_answers_kept_but_not_evaluated() {
        let response = assemble_response(
            &form(),
            &raw(vec![
                json!({ "questionIndex": 0, "answer": "Blue", "value": 10 }),
                json!({ "questionIndex": 1, "answer": ["Light"] }),
            ]),
            None,
            None,
        )
        .unwrap();

        assert_eq!(response.answers.len(), 2);
        assert_eq!(response.evaluated_quotas.len(), 1);
        assert_eq!(response.evaluated_quotas[0].question_index, 0);
    }

    #[test]
    fn empty_form_produces_no_quotas() {
        let response = assemble_response(
            &[],
            &raw(vec![json!({ "questionIndex": 0, "answer": ["x"] })]),
            None,
            None,
        )
        .unwrap();
        assert!(response.evaluated_quotas.is_empty());
        assert_eq!(response.answers.len(), 1);
    }
}
