//! Raw JSON payload parsing for form definitions and submissions.
//!
//! Payloads arrive as loosely shaped JSON. Parsing walks them field by field
//! so every problem is reported with its question index and field path
//! instead of a single opaque decode error.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use crate::assemble::RawAnswerItem;
use crate::error::{FormError, ValidationError, ValidationErrorKind};
use crate::model::{
    FormDefinition, LogicRule, Meta, QuestionBlock, QuestionType, Quota, QuotaCheck,
    QuotaCondition, DEFAULT_TITLE,
};
use crate::validate::validate_definition;

/// Parse and validate a form definition payload.
///
/// `title` and `description` fall back to their defaults when missing or
/// empty. Shape errors (wrong types, unknown question type, non-array
/// options) are reported first; a shape-correct payload then goes through
/// [`validate_definition`].
pub fn parse_definition(payload: &Value) -> Result<FormDefinition, FormError> {
    parse_definition_with_title(payload, DEFAULT_TITLE)
}

/// Like [`parse_definition`] with a configurable default title.
pub fn parse_definition_with_title(
    payload: &Value,
    default_title: &str,
) -> Result<FormDefinition, FormError> {
    let mut errors = Vec::new();

    let Some(obj) = payload.as_object() else {
        return Err(FormError::MalformedDefinition(vec![
            ValidationError::definition(None, "payload", "payload must be a JSON object"),
        ]));
    };

    let title =
        non_empty_string(obj, "title", &mut errors).unwrap_or_else(|| default_title.into());
    let description = non_empty_string(obj, "description", &mut errors).unwrap_or_default();
    let meta = parse_meta(
        obj.get("meta"),
        None,
        ValidationErrorKind::MalformedDefinition,
        &mut errors,
    );

    let form = match obj.get("form") {
        Some(Value::Array(blocks)) => blocks
            .iter()
            .enumerate()
            .filter_map(|(i, block)| parse_question_block(i, block, &mut errors))
            .collect(),
        _ => {
            errors.push(ValidationError::definition(
                None,
                "form",
                "missing form array",
            ));
            Vec::new()
        }
    };

    if !errors.is_empty() {
        return Err(FormError::MalformedDefinition(errors));
    }

    let errors = validate_definition(&form);
    if !errors.is_empty() {
        return Err(FormError::MalformedDefinition(errors));
    }

    Ok(FormDefinition {
        title,
        description,
        form,
        meta,
    })
}

/// Read a JSON file into a value.
pub fn read_json_file(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse JSON: {}", path.display()))
}

/// Recursively collect `.json` files under a directory, sorted by path.
pub fn find_json_files(dir: &Path) -> Result<Vec<std::path::PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_dir() {
            files.extend(find_json_files(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn non_empty_string(
    obj: &Map<String, Value>,
    field: &str,
    errors: &mut Vec<ValidationError>,
) -> Option<String> {
    match obj.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            errors.push(ValidationError::definition(None, field, "must be a string"));
            None
        }
    }
}

/// Parse an optional `meta` object; missing or null yields an empty map.
pub(crate) fn parse_meta(
    value: Option<&Value>,
    index: Option<usize>,
    kind: ValidationErrorKind,
    errors: &mut Vec<ValidationError>,
) -> Meta {
    match value {
        None | Some(Value::Null) => Meta::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(_) => {
            errors.push(ValidationError {
                kind,
                index,
                field: "meta".into(),
                message: "must be an object".into(),
            });
            Meta::new()
        }
    }
}

fn parse_question_block(
    i: usize,
    value: &Value,
    errors: &mut Vec<ValidationError>,
) -> Option<QuestionBlock> {
    let Some(obj) = value.as_object() else {
        errors.push(ValidationError::definition(
            Some(i),
            "question",
            "question block must be an object",
        ));
        return None;
    };
    let before = errors.len();

    let question = match obj.get("question") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        _ => {
            errors.push(ValidationError::definition(
                Some(i),
                "question",
                "missing question text",
            ));
            String::new()
        }
    };

    let question_type = match obj.get("type").and_then(Value::as_str) {
        Some(s) => s.parse::<QuestionType>().unwrap_or_else(|msg| {
            errors.push(ValidationError::definition(Some(i), "type", msg));
            QuestionType::default()
        }),
        None => {
            errors.push(ValidationError::definition(
                Some(i),
                "type",
                "must be 'radio' or 'checkbox'",
            ));
            QuestionType::default()
        }
    };

    let options = match obj.get("options") {
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .filter_map(|(o, item)| match item {
                Value::String(s) => Some(s.clone()),
                _ => {
                    errors.push(ValidationError::definition(
                        Some(i),
                        format!("options[{o}]"),
                        "option must be a string",
                    ));
                    None
                }
            })
            .collect(),
        _ => {
            errors.push(ValidationError::definition(
                Some(i),
                "options",
                "must be an array",
            ));
            Vec::new()
        }
    };

    let logic = match obj.get("logic") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(rules)) => rules
            .iter()
            .enumerate()
            .filter_map(|(r, rule)| parse_logic_rule(i, r, rule, errors))
            .collect(),
        Some(_) => {
            errors.push(ValidationError::definition(
                Some(i),
                "logic",
                "must be an array",
            ));
            Vec::new()
        }
    };

    let quota = match obj.get("quota") {
        None | Some(Value::Null) => None,
        Some(q) => parse_quota(q)
            .map(|(condition, value)| Quota { condition, value })
            .map_err(|msg| errors.push(ValidationError::definition(Some(i), "quota", msg)))
            .ok(),
    };

    (errors.len() == before).then_some(QuestionBlock {
        question,
        question_type,
        options,
        logic,
        quota,
    })
}

fn parse_logic_rule(
    i: usize,
    r: usize,
    value: &Value,
    errors: &mut Vec<ValidationError>,
) -> Option<LogicRule> {
    let field = |name: &str| format!("logic[{r}].{name}");

    let Some(option) = value.get("option").and_then(Value::as_str) else {
        errors.push(ValidationError::definition(
            Some(i),
            field("option"),
            "rule must name a triggering option",
        ));
        return None;
    };

    let show_questions = match value.get("showQuestions") {
        None | Some(Value::Null) => BTreeSet::new(),
        Some(Value::Array(items)) => {
            let mut indices = BTreeSet::new();
            for item in items {
                match as_index(item) {
                    Some(j) => {
                        indices.insert(j);
                    }
                    None => {
                        errors.push(ValidationError::definition(
                            Some(i),
                            field("showQuestions"),
                            format!("{item} is not a question index"),
                        ));
                        return None;
                    }
                }
            }
            indices
        }
        Some(_) => {
            errors.push(ValidationError::definition(
                Some(i),
                field("showQuestions"),
                "must be an array of question indices",
            ));
            return None;
        }
    };

    let mut quota_checks = Vec::new();
    match value.get("quotaCheck") {
        None | Some(Value::Null) => {}
        Some(Value::Array(checks)) => {
            for (c, check) in checks.iter().enumerate() {
                let question_index = check.get("questionIndex").and_then(as_index);
                match (question_index, parse_quota(check)) {
                    (Some(question_index), Ok((condition, value))) => {
                        quota_checks.push(QuotaCheck {
                            question_index,
                            condition,
                            value,
                        });
                    }
                    (None, _) => {
                        errors.push(ValidationError::definition(
                            Some(i),
                            field(&format!("quotaCheck[{c}].questionIndex")),
                            "must be a question index",
                        ));
                        return None;
                    }
                    (_, Err(msg)) => {
                        errors.push(ValidationError::definition(
                            Some(i),
                            field(&format!("quotaCheck[{c}]")),
                            msg,
                        ));
                        return None;
                    }
                }
            }
        }
        Some(_) => {
            errors.push(ValidationError::definition(
                Some(i),
                field("quotaCheck"),
                "must be an array",
            ));
            return None;
        }
    }

    Some(LogicRule {
        option: option.to_string(),
        show_questions,
        quota_checks,
    })
}

fn parse_quota(value: &Value) -> Result<(QuotaCondition, f64), String> {
    let condition = value
        .get("condition")
        .and_then(Value::as_str)
        .ok_or_else(|| "condition must be '=', '<' or '>'".to_string())?
        .parse::<QuotaCondition>()?;
    let number = value
        .get("value")
        .and_then(Value::as_f64)
        .ok_or_else(|| "value must be a number".to_string())?;
    Ok((condition, number))
}

/// A non-negative integral JSON number (`2` or `2.0`) as an index.
pub(crate) fn as_index(value: &Value) -> Option<usize> {
    if let Some(n) = value.as_u64() {
        return usize::try_from(n).ok();
    }
    let f = value.as_f64()?;
    (f >= 0.0 && f.fract() == 0.0 && f <= usize::MAX as f64).then_some(f as usize)
}

// ---------------------------------------------------------------------------
// Submissions
// ---------------------------------------------------------------------------

/// A response submission as sent by a respondent's client.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    /// Raw `formId`; validated leniently by the assembler.
    pub form_id: Option<Value>,
    /// Snapshot sent as `formSnapshot` (or `form`), if any.
    pub form_snapshot: Option<Vec<QuestionBlock>>,
    pub answers: Vec<RawAnswerItem>,
    pub meta: Meta,
}

/// Parse a submission payload.
///
/// Accepts either an object carrying an `answers` array or a bare array of
/// answers. Client-supplied `evaluatedQuotas` are ignored; they are always
/// recomputed from the answers.
pub fn parse_submission(payload: &Value) -> Result<Submission, FormError> {
    let mut errors = Vec::new();

    let (obj, answers) = match payload {
        Value::Array(items) => (None, Some(items)),
        Value::Object(obj) => match obj.get("answers") {
            Some(Value::Array(items)) => (Some(obj), Some(items)),
            _ => (Some(obj), None),
        },
        _ => (None, None),
    };

    let Some(answers) = answers else {
        return Err(FormError::MalformedAnswer(vec![ValidationError::answer(
            None,
            "answers",
            "missing answers array",
        )]));
    };

    let answers = answers
        .iter()
        .enumerate()
        .filter_map(|(n, item)| match item {
            Value::Object(_) => Some(RawAnswerItem::from_value(item.clone())),
            _ => {
                errors.push(ValidationError::answer(
                    Some(n),
                    "answer",
                    "answer item must be an object",
                ));
                None
            }
        })
        .collect();

    let mut submission = Submission {
        answers,
        ..Default::default()
    };

    if let Some(obj) = obj {
        submission.form_id = obj.get("formId").filter(|v| !v.is_null()).cloned();
        submission.meta = parse_meta(
            obj.get("meta"),
            None,
            ValidationErrorKind::MalformedAnswer,
            &mut errors,
        );

        let snapshot = obj
            .get("formSnapshot")
            .or_else(|| obj.get("form"))
            .filter(|v| !v.is_null());
        if let Some(snapshot) = snapshot {
            match serde_json::from_value::<Vec<QuestionBlock>>(snapshot.clone()) {
                Ok(blocks) => submission.form_snapshot = Some(blocks),
                Err(e) => errors.push(ValidationError::answer(
                    None,
                    "formSnapshot",
                    format!("not a list of question blocks: {e}"),
                )),
            }
        }
    }

    if errors.is_empty() {
        Ok(submission)
    } else {
        Err(FormError::MalformedAnswer(errors))
    }
}
