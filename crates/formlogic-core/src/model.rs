//! Core data model types for formlogic.
//!
//! These are the documents that flow through the engine and the store:
//! form definitions with their question blocks, submitted answers, evaluated
//! quotas, and the persisted response record.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::traits::DocumentId;

/// Title given to forms saved without one.
pub const DEFAULT_TITLE: &str = "Untitled form";

/// Free-form metadata attached to forms, answers, and responses.
pub type Meta = Map<String, Value>;

/// How a question collects its answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    /// Exactly one option may be selected.
    #[default]
    Radio,
    /// Any number of options may be selected.
    Checkbox,
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionType::Radio => write!(f, "radio"),
            QuestionType::Checkbox => write!(f, "checkbox"),
        }
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "radio" => Ok(QuestionType::Radio),
            "checkbox" => Ok(QuestionType::Checkbox),
            other => Err(format!("must be 'radio' or 'checkbox', got {other:?}")),
        }
    }
}

/// Comparison applied by a quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuotaCondition {
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = ">")]
    GreaterThan,
}

impl QuotaCondition {
    /// Evaluate `lhs <condition> rhs`. `=` is exact equality, `<`/`>` are strict.
    pub fn holds(self, lhs: f64, rhs: f64) -> bool {
        match self {
            QuotaCondition::Equal => lhs == rhs,
            QuotaCondition::LessThan => lhs < rhs,
            QuotaCondition::GreaterThan => lhs > rhs,
        }
    }
}

impl fmt::Display for QuotaCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuotaCondition::Equal => write!(f, "="),
            QuotaCondition::LessThan => write!(f, "<"),
            QuotaCondition::GreaterThan => write!(f, ">"),
        }
    }
}

impl FromStr for QuotaCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "=" => Ok(QuotaCondition::Equal),
            "<" => Ok(QuotaCondition::LessThan),
            ">" => Ok(QuotaCondition::GreaterThan),
            other => Err(format!("must be '=', '<' or '>', got {other:?}")),
        }
    }
}

/// A numeric pass/fail condition attached to a question.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quota {
    pub condition: QuotaCondition,
    pub value: f64,
}

/// A quota checked against another question when a rule's option is selected.
///
/// Produces an option-level [`EvaluatedQuota`] (one with `option` set).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaCheck {
    /// Question whose answer supplies the comparator.
    pub question_index: usize,
    pub condition: QuotaCondition,
    pub value: f64,
}

/// Maps a selected option to the questions it reveals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogicRule {
    /// The triggering option label.
    pub option: String,
    /// 0-based indices of the questions revealed when `option` is selected.
    #[serde(default)]
    pub show_questions: BTreeSet<usize>,
    #[serde(default, rename = "quotaCheck", skip_serializing_if = "Vec::is_empty")]
    pub quota_checks: Vec<QuotaCheck>,
}

impl LogicRule {
    pub fn new(
        option: impl Into<String>,
        show_questions: impl IntoIterator<Item = usize>,
    ) -> Self {
        Self {
            option: option.into(),
            show_questions: show_questions.into_iter().collect(),
            quota_checks: Vec::new(),
        }
    }
}

/// One question plus its options, branching logic, and quota.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionBlock {
    pub question: String,
    #[serde(rename = "type", default)]
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub logic: Vec<LogicRule>,
    #[serde(default)]
    pub quota: Option<Quota>,
}

impl QuestionBlock {
    /// A radio question with the given options and no logic or quota.
    pub fn radio(question: impl Into<String>, options: &[&str]) -> Self {
        Self::with_type(question, QuestionType::Radio, options)
    }

    /// A checkbox question with the given options and no logic or quota.
    pub fn checkbox(question: impl Into<String>, options: &[&str]) -> Self {
        Self::with_type(question, QuestionType::Checkbox, options)
    }

    fn with_type(
        question: impl Into<String>,
        question_type: QuestionType,
        options: &[&str],
    ) -> Self {
        Self {
            question: question.into(),
            question_type,
            options: options.iter().map(|o| o.to_string()).collect(),
            logic: Vec::new(),
            quota: None,
        }
    }

    /// Add a rule revealing `show` when `option` is selected.
    pub fn reveal(mut self, option: &str, show: impl IntoIterator<Item = usize>) -> Self {
        self.logic.push(LogicRule::new(option, show));
        self
    }

    /// Attach a question-level quota.
    pub fn with_quota(mut self, condition: QuotaCondition, value: f64) -> Self {
        self.quota = Some(Quota { condition, value });
        self
    }

    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }
}

/// The authored question set, options, and rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormDefinition {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub form: Vec<QuestionBlock>,
    #[serde(default)]
    pub meta: Meta,
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

impl FormDefinition {
    pub fn new(form: Vec<QuestionBlock>) -> Self {
        Self {
            title: default_title(),
            description: String::new(),
            form,
            meta: Meta::new(),
        }
    }
}

/// One submitted answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerItem {
    pub question_index: usize,
    /// Question text at submit time; may be empty.
    #[serde(default)]
    pub question_text: String,
    /// Selected option labels; empty for unanswered or hidden questions.
    #[serde(default)]
    pub answer: Vec<String>,
    /// Numeric payload used for quota comparison.
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub meta: Meta,
}

impl AnswerItem {
    pub fn new(question_index: usize, answer: &[&str]) -> Self {
        Self {
            question_index,
            question_text: String::new(),
            answer: answer.iter().map(|a| a.to_string()).collect(),
            value: None,
            meta: Meta::new(),
        }
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// The numeric reading of `value`, if it has one.
    ///
    /// Numbers are taken as-is and numeric strings are parsed. Anything else
    /// (booleans, non-numeric strings, null) has no numeric reading.
    pub fn numeric_value(&self) -> Option<f64> {
        match self.value.as_ref()? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    /// The comparator a quota is checked against: `value` if numeric,
    /// otherwise the number of selected options.
    pub fn comparator(&self) -> f64 {
        self.numeric_value().unwrap_or(self.answer.len() as f64)
    }
}

/// The recorded result of checking one quota at submission time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluatedQuota {
    pub question_index: usize,
    /// `None` for question-level quotas, the triggering option otherwise.
    #[serde(default)]
    pub option: Option<String>,
    pub condition: QuotaCondition,
    pub value: f64,
    pub passed: bool,
}

/// A respondent's submitted answers plus a snapshot of the form and quota results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormResponse {
    /// Weak reference to the live definition; `None` for anonymous responses.
    #[serde(default)]
    pub form_id: Option<DocumentId>,
    /// The question sequence as it existed at submit time.
    #[serde(default)]
    pub form_snapshot: Vec<QuestionBlock>,
    #[serde(default)]
    pub answers: Vec<AnswerItem>,
    #[serde(default)]
    pub evaluated_quotas: Vec<EvaluatedQuota>,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub meta: Meta,
}

impl FormResponse {
    /// Whether every evaluated quota passed (vacuously true with none).
    pub fn all_quotas_passed(&self) -> bool {
        self.evaluated_quotas.iter().all(|q| q.passed)
    }
}
