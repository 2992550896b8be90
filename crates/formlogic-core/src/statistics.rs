//! Aggregate reporting over a form's responses.
//!
//! This is the "count of respondents" reading of quotas. It only reports;
//! per-response quota evaluation is unaffected.

use serde::{Deserialize, Serialize};

use crate::engine::AnswerSet;
use crate::model::{FormResponse, QuestionBlock};

/// How often one option was selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionTally {
    pub option: String,
    pub count: usize,
}

/// Pass/fail counts of a question-level quota across responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaTally {
    pub passed: usize,
    pub failed: usize,
}

/// Per-question aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSummary {
    pub index: usize,
    pub question: String,
    /// Responses that selected at least one option for this question.
    pub answered: usize,
    /// Counts in the question's option order.
    pub options: Vec<OptionTally>,
    /// Selections of labels that are not among the current options.
    pub other: usize,
    /// Present when the question carries a quota.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quota: Option<QuotaTally>,
}

/// Aggregate over every response to a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSummary {
    pub response_count: usize,
    /// Responses in which every evaluated quota passed.
    pub all_quotas_passed: usize,
    pub questions: Vec<QuestionSummary>,
}

/// Summarize `responses` against the current definition `form`.
///
/// Answers are matched by question index. Labels that no longer exist in
/// the definition (e.g. after an edit) are counted under `other`.
pub fn summarize_responses(
    form: &[QuestionBlock],
    responses: &[FormResponse],
) -> ResponseSummary {
    let mut questions: Vec<QuestionSummary> = form
        .iter()
        .enumerate()
        .map(|(index, block)| QuestionSummary {
            index,
            question: block.question.clone(),
            answered: 0,
            options: block
                .options
                .iter()
                .map(|option| OptionTally {
                    option: option.clone(),
                    count: 0,
                })
                .collect(),
            other: 0,
            quota: block.quota.as_ref().map(|_| QuotaTally::default()),
        })
        .collect();

    for response in responses {
        let selections = AnswerSet::from_items(&response.answers);

        for summary in &mut questions {
            let selected = selections.selected(summary.index);
            if !selected.is_empty() {
                summary.answered += 1;
            }
            for label in selected {
                match summary.options.iter_mut().find(|t| &t.option == label) {
                    Some(tally) => tally.count += 1,
                    None => summary.other += 1,
                }
            }
        }

        for quota in response.evaluated_quotas.iter().filter(|q| q.option.is_none()) {
            let Some(tally) = questions
                .get_mut(quota.question_index)
                .and_then(|q| q.quota.as_mut())
            else {
                continue;
            };
            if quota.passed {
                tally.passed += 1;
            } else {
                tally.failed += 1;
            }
        }
    }

    ResponseSummary {
        response_count: responses.len(),
        all_quotas_passed: responses.iter().filter(|r| r.all_quotas_passed()).count(),
        questions,
    }
}
