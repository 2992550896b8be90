//! Form-logic evaluation engine.
//!
//! Pure functions that, given a form's question sequence and the answers
//! collected so far, decide which questions are visible and whether each
//! quota on a visible question passes. Nothing here performs I/O or holds
//! state, so every function may be called concurrently and repeatedly.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::model::{AnswerItem, EvaluatedQuota, QuestionBlock};

/// Selected options keyed by question index. May be partial.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerSet {
    selections: BTreeMap<usize, Vec<String>>,
}

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the options selected for `index`, replacing any earlier selection.
    pub fn select<S: Into<String>>(
        mut self,
        index: usize,
        options: impl IntoIterator<Item = S>,
    ) -> Self {
        self.insert(index, options.into_iter().map(Into::into).collect());
        self
    }

    pub fn insert(&mut self, index: usize, options: Vec<String>) {
        self.selections.insert(index, options);
    }

    /// The options selected for `index` (empty if unanswered).
    pub fn selected(&self, index: usize) -> &[String] {
        self.selections
            .get(&index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_selected(&self, index: usize, option: &str) -> bool {
        self.selected(index).iter().any(|s| s == option)
    }

    /// Build from submitted answers. A later item for the same index wins.
    pub fn from_items(items: &[AnswerItem]) -> Self {
        items
            .iter()
            .map(|item| (item.question_index, item.answer.clone()))
            .collect()
    }
}

impl FromIterator<(usize, Vec<String>)> for AnswerSet {
    fn from_iter<I: IntoIterator<Item = (usize, Vec<String>)>>(iter: I) -> Self {
        Self {
            selections: iter.into_iter().collect(),
        }
    }
}

/// Compute the set of question indices currently shown to the respondent.
///
/// Index 0 is always visible in a non-empty form. A question `j` becomes
/// visible when some visible question `i` has a rule whose option is selected
/// in `answers[i]` and whose `showQuestions` lists `j`. The set is grown to a
/// fixed point, so answers may arrive in any order. Adding answers can only
/// add edges, so the result never shrinks as answers accumulate.
///
/// Indices outside the form are skipped; they are rejected at save time.
pub fn resolve_visibility(form: &[QuestionBlock], answers: &AnswerSet) -> BTreeSet<usize> {
    let mut visible = BTreeSet::new();
    if form.is_empty() {
        return visible;
    }
    visible.insert(0);

    let mut rounds = 0usize;
    loop {
        rounds += 1;
        let frontier: Vec<usize> = visible.iter().copied().collect();
        let mut added = false;

        for i in frontier {
            for rule in &form[i].logic {
                if !answers.is_selected(i, &rule.option) {
                    continue;
                }
                for &j in &rule.show_questions {
                    if j < form.len() && visible.insert(j) {
                        added = true;
                    }
                }
            }
        }

        if !added {
            break;
        }
    }

    tracing::debug!(
        questions = form.len(),
        visible = visible.len(),
        rounds,
        "resolved visibility"
    );
    visible
}

/// Evaluate every quota attached to a visible question.
///
/// For question-level quotas the comparator is the matching answer's numeric
/// `value`, falling back to the number of selected options. Rules whose
/// option is selected on a visible question also evaluate their quota checks
/// against the target question, provided the target is visible too; those
/// entries carry the triggering option.
///
/// Hidden questions never produce entries. Output is ordered by the owning
/// question's index, question-level entry first.
pub fn evaluate_quotas(
    form: &[QuestionBlock],
    visible: &BTreeSet<usize>,
    answers: &[AnswerItem],
) -> Vec<EvaluatedQuota> {
    let by_index: BTreeMap<usize, &AnswerItem> = answers
        .iter()
        .map(|item| (item.question_index, item))
        .collect();
    let comparator = |index: usize| -> f64 {
        by_index.get(&index).map_or(0.0, |item| item.comparator())
    };

    let mut evaluated = Vec::new();
    for &i in visible {
        let Some(block) = form.get(i) else {
            continue;
        };

        if let Some(quota) = block.quota {
            let lhs = comparator(i);
            evaluated.push(EvaluatedQuota {
                question_index: i,
                option: None,
                condition: quota.condition,
                value: quota.value,
                passed: quota.condition.holds(lhs, quota.value),
            });
        }

        let selected = by_index
            .get(&i)
            .map_or(&[][..], |item| item.answer.as_slice());
        for rule in &block.logic {
            if !selected.contains(&rule.option) {
                continue;
            }
            for check in &rule.quota_checks {
                if !visible.contains(&check.question_index) {
                    continue;
                }
                let lhs = comparator(check.question_index);
                evaluated.push(EvaluatedQuota {
                    question_index: check.question_index,
                    option: Some(rule.option.clone()),
                    condition: check.condition,
                    value: check.value,
                    passed: check.condition.holds(lhs, check.value),
                });
            }
        }
    }

    tracing::debug!(
        visible = visible.len(),
        evaluated = evaluated.len(),
        failed = evaluated.iter().filter(|q| !q.passed).count(),
        "evaluated quotas"
    );
    evaluated
}

/// The engine's combined output for one answer set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub visible: BTreeSet<usize>,
    pub evaluated_quotas: Vec<EvaluatedQuota>,
}

impl Evaluation {
    pub fn is_visible(&self, index: usize) -> bool {
        self.visible.contains(&index)
    }

    pub fn failed_quotas(&self) -> impl Iterator<Item = &EvaluatedQuota> {
        self.evaluated_quotas.iter().filter(|q| !q.passed)
    }
}

/// Resolve visibility and evaluate quotas in one pass.
pub fn evaluate(form: &[QuestionBlock], answers: &[AnswerItem]) -> Evaluation {
    let visible = resolve_visibility(form, &AnswerSet::from_items(answers));
    let evaluated_quotas = evaluate_quotas(form, &visible, answers);
    Evaluation {
        visible,
        evaluated_quotas,
    }
}
