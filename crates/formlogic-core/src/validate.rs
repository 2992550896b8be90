//! Structural validation of form definitions.
//!
//! Run once at save time so the engine can assume every index is in range
//! and the reveal graph is acyclic.

use std::collections::VecDeque;

use crate::error::{FormError, ValidationError};
use crate::model::QuestionBlock;

/// Check a question sequence, collecting every violation.
///
/// Rules:
/// - the form has at least one question;
/// - every question has non-empty text;
/// - every logic rule's option is one of the question's options;
/// - every `showQuestions` and `quotaCheck` index lies in `[0, len(form))`;
/// - quota values are finite;
/// - the reveal graph (an edge `i -> j` for every rule on `i` listing `j`)
///   has no cycle.
///
/// Question types and the presence of `options` are enforced by the type
/// system here; raw payloads are checked for them by [`crate::parser`].
pub fn validate_definition(form: &[QuestionBlock]) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if form.is_empty() {
        errors.push(ValidationError::definition(
            None,
            "form",
            "form must contain at least one question",
        ));
        return errors;
    }

    let len = form.len();
    for (i, block) in form.iter().enumerate() {
        if block.question.trim().is_empty() {
            errors.push(ValidationError::definition(
                Some(i),
                "question",
                "missing question text",
            ));
        }

        if let Some(quota) = &block.quota {
            if !quota.value.is_finite() {
                errors.push(ValidationError::definition(
                    Some(i),
                    "quota.value",
                    "quota value must be a finite number",
                ));
            }
        }

        for (r, rule) in block.logic.iter().enumerate() {
            if !block.has_option(&rule.option) {
                errors.push(ValidationError::definition(
                    Some(i),
                    format!("logic[{r}].option"),
                    format!("option {:?} is not one of the question's options", rule.option),
                ));
            }
            for &target in &rule.show_questions {
                if target >= len {
                    errors.push(ValidationError::definition(
                        Some(i),
                        format!("logic[{r}].showQuestions"),
                        format!("question index {target} is out of range (form has {len})"),
                    ));
                }
            }
            for (c, check) in rule.quota_checks.iter().enumerate() {
                if check.question_index >= len {
                    errors.push(ValidationError::definition(
                        Some(i),
                        format!("logic[{r}].quotaCheck[{c}].questionIndex"),
                        format!(
                            "question index {} is out of range (form has {len})",
                            check.question_index
                        ),
                    ));
                }
                if !check.value.is_finite() {
                    errors.push(ValidationError::definition(
                        Some(i),
                        format!("logic[{r}].quotaCheck[{c}].value"),
                        "quota value must be a finite number",
                    ));
                }
            }
        }
    }

    let cyclic = reveal_cycle(form);
    if let Some(&first) = cyclic.first() {
        errors.push(ValidationError::definition(
            Some(first),
            "logic",
            format!("reveal cycle through questions {cyclic:?}"),
        ));
    }

    errors
}

/// Validate and convert the result into a [`FormError`].
pub fn ensure_valid(form: &[QuestionBlock]) -> Result<(), FormError> {
    let errors = validate_definition(form);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(FormError::MalformedDefinition(errors))
    }
}

/// Indices of questions lying on a reveal cycle, ascending. Empty if acyclic.
///
/// Kahn's algorithm strips every question that is not downstream of a cycle;
/// the same pass over reversed edges then strips those only downstream, which
/// leaves the questions on (or between) cycles.
fn reveal_cycle(form: &[QuestionBlock]) -> Vec<usize> {
    let len = form.len();
    let mut adj: Vec<Vec<usize>> = vec![Vec::new(); len];
    let mut radj: Vec<Vec<usize>> = vec![Vec::new(); len];
    for (i, block) in form.iter().enumerate() {
        for rule in &block.logic {
            for &j in rule.show_questions.iter().filter(|&&j| j < len) {
                if !adj[i].contains(&j) {
                    adj[i].push(j);
                    radj[j].push(i);
                }
            }
        }
    }

    let mut remaining = vec![true; len];
    strip_acyclic(&adj, &radj, &mut remaining);
    strip_acyclic(&radj, &adj, &mut remaining);

    remaining
        .iter()
        .enumerate()
        .filter_map(|(i, &r)| r.then_some(i))
        .collect()
}

/// Repeatedly remove remaining nodes with no remaining incoming edge.
fn strip_acyclic(adj: &[Vec<usize>], radj: &[Vec<usize>], remaining: &mut [bool]) {
    let mut in_degree: Vec<usize> = (0..adj.len())
        .map(|n| {
            if remaining[n] {
                radj[n].iter().filter(|&&p| remaining[p]).count()
            } else {
                0
            }
        })
        .collect();

    let mut queue: VecDeque<usize> = (0..adj.len())
        .filter(|&n| remaining[n] && in_degree[n] == 0)
        .collect();

    while let Some(node) = queue.pop_front() {
        remaining[node] = false;
        for &next in &adj[node] {
            if !remaining[next] {
                continue;
            }
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                queue.push_back(next);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationErrorKind;
    use crate::model::{LogicRule, QuotaCheck, QuotaCondition};

    fn fields(errors: &[ValidationError]) -> Vec<(Option<usize>, String)> {
        errors.iter().map(|e| (e.index, e.field.clone())).collect()
    }

    #[test]
    fn valid_form_passes() {
        let form = vec![
            QuestionBlock::radio("Color?", &["Red", "Blue"]).reveal("Red", [1]),
            QuestionBlock::radio("Shade?", &["Light", "Dark"])
                .with_quota(QuotaCondition::Equal, 10.0),
        ];
        assert!(validate_definition(&form).is_empty());
        assert!(ensure_valid(&form).is_ok());
    }

    #[test]
    fn empty_form_rejected() {
        let errors = validate_definition(&[]);
        assert_eq!(fields(&errors), vec![(None, "form".to_string())]);
    }

    #[test]
    fn collects_all_violations() {
        let form = vec![
            QuestionBlock::radio("  ", &["A"]).reveal("B", [5]),
            QuestionBlock::radio("ok", &[]),
        ];
        let errors = validate_definition(&form);
        assert_eq!(
            fields(&errors),
            vec![
                (Some(0), "question".to_string()),
                (Some(0), "logic[0].option".to_string()),
                (Some(0), "logic[0].showQuestions".to_string()),
            ]
        );
        assert!(errors
            .iter()
            .all(|e| e.kind == ValidationErrorKind::MalformedDefinition));
    }

    #[test]
    fn rejects_two_question_cycle() {
        let form = vec![
            QuestionBlock::radio("q0", &["A"]).reveal("A", [1]),
            QuestionBlock::radio("q1", &["B"]).reveal("B", [0]),
        ];
        let err = ensure_valid(&form).unwrap_err();
        assert!(matches!(err, FormError::MalformedDefinition(_)));
        let errors = err.validation_errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("[0, 1]"), "{}", errors[0].message);
    }

    #[test]
    fn rejects_self_reveal() {
        let form = vec![
            QuestionBlock::radio("q0", &["A"]).reveal("A", [1]),
            QuestionBlock::radio("q1", &["B"]).reveal("B", [1]),
        ];
        let errors = validate_definition(&form);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].index, Some(1));
    }

    #[test]
    fn cycle_report_excludes_downstream_questions() {
        // 0 -> 1 -> 2 -> 1, 2 -> 3
        let form = vec![
            QuestionBlock::radio("q0", &["a"]).reveal("a", [1]),
            QuestionBlock::radio("q1", &["b"]).reveal("b", [2]),
            QuestionBlock::radio("q2", &["c", "d"])
                .reveal("c", [1])
                .reveal("d", [3]),
            QuestionBlock::radio("q3", &["e"]),
        ];
        assert_eq!(reveal_cycle(&form), vec![1, 2]);
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let form = vec![
            QuestionBlock::checkbox("q0", &["a", "b"])
                .reveal("a", [1])
                .reveal("b", [2]),
            QuestionBlock::radio("q1", &["c"]).reveal("c", [3]),
            QuestionBlock::radio("q2", &["d"]).reveal("d", [3]),
            QuestionBlock::radio("q3", &["e"]),
        ];
        assert!(validate_definition(&form).is_empty());
    }

    #[test]
    fn quota_check_index_out_of_range() {
        let mut rule = LogicRule::new("A", []);
        rule.quota_checks.push(QuotaCheck {
            question_index: 3,
            condition: QuotaCondition::LessThan,
            value: 1.0,
        });
        let mut block = QuestionBlock::radio("q0", &["A"]);
        block.logic.push(rule);
        let errors = validate_definition(&[block]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "logic[0].quotaCheck[0].questionIndex");
    }
}
