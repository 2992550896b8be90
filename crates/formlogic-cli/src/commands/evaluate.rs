//! The `formlogic evaluate` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use formlogic_core::assemble::normalize_answers;
use formlogic_core::parser::{parse_definition_with_title, parse_submission};
use formlogic_core::{evaluate, Evaluation};
use formlogic_store::load_config_from;

use super::{print_json, read_payload, OutputFormat};

pub fn execute(
    definition_path: PathBuf,
    answers_path: PathBuf,
    format: OutputFormat,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let definition_payload = read_payload(&definition_path, config.max_payload_bytes)?;
    let definition = parse_definition_with_title(&definition_payload, &config.default_title)
        .with_context(|| format!("invalid form definition: {}", definition_path.display()))?;

    let payload = read_payload(&answers_path, config.max_payload_bytes)?;
    let submission = parse_submission(&payload)
        .with_context(|| format!("invalid answers: {}", answers_path.display()))?;
    let answers = normalize_answers(&submission.answers)
        .with_context(|| format!("invalid answers: {}", answers_path.display()))?;

    let evaluation = evaluate(&definition.form, &answers);

    match format {
        OutputFormat::Json => print_json(&evaluation),
        OutputFormat::Text => {
            print_evaluation(&definition.form, &evaluation);
            Ok(())
        }
    }
}

fn print_evaluation(form: &[formlogic_core::model::QuestionBlock], evaluation: &Evaluation) {
    let visible: Vec<String> = evaluation.visible.iter().map(usize::to_string).collect();
    println!("Visible questions: {}", visible.join(", "));
    for &index in &evaluation.visible {
        if let Some(block) = form.get(index) {
            println!("  [{index}] {}", block.question);
        }
    }

    if evaluation.evaluated_quotas.is_empty() {
        println!("No quotas apply.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Question", "Option", "Condition", "Result"]);
    for quota in &evaluation.evaluated_quotas {
        table.add_row(vec![
            Cell::new(quota.question_index),
            Cell::new(quota.option.as_deref().unwrap_or("-")),
            Cell::new(format!("{} {}", quota.condition, quota.value)),
            Cell::new(if quota.passed { "PASS" } else { "FAIL" }),
        ]);
    }
    println!("{table}");

    let failed = evaluation.failed_quotas().count();
    if failed == 0 {
        println!("All quotas passed.");
    } else {
        println!("{failed} quota(s) failed.");
    }
}
