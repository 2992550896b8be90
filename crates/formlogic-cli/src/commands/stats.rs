//! The `formlogic stats` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use super::{open_service, print_json, OutputFormat};

pub async fn execute(id: String, format: OutputFormat, config_path: Option<PathBuf>) -> Result<()> {
    let (service, _) = open_service(config_path.as_deref())?;
    let summary = service.form_statistics(&id).await?;

    if format == OutputFormat::Json {
        return print_json(&summary);
    }

    println!(
        "{} response(s), {} with every quota passed",
        summary.response_count, summary.all_quotas_passed
    );

    let mut table = Table::new();
    table.set_header(vec!["#", "Question", "Answered", "Selections", "Quota"]);
    for question in &summary.questions {
        let mut selections: Vec<String> = question
            .options
            .iter()
            .map(|t| format!("{}: {}", t.option, t.count))
            .collect();
        if question.other > 0 {
            selections.push(format!("other: {}", question.other));
        }
        let quota = question
            .quota
            .map(|q| format!("{} pass / {} fail", q.passed, q.failed))
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(question.index),
            Cell::new(&question.question),
            Cell::new(question.answered),
            Cell::new(selections.join(", ")),
            Cell::new(quota),
        ]);
    }
    println!("{table}");
    Ok(())
}
