//! The `formlogic responses` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use super::{open_service, print_json, OutputFormat};

pub async fn execute(
    id: Option<String>,
    form: Option<String>,
    format: OutputFormat,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let (service, _) = open_service(config_path.as_deref())?;
    if let Some(id) = id {
        let response = service.get_response(&id).await?;
        return print_json(&response);
    }
    let listings = service.list_responses(form.as_deref()).await?;

    if format == OutputFormat::Json {
        return print_json(&listings);
    }

    if listings.is_empty() {
        println!("No responses stored.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Id", "Form", "Submitted", "Answers", "Quotas"]);
    for listing in &listings {
        let response = &listing.response.document;
        let form = match (&listing.form, response.form_id) {
            (Some(summary), _) => summary.title.clone(),
            (None, Some(id)) => format!("{id} (deleted)"),
            (None, None) => "-".to_string(),
        };
        let passed = response.evaluated_quotas.iter().filter(|q| q.passed).count();
        table.add_row(vec![
            Cell::new(listing.response.id),
            Cell::new(form),
            Cell::new(response.submitted_at.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(response.answers.len()),
            Cell::new(format!("{passed}/{}", response.evaluated_quotas.len())),
        ]);
    }
    println!("{table}");
    Ok(())
}
