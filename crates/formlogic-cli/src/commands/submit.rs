//! The `formlogic submit` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use super::{open_service, print_json, read_payload, OutputFormat};

pub async fn execute(
    payload_path: PathBuf,
    format: OutputFormat,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let (service, config) = open_service(config_path.as_deref())?;
    let payload = read_payload(&payload_path, config.max_payload_bytes)?;
    let response = service
        .submit_response(&payload)
        .await
        .with_context(|| format!("failed to submit {}", payload_path.display()))?;

    if format == OutputFormat::Json {
        return print_json(&response);
    }

    let document = &response.document;
    println!("Recorded response {}", response.id);
    match document.form_id {
        Some(form_id) => println!("  Form: {form_id}"),
        None => println!("  Form: (none)"),
    }
    println!("  Answers: {}", document.answers.len());
    let failed = document.evaluated_quotas.iter().filter(|q| !q.passed).count();
    println!(
        "  Quotas: {} evaluated, {} failed",
        document.evaluated_quotas.len(),
        failed
    );
    Ok(())
}
