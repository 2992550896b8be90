//! The `formlogic forms` subcommands.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use super::{open_service, print_json, read_payload, OutputFormat};

pub async fn save(path: PathBuf, config_path: Option<PathBuf>) -> Result<()> {
    let (service, config) = open_service(config_path.as_deref())?;
    let payload = read_payload(&path, config.max_payload_bytes)?;
    let form = service
        .save_definition(&payload)
        .await
        .with_context(|| format!("failed to save form from {}", path.display()))?;
    println!("Saved form {} ({})", form.id, form.document.title);
    Ok(())
}

pub async fn list(format: OutputFormat, config_path: Option<PathBuf>) -> Result<()> {
    let (service, _) = open_service(config_path.as_deref())?;
    let forms = service.list_definitions().await?;

    if format == OutputFormat::Json {
        return print_json(&forms);
    }

    if forms.is_empty() {
        println!("No forms stored. Run `formlogic forms save <file>` to add one.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Id", "Title", "Questions", "Created", "Updated"]);
    for form in &forms {
        table.add_row(vec![
            Cell::new(form.id),
            Cell::new(&form.document.title),
            Cell::new(form.document.form.len()),
            Cell::new(form.created_at.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(form.updated_at.format("%Y-%m-%d %H:%M:%S")),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub async fn show(id: String, config_path: Option<PathBuf>) -> Result<()> {
    let (service, _) = open_service(config_path.as_deref())?;
    let form = service.get_definition(&id).await?;
    print_json(&form)
}

pub async fn update(id: String, path: PathBuf, config_path: Option<PathBuf>) -> Result<()> {
    let (service, config) = open_service(config_path.as_deref())?;
    let payload = read_payload(&path, config.max_payload_bytes)?;
    let form = service
        .update_definition(&id, &payload)
        .await
        .with_context(|| format!("failed to update form {id}"))?;
    println!("Updated form {} ({})", form.id, form.document.title);
    Ok(())
}

pub async fn delete(id: String, config_path: Option<PathBuf>) -> Result<()> {
    let (service, _) = open_service(config_path.as_deref())?;
    let form = service.delete_definition(&id).await?;
    println!("Deleted form {} ({})", form.id, form.document.title);
    Ok(())
}
