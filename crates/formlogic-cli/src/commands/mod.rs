//! Subcommand implementations and the helpers they share.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;

use formlogic_core::FormService;
use formlogic_store::{create_store, load_config_from, FormlogicConfig};

pub mod evaluate;
pub mod forms;
pub mod init;
pub mod responses;
pub mod stats;
pub mod submit;
pub mod validate;

/// How a command prints its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Load configuration and build a service over the configured store.
pub fn open_service(config_path: Option<&Path>) -> Result<(FormService, FormlogicConfig)> {
    let config = load_config_from(config_path)?;
    let store = create_store(&config.store);
    tracing::debug!(store = store.name(), "opened document store");
    let service = FormService::new(store).with_default_title(config.default_title.clone());
    Ok((service, config))
}

/// Read a JSON payload file, refusing files larger than `max_bytes`.
pub fn read_payload(path: &Path, max_bytes: u64) -> Result<Value> {
    let size = std::fs::metadata(path)
        .with_context(|| format!("failed to read file: {}", path.display()))?
        .len();
    anyhow::ensure!(
        size <= max_bytes,
        "payload too large: {} is {size} bytes (limit {max_bytes})",
        path.display()
    );
    formlogic_core::parser::read_json_file(path)
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
