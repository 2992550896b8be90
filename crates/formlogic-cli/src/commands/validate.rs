//! The `formlogic validate` command.

use std::path::PathBuf;

use anyhow::Result;

use formlogic_core::parser::{find_json_files, parse_definition_with_title};
use formlogic_core::FormError;
use formlogic_store::load_config_from;

use super::read_payload;

pub fn execute(definition_path: PathBuf, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let files = if definition_path.is_dir() {
        find_json_files(&definition_path)?
    } else {
        vec![definition_path]
    };

    let mut first_failure: Option<FormError> = None;
    let mut failures = 0;

    for path in &files {
        let payload = read_payload(path, config.max_payload_bytes)?;
        match parse_definition_with_title(&payload, &config.default_title) {
            Ok(definition) => {
                println!(
                    "{}: {} ({} questions)",
                    path.display(),
                    definition.title,
                    definition.form.len()
                );
            }
            Err(err) => {
                println!("{}: INVALID", path.display());
                for detail in err.validation_errors() {
                    println!("  {detail}");
                }
                failures += 1;
                first_failure.get_or_insert(err);
            }
        }
    }

    match first_failure {
        None => {
            println!("All definitions valid.");
            Ok(())
        }
        Some(err) => Err(anyhow::Error::new(err)
            .context(format!("{failures} of {} definition(s) invalid", files.len()))),
    }
}
