//! Store configuration and factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use formlogic_core::model::DEFAULT_TITLE;
use formlogic_core::traits::DocumentStore;

use crate::file::FileStore;
use crate::memory::MemoryStore;

/// Which document store backs the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    /// One JSON file per document under `data_dir/<collection>/`.
    File {
        #[serde(default = "default_data_dir")]
        data_dir: PathBuf,
    },
    /// Process-local; contents are lost on exit.
    Memory,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::File {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./formlogic-data")
}

/// Top-level formlogic configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormlogicConfig {
    #[serde(default)]
    pub store: StoreConfig,
    /// Title for definitions saved without one.
    #[serde(default = "default_title")]
    pub default_title: String,
    /// Largest payload file the CLI will read.
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: u64,
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}
fn default_max_payload_bytes() -> u64 {
    10 * 1024 * 1024
}

impl Default for FormlogicConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            default_title: default_title(),
            max_payload_bytes: default_max_payload_bytes(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    // Single left-to-right pass: substituted values are never rescanned.
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        let var_name = &rest[start + 2..start + end];
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    result
}

fn resolve_store_config(config: &StoreConfig) -> StoreConfig {
    match config {
        StoreConfig::File { data_dir } => StoreConfig::File {
            data_dir: PathBuf::from(resolve_env_vars(&data_dir.to_string_lossy())),
        },
        StoreConfig::Memory => StoreConfig::Memory,
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `formlogic.toml` in the current directory
/// 2. `~/.config/formlogic/config.toml`
///
/// `FORMLOGIC_DATA_DIR` overrides the store with a file store at that path.
pub fn load_config() -> Result<FormlogicConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<FormlogicConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("formlogic.toml");
            if local.exists() {
                Some(local)
            } else {
                dirs_path()
                    .map(|home| home.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let config = parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded config");
            config
        }
        None => FormlogicConfig::default(),
    };

    if let Ok(dir) = std::env::var("FORMLOGIC_DATA_DIR") {
        config.store = StoreConfig::File {
            data_dir: PathBuf::from(dir),
        };
    }

    config.store = resolve_store_config(&config.store);
    config.default_title = resolve_env_vars(&config.default_title);

    Ok(config)
}

/// Parse a configuration document.
pub fn parse_config(content: &str) -> Result<FormlogicConfig> {
    Ok(toml::from_str::<FormlogicConfig>(content)?)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("formlogic"))
}

/// Create a store instance from its configuration.
pub fn create_store(config: &StoreConfig) -> Arc<dyn DocumentStore> {
    match config {
        StoreConfig::File { data_dir } => Arc::new(FileStore::new(data_dir)),
        StoreConfig::Memory => Arc::new(MemoryStore::new()),
    }
}
