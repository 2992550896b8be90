//! formlogic-store: Document store backends.
//!
//! Implements the `DocumentStore` trait with an in-memory store and a
//! JSON-file store, plus the configuration that selects between them.

pub mod config;
pub mod file;
pub mod memory;

pub use config::{create_store, load_config, load_config_from, FormlogicConfig, StoreConfig};
pub use file::FileStore;
pub use memory::MemoryStore;
