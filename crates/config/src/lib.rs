//! Configuration loading, env substitution, overrides, and validation.
//!
//! Config files: `stockwire.toml`, `stockwire.yaml`, `stockwire.yml` or
//! `stockwire.json`, searched in `./` then `~/.config/stockwire/`.
//!
//! Supports `${ENV_VAR}` substitution in the raw file before parsing.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{apply_env_overrides, config_dir, discover_and_load, load_config},
    schema::{McpServerEntry, StockwireConfig, TimeoutsConfig},
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
