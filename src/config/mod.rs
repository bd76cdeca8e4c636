//! Configuration loading and validation

mod schema;

pub use schema::*;

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};

/// Example configuration written by `keysynth init`
pub const EXAMPLE_CONFIG: &str = include_str!("../../keysynth.example.yaml");

/// Load configuration from a YAML file
pub fn load_config(path: &Path) -> Result<KeysynthConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {:?}", path))?;
    let config: KeysynthConfig = serde_yaml::from_str(&contents)
        .with_context(|| format!("failed to parse config file: {:?}", path))?;
    config.validate()?;
    info!(path = %path.display(), "configuration loaded");
    Ok(config)
}

/// Load configuration, falling back to defaults when the file does not exist.
/// A file that exists but is invalid is still an error.
pub fn load_or_default(path: &Path) -> Result<KeysynthConfig> {
    if path.exists() {
        load_config(path)
    } else {
        warn!(path = %path.display(), "config file not found, using defaults");
        Ok(KeysynthConfig::default())
    }
}
