//! Configuration loading for `zbundle.json`
//!
//! Resolves the configuration path, parses the JSON5 contents and turns the
//! declared targets into [`Target`]s.

use super::schema::{validate_all, TargetConfig};
use crate::build::{absolutize, Target};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Configuration file looked up when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "zbundle.json";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// Configuration file does not exist
    #[error("configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// JSON5 parsing error
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// Resolve the configuration path.
///
/// An explicit path is resolved against `base_dir` when relative. Without
/// one, [`DEFAULT_CONFIG_FILE`] in `base_dir` is used.
pub fn resolve_config_path(path: Option<&Path>, base_dir: &Path) -> PathBuf {
    match path {
        Some(p) => absolutize(base_dir, &p.to_string_lossy()),
        None => base_dir.join(DEFAULT_CONFIG_FILE),
    }
}

/// Parse and validate configuration text.
pub fn parse_config(contents: &str) -> Result<Vec<TargetConfig>, ConfigError> {
    let configs: Vec<TargetConfig> = json5::from_str(contents)?;

    let errors = validate_all(&configs);
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    Ok(configs)
}

/// Load configuration from a file.
///
/// # Returns
/// - `Ok(Vec<TargetConfig>)` on success
/// - `Err(ConfigError::NotFound)` if the file does not exist
/// - `Err(ConfigError)` if the file cannot be read, parsed or validated
pub fn load_config(path: &Path) -> Result<Vec<TargetConfig>, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    debug!(path = %path.display(), "loading configuration");
    let contents = fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Load a configuration file and create its targets in declaration order.
pub fn load_targets(path: &Path) -> Result<Vec<Target>, ConfigError> {
    Ok(load_config(path)?.into_iter().map(TargetConfig::into_target).collect())
}
