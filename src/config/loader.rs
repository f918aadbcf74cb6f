//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::Settings;
use crate::config::validation::{validate_settings, ValidationError};

/// Settings file used when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "./contrib/config.yml";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot resolve config path {path:?}: {source}")]
    Resolve {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate settings from a YAML file.
///
/// Relative paths are resolved against the current directory first.
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let path = std::path::absolute(path).map_err(|source| ConfigError::Resolve {
        path: path.to_path_buf(),
        source,
    })?;

    let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;

    let settings = parse_settings(&content).map_err(|source| ConfigError::Parse {
        path: path.clone(),
        source,
    })?;

    validate_settings(&settings).map_err(ConfigError::Validation)?;

    tracing::debug!(path = %path.display(), "Settings loaded");
    Ok(settings)
}

/// Parse settings from YAML text. An empty document yields the defaults.
pub fn parse_settings(content: &str) -> Result<Settings, serde_yaml::Error> {
    if content.trim().is_empty() {
        return Ok(Settings::default());
    }
    serde_yaml::from_str(content)
}
