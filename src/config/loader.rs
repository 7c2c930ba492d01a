//! Configuration loading from disk.

use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::schema::{AppConfig, DynamicConfig};
use crate::config::validation::{validate_config, validate_dynamic, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Locations of the static and dynamic config files for one profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    pub application: PathBuf,
    pub dynamic: PathBuf,
}

impl ConfigPaths {
    /// Resolve file locations under `dir`.
    ///
    /// Without a profile: `dir/application.toml` and `dir/dynamic.toml`.
    /// With profile `p`: `dir/application-p.toml` and `dir/p/dynamic.toml`.
    pub fn resolve(dir: &Path, profile: Option<&str>) -> Self {
        match profile.filter(|p| !p.is_empty()) {
            Some(profile) => Self {
                application: dir.join(format!("application-{}.toml", profile)),
                dynamic: dir.join(profile).join("dynamic.toml"),
            },
            None => Self {
                application: dir.join("application.toml"),
                dynamic: dir.join("dynamic.toml"),
            },
        }
    }
}

fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load and validate the application configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = read_toml(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate the dynamic tunables from a TOML file.
pub fn load_dynamic_config(path: &Path) -> Result<DynamicConfig, ConfigError> {
    let config: DynamicConfig = read_toml(path)?;
    validate_dynamic(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
