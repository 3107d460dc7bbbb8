//! Configuration and rule file loading from disk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::{ServerConfig, SiteConfig};
use crate::config::validation::{validate_config, ValidationError};
use crate::redirects::{CompileError, Engine};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

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

/// Error type for rule file loading.
#[derive(Debug, Error)]
pub enum RulesError {
    #[error("unable to read redirections file at {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("redirection error on file {path:?}: {source}")]
    Compile { path: PathBuf, source: CompileError },
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: ServerConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load the site's rule file, or `None` when redirects are disabled.
///
/// A missing rule file is not an error: it yields an empty engine.
pub fn load_rules(site: &SiteConfig) -> Result<Option<Engine>, RulesError> {
    if site.disable_redirects {
        tracing::info!("Redirects disabled");
        return Ok(None);
    }
    read_rules(&site.redirections_path()).map(Some)
}

/// Read and compile one rule file. A missing file compiles to no rules.
pub fn read_rules(path: &Path) -> Result<Engine, RulesError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = ?path, "No redirections file");
            return Ok(Engine::default());
        }
        Err(source) => {
            return Err(RulesError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let engine = Engine::compile(&text).map_err(|source| RulesError::Compile {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = ?path, rules = engine.len(), "Redirect rules loaded");
    Ok(engine)
}
