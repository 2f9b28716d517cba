//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::BallotConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding `network.contract_id`.
pub const CONTRACT_ID_ENV_VAR: &str = "BALLOT_CONTRACT_ID";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

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

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<BallotConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse TOML text, apply environment overrides, and validate.
pub fn parse_config(content: &str) -> Result<BallotConfig, ConfigError> {
    let mut config: BallotConfig = toml::from_str(content)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load the file when given, otherwise start from defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<BallotConfig, ConfigError> {
    match path {
        Some(p) => load_config(p),
        None => parse_config(""),
    }
}

fn apply_env_overrides<F>(config: &mut BallotConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(contract_id) = lookup(CONTRACT_ID_ENV_VAR).filter(|v| !v.trim().is_empty()) {
        tracing::debug!(contract_id = %contract_id, "Contract id overridden from environment");
        config.network.contract_id = contract_id.trim().to_string();
    }
}
