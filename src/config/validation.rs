//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, backoff factor >= 1)
//! - Check endpoint URLs and the contract identifier
//! - Detect duplicate candidate ids
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BallotConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use thiserror::Error;

use crate::config::schema::BallotConfig;
use crate::stellar::address::ContractId;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &BallotConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let network = &config.network;

    if network.passphrase.trim().is_empty() {
        errors.push(ValidationError::new("network.passphrase", "must not be empty"));
    }
    check_url(&mut errors, "network.horizon_url", &network.horizon_url);
    check_url(&mut errors, "network.soroban_rpc_url", &network.soroban_rpc_url);
    check_url(&mut errors, "signer.url", &config.signer.url);

    if let Err(e) = ContractId::parse(&network.contract_id) {
        errors.push(ValidationError::new("network.contract_id", e.to_string()));
    }
    if network.base_fee == 0 {
        errors.push(ValidationError::new("network.base_fee", "must be positive"));
    }
    if network.tx_expiration_secs == 0 {
        errors.push(ValidationError::new("network.tx_expiration_secs", "must be positive"));
    }
    if network.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("network.rpc_timeout_secs", "must be positive"));
    }
    if config.signer.timeout_secs == 0 {
        errors.push(ValidationError::new("signer.timeout_secs", "must be positive"));
    }

    let workflow = &config.workflow;
    if workflow.default_timeout_ms == 0 {
        errors.push(ValidationError::new("workflow.default_timeout_ms", "must be positive"));
    }
    let poll = &workflow.poll;
    if poll.max_attempts == 0 {
        errors.push(ValidationError::new("workflow.poll.max_attempts", "must be positive"));
    }
    if !(poll.backoff_factor >= 1.0 && poll.backoff_factor.is_finite()) {
        errors.push(ValidationError::new(
            "workflow.poll.backoff_factor",
            format!("must be a finite number >= 1.0, got {}", poll.backoff_factor),
        ));
    }
    if poll.initial_delay_ms > poll.max_delay_ms {
        errors.push(ValidationError::new(
            "workflow.poll.initial_delay_ms",
            format!(
                "{} exceeds max_delay_ms {}",
                poll.initial_delay_ms, poll.max_delay_ms
            ),
        ));
    }

    let mut seen = HashSet::new();
    for candidate in config.candidates.iter() {
        if !seen.insert(candidate.id) {
            errors.push(ValidationError::new(
                "candidates",
                format!("duplicate candidate id {}", candidate.id),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    match url::Url::parse(value) {
        Ok(u) if u.scheme() == "http" || u.scheme() == "https" => {}
        Ok(u) => errors.push(ValidationError::new(
            field,
            format!("unsupported scheme '{}'", u.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(field, format!("invalid URL '{}': {}", value, e))),
    }
}
