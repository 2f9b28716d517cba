//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the ballot
//! client. All types derive Serde traits for deserialization from config files.
//! Defaults target the public Stellar test network.

use serde::{Deserialize, Serialize};

/// Passphrase of the Stellar test network.
pub const TESTNET_PASSPHRASE: &str = "Test SDF Network ; September 2015";

/// Root configuration for the ballot client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BallotConfig {
    /// Network endpoints and contract identity.
    pub network: NetworkConfig,

    /// Transaction workflow timing.
    pub workflow: WorkflowConfig,

    /// External wallet bridge.
    pub signer: SignerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Candidates shown on the ballot.
    pub candidates: Candidates,
}

/// Network configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Network passphrase used for simulation, signing and submission.
    pub passphrase: String,

    /// Horizon base URL (accounts, submission, status polling).
    pub horizon_url: String,

    /// Soroban RPC URL (simulation).
    pub soroban_rpc_url: String,

    /// Deployed voting contract (`C...` strkey).
    pub contract_id: String,

    /// Base fee per transaction in stroops.
    pub base_fee: u32,

    /// Validity window of a built transaction in seconds.
    pub tx_expiration_secs: u64,

    /// Timeout applied to every individual RPC request in seconds.
    pub rpc_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            passphrase: TESTNET_PASSPHRASE.to_string(),
            horizon_url: "https://horizon-testnet.stellar.org".to_string(),
            soroban_rpc_url: "https://soroban-testnet.stellar.org".to_string(),
            contract_id: "CAAQB4APN6C36C3E3XOKTBMFXEEXOQXPP3JJTB74P4KBYOVBMNL6DVWU".to_string(),
            base_fee: 100,
            tx_expiration_secs: 30,
            rpc_timeout_secs: 15,
        }
    }
}

/// Workflow configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Wall-clock budget for submission plus confirmation, in milliseconds.
    pub default_timeout_ms: u64,

    /// Confirmation polling.
    pub poll: PollConfig,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 120_000,
            poll: PollConfig::default(),
        }
    }
}

/// Confirmation poll configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PollConfig {
    /// Maximum number of status queries.
    pub max_attempts: u32,

    /// Delay after the first non-terminal attempt in milliseconds.
    pub initial_delay_ms: u64,

    /// Multiplier applied to the delay after every attempt.
    pub backoff_factor: f64,

    /// Upper bound for a single delay in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            initial_delay_ms: 1_000,
            backoff_factor: 1.5,
            max_delay_ms: 10_000,
        }
    }
}

/// Wallet bridge configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SignerConfig {
    /// Base URL of the local wallet bridge.
    pub url: String,

    /// How long to wait for the user to approve a signature, in seconds.
    pub timeout_secs: u64,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:3737".to_string(),
            timeout_secs: 300,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}

/// A single ballot entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CandidateConfig {
    /// Index passed to the contract.
    pub id: u32,

    /// Display name.
    pub name: String,

    /// Short description.
    #[serde(default)]
    pub description: String,
}

/// Candidate list, defaulting to the three-entry ballot the contract is
/// initialised with.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Candidates(pub Vec<CandidateConfig>);

impl Default for Candidates {
    fn default() -> Self {
        let entry = |id: u32, name: &str, description: &str| CandidateConfig {
            id,
            name: name.to_string(),
            description: description.to_string(),
        };
        Self(vec![
            entry(0, "Project A", "Renewable energy solutions"),
            entry(1, "Project B", "Education technology platform"),
            entry(2, "Project C", "Healthcare services innovation"),
        ])
    }
}

impl Candidates {
    /// Look up a candidate by contract index.
    pub fn get(&self, id: u32) -> Option<&CandidateConfig> {
        self.0.iter().find(|c| c.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CandidateConfig> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
