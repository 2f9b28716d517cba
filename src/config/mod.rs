//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse, deserialize, environment overrides)
//!     → validation.rs (semantic checks)
//!     → BallotConfig (validated, immutable)
//!     → handed to the RPC client, signer and workflow at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_or_default, ConfigError};
pub use schema::BallotConfig;
pub use schema::{
    CandidateConfig, Candidates, NetworkConfig, ObservabilityConfig, PollConfig, SignerConfig,
    WorkflowConfig,
};
