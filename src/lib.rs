//! Stellar ballot client library.
//!
//! Builds, simulates, signs, submits and confirms Soroban contract
//! invocations for an on-chain ballot, with a typed voting facade on top.

pub mod config;
pub mod observability;
pub mod resilience;
pub mod stellar;
pub mod voting;
pub mod workflow;

pub use config::schema::BallotConfig;
pub use voting::VotingClient;
pub use workflow::{CallMode, InvocationOutcome, TransactionWorkflow, WorkflowError};
