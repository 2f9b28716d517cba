//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Workflow stages, RPC client, voting facade:
//!     → logging.rs (structured log events, one span per invocation)
//!     → metrics.rs (counters, histograms through the `metrics` facade)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → whatever recorder the embedding binary installs
//! ```
//!
//! # Design Decisions
//! - Every invocation carries an `invocation_id` span field
//! - Signed payloads are never logged
//! - The library installs no metrics exporter

pub mod logging;
pub mod metrics;
