//! Transaction workflow subsystem.
//!
//! # Data Flow
//! ```text
//! Front end (CLI, voting facade)
//!     → invoke.rs (validate, build, simulate, finalize, sign)
//!     → confirm.rs (poll the status endpoint with backoff)
//!     → error.rs (every failure tagged with function and stage)
//!     → defaults.rs (values for read-only calls that return nothing)
//! ```
//!
//! # Constraints
//! - No state survives an invocation
//! - Only the confirmation poll retries
//! - The same network passphrase is used for simulation, signing and submission

pub mod confirm;
pub mod defaults;
pub mod error;
pub mod invoke;

pub use defaults::FallbackDefaults;
pub use error::{ErrorKind, Stage, WorkflowError};
pub use invoke::{CallMode, InvocationOutcome, TransactionWorkflow};
