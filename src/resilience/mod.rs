//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Submitted transaction:
//!     → timeouts.rs (wall-clock deadline over submit + confirm)
//!     → backoff.rs (delay schedule between confirmation polls)
//! ```
//!
//! # Design Decisions
//! - Every external call has a deadline
//! - Only the confirmation poll retries; simulation and submission never do
//! - Delays are deterministic so poll timing is reproducible in tests

pub mod backoff;
pub mod timeouts;

pub use backoff::BackoffSchedule;
pub use timeouts::{with_deadline, DeadlineExceeded};
