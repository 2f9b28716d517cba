//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound a whole pipeline stage by a wall-clock deadline
//! - Drop the in-flight future when the deadline passes

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::timeout;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("deadline of {0:?} exceeded")]
pub struct DeadlineExceeded(pub Duration);

/// Run `fut` to completion or fail once `limit` elapses.
pub async fn with_deadline<F, T>(limit: Duration, fut: F) -> Result<T, DeadlineExceeded>
where
    F: Future<Output = T>,
{
    timeout(limit, fut).await.map_err(|_| DeadlineExceeded(limit))
}
