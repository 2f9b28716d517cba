//! Confirmation polling.
//!
//! Queries the status endpoint until the transaction reaches a terminal
//! status or the attempt budget runs out. Fetch errors count as attempts
//! and are retried like a non-terminal answer.

use crate::config::PollConfig;
use crate::observability::metrics;
use crate::resilience::BackoffSchedule;
use crate::stellar::client::LedgerRpc;
use crate::stellar::types::TransactionRecord;
use crate::workflow::error::ErrorKind;

pub async fn await_confirmation(
    rpc: &dyn LedgerRpc,
    hash: &str,
    poll: &PollConfig,
) -> Result<TransactionRecord, ErrorKind> {
    let mut delays = BackoffSchedule::new(poll);
    let mut last_observed = String::from("no response");

    for attempt in 1..=poll.max_attempts {
        metrics::record_poll_attempt();
        match rpc.transaction_status(hash).await {
            Ok(record) if record.is_terminal() => {
                tracing::debug!(hash, attempt, status = ?record.effective_status(), "Transaction settled");
                return Ok(record);
            }
            Ok(record) => {
                last_observed = match record.effective_status() {
                    Some(status) => format!("status {}", status),
                    None => "no status".to_string(),
                };
            }
            Err(e) => last_observed = e.to_string(),
        }

        let Some(delay) = delays.next() else { break };
        tracing::debug!(
            hash,
            attempt,
            delay_ms = delay.as_millis() as u64,
            last_observed = %last_observed,
            "Transaction not settled, polling again"
        );
        tokio::time::sleep(delay).await;
    }

    Err(ErrorKind::ConfirmationTimeout {
        attempts: poll.max_attempts,
        last_observed,
    })
}
