//! Metrics collection.
//!
//! # Metrics
//! - `ballot_invocations_total` (counter): invocations by function, mode, outcome
//! - `ballot_invocation_duration_seconds` (histogram): wall time per invocation
//! - `ballot_poll_attempts_total` (counter): confirmation status queries
//! - `ballot_rpc_errors_total` (counter): failed RPC calls by endpoint
//! - `ballot_rpc_health` (gauge): 1=healthy, 0=unhealthy
//!
//! Updates go through the `metrics` facade and are dropped when no
//! recorder is installed.

use std::time::Instant;

use metrics::{counter, gauge, histogram};

pub fn record_invocation(function: &str, mode: &'static str, outcome: &'static str, started: Instant) {
    counter!(
        "ballot_invocations_total",
        "function" => function.to_string(),
        "mode" => mode,
        "outcome" => outcome
    )
    .increment(1);
    histogram!("ballot_invocation_duration_seconds", "function" => function.to_string())
        .record(started.elapsed().as_secs_f64());
}

pub fn record_poll_attempt() {
    counter!("ballot_poll_attempts_total").increment(1);
}

pub fn record_rpc_error(endpoint: &'static str) {
    counter!("ballot_rpc_errors_total", "endpoint" => endpoint).increment(1);
}

pub fn record_rpc_health(endpoint: &'static str, healthy: bool) {
    gauge!("ballot_rpc_health", "endpoint" => endpoint).set(if healthy { 1.0 } else { 0.0 });
}
