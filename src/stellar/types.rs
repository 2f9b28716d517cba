//! Network-facing types and error definitions.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stellar::address::AccountAddress;

/// Errors raised by the network RPC client.
#[derive(Debug, Clone, Error)]
pub enum RpcError {
    /// Connection or request failed before a response arrived.
    #[error("{endpoint} transport error: {message}")]
    Transport { endpoint: &'static str, message: String },

    /// RPC request timed out.
    #[error("{endpoint} request timed out after {secs} seconds")]
    Timeout { endpoint: &'static str, secs: u64 },

    /// Endpoint answered with a non-2xx status.
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Http {
        endpoint: &'static str,
        status: u16,
        body: String,
    },

    /// The network rejected a submitted transaction.
    #[error("transaction rejected (HTTP {status}): {title}{}", fmt_codes(.result_codes))]
    Rejected {
        status: u16,
        title: String,
        result_codes: Option<ResultCodes>,
    },

    /// JSON-RPC level error object.
    #[error("{endpoint} JSON-RPC error {code}: {message}")]
    JsonRpc {
        endpoint: &'static str,
        code: i64,
        message: String,
    },

    /// Response body could not be interpreted.
    #[error("{endpoint} returned malformed response: {message}")]
    Decode { endpoint: &'static str, message: String },
}

fn fmt_codes(codes: &Option<ResultCodes>) -> String {
    codes
        .as_ref()
        .map(|c| format!(" [{}]", c))
        .unwrap_or_default()
}

impl RpcError {
    pub fn endpoint(&self) -> &'static str {
        match self {
            RpcError::Transport { endpoint, .. }
            | RpcError::Timeout { endpoint, .. }
            | RpcError::Http { endpoint, .. }
            | RpcError::JsonRpc { endpoint, .. }
            | RpcError::Decode { endpoint, .. } => endpoint,
            RpcError::Rejected { .. } => "submit",
        }
    }
}

/// Result type for RPC operations.
pub type RpcResult<T> = Result<T, RpcError>;

/// Account state at the moment it was fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountSnapshot {
    pub address: AccountAddress,
    /// Last consumed sequence number; the next transaction uses `sequence + 1`.
    pub sequence: i64,
}

/// Horizon `GET /accounts/{id}` body (only the fields we read).
#[derive(Debug, Clone, Deserialize)]
pub struct HorizonAccount {
    pub account_id: String,
    pub sequence: String,
}

/// Transaction status as reported by submission and polling endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxStatus {
    Pending,
    Duplicate,
    Success,
    Failed,
    #[serde(other)]
    Unknown,
}

impl TxStatus {
    /// SUCCESS and FAILED are final; UNKNOWN is final but ambiguous.
    pub fn is_terminal(self) -> bool {
        !matches!(self, TxStatus::Pending | TxStatus::Duplicate)
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TxStatus::Pending => "PENDING",
            TxStatus::Duplicate => "DUPLICATE",
            TxStatus::Success => "SUCCESS",
            TxStatus::Failed => "FAILED",
            TxStatus::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// A transaction as returned by submission or status polling.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TransactionRecord {
    #[serde(default)]
    pub hash: String,

    /// Explicit status, when the endpoint reports one.
    #[serde(default, alias = "tx_status", skip_serializing_if = "Option::is_none")]
    pub status: Option<TxStatus>,

    /// Horizon's ingested-transaction flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub successful: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_xdr: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_meta_xdr: Option<String>,
}

impl TransactionRecord {
    /// Status after folding Horizon's `successful` flag into the status set.
    /// `None` means the endpoint has not reported a state yet.
    pub fn effective_status(&self) -> Option<TxStatus> {
        self.status.or_else(|| {
            self.successful
                .map(|ok| if ok { TxStatus::Success } else { TxStatus::Failed })
        })
    }

    pub fn is_terminal(&self) -> bool {
        self.effective_status().is_some_and(TxStatus::is_terminal)
    }
}

/// Structured result codes from a rejected submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ResultCodes {
    #[serde(default)]
    pub transaction: Option<String>,
    #[serde(default)]
    pub operations: Vec<String>,
}

impl fmt::Display for ResultCodes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.transaction.as_deref().unwrap_or("unknown"))?;
        if !self.operations.is_empty() {
            write!(f, ": {}", self.operations.join(", "))?;
        }
        Ok(())
    }
}

/// Horizon problem document returned with non-2xx responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HorizonProblem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub extras: Option<ProblemExtras>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProblemExtras {
    #[serde(default)]
    pub result_codes: Option<ResultCodes>,
}

/// Soroban RPC `simulateTransaction` result.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResponse {
    #[serde(default)]
    pub error: Option<String>,
    /// Base64 `SorobanTransactionData`.
    #[serde(default)]
    pub transaction_data: Option<String>,
    /// Decimal string, in stroops.
    #[serde(default)]
    pub min_resource_fee: Option<String>,
    #[serde(default)]
    pub results: Vec<SimulationHostResult>,
    #[serde(default)]
    pub latest_ledger: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SimulationHostResult {
    /// Base64 `ScVal` return value.
    #[serde(default)]
    pub xdr: Option<String>,
    /// Base64 `SorobanAuthorizationEntry` list.
    #[serde(default)]
    pub auth: Vec<String>,
}

impl SimulationResponse {
    pub fn min_resource_fee(&self) -> RpcResult<u64> {
        match self.min_resource_fee.as_deref() {
            None => Ok(0),
            Some(raw) => raw.trim().parse().map_err(|e| RpcError::Decode {
                endpoint: "simulate",
                message: format!("minResourceFee '{}': {}", raw, e),
            }),
        }
    }

    /// Return value of the first host function, if the simulation produced one.
    pub fn return_value_xdr(&self) -> Option<&str> {
        self.results
            .first()
            .and_then(|r| r.xdr.as_deref())
            .filter(|x| !x.is_empty())
    }

    pub fn auth_entries(&self) -> &[String] {
        self.results
            .first()
            .map(|r| r.auth.as_slice())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_terminality() {
        assert!(!TxStatus::Pending.is_terminal());
        assert!(!TxStatus::Duplicate.is_terminal());
        assert!(TxStatus::Success.is_terminal());
        assert!(TxStatus::Failed.is_terminal());
        assert!(TxStatus::Unknown.is_terminal());
    }

    #[test]
    fn test_record_status_parsing() {
        let rec: TransactionRecord =
            serde_json::from_str(r#"{"hash":"ab","status":"PENDING"}"#).unwrap();
        assert_eq!(rec.effective_status(), Some(TxStatus::Pending));

        let rec: TransactionRecord =
            serde_json::from_str(r#"{"hash":"ab","tx_status":"TRY_AGAIN_LATER"}"#).unwrap();
        assert_eq!(rec.effective_status(), Some(TxStatus::Unknown));

        let rec: TransactionRecord =
            serde_json::from_str(r#"{"hash":"ab","successful":false,"ledger":7}"#).unwrap();
        assert_eq!(rec.effective_status(), Some(TxStatus::Failed));
        assert!(rec.is_terminal());

        let rec: TransactionRecord = serde_json::from_str(r#"{"hash":"ab"}"#).unwrap();
        assert_eq!(rec.effective_status(), None);
        assert!(!rec.is_terminal());
    }

    #[test]
    fn test_rejected_display_includes_codes() {
        let err = RpcError::Rejected {
            status: 400,
            title: "Transaction Failed".to_string(),
            result_codes: Some(ResultCodes {
                transaction: Some("tx_failed".to_string()),
                operations: vec!["op_underfunded".to_string()],
            }),
        };
        assert_eq!(
            err.to_string(),
            "transaction rejected (HTTP 400): Transaction Failed [tx_failed: op_underfunded]"
        );
        assert_eq!(err.endpoint(), "submit");
    }

    #[test]
    fn test_simulation_parsing() {
        let sim: SimulationResponse = serde_json::from_str(
            r#"{"minResourceFee":"5120","transactionData":"AAAA","results":[{"xdr":"AAAAAw==","auth":["x"]}],"latestLedger":12}"#,
        )
        .unwrap();
        assert_eq!(sim.min_resource_fee().unwrap(), 5120);
        assert_eq!(sim.return_value_xdr(), Some("AAAAAw=="));
        assert_eq!(sim.auth_entries(), &["x".to_string()]);

        let empty = SimulationResponse::default();
        assert_eq!(empty.min_resource_fee().unwrap(), 0);
        assert_eq!(empty.return_value_xdr(), None);
        assert!(empty.auth_entries().is_empty());
    }
}
