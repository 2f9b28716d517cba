//! Network RPC client with timeout and error handling.
//!
//! # Responsibilities
//! - Fetch account sequence numbers (Horizon)
//! - Simulate transactions (Soroban JSON-RPC)
//! - Submit signed transactions and poll their status (Horizon)
//! - Provide health check for RPC connectivity

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::time::timeout;

use crate::config::NetworkConfig;
use crate::observability::metrics;
use crate::stellar::address::AccountAddress;
use crate::stellar::types::{
    AccountSnapshot, HorizonAccount, HorizonProblem, RpcError, RpcResult, SimulationResponse,
    TransactionRecord,
};

/// Network operations the transaction workflow depends on.
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Current sequence number of `address`.
    async fn fetch_account(&self, address: &AccountAddress) -> RpcResult<AccountSnapshot>;

    /// Dry-run an unsigned transaction (base64 envelope).
    async fn simulate(&self, tx_xdr: &str) -> RpcResult<SimulationResponse>;

    /// Submit a signed envelope. Non-2xx answers are `RpcError::Rejected`.
    async fn submit(&self, signed_xdr: &str) -> RpcResult<TransactionRecord>;

    /// Look up a submitted transaction by hash.
    async fn transaction_status(&self, hash: &str) -> RpcResult<TransactionRecord>;
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct JsonRpcResponse<T> {
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    error: Option<JsonRpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorBody {
    code: i64,
    message: String,
}

/// Horizon + Soroban RPC client over HTTP.
#[derive(Clone)]
pub struct StellarRpcClient {
    http: reqwest::Client,
    horizon_url: String,
    soroban_rpc_url: String,
    /// Request timeout duration.
    timeout_duration: Duration,
    next_id: Arc<AtomicU64>,
}

impl StellarRpcClient {
    /// Create a new client from network configuration.
    pub fn new(config: &NetworkConfig) -> RpcResult<Self> {
        let horizon_url = normalize_base(&config.horizon_url, "accounts")?;
        let soroban_rpc_url = normalize_base(&config.soroban_rpc_url, "simulate")?;

        let http = reqwest::Client::builder()
            .user_agent(concat!("stellar-ballot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RpcError::Transport {
                endpoint: "client",
                message: e.to_string(),
            })?;

        tracing::debug!(
            horizon_url = %horizon_url,
            soroban_rpc_url = %soroban_rpc_url,
            timeout_secs = config.rpc_timeout_secs,
            "RPC client initialized"
        );

        Ok(Self {
            http,
            horizon_url,
            soroban_rpc_url,
            timeout_duration: Duration::from_secs(config.rpc_timeout_secs),
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Check if the Soroban RPC endpoint reports itself healthy.
    pub async fn is_healthy(&self) -> bool {
        #[derive(Deserialize)]
        struct Health {
            status: String,
        }

        let healthy = matches!(
            self.json_rpc::<Health>("health", "getHealth", Value::Null).await,
            Ok(h) if h.status == "healthy"
        );
        metrics::record_rpc_health("soroban_rpc", healthy);
        healthy
    }

    /// Send a request under the client timeout and read the body.
    async fn send(
        &self,
        endpoint: &'static str,
        request: RequestBuilder,
    ) -> RpcResult<(StatusCode, String)> {
        let fut = async {
            let response = request.send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        let result = match timeout(self.timeout_duration, fut).await {
            Ok(Ok(pair)) => Ok(pair),
            Ok(Err(e)) => Err(RpcError::Transport {
                endpoint,
                message: e.to_string(),
            }),
            Err(_) => Err(RpcError::Timeout {
                endpoint,
                secs: self.timeout_duration.as_secs(),
            }),
        };

        if let Err(e) = &result {
            tracing::warn!(endpoint, error = %e, "RPC request failed");
            metrics::record_rpc_error(endpoint);
        }
        result
    }

    async fn json_rpc<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        method: &str,
        params: Value,
    ) -> RpcResult<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut payload = json!({ "jsonrpc": "2.0", "id": id, "method": method });
        if !params.is_null() {
            payload["params"] = params;
        }

        let request = self.http.post(&self.soroban_rpc_url).json(&payload);
        let (status, body) = self.send(endpoint, request).await?;
        if !status.is_success() {
            metrics::record_rpc_error(endpoint);
            return Err(RpcError::Http {
                endpoint,
                status: status.as_u16(),
                body: truncate(&body),
            });
        }

        let parsed: JsonRpcResponse<T> = decode(endpoint, &body)?;
        match (parsed.result, parsed.error) {
            (_, Some(err)) => Err(RpcError::JsonRpc {
                endpoint,
                code: err.code,
                message: err.message,
            }),
            (Some(result), None) => Ok(result),
            (None, None) => Err(RpcError::Decode {
                endpoint,
                message: "response has neither result nor error".to_string(),
            }),
        }
    }
}

#[async_trait]
impl LedgerRpc for StellarRpcClient {
    async fn fetch_account(&self, address: &AccountAddress) -> RpcResult<AccountSnapshot> {
        let endpoint = "accounts";
        let url = format!("{}/accounts/{}", self.horizon_url, address);
        let (status, body) = self.send(endpoint, self.http.get(url)).await?;
        if !status.is_success() {
            return Err(RpcError::Http {
                endpoint,
                status: status.as_u16(),
                body: truncate(&body),
            });
        }

        let account: HorizonAccount = decode(endpoint, &body)?;
        let sequence = account.sequence.parse::<i64>().map_err(|e| RpcError::Decode {
            endpoint,
            message: format!("sequence '{}': {}", account.sequence, e),
        })?;

        tracing::debug!(address = %address, sequence, "Fetched account");
        Ok(AccountSnapshot {
            address: *address,
            sequence,
        })
    }

    async fn simulate(&self, tx_xdr: &str) -> RpcResult<SimulationResponse> {
        self.json_rpc(
            "simulate",
            "simulateTransaction",
            json!({ "transaction": tx_xdr }),
        )
        .await
    }

    async fn submit(&self, signed_xdr: &str) -> RpcResult<TransactionRecord> {
        let endpoint = "submit";
        let url = format!("{}/transactions", self.horizon_url);
        let request = self.http.post(url).form(&[("tx", signed_xdr)]);
        let (status, body) = self.send(endpoint, request).await?;

        if !status.is_success() {
            metrics::record_rpc_error(endpoint);
            let problem: HorizonProblem = serde_json::from_str(&body).unwrap_or_default();
            let title = problem
                .detail
                .or(problem.title)
                .unwrap_or_else(|| truncate(&body));
            return Err(RpcError::Rejected {
                status: status.as_u16(),
                title,
                result_codes: problem.extras.and_then(|x| x.result_codes),
            });
        }

        decode(endpoint, &body)
    }

    async fn transaction_status(&self, hash: &str) -> RpcResult<TransactionRecord> {
        let endpoint = "status";
        let url = format!("{}/transactions/{}", self.horizon_url, hash);
        let (status, body) = self.send(endpoint, self.http.get(url)).await?;
        if !status.is_success() {
            return Err(RpcError::Http {
                endpoint,
                status: status.as_u16(),
                body: truncate(&body),
            });
        }
        decode(endpoint, &body)
    }
}

impl std::fmt::Debug for StellarRpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StellarRpcClient")
            .field("horizon_url", &self.horizon_url)
            .field("soroban_rpc_url", &self.soroban_rpc_url)
            .field("timeout_secs", &self.timeout_duration.as_secs())
            .finish()
    }
}

fn normalize_base(raw: &str, endpoint: &'static str) -> RpcResult<String> {
    url::Url::parse(raw).map_err(|e| RpcError::Transport {
        endpoint,
        message: format!("Invalid URL '{}': {}", raw, e),
    })?;
    Ok(raw.trim_end_matches('/').to_string())
}

fn decode<T: DeserializeOwned>(endpoint: &'static str, body: &str) -> RpcResult<T> {
    serde_json::from_str(body).map_err(|e| RpcError::Decode {
        endpoint,
        message: e.to_string(),
    })
}

fn truncate(body: &str) -> String {
    const LIMIT: usize = 512;
    match body.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
