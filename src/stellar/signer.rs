//! External signer adapter.
//!
//! # Security
//! - This crate never holds secret keys; signing happens in the wallet
//! - Signed payloads are never logged or inspected
//!
//! Wallet extensions answer with several shapes for the same question
//! (`"G..."` or `{"address": "G..."}`, `true` or `{"isConnected": true}`).
//! Everything is normalized here, on receipt, so callers see one type per
//! answer.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::time::timeout;

use crate::config::schema::{SignerConfig, TESTNET_PASSPHRASE};
use crate::stellar::address::AccountAddress;

const PUBLIC_PASSPHRASE: &str = "Public Global Stellar Network ; September 2015";
const FUTURENET_PASSPHRASE: &str = "Test SDF Future Network ; October 2022";

/// Errors raised by the signer or while interpreting its answers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignerError {
    #[error("wallet unavailable: {0}")]
    Unavailable(String),

    #[error("request declined by wallet: {0}")]
    Declined(String),

    #[error("wallet timed out after {0} seconds")]
    Timeout(u64),

    #[error("unrecognized {what} response: {shape}")]
    UnrecognizedResponse { what: &'static str, shape: String },

    #[error("wallet is on network '{actual}', expected '{expected}'")]
    NetworkMismatch { expected: String, actual: String },
}

/// Opaque signed envelope, forwarded to the network as-is.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedTransaction(String);

impl SignedTransaction {
    /// Normalize a signer answer: either the raw base64 payload or an object
    /// wrapping it. Anything else is rejected.
    pub fn from_response(value: Value) -> Result<Self, SignerError> {
        match value {
            Value::String(xdr) if !xdr.trim().is_empty() => Ok(Self(xdr.trim().to_string())),
            Value::Object(mut map) => {
                for key in ["signedTxXdr", "signedTransaction"] {
                    if let Some(Value::String(xdr)) = map.remove(key) {
                        if !xdr.trim().is_empty() {
                            return Ok(Self(xdr.trim().to_string()));
                        }
                    }
                }
                if let Some(err) = map.get("error") {
                    return Err(SignerError::Declined(error_text(err)));
                }
                Err(unrecognized("signTransaction", &Value::Object(map)))
            }
            other => Err(unrecognized("signTransaction", &other)),
        }
    }

    pub fn as_xdr(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SignedTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignedTransaction({} bytes)", self.0.len())
    }
}

fn error_text(err: &Value) -> String {
    match err {
        Value::String(s) => s.clone(),
        Value::Object(o) => o
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string()),
        other => other.to_string(),
    }
}

fn unrecognized(what: &'static str, value: &Value) -> SignerError {
    let shape = match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "boolean".to_string(),
        Value::Number(_) => "number".to_string(),
        Value::String(_) => "empty string".to_string(),
        Value::Array(_) => "array".to_string(),
        Value::Object(o) => format!("object with keys [{}]", o.keys().cloned().collect::<Vec<_>>().join(", ")),
    };
    SignerError::UnrecognizedResponse { what, shape }
}

/// Anything that can turn an unsigned envelope into a signed one.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    async fn sign_transaction(
        &self,
        tx_xdr: &str,
        network_passphrase: &str,
    ) -> Result<SignedTransaction, SignerError>;
}

/// Network reported by the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletNetwork {
    pub name: String,
    pub passphrase: Option<String>,
}

impl WalletNetwork {
    /// Passphrase, inferred from well-known network names when not given.
    pub fn resolved_passphrase(&self) -> Option<&str> {
        if let Some(p) = self.passphrase.as_deref() {
            return Some(p);
        }
        match self.name.to_ascii_uppercase().as_str() {
            "TESTNET" => Some(TESTNET_PASSPHRASE),
            "PUBLIC" | "MAINNET" => Some(PUBLIC_PASSPHRASE),
            "FUTURENET" => Some(FUTURENET_PASSPHRASE),
            _ if self.name.contains(';') => Some(self.name.as_str()),
            _ => None,
        }
    }
}

/// Snapshot of the wallet connection, owned by whoever drives the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletStatus {
    pub connected: bool,
    pub address: Option<String>,
    pub network: Option<WalletNetwork>,
}

impl WalletStatus {
    pub fn disconnected() -> Self {
        Self {
            connected: false,
            address: None,
            network: None,
        }
    }

    /// Fail unless the wallet signs for `expected`.
    pub fn ensure_network(&self, expected: &str) -> Result<(), SignerError> {
        let actual = self
            .network
            .as_ref()
            .and_then(WalletNetwork::resolved_passphrase)
            .unwrap_or("unknown");
        if actual == expected {
            Ok(())
        } else {
            Err(SignerError::NetworkMismatch {
                expected: expected.to_string(),
                actual: actual.to_string(),
            })
        }
    }
}

pub fn normalize_connected(value: &Value) -> Result<bool, SignerError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Object(o) => o
            .get("isConnected")
            .and_then(Value::as_bool)
            .ok_or_else(|| unrecognized("isConnected", value)),
        _ => Err(unrecognized("isConnected", value)),
    }
}

pub fn normalize_address(value: &Value) -> Result<AccountAddress, SignerError> {
    let raw = match value {
        Value::String(s) => Some(s.as_str()),
        Value::Object(o) => o
            .get("address")
            .or_else(|| o.get("publicKey"))
            .and_then(Value::as_str),
        _ => None,
    };
    let raw = raw.ok_or_else(|| unrecognized("getAddress", value))?;
    AccountAddress::parse(raw).map_err(|e| SignerError::UnrecognizedResponse {
        what: "getAddress",
        shape: e.to_string(),
    })
}

pub fn normalize_network(value: &Value) -> Result<WalletNetwork, SignerError> {
    match value {
        Value::String(s) if !s.is_empty() => Ok(WalletNetwork {
            name: s.clone(),
            passphrase: None,
        }),
        Value::Object(o) => {
            let name = o
                .get("network")
                .and_then(Value::as_str)
                .ok_or_else(|| unrecognized("getNetwork", value))?;
            Ok(WalletNetwork {
                name: name.to_string(),
                passphrase: o
                    .get("networkPassphrase")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            })
        }
        _ => Err(unrecognized("getNetwork", value)),
    }
}

/// HTTP adapter for a local wallet bridge.
///
/// Endpoints: `GET /connected`, `GET /address`, `GET /network`,
/// `POST /access`, `POST /sign`.
#[derive(Clone)]
pub struct WalletBridge {
    http: reqwest::Client,
    base_url: String,
    timeout_duration: Duration,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignRequest<'a> {
    xdr: &'a str,
    network_passphrase: &'a str,
}

impl WalletBridge {
    pub fn new(config: &SignerConfig) -> Result<Self, SignerError> {
        url::Url::parse(&config.url)
            .map_err(|e| SignerError::Unavailable(format!("invalid URL '{}': {}", config.url, e)))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            timeout_duration: Duration::from_secs(config.timeout_secs),
        })
    }

    async fn call(&self, request: reqwest::RequestBuilder) -> Result<Value, SignerError> {
        let fut = async {
            let response = request.send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        let (status, body) = match timeout(self.timeout_duration, fut).await {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => return Err(SignerError::Unavailable(e.to_string())),
            Err(_) => return Err(SignerError::Timeout(self.timeout_duration.as_secs())),
        };

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(SignerError::Declined(body));
        }
        if !status.is_success() {
            return Err(SignerError::Unavailable(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        // Bridges may answer with a bare string that is not JSON-quoted.
        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }

    pub async fn is_connected(&self) -> Result<bool, SignerError> {
        let value = self.call(self.http.get(format!("{}/connected", self.base_url))).await?;
        normalize_connected(&value)
    }

    pub async fn address(&self) -> Result<AccountAddress, SignerError> {
        let value = self.call(self.http.get(format!("{}/address", self.base_url))).await?;
        normalize_address(&value)
    }

    pub async fn network(&self) -> Result<WalletNetwork, SignerError> {
        let value = self.call(self.http.get(format!("{}/network", self.base_url))).await?;
        normalize_network(&value)
    }

    pub async fn request_access(&self) -> Result<(), SignerError> {
        self.call(self.http.post(format!("{}/access", self.base_url)))
            .await
            .map(|_| ())
    }

    /// Query connection, address and network in one go.
    pub async fn status(&self) -> Result<WalletStatus, SignerError> {
        if !self.is_connected().await? {
            return Ok(WalletStatus::disconnected());
        }
        let address = self.address().await?;
        let network = self.network().await?;
        Ok(WalletStatus {
            connected: true,
            address: Some(address.to_string()),
            network: Some(network),
        })
    }
}

#[async_trait]
impl TransactionSigner for WalletBridge {
    async fn sign_transaction(
        &self,
        tx_xdr: &str,
        network_passphrase: &str,
    ) -> Result<SignedTransaction, SignerError> {
        tracing::info!("Waiting for wallet signature");
        let request = self.http.post(format!("{}/sign", self.base_url)).json(&SignRequest {
            xdr: tx_xdr,
            network_passphrase,
        });
        let value = self.call(request).await?;
        SignedTransaction::from_response(value)
    }
}

impl fmt::Debug for WalletBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletBridge")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_duration.as_secs())
            .finish()
    }
}
