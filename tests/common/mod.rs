//! Shared utilities for integration testing.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use stellar_xdr::curr::{
    Limits, ReadXdr, ScVal, SorobanTransactionData, TransactionEnvelope, TransactionMeta, WriteXdr,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use stellar_ballot::config::{NetworkConfig, WorkflowConfig};
use stellar_ballot::stellar::address::{AccountAddress, ContractId};
use stellar_ballot::stellar::client::LedgerRpc;
use stellar_ballot::stellar::signer::{SignedTransaction, SignerError, TransactionSigner};
use stellar_ballot::stellar::types::{
    AccountSnapshot, RpcError, RpcResult, SimulationHostResult, SimulationResponse, TransactionRecord,
    TxStatus,
};
use stellar_ballot::stellar::value::ContractValue;
use stellar_ballot::TransactionWorkflow;

// ---------------------------------------------------------------------------
// Identities and XDR fixtures
// ---------------------------------------------------------------------------

pub fn voter() -> String {
    AccountAddress::from_bytes([7u8; 32]).to_string()
}

pub fn contract_id() -> String {
    ContractId::from_bytes([9u8; 32]).to_string()
}

fn words(values: &[u32]) -> Vec<u8> {
    values.iter().flat_map(|w| w.to_be_bytes()).collect()
}

/// Base64 `SorobanTransactionData` with an empty footprint.
pub fn transaction_data(resource_fee: i64) -> String {
    let mut bytes = words(&[0, 0, 0, 1000, 10, 10]);
    bytes.extend_from_slice(&resource_fee.to_be_bytes());
    SorobanTransactionData::from_xdr(bytes, Limits::none())
        .unwrap()
        .to_xdr_base64(Limits::none())
        .unwrap()
}

/// Base64 v3 `TransactionMeta` whose Soroban section returns `value`.
pub fn meta_returning(value: &ScVal) -> String {
    let mut bytes = words(&[3, 0, 0, 0, 0, 1, 0, 0]);
    bytes.extend(value.to_xdr(Limits::none()).unwrap());
    bytes.extend(words(&[0]));
    TransactionMeta::from_xdr(bytes, Limits::none())
        .unwrap()
        .to_xdr_base64(Limits::none())
        .unwrap()
}

/// Base64 v4 `TransactionMeta` whose Soroban section returns `value`.
pub fn meta_v4_returning(value: &ScVal) -> String {
    let mut bytes = words(&[4, 0, 0, 0, 0, 1, 0, 1]);
    bytes.extend(value.to_xdr(Limits::none()).unwrap());
    bytes.extend(words(&[0, 0]));
    TransactionMeta::from_xdr(bytes, Limits::none())
        .unwrap()
        .to_xdr_base64(Limits::none())
        .unwrap()
}

/// Simulation answer for a state-changing call.
pub fn write_simulation(resource_fee: u64) -> SimulationResponse {
    SimulationResponse {
        transaction_data: Some(transaction_data(resource_fee as i64)),
        min_resource_fee: Some(resource_fee.to_string()),
        results: vec![SimulationHostResult {
            xdr: Some(ContractValue::Void.to_xdr_base64().unwrap()),
            auth: Vec::new(),
        }],
        latest_ledger: Some(1000),
        ..SimulationResponse::default()
    }
}

/// Simulation answer for a read-only call.
pub fn read_simulation(value: Option<ContractValue>) -> SimulationResponse {
    SimulationResponse {
        transaction_data: Some(transaction_data(0)),
        min_resource_fee: Some("0".to_string()),
        results: vec![SimulationHostResult {
            xdr: value.map(|v| v.to_xdr_base64().unwrap()),
            auth: Vec::new(),
        }],
        ..SimulationResponse::default()
    }
}

pub fn record(hash: &str, status: Option<TxStatus>) -> TransactionRecord {
    TransactionRecord {
        hash: hash.to_string(),
        status,
        ..TransactionRecord::default()
    }
}

pub fn test_network() -> NetworkConfig {
    NetworkConfig {
        contract_id: contract_id(),
        ..NetworkConfig::default()
    }
}

pub fn workflow(ledger: Arc<ScriptedLedger>, signer: Arc<FakeSigner>) -> TransactionWorkflow {
    TransactionWorkflow::new(ledger, signer, test_network(), WorkflowConfig::default())
}

// ---------------------------------------------------------------------------
// Scripted ledger
// ---------------------------------------------------------------------------

/// One observed call on the scripted ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCall {
    FetchAccount { sequence: i64 },
    Simulate,
    Submit,
    Status,
}

struct Script {
    sequences: VecDeque<i64>,
    simulation: RpcResult<SimulationResponse>,
    submission: RpcResult<TransactionRecord>,
    statuses: VecDeque<RpcResult<TransactionRecord>>,
    repeat_status: Option<TransactionRecord>,
    account_error: Option<(usize, RpcError)>,
    calls: Vec<LedgerCall>,
}

/// In-memory `LedgerRpc` answering from a script and recording call order.
pub struct ScriptedLedger {
    script: Mutex<Script>,
}

impl ScriptedLedger {
    /// Every account fetch returns `sequence` until told otherwise.
    pub fn new(sequence: i64) -> Self {
        Self {
            script: Mutex::new(Script {
                sequences: VecDeque::from([sequence]),
                simulation: Ok(SimulationResponse::default()),
                submission: Ok(record("", Some(TxStatus::Success))),
                statuses: VecDeque::new(),
                repeat_status: None,
                account_error: None,
                calls: Vec::new(),
            }),
        }
    }

    /// Successive account fetches return these; the last one repeats.
    pub fn sequences(self, values: &[i64]) -> Self {
        self.script.lock().unwrap().sequences = values.iter().copied().collect();
        self
    }

    /// The `nth` account fetch (1-based) fails with `error`.
    pub fn fail_account_fetch(self, nth: usize, error: RpcError) -> Self {
        self.script.lock().unwrap().account_error = Some((nth, error));
        self
    }

    pub fn simulation(self, result: RpcResult<SimulationResponse>) -> Self {
        self.script.lock().unwrap().simulation = result;
        self
    }

    pub fn submission(self, result: RpcResult<TransactionRecord>) -> Self {
        self.script.lock().unwrap().submission = result;
        self
    }

    pub fn statuses(self, results: Vec<RpcResult<TransactionRecord>>) -> Self {
        self.script.lock().unwrap().statuses = results.into();
        self
    }

    /// Answer every status query past the scripted ones with `record`.
    pub fn repeat_status(self, record: TransactionRecord) -> Self {
        self.script.lock().unwrap().repeat_status = Some(record);
        self
    }

    pub fn calls(&self) -> Vec<LedgerCall> {
        self.script.lock().unwrap().calls.clone()
    }

    pub fn count(&self, matches: impl Fn(&LedgerCall) -> bool) -> usize {
        self.calls().iter().filter(|c| matches(c)).count()
    }
}

#[async_trait]
impl LedgerRpc for ScriptedLedger {
    async fn fetch_account(&self, address: &AccountAddress) -> RpcResult<AccountSnapshot> {
        let mut script = self.script.lock().unwrap();
        let fetched = script
            .calls
            .iter()
            .filter(|c| matches!(c, LedgerCall::FetchAccount { .. }))
            .count();
        if let Some((nth, error)) = &script.account_error {
            if fetched + 1 == *nth {
                let error = error.clone();
                script.calls.push(LedgerCall::FetchAccount { sequence: -1 });
                return Err(error);
            }
        }
        let sequence = if script.sequences.len() > 1 {
            script.sequences.pop_front().unwrap()
        } else {
            script.sequences[0]
        };
        script.calls.push(LedgerCall::FetchAccount { sequence });
        Ok(AccountSnapshot {
            address: *address,
            sequence,
        })
    }

    async fn simulate(&self, _tx_xdr: &str) -> RpcResult<SimulationResponse> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(LedgerCall::Simulate);
        script.simulation.clone()
    }

    async fn submit(&self, _signed_xdr: &str) -> RpcResult<TransactionRecord> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(LedgerCall::Submit);
        script.submission.clone()
    }

    async fn transaction_status(&self, hash: &str) -> RpcResult<TransactionRecord> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(LedgerCall::Status);
        match script.statuses.pop_front() {
            Some(result) => result,
            None => Ok(script
                .repeat_status
                .clone()
                .unwrap_or_else(|| record(hash, None))),
        }
    }
}

// ---------------------------------------------------------------------------
// Fake signer
// ---------------------------------------------------------------------------

/// What the fake wallet saw.
#[derive(Debug, Clone)]
pub struct SignRequest {
    pub passphrase: String,
    pub sequence: i64,
    pub fee: u32,
}

pub enum SignerBehavior {
    /// Answer `{"signedTxXdr": <input>}`.
    Echo,
    /// Answer with a fixed JSON value.
    Respond(Value),
    Fail(SignerError),
}

pub struct FakeSigner {
    behavior: SignerBehavior,
    requests: Mutex<Vec<SignRequest>>,
}

impl FakeSigner {
    pub fn new(behavior: SignerBehavior) -> Self {
        Self {
            behavior,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn echo() -> Self {
        Self::new(SignerBehavior::Echo)
    }

    pub fn requests(&self) -> Vec<SignRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransactionSigner for FakeSigner {
    async fn sign_transaction(
        &self,
        tx_xdr: &str,
        network_passphrase: &str,
    ) -> Result<SignedTransaction, SignerError> {
        let TransactionEnvelope::Tx(env) =
            TransactionEnvelope::from_xdr_base64(tx_xdr, Limits::none()).unwrap()
        else {
            panic!("expected v1 envelope");
        };
        self.requests.lock().unwrap().push(SignRequest {
            passphrase: network_passphrase.to_string(),
            sequence: env.tx.seq_num.0,
            fee: env.tx.fee,
        });

        match &self.behavior {
            SignerBehavior::Echo => {
                SignedTransaction::from_response(serde_json::json!({ "signedTxXdr": tx_xdr }))
            }
            SignerBehavior::Respond(value) => SignedTransaction::from_response(value.clone()),
            SignerBehavior::Fail(err) => Err(err.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Programmable HTTP backend
// ---------------------------------------------------------------------------

/// A request as seen by the mock backend.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: String,
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let content_length = lines
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    Some(RecordedRequest {
        method,
        path,
        body: String::from_utf8_lossy(&buf[header_end..]).to_string(),
    })
}

/// Start a mock backend on an ephemeral port. `f` maps each request to a
/// status code and body.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(RecordedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        let (status, body) = f(request).await;
                        let status_text = match status {
                            200 => "200 OK",
                            400 => "400 Bad Request",
                            403 => "403 Forbidden",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}
