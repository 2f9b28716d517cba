//! HTTP client and wallet bridge tests against a local mock backend.

mod common;

use std::net::SocketAddr;

use serde_json::{json, Value};

use common::{start_programmable_backend, voter, RecordedRequest};
use stellar_ballot::config::schema::TESTNET_PASSPHRASE;
use stellar_ballot::config::{NetworkConfig, SignerConfig};
use stellar_ballot::stellar::address::AccountAddress;
use stellar_ballot::stellar::client::{LedgerRpc, StellarRpcClient};
use stellar_ballot::stellar::signer::{SignerError, TransactionSigner, WalletBridge};
use stellar_ballot::stellar::types::{RpcError, TxStatus};

fn network_for(addr: SocketAddr) -> NetworkConfig {
    NetworkConfig {
        horizon_url: format!("http://{}", addr),
        soroban_rpc_url: format!("http://{}/rpc", addr),
        rpc_timeout_secs: 2,
        ..NetworkConfig::default()
    }
}

async fn horizon(request: RecordedRequest) -> (u16, String) {
    let voter = voter();
    match (request.method.as_str(), request.path.as_str()) {
        ("GET", path) if path == format!("/accounts/{}", voter) => (
            200,
            json!({ "account_id": voter, "sequence": "4294967301" }).to_string(),
        ),
        ("POST", "/transactions") if request.body.starts_with("tx=") => (
            200,
            json!({ "hash": "abc123", "status": "PENDING" }).to_string(),
        ),
        ("POST", "/transactions") => (
            400,
            json!({
                "title": "Transaction Failed",
                "status": 400,
                "extras": {
                    "result_codes": {
                        "transaction": "tx_failed",
                        "operations": ["op_underfunded"]
                    }
                }
            })
            .to_string(),
        ),
        ("GET", "/transactions/abc123") => (
            200,
            json!({ "hash": "abc123", "successful": true, "ledger": 55 }).to_string(),
        ),
        ("POST", "/rpc") => {
            let call: Value = serde_json::from_str(&request.body).unwrap();
            let result = match call["method"].as_str() {
                Some("getHealth") => json!({ "status": "healthy" }),
                Some("simulateTransaction") => json!({
                    "minResourceFee": "4321",
                    "transactionData": "AAAA",
                    "results": [{ "xdr": "AAAAAw==", "auth": [] }],
                    "latestLedger": 99
                }),
                _ => {
                    return (
                        200,
                        json!({ "jsonrpc": "2.0", "id": call["id"], "error": { "code": -32601, "message": "method not found" } })
                            .to_string(),
                    )
                }
            };
            (200, json!({ "jsonrpc": "2.0", "id": call["id"], "result": result }).to_string())
        }
        _ => (404, json!({ "title": "Resource Missing" }).to_string()),
    }
}

#[tokio::test]
async fn test_fetch_account_parses_string_sequence() {
    let addr = start_programmable_backend(horizon).await;
    let client = StellarRpcClient::new(&network_for(addr)).unwrap();

    let account = AccountAddress::parse(&voter()).unwrap();
    let snapshot = client.fetch_account(&account).await.unwrap();
    assert_eq!(snapshot.sequence, 4_294_967_301);
    assert_eq!(snapshot.address, account);
}

#[tokio::test]
async fn test_missing_account_is_http_error() {
    let addr = start_programmable_backend(horizon).await;
    let client = StellarRpcClient::new(&network_for(addr)).unwrap();

    let other = AccountAddress::from_bytes([1u8; 32]);
    let err = client.fetch_account(&other).await.unwrap_err();
    assert!(matches!(err, RpcError::Http { endpoint: "accounts", status: 404, .. }));
}

#[tokio::test]
async fn test_simulate_and_health() {
    let addr = start_programmable_backend(horizon).await;
    let client = StellarRpcClient::new(&network_for(addr)).unwrap();

    let sim = client.simulate("AAAAdraft").await.unwrap();
    assert_eq!(sim.min_resource_fee().unwrap(), 4321);
    assert_eq!(sim.return_value_xdr(), Some("AAAAAw=="));
    assert_eq!(sim.latest_ledger, Some(99));

    assert!(client.is_healthy().await);
}

#[tokio::test]
async fn test_submit_and_status() {
    let addr = start_programmable_backend(horizon).await;
    let client = StellarRpcClient::new(&network_for(addr)).unwrap();

    let submitted = client.submit("AAAAsigned").await.unwrap();
    assert_eq!(submitted.hash, "abc123");
    assert_eq!(submitted.effective_status(), Some(TxStatus::Pending));

    let settled = client.transaction_status("abc123").await.unwrap();
    assert_eq!(settled.effective_status(), Some(TxStatus::Success));
    assert_eq!(settled.ledger, Some(55));

    let missing = client.transaction_status("nope").await.unwrap_err();
    assert!(matches!(missing, RpcError::Http { status: 404, .. }));
}

#[tokio::test]
async fn test_rejected_submission_exposes_result_codes() {
    let addr = start_programmable_backend(|_req: RecordedRequest| async {
        (
            400,
            json!({
                "title": "Transaction Failed",
                "extras": { "result_codes": { "transaction": "tx_bad_seq" } }
            })
            .to_string(),
        )
    })
    .await;
    let client = StellarRpcClient::new(&network_for(addr)).unwrap();

    let err = client.submit("AAAAsigned").await.unwrap_err();
    match err {
        RpcError::Rejected {
            status,
            title,
            result_codes,
        } => {
            assert_eq!(status, 400);
            assert_eq!(title, "Transaction Failed");
            assert_eq!(result_codes.unwrap().transaction.as_deref(), Some("tx_bad_seq"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_json_rpc_error_object() {
    let addr = start_programmable_backend(|req: RecordedRequest| async move {
        let call: Value = serde_json::from_str(&req.body).unwrap();
        (
            200,
            json!({ "jsonrpc": "2.0", "id": call["id"], "error": { "code": -32602, "message": "invalid params" } })
                .to_string(),
        )
    })
    .await;
    let client = StellarRpcClient::new(&network_for(addr)).unwrap();

    let err = client.simulate("AAAA").await.unwrap_err();
    assert!(matches!(err, RpcError::JsonRpc { code: -32602, .. }));
    assert!(!client.is_healthy().await);
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let addr = start_programmable_backend(|_req: RecordedRequest| async {
        (200, "<html>gateway</html>".to_string())
    })
    .await;
    let client = StellarRpcClient::new(&network_for(addr)).unwrap();

    let err = client.transaction_status("abc").await.unwrap_err();
    assert!(matches!(err, RpcError::Decode { endpoint: "status", .. }));
}

// ---------------------------------------------------------------------------
// Wallet bridge
// ---------------------------------------------------------------------------

fn bridge_for(addr: SocketAddr) -> WalletBridge {
    WalletBridge::new(&SignerConfig {
        url: format!("http://{}", addr),
        timeout_secs: 2,
    })
    .unwrap()
}

async fn wallet(request: RecordedRequest) -> (u16, String) {
    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/connected") => (200, json!({ "isConnected": true }).to_string()),
        ("GET", "/address") => (200, json!({ "address": voter() }).to_string()),
        ("GET", "/network") => (
            200,
            json!({ "network": "TESTNET", "networkPassphrase": TESTNET_PASSPHRASE }).to_string(),
        ),
        ("POST", "/access") => (200, json!({ "address": voter() }).to_string()),
        ("POST", "/sign") => {
            let body: Value = serde_json::from_str(&request.body).unwrap();
            if body["networkPassphrase"] != TESTNET_PASSPHRASE {
                return (400, json!({ "error": "wrong network" }).to_string());
            }
            (200, json!({ "signedTxXdr": format!("signed:{}", body["xdr"].as_str().unwrap()) }).to_string())
        }
        _ => (404, String::new()),
    }
}

#[tokio::test]
async fn test_wallet_status_normalizes_shapes() {
    let addr = start_programmable_backend(wallet).await;
    let bridge = bridge_for(addr);

    let status = bridge.status().await.unwrap();
    assert!(status.connected);
    assert_eq!(status.address, Some(voter()));
    assert!(status.ensure_network(TESTNET_PASSPHRASE).is_ok());
    bridge.request_access().await.unwrap();
}

#[tokio::test]
async fn test_wallet_plain_answers() {
    let addr = start_programmable_backend(|req: RecordedRequest| async move {
        match req.path.as_str() {
            "/connected" => (200, "true".to_string()),
            "/address" => (200, voter()),
            "/network" => (200, "\"TESTNET\"".to_string()),
            _ => (404, String::new()),
        }
    })
    .await;
    let bridge = bridge_for(addr);

    assert!(bridge.is_connected().await.unwrap());
    assert_eq!(bridge.address().await.unwrap().to_string(), voter());
    let network = bridge.network().await.unwrap();
    assert_eq!(network.resolved_passphrase(), Some(TESTNET_PASSPHRASE));
}

#[tokio::test]
async fn test_wallet_disconnected_skips_queries() {
    let addr = start_programmable_backend(|req: RecordedRequest| async move {
        match req.path.as_str() {
            "/connected" => (200, "false".to_string()),
            _ => (500, "should not be called".to_string()),
        }
    })
    .await;

    let status = bridge_for(addr).status().await.unwrap();
    assert!(!status.connected);
    assert_eq!(status.address, None);
}

#[tokio::test]
async fn test_wallet_signs_with_passphrase() {
    let addr = start_programmable_backend(wallet).await;
    let bridge = bridge_for(addr);

    let signed = bridge
        .sign_transaction("AAAAunsigned", TESTNET_PASSPHRASE)
        .await
        .unwrap();
    assert_eq!(signed.as_xdr(), "signed:AAAAunsigned");
}

#[tokio::test]
async fn test_wallet_refusal_is_declined() {
    let addr = start_programmable_backend(|_req: RecordedRequest| async {
        (403, "User declined access".to_string())
    })
    .await;

    let err = bridge_for(addr)
        .sign_transaction("AAAA", TESTNET_PASSPHRASE)
        .await
        .unwrap_err();
    assert_eq!(err, SignerError::Declined("User declined access".to_string()));
}
