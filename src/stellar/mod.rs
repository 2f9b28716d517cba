//! Stellar network integration subsystem.
//!
//! # Data Flow
//! ```text
//! Invocation (contract, function, args)
//!     → value.rs (native values ↔ ScVal)
//!     → transaction.rs (envelope build, resource attachment, meta decoding)
//!     → client.rs (Horizon + Soroban RPC with timeouts)
//!     → signer.rs (external wallet, response normalization)
//! ```
//!
//! # Security Constraints
//! - No secret keys in this process; signing is delegated
//! - Never log signed payloads
//! - All RPC calls have configurable timeouts

pub mod address;
pub mod client;
pub mod signer;
pub mod transaction;
pub mod types;
pub mod value;

pub use address::{AccountAddress, AddressError, ContractId};
pub use client::{LedgerRpc, StellarRpcClient};
pub use signer::{SignedTransaction, SignerError, TransactionSigner, WalletBridge, WalletStatus};
pub use types::{RpcError, TransactionRecord, TxStatus};
pub use value::ContractValue;
