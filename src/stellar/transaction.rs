//! Transaction building for contract invocations.
//!
//! # Responsibilities
//! - Describe a contract call (`Invocation`)
//! - Build the unsigned envelope used for simulation
//! - Rebuild it with simulated resources and fee before signing
//! - Extract the contract return value from execution metadata

use std::time::{SystemTime, UNIX_EPOCH};

use stellar_xdr::curr::{
    HostFunction, InvokeContractArgs, InvokeHostFunctionOp, Limits, Memo, Operation,
    OperationBody, Preconditions, ReadXdr, ScSymbol, ScVal, SequenceNumber,
    SorobanAuthorizationEntry, SorobanTransactionData, StringM, TimeBounds, TimePoint,
    Transaction, TransactionEnvelope, TransactionExt, TransactionMeta, TransactionV1Envelope,
    VecM, WriteXdr,
};
use thiserror::Error;

use crate::stellar::address::ContractId;
use crate::stellar::types::{AccountSnapshot, SimulationResponse};
use crate::stellar::value::{ContractValue, ValueError};

/// Longest function name a contract can export.
const MAX_SYMBOL_LEN: usize = 32;

/// Errors raised while assembling a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxBuildError {
    #[error("invalid function name '{0}'")]
    InvalidFunction(String),

    #[error(transparent)]
    Value(#[from] ValueError),

    #[error("XDR error: {0}")]
    Xdr(String),

    #[error("fee overflow: base fee {base} + resource fee {resource} exceeds u32")]
    FeeOverflow { base: u32, resource: u64 },

    #[error("sequence number overflow for {0}")]
    SequenceOverflow(String),
}

fn xdr_err(e: stellar_xdr::curr::Error) -> TxBuildError {
    TxBuildError::Xdr(e.to_string())
}

/// Check that a name is a valid contract function symbol.
pub fn validate_function_name(name: &str) -> Result<(), TxBuildError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_SYMBOL_LEN
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(TxBuildError::InvalidFunction(name.to_string()))
    }
}

/// A single contract call. Built fresh for every workflow run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    contract: ContractId,
    function: String,
    args: Vec<ContractValue>,
}

impl Invocation {
    pub fn new(
        contract: ContractId,
        function: &str,
        args: Vec<ContractValue>,
    ) -> Result<Self, TxBuildError> {
        validate_function_name(function)?;
        Ok(Self {
            contract,
            function: function.to_string(),
            args,
        })
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn args(&self) -> &[ContractValue] {
        &self.args
    }

    fn host_function(&self) -> Result<HostFunction, TxBuildError> {
        let args = self
            .args
            .iter()
            .map(ScVal::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let function_name = StringM::try_from(self.function.as_bytes().to_vec())
            .map_err(|_| TxBuildError::InvalidFunction(self.function.clone()))?;

        Ok(HostFunction::InvokeContract(InvokeContractArgs {
            contract_address: self.contract.to_sc_address(),
            function_name: ScSymbol(function_name),
            args: args.try_into().map_err(xdr_err)?,
        }))
    }
}

/// Resource data produced by simulation and attached before signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedResources {
    pub min_resource_fee: u64,
    pub transaction_data: SorobanTransactionData,
    pub auth: Vec<SorobanAuthorizationEntry>,
}

impl PreparedResources {
    pub fn from_simulation(sim: &SimulationResponse) -> Result<Self, TxBuildError> {
        let min_resource_fee = sim
            .min_resource_fee()
            .map_err(|e| TxBuildError::Xdr(e.to_string()))?;
        let data = sim
            .transaction_data
            .as_deref()
            .filter(|d| !d.is_empty())
            .ok_or_else(|| TxBuildError::Xdr("simulation returned no transactionData".to_string()))?;
        let transaction_data =
            SorobanTransactionData::from_xdr_base64(data, Limits::none()).map_err(xdr_err)?;
        let auth = sim
            .auth_entries()
            .iter()
            .map(|a| SorobanAuthorizationEntry::from_xdr_base64(a, Limits::none()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(xdr_err)?;

        Ok(Self {
            min_resource_fee,
            transaction_data,
            auth,
        })
    }
}

/// Fee and validity window for a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildParams {
    pub base_fee: u32,
    /// Unix timestamp after which the network refuses the transaction.
    pub valid_until: u64,
}

impl BuildParams {
    /// Validity window starting now.
    pub fn expiring_in(base_fee: u32, expiration_secs: u64) -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Self {
            base_fee,
            valid_until: now.saturating_add(expiration_secs),
        }
    }
}

/// An unsigned single-operation transaction envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    envelope: TransactionEnvelope,
    fee: u32,
    sequence: i64,
}

impl UnsignedTransaction {
    /// Build the envelope. Without `resources` this is the simulation
    /// draft; with them it is the transaction handed to the signer.
    pub fn build(
        source: &AccountSnapshot,
        invocation: &Invocation,
        params: BuildParams,
        resources: Option<&PreparedResources>,
    ) -> Result<Self, TxBuildError> {
        let sequence = source
            .sequence
            .checked_add(1)
            .ok_or_else(|| TxBuildError::SequenceOverflow(source.address.to_string()))?;

        let fee = match resources {
            None => params.base_fee,
            Some(r) => u64::from(params.base_fee)
                .checked_add(r.min_resource_fee)
                .and_then(|f| u32::try_from(f).ok())
                .ok_or(TxBuildError::FeeOverflow {
                    base: params.base_fee,
                    resource: r.min_resource_fee,
                })?,
        };

        let auth: VecM<SorobanAuthorizationEntry> = resources
            .map(|r| r.auth.clone())
            .unwrap_or_default()
            .try_into()
            .map_err(xdr_err)?;

        let operation = Operation {
            source_account: None,
            body: OperationBody::InvokeHostFunction(InvokeHostFunctionOp {
                host_function: invocation.host_function()?,
                auth,
            }),
        };

        let tx = Transaction {
            source_account: source.address.to_muxed_account(),
            fee,
            seq_num: SequenceNumber(sequence),
            cond: Preconditions::Time(TimeBounds {
                min_time: TimePoint(0),
                max_time: TimePoint(params.valid_until),
            }),
            memo: Memo::None,
            operations: vec![operation].try_into().map_err(xdr_err)?,
            ext: match resources {
                Some(r) => TransactionExt::V1(r.transaction_data.clone()),
                None => TransactionExt::V0,
            },
        };

        Ok(Self {
            envelope: TransactionEnvelope::Tx(TransactionV1Envelope {
                tx,
                signatures: VecM::default(),
            }),
            fee,
            sequence,
        })
    }

    pub fn fee(&self) -> u32 {
        self.fee
    }

    /// Sequence number this transaction consumes.
    pub fn sequence(&self) -> i64 {
        self.sequence
    }

    pub fn envelope(&self) -> &TransactionEnvelope {
        &self.envelope
    }

    pub fn to_xdr_base64(&self) -> Result<String, TxBuildError> {
        self.envelope.to_xdr_base64(Limits::none()).map_err(xdr_err)
    }
}

/// Pull the contract return value out of base64 `TransactionMeta`.
///
/// `Ok(None)` when the meta carries no Soroban section or the function
/// returned void.
pub fn return_value_from_meta(meta_xdr: &str) -> Result<Option<ContractValue>, ValueError> {
    let meta = TransactionMeta::from_xdr_base64(meta_xdr, Limits::none())
        .map_err(|e| ValueError::Xdr(e.to_string()))?;

    let value = match meta {
        TransactionMeta::V3(v3) => v3.soroban_meta.map(|m| m.return_value),
        TransactionMeta::V4(v4) => v4.soroban_meta.and_then(|m| m.return_value),
        _ => None,
    };

    match value {
        None | Some(ScVal::Void) => Ok(None),
        Some(val) => ContractValue::try_from(&val).map(Some),
    }
}
