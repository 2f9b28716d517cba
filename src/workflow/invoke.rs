//! Contract invocation pipeline.
//!
//! # Read-only
//! build → simulate → return the simulated value (or the fallback default)
//!
//! # Read-write
//! build → simulate → finalize (fresh sequence, resource fee, auth) → sign
//! → submit → poll until terminal → decode the return value
//!
//! Submission and confirmation share one wall-clock deadline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::Instrument;
use uuid::Uuid;

use crate::config::{NetworkConfig, WorkflowConfig};
use crate::observability::metrics;
use crate::resilience::with_deadline;
use crate::stellar::address::{AccountAddress, ContractId};
use crate::stellar::client::LedgerRpc;
use crate::stellar::signer::{SignedTransaction, TransactionSigner};
use crate::stellar::transaction::{
    return_value_from_meta, BuildParams, Invocation, PreparedResources, UnsignedTransaction,
};
use crate::stellar::types::{AccountSnapshot, RpcError, SimulationResponse, TransactionRecord, TxStatus};
use crate::stellar::value::ContractValue;
use crate::workflow::confirm::await_confirmation;
use crate::workflow::defaults::FallbackDefaults;
use crate::workflow::error::{ErrorKind, Stage, WorkflowError};

/// Whether the call changes ledger state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallMode {
    /// Simulate only; nothing is signed or submitted.
    ReadOnly,
    ReadWrite,
}

impl CallMode {
    pub fn as_str(self) -> &'static str {
        match self {
            CallMode::ReadOnly => "read_only",
            CallMode::ReadWrite => "read_write",
        }
    }
}

/// Result of a finished invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationOutcome {
    /// Transaction hash; `None` for read-only calls.
    pub hash: Option<String>,
    pub status: TxStatus,
    /// Decoded return value; `None` for void functions.
    pub return_value: Option<ContractValue>,
    /// Raw record from the network, for read-write calls.
    pub record: Option<TransactionRecord>,
    /// Set when execution metadata was present but unreadable.
    pub decode_error: Option<String>,
}

impl InvocationOutcome {
    pub fn value(&self) -> Option<&ContractValue> {
        self.return_value.as_ref()
    }

    pub fn is_success(&self) -> bool {
        self.status == TxStatus::Success
    }

    fn outcome_label(&self) -> &'static str {
        match self.status {
            TxStatus::Success => "success",
            TxStatus::Failed => "failed",
            _ => "unknown",
        }
    }
}

/// Inputs that passed validation.
struct Call {
    source: AccountAddress,
    invocation: Invocation,
    timeout: Duration,
}

impl Call {
    fn function(&self) -> &str {
        self.invocation.function()
    }

    fn fail(&self, stage: Stage, kind: impl Into<ErrorKind>) -> WorkflowError {
        WorkflowError::new(self.function(), stage, kind)
    }
}

/// Runs contract invocations against one network and contract.
///
/// Holds no per-call state; concurrent invocations are independent.
#[derive(Clone)]
pub struct TransactionWorkflow {
    rpc: Arc<dyn LedgerRpc>,
    signer: Arc<dyn TransactionSigner>,
    network: NetworkConfig,
    settings: WorkflowConfig,
    defaults: FallbackDefaults,
}

impl TransactionWorkflow {
    /// A zero poll budget is raised to one query so a pending submission
    /// is always checked at least once.
    pub fn new(
        rpc: Arc<dyn LedgerRpc>,
        signer: Arc<dyn TransactionSigner>,
        network: NetworkConfig,
        mut settings: WorkflowConfig,
    ) -> Self {
        settings.poll.max_attempts = settings.poll.max_attempts.max(1);
        Self {
            rpc,
            signer,
            network,
            settings,
            defaults: FallbackDefaults::default(),
        }
    }

    pub fn with_defaults(mut self, defaults: FallbackDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn network_passphrase(&self) -> &str {
        &self.network.passphrase
    }

    /// Invoke `function` on the configured contract as `source`.
    ///
    /// `timeout_ms` bounds submission plus confirmation and defaults to the
    /// configured value.
    pub async fn invoke(
        &self,
        function: &str,
        args: Vec<ContractValue>,
        source: &str,
        mode: CallMode,
        timeout_ms: Option<u64>,
    ) -> Result<InvocationOutcome, WorkflowError> {
        let started = Instant::now();
        let span = tracing::info_span!(
            "invoke",
            invocation_id = %Uuid::new_v4(),
            function,
            mode = mode.as_str()
        );

        let result = async {
            let call = self.validate(function, args, source, timeout_ms)?;
            match mode {
                CallMode::ReadOnly => self.read_only(&call).await,
                CallMode::ReadWrite => self.read_write(&call).await,
            }
        }
        .instrument(span.clone())
        .await;

        span.in_scope(|| match &result {
            Ok(outcome) => {
                metrics::record_invocation(function, mode.as_str(), outcome.outcome_label(), started);
                tracing::info!(status = %outcome.status, hash = ?outcome.hash, "Invocation finished");
            }
            Err(e) => {
                metrics::record_invocation(function, mode.as_str(), e.kind.label(), started);
                tracing::warn!(stage = %e.stage, error = %e.kind, "Invocation failed");
            }
        });
        result
    }

    fn validate(
        &self,
        function: &str,
        args: Vec<ContractValue>,
        source: &str,
        timeout_ms: Option<u64>,
    ) -> Result<Call, WorkflowError> {
        let fail = |message: String| {
            WorkflowError::new(function, Stage::Validate, ErrorKind::Validation(message))
        };

        let source =
            AccountAddress::parse(source).map_err(|e| fail(format!("source address: {}", e)))?;
        let contract = ContractId::parse(&self.network.contract_id).map_err(|e| fail(e.to_string()))?;
        for arg in &args {
            arg.to_sc_val().map_err(|e| fail(format!("argument: {}", e)))?;
        }
        let invocation = Invocation::new(contract, function, args).map_err(|e| fail(e.to_string()))?;

        let timeout_ms = timeout_ms.unwrap_or(self.settings.default_timeout_ms);
        if timeout_ms == 0 {
            return Err(fail("timeout must be positive".to_string()));
        }

        Ok(Call {
            source,
            invocation,
            timeout: Duration::from_millis(timeout_ms),
        })
    }

    async fn snapshot(&self, call: &Call, stage: Stage) -> Result<AccountSnapshot, WorkflowError> {
        let snapshot = self
            .rpc
            .fetch_account(&call.source)
            .await
            .map_err(|e| call.fail(stage, e))?;
        tracing::debug!(stage = %stage, sequence = snapshot.sequence, "Account snapshot");
        Ok(snapshot)
    }

    fn build(
        &self,
        call: &Call,
        snapshot: &AccountSnapshot,
        resources: Option<&PreparedResources>,
        stage: Stage,
    ) -> Result<(UnsignedTransaction, String), WorkflowError> {
        let encoding = |e: crate::stellar::transaction::TxBuildError| {
            call.fail(stage, ErrorKind::Encoding(e.to_string()))
        };
        let params = BuildParams::expiring_in(self.network.base_fee, self.network.tx_expiration_secs);
        let tx = UnsignedTransaction::build(snapshot, &call.invocation, params, resources)
            .map_err(encoding)?;
        let xdr = tx.to_xdr_base64().map_err(encoding)?;
        Ok((tx, xdr))
    }

    async fn simulate(&self, call: &Call, tx_xdr: &str) -> Result<SimulationResponse, WorkflowError> {
        let sim = self.rpc.simulate(tx_xdr).await.map_err(|e| {
            let kind = match e {
                RpcError::JsonRpc { .. } => ErrorKind::Simulation(e.to_string()),
                other => ErrorKind::Network(other),
            };
            call.fail(Stage::Simulate, kind)
        })?;

        if let Some(err) = sim.error.as_deref().filter(|e| !e.is_empty()) {
            return Err(call.fail(Stage::Simulate, ErrorKind::Simulation(err.to_string())));
        }

        tracing::debug!(
            min_resource_fee = ?sim.min_resource_fee,
            latest_ledger = ?sim.latest_ledger,
            "Simulation complete"
        );
        Ok(sim)
    }

    async fn read_only(&self, call: &Call) -> Result<InvocationOutcome, WorkflowError> {
        let snapshot = self.snapshot(call, Stage::Build).await?;
        let (_, draft) = self.build(call, &snapshot, None, Stage::Build)?;
        let sim = self.simulate(call, &draft).await?;

        let value = match sim.return_value_xdr() {
            Some(raw) => ContractValue::from_xdr_base64(raw)
                .map_err(|e| call.fail(Stage::Simulate, ErrorKind::Decode(e.to_string())))?,
            None => ContractValue::Void,
        };
        let value = if value.is_void() {
            let fallback = self.defaults.for_function(call.function());
            tracing::debug!(fallback = %fallback, "Simulation returned no value, using default");
            fallback
        } else {
            value
        };

        Ok(InvocationOutcome {
            hash: None,
            status: TxStatus::Success,
            return_value: (!value.is_void()).then_some(value),
            record: None,
            decode_error: None,
        })
    }

    async fn read_write(&self, call: &Call) -> Result<InvocationOutcome, WorkflowError> {
        let snapshot = self.snapshot(call, Stage::Build).await?;
        let (_, draft) = self.build(call, &snapshot, None, Stage::Build)?;

        let sim = self.simulate(call, &draft).await?;
        let resources = PreparedResources::from_simulation(&sim)
            .map_err(|e| call.fail(Stage::Simulate, ErrorKind::Simulation(e.to_string())))?;

        // A sequence number is consumed exactly once; never reuse the draft's.
        let fresh = self.snapshot(call, Stage::Finalize).await?;
        let (tx, xdr) = self.build(call, &fresh, Some(&resources), Stage::Finalize)?;

        tracing::info!(sequence = tx.sequence(), fee = tx.fee(), "Requesting signature");
        let signed = self
            .signer
            .sign_transaction(&xdr, &self.network.passphrase)
            .await
            .map_err(|e| call.fail(Stage::Sign, e))?;

        let confirming = AtomicBool::new(false);
        match with_deadline(call.timeout, self.submit_and_confirm(call, &signed, &confirming)).await {
            Ok(result) => result,
            Err(_) => {
                let stage = if confirming.load(Ordering::Relaxed) {
                    Stage::Confirm
                } else {
                    Stage::Submit
                };
                Err(call.fail(
                    stage,
                    ErrorKind::ProcessingTimeout {
                        timeout_ms: call.timeout.as_millis() as u64,
                    },
                ))
            }
        }
    }

    async fn submit_and_confirm(
        &self,
        call: &Call,
        signed: &SignedTransaction,
        confirming: &AtomicBool,
    ) -> Result<InvocationOutcome, WorkflowError> {
        let record = self
            .rpc
            .submit(signed.as_xdr())
            .await
            .map_err(|e| call.fail(Stage::Submit, e))?;
        tracing::info!(hash = %record.hash, status = ?record.effective_status(), "Transaction submitted");

        if record.is_terminal() {
            return Ok(settle(record));
        }
        if record.hash.is_empty() {
            return Err(call.fail(
                Stage::Submit,
                ErrorKind::Decode("submission response carried no hash".to_string()),
            ));
        }

        confirming.store(true, Ordering::Relaxed);
        let settled = await_confirmation(self.rpc.as_ref(), &record.hash, &self.settings.poll)
            .await
            .map_err(|kind| call.fail(Stage::Confirm, kind))?;
        Ok(settle(settled))
    }
}

/// Turn a terminal record into an outcome, decoding the return value on
/// success. Unreadable metadata degrades to the raw record.
fn settle(record: TransactionRecord) -> InvocationOutcome {
    let status = record.effective_status().unwrap_or(TxStatus::Unknown);
    let meta = record.result_meta_xdr.as_deref().filter(|m| !m.is_empty());

    let (return_value, decode_error) = match (status, meta) {
        (TxStatus::Success, Some(meta)) => match return_value_from_meta(meta) {
            Ok(value) => (value, None),
            Err(e) => {
                tracing::warn!(hash = %record.hash, error = %e, "Unreadable result metadata, returning raw result");
                (None, Some(e.to_string()))
            }
        },
        _ => (None, None),
    };

    InvocationOutcome {
        hash: Some(record.hash.clone()),
        status,
        return_value,
        record: Some(record),
        decode_error,
    }
}

impl std::fmt::Debug for TransactionWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionWorkflow")
            .field("contract_id", &self.network.contract_id)
            .field("passphrase", &self.network.passphrase)
            .finish()
    }
}
