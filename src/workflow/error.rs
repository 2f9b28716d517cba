//! Workflow error taxonomy.
//!
//! Every failure leaving the workflow is a [`WorkflowError`]: the function
//! that was being invoked, the stage it reached, and what went wrong.

use std::fmt;

use thiserror::Error;

use crate::stellar::signer::SignerError;
use crate::stellar::types::{ResultCodes, RpcError};

/// Pipeline stage at which an invocation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Validate,
    Build,
    Simulate,
    Finalize,
    Sign,
    Submit,
    Confirm,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Validate => "validate",
            Stage::Build => "build",
            Stage::Simulate => "simulate",
            Stage::Finalize => "finalize",
            Stage::Sign => "sign",
            Stage::Submit => "submit",
            Stage::Confirm => "confirm",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What went wrong.
#[derive(Debug, Clone, Error)]
pub enum ErrorKind {
    /// Bad input, rejected before any network call.
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("simulation failed: {0}")]
    Simulation(String),

    #[error("signing failed: {0}")]
    Signing(#[from] SignerError),

    /// The network refused the signed transaction. Never retried.
    #[error("submission rejected (HTTP {status}): {message}{}", fmt_codes(.result_codes))]
    Submission {
        status: u16,
        message: String,
        result_codes: Option<ResultCodes>,
    },

    #[error("transaction not confirmed after {attempts} attempts (last observed: {last_observed})")]
    ConfirmationTimeout { attempts: u32, last_observed: String },

    #[error("processing exceeded {timeout_ms} ms")]
    ProcessingTimeout { timeout_ms: u64 },

    #[error("network error: {0}")]
    Network(RpcError),

    #[error("could not encode transaction: {0}")]
    Encoding(String),

    #[error("could not decode result: {0}")]
    Decode(String),
}

fn fmt_codes(codes: &Option<ResultCodes>) -> String {
    codes
        .as_ref()
        .map(|c| format!(" [{}]", c))
        .unwrap_or_default()
}

impl ErrorKind {
    /// Short label used in metrics.
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::Validation(_) => "validation",
            ErrorKind::Simulation(_) => "simulation",
            ErrorKind::Signing(_) => "signing",
            ErrorKind::Submission { .. } => "submission",
            ErrorKind::ConfirmationTimeout { .. } => "confirmation_timeout",
            ErrorKind::ProcessingTimeout { .. } => "processing_timeout",
            ErrorKind::Network(_) => "network",
            ErrorKind::Encoding(_) => "encoding",
            ErrorKind::Decode(_) => "decode",
        }
    }
}

impl From<RpcError> for ErrorKind {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::Rejected {
                status,
                title,
                result_codes,
            } => ErrorKind::Submission {
                status,
                message: title,
                result_codes,
            },
            other => ErrorKind::Network(other),
        }
    }
}

/// An invocation failure with its context.
#[derive(Debug, Clone, Error)]
#[error("{function} failed during {stage}: {kind}")]
pub struct WorkflowError {
    pub function: String,
    pub stage: Stage,
    pub kind: ErrorKind,
}

impl WorkflowError {
    pub fn new(function: &str, stage: Stage, kind: impl Into<ErrorKind>) -> Self {
        Self {
            function: function.to_string(),
            stage,
            kind: kind.into(),
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Result codes of a rejected submission, if that is what happened.
    pub fn result_codes(&self) -> Option<&ResultCodes> {
        match &self.kind {
            ErrorKind::Submission { result_codes, .. } => result_codes.as_ref(),
            _ => None,
        }
    }
}
