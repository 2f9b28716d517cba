//! Voting facade over the transaction workflow.
//!
//! Maps the ballot contract's three entry points onto typed calls:
//! - `vote(voter: Address, candidate_id: u32)`
//! - `get_vote_count(candidate_id: u32) -> u32`
//! - `has_voted(voter: Address) -> bool`

use futures_util::future::join_all;
use serde::Serialize;

use crate::config::{CandidateConfig, Candidates};
use crate::stellar::value::ContractValue;
use crate::workflow::{CallMode, ErrorKind, InvocationOutcome, Stage, TransactionWorkflow, WorkflowError};

/// Vote count for one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateTally {
    pub id: u32,
    pub name: String,
    pub votes: u32,
}

/// Counts for every configured candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub candidates: Vec<CandidateTally>,
    pub total: u64,
}

#[derive(Debug, Clone)]
pub struct VotingClient {
    workflow: TransactionWorkflow,
    candidates: Candidates,
}

impl VotingClient {
    pub fn new(workflow: TransactionWorkflow, candidates: Candidates) -> Self {
        Self {
            workflow,
            candidates,
        }
    }

    pub fn candidates(&self) -> &Candidates {
        &self.candidates
    }

    pub fn workflow(&self) -> &TransactionWorkflow {
        &self.workflow
    }

    /// Cast `voter`'s vote for `candidate_id`. Requires a wallet signature.
    pub async fn vote(&self, voter: &str, candidate_id: u32) -> Result<InvocationOutcome, WorkflowError> {
        if self.candidates.get(candidate_id).is_none() {
            return Err(WorkflowError::new(
                "vote",
                Stage::Validate,
                ErrorKind::Validation(format!("unknown candidate {}", candidate_id)),
            ));
        }
        let voter_arg = ContractValue::address(voter).map_err(|e| {
            WorkflowError::new("vote", Stage::Validate, ErrorKind::Validation(format!("voter: {}", e)))
        })?;

        self.workflow
            .invoke(
                "vote",
                vec![voter_arg, ContractValue::U32(candidate_id)],
                voter,
                CallMode::ReadWrite,
                None,
            )
            .await
    }

    /// Current count for one candidate, simulated as `source`.
    pub async fn vote_count(&self, source: &str, candidate_id: u32) -> Result<u32, WorkflowError> {
        let outcome = self
            .workflow
            .invoke(
                "get_vote_count",
                vec![ContractValue::U32(candidate_id)],
                source,
                CallMode::ReadOnly,
                None,
            )
            .await?;
        expect_value("get_vote_count", &outcome, ContractValue::as_u32, 0)
    }

    pub async fn has_voted(&self, voter: &str) -> Result<bool, WorkflowError> {
        let voter_arg = ContractValue::address(voter).map_err(|e| {
            WorkflowError::new("has_voted", Stage::Validate, ErrorKind::Validation(format!("voter: {}", e)))
        })?;
        let outcome = self
            .workflow
            .invoke("has_voted", vec![voter_arg], voter, CallMode::ReadOnly, None)
            .await?;
        expect_value("has_voted", &outcome, ContractValue::as_bool, false)
    }

    /// Read every candidate's count concurrently. A failed read counts as
    /// zero and is logged.
    pub async fn tally(&self, source: &str) -> Tally {
        let reads = self
            .candidates
            .iter()
            .map(|candidate| self.count_or_zero(source, candidate));
        let candidates = join_all(reads).await;
        let total = candidates.iter().map(|c| u64::from(c.votes)).sum();
        Tally { candidates, total }
    }

    async fn count_or_zero(&self, source: &str, candidate: &CandidateConfig) -> CandidateTally {
        let votes = match self.vote_count(source, candidate.id).await {
            Ok(votes) => votes,
            Err(e) => {
                tracing::warn!(candidate = candidate.id, error = %e, "Vote count unavailable, showing 0");
                0
            }
        };
        CandidateTally {
            id: candidate.id,
            name: candidate.name.clone(),
            votes,
        }
    }
}

fn expect_value<T>(
    function: &str,
    outcome: &InvocationOutcome,
    extract: impl Fn(&ContractValue) -> Option<T>,
    empty: T,
) -> Result<T, WorkflowError> {
    match outcome.value() {
        None => Ok(empty),
        Some(value) => extract(value).ok_or_else(|| {
            WorkflowError::new(
                function,
                Stage::Simulate,
                ErrorKind::Decode(format!("unexpected return value {}", value)),
            )
        }),
    }
}
