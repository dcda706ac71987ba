//! Per-branch state on the chain executing a leg.

use crate::{ChannelEndpoint, StateError};
use serde::{Deserialize, Serialize};

/// Status of one leg on its executing chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BranchStatus {
    /// Executed tentatively, awaiting the global decision.
    Prepare,

    /// Writes applied durably.
    Commit,

    /// Writes discarded.
    Abort,
}

/// Outcome of the leg's prepare execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrepareResult {
    /// The contract call succeeded.
    Ok,

    /// The contract call was rejected.
    Failed,
}

/// Persistent record of one leg on the chain that executed it.
///
/// One per (TxId, BranchIndex). Created on first execution of the leg,
/// driven to a terminal status exactly once by the global decision, and
/// never re-created for the same key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractTransactionState {
    /// Current status.
    status: BranchStatus,

    /// Outcome of the prepare execution.
    prepare_result: PrepareResult,

    /// Channel the leg's packet arrived over (local endpoint for a
    /// coordinator-local leg). The decision must arrive over the same one.
    channel: ChannelEndpoint,
}

impl ContractTransactionState {
    /// Record a leg awaiting the global decision.
    pub fn prepared(channel: ChannelEndpoint) -> Self {
        Self {
            status: BranchStatus::Prepare,
            prepare_result: PrepareResult::Ok,
            channel,
        }
    }

    /// Record a leg already at a terminal status.
    ///
    /// Used where single-leg finality needs no isolation window: an
    /// immediate-mode execution commits or aborts in the same step.
    pub fn finalized(channel: ChannelEndpoint, prepare_result: PrepareResult) -> Self {
        let status = match prepare_result {
            PrepareResult::Ok => BranchStatus::Commit,
            PrepareResult::Failed => BranchStatus::Abort,
        };
        Self {
            status,
            prepare_result,
            channel,
        }
    }

    /// Current status.
    pub fn status(&self) -> BranchStatus {
        self.status
    }

    /// Outcome of the prepare execution.
    pub fn prepare_result(&self) -> PrepareResult {
        self.prepare_result
    }

    /// Channel the leg's packet arrived over.
    pub fn channel(&self) -> &ChannelEndpoint {
        &self.channel
    }

    /// Whether the status is terminal.
    pub fn is_terminal(&self) -> bool {
        self.status != BranchStatus::Prepare
    }

    /// Apply the global decision, moving Prepare to a terminal status.
    ///
    /// Fails if the status is already terminal: a repeat decision must not
    /// re-apply or flip the outcome.
    pub fn decide(&mut self, committable: bool) -> Result<(), StateError> {
        if self.is_terminal() {
            return Err(StateError::BranchTerminal);
        }
        self.status = if committable {
            BranchStatus::Commit
        } else {
            BranchStatus::Abort
        };
        Ok(())
    }
}
