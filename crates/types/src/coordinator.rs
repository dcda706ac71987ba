//! Coordinator-side state for a cross-chain transaction.

use crate::{BranchIndex, ChannelEndpoint};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Which commit protocol a transaction runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitKind {
    /// Two-party protocol: one local leg, one counterparty leg.
    Simple,

    /// N-party two-phase commit.
    TwoPhase,
}

/// Protocol phase, monotonic Prepare -> Commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Legs are executing tentatively; no global decision yet.
    Prepare,

    /// A global decision exists and is being delivered.
    Commit,
}

/// The global commit/abort decision, set exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    /// Not yet decided.
    Unknown,

    /// All legs commit.
    Commit,

    /// All legs abort.
    Abort,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Unknown => write!(f, "unknown"),
            Decision::Commit => write!(f, "commit"),
            Decision::Abort => write!(f, "abort"),
        }
    }
}

/// Errors from coordinator/branch state transitions.
///
/// These are protocol-precondition violations: typed, non-fatal, and safe
/// for the caller to answer by discarding the offending inbound message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// A coordinator state needs at least one branch channel.
    #[error("Coordinator state requires at least one channel")]
    NoChannels,

    /// The branch index is outside the recorded channel list.
    #[error("{0} is out of range")]
    BranchOutOfRange(BranchIndex),

    /// The branch was already confirmed.
    #[error("{0} already confirmed")]
    AlreadyConfirmed(BranchIndex),

    /// A confirmation arrived over a channel other than the branch's
    /// recorded one.
    #[error("{branch} confirmation over {actual}, expected {expected}")]
    WrongChannel {
        /// Branch being confirmed.
        branch: BranchIndex,
        /// Channel recorded for the branch.
        expected: ChannelEndpoint,
        /// Channel the confirmation actually arrived on.
        actual: ChannelEndpoint,
    },

    /// The decision was already set.
    #[error("Decision already set to {0}")]
    AlreadyDecided(Decision),

    /// `Decision::Unknown` is not a decision.
    #[error("Cannot decide Unknown")]
    UndecidedDecision,

    /// The phase only moves Prepare -> Commit.
    #[error("Phase already at Commit")]
    PhaseExhausted,

    /// The branch state was already driven to a terminal status.
    #[error("Branch state already terminal")]
    BranchTerminal,
}

/// Persistent coordinator record for one cross-chain transaction.
///
/// Created on first dispatch, mutated only by incoming confirmations, and
/// never pruned (a known retention limitation; see DESIGN.md).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorState {
    /// Which commit protocol this transaction runs under.
    commit_kind: CommitKind,

    /// Current phase.
    phase: Phase,

    /// Global decision, set exactly once.
    decision: Decision,

    /// One channel per branch, fixed at creation. Index = branch index.
    channels: Vec<ChannelEndpoint>,

    /// Branches whose prepare outcome has been confirmed.
    confirmed: BTreeSet<BranchIndex>,

    /// Branches whose acknowledgement has been accounted for.
    acked: BTreeSet<BranchIndex>,
}

impl CoordinatorState {
    /// Create a fresh coordinator state in the Prepare phase.
    ///
    /// Fails if `channels` is empty: a transaction with no branches cannot
    /// exist.
    pub fn new(commit_kind: CommitKind, channels: Vec<ChannelEndpoint>) -> Result<Self, StateError> {
        if channels.is_empty() {
            return Err(StateError::NoChannels);
        }
        Ok(Self {
            commit_kind,
            phase: Phase::Prepare,
            decision: Decision::Unknown,
            channels,
            confirmed: BTreeSet::new(),
            acked: BTreeSet::new(),
        })
    }

    /// Which commit protocol this transaction runs under.
    pub fn commit_kind(&self) -> CommitKind {
        self.commit_kind
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Global decision.
    pub fn decision(&self) -> Decision {
        self.decision
    }

    /// The recorded channels, one per branch.
    pub fn channels(&self) -> &[ChannelEndpoint] {
        &self.channels
    }

    /// The recorded channel for a branch, if the index is in range.
    pub fn channel(&self, branch: BranchIndex) -> Option<&ChannelEndpoint> {
        self.channels.get(branch.0 as usize)
    }

    /// Confirm a branch's prepare outcome.
    ///
    /// A branch is confirmed at most once, and only via its recorded
    /// channel; anything else is a precondition violation.
    pub fn confirm(
        &mut self,
        branch: BranchIndex,
        channel: &ChannelEndpoint,
    ) -> Result<(), StateError> {
        let expected = self
            .channel(branch)
            .ok_or(StateError::BranchOutOfRange(branch))?;
        if expected != channel {
            return Err(StateError::WrongChannel {
                branch,
                expected: expected.clone(),
                actual: channel.clone(),
            });
        }
        if !self.confirmed.insert(branch) {
            return Err(StateError::AlreadyConfirmed(branch));
        }
        Ok(())
    }

    /// Whether a branch has been confirmed.
    pub fn is_confirmed(&self, branch: BranchIndex) -> bool {
        self.confirmed.contains(&branch)
    }

    /// Whether every branch has been confirmed.
    pub fn is_completed(&self) -> bool {
        self.confirmed.len() == self.channels.len()
    }

    /// Record the global decision. Set exactly once, never to Unknown.
    pub fn decide(&mut self, decision: Decision) -> Result<(), StateError> {
        if decision == Decision::Unknown {
            return Err(StateError::UndecidedDecision);
        }
        if self.decision != Decision::Unknown {
            return Err(StateError::AlreadyDecided(self.decision));
        }
        self.decision = decision;
        Ok(())
    }

    /// Advance the phase from Prepare to Commit.
    pub fn advance_to_commit(&mut self) -> Result<(), StateError> {
        if self.phase == Phase::Commit {
            return Err(StateError::PhaseExhausted);
        }
        self.phase = Phase::Commit;
        Ok(())
    }

    /// Mark a branch's acknowledgement as accounted for.
    ///
    /// Returns whether this was the first time; duplicates are tolerated.
    pub fn mark_acked(&mut self, branch: BranchIndex) -> bool {
        self.acked.insert(branch)
    }

    /// Whether a branch's acknowledgement has been accounted for.
    pub fn is_acked(&self, branch: BranchIndex) -> bool {
        self.acked.contains(&branch)
    }

    /// Whether every branch is both confirmed and acked.
    pub fn is_fully_acknowledged(&self) -> bool {
        self.is_completed() && self.acked.len() == self.channels.len()
    }
}
