//! Error types for the branch protocols.

use crate::traits::SendError;
use lockstep_link::LinkError;
use lockstep_store::StoreError;
use lockstep_types::{
    BranchIndex, ChannelEndpoint, Phase, ResolveError, StateError, TxId,
};
use thiserror::Error;

/// Errors from protocol operations.
///
/// Most variants are protocol-precondition violations: typed, non-fatal,
/// and safe to answer by discarding the inbound message. `Store` carries
/// lock-contention faults, which abandon the whole processing step.
/// Leg-execution failures never appear here — they become protocol state,
/// observable through acknowledgements and queries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The transaction id was already used.
    #[error("{0} already in use")]
    TxIdInUse(TxId),

    /// No coordinator state exists for the transaction.
    #[error("Unknown transaction {0}")]
    UnknownTx(TxId),

    /// No branch state exists for this (transaction, branch).
    #[error("Unknown branch {branch} of {tx_id}")]
    UnknownBranch {
        /// The transaction.
        tx_id: TxId,
        /// The missing branch.
        branch: BranchIndex,
    },

    /// Branch state already exists for this (transaction, branch).
    #[error("{branch} of {tx_id} already exists")]
    BranchExists {
        /// The transaction.
        tx_id: TxId,
        /// The duplicate branch.
        branch: BranchIndex,
    },

    /// The channel is unusable for its branch: unknown, local where a
    /// counterparty is required, remote where the coordinator-local leg
    /// is required, or not the one recorded for the branch.
    #[error("Unknown or unusable channel {0}")]
    UnknownChannel(ChannelEndpoint),

    /// The two-party protocol takes exactly two legs.
    #[error("Expected {expected} legs, got {actual}")]
    WrongLegCount {
        /// Required leg count.
        expected: usize,
        /// Provided leg count.
        actual: usize,
    },

    /// A transaction needs at least one leg.
    #[error("Transaction has no legs")]
    NoLegs,

    /// More legs than branch indices.
    #[error("Too many legs: {0}")]
    TooManyLegs(usize),

    /// Legs carry links but the channel resolver lacks cross-chain-call
    /// support.
    #[error("Cross-leg links are not supported by the channel resolver")]
    LinksUnsupported,

    /// The packet arrived past its timeout.
    #[error("Packet past its timeout")]
    PacketExpired,

    /// The operation is invalid in the transaction's current phase.
    #[error("Wrong phase: expected {expected:?}, found {actual:?}")]
    WrongPhase {
        /// Phase the operation requires.
        expected: Phase,
        /// Phase the transaction is in.
        actual: Phase,
    },

    /// The coordinator-local leg was rejected at dispatch; nothing was
    /// persisted.
    #[error("Local leg of {tx_id} rejected: {reason}")]
    PrepareFailed {
        /// The transaction that failed to dispatch.
        tx_id: TxId,
        /// The contract's rejection reason.
        reason: String,
    },

    /// Coordinator/branch state transition violation.
    #[error(transparent)]
    State(#[from] StateError),

    /// Commit store failure, including lock contention.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Cross-leg link resolution failure.
    #[error(transparent)]
    Link(#[from] LinkError),

    /// Channel resolution failure.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Outbound send failure.
    #[error(transparent)]
    Send(#[from] SendError),
}
