//! Commit-phase packet for the N-party two-phase protocol.

use crate::PacketMessage;
use lockstep_types::{BranchIndex, TxId};
use serde::{Deserialize, Serialize};

/// Delivers the global decision to one branch.
///
/// The broadcast must reach every branch, including ones that never
/// answered the prepare, so their locks are released. Participants treat a
/// redelivered decision for an already-terminal branch as an OK no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitPacket {
    /// Transaction being decided.
    pub tx_id: TxId,

    /// Branch this copy of the decision is addressed to.
    pub branch_index: BranchIndex,

    /// True to apply the branch's locked writes, false to discard them.
    pub committable: bool,
}

impl CommitPacket {
    /// Create a new commit packet.
    pub fn new(tx_id: TxId, branch_index: BranchIndex, committable: bool) -> Self {
        Self {
            tx_id,
            branch_index,
            committable,
        }
    }
}

impl PacketMessage for CommitPacket {
    fn message_type_id() -> &'static str {
        "lockstep.commit"
    }
}
